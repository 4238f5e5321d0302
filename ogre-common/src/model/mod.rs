//! Typed records for meshes, skeletons, animations and collision shapes
//!
//! All geometry in these records is kept in source space; the codecs in
//! [`crate::formats`] convert at the document boundary.

pub mod animation;
pub mod collision;
pub mod mesh;
pub mod skeleton;

pub use animation::{Animation, Key, Track, IDENTITY_EPSILON};
pub use collision::{CollisionBody, CollisionGeometry, CollisionShape, LocalPose, MeshData};
pub use mesh::{Geometry, Mesh, Pose, PoseOffset, Submesh, Vertex, VertexElements};
pub use skeleton::{Bone, BoneIdTable, Skeleton};
