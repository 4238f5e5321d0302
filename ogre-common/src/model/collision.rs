//! Collision shapes as written to the PhysX schemas

use glam::{Mat3, Mat4, Quat, Vec3};
use serde::Serialize;

/// Rotation + translation of a shape relative to its actor. Never scaled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocalPose {
    pub rotation: Quat,
    pub position: Vec3,
}

impl LocalPose {
    pub const IDENTITY: Self = Self {
        rotation: Quat::IDENTITY,
        position: Vec3::ZERO,
    };

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }

    pub fn rotation_matrix(&self) -> Mat3 {
        Mat3::from_quat(self.rotation)
    }
}

/// Point cloud plus triangle list shared by convex and triangle meshes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MeshData {
    pub points: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CollisionGeometry {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    Capsule { radius: f32, half_height: f32 },
    /// Hull points already carry the object's scale
    ConvexHull { id: u64, mesh: MeshData },
    TriangleMesh { id: u64, mesh: MeshData },
}

impl CollisionGeometry {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Box { .. } => "box",
            Self::Sphere { .. } => "sphere",
            Self::Capsule { .. } => "capsule",
            Self::ConvexHull { .. } => "convex hull",
            Self::TriangleMesh { .. } => "triangle mesh",
        }
    }

    /// Content id of the referenced mesh block, if any.
    pub fn mesh_id(&self) -> Option<u64> {
        match self {
            Self::ConvexHull { id, .. } | Self::TriangleMesh { id, .. } => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollisionShape {
    /// Name of the object this shape was built from
    pub source: String,
    pub pose: LocalPose,
    pub geometry: CollisionGeometry,
}

/// Everything written to one collision document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollisionBody {
    /// Actor name, usually the output file's stem
    pub name: String,
    pub dynamic: bool,
    pub shapes: Vec<CollisionShape>,
}
