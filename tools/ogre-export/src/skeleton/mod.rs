//! Skeleton conversion in both directions
//!
//! - `export`: stable bone ids and parent-relative rest transforms
//! - `import`: the staged rebuild of armature-space bones from a
//!   `.skeleton.xml`, with temporary helper and zero bones

pub mod export;
pub mod import;

pub use export::{assign_bone_ids, build_skeleton};
pub use import::{ImportStage, ImportedBone, ImportedSkeleton, SkeletonImport};
