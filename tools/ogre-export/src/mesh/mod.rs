//! Mesh collection from host objects
//!
//! - `collect`: triangulation and per-corner vertex assembly
//! - `vertex_table`: hashed vertex deduplication
//! - `tangents`: tangent frames and binormals
//! - `weights`: vertex-group weights → bone assignments

pub mod collect;
pub mod tangents;
pub mod vertex_table;
pub mod weights;

pub use collect::{CollectOptions, collect_submesh, material_name};
pub use vertex_table::VertexTable;
