//! Rigid bodies → PhysX collision shapes
//!
//! - `select`: which objects are exported and the root transform
//! - `shapes`: primitive dimensions, hull and triangle-mesh geometry
//! - `hull`: 3D convex hull

pub mod hull;
pub mod select;
pub mod shapes;

pub use select::{common_parent, root_transform, select_bodies};
pub use shapes::build_shape;
