//! Shared types and codecs for the Ogre interchange formats
//!
//! This crate holds everything that is independent of the host editor and of
//! the external converter process:
//! - `math`: Z-up ↔ Y-up conversion and transform decomposition
//! - `model`: typed mesh, skeleton, animation and collision records
//! - `formats`: XML codecs for `.mesh.xml`, `.skeleton.xml`, RepX and NXUSTREAM2

pub mod error;
pub mod formats;
pub mod math;
pub mod model;
pub mod report;

pub use error::FormatError;
pub use report::{Warning, WarningKind};

// Re-export the coordinate conversion entry points
pub use math::{decompose_trs, to_source_space, to_target_space, uv_flip};
