//! ogre-export library
//!
//! Converts host scene snapshots into Ogre mesh/skeleton XML and PhysX
//! collision documents, and reads Ogre meshes back.

pub mod animation;
pub mod collision;
pub mod config;
pub mod converter;
pub mod error;
pub mod host;
pub mod mesh;
pub mod outcome;
pub mod pipeline;
pub mod skeleton;

pub use config::ToolConfig;
pub use error::InvariantViolation;
pub use host::HostScene;
pub use outcome::{Outcome, Status};
pub use pipeline::{ExportReport, ImportedScene, export_collision, export_mesh, import_mesh};
