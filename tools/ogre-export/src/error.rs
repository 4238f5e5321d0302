//! Fatal pipeline errors
//!
//! Everything recoverable travels as a `Warning`; these are the upstream bugs
//! that abort a pass.

use crate::skeleton::ImportStage;

#[derive(Debug, thiserror::Error)]
pub enum InvariantViolation {
    #[error("polygon {polygon} of '{object}' reached the triangle writer with {corners} corners")]
    NotATriangle {
        object: String,
        polygon: usize,
        corners: usize,
    },

    #[error("skeleton import stage {attempted:?} requested while at {current:?}")]
    StageOrder {
        current: ImportStage,
        attempted: ImportStage,
    },

    #[error("placeholder bone '{0}' survived helper stripping")]
    PlaceholderLeaked(String),
}
