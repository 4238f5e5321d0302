//! Errors raised while reading or writing interchange documents

use std::io;

/// Failure to read or write an interchange document.
///
/// Recoverable oddities inside an otherwise valid document are reported as
/// [`crate::Warning`] values instead; these variants are the conditions that
/// leave nothing sensible to return.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("XML parse error: {0}")]
    Parse(#[from] xmltree::ParseError),

    #[error("XML write error: {0}")]
    Write(#[from] xmltree::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("expected root element <{expected}>, found <{found}>")]
    UnexpectedRoot { expected: &'static str, found: String },

    #[error("<{element}> is missing attribute '{attribute}'")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    #[error("<{element}> attribute '{attribute}' has invalid value '{value}'")]
    InvalidAttribute {
        element: String,
        attribute: &'static str,
        value: String,
    },

    #[error("face {face} of submesh {submesh} references vertex {index}, but geometry has {count}")]
    FaceIndexOutOfRange {
        submesh: usize,
        face: usize,
        index: u32,
        count: usize,
    },

    #[error("submesh {0} uses shared vertices but the mesh has no shared geometry")]
    MissingSharedGeometry(usize),

    #[error("bone '{0}' is not in the skeleton's id table")]
    UnknownBone(String),
}
