//! Top-level import and export passes
//!
//! Each pass takes a config section, returns an [`Outcome`](crate::outcome::Outcome)
//! carrying every warning raised, and only fails outright on I/O errors or
//! broken internal invariants.

pub mod collision;
pub mod export;
pub mod import;

use std::path::Path;

use anyhow::{Context, Result};
use ogre_common::Warning;
use ogre_common::formats::ToXml;

use crate::converter::{ConvertError, XmlConverter};

pub use collision::export_collision;
pub use export::{ExportReport, export_mesh};
pub use import::{ImportedScene, import_mesh};

/// Serialize `document` in memory, then write the whole file.
pub(crate) fn write_document(path: &Path, document: &impl ToXml) -> Result<()> {
    let text = document
        .to_xml_string()
        .with_context(|| format!("Failed to serialize {:?}", path))?;
    std::fs::write(path, text).with_context(|| format!("Failed to write {:?}", path))?;
    tracing::info!("Wrote {:?}", path);
    Ok(())
}

/// Locate the converter, turning a miss into a warning.
pub(crate) fn locate_converter(configured: Option<&Path>, warnings: &mut Vec<Warning>) -> Option<XmlConverter> {
    match XmlConverter::locate(configured) {
        Ok(converter) => {
            tracing::debug!("Using converter {:?}", converter.path());
            Some(converter)
        }
        Err(err) => {
            warnings.push(convert_warning(err));
            None
        }
    }
}

pub(crate) fn convert_warning(err: ConvertError) -> Warning {
    match err {
        ConvertError::NotFound(_) => Warning::missing(err.to_string()),
        _ => Warning::malformed(err.to_string()),
    }
}

/// File name with the given compound suffixes removed, e.g.
/// `hero.mesh.xml` → `hero`.
pub(crate) fn base_name(path: &Path, suffixes: &[&str]) -> String {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    for suffix in suffixes {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(suffix) && lower.len() > suffix.len() {
            name.truncate(name.len() - suffix.len());
        }
    }
    name
}
