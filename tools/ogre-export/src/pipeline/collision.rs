//! Collision export pass

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Result;
use ogre_common::Warning;
use ogre_common::formats::{NxuStreamDocument, RepxDocument};
use ogre_common::model::CollisionBody;
use tracing::info;

use super::write_document;
use crate::collision::{build_shape, root_transform, select_bodies};
use crate::config::{CollisionConfig, CollisionFormat};
use crate::host::HostScene;
use crate::outcome::Outcome;

/// `path` with the format's extension appended unless it already ends in it.
pub fn collision_path(path: &Path, format: CollisionFormat) -> PathBuf {
    let extension = format.extension();
    if path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
    {
        return path.to_path_buf();
    }
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// Write the selected rigid bodies as one collision document.
pub fn export_collision(scene: &HostScene, output: &Path, config: &CollisionConfig) -> Result<Outcome<CollisionBody>> {
    let mut warnings = Vec::new();
    let bodies = select_bodies(scene, config.objects, &mut warnings);
    if bodies.is_empty() {
        return Ok(Outcome::cancelled(
            Warning::unsupported("No collision selected for export"),
            warnings,
        ));
    }

    let root = root_transform(scene, &bodies, config.root_transform, &mut warnings);
    let shapes: Vec<_> = bodies
        .iter()
        .filter_map(|object| build_shape(object, root, config.format, &mut warnings))
        .collect();
    if shapes.is_empty() {
        return Ok(Outcome::cancelled(
            Warning::unsupported("No collision shape could be built"),
            warnings,
        ));
    }

    let path = collision_path(output, config.format);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let body = CollisionBody {
        name,
        dynamic: config.dynamic,
        shapes,
    };
    info!(
        "Writing {} collision shape(s) as {:?} to {:?}",
        body.shapes.len(),
        config.format,
        path
    );

    match config.format {
        CollisionFormat::Repx => write_document(&path, &RepxDocument::new(&body))?,
        CollisionFormat::Nxustream => {
            let collection_id = path.to_string_lossy();
            write_document(&path, &NxuStreamDocument::new(&body, &collection_id))?
        }
    }
    Ok(Outcome::finished(body, warnings))
}
