//! `.mesh` / `.mesh.xml` import pass
//!
//! Binary inputs go through the converter first. The linked skeleton is
//! resolved next to the mesh so bone indices can be named, rebuilt into
//! head/tail bones, and its animations turned into action curves.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ogre_common::Warning;
use ogre_common::formats::mesh_xml::{self, parse_mesh, skeleton_link};
use ogre_common::formats::xml::parse_document;
use ogre_common::model::{BoneIdTable, Mesh};
use serde::Serialize;
use tracing::info;

use super::{base_name, convert_warning, locate_converter};
use crate::animation::{ImportedAction, frame_timing, import_animations};
use crate::config::ImportConfig;
use crate::converter::{XmlConverter, xml_sibling};
use crate::outcome::Outcome;
use crate::skeleton::{ImportedSkeleton, SkeletonImport};

/// Everything read back from one mesh file.
#[derive(Debug, Serialize)]
pub struct ImportedScene {
    /// Mesh file name without `.mesh` / `.xml`
    pub name: String,
    pub mesh: Mesh,
    pub skeleton: Option<ImportedSkeleton>,
    pub actions: Vec<ImportedAction>,
}

/// Import `input` (`.mesh` or `.xml`).
pub fn import_mesh(input: &Path, config: &ImportConfig) -> Result<Outcome<ImportedScene>> {
    let mut warnings = Vec::new();
    let mut importer = Importer {
        config,
        converter: None,
        converter_searched: false,
        intermediates: Vec::new(),
    };

    let result = importer.import(input, &mut warnings);
    importer.cleanup(&mut warnings);
    let Some(scene) = result? else {
        return Ok(Outcome::cancelled(
            Warning::unsupported(format!("Cannot import {:?}", input)),
            warnings,
        ));
    };
    Ok(Outcome::finished(scene, warnings))
}

struct Importer<'a> {
    config: &'a ImportConfig,
    converter: Option<XmlConverter>,
    converter_searched: bool,
    /// XML written by the converter during this pass
    intermediates: Vec<PathBuf>,
}

impl Importer<'_> {
    fn import(&mut self, input: &Path, warnings: &mut Vec<Warning>) -> Result<Option<ImportedScene>> {
        let extension = input
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let xml = match extension.as_str() {
            "xml" => input.to_path_buf(),
            "mesh" => match self.xml_for(input, warnings) {
                Some(xml) => xml,
                None => return Ok(None),
            },
            _ => {
                warnings.push(Warning::unsupported(format!(
                    "{:?} is neither a .mesh nor an .xml file",
                    input
                )));
                return Ok(None);
            }
        };

        info!("Importing {:?}", xml);
        let file = File::open(&xml).with_context(|| format!("Failed to open mesh: {:?}", xml))?;
        let root = parse_document(BufReader::new(file), mesh_xml::ROOT)
            .with_context(|| format!("Failed to parse mesh: {:?}", xml))?;

        let dir = xml.parent().unwrap_or(Path::new(""));
        let skeleton = match skeleton_link(&root) {
            Some(link) => self.import_skeleton(&dir.join(&link), warnings)?,
            None => None,
        };
        let ids: Option<BoneIdTable> = skeleton.as_ref().map(ImportedSkeleton::id_table);

        let mut mesh = parse_mesh(&root, ids.as_ref(), warnings)
            .with_context(|| format!("Failed to read mesh: {:?}", xml))?;
        self.filter_attributes(&mut mesh);
        info!(
            "Read {} submesh(es), {} triangles",
            mesh.submeshes.len(),
            mesh.total_faces()
        );

        let actions = match &skeleton {
            Some(skeleton) if self.config.import_animations => {
                let timing = frame_timing(&skeleton.animations, self.config.fps, self.config.round_frames);
                import_animations(skeleton, timing, warnings)
            }
            _ => Vec::new(),
        };

        Ok(Some(ImportedScene {
            name: base_name(input, &[".xml", ".mesh"]),
            mesh,
            skeleton,
            actions,
        }))
    }

    /// Read and rebuild the skeleton at `link`. A missing file is a warning.
    fn import_skeleton(&mut self, link: &Path, warnings: &mut Vec<Warning>) -> Result<Option<ImportedSkeleton>> {
        let xml = if link.extension().is_some_and(|e| e.eq_ignore_ascii_case("xml")) {
            link.is_file().then(|| link.to_path_buf())
        } else if xml_sibling(link).is_file() || link.is_file() {
            self.xml_for(link, warnings)
        } else {
            None
        };
        let Some(xml) = xml else {
            warnings.push(Warning::missing(format!(
                "linked skeleton {:?} not found, importing without bones",
                link
            )));
            return Ok(None);
        };

        let file = File::open(&xml).with_context(|| format!("Failed to open skeleton: {:?}", xml))?;
        let import = SkeletonImport::parse_xml(BufReader::new(file), warnings)
            .with_context(|| format!("Failed to parse skeleton: {:?}", xml))?;
        let skeleton = import.run(warnings)?;
        info!("Rebuilt {} bones from {:?}", skeleton.bones.len(), xml);
        Ok(Some(skeleton))
    }

    /// XML document for a binary file: an existing sibling, else a fresh
    /// conversion.
    fn xml_for(&mut self, binary: &Path, warnings: &mut Vec<Warning>) -> Option<PathBuf> {
        let sibling = xml_sibling(binary);
        if sibling.is_file() {
            info!("Reusing {:?}", sibling);
            return Some(sibling);
        }
        if !self.converter_searched {
            self.converter_searched = true;
            self.converter = locate_converter(self.config.xml_converter_path.as_deref(), warnings);
        }
        let converter = self.converter.as_ref()?;
        match converter.to_xml(binary) {
            Ok(xml) => {
                self.intermediates.push(xml.clone());
                Some(xml)
            }
            Err(err) => {
                warnings.push(convert_warning(err));
                None
            }
        }
    }

    fn filter_attributes(&self, mesh: &mut Mesh) {
        if !self.config.import_normals {
            let geometries = mesh
                .shared_geometry
                .iter_mut()
                .chain(mesh.submeshes.iter_mut().filter_map(|s| s.geometry.as_mut()));
            for geometry in geometries {
                geometry.elements.normals = false;
                for vertex in &mut geometry.vertices {
                    vertex.normal = glam::Vec3::ZERO;
                }
            }
        }
        if !self.config.import_shape_keys {
            for submesh in &mut mesh.submeshes {
                submesh.poses.clear();
            }
        }
    }

    fn cleanup(&mut self, warnings: &mut Vec<Warning>) {
        if self.config.keep_intermediate_xml {
            return;
        }
        for xml in self.intermediates.drain(..) {
            if let Err(err) = std::fs::remove_file(&xml) {
                warnings.push(Warning::missing(format!("could not remove {:?}: {}", xml, err)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESH: &str = r#"<mesh>
    <submeshes>
        <submesh material="Stone" usesharedvertices="false" use32bitindexes="false" operationtype="triangle_list">
            <faces count="1">
                <face v1="0" v2="1" v3="2" />
            </faces>
            <geometry vertexcount="3">
                <vertexbuffer positions="true" normals="true">
                    <vertex><position x="0" y="0" z="0" /><normal x="0" y="1" z="0" /></vertex>
                    <vertex><position x="1" y="0" z="0" /><normal x="0" y="1" z="0" /></vertex>
                    <vertex><position x="0" y="0" z="-1" /><normal x="0" y="1" z="0" /></vertex>
                </vertexbuffer>
            </geometry>
        </submesh>
    </submeshes>
    <skeletonlink name="tri.skeleton" />
</mesh>"#;

    fn config() -> ImportConfig {
        ImportConfig {
            xml_converter_path: Some(PathBuf::from("/nonexistent/OgreXMLConverter")),
            ..Default::default()
        }
    }

    #[test]
    fn test_unknown_extension_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.obj");
        std::fs::write(&path, "o tri").unwrap();
        let outcome = import_mesh(&path, &config()).unwrap();
        assert!(outcome.is_cancelled());
    }

    #[test]
    fn test_missing_skeleton_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.mesh.xml");
        std::fs::write(&path, MESH).unwrap();

        let outcome = import_mesh(&path, &config()).unwrap();
        assert!(!outcome.is_cancelled());
        assert_eq!(outcome.warnings.len(), 1);
        let scene = outcome.value.unwrap();
        assert_eq!(scene.name, "tri");
        assert!(scene.skeleton.is_none());
        assert_eq!(scene.mesh.submeshes[0].faces, [[0, 1, 2]]);
        // Y-up (0, 0, -1) is Z-up (0, 1, 0)
        let vertices = &scene.mesh.submeshes[0].geometry.as_ref().unwrap().vertices;
        assert!((vertices[2].position - glam::Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn test_binary_uses_existing_sibling_xml() {
        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join("tri.mesh");
        std::fs::write(&binary, [0u8; 4]).unwrap();
        std::fs::write(dir.path().join("tri.mesh.xml"), MESH).unwrap();

        let outcome = import_mesh(&binary, &config()).unwrap();
        assert_eq!(outcome.value.unwrap().mesh.total_faces(), 1);
        // Pre-existing XML is never deleted
        assert!(dir.path().join("tri.mesh.xml").is_file());
    }

    #[test]
    fn test_binary_without_converter_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join("tri.mesh");
        std::fs::write(&binary, [0u8; 4]).unwrap();
        let outcome = import_mesh(&binary, &config()).unwrap();
        assert!(outcome.is_cancelled());
        assert_eq!(outcome.warnings.len(), 2);
    }

    #[test]
    fn test_bad_face_index_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.mesh.xml");
        let bad = MESH.replace(
            r#"<faces count="1">
                <face v1="0" v2="1" v3="2" />"#,
            r#"<faces count="2">
                <face v1="0" v2="1" v3="2" />
                <face v1="0" v2="1" v3="5" />"#,
        );
        assert!(bad.contains(r#"v3="5""#));
        std::fs::write(&path, bad).unwrap();

        let outcome = import_mesh(&path, &config()).unwrap();
        assert!(!outcome.is_cancelled());
        // Missing skeleton plus the dropped face
        assert_eq!(outcome.warnings.len(), 2);
        assert!(
            outcome
                .warnings
                .iter()
                .any(|w| w.kind == ogre_common::WarningKind::MalformedData)
        );
        assert_eq!(outcome.value.unwrap().mesh.submeshes[0].faces, [[0, 1, 2]]);
    }

    #[test]
    fn test_normals_dropped_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.xml");
        std::fs::write(&path, MESH).unwrap();
        let config = ImportConfig {
            import_normals: false,
            ..config()
        };
        let scene = import_mesh(&path, &config).unwrap().value.unwrap();
        let geometry = scene.mesh.submeshes[0].geometry.as_ref().unwrap();
        assert!(!geometry.elements.normals);
    }
}
