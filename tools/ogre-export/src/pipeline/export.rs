//! Mesh / skeleton / material export pass
//!
//! Selected objects become submeshes of one `.mesh.xml`, or one file each in
//! batch mode. The armature of the first object is exported alongside when
//! asked, and every written document is handed to the XML converter.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hashbrown::HashSet;
use ogre_common::Warning;
use ogre_common::formats::{MaterialDef, MeshXml, write_material_script};
use ogre_common::model::{BoneIdTable, Mesh};
use serde::Serialize;
use tracing::info;

use super::{base_name, convert_warning, locate_converter, write_document};
use crate::animation::{ActionPlayer, SampleRate, sample_animations};
use crate::config::ExportConfig;
use crate::converter::XmlConverter;
use crate::host::{HostArmature, HostObject, HostScene};
use crate::mesh::{CollectOptions, collect_submesh};
use crate::outcome::Outcome;
use crate::skeleton::{assign_bone_ids, build_skeleton};

/// Files produced by an export pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    /// Mesh and skeleton documents, XML or converted binary
    pub documents: Vec<PathBuf>,
    pub materials: Vec<PathBuf>,
}

/// `out/hero`, `out/hero.mesh` and `out/hero.mesh.xml` all name
/// `out/hero.mesh.xml`.
pub fn mesh_xml_path(output: &Path) -> PathBuf {
    let dir = output.parent().unwrap_or(Path::new(""));
    dir.join(format!("{}.mesh.xml", base_name(output, &[".xml", ".mesh"])))
}

/// Export the selected objects.
///
/// In batch mode `output` is a directory; otherwise it names the mesh file.
pub fn export_mesh(scene: &HostScene, output: &Path, config: &ExportConfig) -> Result<Outcome<ExportReport>> {
    let mut warnings = Vec::new();
    let selected: Vec<&HostObject> = scene.selected().collect();
    if selected.is_empty() {
        return Ok(Outcome::cancelled(
            Warning::unsupported("No object selected for export"),
            warnings,
        ));
    }

    let converter = locate_converter(config.xml_converter_path.as_deref(), &mut warnings);
    let mut exporter = MeshExporter {
        scene,
        config,
        converter,
        report: ExportReport::default(),
    };

    if config.batch_export {
        std::fs::create_dir_all(output)
            .with_context(|| format!("Failed to create output directory: {:?}", output))?;
        for object in &selected {
            let path = output.join(format!("{}.mesh.xml", object.name));
            exporter.export_file(&[*object], &path, &mut warnings)?;
        }
    } else {
        if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory: {:?}", dir))?;
        }
        exporter.export_file(&selected, &mesh_xml_path(output), &mut warnings)?;
    }

    let report = exporter.report;
    if report.documents.is_empty() {
        return Ok(Outcome::cancelled(
            Warning::unsupported("Nothing exportable in the selection"),
            warnings,
        ));
    }
    Ok(Outcome::finished(report, warnings))
}

struct MeshExporter<'a> {
    scene: &'a HostScene,
    config: &'a ExportConfig,
    converter: Option<XmlConverter>,
    report: ExportReport,
}

impl<'a> MeshExporter<'a> {
    /// Write one mesh document (plus skeleton and materials) for `objects`.
    fn export_file(&mut self, objects: &[&HostObject], path: &Path, warnings: &mut Vec<Warning>) -> Result<()> {
        let dir = path.parent().unwrap_or(Path::new("")).to_path_buf();
        let stem = base_name(path, &[".xml", ".mesh"]);
        info!("Exporting {} object(s) to {:?}", objects.len(), path);

        let armature = self.armature(objects, warnings);
        let ids = armature.map(|a| assign_bone_ids(&a.bones, warnings));

        let mut skeleton_link = None;
        if let (Some(armature), Some(ids)) = (armature, &ids) {
            if self.config.export_skeleton {
                let skeleton_path = dir.join(format!("{}.skeleton.xml", stem));
                self.export_skeleton(armature, ids, &skeleton_path, warnings)?;
                skeleton_link = Some(format!("{}.skeleton", stem));
            } else {
                skeleton_link = Some(format!("{}.skeleton", armature.name));
            }
        }

        let options = CollectOptions::from_config(self.config);
        let mut mesh = Mesh {
            skeleton_link,
            ..Default::default()
        };
        for object in objects {
            if let Some(submesh) = collect_submesh(object, ids.as_ref(), &options, warnings)? {
                mesh.submeshes.push(submesh);
            }
        }
        if mesh.submeshes.is_empty() {
            warnings.push(Warning::unsupported(format!("{:?} has no submeshes, not written", path)));
            return Ok(());
        }
        info!(
            "{}: {} submesh(es), {} triangles",
            stem,
            mesh.submeshes.len(),
            mesh.total_faces()
        );

        write_document(path, &MeshXml::new(&mesh, ids.as_ref()))?;
        let document = self.convert(path, warnings);
        self.report.documents.push(document);

        if self.config.export_materials {
            self.export_materials(&mesh, &dir.join(format!("{}.material", stem)))?;
        }
        Ok(())
    }

    /// Armature deforming the first object that names one.
    fn armature(&self, objects: &[&HostObject], warnings: &mut Vec<Warning>) -> Option<&'a HostArmature> {
        let name = objects.iter().find_map(|o| o.armature.as_deref())?;
        let armature = self.scene.armature(name);
        if armature.is_none() {
            warnings.push(Warning::missing(format!("armature '{}' is not in the scene", name)));
        }
        armature
    }

    fn export_skeleton(
        &mut self,
        armature: &HostArmature,
        ids: &BoneIdTable,
        path: &Path,
        warnings: &mut Vec<Warning>,
    ) -> Result<()> {
        let mut skeleton = build_skeleton(armature, ids, warnings);
        if self.config.export_animation {
            let rate = SampleRate::from_scene(self.scene, self.config.frame_step);
            let mut player = ActionPlayer::new(self.scene);
            skeleton.animations = sample_animations(self.scene, armature, &mut player, rate, warnings);
        }
        info!(
            "Skeleton '{}': {} bones, {} animations",
            armature.name,
            skeleton.bones.len(),
            skeleton.animations.len()
        );
        write_document(path, &skeleton)?;
        let document = self.convert(path, warnings);
        self.report.documents.push(document);
        Ok(())
    }

    fn export_materials(&mut self, mesh: &Mesh, path: &Path) -> Result<()> {
        if path.exists() && !self.config.overwrite_materials {
            info!("Keeping existing {:?}", path);
            return Ok(());
        }
        let mut seen = HashSet::new();
        let materials: Vec<MaterialDef> = mesh
            .submeshes
            .iter()
            .filter(|s| seen.insert(s.material.as_str()))
            .map(|s| {
                self.scene
                    .material(&s.material)
                    .cloned()
                    .unwrap_or_else(|| MaterialDef::named(&s.material))
            })
            .collect();
        std::fs::write(path, write_material_script(&materials))
            .with_context(|| format!("Failed to write material script: {:?}", path))?;
        info!("Wrote {:?} ({} materials)", path, materials.len());
        self.report.materials.push(path.to_path_buf());
        Ok(())
    }

    /// Convert `xml` to binary. Returns the path that now holds the
    /// document: the binary on success, else the XML.
    fn convert(&self, xml: &Path, warnings: &mut Vec<Warning>) -> PathBuf {
        let Some(converter) = &self.converter else {
            return xml.to_path_buf();
        };
        match converter.to_binary(xml) {
            Ok(binary) => {
                if !self.config.keep_intermediate_xml {
                    if let Err(err) = std::fs::remove_file(xml) {
                        warnings.push(Warning::missing(format!("could not remove {:?}: {}", xml, err)));
                    }
                }
                binary
            }
            Err(err) => {
                warnings.push(convert_warning(err));
                xml.to_path_buf()
            }
        }
    }
}
