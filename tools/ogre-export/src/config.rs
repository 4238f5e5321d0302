//! Tool configuration (`ogre-export.toml`)
//!
//! Every option has a default, so an empty or missing file is valid. CLI
//! flags are applied on top of the loaded values.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "ogre-export.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub export: ExportConfig,
    pub import: ImportConfig,
    pub collision: CollisionConfig,
}

impl ToolConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: ToolConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        Ok(config)
    }

    /// Load `path` if given, else `ogre-export.toml` if present, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    tracing::debug!("Using {:?}", fallback);
                    Self::load(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

// ============================================================================
// Mesh / skeleton export
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Converter executable, or a program name looked up on PATH
    pub xml_converter_path: Option<PathBuf>,
    pub keep_intermediate_xml: bool,
    /// Bake object rotation and scale into the vertices
    pub apply_transform: bool,
    /// Export the modifier-evaluated mesh when the snapshot has one
    pub apply_modifiers: bool,
    pub export_tangents: bool,
    pub export_binormals: bool,
    pub export_vertex_colour: bool,
    pub export_poses: bool,
    pub export_materials: bool,
    pub overwrite_materials: bool,
    pub export_skeleton: bool,
    pub export_animation: bool,
    pub renormalize_bone_weights: bool,
    pub batch_export: bool,
    /// Overrides the scene's frame step when set
    pub frame_step: Option<u32>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            xml_converter_path: None,
            keep_intermediate_xml: false,
            apply_transform: false,
            apply_modifiers: false,
            export_tangents: true,
            export_binormals: false,
            export_vertex_colour: false,
            export_poses: false,
            export_materials: false,
            overwrite_materials: false,
            export_skeleton: false,
            export_animation: false,
            renormalize_bone_weights: default_renormalize(),
            batch_export: false,
            frame_step: None,
        }
    }
}

fn default_renormalize() -> bool {
    true
}

// ============================================================================
// Import
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub xml_converter_path: Option<PathBuf>,
    pub keep_intermediate_xml: bool,
    pub import_normals: bool,
    pub import_shape_keys: bool,
    pub import_animations: bool,
    /// Derive the frame rate from the keyframe spacing and snap keys to
    /// whole frames
    pub round_frames: bool,
    /// Frame rate used to turn key times into frames
    pub fps: f32,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            xml_converter_path: None,
            keep_intermediate_xml: false,
            import_normals: true,
            import_shape_keys: true,
            import_animations: true,
            round_frames: true,
            fps: default_fps(),
        }
    }
}

fn default_fps() -> f32 {
    24.0
}

// ============================================================================
// Collision export
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectSelection {
    /// Every object with a rigid body
    All,
    /// Selected objects with a rigid body
    #[default]
    Selected,
    /// Selected objects and all their descendants
    Children,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RootTransform {
    /// Shapes stay in world space
    #[default]
    World,
    /// Relative to the active object
    Active,
    /// Relative to the exported objects' common parent
    Parent,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollisionFormat {
    /// PhysX 3 RepX collection (`.repx`)
    #[default]
    Repx,
    /// PhysX 2.8 NXUSTREAM2 (`.xml`)
    Nxustream,
}

impl CollisionFormat {
    pub fn extension(self) -> &'static str {
        match self {
            CollisionFormat::Repx => "repx",
            CollisionFormat::Nxustream => "xml",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    pub objects: ObjectSelection,
    pub root_transform: RootTransform,
    /// Write a dynamic actor instead of a static one
    pub dynamic: bool,
    pub format: CollisionFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: ToolConfig = toml::from_str("").unwrap();
        assert!(config.export.export_tangents);
        assert!(config.export.renormalize_bone_weights);
        assert!(!config.export.batch_export);
        assert_eq!(config.import.fps, 24.0);
        assert!(config.import.round_frames);
        assert_eq!(config.collision.objects, ObjectSelection::Selected);
        assert_eq!(config.collision.format, CollisionFormat::Repx);
    }

    #[test]
    fn test_partial_sections() {
        let config: ToolConfig = toml::from_str(
            r#"
            [export]
            export_skeleton = true
            xml_converter_path = "/opt/ogre/OgreXMLConverter"
            frame_step = 2

            [collision]
            objects = "CHILDREN"
            root_transform = "PARENT"
            format = "NXUSTREAM"
            "#,
        )
        .unwrap();
        assert!(config.export.export_skeleton);
        assert!(config.export.export_tangents);
        assert_eq!(config.export.frame_step, Some(2));
        assert_eq!(
            config.export.xml_converter_path.as_deref(),
            Some(Path::new("/opt/ogre/OgreXMLConverter"))
        );
        assert_eq!(config.collision.objects, ObjectSelection::Children);
        assert_eq!(config.collision.root_transform, RootTransform::Parent);
        assert_eq!(config.collision.format.extension(), "xml");
    }

    #[test]
    fn test_unknown_selection_mode_rejected() {
        let result: Result<ToolConfig, _> = toml::from_str("[collision]\nobjects = \"SOME\"");
        assert!(result.is_err());
    }
}
