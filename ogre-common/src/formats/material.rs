//! Ogre `.material` script writer
//!
//! One single-pass technique per material. Texture files are only referenced
//! by name; copying them next to the script is left to the caller.

use std::fmt::Write as _;

use glam::Vec3;
use serde::Deserialize;

/// Fixed-function colours of one material.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MaterialDef {
    pub name: String,
    #[serde(default = "default_grey")]
    pub ambient: Vec3,
    #[serde(default = "default_grey")]
    pub diffuse: Vec3,
    #[serde(default)]
    pub specular: Vec3,
    #[serde(default)]
    pub emissive: Vec3,
    #[serde(default)]
    pub texture: Option<String>,
}

fn default_grey() -> Vec3 {
    Vec3::splat(0.8)
}

impl MaterialDef {
    /// Plain grey material used when a submesh names a material the host
    /// has no definition for.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ambient: default_grey(),
            diffuse: default_grey(),
            specular: Vec3::ZERO,
            emissive: Vec3::ZERO,
            texture: None,
        }
    }
}

const INDENT: &str = "    ";

fn colour(v: Vec3) -> String {
    format!("{:.6} {:.6} {:.6}", v.x, v.y, v.z)
}

/// Render a material script.
pub fn write_material_script(materials: &[MaterialDef]) -> String {
    let mut out = String::new();
    let i1 = INDENT;
    let i2 = INDENT.repeat(2);
    let i3 = INDENT.repeat(3);
    let i4 = INDENT.repeat(4);

    for m in materials {
        // Writing into a String cannot fail
        let _ = writeln!(out, "material {}", m.name);
        let _ = writeln!(out, "{{");
        let _ = writeln!(out, "{i1}technique\n{i1}{{");
        let _ = writeln!(out, "{i2}pass\n{i2}{{");
        let _ = writeln!(out, "{i3}ambient {}", colour(m.ambient));
        let _ = writeln!(out, "{i3}diffuse {}", colour(m.diffuse));
        let _ = writeln!(out, "{i3}specular {} 0", colour(m.specular));
        let _ = writeln!(out, "{i3}emissive {}", colour(m.emissive));
        if let Some(texture) = &m.texture {
            let _ = writeln!(out, "{i3}texture_unit\n{i3}{{");
            let _ = writeln!(out, "{i4}texture {}", texture);
            let _ = writeln!(out, "{i3}}}");
        }
        let _ = writeln!(out, "{i2}}}");
        let _ = writeln!(out, "{i1}}}");
        let _ = writeln!(out, "}}");
    }
    out
}
