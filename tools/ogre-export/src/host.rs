//! Host scene snapshot
//!
//! The editor side dumps its scene into these plain structs (JSON via serde)
//! and the exporters read nothing else. Matrices are glam's serde layout:
//! 16 floats, column-major. Quaternions are `[x, y, z, w]`.

use std::path::Path;

use anyhow::{Context, Result};
use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use serde::Deserialize;

use ogre_common::formats::MaterialDef;

/// Everything the exporters can see of the host scene.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostScene {
    pub objects: Vec<HostObject>,
    pub armatures: Vec<HostArmature>,
    pub actions: Vec<HostAction>,
    pub materials: Vec<MaterialDef>,
    /// Scene frame rate
    pub fps: f32,
    pub frame_step: u32,
    pub active_object: Option<String>,
}

impl Default for HostScene {
    fn default() -> Self {
        Self {
            objects: Vec::new(),
            armatures: Vec::new(),
            actions: Vec::new(),
            materials: Vec::new(),
            fps: 24.0,
            frame_step: 1,
            active_object: None,
        }
    }
}

impl HostScene {
    /// Load a JSON snapshot.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene snapshot: {:?}", path))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse scene snapshot: {:?}", path))
    }

    pub fn object(&self, name: &str) -> Option<&HostObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    pub fn armature(&self, name: &str) -> Option<&HostArmature> {
        self.armatures.iter().find(|a| a.name == name)
    }

    pub fn action(&self, name: &str) -> Option<&HostAction> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn material(&self, name: &str) -> Option<&MaterialDef> {
        self.materials.iter().find(|m| m.name == name)
    }

    pub fn selected(&self) -> impl Iterator<Item = &HostObject> {
        self.objects.iter().filter(|o| o.selected)
    }

    /// Direct children of `name`, in scene order.
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a HostObject> + 'a {
        self.objects
            .iter()
            .filter(move |o| o.parent.as_deref() == Some(name))
    }
}

// ============================================================================
// Objects and meshes
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct HostObject {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub selected: bool,
    #[serde(default = "identity")]
    pub world_matrix: Mat4,
    #[serde(default)]
    pub mesh: Option<HostMesh>,
    /// Mesh with modifiers applied, when the host evaluated one
    #[serde(default)]
    pub evaluated_mesh: Option<HostMesh>,
    /// Vertex group names, indexed by `HostVertex::groups`
    #[serde(default)]
    pub vertex_groups: Vec<String>,
    #[serde(default)]
    pub material_slots: Vec<String>,
    /// Armature deforming this object
    #[serde(default)]
    pub armature: Option<String>,
    /// Local-space bounding box corners (min, max)
    #[serde(default)]
    pub bound_box: Option<[Vec3; 2]>,
    #[serde(default)]
    pub rigid_body: Option<HostRigidBody>,
}

fn identity() -> Mat4 {
    Mat4::IDENTITY
}

impl HostObject {
    /// The mesh to export, preferring the evaluated one when asked.
    pub fn mesh_data(&self, evaluated: bool) -> Option<&HostMesh> {
        if evaluated {
            self.evaluated_mesh.as_ref().or(self.mesh.as_ref())
        } else {
            self.mesh.as_ref()
        }
    }

    /// Local bounding box, from the snapshot or from the base mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        if let Some([min, max]) = self.bound_box {
            return Some((min, max));
        }
        let mesh = self.mesh.as_ref()?;
        let first = mesh.vertices.first()?.co;
        Some(mesh.vertices.iter().fold((first, first), |(lo, hi), v| {
            (lo.min(v.co), hi.max(v.co))
        }))
    }

    /// Edge lengths of the local bounding box.
    pub fn bounds_size(&self) -> Vec3 {
        self.bounds().map_or(Vec3::ZERO, |(min, max)| max - min)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostMesh {
    pub vertices: Vec<HostVertex>,
    pub polygons: Vec<HostPolygon>,
    #[serde(default)]
    pub shape_keys: Vec<HostShapeKey>,
}

impl HostMesh {
    pub fn has_uvs(&self) -> bool {
        self.loops().any(|l| l.uv.is_some())
    }

    pub fn has_colours(&self) -> bool {
        self.loops().any(|l| l.colour.is_some() || l.alpha.is_some())
    }

    pub fn has_tangents(&self) -> bool {
        self.loops().any(|l| l.tangent.is_some())
    }

    pub fn loops(&self) -> impl Iterator<Item = &HostLoop> {
        self.polygons.iter().flat_map(|p| p.loops.iter())
    }

    pub fn shape_key(&self, name: &str) -> Option<&HostShapeKey> {
        self.shape_keys.iter().find(|k| k.name == name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostVertex {
    pub co: Vec3,
    /// (vertex group index, weight)
    #[serde(default)]
    pub groups: Vec<(u32, f32)>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostPolygon {
    pub loops: Vec<HostLoop>,
}

/// One polygon corner.
#[derive(Debug, Clone, Deserialize)]
pub struct HostLoop {
    pub vertex: u32,
    pub normal: Vec3,
    #[serde(default)]
    pub uv: Option<Vec2>,
    /// Active colour layer
    #[serde(default)]
    pub colour: Option<Vec4>,
    /// Red channel of the "alpha" colour layer
    #[serde(default)]
    pub alpha: Option<f32>,
    #[serde(default)]
    pub tangent: Option<Vec3>,
    #[serde(default)]
    pub bitangent_sign: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostShapeKey {
    pub name: String,
    #[serde(default)]
    pub relative_key: Option<String>,
    /// One coordinate per mesh vertex
    pub coords: Vec<Vec3>,
}

// ============================================================================
// Rigid bodies
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShapeKind {
    Box,
    Sphere,
    Capsule,
    ConvexHull,
    Mesh,
    Cylinder,
    Cone,
    Compound,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeshSource {
    #[default]
    Base,
    Deform,
    Final,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostRigidBody {
    pub shape: ShapeKind,
    #[serde(default)]
    pub mesh_source: MeshSource,
}

// ============================================================================
// Armatures and actions
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct HostArmature {
    pub name: String,
    pub bones: Vec<HostBone>,
    /// Actions to export, active action first
    #[serde(default)]
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostBone {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    /// Armature-space rest matrix; the bone runs along its Y axis
    pub matrix_local: Mat4,
    /// Persisted `OGREID` custom property
    #[serde(default)]
    pub ogre_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostAction {
    pub name: String,
    pub frame_start: i32,
    pub frame_end: i32,
    #[serde(default)]
    pub curves: Vec<HostBoneCurves>,
}

impl HostAction {
    pub fn curves_for(&self, bone: &str) -> Option<&HostBoneCurves> {
        self.curves.iter().find(|c| c.bone == bone)
    }
}

/// Keyed pose-space channels of one bone, sorted by frame.
#[derive(Debug, Clone, Deserialize)]
pub struct HostBoneCurves {
    pub bone: String,
    pub keys: Vec<HostPoseKey>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HostPoseKey {
    pub frame: f32,
    #[serde(default)]
    pub location: Vec3,
    #[serde(default = "identity_quat")]
    pub rotation: Quat,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
}

fn identity_quat() -> Quat {
    Quat::IDENTITY
}

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_snapshot_defaults() {
        let scene: HostScene = serde_json::from_str(
            r#"{ "objects": [ { "name": "Cube", "selected": true,
                 "rigid_body": { "shape": "CONVEX_HULL" } } ] }"#,
        )
        .unwrap();
        assert_eq!(scene.fps, 24.0);
        assert_eq!(scene.frame_step, 1);
        let cube = &scene.objects[0];
        assert_eq!(cube.world_matrix, Mat4::IDENTITY);
        let body = cube.rigid_body.as_ref().unwrap();
        assert_eq!(body.shape, ShapeKind::ConvexHull);
        assert_eq!(body.mesh_source, MeshSource::Base);
    }

    #[test]
    fn test_bounds_from_mesh() {
        let object = HostObject {
            name: "Wedge".into(),
            parent: None,
            selected: false,
            world_matrix: Mat4::IDENTITY,
            mesh: Some(HostMesh {
                vertices: vec![
                    HostVertex { co: Vec3::new(-1.0, 0.0, 0.0), groups: vec![] },
                    HostVertex { co: Vec3::new(1.0, 2.0, 0.5), groups: vec![] },
                ],
                ..Default::default()
            }),
            evaluated_mesh: None,
            vertex_groups: vec![],
            material_slots: vec![],
            armature: None,
            bound_box: None,
            rigid_body: None,
        };
        assert_eq!(object.bounds_size(), Vec3::new(2.0, 2.0, 0.5));
    }

    #[test]
    fn test_pose_key_defaults() {
        let key: HostPoseKey = serde_json::from_str(r#"{ "frame": 3 }"#).unwrap();
        assert_eq!(key.rotation, Quat::IDENTITY);
        assert_eq!(key.scale, Vec3::ONE);
        assert_eq!(key.location, Vec3::ZERO);
    }
}
