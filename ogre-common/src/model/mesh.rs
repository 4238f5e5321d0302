//! Mesh records: vertices, geometry blocks, submeshes and shape-key poses

use glam::{Vec2, Vec3, Vec4};
use serde::Serialize;

use crate::FormatError;

/// One output vertex.
///
/// Two vertices that agree on position, normal, texture coordinates, colour
/// and tangent handedness are the same vertex; `bone_weights` and
/// `source_index` ride along with whichever copy was seen first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    /// One entry per texcoord set
    pub uvs: Vec<Vec2>,
    /// RGBA
    pub colour: Vec4,
    /// xyz + handedness in w
    pub tangent: Option<Vec4>,
    pub binormal: Option<Vec3>,
    /// Ordered (bone name, weight) pairs
    pub bone_weights: Vec<(String, f32)>,
    /// Host vertex this corner came from; used for shape-key lookups
    #[serde(skip)]
    pub source_index: Option<u32>,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            normal: Vec3::ZERO,
            uvs: Vec::new(),
            colour: Vec4::ONE,
            tangent: None,
            binormal: None,
            bone_weights: Vec::new(),
            source_index: None,
        }
    }
}

impl Vertex {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}

/// Which optional vertex attributes a geometry block carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VertexElements {
    pub normals: bool,
    pub texcoord_sets: usize,
    pub colours: bool,
    pub tangents: bool,
    /// Tangents carry a fourth (handedness) component
    pub tangent_parity: bool,
    pub binormals: bool,
}

/// A vertex buffer plus its attribute flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Geometry {
    pub elements: VertexElements,
    pub vertices: Vec<Vertex>,
}

impl Geometry {
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Sparse per-vertex offset of a shape-key pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PoseOffset {
    pub index: u32,
    pub offset: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pose {
    pub name: String,
    pub offsets: Vec<PoseOffset>,
}

/// A triangle list drawn with one material.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Submesh {
    pub material: String,
    pub uses_shared_vertices: bool,
    pub faces: Vec<[u32; 3]>,
    /// Own vertex buffer; `None` when `uses_shared_vertices` is set
    pub geometry: Option<Geometry>,
    pub poses: Vec<Pose>,
}

/// A complete mesh document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Mesh {
    pub shared_geometry: Option<Geometry>,
    pub submeshes: Vec<Submesh>,
    /// File name of the linked skeleton, e.g. `"hero.skeleton"`
    pub skeleton_link: Option<String>,
}

impl Mesh {
    /// The vertex buffer submesh `index` draws from.
    pub fn geometry_for(&self, index: usize) -> Option<&Geometry> {
        let submesh = self.submeshes.get(index)?;
        if submesh.uses_shared_vertices {
            self.shared_geometry.as_ref()
        } else {
            submesh.geometry.as_ref()
        }
    }

    /// Check that every face index addresses a vertex in its geometry.
    pub fn validate(&self) -> Result<(), FormatError> {
        for (s, submesh) in self.submeshes.iter().enumerate() {
            let count = match self.geometry_for(s) {
                Some(geometry) => geometry.len(),
                None if submesh.uses_shared_vertices => {
                    return Err(FormatError::MissingSharedGeometry(s));
                }
                None => 0,
            };
            for (f, face) in submesh.faces.iter().enumerate() {
                if let Some(&index) = face.iter().find(|&&i| i as usize >= count) {
                    return Err(FormatError::FaceIndexOutOfRange {
                        submesh: s,
                        face: f,
                        index,
                        count,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn total_faces(&self) -> usize {
        self.submeshes.iter().map(|s| s.faces.len()).sum()
    }
}
