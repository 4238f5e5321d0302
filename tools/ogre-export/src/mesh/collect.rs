//! Host objects → submeshes
//!
//! Polygons are fan-triangulated, every triangle corner becomes a candidate
//! vertex and the [`VertexTable`] folds identical corners together. Vertex
//! data stays in source space; the mesh codec converts on write.

use glam::{Mat3, Vec2, Vec3, Vec4};
use ogre_common::Warning;
use ogre_common::model::{
    BoneIdTable, Geometry, Pose, PoseOffset, Submesh, Vertex, VertexElements,
};

use super::tangents::{binormal, corner_tangents};
use super::vertex_table::VertexTable;
use super::weights::vertex_weights;
use crate::config::ExportConfig;
use crate::error::InvariantViolation;
use crate::host::{HostLoop, HostMesh, HostObject};

/// Which attributes to gather, derived from [`ExportConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectOptions {
    pub apply_transform: bool,
    pub evaluated: bool,
    pub tangents: bool,
    pub binormals: bool,
    pub colours: bool,
    pub poses: bool,
    pub renormalize: bool,
}

impl CollectOptions {
    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            apply_transform: config.apply_transform,
            evaluated: config.apply_modifiers,
            tangents: config.export_tangents,
            binormals: config.export_binormals,
            colours: config.export_vertex_colour,
            poses: config.export_poses,
            renormalize: config.renormalize_bone_weights,
        }
    }
}

/// Fan-triangulate every polygon.
///
/// Polygons with fewer than three corners, or with corners pointing past the
/// vertex list, are skipped with one warning per object.
pub fn triangulate<'a>(
    object: &str,
    mesh: &'a HostMesh,
    warnings: &mut Vec<Warning>,
) -> Vec<(usize, Vec<&'a HostLoop>)> {
    let mut degenerate = 0usize;
    let mut broken = 0usize;
    let mut out = Vec::with_capacity(mesh.polygons.len());

    for (index, polygon) in mesh.polygons.iter().enumerate() {
        let loops = &polygon.loops;
        if loops.len() < 3 {
            degenerate += 1;
            continue;
        }
        if loops.iter().any(|l| l.vertex as usize >= mesh.vertices.len()) {
            broken += 1;
            continue;
        }
        for i in 1..loops.len() - 1 {
            out.push((index, vec![&loops[0], &loops[i], &loops[i + 1]]));
        }
    }

    if degenerate > 0 {
        warnings.push(Warning::unsupported(format!(
            "'{}': skipped {} polygons with fewer than 3 corners",
            object, degenerate
        )));
    }
    if broken > 0 {
        warnings.push(Warning::malformed(format!(
            "'{}': skipped {} polygons referencing missing vertices",
            object, broken
        )));
    }
    out
}

/// The triangle writer's entry check.
fn as_triangle<'a>(
    object: &str,
    polygon: usize,
    corners: &[&'a HostLoop],
) -> Result<[&'a HostLoop; 3], InvariantViolation> {
    <[&HostLoop; 3]>::try_from(corners).map_err(|_| InvariantViolation::NotATriangle {
        object: object.to_string(),
        polygon,
        corners: corners.len(),
    })
}

/// Build one submesh from `object`.
///
/// Returns `Ok(None)` (with a warning) when the object has nothing to export.
/// Bone weights are only gathered when `bones` is given.
pub fn collect_submesh(
    object: &HostObject,
    bones: Option<&BoneIdTable>,
    options: &CollectOptions,
    warnings: &mut Vec<Warning>,
) -> Result<Option<Submesh>, InvariantViolation> {
    let Some(mesh) = object.mesh_data(options.evaluated) else {
        warnings.push(Warning::unsupported(format!(
            "'{}' has no mesh data, skipped",
            object.name
        )));
        return Ok(None);
    };

    let polygons = triangulate(&object.name, mesh, warnings);
    let triangles = polygons
        .iter()
        .map(|(index, corners)| as_triangle(&object.name, *index, corners))
        .collect::<Result<Vec<_>, _>>()?;
    if triangles.is_empty() {
        warnings.push(Warning::unsupported(format!(
            "'{}' has no faces, skipped",
            object.name
        )));
        return Ok(None);
    }

    let has_uvs = mesh.has_uvs();
    let tangents_on = options.tangents && has_uvs;
    let binormals_on = tangents_on && options.binormals;
    let colours_on = options.colours && mesh.has_colours();

    let tangents = tangents_on.then(|| corner_tangents(mesh, &triangles));
    let weights = bones.map(|table| {
        vertex_weights(mesh, &object.vertex_groups, table, options.renormalize, warnings)
    });

    // Rotation and scale only; the normal matrix keeps normals perpendicular
    let transform = options.apply_transform.then(|| {
        let m = Mat3::from_mat4(object.world_matrix);
        (m, m.inverse().transpose())
    });

    let mut table = VertexTable::new();
    let mut faces = Vec::with_capacity(triangles.len());
    for (t, tri) in triangles.iter().enumerate() {
        let mut face = [0u32; 3];
        for (k, corner) in tri.iter().enumerate() {
            let source = corner.vertex as usize;
            let mut position = mesh.vertices[source].co;
            let mut normal = corner.normal;
            let mut tangent = tangents.as_ref().map(|ts| ts[t][k]);

            if let Some((m, n)) = transform {
                position = m * position;
                normal = (n * normal).normalize_or_zero();
                tangent = tangent.map(|tg| (m * tg.truncate()).normalize_or_zero().extend(tg.w));
            }

            let vertex = Vertex {
                position,
                normal,
                uvs: if has_uvs {
                    vec![corner.uv.unwrap_or(Vec2::ZERO)]
                } else {
                    Vec::new()
                },
                colour: if colours_on {
                    corner_colour(corner)
                } else {
                    Vec4::ONE
                },
                tangent,
                binormal: if binormals_on {
                    tangent.map(|tg| binormal(normal, tg))
                } else {
                    None
                },
                bone_weights: weights
                    .as_ref()
                    .map(|w| w[source].clone())
                    .unwrap_or_default(),
                source_index: Some(corner.vertex),
            };
            face[k] = table.intern(vertex);
        }
        faces.push(face);
    }

    let vertices = table.into_vertices();
    let elements = VertexElements {
        normals: true,
        texcoord_sets: usize::from(has_uvs),
        colours: colours_on,
        tangents: tangents_on,
        tangent_parity: tangents_on
            && !binormals_on
            && vertices.iter().any(|v| v.tangent.is_some_and(|t| t.w < 0.0)),
        binormals: binormals_on,
    };

    let poses = if options.poses {
        collect_poses(mesh, &vertices, transform.map(|(m, _)| m), warnings)
    } else {
        Vec::new()
    };

    tracing::debug!(
        "'{}': {} triangles, {} unique vertices",
        object.name,
        faces.len(),
        vertices.len()
    );

    Ok(Some(Submesh {
        material: material_name(object),
        uses_shared_vertices: false,
        faces,
        geometry: Some(Geometry { elements, vertices }),
        poses,
    }))
}

/// Object name, overridden by the last non-empty material slot.
pub fn material_name(object: &HostObject) -> String {
    object
        .material_slots
        .iter()
        .rev()
        .find(|slot| !slot.is_empty())
        .cloned()
        .unwrap_or_else(|| object.name.clone())
}

fn corner_colour(corner: &HostLoop) -> Vec4 {
    let rgb = corner.colour.map_or(Vec3::ONE, |c| c.truncate());
    rgb.extend(corner.alpha.unwrap_or(1.0))
}

/// Sparse offsets of every shape key against its relative key.
fn collect_poses(
    mesh: &HostMesh,
    vertices: &[Vertex],
    transform: Option<Mat3>,
    warnings: &mut Vec<Warning>,
) -> Vec<Pose> {
    let mut poses = Vec::new();
    for key in &mesh.shape_keys {
        let Some(relative_name) = &key.relative_key else {
            continue;
        };
        let Some(relative) = mesh.shape_key(relative_name) else {
            warnings.push(Warning::malformed(format!(
                "shape key '{}' is relative to missing key '{}'",
                key.name, relative_name
            )));
            continue;
        };

        let offsets: Vec<PoseOffset> = vertices
            .iter()
            .enumerate()
            .filter_map(|(index, vertex)| {
                let source = vertex.source_index? as usize;
                let mut offset = *key.coords.get(source)? - *relative.coords.get(source)?;
                if offset == Vec3::ZERO {
                    return None;
                }
                if let Some(m) = transform {
                    offset = m * offset;
                }
                Some(PoseOffset {
                    index: index as u32,
                    offset,
                })
            })
            .collect();

        if !offsets.is_empty() {
            poses.push(Pose {
                name: key.name.clone(),
                offsets,
            });
        }
    }
    poses
}
