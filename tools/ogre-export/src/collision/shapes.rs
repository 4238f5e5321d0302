//! Host rigid bodies → collision shapes
//!
//! Primitive sizes come from the object's local bounding box times the scale
//! factored out of its world matrix; the emitted pose keeps only rotation and
//! translation. Collision documents stay in the editor's Z-up space.

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Vec3};
use ogre_common::Warning;
use ogre_common::formats::repx::{content_id, format_points};
use ogre_common::math::{Decomposed, decompose_trs};
use ogre_common::model::{CollisionGeometry, CollisionShape, LocalPose, MeshData};
use tracing::debug;

use super::hull::convex_hull;
use crate::config::CollisionFormat;
use crate::host::{HostMesh, HostObject, MeshSource, ShapeKind};
use crate::mesh::collect::triangulate;

/// Scale components closer than this to 1 count as unscaled.
const UNIT_SCALE_EPSILON: f32 = 1e-4;

/// Turns the editor's Z-length capsule onto the writer's capsule axis.
pub fn capsule_axis_fix(format: CollisionFormat) -> Mat4 {
    match format {
        // PhysX 3 capsules run along X
        CollisionFormat::Repx => Mat4::from_rotation_y(FRAC_PI_2),
        CollisionFormat::Nxustream => Mat4::from_rotation_x(FRAC_PI_2),
    }
}

fn pose_of(d: &Decomposed) -> LocalPose {
    LocalPose {
        rotation: d.rotation,
        position: d.translation,
    }
}

/// Build the collision shape for one object, or `None` (with a warning) when
/// it cannot be represented.
pub fn build_shape(
    object: &HostObject,
    root: Mat4,
    format: CollisionFormat,
    warnings: &mut Vec<Warning>,
) -> Option<CollisionShape> {
    let body = object.rigid_body.as_ref()?;
    let world = root * object.world_matrix;
    let d = decompose_trs(world);
    let size = object.bounds_size();
    let scale = d.scale.abs();

    let (pose, geometry) = match body.shape {
        ShapeKind::Box => (
            pose_of(&d),
            CollisionGeometry::Box {
                half_extents: size * scale * 0.5,
            },
        ),
        ShapeKind::Sphere => (
            pose_of(&d),
            CollisionGeometry::Sphere {
                radius: size.max_element() * scale.max_element(),
            },
        ),
        ShapeKind::Capsule => {
            let radius = 0.5 * (size.x * scale.x).abs().max((size.y * scale.y).abs());
            let height = (size.z * scale.z).abs() - 2.0 * radius;
            let fixed = decompose_trs(world * capsule_axis_fix(format));
            (
                pose_of(&fixed),
                CollisionGeometry::Capsule {
                    radius,
                    half_height: height * 0.5,
                },
            )
        }
        ShapeKind::ConvexHull => {
            let mesh = source_mesh(object, body.mesh_source, warnings)?;
            let points: Vec<Vec3> = mesh.vertices.iter().map(|v| v.co * d.scale).collect();
            let hull = match convex_hull(&points) {
                Ok(hull) => hull,
                Err(reason) => {
                    warnings.push(Warning::unsupported(format!(
                        "'{}': no convex hull ({:?}), writing its points unchanged",
                        object.name, reason
                    )));
                    MeshData {
                        points,
                        triangles: Vec::new(),
                    }
                }
            };
            debug!("'{}': hull of {} points", object.name, hull.points.len());
            let id = content_id(&format_points(&hull.points));
            (pose_of(&d), CollisionGeometry::ConvexHull { id, mesh: hull })
        }
        ShapeKind::Mesh => {
            let mesh = source_mesh(object, body.mesh_source, warnings)?;
            if (d.scale - Vec3::ONE).abs().max_element() > UNIT_SCALE_EPSILON {
                warnings.push(Warning::unsupported(format!(
                    "'{}': triangle mesh collision ignores scale {:?}",
                    object.name, d.scale
                )));
            }
            let transform = d.rotation_translation();
            let points: Vec<Vec3> = mesh
                .vertices
                .iter()
                .map(|v| transform.transform_point3(v.co))
                .collect();
            let triangles = triangulate(&object.name, mesh, warnings)
                .into_iter()
                .map(|(_, corners)| [corners[0].vertex, corners[1].vertex, corners[2].vertex])
                .collect();
            let id = content_id(&format_points(&points));
            (
                LocalPose::IDENTITY,
                CollisionGeometry::TriangleMesh {
                    id,
                    mesh: MeshData { points, triangles },
                },
            )
        }
        other => {
            warnings.push(Warning::unsupported(format!(
                "'{}' has unsupported collision shape {:?}",
                object.name, other
            )));
            return None;
        }
    };

    Some(CollisionShape {
        source: object.name.clone(),
        pose,
        geometry,
    })
}

fn source_mesh<'a>(
    object: &'a HostObject,
    source: MeshSource,
    warnings: &mut Vec<Warning>,
) -> Option<&'a HostMesh> {
    let mesh = object.mesh_data(source == MeshSource::Final);
    if mesh.is_none() {
        warnings.push(Warning::missing(format!(
            "'{}' has a mesh collision shape but no mesh data",
            object.name
        )));
    }
    mesh
}
