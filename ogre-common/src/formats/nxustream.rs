//! Legacy NXUSTREAM2 collision documents (PhysX 2.8)
//!
//! Every shape becomes its own `NxActorDesc` with an inline `globalPose`.
//! Convex and triangle meshes are written as collection-level descriptors
//! referenced by the source object's name.

use glam::Mat3;
use xmltree::Element;

use super::repx::{format_points, format_triangles};
use super::xml::{ElementExt, ToXml, element, fmt_fixed, fmt_fixed3};
use crate::FormatError;
use crate::model::{CollisionBody, CollisionGeometry, LocalPose, MeshData};

pub const ROOT: &str = "NXUSTREAM2";
pub const SDK_VERSION: &str = "284";
pub const NXU_VERSION: &str = "103";

/// Rotation rows, then translation; groups separated by two spaces.
pub fn format_global_pose(pose: &LocalPose) -> String {
    let m: Mat3 = pose.rotation_matrix();
    let row = |i: usize| {
        format!(
            "{} {} {}",
            fmt_fixed(m.col(0)[i]),
            fmt_fixed(m.col(1)[i]),
            fmt_fixed(m.col(2)[i])
        )
    };
    format!("{}  {}  {}  {}", row(0), row(1), row(2), fmt_fixed3(pose.position))
}

/// A collision body written as a PhysX 2.8 NXU stream.
pub struct NxuStreamDocument<'a> {
    pub body: &'a CollisionBody,
    /// Collection id; conventionally the output path
    pub collection_id: &'a str,
}

impl<'a> NxuStreamDocument<'a> {
    pub fn new(body: &'a CollisionBody, collection_id: &'a str) -> Self {
        Self {
            body,
            collection_id,
        }
    }
}

impl ToXml for NxuStreamDocument<'_> {
    fn to_element(&self) -> Result<Element, FormatError> {
        let mut scene = element("NxSceneDesc")
            .with_attr("id", "collision")
            .with_attr("hasMaxBounds", "false")
            .with_attr("hasLimits", "false")
            .with_attr("hasFilter", "false");
        let mut mesh_descs = Vec::new();

        for shape in &self.body.shapes {
            let mut actor = element("NxActorDesc")
                .with_attr("id", "name")
                .with_attr("name", &shape.source)
                .with_attr("hasBody", self.body.dynamic);

            // Triangle mesh points are already in actor space
            if !matches!(shape.geometry, CollisionGeometry::TriangleMesh { .. }) {
                actor.push_child(element("globalPose").with_text(format_global_pose(&shape.pose)));
            }

            let desc = match &shape.geometry {
                CollisionGeometry::Box { half_extents } => {
                    element("NxBoxShapeDesc").with_attr("dimensions", fmt_fixed3(*half_extents))
                }
                CollisionGeometry::Sphere { radius } => {
                    element("NxSphereShapeDesc").with_attr("radius", fmt_fixed(*radius))
                }
                CollisionGeometry::Capsule {
                    radius,
                    half_height,
                } => element("NxCapsuleShapeDesc")
                    .with_attr("radius", fmt_fixed(*radius))
                    .with_attr("height", fmt_fixed(half_height * 2.0)),
                CollisionGeometry::ConvexHull { mesh, .. } => {
                    let mut desc = element("NxConvexMeshDesc").with_attr("id", &shape.source);
                    push_mesh_data(&mut desc, mesh);
                    mesh_descs.push(desc);
                    element("NxConvexShapeDesc").with_attr("meshData", &shape.source)
                }
                CollisionGeometry::TriangleMesh { mesh, .. } => {
                    let mut simple = element("NxSimpleTriangleMesh");
                    push_mesh_data(&mut simple, mesh);
                    mesh_descs.push(
                        element("NxTriangleMeshDesc")
                            .with_attr("id", &shape.source)
                            .with_child(simple),
                    );
                    element("NxTriangleMeshShapeDesc").with_attr("meshData", &shape.source)
                }
            };
            actor.push_child(desc);
            scene.push_child(actor);
        }

        let mut collection = element("NxuPhysicsCollection")
            .with_attr("id", self.collection_id)
            .with_attr("sdkVersion", SDK_VERSION)
            .with_attr("nxuVersion", NXU_VERSION)
            .with_child(scene);
        for desc in mesh_descs {
            collection.push_child(desc);
        }

        Ok(element(ROOT).with_child(collection))
    }
}

fn push_mesh_data(parent: &mut Element, mesh: &MeshData) {
    parent.push_child(element("points").with_text(format_points(&mesh.points)));
    parent.push_child(element("triangles").with_text(format_triangles(&mesh.triangles)));
}
