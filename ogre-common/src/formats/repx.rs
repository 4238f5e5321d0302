//! PhysX 3 RepX collision documents
//!
//! One `PhysXCollection` holding the referenced convex/triangle mesh blocks,
//! a single shared material and one actor whose `Shapes` list carries every
//! collision shape. Mesh blocks are keyed by a content id so identical
//! geometry is written once.

use glam::Vec3;
use hashbrown::HashSet;
use xmltree::Element;
use xxhash_rust::xxh3::xxh3_64;

use super::xml::{ElementExt, ToXml, element, fmt_fixed, fmt_fixed3};
use crate::FormatError;
use crate::model::{CollisionBody, CollisionGeometry, CollisionShape, LocalPose, MeshData};

pub const ROOT: &str = "PhysXCollection";
pub const VERSION: &str = "3.4.0";

/// Id of the single material every shape references.
pub const MATERIAL_ID: u64 = 1_893_755_024;

const SHAPE_FLAGS: &str = "eSIMULATION_SHAPE|eSCENE_QUERY_SHAPE|eVISUALIZATION";
const SIMULATION_FILTER_DATA: &str = "65537";

/// Content-derived id: 64-bit xxh3 with the top bit cleared so it also fits a
/// signed 64-bit reader.
pub fn content_id(text: &str) -> u64 {
    xxh3_64(text.as_bytes()) & 0x7fff_ffff_ffff_ffff
}

/// `"x y z x y z ..."` with shortest float formatting.
pub fn format_points(points: &[Vec3]) -> String {
    points
        .iter()
        .map(|p| format!("{} {} {}", p.x, p.y, p.z))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_triangles(triangles: &[[u32; 3]]) -> String {
    triangles
        .iter()
        .flatten()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Quaternion xyzw, two spaces, then position.
pub fn format_pose(pose: &LocalPose) -> String {
    let q = pose.rotation;
    let p = pose.position;
    format!(
        "{} {} {} {}  {}",
        fmt_fixed(q.x),
        fmt_fixed(q.y),
        fmt_fixed(q.z),
        fmt_fixed(q.w),
        fmt_fixed3(p)
    )
}

fn text_element(name: &str, text: impl Into<String>) -> Element {
    element(name).with_text(text)
}

/// A collision body written as a RepX collection.
pub struct RepxDocument<'a> {
    pub body: &'a CollisionBody,
}

impl<'a> RepxDocument<'a> {
    pub fn new(body: &'a CollisionBody) -> Self {
        Self { body }
    }
}

impl ToXml for RepxDocument<'_> {
    fn to_element(&self) -> Result<Element, FormatError> {
        let mut root = element(ROOT).with_attr("version", VERSION);

        let mut written = HashSet::new();
        for shape in &self.body.shapes {
            match &shape.geometry {
                CollisionGeometry::ConvexHull { id, mesh } if written.insert(*id) => {
                    root.push_child(
                        element("PxConvexMesh")
                            .with_child(text_element("Id", id.to_string()))
                            .with_child(text_element("Points", format_points(&mesh.points))),
                    );
                }
                CollisionGeometry::TriangleMesh { id, mesh } if written.insert(*id) => {
                    root.push_child(triangle_mesh_element(*id, mesh));
                }
                _ => {}
            }
        }

        root.push_child(material_element());

        let actor_kind = if self.body.dynamic {
            "PxRigidDynamic"
        } else {
            "PxRigidStatic"
        };
        let mut shapes = element("Shapes");
        for shape in &self.body.shapes {
            shapes.push_child(shape_element(shape));
        }
        root.push_child(
            element(actor_kind)
                .with_child(text_element("Id", content_id(&self.body.name).to_string()))
                .with_child(text_element("Name", self.body.name.as_str()))
                .with_child(text_element("ActorFlags", "eVISUALIZATION"))
                .with_child(text_element("GlobalPose", "0 0 0 1 0 0 0"))
                .with_child(shapes),
        );

        Ok(root)
    }
}

fn triangle_mesh_element(id: u64, mesh: &MeshData) -> Element {
    element("PxBVH33TriangleMesh")
        .with_child(text_element("Id", id.to_string()))
        .with_child(text_element("Points", format_points(&mesh.points)))
        .with_child(text_element("Triangles", format_triangles(&mesh.triangles)))
}

fn material_element() -> Element {
    element("PxMaterial")
        .with_child(text_element("Id", MATERIAL_ID.to_string()))
        .with_child(text_element("DynamicFriction", "0.3"))
        .with_child(text_element("StaticFriction", "0.3"))
        .with_child(text_element("Restitution", "0.5"))
        .with_child(text_element("FrictionCombineMode", "eAVERAGE"))
        .with_child(text_element("RestitutionCombineMode", "eAVERAGE"))
}

fn shape_element(shape: &CollisionShape) -> Element {
    let geometry = match &shape.geometry {
        CollisionGeometry::Box { half_extents } => element("PxBoxGeometry")
            .with_child(text_element("HalfExtents", fmt_fixed3(*half_extents))),
        CollisionGeometry::Sphere { radius } => {
            element("PxSphereGeometry").with_child(text_element("Radius", fmt_fixed(*radius)))
        }
        CollisionGeometry::Capsule {
            radius,
            half_height,
        } => element("PxCapsuleGeometry")
            .with_child(text_element("Radius", fmt_fixed(*radius)))
            .with_child(text_element("HalfHeight", fmt_fixed(*half_height))),
        CollisionGeometry::ConvexHull { id, .. } => element("PxConvexMeshGeometry")
            .with_child(unit_scale())
            .with_child(text_element("ConvexMesh", id.to_string())),
        CollisionGeometry::TriangleMesh { id, .. } => element("PxTriangleMeshGeometry")
            .with_child(unit_scale())
            .with_child(text_element("TriangleMesh", id.to_string())),
    };

    element("PxShape")
        .with_child(text_element("LocalPose", format_pose(&shape.pose)))
        .with_child(text_element("SimulationFilterData", SIMULATION_FILTER_DATA))
        .with_child(text_element("ContactOffset", "1"))
        .with_child(text_element("RestOffset", "0"))
        .with_child(text_element("Flags", SHAPE_FLAGS))
        .with_child(text_element("Name", shape.source.as_str()))
        .with_child(
            element("Materials").with_child(text_element("PxMaterialRef", MATERIAL_ID.to_string())),
        )
        .with_child(element("Geometry").with_child(geometry))
}

fn unit_scale() -> Element {
    element("Scale")
        .with_child(text_element("Scale", "1 1 1"))
        .with_child(text_element("Rotation", "0 0 0 1"))
}
