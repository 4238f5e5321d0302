//! `.mesh.xml` codec
//!
//! Layout (the subset Ogre's XML converter reads):
//! ```text
//! <mesh>
//!   <sharedgeometry vertexcount=N> <vertexbuffer ..> .. </sharedgeometry>
//!   <submeshes>
//!     <submesh material usesharedvertices use32bitindexes operationtype>
//!       <faces count=N> <face v1 v2 v3/> </faces>
//!       <geometry vertexcount=N> <vertexbuffer ..> <vertex> .. </vertex> </vertexbuffer> </geometry>
//!       <boneassignments> <vertexboneassignment vertexindex boneindex weight/> </boneassignments>
//!     </submesh>
//!   </submeshes>
//!   <skeletonlink name/>
//!   <boneassignments/>            (shared geometry only)
//!   <poses> <pose target="submesh" index name> <poseoffset index x y z/> </pose> </poses>
//! </mesh>
//! ```
//!
//! In-memory geometry is source space; positions, normals, tangents,
//! binormals and pose offsets are converted on the way in and out, and V is
//! flipped.

use std::io::Read;

use glam::{Vec2, Vec3, Vec4};
use hashbrown::HashSet;
use xmltree::Element;

use super::xml::{ElementExt, ToXml, element, fmt_general, fmt_rounded, parse_document};
use crate::math::{to_source_space, to_target_space, uv_flip};
use crate::model::{BoneIdTable, Geometry, Mesh, Pose, PoseOffset, Submesh, Vertex, VertexElements};
use crate::{FormatError, Warning};

pub const ROOT: &str = "mesh";

/// Vertex count above which faces need 32-bit indices.
pub const MAX_16BIT_VERTICES: usize = 65535;

/// A mesh paired with the bone table used to write its bone assignments.
///
/// Without a table no `<boneassignments>` are written.
pub struct MeshXml<'a> {
    pub mesh: &'a Mesh,
    pub bones: Option<&'a BoneIdTable>,
}

impl<'a> MeshXml<'a> {
    pub fn new(mesh: &'a Mesh, bones: Option<&'a BoneIdTable>) -> Self {
        Self { mesh, bones }
    }
}

impl ToXml for MeshXml<'_> {
    fn to_element(&self) -> Result<Element, FormatError> {
        self.mesh.validate()?;

        let mut root = element(ROOT);

        if let Some(shared) = &self.mesh.shared_geometry {
            root.push_child(write_geometry("sharedgeometry", shared));
        }

        let mut submeshes = element("submeshes");
        for submesh in &self.mesh.submeshes {
            submeshes.push_child(self.write_submesh(submesh)?);
        }
        root.push_child(submeshes);

        if let Some(link) = &self.mesh.skeleton_link {
            root.push_child(element("skeletonlink").with_attr("name", link));
        }

        if let (Some(shared), Some(bones)) = (&self.mesh.shared_geometry, self.bones) {
            root.push_child(write_bone_assignments(shared, bones)?);
        }

        let poses = write_poses(&self.mesh.submeshes);
        if !poses.children.is_empty() {
            root.push_child(poses);
        }

        Ok(root)
    }
}

impl MeshXml<'_> {
    fn write_submesh(&self, submesh: &Submesh) -> Result<Element, FormatError> {
        let vertex_count = if submesh.uses_shared_vertices {
            self.mesh.shared_geometry.as_ref().map_or(0, Geometry::len)
        } else {
            submesh.geometry.as_ref().map_or(0, Geometry::len)
        };

        let mut el = element("submesh")
            .with_attr("material", &submesh.material)
            .with_attr("usesharedvertices", submesh.uses_shared_vertices)
            .with_attr("use32bitindexes", vertex_count > MAX_16BIT_VERTICES)
            .with_attr("operationtype", "triangle_list");

        let mut faces = element("faces").with_attr("count", submesh.faces.len());
        for face in &submesh.faces {
            faces.push_child(
                element("face")
                    .with_attr("v1", face[0])
                    .with_attr("v2", face[1])
                    .with_attr("v3", face[2]),
            );
        }
        el.push_child(faces);

        if let (false, Some(geometry)) = (submesh.uses_shared_vertices, &submesh.geometry) {
            el.push_child(write_geometry("geometry", geometry));
            if let Some(bones) = self.bones {
                el.push_child(write_bone_assignments(geometry, bones)?);
            }
        }

        Ok(el)
    }
}

fn write_geometry(name: &str, geometry: &Geometry) -> Element {
    let flags = geometry.elements;
    let mut buffer = element("vertexbuffer").with_attr("positions", true);
    if flags.normals {
        buffer = buffer.with_attr("normals", true);
    }
    if flags.colours {
        buffer = buffer.with_attr("colours_diffuse", true);
    }
    if flags.texcoord_sets > 0 {
        buffer = buffer.with_attr("texture_coords", flags.texcoord_sets);
        for set in 0..flags.texcoord_sets {
            buffer = buffer.with_attr(&format!("texture_coord_dimensions_{}", set), 2);
        }
    }
    if flags.tangents {
        let dims = if flags.tangent_parity { 4 } else { 3 };
        buffer = buffer
            .with_attr("tangents", true)
            .with_attr("tangent_dimensions", dims);
    }
    if flags.binormals {
        buffer = buffer.with_attr("binormals", true);
    }

    for vertex in &geometry.vertices {
        buffer.push_child(write_vertex(vertex, flags));
    }

    element(name)
        .with_attr("vertexcount", geometry.len())
        .with_child(buffer)
}

fn write_vertex(vertex: &Vertex, flags: VertexElements) -> Element {
    let mut el = element("vertex").with_child(vec3_element("position", to_target_space(vertex.position)));

    if flags.normals {
        el.push_child(vec3_element("normal", to_target_space(vertex.normal)));
    }
    if flags.tangents {
        let t = vertex.tangent.unwrap_or(Vec4::new(1.0, 0.0, 0.0, 1.0));
        let mut tangent = vec3_element("tangent", to_target_space(t.truncate()));
        if flags.tangent_parity {
            tangent = tangent.with_attr("w", fmt_rounded(t.w));
        }
        el.push_child(tangent);
    }
    if flags.binormals {
        let b = vertex.binormal.unwrap_or(Vec3::ZERO);
        el.push_child(vec3_element("binormal", to_target_space(b)));
    }
    if flags.colours {
        let c = vertex.colour;
        let value = format!(
            "{} {} {} {}",
            fmt_general(c.x),
            fmt_general(c.y),
            fmt_general(c.z),
            fmt_general(c.w)
        );
        el.push_child(element("colour_diffuse").with_attr("value", value));
    }
    for set in 0..flags.texcoord_sets {
        let uv = uv_flip(vertex.uvs.get(set).copied().unwrap_or(Vec2::ZERO));
        el.push_child(
            element("texcoord")
                .with_attr("u", fmt_rounded(uv.x))
                .with_attr("v", fmt_rounded(uv.y)),
        );
    }
    el
}

fn vec3_element(name: &str, v: Vec3) -> Element {
    element(name)
        .with_attr("x", fmt_rounded(v.x))
        .with_attr("y", fmt_rounded(v.y))
        .with_attr("z", fmt_rounded(v.z))
}

fn write_bone_assignments(geometry: &Geometry, bones: &BoneIdTable) -> Result<Element, FormatError> {
    let mut el = element("boneassignments");
    for (index, vertex) in geometry.vertices.iter().enumerate() {
        for (bone, weight) in &vertex.bone_weights {
            let id = bones
                .id_of(bone)
                .ok_or_else(|| FormatError::UnknownBone(bone.clone()))?;
            el.push_child(
                element("vertexboneassignment")
                    .with_attr("vertexindex", index)
                    .with_attr("boneindex", id)
                    .with_attr("weight", fmt_rounded(*weight)),
            );
        }
    }
    Ok(el)
}

fn write_poses(submeshes: &[Submesh]) -> Element {
    let mut poses = element("poses");
    for (index, submesh) in submeshes.iter().enumerate() {
        for pose in &submesh.poses {
            let mut el = element("pose")
                .with_attr("target", "submesh")
                .with_attr("index", index)
                .with_attr("name", &pose.name);
            for offset in &pose.offsets {
                let v = to_target_space(offset.offset);
                el.push_child(
                    element("poseoffset")
                        .with_attr("index", offset.index)
                        .with_attr("x", fmt_rounded(v.x))
                        .with_attr("y", fmt_rounded(v.y))
                        .with_attr("z", fmt_rounded(v.z)),
                );
            }
            poses.push_child(el);
        }
    }
    poses
}

// ============================================================================
// Reading
// ============================================================================

/// Parse a `.mesh.xml` document.
///
/// Bone indices resolve through `bones`; indices with no known bone become
/// `"Group N"`.
pub fn read_mesh<R: Read>(
    reader: R,
    bones: Option<&BoneIdTable>,
    warnings: &mut Vec<Warning>,
) -> Result<Mesh, FormatError> {
    let root = parse_document(reader, ROOT)?;
    parse_mesh(&root, bones, warnings)
}

/// The `<skeletonlink>` name of a parsed document, if any.
pub fn skeleton_link(root: &Element) -> Option<String> {
    root.get_child("skeletonlink")
        .and_then(|e| e.attr_opt("name"))
        .map(str::to_string)
}

pub fn parse_mesh(
    root: &Element,
    bones: Option<&BoneIdTable>,
    warnings: &mut Vec<Warning>,
) -> Result<Mesh, FormatError> {
    let mut resolver = BoneResolver::new(bones);

    let mut mesh = Mesh {
        skeleton_link: skeleton_link(root),
        ..Default::default()
    };

    if let Some(shared) = root.get_child("sharedgeometry") {
        let mut geometry = read_geometry(shared, warnings)?;
        if let Some(assignments) = root.get_child("boneassignments") {
            read_bone_assignments(assignments, &mut geometry, &mut resolver, warnings)?;
        }
        mesh.shared_geometry = Some(geometry);
    }

    if let Some(submeshes) = root.get_child("submeshes") {
        for (index, el) in submeshes.elements_named("submesh").enumerate() {
            mesh.submeshes
                .push(read_submesh(index, el, &mut resolver, warnings)?);
        }
    }

    if let Some(poses) = root.get_child("poses") {
        read_poses(poses, &mut mesh, warnings)?;
    }

    drop_invalid_faces(&mut mesh, warnings);
    Ok(mesh)
}

/// Remove faces that index past their vertex buffer, one warning per face.
fn drop_invalid_faces(mesh: &mut Mesh, warnings: &mut Vec<Warning>) {
    let shared = mesh.shared_geometry.as_ref().map_or(0, |g| g.len());
    for (s, submesh) in mesh.submeshes.iter_mut().enumerate() {
        let count = if submesh.uses_shared_vertices {
            shared
        } else {
            submesh.geometry.as_ref().map_or(0, |g| g.len())
        };
        let mut f = 0;
        submesh.faces.retain(|face| {
            let bad = face.iter().find(|&&i| i as usize >= count).copied();
            if let Some(index) = bad {
                warnings.push(Warning::malformed(format!(
                    "submesh {} face {} references vertex {} of {}, dropped",
                    s, f, index, count
                )));
            }
            f += 1;
            bad.is_none()
        });
    }
}

fn read_submesh(
    index: usize,
    el: &Element,
    resolver: &mut BoneResolver<'_>,
    warnings: &mut Vec<Warning>,
) -> Result<Submesh, FormatError> {
    let mut submesh = Submesh {
        material: el.attr_opt("material").unwrap_or_default().to_string(),
        uses_shared_vertices: el.attr_opt("usesharedvertices").is_some_and(parse_bool),
        ..Default::default()
    };

    if let Some(faces) = el.get_child("faces") {
        for face in faces.elements_named("face") {
            submesh.faces.push([
                face.attr_parse("v1")?,
                face.attr_parse("v2")?,
                face.attr_parse("v3")?,
            ]);
        }
        if let Some(count) = faces.attr_opt("count").and_then(|c| c.trim().parse::<usize>().ok()) {
            if count != submesh.faces.len() {
                warnings.push(Warning::malformed(format!(
                    "submesh {} declares {} faces but contains {}",
                    index,
                    count,
                    submesh.faces.len()
                )));
            }
        }
    }

    if let Some(geometry) = el.get_child("geometry") {
        let mut geometry = read_geometry(geometry, warnings)?;
        if let Some(assignments) = el.get_child("boneassignments") {
            read_bone_assignments(assignments, &mut geometry, resolver, warnings)?;
        }
        submesh.geometry = Some(geometry);
    }

    Ok(submesh)
}

fn read_geometry(el: &Element, warnings: &mut Vec<Warning>) -> Result<Geometry, FormatError> {
    let mut geometry = Geometry::default();

    for buffer in el.elements_named("vertexbuffer") {
        let uv_base = geometry.elements.texcoord_sets;
        let flags = &mut geometry.elements;
        flags.normals |= buffer.attr_opt("normals").is_some_and(parse_bool);
        flags.colours |= buffer.attr_opt("colours_diffuse").is_some_and(parse_bool);
        flags.tangents |= buffer.attr_opt("tangents").is_some_and(parse_bool);
        flags.binormals |= buffer.attr_opt("binormals").is_some_and(parse_bool);
        if buffer.attr_parse_or("tangent_dimensions", 3u32)? == 4 {
            flags.tangent_parity = true;
        }
        flags.texcoord_sets += buffer.attr_parse_or("texture_coords", 0usize)?;

        for (i, vertex_el) in buffer.elements_named("vertex").enumerate() {
            if geometry.vertices.len() <= i {
                geometry.vertices.resize_with(i + 1, Vertex::default);
            }
            read_vertex(vertex_el, &mut geometry.vertices[i], uv_base)?;
        }
    }

    if let Some(declared) = el.attr_opt("vertexcount").and_then(|c| c.trim().parse::<usize>().ok()) {
        if declared != geometry.len() {
            warnings.push(Warning::malformed(format!(
                "<{}> declares {} vertices but contains {}",
                el.name,
                declared,
                geometry.len()
            )));
        }
    }

    Ok(geometry)
}

fn read_vertex(el: &Element, vertex: &mut Vertex, uv_base: usize) -> Result<(), FormatError> {
    let mut uv_set = uv_base;
    for child in el.elements() {
        match child.name.as_str() {
            "position" => vertex.position = to_source_space(read_vec3(child)?),
            "normal" => vertex.normal = to_source_space(read_vec3(child)?),
            "tangent" => {
                let t = to_source_space(read_vec3(child)?);
                let w = child.attr_parse_or("w", 1.0f32)?;
                vertex.tangent = Some(t.extend(w));
            }
            "binormal" => vertex.binormal = Some(to_source_space(read_vec3(child)?)),
            "colour_diffuse" => vertex.colour = read_colour(child)?,
            "texcoord" => {
                let uv = uv_flip(Vec2::new(child.attr_parse("u")?, child.attr_parse("v")?));
                if vertex.uvs.len() <= uv_set {
                    vertex.uvs.resize(uv_set + 1, Vec2::ZERO);
                }
                vertex.uvs[uv_set] = uv;
                uv_set += 1;
            }
            _ => {}
        }
    }
    Ok(())
}

fn read_vec3(el: &Element) -> Result<Vec3, FormatError> {
    Ok(Vec3::new(
        el.attr_parse("x")?,
        el.attr_parse("y")?,
        el.attr_parse("z")?,
    ))
}

fn read_colour(el: &Element) -> Result<Vec4, FormatError> {
    let raw = el.attr("value")?;
    let parts: Result<Vec<f32>, _> = raw.split_whitespace().map(str::parse).collect();
    match parts.as_deref() {
        Ok([r, g, b]) => Ok(Vec4::new(*r, *g, *b, 1.0)),
        Ok([r, g, b, a, ..]) => Ok(Vec4::new(*r, *g, *b, *a)),
        _ => Err(FormatError::InvalidAttribute {
            element: el.name.clone(),
            attribute: "value",
            value: raw.to_string(),
        }),
    }
}

/// Resolves bone indices to names, warning once per unknown index.
struct BoneResolver<'a> {
    bones: Option<&'a BoneIdTable>,
    reported: HashSet<u32>,
}

impl<'a> BoneResolver<'a> {
    fn new(bones: Option<&'a BoneIdTable>) -> Self {
        Self {
            bones,
            reported: HashSet::new(),
        }
    }

    fn resolve(&mut self, index: u32, warnings: &mut Vec<Warning>) -> String {
        if let Some(name) = self.bones.and_then(|t| t.name_of(index)) {
            return name.to_string();
        }
        if self.reported.insert(index) {
            warnings.push(Warning::malformed(format!(
                "bone index {} has no bone in the linked skeleton, using 'Group {}'",
                index, index
            )));
        }
        format!("Group {}", index)
    }
}

fn read_bone_assignments(
    el: &Element,
    geometry: &mut Geometry,
    resolver: &mut BoneResolver<'_>,
    warnings: &mut Vec<Warning>,
) -> Result<(), FormatError> {
    let mut out_of_range = 0usize;
    for va in el.elements_named("vertexboneassignment") {
        let vertex: usize = va.attr_parse("vertexindex")?;
        let bone: u32 = va.attr_parse("boneindex")?;
        let weight: f32 = va.attr_parse_or("weight", 1.0)?;

        let name = resolver.resolve(bone, warnings);
        match geometry.vertices.get_mut(vertex) {
            Some(v) => v.bone_weights.push((name, weight)),
            None => out_of_range += 1,
        }
    }
    if out_of_range > 0 {
        warnings.push(Warning::malformed(format!(
            "{} bone assignments reference vertices outside the geometry",
            out_of_range
        )));
    }
    Ok(())
}

fn read_poses(el: &Element, mesh: &mut Mesh, warnings: &mut Vec<Warning>) -> Result<(), FormatError> {
    for pose_el in el.elements_named("pose") {
        let name = pose_el.attr_opt("name").unwrap_or_default().to_string();
        let target = pose_el.attr_opt("target").unwrap_or("submesh");
        if target != "submesh" {
            warnings.push(Warning::unsupported(format!(
                "pose '{}' targets '{}', only submesh poses are read",
                name, target
            )));
            continue;
        }

        let index: usize = pose_el.attr_parse_or("index", 0)?;
        let Some(submesh) = mesh.submeshes.get_mut(index) else {
            warnings.push(Warning::malformed(format!(
                "pose '{}' targets missing submesh {}",
                name, index
            )));
            continue;
        };

        let mut pose = Pose {
            name,
            offsets: Vec::new(),
        };
        for offset in pose_el.elements_named("poseoffset") {
            pose.offsets.push(PoseOffset {
                index: offset.attr_parse("index")?,
                offset: to_source_space(read_vec3(offset)?),
            });
        }
        submesh.poses.push(pose);
    }
    Ok(())
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

#[cfg(test)]
mod tests;
