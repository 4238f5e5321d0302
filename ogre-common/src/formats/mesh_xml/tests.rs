//! Tests for the mesh XML codec

use super::*;

fn quad_geometry() -> Geometry {
    let corners = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
    ];
    let vertices = corners
        .iter()
        .enumerate()
        .map(|(i, &p)| Vertex {
            position: p,
            normal: Vec3::Z,
            uvs: vec![Vec2::new(p.x, p.y)],
            colour: Vec4::new(1.0, 0.5, 0.25, 1.0),
            bone_weights: vec![("root".to_string(), 1.0 - i as f32 * 0.1)],
            ..Default::default()
        })
        .collect();
    Geometry {
        elements: VertexElements {
            normals: true,
            texcoord_sets: 1,
            colours: true,
            ..Default::default()
        },
        vertices,
    }
}

fn quad_mesh() -> Mesh {
    Mesh {
        submeshes: vec![Submesh {
            material: "Brick".into(),
            faces: vec![[0, 1, 2], [0, 2, 3]],
            geometry: Some(quad_geometry()),
            poses: vec![Pose {
                name: "Bulge".into(),
                offsets: vec![PoseOffset {
                    index: 2,
                    offset: Vec3::new(0.0, 0.0, 0.5),
                }],
            }],
            ..Default::default()
        }],
        skeleton_link: Some("quad.skeleton".into()),
        ..Default::default()
    }
}

fn bone_table() -> BoneIdTable {
    [("root".to_string(), 0)].into_iter().collect()
}

fn write(mesh: &Mesh, bones: Option<&BoneIdTable>) -> String {
    MeshXml::new(mesh, bones).to_xml_string().unwrap()
}

// ========================================================================
// Writing
// ========================================================================

#[test]
fn test_write_converts_to_y_up() {
    let mut mesh = quad_mesh();
    if let Some(g) = mesh.submeshes[0].geometry.as_mut() {
        g.vertices[0].position = Vec3::new(1.0, 2.0, 3.0);
    }
    let xml = write(&mesh, None);
    assert!(xml.contains(r#"<position x="1" y="3" z="-2""#), "{}", xml);
    // normal +Z (up) becomes +Y
    assert!(xml.contains(r#"<normal x="0" y="1" z="0""#), "{}", xml);
}

#[test]
fn test_write_flips_v_and_formats_colour() {
    let xml = write(&quad_mesh(), None);
    assert!(xml.contains(r#"<texcoord u="1" v="0""#), "{}", xml);
    assert!(xml.contains(r#"<colour_diffuse value="1 0.5 0.25 1""#), "{}", xml);
}

#[test]
fn test_write_submesh_attributes() {
    let xml = write(&quad_mesh(), None);
    assert!(xml.contains(r#"material="Brick""#));
    assert!(xml.contains(r#"usesharedvertices="false""#));
    assert!(xml.contains(r#"use32bitindexes="false""#));
    assert!(xml.contains(r#"operationtype="triangle_list""#));
    assert!(xml.contains(r#"<faces count="2">"#));
    assert!(xml.contains(r#"<skeletonlink name="quad.skeleton""#));
}

#[test]
fn test_bone_assignments_need_a_table() {
    let without = write(&quad_mesh(), None);
    assert!(!without.contains("vertexboneassignment"));

    let table = bone_table();
    let with = write(&quad_mesh(), Some(&table));
    assert!(with.contains(r#"<vertexboneassignment vertexindex="3" boneindex="0" weight="0.7""#), "{}", with);
}

#[test]
fn test_unknown_bone_is_an_error() {
    let mut mesh = quad_mesh();
    if let Some(g) = mesh.submeshes[0].geometry.as_mut() {
        g.vertices[1].bone_weights.push(("ghost".into(), 0.2));
    }
    let table = bone_table();
    let err = MeshXml::new(&mesh, Some(&table)).to_element().unwrap_err();
    assert!(matches!(err, FormatError::UnknownBone(name) if name == "ghost"));
}

#[test]
fn test_tangent_parity_written_as_w() {
    let mut mesh = quad_mesh();
    if let Some(g) = mesh.submeshes[0].geometry.as_mut() {
        g.elements.tangents = true;
        g.elements.tangent_parity = true;
        for v in &mut g.vertices {
            v.tangent = Some(Vec4::new(1.0, 0.0, 0.0, -1.0));
        }
    }
    let xml = write(&mesh, None);
    assert!(xml.contains(r#"tangent_dimensions="4""#));
    assert!(xml.contains(r#"<tangent x="1" y="0" z="0" w="-1""#), "{}", xml);
}

// ========================================================================
// Reading
// ========================================================================

#[test]
fn test_roundtrip_preserves_tables() {
    let mesh = quad_mesh();
    let table = bone_table();
    let xml = write(&mesh, Some(&table));

    let mut warnings = Vec::new();
    let parsed = read_mesh(xml.as_bytes(), Some(&table), &mut warnings).unwrap();
    assert!(warnings.is_empty(), "{:?}", warnings);

    assert_eq!(parsed.submeshes.len(), 1);
    let submesh = &parsed.submeshes[0];
    assert_eq!(submesh.material, "Brick");
    assert_eq!(submesh.faces, mesh.submeshes[0].faces);
    assert_eq!(parsed.skeleton_link.as_deref(), Some("quad.skeleton"));

    let original = mesh.submeshes[0].geometry.as_ref().unwrap();
    let geometry = submesh.geometry.as_ref().unwrap();
    assert_eq!(geometry.elements, original.elements);
    for (a, b) in geometry.vertices.iter().zip(&original.vertices) {
        assert!(a.position.abs_diff_eq(b.position, 1e-6));
        assert!(a.normal.abs_diff_eq(b.normal, 1e-6));
        assert!(a.uvs[0].abs_diff_eq(b.uvs[0], 1e-6));
        assert_eq!(a.bone_weights.len(), 1);
        assert_eq!(a.bone_weights[0].0, "root");
    }

    assert_eq!(submesh.poses.len(), 1);
    assert_eq!(submesh.poses[0].name, "Bulge");
    assert!(submesh.poses[0].offsets[0].offset.abs_diff_eq(Vec3::new(0.0, 0.0, 0.5), 1e-6));
}

#[test]
fn test_unknown_bone_index_becomes_group() {
    let xml = r#"<mesh><submeshes><submesh material="m">
        <faces count="1"><face v1="0" v2="1" v3="2"/></faces>
        <geometry vertexcount="3"><vertexbuffer positions="true">
            <vertex><position x="0" y="0" z="0"/></vertex>
            <vertex><position x="1" y="0" z="0"/></vertex>
            <vertex><position x="0" y="1" z="0"/></vertex>
        </vertexbuffer></geometry>
        <boneassignments>
            <vertexboneassignment vertexindex="0" boneindex="7" weight="1"/>
            <vertexboneassignment vertexindex="1" boneindex="7" weight="1"/>
        </boneassignments>
    </submesh></submeshes></mesh>"#;

    let mut warnings = Vec::new();
    let mesh = read_mesh(xml.as_bytes(), None, &mut warnings).unwrap();
    let geometry = mesh.submeshes[0].geometry.as_ref().unwrap();
    assert_eq!(geometry.vertices[0].bone_weights[0].0, "Group 7");
    // Reported once per index
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, crate::WarningKind::MalformedData);
}

#[test]
fn test_face_count_mismatch_warns() {
    let xml = r#"<mesh><submeshes><submesh material="m">
        <faces count="2"><face v1="0" v2="1" v3="2"/></faces>
        <geometry vertexcount="3"><vertexbuffer positions="true">
            <vertex><position x="0" y="0" z="0"/></vertex>
            <vertex><position x="1" y="0" z="0"/></vertex>
            <vertex><position x="0" y="1" z="0"/></vertex>
        </vertexbuffer></geometry>
    </submesh></submeshes></mesh>"#;

    let mut warnings = Vec::new();
    let mesh = read_mesh(xml.as_bytes(), None, &mut warnings).unwrap();
    assert_eq!(mesh.submeshes[0].faces.len(), 1);
    assert!(warnings.iter().any(|w| w.message.contains("declares 2 faces")));
}

#[test]
fn test_out_of_range_face_dropped() {
    let xml = r#"<mesh><submeshes><submesh material="m">
        <faces count="2"><face v1="0" v2="1" v3="2"/><face v1="0" v2="1" v3="5"/></faces>
        <geometry vertexcount="3"><vertexbuffer positions="true">
            <vertex><position x="0" y="0" z="0"/></vertex>
            <vertex><position x="1" y="0" z="0"/></vertex>
            <vertex><position x="0" y="1" z="0"/></vertex>
        </vertexbuffer></geometry>
    </submesh></submeshes></mesh>"#;

    let mut warnings = Vec::new();
    let mesh = read_mesh(xml.as_bytes(), None, &mut warnings).unwrap();
    assert_eq!(mesh.submeshes[0].faces, [[0, 1, 2]]);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, crate::WarningKind::MalformedData);
    assert!(warnings[0].message.contains("submesh 0 face 1 references vertex 5"));
}

#[test]
fn test_writer_rejects_out_of_range_face() {
    let mut mesh = quad_mesh();
    mesh.submeshes[0].faces.push([0, 1, 9]);
    assert!(matches!(
        MeshXml::new(&mesh, None).to_xml_string(),
        Err(FormatError::FaceIndexOutOfRange { index: 9, .. })
    ));
}

#[test]
fn test_split_vertex_buffers_merge() {
    let xml = r#"<mesh><sharedgeometry vertexcount="2">
            <vertexbuffer positions="true" normals="true">
                <vertex><position x="1" y="2" z="3"/><normal x="0" y="1" z="0"/></vertex>
                <vertex><position x="4" y="5" z="6"/><normal x="0" y="1" z="0"/></vertex>
            </vertexbuffer>
            <vertexbuffer texture_coords="2" texture_coord_dimensions_0="2" texture_coord_dimensions_1="2">
                <vertex><texcoord u="0" v="0"/><texcoord u="0.5" v="0.5"/></vertex>
                <vertex><texcoord u="1" v="1"/><texcoord u="0.25" v="0.75"/></vertex>
            </vertexbuffer>
        </sharedgeometry>
        <submeshes><submesh material="m" usesharedvertices="true">
            <faces count="0"/>
        </submesh></submeshes></mesh>"#;

    let mut warnings = Vec::new();
    let mesh = read_mesh(xml.as_bytes(), None, &mut warnings).unwrap();
    let shared = mesh.shared_geometry.as_ref().unwrap();
    assert_eq!(shared.len(), 2);
    assert_eq!(shared.elements.texcoord_sets, 2);
    assert!(shared.elements.normals);
    assert_eq!(shared.vertices[1].position, Vec3::new(4.0, -6.0, 5.0));
    assert_eq!(shared.vertices[1].uvs, vec![Vec2::new(1.0, 0.0), Vec2::new(0.25, 0.25)]);
    assert!(mesh.submeshes[0].uses_shared_vertices);
}

#[test]
fn test_non_submesh_pose_skipped() {
    let xml = r#"<mesh><submeshes/>
        <poses><pose target="mesh" index="0" name="Smile"/></poses></mesh>"#;
    let mut warnings = Vec::new();
    let mesh = read_mesh(xml.as_bytes(), None, &mut warnings).unwrap();
    assert!(mesh.submeshes.is_empty());
    assert_eq!(warnings[0].kind, crate::WarningKind::UnsupportedInput);
}
