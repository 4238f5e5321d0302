//! Per-corner tangent frames
//!
//! Host tangents are used when present. Otherwise tangents are accumulated
//! per (source vertex, uv) from the triangle's UV gradient and orthogonalised
//! against each corner's normal; handedness comes from the accumulated
//! bitangent.

use glam::{Vec2, Vec3, Vec4};
use hashbrown::HashMap;

use crate::host::{HostLoop, HostMesh};

/// Tangent `xyz` plus handedness `w` for every corner of `triangles`.
pub fn corner_tangents(mesh: &HostMesh, triangles: &[[&HostLoop; 3]]) -> Vec<[Vec4; 3]> {
    if mesh.has_tangents() {
        return triangles
            .iter()
            .map(|tri| tri.map(host_tangent))
            .collect();
    }
    computed_tangents(mesh, triangles)
}

fn host_tangent(corner: &HostLoop) -> Vec4 {
    let t = corner.tangent.unwrap_or(Vec3::X);
    let w = match corner.bitangent_sign {
        Some(s) if s < 0.0 => -1.0,
        _ => 1.0,
    };
    t.extend(w)
}

type SeamKey = (u32, [u32; 2]);

fn seam_key(corner: &HostLoop) -> SeamKey {
    let uv = corner.uv.unwrap_or(Vec2::ZERO);
    (corner.vertex, [uv.x.to_bits(), uv.y.to_bits()])
}

fn computed_tangents(mesh: &HostMesh, triangles: &[[&HostLoop; 3]]) -> Vec<[Vec4; 3]> {
    let mut sums: HashMap<SeamKey, (Vec3, Vec3)> = HashMap::new();

    for tri in triangles {
        let p = tri.map(|c| mesh.vertices[c.vertex as usize].co);
        let uv = tri.map(|c| c.uv.unwrap_or(Vec2::ZERO));

        let e1 = p[1] - p[0];
        let e2 = p[2] - p[0];
        let d1 = uv[1] - uv[0];
        let d2 = uv[2] - uv[0];

        let det = d1.x * d2.y - d2.x * d1.y;
        if det.abs() < 1e-12 {
            continue;
        }
        let r = 1.0 / det;
        let tangent = (e1 * d2.y - e2 * d1.y) * r;
        let bitangent = (e2 * d1.x - e1 * d2.x) * r;

        for corner in tri {
            let entry = sums.entry(seam_key(corner)).or_insert((Vec3::ZERO, Vec3::ZERO));
            entry.0 += tangent;
            entry.1 += bitangent;
        }
    }

    triangles
        .iter()
        .map(|tri| {
            tri.map(|corner| {
                let (t, b) = sums
                    .get(&seam_key(corner))
                    .copied()
                    .unwrap_or((Vec3::ZERO, Vec3::ZERO));
                orthogonalise(corner.normal, t, b)
            })
        })
        .collect()
}

/// Gram-Schmidt `t` against `n`, with handedness from `b`.
fn orthogonalise(n: Vec3, t: Vec3, b: Vec3) -> Vec4 {
    let n = n.normalize_or_zero();
    let t = (t - n * n.dot(t))
        .try_normalize()
        .unwrap_or_else(|| n.any_orthonormal_vector());
    let w = if n.cross(t).dot(b) < 0.0 { -1.0 } else { 1.0 };
    t.extend(w)
}

/// Exported binormal: `-(w · n × t)`.
pub fn binormal(normal: Vec3, tangent: Vec4) -> Vec3 {
    -(tangent.w * normal.cross(tangent.truncate()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostPolygon, HostVertex};

    fn corner(vertex: u32, uv: Vec2) -> HostLoop {
        HostLoop {
            vertex,
            normal: Vec3::Z,
            uv: Some(uv),
            colour: None,
            alpha: None,
            tangent: None,
            bitangent_sign: None,
        }
    }

    fn quad(flip_u: bool) -> HostMesh {
        let u = |x: f32| if flip_u { 1.0 - x } else { x };
        let positions = [Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y];
        let uvs = [
            Vec2::new(u(0.0), 0.0),
            Vec2::new(u(1.0), 0.0),
            Vec2::new(u(1.0), 1.0),
            Vec2::new(u(0.0), 1.0),
        ];
        HostMesh {
            vertices: positions
                .iter()
                .map(|&co| HostVertex { co, groups: vec![] })
                .collect(),
            polygons: vec![HostPolygon {
                loops: (0..4).map(|i| corner(i, uvs[i as usize])).collect(),
            }],
            shape_keys: vec![],
        }
    }

    fn fan(mesh: &HostMesh) -> Vec<[&HostLoop; 3]> {
        let l = &mesh.polygons[0].loops;
        vec![[&l[0], &l[1], &l[2]], [&l[0], &l[2], &l[3]]]
    }

    #[test]
    fn test_planar_quad_tangent_follows_u() {
        let mesh = quad(false);
        let tangents = corner_tangents(&mesh, &fan(&mesh));
        for t in tangents.iter().flatten() {
            assert!((t.truncate() - Vec3::X).length() < 1e-5, "{:?}", t);
            assert_eq!(t.w, 1.0);
        }
    }

    #[test]
    fn test_mirrored_uvs_flip_handedness() {
        let mesh = quad(true);
        let tangents = corner_tangents(&mesh, &fan(&mesh));
        for t in tangents.iter().flatten() {
            assert!((t.truncate() + Vec3::X).length() < 1e-5);
            assert_eq!(t.w, -1.0);
        }
    }

    #[test]
    fn test_host_tangents_take_priority() {
        let mut mesh = quad(false);
        for l in &mut mesh.polygons[0].loops {
            l.tangent = Some(Vec3::Y);
            l.bitangent_sign = Some(-1.0);
        }
        let tangents = corner_tangents(&mesh, &fan(&mesh));
        assert_eq!(tangents[0][0], Vec4::new(0.0, 1.0, 0.0, -1.0));
    }

    #[test]
    fn test_binormal_sign() {
        let b = binormal(Vec3::Z, Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(b, Vec3::new(0.0, -1.0, 0.0));
        let b = binormal(Vec3::Z, Vec4::new(1.0, 0.0, 0.0, -1.0));
        assert_eq!(b, Vec3::new(0.0, 1.0, 0.0));
    }
}
