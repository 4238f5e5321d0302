//! Incremental 3D convex hull
//!
//! Starts from the widest tetrahedron in the point set and adds the remaining
//! points one at a time, replacing every face a point can see with a fan from
//! the horizon to that point. Output triangles wind counter-clockwise seen
//! from outside.

use glam::Vec3;
use hashbrown::{HashMap, HashSet};
use ogre_common::model::MeshData;

/// Why a point set has no 3D hull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degenerate {
    TooFewPoints,
    Collinear,
    Coplanar,
}

#[derive(Debug, Clone)]
struct Face {
    v: [usize; 3],
    normal: Vec3,
    offset: f32,
}

impl Face {
    fn new(points: &[Vec3], v: [usize; 3]) -> Self {
        let [a, b, c] = v.map(|i| points[i]);
        let normal = (b - a).cross(c - a).normalize_or_zero();
        Self {
            v,
            normal,
            offset: normal.dot(a),
        }
    }

    fn distance(&self, p: Vec3) -> f32 {
        self.normal.dot(p) - self.offset
    }

    fn edges(&self) -> [(usize, usize); 3] {
        let [a, b, c] = self.v;
        [(a, b), (b, c), (c, a)]
    }
}

/// Convex hull of `points` as an indexed triangle mesh over the hull vertices.
pub fn convex_hull(points: &[Vec3]) -> Result<MeshData, Degenerate> {
    let points = unique(points);
    if points.len() < 4 {
        return Err(Degenerate::TooFewPoints);
    }

    let (lo, hi) = points
        .iter()
        .fold((points[0], points[0]), |(lo, hi), &p| (lo.min(p), hi.max(p)));
    let eps = (hi - lo).length().max(1.0) * 1e-6;

    let [i0, i1, i2, i3] = initial_simplex(&points, eps)?;

    let mut faces = Vec::new();
    let centroid = (points[i0] + points[i1] + points[i2] + points[i3]) * 0.25;
    for v in [[i0, i1, i2], [i0, i1, i3], [i0, i2, i3], [i1, i2, i3]] {
        let mut face = Face::new(&points, v);
        if face.distance(centroid) > 0.0 {
            face = Face::new(&points, [v[0], v[2], v[1]]);
        }
        faces.push(face);
    }

    for (index, &p) in points.iter().enumerate() {
        if [i0, i1, i2, i3].contains(&index) {
            continue;
        }
        let visible: Vec<bool> = faces.iter().map(|f| f.distance(p) > eps).collect();
        if !visible.contains(&true) {
            continue;
        }

        let lit_edges: HashSet<(usize, usize)> = faces
            .iter()
            .zip(&visible)
            .filter(|&(_, &v)| v)
            .flat_map(|(f, _)| f.edges())
            .collect();
        let horizon: Vec<(usize, usize)> = lit_edges
            .iter()
            .copied()
            .filter(|&(a, b)| !lit_edges.contains(&(b, a)))
            .collect();

        let mut kept: Vec<Face> = faces
            .into_iter()
            .zip(visible)
            .filter_map(|(f, v)| (!v).then_some(f))
            .collect();
        for (a, b) in horizon {
            kept.push(Face::new(&points, [a, b, index]));
        }
        faces = kept;
    }

    Ok(compact(&points, &faces))
}

fn unique(points: &[Vec3]) -> Vec<Vec3> {
    let mut seen = HashSet::new();
    points
        .iter()
        .copied()
        .filter(|p| seen.insert(p.to_array().map(|x| if x == 0.0 { 0 } else { x.to_bits() })))
        .collect()
}

fn initial_simplex(points: &[Vec3], eps: f32) -> Result<[usize; 4], Degenerate> {
    let p0 = points[0];
    let i1 = farthest(points, |p| (p - p0).length_squared());
    let axis = (points[i1] - p0).normalize_or_zero();
    if axis == Vec3::ZERO {
        return Err(Degenerate::TooFewPoints);
    }

    let i2 = farthest(points, |p| (p - p0).cross(axis).length_squared());
    if (points[i2] - p0).cross(axis).length() <= eps {
        return Err(Degenerate::Collinear);
    }

    let normal = axis.cross(points[i2] - p0).normalize();
    let i3 = farthest(points, |p| normal.dot(p - p0).abs());
    if normal.dot(points[i3] - p0).abs() <= eps {
        return Err(Degenerate::Coplanar);
    }

    Ok([0, i1, i2, i3])
}

fn farthest(points: &[Vec3], metric: impl Fn(Vec3) -> f32) -> usize {
    points
        .iter()
        .enumerate()
        .fold((0, f32::MIN), |best, (i, &p)| {
            let m = metric(p);
            if m > best.1 { (i, m) } else { best }
        })
        .0
}

/// Keep only the vertices the faces use, numbered in first-use order.
fn compact(points: &[Vec3], faces: &[Face]) -> MeshData {
    let mut remap: HashMap<usize, u32> = HashMap::new();
    let mut mesh = MeshData::default();
    for face in faces {
        let tri = face.v.map(|i| {
            *remap.entry(i).or_insert_with(|| {
                mesh.points.push(points[i]);
                (mesh.points.len() - 1) as u32
            })
        });
        mesh.triangles.push(tri);
    }
    mesh
}
