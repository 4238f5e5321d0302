//! Vertex deduplication
//!
//! Corners are interned by their shading attributes. The lookup key is the
//! raw bit pattern of every compared float, with `-0.0` folded into `0.0`, so
//! hashing and equality agree. Colour is compared on rgb only.

use hashbrown::HashMap;
use ogre_common::model::Vertex;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct VertexKey(Vec<u32>);

impl VertexKey {
    fn of(vertex: &Vertex) -> Self {
        let mut bits = Vec::with_capacity(11 + vertex.uvs.len() * 2);
        bits.extend(vertex.position.to_array().map(key_bits));
        bits.extend(vertex.normal.to_array().map(key_bits));
        // Alpha is not compared; the first corner's alpha is kept
        bits.extend(vertex.colour.truncate().to_array().map(key_bits));
        // Length first so (a, b) + () never matches (a) + (b)
        bits.push(vertex.uvs.len() as u32);
        for uv in &vertex.uvs {
            bits.extend(uv.to_array().map(key_bits));
        }
        let negative_parity = vertex.tangent.is_some_and(|t| t.w < 0.0);
        bits.push(negative_parity as u32);
        Self(bits)
    }
}

#[inline]
fn key_bits(x: f32) -> u32 {
    if x == 0.0 { 0 } else { x.to_bits() }
}

/// Append-only vertex list with hashed lookup.
#[derive(Debug, Default)]
pub struct VertexTable {
    vertices: Vec<Vertex>,
    lookup: HashMap<VertexKey, u32>,
}

impl VertexTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of an equal vertex, appending `vertex` if there is none.
    ///
    /// The first copy wins: later duplicates do not replace its bone weights
    /// or source index.
    pub fn intern(&mut self, vertex: Vertex) -> u32 {
        let key = VertexKey::of(&vertex);
        if let Some(&index) = self.lookup.get(&key) {
            return index;
        }
        let index = self.vertices.len() as u32;
        self.vertices.push(vertex);
        self.lookup.insert(key, index);
        index
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn into_vertices(self) -> Vec<Vertex> {
        self.vertices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec3, Vec4};
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg64;

    fn corner(position: Vec3, uv: Vec2) -> Vertex {
        Vertex {
            position,
            normal: Vec3::Z,
            uvs: vec![uv],
            ..Default::default()
        }
    }

    #[test]
    fn test_intern_is_idempotent() {
        let mut table = VertexTable::new();
        let a = table.intern(corner(Vec3::X, Vec2::ZERO));
        let b = table.intern(corner(Vec3::X, Vec2::ZERO));
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_uv_seam_splits_vertex() {
        let mut table = VertexTable::new();
        let a = table.intern(corner(Vec3::X, Vec2::ZERO));
        let b = table.intern(corner(Vec3::X, Vec2::new(0.5, 0.0)));
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_negative_zero_matches_zero() {
        let mut table = VertexTable::new();
        let a = table.intern(corner(Vec3::new(0.0, 1.0, 0.0), Vec2::ZERO));
        let b = table.intern(corner(Vec3::new(-0.0, 1.0, 0.0), Vec2::new(-0.0, 0.0)));
        assert_eq!(a, b);
    }

    #[test]
    fn test_colour_alpha_does_not_split() {
        let mut table = VertexTable::new();
        let mut v = corner(Vec3::X, Vec2::ZERO);
        v.colour = Vec4::new(1.0, 0.5, 0.25, 1.0);
        let a = table.intern(v.clone());

        v.colour.w = 0.2;
        assert_eq!(table.intern(v.clone()), a);
        assert_eq!(table.vertices()[0].colour.w, 1.0);

        v.colour.y = 0.6;
        assert_ne!(table.intern(v), a);
    }

    #[test]
    fn test_tangent_parity_splits_but_tangent_value_does_not() {
        let mut table = VertexTable::new();
        let mut v = corner(Vec3::Y, Vec2::ZERO);
        v.tangent = Some(Vec4::new(1.0, 0.0, 0.0, 1.0));
        let a = table.intern(v.clone());

        v.tangent = Some(Vec4::new(0.9, 0.1, 0.0, 1.0));
        assert_eq!(table.intern(v.clone()), a);

        v.tangent = Some(Vec4::new(1.0, 0.0, 0.0, -1.0));
        assert_ne!(table.intern(v), a);
    }

    #[test]
    fn test_first_seen_order_and_weights_kept() {
        let mut table = VertexTable::new();
        let mut first = corner(Vec3::Z, Vec2::ZERO);
        first.bone_weights = vec![("Spine".into(), 1.0)];
        first.source_index = Some(7);
        table.intern(corner(Vec3::X, Vec2::ZERO));
        table.intern(first);

        let mut dup = corner(Vec3::Z, Vec2::ZERO);
        dup.source_index = Some(9);
        assert_eq!(table.intern(dup), 1);

        let stored = &table.vertices()[1];
        assert_eq!(stored.source_index, Some(7));
        assert_eq!(stored.bone_weights.len(), 1);
    }

    #[test]
    fn test_random_stream_yields_distinct_count() {
        let mut rng = Pcg64::seed_from_u64(42);
        let palette: Vec<Vertex> = (0..37)
            .map(|i| corner(Vec3::new(i as f32, 0.0, 0.0), Vec2::new(0.0, i as f32 * 0.1)))
            .collect();

        let mut table = VertexTable::new();
        let mut remap = Vec::new();
        let mut used = hashbrown::HashSet::new();
        for _ in 0..2000 {
            let pick = rng.random_range(0..palette.len());
            used.insert(pick);
            remap.push(table.intern(palette[pick].clone()));
        }

        assert_eq!(remap.len(), 2000);
        assert_eq!(table.len(), used.len());
        assert!(remap.iter().all(|&i| (i as usize) < table.len()));
    }
}
