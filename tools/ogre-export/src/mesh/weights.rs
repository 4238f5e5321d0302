//! Vertex-group weights → bone assignments

use hashbrown::HashSet;
use ogre_common::Warning;
use ogre_common::model::BoneIdTable;

use crate::host::HostMesh;

/// Weights at or below this are dropped.
pub const MIN_WEIGHT: f32 = 0.01;

/// Ogre's per-vertex bone influence limit.
pub const MAX_INFLUENCES: usize = 4;

/// Bone weights for every host vertex, heaviest first.
///
/// Groups without a name, or whose name is not a bone in `bones`, are
/// dropped with one warning per name.
pub fn vertex_weights(
    mesh: &HostMesh,
    group_names: &[String],
    bones: &BoneIdTable,
    renormalize: bool,
    warnings: &mut Vec<Warning>,
) -> Vec<Vec<(String, f32)>> {
    let mut reported: HashSet<String> = HashSet::new();
    let mut truncated = 0usize;

    let weights = mesh
        .vertices
        .iter()
        .map(|vertex| {
            let mut influences: Vec<(String, f32)> = Vec::new();
            for &(group, weight) in &vertex.groups {
                if weight <= MIN_WEIGHT {
                    continue;
                }
                match group_names.get(group as usize) {
                    Some(name) if bones.contains(name) => influences.push((name.clone(), weight)),
                    Some(name) => {
                        if reported.insert(name.clone()) {
                            warnings.push(Warning::unsupported(format!(
                                "vertex group '{}' is not a bone, its weights are ignored",
                                name
                            )));
                        }
                    }
                    None => {
                        let tag = format!("#{}", group);
                        if reported.insert(tag) {
                            warnings.push(Warning::unsupported(format!(
                                "vertex group index {} has no name, its weights are ignored",
                                group
                            )));
                        }
                    }
                }
            }

            influences.sort_by(|a, b| b.1.total_cmp(&a.1));
            if influences.len() > MAX_INFLUENCES {
                influences.truncate(MAX_INFLUENCES);
                truncated += 1;
            }
            if renormalize {
                let total: f32 = influences.iter().map(|(_, w)| w).sum();
                if total > 0.0 {
                    for (_, w) in &mut influences {
                        *w /= total;
                    }
                }
            }
            influences
        })
        .collect();

    if truncated > 0 && !renormalize {
        warnings.push(Warning::unsupported(format!(
            "{} vertices have more than {} bone weights; the lightest were dropped without renormalizing",
            truncated, MAX_INFLUENCES
        )));
    }

    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostVertex;
    use glam::Vec3;

    fn table(names: &[&str]) -> BoneIdTable {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.to_string(), i as u32))
            .collect()
    }

    fn mesh(groups: Vec<Vec<(u32, f32)>>) -> HostMesh {
        HostMesh {
            vertices: groups
                .into_iter()
                .map(|groups| HostVertex { co: Vec3::ZERO, groups })
                .collect(),
            ..Default::default()
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_small_weights_dropped_and_sorted() {
        let bones = table(&["a", "b"]);
        let m = mesh(vec![vec![(0, 0.3), (1, 0.7), (0, 0.005)]]);
        let mut warnings = Vec::new();
        let w = vertex_weights(&m, &names(&["a", "b"]), &bones, false, &mut warnings);
        assert_eq!(w[0], vec![("b".to_string(), 0.7), ("a".to_string(), 0.3)]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_non_bone_groups_warn_once() {
        let bones = table(&["a"]);
        let m = mesh(vec![vec![(0, 1.0), (1, 0.5)], vec![(1, 0.5), (5, 0.5)]]);
        let mut warnings = Vec::new();
        let w = vertex_weights(&m, &names(&["a", "Paint"]), &bones, false, &mut warnings);
        assert_eq!(w[0].len(), 1);
        assert!(w[1].is_empty());
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_five_influences_truncated_and_renormalized() {
        let bones = table(&["a", "b", "c", "d", "e"]);
        let m = mesh(vec![vec![(0, 0.1), (1, 0.2), (2, 0.3), (3, 0.2), (4, 0.2)]]);
        let mut warnings = Vec::new();
        let w = vertex_weights(&m, &names(&["a", "b", "c", "d", "e"]), &bones, true, &mut warnings);
        assert_eq!(w[0].len(), 4);
        assert_eq!(w[0][0].0, "c");
        assert!(w[0].iter().all(|(name, _)| name != "a"));
        let total: f32 = w[0].iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_truncation_without_renormalize_warns_with_count() {
        let bones = table(&["a", "b", "c", "d", "e"]);
        let five = vec![(0, 0.2), (1, 0.2), (2, 0.2), (3, 0.2), (4, 0.2)];
        let m = mesh(vec![five.clone(), five]);
        let mut warnings = Vec::new();
        let w = vertex_weights(&m, &names(&["a", "b", "c", "d", "e"]), &bones, false, &mut warnings);
        assert_eq!(w[1].len(), 4);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.starts_with("2 vertices"));
    }
}
