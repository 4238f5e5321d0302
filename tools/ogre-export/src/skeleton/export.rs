//! Armature → Ogre skeleton
//!
//! Each bone's rest transform is written relative to its parent, after the
//! axis fix that turns the editor's Y-along-bone convention into Ogre's.

use hashbrown::HashMap;
use ogre_common::Warning;
use ogre_common::math::{bone_axis_fix, source_to_target};
use ogre_common::model::{Bone, BoneIdTable, Skeleton};
use tracing::debug;

use crate::host::{HostArmature, HostBone};

/// Give every bone a unique id in `[0, N)`.
///
/// Persisted ids are honoured when they are in range and not already taken
/// by an earlier bone; anything else is reported and treated as missing.
/// Missing ids are filled with the lowest unused value, in host bone order.
pub fn assign_bone_ids(bones: &[HostBone], warnings: &mut Vec<Warning>) -> BoneIdTable {
    let n = bones.len();
    let mut slots: Vec<Option<usize>> = vec![None; n];
    let mut missing = Vec::new();

    for (index, bone) in bones.iter().enumerate() {
        match bone.ogre_id {
            Some(id) if id >= 0 && (id as usize) < n => {
                let slot = &mut slots[id as usize];
                if slot.is_none() {
                    *slot = Some(index);
                } else {
                    warnings.push(Warning::malformed(format!(
                        "bone '{}' repeats OGREID {}, assigning a new id",
                        bone.name, id
                    )));
                    missing.push(index);
                }
            }
            Some(id) => {
                warnings.push(Warning::malformed(format!(
                    "bone '{}' has OGREID {} outside 0..{}, assigning a new id",
                    bone.name, id, n
                )));
                missing.push(index);
            }
            None => missing.push(index),
        }
    }

    let mut next = 0;
    for index in missing {
        while slots[next].is_some() {
            next += 1;
        }
        slots[next] = Some(index);
    }

    slots
        .into_iter()
        .enumerate()
        .filter_map(|(id, index)| index.map(|i| (bones[i].name.clone(), id as u32)))
        .collect()
}

/// Ogre skeleton (bones only) for `armature`.
///
/// Root bones carry the Z-up → Y-up rotation; children are expressed in their
/// parent's fixed frame, so the conversion cancels down the chain.
pub fn build_skeleton(
    armature: &HostArmature,
    ids: &BoneIdTable,
    warnings: &mut Vec<Warning>,
) -> Skeleton {
    let by_name: HashMap<&str, &HostBone> =
        armature.bones.iter().map(|b| (b.name.as_str(), b)).collect();
    let fix = bone_axis_fix();

    let mut skeleton = Skeleton::default();
    for bone in &armature.bones {
        let Some(id) = ids.id_of(&bone.name) else {
            continue;
        };

        let parent = match bone.parent.as_deref() {
            Some(name) if by_name.contains_key(name) => by_name.get(name).copied(),
            Some(name) => {
                warnings.push(Warning::malformed(format!(
                    "bone '{}' has unknown parent '{}', exporting it as a root",
                    bone.name, name
                )));
                None
            }
            None => None,
        };

        let rest = match parent {
            Some(p) => (p.matrix_local * fix).inverse() * bone.matrix_local * fix,
            None => source_to_target() * bone.matrix_local * fix,
        };
        debug!("Bone {} '{}' rest {:?}", id, bone.name, rest.to_cols_array());

        skeleton.bones.push(Bone::from_rest_matrix(
            &bone.name,
            id,
            parent.map(|p| p.name.clone()),
            rest,
        ));
    }

    skeleton.sort_by_id();
    skeleton
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Quat, Vec3};
    use ogre_common::to_target_space;

    /// World (Ogre space) rest matrix of a bone, composed down from its root.
    fn composed_rest(skeleton: &Skeleton, name: &str) -> Mat4 {
        let Some(bone) = skeleton.bone(name) else {
            return Mat4::IDENTITY;
        };
        let local = bone.rest_local_matrix();
        match &bone.parent {
            Some(parent) => composed_rest(skeleton, parent) * local,
            None => local,
        }
    }

    fn host_bone(name: &str, parent: Option<&str>, head: Vec3, ogre_id: Option<i64>) -> HostBone {
        HostBone {
            name: name.into(),
            parent: parent.map(String::from),
            matrix_local: Mat4::from_translation(head),
            ogre_id,
        }
    }

    fn chain() -> HostArmature {
        HostArmature {
            name: "Rig".into(),
            bones: vec![
                host_bone("root", None, Vec3::ZERO, None),
                host_bone("child", Some("root"), Vec3::new(0.0, 1.0, 0.0), None),
                host_bone("tip", Some("child"), Vec3::new(0.0, 2.5, 0.0), None),
            ],
            actions: vec![],
        }
    }

    // ========================================================================
    // Id assignment
    // ========================================================================

    #[test]
    fn test_ids_fill_gaps_in_host_order() {
        let bones = vec![
            host_bone("a", None, Vec3::ZERO, None),
            host_bone("b", None, Vec3::ZERO, Some(0)),
            host_bone("c", None, Vec3::ZERO, None),
            host_bone("d", None, Vec3::ZERO, Some(2)),
        ];
        let mut warnings = Vec::new();
        let ids = assign_bone_ids(&bones, &mut warnings);
        assert_eq!(ids.id_of("b"), Some(0));
        assert_eq!(ids.id_of("a"), Some(1));
        assert_eq!(ids.id_of("d"), Some(2));
        assert_eq!(ids.id_of("c"), Some(3));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_ids_are_deterministic_and_gap_free() {
        let bones: Vec<HostBone> = (0..6)
            .map(|i| {
                let persisted = [Some(4), None, Some(1), None, None, Some(0)][i];
                host_bone(&format!("b{}", i), None, Vec3::ZERO, persisted)
            })
            .collect();
        let mut warnings = Vec::new();
        let first = assign_bone_ids(&bones, &mut warnings);
        let second = assign_bone_ids(&bones, &mut warnings);
        assert_eq!(first, second);

        let mut seen: Vec<u32> = bones.iter().filter_map(|b| first.id_of(&b.name)).collect();
        seen.sort();
        assert_eq!(seen, (0..6).collect::<Vec<u32>>());
    }

    #[test]
    fn test_bad_persisted_ids_are_reassigned() {
        let bones = vec![
            host_bone("a", None, Vec3::ZERO, Some(1)),
            host_bone("b", None, Vec3::ZERO, Some(1)),
            host_bone("c", None, Vec3::ZERO, Some(99)),
        ];
        let mut warnings = Vec::new();
        let ids = assign_bone_ids(&bones, &mut warnings);
        assert_eq!(ids.id_of("a"), Some(1));
        assert_eq!(ids.id_of("b"), Some(0));
        assert_eq!(ids.id_of("c"), Some(2));
        assert_eq!(warnings.len(), 2);
    }

    // ========================================================================
    // Rest transforms
    // ========================================================================

    #[test]
    fn test_root_position_is_converted_head() {
        let mut armature = chain();
        armature.bones[0].matrix_local = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let ids = assign_bone_ids(&armature.bones, &mut Vec::new());
        let skeleton = build_skeleton(&armature, &ids, &mut Vec::new());
        let root = skeleton.bone("root").unwrap();
        assert!((root.position - to_target_space(Vec3::new(1.0, 2.0, 3.0))).length() < 1e-5);
    }

    #[test]
    fn test_child_offset_runs_along_ogre_x() {
        let armature = chain();
        let ids = assign_bone_ids(&armature.bones, &mut Vec::new());
        let skeleton = build_skeleton(&armature, &ids, &mut Vec::new());

        let child = skeleton.bone("child").unwrap();
        assert_eq!(child.parent.as_deref(), Some("root"));
        assert!((child.position - Vec3::X).length() < 1e-5, "{:?}", child.position);
        assert!(child.rotation.abs_diff_eq(Quat::IDENTITY, 1e-5));

        let tip = skeleton.bone("tip").unwrap();
        assert!((tip.position - Vec3::new(1.5, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_composed_rest_matches_world_head() {
        let mut armature = chain();
        armature.bones[2].matrix_local =
            Mat4::from_rotation_translation(Quat::from_rotation_z(0.6), Vec3::new(0.3, 2.5, -0.2));
        let ids = assign_bone_ids(&armature.bones, &mut Vec::new());
        let skeleton = build_skeleton(&armature, &ids, &mut Vec::new());

        let world = composed_rest(&skeleton, "tip");
        let expected = to_target_space(Vec3::new(0.3, 2.5, -0.2));
        assert!((world.w_axis.truncate() - expected).length() < 1e-4);
    }

    #[test]
    fn test_unknown_parent_becomes_root() {
        let mut armature = chain();
        armature.bones[1].parent = Some("ghost".into());
        let ids = assign_bone_ids(&armature.bones, &mut Vec::new());
        let mut warnings = Vec::new();
        let skeleton = build_skeleton(&armature, &ids, &mut warnings);
        assert!(skeleton.bone("child").unwrap().parent.is_none());
        assert_eq!(warnings.len(), 1);
    }
}
