//! `.skeleton.xml` → armature-space bones
//!
//! A skeleton document only stores each bone's parent-relative position and
//! rotation. Rebuilding editor bones (head, tail, roll) runs in fixed stages:
//!
//! ```text
//! ParseXml → BuildHierarchy → InjectHelperBones → ResolveWorldTransforms
//!          → StripHelperBones → Done
//! ```
//!
//! Helper bones give every joint with zero or several children a single
//! well-defined direction; zero bones stand in for bones sitting exactly on
//! their parent. Both are placeholders: they take part in tail-length
//! estimation and are removed before anything leaves this module.

use std::io::Read;

use glam::{Mat3, Mat4, Vec3};
use hashbrown::HashMap;
use serde::Serialize;
use tracing::{debug, info};

use ogre_common::formats::FromXml;
use ogre_common::math::rotation_to_source;
use ogre_common::model::{Animation, BoneIdTable, Skeleton};
use ogre_common::{FormatError, Warning, to_source_space};

use crate::error::InvariantViolation;

/// Offset given to every placeholder bone, along the parent's Ogre X axis.
const PLACEHOLDER_OFFSET: Vec3 = Vec3::new(0.2, 0.0, 0.0);

/// Tail length used when the skeleton gives no hint at all.
const FALLBACK_TAIL: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ImportStage {
    ParseXml,
    BuildHierarchy,
    InjectHelperBones,
    ResolveWorldTransforms,
    StripHelperBones,
    Done,
}

impl ImportStage {
    pub fn next(self) -> Option<Self> {
        match self {
            Self::ParseXml => Some(Self::BuildHierarchy),
            Self::BuildHierarchy => Some(Self::InjectHelperBones),
            Self::InjectHelperBones => Some(Self::ResolveWorldTransforms),
            Self::ResolveWorldTransforms => Some(Self::StripHelperBones),
            Self::StripHelperBones => Some(Self::Done),
            Self::Done => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Bone,
    Helper,
    Zero,
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    id: u32,
    kind: NodeKind,
    parent: Option<usize>,
    children: Vec<usize>,
    /// Parent-relative, Ogre space
    local: Mat4,
    position: Vec3,
    /// Ogre space
    world: Mat4,
    head: Vec3,
    tail: Vec3,
    rest: Mat3,
}

impl Node {
    fn new(name: String, id: u32, kind: NodeKind, parent: Option<usize>, local: Mat4, position: Vec3) -> Self {
        Self {
            name,
            id,
            kind,
            parent,
            children: Vec::new(),
            local,
            position,
            world: Mat4::IDENTITY,
            head: Vec3::ZERO,
            tail: Vec3::ZERO,
            rest: Mat3::IDENTITY,
        }
    }

    fn placeholder(name: String, kind: NodeKind, parent: Option<usize>) -> Self {
        Self::new(
            name,
            u32::MAX,
            kind,
            parent,
            Mat4::from_translation(PLACEHOLDER_OFFSET),
            PLACEHOLDER_OFFSET,
        )
    }
}

/// An editor bone rebuilt from a skeleton document. Armature space, Z up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedBone {
    pub name: String,
    /// Persisted as the bone's `OGREID`
    pub id: u32,
    pub parent: Option<String>,
    pub head: Vec3,
    pub tail: Vec3,
    /// Rest rotation; its Y axis runs from head to tail
    pub rest: Mat3,
}

impl ImportedBone {
    /// Armature-space rest matrix.
    pub fn matrix_local(&self) -> Mat4 {
        Mat4::from_translation(self.head) * Mat4::from_mat3(self.rest)
    }
}

/// Result of a completed skeleton import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportedSkeleton {
    pub bones: Vec<ImportedBone>,
    /// Animations as stored in the document (Ogre space)
    #[serde(skip)]
    pub animations: Vec<Animation>,
}

impl ImportedSkeleton {
    pub fn bone(&self, name: &str) -> Option<&ImportedBone> {
        self.bones.iter().find(|b| b.name == name)
    }

    pub fn id_table(&self) -> BoneIdTable {
        self.bones.iter().map(|b| (b.name.clone(), b.id)).collect()
    }
}

/// Staged skeleton import. Each stage must be called exactly once, in order.
#[derive(Debug)]
pub struct SkeletonImport {
    stage: ImportStage,
    skeleton: Skeleton,
    nodes: Vec<Node>,
}

impl SkeletonImport {
    /// Start from an already parsed skeleton (the `ParseXml` stage is done).
    pub fn new(skeleton: Skeleton) -> Self {
        Self {
            stage: ImportStage::ParseXml,
            skeleton,
            nodes: Vec::new(),
        }
    }

    /// Parse a `.skeleton.xml` document.
    pub fn parse_xml<R: Read>(reader: R, warnings: &mut Vec<Warning>) -> Result<Self, FormatError> {
        let skeleton = Skeleton::read_xml(reader, warnings)?;
        info!(
            "Parsed skeleton: {} bones, {} animations",
            skeleton.bones.len(),
            skeleton.animations.len()
        );
        Ok(Self::new(skeleton))
    }

    /// Last completed stage.
    pub fn stage(&self) -> ImportStage {
        self.stage
    }

    /// Run every remaining stage.
    pub fn run(mut self, warnings: &mut Vec<Warning>) -> Result<ImportedSkeleton, InvariantViolation> {
        self.build_hierarchy(warnings)?;
        self.inject_helper_bones()?;
        self.resolve_world_transforms()?;
        self.strip_helper_bones()?;
        self.finish()
    }

    fn advance(&mut self, attempted: ImportStage) -> Result<(), InvariantViolation> {
        if self.stage.next() != Some(attempted) {
            return Err(InvariantViolation::StageOrder {
                current: self.stage,
                attempted,
            });
        }
        self.stage = attempted;
        Ok(())
    }

    // ========================================================================
    // Stages
    // ========================================================================

    /// Link bones to their parents. Unknown parents and cycles are cut, each
    /// with a warning, leaving the affected bone as a root.
    pub fn build_hierarchy(&mut self, warnings: &mut Vec<Warning>) -> Result<(), InvariantViolation> {
        self.advance(ImportStage::BuildHierarchy)?;

        let index: HashMap<&str, usize> = self
            .skeleton
            .bones
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.as_str(), i))
            .collect();

        let mut nodes = Vec::with_capacity(self.skeleton.bones.len());
        for bone in &self.skeleton.bones {
            let parent = match bone.parent.as_deref() {
                Some(name) => match index.get(name) {
                    Some(&p) => Some(p),
                    None => {
                        warnings.push(Warning::malformed(format!(
                            "bone '{}' names unknown parent '{}', importing it as a root",
                            bone.name, name
                        )));
                        None
                    }
                },
                None => None,
            };
            nodes.push(Node::new(
                bone.name.clone(),
                bone.id,
                NodeKind::Bone,
                parent,
                bone.rest_local_matrix(),
                bone.position,
            ));
        }

        // 0 = unvisited, 1 = on the current walk, 2 = settled
        let mut state = vec![0u8; nodes.len()];
        for start in 0..nodes.len() {
            let mut walk = Vec::new();
            let mut current = Some(start);
            while let Some(i) = current {
                match state[i] {
                    2 => break,
                    1 => {
                        warnings.push(Warning::malformed(format!(
                            "bone hierarchy loops through '{}', importing it as a root",
                            nodes[i].name
                        )));
                        nodes[i].parent = None;
                        break;
                    }
                    _ => {}
                }
                state[i] = 1;
                walk.push(i);
                current = nodes[i].parent;
            }
            for i in walk {
                state[i] = 2;
            }
        }

        for i in 0..nodes.len() {
            if let Some(p) = nodes[i].parent {
                nodes[p].children.push(i);
            }
        }

        self.nodes = nodes;
        Ok(())
    }

    /// Give every bone without exactly one child a helper child, and every
    /// bone sitting on its parent's origin a zero sibling.
    pub fn inject_helper_bones(&mut self) -> Result<(), InvariantViolation> {
        self.advance(ImportStage::InjectHelperBones)?;

        let mut helpers = 0;
        for i in 0..self.nodes.len() {
            if self.nodes[i].children.len() != 1 {
                // Helpers only extend tails; they are not counted as children
                self.nodes.push(Node::placeholder(
                    format!("Helper{}", helpers),
                    NodeKind::Helper,
                    Some(i),
                ));
                helpers += 1;
            }
        }

        let mut zeros = 0;
        for i in 0..self.nodes.len() {
            if self.nodes[i].position.length() == 0.0 {
                let parent = self.nodes[i].parent;
                let name = format!("Zero{}", self.nodes[i].name);
                let zero = self.nodes.len();
                self.nodes.push(Node::placeholder(name, NodeKind::Zero, parent));
                if let Some(p) = parent {
                    self.nodes[p].children.push(zero);
                }
                zeros += 1;
            }
        }

        debug!("Injected {} helper and {} zero bones", helpers, zeros);
        Ok(())
    }

    /// Compose parent-to-world matrices down every chain, then derive each
    /// bone's head, tail and rest rotation in armature space.
    pub fn resolve_world_transforms(&mut self) -> Result<(), InvariantViolation> {
        self.advance(ImportStage::ResolveWorldTransforms)?;

        let n = self.nodes.len();
        let mut resolved = vec![false; n];
        for start in 0..n {
            let mut chain = Vec::new();
            let mut current = Some(start);
            while let Some(i) = current {
                if resolved[i] {
                    break;
                }
                chain.push(i);
                current = self.nodes[i].parent;
            }
            for &i in chain.iter().rev() {
                let parent_world = self.nodes[i]
                    .parent
                    .map_or(Mat4::IDENTITY, |p| self.nodes[p].world);
                self.nodes[i].world = parent_world * self.nodes[i].local;
                resolved[i] = true;
            }
        }

        let average = {
            let sum: f32 = self.nodes.iter().map(|node| node.position.x).sum();
            let average = if n > 0 { sum / n as f32 } else { 0.0 };
            if average == 0.0 { FALLBACK_TAIL } else { average }
        };

        for i in 0..n {
            let longest_child = self.nodes[i]
                .children
                .iter()
                .map(|&c| self.nodes[c].position.x)
                .fold(0.0f32, f32::max);
            let length = if longest_child == 0.0 { average } else { longest_child };

            let node = &mut self.nodes[i];
            let rotation = rotation_to_source(Mat3::from_mat4(node.world));
            let y = rotation.x_axis;
            let z = rotation.z_axis;
            node.rest = Mat3::from_cols(y.cross(z), y, z);
            node.head = to_source_space(node.world.w_axis.truncate());
            node.tail = node.head + y * length;
        }

        Ok(())
    }

    /// Remove every placeholder, re-indexing parents.
    pub fn strip_helper_bones(&mut self) -> Result<(), InvariantViolation> {
        self.advance(ImportStage::StripHelperBones)?;

        let mut remap = vec![None; self.nodes.len()];
        let mut kept = Vec::new();
        for (i, node) in std::mem::take(&mut self.nodes).into_iter().enumerate() {
            if node.kind == NodeKind::Bone {
                remap[i] = Some(kept.len());
                kept.push(node);
            }
        }
        for node in &mut kept {
            node.parent = node.parent.and_then(|p| remap[p]);
            node.children = node.children.iter().filter_map(|&c| remap[c]).collect();
        }

        self.nodes = kept;
        Ok(())
    }

    /// Hand out the rebuilt bones and the untouched animations.
    pub fn finish(mut self) -> Result<ImportedSkeleton, InvariantViolation> {
        self.advance(ImportStage::Done)?;

        if let Some(leak) = self.nodes.iter().find(|n| n.kind != NodeKind::Bone) {
            return Err(InvariantViolation::PlaceholderLeaked(leak.name.clone()));
        }

        let bones = self
            .nodes
            .iter()
            .map(|node| ImportedBone {
                name: node.name.clone(),
                id: node.id,
                parent: node.parent.map(|p| self.nodes[p].name.clone()),
                head: node.head,
                tail: node.tail,
                rest: node.rest,
            })
            .collect();

        Ok(ImportedSkeleton {
            bones,
            animations: std::mem::take(&mut self.skeleton.animations),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;
    use ogre_common::model::Bone;

    fn ogre_bone(name: &str, id: u32, parent: Option<&str>, position: Vec3) -> Bone {
        Bone {
            name: name.into(),
            id,
            parent: parent.map(String::from),
            position,
            rotation: Quat::IDENTITY,
        }
    }

    fn chain() -> Skeleton {
        Skeleton {
            bones: vec![
                ogre_bone("root", 0, None, Vec3::ZERO),
                ogre_bone("child", 1, Some("root"), Vec3::new(1.0, 0.0, 0.0)),
                ogre_bone("tip", 2, Some("child"), Vec3::new(0.5, 0.0, 0.0)),
            ],
            animations: Vec::new(),
        }
    }

    #[test]
    fn test_stage_order_enforced() {
        let mut import = SkeletonImport::new(chain());
        let err = import.inject_helper_bones().unwrap_err();
        assert!(matches!(
            err,
            InvariantViolation::StageOrder {
                current: ImportStage::ParseXml,
                attempted: ImportStage::InjectHelperBones
            }
        ));

        let mut warnings = Vec::new();
        import.build_hierarchy(&mut warnings).unwrap();
        assert!(import.build_hierarchy(&mut warnings).is_err());
        assert_eq!(import.stage(), ImportStage::BuildHierarchy);
    }

    #[test]
    fn test_placeholders_injected_and_stripped() {
        let mut import = SkeletonImport::new(chain());
        let mut warnings = Vec::new();
        import.build_hierarchy(&mut warnings).unwrap();
        import.inject_helper_bones().unwrap();

        // root and child each have one child; tip has none. root sits on the origin.
        let helpers = import.nodes.iter().filter(|n| n.kind == NodeKind::Helper).count();
        let zeros = import.nodes.iter().filter(|n| n.kind == NodeKind::Zero).count();
        assert_eq!(helpers, 1);
        assert_eq!(zeros, 1);

        import.resolve_world_transforms().unwrap();
        import.strip_helper_bones().unwrap();
        let skeleton = import.finish().unwrap();

        let names: Vec<_> = skeleton.bones.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["root", "child", "tip"]);
        assert!(skeleton.bones.iter().all(|b| !b.name.starts_with("Helper") && !b.name.starts_with("Zero")));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_heads_follow_the_chain() {
        let mut warnings = Vec::new();
        let skeleton = SkeletonImport::new(chain()).run(&mut warnings).unwrap();

        // Ogre X stays X in source space
        assert!((skeleton.bone("child").unwrap().head - Vec3::X).length() < 1e-5);
        assert!((skeleton.bone("tip").unwrap().head - Vec3::new(1.5, 0.0, 0.0)).length() < 1e-5);
        assert_eq!(skeleton.bone("tip").unwrap().parent.as_deref(), Some("child"));
    }

    #[test]
    fn test_rotated_parent_moves_child_head() {
        let mut source = chain();
        // 90 degrees about Ogre Y
        source.bones[1].rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let skeleton = SkeletonImport::new(source).run(&mut Vec::new()).unwrap();

        // Ogre +X rotated about +Y lands on Ogre -Z, which is source +Y
        let tip = skeleton.bone("tip").unwrap();
        assert!((tip.head - Vec3::new(1.0, 0.5, 0.0)).length() < 1e-5, "{:?}", tip.head);
    }

    #[test]
    fn test_tail_lengths() {
        let skeleton = SkeletonImport::new(chain()).run(&mut Vec::new()).unwrap();

        // child's tail reaches towards tip
        let child = skeleton.bone("child").unwrap();
        assert!(((child.tail - child.head).length() - 0.5).abs() < 1e-5);

        // tip only has a helper, so it falls back to the average x over all
        // nodes: root 0, child 1, tip 0.5, helper 0.2, zero 0.2
        let tip = skeleton.bone("tip").unwrap();
        assert!(((tip.tail - tip.head).length() - 0.38).abs() < 1e-5);
    }

    #[test]
    fn test_rest_is_proper_rotation_along_bone() {
        let skeleton = SkeletonImport::new(chain()).run(&mut Vec::new()).unwrap();
        for bone in &skeleton.bones {
            assert!((bone.rest.determinant() - 1.0).abs() < 1e-5);
            let direction = (bone.tail - bone.head).normalize();
            assert!((bone.rest.y_axis - direction).length() < 1e-5);
        }
    }

    #[test]
    fn test_cycle_is_cut_with_warning() {
        let source = Skeleton {
            bones: vec![
                ogre_bone("a", 0, Some("b"), Vec3::X),
                ogre_bone("b", 1, Some("a"), Vec3::X),
            ],
            animations: Vec::new(),
        };
        let mut warnings = Vec::new();
        let skeleton = SkeletonImport::new(source).run(&mut warnings).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(skeleton.bones.iter().filter(|b| b.parent.is_none()).count(), 1);
    }

    #[test]
    fn test_parse_and_ids() {
        let xml = r#"<skeleton>
            <bones>
                <bone id="1" name="b"><position x="1" y="0" z="0"/>
                    <rotation angle="0"><axis x="1" y="0" z="0"/></rotation></bone>
                <bone id="0" name="a"><position x="0" y="0" z="0"/>
                    <rotation angle="0"><axis x="1" y="0" z="0"/></rotation></bone>
            </bones>
            <bonehierarchy><boneparent bone="b" parent="a"/></bonehierarchy>
        </skeleton>"#;
        let mut warnings = Vec::new();
        let import = SkeletonImport::parse_xml(xml.as_bytes(), &mut warnings).unwrap();
        let skeleton = import.run(&mut warnings).unwrap();
        let ids = skeleton.id_table();
        assert_eq!(ids.id_of("a"), Some(0));
        assert_eq!(ids.id_of("b"), Some(1));
        assert_eq!(skeleton.bone("b").unwrap().parent.as_deref(), Some("a"));
    }
}
