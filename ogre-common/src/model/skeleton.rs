//! Skeleton records and the bone name ↔ id table

use glam::{Mat4, Quat, Vec3};
use hashbrown::HashMap;
use serde::Serialize;

use super::animation::Animation;

/// A bone in Ogre space, relative to its parent's rest transform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bone {
    pub name: String,
    /// Stable numeric id; unique and dense within a skeleton
    pub id: u32,
    pub parent: Option<String>,
    pub position: Vec3,
    pub rotation: Quat,
}

impl Bone {
    /// Build a bone from its parent-relative rest matrix. Scale is discarded.
    pub fn from_rest_matrix(name: impl Into<String>, id: u32, parent: Option<String>, rest: Mat4) -> Self {
        let (_, rotation, position) = rest.to_scale_rotation_translation();
        Self {
            name: name.into(),
            id,
            parent,
            position,
            rotation: rotation.normalize(),
        }
    }

    pub fn rest_local_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }
}

/// A bone forest plus the animations written alongside it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Skeleton {
    pub bones: Vec<Bone>,
    pub animations: Vec<Animation>,
}

impl Skeleton {
    pub fn bone(&self, name: &str) -> Option<&Bone> {
        self.bones.iter().find(|b| b.name == name)
    }

    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Bone> + 'a {
        self.bones
            .iter()
            .filter(move |b| b.parent.as_deref() == Some(name))
    }

    pub fn roots(&self) -> impl Iterator<Item = &Bone> {
        self.bones.iter().filter(|b| b.parent.is_none())
    }

    /// Order bones by id, the order Ogre expects in `<bones>`.
    pub fn sort_by_id(&mut self) {
        self.bones.sort_by_key(|b| b.id);
    }

    pub fn id_table(&self) -> BoneIdTable {
        let mut table = BoneIdTable::default();
        for bone in &self.bones {
            table.insert(&bone.name, bone.id);
        }
        table
    }
}

/// Two-way mapping between bone names and their numeric ids.
///
/// Built once per import or export pass from the skeleton in play.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoneIdTable {
    by_name: HashMap<String, u32>,
    by_id: HashMap<u32, String>,
}

impl BoneIdTable {
    pub fn insert(&mut self, name: &str, id: u32) {
        self.by_name.insert(name.to_string(), id);
        self.by_id.insert(id, name.to_string());
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, id: u32) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl FromIterator<(String, u32)> for BoneIdTable {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        let mut table = Self::default();
        for (name, id) in iter {
            table.insert(&name, id);
        }
        table
    }
}
