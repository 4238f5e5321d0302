//! Which objects become collision shapes, and the frame they are written in

use glam::Mat4;
use hashbrown::HashSet;
use ogre_common::Warning;

use crate::config::{ObjectSelection, RootTransform};
use crate::host::{HostObject, HostScene, ShapeKind};

/// Shape kinds the collision writers understand.
pub fn is_supported(kind: ShapeKind) -> bool {
    matches!(
        kind,
        ShapeKind::Box | ShapeKind::Sphere | ShapeKind::Capsule | ShapeKind::ConvexHull | ShapeKind::Mesh
    )
}

/// `true` when `object` has a rigid body the writers can export. Unsupported
/// shape kinds are reported.
fn has_collision(object: &HostObject, warnings: &mut Vec<Warning>) -> bool {
    let Some(body) = &object.rigid_body else {
        return false;
    };
    if is_supported(body.shape) {
        return true;
    }
    warnings.push(Warning::unsupported(format!(
        "'{}' has unsupported collision shape {:?}",
        object.name, body.shape
    )));
    false
}

/// Objects to export, in scene order, each at most once.
pub fn select_bodies<'a>(
    scene: &'a HostScene,
    mode: ObjectSelection,
    warnings: &mut Vec<Warning>,
) -> Vec<&'a HostObject> {
    match mode {
        ObjectSelection::All => scene
            .objects
            .iter()
            .filter(|o| has_collision(o, warnings))
            .collect(),
        ObjectSelection::Selected => scene
            .objects
            .iter()
            .filter(|o| o.selected && has_collision(o, warnings))
            .collect(),
        ObjectSelection::Children => {
            let mut included: HashSet<&str> = HashSet::new();
            for object in scene.selected() {
                collect_subtree(scene, object, &mut included);
            }
            scene
                .objects
                .iter()
                .filter(|o| included.contains(o.name.as_str()) && has_collision(o, warnings))
                .collect()
        }
    }
}

fn collect_subtree<'a>(scene: &'a HostScene, object: &'a HostObject, into: &mut HashSet<&'a str>) {
    if !into.insert(&object.name) {
        return;
    }
    for child in scene.children(&object.name) {
        collect_subtree(scene, child, into);
    }
}

/// Matrix applied in front of every object's world matrix.
pub fn root_transform(
    scene: &HostScene,
    bodies: &[&HostObject],
    mode: RootTransform,
    warnings: &mut Vec<Warning>,
) -> Mat4 {
    match mode {
        RootTransform::World => Mat4::IDENTITY,
        RootTransform::Active => match scene.active_object.as_deref().and_then(|n| scene.object(n)) {
            Some(active) => active.world_matrix.inverse(),
            None => {
                warnings.push(Warning::missing(
                    "no active object for the ACTIVE root transform, using world space",
                ));
                Mat4::IDENTITY
            }
        },
        RootTransform::Parent => common_parent(scene, bodies)
            .map_or(Mat4::IDENTITY, |p| p.world_matrix.inverse()),
    }
}

/// Chain from `object` up to its root, `object` first.
fn ancestry<'a>(scene: &'a HostScene, object: &'a HostObject) -> Vec<&'a HostObject> {
    let mut chain = vec![object];
    let mut seen: HashSet<&str> = HashSet::from_iter([object.name.as_str()]);
    let mut current = object;
    while let Some(parent) = current.parent.as_deref().and_then(|p| scene.object(p)) {
        if !seen.insert(&parent.name) {
            break;
        }
        chain.push(parent);
        current = parent;
    }
    chain
}

/// Deepest object that is the first body's parent or one of its ancestors
/// and also an ancestor-or-self of every other body.
pub fn common_parent<'a>(scene: &'a HostScene, bodies: &[&'a HostObject]) -> Option<&'a HostObject> {
    let (first, rest) = bodies.split_first()?;
    let mut parent = scene.object(first.parent.as_deref()?)?;
    for body in rest {
        let lineage: HashSet<&str> = ancestry(scene, body).iter().map(|o| o.name.as_str()).collect();
        parent = ancestry(scene, parent)
            .into_iter()
            .find(|candidate| lineage.contains(candidate.name.as_str()))?;
    }
    Some(parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostRigidBody;
    use glam::Vec3;

    fn object(name: &str, parent: Option<&str>, selected: bool, shape: Option<ShapeKind>) -> HostObject {
        HostObject {
            name: name.into(),
            parent: parent.map(String::from),
            selected,
            world_matrix: Mat4::from_translation(Vec3::new(name.len() as f32, 0.0, 0.0)),
            mesh: None,
            evaluated_mesh: None,
            vertex_groups: vec![],
            material_slots: vec![],
            armature: None,
            bound_box: None,
            rigid_body: shape.map(|shape| HostRigidBody {
                shape,
                mesh_source: Default::default(),
            }),
        }
    }

    fn scene() -> HostScene {
        HostScene {
            objects: vec![
                object("Base", None, false, None),
                object("Hull", Some("Base"), true, Some(ShapeKind::Box)),
                object("Mast", Some("Hull"), false, Some(ShapeKind::Capsule)),
                object("Flag", Some("Mast"), false, Some(ShapeKind::Cone)),
                object("Crate", Some("Base"), false, Some(ShapeKind::ConvexHull)),
                object("Rock", None, false, Some(ShapeKind::Sphere)),
            ],
            active_object: Some("Rock".into()),
            ..Default::default()
        }
    }

    fn names(bodies: &[&HostObject]) -> Vec<String> {
        bodies.iter().map(|o| o.name.clone()).collect()
    }

    #[test]
    fn test_selection_modes() {
        let scene = scene();
        let mut warnings = Vec::new();

        let all = select_bodies(&scene, ObjectSelection::All, &mut warnings);
        assert_eq!(names(&all), ["Hull", "Mast", "Crate", "Rock"]);
        assert_eq!(warnings.len(), 1);

        warnings.clear();
        let selected = select_bodies(&scene, ObjectSelection::Selected, &mut warnings);
        assert_eq!(names(&selected), ["Hull"]);
        assert!(warnings.is_empty());

        let children = select_bodies(&scene, ObjectSelection::Children, &mut warnings);
        assert_eq!(names(&children), ["Hull", "Mast"]);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_common_parent() {
        let scene = scene();
        let hull = scene.object("Hull").unwrap();
        let mast = scene.object("Mast").unwrap();
        let crate_ = scene.object("Crate").unwrap();
        let rock = scene.object("Rock").unwrap();

        assert_eq!(common_parent(&scene, &[mast]).unwrap().name, "Hull");
        assert_eq!(common_parent(&scene, &[hull, mast]).unwrap().name, "Base");
        assert_eq!(common_parent(&scene, &[mast, crate_]).unwrap().name, "Base");
        assert!(common_parent(&scene, &[hull, rock]).is_none());
    }

    #[test]
    fn test_root_transforms() {
        let scene = scene();
        let mast = scene.object("Mast").unwrap();
        let mut warnings = Vec::new();

        let active = root_transform(&scene, &[mast], RootTransform::Active, &mut warnings);
        assert!(active.abs_diff_eq(Mat4::from_translation(Vec3::new(-4.0, 0.0, 0.0)), 1e-6));

        let parent = root_transform(&scene, &[mast], RootTransform::Parent, &mut warnings);
        assert!(parent.abs_diff_eq(Mat4::from_translation(Vec3::new(-4.0, 0.0, 0.0)), 1e-6));

        assert_eq!(root_transform(&scene, &[mast], RootTransform::World, &mut warnings), Mat4::IDENTITY);
        assert!(warnings.is_empty());
    }
}
