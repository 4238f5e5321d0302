//! `.skeleton.xml` codec
//!
//! Bones are written in id order with their parent-relative position and
//! angle-axis rotation; the hierarchy follows as `<boneparent>` pairs and the
//! animations as per-bone keyframe tracks. Values use six fixed decimals.
//!
//! Bone transforms and keyframe values are stored exactly as they appear in
//! the document (Ogre space); the skeleton builders own the conversion.

use glam::{Quat, Vec3};
use xmltree::Element;

use super::xml::{ElementExt, FromXml, ToXml, element, fmt_fixed};
use crate::math::{angle_axis_to_quat, quat_to_angle_axis};
use crate::model::{Animation, Bone, Key, Skeleton, Track};
use crate::{FormatError, Warning};

impl ToXml for Skeleton {
    fn to_element(&self) -> Result<Element, FormatError> {
        let mut root = element("skeleton");

        let mut ordered: Vec<&Bone> = self.bones.iter().collect();
        ordered.sort_by_key(|b| b.id);

        let mut bones = element("bones");
        for bone in &ordered {
            bones.push_child(
                element("bone")
                    .with_attr("id", bone.id)
                    .with_attr("name", &bone.name)
                    .with_child(vec3_element("position", bone.position))
                    .with_child(rotation_element("rotation", bone.rotation)),
            );
        }
        root.push_child(bones);

        let mut hierarchy = element("bonehierarchy");
        for bone in &ordered {
            if let Some(parent) = &bone.parent {
                hierarchy.push_child(
                    element("boneparent")
                        .with_attr("bone", &bone.name)
                        .with_attr("parent", parent),
                );
            }
        }
        root.push_child(hierarchy);

        if !self.animations.is_empty() {
            let mut animations = element("animations");
            for animation in &self.animations {
                animations.push_child(write_animation(animation));
            }
            root.push_child(animations);
        }

        Ok(root)
    }
}

fn vec3_element(name: &str, v: Vec3) -> Element {
    element(name)
        .with_attr("x", fmt_fixed(v.x))
        .with_attr("y", fmt_fixed(v.y))
        .with_attr("z", fmt_fixed(v.z))
}

fn rotation_element(name: &str, q: Quat) -> Element {
    let (angle, axis) = quat_to_angle_axis(q);
    element(name)
        .with_attr("angle", fmt_fixed(angle))
        .with_child(vec3_element("axis", axis))
}

fn write_animation(animation: &Animation) -> Element {
    let mut tracks = element("tracks");
    for track in &animation.tracks {
        let mut keyframes = element("keyframes");
        for time in track.keyframe_times() {
            let mut keyframe = element("keyframe").with_attr("time", fmt_fixed(time));
            if let Some(k) = track.translate.iter().find(|k| k.time == time) {
                keyframe.push_child(vec3_element("translate", k.value));
            }
            if let Some(k) = track.rotate.iter().find(|k| k.time == time) {
                keyframe.push_child(rotation_element("rotate", k.value));
            }
            if let Some(k) = track.scale.iter().find(|k| k.time == time) {
                keyframe.push_child(vec3_element("scale", k.value));
            }
            keyframes.push_child(keyframe);
        }
        tracks.push_child(
            element("track")
                .with_attr("bone", &track.bone)
                .with_child(keyframes),
        );
    }

    element("animation")
        .with_attr("name", &animation.name)
        .with_attr("length", fmt_fixed(animation.length))
        .with_child(tracks)
}

// ============================================================================
// Reading
// ============================================================================

impl FromXml for Skeleton {
    const ROOT: &'static str = "skeleton";

    fn from_element(root: &Element, warnings: &mut Vec<Warning>) -> Result<Self, FormatError> {
        let mut skeleton = Skeleton::default();

        if let Some(bones) = root.get_child("bones") {
            for el in bones.elements_named("bone") {
                let name = el.attr("name")?.to_string();
                let position = match el.get_child("position") {
                    Some(p) => read_vec3(p)?,
                    None => Vec3::ZERO,
                };
                let rotation = match el.get_child("rotation") {
                    Some(r) => read_rotation(r).unwrap_or_else(|| {
                        warnings.push(Warning::malformed(format!(
                            "bone '{}' has an unreadable rotation, using identity",
                            name
                        )));
                        Quat::IDENTITY
                    }),
                    None => Quat::IDENTITY,
                };
                skeleton.bones.push(Bone {
                    id: el.attr_parse("id")?,
                    name,
                    parent: None,
                    position,
                    rotation,
                });
            }
        }

        if let Some(hierarchy) = root.get_child("bonehierarchy") {
            for el in hierarchy.elements_named("boneparent") {
                let bone = el.attr("bone")?;
                let parent = el.attr("parent")?;
                match skeleton.bones.iter_mut().find(|b| b.name == bone) {
                    Some(b) => b.parent = Some(parent.to_string()),
                    None => warnings.push(Warning::malformed(format!(
                        "<boneparent> names unknown bone '{}'",
                        bone
                    ))),
                }
            }
        }

        if let Some(animations) = root.get_child("animations") {
            for el in animations.elements_named("animation") {
                skeleton.animations.push(read_animation(el, warnings)?);
            }
        }

        skeleton.sort_by_id();
        Ok(skeleton)
    }
}

fn read_vec3(el: &Element) -> Result<Vec3, FormatError> {
    Ok(Vec3::new(
        el.attr_parse("x")?,
        el.attr_parse("y")?,
        el.attr_parse("z")?,
    ))
}

/// `None` when the angle or axis does not parse (e.g. `#IND` from a
/// degenerate export).
fn read_rotation(el: &Element) -> Option<Quat> {
    let angle: f32 = el.attr_parse("angle").ok()?;
    let axis = read_vec3(el.get_child("axis")?).ok()?;
    if !angle.is_finite() || !axis.is_finite() {
        return None;
    }
    Some(angle_axis_to_quat(angle, axis))
}

fn read_animation(el: &Element, warnings: &mut Vec<Warning>) -> Result<Animation, FormatError> {
    let mut animation = Animation {
        name: el.attr("name")?.to_string(),
        length: el.attr_parse_or("length", 0.0)?,
        tracks: Vec::new(),
    };

    let Some(tracks) = el.get_child("tracks") else {
        return Ok(animation);
    };

    for track_el in tracks.elements_named("track") {
        let mut track = Track::new(track_el.attr("bone")?);
        let mut unreadable = 0usize;

        let keyframes = track_el.get_child("keyframes");
        for key in keyframes.into_iter().flat_map(|k| k.elements_named("keyframe")) {
            let time: f32 = key.attr_parse("time")?;
            if let Some(t) = key.get_child("translate") {
                track.translate.push(Key::new(time, read_vec3(t)?));
            }
            if let Some(r) = key.get_child("rotate") {
                match read_rotation(r) {
                    Some(q) => track.rotate.push(Key::new(time, q)),
                    None => unreadable += 1,
                }
            }
            if let Some(s) = key.get_child("scale") {
                track.scale.push(Key::new(time, read_vec3(s)?));
            }
        }

        if unreadable > 0 {
            warnings.push(Warning::malformed(format!(
                "animation '{}', bone '{}': skipped {} rotation keys with unreadable axis",
                animation.name, track.bone, unreadable
            )));
        }
        animation.tracks.push(track);
    }

    Ok(animation)
}
