//! Host actions → Ogre animations
//!
//! Every exported action is played from a reset pose, sampled frame by frame,
//! and its translation keys are re-expressed in the bone's rest frame. Channels
//! that never leave identity are pruned afterwards.

use glam::Mat3;
use hashbrown::HashMap;
use ogre_common::Warning;
use ogre_common::math::{bone_rotation_to_target, key_frame_matrix};
use ogre_common::model::{Animation, Key, Track};
use tracing::{debug, info};

use super::interpolate::PoseSource;
use crate::host::{HostAction, HostArmature, HostScene};

/// Bones whose name starts with this are rig helpers and never exported.
pub const HELPER_PREFIX: &str = "H_";

/// Frame rate and stride used when sampling.
#[derive(Debug, Clone, Copy)]
pub struct SampleRate {
    pub fps: f32,
    pub frame_step: u32,
}

impl SampleRate {
    pub fn from_scene(scene: &HostScene, frame_step: Option<u32>) -> Self {
        Self {
            fps: scene.fps,
            frame_step: frame_step.unwrap_or(scene.frame_step).max(1),
        }
    }
}

/// Sample every action listed on `armature`.
pub fn sample_animations(
    scene: &HostScene,
    armature: &HostArmature,
    source: &mut dyn PoseSource,
    rate: SampleRate,
    warnings: &mut Vec<Warning>,
) -> Vec<Animation> {
    let mut animations = Vec::new();
    for name in &armature.actions {
        let Some(action) = scene.action(name) else {
            warnings.push(Warning::missing(format!(
                "armature '{}' lists action '{}', which is not in the scene",
                armature.name, name
            )));
            continue;
        };
        animations.push(sample_action(armature, action, source, rate));
    }
    animations
}

/// Per-bone matrices mapping pose-space locations into the key frame.
fn key_frames(armature: &HostArmature) -> HashMap<&str, Mat3> {
    let rest: HashMap<&str, Mat3> = armature
        .bones
        .iter()
        .map(|b| (b.name.as_str(), Mat3::from_mat4(b.matrix_local)))
        .collect();

    armature
        .bones
        .iter()
        .map(|b| {
            let parent = b.parent.as_deref().and_then(|p| rest.get(p)).copied();
            (b.name.as_str(), key_frame_matrix(rest[b.name.as_str()], parent))
        })
        .collect()
}

pub fn sample_action(
    armature: &HostArmature,
    action: &HostAction,
    source: &mut dyn PoseSource,
    rate: SampleRate,
) -> Animation {
    let frames = key_frames(armature);
    let bones: Vec<_> = armature
        .bones
        .iter()
        .filter(|b| !b.name.starts_with(HELPER_PREFIX))
        .collect();

    source.reset_pose();
    source.set_action(&action.name);

    let mut tracks: Vec<Track> = bones.iter().map(|b| Track::new(&b.name)).collect();
    let start = action.frame_start;
    let end = action.frame_end;

    for frame in (start..=end).step_by(rate.frame_step as usize) {
        let time = (frame - start) as f32 / rate.fps;
        for (bone, track) in bones.iter().zip(&mut tracks) {
            let pose = source.sample(&bone.name, frame as f32);
            let location = frames[bone.name.as_str()] * pose.location;
            let rotation = bone_rotation_to_target(pose.rotation.normalize());
            track.translate.push(Key::new(time, location));
            track.rotate.push(Key::new(time, rotation));
            track.scale.push(Key::new(time, pose.scale));
        }
    }

    let mut animation = Animation {
        name: action.name.clone(),
        length: ((end - start) as f32 / rate.fps).max(0.0),
        tracks,
    };
    let sampled = animation.tracks.len();
    animation.prune_identity_tracks();
    debug!(
        "Action '{}': kept {} of {} tracks",
        action.name,
        animation.tracks.len(),
        sampled
    );
    info!(
        "Sampled animation '{}' ({} frames, {:.2}s)",
        animation.name,
        (end - start).max(0) + 1,
        animation.length
    );
    animation
}
