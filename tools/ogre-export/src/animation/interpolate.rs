//! Pose evaluation for keyed host actions
//!
//! The sampler asks a [`PoseSource`] for each bone's pose-space transform at
//! each frame. [`ActionPlayer`] plays the snapshot's keyed curves: linear for
//! location and scale, shortest-arc slerp for rotation.

use glam::{Quat, Vec3};
use hashbrown::HashMap;

use crate::host::{HostAction, HostPoseKey, HostScene};

/// A bone's pose relative to its rest transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    pub location: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl PoseSample {
    pub const IDENTITY: Self = Self {
        location: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };
}

impl Default for PoseSample {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Something that can pose an armature frame by frame.
///
/// Bones the current action does not drive keep whatever pose they had last,
/// so callers reset between actions.
pub trait PoseSource {
    /// Put every bone back at its rest pose.
    fn reset_pose(&mut self);

    /// Make `action` current. Returns `false` when it does not exist.
    fn set_action(&mut self, action: &str) -> bool;

    fn sample(&mut self, bone: &str, frame: f32) -> PoseSample;
}

/// Plays the keyed curves stored in a [`HostScene`].
pub struct ActionPlayer<'a> {
    scene: &'a HostScene,
    action: Option<&'a HostAction>,
    pose: HashMap<String, PoseSample>,
}

impl<'a> ActionPlayer<'a> {
    pub fn new(scene: &'a HostScene) -> Self {
        Self {
            scene,
            action: None,
            pose: HashMap::new(),
        }
    }
}

impl PoseSource for ActionPlayer<'_> {
    fn reset_pose(&mut self) {
        self.pose.clear();
    }

    fn set_action(&mut self, action: &str) -> bool {
        self.action = self.scene.action(action);
        self.action.is_some()
    }

    fn sample(&mut self, bone: &str, frame: f32) -> PoseSample {
        let keys = self
            .action
            .and_then(|a| a.curves_for(bone))
            .map(|c| c.keys.as_slice())
            .filter(|k| !k.is_empty());

        match keys {
            Some(keys) => {
                let sample = PoseSample {
                    location: interpolate_vec3(keys, frame, |k| k.location),
                    rotation: interpolate_quat(keys, frame),
                    scale: interpolate_vec3(keys, frame, |k| k.scale),
                };
                self.pose.insert(bone.to_string(), sample);
                sample
            }
            None => self.pose.get(bone).copied().unwrap_or_default(),
        }
    }
}

// ============================================================================
// Interpolation
// ============================================================================

/// Index of the segment containing `frame` and the blend factor within it.
/// `None` past the last key.
fn segment(keys: &[HostPoseKey], frame: f32) -> Option<(usize, f32)> {
    let mut i = 0;
    while i < keys.len() - 1 && keys[i + 1].frame < frame {
        i += 1;
    }
    if i >= keys.len() - 1 {
        return None;
    }

    let f0 = keys[i].frame;
    let f1 = keys[i + 1].frame;
    let factor = if f1 > f0 { (frame - f0) / (f1 - f0) } else { 0.0 };
    Some((i, factor.clamp(0.0, 1.0)))
}

fn interpolate_vec3(keys: &[HostPoseKey], frame: f32, channel: impl Fn(&HostPoseKey) -> Vec3) -> Vec3 {
    match segment(keys, frame) {
        Some((i, factor)) => channel(&keys[i]).lerp(channel(&keys[i + 1]), factor),
        None => channel(&keys[keys.len() - 1]),
    }
}

fn interpolate_quat(keys: &[HostPoseKey], frame: f32) -> Quat {
    match segment(keys, frame) {
        Some((i, factor)) => slerp(keys[i].rotation, keys[i + 1].rotation, factor),
        None => keys[keys.len() - 1].rotation,
    }
}

fn slerp(q0: Quat, q1: Quat, t: f32) -> Quat {
    let mut dot = q0.dot(q1);

    // Shortest path
    let mut q1 = q1;
    if dot < 0.0 {
        q1 = -q1;
        dot = -dot;
    }

    if dot > 0.9995 {
        return (q0 + (q1 - q0) * t).normalize();
    }

    let theta_0 = dot.acos();
    let theta = theta_0 * t;
    let s0 = (theta_0 - theta).sin() / theta_0.sin();
    let s1 = theta.sin() / theta_0.sin();
    q0 * s0 + q1 * s1
}
