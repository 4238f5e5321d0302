//! Animation records: per-bone translate/rotate/scale channels

use glam::{Quat, Vec3};
use serde::Serialize;

/// A channel is kept only if some sample moves further than this from identity.
pub const IDENTITY_EPSILON: f32 = 1e-5;

/// One sample of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Key<T> {
    /// Seconds from the start of the animation
    pub time: f32,
    pub value: T,
}

impl<T> Key<T> {
    pub fn new(time: f32, value: T) -> Self {
        Self { time, value }
    }
}

/// The channels driving a single bone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Track {
    pub bone: String,
    pub translate: Vec<Key<Vec3>>,
    pub rotate: Vec<Key<Quat>>,
    pub scale: Vec<Key<Vec3>>,
}

impl Track {
    pub fn new(bone: impl Into<String>) -> Self {
        Self {
            bone: bone.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.translate.is_empty() && self.rotate.is_empty() && self.scale.is_empty()
    }

    /// Drop every channel whose samples all stay within `eps` of identity.
    pub fn prune_identity(&mut self, eps: f32) {
        if !self.translate.iter().any(|k| deviates(k.value, Vec3::ZERO, eps)) {
            self.translate.clear();
        }
        if !self.rotate.iter().any(|k| quat_deviates(k.value, eps)) {
            self.rotate.clear();
        }
        if !self.scale.iter().any(|k| deviates(k.value, Vec3::ONE, eps)) {
            self.scale.clear();
        }
    }

    /// Sorted, de-duplicated sample times across all three channels.
    pub fn keyframe_times(&self) -> Vec<f32> {
        let mut times: Vec<f32> = self
            .translate
            .iter()
            .map(|k| k.time)
            .chain(self.rotate.iter().map(|k| k.time))
            .chain(self.scale.iter().map(|k| k.time))
            .collect();
        times.sort_by(f32::total_cmp);
        times.dedup();
        times
    }
}

fn deviates(v: Vec3, identity: Vec3, eps: f32) -> bool {
    (v - identity).abs().max_element() > eps
}

// Compared component-wise against (w, x, y, z) = (1, 0, 0, 0)
fn quat_deviates(q: Quat, eps: f32) -> bool {
    (q.w - 1.0).abs() > eps || q.x.abs() > eps || q.y.abs() > eps || q.z.abs() > eps
}

/// A named clip.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Animation {
    pub name: String,
    /// Seconds
    pub length: f32,
    pub tracks: Vec<Track>,
}

impl Animation {
    /// Prune identity channels, then drop tracks left with nothing.
    pub fn prune_identity_tracks(&mut self) {
        for track in &mut self.tracks {
            track.prune_identity(IDENTITY_EPSILON);
        }
        self.tracks.retain(|t| !t.is_empty());
    }

    pub fn track(&self, bone: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.bone == bone)
    }
}
