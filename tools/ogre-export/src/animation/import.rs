//! Ogre animations → editor action curves
//!
//! The inverse of the sampler: rotation keys are remapped back to the editor's
//! bone axes and kept on one hemisphere, translation keys are rotated out of
//! the rest-relative key frame, and times become frame numbers.

use glam::{Mat3, Quat, Vec3};
use hashbrown::HashMap;
use ogre_common::Warning;
use ogre_common::math::{bone_rotation_to_source, key_frame_matrix};
use ogre_common::model::{Animation, Track};
use serde::Serialize;
use tracing::{debug, info};

use crate::skeleton::ImportedSkeleton;

/// Consecutive rotation keys with a dot product below this are flipped.
pub const FLIP_THRESHOLD: f32 = -0.8;

/// Keyframes inspected when estimating the frame rate.
const FPS_SAMPLE_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameKey<T> {
    pub frame: f32,
    pub value: T,
}

/// Pose-space channels of one bone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActionTrack {
    pub bone: String,
    pub location: Vec<FrameKey<Vec3>>,
    pub rotation: Vec<FrameKey<Quat>>,
    pub scale: Vec<FrameKey<Vec3>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportedAction {
    pub name: String,
    pub fps: f32,
    pub tracks: Vec<ActionTrack>,
}

/// How keyframe times become frames.
#[derive(Debug, Clone, Copy)]
pub struct FrameTiming {
    pub fps: f32,
    pub round_frames: bool,
}

impl FrameTiming {
    fn frame(&self, time: f32) -> f32 {
        let frame = time * self.fps;
        if self.round_frames { frame.round() } else { frame }
    }
}

/// Highest keyframe rate (`1 / Δt`) over the first keyframes of all tracks,
/// rounded to two decimals. Zero when there are not two increasing times.
pub fn analyse_fps(animations: &[Animation]) -> f32 {
    let mut fps = 0.0f32;
    let mut last = f32::INFINITY;
    let times = animations
        .iter()
        .flat_map(|a| a.tracks.iter())
        .flat_map(Track::keyframe_times)
        .take(FPS_SAMPLE_LIMIT + 1);
    for time in times {
        if time > last {
            fps = fps.max(1.0 / (time - last));
        }
        last = time;
    }
    (fps * 100.0).round() / 100.0
}

/// Frame timing for an import: the analysed whole-number rate when rounding
/// frames, otherwise `fps` as configured.
pub fn frame_timing(animations: &[Animation], fps: f32, round_frames: bool) -> FrameTiming {
    if round_frames {
        let analysed = analyse_fps(animations).trunc();
        if analysed > 0.0 {
            info!("Using analysed frame rate {}", analysed);
            return FrameTiming {
                fps: analysed,
                round_frames,
            };
        }
    }
    FrameTiming { fps, round_frames }
}

/// Convert every animation. Tracks for bones the skeleton does not have are
/// skipped with one warning each.
pub fn import_animations(
    skeleton: &ImportedSkeleton,
    timing: FrameTiming,
    warnings: &mut Vec<Warning>,
) -> Vec<ImportedAction> {
    let rest: HashMap<&str, Mat3> = skeleton
        .bones
        .iter()
        .map(|b| (b.name.as_str(), b.rest))
        .collect();
    let frames: HashMap<&str, Mat3> = skeleton
        .bones
        .iter()
        .map(|b| {
            let parent = b.parent.as_deref().and_then(|p| rest.get(p)).copied();
            (b.name.as_str(), key_frame_matrix(b.rest, parent))
        })
        .collect();

    skeleton
        .animations
        .iter()
        .map(|animation| {
            let mut action = ImportedAction {
                name: animation.name.clone(),
                fps: timing.fps,
                tracks: Vec::new(),
            };
            for track in &animation.tracks {
                let Some(frame_matrix) = frames.get(track.bone.as_str()) else {
                    warnings.push(Warning::malformed(format!(
                        "animation '{}' drives unknown bone '{}', track skipped",
                        animation.name, track.bone
                    )));
                    continue;
                };
                action.tracks.push(import_track(track, *frame_matrix, timing));
            }
            debug!("Imported action '{}' with {} tracks", action.name, action.tracks.len());
            action
        })
        .collect()
}

fn import_track(track: &Track, frame_matrix: Mat3, timing: FrameTiming) -> ActionTrack {
    let inverse = frame_matrix.transpose();

    let location = track
        .translate
        .iter()
        .map(|k| FrameKey {
            frame: timing.frame(k.time),
            value: inverse * k.value,
        })
        .collect();

    let mut rotation: Vec<FrameKey<Quat>> = Vec::with_capacity(track.rotate.len());
    for key in &track.rotate {
        let mut q = bone_rotation_to_source(key.value);
        if let Some(previous) = rotation.last() {
            if previous.value.dot(q) < FLIP_THRESHOLD {
                q = -q;
            }
        }
        rotation.push(FrameKey {
            frame: timing.frame(key.time),
            value: q,
        });
    }

    let scale = track
        .scale
        .iter()
        .map(|k| FrameKey {
            frame: timing.frame(k.time),
            value: k.value,
        })
        .collect();

    ActionTrack {
        bone: track.bone.clone(),
        location,
        rotation,
        scale,
    }
}
