//! Skeletal animation in both directions
//!
//! - `interpolate`: the [`PoseSource`] seam and the keyed-curve player
//! - `sampler`: host actions → Ogre tracks
//! - `import`: Ogre tracks → action curves

pub mod import;
pub mod interpolate;
pub mod sampler;

pub use import::{ImportedAction, analyse_fps, frame_timing, import_animations};
pub use interpolate::{ActionPlayer, PoseSample, PoseSource};
pub use sampler::{SampleRate, sample_animations};
