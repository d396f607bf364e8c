//! Render configuration
//!
//! Read-only for the duration of a run. Scenes describe it in the `[render]`
//! table of their TOML file; every field has a default.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Top-level render configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RenderConfig {
    /// Frames per second
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Low-fidelity preview: cosmetic effects (levitation) are skipped
    #[serde(default)]
    pub draft: bool,
    /// Seed for per-volume random phase offsets
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub levitation: LevitationConfig,
    #[serde(default)]
    pub rotation: RotationConfig,
    #[serde(default)]
    pub spring: SpringDefaults,
    /// Named durations in seconds
    #[serde(default)]
    pub durations: FxHashMap<String, f64>,
}

fn default_fps() -> u32 {
    30
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            draft: false,
            seed: 0,
            levitation: LevitationConfig::default(),
            rotation: RotationConfig::default(),
            spring: SpringDefaults::default(),
            durations: FxHashMap::default(),
        }
    }
}

/// Global mode of a periodic perturbation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PerturbationMode {
    /// Disabled everywhere
    #[default]
    Off,
    /// Every volume shares phase offset 0
    Fixed,
    /// Each volume draws its own phase offset once, at spawn
    Random,
}

/// Levitation (vertical bobbing) defaults
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LevitationConfig {
    #[serde(default)]
    pub mode: PerturbationMode,
    /// Peak altitude offset
    #[serde(default = "default_levitation_height")]
    pub height: f64,
    /// Oscillations per second
    #[serde(default = "default_levitation_freq")]
    pub freq: f64,
}

fn default_levitation_height() -> f64 {
    0.1
}

fn default_levitation_freq() -> f64 {
    0.25
}

impl Default for LevitationConfig {
    fn default() -> Self {
        Self {
            mode: PerturbationMode::Off,
            height: default_levitation_height(),
            freq: default_levitation_freq(),
        }
    }
}

/// Rotation defaults
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RotationConfig {
    #[serde(default)]
    pub mode: PerturbationMode,
    /// Turns per second
    #[serde(default = "default_rotation_freq")]
    pub freq: f64,
    #[serde(default)]
    pub clockwise: bool,
}

fn default_rotation_freq() -> f64 {
    0.1
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            mode: PerturbationMode::Off,
            freq: default_rotation_freq(),
            clockwise: false,
        }
    }
}

/// Default physical parameters for smooth movement
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SpringDefaults {
    #[serde(default = "default_frequency")]
    pub frequency: f64,
    #[serde(default = "default_damping")]
    pub damping: f64,
    #[serde(default)]
    pub response: f64,
    /// Integration sub-steps per frame
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    /// Ceiling on frames appended while the spring settles
    #[serde(default = "default_max_settle_frames")]
    pub max_settle_frames: u32,
}

fn default_frequency() -> f64 {
    1.0
}

fn default_damping() -> f64 {
    1.0
}

fn default_batch_size() -> u32 {
    10
}

fn default_max_settle_frames() -> u32 {
    600
}

impl Default for SpringDefaults {
    fn default() -> Self {
        Self {
            frequency: default_frequency(),
            damping: default_damping(),
            response: 0.0,
            batch_size: default_batch_size(),
            max_settle_frames: default_max_settle_frames(),
        }
    }
}
