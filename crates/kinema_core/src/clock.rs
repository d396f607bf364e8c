//! Frame clock for deterministic rendering.
//!
//! Tracks the integer frame index at a fixed frame rate and converts between
//! seconds and frame counts. Every time-based effect reads its phase from here.

use rustc_hash::FxHashMap;

/// Slack absorbed before rounding a frame count up, so `n / fps` maps back to `n`.
const FRAME_TOLERANCE: f64 = 1e-9;

/// A frame clock with a fixed frame rate.
#[derive(Clone, Debug)]
pub struct Clock {
    /// Frames per second, immutable for a run.
    fps: u32,
    /// Index of the frame currently being built.
    frame_index: u64,
    /// Named durations in seconds.
    durations: FxHashMap<String, f64>,
}

impl Clock {
    /// Create a clock at frame zero.
    pub fn new(fps: u32) -> Self {
        Self {
            fps: fps.max(1),
            frame_index: 0,
            durations: FxHashMap::default(),
        }
    }

    /// Attach a table of named durations (seconds).
    pub fn with_durations(mut self, durations: FxHashMap<String, f64>) -> Self {
        self.durations = durations;
        self
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Seconds elapsed at the current frame (`frame_index / fps`).
    pub fn phase(&self) -> f64 {
        self.frame_index as f64 / self.fps as f64
    }

    /// Length of one frame in seconds.
    pub fn frame_seconds(&self) -> f64 {
        1.0 / self.fps as f64
    }

    /// Number of frames needed to cover `seconds`, rounded up.
    ///
    /// A positive duration never maps to zero frames.
    pub fn frames_for(&self, seconds: f64) -> u32 {
        if seconds.is_nan() || seconds <= 0.0 {
            return 0;
        }
        let exact = self.fps as f64 * seconds;
        let nearest = exact.round();
        let frames = if (exact - nearest).abs() < FRAME_TOLERANCE {
            nearest
        } else {
            exact.ceil()
        };
        (frames as u32).max(1)
    }

    /// Frame count of a named duration, one frame when the name is unknown.
    pub fn frames_for_named(&self, name: &str) -> u32 {
        let seconds = self
            .durations
            .get(name)
            .copied()
            .unwrap_or_else(|| self.frame_seconds());
        self.frames_for(seconds)
    }

    /// Move to the next frame. Only the frame loop calls this.
    pub fn advance(&mut self) {
        self.frame_index += 1;
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(30)
    }
}
