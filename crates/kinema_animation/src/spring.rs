//! Spring-smoothed movement along a path
//!
//! A second-order system chases a "puller" point that travels along the path
//! at uniform arclength speed. The system is parameterized the usual way:
//!
//! - `frequency`: natural frequency in Hz, how fast the point responds
//! - `damping`: 0 oscillates forever, 1 is critically damped, > 1 is sluggish
//! - `response`: < 0 anticipates, 0 eases in, > 1 overshoots
//!
//! Positions are pre-computed once, when the movement is created. After the
//! nominal duration the point keeps integrating toward the final vertex until
//! it settles, so the last position is always the destination.

use kinema_core::{KinemaError, Result, SpringDefaults, Vec3};
use std::f64::consts::PI;
use tracing::{debug, warn};

use crate::path::{safe_divisor, Polyline};

/// Squared distance from the destination under which the point counts as arrived
const SETTLE_POSITION_SQ: f64 = 1e-8;
/// Squared speed under which the point counts as at rest
const SETTLE_VELOCITY_SQ: f64 = 1e-6;

/// Physical parameters of the integrator
#[derive(Clone, Debug, PartialEq)]
pub struct SpringParams {
    pub frequency: f64,
    pub damping: f64,
    pub response: f64,
    /// Integration sub-steps per frame
    pub batch_size: u32,
    pub initial_velocity: Vec3,
    /// Snap to the puller instead of integrating
    pub rigid: bool,
    /// Ceiling on frames appended while settling
    pub max_settle_frames: u32,
}

impl SpringParams {
    pub fn new(frequency: f64, damping: f64, response: f64) -> Self {
        Self {
            frequency,
            damping,
            response,
            ..Self::from(&SpringDefaults::default())
        }
    }

    /// Instantaneous movement: the point sits on the puller every frame
    pub fn rigid() -> Self {
        Self {
            rigid: true,
            ..Self::from(&SpringDefaults::default())
        }
    }

    /// Builder: set sub-steps per frame
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Builder: set the starting velocity
    pub fn with_initial_velocity(mut self, velocity: Vec3) -> Self {
        self.initial_velocity = velocity;
        self
    }

    /// Builder: set the settling ceiling
    pub fn with_max_settle_frames(mut self, frames: u32) -> Self {
        self.max_settle_frames = frames;
        self
    }

    /// Reject parameters outside the integrator's domain
    pub fn validate(&self) -> Result<()> {
        if !(self.frequency.is_finite() && self.frequency > 0.0) {
            return Err(KinemaError::InvalidSpring(format!(
                "frequency must be positive, got {}",
                self.frequency
            )));
        }
        if !(self.damping.is_finite() && self.damping >= 0.0) {
            return Err(KinemaError::InvalidSpring(format!(
                "damping must be non-negative, got {}",
                self.damping
            )));
        }
        if !self.response.is_finite() {
            return Err(KinemaError::InvalidSpring(format!(
                "response must be finite, got {}",
                self.response
            )));
        }
        if self.batch_size == 0 {
            return Err(KinemaError::InvalidSpring(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// `(k1, k2, k3)` of the second-order system
    pub fn coefficients(&self) -> (f64, f64, f64) {
        let omega = 2.0 * PI * self.frequency;
        let k1 = self.damping / safe_divisor(PI * self.frequency);
        let k2 = 1.0 / safe_divisor(omega * omega);
        let k3 = self.response * self.damping / safe_divisor(omega);
        (k1, k2, k3)
    }
}

impl From<&SpringDefaults> for SpringParams {
    fn from(defaults: &SpringDefaults) -> Self {
        Self {
            frequency: defaults.frequency,
            damping: defaults.damping,
            response: defaults.response,
            batch_size: defaults.batch_size,
            initial_velocity: Vec3::ZERO,
            rigid: false,
            max_settle_frames: defaults.max_settle_frames,
        }
    }
}

impl Default for SpringParams {
    fn default() -> Self {
        Self::from(&SpringDefaults::default())
    }
}

/// Pre-computed positions, one per frame
#[derive(Clone, Debug, PartialEq)]
pub struct SmoothPath {
    pub positions: Vec<Vec3>,
    /// Actual frame count, at least the requested one unless the path is degenerate
    pub duration: u32,
}

/// Simulated point and velocity
#[derive(Clone, Copy, Debug)]
struct SpringState {
    position: Vec3,
    velocity: Vec3,
}

impl SpringState {
    /// One explicit micro-step toward `puller`, which moved from `previous`
    fn step(&mut self, puller: Vec3, previous: Vec3, dt: f64, (k1, k2, k3): (f64, f64, f64)) {
        self.position += self.velocity * dt;
        let pull = (puller - previous) * k3 + (puller - self.position - self.velocity * k1);
        self.velocity += pull * (dt / k2);
    }

    fn snap(&mut self, puller: Vec3) {
        self.position = puller;
        self.velocity = Vec3::ZERO;
    }

    fn is_settled(&self, end: Vec3) -> bool {
        (self.position - end).length_squared() <= SETTLE_POSITION_SQ
            && self.velocity.length_squared() <= SETTLE_VELOCITY_SQ
    }

    fn is_finite(&self) -> bool {
        self.position.length_squared().is_finite() && self.velocity.length_squared().is_finite()
    }
}

/// Traverse `path` over `duration` frames at `fps`, smoothed by a spring.
///
/// Never fails: a degenerate path yields the single start point, and a state
/// that diverges falls back to rigid pursuit.
pub fn smooth_path(path: &Polyline, duration: u32, fps: u32, params: &SpringParams) -> SmoothPath {
    if path.is_degenerate() || duration == 0 {
        return SmoothPath {
            positions: vec![path.start()],
            duration: 1,
        };
    }

    let batch = params.batch_size.max(1);
    let dt = 1.0 / (fps.max(1) as f64 * batch as f64);
    let (k1, mut k2, k3) = params.coefficients();
    // Below this bound the semi-implicit step diverges
    let stable_k2 = dt * dt / 2.0 + dt * k1 / 2.0;
    if k2 < stable_k2 {
        debug!(k2, stable_k2, "spring frequency outruns the sub-step, raising k2");
        k2 = stable_k2;
    }
    let coefficients = (k1, k2, k3);

    let mut state = SpringState {
        position: path.start(),
        velocity: params.initial_velocity,
    };
    let mut rigid = params.rigid;
    let mut previous = path.start();
    let micro_steps = duration as f64 * batch as f64;
    let mut positions = Vec::with_capacity(duration as usize);

    for frame in 0..duration {
        for sub in 1..=batch {
            let progress = (frame as f64 * batch as f64 + sub as f64) / micro_steps;
            let puller = path.sample(progress);
            if rigid {
                state.snap(puller);
            } else {
                state.step(puller, previous, dt, coefficients);
                if !state.is_finite() {
                    warn!(frame, "spring diverged, falling back to rigid pursuit");
                    rigid = true;
                    state.snap(puller);
                }
            }
            previous = puller;
        }
        positions.push(state.position);
    }

    let end = path.end();
    let mut extra = 0;
    while !rigid && !state.is_settled(end) && extra < params.max_settle_frames {
        for _ in 0..batch {
            state.step(end, end, dt, coefficients);
        }
        if !state.is_finite() {
            break;
        }
        positions.push(state.position);
        extra += 1;
    }
    if !rigid && !state.is_settled(end) {
        warn!(
            extra,
            "spring did not settle within {} frames, snapping to destination",
            params.max_settle_frames
        );
    }

    if let Some(last) = positions.last_mut() {
        *last = end;
    }

    SmoothPath {
        duration: positions.len() as u32,
        positions,
    }
}
