//! Motion records and their per-kind step functions
//!
//! A record is inert while its step is negative (delay), runs while
//! `0 <= step < duration - 1`, and finishes on the tick that is handed
//! `step == duration - 1`, which commits the end value exactly.

use kinema_core::{Affine2D, Attribute, AttributeValue, Clock, EntityId, Vec3, Volume};
use smallvec::{smallvec, SmallVec};

use crate::perturb::{compose_rotation, rotation_angle};

/// Lifecycle of a record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotionPhase {
    /// Delay not yet elapsed
    Pending,
    Running,
    /// Terminal; the scheduler drops the record
    Finished,
}

/// Linear interpolation between two resolved values
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScalarMotion {
    pub start: f64,
    pub end: f64,
}

impl ScalarMotion {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Value after `step` of `duration` frames; exactly `end` once complete
    pub fn value(&self, step: u32, duration: u32) -> f64 {
        if step >= duration {
            return self.end;
        }
        self.start + (self.end - self.start) * step as f64 / duration as f64
    }

    pub fn is_noop(&self) -> bool {
        self.start == self.end
    }
}

/// Radius interpolation for a single anchor
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadiusMotion {
    pub radius: ScalarMotion,
    /// Keep the base fixed instead of the centre
    pub centred: bool,
}

/// Per-anchor radius interpolation for two-anchor volumes
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TubeRadiusMotion {
    pub radii: [ScalarMotion; 2],
    pub centred: bool,
}

/// Pre-computed positions of the primary anchor
#[derive(Clone, Debug, PartialEq)]
pub struct MovementMotion {
    pub positions: Vec<Vec3>,
}

/// Spin of the volume's 2-D transform
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RotationMotion {
    /// Transform captured when the motion was created
    pub base: Affine2D,
    /// Phase offset of the target volume
    pub phase: f64,
    pub freq: f64,
    pub clockwise: bool,
    /// Compose on the right of `base` instead of the left
    pub relative: bool,
}

/// Kind tag plus payload
#[derive(Clone, Debug, PartialEq)]
pub enum MotionKind {
    Alpha(ScalarMotion),
    Opacity(ScalarMotion),
    Radius(RadiusMotion),
    TubeRadius(TubeRadiusMotion),
    Movement(MovementMotion),
    Rotation(RotationMotion),
}

pub(crate) type Updates = SmallVec<[(Attribute, AttributeValue); 4]>;

/// Radius commit for anchor `index` plus, when centred, the anchor shift
/// that keeps its base in place.
fn radius_updates(
    updates: &mut Updates,
    index: usize,
    radius: &ScalarMotion,
    centred: bool,
    step: u32,
    duration: u32,
    volume: &Volume,
) {
    let next = radius.value(step + 1, duration);
    updates.push((Attribute::AnchorRadius(index), AttributeValue::Scalar(next)));

    if centred {
        // The first step also absorbs any gap between the live radius and the
        // resolved start radius.
        let delta = if step == 0 {
            next - volume.radii[index]
        } else {
            next - radius.value(step, duration)
        };
        let anchor = volume.anchors[index] - Vec3::DOWN * delta;
        updates.push((Attribute::Anchor(index), AttributeValue::Point(anchor)));
    }
}

impl MotionKind {
    pub fn name(&self) -> &'static str {
        match self {
            MotionKind::Alpha(_) => "alpha",
            MotionKind::Opacity(_) => "opacity",
            MotionKind::Radius(_) => "radius",
            MotionKind::TubeRadius(_) => "tube-radius",
            MotionKind::Movement(_) => "movement",
            MotionKind::Rotation(_) => "rotation",
        }
    }

    /// Attribute values for `step + 1`.
    ///
    /// `step` is already clamped to `duration - 1`.
    pub(crate) fn step(&self, step: u32, duration: u32, volume: &Volume, clock: &Clock) -> Updates {
        match self {
            MotionKind::Alpha(scalar) => smallvec![(
                Attribute::Alpha,
                AttributeValue::Scalar(scalar.value(step + 1, duration))
            )],
            MotionKind::Opacity(scalar) => smallvec![(
                Attribute::Opacity,
                AttributeValue::Scalar(scalar.value(step + 1, duration))
            )],
            MotionKind::Radius(motion) => {
                let mut updates = Updates::new();
                radius_updates(
                    &mut updates,
                    0,
                    &motion.radius,
                    motion.centred,
                    step,
                    duration,
                    volume,
                );
                updates
            }
            MotionKind::TubeRadius(motion) => {
                let mut updates = Updates::new();
                for (index, radius) in motion.radii.iter().enumerate() {
                    radius_updates(
                        &mut updates,
                        index,
                        radius,
                        motion.centred,
                        step,
                        duration,
                        volume,
                    );
                }
                updates
            }
            MotionKind::Movement(motion) => {
                let index = (step as usize).min(motion.positions.len() - 1);
                smallvec![(
                    Attribute::Position,
                    AttributeValue::Point(motion.positions[index])
                )]
            }
            MotionKind::Rotation(motion) => {
                let angle = rotation_angle(
                    clock.frame_index(),
                    clock.fps(),
                    motion.phase,
                    motion.freq,
                    motion.clockwise,
                );
                let transform =
                    compose_rotation(&motion.base, &Affine2D::rotation(angle), motion.relative);
                smallvec![(Attribute::Transform, AttributeValue::Transform(transform))]
            }
        }
    }
}

/// Values produced by one tick of a record
#[derive(Clone, Debug, Default)]
pub(crate) struct StepOutcome {
    pub updates: Updates,
    pub finished: bool,
    /// The record reached its next early-stop frame on this tick
    pub checkpoint: bool,
}

/// One in-flight animation
#[derive(Clone, Debug, PartialEq)]
pub struct MotionRecord {
    target: EntityId,
    step: i64,
    duration: u32,
    early_stop: SmallVec<[u32; 4]>,
    kind: MotionKind,
}

impl MotionRecord {
    /// `duration` must be at least 1 and `early_stop` sorted within `[0, duration)`;
    /// builders guarantee both.
    pub(crate) fn new(
        target: EntityId,
        duration: u32,
        delay: u32,
        early_stop: SmallVec<[u32; 4]>,
        kind: MotionKind,
    ) -> Self {
        debug_assert!(duration >= 1);
        Self {
            target,
            step: -(delay as i64),
            duration,
            early_stop,
            kind,
        }
    }

    pub fn target(&self) -> EntityId {
        self.target
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn kind(&self) -> &MotionKind {
        &self.kind
    }

    /// Early-stop frames not yet reached
    pub fn early_stop(&self) -> &[u32] {
        &self.early_stop
    }

    pub fn phase(&self) -> MotionPhase {
        if self.step < 0 {
            MotionPhase::Pending
        } else if self.step >= self.duration as i64 {
            MotionPhase::Finished
        } else {
            MotionPhase::Running
        }
    }

    /// Advance by one frame, returning the values to commit.
    pub(crate) fn advance(&mut self, volume: &Volume, clock: &Clock) -> StepOutcome {
        if self.step < 0 {
            self.step += 1;
            return StepOutcome::default();
        }

        let last = self.duration - 1;
        let step = (self.step as u32).min(last);
        let updates = self.kind.step(step, self.duration, volume, clock);
        let finished = step >= last;
        self.step = step as i64 + 1;

        let checkpoint = !finished && self.early_stop.first() == Some(&step);
        if checkpoint {
            self.early_stop.remove(0);
        }

        StepOutcome {
            updates,
            finished,
            checkpoint,
        }
    }
}
