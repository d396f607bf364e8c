//! Motion builders
//!
//! Turn a high-level request ("grow this volume to twice its radius over 20
//! frames") into a [`MotionRecord`]. Start and end values use a signed
//! convention: a non-negative value multiplies the attribute's current value,
//! a negative value's magnitude replaces it outright.
//!
//! # Example
//!
//! ```ignore
//! let request = MotionRequest::radius(ball, 1.0, 2.0, 20)
//!     .centred(true)
//!     .delay(5)
//!     .early_stop([10]);
//! scheduler.create(&world, request)?;
//! ```

use kinema_core::{EntityId, KinemaError, Result, Shape, Vec3, Volume, World};
use smallvec::SmallVec;

use crate::motion::{
    MotionKind, MotionRecord, MovementMotion, RadiusMotion, RotationMotion, ScalarMotion,
    TubeRadiusMotion,
};
use crate::path::Polyline;
use crate::spring::{smooth_path, SpringParams};

/// Resolve a signed "with" value against the attribute's current value.
pub fn resolve_with(with: f64, current: f64) -> f64 {
    if with >= 0.0 {
        with * current
    } else {
        -with
    }
}

/// Radius value for one or both anchors
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RadiusWith {
    Uniform(f64),
    PerAnchor([f64; 2]),
}

impl RadiusWith {
    fn for_anchor(&self, index: usize) -> f64 {
        match self {
            RadiusWith::Uniform(with) => *with,
            RadiusWith::PerAnchor(pair) => pair[index],
        }
    }
}

impl From<f64> for RadiusWith {
    fn from(with: f64) -> Self {
        RadiusWith::Uniform(with)
    }
}

impl From<[f64; 2]> for RadiusWith {
    fn from(pair: [f64; 2]) -> Self {
        RadiusWith::PerAnchor(pair)
    }
}

/// Where a movement goes
#[derive(Clone, Debug, PartialEq)]
pub enum PathSpec {
    /// Explicit waypoints; the current position is prepended when the list
    /// does not already start there
    Waypoints(Vec<Vec3>),
    /// A single destination, absolute or relative to the current position
    Destination { point: Vec3, relative: bool },
}

/// Movement parameters
#[derive(Clone, Debug, PartialEq)]
pub struct MovementParams {
    pub path: PathSpec,
    /// `None` uses the world's spring defaults
    pub spring: Option<SpringParams>,
}

/// Kind-specific parameters of a request
#[derive(Clone, Debug, PartialEq)]
pub enum MotionParams {
    Alpha {
        start: f64,
        end: f64,
    },
    Opacity {
        start: f64,
        end: f64,
    },
    Radius {
        start: RadiusWith,
        end: RadiusWith,
        centred: bool,
    },
    Movement(MovementParams),
    Rotation {
        /// `None` uses the configured rotation frequency
        freq: Option<f64>,
        /// `None` uses the configured handedness
        clockwise: Option<bool>,
        relative: bool,
    },
}

/// A request for a new motion
#[derive(Clone, Debug, PartialEq)]
pub struct MotionRequest {
    pub target: EntityId,
    /// Frames, at least 1
    pub duration: u32,
    /// Frames to wait before the first update
    pub delay: u32,
    /// Frame offsets at which the run loop suspends
    pub early_stop: SmallVec<[u32; 4]>,
    pub params: MotionParams,
}

impl MotionRequest {
    pub fn new(target: EntityId, duration: u32, params: MotionParams) -> Self {
        Self {
            target,
            duration,
            delay: 0,
            early_stop: SmallVec::new(),
            params,
        }
    }

    pub fn alpha(target: EntityId, start: f64, end: f64, duration: u32) -> Self {
        Self::new(target, duration, MotionParams::Alpha { start, end })
    }

    pub fn opacity(target: EntityId, start: f64, end: f64, duration: u32) -> Self {
        Self::new(target, duration, MotionParams::Opacity { start, end })
    }

    pub fn radius(
        target: EntityId,
        start: impl Into<RadiusWith>,
        end: impl Into<RadiusWith>,
        duration: u32,
    ) -> Self {
        Self::new(
            target,
            duration,
            MotionParams::Radius {
                start: start.into(),
                end: end.into(),
                centred: false,
            },
        )
    }

    pub fn movement(target: EntityId, path: PathSpec, duration: u32) -> Self {
        Self::new(
            target,
            duration,
            MotionParams::Movement(MovementParams { path, spring: None }),
        )
    }

    pub fn rotation(target: EntityId, duration: u32) -> Self {
        Self::new(
            target,
            duration,
            MotionParams::Rotation {
                freq: None,
                clockwise: None,
                relative: false,
            },
        )
    }

    /// Builder: wait `frames` before starting
    pub fn delay(mut self, frames: u32) -> Self {
        self.delay = frames;
        self
    }

    /// Builder: suspend the run loop at these frame offsets
    pub fn early_stop(mut self, frames: impl IntoIterator<Item = u32>) -> Self {
        self.early_stop = frames.into_iter().collect();
        self
    }

    /// Builder: keep the base fixed (radius motions only)
    pub fn centred(mut self, centred: bool) -> Self {
        if let MotionParams::Radius { centred: c, .. } = &mut self.params {
            *c = centred;
        }
        self
    }

    /// Builder: compose rotation relative to the current orientation
    pub fn relative(mut self, relative: bool) -> Self {
        if let MotionParams::Rotation { relative: r, .. } = &mut self.params {
            *r = relative;
        }
        self
    }

    /// Builder: override spring parameters (movement only)
    pub fn spring(mut self, params: SpringParams) -> Self {
        if let MotionParams::Movement(movement) = &mut self.params {
            movement.spring = Some(params);
        }
        self
    }

    /// Resolve the request against the world.
    ///
    /// `Ok(None)` means there is nothing to animate.
    pub fn build(self, world: &World) -> Result<Option<MotionRecord>> {
        if self.duration == 0 {
            return Err(KinemaError::InvalidDuration(self.duration));
        }
        let volume = world.volume(self.target)?;

        let mut early_stop = self.early_stop;
        early_stop.sort_unstable();
        early_stop.dedup();
        if let Some(&frame) = early_stop.iter().find(|f| **f >= self.duration) {
            return Err(KinemaError::EarlyStopOutOfRange {
                frame,
                duration: self.duration,
            });
        }

        let built = match self.params {
            MotionParams::Alpha { start, end } => {
                scalar_motion(start, end, volume.alpha).map(|s| (MotionKind::Alpha(s), self.duration))
            }
            MotionParams::Opacity { start, end } => scalar_motion(start, end, volume.opacity)
                .map(|s| (MotionKind::Opacity(s), self.duration)),
            MotionParams::Radius {
                start,
                end,
                centred,
            } => radius_motion(volume, start, end, centred)?.map(|kind| (kind, self.duration)),
            MotionParams::Movement(movement) => movement_motion(world, volume, movement, self.duration)?,
            MotionParams::Rotation {
                freq,
                clockwise,
                relative,
            } => {
                let defaults = &world.config().rotation;
                Some((
                    MotionKind::Rotation(RotationMotion {
                        base: volume.transform,
                        phase: volume.rotation_phase,
                        freq: freq.unwrap_or(defaults.freq),
                        clockwise: clockwise.unwrap_or(defaults.clockwise),
                        relative,
                    }),
                    self.duration,
                ))
            }
        };

        Ok(built.map(|(kind, duration)| {
            MotionRecord::new(self.target, duration, self.delay, early_stop, kind)
        }))
    }
}

fn scalar_motion(start: f64, end: f64, current: f64) -> Option<ScalarMotion> {
    let scalar = ScalarMotion::new(resolve_with(start, current), resolve_with(end, current));
    (!scalar.is_noop()).then_some(scalar)
}

fn radius_motion(
    volume: &Volume,
    start: RadiusWith,
    end: RadiusWith,
    centred: bool,
) -> Result<Option<MotionKind>> {
    match volume.shape {
        Shape::Sphere | Shape::Polyhedron { .. } => {
            let (RadiusWith::Uniform(start), RadiusWith::Uniform(end)) = (start, end) else {
                return Err(KinemaError::UnsupportedMotion {
                    motion: "per-anchor radius",
                    shape: volume.shape.name(),
                });
            };
            Ok(scalar_motion(start, end, volume.radius()).map(|radius| {
                MotionKind::Radius(RadiusMotion { radius, centred })
            }))
        }
        Shape::Tube => {
            let radii = [0, 1].map(|i| {
                let current = volume.radii[i];
                ScalarMotion::new(
                    resolve_with(start.for_anchor(i), current),
                    resolve_with(end.for_anchor(i), current),
                )
            });
            if radii.iter().all(ScalarMotion::is_noop) {
                return Ok(None);
            }
            Ok(Some(MotionKind::TubeRadius(TubeRadiusMotion {
                radii,
                centred,
            })))
        }
    }
}

fn movement_motion(
    world: &World,
    volume: &Volume,
    movement: MovementParams,
    duration: u32,
) -> Result<Option<(MotionKind, u32)>> {
    let current = volume.position();
    let vertices = match movement.path {
        PathSpec::Waypoints(waypoints) => {
            if waypoints.is_empty() {
                return Err(KinemaError::MalformedPath("no waypoints".to_string()));
            }
            if waypoints[0] == current {
                waypoints
            } else {
                std::iter::once(current).chain(waypoints).collect()
            }
        }
        PathSpec::Destination { point, relative } => {
            let destination = if relative { current + point } else { point };
            vec![current, destination]
        }
    };

    let path = Polyline::new(vertices)?;
    if path.is_degenerate() {
        return Ok(None);
    }

    let params = movement
        .spring
        .unwrap_or_else(|| SpringParams::from(&world.config().spring));
    params.validate()?;

    let smooth = smooth_path(&path, duration, world.clock().fps(), &params);
    Ok(Some((
        MotionKind::Movement(MovementMotion {
            positions: smooth.positions,
        }),
        smooth.duration,
    )))
}
