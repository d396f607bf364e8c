//! Kinema Motion Engine
//!
//! Frame-by-frame animation of volume attributes.
//!
//! # Features
//!
//! - **Spring Integration**: second-order spring pursuit of a point moving along a
//!   polyline, always settling exactly on the destination
//! - **Perturbations**: phase-stable levitation and rotation
//! - **Motion Builders**: signed factor/absolute start and end values, radius
//!   centring, delays and early-stop checkpoints
//! - **Scheduler**: advances every motion once per frame in creation order

pub mod builder;
pub mod motion;
pub mod path;
pub mod perturb;
pub mod scheduler;
pub mod spring;

pub use builder::{resolve_with, MotionParams, MotionRequest, MovementParams, PathSpec, RadiusWith};
pub use motion::{MotionKind, MotionPhase, MotionRecord};
pub use path::Polyline;
pub use perturb::Perturbation;
pub use scheduler::{FrameSink, MotionId, MotionScheduler, NullSink, RunOutcome, TickReport};
pub use spring::{smooth_path, SmoothPath, SpringParams};
