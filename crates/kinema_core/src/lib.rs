//! Kinema Core Runtime
//!
//! This crate provides the foundational primitives for the Kinema animation engine:
//!
//! - **Geometry**: `Vec3`, `Affine2D` and `Color` in `f64`
//! - **World**: a slotmap arena of volumes (spheres, tubes, polyhedra) with
//!   generic attribute access by name
//! - **Clock**: frame index, frame rate and seconds-to-frames conversion
//! - **Config**: render configuration shared by every effect
//!
//! # Example
//!
//! ```rust
//! use kinema_core::{Attribute, AttributeValue, RenderConfig, Vec3, Volume, World};
//!
//! let mut world = World::new(RenderConfig::default());
//! let ball = world.spawn(Volume::sphere(Vec3::new(0.0, 0.0, 1.0), 1.0));
//!
//! world
//!     .set_attribute(ball, Attribute::Radius, AttributeValue::Scalar(2.0))
//!     .unwrap();
//! assert_eq!(world.get(ball).unwrap().radius(), 2.0);
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod geometry;
pub mod world;

pub use clock::Clock;
pub use config::{LevitationConfig, PerturbationMode, RenderConfig, RotationConfig, SpringDefaults};
pub use error::{KinemaError, Result};
pub use geometry::{Affine2D, Color, Vec3};
pub use world::{Attribute, AttributeValue, EntityId, Shape, Volume, World};
