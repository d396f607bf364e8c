//! Volume arena
//!
//! Volumes live in a `SlotMap` keyed by [`EntityId`]. Motions hold ids, never
//! volumes, and go through [`World::get_attribute`] / [`World::set_attribute`]
//! when they need generic access to a named attribute.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use slotmap::{new_key_type, SlotMap};
use smallvec::{smallvec, SmallVec};
use tracing::debug;

use crate::clock::Clock;
use crate::config::{PerturbationMode, RenderConfig};
use crate::error::{KinemaError, Result};
use crate::geometry::{Affine2D, Color, Vec3};

new_key_type! {
    /// Unique identifier for a volume in the world
    pub struct EntityId;
}

/// Geometric kind of a volume
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Sphere,
    /// Polyhedral approximation of a sphere
    Polyhedron { faces: u32 },
    /// Two anchors joined by a tapered tube
    Tube,
}

impl Shape {
    pub fn name(&self) -> &'static str {
        match self {
            Shape::Sphere => "sphere",
            Shape::Polyhedron { .. } => "polyhedron",
            Shape::Tube => "tube",
        }
    }

    /// Number of anchors (and radii) the shape carries
    pub fn anchor_count(&self) -> usize {
        match self {
            Shape::Sphere | Shape::Polyhedron { .. } => 1,
            Shape::Tube => 2,
        }
    }
}

/// Attribute state of one volume
#[derive(Clone, Debug, PartialEq)]
pub struct Volume {
    pub shape: Shape,
    /// Centre for spheres and polyhedra, both ends for tubes
    pub anchors: SmallVec<[Vec3; 2]>,
    /// One radius per anchor
    pub radii: SmallVec<[f64; 2]>,
    pub alpha: f64,
    pub opacity: f64,
    pub colour: Color,
    pub transform: Affine2D,
    /// Levitation phase offset in seconds, fixed at spawn
    pub levitation_phase: f64,
    /// Rotation phase offset in seconds, fixed at spawn
    pub rotation_phase: f64,
    /// Per-volume switch for the levitation hook
    pub levitate: bool,
}

impl Volume {
    fn with_shape(shape: Shape, anchors: SmallVec<[Vec3; 2]>, radii: SmallVec<[f64; 2]>) -> Self {
        Self {
            shape,
            anchors,
            radii,
            alpha: 1.0,
            opacity: 1.0,
            colour: Color::default(),
            transform: Affine2D::IDENTITY,
            levitation_phase: 0.0,
            rotation_phase: 0.0,
            levitate: true,
        }
    }

    pub fn sphere(centre: Vec3, radius: f64) -> Self {
        Self::with_shape(Shape::Sphere, smallvec![centre], smallvec![radius])
    }

    pub fn polyhedron(centre: Vec3, radius: f64, faces: u32) -> Self {
        Self::with_shape(
            Shape::Polyhedron { faces },
            smallvec![centre],
            smallvec![radius],
        )
    }

    pub fn tube(start: Vec3, end: Vec3, radius: f64) -> Self {
        Self::with_shape(Shape::Tube, smallvec![start, end], smallvec![radius, radius])
    }

    /// Builder: set alpha
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Builder: set opacity
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    /// Builder: set colour
    pub fn with_colour(mut self, colour: Color) -> Self {
        self.colour = colour;
        self
    }

    /// Builder: set per-anchor radii
    pub fn with_radii(mut self, radii: &[f64]) -> Self {
        for (slot, radius) in self.radii.iter_mut().zip(radii) {
            *slot = *radius;
        }
        self
    }

    /// Builder: opt out of levitation
    pub fn without_levitation(mut self) -> Self {
        self.levitate = false;
        self
    }

    /// Primary anchor
    pub fn position(&self) -> Vec3 {
        self.anchors[0]
    }

    /// Primary radius
    pub fn radius(&self) -> f64 {
        self.radii[0]
    }
}

/// Named attribute of a volume
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Primary anchor; setting it translates every anchor rigidly
    Position,
    Anchor(usize),
    /// Primary radius; setting it sets every radius
    Radius,
    AnchorRadius(usize),
    Alpha,
    Opacity,
    Colour,
    Transform,
}

impl Attribute {
    /// Whether the attribute holds a point that levitation may displace
    pub fn is_positional(&self) -> bool {
        matches!(self, Attribute::Position | Attribute::Anchor(_))
    }
}

/// Value carried by an attribute
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AttributeValue {
    Scalar(f64),
    Point(Vec3),
    Colour(Color),
    Transform(Affine2D),
}

impl AttributeValue {
    pub fn as_point(&self) -> Option<Vec3> {
        match self {
            AttributeValue::Point(p) => Some(*p),
            _ => None,
        }
    }
}

fn mismatch(attribute: Attribute, reason: impl Into<String>) -> KinemaError {
    KinemaError::AttributeMismatch {
        attribute,
        reason: reason.into(),
    }
}

/// The entity registry: volumes, the frame clock and the render configuration
pub struct World {
    volumes: SlotMap<EntityId, Volume>,
    clock: Clock,
    config: RenderConfig,
    rng: StdRng,
}

impl World {
    pub fn new(config: RenderConfig) -> Self {
        let clock = Clock::new(config.fps).with_durations(config.durations.clone());
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            volumes: SlotMap::with_key(),
            clock,
            config,
            rng,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    /// Insert a volume, drawing its phase offsets once
    pub fn spawn(&mut self, mut volume: Volume) -> EntityId {
        let levitation = self.config.levitation.clone();
        let rotation = self.config.rotation.clone();
        volume.levitation_phase = self.phase_offset(levitation.mode, levitation.freq);
        volume.rotation_phase = self.phase_offset(rotation.mode, rotation.freq);

        let id = self.volumes.insert(volume);
        debug!(?id, "spawned volume");
        id
    }

    fn phase_offset(&mut self, mode: PerturbationMode, freq: f64) -> f64 {
        match mode {
            PerturbationMode::Random => {
                let freq = if freq == 0.0 || !freq.is_finite() {
                    1.0
                } else {
                    freq
                };
                self.rng.gen::<f64>() / freq
            }
            PerturbationMode::Fixed | PerturbationMode::Off => 0.0,
        }
    }

    pub fn despawn(&mut self, id: EntityId) -> Option<Volume> {
        self.volumes.remove(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Volume> {
        self.volumes.get(id)
    }

    /// Like [`World::get`] but fails with `UnknownEntity`
    pub fn volume(&self, id: EntityId) -> Result<&Volume> {
        self.volumes.get(id).ok_or(KinemaError::UnknownEntity(id))
    }

    pub fn volume_mut(&mut self, id: EntityId) -> Result<&mut Volume> {
        self.volumes
            .get_mut(id)
            .ok_or(KinemaError::UnknownEntity(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Volume)> {
        self.volumes.iter()
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    /// Read a named attribute
    pub fn get_attribute(&self, id: EntityId, attribute: Attribute) -> Result<AttributeValue> {
        let volume = self.volume(id)?;
        let value = match attribute {
            Attribute::Position => AttributeValue::Point(volume.position()),
            Attribute::Anchor(i) => AttributeValue::Point(
                *volume
                    .anchors
                    .get(i)
                    .ok_or_else(|| mismatch(attribute, "no such anchor"))?,
            ),
            Attribute::Radius => AttributeValue::Scalar(volume.radius()),
            Attribute::AnchorRadius(i) => AttributeValue::Scalar(
                *volume
                    .radii
                    .get(i)
                    .ok_or_else(|| mismatch(attribute, "no such anchor"))?,
            ),
            Attribute::Alpha => AttributeValue::Scalar(volume.alpha),
            Attribute::Opacity => AttributeValue::Scalar(volume.opacity),
            Attribute::Colour => AttributeValue::Colour(volume.colour),
            Attribute::Transform => AttributeValue::Transform(volume.transform),
        };
        Ok(value)
    }

    /// Write a named attribute
    pub fn set_attribute(
        &mut self,
        id: EntityId,
        attribute: Attribute,
        value: AttributeValue,
    ) -> Result<()> {
        let volume = self.volume_mut(id)?;
        match (attribute, value) {
            (Attribute::Position, AttributeValue::Point(p)) => {
                let shift = p - volume.position();
                volume.anchors[0] = p;
                for anchor in volume.anchors.iter_mut().skip(1) {
                    *anchor += shift;
                }
            }
            (Attribute::Anchor(i), AttributeValue::Point(p)) => {
                let anchor = volume
                    .anchors
                    .get_mut(i)
                    .ok_or_else(|| mismatch(attribute, "no such anchor"))?;
                *anchor = p;
            }
            (Attribute::Radius, AttributeValue::Scalar(r)) => {
                for radius in volume.radii.iter_mut() {
                    *radius = r;
                }
            }
            (Attribute::AnchorRadius(i), AttributeValue::Scalar(r)) => {
                let radius = volume
                    .radii
                    .get_mut(i)
                    .ok_or_else(|| mismatch(attribute, "no such anchor"))?;
                *radius = r;
            }
            (Attribute::Alpha, AttributeValue::Scalar(v)) => volume.alpha = v,
            (Attribute::Opacity, AttributeValue::Scalar(v)) => volume.opacity = v,
            (Attribute::Colour, AttributeValue::Colour(c)) => volume.colour = c,
            (Attribute::Transform, AttributeValue::Transform(t)) => volume.transform = t,
            (attribute, value) => {
                return Err(mismatch(attribute, format!("cannot assign {value:?}")));
            }
        }
        Ok(())
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}
