//! Scene file handling
//!
//! A scene is a TOML file with an optional `[render]` table, any number of
//! `[[volume]]` tables and any number of `[[motion]]` tables:
//!
//! ```toml
//! [render]
//! fps = 24
//!
//! [render.durations]
//! beat = 0.5
//!
//! [[volume]]
//! name = "ball"
//! shape = "sphere"
//! at = [0.0, 0.0, 10.0]
//! radius = 1.0
//!
//! [[motion]]
//! target = "ball"
//! kind = "radius"
//! end = 2.0
//! duration = "beat"
//! centred = true
//! ```

use anyhow::{bail, Context, Result};
use kinema_animation::{
    MotionParams, MotionRequest, MotionScheduler, PathSpec, RadiusWith, SpringParams,
};
use kinema_core::{Color, EntityId, RenderConfig, Vec3, Volume, World};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Top-level scene file
#[derive(Debug, Default, Deserialize)]
pub struct SceneFile {
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub volume: Vec<VolumeSpec>,
    #[serde(default)]
    pub motion: Vec<MotionSpec>,
}

/// Shape names accepted in `[[volume]]` tables
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeSpec {
    Sphere,
    Polyhedron,
    Tube,
}

/// One `[[volume]]` table
#[derive(Debug, Deserialize)]
pub struct VolumeSpec {
    pub name: String,
    pub shape: ShapeSpec,
    /// Centre, or the first anchor of a tube
    #[serde(default)]
    pub at: Vec3,
    /// Second anchor of a tube
    #[serde(default)]
    pub to: Option<Vec3>,
    #[serde(default = "default_one")]
    pub radius: f64,
    /// Per-anchor radii of a tube, overriding `radius`
    #[serde(default)]
    pub radii: Option<[f64; 2]>,
    #[serde(default = "default_faces")]
    pub faces: u32,
    #[serde(default = "default_one")]
    pub alpha: f64,
    #[serde(default = "default_one")]
    pub opacity: f64,
    /// `#rrggbb`
    #[serde(default)]
    pub colour: Option<String>,
    #[serde(default = "default_true")]
    pub levitate: bool,
}

fn default_one() -> f64 {
    1.0
}

fn default_faces() -> u32 {
    20
}

fn default_true() -> bool {
    true
}

/// Motion kinds accepted in `[[motion]]` tables
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionKindSpec {
    Alpha,
    Opacity,
    Radius,
    Movement,
    Rotation,
}

/// Signed "with" value, one per anchor or shared
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WithSpec {
    Uniform(f64),
    PerAnchor([f64; 2]),
}

impl WithSpec {
    fn uniform(&self) -> Option<f64> {
        match self {
            WithSpec::Uniform(value) => Some(*value),
            WithSpec::PerAnchor(_) => None,
        }
    }
}

impl From<WithSpec> for RadiusWith {
    fn from(with: WithSpec) -> Self {
        match with {
            WithSpec::Uniform(value) => RadiusWith::Uniform(value),
            WithSpec::PerAnchor(pair) => RadiusWith::PerAnchor(pair),
        }
    }
}

/// Duration as a frame count, `{ seconds = .. }`, or a named duration
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DurationSpec {
    Frames(u32),
    Seconds { seconds: f64 },
    Named(String),
}

impl DurationSpec {
    /// Resolve to frames on `world`'s clock
    pub fn frames(&self, world: &World) -> u32 {
        let clock = world.clock();
        match self {
            DurationSpec::Frames(frames) => *frames,
            DurationSpec::Seconds { seconds } => clock.frames_for(*seconds),
            DurationSpec::Named(name) => clock.frames_for_named(name),
        }
    }
}

/// Spring overrides; missing fields fall back to `[render.spring]`
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SpringSpec {
    pub frequency: Option<f64>,
    pub damping: Option<f64>,
    pub response: Option<f64>,
    pub batch_size: Option<u32>,
    #[serde(default)]
    pub rigid: bool,
}

/// One `[[motion]]` table
#[derive(Debug, Deserialize)]
pub struct MotionSpec {
    pub target: String,
    pub kind: MotionKindSpec,
    pub duration: DurationSpec,
    #[serde(default)]
    pub start: Option<WithSpec>,
    #[serde(default)]
    pub end: Option<WithSpec>,
    #[serde(default)]
    pub delay: u32,
    #[serde(default)]
    pub early_stop: Vec<u32>,
    /// Radius: keep the base fixed
    #[serde(default)]
    pub centred: bool,
    /// Movement: offset from the current position; rotation: compose on the right
    #[serde(default)]
    pub relative: bool,
    /// Movement waypoints
    #[serde(default)]
    pub path: Vec<Vec3>,
    /// Movement destination, when no waypoints are given
    #[serde(default)]
    pub to: Option<Vec3>,
    #[serde(default)]
    pub spring: Option<SpringSpec>,
    /// Rotation frequency override
    #[serde(default)]
    pub freq: Option<f64>,
    #[serde(default)]
    pub clockwise: Option<bool>,
}

/// Volume names in spawn order
#[derive(Debug, Default)]
pub struct SceneVolumes {
    order: Vec<(String, EntityId)>,
    by_name: FxHashMap<String, EntityId>,
}

impl SceneVolumes {
    pub fn get(&self, name: &str) -> Option<EntityId> {
        self.by_name.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, EntityId)> {
        self.order.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    fn insert(&mut self, name: &str, id: EntityId) -> Result<()> {
        if self.by_name.insert(name.to_string(), id).is_some() {
            bail!("Duplicate volume name `{name}`");
        }
        self.order.push((name.to_string(), id));
        Ok(())
    }
}

fn parse_colour(text: &str) -> Result<Color> {
    let hex = text.trim_start_matches('#');
    if hex.len() != 6 {
        bail!("Colour `{text}` is not of the form #rrggbb");
    }
    let value = u32::from_str_radix(hex, 16)
        .with_context(|| format!("Colour `{text}` is not hexadecimal"))?;
    Ok(Color::from_hex(value))
}

impl VolumeSpec {
    pub fn to_volume(&self) -> Result<Volume> {
        let volume = match self.shape {
            ShapeSpec::Sphere => Volume::sphere(self.at, self.radius),
            ShapeSpec::Polyhedron => Volume::polyhedron(self.at, self.radius, self.faces),
            ShapeSpec::Tube => {
                let Some(to) = self.to else {
                    bail!("Tube `{}` needs a `to` anchor", self.name);
                };
                let tube = Volume::tube(self.at, to, self.radius);
                match self.radii {
                    Some(radii) => tube.with_radii(&radii),
                    None => tube,
                }
            }
        };
        if self.radii.is_some() && self.shape != ShapeSpec::Tube {
            bail!("`radii` is only valid on tubes (volume `{}`)", self.name);
        }

        let mut volume = volume.with_alpha(self.alpha).with_opacity(self.opacity);
        if let Some(colour) = &self.colour {
            volume = volume.with_colour(parse_colour(colour)?);
        }
        if !self.levitate {
            volume = volume.without_levitation();
        }
        Ok(volume)
    }
}

impl MotionSpec {
    /// Turn the table into a request against `world`
    pub fn to_request(&self, world: &World, target: EntityId) -> Result<MotionRequest> {
        let duration = self.duration.frames(world);
        let request = match self.kind {
            MotionKindSpec::Alpha | MotionKindSpec::Opacity => {
                let start = self.scalar(self.start, 1.0, "start")?;
                let Some(end) = self.end else {
                    bail!("{:?} motion on `{}` needs an `end`", self.kind, self.target);
                };
                let end = self.scalar(Some(end), 1.0, "end")?;
                if self.kind == MotionKindSpec::Alpha {
                    MotionRequest::alpha(target, start, end, duration)
                } else {
                    MotionRequest::opacity(target, start, end, duration)
                }
            }
            MotionKindSpec::Radius => {
                let Some(end) = self.end else {
                    bail!("Radius motion on `{}` needs an `end`", self.target);
                };
                let start = self.start.unwrap_or(WithSpec::Uniform(1.0));
                MotionRequest::radius(target, RadiusWith::from(start), RadiusWith::from(end), duration)
                    .centred(self.centred)
            }
            MotionKindSpec::Movement => {
                let path = if !self.path.is_empty() {
                    PathSpec::Waypoints(self.path.clone())
                } else if let Some(point) = self.to {
                    PathSpec::Destination {
                        point,
                        relative: self.relative,
                    }
                } else {
                    bail!("Movement on `{}` needs `path` or `to`", self.target);
                };
                let mut request = MotionRequest::movement(target, path, duration);
                if let Some(spring) = &self.spring {
                    request = request.spring(spring_params(world, spring));
                }
                request
            }
            MotionKindSpec::Rotation => {
                let mut request =
                    MotionRequest::rotation(target, duration).relative(self.relative);
                if let MotionParams::Rotation {
                    freq, clockwise, ..
                } = &mut request.params
                {
                    *freq = self.freq;
                    *clockwise = self.clockwise;
                }
                request
            }
        };

        Ok(request
            .delay(self.delay)
            .early_stop(self.early_stop.iter().copied()))
    }

    fn scalar(&self, with: Option<WithSpec>, default: f64, field: &str) -> Result<f64> {
        match with {
            None => Ok(default),
            Some(with) => with.uniform().with_context(|| {
                format!(
                    "`{field}` of {:?} motion on `{}` must be a single number",
                    self.kind, self.target
                )
            }),
        }
    }
}

fn spring_params(world: &World, spec: &SpringSpec) -> SpringParams {
    if spec.rigid {
        return SpringParams::rigid();
    }
    let mut params = SpringParams::from(&world.config().spring);
    if let Some(frequency) = spec.frequency {
        params.frequency = frequency;
    }
    if let Some(damping) = spec.damping {
        params.damping = damping;
    }
    if let Some(response) = spec.response {
        params.response = response;
    }
    if let Some(batch_size) = spec.batch_size {
        params.batch_size = batch_size;
    }
    params
}

impl SceneFile {
    /// Load a scene from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("No scene file at {}", path.display());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Spawn every volume into `world`
    pub fn spawn(&self, world: &mut World) -> Result<SceneVolumes> {
        let mut volumes = SceneVolumes::default();
        for spec in &self.volume {
            let volume = spec
                .to_volume()
                .with_context(|| format!("Invalid volume `{}`", spec.name))?;
            let id = world.spawn(volume);
            volumes.insert(&spec.name, id)?;
        }
        Ok(volumes)
    }

    /// Create every motion, in file order, returning how many were scheduled
    pub fn schedule(
        &self,
        world: &World,
        volumes: &SceneVolumes,
        scheduler: &mut MotionScheduler,
    ) -> Result<usize> {
        let mut created = 0;
        for (index, spec) in self.motion.iter().enumerate() {
            let Some(target) = volumes.get(&spec.target) else {
                bail!("Motion #{index} targets unknown volume `{}`", spec.target);
            };
            let request = spec.to_request(world, target)?;
            let id = scheduler
                .create(world, request)
                .with_context(|| format!("Motion #{index} on `{}`", spec.target))?;
            match id {
                Some(id) => {
                    debug!(%id, index, target = %spec.target, "scheduled");
                    created += 1;
                }
                None => debug!(index, target = %spec.target, "skipped no-op motion"),
            }
        }
        Ok(created)
    }
}
