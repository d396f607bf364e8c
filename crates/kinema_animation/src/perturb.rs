//! Periodic perturbations: levitation and rotation
//!
//! Both are pure functions of the frame phase `t = frame_index / fps` and a
//! per-volume phase offset drawn once at spawn, so re-evaluating the same
//! frame always reproduces the same offset.

use kinema_core::{
    Affine2D, Attribute, AttributeValue, EntityId, PerturbationMode, Result, Vec3, World,
};
use std::f64::consts::TAU;

/// Frame phase in seconds
#[inline]
pub fn frame_phase(frame_index: u64, fps: u32) -> f64 {
    frame_index as f64 / fps.max(1) as f64
}

/// Altitude offset in `[0, height]`:
/// `height * (1 - cos(2π (phase + t) freq)) / 2`
pub fn levitation_offset(frame_index: u64, fps: u32, phase: f64, freq: f64, height: f64) -> f64 {
    let t = frame_phase(frame_index, fps);
    height * (1.0 - (TAU * (phase + t) * freq).cos()) / 2.0
}

/// Rotation angle `2π (phase + t) freq`, negated when clockwise
pub fn rotation_angle(frame_index: u64, fps: u32, phase: f64, freq: f64, clockwise: bool) -> f64 {
    let t = frame_phase(frame_index, fps);
    let angle = TAU * (phase + t) * freq;
    if clockwise {
        -angle
    } else {
        angle
    }
}

/// Compose `rotation` with `transform`: on the left (absolute), or on the
/// right (relative to the transform's own orientation)
pub fn compose_rotation(transform: &Affine2D, rotation: &Affine2D, relative: bool) -> Affine2D {
    if relative {
        transform.then(rotation)
    } else {
        rotation.then(transform)
    }
}

/// Hooks applying the configured perturbations to a volume's attributes
pub struct Perturbation;

impl Perturbation {
    /// Displace `point` by the volume's current levitation offset.
    ///
    /// Returned unchanged when suppressed for this call, disabled on the volume,
    /// globally off, or while drafting. `z` grows downward, so the volume rises.
    pub fn levitated(world: &World, id: EntityId, point: Vec3, suppress: bool) -> Result<Vec3> {
        let volume = world.volume(id)?;
        let config = world.config();
        if suppress
            || !volume.levitate
            || config.draft
            || config.levitation.mode == PerturbationMode::Off
        {
            return Ok(point);
        }

        let clock = world.clock();
        let dz = levitation_offset(
            clock.frame_index(),
            clock.fps(),
            volume.levitation_phase,
            config.levitation.freq,
            config.levitation.height,
        );
        Ok(point - Vec3::DOWN * dz)
    }

    /// Read `attribute` and levitate it when it holds a point.
    ///
    /// Non-positional attributes come back unchanged.
    pub fn levitated_attribute(
        world: &World,
        id: EntityId,
        attribute: Attribute,
        suppress: bool,
    ) -> Result<AttributeValue> {
        let value = world.get_attribute(id, attribute)?;
        if !attribute.is_positional() {
            return Ok(value);
        }
        match value.as_point() {
            Some(point) => Ok(AttributeValue::Point(Self::levitated(
                world, id, point, suppress,
            )?)),
            None => Ok(value),
        }
    }

    /// Apply the global rotation perturbation to `transform`.
    pub fn rotated(
        world: &World,
        id: EntityId,
        transform: &Affine2D,
        relative: bool,
        suppress: bool,
    ) -> Result<Affine2D> {
        let volume = world.volume(id)?;
        let config = world.config();
        if suppress || config.rotation.mode == PerturbationMode::Off {
            return Ok(*transform);
        }

        let clock = world.clock();
        let angle = rotation_angle(
            clock.frame_index(),
            clock.fps(),
            volume.rotation_phase,
            config.rotation.freq,
            config.rotation.clockwise,
        );
        Ok(compose_rotation(transform, &Affine2D::rotation(angle), relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinema_core::{LevitationConfig, RenderConfig, RotationConfig, Volume};

    #[test]
    fn test_levitation_range() {
        for frame in 0..240 {
            let dz = levitation_offset(frame, 30, 0.37, 0.25, 2.0);
            assert!((0.0..=2.0).contains(&dz), "frame {frame}: {dz}");
        }
        assert_eq!(levitation_offset(0, 30, 0.0, 0.25, 2.0), 0.0);
        // Half a period in: peak height
        assert!((levitation_offset(60, 30, 0.0, 0.25, 2.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_levitation_is_bit_identical() {
        for frame in [0u64, 1, 17, 1_000_003] {
            let a = levitation_offset(frame, 24, 1.234, 0.5, 0.3);
            let b = levitation_offset(frame, 24, 1.234, 0.5, 0.3);
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_rotation_handedness() {
        let ccw = rotation_angle(15, 30, 0.0, 0.5, false);
        let cw = rotation_angle(15, 30, 0.0, 0.5, true);
        assert!((ccw - TAU * 0.25).abs() < 1e-12);
        assert_eq!(cw, -ccw);
    }

    #[test]
    fn test_compose_left_and_right() {
        let shift = Affine2D::translation(1.0, 0.0);
        let quarter = Affine2D::rotation(TAU / 4.0);

        // Absolute: the translated point is rotated about the origin
        let (x, y) = compose_rotation(&shift, &quarter, false).transform_point(0.0, 0.0);
        assert!(x.abs() < 1e-12 && (y - 1.0).abs() < 1e-12);

        // Relative: rotation happens in the object's own frame
        let (x, y) = compose_rotation(&shift, &quarter, true).transform_point(0.0, 0.0);
        assert!((x - 1.0).abs() < 1e-12 && y.abs() < 1e-12);
    }

    fn levitating_world(draft: bool) -> (World, EntityId) {
        let config = RenderConfig {
            draft,
            levitation: LevitationConfig {
                mode: PerturbationMode::Fixed,
                height: 1.0,
                freq: 0.5,
            },
            ..RenderConfig::default()
        };
        let mut world = World::new(config);
        let id = world.spawn(Volume::sphere(Vec3::ZERO, 1.0));
        (world, id)
    }

    #[test]
    fn test_levitated_hook() {
        let (mut world, id) = levitating_world(false);
        // One second in at 0.5 Hz: top of the bob
        for _ in 0..30 {
            world.clock_mut().advance();
        }

        let p = Perturbation::levitated(&world, id, Vec3::ZERO, false).unwrap();
        assert!((p.z + 1.0).abs() < 1e-12);

        let suppressed = Perturbation::levitated(&world, id, Vec3::ZERO, true).unwrap();
        assert_eq!(suppressed, Vec3::ZERO);
    }

    #[test]
    fn test_levitated_attribute_moves_points_only() {
        let (mut world, id) = levitating_world(false);
        for _ in 0..30 {
            world.clock_mut().advance();
        }

        let anchor =
            Perturbation::levitated_attribute(&world, id, Attribute::Anchor(0), false).unwrap();
        assert_eq!(anchor.as_point().map(|p| p.z.round()), Some(-1.0));

        let radius =
            Perturbation::levitated_attribute(&world, id, Attribute::Radius, false).unwrap();
        assert_eq!(radius, AttributeValue::Scalar(1.0));

        assert!(
            Perturbation::levitated_attribute(&world, id, Attribute::Anchor(3), false).is_err()
        );
    }

    #[test]
    fn test_levitation_skipped_in_draft() {
        let (mut world, id) = levitating_world(true);
        for _ in 0..30 {
            world.clock_mut().advance();
        }
        let p = Perturbation::levitated(&world, id, Vec3::ZERO, false).unwrap();
        assert_eq!(p, Vec3::ZERO);
    }

    #[test]
    fn test_rotated_hook_off_by_default() {
        let mut world = World::default();
        let id = world.spawn(Volume::sphere(Vec3::ZERO, 1.0));
        let t = Affine2D::scale(2.0, 1.0);
        assert_eq!(Perturbation::rotated(&world, id, &t, false, false).unwrap(), t);

        let mut world = World::new(RenderConfig {
            rotation: RotationConfig {
                mode: PerturbationMode::Fixed,
                freq: 0.25,
                clockwise: false,
            },
            ..RenderConfig::default()
        });
        let id = world.spawn(Volume::sphere(Vec3::ZERO, 1.0));
        for _ in 0..30 {
            world.clock_mut().advance();
        }
        let r = Perturbation::rotated(&world, id, &Affine2D::IDENTITY, false, false).unwrap();
        let (x, y) = r.transform_point(1.0, 0.0);
        assert!(x.abs() < 1e-12 && (y - 1.0).abs() < 1e-12);
    }
}
