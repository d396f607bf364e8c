//! JSON-lines frame output
//!
//! One JSON object per rendered frame, with levitation and rotation applied to
//! what is written but never to the world itself.

use kinema_animation::{FrameSink, Perturbation};
use kinema_core::{
    Affine2D, Attribute, AttributeValue, Color, EntityId, KinemaError, Result, Vec3, World,
};
use serde::Serialize;
use std::io::Write;

use crate::scene::SceneVolumes;

/// Snapshot of one volume as it appears on screen
#[derive(Debug, Serialize)]
pub struct VolumeFrame<'a> {
    pub name: &'a str,
    pub shape: &'static str,
    pub anchors: Vec<Vec3>,
    pub radii: Vec<f64>,
    pub alpha: f64,
    pub opacity: f64,
    pub colour: Color,
    pub transform: Affine2D,
}

/// One line of output
#[derive(Debug, Serialize)]
pub struct FrameRecord<'a> {
    pub frame: u64,
    pub volumes: Vec<VolumeFrame<'a>>,
}

/// Build the perturbed snapshot of every named volume
pub fn snapshot<'a>(world: &World, volumes: &'a SceneVolumes) -> Result<FrameRecord<'a>> {
    let mut frames = Vec::with_capacity(volumes.len());
    for (name, id) in volumes.iter() {
        // Despawned volumes simply drop out of the frame
        if world.get(id).is_none() {
            continue;
        }
        frames.push(volume_frame(world, name, id)?);
    }
    Ok(FrameRecord {
        frame: world.clock().frame_index(),
        volumes: frames,
    })
}

fn volume_frame<'a>(world: &World, name: &'a str, id: EntityId) -> Result<VolumeFrame<'a>> {
    let volume = world.volume(id)?;
    let anchors = (0..volume.anchors.len())
        .map(|index| {
            let attribute = Attribute::Anchor(index);
            match Perturbation::levitated_attribute(world, id, attribute, false)? {
                AttributeValue::Point(point) => Ok(point),
                other => Err(KinemaError::AttributeMismatch {
                    attribute,
                    reason: format!("expected a point, got {other:?}"),
                }),
            }
        })
        .collect::<Result<Vec<_>>>()?;
    let transform = Perturbation::rotated(world, id, &volume.transform, false, false)?;

    Ok(VolumeFrame {
        name,
        shape: volume.shape.name(),
        anchors,
        radii: volume.radii.to_vec(),
        alpha: volume.alpha,
        opacity: volume.opacity,
        colour: volume.colour,
        transform,
    })
}

/// Writes each captured frame as a line of JSON
pub struct JsonLinesSink<'v, W: Write> {
    out: W,
    volumes: &'v SceneVolumes,
    written: u64,
}

impl<'v, W: Write> JsonLinesSink<'v, W> {
    pub fn new(out: W, volumes: &'v SceneVolumes) -> Self {
        Self {
            out,
            volumes,
            written: 0,
        }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out
            .flush()
            .map_err(|e| KinemaError::Sink(e.to_string()))
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FrameSink for JsonLinesSink<'_, W> {
    fn capture(&mut self, world: &World) -> Result<()> {
        let record = snapshot(world, self.volumes)?;
        serde_json::to_writer(&mut self.out, &record)
            .map_err(|e| KinemaError::Sink(e.to_string()))?;
        self.out
            .write_all(b"\n")
            .map_err(|e| KinemaError::Sink(e.to_string()))?;
        self.written += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneFile;
    use kinema_animation::{MotionScheduler, RunOutcome};

    const SCENE: &str = r#"
[render]
fps = 10

[render.levitation]
mode = "fixed"
height = 0.5
freq = 1.0

[[volume]]
name = "ball"
shape = "sphere"
at = [0.0, 0.0, 5.0]

[[volume]]
name = "still"
shape = "sphere"
levitate = false

[[motion]]
target = "ball"
kind = "opacity"
end = 0.0
duration = 3
"#;

    fn lines(out: Vec<u8>) -> Vec<serde_json::Value> {
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_writes_one_line_per_frame() {
        let scene = SceneFile::parse(SCENE).unwrap();
        let mut world = World::new(scene.render.clone());
        let volumes = scene.spawn(&mut world).unwrap();
        let mut scheduler = MotionScheduler::new();
        scene.schedule(&world, &volumes, &mut scheduler).unwrap();

        let mut sink = JsonLinesSink::new(Vec::new(), &volumes);
        let outcome = scheduler.run_to_completion(&mut world, &mut sink).unwrap();
        assert_eq!(outcome, RunOutcome::Completed { frames: 3 });
        assert_eq!(sink.written(), 3);

        let frames = lines(sink.into_inner());
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0]["frame"], 0);
        assert_eq!(frames[2]["frame"], 2);
        assert_eq!(frames[2]["volumes"][0]["opacity"], 0.0);
        assert_eq!(frames[0]["volumes"][1]["name"], "still");
    }

    #[test]
    fn test_levitation_is_applied_to_output_only() {
        let scene = SceneFile::parse(SCENE).unwrap();
        let mut world = World::new(scene.render.clone());
        let volumes = scene.spawn(&mut world).unwrap();
        let ball = volumes.get("ball").unwrap();

        // Half a period at 1 Hz and 10 fps: frame 5 is the top of the bob
        for _ in 0..5 {
            world.clock_mut().advance();
        }
        let record = snapshot(&world, &volumes).unwrap();
        let z = record.volumes[0].anchors[0].z;
        assert!((z - 4.5).abs() < 1e-12);
        assert_eq!(record.volumes[1].anchors[0], Vec3::ZERO);
        assert_eq!(world.get(ball).unwrap().position().z, 5.0);
    }

    #[test]
    fn test_draft_skips_levitation() {
        let scene = SceneFile::parse(SCENE).unwrap();
        let mut config = scene.render.clone();
        config.draft = true;
        let mut world = World::new(config);
        let volumes = scene.spawn(&mut world).unwrap();
        for _ in 0..5 {
            world.clock_mut().advance();
        }
        let record = snapshot(&world, &volumes).unwrap();
        assert_eq!(record.volumes[0].anchors[0], Vec3::new(0.0, 0.0, 5.0));
    }
}
