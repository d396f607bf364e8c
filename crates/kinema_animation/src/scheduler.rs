//! Motion scheduler
//!
//! Owns every in-flight motion and advances them once per frame, in creation
//! order. Finished records are dropped only after the whole tick has run, so
//! one motion finishing never skips or reorders another's update.

use kinema_core::{Result, World};
use smallvec::SmallVec;
use std::fmt;
use tracing::{debug, trace, warn};

use crate::builder::MotionRequest;
use crate::motion::MotionRecord;

/// Unique identifier for a scheduled motion, increasing in creation order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MotionId(u64);

impl fmt::Display for MotionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "motion#{}", self.0)
    }
}

/// Receives each rendered frame once every motion has been advanced
pub trait FrameSink {
    fn capture(&mut self, world: &World) -> Result<()>;
}

impl<F> FrameSink for F
where
    F: FnMut(&World) -> Result<()>,
{
    fn capture(&mut self, world: &World) -> Result<()> {
        self(world)
    }
}

/// Discards frames
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn capture(&mut self, _world: &World) -> Result<()> {
        Ok(())
    }
}

/// What a single tick did
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Records that were handed a step (running or pending)
    pub advanced: usize,
    /// Records removed at the end of the tick
    pub retired: SmallVec<[MotionId; 4]>,
    /// First record that reached an early-stop frame on this tick
    pub checkpoint: Option<MotionId>,
}

/// How a run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// No motions remain
    Completed { frames: u64 },
    /// `motion` reached an early-stop frame; call `run_to_completion` again to resume
    Suspended {
        motion: MotionId,
        frame_index: u64,
        frames: u64,
    },
}

/// The scheduler that ticks all active motions
#[derive(Debug, Default)]
pub struct MotionScheduler {
    records: Vec<(MotionId, MotionRecord)>,
    next_id: u64,
}

impl MotionScheduler {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            next_id: 0,
        }
    }

    /// Build and schedule a motion.
    ///
    /// Returns `Ok(None)` when the request has nothing to animate.
    pub fn create(&mut self, world: &World, request: MotionRequest) -> Result<Option<MotionId>> {
        let target = request.target;
        let Some(record) = request.build(world)? else {
            debug!(?target, "motion request is a no-op");
            return Ok(None);
        };
        Ok(Some(self.insert(record)))
    }

    /// Schedule an already built record
    pub fn insert(&mut self, record: MotionRecord) -> MotionId {
        let id = MotionId(self.next_id);
        self.next_id += 1;
        debug!(
            %id,
            kind = record.kind().name(),
            target = ?record.target(),
            duration = record.duration(),
            "motion created"
        );
        self.records.push((id, record));
        id
    }

    pub fn get(&self, id: MotionId) -> Option<&MotionRecord> {
        self.records
            .iter()
            .find(|(rid, _)| *rid == id)
            .map(|(_, record)| record)
    }

    /// Drop a motion without committing anything further
    pub fn cancel(&mut self, id: MotionId) -> Option<MotionRecord> {
        let index = self.records.iter().position(|(rid, _)| *rid == id)?;
        Some(self.records.remove(index).1)
    }

    /// Iterate over active motions in creation order
    pub fn iter(&self) -> impl Iterator<Item = (MotionId, &MotionRecord)> {
        self.records.iter().map(|(id, record)| (*id, record))
    }

    pub fn motion_count(&self) -> usize {
        self.records.len()
    }

    pub fn has_active_motions(&self) -> bool {
        !self.records.is_empty()
    }

    /// Advance every motion by one frame and commit the results.
    pub fn advance_one_frame(&mut self, world: &mut World) -> Result<TickReport> {
        let mut report = TickReport::default();
        let mut finished: SmallVec<[MotionId; 4]> = SmallVec::new();

        for (id, record) in self.records.iter_mut() {
            let Some(volume) = world.get(record.target()) else {
                warn!(%id, target = ?record.target(), "target despawned, dropping motion");
                finished.push(*id);
                continue;
            };

            let outcome = record.advance(volume, world.clock());
            report.advanced += 1;

            for (attribute, value) in outcome.updates {
                world.set_attribute(record.target(), attribute, value)?;
            }

            if outcome.finished {
                finished.push(*id);
            } else if outcome.checkpoint && report.checkpoint.is_none() {
                report.checkpoint = Some(*id);
            }
        }

        if !finished.is_empty() {
            self.records.retain(|(id, _)| !finished.contains(id));
            for id in &finished {
                debug!(%id, "motion retired");
            }
        }
        report.retired = finished;

        trace!(
            frame = world.clock().frame_index(),
            advanced = report.advanced,
            retired = report.retired.len(),
            "tick"
        );
        Ok(report)
    }

    /// Hand the current state to `sink` and move the clock to the next frame.
    pub fn render_frame(world: &mut World, sink: &mut impl FrameSink) -> Result<()> {
        sink.capture(world)?;
        world.clock_mut().advance();
        Ok(())
    }

    /// Render `frames` frames without advancing any motion.
    pub fn wait_frames(world: &mut World, sink: &mut impl FrameSink, frames: u32) -> Result<()> {
        for _ in 0..frames {
            Self::render_frame(world, sink)?;
        }
        Ok(())
    }

    /// Tick and render until no motion remains, or until a motion reaches an
    /// early-stop frame.
    ///
    /// The tick that reaches the early-stop frame is still handed to `sink`
    /// and the clock advanced before `Suspended` is returned, so its
    /// `frame_index` is the next frame to render. A suspended run leaves every
    /// record exactly where the last tick put it; calling this again resumes
    /// without restarting anything.
    pub fn run_to_completion(
        &mut self,
        world: &mut World,
        sink: &mut impl FrameSink,
    ) -> Result<RunOutcome> {
        let mut frames = 0;
        while self.has_active_motions() {
            let report = self.advance_one_frame(world)?;
            Self::render_frame(world, sink)?;
            frames += 1;

            if let Some(motion) = report.checkpoint {
                let frame_index = world.clock().frame_index();
                debug!(%motion, frame_index, "run suspended at early stop");
                return Ok(RunOutcome::Suspended {
                    motion,
                    frame_index,
                    frames,
                });
            }
        }
        Ok(RunOutcome::Completed { frames })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinema_core::{KinemaError, Vec3, Volume};

    fn setup() -> (World, MotionScheduler, kinema_core::EntityId) {
        let mut world = World::default();
        let ball = world.spawn(Volume::sphere(Vec3::ZERO, 1.0));
        (world, MotionScheduler::new(), ball)
    }

    #[test]
    fn test_create_noop_returns_none() {
        let (world, mut scheduler, ball) = setup();
        let id = scheduler
            .create(&world, MotionRequest::alpha(ball, 1.0, 1.0, 5))
            .unwrap();
        assert!(id.is_none());
        assert_eq!(scheduler.motion_count(), 0);
    }

    #[test]
    fn test_ids_follow_creation_order() {
        let (world, mut scheduler, ball) = setup();
        let a = scheduler
            .create(&world, MotionRequest::alpha(ball, 1.0, 0.0, 5))
            .unwrap()
            .unwrap();
        let b = scheduler
            .create(&world, MotionRequest::opacity(ball, 1.0, 0.0, 5))
            .unwrap()
            .unwrap();

        assert!(a < b);
        let order: Vec<_> = scheduler.iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![a, b]);
    }

    #[test]
    fn test_later_records_apply_last() {
        let (mut world, mut scheduler, ball) = setup();
        scheduler
            .create(&world, MotionRequest::alpha(ball, 1.0, -0.2, 2))
            .unwrap();
        scheduler
            .create(&world, MotionRequest::alpha(ball, 1.0, -0.8, 2))
            .unwrap();

        scheduler.advance_one_frame(&mut world).unwrap();
        // Both wrote alpha; the younger one wins
        assert!((world.get(ball).unwrap().alpha - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_finished_record_does_not_skip_siblings() {
        let (mut world, mut scheduler, ball) = setup();
        let short = scheduler
            .create(&world, MotionRequest::alpha(ball, 1.0, 0.0, 1))
            .unwrap()
            .unwrap();
        scheduler
            .create(&world, MotionRequest::opacity(ball, 1.0, 0.0, 2))
            .unwrap();

        let report = scheduler.advance_one_frame(&mut world).unwrap();
        assert_eq!(report.advanced, 2);
        assert_eq!(report.retired.as_slice(), &[short]);
        assert_eq!(world.get(ball).unwrap().alpha, 0.0);
        assert_eq!(world.get(ball).unwrap().opacity, 0.5);
        assert_eq!(scheduler.motion_count(), 1);
    }

    #[test]
    fn test_run_to_completion_renders_every_frame() {
        let (mut world, mut scheduler, ball) = setup();
        scheduler
            .create(&world, MotionRequest::alpha(ball, 1.0, 0.0, 4).delay(2))
            .unwrap();

        let mut alphas = Vec::new();
        let mut sink = |world: &World| -> Result<()> {
            alphas.push(world.get(ball).unwrap().alpha);
            Ok(())
        };
        let outcome = scheduler.run_to_completion(&mut world, &mut sink).unwrap();

        assert_eq!(outcome, RunOutcome::Completed { frames: 6 });
        assert_eq!(alphas, vec![1.0, 1.0, 0.75, 0.5, 0.25, 0.0]);
        assert_eq!(world.clock().frame_index(), 6);
    }

    #[test]
    fn test_checkpoint_frame_is_rendered_before_suspending() {
        let (mut world, mut scheduler, ball) = setup();
        scheduler
            .create(&world, MotionRequest::alpha(ball, 1.0, 0.0, 4).early_stop([1]))
            .unwrap();

        let mut captured = Vec::new();
        let mut sink = |world: &World| -> Result<()> {
            captured.push((world.clock().frame_index(), world.get(ball).unwrap().alpha));
            Ok(())
        };
        let outcome = scheduler.run_to_completion(&mut world, &mut sink).unwrap();

        assert!(matches!(
            outcome,
            RunOutcome::Suspended {
                frame_index: 2,
                frames: 2,
                ..
            }
        ));
        assert_eq!(captured, vec![(0, 0.75), (1, 0.5)]);
        assert_eq!(world.clock().frame_index(), 2);
    }

    #[test]
    fn test_despawned_target_is_dropped() {
        let (mut world, mut scheduler, ball) = setup();
        scheduler
            .create(&world, MotionRequest::alpha(ball, 1.0, 0.0, 4))
            .unwrap();
        world.despawn(ball);

        let report = scheduler.advance_one_frame(&mut world).unwrap();
        assert_eq!(report.retired.len(), 1);
        assert!(!scheduler.has_active_motions());
    }

    #[test]
    fn test_sink_errors_propagate() {
        let (mut world, mut scheduler, ball) = setup();
        scheduler
            .create(&world, MotionRequest::alpha(ball, 1.0, 0.0, 4))
            .unwrap();

        let mut sink = |_: &World| -> Result<()> { Err(KinemaError::Sink("disk full".into())) };
        let err = scheduler.run_to_completion(&mut world, &mut sink);
        assert!(matches!(err, Err(KinemaError::Sink(_))));
    }

    #[test]
    fn test_cancel() {
        let (world, mut scheduler, ball) = setup();
        let id = scheduler
            .create(&world, MotionRequest::alpha(ball, 1.0, 0.0, 4))
            .unwrap()
            .unwrap();
        assert!(scheduler.cancel(id).is_some());
        assert!(scheduler.get(id).is_none());
    }
}
