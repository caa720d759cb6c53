//! Pointer dragging and scroll impulses.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::{InteractionConfig, TagConfig};
use crate::mode::Mode;
use crate::physics::{BodyId, ConstraintId, DragConstraint, World};

/// Pointer input in container coordinates. Touch maps onto the same
/// pick / track / release cycle as the mouse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Vec2),
    Move(Vec2),
    Up,
    Leave,
    TouchStart(Vec2),
    TouchMove(Vec2),
    TouchEnd,
    TouchCancel,
}

impl PointerEvent {
    pub fn position(&self) -> Option<Vec2> {
        match *self {
            PointerEvent::Down(p)
            | PointerEvent::Move(p)
            | PointerEvent::TouchStart(p)
            | PointerEvent::TouchMove(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_press(&self) -> bool {
        matches!(self, PointerEvent::Down(_) | PointerEvent::TouchStart(_))
    }

    pub fn is_release(&self) -> bool {
        matches!(
            self,
            PointerEvent::Up | PointerEvent::Leave | PointerEvent::TouchEnd | PointerEvent::TouchCancel
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ActiveDrag {
    constraint: ConstraintId,
    body: BodyId,
}

/// Re-freeze of a body released while locked, due at `due_ms`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingRefreeze {
    body: BodyId,
    due_ms: f64,
}

// ---------------------------------------------------------------------------
// Scroll
// ---------------------------------------------------------------------------

/// Clamped scroll velocity (px/ms) for one scroll sample, or `None` when the
/// sample is too small or has no positive duration.
pub fn scroll_velocity(delta: f32, dt_ms: f32, cfg: &InteractionConfig) -> Option<f32> {
    if dt_ms.is_nan() || dt_ms <= 0.0 || delta.is_nan() || delta.abs() <= cfg.scroll_min_delta {
        return None;
    }
    let limit = cfg.scroll_velocity_limit.abs();
    Some((delta / dt_ms).clamp(-limit, limit))
}

/// Remembers the previous scroll sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScrollTracker {
    last: Option<(f64, f64)>,
}

impl ScrollTracker {
    /// Record a sample and return `(delta, elapsed)` since the previous one.
    pub fn observe(&mut self, offset: f64, now_ms: f64) -> Option<(f32, f32)> {
        let previous = self.last.replace((offset, now_ms));
        previous.map(|(last_offset, last_time)| {
            ((offset - last_offset) as f32, (now_ms - last_time) as f32)
        })
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct InteractionController {
    cfg: InteractionConfig,
    pointer: Vec2,
    drag: Option<ActiveDrag>,
    refreeze: Option<PendingRefreeze>,
    scroll: ScrollTracker,
    rng: StdRng,
}

impl InteractionController {
    pub fn new(cfg: InteractionConfig) -> Self {
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            cfg,
            pointer: Vec2::ZERO,
            drag: None,
            refreeze: None,
            scroll: ScrollTracker::default(),
            rng,
        }
    }

    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    pub fn move_pointer(&mut self, position: Vec2) {
        self.pointer = position;
    }

    /// Body currently held by the pointer.
    pub fn dragged(&self) -> Option<BodyId> {
        self.drag.map(|d| d.body)
    }

    pub fn has_pending_refreeze(&self) -> bool {
        self.refreeze.is_some()
    }

    /// Grab the first tag under `point`. Returns the picked body.
    pub fn pick(
        &mut self,
        world: &mut World,
        tags: &[BodyId],
        point: Vec2,
        mode: Mode,
        tag_cfg: &TagConfig,
    ) -> Option<BodyId> {
        self.pointer = point;
        if self.drag.is_some() {
            self.release(world, mode, tag_cfg, f64::NEG_INFINITY);
        }

        let body_id = *world.query_point(tags, point).first()?;

        if let Some(pending) = self.refreeze.take() {
            // A different body still waiting to freeze gets frozen now.
            if pending.body != body_id && mode.is_locked() {
                if let Some(mut body) = world.body_mut(pending.body) {
                    body.set_friction_air(tag_cfg.locked_friction_air);
                }
            }
            debug!(body = pending.body.index(), "pending re-freeze resolved by new pick");
        }

        let mut body = world.body_mut(body_id)?;
        body.set_sleeping(false);
        if mode.is_locked() {
            body.set_friction_air(tag_cfg.drag_friction_air);
        }
        let constraint = DragConstraint::attach(
            body_id,
            body.view(),
            point,
            self.cfg.stiffness,
            self.cfg.damping,
        );
        let constraint = world.add_constraint(constraint);
        self.drag = Some(ActiveDrag {
            constraint,
            body: body_id,
        });
        debug!(body = body_id.index(), x = point.x, y = point.y, "tag picked");
        Some(body_id)
    }

    /// Pull the held body toward the pointer. Runs before every step.
    pub fn track(&self, world: &mut World) {
        if let Some(drag) = self.drag {
            if let Some(constraint) = world.constraint_mut(drag.constraint) {
                constraint.target = self.pointer;
            }
        }
    }

    /// Let go of the held body. No-op without an active drag.
    pub fn release(&mut self, world: &mut World, mode: Mode, tag_cfg: &TagConfig, now_ms: f64) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        world.remove_constraint(drag.constraint);

        if mode.is_locked() {
            self.refreeze = Some(PendingRefreeze {
                body: drag.body,
                due_ms: now_ms + self.cfg.refreeze_delay_ms,
            });
        } else if let Some(mut body) = world.body_mut(drag.body) {
            body.set_friction_air(tag_cfg.friction_air);
        }
        debug!(body = drag.body.index(), locked = mode.is_locked(), "tag released");
    }

    /// Fire the re-freeze timer when due. Only applies while still locked.
    pub fn poll(&mut self, world: &mut World, mode: Mode, tag_cfg: &TagConfig, now_ms: f64) {
        let Some(pending) = self.refreeze else {
            return;
        };
        if now_ms < pending.due_ms {
            return;
        }
        self.refreeze = None;
        if mode.is_locked() {
            if let Some(mut body) = world.body_mut(pending.body) {
                body.set_friction_air(tag_cfg.locked_friction_air);
            }
            debug!(body = pending.body.index(), "released tag re-frozen");
        }
    }

    /// Drop any pending timer without firing it.
    pub fn cancel_refreeze(&mut self) {
        self.refreeze = None;
    }

    /// Turn a scroll sample into impulses on every tag. Returns the clamped
    /// velocity when an impulse was applied.
    pub fn scroll(
        &mut self,
        world: &mut World,
        tags: &[BodyId],
        offset: f64,
        now_ms: f64,
        mode: Mode,
    ) -> Option<f32> {
        if mode.is_locked() {
            self.scroll.reset();
            return None;
        }
        let (delta, elapsed) = self.scroll.observe(offset, now_ms)?;
        let velocity = scroll_velocity(delta, elapsed, &self.cfg)?;
        let lift = velocity * self.cfg.scroll_force_scale;

        for id in tags {
            let jitter = (self.rng.gen_range(0.0..1.0f32) - 0.5) * self.cfg.scroll_jitter;
            if let Some(mut body) = world.body_mut(*id) {
                body.set_sleeping(false);
                let centre = body.position();
                body.apply_force(centre, Vec2::new(jitter, lift));
            }
        }
        debug!(velocity, tags = tags.len(), "scroll impulse");
        Some(velocity)
    }

    /// Forget the previous scroll sample so the next one only sets a baseline.
    pub fn reset_scroll(&mut self) {
        self.scroll.reset();
    }

    /// Forget the drag and timers, e.g. on teardown.
    pub fn clear(&mut self) {
        self.drag = None;
        self.refreeze = None;
        self.scroll.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::BodyOptions;

    fn setup() -> (World, Vec<BodyId>, InteractionController, TagConfig) {
        let mut world = World::default();
        let tag_cfg = TagConfig::default();
        let options = BodyOptions {
            friction_air: tag_cfg.friction_air,
            density: tag_cfg.density,
            ..BodyOptions::default()
        };
        let tags = vec![
            world.add_body(Vec2::new(100.0, 100.0), Vec2::new(100.0, 44.0), options),
            world.add_body(Vec2::new(300.0, 100.0), Vec2::new(100.0, 44.0), options),
        ];
        let controller = InteractionController::new(InteractionConfig {
            seed: Some(42),
            ..InteractionConfig::default()
        });
        (world, tags, controller, tag_cfg)
    }

    #[test]
    fn scroll_velocity_is_clamped_and_filtered() {
        let cfg = InteractionConfig::default();
        assert_eq!(scroll_velocity(5000.0, 1.0, &cfg), Some(40.0));
        assert_eq!(scroll_velocity(-5000.0, 2.0, &cfg), Some(-40.0));
        assert_eq!(scroll_velocity(30.0, 10.0, &cfg), Some(3.0));
        assert_eq!(scroll_velocity(2.0, 10.0, &cfg), None);
        assert_eq!(scroll_velocity(100.0, 0.0, &cfg), None);
        assert_eq!(scroll_velocity(100.0, -4.0, &cfg), None);
        assert_eq!(scroll_velocity(100.0, f32::NAN, &cfg), None);
    }

    #[test]
    fn pick_on_empty_space_creates_nothing() {
        let (mut world, tags, mut c, tag_cfg) = setup();
        assert!(c.pick(&mut world, &tags, Vec2::new(200.0, 300.0), Mode::Free, &tag_cfg).is_none());
        assert_eq!(world.constraint_count(), 0);
        assert!(c.dragged().is_none());
    }

    #[test]
    fn only_one_drag_exists_at_a_time() {
        let (mut world, tags, mut c, tag_cfg) = setup();
        c.pick(&mut world, &tags, Vec2::new(100.0, 100.0), Mode::Free, &tag_cfg);
        assert_eq!(world.constraint_count(), 1);
        c.pick(&mut world, &tags, Vec2::new(300.0, 100.0), Mode::Free, &tag_cfg);
        assert_eq!(world.constraint_count(), 1);
        assert_eq!(c.dragged(), Some(tags[1]));

        c.release(&mut world, Mode::Free, &tag_cfg, 0.0);
        assert_eq!(world.constraint_count(), 0);
        c.release(&mut world, Mode::Free, &tag_cfg, 0.0);
        assert_eq!(world.constraint_count(), 0);
    }

    #[test]
    fn track_moves_constraint_target_to_pointer() {
        let (mut world, tags, mut c, tag_cfg) = setup();
        c.pick(&mut world, &tags, Vec2::new(110.0, 95.0), Mode::Free, &tag_cfg);
        c.move_pointer(Vec2::new(180.0, 60.0));
        c.track(&mut world);
        let constraint = world.constraint(ConstraintId(0)).unwrap();
        assert_eq!(constraint.target, Vec2::new(180.0, 60.0));
        assert_eq!(constraint.local_anchor, Vec2::new(10.0, -5.0));
    }

    #[test]
    fn locked_drag_lowers_friction_then_refreezes_after_delay() {
        let (mut world, tags, mut c, tag_cfg) = setup();
        world.body_mut(tags[0]).unwrap().set_friction_air(tag_cfg.locked_friction_air);
        world.body_mut(tags[0]).unwrap().set_sleeping(true);

        c.pick(&mut world, &tags, Vec2::new(100.0, 100.0), Mode::Locked, &tag_cfg);
        let body = world.body(tags[0]).unwrap();
        assert!(!body.is_sleeping());
        assert_eq!(body.friction_air(), tag_cfg.drag_friction_air);

        c.release(&mut world, Mode::Locked, &tag_cfg, 1000.0);
        c.poll(&mut world, Mode::Locked, &tag_cfg, 1049.0);
        assert_eq!(world.body(tags[0]).unwrap().friction_air(), tag_cfg.drag_friction_air);
        c.poll(&mut world, Mode::Locked, &tag_cfg, 1050.0);
        assert_eq!(world.body(tags[0]).unwrap().friction_air(), tag_cfg.locked_friction_air);
        assert!(!c.has_pending_refreeze());
    }

    #[test]
    fn repick_before_refreeze_cancels_it() {
        let (mut world, tags, mut c, tag_cfg) = setup();
        c.pick(&mut world, &tags, Vec2::new(100.0, 100.0), Mode::Locked, &tag_cfg);
        c.release(&mut world, Mode::Locked, &tag_cfg, 0.0);
        c.pick(&mut world, &tags, Vec2::new(100.0, 100.0), Mode::Locked, &tag_cfg);
        assert!(!c.has_pending_refreeze());
        c.poll(&mut world, Mode::Locked, &tag_cfg, 500.0);
        assert_eq!(world.body(tags[0]).unwrap().friction_air(), tag_cfg.drag_friction_air);
    }

    #[test]
    fn free_release_restores_default_friction_immediately() {
        let (mut world, tags, mut c, tag_cfg) = setup();
        world.body_mut(tags[1]).unwrap().set_friction_air(0.5);
        c.pick(&mut world, &tags, Vec2::new(300.0, 100.0), Mode::Free, &tag_cfg);
        c.release(&mut world, Mode::Free, &tag_cfg, 0.0);
        assert_eq!(world.body(tags[1]).unwrap().friction_air(), tag_cfg.friction_air);
        assert!(!c.has_pending_refreeze());
    }

    #[test]
    fn scroll_pushes_every_tag_and_wakes_sleepers() {
        let (mut world, tags, mut c, _) = setup();
        world.body_mut(tags[0]).unwrap().set_sleeping(true);

        assert_eq!(c.scroll(&mut world, &tags, 0.0, 0.0, Mode::Free), None);
        let v = c.scroll(&mut world, &tags, 600.0, 10.0, Mode::Free);
        assert_eq!(v, Some(40.0));
        for id in &tags {
            let body = world.body(*id).unwrap();
            assert!(!body.is_sleeping());
            assert!((body.force().y - 40.0 * 0.00005).abs() < 1e-9);
            assert!(body.force().x.abs() <= 0.001);
        }
    }

    #[test]
    fn scroll_is_ignored_while_locked() {
        let (mut world, tags, mut c, _) = setup();
        c.scroll(&mut world, &tags, 0.0, 0.0, Mode::Free);
        assert_eq!(c.scroll(&mut world, &tags, 500.0, 10.0, Mode::Locked), None);
        assert_eq!(c.scroll(&mut world, &tags, 900.0, 20.0, Mode::Free), None);
        assert!(tags.iter().all(|id| world.body(*id).unwrap().force() == Vec2::ZERO));
    }

    #[test]
    fn reset_scroll_drops_the_baseline() {
        let (mut world, tags, mut c, _) = setup();
        c.scroll(&mut world, &tags, 0.0, 0.0, Mode::Free);
        c.reset_scroll();
        assert_eq!(c.scroll(&mut world, &tags, 500.0, 10_000.0, Mode::Free), None);
        assert!(tags.iter().all(|id| world.body(*id).unwrap().force() == Vec2::ZERO));
        assert_eq!(c.scroll(&mut world, &tags, 900.0, 10_010.0, Mode::Free), Some(40.0));
    }
}
