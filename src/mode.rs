//! Free / Locked mode and the reset-to-layout operation.

use glam::Vec2;
use tracing::info;

use crate::engine::SimulationEngine;
use crate::physics::Gravity;

/// Force applied after a free-mode reset so the sleep logic sees activity.
const RESET_NUDGE: Vec2 = Vec2::new(0.0, 0.000_001);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Gravity on, default air friction.
    #[default]
    Free,
    /// Gravity off, heavy air friction, resting tags asleep.
    Locked,
}

impl Mode {
    pub fn is_locked(self) -> bool {
        self == Mode::Locked
    }

    /// Label of the toggle action available from this mode.
    pub fn toggle_label(self) -> &'static str {
        match self {
            Mode::Free => "LOCK",
            Mode::Locked => "RELEASE",
        }
    }
}

#[derive(Debug, Default)]
pub struct ModeController {
    mode: Mode,
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Freeze every tag in place. No-op when already locked.
    pub fn lock(&mut self, engine: &mut SimulationEngine) -> bool {
        if self.mode == Mode::Locked {
            return false;
        }
        self.mode = Mode::Locked;

        engine.set_gravity(Gravity {
            x: 0.0,
            y: 0.0,
            ..engine.default_gravity()
        });
        let tags = engine.tag_config().clone();
        engine.for_each_tag(|_, mut body| {
            body.set_friction_air(tags.locked_friction_air);
            body.set_velocity(Vec2::ZERO);
            body.set_angular_velocity(0.0);
            // Speed is read after zeroing, so every tag goes to sleep.
            if body.speed() < tags.lock_sleep_speed {
                body.set_sleeping(true);
            }
        });
        info!(mode = ?self.mode, "tags locked");
        true
    }

    /// Restore gravity and wake every tag. No-op when already free.
    pub fn unlock(&mut self, engine: &mut SimulationEngine) -> bool {
        if self.mode == Mode::Free {
            return false;
        }
        self.mode = Mode::Free;

        engine.set_gravity(engine.default_gravity());
        let friction_air = engine.tag_config().friction_air;
        engine.for_each_tag(|_, mut body| {
            body.set_friction_air(friction_air);
            body.set_sleeping(false);
        });
        info!(mode = ?self.mode, "tags released");
        true
    }

    pub fn toggle(&mut self, engine: &mut SimulationEngine) -> Mode {
        match self.mode {
            Mode::Free => self.lock(engine),
            Mode::Locked => self.unlock(engine),
        };
        self.mode
    }

    /// Put every tag back on its initial layout position, upright and still.
    pub fn reset(&self, engine: &mut SimulationEngine) {
        let locked = self.mode.is_locked();
        if locked {
            engine.set_gravity(Gravity {
                x: 0.0,
                y: 0.0,
                ..engine.default_gravity()
            });
        }

        let initial = engine.initial_positions().to_vec();
        engine.for_each_tag(|index, mut body| {
            let Some(position) = initial.get(index) else {
                return;
            };
            body.set_position(*position);
            body.set_velocity(Vec2::ZERO);
            body.set_angular_velocity(0.0);
            body.set_angle(0.0);
            body.clear_forces();

            if locked {
                body.set_sleeping(true);
            } else {
                body.set_sleeping(false);
                body.apply_force(*position, RESET_NUDGE);
            }
        });
        info!(locked, tags = initial.len(), "tags reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SkillTagsConfig;

    fn engine() -> SimulationEngine {
        SimulationEngine::new(
            Vec2::new(800.0, 500.0),
            &["Rust", "Go", "TypeScript", "Docker"],
            &[],
            &SkillTagsConfig::default(),
        )
    }

    fn run(engine: &mut SimulationEngine, steps: usize) {
        for _ in 0..steps {
            engine.step();
        }
    }

    #[test]
    fn lock_zeroes_gravity_and_motion() {
        let mut e = engine();
        let mut m = ModeController::new();
        run(&mut e, 20);
        assert!(m.lock(&mut e));
        assert_eq!(e.world().gravity().y, 0.0);
        for i in 0..e.tags().len() {
            let body = e.tag_body(i).unwrap();
            assert_eq!(body.velocity(), Vec2::ZERO);
            assert_eq!(body.angular_velocity(), 0.0);
            assert!(body.is_sleeping());
            assert_eq!(body.friction_air(), 0.2);
        }
        assert!(!m.lock(&mut e));
    }

    #[test]
    fn unlock_restores_gravity_and_wakes_everything() {
        let mut e = engine();
        let mut m = ModeController::new();
        m.lock(&mut e);
        assert!(m.unlock(&mut e));
        assert_eq!(e.world().gravity(), e.default_gravity());
        for i in 0..e.tags().len() {
            let body = e.tag_body(i).unwrap();
            assert!(!body.is_sleeping());
            assert_eq!(body.friction_air(), 0.015);
        }
        assert!(!m.unlock(&mut e));
    }

    #[test]
    fn toggle_flips_mode() {
        let mut e = engine();
        let mut m = ModeController::new();
        assert_eq!(m.toggle(&mut e), Mode::Locked);
        assert_eq!(m.mode().toggle_label(), "RELEASE");
        assert_eq!(m.toggle(&mut e), Mode::Free);
        assert_eq!(m.mode().toggle_label(), "LOCK");
    }

    #[test]
    fn reset_restores_layout_and_is_idempotent() {
        let mut e = engine();
        let m = ModeController::new();
        run(&mut e, 45);

        m.reset(&mut e);
        let once: Vec<_> = (0..4)
            .map(|i| {
                let b = e.tag_body(i).unwrap();
                (b.position(), b.velocity(), b.angle(), b.force())
            })
            .collect();
        m.reset(&mut e);
        let twice: Vec<_> = (0..4)
            .map(|i| {
                let b = e.tag_body(i).unwrap();
                (b.position(), b.velocity(), b.angle(), b.force())
            })
            .collect();

        assert_eq!(once, twice);
        for (i, (position, velocity, angle, force)) in once.iter().enumerate() {
            assert_eq!(*position, e.initial_positions()[i]);
            assert_eq!(*velocity, Vec2::ZERO);
            assert_eq!(*angle, 0.0);
            assert_eq!(*force, RESET_NUDGE);
            assert!(!e.tag_body(i).unwrap().is_sleeping());
        }
    }

    #[test]
    fn reset_while_locked_sleeps_tags_without_gravity() {
        let mut e = engine();
        let mut m = ModeController::new();
        m.lock(&mut e);
        e.set_gravity(e.default_gravity());
        m.reset(&mut e);
        assert_eq!(e.world().gravity().y, 0.0);
        for i in 0..e.tags().len() {
            let body = e.tag_body(i).unwrap();
            assert!(body.is_sleeping());
            assert_eq!(body.force(), Vec2::ZERO);
        }
    }
}
