//! The skills widget: simulation, input, mode and view sync behind one handle.
//!
//! Every entry point is a cheap no-op once the widget has been torn down, so
//! late events from the host (a resize after close, a stray pointer-up) are
//! harmless.

use glam::Vec2;
use tracing::{debug, info};

use crate::config::SkillTagsConfig;
use crate::engine::SimulationEngine;
use crate::interaction::{InteractionController, PointerEvent};
use crate::mode::{Mode, ModeController};
use crate::physics::BodyId;
use crate::skills::Skill;
use crate::sync::{ElementRegistry, TagView, sync_views};

pub struct SkillWidget<V: TagView> {
    engine: Option<SimulationEngine>,
    interaction: InteractionController,
    mode: ModeController,
    views: ElementRegistry<V>,
    skills: Vec<Skill>,
}

impl<V: TagView> SkillWidget<V> {
    /// Build the simulation for `skills` inside a container of `size`.
    /// Views already bound in `views` provide measured widths.
    pub fn new(
        size: Vec2,
        skills: Vec<Skill>,
        views: ElementRegistry<V>,
        config: &SkillTagsConfig,
    ) -> Self {
        let labels: Vec<&str> = skills.iter().map(|s| s.name.as_str()).collect();
        let engine = SimulationEngine::new(size, &labels, &views.measured_widths(), config);
        Self {
            engine: Some(engine),
            interaction: InteractionController::new(config.interaction.clone()),
            mode: ModeController::new(),
            views,
            skills,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.engine.is_some()
    }

    pub fn engine(&self) -> Option<&SimulationEngine> {
        self.engine.as_ref()
    }

    pub fn skills(&self) -> &[Skill] {
        &self.skills
    }

    pub fn views(&self) -> &ElementRegistry<V> {
        &self.views
    }

    pub fn views_mut(&mut self) -> &mut ElementRegistry<V> {
        &mut self.views
    }

    pub fn mode(&self) -> Mode {
        self.mode.mode()
    }

    pub fn is_locked(&self) -> bool {
        self.mode.mode().is_locked()
    }

    /// Last pointer position in container coordinates.
    pub fn pointer(&self) -> Vec2 {
        self.interaction.pointer()
    }

    /// Skill index of the tag being dragged.
    pub fn dragged_index(&self) -> Option<usize> {
        let engine = self.engine.as_ref()?;
        let body = self.interaction.dragged()?;
        engine.tags().iter().position(|id| *id == body)
    }

    pub fn constraint_count(&self) -> usize {
        self.engine
            .as_ref()
            .map_or(0, |e| e.world().constraint_count())
    }

    // -- input ---------------------------------------------------------------

    /// Feed a pointer or touch event in container coordinates.
    pub fn handle_pointer(&mut self, event: PointerEvent, now_ms: f64) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let mode = self.mode.mode();
        let tag_cfg = engine.tag_config().clone();

        if let Some(position) = event.position() {
            self.interaction.move_pointer(position);
        }
        if event.is_press() {
            let point = self.interaction.pointer();
            let (tags, world) = engine.tags_and_world_mut();
            self.interaction.pick(world, tags, point, mode, &tag_cfg);
        } else if event.is_release() {
            self.interaction
                .release(engine.world_mut(), mode, &tag_cfg, now_ms);
        }
    }

    /// Feed the current scroll offset of the page hosting the widget.
    pub fn on_scroll(&mut self, offset: f64, now_ms: f64) -> Option<f32> {
        let engine = self.engine.as_mut()?;
        let (tags, world) = engine.tags_and_world_mut();
        self.interaction
            .scroll(world, tags, offset, now_ms, self.mode.mode())
    }

    pub fn on_resize(&mut self, size: Vec2) {
        let Some(engine) = self.engine.as_mut() else {
            debug!("resize after teardown ignored");
            return;
        };
        engine.resize(size, &self.views.measured_widths());
    }

    // -- mode ----------------------------------------------------------------

    pub fn toggle_lock(&mut self) -> Mode {
        match self.mode.mode() {
            Mode::Free => self.lock(),
            Mode::Locked => self.unlock(),
        }
        self.mode.mode()
    }

    pub fn lock(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            if self.mode.lock(engine) {
                self.interaction.reset_scroll();
            }
        }
    }

    pub fn unlock(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            if self.mode.unlock(engine) {
                self.interaction.cancel_refreeze();
                self.interaction.reset_scroll();
            }
        }
    }

    pub fn reset(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            self.mode.reset(engine);
        }
    }

    // -- frame ---------------------------------------------------------------

    /// Run the physics steps due at `now_ms`, then copy transforms to views.
    /// Returns the number of physics steps taken.
    pub fn frame(&mut self, now_ms: f64) -> u32 {
        let Some(engine) = self.engine.as_mut() else {
            return 0;
        };
        let mode = self.mode.mode();
        let tag_cfg = engine.tag_config().clone();
        self.interaction
            .poll(engine.world_mut(), mode, &tag_cfg, now_ms);

        let interaction = &self.interaction;
        let steps = engine.advance(now_ms, |world| interaction.track(world));
        sync_views(engine, &mut self.views);
        steps
    }

    /// Advance exactly one fixed step and sync, ignoring wall time.
    pub fn step(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        self.interaction.track(engine.world_mut());
        engine.step();
        sync_views(engine, &mut self.views);
    }

    /// Body id of the tag at `index`.
    pub fn tag(&self, index: usize) -> Option<BodyId> {
        self.engine.as_ref()?.tags().get(index).copied()
    }

    // -- lifecycle -----------------------------------------------------------

    /// Stop everything and release the world. Safe to call more than once.
    pub fn teardown(&mut self) {
        let Some(mut engine) = self.engine.take() else {
            return;
        };
        self.interaction.clear();
        engine.teardown();
        info!(skills = self.skills.len(), "skills widget disposed");
    }
}

impl<V: TagView> Drop for SkillWidget<V> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::TagTransform;

    #[derive(Default)]
    struct View {
        transforms: usize,
    }

    impl TagView for View {
        fn measured_size(&self) -> Option<Vec2> {
            None
        }

        fn set_transform(&mut self, _: TagTransform) {
            self.transforms += 1;
        }
    }

    fn widget() -> SkillWidget<View> {
        let skills = vec![Skill::new("Rust"), Skill::new("Go")];
        let mut views = ElementRegistry::with_len(2);
        views.bind(0, View::default());
        let mut config = SkillTagsConfig::default();
        config.interaction.seed = Some(1);
        SkillWidget::new(Vec2::new(400.0, 300.0), skills, views, &config)
    }

    #[test]
    fn frame_steps_and_syncs_bound_views() {
        let mut w = widget();
        assert_eq!(w.frame(0.0), 1);
        assert_eq!(w.views().get(0).unwrap().transforms, 1);
        assert!(w.views().get(1).is_none());
    }

    #[test]
    fn pointer_cycle_creates_and_removes_one_constraint() {
        let mut w = widget();
        let centre = w.engine().unwrap().tag_body(1).unwrap().position();
        w.handle_pointer(PointerEvent::Down(centre), 0.0);
        assert_eq!(w.dragged_index(), Some(1));
        assert_eq!(w.constraint_count(), 1);
        w.handle_pointer(PointerEvent::Move(centre + Vec2::new(30.0, 0.0)), 5.0);
        w.handle_pointer(PointerEvent::Leave, 10.0);
        assert_eq!(w.constraint_count(), 0);
        assert!(w.dragged_index().is_none());
    }

    #[test]
    fn scroll_after_unlock_ignores_samples_from_before_the_lock() {
        let mut w = widget();
        assert_eq!(w.on_scroll(0.0, 0.0), None);
        w.lock();
        w.unlock();
        // First sample after unlocking only sets a new baseline.
        assert_eq!(w.on_scroll(500.0, 10_010.0), None);
        assert_eq!(w.on_scroll(530.0, 10_020.0), Some(3.0));
    }

    #[test]
    fn everything_is_a_no_op_after_teardown() {
        let mut w = widget();
        w.teardown();
        w.teardown();
        assert!(!w.is_alive());
        w.on_resize(Vec2::new(100.0, 100.0));
        w.handle_pointer(PointerEvent::Down(Vec2::new(70.0, 30.0)), 0.0);
        w.reset();
        assert_eq!(w.toggle_lock(), Mode::Free);
        assert_eq!(w.frame(100.0), 0);
        assert_eq!(w.on_scroll(500.0, 10.0), None);
        assert_eq!(w.constraint_count(), 0);
    }
}
