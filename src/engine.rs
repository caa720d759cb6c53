//! Simulation engine: owns the world, the container walls, one body per tag
//! and the fixed-step runner that advances it from wall-clock time.

use glam::Vec2;
use tracing::{debug, info, warn};

use crate::config::{BoundaryConfig, LayoutConfig, PhysicsConfig, SkillTagsConfig, TagConfig};
use crate::layout;
use crate::physics::{Body, BodyId, BodyMut, BodyOptions, Gravity, SolverSettings, World};

/// Clamp a reported container size to something usable. Non-positive or
/// non-finite dimensions fall back to `min` independently.
pub fn effective_container(size: Vec2, min: f32) -> Vec2 {
    let fix = |v: f32| if v.is_finite() && v > 0.0 { v } else { min };
    Vec2::new(fix(size.x), fix(size.y))
}

/// The four static walls around the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundaries {
    pub floor: BodyId,
    pub left: BodyId,
    pub right: BodyId,
    pub ceiling: BodyId,
}

/// Centre and size of each wall for a container.
struct WallGeometry {
    floor: (Vec2, Vec2),
    left: (Vec2, Vec2),
    right: (Vec2, Vec2),
    ceiling: (Vec2, Vec2),
}

impl WallGeometry {
    fn new(container: Vec2, cfg: &BoundaryConfig) -> Self {
        let (w, h, t) = (container.x, container.y, cfg.thickness);
        let side = Vec2::new(t, h * 2.0);
        let span = Vec2::new(w + cfg.overhang, t);
        Self {
            floor: (Vec2::new(w / 2.0, h + t / 2.0), span),
            left: (Vec2::new(-t / 2.0, h / 2.0), side),
            right: (Vec2::new(w + t / 2.0, h / 2.0), side),
            ceiling: (Vec2::new(w / 2.0, cfg.ceiling_y), span),
        }
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Turns wall-clock frame times into a whole number of fixed steps.
#[derive(Debug, Clone)]
pub struct Runner {
    delta: f64,
    max_substeps: u32,
    accumulator: f64,
    last_time: Option<f64>,
}

impl Runner {
    pub fn new(delta_ms: f64, max_substeps: u32) -> Self {
        Self {
            delta: delta_ms.max(1.0),
            max_substeps: max_substeps.max(1),
            accumulator: 0.0,
            last_time: None,
        }
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Number of steps due at `now_ms`. The first call always yields one step.
    pub fn tick(&mut self, now_ms: f64) -> u32 {
        let Some(last) = self.last_time.replace(now_ms) else {
            return 1;
        };
        let elapsed = now_ms - last;
        if !elapsed.is_finite() || elapsed <= 0.0 {
            return 0;
        }
        self.accumulator += elapsed;
        // Small tolerance so frame times that are exact multiples of the
        // delta do not lose a step to rounding.
        let due = ((self.accumulator + 1e-6) / self.delta).floor() as u32;
        let steps = due.min(self.max_substeps);
        self.accumulator = if due > self.max_substeps {
            0.0
        } else {
            (self.accumulator - steps as f64 * self.delta).max(0.0)
        };
        steps
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.last_time = None;
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct SimulationEngine {
    world: World,
    physics: PhysicsConfig,
    tags_cfg: TagConfig,
    layout_cfg: LayoutConfig,
    boundary_cfg: BoundaryConfig,
    container: Vec2,
    boundaries: Boundaries,
    tags: Vec<BodyId>,
    labels: Vec<String>,
    initial_positions: Vec<Vec2>,
    runner: Runner,
    running: bool,
}

impl SimulationEngine {
    /// Build the world: four walls, then one body per label at its initial
    /// layout position.
    pub fn new<S: AsRef<str>>(
        container: Vec2,
        labels: &[S],
        measured: &[Option<f32>],
        config: &SkillTagsConfig,
    ) -> Self {
        let size = effective_container(container, config.layout.min_container);
        if size != container {
            warn!(
                width = container.x,
                height = container.y,
                fallback = config.layout.min_container,
                "container has no usable size, using fallback"
            );
        }

        let gravity = Gravity {
            x: 0.0,
            y: config.physics.gravity_y,
            scale: config.physics.gravity_scale,
        };
        let mut world = World::new(gravity, SolverSettings::from(&config.physics));

        let walls = WallGeometry::new(size, &config.boundary);
        let mut wall =
            |(centre, extent): (Vec2, Vec2)| world.add_body(centre, extent, BodyOptions::fixed());
        let boundaries = Boundaries {
            floor: wall(walls.floor),
            left: wall(walls.left),
            right: wall(walls.right),
            ceiling: wall(walls.ceiling),
        };

        let labels: Vec<String> = labels.iter().map(|l| l.as_ref().to_owned()).collect();
        let initial_positions = layout::compute_initial_positions(
            size,
            &labels,
            measured,
            &config.layout,
            config.tags.height,
        );

        let options = BodyOptions {
            restitution: config.tags.restitution,
            friction: config.tags.friction,
            friction_air: config.tags.friction_air,
            density: config.tags.density,
            chamfer: config.tags.chamfer,
            is_static: false,
        };
        let tags = labels
            .iter()
            .zip(&initial_positions)
            .enumerate()
            .map(|(index, (label, centre))| {
                let width =
                    layout::tag_width(label, measured.get(index).copied().flatten(), &config.layout);
                let extent = Vec2::new(width, config.tags.height);
                world.add_body(*centre, extent, options)
            })
            .collect::<Vec<_>>();

        info!(
            width = size.x,
            height = size.y,
            tags = tags.len(),
            "simulation world created"
        );

        Self {
            world,
            physics: config.physics.clone(),
            tags_cfg: config.tags.clone(),
            layout_cfg: config.layout.clone(),
            boundary_cfg: config.boundary.clone(),
            container: size,
            boundaries,
            tags,
            labels,
            initial_positions,
            runner: Runner::new(config.physics.fixed_delta_ms as f64, config.physics.max_substeps),
            running: true,
        }
    }

    // -- accessors -----------------------------------------------------------

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn container(&self) -> Vec2 {
        self.container
    }

    pub fn boundaries(&self) -> Boundaries {
        self.boundaries
    }

    /// Tag bodies in skill order.
    pub fn tags(&self) -> &[BodyId] {
        &self.tags
    }

    pub fn tag_body(&self, index: usize) -> Option<Body<'_>> {
        self.tags.get(index).and_then(|id| self.world.body(*id))
    }

    /// Visit every tag body in skill order.
    pub fn for_each_tag(&mut self, mut f: impl FnMut(usize, BodyMut<'_>)) {
        for (index, id) in self.tags.iter().enumerate() {
            if let Some(body) = self.world.body_mut(*id) {
                f(index, body);
            }
        }
    }

    /// Tag ids alongside mutable world access, for callers that hit-test
    /// and then mutate.
    pub fn tags_and_world_mut(&mut self) -> (&[BodyId], &mut World) {
        (&self.tags, &mut self.world)
    }

    pub fn set_gravity(&mut self, gravity: Gravity) {
        self.world.set_gravity(gravity);
    }

    pub fn initial_positions(&self) -> &[Vec2] {
        &self.initial_positions
    }

    pub fn tag_config(&self) -> &TagConfig {
        &self.tags_cfg
    }

    /// Gravity of the free mode.
    pub fn default_gravity(&self) -> Gravity {
        Gravity {
            x: 0.0,
            y: self.physics.gravity_y,
            scale: self.physics.gravity_scale,
        }
    }

    pub fn fixed_delta(&self) -> f32 {
        self.runner.delta() as f32
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    // -- stepping ------------------------------------------------------------

    /// Advance one fixed step.
    pub fn step(&mut self) {
        if self.running {
            let dt = self.fixed_delta();
            self.world.step(dt);
        }
    }

    /// Run every step due at `now_ms`, calling `before_update` ahead of each.
    /// Returns the number of steps taken.
    pub fn advance(&mut self, now_ms: f64, mut before_update: impl FnMut(&mut World)) -> u32 {
        if !self.running {
            return 0;
        }
        let steps = self.runner.tick(now_ms);
        for _ in 0..steps {
            before_update(&mut self.world);
            self.step();
        }
        steps
    }

    // -- container -----------------------------------------------------------

    /// Move the floor, ceiling and right wall to the new container and
    /// recompute the reset layout. Live tags stay where they are.
    pub fn resize(&mut self, size: Vec2, measured: &[Option<f32>]) {
        if !self.running {
            return;
        }
        let size = effective_container(size, self.layout_cfg.min_container);
        let walls = WallGeometry::new(size, &self.boundary_cfg);

        let b = self.boundaries;
        for (id, (centre, extent)) in [
            (b.floor, walls.floor),
            (b.right, walls.right),
            (b.ceiling, walls.ceiling),
        ] {
            if let Some(mut body) = self.world.body_mut(id) {
                body.set_position(centre);
            }
            self.world.set_body_size(id, extent);
        }
        self.world.set_body_size(b.left, walls.left.1);

        self.container = size;
        self.initial_positions = layout::compute_initial_positions(
            size,
            &self.labels,
            measured,
            &self.layout_cfg,
            self.tags_cfg.height,
        );
        debug!(width = size.x, height = size.y, "container resized");
    }

    // -- lifecycle -----------------------------------------------------------

    /// Drop every constraint and body and stop stepping. Safe to call twice.
    pub fn teardown(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.world.clear();
        self.tags.clear();
        self.runner.reset();
        info!("simulation torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(labels: &[&str]) -> SimulationEngine {
        SimulationEngine::new(
            Vec2::new(800.0, 500.0),
            labels,
            &[],
            &SkillTagsConfig::default(),
        )
    }

    #[test]
    fn zero_container_falls_back_to_minimum() {
        assert_eq!(effective_container(Vec2::ZERO, 300.0), Vec2::splat(300.0));
        assert_eq!(
            effective_container(Vec2::new(640.0, f32::NAN), 300.0),
            Vec2::new(640.0, 300.0)
        );
        let e = SimulationEngine::new(Vec2::ZERO, &["Rust"], &[], &SkillTagsConfig::default());
        assert_eq!(e.container(), Vec2::splat(300.0));
    }

    #[test]
    fn one_body_per_label_at_layout_positions() {
        let e = engine(&["Rust", "Go", "Docker"]);
        assert_eq!(e.tags().len(), 3);
        assert_eq!(e.world().body_count(), 7);
        for (i, p) in e.initial_positions().iter().enumerate() {
            assert_eq!(e.tag_body(i).unwrap().position(), *p);
        }
        assert_eq!(e.tag_body(0).unwrap().size(), Vec2::new(100.0, 44.0));
    }

    #[test]
    fn walls_surround_container() {
        let e = engine(&[]);
        let b = e.boundaries();
        let body = |id| e.world().body(id).unwrap();
        assert_eq!(body(b.floor).position(), Vec2::new(400.0, 530.0));
        assert_eq!(body(b.floor).size(), Vec2::new(1000.0, 60.0));
        assert_eq!(body(b.left).position(), Vec2::new(-30.0, 250.0));
        assert_eq!(body(b.right).position(), Vec2::new(830.0, 250.0));
        assert_eq!(body(b.ceiling).position(), Vec2::new(400.0, -100.0));
        assert!(body(b.floor).is_static());
    }

    #[test]
    fn resize_moves_walls_but_not_tags() {
        let mut e = engine(&["Rust", "Go"]);
        let before = e.tag_body(1).unwrap().position();
        e.resize(Vec2::new(150.0, 400.0), &[]);

        let b = e.boundaries();
        let body = |id| e.world().body(id).unwrap();
        assert_eq!(body(b.floor).position(), Vec2::new(75.0, 430.0));
        assert_eq!(body(b.floor).size(), Vec2::new(350.0, 60.0));
        assert_eq!(body(b.right).position(), Vec2::new(180.0, 200.0));
        assert_eq!(body(b.ceiling).position(), Vec2::new(75.0, -100.0));
        assert_eq!(body(b.left).position(), Vec2::new(-30.0, 250.0));

        assert_eq!(e.tag_body(1).unwrap().position(), before);
        // 150 px leaves room for one tag per row.
        assert_eq!(e.initial_positions()[1].x, 20.0 + 80.0 / 2.0);
        assert_eq!(e.initial_positions()[1].y, 82.0);
    }

    #[test]
    fn runner_spreads_elapsed_time_into_fixed_steps() {
        let mut r = Runner::new(1000.0 / 60.0, 4);
        assert_eq!(r.tick(0.0), 1);
        assert_eq!(r.tick(1000.0 / 60.0), 1);
        assert_eq!(r.tick(1000.0 / 60.0 + 8.0), 0);
        assert_eq!(r.tick(1000.0 / 60.0 * 2.0 + 1.0), 1);
        assert_eq!(r.tick(10_000.0), 4);
        assert_eq!(r.tick(9_000.0), 0);
    }

    #[test]
    fn teardown_is_idempotent_and_stops_stepping() {
        let mut e = engine(&["Rust"]);
        e.teardown();
        e.teardown();
        assert!(!e.is_running());
        assert_eq!(e.world().body_count(), 0);
        assert!(e.tags().is_empty());
        assert_eq!(e.advance(100.0, |_| panic!("stepped after teardown")), 0);
        e.resize(Vec2::new(100.0, 100.0), &[]);
        e.step();
    }
}
