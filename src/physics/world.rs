use glam::Vec2;
use rapier2d::parry::query::PointQuery;
use rapier2d::prelude::*;

use super::body::{self, Body, BodyId, BodyMut, BodyOptions, Entry, MS_PER_S};
use super::constraint::{ConstraintId, DragConstraint};

/// Reference frame length (ms). Air friction coefficients are per reference frame.
pub const BASE_DELTA_MS: f32 = 1000.0 / 60.0;

/// Gravity direction and strength. Acceleration is `(x, y) * scale` px/ms².
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gravity {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

impl Gravity {
    pub fn acceleration(&self) -> Vec2 {
        Vec2::new(self.x, self.y) * self.scale
    }
}

impl Default for Gravity {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 1.0,
            scale: 0.001,
        }
    }
}

/// Solver knobs handed to rapier on every step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverSettings {
    pub velocity_iterations: usize,
    /// Penetration tolerated between resting bodies, px.
    pub position_slop: f32,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self::from(&crate::config::PhysicsConfig::default())
    }
}

impl From<&crate::config::PhysicsConfig> for SolverSettings {
    fn from(cfg: &crate::config::PhysicsConfig) -> Self {
        Self {
            velocity_iterations: cfg.velocity_iterations.max(1),
            position_slop: cfg.position_slop.max(0.0),
        }
    }
}

/// Rapier pipeline plus the arena of bodies the widget addresses by
/// [`BodyId`], and the drag springs applied ahead of each step.
pub struct World {
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    rigid_bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    entries: Vec<Entry>,
    constraints: Vec<Option<DragConstraint>>,
    gravity: Gravity,
    settings: SolverSettings,
}

impl World {
    pub fn new(gravity: Gravity, settings: SolverSettings) -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            entries: Vec::new(),
            constraints: Vec::new(),
            gravity,
            settings,
        }
    }

    // -- bodies --------------------------------------------------------------

    /// Add a rectangle centred on `centre`.
    pub fn add_body(&mut self, centre: Vec2, size: Vec2, options: BodyOptions) -> BodyId {
        let (rb, collider) = body::build(centre, size, &options);
        let handle = self.rigid_bodies.insert(rb);
        let collider = self
            .colliders
            .insert_with_parent(collider, handle, &mut self.rigid_bodies);
        self.entries.push(Entry::new(handle, collider, size, &options));
        BodyId(self.entries.len() - 1)
    }

    pub fn body(&self, id: BodyId) -> Option<Body<'_>> {
        let entry = self.entries.get(id.0)?;
        let rb = self.rigid_bodies.get(entry.handle)?;
        Some(Body::new(rb, entry))
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<BodyMut<'_>> {
        let entry = self.entries.get_mut(id.0)?;
        let rb = self.rigid_bodies.get_mut(entry.handle)?;
        Some(BodyMut::new(rb, entry))
    }

    pub fn body_count(&self) -> usize {
        self.entries.len()
    }

    /// Change a body's rectangle in place, keeping its centre.
    pub fn set_body_size(&mut self, id: BodyId, size: Vec2) {
        let Some(entry) = self.entries.get_mut(id.0) else {
            return;
        };
        let half = size.abs() * 0.5;
        if let Some(collider) = self.colliders.get_mut(entry.collider) {
            collider.set_shape(SharedShape::cuboid(half.x, half.y));
        }
        entry.size = size.abs();
    }

    pub fn apply_force(&mut self, id: BodyId, point: Vec2, force: Vec2) {
        if let Some(mut body) = self.body_mut(id) {
            body.apply_force(point, force);
        }
    }

    /// Bodies among `candidates` whose collider contains `point`, in
    /// candidate order. Uses the bodies' current poses, so it is exact
    /// right after a teleport too.
    pub fn query_point(&self, candidates: &[BodyId], point: Vec2) -> Vec<BodyId> {
        let point = point![point.x, point.y];
        candidates
            .iter()
            .copied()
            .filter(|id| {
                let Some(entry) = self.entries.get(id.0) else {
                    return false;
                };
                let (Some(rb), Some(collider)) = (
                    self.rigid_bodies.get(entry.handle),
                    self.colliders.get(entry.collider),
                ) else {
                    return false;
                };
                collider.shape().contains_point(rb.position(), &point)
            })
            .collect()
    }

    // -- gravity -------------------------------------------------------------

    pub fn gravity(&self) -> Gravity {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: Gravity) {
        self.gravity = gravity;
    }

    // -- constraints ---------------------------------------------------------

    pub fn add_constraint(&mut self, constraint: DragConstraint) -> ConstraintId {
        if let Some(slot) = self.constraints.iter().position(Option::is_none) {
            self.constraints[slot] = Some(constraint);
            return ConstraintId(slot);
        }
        self.constraints.push(Some(constraint));
        ConstraintId(self.constraints.len() - 1)
    }

    /// Remove a constraint; removing an unknown or already-removed id is a no-op.
    pub fn remove_constraint(&mut self, id: ConstraintId) -> Option<DragConstraint> {
        self.constraints.get_mut(id.0).and_then(Option::take)
    }

    pub fn constraint(&self, id: ConstraintId) -> Option<&DragConstraint> {
        self.constraints.get(id.0).and_then(Option::as_ref)
    }

    pub fn constraint_mut(&mut self, id: ConstraintId) -> Option<&mut DragConstraint> {
        self.constraints.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.iter().flatten().count()
    }

    /// Drop every body and constraint and start from an empty pipeline.
    pub fn clear(&mut self) {
        *self = Self::new(self.gravity, self.settings);
    }

    // -- stepping ------------------------------------------------------------

    /// Advance the simulation by `dt` milliseconds.
    pub fn step(&mut self, dt: f32) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        self.solve_constraints(dt);

        let params = IntegrationParameters {
            dt: dt / MS_PER_S,
            max_velocity_iterations: self.settings.velocity_iterations,
            allowed_linear_error: self.settings.position_slop,
            prediction_distance: self.settings.position_slop * 2.0,
            ..IntegrationParameters::default()
        };

        let gravity = body::to_vector(self.gravity.acceleration() * MS_PER_S * MS_PER_S);
        self.pipeline.step(
            &gravity,
            &params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            None,
            &(),
            &(),
        );

        // Queued forces act for a single step.
        for entry in &mut self.entries {
            entry.force = Vec2::ZERO;
            if let Some(rb) = self.rigid_bodies.get_mut(entry.handle) {
                rb.reset_forces(false);
                rb.reset_torques(false);
            }
        }
    }

    fn solve_constraints(&mut self, dt: f32) {
        let slop = self.settings.position_slop;
        let constraints: Vec<DragConstraint> = self.constraints.iter().flatten().copied().collect();
        for constraint in constraints {
            let Some(body) = self.body(constraint.body) else {
                continue;
            };
            let far = (constraint.target - constraint.anchor(body)).length() > slop;
            let Some(response) = constraint.solve(body, dt) else {
                continue;
            };
            let Some(mut body) = self.body_mut(constraint.body) else {
                continue;
            };
            if body.is_sleeping() {
                if !far {
                    continue;
                }
                body.set_sleeping(false);
            }
            body.set_velocity(response.velocity);
            body.set_angular_velocity(response.angular_velocity);
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(Gravity::default(), SolverSettings::default())
    }
}
