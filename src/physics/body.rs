//! Tag and wall bodies on top of rapier's rigid-body set.
//!
//! The widget works in pixels and milliseconds: velocities are px/ms,
//! angular velocities rad/ms, forces mass·px/ms². Rapier is stepped in
//! seconds with pixel lengths, so [`Body`] and [`BodyMut`] convert at the
//! boundary and nothing else in the crate sees rapier's time unit.

use glam::{Mat2, Vec2};
use rapier2d::prelude::*;

use super::world::BASE_DELTA_MS;

pub(crate) const MS_PER_S: f32 = 1000.0;

/// Stable arena index of a body inside its world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub(crate) usize);

impl BodyId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Construction parameters for [`World::add_body`](super::World::add_body).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyOptions {
    pub restitution: f32,
    pub friction: f32,
    /// Fraction of velocity lost per reference frame.
    pub friction_air: f32,
    pub density: f32,
    /// Corner radius in pixels.
    pub chamfer: f32,
    pub is_static: bool,
}

impl Default for BodyOptions {
    fn default() -> Self {
        Self {
            restitution: 0.0,
            friction: 0.1,
            friction_air: 0.01,
            density: 0.001,
            chamfer: 0.0,
            is_static: false,
        }
    }
}

impl BodyOptions {
    /// Immovable body, e.g. a container wall.
    pub fn fixed() -> Self {
        Self {
            is_static: true,
            ..Self::default()
        }
    }
}

/// Rapier damping coefficient (1/s) losing `friction_air` of the velocity
/// over one reference frame.
pub(crate) fn damping_from_friction_air(friction_air: f32) -> f32 {
    let fa = friction_air.clamp(0.0, 0.99);
    fa / ((1.0 - fa) * BASE_DELTA_MS / MS_PER_S)
}

pub(crate) fn to_vector(v: Vec2) -> Vector<Real> {
    vector![v.x, v.y]
}

pub(crate) fn to_vec2(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

/// Rigid body and collider for a rectangle centred on `centre`.
pub(crate) fn build(centre: Vec2, size: Vec2, options: &BodyOptions) -> (RigidBody, Collider) {
    let half = size.abs() * 0.5;
    let damping = damping_from_friction_air(options.friction_air);
    let body = if options.is_static {
        RigidBodyBuilder::fixed()
    } else {
        RigidBodyBuilder::dynamic()
    }
    .translation(to_vector(centre))
    .linear_damping(damping)
    .angular_damping(damping)
    .build();

    let radius = options.chamfer.clamp(0.0, half.min_element());
    let collider = if radius > 0.0 {
        ColliderBuilder::round_cuboid(half.x - radius, half.y - radius, radius)
    } else {
        ColliderBuilder::cuboid(half.x, half.y)
    }
    .restitution(options.restitution)
    .restitution_combine_rule(CoefficientCombineRule::Max)
    .friction(options.friction)
    .friction_combine_rule(CoefficientCombineRule::Min)
    .density(options.density)
    .build();
    (body, collider)
}

/// Bookkeeping kept beside each rapier body.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub(crate) handle: RigidBodyHandle,
    pub(crate) collider: ColliderHandle,
    pub(crate) size: Vec2,
    pub(crate) friction_air: f32,
    pub(crate) inv_mass: f32,
    pub(crate) inv_inertia: f32,
    /// Force queued for the next step, in widget units.
    pub(crate) force: Vec2,
    pub(crate) is_static: bool,
}

impl Entry {
    pub(crate) fn new(
        handle: RigidBodyHandle,
        collider: ColliderHandle,
        size: Vec2,
        options: &BodyOptions,
    ) -> Self {
        let size = size.abs();
        let (inv_mass, inv_inertia) = if options.is_static {
            (0.0, 0.0)
        } else {
            let mass = (options.density * size.x * size.y).max(f32::EPSILON);
            let inertia = mass * (size.x * size.x + size.y * size.y) / 12.0;
            (1.0 / mass, 1.0 / inertia.max(f32::EPSILON))
        };
        Self {
            handle,
            collider,
            size,
            friction_air: options.friction_air,
            inv_mass,
            inv_inertia,
            force: Vec2::ZERO,
            is_static: options.is_static,
        }
    }
}

/// Read-only view of a body.
#[derive(Clone, Copy)]
pub struct Body<'a> {
    rb: &'a RigidBody,
    entry: &'a Entry,
}

impl<'a> Body<'a> {
    pub(crate) fn new(rb: &'a RigidBody, entry: &'a Entry) -> Self {
        Self { rb, entry }
    }

    pub fn position(&self) -> Vec2 {
        to_vec2(self.rb.translation())
    }

    pub fn angle(&self) -> f32 {
        self.rb.rotation().angle()
    }

    pub fn size(&self) -> Vec2 {
        self.entry.size
    }

    pub fn half_extents(&self) -> Vec2 {
        self.entry.size * 0.5
    }

    pub fn rotation(&self) -> Mat2 {
        Mat2::from_angle(self.angle())
    }

    /// Convert a body-local offset into world space.
    pub fn world_point(&self, local: Vec2) -> Vec2 {
        self.position() + self.rotation() * local
    }

    /// Convert a world point into a body-local offset.
    pub fn local_point(&self, world: Vec2) -> Vec2 {
        self.rotation().transpose() * (world - self.position())
    }

    /// Corners in world space, counter-clockwise starting bottom-right.
    pub fn corners(&self) -> [Vec2; 4] {
        let h = self.half_extents();
        [
            self.world_point(Vec2::new(h.x, -h.y)),
            self.world_point(Vec2::new(h.x, h.y)),
            self.world_point(Vec2::new(-h.x, h.y)),
            self.world_point(Vec2::new(-h.x, -h.y)),
        ]
    }

    pub fn velocity(&self) -> Vec2 {
        to_vec2(self.rb.linvel()) / MS_PER_S
    }

    pub fn angular_velocity(&self) -> f32 {
        self.rb.angvel() / MS_PER_S
    }

    /// Linear speed in px/ms.
    pub fn speed(&self) -> f32 {
        self.velocity().length()
    }

    pub fn friction_air(&self) -> f32 {
        self.entry.friction_air
    }

    pub fn is_static(&self) -> bool {
        self.entry.is_static
    }

    pub fn is_sleeping(&self) -> bool {
        self.rb.is_sleeping()
    }

    /// Force queued since the last step.
    pub fn force(&self) -> Vec2 {
        self.entry.force
    }

    pub(crate) fn inv_mass(&self) -> f32 {
        self.entry.inv_mass
    }

    pub(crate) fn inv_inertia(&self) -> f32 {
        self.entry.inv_inertia
    }
}

/// Mutable handle on a body. Velocity, force and sleep setters skip static walls.
pub struct BodyMut<'a> {
    rb: &'a mut RigidBody,
    entry: &'a mut Entry,
}

impl<'a> BodyMut<'a> {
    pub(crate) fn new(rb: &'a mut RigidBody, entry: &'a mut Entry) -> Self {
        Self { rb, entry }
    }

    pub fn view(&self) -> Body<'_> {
        Body::new(&*self.rb, &*self.entry)
    }

    pub fn position(&self) -> Vec2 {
        self.view().position()
    }

    pub fn speed(&self) -> f32 {
        self.view().speed()
    }

    pub fn is_sleeping(&self) -> bool {
        self.rb.is_sleeping()
    }

    /// Teleport without touching velocity.
    pub fn set_position(&mut self, position: Vec2) {
        let angle = self.rb.rotation().angle();
        self.rb.set_position(Isometry::new(to_vector(position), angle), false);
    }

    pub fn set_angle(&mut self, angle: f32) {
        let translation = *self.rb.translation();
        self.rb.set_position(Isometry::new(translation, angle), false);
    }

    pub fn set_velocity(&mut self, velocity: Vec2) {
        if !self.entry.is_static {
            self.rb.set_linvel(to_vector(velocity * MS_PER_S), false);
        }
    }

    pub fn set_angular_velocity(&mut self, angular_velocity: f32) {
        if !self.entry.is_static {
            self.rb.set_angvel(angular_velocity * MS_PER_S, false);
        }
    }

    pub fn set_friction_air(&mut self, friction_air: f32) {
        self.entry.friction_air = friction_air;
        let damping = damping_from_friction_air(friction_air);
        self.rb.set_linear_damping(damping);
        self.rb.set_angular_damping(damping);
    }

    /// Put the body to sleep (freezing its motion) or wake it up.
    pub fn set_sleeping(&mut self, sleeping: bool) {
        if self.entry.is_static {
            return;
        }
        if sleeping {
            self.clear_forces();
            self.rb.sleep();
        } else {
            self.rb.wake_up(true);
        }
    }

    /// Queue a force at a world point for the next step.
    pub fn apply_force(&mut self, point: Vec2, force: Vec2) {
        if self.entry.is_static {
            return;
        }
        self.entry.force += force;
        let scaled = force * MS_PER_S * MS_PER_S;
        self.rb
            .add_force_at_point(to_vector(scaled), point![point.x, point.y], false);
    }

    /// Drop any queued force and torque.
    pub fn clear_forces(&mut self) {
        self.entry.force = Vec2::ZERO;
        self.rb.reset_forces(false);
        self.rb.reset_torques(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::World;
    use std::f32::consts::FRAC_PI_2;

    fn tag_options() -> BodyOptions {
        BodyOptions {
            density: 0.003,
            chamfer: 4.0,
            ..BodyOptions::default()
        }
    }

    #[test]
    fn damping_matches_per_frame_air_friction() {
        let fa = 0.015;
        let d = damping_from_friction_air(fa);
        let dt = BASE_DELTA_MS / MS_PER_S;
        let kept = 1.0 / (1.0 + dt * d);
        assert!((kept - (1.0 - fa)).abs() < 1e-6);
        assert_eq!(damping_from_friction_air(0.0), 0.0);
        assert!(damping_from_friction_air(5.0).is_finite());
    }

    #[test]
    fn velocities_are_reported_per_millisecond() {
        let mut world = World::default();
        let id = world.add_body(Vec2::new(100.0, 50.0), Vec2::new(120.0, 44.0), tag_options());
        let mut body = world.body_mut(id).unwrap();
        body.set_velocity(Vec2::new(0.3, -0.1));
        body.set_angular_velocity(0.002);
        let body = world.body(id).unwrap();
        assert!((body.velocity() - Vec2::new(0.3, -0.1)).length() < 1e-6);
        assert!((body.angular_velocity() - 0.002).abs() < 1e-7);
        assert!((body.speed() - Vec2::new(0.3, -0.1).length()).abs() < 1e-6);
    }

    #[test]
    fn static_bodies_ignore_velocity_and_forces() {
        let mut world = World::default();
        let id = world.add_body(Vec2::ZERO, Vec2::new(60.0, 400.0), BodyOptions::fixed());
        let mut wall = world.body_mut(id).unwrap();
        wall.set_velocity(Vec2::new(1.0, 1.0));
        wall.apply_force(Vec2::ZERO, Vec2::new(0.0, 1.0));
        wall.set_sleeping(true);
        let wall = world.body(id).unwrap();
        assert_eq!(wall.velocity(), Vec2::ZERO);
        assert_eq!(wall.force(), Vec2::ZERO);
        assert!(wall.is_static());
    }

    #[test]
    fn corners_follow_rotation() {
        let mut world = World::default();
        let id = world.add_body(Vec2::new(100.0, 50.0), Vec2::new(120.0, 44.0), tag_options());
        world.body_mut(id).unwrap().set_angle(FRAC_PI_2);
        let body = world.body(id).unwrap();
        let max_y = body.corners().iter().map(|c| c.y).fold(f32::MIN, f32::max);
        assert!((max_y - 110.0).abs() < 1e-3, "max y = {max_y}");
        assert!((body.local_point(body.world_point(Vec2::new(7.0, -3.0))) - Vec2::new(7.0, -3.0)).length() < 1e-4);
    }

    #[test]
    fn sleeping_freezes_motion_and_drops_queued_force() {
        let mut world = World::default();
        let id = world.add_body(Vec2::new(100.0, 50.0), Vec2::new(120.0, 44.0), tag_options());
        let mut body = world.body_mut(id).unwrap();
        body.set_velocity(Vec2::new(0.3, 0.1));
        body.apply_force(Vec2::new(100.0, 50.0), Vec2::new(0.0, 1.0));
        body.set_sleeping(true);
        assert!(body.is_sleeping());
        let view = body.view();
        assert_eq!(view.velocity(), Vec2::ZERO);
        assert_eq!(view.force(), Vec2::ZERO);
        body.set_sleeping(false);
        assert!(!body.is_sleeping());
    }

    #[test]
    fn air_friction_is_remembered_in_widget_units() {
        let mut world = World::default();
        let id = world.add_body(Vec2::ZERO, Vec2::new(120.0, 44.0), tag_options());
        world.body_mut(id).unwrap().set_friction_air(0.2);
        assert_eq!(world.body(id).unwrap().friction_air(), 0.2);
    }
}
