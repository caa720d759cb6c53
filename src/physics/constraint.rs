//! Soft spring pulling a point on a body toward a world target.

use glam::{Mat2, Vec2};

use super::body::{Body, BodyId};

/// Slot index of a constraint inside its world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintId(pub(crate) usize);

/// Zero-length spring from `local_anchor` on `body` to `target`.
///
/// Each step the anchor closes `stiffness` of the remaining gap and loses
/// `damping` of its velocity, so a fast pointer drags the body smoothly
/// instead of teleporting it. The world applies the result as a velocity
/// change right before handing the step to rapier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragConstraint {
    pub body: BodyId,
    pub local_anchor: Vec2,
    pub target: Vec2,
    pub stiffness: f32,
    pub damping: f32,
}

/// New linear and angular velocity (px/ms, rad/ms) after one spring step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SpringResponse {
    pub(crate) velocity: Vec2,
    pub(crate) angular_velocity: f32,
    pub(crate) gap: f32,
}

impl DragConstraint {
    /// Attach at the world point `grab`, remembering its offset in the body frame.
    pub fn attach(body_id: BodyId, body: Body<'_>, grab: Vec2, stiffness: f32, damping: f32) -> Self {
        Self {
            body: body_id,
            local_anchor: body.local_point(grab),
            target: grab,
            stiffness,
            damping,
        }
    }

    /// Current world position of the anchor.
    pub fn anchor(&self, body: Body<'_>) -> Vec2 {
        body.world_point(self.local_anchor)
    }

    /// Velocity the body needs for the anchor to close the configured share
    /// of the gap over `dt` ms. `None` for bodies that cannot move.
    pub(crate) fn solve(&self, body: Body<'_>, dt: f32) -> Option<SpringResponse> {
        let r = body.rotation() * self.local_anchor;
        let gap = self.target - (body.position() + r);
        let (inv_m, inv_i) = (body.inv_mass(), body.inv_inertia());
        if inv_m == 0.0 || dt <= 0.0 {
            return None;
        }

        let velocity = body.velocity();
        let angular_velocity = body.angular_velocity();
        let point_velocity = velocity + r.perp() * angular_velocity;
        let desired = gap * (self.stiffness / dt) - point_velocity * self.damping;

        // Effective mass of the anchor point, including rotation about the centre.
        let k = Mat2::from_cols(
            Vec2::new(inv_m + inv_i * r.y * r.y, -inv_i * r.x * r.y),
            Vec2::new(-inv_i * r.x * r.y, inv_m + inv_i * r.x * r.x),
        );
        if k.determinant().abs() <= f32::EPSILON {
            return None;
        }
        let impulse = k.inverse() * desired;
        Some(SpringResponse {
            velocity: velocity + impulse * inv_m,
            angular_velocity: angular_velocity + r.perp_dot(impulse) * inv_i,
            gap: gap.length(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{BodyOptions, Gravity, World};

    const DT: f32 = 1000.0 / 60.0;

    fn world_with_tag() -> (World, BodyId) {
        let mut world = World::default();
        world.set_gravity(Gravity {
            y: 0.0,
            ..Gravity::default()
        });
        let id = world.add_body(
            Vec2::new(100.0, 100.0),
            Vec2::new(120.0, 44.0),
            BodyOptions {
                density: 0.003,
                ..BodyOptions::default()
            },
        );
        (world, id)
    }

    #[test]
    fn anchor_keeps_grab_offset() {
        let (world, id) = world_with_tag();
        let body = world.body(id).unwrap();
        let c = DragConstraint::attach(id, body, Vec2::new(130.0, 90.0), 0.1, 0.15);
        assert_eq!(c.local_anchor, Vec2::new(30.0, -10.0));
        assert!((c.anchor(body) - Vec2::new(130.0, 90.0)).length() < 1e-4);
    }

    #[test]
    fn centre_grab_moves_a_fraction_of_the_gap() {
        let (world, id) = world_with_tag();
        let body = world.body(id).unwrap();
        let mut c = DragConstraint::attach(id, body, Vec2::new(100.0, 100.0), 0.1, 0.15);
        c.target = Vec2::new(200.0, 100.0);
        let response = c.solve(body, DT).unwrap();
        assert_eq!(response.gap, 100.0);
        // 10% of the 100 px gap per step, expressed in px/ms.
        assert!((response.velocity.x - 10.0 / DT).abs() < 1e-4);
        assert!(response.angular_velocity.abs() < 1e-6);
    }

    #[test]
    fn off_centre_grab_spins_the_body() {
        let (world, id) = world_with_tag();
        let body = world.body(id).unwrap();
        let mut c = DragConstraint::attach(id, body, Vec2::new(150.0, 100.0), 0.1, 0.15);
        c.target = Vec2::new(150.0, 160.0);
        let response = c.solve(body, DT).unwrap();
        assert!(response.angular_velocity > 0.0);
        assert!(response.velocity.y > 0.0);
    }

    #[test]
    fn walls_cannot_be_dragged() {
        let mut world = World::default();
        let wall = world.add_body(Vec2::ZERO, Vec2::new(60.0, 400.0), BodyOptions::fixed());
        let body = world.body(wall).unwrap();
        let mut c = DragConstraint::attach(wall, body, Vec2::ZERO, 0.1, 0.15);
        c.target = Vec2::new(50.0, 0.0);
        assert!(c.solve(body, DT).is_none());
    }
}
