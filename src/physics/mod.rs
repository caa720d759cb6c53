//! 2D rigid-body world for rectangular tags, built on rapier2d.
//!
//! The rest of the crate sees pixels and milliseconds and addresses bodies
//! by [`BodyId`]. Contacts, integration and sleeping are rapier's; the drag
//! spring is applied on top before each step.

mod body;
mod constraint;
mod world;

pub use body::{Body, BodyId, BodyMut, BodyOptions};
pub use constraint::{ConstraintId, DragConstraint};
pub use world::{BASE_DELTA_MS, Gravity, SolverSettings, World};
