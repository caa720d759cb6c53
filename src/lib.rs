//! Physics-driven skill tags.
//!
//! A small rigid-body simulation that drops one rectangular tag per skill
//! into a container, lets the user drag and throw them, nudges them on
//! scroll, and can freeze ("lock") or reset the whole set. Views implement
//! [`sync::TagView`] and receive a transform after every frame.

pub mod config;
pub mod engine;
pub mod error;
pub mod interaction;
pub mod layout;
pub mod mode;
pub mod physics;
pub mod skills;
pub mod sync;
pub mod widget;

#[cfg(feature = "window")]
pub mod render;
#[cfg(feature = "window")]
pub mod window;

#[cfg(feature = "tray")]
pub mod tray;

pub use config::SkillTagsConfig;
pub use error::SkillTagsError;
pub use interaction::PointerEvent;
pub use mode::Mode;
pub use skills::Skill;
pub use sync::{ElementRegistry, TagTransform, TagView};
pub use widget::SkillWidget;
