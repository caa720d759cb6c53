//! One-way copy of body transforms onto bound views.

use std::fmt;

use glam::Vec2;

use crate::engine::SimulationEngine;

/// Top-left translation plus rotation about the view's centre.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TagTransform {
    pub translate: Vec2,
    /// Radians.
    pub rotation: f32,
}

impl TagTransform {
    /// Transform placing a view of `size` so its centre sits on `centre`.
    pub fn centred(centre: Vec2, size: Vec2, rotation: f32) -> Self {
        Self {
            translate: centre - size / 2.0,
            rotation,
        }
    }

    /// Centre of a view of `size` under this transform.
    pub fn centre(&self, size: Vec2) -> Vec2 {
        self.translate + size / 2.0
    }
}

impl fmt::Display for TagTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "translate({}px, {}px) rotate({}rad)",
            self.translate.x, self.translate.y, self.rotation
        )
    }
}

/// A rendered tag the simulation can move.
pub trait TagView {
    /// Rendered size, if the view has been laid out.
    fn measured_size(&self) -> Option<Vec2>;
    fn set_transform(&mut self, transform: TagTransform);
}

/// Views by skill index. Slots may be empty.
#[derive(Debug)]
pub struct ElementRegistry<V> {
    slots: Vec<Option<V>>,
}

impl<V> Default for ElementRegistry<V> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<V: TagView> ElementRegistry<V> {
    /// Registry with `len` empty slots.
    pub fn with_len(len: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(len).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Bind `view` to `index`, growing the registry if needed. Returns the
    /// previously bound view.
    pub fn bind(&mut self, index: usize, view: V) -> Option<V> {
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index].replace(view)
    }

    pub fn unbind(&mut self, index: usize) -> Option<V> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    pub fn get(&self, index: usize) -> Option<&V> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut V> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Measured widths by index, for layout. Unbound or unmeasured slots are `None`.
    pub fn measured_widths(&self) -> Vec<Option<f32>> {
        self.slots
            .iter()
            .map(|slot| slot.as_ref().and_then(|v| v.measured_size()).map(|s| s.x))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &V)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (i, v)))
    }
}

/// Push every tag body's transform into its bound view. Unbound indices are
/// skipped. Returns how many views were updated.
pub fn sync_views<V: TagView>(engine: &SimulationEngine, registry: &mut ElementRegistry<V>) -> usize {
    let mut updated = 0;
    for index in 0..engine.tags().len() {
        let (Some(body), Some(view)) = (engine.tag_body(index), registry.get_mut(index)) else {
            continue;
        };
        let size = view.measured_size().unwrap_or_else(|| body.size());
        view.set_transform(TagTransform::centred(body.position(), size, body.angle()));
        updated += 1;
    }
    updated
}
