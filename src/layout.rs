//! Shelf packing of tags into rows, left to right and top to bottom.
//!
//! The table produced here is the reset target for the whole session, so it
//! must be reproducible: the jitter applied to rows that would overflow the
//! container comes from a seeded generator, not from ambient randomness.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::LayoutConfig;

/// Body width for a label: the measured width when known and positive,
/// otherwise a length-based estimate.
pub fn tag_width(label: &str, measured: Option<f32>, cfg: &LayoutConfig) -> f32 {
    match measured {
        Some(w) if w > 0.0 && w.is_finite() => w,
        _ => label.chars().count() as f32 * cfg.fallback_char_width + cfg.fallback_padding,
    }
}

/// Compute the centre of every tag in list order.
///
/// `measured` may be shorter than `labels`; missing entries use the fallback width.
pub fn compute_initial_positions<S: AsRef<str>>(
    container: Vec2,
    labels: &[S],
    measured: &[Option<f32>],
    cfg: &LayoutConfig,
    tag_height: f32,
) -> Vec<Vec2> {
    let mut rng = StdRng::seed_from_u64(cfg.jitter_seed);
    let mut cursor = Vec2::new(cfg.margin, cfg.start_y);
    let row_height = tag_height + cfg.gutter;
    let lowest = container.y - tag_height;

    labels
        .iter()
        .enumerate()
        .map(|(index, label)| {
            let width = tag_width(label.as_ref(), measured.get(index).copied().flatten(), cfg);

            if cursor.x + width > container.x - cfg.margin {
                cursor.x = cfg.margin;
                cursor.y += row_height;
            }

            let mut y = cursor.y;
            if y > lowest {
                y = lowest - rng.gen_range(0.0..1.0f32) * cfg.max_jitter;
            }

            let centre = Vec2::new(cursor.x + width / 2.0, y);
            cursor.x += width + cfg.gutter;
            centre
        })
        .collect()
}
