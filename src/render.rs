//! CPU drawing of the widget: dotted backdrop plus one sprite per tag.
//!
//! Tags are rendered once into their own pixmaps (one for each mode) and then
//! stamped onto the canvas with the body's rotation, so a frame costs one
//! transformed blit per tag.

use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec2;
use tiny_skia::{
    Color, FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, PremultipliedColorU8, Rect, Stroke,
    Transform,
};
use tracing::{info, warn};

use crate::error::SkillTagsError;
use crate::sync::{ElementRegistry, TagTransform, TagView};

// ---------------------------------------------------------------------------
// Palette and metrics
// ---------------------------------------------------------------------------

const BACKGROUND: [u8; 3] = [0xE4, 0xE4, 0xE7];
const DOT_ALPHA: u8 = 26;
const DOT_SPACING: f32 = 20.0;
const DOT_RADIUS: f32 = 2.0;

const BORDER: f32 = 2.0;
const PADDING_X: f32 = 16.0;
const ICON: f32 = 16.0;
const ICON_GAP: f32 = 8.0;
const SHADOW: f32 = 3.0;

struct TagColors {
    fill: [u8; 3],
    text: [u8; 3],
    border: [u8; 3],
    shadow: bool,
}

const FREE: TagColors = TagColors {
    fill: [0xFF, 0xFF, 0xFF],
    text: [0x00, 0x00, 0x00],
    border: [0x00, 0x00, 0x00],
    shadow: true,
};

const LOCKED: TagColors = TagColors {
    fill: [0xA1, 0xA1, 0xAA],
    text: [0x52, 0x52, 0x5B],
    border: [0x52, 0x52, 0x5B],
    shadow: false,
};

/// Monospace faces tried when no font is configured.
const FONT_CANDIDATES: &[&str] = &[
    "/System/Library/Fonts/Menlo.ttc",
    "/System/Library/Fonts/Monaco.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationMono-Bold.ttf",
    "C:\\Windows\\Fonts\\consolab.ttf",
    "C:\\Windows\\Fonts\\consola.ttf",
];

fn paint(rgb: [u8; 3], alpha: u8) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgb[0], rgb[1], rgb[2], alpha);
    paint.anti_alias = true;
    paint
}

// ---------------------------------------------------------------------------
// Font
// ---------------------------------------------------------------------------

/// Label face and pixel size.
pub struct LabelFont {
    font: fontdue::Font,
    size: f32,
}

impl LabelFont {
    pub fn load(path: &Path, size: f32) -> Result<Self, SkillTagsError> {
        let bytes = fs::read(path)?;
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| SkillTagsError::Font(format!("{}: {e}", path.display())))?;
        Ok(Self { font, size })
    }

    /// The configured font, else the first system monospace face that loads.
    pub fn discover(configured: Option<&Path>, size: f32) -> Option<Self> {
        let candidates = configured
            .map(Path::to_path_buf)
            .into_iter()
            .chain(FONT_CANDIDATES.iter().map(PathBuf::from));
        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load(&path, size) {
                Ok(font) => {
                    info!(path = %path.display(), size, "label font loaded");
                    return Some(font);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "failed to load font"),
            }
        }
        warn!("no usable font found, labels drawn without text");
        None
    }

    /// Advance width of `text` in pixels.
    pub fn measure(&self, text: &str) -> f32 {
        text.chars()
            .map(|c| self.font.metrics(c, self.size).advance_width)
            .sum()
    }

    /// Draw `text` with its baseline at `origin`.
    fn draw(&self, target: &mut Pixmap, text: &str, origin: Vec2, rgb: [u8; 3]) {
        let mut pen = origin.x;
        for c in text.chars() {
            let (metrics, coverage) = self.font.rasterize(c, self.size);
            if metrics.width > 0 && metrics.height > 0 {
                if let Some(glyph) = glyph_pixmap(&coverage, metrics.width, metrics.height, rgb) {
                    let x = (pen + metrics.xmin as f32).round() as i32;
                    let y = (origin.y - metrics.ymin as f32 - metrics.height as f32).round() as i32;
                    target.draw_pixmap(
                        x,
                        y,
                        glyph.as_ref(),
                        &PixmapPaint::default(),
                        Transform::identity(),
                        None,
                    );
                }
            }
            pen += metrics.advance_width;
        }
    }

    fn ascent(&self) -> f32 {
        self.font
            .horizontal_line_metrics(self.size)
            .map_or(self.size * 0.8, |m| m.ascent)
    }
}

fn glyph_pixmap(coverage: &[u8], width: usize, height: usize, rgb: [u8; 3]) -> Option<Pixmap> {
    let mut glyph = Pixmap::new(width as u32, height as u32)?;
    for (pixel, alpha) in glyph.pixels_mut().iter_mut().zip(coverage) {
        let a = *alpha as u16;
        let premul = |c: u8| ((c as u16 * a + 127) / 255) as u8;
        if let Some(color) =
            PremultipliedColorU8::from_rgba(premul(rgb[0]), premul(rgb[1]), premul(rgb[2]), *alpha)
        {
            *pixel = color;
        }
    }
    Some(glyph)
}

// ---------------------------------------------------------------------------
// Tag view
// ---------------------------------------------------------------------------

/// A drawable tag: its label, laid-out size and the latest transform.
pub struct TagSprite {
    label: String,
    size: Vec2,
    transform: Option<TagTransform>,
    free: Option<Pixmap>,
    locked: Option<Pixmap>,
}

impl TagSprite {
    /// Lay out a tag. The width follows the text when a font is available.
    pub fn new(label: &str, height: f32, font: Option<&LabelFont>) -> Self {
        let label = label.to_uppercase();
        let text = font.map_or(0.0, |f| f.measure(&label));
        let width = if font.is_some() {
            (BORDER + PADDING_X) * 2.0 + ICON + ICON_GAP + text
        } else {
            0.0
        };
        let mut sprite = Self {
            label,
            size: Vec2::new(width.ceil(), height),
            transform: None,
            free: None,
            locked: None,
        };
        sprite.free = sprite.paint(&FREE, font);
        sprite.locked = sprite.paint(&LOCKED, font);
        sprite
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn transform(&self) -> Option<TagTransform> {
        self.transform
    }

    /// Adopt the body size when the layout fell back to the length formula.
    pub fn fit_to(&mut self, size: Vec2, font: Option<&LabelFont>) {
        if self.size != size {
            self.size = size;
            self.free = self.paint(&FREE, font);
            self.locked = self.paint(&LOCKED, font);
        }
    }

    fn paint(&self, colors: &TagColors, font: Option<&LabelFont>) -> Option<Pixmap> {
        if self.size.x <= 0.0 {
            return None;
        }
        let w = self.size.x + SHADOW;
        let h = self.size.y + SHADOW;
        let mut pixmap = Pixmap::new(w.ceil() as u32, h.ceil() as u32)?;

        let body = Rect::from_xywh(0.0, 0.0, self.size.x, self.size.y)?;
        if colors.shadow {
            let shadow = Rect::from_xywh(SHADOW, SHADOW, self.size.x, self.size.y)?;
            pixmap.fill_rect(shadow, &paint([0, 0, 0], 255), Transform::identity(), None);
        }
        pixmap.fill_rect(body, &paint(colors.fill, 255), Transform::identity(), None);

        let outline = PathBuilder::from_rect(Rect::from_xywh(
            BORDER / 2.0,
            BORDER / 2.0,
            self.size.x - BORDER,
            self.size.y - BORDER,
        )?);
        let stroke = Stroke {
            width: BORDER,
            ..Stroke::default()
        };
        pixmap.stroke_path(
            &outline,
            &paint(colors.border, 255),
            &stroke,
            Transform::identity(),
            None,
        );

        let icon_x = BORDER + PADDING_X;
        let icon_y = (self.size.y - ICON) / 2.0;
        if let Some(icon) = icon_path(icon_x, icon_y) {
            pixmap.fill_path(
                &icon,
                &paint(colors.text, 255),
                FillRule::EvenOdd,
                Transform::identity(),
                None,
            );
        }

        if let Some(font) = font {
            let baseline = (self.size.y + font.ascent() * 0.75) / 2.0;
            let origin = Vec2::new(icon_x + ICON + ICON_GAP, baseline);
            font.draw(&mut pixmap, &self.label, origin, colors.text);
        }
        Some(pixmap)
    }
}

/// Square badge with a hollow centre standing in for the skill icon.
fn icon_path(x: f32, y: f32) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    pb.push_rect(Rect::from_xywh(x, y, ICON, ICON)?);
    pb.push_rect(Rect::from_xywh(x + 4.0, y + 4.0, ICON - 8.0, ICON - 8.0)?);
    pb.finish()
}

impl TagView for TagSprite {
    fn measured_size(&self) -> Option<Vec2> {
        (self.size.x > 0.0).then_some(self.size)
    }

    fn set_transform(&mut self, transform: TagTransform) {
        self.transform = Some(transform);
    }
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// Paint the dotted backdrop. `scale` maps logical to canvas pixels.
pub fn draw_background(canvas: &mut Pixmap, scale: f32) {
    let [r, g, b] = BACKGROUND;
    canvas.fill(Color::from_rgba8(r, g, b, 255));

    let spacing = DOT_SPACING * scale;
    let mut pb = PathBuilder::new();
    let (w, h) = (canvas.width() as f32, canvas.height() as f32);
    let mut y = spacing / 2.0;
    while y < h {
        let mut x = spacing / 2.0;
        while x < w {
            pb.push_circle(x, y, DOT_RADIUS * scale);
            x += spacing;
        }
        y += spacing;
    }
    if let Some(dots) = pb.finish() {
        canvas.fill_path(
            &dots,
            &paint([0, 0, 0], DOT_ALPHA),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }
}

/// Paint every bound tag at its last synced transform.
pub fn draw_tags(canvas: &mut Pixmap, tags: &ElementRegistry<TagSprite>, locked: bool, scale: f32) {
    for (_, tag) in tags.iter() {
        let Some(transform) = tag.transform else {
            continue;
        };
        let sprite = if locked { &tag.locked } else { &tag.free };
        let Some(sprite) = sprite else {
            continue;
        };
        let centre = transform.centre(tag.size);
        let placement = Transform::from_translate(transform.translate.x, transform.translate.y)
            .post_concat(Transform::from_rotate_at(
                transform.rotation.to_degrees(),
                centre.x,
                centre.y,
            ))
            .post_scale(scale, scale);
        canvas.draw_pixmap(0, 0, sprite.as_ref(), &PixmapPaint::default(), placement, None);
    }
}

/// Pack premultiplied RGBA into the `0RGB` words softbuffer expects.
pub fn blit(canvas: &Pixmap, target: &mut [u32]) {
    for (dst, src) in target.iter_mut().zip(canvas.data().chunks_exact(4)) {
        let (r, g, b, a) = (src[0] as u32, src[1] as u32, src[2] as u32, src[3] as u32);
        *dst = (a << 24) | (r << 16) | (g << 8) | b;
    }
}
