//! Native host window for the skills widget.
//!
//! A resizable `tao` window whose inner area is the widget container. Frames
//! are drawn on the CPU with `tiny-skia` and blitted through `softbuffer`.
//! Input is translated into the widget's pointer, scroll and mode calls.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Instant;

use glam::Vec2;
use softbuffer::{Context as SoftContext, Surface};
use tao::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};
use tao::event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent};
use tao::event_loop::EventLoopWindowTarget;
use tao::keyboard::Key;
use tao::window::{Window, WindowBuilder, WindowId};
use tiny_skia::Pixmap;
use tracing::{debug, info};

use crate::config::SkillTagsConfig;
use crate::error::SkillTagsError;
use crate::interaction::PointerEvent;
use crate::mode::Mode;
use crate::render::{self, LabelFont, TagSprite};
use crate::skills::Skill;
use crate::sync::ElementRegistry;
use crate::widget::SkillWidget;

/// What the event loop should do after a window event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowAction {
    None,
    Close,
    ModeChanged(Mode),
    Reset,
}

pub struct WidgetWindow {
    window: Arc<Window>,
    surface: Surface<Arc<Window>, Arc<Window>>,
    canvas: Option<Pixmap>,
    widget: SkillWidget<TagSprite>,
    wheel_line_px: f64,
    scroll_offset: f64,
    started: Instant,
}

impl WidgetWindow {
    /// Create the window and build the widget inside it. Must run on the main thread.
    pub fn new<T: 'static>(
        event_loop: &EventLoopWindowTarget<T>,
        config: &SkillTagsConfig,
        skills: Vec<Skill>,
    ) -> Result<Self, SkillTagsError> {
        let window = Arc::new(
            WindowBuilder::new()
                .with_title(&config.window.title)
                .with_resizable(true)
                .with_inner_size(LogicalSize::new(config.window.width, config.window.height))
                .build(event_loop)
                .map_err(|e| SkillTagsError::Window(e.to_string()))?,
        );

        let context = SoftContext::new(Arc::clone(&window))
            .map_err(|e| SkillTagsError::Surface(e.to_string()))?;
        let surface = Surface::new(&context, Arc::clone(&window))
            .map_err(|e| SkillTagsError::Surface(e.to_string()))?;

        let font = LabelFont::discover(config.window.font_path.as_deref(), config.window.font_size);

        let mut views = ElementRegistry::with_len(skills.len());
        for (index, skill) in skills.iter().enumerate() {
            views.bind(
                index,
                TagSprite::new(&skill.name, config.tags.height, font.as_ref()),
            );
        }

        let container = logical_size(&window);
        let mut widget = SkillWidget::new(container, skills, views, config);

        // Tags measured without a font take the body size chosen by the layout.
        let sizes: Vec<Vec2> = widget
            .engine()
            .map(|e| (0..e.tags().len()).filter_map(|i| e.tag_body(i).map(|b| b.size())).collect())
            .unwrap_or_default();
        for (index, size) in sizes.into_iter().enumerate() {
            if let Some(view) = widget.views_mut().get_mut(index) {
                view.fit_to(size, font.as_ref());
            }
        }

        info!(
            width = container.x,
            height = container.y,
            tags = widget.skills().len(),
            "widget window created"
        );

        Ok(Self {
            window,
            surface,
            canvas: None,
            widget,
            wheel_line_px: config.window.wheel_line_px,
            scroll_offset: 0.0,
            started: Instant::now(),
        })
    }

    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    fn now_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    // -- frame ---------------------------------------------------------------

    /// Step the simulation to the current time and redraw.
    pub fn tick(&mut self) {
        let now = self.now_ms();
        self.widget.frame(now);
        self.render();
    }

    pub fn render(&mut self) {
        let size = self.window.inner_size();
        let (Some(w), Some(h)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height)) else {
            return;
        };
        if self.surface.resize(w, h).is_err() {
            return;
        }

        let canvas = match self.canvas.take() {
            Some(c) if c.width() == size.width && c.height() == size.height => Some(c),
            _ => Pixmap::new(size.width, size.height),
        };
        let Some(mut canvas) = canvas else {
            return;
        };

        let scale = self.window.scale_factor() as f32;
        render::draw_background(&mut canvas, scale);
        render::draw_tags(&mut canvas, self.widget.views(), self.widget.is_locked(), scale);

        if let Ok(mut buffer) = self.surface.buffer_mut() {
            render::blit(&canvas, &mut buffer);
            let _ = buffer.present();
        }
        self.canvas = Some(canvas);
    }

    // -- actions -------------------------------------------------------------

    pub fn toggle_lock(&mut self) -> Mode {
        let mode = self.widget.toggle_lock();
        self.render();
        mode
    }

    pub fn reset(&mut self) {
        self.widget.reset();
        self.render();
    }

    /// Dispose the widget. Safe to call more than once.
    pub fn close(&mut self) {
        self.widget.teardown();
    }

    // -- events --------------------------------------------------------------

    pub fn handle_event(&mut self, event: &WindowEvent<'_>) -> WindowAction {
        let now = self.now_ms();
        match event {
            WindowEvent::CloseRequested => return WindowAction::Close,
            WindowEvent::Resized(size) => {
                let container = to_logical(*size, self.window.scale_factor());
                self.widget.on_resize(container);
            }
            WindowEvent::ScaleFactorChanged {
                scale_factor,
                new_inner_size,
                ..
            } => {
                let container = to_logical(**new_inner_size, *scale_factor);
                self.widget.on_resize(container);
            }
            WindowEvent::CursorMoved { position, .. } => {
                let point = self.to_container(*position);
                self.widget.handle_pointer(PointerEvent::Move(point), now);
            }
            WindowEvent::CursorLeft { .. } => {
                self.widget.handle_pointer(PointerEvent::Leave, now);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let pointer = match state {
                    ElementState::Pressed => PointerEvent::Down(self.widget.pointer()),
                    _ => PointerEvent::Up,
                };
                self.widget.handle_pointer(pointer, now);
            }
            WindowEvent::Touch(touch) => {
                let point = self.to_container(touch.location);
                let pointer = match touch.phase {
                    TouchPhase::Started => PointerEvent::TouchStart(point),
                    TouchPhase::Moved => PointerEvent::TouchMove(point),
                    TouchPhase::Ended => PointerEvent::TouchEnd,
                    _ => PointerEvent::TouchCancel,
                };
                self.widget.handle_pointer(pointer, now);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let dy = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y as f64 * self.wheel_line_px,
                    MouseScrollDelta::PixelDelta(p) => p.y / self.window.scale_factor(),
                    _ => 0.0,
                };
                // Wheel down scrolls the page down, i.e. the offset grows.
                self.scroll_offset -= dy;
                if let Some(velocity) = self.widget.on_scroll(self.scroll_offset, now) {
                    debug!(offset = self.scroll_offset, velocity, "wheel scroll");
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                match &event.logical_key {
                    Key::Escape => return WindowAction::Close,
                    Key::Character(c) if c.eq_ignore_ascii_case("l") => {
                        return WindowAction::ModeChanged(self.toggle_lock());
                    }
                    Key::Character(c) if c.eq_ignore_ascii_case("r") => {
                        self.reset();
                        return WindowAction::Reset;
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        WindowAction::None
    }

    fn to_container(&self, position: PhysicalPosition<f64>) -> Vec2 {
        let logical = position.to_logical::<f64>(self.window.scale_factor());
        Vec2::new(logical.x as f32, logical.y as f32)
    }
}

fn to_logical(size: PhysicalSize<u32>, scale_factor: f64) -> Vec2 {
    let logical = size.to_logical::<f64>(scale_factor);
    Vec2::new(logical.width as f32, logical.height as f32)
}

fn logical_size(window: &Window) -> Vec2 {
    to_logical(window.inner_size(), window.scale_factor())
}
