use std::time::{Duration, Instant};

use tao::{
    event::{Event, StartCause},
    event_loop::{ControlFlow, EventLoopBuilder},
};
use tracing::{error, info};

use skill_tags::config;
use skill_tags::skills;
use skill_tags::window::{WidgetWindow, WindowAction};

#[cfg(feature = "tray")]
use skill_tags::tray;
#[cfg(feature = "tray")]
use tray_icon::{TrayIcon, menu::MenuEvent};

/// Frame interval of the presentation loop.
const FRAME: Duration = Duration::from_millis(16);

enum UserEvent {
    #[cfg(feature = "tray")]
    MenuEvent(MenuEvent),
}

fn main() -> anyhow::Result<()> {
    // Init tracing to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("skill-tags starting");

    let cfg = config::load();
    let skill_list = skills::resolve(&cfg);
    let tag_count = skill_list.len();
    info!(skills = tag_count, "skills resolved");

    let event_loop = EventLoopBuilder::<UserEvent>::with_user_event().build();

    #[cfg(feature = "tray")]
    let (menu, menu_items) = {
        let proxy = event_loop.create_proxy();
        MenuEvent::set_event_handler(Some(move |event| {
            let _ = proxy.send_event(UserEvent::MenuEvent(event));
        }));
        tray::build_menu(tag_count, skill_tags::mode::Mode::Free)?
    };
    #[cfg(feature = "tray")]
    let icon = tray::generate_icon()?;
    // The tray icon must be created inside the event loop (after Init)
    #[cfg(feature = "tray")]
    let mut tray_icon: Option<TrayIcon> = None;

    let mut skill_list = Some(skill_list);
    let mut widget_window: Option<WidgetWindow> = None;

    event_loop.run(move |event, event_loop_target, control_flow| {
        *control_flow = ControlFlow::WaitUntil(Instant::now() + FRAME);

        let mut action = WindowAction::None;

        match event {
            Event::NewEvents(StartCause::Init) => {
                let skills = skill_list.take().unwrap_or_default();
                match WidgetWindow::new(event_loop_target, &cfg, skills) {
                    Ok(window) => widget_window = Some(window),
                    Err(e) => {
                        error!(error = %e, "failed to create widget window");
                        *control_flow = ControlFlow::Exit;
                        return;
                    }
                }

                #[cfg(feature = "tray")]
                match tray::build_tray(menu.clone(), icon.clone(), &cfg.window.title) {
                    Ok(ti) => {
                        tray_icon = Some(ti);
                        info!("tray icon created");
                    }
                    Err(e) => error!(error = %e, "failed to create tray icon"),
                }

                // Wake up the run loop on macOS so the window and icon appear
                #[cfg(target_os = "macos")]
                {
                    use objc2_core_foundation::CFRunLoop;
                    if let Some(rl) = CFRunLoop::main() {
                        rl.wake_up();
                    }
                }
            }

            // Presentation tick at ~60fps; the widget runs the physics steps due.
            Event::NewEvents(StartCause::ResumeTimeReached { .. }) => {
                if let Some(ref mut w) = widget_window {
                    w.tick();
                }
            }

            #[cfg(feature = "tray")]
            Event::UserEvent(UserEvent::MenuEvent(event)) => {
                if let Some(ref mut w) = widget_window {
                    if event.id == menu_items.quit_item.id() {
                        info!("quit requested");
                        action = WindowAction::Close;
                    } else if event.id == menu_items.lock_item.id() {
                        action = WindowAction::ModeChanged(w.toggle_lock());
                    } else if event.id == menu_items.reset_item.id() {
                        w.reset();
                        action = WindowAction::Reset;
                    }
                }
            }

            Event::WindowEvent {
                window_id,
                ref event,
                ..
            } => {
                if let Some(ref mut w) = widget_window {
                    if window_id == w.window_id() {
                        action = w.handle_event(event);
                    }
                }
            }

            Event::LoopDestroyed => {
                if let Some(ref mut w) = widget_window {
                    w.close();
                }
            }

            _ => {}
        }

        match action {
            WindowAction::Close => {
                if let Some(mut w) = widget_window.take() {
                    w.close();
                }
                #[cfg(feature = "tray")]
                tray_icon.take();
                *control_flow = ControlFlow::Exit;
            }
            WindowAction::ModeChanged(mode) => {
                info!(mode = ?mode, "mode changed");
                #[cfg(feature = "tray")]
                tray::update_mode(&menu_items, tag_count, mode);
            }
            WindowAction::Reset | WindowAction::None => {}
        }
    })
}
