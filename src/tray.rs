use image::{ImageBuffer, Rgba};
use tray_icon::{
    Icon, TrayIcon, TrayIconBuilder,
    menu::{Menu, MenuItem, PredefinedMenuItem},
};

use crate::error::SkillTagsError;
use crate::mode::Mode;

/// Holds references to menu items that can be updated dynamically.
pub struct MenuItems {
    pub status_item: MenuItem,
    pub lock_item: MenuItem,
    pub reset_item: MenuItem,
    pub quit_item: MenuItem,
}

/// Status line shown at the top of the menu.
pub fn status_text(tags: usize, mode: Mode) -> String {
    let state = match mode {
        Mode::Free => "free",
        Mode::Locked => "locked",
    };
    format!("{tags} tags \u{00B7} {state}")
}

/// Build the tray dropdown menu and return both the menu and item handles.
pub fn build_menu(tags: usize, mode: Mode) -> Result<(Menu, MenuItems), SkillTagsError> {
    let menu = Menu::new();

    let status_item = MenuItem::new(status_text(tags, mode), false, None);
    let lock_item = MenuItem::new(mode.toggle_label(), true, None);
    let reset_item = MenuItem::new("Reset", true, None);
    let quit_item = MenuItem::new("Quit", true, None);

    menu.append_items(&[
        &status_item,
        &PredefinedMenuItem::separator(),
        &lock_item,
        &reset_item,
        &PredefinedMenuItem::separator(),
        &quit_item,
    ])
    .map_err(|e| SkillTagsError::Tray(e.to_string()))?;

    let items = MenuItems {
        status_item,
        lock_item,
        reset_item,
        quit_item,
    };

    Ok((menu, items))
}

/// Generate an 18x18 icon: an outlined tag with a hard shadow.
/// Black on transparent so macOS template mode can recolour it.
pub fn generate_icon() -> Result<Icon, SkillTagsError> {
    let size = 18u32;
    let (left, top, right, bottom) = (1u32, 5u32, 15u32, 12u32);

    let img = ImageBuffer::from_fn(size, size, |x, y| {
        let inside = x >= left && x <= right && y >= top && y <= bottom;
        let border = inside && (x < left + 2 || x > right - 2 || y < top + 2 || y > bottom - 2);
        let shadow = !inside && x >= left + 2 && x <= right + 2 && y >= top + 2 && y <= bottom + 2;
        if border || shadow {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });

    let (width, height) = img.dimensions();
    Icon::from_rgba(img.into_raw(), width, height).map_err(|e| SkillTagsError::Tray(e.to_string()))
}

/// Build the tray icon with the given menu.
pub fn build_tray(menu: Menu, icon: Icon, title: &str) -> Result<TrayIcon, SkillTagsError> {
    TrayIconBuilder::new()
        .with_menu(Box::new(menu))
        .with_tooltip(title)
        .with_icon(icon)
        .with_icon_as_template(true)
        .with_menu_on_left_click(true)
        .build()
        .map_err(|e| SkillTagsError::Tray(e.to_string()))
}

/// Reflect the current mode in the menu.
pub fn update_mode(items: &MenuItems, tags: usize, mode: Mode) {
    items.lock_item.set_text(mode.toggle_label());
    items.status_item.set_text(status_text(tags, mode));
}
