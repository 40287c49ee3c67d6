use tiny_skia::{Paint, Color, Rect, Transform, PixmapMut, PathBuilder, Stroke};
use cosmic_text::{Attrs, Buffer, FontSystem, Metrics, SwashCache};
use crate::config::ThemeConfig;
use crate::menu::{MenuItem, PopupMenu};
use crate::state::{AppState, Mode};
use crate::workflow::{Choice, ConfirmDialog};

const ITEM_HEIGHT: f32 = 30.0;
const MENU_WIDTH: f32 = 180.0;

struct Palette {
    background: Color,
    border: Color,
    text: Color,
    selection_background: Color,
    selection_text: Color,
    danger: Color,
}

impl Palette {
    fn new(theme: &ThemeConfig) -> Self {
        Self {
            background: ThemeConfig::parse_color(&theme.background),
            border: ThemeConfig::parse_color(&theme.border_color),
            text: ThemeConfig::parse_color(&theme.text),
            selection_background: ThemeConfig::parse_color(&theme.selection_background),
            selection_text: ThemeConfig::parse_color(&theme.selection_text),
            danger: ThemeConfig::parse_color(&theme.danger),
        }
    }
}

pub struct Renderer {
    font_system: FontSystem,
    swash_cache: SwashCache,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            swash_cache: SwashCache::new(),
        }
    }

    pub fn draw(&mut self, pixmap: &mut PixmapMut, state: &AppState) {
        let theme = &state.config.theme;
        let palette = Palette::new(theme);

        pixmap.fill(Color::TRANSPARENT);

        let width = pixmap.width() as f32;
        let height = pixmap.height() as f32;

        if let Some(rect) = Rect::from_xywh(0.0, 0.0, width, height) {
            self.draw_rounded_rect(pixmap, rect, theme.border_radius, palette.background, Some(palette.border));
        }

        let search_y = theme.padding;
        let (search_text, search_color) = if state.query.is_empty() {
            ("Search apps...".to_string(), Color::from_rgba8(100, 100, 100, 255))
        } else {
            (format!("> {}", state.query), palette.text)
        };
        self.draw_text(pixmap, &search_text, theme.padding, search_y, 20.0, search_color);

        let list_start_y = search_y + 20.0 + theme.spacing;
        let footer_y = height - theme.padding - 16.0;
        let visible_items = ((footer_y - list_start_y) / ITEM_HEIGHT).max(0.0) as usize;
        let scroll_offset = scroll_offset(state.selected_index, state.filtered_indices.len(), visible_items);

        let mut selected_row_y = list_start_y;
        for (i, &entry_idx) in state.filtered_indices.iter().enumerate().skip(scroll_offset).take(visible_items) {
            let entry = &state.entries[entry_idx];
            let y = list_start_y + ((i - scroll_offset) as f32 * ITEM_HEIGHT);

            let mut text_color = palette.text;
            if i == state.selected_index {
                selected_row_y = y;
                if let Some(sel_rect) = Rect::from_xywh(theme.padding / 2.0, y, width - theme.padding, ITEM_HEIGHT) {
                    self.draw_rounded_rect(pixmap, sel_rect, theme.border_radius / 2.0, palette.selection_background, None);
                }
                text_color = palette.selection_text;
            }

            self.draw_text(pixmap, entry.name(), theme.padding, y + (ITEM_HEIGHT - 16.0) / 2.0, 16.0, text_color);
        }

        if state.filtered_indices.is_empty() {
            self.draw_text(pixmap, "No results found", theme.padding, list_start_y, 16.0, Color::from_rgba8(150, 100, 100, 255));
        }

        let hint = state.status.as_deref().unwrap_or("Enter: open   Tab: actions   Esc: close");
        self.draw_text(pixmap, hint, theme.padding, footer_y, 13.0, Color::from_rgba8(120, 120, 120, 255));

        match &state.mode {
            Mode::Browse => {}
            Mode::Menu { app_id, selected } => {
                if let Some(menu) = state.open_menu_for(app_id) {
                    self.draw_menu(pixmap, theme, &palette, menu, *selected, selected_row_y);
                }
            }
            Mode::Confirm(dialog) => self.draw_dialog(pixmap, theme, &palette, dialog),
        }
    }

    fn draw_menu(&mut self, pixmap: &mut PixmapMut, theme: &ThemeConfig, palette: &Palette, menu: &PopupMenu, selected: usize, anchor_y: f32) {
        let width = pixmap.width() as f32;
        let height = pixmap.height() as f32;
        let menu_height = menu.items.iter()
            .map(|item| if item.is_actionable() { ITEM_HEIGHT } else { theme.spacing })
            .sum::<f32>() + theme.spacing;

        let x = width - MENU_WIDTH - theme.padding;
        let y = anchor_y.min(height - menu_height - theme.padding).max(theme.padding);
        let Some(frame) = Rect::from_xywh(x, y, MENU_WIDTH, menu_height) else { return };
        self.draw_rounded_rect(pixmap, frame, theme.border_radius / 2.0, palette.background, Some(palette.border));

        let mut item_y = y + theme.spacing / 2.0;
        for (i, item) in menu.items.iter().enumerate() {
            match item {
                MenuItem::Separator => {
                    if let Some(line) = Rect::from_xywh(x + theme.spacing, item_y + theme.spacing / 2.0, MENU_WIDTH - 2.0 * theme.spacing, 1.0) {
                        self.draw_rounded_rect(pixmap, line, 0.0, palette.border, None);
                    }
                    item_y += theme.spacing;
                }
                MenuItem::Action { label, destructive, .. } => {
                    let mut color = if *destructive { palette.danger } else { palette.text };
                    if i == selected {
                        if let Some(sel) = Rect::from_xywh(x + 4.0, item_y, MENU_WIDTH - 8.0, ITEM_HEIGHT) {
                            self.draw_rounded_rect(pixmap, sel, theme.border_radius / 3.0, palette.selection_background, None);
                        }
                        if !*destructive {
                            color = palette.selection_text;
                        }
                    }
                    self.draw_text(pixmap, label, x + theme.spacing, item_y + (ITEM_HEIGHT - 16.0) / 2.0, 16.0, color);
                    item_y += ITEM_HEIGHT;
                }
            }
        }
    }

    fn draw_dialog(&mut self, pixmap: &mut PixmapMut, theme: &ThemeConfig, palette: &Palette, dialog: &ConfirmDialog) {
        let width = pixmap.width() as f32;
        let height = pixmap.height() as f32;

        if let Some(shade) = Rect::from_xywh(0.0, 0.0, width, height) {
            self.draw_rounded_rect(pixmap, shade, theme.border_radius, Color::from_rgba8(0, 0, 0, 140), None);
        }

        let dialog_w = (width - 4.0 * theme.padding).min(420.0);
        let dialog_h = 150.0;
        let x = (width - dialog_w) / 2.0;
        let y = (height - dialog_h) / 2.0;
        let Some(frame) = Rect::from_xywh(x, y, dialog_w, dialog_h) else { return };
        self.draw_rounded_rect(pixmap, frame, theme.border_radius, palette.background, Some(palette.border));

        self.draw_text(pixmap, &dialog.prompt.message, x + theme.padding, y + theme.padding + 10.0, 20.0, palette.text);

        let button_w = (dialog_w - 3.0 * theme.padding) / 2.0;
        let button_y = y + dialog_h - theme.padding - ITEM_HEIGHT;
        let buttons = [
            (dialog.prompt.cancel_label, Choice::Cancel, palette.text),
            (dialog.prompt.confirm_label, Choice::Delete, palette.danger),
        ];
        for (i, (label, choice, color)) in buttons.into_iter().enumerate() {
            let button_x = x + theme.padding + i as f32 * (button_w + theme.padding);
            let focused = dialog.focus == choice;
            let fill = if focused { palette.selection_background } else { palette.background };
            if let Some(rect) = Rect::from_xywh(button_x, button_y, button_w, ITEM_HEIGHT) {
                self.draw_rounded_rect(pixmap, rect, theme.border_radius / 2.0, fill, Some(palette.border));
            }
            self.draw_text(pixmap, label, button_x + theme.spacing, button_y + (ITEM_HEIGHT - 16.0) / 2.0, 16.0, color);
        }
    }

    fn draw_rounded_rect(&self, pixmap: &mut PixmapMut, rect: Rect, radius: f32, fill: Color, stroke: Option<Color>) {
        let mut pb = PathBuilder::new();
        let x = rect.left();
        let y = rect.top();
        let w = rect.width();
        let h = rect.height();
        let radius = radius.min(w / 2.0).min(h / 2.0);

        pb.move_to(x + radius, y);
        pb.line_to(x + w - radius, y);
        pb.quad_to(x + w, y, x + w, y + radius);
        pb.line_to(x + w, y + h - radius);
        pb.quad_to(x + w, y + h, x + w - radius, y + h);
        pb.line_to(x + radius, y + h);
        pb.quad_to(x, y + h, x, y + h - radius);
        pb.line_to(x, y + radius);
        pb.quad_to(x, y, x + radius, y);
        pb.close();

        if let Some(path) = pb.finish() {
            let mut paint = Paint::default();
            paint.set_color(fill);
            paint.anti_alias = true;
            pixmap.fill_path(&path, &paint, tiny_skia::FillRule::Winding, Transform::identity(), None);

            if let Some(s_color) = stroke {
                let mut s_paint = Paint::default();
                s_paint.set_color(s_color);
                s_paint.anti_alias = true;
                let stroke_obj = Stroke { width: 1.5, ..Default::default() };
                pixmap.stroke_path(&path, &s_paint, &stroke_obj, Transform::identity(), None);
            }
        }
    }

    fn draw_text(&mut self, pixmap: &mut PixmapMut, text: &str, x: f32, y: f32, size: f32, color: Color) {
        let mut buffer = Buffer::new(&mut self.font_system, Metrics::new(size, size));
        buffer.set_size(&mut self.font_system, Some(pixmap.width() as f32 - x), None);
        buffer.set_text(&mut self.font_system, text, Attrs::new(), cosmic_text::Shaping::Advanced);
        buffer.shape_until_scroll(&mut self.font_system, false);

        let text_color = cosmic_text::Color::rgba(
            (color.red() * 255.0) as u8,
            (color.green() * 255.0) as u8,
            (color.blue() * 255.0) as u8,
            (color.alpha() * 255.0) as u8,
        );

        let (pw, ph) = (pixmap.width() as i32, pixmap.height() as i32);
        buffer.draw(&mut self.font_system, &mut self.swash_cache, text_color, |draw_x, draw_y, w, h, color| {
            let draw_x = draw_x + x as i32;
            let draw_y = draw_y + y as i32;
            if w == 0 || h == 0 { return; }
            if draw_x < 0 || draw_y < 0 || draw_x >= pw || draw_y >= ph { return; }

            let paint = Paint {
                shader: tiny_skia::Shader::SolidColor(Color::from_rgba8(color.r(), color.g(), color.b(), color.a())),
                ..Paint::default()
            };
            if let Some(r) = Rect::from_xywh(draw_x as f32, draw_y as f32, w as f32, h as f32) {
                pixmap.fill_rect(r, &paint, Transform::identity(), None);
            }
        });
    }
}

/// First visible row so the selection stays roughly centered.
pub fn scroll_offset(selected: usize, total: usize, visible: usize) -> usize {
    if total <= visible {
        0
    } else if selected < visible / 2 {
        0
    } else if selected >= total - visible / 2 {
        total.saturating_sub(visible)
    } else {
        selected - visible / 2
    }
}
