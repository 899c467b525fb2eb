//! Instrument surface rendering.
//!
//! Projects the presentation engine's pixel-domain markers onto the
//! terminal grid. The Seaboard view is a free two-axis lane; the Lightpad
//! view is a fixed 4x4 pad grid. Blur has no terminal equivalent, so it is
//! approximated with progressively lighter shade characters.

use crate::app::App;
use crate::mpe::{DeviceFamily, MarkerLayout, MarkerStyle};
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// Horizontal extent of the Seaboard surface in px (26 key positions).
const SEABOARD_WIDTH_PX: f32 = 780.0;

/// Vertical extent of the Seaboard lane in px.
const SEABOARD_HEIGHT_PX: f32 = 420.0;

/// Pad cell pitch plus gutter in px, matching the layout mapper.
const PAD_CELL_PX: f32 = 101.0;

/// Renders the instrument surface for the current device family.
pub fn render_instrument(frame: &mut Frame, area: Rect, app: &App) {
    let port = app.dispatcher.port();
    let family = port.family();

    let title = match family {
        DeviceFamily::Seaboard => " Seaboard ",
        DeviceFamily::Lightpad => " Lightpad ",
        DeviceFamily::Unknown => " Instrument ",
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    if !port.is_live() {
        render_message(frame, inner, "Connect your MPE device to start playing");
        return;
    }

    match family {
        DeviceFamily::Seaboard => render_seaboard(frame, inner, app),
        DeviceFamily::Lightpad => render_lightpad(frame, inner, app),
        DeviceFamily::Unknown => {
            render_message(frame, inner, "No visual layout for this device (audio only)")
        }
    }
}

/// Centers a dim one-line message in the given area.
fn render_message(frame: &mut Frame, area: Rect, message: &str) {
    let y = area.y + area.height / 2;
    let line = Rect::new(area.x, y, area.width, 1);
    frame.render_widget(
        Paragraph::new(Line::from(message).centered())
            .style(Style::default().fg(Color::DarkGray)),
        line,
    );
}

/// Picks a marker color from its pressure-equivalent intensity.
fn marker_color(intensity: f32) -> Color {
    let t = intensity.clamp(0.0, 1.0);
    Color::Rgb(
        (60.0 + 195.0 * t) as u8,
        (180.0 - 110.0 * t) as u8,
        (220.0 + 35.0 * t) as u8,
    )
}

/// Approximates blur with lighter shading.
fn marker_glyph(blur: f32, max_blur: f32) -> &'static str {
    let t = (blur / max_blur).clamp(0.0, 1.0);
    if t < 0.34 {
        "█"
    } else if t < 0.67 {
        "▓"
    } else {
        "▒"
    }
}

/// Renders the Seaboard keywave lane.
fn render_seaboard(frame: &mut Frame, area: Rect, app: &App) {
    for (_, marker) in app.dispatcher.visual().markers() {
        let left = match marker.layout {
            MarkerLayout::Key { left } => left,
            MarkerLayout::Pad { .. } => continue,
        };
        let (top, blur, scale, shift_x) = match marker.style {
            MarkerStyle::Key {
                top,
                blur,
                scale,
                shift_x,
            } => (top, blur, scale, shift_x),
            MarkerStyle::Pad { .. } => continue,
        };

        let x_px = (left + shift_x).clamp(0.0, SEABOARD_WIDTH_PX - 1.0);
        let y_px = top.clamp(0.0, SEABOARD_HEIGHT_PX - 1.0);
        let x = area.x + (x_px / SEABOARD_WIDTH_PX * area.width as f32) as u16;
        let y = area.y + (y_px / SEABOARD_HEIGHT_PX * area.height as f32) as u16;

        // Pressure grows the marker the way scale() grows the note div.
        let width = ((scale * 2.0) as u16).clamp(1, 5).min(area.right().saturating_sub(x));
        if width == 0 || y >= area.bottom() {
            continue;
        }

        let glyph = marker_glyph(blur, 1.2);
        frame.render_widget(
            Paragraph::new(glyph.repeat(width as usize))
                .style(Style::default().fg(marker_color(marker.style.intensity()))),
            Rect::new(x, y, width, 1),
        );
    }
}

/// Renders the Lightpad 4x4 grid with markers filling their cells.
fn render_lightpad(frame: &mut Frame, area: Rect, app: &App) {
    let cell_w = (area.width / 4).max(1);
    let cell_h = (area.height / 4).max(1);

    // Grid outline: a dim dot in the middle of every empty cell.
    for row in 0..4u16 {
        for col in 0..4u16 {
            let x = area.x + col * cell_w + cell_w / 2;
            let y = area.y + row * cell_h + cell_h / 2;
            if x < area.right() && y < area.bottom() {
                frame.render_widget(
                    Paragraph::new("·").style(Style::default().fg(Color::DarkGray)),
                    Rect::new(x, y, 1, 1),
                );
            }
        }
    }

    for (_, marker) in app.dispatcher.visual().markers() {
        let (left, bottom) = match marker.layout {
            MarkerLayout::Pad { left, bottom } => (left, bottom),
            MarkerLayout::Key { .. } => continue,
        };
        let blur = match marker.style {
            MarkerStyle::Pad { blur, .. } => blur,
            MarkerStyle::Key { .. } => continue,
        };

        let col = (((left - 12.0) / PAD_CELL_PX) as u16).min(3);
        let row = (((bottom - 12.0) / PAD_CELL_PX) as u16).min(3);

        // Rows count from the bottom of the pad.
        let x = area.x + col * cell_w;
        let y = area.y + (3 - row) * cell_h;
        let w = cell_w.min(area.right().saturating_sub(x));
        let h = cell_h.min(area.bottom().saturating_sub(y));
        if w == 0 || h == 0 {
            continue;
        }

        // Over-range pressure saturates the terminal cell even though the
        // marker's own opacity is unclamped.
        let glyph = marker_glyph(blur, 6.0);
        let fill: Vec<Line> = (0..h)
            .map(|_| Line::from(glyph.repeat(w as usize)))
            .collect();
        frame.render_widget(
            Paragraph::new(fill).style(Style::default().fg(marker_color(marker.style.intensity()))),
            Rect::new(x, y, w, h),
        );
    }
}
