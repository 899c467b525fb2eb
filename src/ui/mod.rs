//! Terminal user interface components.
//!
//! This module draws the simulated instrument surface, the status header,
//! and the debug event pane. The presentation engine hands over markers in
//! pixel-domain coordinates; the instrument views scale them onto the
//! terminal grid.

mod debug;
mod instrument;

use crate::app::App;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

pub use debug::render_debug;
pub use instrument::render_instrument;

/// Renders the complete UI layout.
///
/// Top to bottom: status header, instrument surface, optional debug pane,
/// key help line.
pub fn render(frame: &mut Frame, app: &App) {
    let debug_height = if app.show_debug { 12 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),            // Status header
            Constraint::Min(10),              // Instrument surface
            Constraint::Length(debug_height), // Debug pane
            Constraint::Length(1),            // Key help
        ])
        .split(frame.area());

    render_header(frame, chunks[0], app);
    render_instrument(frame, chunks[1], app);
    if app.show_debug {
        render_debug(frame, chunks[2], app);
    }
    render_help(frame, chunks[3]);
}

/// Renders the status header: device/link state, pool sizes, expression.
fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let port = app.dispatcher.port();
    let live = port.is_live();

    let link_span = if live {
        Span::styled(
            " LIVE ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(
            " OFFLINE ",
            Style::default()
                .fg(Color::White)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD),
        )
    };

    let top_line = Line::from(vec![
        Span::styled("Device: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            app.device_name().to_string(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        link_span,
        Span::styled(
            format!(
                "  Voices: {}  Markers: {}",
                app.dispatcher.audio().active_voices(),
                app.dispatcher.visual().visible_markers()
            ),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let mut bottom_spans = vec![Span::styled(
        format!(
            "Pressure: {:.1}  Timbre: {:.1}  Bend: {:+.1}  Octave: {:+}",
            app.pressure, app.timbre, app.pitch_bend, app.octave_offset
        ),
        Style::default().fg(Color::Gray),
    )];
    if let Some(status) = app.status() {
        bottom_spans.push(Span::raw("  "));
        bottom_spans.push(Span::styled(
            status.to_string(),
            Style::default().fg(Color::Yellow),
        ));
    }

    let block = Block::default().borders(Borders::ALL).title(" mpetui ");
    frame.render_widget(
        Paragraph::new(vec![top_line, Line::from(bottom_spans)]).block(block),
        area,
    );
}

/// Renders the one-line key reference at the bottom of the screen.
fn render_help(frame: &mut Frame, area: Rect) {
    let key_style = Style::default().fg(Color::Yellow);
    let desc_style = Style::default().fg(Color::DarkGray);

    let bindings: [(&str, &str); 10] = [
        ("Z-M/Q-I", "Play"),
        (",/.", "Octave"),
        ("[/]", "Pressure"),
        ("K/L", "Timbre"),
        ("←/→", "Bend"),
        ("Tab", "Device"),
        ("A", "Unplug"),
        ("O", "Port"),
        ("P", "Debug"),
        ("Esc", "Quit"),
    ];

    let mut spans = Vec::with_capacity(bindings.len() * 3);
    for (key, desc) in bindings {
        spans.push(Span::styled(format!("[{}]", key), key_style));
        spans.push(Span::styled(format!("{} ", desc), desc_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
