//! Debug event pane.
//!
//! Shows the dispatcher's JSON dump of the current batch, the terminal
//! stand-in for the original player's on-page debug element.

use crate::app::App;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// Renders the debug pane with the last non-empty batch as pretty JSON.
pub fn render_debug(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" MPE Events ")
        .border_style(Style::default().fg(Color::DarkGray));

    let text = app.dispatcher.debug_text();
    let style = if text.is_empty() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Green)
    };
    let body = if text.is_empty() { "(idle)" } else { text };

    frame.render_widget(Paragraph::new(body).style(style).block(block), area);
}
