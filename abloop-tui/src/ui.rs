use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use strum::IntoEnumIterator;

use crate::{
    router::Router,
    state::{ActiveTab, AppState},
};

/// Draw the TUI interface
pub fn draw(f: &mut Frame, state: &AppState, router: &Router) {
    // Main horizontal split: Sidebar (left) and Main Content (right)
    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .margin(1)
        .constraints([
            Constraint::Length(15), // Sidebar navigation
            Constraint::Min(40),    // Main content area
        ])
        .split(f.area());

    draw_sidebar(f, main_chunks[0], state);
    draw_main_content(f, main_chunks[1], state, router);
}

/// Draw the sidebar navigation
fn draw_sidebar(f: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default()
        .title(" Navigation ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    f.render_widget(block, area);

    let nav_text: Vec<Line> = ActiveTab::iter()
        .map(|tab| {
            let is_active = state.active_tab == tab;
            let prefix = if is_active { "▶ " } else { "  " };
            let style = if is_active {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            Line::from(Span::styled(format!("{}{}", prefix, tab), style))
        })
        .collect();

    f.render_widget(Paragraph::new(nav_text), inner);
}

fn draw_main_content(f: &mut Frame, area: Rect, state: &AppState, router: &Router) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Route content
            Constraint::Length(3), // Controls info
            Constraint::Length(3), // Status bar
        ])
        .split(area);

    router.current().render(f, chunks[0], state);
    draw_controls(f, chunks[1], state, router);
    draw_status(f, chunks[2], state);
}

/// Draw the controls help from the current route's key hints
fn draw_controls(f: &mut Frame, area: Rect, state: &AppState, router: &Router) {
    let items = router.current().help_items(state);
    let mut spans = Vec::with_capacity(items.len() * 2);
    for (key, label) in items {
        let color = match key {
            "Q" => Color::Red,
            "Tab" => Color::Magenta,
            _ => Color::Yellow,
        };
        spans.push(Span::styled(format!("[{}]", key), Style::default().fg(color)));
        spans.push(Span::raw(format!(" {}  ", label)));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title(" Controls "));

    f.render_widget(paragraph, area);
}

/// Draw the status section
fn draw_status(f: &mut Frame, area: Rect, state: &AppState) {
    let status_style = if state.error_message.is_some() {
        Style::default().fg(Color::Red)
    } else if state.is_playing() {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Yellow)
    };

    let loop_icon = if state.is_looping { "🔁 A-B" } else { "➡️ Off" };
    let status_text = format!(
        "{}  |  {}  |  {:.2}x  |  Vol: {:3.0}%  |  {}",
        state.status_message,
        state.transport,
        state.rate,
        state.volume * 100.0,
        loop_icon
    );

    let paragraph = Paragraph::new(status_text)
        .style(status_style)
        .block(Block::default().borders(Borders::ALL).title(" Status "));

    f.render_widget(paragraph, area);
}
