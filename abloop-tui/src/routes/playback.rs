use std::cell::Cell;

use abloop_core::{EngineCommand, EngineHandle, ScrubGesture, TrackGeometry};
use ratatui::{
    Frame,
    crossterm::event::{MouseButton, MouseEvent, MouseEventKind},
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
};

use crate::{
    keymap::{Action, Key},
    router::{RouteAction, RouteHandler},
    state::{ActiveTab, AppState},
};

// ==================================================================
// Playback Route Implementation
// ==================================================================

#[derive(Debug, Default)]
pub struct PlaybackRoute {
    /// Inner area of the progress gauge from the last frame, for hit testing
    gauge_area: Cell<Option<Rect>>,
}

impl RouteHandler for PlaybackRoute {
    fn render(&self, frame: &mut Frame, area: Rect, state: &AppState) {
        let gauge = draw_playback_panel(frame, area, state);
        self.gauge_area.set(Some(gauge));
    }

    fn handle_input(
        &mut self,
        key: Key,
        state: &mut AppState,
        handle: &EngineHandle,
    ) -> anyhow::Result<RouteAction> {
        let action = match key {
            Key::Up => Action::VolumeUp,
            Key::Down => Action::VolumeDown,
            _ => return Ok(RouteAction::None),
        };
        if let Some(command) = action.command(&state.config) {
            handle.send(command)?;
        }
        Ok(RouteAction::None)
    }

    fn handle_mouse(
        &mut self,
        event: MouseEvent,
        state: &mut AppState,
        handle: &EngineHandle,
    ) -> anyhow::Result<()> {
        let x = f64::from(event.column);
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let Some(gauge) = self.gauge_area.get() else {
                    return Ok(());
                };
                if !gauge.contains(Position::new(event.column, event.row)) {
                    return Ok(());
                }
                state.scrubbing = true;
                handle.send(EngineCommand::SetTrackGeometry(gauge_geometry(gauge)))?;
                handle.send(ScrubGesture::Begin(x))?;
            }
            MouseEventKind::Drag(MouseButton::Left) if state.scrubbing => {
                handle.send(ScrubGesture::Update(x))?;
            }
            MouseEventKind::Up(MouseButton::Left) if state.scrubbing => {
                state.scrubbing = false;
                handle.send(ScrubGesture::End)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn on_leave(&mut self, state: &mut AppState, handle: &EngineHandle) -> anyhow::Result<()> {
        // the mouse-up will be delivered to another route
        if state.scrubbing {
            state.scrubbing = false;
            handle.send(ScrubGesture::End)?;
        }
        Ok(())
    }

    fn track_geometry(&self) -> Option<TrackGeometry> {
        self.gauge_area.get().map(gauge_geometry)
    }

    fn tab(&self) -> ActiveTab {
        ActiveTab::Playback
    }

    fn help_items(&self, _state: &AppState) -> Vec<(&str, &str)> {
        vec![
            ("Space", "Play/Pause"),
            ("←/→", "Seek"),
            ("↑/↓", "Volume"),
            ("[/]", "Speed"),
            ("A/B", "Loop Points"),
            ("L", "Loop"),
            ("C", "Clear"),
            ("Tab", "Switch Tab"),
            ("Q", "Quit"),
        ]
    }
}

/// Map the gauge's inner area so its first cell is 0 and its last cell is 1.
pub fn gauge_geometry(inner: Rect) -> TrackGeometry {
    TrackGeometry::new(f64::from(inner.x), f64::from(inner.width.saturating_sub(1)))
}

/// One text row under the gauge with `A`, `B` and the loop region between them.
pub fn marker_line(width: usize, duration: Option<f64>, a: Option<f64>, b: Option<f64>) -> String {
    let mut cells = vec![' '; width];
    let Some(duration) = duration.filter(|d| *d > 0.0) else {
        return cells.into_iter().collect();
    };
    if width == 0 {
        return String::new();
    }

    let column = |t: f64| {
        let last = (width - 1) as f64;
        ((t / duration).clamp(0.0, 1.0) * last).round() as usize
    };

    match (a.map(column), b.map(column)) {
        (Some(ca), Some(cb)) => {
            for cell in cells.iter_mut().take(cb).skip(ca + 1) {
                *cell = '─';
            }
            cells[ca] = 'A';
            cells[cb] = if ca == cb { '|' } else { 'B' };
        }
        (Some(ca), None) => cells[ca] = 'A',
        (None, Some(cb)) => cells[cb] = 'B',
        (None, None) => {}
    }
    cells.into_iter().collect()
}

/// Draw the playback panel and return the gauge's inner area
pub fn draw_playback_panel(f: &mut Frame, area: Rect, state: &AppState) -> Rect {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Now playing info
            Constraint::Length(3), // Progress bar
            Constraint::Length(1), // Loop markers
            Constraint::Length(3), // Speed / volume / loop
            Constraint::Min(0),
        ])
        .split(area);

    draw_now_playing(f, chunks[0], state);
    let gauge = draw_progress(f, chunks[1], state);
    draw_markers(f, chunks[2], gauge, state);
    draw_transport_info(f, chunks[3], state);
    gauge
}

/// Draw the now playing section
fn draw_now_playing(f: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default()
        .title(" 🎵 Now Playing ")
        .borders(Borders::ALL)
        .border_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );

    let inner = block.inner(area);
    f.render_widget(block, area);

    if let Some(ref metadata) = state.metadata {
        let artist = metadata.artist.as_deref().unwrap_or("Unknown Artist");
        let album = metadata.album.as_deref().unwrap_or("Unknown Album");
        let format = format!(
            "{} · {} Hz · {}",
            metadata.format, metadata.sample_rate, metadata.channel_layout
        );

        let text = vec![
            Line::from(vec![Span::styled(
                metadata.display_title(),
                Style::default().fg(Color::White).bold(),
            )]),
            Line::from(vec![Span::styled(artist, Style::default().fg(Color::Gray))]),
            Line::from(vec![Span::styled(
                album,
                Style::default().fg(Color::DarkGray),
            )]),
            Line::from(vec![Span::styled(
                format,
                Style::default().fg(Color::DarkGray),
            )]),
        ];

        f.render_widget(Paragraph::new(text), inner);
    } else {
        let text = Paragraph::new("No audio loaded").style(Style::default().fg(Color::DarkGray));
        f.render_widget(text, inner);
    }
}

/// Draw the progress bar
fn draw_progress(f: &mut Frame, area: Rect, state: &AppState) -> Rect {
    let position_str = AppState::format_time(state.display_position());
    let duration_str = state
        .duration
        .map(AppState::format_time)
        .unwrap_or_else(|| "--:--".to_string());
    let label = format!("{} / {}", position_str, duration_str);

    let color = if state.scrubbing || state.scrub_preview.is_some() {
        Color::Yellow
    } else if state.is_looping {
        Color::Magenta
    } else {
        Color::Cyan
    };

    let block = Block::default().borders(Borders::ALL);
    let inner = block.inner(area);
    let gauge = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(color).bg(Color::DarkGray))
        .ratio(state.progress())
        .label(label);

    f.render_widget(gauge, area);
    inner
}

fn draw_markers(f: &mut Frame, area: Rect, gauge: Rect, state: &AppState) {
    let row = Rect::new(gauge.x, area.y, gauge.width, area.height);
    let line = marker_line(
        usize::from(gauge.width),
        state.duration,
        state.loop_a,
        state.loop_b,
    );
    let style = if state.is_looping {
        Style::default().fg(Color::Magenta)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    f.render_widget(Paragraph::new(line).style(style), row);
}

fn draw_transport_info(f: &mut Frame, area: Rect, state: &AppState) {
    let text = Line::from(vec![
        Span::styled("Speed ", Style::default().fg(Color::Gray)),
        Span::styled(format!("{:.2}x", state.rate), Style::default().fg(Color::White)),
        Span::raw("   "),
        Span::styled("Vol ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("{:3.0}%", state.volume * 100.0),
            Style::default().fg(Color::White),
        ),
        Span::raw("   "),
        Span::styled("Loop ", Style::default().fg(Color::Gray)),
        Span::styled(state.loop_label(), Style::default().fg(Color::White)),
        Span::raw(format!("   ×{}", state.loop_count)),
    ]);

    let paragraph = Paragraph::new(text).block(Block::default().borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_span_loop_region() {
        let line = marker_line(11, Some(100.0), Some(20.0), Some(50.0));
        assert_eq!(line, "  A──B     ");
    }

    #[test]
    fn markers_need_a_duration() {
        assert_eq!(marker_line(4, None, Some(1.0), None), "    ");
        assert_eq!(marker_line(4, Some(10.0), None, Some(10.0)), "   B");
    }

    #[test]
    fn gauge_edges_map_to_track_ends() {
        let geometry = gauge_geometry(Rect::new(5, 2, 21, 1));
        assert_eq!(geometry.fraction_at(5.0), 0.0);
        assert_eq!(geometry.fraction_at(25.0), 1.0);
        assert_eq!(geometry.fraction_at(15.0), 0.5);
    }
}
