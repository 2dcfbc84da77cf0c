use abloop_core::EngineHandle;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders},
};
use tui_logger::{TuiLoggerLevelOutput, TuiLoggerWidget, TuiWidgetEvent, TuiWidgetState};

use crate::{
    keymap::Key,
    router::{RouteAction, RouteHandler},
    state::{ActiveTab, AppState},
};

// Log route; TuiWidgetState keeps the scroll position between frames
pub struct LogRoute {
    widget_state: TuiWidgetState,
}

impl std::fmt::Debug for LogRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogRoute").finish_non_exhaustive()
    }
}

impl LogRoute {
    pub fn new() -> Self {
        Self {
            widget_state: TuiWidgetState::new(),
        }
    }
}

impl RouteHandler for LogRoute {
    fn render(&self, frame: &mut Frame, area: Rect, _state: &AppState) {
        let widget = TuiLoggerWidget::default()
            .block(
                Block::default()
                    .title(" 📋 Log (PgUp/PgDn to Scroll) ")
                    .borders(Borders::ALL)
                    .border_style(
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ),
            )
            .style_error(Style::default().fg(Color::Red))
            .style_warn(Style::default().fg(Color::Yellow))
            .style_info(Style::default().fg(Color::Cyan))
            .style_debug(Style::default().fg(Color::Green))
            .style_trace(Style::default().fg(Color::Magenta))
            .output_level(Some(TuiLoggerLevelOutput::Abbreviated))
            .output_target(false)
            .output_file(false)
            .output_line(false)
            .state(&self.widget_state);

        frame.render_widget(widget, area);
    }

    fn handle_input(
        &mut self,
        key: Key,
        _state: &mut AppState,
        _handle: &EngineHandle,
    ) -> anyhow::Result<RouteAction> {
        let event = match key {
            Key::Up | Key::PageUp => TuiWidgetEvent::PrevPageKey,
            Key::Down | Key::PageDown => TuiWidgetEvent::NextPageKey,
            Key::End => TuiWidgetEvent::EscapeKey,
            Key::Esc => return Ok(RouteAction::Switch(ActiveTab::Playback)),
            _ => return Ok(RouteAction::None),
        };
        self.widget_state.transition(event);
        Ok(RouteAction::None)
    }

    fn tab(&self) -> ActiveTab {
        ActiveTab::Log
    }

    fn help_items(&self, _state: &AppState) -> Vec<(&str, &str)> {
        vec![
            ("↑/↓", "Scroll"),
            ("End", "Follow"),
            ("Esc", "Back"),
            ("Tab", "Switch Tab"),
            ("Q", "Quit"),
        ]
    }
}
