// =================================================================================
//  KEY NORMALIZATION AND BINDINGS
// =================================================================================

use abloop_core::{PlayerCommand, PlayerConfig};
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

const VOLUME_STEP: f64 = 0.1;

/// A key press with shift and case folded away, so `A`, `a` and
/// shift+`a` all arrive as `Key::Char('a')`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Left,
    Right,
    Up,
    Down,
    Tab,
    Esc,
    Enter,
    PageUp,
    PageDown,
    Home,
    End,
    /// Ctrl+C
    Interrupt,
}

impl Key {
    /// Returns `None` for releases and for keys nothing is bound to.
    pub fn normalize(event: KeyEvent) -> Option<Key> {
        if !matches!(event.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
            return None;
        }

        let key = match event.code {
            KeyCode::Char('c') | KeyCode::Char('C')
                if event.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                Key::Interrupt
            }
            KeyCode::Char(c) => Key::Char(fold_char(c)),
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Tab | KeyCode::BackTab => Key::Tab,
            KeyCode::Esc => Key::Esc,
            KeyCode::Enter => Key::Enter,
            KeyCode::PageUp => Key::PageUp,
            KeyCode::PageDown => Key::PageDown,
            KeyCode::Home => Key::Home,
            KeyCode::End => Key::End,
            _ => return None,
        };
        Some(key)
    }
}

/// Shifted punctuation maps back to its unshifted key on a US layout.
fn fold_char(c: char) -> char {
    match c {
        '{' => '[',
        '}' => ']',
        '+' => '=',
        _ => c.to_ascii_lowercase(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Quit,
    NextTab,
    TogglePlayPause,
    SeekBack,
    SeekForward,
    VolumeUp,
    VolumeDown,
    RateDown,
    RateUp,
    RateReset,
    SetLoopA,
    SetLoopB,
    ToggleLoop,
    ClearLoop,
}

impl Action {
    /// Bindings that work on every tab. Arrow up/down belong to the routes.
    pub fn global(key: Key) -> Option<Action> {
        let action = match key {
            Key::Char('q') | Key::Interrupt => Action::Quit,
            Key::Tab => Action::NextTab,
            Key::Char(' ') => Action::TogglePlayPause,
            Key::Left => Action::SeekBack,
            Key::Right => Action::SeekForward,
            Key::Char('[') => Action::RateDown,
            Key::Char(']') => Action::RateUp,
            Key::Char('=') => Action::RateReset,
            Key::Char('a') => Action::SetLoopA,
            Key::Char('b') => Action::SetLoopB,
            Key::Char('l') => Action::ToggleLoop,
            Key::Char('c') => Action::ClearLoop,
            _ => return None,
        };
        Some(action)
    }

    /// The player command this action sends, if any.
    pub fn command(self, config: &PlayerConfig) -> Option<PlayerCommand> {
        let command = match self {
            Action::Quit | Action::NextTab => return None,
            Action::TogglePlayPause => PlayerCommand::TogglePlayPause,
            Action::SeekBack => PlayerCommand::SeekBy(-config.seek_step),
            Action::SeekForward => PlayerCommand::SeekBy(config.seek_step),
            Action::VolumeUp => PlayerCommand::NudgeVolume(VOLUME_STEP),
            Action::VolumeDown => PlayerCommand::NudgeVolume(-VOLUME_STEP),
            Action::RateDown => PlayerCommand::NudgeRate(-config.rate_step),
            Action::RateUp => PlayerCommand::NudgeRate(config.rate_step),
            Action::RateReset => PlayerCommand::SetRate(config.default_rate),
            Action::SetLoopA => PlayerCommand::SetLoopA(None),
            Action::SetLoopB => PlayerCommand::SetLoopB(None),
            Action::ToggleLoop => PlayerCommand::ToggleLoop,
            Action::ClearLoop => PlayerCommand::ClearLoop,
        };
        Some(command)
    }
}
