use abloop_core::{PlayerConfig, PlayerEvent, TransportState, metadata::TrackMetadata};
use strum::{Display, EnumIter, IntoEnumIterator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumIter)]
pub enum ActiveTab {
    #[default]
    Playback,
    Log,
}

impl ActiveTab {
    pub fn next(self) -> Self {
        let tabs: Vec<ActiveTab> = ActiveTab::iter().collect();
        let idx = tabs.iter().position(|t| *t == self).unwrap_or(0);
        tabs[(idx + 1) % tabs.len()]
    }
}

/// Application state for the TUI, mirrored from engine events
#[derive(Debug)]
pub struct AppState {
    // ==============================
    // Playback State
    // ==============================
    pub transport: TransportState,
    /// Last position reported by the engine, in seconds
    pub position: f64,
    pub duration: Option<f64>,
    pub rate: f64,
    pub volume: f64,
    pub metadata: Option<TrackMetadata>,

    // ==============================
    // Loop State
    // ==============================
    pub loop_a: Option<f64>,
    pub loop_b: Option<f64>,
    pub is_looping: bool,
    pub loop_count: u64,

    // ==============================
    // Scrub State
    // ==============================
    /// Mouse button is held on the progress gauge
    pub scrubbing: bool,
    /// Position under the pointer; shown instead of `position` until the
    /// engine reports a real position again
    pub scrub_preview: Option<f64>,

    pub active_tab: ActiveTab,
    pub status_message: String,
    pub error_message: Option<String>,
    /// Settings the engine was started with; key bindings read their steps here
    pub config: PlayerConfig,
}

impl AppState {
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            transport: TransportState::Idle,
            position: 0.0,
            duration: None,
            rate: config.default_rate,
            volume: config.default_volume,
            metadata: None,
            loop_a: None,
            loop_b: None,
            is_looping: false,
            loop_count: 0,
            scrubbing: false,
            scrub_preview: None,
            active_tab: ActiveTab::default(),
            status_message: "No audio loaded. Pass a file path as argument.".to_string(),
            error_message: None,
            config,
        }
    }

    /// Handle an event forwarded by the playback engine
    pub fn handle_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::LoadStart => {
                self.transport = TransportState::Loading;
                self.error_message = None;
                self.position = 0.0;
                self.duration = None;
                self.metadata = None;
                self.scrub_preview = None;
                self.status_message = "Loading...".to_string();
            }
            PlayerEvent::Loaded { duration, metadata } => {
                self.transport = TransportState::Ready;
                self.duration = Some(duration);
                self.status_message = match &metadata {
                    Some(m) => format!("Loaded: {}", m.display_title()),
                    None => "Loaded".to_string(),
                };
                self.metadata = metadata;
            }
            PlayerEvent::Error(kind) => {
                if matches!(kind, abloop_core::ErrorKind::Load(_)) {
                    self.transport = TransportState::Idle;
                } else if self.transport == TransportState::Playing {
                    self.transport = TransportState::Paused;
                }
                self.error_message = Some(kind.to_string());
                self.status_message = format!("Error: {}", kind);
            }
            PlayerEvent::Play => {
                self.transport = TransportState::Playing;
                self.error_message = None;
                self.status_message = "Playing".to_string();
            }
            PlayerEvent::Pause => {
                self.transport = TransportState::Paused;
                self.status_message = "Paused".to_string();
            }
            PlayerEvent::Ended => {
                self.transport = TransportState::Ended;
                self.status_message = "Ended".to_string();
            }
            PlayerEvent::TimeUpdate(time) => {
                self.position = time;
                if !self.scrubbing {
                    self.scrub_preview = None;
                }
            }
            PlayerEvent::DurationChange(duration) => self.duration = Some(duration),
            PlayerEvent::RateChange(rate) => self.rate = rate,
            PlayerEvent::VolumeChange(volume) => self.volume = volume,
            PlayerEvent::LoopASet(a) => self.loop_a = Some(a),
            PlayerEvent::LoopBSet(b) => self.loop_b = Some(b),
            PlayerEvent::LoopToggle(on) => {
                self.is_looping = on;
                self.status_message = if on { "Loop on" } else { "Loop off" }.to_string();
            }
            PlayerEvent::LoopClear => {
                self.loop_a = None;
                self.loop_b = None;
                self.is_looping = false;
            }
            PlayerEvent::Looped => self.loop_count += 1,
            PlayerEvent::ScrubPreview(time) => self.scrub_preview = Some(time),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    /// Position to draw: the scrub preview while one is pending.
    pub fn display_position(&self) -> f64 {
        self.scrub_preview.unwrap_or(self.position)
    }

    /// Get the progress fraction (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        match self.duration {
            Some(d) if d > 0.0 => (self.display_position() / d).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    /// Format time as MM:SS
    pub fn format_time(seconds: f64) -> String {
        let seconds = seconds.max(0.0);
        let mins = (seconds / 60.0).floor() as u32;
        let secs = (seconds % 60.0).floor() as u32;
        format!("{:02}:{:02}", mins, secs)
    }

    pub fn loop_label(&self) -> String {
        let bound = |t: Option<f64>| t.map(Self::format_time).unwrap_or_else(|| "--:--".to_string());
        format!(
            "A {}  B {}  [{}]",
            bound(self.loop_a),
            bound(self.loop_b),
            if self.is_looping { "on" } else { "off" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrub_preview_wins_until_next_position() {
        let mut state = AppState::new(PlayerConfig::default());
        state.handle_event(PlayerEvent::Loaded {
            duration: 100.0,
            metadata: None,
        });
        state.handle_event(PlayerEvent::TimeUpdate(10.0));

        state.scrubbing = true;
        state.handle_event(PlayerEvent::ScrubPreview(50.0));
        assert_eq!(state.display_position(), 50.0);
        assert_eq!(state.progress(), 0.5);

        state.scrubbing = false;
        assert_eq!(state.display_position(), 50.0);
        state.handle_event(PlayerEvent::TimeUpdate(50.2));
        assert_eq!(state.display_position(), 50.2);
    }

    #[test]
    fn loop_events_are_mirrored() {
        let mut state = AppState::new(PlayerConfig::default());
        state.handle_event(PlayerEvent::LoopASet(10.0));
        state.handle_event(PlayerEvent::LoopBSet(75.0));
        state.handle_event(PlayerEvent::LoopToggle(true));
        state.handle_event(PlayerEvent::Looped);
        assert_eq!(state.loop_label(), "A 00:10  B 01:15  [on]");
        assert_eq!(state.loop_count, 1);

        state.handle_event(PlayerEvent::LoopClear);
        assert_eq!(state.loop_a, None);
        assert!(!state.is_looping);
    }

    #[test]
    fn format_time_handles_minutes() {
        assert_eq!(AppState::format_time(0.0), "00:00");
        assert_eq!(AppState::format_time(125.9), "02:05");
        assert_eq!(AppState::format_time(-3.0), "00:00");
    }

    #[test]
    fn tabs_cycle() {
        assert_eq!(ActiveTab::Playback.next(), ActiveTab::Log);
        assert_eq!(ActiveTab::Log.next(), ActiveTab::Playback);
    }
}
