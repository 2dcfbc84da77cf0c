use crate::metadata::TrackMetadata;

/// Transport state of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display)]
pub enum TransportState {
    /// Nothing loaded, or the last load failed
    #[default]
    Idle,
    /// Waiting for the backend to report metadata
    Loading,
    /// Loaded, never started
    Ready,
    Playing,
    Paused,
    /// Reached the end; seekable and replayable like `Paused`
    Ended,
}

impl TransportState {
    #[inline]
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }
}

/// Snapshot of everything the controller owns.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub transport: TransportState,
    pub is_playing: bool,
    /// Position in seconds as last reported by the backend
    pub current_time: f64,
    /// `None` until metadata is available
    pub duration: Option<f64>,
    pub playback_rate: f64,
    pub volume: f64,
    pub loop_a: Option<f64>,
    pub loop_b: Option<f64>,
    pub is_looping: bool,
    pub has_source: bool,
    pub metadata: Option<TrackMetadata>,
    /// `TimeUpdate` fan-out is held by an active scrub gesture
    pub time_updates_suspended: bool,
}

impl PlaybackState {
    pub fn new(rate: f64, volume: f64) -> Self {
        Self {
            transport: TransportState::Idle,
            is_playing: false,
            current_time: 0.0,
            duration: None,
            playback_rate: rate,
            volume,
            loop_a: None,
            loop_b: None,
            is_looping: false,
            has_source: false,
            metadata: None,
            time_updates_suspended: false,
        }
    }

    /// Duration if it is known and non-zero.
    pub fn known_duration(&self) -> Option<f64> {
        self.duration.filter(|d| *d > 0.0 && d.is_finite())
    }

    /// Clamp a time into `[0, duration]`, or `[0, ∞)` while the duration is unknown.
    pub fn clamp_time(&self, time: f64) -> f64 {
        let time = if time.is_nan() { 0.0 } else { time.max(0.0) };
        match self.duration {
            Some(d) if d.is_finite() => time.min(d.max(0.0)),
            _ => time,
        }
    }

    /// Both loop bounds, if set.
    pub fn loop_region(&self) -> Option<(f64, f64)> {
        self.loop_a.zip(self.loop_b)
    }

    pub(crate) fn set_transport(&mut self, transport: TransportState) {
        self.transport = transport;
        self.is_playing = transport.is_playing();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_time_respects_known_duration() {
        let mut state = PlaybackState::new(1.0, 1.0);
        assert_eq!(state.clamp_time(-5.0), 0.0);
        assert_eq!(state.clamp_time(1000.0), 1000.0);

        state.duration = Some(120.0);
        assert_eq!(state.clamp_time(-5.0), 0.0);
        assert_eq!(state.clamp_time(1000.0), 120.0);
        assert_eq!(state.clamp_time(f64::NAN), 0.0);
    }

    #[test]
    fn known_duration_ignores_zero() {
        let mut state = PlaybackState::new(1.0, 1.0);
        state.duration = Some(0.0);
        assert_eq!(state.known_duration(), None);
    }

    #[test]
    fn only_playing_counts_as_playing() {
        assert!(TransportState::Playing.is_playing());
        assert!(!TransportState::Ended.is_playing());
        assert!(!TransportState::Paused.is_playing());
    }
}
