use std::time::{Duration, Instant};

use crate::{
    backend::{BackendEvent, MediaBackend, MediaSource, ResourceId},
    error::BackendError,
    metadata::TrackMetadata,
};

/// A silent backend whose clock advances with wall time × rate.
///
/// Every source "loads" as a track of the configured length. Useful on
/// machines without an output device and for driving the controller by hand
/// with [`SimulatedBackend::manual`] and [`SimulatedBackend::advance`].
#[derive(Debug)]
pub struct SimulatedBackend {
    track_length: f64,
    loaded: Option<ResourceId>,
    next_id: u64,
    position: f64,
    rate: f64,
    playing: bool,
    wall_clock: bool,
    last_instant: Option<Instant>,
    events: Vec<BackendEvent>,
}

impl SimulatedBackend {
    /// Clock driven by real elapsed time between polls.
    pub fn new(track_length: f64) -> Self {
        Self {
            track_length: track_length.max(0.0),
            loaded: None,
            next_id: 0,
            position: 0.0,
            rate: 1.0,
            playing: false,
            wall_clock: true,
            last_instant: None,
            events: Vec::new(),
        }
    }

    /// Clock that only moves through [`SimulatedBackend::advance`].
    pub fn manual(track_length: f64) -> Self {
        Self {
            wall_clock: false,
            ..Self::new(track_length)
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Move the media clock forward by `elapsed` wall time, if playing.
    pub fn advance(&mut self, elapsed: Duration) {
        if !self.playing || self.loaded.is_none() {
            return;
        }
        self.position = (self.position + elapsed.as_secs_f64() * self.rate).min(self.track_length);
        self.events.push(BackendEvent::TimeTick(self.position));

        if self.position >= self.track_length {
            self.playing = false;
            self.events.push(BackendEvent::Ended);
        }
    }
}

impl MediaBackend for SimulatedBackend {
    fn load(&mut self, source: &MediaSource) -> Result<ResourceId, BackendError> {
        let id = ResourceId(self.next_id);
        self.next_id += 1;
        self.loaded = Some(id);
        self.position = 0.0;
        self.playing = false;
        self.last_instant = None;

        let metadata = TrackMetadata {
            format: "simulated".to_string(),
            location: source.to_string(),
            duration: self.track_length,
            ..Default::default()
        };
        self.events.push(BackendEvent::MetadataReady {
            duration: self.track_length,
            metadata: Some(metadata),
        });
        Ok(id)
    }

    fn release(&mut self, resource: ResourceId) {
        if self.loaded == Some(resource) {
            self.loaded = None;
            self.playing = false;
        }
    }

    fn play(&mut self) -> Result<(), BackendError> {
        if self.loaded.is_some() {
            self.playing = true;
            self.last_instant = None;
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn seek(&mut self, time: f64) {
        if self.loaded.is_some() {
            self.position = time.clamp(0.0, self.track_length);
            self.events.push(BackendEvent::TimeTick(self.position));
        }
    }

    fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
        self.events.push(BackendEvent::RateChanged(rate));
    }

    fn set_volume(&mut self, volume: f64) {
        self.events.push(BackendEvent::VolumeChanged(volume));
    }

    fn poll_events(&mut self) -> Vec<BackendEvent> {
        if self.wall_clock {
            let now = Instant::now();
            if let Some(last) = self.last_instant {
                self.advance(now.duration_since(last));
            }
            self.last_instant = Some(now);
        }
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_scales_with_rate_and_ends() {
        let mut backend = SimulatedBackend::manual(10.0);
        backend.load(&MediaSource::Url("sim://tone".into())).unwrap();
        backend.set_rate(2.0);
        backend.play().unwrap();
        backend.poll_events();

        backend.advance(Duration::from_secs(2));
        assert_eq!(backend.poll_events(), vec![BackendEvent::TimeTick(4.0)]);

        backend.advance(Duration::from_secs(10));
        assert_eq!(
            backend.poll_events(),
            vec![BackendEvent::TimeTick(10.0), BackendEvent::Ended]
        );
        assert!(!backend.is_playing());
    }

    #[test]
    fn paused_clock_does_not_move() {
        let mut backend = SimulatedBackend::manual(10.0);
        backend.load(&MediaSource::Url("sim://tone".into())).unwrap();
        backend.advance(Duration::from_secs(3));
        assert_eq!(backend.position(), 0.0);
    }
}
