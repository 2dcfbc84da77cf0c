use std::{
    fs::File,
    io::{self, Cursor, Read, Seek},
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Instant,
};

use anyhow::Context;
use rodio::{
    Decoder, DeviceTrait, OutputStream, OutputStreamBuilder, Sink, Source,
    cpal::{self, traits::HostTrait},
};

use crate::{
    backend::{BackendEvent, MediaBackend, MediaSource, ResourceId},
    error::{BackendError, BackendErrorKind},
    metadata::{ChannelLayout, TrackMetadata},
};

/// Shared position tracker between the playing source and the backend
#[derive(Clone, Debug)]
pub struct PositionTracker {
    /// Current sample position (atomic for thread-safe access)
    position: Arc<AtomicUsize>,
    total_samples: usize,
    sample_rate: u32,
    channels: u16,
}

impl PositionTracker {
    pub fn new(total_samples: usize, sample_rate: u32, channels: u16) -> Self {
        Self {
            position: Arc::new(AtomicUsize::new(0)),
            total_samples,
            sample_rate,
            channels,
        }
    }

    /// Get current position in seconds
    pub fn position_seconds(&self) -> f64 {
        let pos = self.position.load(Ordering::Relaxed).min(self.total_samples);
        let frames = pos / (self.channels as usize);
        (frames as f64) / (self.sample_rate as f64)
    }

    pub fn duration_seconds(&self) -> f64 {
        let frames = self.total_samples / (self.channels as usize);
        (frames as f64) / (self.sample_rate as f64)
    }

    /// Set position from seconds, snapped to a frame boundary
    pub fn seek_to_seconds(&self, seconds: f64) {
        let frames = (seconds.max(0.0) * (self.sample_rate as f64)) as usize;
        let sample_pos = (frames * (self.channels as usize)).min(self.total_samples);
        self.position.store(sample_pos, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.position.load(Ordering::Relaxed) >= self.total_samples
    }
}

/// A fully decoded track
struct DecodedTrack {
    id: ResourceId,
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
    channels: u16,
    tracker: PositionTracker,
}

impl DecodedTrack {
    /// Create a rodio Source reading from the shared buffer
    fn create_source(&self) -> BufferedSource {
        BufferedSource {
            samples: Arc::clone(&self.samples),
            sample_rate: self.sample_rate,
            channels: self.channels,
            position_tracker: self.tracker.clone(),
        }
    }
}

/// A buffered audio source that implements rodio's Source trait.
/// Seeking is done by moving the shared position, so no re-decode is needed.
pub struct BufferedSource {
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
    channels: u16,
    position_tracker: PositionTracker,
}

impl Iterator for BufferedSource {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let pos = self.position_tracker.position.fetch_add(1, Ordering::Relaxed);
        if pos < self.samples.len() {
            Some(self.samples[pos])
        } else {
            self.position_tracker
                .position
                .store(self.samples.len(), Ordering::Relaxed);
            None
        }
    }
}

impl Source for BufferedSource {
    fn current_span_len(&self) -> Option<usize> {
        let pos = self.position_tracker.position.load(Ordering::Relaxed);
        Some(self.samples.len().saturating_sub(pos))
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<std::time::Duration> {
        let frames = self.samples.len() / (self.channels as usize);
        Some(std::time::Duration::from_secs_f64(
            (frames as f64) / (self.sample_rate as f64),
        ))
    }
}

/// Backend playing through the default output device with rodio.
///
/// Tracks are decoded fully on load. Rodio's speed control resamples, so a
/// rate change also shifts pitch.
pub struct RodioBackend {
    _stream: OutputStream,
    sink: Sink,
    device_name: String,
    track: Option<DecodedTrack>,
    next_id: u64,
    playing: bool,
    ended: bool,
    last_tick: Option<f64>,
    warned_pitch: bool,
    events: Vec<BackendEvent>,
}

impl RodioBackend {
    pub fn try_new_default() -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("No default output device found")?;

        let device_name = device.name().unwrap_or_else(|_| "(unknown)".to_string());

        let stream_builder = OutputStreamBuilder::from_device(device)
            .context("cannot create output stream builder from device")?;

        let stream = stream_builder
            .open_stream()
            .context("Cannot create stream output")?;

        let sink = Sink::connect_new(stream.mixer());
        sink.pause();

        log::info!("Audio output opened on '{}'", device_name);

        Ok(RodioBackend {
            _stream: stream,
            sink,
            device_name,
            track: None,
            next_id: 0,
            playing: false,
            ended: false,
            last_tick: None,
            warned_pitch: false,
            events: Vec::new(),
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    fn decode<R>(decoder: Decoder<R>) -> Result<(Vec<f32>, u32, u16), BackendError>
    where
        R: Read + Seek + Send + Sync + 'static,
    {
        let sample_rate = decoder.sample_rate();
        let channels = decoder.channels();
        if sample_rate == 0 || channels == 0 {
            return Err(BackendError::new(
                BackendErrorKind::Decode,
                "stream reports no channels or sample rate",
            ));
        }

        log::debug!("Starting full decode with rodio.");
        let samples: Vec<f32> = decoder.collect();
        log::debug!("Finished decoding {} samples.", samples.len());

        Ok((samples, sample_rate, channels))
    }

    /// Put a fresh source on the sink, keeping the current play/pause state.
    fn requeue(&mut self) {
        if let Some(track) = &self.track {
            self.sink.append(track.create_source());
            if !self.playing {
                self.sink.pause();
            }
        }
    }
}

fn open_error(path: &Path, err: io::Error) -> BackendError {
    let kind = match err.kind() {
        io::ErrorKind::PermissionDenied => BackendErrorKind::Denied,
        _ => BackendErrorKind::Other,
    };
    BackendError::new(kind, format!("cannot open {}: {}", path.display(), err))
}

fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_string()
}

impl MediaBackend for RodioBackend {
    fn load(&mut self, source: &MediaSource) -> Result<ResourceId, BackendError> {
        // calculate time required for performance monitoring
        let start_time = Instant::now();

        let (samples, sample_rate, channels, mut metadata) = match source {
            MediaSource::File(path) => {
                let file = File::open(path).map_err(|e| open_error(path, e))?;
                let decoder = Decoder::try_from(file).map_err(|e| {
                    BackendError::new(BackendErrorKind::UnsupportedFormat, e.to_string())
                })?;
                let (samples, rate, channels) = Self::decode(decoder)?;

                let location = path.display().to_string();
                let mut metadata = TrackMetadata {
                    format: extension_of(&location),
                    location,
                    ..Default::default()
                };
                metadata.read_tags(path);
                (samples, rate, channels, metadata)
            }
            MediaSource::Memory { name, bytes } => {
                let decoder = Decoder::new(Cursor::new(Arc::clone(bytes))).map_err(|e| {
                    BackendError::new(BackendErrorKind::UnsupportedFormat, e.to_string())
                })?;
                let (samples, rate, channels) = Self::decode(decoder)?;
                let metadata = TrackMetadata {
                    format: extension_of(name),
                    location: name.clone(),
                    ..Default::default()
                };
                (samples, rate, channels, metadata)
            }
            MediaSource::Url(url) => {
                return Err(BackendError::new(
                    BackendErrorKind::UnsupportedFormat,
                    format!("streaming sources are not supported: {}", url),
                ));
            }
        };

        let id = ResourceId(self.next_id);
        self.next_id += 1;

        let tracker = PositionTracker::new(samples.len(), sample_rate, channels);
        metadata.sample_rate = sample_rate;
        metadata.num_channels = channels;
        metadata.channel_layout = ChannelLayout::from_channels(channels);
        metadata.duration = tracker.duration_seconds();

        self.sink.clear();
        self.playing = false;
        self.ended = false;
        self.last_tick = None;
        self.track = Some(DecodedTrack {
            id,
            samples: Arc::new(samples),
            sample_rate,
            channels,
            tracker,
        });
        self.requeue();

        self.events.push(BackendEvent::MetadataReady {
            duration: metadata.duration,
            metadata: Some(metadata),
        });

        log::debug!("Load audio finished in {:?}", start_time.elapsed());
        Ok(id)
    }

    fn release(&mut self, resource: ResourceId) {
        if self.track.as_ref().is_some_and(|t| t.id == resource) {
            self.sink.clear();
            self.track = None;
            self.playing = false;
            self.last_tick = None;
            log::debug!("Released track {:?}", resource);
        }
    }

    fn play(&mut self) -> Result<(), BackendError> {
        if self.track.is_none() {
            return Err(BackendError::new(BackendErrorKind::Other, "nothing loaded"));
        }
        self.playing = true;
        self.ended = false;
        if self.sink.empty() {
            self.requeue();
        }
        self.sink.play();
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
        self.sink.pause();
    }

    fn seek(&mut self, time: f64) {
        let Some(track) = &self.track else {
            return;
        };
        track.tracker.seek_to_seconds(time);
        self.ended = false;
        // report the new position on the next poll even if it did not move
        self.last_tick = None;
        if self.sink.empty() {
            self.requeue();
        }
    }

    fn set_rate(&mut self, rate: f64) {
        self.sink.set_speed(rate as f32);
        self.events.push(BackendEvent::RateChanged(rate));
    }

    fn set_volume(&mut self, volume: f64) {
        self.sink.set_volume(volume as f32);
        self.events.push(BackendEvent::VolumeChanged(volume));
    }

    fn set_preserve_pitch(&mut self, preserve: bool) {
        if preserve && !self.warned_pitch {
            log::warn!("rodio output shifts pitch with playback speed; pitch preservation is unavailable");
            self.warned_pitch = true;
        }
    }

    fn poll_events(&mut self) -> Vec<BackendEvent> {
        if let Some(track) = &self.track {
            let pos = track.tracker.position_seconds();
            if self.last_tick.is_none_or(|last| (last - pos).abs() > f64::EPSILON) {
                self.events.push(BackendEvent::TimeTick(pos));
                self.last_tick = Some(pos);
            }

            if self.playing && !self.ended && (self.sink.empty() || track.tracker.is_finished()) {
                self.playing = false;
                self.ended = true;
                self.events.push(BackendEvent::Ended);
            }
        }

        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_converts_between_samples_and_seconds() {
        // 2 seconds of stereo at 1 kHz
        let tracker = PositionTracker::new(4000, 1000, 2);
        assert_eq!(tracker.duration_seconds(), 2.0);

        tracker.seek_to_seconds(0.5);
        assert_eq!(tracker.position_seconds(), 0.5);

        tracker.seek_to_seconds(10.0);
        assert_eq!(tracker.position_seconds(), 2.0);
        assert!(tracker.is_finished());
    }

    #[test]
    fn buffered_source_follows_seeks() {
        let samples: Vec<f32> = (0..8).map(|i| i as f32).collect();
        let tracker = PositionTracker::new(samples.len(), 2, 2);
        let mut source = BufferedSource {
            samples: Arc::new(samples),
            sample_rate: 2,
            channels: 2,
            position_tracker: tracker.clone(),
        };

        assert_eq!(source.next(), Some(0.0));
        tracker.seek_to_seconds(1.0);
        assert_eq!(source.next(), Some(4.0));
        assert_eq!(source.by_ref().count(), 3);
        assert!(tracker.is_finished());
        assert_eq!(source.next(), None);
    }
}
