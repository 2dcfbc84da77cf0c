//! The media capability the controller drives.
//!
//! A backend decodes and renders audio; the controller only tells it what to
//! do and listens to what it reports. Backends queue their notifications and
//! hand them over from [`MediaBackend::poll_events`], so the controller always
//! processes them on its own thread.

use std::{
    fmt::Display,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{error::BackendError, metadata::TrackMetadata};

pub mod rodio_sink;
pub mod simulated;

pub use rodio_sink::RodioBackend;
pub use simulated::SimulatedBackend;

/// Something a backend can load
#[derive(Debug, Clone, PartialEq)]
pub enum MediaSource {
    File(PathBuf),
    Url(String),
    /// Encoded audio held in memory, e.g. from a drag-and-drop
    Memory { name: String, bytes: Arc<[u8]> },
}

impl MediaSource {
    pub fn file(path: impl AsRef<Path>) -> Self {
        MediaSource::File(path.as_ref().to_path_buf())
    }
}

impl Display for MediaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaSource::File(path) => write!(f, "{}", path.display()),
            MediaSource::Url(url) => write!(f, "{}", url),
            MediaSource::Memory { name, bytes } => write!(f, "{} ({} bytes)", name, bytes.len()),
        }
    }
}

/// Handle for whatever a backend allocated for a loaded source.
/// The controller releases it when the source is replaced or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(pub u64);

/// Notifications from the backend
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    MetadataReady {
        duration: f64,
        metadata: Option<TrackMetadata>,
    },
    TimeTick(f64),
    RateChanged(f64),
    VolumeChanged(f64),
    Ended,
    Error(BackendError),
}

pub trait MediaBackend {
    /// Start loading `source`. Metadata arrives later as
    /// [`BackendEvent::MetadataReady`], possibly already queued when this returns.
    fn load(&mut self, source: &MediaSource) -> Result<ResourceId, BackendError>;

    /// Free everything held for `resource`. Unknown ids are ignored.
    fn release(&mut self, resource: ResourceId);

    fn play(&mut self) -> Result<(), BackendError>;

    fn pause(&mut self);

    /// Jump to `time` seconds. The new position is reported by a later tick.
    fn seek(&mut self, time: f64);

    fn set_rate(&mut self, rate: f64);

    fn set_volume(&mut self, volume: f64);

    fn set_preserve_pitch(&mut self, _preserve: bool) {}

    /// Drain queued notifications.
    fn poll_events(&mut self) -> Vec<BackendEvent>;
}

impl<B: MediaBackend + ?Sized> MediaBackend for Box<B> {
    fn load(&mut self, source: &MediaSource) -> Result<ResourceId, BackendError> {
        (**self).load(source)
    }

    fn release(&mut self, resource: ResourceId) {
        (**self).release(resource)
    }

    fn play(&mut self) -> Result<(), BackendError> {
        (**self).play()
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn seek(&mut self, time: f64) {
        (**self).seek(time)
    }

    fn set_rate(&mut self, rate: f64) {
        (**self).set_rate(rate)
    }

    fn set_volume(&mut self, volume: f64) {
        (**self).set_volume(volume)
    }

    fn set_preserve_pitch(&mut self, preserve: bool) {
        (**self).set_preserve_pitch(preserve)
    }

    fn poll_events(&mut self) -> Vec<BackendEvent> {
        (**self).poll_events()
    }
}
