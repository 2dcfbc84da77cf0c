//! Pointer-drag scrubbing on a progress control.
//!
//! While a gesture is active the controller keeps ticking but withholds
//! `TimeUpdate`, so the host's progress display follows the pointer instead
//! of fighting with playback. Releasing commits a single seek.

use crate::{backend::MediaBackend, controller::PlaybackController};

/// Horizontal extent of the progress control, in host coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackGeometry {
    pub origin: f64,
    pub width: f64,
}

impl TrackGeometry {
    pub fn new(origin: f64, width: f64) -> Self {
        Self { origin, width }
    }

    /// Fraction of the track under `x`, clamped to `[0, 1]`.
    pub fn fraction_at(&self, x: f64) -> f64 {
        if self.width.is_nan() || self.width <= 0.0 || !x.is_finite() {
            return 0.0;
        }
        ((x - self.origin) / self.width).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrubGesture {
    Begin(f64),
    Update(f64),
    End,
}

/// One press-drag-release gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrubSession {
    pub provisional_time: f64,
    /// Duration was unknown at some point; the gesture will not seek
    pub ignored: bool,
}

#[derive(Debug, Default)]
pub struct ScrubReconciler {
    geometry: TrackGeometry,
    session: Option<ScrubSession>,
}

impl ScrubReconciler {
    pub fn new(geometry: TrackGeometry) -> Self {
        Self {
            geometry,
            session: None,
        }
    }

    pub fn geometry(&self) -> TrackGeometry {
        self.geometry
    }

    pub fn set_geometry(&mut self, geometry: TrackGeometry) {
        self.geometry = geometry;
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<ScrubSession> {
        self.session
    }

    pub fn provisional_time(&self) -> Option<f64> {
        self.session.map(|s| s.provisional_time)
    }

    /// Start a gesture at `pointer_x`. Behaves like [`Self::update`] when one
    /// is already active.
    pub fn begin<B: MediaBackend>(&mut self, controller: &mut PlaybackController<B>, pointer_x: f64) {
        if self.session.is_some() {
            self.update(controller, pointer_x);
            return;
        }
        if controller.is_destroyed() {
            return;
        }

        self.session = Some(ScrubSession {
            provisional_time: 0.0,
            ignored: false,
        });
        controller.suspend_time_updates();
        log::trace!("scrub begin at x={:.1}", pointer_x);
        self.update(controller, pointer_x);
    }

    pub fn update<B: MediaBackend>(&mut self, controller: &mut PlaybackController<B>, pointer_x: f64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match controller.known_duration() {
            Some(duration) => {
                session.provisional_time = self.geometry.fraction_at(pointer_x) * duration;
                if !session.ignored {
                    controller.publish_scrub_preview(session.provisional_time);
                }
            }
            None => session.ignored = true,
        }
    }

    /// Finish the gesture: one seek to the last provisional time, then resume
    /// time updates.
    pub fn end<B: MediaBackend>(&mut self, controller: &mut PlaybackController<B>) {
        let Some(session) = self.session.take() else {
            return;
        };

        controller.resume_time_updates();
        if controller.is_destroyed() {
            return;
        }
        if session.ignored || controller.known_duration().is_none() {
            log::debug!("scrub ignored: duration unknown");
            return;
        }
        if let Err(e) = controller.seek(session.provisional_time) {
            log::warn!("scrub seek failed: {}", e);
        }
    }

    pub fn handle<B: MediaBackend>(&mut self, controller: &mut PlaybackController<B>, gesture: ScrubGesture) {
        match gesture {
            ScrubGesture::Begin(x) => self.begin(controller, x),
            ScrubGesture::Update(x) => self.update(controller, x),
            ScrubGesture::End => self.end(controller),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_is_clamped() {
        let geometry = TrackGeometry::new(10.0, 100.0);
        assert_eq!(geometry.fraction_at(10.0), 0.0);
        assert_eq!(geometry.fraction_at(60.0), 0.5);
        assert_eq!(geometry.fraction_at(-40.0), 0.0);
        assert_eq!(geometry.fraction_at(500.0), 1.0);
    }

    #[test]
    fn zero_width_maps_to_start() {
        let geometry = TrackGeometry::new(0.0, 0.0);
        assert_eq!(geometry.fraction_at(42.0), 0.0);
        assert_eq!(geometry.fraction_at(f64::NAN), 0.0);
    }
}
