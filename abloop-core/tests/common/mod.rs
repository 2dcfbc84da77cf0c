#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use abloop_core::{
    PlaybackController, PlayerConfig, PlayerEvent,
    backend::{BackendEvent, MediaBackend, MediaSource, ResourceId},
    error::{BackendError, BackendErrorKind},
};
use crossbeam_channel::Receiver;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// What the controller asked the mock to do, plus knobs for its behavior.
#[derive(Debug, Default)]
pub struct Recorder {
    pub duration: f64,
    pub loads: Vec<MediaSource>,
    pub releases: Vec<ResourceId>,
    pub seeks: Vec<f64>,
    pub plays: usize,
    pub pauses: usize,
    pub rates: Vec<f64>,
    pub volumes: Vec<f64>,
    pub fail_load: Option<BackendErrorKind>,
    pub fail_play: bool,
    /// Report metadata from `load` right away
    pub metadata_on_load: bool,
    /// Confirm every seek with a tick
    pub tick_on_seek: bool,
    pub queued: Vec<BackendEvent>,
    next_id: u64,
}

#[derive(Debug, Clone)]
pub struct MockBackend {
    pub recorder: Rc<RefCell<Recorder>>,
}

impl MockBackend {
    pub fn new(duration: f64) -> Self {
        Self {
            recorder: Rc::new(RefCell::new(Recorder {
                duration,
                metadata_on_load: true,
                tick_on_seek: true,
                ..Default::default()
            })),
        }
    }
}

impl MediaBackend for MockBackend {
    fn load(&mut self, source: &MediaSource) -> Result<ResourceId, BackendError> {
        let mut rec = self.recorder.borrow_mut();
        rec.loads.push(source.clone());
        if let Some(kind) = rec.fail_load {
            return Err(BackendError::new(kind, "mock load failure"));
        }
        let id = ResourceId(rec.next_id);
        rec.next_id += 1;
        if rec.metadata_on_load {
            let duration = rec.duration;
            rec.queued.push(BackendEvent::MetadataReady {
                duration,
                metadata: None,
            });
        }
        Ok(id)
    }

    fn release(&mut self, resource: ResourceId) {
        self.recorder.borrow_mut().releases.push(resource);
    }

    fn play(&mut self) -> Result<(), BackendError> {
        let mut rec = self.recorder.borrow_mut();
        if rec.fail_play {
            return Err(BackendError::new(BackendErrorKind::Device, "mock play failure"));
        }
        rec.plays += 1;
        Ok(())
    }

    fn pause(&mut self) {
        self.recorder.borrow_mut().pauses += 1;
    }

    fn seek(&mut self, time: f64) {
        let mut rec = self.recorder.borrow_mut();
        rec.seeks.push(time);
        if rec.tick_on_seek {
            rec.queued.push(BackendEvent::TimeTick(time));
        }
    }

    fn set_rate(&mut self, rate: f64) {
        self.recorder.borrow_mut().rates.push(rate);
    }

    fn set_volume(&mut self, volume: f64) {
        self.recorder.borrow_mut().volumes.push(volume);
    }

    fn poll_events(&mut self) -> Vec<BackendEvent> {
        std::mem::take(&mut self.recorder.borrow_mut().queued)
    }
}

pub type Controller = PlaybackController<MockBackend>;

pub fn controller(duration: f64) -> (Controller, Rc<RefCell<Recorder>>) {
    init_logging();
    let backend = MockBackend::new(duration);
    let recorder = Rc::clone(&backend.recorder);
    (PlaybackController::new(backend, PlayerConfig::default()), recorder)
}

/// A controller with a track of `duration` seconds already loaded.
pub fn loaded(duration: f64) -> (Controller, Rc<RefCell<Recorder>>) {
    let (mut controller, recorder) = controller(duration);
    controller
        .load(MediaSource::file("track.mp3"))
        .expect("mock load succeeds");
    (controller, recorder)
}

pub fn drain(rx: &Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
    rx.try_iter().collect()
}

pub fn tick(controller: &mut Controller, time: f64) {
    controller.handle_backend_event(BackendEvent::TimeTick(time));
}

pub fn count(events: &[PlayerEvent], wanted: &PlayerEvent) -> usize {
    events.iter().filter(|e| *e == wanted).count()
}

pub fn has_time_update(events: &[PlayerEvent]) -> bool {
    events.iter().any(|e| matches!(e, PlayerEvent::TimeUpdate(_)))
}
