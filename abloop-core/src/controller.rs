//! Playback timeline controller.
//!
//! Owns the transport state, the A-B loop configuration and the loop check
//! schedule. All mutation happens on the caller's thread, in reaction to
//! commands or to backend notifications drained by [`PlaybackController::poll`].
//! Events are queued while state changes and delivered once the change is
//! complete, so listeners always observe a consistent snapshot.

use std::{
    collections::VecDeque,
    time::Instant,
};

use crossbeam_channel::{Receiver, Sender};

use crate::{
    backend::{BackendEvent, MediaBackend, MediaSource, ResourceId},
    commands::PlayerCommand,
    config::{PlayerConfig, clamp_or},
    error::{BackendError, ErrorKind, LoadErrorKind, PlayerError},
    events::{Deferred, EventBus, ListenerId, PlayerEvent},
    metadata::TrackMetadata,
    schedule::RepeatingSchedule,
    state::{PlaybackState, TransportState},
};

/// Upper bound on listener-queued commands run by a single flush.
const MAX_DEFERRED_PER_FLUSH: usize = 1024;

const EPSILON: f64 = 1e-9;

pub struct PlaybackController<B: MediaBackend> {
    backend: B,
    config: PlayerConfig,
    state: PlaybackState,
    resource: Option<ResourceId>,

    loop_check: RepeatingSchedule,
    /// Tick count at the last loop seek; checks wait until a newer tick arrives
    loop_guard: Option<u64>,
    tick_seq: u64,
    /// Seek target not yet confirmed by a tick
    pending_seek: Option<f64>,
    last_load_error: Option<LoadErrorKind>,
    clock: Instant,

    bus: EventBus,
    outbox: VecDeque<PlayerEvent>,
    deferred: VecDeque<PlayerCommand>,
    flushing: bool,
    destroyed: bool,
}

impl<B: MediaBackend> PlaybackController<B> {
    pub fn new(backend: B, config: PlayerConfig) -> Self {
        let config = config.validated();
        let state = PlaybackState::new(config.default_rate, config.default_volume);
        Self {
            backend,
            loop_check: RepeatingSchedule::new(config.loop_check_interval()),
            config,
            state,
            resource: None,
            loop_guard: None,
            tick_seq: 0,
            pending_seek: None,
            last_load_error: None,
            clock: Instant::now(),
            bus: EventBus::new(),
            outbox: VecDeque::new(),
            deferred: VecDeque::new(),
            flushing: false,
            destroyed: false,
        }
    }

    // ==============================================
    // Accessors
    // ==============================================

    /// Immutable snapshot of the playback state.
    pub fn state(&self) -> PlaybackState {
        self.state.clone()
    }

    pub fn transport(&self) -> TransportState {
        self.state.transport
    }

    pub fn current_time(&self) -> f64 {
        self.state.current_time
    }

    /// Duration if known and non-zero.
    pub fn known_duration(&self) -> Option<f64> {
        self.state.known_duration()
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Whether the loop check is currently scheduled.
    pub fn is_enforcing_loop(&self) -> bool {
        self.loop_check.is_active()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    // ==============================================
    // Subscriptions
    // ==============================================

    /// Register a callback. It may queue commands through the [`Deferred`]
    /// sink; they run after the current fan-out.
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&PlayerEvent, &mut Deferred) -> anyhow::Result<()> + 'static,
    {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.bus.unsubscribe(id)
    }

    pub fn subscribe_channel(&mut self) -> Receiver<PlayerEvent> {
        self.bus.subscribe_channel()
    }

    pub fn forward_to(&mut self, sender: Sender<PlayerEvent>) {
        self.bus.add_sender(sender);
    }

    // ==============================================
    // Commands
    // ==============================================

    /// Run a command from the message surface.
    pub fn dispatch(&mut self, command: PlayerCommand) -> Result<(), PlayerError> {
        match command {
            PlayerCommand::Load(source) => self.load(source),
            PlayerCommand::Play => self.play(),
            PlayerCommand::Pause => self.pause(),
            PlayerCommand::TogglePlayPause => {
                if self.state.is_playing {
                    self.pause()
                } else {
                    self.play()
                }
            }
            PlayerCommand::Seek(time) => self.seek(time).map(|_| ()),
            PlayerCommand::SeekBy(offset) => self.seek_by(offset).map(|_| ()),
            PlayerCommand::SetRate(rate) => self.set_playback_rate(rate).map(|_| ()),
            PlayerCommand::NudgeRate(delta) => {
                let rate = self.state.playback_rate + delta;
                self.set_playback_rate(rate).map(|_| ())
            }
            PlayerCommand::SetVolume(volume) => self.set_volume(volume).map(|_| ()),
            PlayerCommand::NudgeVolume(delta) => {
                let volume = self.state.volume + delta;
                self.set_volume(volume).map(|_| ())
            }
            PlayerCommand::SetLoopA(time) => self.set_loop_a(time),
            PlayerCommand::SetLoopB(time) => self.set_loop_b(time),
            PlayerCommand::ToggleLoop => self.toggle_loop().map(|_| ()),
            PlayerCommand::ClearLoop => self.clear_loop(),
            PlayerCommand::Destroy => {
                self.destroy();
                Ok(())
            }
        }
    }

    /// Replace the current source.
    ///
    /// Returns once the backend accepted the source. Synchronous backends have
    /// already reported metadata by then and the transport is `Ready`;
    /// otherwise `Loaded` is emitted when metadata arrives. Loop points are
    /// cleared only when the load succeeds.
    pub fn load(&mut self, source: MediaSource) -> Result<(), PlayerError> {
        self.ensure_alive()?;
        log::info!("Loading {}", source);

        self.stop_loop_enforcement();
        self.release_resource();
        self.reset_for_load();
        self.last_load_error = None;
        self.state.set_transport(TransportState::Loading);
        self.emit(PlayerEvent::LoadStart);

        let result = match self.backend.load(&source) {
            Ok(resource) => {
                self.resource = Some(resource);
                self.apply_output_settings();
                self.drain_backend();
                match self.last_load_error.take() {
                    Some(kind) => Err(PlayerError::Load(kind)),
                    None => Ok(()),
                }
            }
            Err(err) => {
                let kind = err.kind.as_load_error();
                self.fail_load(kind, &err);
                self.last_load_error = None;
                Err(PlayerError::Load(kind))
            }
        };

        self.flush();
        result
    }

    /// Start or resume playback. From `Ended` playback restarts at 0.
    pub fn play(&mut self) -> Result<(), PlayerError> {
        self.ensure_alive()?;
        let result = self.play_inner();
        self.flush();
        result
    }

    fn play_inner(&mut self) -> Result<(), PlayerError> {
        if !self.state.has_source {
            return self.fail(PlayerError::NoSource);
        }
        if self.state.is_playing {
            return Ok(());
        }

        let at_end = self
            .state
            .known_duration()
            .is_some_and(|d| self.position_hint() >= d - EPSILON);
        if self.state.transport == TransportState::Ended || at_end {
            self.backend.seek(0.0);
            self.pending_seek = Some(0.0);
        }

        if let Err(err) = self.backend.play() {
            log::error!("Backend refused to play: {}", err);
            return self.fail(PlayerError::Capability(err.to_string()));
        }

        self.state.set_transport(TransportState::Playing);
        self.emit(PlayerEvent::Play);
        if self.state.is_looping {
            self.start_loop_enforcement();
        }
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), PlayerError> {
        self.ensure_alive()?;
        let result = self.pause_inner();
        self.flush();
        result
    }

    fn pause_inner(&mut self) -> Result<(), PlayerError> {
        if !self.state.has_source {
            return self.fail(PlayerError::NoSource);
        }
        self.stop_loop_enforcement();
        if self.state.is_playing {
            self.backend.pause();
            self.state.set_transport(TransportState::Paused);
            self.emit(PlayerEvent::Pause);
        }
        Ok(())
    }

    /// Jump to `time`, clamped to `[0, duration]`. Returns the clamped target.
    ///
    /// `current_time` follows when the backend reports the new position.
    pub fn seek(&mut self, time: f64) -> Result<f64, PlayerError> {
        self.ensure_alive()?;
        let result = self.seek_inner(time);
        self.flush();
        result
    }

    fn seek_inner(&mut self, time: f64) -> Result<f64, PlayerError> {
        if !self.state.has_source {
            return self.fail(PlayerError::NoSource);
        }
        let target = self.state.clamp_time(time);
        self.backend.seek(target);
        self.pending_seek = Some(target);
        if self.state.transport == TransportState::Ended {
            self.state.set_transport(TransportState::Paused);
        }
        log::trace!("seek {:.3} -> {:.3}", time, target);
        Ok(target)
    }

    /// Seek relative to the latest known position, including an unconfirmed seek.
    pub fn seek_by(&mut self, offset: f64) -> Result<f64, PlayerError> {
        let base = self.position_hint();
        self.seek(base + offset)
    }

    /// Set the playback rate, clamped to the configured range. Returns the stored rate.
    pub fn set_playback_rate(&mut self, rate: f64) -> Result<f64, PlayerError> {
        self.ensure_alive()?;
        let rate = self.config.clamp_rate(rate);
        self.backend.set_rate(rate);
        self.state.playback_rate = rate;
        self.emit(PlayerEvent::RateChange(rate));
        self.flush();
        Ok(rate)
    }

    /// Set the volume, clamped to `[0, 1]`. Returns the stored volume.
    pub fn set_volume(&mut self, volume: f64) -> Result<f64, PlayerError> {
        self.ensure_alive()?;
        let volume = clamp_or(volume, 0.0, 1.0, self.state.volume);
        self.backend.set_volume(volume);
        self.state.volume = volume;
        self.emit(PlayerEvent::VolumeChange(volume));
        self.flush();
        Ok(volume)
    }

    /// Set loop start (`None` = current position). Swaps with B if it would pass it.
    pub fn set_loop_a(&mut self, time: Option<f64>) -> Result<(), PlayerError> {
        self.ensure_alive()?;
        let result = self.set_loop_bound(LoopBound::A, time);
        self.flush();
        result
    }

    /// Set loop end (`None` = current position). Swaps with A if it would precede it.
    pub fn set_loop_b(&mut self, time: Option<f64>) -> Result<(), PlayerError> {
        self.ensure_alive()?;
        let result = self.set_loop_bound(LoopBound::B, time);
        self.flush();
        result
    }

    fn set_loop_bound(&mut self, bound: LoopBound, time: Option<f64>) -> Result<(), PlayerError> {
        if !self.state.has_source {
            return self.fail(PlayerError::NoSource);
        }
        let t = self
            .state
            .clamp_time(time.unwrap_or(self.state.current_time));

        match (bound, self.state.loop_a, self.state.loop_b) {
            (LoopBound::A, _, Some(b)) if t > b => {
                log::debug!("loop A {:.3} past B {:.3}, swapping", t, b);
                self.state.loop_a = Some(b);
                self.state.loop_b = Some(t);
                self.emit(PlayerEvent::LoopASet(b));
                self.emit(PlayerEvent::LoopBSet(t));
            }
            (LoopBound::A, _, _) => {
                self.state.loop_a = Some(t);
                self.emit(PlayerEvent::LoopASet(t));
            }
            (LoopBound::B, Some(a), _) if t < a => {
                log::debug!("loop B {:.3} before A {:.3}, swapping", t, a);
                self.state.loop_b = Some(a);
                self.state.loop_a = Some(t);
                self.emit(PlayerEvent::LoopBSet(a));
                self.emit(PlayerEvent::LoopASet(t));
            }
            (LoopBound::B, _, _) => {
                self.state.loop_b = Some(t);
                self.emit(PlayerEvent::LoopBSet(t));
            }
        }
        Ok(())
    }

    /// Flip looping. Needs both bounds; otherwise nothing changes and no event
    /// is emitted. Returns the resulting flag.
    pub fn toggle_loop(&mut self) -> Result<bool, PlayerError> {
        self.ensure_alive()?;
        if self.state.loop_region().is_none() {
            log::debug!("toggle_loop ignored: set both A and B first");
            return Ok(self.state.is_looping);
        }

        self.state.is_looping = !self.state.is_looping;
        if self.state.is_looping {
            if self.state.is_playing {
                self.start_loop_enforcement();
            }
        } else {
            self.stop_loop_enforcement();
        }
        self.emit(PlayerEvent::LoopToggle(self.state.is_looping));
        self.flush();
        Ok(self.state.is_looping)
    }

    pub fn clear_loop(&mut self) -> Result<(), PlayerError> {
        self.ensure_alive()?;
        self.clear_loop_inner();
        self.flush();
        Ok(())
    }

    fn clear_loop_inner(&mut self) {
        self.stop_loop_enforcement();
        self.state.loop_a = None;
        self.state.loop_b = None;
        self.state.is_looping = false;
        self.emit(PlayerEvent::LoopClear);
    }

    /// Stop everything, release the source and drop all subscribers.
    /// Calling it again does nothing.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        log::debug!("Destroying playback controller");

        self.stop_loop_enforcement();
        if self.state.is_playing {
            self.backend.pause();
        }
        self.release_resource();
        self.bus.clear();
        self.outbox.clear();
        self.deferred.clear();
        self.state.set_transport(TransportState::Idle);
        self.state.has_source = false;
        self.state.time_updates_suspended = false;
        self.destroyed = true;
    }

    // ==============================================
    // Driving
    // ==============================================

    /// Drain backend notifications and run the loop check if it is due.
    pub fn poll(&mut self, now: Instant) {
        if self.destroyed {
            return;
        }
        self.clock = now;
        self.drain_backend();
        if self.loop_check.poll(now) {
            self.check_loop();
            self.drain_backend();
        }
        self.flush();
    }

    /// Feed one notification from a push-style backend.
    pub fn handle_backend_event(&mut self, event: BackendEvent) {
        if self.destroyed {
            return;
        }
        self.on_backend_event(event);
        self.flush();
    }

    // ==============================================
    // Scrub support
    // ==============================================

    pub(crate) fn suspend_time_updates(&mut self) {
        self.state.time_updates_suspended = true;
    }

    pub(crate) fn resume_time_updates(&mut self) {
        self.state.time_updates_suspended = false;
    }

    pub(crate) fn publish_scrub_preview(&mut self, time: f64) {
        self.emit(PlayerEvent::ScrubPreview(time));
        self.flush();
    }

    // ==============================================
    // Backend reactions
    // ==============================================

    fn drain_backend(&mut self) {
        for event in self.backend.poll_events() {
            self.on_backend_event(event);
        }
    }

    fn on_backend_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::MetadataReady { duration, metadata } => {
                self.on_metadata(duration, metadata);
            }
            BackendEvent::TimeTick(time) => self.on_tick(time),
            BackendEvent::RateChanged(rate) => {
                let rate = self.config.clamp_rate(rate);
                if (rate - self.state.playback_rate).abs() > EPSILON {
                    self.state.playback_rate = rate;
                    self.emit(PlayerEvent::RateChange(rate));
                }
            }
            BackendEvent::VolumeChanged(volume) => {
                let volume = clamp_or(volume, 0.0, 1.0, self.state.volume);
                if (volume - self.state.volume).abs() > EPSILON {
                    self.state.volume = volume;
                    self.emit(PlayerEvent::VolumeChange(volume));
                }
            }
            BackendEvent::Ended => self.on_ended(),
            BackendEvent::Error(err) => self.on_backend_error(err),
        }
    }

    fn on_metadata(&mut self, duration: f64, metadata: Option<TrackMetadata>) {
        let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };

        if self.state.transport != TransportState::Loading {
            if self.state.has_source && self.state.duration != Some(duration) {
                self.state.duration = Some(duration);
                self.emit(PlayerEvent::DurationChange(duration));
            }
            return;
        }

        self.state.duration = Some(duration);
        self.state.metadata = metadata.clone();
        self.state.has_source = true;
        self.state.set_transport(TransportState::Ready);

        if self.state.loop_a.is_some() || self.state.loop_b.is_some() || self.state.is_looping {
            self.clear_loop_inner();
        }

        log::info!("Loaded track ({:.2}s)", duration);
        self.emit(PlayerEvent::DurationChange(duration));
        self.emit(PlayerEvent::Loaded { duration, metadata });
    }

    fn on_tick(&mut self, time: f64) {
        if !self.state.has_source {
            return;
        }
        let time = self.state.clamp_time(time);
        self.state.current_time = time;
        self.tick_seq = self.tick_seq.wrapping_add(1);
        self.pending_seek = None;
        self.emit(PlayerEvent::TimeUpdate(time));
    }

    fn on_ended(&mut self) {
        if !self.state.has_source {
            return;
        }

        if self.state.is_looping {
            if let Some((a, b)) = self.state.loop_region() {
                if b > a {
                    // the loop end sits at the end of the track
                    self.loop_back(a);
                    match self.backend.play() {
                        Ok(()) => {
                            self.state.set_transport(TransportState::Playing);
                            self.start_loop_enforcement();
                            self.loop_guard = Some(self.tick_seq);
                            return;
                        }
                        Err(err) => {
                            self.on_backend_error(err);
                            return;
                        }
                    }
                }
            }
        }

        self.stop_loop_enforcement();
        self.state.set_transport(TransportState::Ended);
        self.emit(PlayerEvent::Ended);
    }

    fn on_backend_error(&mut self, err: BackendError) {
        if self.state.transport == TransportState::Loading {
            self.fail_load(err.kind.as_load_error(), &err);
            return;
        }

        log::error!("Media error: {}", err);
        self.stop_loop_enforcement();
        let was_playing = self.state.is_playing;
        if was_playing {
            self.backend.pause();
        }
        if self.state.has_source {
            if was_playing {
                self.state.set_transport(TransportState::Paused);
            }
        } else {
            self.state.set_transport(TransportState::Idle);
        }
        self.emit(PlayerEvent::Error(ErrorKind::Capability(err.to_string())));
        if was_playing && self.state.has_source {
            self.emit(PlayerEvent::Pause);
        }
    }

    fn fail_load(&mut self, kind: LoadErrorKind, err: &BackendError) {
        log::error!("Load failed ({}): {}", kind, err);
        self.release_resource();
        self.state.set_transport(TransportState::Idle);
        self.state.has_source = false;
        self.state.duration = None;
        self.state.metadata = None;
        self.last_load_error = Some(kind);
        self.emit(PlayerEvent::Error(ErrorKind::Load(kind)));
    }

    // ==============================================
    // Loop enforcement
    // ==============================================

    fn start_loop_enforcement(&mut self) {
        self.loop_check.start(self.clock);
        self.loop_guard = None;
        log::debug!(
            "Loop enforcement started ({:?} cadence)",
            self.loop_check.period()
        );
    }

    fn stop_loop_enforcement(&mut self) {
        if self.loop_check.is_active() {
            log::debug!("Loop enforcement stopped");
        }
        self.loop_check.cancel();
        self.loop_guard = None;
    }

    fn check_loop(&mut self) {
        if !(self.state.is_playing && self.state.is_looping) {
            self.stop_loop_enforcement();
            return;
        }
        let Some((a, b)) = self.state.loop_region() else {
            self.stop_loop_enforcement();
            return;
        };
        if b - a <= EPSILON {
            return;
        }
        if let Some(seq) = self.loop_guard {
            if seq == self.tick_seq {
                // previous loop seek not confirmed yet
                return;
            }
            self.loop_guard = None;
        }
        if self.state.current_time >= b {
            self.loop_back(a);
        }
    }

    fn loop_back(&mut self, a: f64) {
        log::debug!("Looping {:.3} -> {:.3}", self.state.current_time, a);
        self.backend.seek(a);
        self.pending_seek = Some(a);
        self.loop_guard = Some(self.tick_seq);
        self.emit(PlayerEvent::Looped);
    }

    // ==============================================
    // Helpers
    // ==============================================

    fn ensure_alive(&self) -> Result<(), PlayerError> {
        if self.destroyed {
            Err(PlayerError::Destroyed)
        } else {
            Ok(())
        }
    }

    /// Report `err` on the event channel and return it.
    fn fail<T>(&mut self, err: PlayerError) -> Result<T, PlayerError> {
        if let Some(kind) = err.kind() {
            self.emit(PlayerEvent::Error(kind));
        }
        Err(err)
    }

    fn position_hint(&self) -> f64 {
        self.pending_seek.unwrap_or(self.state.current_time)
    }

    fn release_resource(&mut self) {
        if let Some(resource) = self.resource.take() {
            self.backend.release(resource);
        }
    }

    /// Reset to defaults for a new load, keeping the loop configuration until
    /// the load succeeds.
    fn reset_for_load(&mut self) {
        let mut fresh = PlaybackState::new(self.config.default_rate, self.config.default_volume);
        fresh.loop_a = self.state.loop_a;
        fresh.loop_b = self.state.loop_b;
        fresh.is_looping = self.state.is_looping;
        fresh.time_updates_suspended = self.state.time_updates_suspended;

        let rate_changed = (fresh.playback_rate - self.state.playback_rate).abs() > EPSILON;
        let volume_changed = (fresh.volume - self.state.volume).abs() > EPSILON;
        self.state = fresh;
        self.pending_seek = None;
        self.loop_guard = None;

        if rate_changed {
            self.emit(PlayerEvent::RateChange(self.state.playback_rate));
        }
        if volume_changed {
            self.emit(PlayerEvent::VolumeChange(self.state.volume));
        }
    }

    fn apply_output_settings(&mut self) {
        self.backend.set_preserve_pitch(self.config.preserve_pitch);
        self.backend.set_rate(self.state.playback_rate);
        self.backend.set_volume(self.state.volume);
    }

    fn emit(&mut self, event: PlayerEvent) {
        if self.destroyed {
            return;
        }
        if self.state.time_updates_suspended && matches!(event, PlayerEvent::TimeUpdate(_)) {
            return;
        }
        self.outbox.push_back(event);
    }

    /// Deliver queued events, then run commands listeners queued, until both
    /// queues are empty. Nested calls return immediately; the outer flush
    /// picks up whatever they queued.
    fn flush(&mut self) {
        if self.flushing {
            return;
        }
        self.flushing = true;

        let mut executed = 0;
        loop {
            while let Some(event) = self.outbox.pop_front() {
                let mut deferred = Deferred::default();
                self.bus.publish(&event, &mut deferred);
                self.deferred.extend(deferred.into_commands());
            }

            let Some(command) = self.deferred.pop_front() else {
                break;
            };
            if executed >= MAX_DEFERRED_PER_FLUSH {
                log::warn!(
                    "Dropping {} listener commands: feedback loop suspected",
                    self.deferred.len() + 1
                );
                self.deferred.clear();
                break;
            }
            executed += 1;
            if let Err(e) = self.dispatch(command) {
                log::debug!("Listener command failed: {}", e);
            }
        }

        self.flushing = false;
    }
}

impl<B: MediaBackend> Drop for PlaybackController<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<B: MediaBackend> std::fmt::Debug for PlaybackController<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("state", &self.state)
            .field("resource", &self.resource)
            .field("enforcing_loop", &self.loop_check.is_active())
            .field("bus", &self.bus)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
enum LoopBound {
    A,
    B,
}
