//! Typed player events and their fan-out.

use std::panic::{AssertUnwindSafe, catch_unwind};

use crossbeam_channel::{Receiver, Sender};

use crate::{commands::PlayerCommand, error::ErrorKind, metadata::TrackMetadata};

/// Events emitted by the controller after each committed state change
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    LoadStart,
    /// Metadata is available and the source is ready to play
    Loaded {
        duration: f64,
        metadata: Option<TrackMetadata>,
    },
    Error(ErrorKind),
    Play,
    Pause,
    Ended,
    /// Position in seconds; withheld while a scrub gesture is active
    TimeUpdate(f64),
    DurationChange(f64),
    RateChange(f64),
    VolumeChange(f64),
    LoopASet(f64),
    LoopBSet(f64),
    LoopToggle(bool),
    LoopClear,
    /// Playback jumped from B back to A
    Looped,
    /// Provisional position while the user drags the progress control
    ScrubPreview(f64),
}

impl PlayerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::LoadStart => "loadstart",
            PlayerEvent::Loaded { .. } => "loaded",
            PlayerEvent::Error(_) => "error",
            PlayerEvent::Play => "play",
            PlayerEvent::Pause => "pause",
            PlayerEvent::Ended => "ended",
            PlayerEvent::TimeUpdate(_) => "timeupdate",
            PlayerEvent::DurationChange(_) => "durationchange",
            PlayerEvent::RateChange(_) => "ratechange",
            PlayerEvent::VolumeChange(_) => "volumechange",
            PlayerEvent::LoopASet(_) => "loopaset",
            PlayerEvent::LoopBSet(_) => "loopbset",
            PlayerEvent::LoopToggle(_) => "looptoggle",
            PlayerEvent::LoopClear => "loopclear",
            PlayerEvent::Looped => "looped",
            PlayerEvent::ScrubPreview(_) => "scrubpreview",
        }
    }
}

/// Commands queued by listeners during a fan-out.
///
/// They run after every listener has seen the current event, so a listener
/// may react to `Looped` by pausing without re-entering the controller.
#[derive(Debug, Default)]
pub struct Deferred {
    commands: Vec<PlayerCommand>,
}

impl Deferred {
    pub fn push(&mut self, command: PlayerCommand) {
        self.commands.push(command);
    }

    pub(crate) fn into_commands(self) -> Vec<PlayerCommand> {
        self.commands
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&PlayerEvent, &mut Deferred) -> anyhow::Result<()>>;

/// Callback and channel subscribers of one controller.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(ListenerId, Listener)>,
    senders: Vec<Sender<PlayerEvent>>,
    next_id: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("senders", &self.senders.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&PlayerEvent, &mut Deferred) -> anyhow::Result<()> + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Forward every event to `sender`. Dropped receivers are pruned on the next publish.
    pub fn add_sender(&mut self, sender: Sender<PlayerEvent>) {
        self.senders.push(sender);
    }

    pub fn subscribe_channel(&mut self) -> Receiver<PlayerEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.add_sender(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len() + self.senders.len()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
        self.senders.clear();
    }

    /// Deliver `event` to every subscriber. A listener that errors or panics is
    /// logged and skipped; the others still run.
    pub fn publish(&mut self, event: &PlayerEvent, deferred: &mut Deferred) {
        for (id, listener) in self.listeners.iter_mut() {
            match catch_unwind(AssertUnwindSafe(|| listener(event, deferred))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    log::warn!("listener {:?} failed on '{}': {:#}", id, event.name(), e);
                }
                Err(_) => {
                    log::error!("listener {:?} panicked on '{}'", id, event.name());
                }
            }
        }

        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
