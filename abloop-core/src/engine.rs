//! Dedicated playback thread.
//!
//! The rodio output stream cannot leave the thread that opened it, so the
//! backend is built on the engine thread. The controller and the scrub
//! reconciler live there too; hosts talk to them through an [`EngineHandle`].

use std::{
    thread::{self, JoinHandle},
    time::Instant,
};

use anyhow::Context;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::{
    backend::MediaBackend,
    commands::PlayerCommand,
    config::PlayerConfig,
    controller::PlaybackController,
    events::PlayerEvent,
    scrub::{ScrubGesture, ScrubReconciler, TrackGeometry},
};

/// Messages accepted by the engine thread
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    Player(PlayerCommand),
    Scrub(ScrubGesture),
    SetTrackGeometry(TrackGeometry),
    /// Destroy the controller and stop the thread
    Quit,
}

impl From<PlayerCommand> for EngineCommand {
    fn from(command: PlayerCommand) -> Self {
        EngineCommand::Player(command)
    }
}

impl From<ScrubGesture> for EngineCommand {
    fn from(gesture: ScrubGesture) -> Self {
        EngineCommand::Scrub(gesture)
    }
}

/// Host side of the engine channels
#[derive(Debug, Clone)]
pub struct EngineHandle {
    pub cmd_tx: Sender<EngineCommand>,
    pub resp_rx: Receiver<PlayerEvent>,
}

impl EngineHandle {
    pub fn send(&self, command: impl Into<EngineCommand>) -> anyhow::Result<()> {
        self.cmd_tx
            .send(command.into())
            .context("playback engine has stopped")
    }
}

pub struct PlayerEngine;

impl PlayerEngine {
    /// Start the engine thread. `make_backend` runs on that thread; its error
    /// is returned here.
    pub fn spawn<B, F>(config: PlayerConfig, make_backend: F) -> anyhow::Result<(JoinHandle<()>, EngineHandle)>
    where
        B: MediaBackend + 'static,
        F: FnOnce() -> anyhow::Result<B> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded::<EngineCommand>();
        let (resp_tx, resp_rx) = crossbeam_channel::unbounded::<PlayerEvent>();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<anyhow::Result<()>>(1);

        let thread = thread::Builder::new()
            .name("abloop-engine".to_string())
            .spawn(move || {
                let backend = match make_backend() {
                    Ok(backend) => {
                        let _ = ready_tx.send(Ok(()));
                        backend
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                run(backend, config, cmd_rx, resp_tx);
            })
            .context("failed to spawn playback engine thread")?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e.context("failed to initialize audio backend"));
            }
            Err(_) => {
                let _ = thread.join();
                anyhow::bail!("playback engine exited during startup");
            }
        }

        log::info!("Playback engine started");
        Ok((thread, EngineHandle { cmd_tx, resp_rx }))
    }
}

fn run<B: MediaBackend>(
    backend: B,
    config: PlayerConfig,
    cmd_rx: Receiver<EngineCommand>,
    resp_tx: Sender<PlayerEvent>,
) {
    let tick = config.tick_interval();
    let mut controller = PlaybackController::new(backend, config);
    controller.forward_to(resp_tx);
    let mut scrub = ScrubReconciler::default();

    loop {
        match cmd_rx.recv_timeout(tick) {
            Ok(EngineCommand::Quit) => {
                log::info!("Playback engine shutting down");
                break;
            }
            Ok(EngineCommand::Player(command)) => {
                log::debug!("Engine command: {:?}", command);
                if let Err(e) = controller.dispatch(command) {
                    log::warn!("Command failed: {}", e);
                }
            }
            Ok(EngineCommand::Scrub(gesture)) => scrub.handle(&mut controller, gesture),
            Ok(EngineCommand::SetTrackGeometry(geometry)) => scrub.set_geometry(geometry),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                log::info!("All engine handles dropped, stopping");
                break;
            }
        }

        controller.poll(Instant::now());
    }

    controller.destroy();
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backend::{MediaSource, SimulatedBackend};

    fn wait_for(rx: &Receiver<PlayerEvent>, pred: impl Fn(&PlayerEvent) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while let Some(left) = deadline.checked_duration_since(Instant::now()) {
            match rx.recv_timeout(left) {
                Ok(event) if pred(&event) => return true,
                Ok(_) => {}
                Err(_) => return false,
            }
        }
        false
    }

    #[test]
    fn engine_loads_and_plays() {
        let (thread, handle) =
            PlayerEngine::spawn(PlayerConfig::default(), || Ok(SimulatedBackend::manual(30.0)))
                .unwrap();

        handle
            .send(PlayerCommand::Load(MediaSource::Url("sim://tone".into())))
            .unwrap();
        assert!(wait_for(&handle.resp_rx, |e| matches!(e, PlayerEvent::Loaded { .. })));

        handle.send(PlayerCommand::Play).unwrap();
        assert!(wait_for(&handle.resp_rx, |e| *e == PlayerEvent::Play));

        handle.send(EngineCommand::Quit).unwrap();
        thread.join().unwrap();
    }

    #[test]
    fn backend_failure_is_reported_by_spawn() {
        let result = PlayerEngine::spawn(PlayerConfig::default(), || {
            Err::<SimulatedBackend, _>(anyhow::anyhow!("no device"))
        });
        assert!(result.is_err());
    }
}
