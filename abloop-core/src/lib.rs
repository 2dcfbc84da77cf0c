pub mod backend;
pub mod commands;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod events;
pub mod metadata;
pub mod schedule;
pub mod scrub;
pub mod state;

pub use commands::PlayerCommand;
pub use config::PlayerConfig;
pub use controller::PlaybackController;
pub use engine::{EngineCommand, EngineHandle, PlayerEngine};
pub use error::{ErrorKind, LoadErrorKind, PlayerError};
pub use events::{Deferred, ListenerId, PlayerEvent};
pub use scrub::{ScrubGesture, ScrubReconciler, TrackGeometry};
pub use state::{PlaybackState, TransportState};

/// Install `env_logger` for hosts without their own logger.
/// Does nothing if a logger is already set.
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
