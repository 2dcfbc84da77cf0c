use crate::backend::MediaSource;

/// Commands accepted by [`crate::controller::PlaybackController::dispatch`].
///
/// Listeners queue these through [`crate::events::Deferred`]; the engine thread
/// receives them over its command channel.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    /// Load a new source, replacing the current one
    Load(MediaSource),
    /// Start or resume playback
    Play,
    /// Pause playback
    Pause,
    /// Play if paused, pause if playing
    TogglePlayPause,
    /// Seek to position in seconds
    Seek(f64),
    /// Seek relative to the current position
    SeekBy(f64),
    /// Set playback speed multiplier
    SetRate(f64),
    /// Change the playback speed by a delta
    NudgeRate(f64),
    /// Set volume (0.0 to 1.0)
    SetVolume(f64),
    /// Change the volume by a delta
    NudgeVolume(f64),
    /// Set loop start; `None` uses the current position
    SetLoopA(Option<f64>),
    /// Set loop end; `None` uses the current position
    SetLoopB(Option<f64>),
    ToggleLoop,
    ClearLoop,
    /// Release everything; later commands fail
    Destroy,
}
