pub mod log;
pub mod playback;
