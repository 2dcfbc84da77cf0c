use thiserror::Error;

/// Why a load failed. Mirrors the classes a media element reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum LoadErrorKind {
    #[strum(serialize = "unsupported format")]
    UnsupportedFormat,
    #[strum(serialize = "aborted")]
    Aborted,
    #[strum(serialize = "permission denied")]
    Denied,
    #[strum(serialize = "unknown")]
    Unknown,
}

/// Classified error carried by [`crate::events::PlayerEvent::Error`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Load(LoadErrorKind),
    NoSource,
    Capability(String),
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Load(kind) => write!(f, "load failed: {}", kind),
            ErrorKind::NoSource => write!(f, "no source loaded"),
            ErrorKind::Capability(msg) => write!(f, "media error: {}", msg),
        }
    }
}

/// Errors returned by controller commands
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerError {
    #[error("load failed: {0}")]
    Load(LoadErrorKind),
    #[error("no source loaded")]
    NoSource,
    #[error("media error: {0}")]
    Capability(String),
    #[error("controller has been destroyed")]
    Destroyed,
}

impl PlayerError {
    /// The event payload for this error, if it is reported on the event channel.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            PlayerError::Load(kind) => Some(ErrorKind::Load(*kind)),
            PlayerError::NoSource => Some(ErrorKind::NoSource),
            PlayerError::Capability(msg) => Some(ErrorKind::Capability(msg.clone())),
            PlayerError::Destroyed => None,
        }
    }
}

/// Failure classes a [`crate::backend::MediaBackend`] can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum BackendErrorKind {
    UnsupportedFormat,
    Aborted,
    Denied,
    Decode,
    Device,
    Other,
}

impl BackendErrorKind {
    /// Map a backend failure that happened while loading to a load error class.
    pub fn as_load_error(self) -> LoadErrorKind {
        match self {
            BackendErrorKind::UnsupportedFormat | BackendErrorKind::Decode => {
                LoadErrorKind::UnsupportedFormat
            }
            BackendErrorKind::Aborted => LoadErrorKind::Aborted,
            BackendErrorKind::Denied => LoadErrorKind::Denied,
            BackendErrorKind::Device | BackendErrorKind::Other => LoadErrorKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_failures_classify_as_unsupported_format() {
        assert_eq!(
            BackendErrorKind::Decode.as_load_error(),
            LoadErrorKind::UnsupportedFormat
        );
        assert_eq!(BackendErrorKind::Device.as_load_error(), LoadErrorKind::Unknown);
    }

    #[test]
    fn destroyed_is_not_reported_as_event() {
        assert_eq!(PlayerError::Destroyed.kind(), None);
        assert_eq!(PlayerError::NoSource.kind(), Some(ErrorKind::NoSource));
    }
}
