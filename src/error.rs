use thiserror::Error;

use crate::audio::SessionId;

pub type PlaybackResult<T> = std::result::Result<T, PlaybackError>;

/// Failures produced by the playback coordinator and the session registry.
///
/// None of these are fatal: the command gateway turns each one into a
/// reply for the user that issued the command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// Nothing is waiting in the queue. Used internally to detect the end
    /// of the queue, never shown as a failure.
    #[error("the queue is empty")]
    EmptyQueue,

    #[error("playback is already paused")]
    AlreadyPaused,

    #[error("playback isn't paused")]
    NotPaused,

    #[error("nothing is playing")]
    NothingPlaying,

    #[error("no voice session for guild {0}")]
    NoSuchSession(SessionId),

    /// The audio node rejected a call or a search came back empty. The
    /// message is shown to the user as is.
    #[error("{0}")]
    NodeCallFailed(String),
}

impl PlaybackError {
    pub(crate) fn node(err: anyhow::Error) -> Self {
        Self::NodeCallFailed(format!("Audio node error: {err:#}"))
    }
}
