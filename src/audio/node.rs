use anyhow::Result;
use async_trait::async_trait;

use crate::audio::{SessionId, Track, VoiceChannelId};

/// Remote service that actually decodes and streams audio.
///
/// Every call may suspend on the network. Implementations report failures
/// through `Err`; the coordinator surfaces them and never retries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioNode: Send + Sync {
    /// Resolves a search query or URL into playable candidates, best first.
    async fn search(&self, query: &str) -> Result<Vec<Track>>;

    /// Sets up the node-side player for `session` in the given voice channel.
    async fn connect(&self, session: SessionId, channel: VoiceChannelId) -> Result<()>;

    async fn play(&self, session: SessionId, track: &Track) -> Result<()>;

    async fn pause(&self, session: SessionId) -> Result<()>;

    async fn resume(&self, session: SessionId) -> Result<()>;

    /// Stops the current track. The node answers later with a
    /// [`NodeEvent::TrackEnded`] for it.
    async fn stop(&self, session: SessionId) -> Result<()>;

    /// Destroys the node-side player and leaves the voice channel.
    async fn disconnect(&self, session: SessionId) -> Result<()>;
}

/// Asynchronous notifications coming back from the audio node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    /// A track finished, failed to load, or was stopped on request.
    /// `source_ref` names the track that ended when the node reports it.
    TrackEnded {
        session_id: SessionId,
        source_ref: Option<String>,
    },
}
