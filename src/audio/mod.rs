//! # Audio Module
//!
//! Playback state for every voice session of the bot.
//!
//! Actual decoding and streaming happen on a remote Lavalink node; this
//! module decides *what* the node should play and *when*.
//!
//! ## Architecture
//!
//! ### [`registry`] - Session Registry
//! - One [`PlaybackCoordinator`] per guild with a voice connection
//! - Created on `join`/`play`, dropped on `disconnect`
//!
//! ### [`coordinator`] - Playback Coordinator
//! - `Idle` / `Playing` / `Paused` state machine
//! - Serializes commands and node events per session
//! - Advances the queue only when the node reports the end of a track
//!
//! ### [`queue`] - Session Queue
//! - Strict FIFO of upcoming tracks, never holding the current one
//!
//! ### [`node`] - Audio Node
//! - [`AudioNode`] trait the coordinator talks to
//! - [`NodeEvent`] messages coming back from the node
//!
//! ### [`lavalink_client`] - Lavalink
//! - [`AudioNode`] implementation on top of `lavalink-rs`
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use lavaqueue::audio::{AudioNode, SessionId, SessionRegistry, VoiceChannelId};
//! use std::sync::Arc;
//!
//! # async fn example(node: Arc<dyn AudioNode>) -> anyhow::Result<()> {
//! let registry = SessionRegistry::new(node.clone());
//! let session = registry.get_or_create(SessionId(123456789), VoiceChannelId(42));
//! session.ensure_connected().await?;
//!
//! if let Some(track) = node.search("never gonna give you up").await?.into_iter().next() {
//!     session.request_play(track).await?;
//! }
//! session.pause().await?;
//! session.resume().await?;
//! session.skip().await?;
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod lavalink_client;
pub mod node;
pub mod queue;
pub mod registry;
pub mod track;

pub use coordinator::{Advance, PlayOutcome, PlaybackCoordinator, PlaybackStatus, QueueSnapshot};
pub use node::{AudioNode, NodeEvent};
pub use queue::{QueuePage, SessionQueue};
pub use registry::SessionRegistry;
pub use track::{format_duration, SessionId, Track, VoiceChannelId};
