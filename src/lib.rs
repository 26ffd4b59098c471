//! Discord music bot whose audio is streamed by a Lavalink node.
//!
//! The interesting part lives in [`audio`]: one playback coordinator per
//! voice session, owning the queue and reacting to track-end events from
//! the node. [`bot`] wires it to Discord prefix commands.

pub mod audio;
pub mod bot;
pub mod cache;
pub mod config;
pub mod error;
