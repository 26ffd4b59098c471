use std::{fmt::Write as _, sync::Arc};
use tracing::{debug, info, warn};

use crate::{
    audio::{
        format_duration, AudioNode, PlayOutcome, PlaybackCoordinator, PlaybackStatus, SessionId,
        SessionRegistry, VoiceChannelId,
    },
    bot::commands::Command,
    error::PlaybackError,
};

const NOT_IN_GUILD: &str = "This command can only be used in a server.";
const NOT_IN_VOICE: &str = "You need to be in a voice channel to use this command.";
const NOT_CONNECTED: &str = "I'm not connected to a voice channel.";
const NO_RESULTS: &str = "No results found for that query.";

/// Who sent a command and from where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandContext {
    /// `None` for direct messages.
    pub session: Option<SessionId>,
    pub author: u64,
    /// Voice channel the author is currently in, if any.
    pub author_voice: Option<VoiceChannelId>,
}

/// Turns parsed commands into coordinator calls and a text reply.
///
/// Only `join` and `play` may create a session; every other command on an
/// unknown session answers "not connected".
pub struct CommandGateway {
    registry: SessionRegistry,
    node: Arc<dyn AudioNode>,
    page_size: usize,
}

impl CommandGateway {
    pub fn new(registry: SessionRegistry, node: Arc<dyn AudioNode>, page_size: usize) -> Self {
        Self {
            registry,
            node,
            page_size,
        }
    }

    pub async fn execute(&self, ctx: &CommandContext, command: Command) -> String {
        let Some(session) = ctx.session else {
            return NOT_IN_GUILD.to_string();
        };

        debug!("📝 Comando {:?} en guild {}", command, session);

        match command {
            Command::Join => self.join(session, ctx).await,
            Command::Play { query } => self.play(session, ctx, &query).await,
            Command::Pause => self.pause(session).await,
            Command::Resume => self.resume(session).await,
            Command::Skip => self.skip(session).await,
            Command::Stop => self.stop(session).await,
            Command::Queue { page } => self.queue(session, page).await,
            Command::NowPlaying => self.now_playing(session).await,
            Command::Disconnect => self.disconnect(session).await,
        }
    }

    /// Returns the session's coordinator, creating and connecting it in the
    /// author's voice channel if needed.
    async fn ensure_voice(
        &self,
        session: SessionId,
        ctx: &CommandContext,
    ) -> Result<Arc<PlaybackCoordinator>, String> {
        let voice = ctx.author_voice.ok_or_else(|| NOT_IN_VOICE.to_string())?;

        self.registry.connect(session, voice).await.map_err(|e| {
            warn!("No se pudo conectar la sesión {}: {}", session, e);
            reply_for(e)
        })
    }

    async fn join(&self, session: SessionId, ctx: &CommandContext) -> String {
        if let Some(existing) = self.registry.get(session) {
            if ctx.author_voice == Some(existing.voice_channel()) {
                return "I'm already in your voice channel!".to_string();
            }
        }

        match self.ensure_voice(session, ctx).await {
            Ok(coordinator) => format!("Joined <#{}>.", coordinator.voice_channel().0),
            Err(reply) => reply,
        }
    }

    async fn play(&self, session: SessionId, ctx: &CommandContext, query: &str) -> String {
        let coordinator = match self.ensure_voice(session, ctx).await {
            Ok(coordinator) => coordinator,
            Err(reply) => return reply,
        };

        let track = match self.node.search(query).await {
            Ok(tracks) => match tracks.into_iter().next() {
                Some(track) => track.requested_by(ctx.author),
                None => return NO_RESULTS.to_string(),
            },
            Err(e) => return PlaybackError::node(e).to_string(),
        };

        match coordinator.request_play(track).await {
            Ok(PlayOutcome::Started(track)) => format!("Now playing: **{}**", track),
            Ok(PlayOutcome::Queued { track, .. }) => format!("Added to queue: **{}**", track),
            Err(e) => reply_for(e),
        }
    }

    async fn pause(&self, session: SessionId) -> String {
        let Some(coordinator) = self.registry.get(session) else {
            return NOT_CONNECTED.to_string();
        };

        match coordinator.pause().await {
            Ok(()) => "Paused playback.".to_string(),
            Err(e) => reply_for(e),
        }
    }

    async fn resume(&self, session: SessionId) -> String {
        let Some(coordinator) = self.registry.get(session) else {
            return NOT_CONNECTED.to_string();
        };

        match coordinator.resume().await {
            Ok(()) => "Resumed playback.".to_string(),
            Err(e) => reply_for(e),
        }
    }

    async fn skip(&self, session: SessionId) -> String {
        let Some(coordinator) = self.registry.get(session) else {
            return "There's nothing to skip.".to_string();
        };

        match coordinator.skip().await {
            Ok(_) => "Skipping current track…".to_string(),
            Err(PlaybackError::NothingPlaying) => "There's nothing to skip.".to_string(),
            Err(e) => reply_for(e),
        }
    }

    async fn stop(&self, session: SessionId) -> String {
        let Some(coordinator) = self.registry.get(session) else {
            return NOT_CONNECTED.to_string();
        };

        match coordinator.stop_all().await {
            Ok(_) => "Stopped playback and cleared the queue.".to_string(),
            Err(e) => reply_for(e),
        }
    }

    async fn queue(&self, session: SessionId, page: usize) -> String {
        let Some(coordinator) = self.registry.get(session) else {
            return NOT_CONNECTED.to_string();
        };

        let snapshot = coordinator.snapshot(page, self.page_size).await;
        let page = snapshot.page;
        if page.total_items == 0 {
            return "The queue is currently empty.".to_string();
        }

        let mut reply = String::from("Upcoming tracks:");
        for (offset, track) in page.items.iter().enumerate() {
            let _ = write!(reply, "\n`{}.` {}", page.first_position + offset, track);
            if let Some(length) = track.length {
                let _ = write!(reply, " ({})", format_duration(length));
            }
        }
        if page.total_pages > 1 {
            let _ = write!(
                reply,
                "\nPage {}/{} ({} tracks)",
                page.current_page, page.total_pages, page.total_items
            );
        }
        if !page.total_length.is_zero() {
            let _ = write!(reply, "\nTotal length: {}", format_duration(page.total_length));
        }
        reply
    }

    async fn now_playing(&self, session: SessionId) -> String {
        let Some(coordinator) = self.registry.get(session) else {
            return NOT_CONNECTED.to_string();
        };

        let snapshot = coordinator.snapshot(1, 1).await;
        match (snapshot.now_playing, snapshot.status) {
            (Some(track), PlaybackStatus::Paused) => format!("Paused: **{}**", track),
            (Some(track), _) => format!("Now playing: **{}**", track),
            (None, _) => reply_for(PlaybackError::NothingPlaying),
        }
    }

    async fn disconnect(&self, session: SessionId) -> String {
        match self.registry.remove(session).await {
            Ok(()) => {
                info!("👋 Desconectado por comando en guild {}", session);
                "Disconnected from the voice channel.".to_string()
            }
            Err(e) => reply_for(e),
        }
    }
}

/// User-facing reply for a coordinator error.
pub fn reply_for(err: PlaybackError) -> String {
    match err {
        PlaybackError::EmptyQueue => "The queue is currently empty.".to_string(),
        PlaybackError::AlreadyPaused => "Playback is already paused.".to_string(),
        PlaybackError::NotPaused => "Playback isn't paused.".to_string(),
        PlaybackError::NothingPlaying => "There's nothing playing.".to_string(),
        PlaybackError::NoSuchSession(_) => NOT_CONNECTED.to_string(),
        PlaybackError::NodeCallFailed(message) => message,
    }
}
