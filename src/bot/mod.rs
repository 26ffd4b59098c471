//! # Bot Module
//!
//! Discord side of the bot: prefix commands in, text replies out.
//!
//! - [`commands`]: parses `!play`, `!skip`, ... into a [`Command`]
//! - [`handlers`]: runs a [`Command`] against the session registry
//! - [`events`]: turns node events into queue advances and announcements
//!
//! [`LavaqueueBot`] implements Serenity's [`EventHandler`] and ties these
//! together. It also drops a session when the bot is removed from its
//! voice channel by someone else.

use serenity::{
    all::{Context, EventHandler, GuildId, Message, Ready, UserId, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{debug, error, info};

pub mod commands;
pub mod events;
pub mod handlers;

use crate::{
    audio::{AudioNode, SessionId, SessionRegistry, VoiceChannelId},
    config::Config,
    error::PlaybackError,
};
use commands::Command;
use events::ChannelNotifier;
use handlers::{CommandContext, CommandGateway};

pub struct LavaqueueBot {
    config: Arc<Config>,
    registry: SessionRegistry,
    gateway: CommandGateway,
    notifier: Arc<ChannelNotifier>,
}

impl LavaqueueBot {
    pub fn new(
        config: Arc<Config>,
        registry: SessionRegistry,
        node: Arc<dyn AudioNode>,
        notifier: Arc<ChannelNotifier>,
    ) -> Self {
        let gateway = CommandGateway::new(registry.clone(), node, config.queue_page_size);

        Self {
            config,
            registry,
            gateway,
            notifier,
        }
    }

    /// Drops the session after the bot left the voice channel.
    async fn forget_session(&self, session: SessionId) {
        self.notifier.unbind(session);

        match self.registry.remove(session).await {
            Ok(()) => info!("🔌 Sesión {} eliminada tras desconexión", session),
            Err(PlaybackError::NoSuchSession(_)) => {
                debug!("Sesión {} ya estaba cerrada", session)
            }
            Err(e) => error!("Error al cerrar la sesión {}: {}", session, e),
        }
    }
}

/// Voice channel `user_id` is in, looked up in the cache.
fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<VoiceChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
        .map(VoiceChannelId::from)
}

#[async_trait]
impl EventHandler for LavaqueueBot {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let Some(parsed) = commands::parse(&self.config.command_prefix, &msg.content) else {
            return;
        };

        info!(
            "📝 Comando '{}' usado por {} en guild {:?}",
            msg.content, msg.author.name, msg.guild_id
        );

        let reply = match parsed {
            Ok(command) => {
                let command_ctx = CommandContext {
                    session: msg.guild_id.map(SessionId::from),
                    author: msg.author.id.get(),
                    author_voice: msg
                        .guild_id
                        .and_then(|guild_id| user_voice_channel(&ctx, guild_id, msg.author.id)),
                };

                if let Some(guild_id) = msg.guild_id {
                    let session = SessionId::from(guild_id);
                    if command == Command::Disconnect {
                        self.notifier.unbind(session);
                    } else {
                        self.notifier.bind(session, msg.channel_id);
                    }
                }

                self.gateway.execute(&command_ctx, command).await
            }
            Err(e) => e.to_string(),
        };

        if let Err(e) = msg.reply(&ctx, reply).await {
            error!("Error al responder comando: {:?}", e);
        }
    }

    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        // Detectar si el bot fue desconectado
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || old.is_none() || new.channel_id.is_some() {
            return;
        }

        if let Some(guild_id) = new.guild_id {
            info!("🔌 Bot desconectado en guild {}", guild_id);
            self.forget_session(SessionId::from(guild_id)).await;
        }
    }
}
