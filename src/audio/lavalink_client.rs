use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::BoxFuture;
use lavalink_rs::{
    model::{
        events::{Events, Ready, TrackEnd, TrackEndReason, WebSocketClosed},
        player::ConnectionInfo,
        track::{TrackData, TrackLoadData},
    },
    prelude::*,
};
use serenity::model::id::{ChannelId, GuildId as SerenityGuildId};
use songbird::Songbird;
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use crate::{
    audio::{
        node::{AudioNode, NodeEvent},
        SessionId, Track, VoiceChannelId,
    },
    cache::LRUCache,
    config::Config,
};

/// [`AudioNode`] backed by a single Lavalink v4 node.
///
/// Voice credentials come from songbird's gateway-only join and are handed
/// to Lavalink, which then streams to Discord on its own. Track-end events
/// from the node are forwarded as [`NodeEvent::TrackEnded`].
pub struct LavalinkNode {
    client: LavalinkClient,
    songbird: Arc<Songbird>,
    tracks: LRUCache<String, TrackData>,
    search_prefix: String,
}

impl LavalinkNode {
    pub async fn new(
        config: &Config,
        bot_user_id: u64,
        songbird: Arc<Songbird>,
        events: UnboundedSender<NodeEvent>,
    ) -> Result<Self> {
        let hostname = config.lavalink_address()?;
        info!("🎼 Conectando a Lavalink en {}", hostname);

        let node = NodeBuilder {
            hostname,
            is_ssl: config.lavalink_is_ssl(),
            events: Events::default(),
            password: config.lavalink_password.clone(),
            user_id: UserId::from(bot_user_id),
            session_id: None,
        };

        let client = LavalinkClient::new_with_data(
            node_hooks(),
            vec![node],
            NodeDistributionStrategy::round_robin(),
            Arc::new(events),
        )
        .await;

        Ok(Self {
            client,
            songbird,
            tracks: LRUCache::new(config.track_cache_size),
            search_prefix: config.search_prefix.clone(),
        })
    }

    fn search_identifier(&self, query: &str) -> String {
        let query = query.trim();
        if query.starts_with("http://") || query.starts_with("https://") {
            query.to_string()
        } else {
            format!("{}:{}", self.search_prefix, query)
        }
    }

    fn player(&self, session: SessionId) -> Result<PlayerContext> {
        self.client
            .get_player_context(GuildId::from(session.0))
            .with_context(|| format!("no Lavalink player for guild {}", session))
    }

    /// Returns the node's own payload for `track`, loading it again by URI
    /// if it fell out of the cache.
    async fn track_data(&self, track: &Track) -> Result<TrackData> {
        if let Some(data) = self.tracks.get(&track.source_ref) {
            return Ok(data);
        }

        let uri = track
            .uri
            .as_deref()
            .with_context(|| format!("the node does not know the track {}", track.title))?;
        debug!("Track fuera de caché, recargando {}", uri);

        self.search(uri).await?;
        self.tracks
            .get(&track.source_ref)
            .with_context(|| format!("the node can no longer resolve {}", track.title))
    }

    fn remember(&self, data: TrackData) -> Track {
        let info = &data.info;
        let mut track = Track::new(info.title.clone(), data.encoded.clone());
        if let Some(uri) = &info.uri {
            track = track.with_uri(uri.clone());
        }
        if !info.is_stream {
            track = track.with_length(Duration::from_millis(info.length));
        }

        self.tracks.insert(data.encoded.clone(), data);
        track
    }
}

#[async_trait]
impl AudioNode for LavalinkNode {
    async fn search(&self, query: &str) -> Result<Vec<Track>> {
        let identifier = self.search_identifier(query);

        // El nodo se elige por guild; con un solo nodo cualquier id sirve.
        let loaded = self
            .client
            .load_tracks(GuildId::from(0u64), &identifier)
            .await
            .context("search failed")?;

        let found = match loaded.data {
            Some(TrackLoadData::Track(track)) => vec![track],
            Some(TrackLoadData::Search(tracks)) => tracks,
            Some(TrackLoadData::Playlist(playlist)) => playlist.tracks,
            Some(TrackLoadData::Error(e)) => {
                error!("Error al cargar track: {:?}", e);
                anyhow::bail!("Lavalink could not load the track");
            }
            None => {
                warn!("No se encontraron resultados para: {}", identifier);
                Vec::new()
            }
        };

        Ok(found.into_iter().map(|data| self.remember(data)).collect())
    }

    async fn connect(&self, session: SessionId, channel: VoiceChannelId) -> Result<()> {
        let (connection, _call) = self
            .songbird
            .join_gateway(SerenityGuildId::new(session.0), ChannelId::new(channel.0))
            .await
            .context("could not join the voice channel")?;

        self.client
            .create_player_context(
                GuildId::from(session.0),
                ConnectionInfo {
                    endpoint: connection.endpoint,
                    token: connection.token,
                    session_id: connection.session_id,
                },
            )
            .await
            .context("could not create the Lavalink player")?;

        info!("Conectado al canal {} en guild {}", channel.0, session);
        Ok(())
    }

    async fn play(&self, session: SessionId, track: &Track) -> Result<()> {
        let data = self.track_data(track).await?;
        let player = self.player(session)?;

        player
            .play_now(&data)
            .await
            .context("could not start the track")?;
        // Un player pausado sigue pausado al cambiar de track.
        player.set_pause(false).await.context("could not unpause")?;

        Ok(())
    }

    async fn pause(&self, session: SessionId) -> Result<()> {
        self.player(session)?
            .set_pause(true)
            .await
            .context("could not pause")?;
        Ok(())
    }

    async fn resume(&self, session: SessionId) -> Result<()> {
        self.player(session)?
            .set_pause(false)
            .await
            .context("could not resume")?;
        Ok(())
    }

    async fn stop(&self, session: SessionId) -> Result<()> {
        self.player(session)?
            .stop_now()
            .await
            .context("could not stop")?;
        Ok(())
    }

    async fn disconnect(&self, session: SessionId) -> Result<()> {
        self.client
            .delete_player(GuildId::from(session.0))
            .await
            .context("could not destroy the Lavalink player")?;

        if let Err(e) = self.songbird.remove(SerenityGuildId::new(session.0)).await {
            warn!("Error al salir del canal de voz en guild {}: {:?}", session, e);
        }

        info!("Desconectado del guild {}", session);
        Ok(())
    }
}

fn node_hooks() -> Events {
    Events {
        ready: Some(node_ready),
        track_end: Some(forward_track_end),
        websocket_closed: Some(voice_socket_closed),
        ..Default::default()
    }
}

/// Fires on the first connection to the node and on every reconnect.
fn node_ready(_client: LavalinkClient, session_id: String, event: &Ready) -> BoxFuture<'_, ()> {
    if event.resumed {
        info!("🔄 Nodo Lavalink reconectado, sesión {} reanudada", session_id);
    } else {
        info!("✅ Nodo Lavalink listo (sesión {})", session_id);
    }
    Box::pin(async {})
}

/// Discord closed the voice connection the node streams to.
fn voice_socket_closed(
    _client: LavalinkClient,
    _session_id: String,
    event: &WebSocketClosed,
) -> BoxFuture<'_, ()> {
    warn!(
        "🔌 Conexión de voz cerrada en guild {} (código {}: {}, remoto: {})",
        event.guild_id.0, event.code, event.reason, event.by_remote
    );
    Box::pin(async {})
}

/// Lavalink hook: turns a track-end event into a [`NodeEvent`].
///
/// `replaced` ends are dropped: the coordinator never replaces a playing
/// track, so those only come from outside interference.
fn forward_track_end(
    client: LavalinkClient,
    _session_id: String,
    event: &TrackEnd,
) -> BoxFuture<'_, ()> {
    let replaced = matches!(event.reason, TrackEndReason::Replaced);
    let node_event = NodeEvent::TrackEnded {
        session_id: SessionId(event.guild_id.0),
        source_ref: Some(event.track.encoded.clone()),
    };

    Box::pin(async move {
        if replaced {
            debug!("Track reemplazado ignorado: {:?}", node_event);
            return;
        }

        match client.data::<UnboundedSender<NodeEvent>>() {
            Ok(events) => {
                if events.send(node_event).is_err() {
                    warn!("Evento de fin de track descartado: el bucle de eventos terminó");
                }
            }
            Err(e) => error!("Canal de eventos no registrado en Lavalink: {:?}", e),
        }
    })
}

/// Checks that the node answers with the configured password and returns
/// its version. Startup aborts when this fails.
pub async fn probe_node(config: &Config) -> Result<String> {
    let url = config.lavalink_url()?.join("version")?;

    let version = reqwest::Client::new()
        .get(url)
        .header("Authorization", &config.lavalink_password)
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .context("Lavalink is not responding")?
        .error_for_status()
        .context("Lavalink rejected the request")?
        .text()
        .await?;

    Ok(version.trim().to_string())
}
