use async_trait::async_trait;
use dashmap::DashMap;
use serenity::{http::Http, model::id::ChannelId};
use std::sync::Arc;
use tokio::{sync::mpsc::UnboundedReceiver, task::JoinHandle};
use tracing::{debug, error, info};

use crate::{
    audio::{Advance, NodeEvent, SessionId, SessionRegistry, Track},
    error::PlaybackError,
};

/// Where asynchronous announcements ("now playing", failures) go.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, session: SessionId, text: String);
}

/// Sends announcements to the text channel each session was last
/// commanded from.
pub struct ChannelNotifier {
    http: Arc<Http>,
    channels: DashMap<SessionId, ChannelId>,
}

impl ChannelNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self {
            http,
            channels: DashMap::new(),
        }
    }

    pub fn bind(&self, session: SessionId, channel: ChannelId) {
        self.channels.insert(session, channel);
    }

    pub fn unbind(&self, session: SessionId) {
        self.channels.remove(&session);
    }
}

#[async_trait]
impl NotificationSink for ChannelNotifier {
    async fn notify(&self, session: SessionId, text: String) {
        let Some(channel) = self.channels.get(&session).map(|entry| *entry) else {
            debug!("Sin canal de texto para guild {}: {}", session, text);
            return;
        };

        if let Err(e) = channel.say(&self.http, text).await {
            error!("Error al enviar mensaje en guild {}: {:?}", session, e);
        }
    }
}

/// Consumes node events until the sender side is dropped.
///
/// Each event is handled on its own task: events for one session are
/// serialized by that session's coordinator, while a slow node call never
/// holds up other sessions.
pub fn spawn_event_loop(
    registry: SessionRegistry,
    sink: Arc<dyn NotificationSink>,
    mut events: UnboundedReceiver<NodeEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let registry = registry.clone();
            let sink = sink.clone();
            tokio::spawn(async move {
                handle_node_event(&registry, sink.as_ref(), event).await;
            });
        }
        info!("Bucle de eventos del nodo terminado");
    })
}

pub async fn handle_node_event(
    registry: &SessionRegistry,
    sink: &dyn NotificationSink,
    event: NodeEvent,
) {
    match event {
        NodeEvent::TrackEnded {
            session_id,
            source_ref,
        } => {
            info!("🎵 Track terminó en guild {}", session_id);

            let Some(coordinator) = registry.get(session_id) else {
                debug!("Fin de track para guild sin sesión {}", session_id);
                return;
            };

            let advance = match source_ref {
                Some(source_ref) => coordinator.on_track_end_of(&source_ref).await,
                None => coordinator.on_track_end().await,
            };
            announce(sink, session_id, advance).await;
        }
    }
}

async fn announce(sink: &dyn NotificationSink, session: SessionId, advance: Advance) {
    let failed: &[(Track, PlaybackError)] = match &advance {
        Advance::Started { failed, .. } | Advance::Finished { failed } => failed.as_slice(),
        Advance::Ignored => &[],
    };
    for (track, e) in failed {
        sink.notify(session, format!("Couldn't play **{}**: {}", track, e))
            .await;
    }

    match advance {
        Advance::Started { track, .. } => {
            sink.notify(session, format!("Now playing: **{}**", track))
                .await;
        }
        Advance::Finished { .. } => info!("Queue exhausted for guild {}", session),
        Advance::Ignored => {}
    }
}
