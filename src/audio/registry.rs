use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::{
    audio::{coordinator::PlaybackCoordinator, node::AudioNode, SessionId, VoiceChannelId},
    error::{PlaybackError, PlaybackResult},
};

/// All live voice sessions of the process.
///
/// The registry is the only place coordinators are created or dropped. It
/// is cheap to clone and shared between the command gateway and the node
/// event loop.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<SessionId, Arc<PlaybackCoordinator>>>,
    node: Arc<dyn AudioNode>,
}

impl SessionRegistry {
    pub fn new(node: Arc<dyn AudioNode>) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            node,
        }
    }

    /// Returns the coordinator for `session`, creating an idle one bound to
    /// `voice_channel` if none exists. An existing session keeps the voice
    /// channel it was created with.
    pub fn get_or_create(
        &self,
        session: SessionId,
        voice_channel: VoiceChannelId,
    ) -> Arc<PlaybackCoordinator> {
        self.sessions
            .entry(session)
            .or_insert_with(|| {
                info!("🆕 Nueva sesión de voz para guild {}", session);
                Arc::new(PlaybackCoordinator::new(
                    session,
                    voice_channel,
                    self.node.clone(),
                ))
            })
            .clone()
    }

    /// Returns a connected coordinator for `session`, creating one bound to
    /// `voice_channel` if needed.
    ///
    /// A coordinator that failed to connect is dropped from the registry. If
    /// it was closed while this call waited for it, a fresh one is created
    /// and connected instead, so callers never hold a connected coordinator
    /// the registry has already forgotten.
    pub async fn connect(
        &self,
        session: SessionId,
        voice_channel: VoiceChannelId,
    ) -> PlaybackResult<Arc<PlaybackCoordinator>> {
        loop {
            let coordinator = self.get_or_create(session, voice_channel);

            match coordinator.ensure_connected().await {
                Ok(()) => return Ok(coordinator),
                Err(PlaybackError::NoSuchSession(_)) => {
                    debug!("Sesión {} cerrada mientras esperaba, reintentando", session);
                    self.discard(session, &coordinator);
                }
                Err(e) => {
                    self.discard(session, &coordinator);
                    return Err(e);
                }
            }
        }
    }

    /// Removes `coordinator` without touching the node, unless `session`
    /// already points to a newer one.
    fn discard(&self, session: SessionId, coordinator: &Arc<PlaybackCoordinator>) {
        self.sessions
            .remove_if(&session, |_, current| Arc::ptr_eq(current, coordinator));
    }

    pub fn get(&self, session: SessionId) -> Option<Arc<PlaybackCoordinator>> {
        self.sessions.get(&session).map(|entry| entry.clone())
    }

    /// Evicts `session` and tears down its node player.
    pub async fn remove(&self, session: SessionId) -> PlaybackResult<()> {
        let (_, coordinator) = self
            .sessions
            .remove(&session)
            .ok_or(PlaybackError::NoSuchSession(session))?;

        coordinator.shutdown().await
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Tears down every session, used on process shutdown.
    pub async fn shutdown_all(&self) {
        let sessions: Vec<SessionId> = self.sessions.iter().map(|entry| *entry.key()).collect();

        for session in sessions {
            if let Err(e) = self.remove(session).await {
                error!("Error al cerrar la sesión {}: {}", session, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{
        coordinator::{
            tests::{accepting_node, track, SlowNode},
            PlayOutcome, PlaybackStatus,
        },
        node::MockAudioNode,
    };
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(Arc::new(accepting_node()))
    }

    #[tokio::test]
    async fn test_get_or_create_reuses_existing_session() {
        let registry = registry();

        let first = registry.get_or_create(SessionId(1), VoiceChannelId(10));
        let second = registry.get_or_create(SessionId(1), VoiceChannelId(20));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.voice_channel(), VoiceChannelId(10));
        assert_eq!(registry.len(), 1);
        assert_eq!(first.status().await, PlaybackStatus::Idle);
    }

    #[tokio::test]
    async fn test_get_does_not_create() {
        let registry = registry();

        assert!(registry.get(SessionId(1)).is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_remove_evicts_and_reports_missing() {
        let registry = registry();
        let coordinator = registry.get_or_create(SessionId(1), VoiceChannelId(10));
        coordinator.request_play(track("T1")).await.unwrap();

        assert_eq!(registry.remove(SessionId(1)).await, Ok(()));
        assert!(registry.get(SessionId(1)).is_none());
        assert_eq!(coordinator.status().await, PlaybackStatus::Idle);

        assert_eq!(
            registry.remove(SessionId(1)).await,
            Err(PlaybackError::NoSuchSession(SessionId(1)))
        );
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let registry = registry();
        let x = registry.get_or_create(SessionId(1), VoiceChannelId(10));
        let y = registry.get_or_create(SessionId(2), VoiceChannelId(20));

        x.request_play(track("X1")).await.unwrap();
        x.request_play(track("X2")).await.unwrap();
        x.request_play(track("X3")).await.unwrap();

        assert_eq!(y.status().await, PlaybackStatus::Idle);
        assert!(y.peek_upcoming(10).await.is_empty());

        y.request_play(track("Y1")).await.unwrap();
        x.stop_all().await.unwrap();

        assert_eq!(y.now_playing().await, Some(track("Y1")));
        assert_eq!(y.status().await, PlaybackStatus::Playing);
        assert_eq!(x.status().await, PlaybackStatus::Idle);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slow_node_call_does_not_block_other_sessions() {
        let node = Arc::new(SlowNode::new(Duration::from_secs(30)).only_for(SessionId(1)));
        let registry = SessionRegistry::new(node.clone());
        let x = registry.get_or_create(SessionId(1), VoiceChannelId(10));
        let y = registry.get_or_create(SessionId(2), VoiceChannelId(20));

        let stuck = tokio::spawn(async move { x.request_play(track("X1")).await });
        node.started.notified().await;

        let outcome = tokio::time::timeout(Duration::from_secs(5), y.request_play(track("Y1")))
            .await
            .expect("session 2 waited on session 1");

        assert_eq!(outcome, Ok(PlayOutcome::Started(track("Y1"))));
        assert!(!stuck.is_finished());
        stuck.abort();
    }

    #[tokio::test]
    async fn test_connect_reuses_connected_session() {
        let registry = registry();

        let first = registry.connect(SessionId(1), VoiceChannelId(10)).await.unwrap();
        let second = registry.connect(SessionId(1), VoiceChannelId(10)).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_waiter_on_failed_connect_gets_fresh_session() {
        let node = SlowNode::new(Duration::from_millis(20)).failing_connects(1);
        let registry = SessionRegistry::new(Arc::new(node));

        let (first, second) = tokio::join!(
            registry.connect(SessionId(1), VoiceChannelId(10)),
            registry.connect(SessionId(1), VoiceChannelId(10))
        );

        assert_eq!(
            first.err(),
            Some(PlaybackError::NodeCallFailed(
                "Audio node error: voice timeout".to_string()
            ))
        );
        let second = second.unwrap();
        let registered = registry.get(SessionId(1)).unwrap();
        assert!(Arc::ptr_eq(&second, &registered));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_connect_replaces_shut_down_session() {
        let registry = registry();
        let stale = registry.get_or_create(SessionId(1), VoiceChannelId(10));
        stale.shutdown().await.unwrap();

        let fresh = registry.connect(SessionId(1), VoiceChannelId(10)).await.unwrap();

        assert!(!Arc::ptr_eq(&stale, &fresh));
        assert!(Arc::ptr_eq(&fresh, &registry.get(SessionId(1)).unwrap()));
    }

    #[tokio::test]
    async fn test_shutdown_all_disconnects_connected_sessions() {
        let mut node = MockAudioNode::new();
        node.expect_connect().returning(|_, _| Ok(()));
        node.expect_disconnect().times(2).returning(|_| Ok(()));
        let registry = SessionRegistry::new(Arc::new(node));

        for id in 1..=2 {
            registry
                .get_or_create(SessionId(id), VoiceChannelId(id * 10))
                .ensure_connected()
                .await
                .unwrap();
        }
        registry.shutdown_all().await;

        assert!(registry.is_empty());
    }
}
