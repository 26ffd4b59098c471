use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    audio::{
        node::AudioNode,
        queue::{QueuePage, SessionQueue},
        SessionId, Track, VoiceChannelId,
    },
    error::{PlaybackError, PlaybackResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Idle,
    Playing,
    Paused,
}

/// Result of [`PlaybackCoordinator::request_play`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The session was idle and the track started right away.
    Started(Track),
    /// Something is playing; the track waits at 1-based `position`.
    Queued { track: Track, position: usize },
}

/// What the coordinator did after the node reported the end of a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The next queued track is now playing. `failed` lists queued tracks
    /// the node refused to play on the way there.
    Started {
        track: Track,
        failed: Vec<(Track, PlaybackError)>,
    },
    /// The queue ran out and the session went idle.
    Finished { failed: Vec<(Track, PlaybackError)> },
    /// Already idle, or the notification was for a track that is no longer
    /// the current one.
    Ignored,
}

/// Read-only view used by the `queue` and `nowplaying` commands.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSnapshot {
    pub status: PlaybackStatus,
    pub now_playing: Option<Track>,
    pub page: QueuePage,
}

#[derive(Debug)]
struct SessionState {
    now_playing: Option<Track>,
    status: PlaybackStatus,
    queue: SessionQueue,
    connected: bool,
    /// Set once the coordinator failed to connect or was shut down. A
    /// closed coordinator never connects again.
    closed: bool,
}

impl SessionState {
    fn idle() -> Self {
        Self {
            now_playing: None,
            status: PlaybackStatus::Idle,
            queue: SessionQueue::new(),
            connected: false,
            closed: false,
        }
    }

    fn start(&mut self, track: Track) {
        self.now_playing = Some(track);
        self.status = PlaybackStatus::Playing;
        self.check_invariant();
    }

    fn go_idle(&mut self) {
        self.now_playing = None;
        self.status = PlaybackStatus::Idle;
        self.check_invariant();
    }

    fn check_invariant(&self) {
        debug_assert_eq!(
            self.status == PlaybackStatus::Idle,
            self.now_playing.is_none(),
            "status {:?} does not match now playing slot",
            self.status
        );
    }
}

/// Owns the playback state of one voice session.
///
/// All operations take the session lock and hold it across the node call
/// they make, so commands and track-end events for the same session run one
/// at a time and never observe a half-applied transition. Sessions never
/// share a lock.
///
/// Advancing the queue happens only in [`on_track_end`](Self::on_track_end):
/// [`skip`](Self::skip) just asks the node to stop and waits for the end
/// notification like a track that finished on its own.
pub struct PlaybackCoordinator {
    session_id: SessionId,
    voice_channel: VoiceChannelId,
    node: Arc<dyn AudioNode>,
    state: Mutex<SessionState>,
}

impl PlaybackCoordinator {
    pub(crate) fn new(
        session_id: SessionId,
        voice_channel: VoiceChannelId,
        node: Arc<dyn AudioNode>,
    ) -> Self {
        Self {
            session_id,
            voice_channel,
            node,
            state: Mutex::new(SessionState::idle()),
        }
    }

    pub fn voice_channel(&self) -> VoiceChannelId {
        self.voice_channel
    }

    pub async fn status(&self) -> PlaybackStatus {
        self.state.lock().await.status
    }

    pub async fn now_playing(&self) -> Option<Track> {
        self.state.lock().await.now_playing.clone()
    }

    pub async fn peek_upcoming(&self, n: usize) -> Vec<Track> {
        self.state.lock().await.queue.peek_upcoming(n)
    }

    /// Sets up the node-side player the first time it is called.
    ///
    /// A failed connect closes the coordinator: callers that were waiting
    /// for the lock get [`PlaybackError::NoSuchSession`] and must ask the
    /// registry for a fresh one.
    pub async fn ensure_connected(&self) -> PlaybackResult<()> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(PlaybackError::NoSuchSession(self.session_id));
        }
        if state.connected {
            return Ok(());
        }

        if let Err(e) = self
            .node
            .connect(self.session_id, self.voice_channel)
            .await
        {
            state.closed = true;
            return Err(PlaybackError::node(e));
        }
        state.connected = true;

        info!(
            "🔊 Sesión {} conectada al canal {}",
            self.session_id, self.voice_channel.0
        );
        Ok(())
    }

    /// Plays `track` if the session is idle, otherwise queues it.
    pub async fn request_play(&self, track: Track) -> PlaybackResult<PlayOutcome> {
        let mut state = self.state.lock().await;

        if state.status != PlaybackStatus::Idle {
            state.queue.enqueue(track.clone());
            let position = state.queue.len();
            return Ok(PlayOutcome::Queued { track, position });
        }

        self.node
            .play(self.session_id, &track)
            .await
            .map_err(PlaybackError::node)?;
        state.start(track.clone());

        info!("🎵 Reproduciendo en {}: {}", self.session_id, track.title);
        Ok(PlayOutcome::Started(track))
    }

    pub async fn pause(&self) -> PlaybackResult<()> {
        let mut state = self.state.lock().await;

        match state.status {
            PlaybackStatus::Idle => Err(PlaybackError::NothingPlaying),
            PlaybackStatus::Paused => Err(PlaybackError::AlreadyPaused),
            PlaybackStatus::Playing => {
                self.node
                    .pause(self.session_id)
                    .await
                    .map_err(PlaybackError::node)?;
                state.status = PlaybackStatus::Paused;
                info!("⏸️ Reproducción pausada en {}", self.session_id);
                Ok(())
            }
        }
    }

    pub async fn resume(&self) -> PlaybackResult<()> {
        let mut state = self.state.lock().await;

        match state.status {
            PlaybackStatus::Idle => Err(PlaybackError::NothingPlaying),
            PlaybackStatus::Playing => Err(PlaybackError::NotPaused),
            PlaybackStatus::Paused => {
                self.node
                    .resume(self.session_id)
                    .await
                    .map_err(PlaybackError::node)?;
                state.status = PlaybackStatus::Playing;
                info!("▶️ Reproducción reanudada en {}", self.session_id);
                Ok(())
            }
        }
    }

    /// Asks the node to stop the current track and returns it. The queue
    /// advances once the node reports the end of the track.
    pub async fn skip(&self) -> PlaybackResult<Track> {
        let state = self.state.lock().await;

        let current = state
            .now_playing
            .clone()
            .ok_or(PlaybackError::NothingPlaying)?;
        self.node
            .stop(self.session_id)
            .await
            .map_err(PlaybackError::node)?;

        debug!("⏭️ Stop solicitado para {} en {}", current.title, self.session_id);
        Ok(current)
    }

    /// Clears the queue and stops playback. Returns how many queued tracks
    /// were dropped.
    pub async fn stop_all(&self) -> PlaybackResult<usize> {
        let mut state = self.state.lock().await;

        let cleared = state.queue.len();
        state.queue.clear();

        self.node
            .stop(self.session_id)
            .await
            .map_err(PlaybackError::node)?;
        state.go_idle();

        info!(
            "⏹️ Reproducción detenida en {} ({} canciones descartadas)",
            self.session_id, cleared
        );
        Ok(cleared)
    }

    /// Handles a track-end notification without checking which track ended.
    pub async fn on_track_end(&self) -> Advance {
        let mut state = self.state.lock().await;
        self.advance(&mut state).await
    }

    /// Handles a track-end notification for the track identified by
    /// `source_ref`. Notifications for anything but the current track are
    /// ignored, which makes duplicates and late stop confirmations harmless.
    pub async fn on_track_end_of(&self, source_ref: &str) -> Advance {
        let mut state = self.state.lock().await;

        let is_current = state
            .now_playing
            .as_ref()
            .is_some_and(|current| current.source_ref == source_ref);
        if !is_current {
            debug!(
                "Fin de track obsoleto ignorado en {}: {}",
                self.session_id, source_ref
            );
            return Advance::Ignored;
        }

        self.advance(&mut state).await
    }

    async fn advance(&self, state: &mut SessionState) -> Advance {
        if state.status == PlaybackStatus::Idle {
            return Advance::Ignored;
        }

        let mut failed = Vec::new();
        loop {
            let next = match state.queue.dequeue_next() {
                Ok(next) => next,
                Err(_) => {
                    state.go_idle();
                    info!("📭 Cola agotada en {}", self.session_id);
                    return Advance::Finished { failed };
                }
            };

            match self.node.play(self.session_id, &next).await {
                Ok(()) => {
                    state.start(next.clone());
                    info!("➡️ Siguiente en {}: {}", self.session_id, next.title);
                    return Advance::Started {
                        track: next,
                        failed,
                    };
                }
                Err(e) => {
                    warn!(
                        "No se pudo reproducir {} en {}: {:#}",
                        next.title, self.session_id, e
                    );
                    failed.push((next, PlaybackError::node(e)));
                }
            }
        }
    }

    pub async fn snapshot(&self, page: usize, per_page: usize) -> QueueSnapshot {
        let state = self.state.lock().await;
        QueueSnapshot {
            status: state.status,
            now_playing: state.now_playing.clone(),
            page: state.queue.page(page, per_page),
        }
    }

    /// Drops all state and tears down the node-side player.
    pub(crate) async fn shutdown(&self) -> PlaybackResult<()> {
        let mut state = self.state.lock().await;

        state.closed = true;
        state.queue.clear();
        state.go_idle();

        if state.connected {
            state.connected = false;
            self.node
                .disconnect(self.session_id)
                .await
                .map_err(PlaybackError::node)?;
        }

        info!("👋 Sesión {} cerrada", self.session_id);
        Ok(())
    }
}
