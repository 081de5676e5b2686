use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use std::{sync::Arc, time::Duration};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use super::{
    session::{Notice, PlaybackSession, SessionState},
    transport::{SessionEvent, VoiceTransport},
};
use crate::sources::{ResolveError, SongResolver};

pub type SessionHandle = Arc<Mutex<PlaybackSession>>;

/// All playback sessions of the process, one per guild.
///
/// Entries are created on first use and never evicted; a disconnected
/// session only holds its volume.
pub struct SessionRegistry {
    sessions: DashMap<GuildId, SessionHandle>,
    transport: Arc<dyn VoiceTransport>,
    default_volume: f32,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionRegistry {
    /// Returns the registry and the receiving end of its event pump, to be
    /// handed to [`run_events`](Self::run_events).
    pub fn new(
        transport: Arc<dyn VoiceTransport>,
        default_volume: f32,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let registry = Arc::new(Self {
            sessions: DashMap::new(),
            transport,
            default_volume,
            events,
        });
        (registry, receiver)
    }

    pub fn get(&self, guild_id: GuildId) -> Option<SessionHandle> {
        self.sessions.get(&guild_id).map(|entry| entry.value().clone())
    }

    pub fn ensure(&self, guild_id: GuildId) -> SessionHandle {
        self.sessions
            .entry(guild_id)
            .or_insert_with(|| {
                debug!("Nueva sesión para guild {}", guild_id);
                Arc::new(Mutex::new(PlaybackSession::new(
                    guild_id,
                    self.default_volume,
                    self.transport.clone(),
                    self.events.clone(),
                )))
            })
            .value()
            .clone()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drains the event pump until every sender is gone.
    pub async fn run_events(self: Arc<Self>, mut receiver: mpsc::UnboundedReceiver<SessionEvent>) {
        info!("🎧 Bomba de eventos de reproducción iniciada");
        while let Some(event) = receiver.recv().await {
            self.dispatch(event).await;
        }
        info!("Bomba de eventos detenida");
    }

    pub async fn dispatch(&self, event: SessionEvent) -> Option<Notice> {
        match event {
            SessionEvent::TrackEnded {
                guild_id,
                generation,
            } => {
                let handle = self.get(guild_id)?;
                let mut session = handle.lock().await;
                let notice = session.on_track_end(generation).await;
                if let Some(notice) = &notice {
                    debug!("Continuación en guild {}: {}", guild_id, notice);
                }
                notice
            }
        }
    }

    /// Reacts to a change in the bot's voice channel; `humans` counts the
    /// non-bot members still in it.
    pub async fn handle_membership(&self, guild_id: GuildId, humans: usize) -> Option<Notice> {
        if humans > 0 {
            return None;
        }
        let handle = self.get(guild_id)?;
        let mut session = handle.lock().await;
        session.on_channel_emptied().await
    }

    /// Backs `/play`: joins `user_channel` if needed, resolves `query` with
    /// no lock held, then queues the song (at `position` when given).
    pub async fn enqueue_query(
        &self,
        guild_id: GuildId,
        user_channel: Option<ChannelId>,
        resolver: &dyn SongResolver,
        query: &str,
        position: Option<i64>,
        max_duration: Duration,
    ) -> Notice {
        let handle = self.ensure(guild_id);

        {
            let mut session = handle.lock().await;
            if session.state() == SessionState::Disconnected {
                let joined = session.join(user_channel).await;
                if !matches!(joined, Notice::Joined { .. }) {
                    return joined;
                }
            }
        }

        let song = match resolver.resolve(query, max_duration).await {
            Ok(song) => song,
            Err(e) => {
                warn!("No se pudo resolver {:?} en guild {}: {}", query, guild_id, e);
                return resolve_notice(e, query);
            }
        };

        let mut session = handle.lock().await;
        match position {
            Some(position) => session.enqueue_at(song, position).await,
            None => session.enqueue(song).await,
        }
    }

    /// Tears down every connected session. Returns whether any was.
    pub async fn shutdown_all(&self) -> bool {
        let handles: Vec<SessionHandle> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut cleaned = false;
        for handle in handles {
            let mut session = handle.lock().await;
            if session.is_connected() {
                session.leave().await;
                cleaned = true;
            }
        }

        if cleaned {
            info!("🧹 Todas las sesiones cerradas");
        }
        cleaned
    }
}

pub(crate) fn resolve_notice(error: ResolveError, query: &str) -> Notice {
    match error {
        ResolveError::DurationExceeded { limit } => Notice::TooLong {
            minutes: limit.as_secs() / 60,
        },
        ResolveError::NotFound(_) => Notice::NotFound {
            query: query.to_string(),
        },
        ResolveError::Backend(reason) => Notice::ResolveFailed { reason },
    }
}
