use async_trait::async_trait;
use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    events::EventData,
    input::{Input, YoutubeDl},
    tracks::{Track, TrackHandle},
    Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::song::Song;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("not connected to a voice channel")]
    NotConnected,
    #[error("could not join the voice channel: {0}")]
    Join(String),
    #[error("could not start playback: {0}")]
    Playback(String),
    #[error("track control failed: {0}")]
    Control(String),
}

/// Messages posted to the registry's event pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A source finished. `generation` identifies which `play` it came from.
    TrackEnded { guild_id: GuildId, generation: u64 },
}

/// Completion hook handed to [`VoiceTransport::play`].
///
/// Firing it only posts a [`SessionEvent`]; the session is re-entered later
/// by the registry under its own lock.
#[derive(Debug, Clone)]
pub struct TrackEndNotice {
    guild_id: GuildId,
    generation: u64,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl TrackEndNotice {
    pub fn new(
        guild_id: GuildId,
        generation: u64,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            guild_id,
            generation,
            events,
        }
    }

    pub fn event(&self) -> SessionEvent {
        SessionEvent::TrackEnded {
            guild_id: self.guild_id,
            generation: self.generation,
        }
    }

    pub fn notify(&self) {
        if self.events.send(self.event()).is_err() {
            warn!(
                "Bomba de eventos cerrada, fin de track ignorado (guild {})",
                self.guild_id
            );
        }
    }
}

/// Voice side of a guild's playback. Keyed by guild, like songbird's manager.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), TransportError>;

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), TransportError>;

    /// Starts `song` at `volume` and fires `on_end` once it stops for any reason.
    async fn play(
        &self,
        guild_id: GuildId,
        song: &Song,
        volume: f32,
        on_end: TrackEndNotice,
    ) -> Result<(), TransportError>;

    /// Stops whatever is sounding. Never fails: nothing to stop is fine.
    async fn stop(&self, guild_id: GuildId);

    async fn pause(&self, guild_id: GuildId) -> Result<(), TransportError>;

    async fn resume(&self, guild_id: GuildId) -> Result<(), TransportError>;

    fn set_gain(&self, guild_id: GuildId, volume: f32) -> Result<(), TransportError>;
}

/// [`VoiceTransport`] over songbird, streaming each song's source through yt-dlp.
pub struct SongbirdTransport {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    current_tracks: DashMap<GuildId, TrackHandle>,
}

impl SongbirdTransport {
    pub fn new(manager: Arc<Songbird>, http: reqwest::Client) -> Self {
        Self {
            manager,
            http,
            current_tracks: DashMap::new(),
        }
    }

    fn track(&self, guild_id: GuildId) -> Result<TrackHandle, TransportError> {
        self.current_tracks
            .get(&guild_id)
            .map(|track| track.clone())
            .ok_or(TransportError::NotConnected)
    }
}

/// Track with its end handler already in its local event store, so there is
/// no window where a sounding track cannot report its end.
fn armed_track(input: Input, volume: f32, on_end: TrackEndNotice) -> Track {
    let mut track = Track::new(input).volume(volume);
    track.events.add_event(
        EventData::new(Event::Track(TrackEvent::End), TrackEndHandler { notice: on_end }),
        Duration::ZERO,
    );
    track
}

#[async_trait]
impl VoiceTransport for SongbirdTransport {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), TransportError> {
        self.manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| TransportError::Join(e.to_string()))?;

        info!("🔊 Conectado al canal de voz {} en guild {}", channel_id, guild_id);
        Ok(())
    }

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), TransportError> {
        self.current_tracks.remove(&guild_id);
        self.manager
            .remove(guild_id)
            .await
            .map_err(|e| TransportError::Join(e.to_string()))?;

        info!("👋 Desconectado del canal de voz en guild {}", guild_id);
        Ok(())
    }

    async fn play(
        &self,
        guild_id: GuildId,
        song: &Song,
        volume: f32,
        on_end: TrackEndNotice,
    ) -> Result<(), TransportError> {
        let call = self
            .manager
            .get(guild_id)
            .ok_or(TransportError::NotConnected)?;

        let input: Input = YoutubeDl::new(self.http.clone(), song.source().to_string()).into();
        let track = armed_track(input, volume, on_end);

        let track_handle = {
            let mut handler = call.lock().await;
            handler.play(track)
        };

        self.current_tracks.insert(guild_id, track_handle);
        Ok(())
    }

    async fn stop(&self, guild_id: GuildId) {
        if let Some((_, track)) = self.current_tracks.remove(&guild_id) {
            let _ = track.stop();
        }
    }

    async fn pause(&self, guild_id: GuildId) -> Result<(), TransportError> {
        self.track(guild_id)?
            .pause()
            .map_err(|e| TransportError::Control(e.to_string()))
    }

    async fn resume(&self, guild_id: GuildId) -> Result<(), TransportError> {
        self.track(guild_id)?
            .play()
            .map_err(|e| TransportError::Control(e.to_string()))
    }

    fn set_gain(&self, guild_id: GuildId, volume: f32) -> Result<(), TransportError> {
        self.track(guild_id)?
            .set_volume(volume)
            .map_err(|e| TransportError::Control(e.to_string()))
    }
}

/// Handler para cuando termina una canción
struct TrackEndHandler {
    notice: TrackEndNotice,
}

#[async_trait]
impl VoiceEventHandler for TrackEndHandler {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        debug!("Track terminado, notificando a la sesión...");
        self.notice.notify();
        None
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::sync::Mutex;

    /// Records every call; `play` keeps the notice so tests can finish tracks.
    #[derive(Default)]
    pub(crate) struct FakeTransport {
        pub connects: Mutex<Vec<(GuildId, ChannelId)>>,
        pub disconnects: Mutex<Vec<GuildId>>,
        pub plays: Mutex<Vec<(String, f32, TrackEndNotice)>>,
        pub stops: Mutex<usize>,
        pub pauses: Mutex<usize>,
        pub resumes: Mutex<usize>,
        pub gains: Mutex<Vec<f32>>,
        pub fail_connect: Mutex<bool>,
        pub fail_play: Mutex<bool>,
    }

    impl FakeTransport {
        pub fn played_titles(&self) -> Vec<String> {
            self.plays
                .lock()
                .unwrap()
                .iter()
                .map(|(title, _, _)| title.clone())
                .collect()
        }

        pub fn last_notice(&self) -> TrackEndNotice {
            self.plays.lock().unwrap().last().unwrap().2.clone()
        }

        pub fn stop_count(&self) -> usize {
            *self.stops.lock().unwrap()
        }
    }

    #[async_trait]
    impl VoiceTransport for FakeTransport {
        async fn connect(
            &self,
            guild_id: GuildId,
            channel_id: ChannelId,
        ) -> Result<(), TransportError> {
            if *self.fail_connect.lock().unwrap() {
                return Err(TransportError::Join("timed out".to_string()));
            }
            self.connects.lock().unwrap().push((guild_id, channel_id));
            Ok(())
        }

        async fn disconnect(&self, guild_id: GuildId) -> Result<(), TransportError> {
            self.disconnects.lock().unwrap().push(guild_id);
            Ok(())
        }

        async fn play(
            &self,
            _guild_id: GuildId,
            song: &Song,
            volume: f32,
            on_end: TrackEndNotice,
        ) -> Result<(), TransportError> {
            if *self.fail_play.lock().unwrap() {
                return Err(TransportError::Playback("codec unavailable".to_string()));
            }
            self.plays
                .lock()
                .unwrap()
                .push((song.title().to_string(), volume, on_end));
            Ok(())
        }

        async fn stop(&self, _guild_id: GuildId) {
            *self.stops.lock().unwrap() += 1;
        }

        async fn pause(&self, _guild_id: GuildId) -> Result<(), TransportError> {
            *self.pauses.lock().unwrap() += 1;
            Ok(())
        }

        async fn resume(&self, _guild_id: GuildId) -> Result<(), TransportError> {
            *self.resumes.lock().unwrap() += 1;
            Ok(())
        }

        fn set_gain(&self, _guild_id: GuildId, volume: f32) -> Result<(), TransportError> {
            self.gains.lock().unwrap().push(volume);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notice_posts_track_ended_event() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notice = TrackEndNotice::new(GuildId::new(7), 3, tx);

        notice.notify();

        assert_eq!(
            rx.recv().await,
            Some(SessionEvent::TrackEnded {
                guild_id: GuildId::new(7),
                generation: 3
            })
        );
    }

    #[test]
    fn test_tracks_carry_end_handler_before_playing() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let input: Input =
            YoutubeDl::new(reqwest::Client::new(), "https://example.com/a".to_string()).into();

        let track = armed_track(input, 0.3, TrackEndNotice::new(GuildId::new(7), 1, tx));

        assert!((track.volume - 0.3).abs() < f32::EPSILON);
        assert!(format!("{:?}", track.events).contains("Track(End)"));
    }

    #[test]
    fn test_notice_with_closed_pump_does_not_panic() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        TrackEndNotice::new(GuildId::new(7), 1, tx).notify();
    }
}
