//! Per-guild playback state machine.
//!
//! A [`PlaybackSession`] is only ever touched under its registry mutex, so
//! every method takes `&mut self` and runs to completion before the next
//! command (or track-end event) for the same guild is looked at.

use serenity::model::id::{ChannelId, GuildId};
use std::{fmt, sync::Arc};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{
    queue::{MoveOutcome, QueueError, RemoveOutcome, SongQueue},
    song::Song,
    transport::{SessionEvent, TrackEndNotice, VoiceTransport},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Idle,
    Playing,
    Paused,
}

/// What a session operation tells the user. Session methods never fail,
/// they always end up here.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    NotConnected,
    NotInVoice,
    Joined { channel: ChannelId },
    AlreadyConnected { channel: ChannelId },
    ConnectedElsewhere { channel: ChannelId },
    ConnectFailed { reason: String },
    Queued { song: Song },
    QueuedAt { song: Song, position: usize },
    InsertRejected { size: usize },
    NowPlaying { song: Song },
    SkippingTo { song: Song },
    QueueEmpty,
    PlaybackFailed { title: String, reason: String },
    ControlFailed { reason: String },
    Paused,
    Resumed,
    NotPaused,
    NothingPlaying,
    ResumingFromQueue(Box<Notice>),
    NothingToResume,
    Stopped,
    QueueClearedIdle,
    Left { channel: ChannelId },
    CannotSkip,
    SkipOutOfRange,
    SkipEmptyQueue,
    Removal(RemoveOutcome),
    Moved(MoveOutcome),
    LeftInPlace,
    VolumeLevel { percent: u32 },
    VolumeChanged { percent: u32 },
    MoveNeedsVoice,
    AlreadyHere,
    ChannelOccupied,
    MovedTo { channel: ChannelId },
    TooLong { minutes: u64 },
    NotFound { query: String },
    ResolveFailed { reason: String },
    Internal,
}

impl Notice {
    /// `true` for notices that report a refusal or a failure.
    pub fn is_error(&self) -> bool {
        match self {
            Self::NotConnected
            | Self::NotInVoice
            | Self::ConnectedElsewhere { .. }
            | Self::ConnectFailed { .. }
            | Self::InsertRejected { .. }
            | Self::PlaybackFailed { .. }
            | Self::ControlFailed { .. }
            | Self::NotPaused
            | Self::NothingPlaying
            | Self::NothingToResume
            | Self::CannotSkip
            | Self::SkipOutOfRange
            | Self::SkipEmptyQueue
            | Self::MoveNeedsVoice
            | Self::AlreadyHere
            | Self::ChannelOccupied
            | Self::TooLong { .. }
            | Self::NotFound { .. }
            | Self::ResolveFailed { .. }
            | Self::Internal => true,
            Self::Removal(outcome) => !outcome.is_removed(),
            Self::Moved(outcome) => {
                matches!(outcome, MoveOutcome::Empty | MoveOutcome::OutOfRange { .. })
            }
            Self::ResumingFromQueue(inner) => inner.is_error(),
            _ => false,
        }
    }

    /// The song this notice is about, for thumbnails and links.
    pub fn song(&self) -> Option<&Song> {
        match self {
            Self::Queued { song }
            | Self::QueuedAt { song, .. }
            | Self::NowPlaying { song }
            | Self::SkippingTo { song } => Some(song),
            Self::ResumingFromQueue(inner) => inner.song(),
            _ => None,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "The bot is not connected to a voice channel."),
            Self::NotInVoice => write!(
                f,
                "You're not connected to a voice channel, join one first."
            ),
            Self::Joined { channel } => write!(f, "Joined <#{}>.", channel),
            Self::AlreadyConnected { channel } => {
                write!(f, "The bot is already connected to <#{}>.", channel)
            }
            Self::ConnectedElsewhere { channel } => write!(
                f,
                "The bot is already connected to <#{}>. You can try `/movehere` if that channel is empty.",
                channel
            ),
            Self::ConnectFailed { reason } => {
                write!(f, "Couldn't connect to the voice channel: {}", reason)
            }
            Self::Queued { song } => write!(f, "Queued: {}", song),
            Self::QueuedAt { song, position } => {
                write!(f, "Queued at position {}: {}", position, song)
            }
            Self::InsertRejected { size } => write!(
                f,
                "There's no song with that index! The queue has {} songs.",
                size
            ),
            Self::NowPlaying { song } => write!(f, "Now playing: {}", song),
            Self::SkippingTo { song } => write!(f, "Skipping to: {}", song),
            Self::QueueEmpty => write!(f, "The queue is empty, use `/play`."),
            Self::PlaybackFailed { title, reason } => {
                write!(f, "Couldn't play \"{}\": {}", title, reason)
            }
            Self::ControlFailed { reason } => write!(f, "Playback control failed: {}", reason),
            Self::Paused => write!(f, "Paused."),
            Self::Resumed => write!(f, "Resumed."),
            Self::NotPaused => write!(f, "The bot is not paused."),
            Self::NothingPlaying => write!(
                f,
                "The bot is not currently playing something, try `/play`."
            ),
            Self::ResumingFromQueue(inner) => write!(
                f,
                "The bot was not playing something, resuming from queue. {}",
                inner
            ),
            Self::NothingToResume => write!(
                f,
                "The bot was not playing something and the queue is empty."
            ),
            Self::Stopped => write!(f, "Stopped playback and cleared the queue."),
            Self::QueueClearedIdle => write!(
                f,
                "The bot is not playing anything at the moment, queue cleared."
            ),
            Self::Left { channel } => write!(f, "Left <#{}>.", channel),
            Self::CannotSkip => write!(f, "Can't skip, no song is currently playing or paused."),
            Self::SkipOutOfRange => write!(
                f,
                "There's no song with that index, try `/queue` to see the queue."
            ),
            Self::SkipEmptyQueue => write!(f, "The queue is empty, can't skip songs."),
            Self::Removal(RemoveOutcome::Removed(song)) => write!(f, "Removed: {}", song.title()),
            Self::Removal(outcome) => write!(f, "{}", outcome),
            Self::Moved(outcome) => write!(f, "{}", outcome),
            Self::LeftInPlace => write!(f, "Left song in place."),
            Self::VolumeLevel { percent } => {
                write!(f, "The current volume level is {}%", percent)
            }
            Self::VolumeChanged { percent } => write!(f, "Volume level changed to {}%", percent),
            Self::MoveNeedsVoice => write!(
                f,
                "You have to be on a voice channel to use this command."
            ),
            Self::AlreadyHere => write!(f, "The bot is already on this channel."),
            Self::ChannelOccupied => write!(
                f,
                "The bot's current channel is not empty, can't move it."
            ),
            Self::MovedTo { channel } => write!(f, "Moved the bot to <#{}>", channel),
            Self::TooLong { minutes } => write!(
                f,
                "The song is too long (> {} min), please try another link.",
                minutes
            ),
            Self::NotFound { query } => write!(f, "No results for \"{}\".", query),
            Self::ResolveFailed { reason } => write!(f, "Couldn't load that song: {}", reason),
            Self::Internal => write!(f, "Something went wrong, the player was reset."),
        }
    }
}

pub struct PlaybackSession {
    guild_id: GuildId,
    channel: Option<ChannelId>,
    /// `Some` exactly when `channel` is `Some`.
    queue: Option<SongQueue>,
    volume: f32,
    current: Option<Song>,
    paused: bool,
    /// Bumped on every play and every halt; track-end events carry it back.
    generation: u64,
    /// The transport was told to stop and nothing has been played since.
    transport_halted: bool,
    transport: Arc<dyn VoiceTransport>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("guild_id", &self.guild_id)
            .field("state", &self.state())
            .field("channel", &self.channel)
            .field("queued", &self.queue.as_ref().map(SongQueue::len))
            .field("volume", &self.volume)
            .field("generation", &self.generation)
            .finish()
    }
}

impl PlaybackSession {
    pub fn new(
        guild_id: GuildId,
        volume: f32,
        transport: Arc<dyn VoiceTransport>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            guild_id,
            channel: None,
            queue: None,
            volume,
            current: None,
            paused: false,
            generation: 0,
            transport_halted: false,
            transport,
            events,
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn state(&self) -> SessionState {
        match (&self.channel, &self.current) {
            (None, _) => SessionState::Disconnected,
            (Some(_), None) => SessionState::Idle,
            (Some(_), Some(_)) if self.paused => SessionState::Paused,
            (Some(_), Some(_)) => SessionState::Playing,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    pub fn channel(&self) -> Option<ChannelId> {
        self.channel
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn now_playing(&self) -> Option<&Song> {
        self.current.as_ref()
    }

    /// Upcoming songs in play order, `None` when there is no queue at all.
    pub fn queue_snapshot(&self) -> Option<Vec<Song>> {
        self.queue
            .as_ref()
            .map(|queue| queue.iter().cloned().collect())
    }

    /// Connects to `requested`, the caller's current voice channel.
    ///
    /// Never moves the bot: a session already connected elsewhere in this
    /// guild is reported, not relocated (see [`relocate`](Self::relocate)).
    pub async fn join(&mut self, requested: Option<ChannelId>) -> Notice {
        let Some(target) = requested else {
            return Notice::NotInVoice;
        };

        if let Some(channel) = self.channel {
            return if channel == target {
                Notice::AlreadyConnected { channel }
            } else {
                Notice::ConnectedElsewhere { channel }
            };
        }

        debug!("Conectando a {} en guild {}", target, self.guild_id);
        if let Err(e) = self.transport.connect(self.guild_id, target).await {
            warn!("No se pudo conectar a {} en guild {}: {}", target, self.guild_id, e);
            return Notice::ConnectFailed {
                reason: e.to_string(),
            };
        }

        self.channel = Some(target);
        self.queue = Some(SongQueue::new());
        self.current = None;
        self.paused = false;
        self.transport_halted = false;

        info!("🔊 Sesión iniciada en {} (guild {})", target, self.guild_id);
        Notice::Joined { channel: target }
    }

    /// Queues `song`; starts it right away when nothing is sounding.
    pub async fn enqueue(&mut self, song: Song) -> Notice {
        let Some(queue) = self.queue.as_mut() else {
            return Notice::NotConnected;
        };
        queue.push(song.clone());

        match self.state() {
            SessionState::Playing | SessionState::Paused => Notice::Queued { song },
            _ => self.play_next().await,
        }
    }

    /// Queues `song` at an explicit 1-based `position`, rejecting anything
    /// outside `[1, len + 1]`.
    pub async fn enqueue_at(&mut self, song: Song, position: i64) -> Notice {
        let Some(queue) = self.queue.as_mut() else {
            return Notice::NotConnected;
        };

        let position = match queue.insert_at(song.clone(), position) {
            Ok(position) => position,
            Err(QueueError::IndexOutOfRange { size, .. }) => {
                return Notice::InsertRejected { size };
            }
            Err(QueueError::EmptyQueue) => {
                return Notice::InsertRejected { size: 0 };
            }
        };

        match self.state() {
            SessionState::Playing | SessionState::Paused => Notice::QueuedAt { song, position },
            _ => self.play_next().await,
        }
    }

    /// Starts the song at the head of the queue.
    ///
    /// Whatever is active (even paused) is stopped first, so calling this while
    /// playing is a skip. With an empty queue the transport is stopped, once,
    /// and the session goes idle.
    pub async fn play_next(&mut self) -> Notice {
        let next = match self.queue.as_mut() {
            Some(queue) => queue.pop_front(),
            None => {
                error!(
                    "play_next sin cola en guild {}, reiniciando la sesión",
                    self.guild_id
                );
                self.teardown().await;
                return Notice::Internal;
            }
        };

        let Some(song) = next else {
            if !self.transport_halted {
                self.halt().await;
            }
            self.current = None;
            self.paused = false;
            info!("📭 Cola vacía en guild {}", self.guild_id);
            return Notice::QueueEmpty;
        };

        let skipping = self.current.is_some();
        if skipping {
            self.halt().await;
        }

        self.generation += 1;
        let on_end = TrackEndNotice::new(self.guild_id, self.generation, self.events.clone());

        match self
            .transport
            .play(self.guild_id, &song, self.volume, on_end)
            .await
        {
            Ok(()) => {
                info!("🎵 Reproduciendo: {} (guild {})", song.title(), self.guild_id);
                self.current = Some(song.clone());
                self.paused = false;
                self.transport_halted = false;

                if skipping {
                    Notice::SkippingTo { song }
                } else {
                    Notice::NowPlaying { song }
                }
            }
            Err(e) => {
                warn!("No se pudo reproducir {}: {}", song.title(), e);
                self.current = None;
                self.paused = false;
                Notice::PlaybackFailed {
                    title: song.title().to_string(),
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Natural end of the source started under `generation`. Anything older
    /// than the latest play or halt is ignored.
    pub async fn on_track_end(&mut self, generation: u64) -> Option<Notice> {
        if generation != self.generation || self.current.is_none() || self.queue.is_none() {
            debug!(
                "Fin de track obsoleto en guild {} (gen {} != {})",
                self.guild_id, generation, self.generation
            );
            return None;
        }

        self.current = None;
        self.paused = false;
        Some(self.play_next().await)
    }

    pub async fn pause(&mut self) -> Notice {
        match self.state() {
            SessionState::Disconnected => Notice::NotConnected,
            SessionState::Idle | SessionState::Paused => Notice::NothingPlaying,
            SessionState::Playing => match self.transport.pause(self.guild_id).await {
                Ok(()) => {
                    self.paused = true;
                    info!("⏸️ Reproducción pausada (guild {})", self.guild_id);
                    Notice::Paused
                }
                Err(e) => Notice::ControlFailed {
                    reason: e.to_string(),
                },
            },
        }
    }

    /// Resumes a paused song; when idle with songs waiting, restarts the queue.
    pub async fn resume(&mut self) -> Notice {
        match self.state() {
            SessionState::Disconnected => Notice::NotConnected,
            SessionState::Playing => Notice::NotPaused,
            SessionState::Paused => match self.transport.resume(self.guild_id).await {
                Ok(()) => {
                    self.paused = false;
                    info!("▶️ Reproducción reanudada (guild {})", self.guild_id);
                    Notice::Resumed
                }
                Err(e) => Notice::ControlFailed {
                    reason: e.to_string(),
                },
            },
            SessionState::Idle => {
                let waiting = self.queue.as_ref().is_some_and(|queue| !queue.is_empty());
                if waiting {
                    Notice::ResumingFromQueue(Box::new(self.play_next().await))
                } else {
                    Notice::NothingToResume
                }
            }
        }
    }

    /// Stops the current source and clears the queue. The session stays
    /// connected; [`leave`](Self::leave) is the full teardown.
    pub async fn stop(&mut self) -> Notice {
        if self.queue.is_none() {
            return Notice::NotConnected;
        }

        let was_playing = self.current.is_some();
        self.halt().await;

        if let Some(queue) = self.queue.as_mut() {
            queue.clear();
        }

        if was_playing {
            info!("⏹️ Reproducción detenida (guild {})", self.guild_id);
            Notice::Stopped
        } else {
            Notice::QueueClearedIdle
        }
    }

    pub async fn leave(&mut self) -> Notice {
        let Some(channel) = self.channel else {
            return Notice::NotConnected;
        };

        self.teardown().await;

        info!("👋 Sesión cerrada en {} (guild {})", channel, self.guild_id);
        Notice::Left { channel }
    }

    /// Everyone but bots left the channel: tear down like [`leave`](Self::leave).
    pub async fn on_channel_emptied(&mut self) -> Option<Notice> {
        if !self.is_connected() {
            return None;
        }
        info!("🚪 Canal vacío, saliendo (guild {})", self.guild_id);
        Some(self.leave().await)
    }

    /// Skips `count` songs counting the one sounding now.
    pub async fn skip(&mut self, count: i64) -> Notice {
        match self.state() {
            SessionState::Disconnected => return Notice::NotConnected,
            SessionState::Idle => return Notice::CannotSkip,
            SessionState::Playing | SessionState::Paused => {}
        }

        let Some(queue) = self.queue.as_mut() else {
            return Notice::SkipEmptyQueue;
        };

        // El siguiente play_next ya consume una canción
        match queue.skip(count.saturating_sub(1)) {
            Ok(()) => self.play_next().await,
            Err(QueueError::EmptyQueue) => Notice::SkipEmptyQueue,
            Err(QueueError::IndexOutOfRange { .. }) => Notice::SkipOutOfRange,
        }
    }

    /// Index 1 is the next song, never the one sounding.
    pub fn remove(&mut self, index: i64) -> Notice {
        match self.queue.as_mut() {
            Some(queue) => Notice::Removal(queue.remove(index)),
            None => Notice::NotConnected,
        }
    }

    pub fn move_song(&mut self, from: i64, to: i64) -> Notice {
        let Some(queue) = self.queue.as_mut() else {
            return Notice::NotConnected;
        };

        if from == to {
            return Notice::LeftInPlace;
        }

        Notice::Moved(queue.move_song(from, to))
    }

    /// `level` in `[0, 100]` sets the volume; anything else only reports it.
    pub fn set_volume(&mut self, level: i64) -> Notice {
        if !(0..=100).contains(&level) {
            return Notice::VolumeLevel {
                percent: (self.volume * 100.0).round() as u32,
            };
        }

        self.volume = level as f32 / 100.0;
        if self.current.is_some() {
            if let Err(e) = self.transport.set_gain(self.guild_id, self.volume) {
                warn!("No se pudo ajustar el volumen en guild {}: {}", self.guild_id, e);
            }
        }

        info!("🔊 Volumen ajustado a {}% (guild {})", level, self.guild_id);
        Notice::VolumeChanged {
            percent: level as u32,
        }
    }

    /// Moves the bot to `target` if its current channel has no users left.
    pub async fn relocate(&mut self, target: Option<ChannelId>, occupied: bool) -> Notice {
        let Some(channel) = self.channel else {
            return Notice::NotConnected;
        };
        let Some(target) = target else {
            return Notice::MoveNeedsVoice;
        };

        if channel == target {
            return Notice::AlreadyHere;
        }
        if occupied {
            return Notice::ChannelOccupied;
        }

        match self.transport.connect(self.guild_id, target).await {
            Ok(()) => {
                self.channel = Some(target);
                info!("📍 Movido de {} a {} (guild {})", channel, target, self.guild_id);
                Notice::MovedTo { channel: target }
            }
            Err(e) => Notice::ConnectFailed {
                reason: e.to_string(),
            },
        }
    }

    /// Invalidates the sounding source's callback and stops the transport.
    async fn halt(&mut self) {
        self.generation += 1;
        self.transport.stop(self.guild_id).await;
        self.transport_halted = true;
        self.current = None;
        self.paused = false;
    }

    /// Halts playback and drops the queue and the channel together, then
    /// disconnects if there was a channel.
    async fn teardown(&mut self) {
        self.halt().await;
        self.queue = None;
        if self.channel.take().is_some() {
            if let Err(e) = self.transport.disconnect(self.guild_id).await {
                warn!("Error al desconectar en guild {}: {}", self.guild_id, e);
            }
        }
    }
}
