//! # Audio Module
//!
//! Per-guild playback engine for Croissant Bot.
//!
//! ## Architecture
//!
//! ### [`queue`] - Queue Management
//! - Ordered list of upcoming songs, 1-based from the user's point of view
//! - Outcomes that carry the exact message shown to the user
//!
//! ### [`session`] - Playback Session
//! - `Disconnected` / `Idle` / `Playing` / `Paused` state machine
//! - Continuation: each finished song starts the next one
//! - Generation counter so a stopped or skipped song can't trigger a second start
//!
//! ### [`registry`] - Session Registry
//! - One `tokio::sync::Mutex<PlaybackSession>` per guild, created on demand
//! - Event pump that turns track-end notifications into `on_track_end` calls
//!
//! ### [`transport`] - Voice Transport
//! - `VoiceTransport` trait and its songbird implementation
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use croissant_bot::audio::{SessionRegistry, SongbirdTransport};
//! use croissant_bot::sources::YtDlpResolver;
//! use serenity::all::{ChannelId, GuildId};
//! use std::{sync::Arc, time::Duration};
//!
//! # async fn example(manager: Arc<songbird::Songbird>) {
//! let transport = Arc::new(SongbirdTransport::new(manager, reqwest::Client::new()));
//! let (registry, events) = SessionRegistry::new(transport, 0.5);
//! tokio::spawn(registry.clone().run_events(events));
//!
//! let resolver = YtDlpResolver::new("yt-dlp");
//! let notice = registry
//!     .enqueue_query(
//!         GuildId::new(1),
//!         Some(ChannelId::new(2)),
//!         &resolver,
//!         "daft punk veridis quo",
//!         None,
//!         Duration::from_secs(3600),
//!     )
//!     .await;
//! println!("{notice}");
//! # }
//! ```

pub mod queue;
pub mod registry;
pub mod session;
pub mod song;
pub mod transport;

pub use queue::{InsertPosition, MoveOutcome, QueueError, RemoveOutcome, SongQueue};
pub use registry::{SessionHandle, SessionRegistry};
pub use session::{Notice, PlaybackSession, SessionState};
pub use song::Song;
pub use transport::{SessionEvent, SongbirdTransport, TrackEndNotice, TransportError, VoiceTransport};
