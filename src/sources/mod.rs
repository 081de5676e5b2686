//! Song resolution: turning a URL or a free-text query into a [`Song`].

pub mod ytdlp;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::audio::Song;

pub use ytdlp::YtDlpResolver;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("song is longer than {}", humantime::format_duration(*.limit))]
    DurationExceeded { limit: Duration },
    #[error("no results for {0:?}")]
    NotFound(String),
    #[error("resolver failed: {0}")]
    Backend(String),
}

/// Metadata lookup used by `/play`. May hit the network, so it is always
/// awaited outside any session lock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SongResolver: Send + Sync {
    async fn resolve(&self, query: &str, max_duration: Duration) -> Result<Song, ResolveError>;

    /// Top `limit` YouTube results for `query`, in ranking order. Used by
    /// `/search` to offer alternatives when `/play` picks the wrong video.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Song>, ResolveError>;
}
