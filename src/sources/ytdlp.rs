use async_process::Command;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::{ResolveError, SongResolver};
use crate::audio::Song;

/// Resolves URLs and free-text queries by shelling out to yt-dlp.
///
/// Only metadata is fetched here; the audio itself is streamed later by the
/// voice transport from [`Song::source`].
pub struct YtDlpResolver {
    binary: String,
    rate_limiter: tokio::sync::Semaphore,
}

/// Información extraída de yt-dlp
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: String,
    duration: Option<f64>,
    thumbnail: Option<String>,
    webpage_url: String,
    is_live: Option<bool>,
}

impl YtDlpResolver {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            // Limitar procesos concurrentes de yt-dlp
            rate_limiter: tokio::sync::Semaphore::new(3),
        }
    }

    /// `true` for absolute http(s) URLs; anything else is searched.
    pub fn is_url(query: &str) -> bool {
        Url::parse(query)
            .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
            .unwrap_or(false)
    }

    fn target(query: &str) -> String {
        if Self::is_url(query) {
            query.to_string()
        } else {
            format!("ytsearch1:{}", query)
        }
    }

    /// `yt-dlp --version`, the only external program the bot needs.
    pub async fn version(&self) -> Result<String, ResolveError> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .map_err(|e| ResolveError::Backend(format!("failed to run yt-dlp: {}", e)))?;

        if !output.status.success() {
            return Err(ResolveError::Backend(format!(
                "yt-dlp --version exited with {}",
                output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Runs yt-dlp on `target` and returns its stdout. Failures are reported
    /// against the user's `query`.
    async fn dump_json(&self, target: &str, query: &str) -> Result<String, ResolveError> {
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| ResolveError::Backend(e.to_string()))?;

        debug!("📊 Obteniendo info de: {}", target);

        let output = Command::new(&self.binary)
            .args(["--no-playlist", "--dump-json", "--no-warnings", target])
            .output()
            .await
            .map_err(|e| ResolveError::Backend(format!("failed to run yt-dlp: {}", e)))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            warn!("yt-dlp falló para {}: {}", target, error.trim());
            return Err(ResolveError::NotFound(query.to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn fetch_info(&self, query: &str) -> Result<YtDlpInfo, ResolveError> {
        let stdout = self.dump_json(&Self::target(query), query).await?;

        parse_info(&stdout).ok_or_else(|| ResolveError::NotFound(query.to_string()))
    }
}

/// First JSON document in yt-dlp's `--dump-json` output.
fn parse_info(stdout: &str) -> Option<YtDlpInfo> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .find_map(|line| serde_json::from_str::<YtDlpInfo>(line).ok())
}

/// Every entry of a `ytsearchN:` dump, one JSON document per line.
fn parse_results(stdout: &str) -> Vec<YtDlpInfo> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<YtDlpInfo>(line).ok())
        .collect()
}

fn info_to_song(info: YtDlpInfo) -> Song {
    Song::new(
        info.title,
        info.webpage_url.clone(),
        info.webpage_url,
        info.thumbnail.unwrap_or_default(),
    )
}

/// Builds a [`Song`] out of yt-dlp metadata, enforcing `max_duration`.
///
/// Live streams and entries without a duration are let through.
fn song_from_info(info: YtDlpInfo, max_duration: Duration) -> Result<Song, ResolveError> {
    if let Some(seconds) = info.duration {
        let duration = Duration::from_secs_f64(seconds.max(0.0));
        if duration > max_duration {
            warn!(
                "Video demasiado largo ({}): {}",
                humantime::format_duration(duration),
                info.title
            );
            return Err(ResolveError::DurationExceeded {
                limit: max_duration,
            });
        }
    } else if info.is_live.unwrap_or(false) {
        debug!("Transmisión en vivo sin duración: {}", info.title);
    }

    Ok(info_to_song(info))
}

#[async_trait]
impl SongResolver for YtDlpResolver {
    async fn resolve(&self, query: &str, max_duration: Duration) -> Result<Song, ResolveError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResolveError::NotFound(String::new()));
        }

        info!("🔍 Resolviendo: {}", query);
        let info = self.fetch_info(query).await?;
        song_from_info(info, max_duration)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Song>, ResolveError> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Err(ResolveError::NotFound(query.to_string()));
        }

        info!("🔍 Buscando en YouTube: {}", query);
        let stdout = self
            .dump_json(&format!("ytsearch{}:{}", limit, query), query)
            .await?;

        let results: Vec<Song> = parse_results(&stdout)
            .into_iter()
            .take(limit)
            .map(info_to_song)
            .collect();

        if results.is_empty() {
            return Err(ResolveError::NotFound(query.to_string()));
        }

        debug!("✅ {} resultados para: {}", results.len(), query);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const INFO: &str = r#"{"id":"abc","title":"Daft Punk - Veridis Quo","duration":345.0,"thumbnail":"https://i.ytimg.com/vi/abc/hq.jpg","webpage_url":"https://www.youtube.com/watch?v=abc","uploader":"Daft Punk"}"#;

    #[test]
    fn test_url_detection() {
        assert!(YtDlpResolver::is_url("https://www.youtube.com/watch?v=abc"));
        assert!(YtDlpResolver::is_url("http://youtu.be/abc"));
        assert!(!YtDlpResolver::is_url("daft punk veridis quo"));
        assert!(!YtDlpResolver::is_url("ftp://example.com/song.mp3"));
        assert!(!YtDlpResolver::is_url("youtube.com/watch?v=abc"));
    }

    #[test]
    fn test_queries_become_searches() {
        assert_eq!(YtDlpResolver::target("veridis quo"), "ytsearch1:veridis quo");
        assert_eq!(
            YtDlpResolver::target("https://youtu.be/abc"),
            "https://youtu.be/abc"
        );
    }

    #[test]
    fn test_song_from_info() {
        let info = parse_info(INFO).unwrap();
        let song = song_from_info(info, Duration::from_secs(3600)).unwrap();

        assert_eq!(song.title(), "Daft Punk - Veridis Quo");
        assert_eq!(song.url(), "https://www.youtube.com/watch?v=abc");
        assert_eq!(song.source(), song.url());
        assert_eq!(song.thumbnail(), "https://i.ytimg.com/vi/abc/hq.jpg");
    }

    #[test]
    fn test_song_too_long_is_rejected() {
        let info = parse_info(INFO).unwrap();
        let err = song_from_info(info, Duration::from_secs(300)).unwrap_err();

        assert_eq!(
            err,
            ResolveError::DurationExceeded {
                limit: Duration::from_secs(300)
            }
        );
    }

    #[test]
    fn test_missing_duration_and_thumbnail() {
        let info = parse_info(
            r#"{"title":"Radio","webpage_url":"https://example.com/live","is_live":true}"#,
        )
        .unwrap();
        let song = song_from_info(info, Duration::from_secs(60)).unwrap();

        assert_eq!(song.thumbnail(), "");
    }

    #[test]
    fn test_search_results_keep_ranking_order() {
        let dump = [
            r#"{"title":"First","duration":200.0,"thumbnail":"https://i.ytimg.com/vi/1/hq.jpg","webpage_url":"https://www.youtube.com/watch?v=1"}"#,
            "",
            r#"{"title":"Second","duration":7200.0,"webpage_url":"https://www.youtube.com/watch?v=2"}"#,
            "WARNING: something odd",
            r#"{"title":"Third","webpage_url":"https://www.youtube.com/watch?v=3","thumbnail":"https://i.ytimg.com/vi/3/hq.jpg"}"#,
        ]
        .join("\n");

        let songs: Vec<Song> = parse_results(&dump).into_iter().map(info_to_song).collect();

        assert_eq!(
            songs.iter().map(|s| s.title()).collect::<Vec<_>>(),
            vec!["First", "Second", "Third"]
        );
        assert_eq!(songs[0].thumbnail(), "https://i.ytimg.com/vi/1/hq.jpg");
        assert_eq!(songs[1].thumbnail(), "");
        assert_eq!(songs[2].url(), "https://www.youtube.com/watch?v=3");
    }

    #[tokio::test]
    async fn test_version_only_needs_the_binary() {
        assert!(YtDlpResolver::new("true").version().await.is_ok());
        assert!(matches!(
            YtDlpResolver::new("false").version().await,
            Err(ResolveError::Backend(_))
        ));
        assert!(YtDlpResolver::new("/nonexistent/yt-dlp").version().await.is_err());
    }

    #[test]
    fn test_parse_skips_noise() {
        assert!(parse_info("").is_none());
        assert!(parse_info("not json\n").is_none());
        assert!(parse_info(&format!("\n{}\n", INFO)).is_some());
    }
}
