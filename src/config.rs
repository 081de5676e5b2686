use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub guild_id: Option<u64>, // Para comandos de desarrollo

    // Audio
    pub default_volume: f32,

    // Límites
    pub max_song_duration: u64, // En segundos

    // yt-dlp
    pub ytdlp_path: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any variable source. `load` passes the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let config = Self {
            // Discord
            discord_token: var("DISCORD_TOKEN").context("DISCORD_TOKEN no está definido")?,
            guild_id: var("GUILD_ID")
                .map(|value| value.trim().parse::<u64>())
                .transpose()
                .context("GUILD_ID inválido")?,

            // Audio
            default_volume: var("DEFAULT_VOLUME")
                .map(|value| value.trim().parse::<f32>())
                .transpose()
                .context("DEFAULT_VOLUME inválido")?
                .unwrap_or(defaults.default_volume),

            // Límites
            max_song_duration: var("MAX_SONG_DURATION")
                .map(|value| value.trim().parse::<u64>())
                .transpose()
                .context("MAX_SONG_DURATION inválido")?
                .unwrap_or(defaults.max_song_duration),

            ytdlp_path: var("YTDLP_PATH").unwrap_or(defaults.ytdlp_path),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// - Volume must be between 0.0 and 1.0
    /// - Max song duration must be greater than 0
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.default_volume) {
            anyhow::bail!(
                "Default volume must be between 0.0 and 1.0, got: {}",
                self.default_volume
            );
        }

        if self.max_song_duration == 0 {
            anyhow::bail!("Max song duration must be greater than 0");
        }

        Ok(())
    }

    pub fn max_song_duration(&self) -> Duration {
        Duration::from_secs(self.max_song_duration)
    }

    /// Returns a summary of the current configuration for logging,
    /// without the token.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: Guild {}\n  \
            Audio: {}% vol\n  \
            Limits: {} max duration\n  \
            Resolver: {}",
            self.guild_id
                .map_or("global".to_string(), |id| id.to_string()),
            (self.default_volume * 100.0).round() as u32,
            humantime::format_duration(self.max_song_duration()),
            self.ytdlp_path,
        )
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),
            guild_id: None,

            default_volume: 0.5,
            max_song_duration: 3600, // 1 hora

            ytdlp_path: "yt-dlp".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_apply() {
        let config = Config::from_lookup(lookup(&[("DISCORD_TOKEN", "abc")])).unwrap();

        assert_eq!(config.discord_token, "abc");
        assert_eq!(config.guild_id, None);
        assert_eq!(config.default_volume, 0.5);
        assert_eq!(config.max_song_duration(), Duration::from_secs(3600));
        assert_eq!(config.ytdlp_path, "yt-dlp");
    }

    #[test]
    fn test_token_is_required() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("DISCORD_TOKEN", "  ")])).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "abc"),
            ("GUILD_ID", "1234"),
            ("DEFAULT_VOLUME", "0.25"),
            ("MAX_SONG_DURATION", "600"),
            ("YTDLP_PATH", "/usr/local/bin/yt-dlp"),
        ]))
        .unwrap();

        assert_eq!(config.guild_id, Some(1234));
        assert_eq!(config.default_volume, 0.25);
        assert_eq!(config.max_song_duration, 600);
        assert_eq!(config.ytdlp_path, "/usr/local/bin/yt-dlp");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for (key, value) in [
            ("DEFAULT_VOLUME", "1.5"),
            ("DEFAULT_VOLUME", "loud"),
            ("MAX_SONG_DURATION", "0"),
            ("GUILD_ID", "general"),
        ] {
            let result = Config::from_lookup(lookup(&[("DISCORD_TOKEN", "abc"), (key, value)]));
            assert!(result.is_err(), "{key}={value} should be rejected");
        }
    }

    #[test]
    fn test_summary_hides_token() {
        let config = Config {
            discord_token: "secret-token".to_string(),
            ..Config::default()
        };

        let summary = config.summary();
        assert!(!summary.contains("secret-token"));
        assert!(summary.contains("50% vol"));
        assert!(summary.contains("1h"));
    }
}
