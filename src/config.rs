use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub command_prefix: String,

    // Lavalink
    pub lavalink_uri: String,
    pub lavalink_password: String,
    pub search_prefix: String,

    // Límites
    pub queue_page_size: usize,
    pub track_cache_size: usize,
}

impl Config {
    /// Loads `.env` (if present) and reads the configuration from the
    /// process environment.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, applying defaults for
    /// everything except the Discord token.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str, default: String| lookup(key).unwrap_or(default);

        let config = Self {
            discord_token: lookup("DISCORD_TOKEN")
                .context("DISCORD_TOKEN is required to start the bot")?,
            command_prefix: var("COMMAND_PREFIX", defaults.command_prefix),

            lavalink_uri: var("LAVALINK_URI", defaults.lavalink_uri),
            lavalink_password: var("LAVALINK_PASSWORD", defaults.lavalink_password),
            search_prefix: var("SEARCH_PREFIX", defaults.search_prefix),

            queue_page_size: var("QUEUE_PAGE_SIZE", defaults.queue_page_size.to_string())
                .parse()
                .context("QUEUE_PAGE_SIZE must be a number")?,
            track_cache_size: var("TRACK_CACHE_SIZE", defaults.track_cache_size.to_string())
                .parse()
                .context("TRACK_CACHE_SIZE must be a number")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - The Discord token and command prefix must not be empty
    /// - The Lavalink URI must be an `http`/`https` URL with a host
    /// - Page and cache sizes must be greater than 0
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("DISCORD_TOKEN is required to start the bot");
        }

        if self.command_prefix.trim().is_empty() {
            anyhow::bail!("Command prefix cannot be empty");
        }

        self.lavalink_url()?;

        if self.queue_page_size == 0 {
            anyhow::bail!("Queue page size must be greater than 0");
        }

        if self.track_cache_size == 0 {
            anyhow::bail!("Track cache size must be greater than 0");
        }

        Ok(())
    }

    pub fn lavalink_url(&self) -> Result<Url> {
        let url = Url::parse(&self.lavalink_uri)
            .with_context(|| format!("Invalid LAVALINK_URI: {}", self.lavalink_uri))?;

        match url.scheme() {
            "http" | "https" => {}
            other => anyhow::bail!("LAVALINK_URI must use http or https, got: {}", other),
        }
        if url.host_str().is_none() {
            anyhow::bail!("LAVALINK_URI has no host: {}", self.lavalink_uri);
        }

        Ok(url)
    }

    /// `host:port` of the Lavalink node, as `lavalink-rs` expects it.
    pub fn lavalink_address(&self) -> Result<String> {
        let url = self.lavalink_url()?;
        let host = url.host_str().unwrap_or_default();
        let port = url.port_or_known_default().unwrap_or(2333);
        Ok(format!("{}:{}", host, port))
    }

    pub fn lavalink_is_ssl(&self) -> bool {
        self.lavalink_uri.starts_with("https://")
    }

    /// Returns a summary of the current configuration for logging, without
    /// the token or the node password.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Commands: prefix '{}'\n  \
            Lavalink: {} (search: {})\n  \
            Limits: {} tracks per queue page, {} cached tracks",
            self.command_prefix,
            self.lavalink_uri,
            self.search_prefix,
            self.queue_page_size,
            self.track_cache_size,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (sin default para el token)
            discord_token: String::new(),
            command_prefix: "!".to_string(),

            lavalink_uri: "http://localhost:2333".to_string(),
            lavalink_password: "youshallnotpass".to_string(),
            search_prefix: "ytsearch".to_string(),

            queue_page_size: 10,
            track_cache_size: 256,
        }
    }
}
