use std::{env, time::Duration};

use crate::{api::DEFAULT_API_BASE, errors::Error, Result};

/// Hard upper bound the Bot API accepts for `getUpdates.limit`.
pub const MAX_POLL_LIMIT: u32 = 256;

/// Gateway configuration.
///
/// Everything is injected by the caller; the core never reads the environment on
/// its own. [`ServerConfig::from_env`] exists for the bootstrap binary.
#[derive(Clone)]
pub struct ServerConfig {
    pub token: String,
    pub proxy: Option<String>,
    pub api_base: String,

    // Polling
    pub poll_limit: u32,
    pub long_poll_timeout: Duration,

    // Transport
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl ServerConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            proxy: None,
            api_base: DEFAULT_API_BASE.to_string(),
            poll_limit: MAX_POLL_LIMIT,
            long_poll_timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(5),
            user_agent: concat!("reactor/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into()).filter(|p: &String| !p.trim().is_empty());
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(Error::Config("bot token must not be empty".to_string()));
        }
        if self.api_base.trim().is_empty() {
            return Err(Error::Config("api base URL must not be empty".to_string()));
        }
        if self.poll_limit == 0 || self.poll_limit > MAX_POLL_LIMIT {
            return Err(Error::Config(format!(
                "poll limit must be within 1..={MAX_POLL_LIMIT}, got {}",
                self.poll_limit
            )));
        }
        Ok(())
    }

    /// Build from `REACTOR_*` environment variables (a `.env` file is honored).
    pub fn from_env() -> Result<Self> {
        // A missing .env is fine; existing variables are never overridden.
        let _ = dotenvy::dotenv();

        let token = env_str("REACTOR_BOT_TOKEN").unwrap_or_default();
        if token.trim().is_empty() {
            return Err(Error::Config(
                "REACTOR_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let mut cfg = Self::new(token);
        if let Some(proxy) = env_str("REACTOR_PROXY") {
            cfg = cfg.with_proxy(proxy);
        }
        if let Some(base) = env_str("REACTOR_API_BASE").and_then(non_empty) {
            cfg = cfg.with_api_base(base);
        }
        if let Some(limit) = env_u32("REACTOR_POLL_LIMIT") {
            cfg.poll_limit = limit;
        }
        if let Some(secs) = env_u64("REACTOR_LONG_POLL_TIMEOUT_SECS") {
            cfg.long_poll_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("REACTOR_CONNECT_TIMEOUT_SECS") {
            cfg.connect_timeout = Duration::from_secs(secs);
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("token", &"<redacted>")
            .field("proxy", &self.proxy)
            .field("api_base", &self.api_base)
            .field("poll_limit", &self.poll_limit)
            .field("long_poll_timeout", &self.long_poll_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
