//! Relay configuration: defaults plus environment overrides.

use std::str::FromStr;
use std::time::Duration;

use arena_room::RegistryConfig;
use arena_session::SessionConfig;

use crate::FighterLayout;

/// Everything the relay can be tuned with.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Listening address. Default: `0.0.0.0:8080`.
    pub bind_addr: String,
    /// The only path WebSocket upgrades are accepted on. Default: `/ws`.
    pub ws_path: String,
    /// How long a client gets to finish the WebSocket upgrade.
    pub handshake_timeout: Duration,
    pub rooms: RegistryConfig,
    pub sessions: SessionConfig,
    pub fighters: FighterLayout,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            ws_path: "/ws".to_string(),
            handshake_timeout: Duration::from_secs(10),
            rooms: RegistryConfig::default(),
            sessions: SessionConfig::default(),
            fighters: FighterLayout::default(),
        }
    }
}

impl RelayConfig {
    /// Defaults overridden by `ARENA_*` environment variables.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `ARENA_BIND_ADDR` | `bind_addr` |
    /// | `ARENA_WS_PATH` | `ws_path` |
    /// | `ARENA_ROOM_CODE_LEN` | `rooms.code_len` |
    /// | `ARENA_DEFAULT_NAME` | `sessions.default_name` |
    ///
    /// Empty values are ignored; unparsable ones are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(addr) = var("ARENA_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(path) = var("ARENA_WS_PATH") {
            config.ws_path = if path.starts_with('/') {
                path
            } else {
                format!("/{path}")
            };
        }
        if let Some(len) = var("ARENA_ROOM_CODE_LEN") {
            match parse::<usize>("ARENA_ROOM_CODE_LEN", &len) {
                Some(0) => tracing::warn!("ARENA_ROOM_CODE_LEN must be > 0, keeping default"),
                Some(n) => config.rooms.code_len = n,
                None => {}
            }
        }
        if let Some(name) = var("ARENA_DEFAULT_NAME") {
            config.sessions.default_name = name.trim().to_string();
        }

        config
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match value.trim().parse() {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(key, value, error = %e, "ignoring invalid environment value");
            None
        }
    }
}
