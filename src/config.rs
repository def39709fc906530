//! Server configuration loaded from the environment.

use std::time::Duration;

use crate::auth::AllowList;

/// Top-level server configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Display names permitted to play multiplayer
    pub allow_list: AllowList,
    /// How long an empty room survives before the sweep removes it
    pub room_timeout: Duration,
    /// Questions per single-player puzzle
    pub max_attempts: u32,
    /// Idle single-player sessions older than this are dropped
    pub solo_session_ttl: Duration,
    pub bind_addr: String,
    pub puzzles_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            allow_list: AllowList::open(),
            room_timeout: Duration::from_secs(3600),
            max_attempts: 10,
            solo_session_ttl: Duration::from_secs(24 * 3600),
            bind_addr: "0.0.0.0:5001".to_string(),
            puzzles_path: "data/puzzles.json".to_string(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            allow_list: AllowList::from_env(),
            room_timeout: env_parse("ROOM_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.room_timeout),
            max_attempts: env_parse("MAX_ATTEMPTS")
                .filter(|n: &u32| *n > 0)
                .unwrap_or(defaults.max_attempts),
            solo_session_ttl: env_parse("SOLO_SESSION_TTL")
                .map(Duration::from_secs)
                .unwrap_or(defaults.solo_session_ttl),
            bind_addr: std::env::var("BIND_ADDR")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.bind_addr),
            puzzles_path: std::env::var("PUZZLES_PATH")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.puzzles_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "ALLOWED_NAMES",
        "ROOM_TIMEOUT",
        "MAX_ATTEMPTS",
        "SOLO_SESSION_TTL",
        "BIND_ADDR",
        "PUZZLES_PATH",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_env() {
        clear_env();
        let config = AppConfig::from_env();

        assert!(!config.allow_list.is_restricted());
        assert_eq!(config.room_timeout, Duration::from_secs(3600));
        assert_eq!(config.max_attempts, 10);
        assert_eq!(config.bind_addr, "0.0.0.0:5001");
        assert_eq!(config.puzzles_path, "data/puzzles.json");
    }

    #[test]
    #[serial]
    fn test_overrides_from_env() {
        clear_env();
        std::env::set_var("ALLOWED_NAMES", "0104, 0624");
        std::env::set_var("ROOM_TIMEOUT", "60");
        std::env::set_var("MAX_ATTEMPTS", "5");
        std::env::set_var("BIND_ADDR", "127.0.0.1:9000");

        let config = AppConfig::from_env();
        clear_env();

        assert!(config.allow_list.is_allowed("0104"));
        assert!(config.allow_list.is_allowed("0624"));
        assert!(!config.allow_list.is_allowed("mallory"));
        assert_eq!(config.room_timeout, Duration::from_secs(60));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
    }

    #[test]
    #[serial]
    fn test_invalid_numbers_fall_back() {
        clear_env();
        std::env::set_var("ROOM_TIMEOUT", "soon");
        std::env::set_var("MAX_ATTEMPTS", "0");

        let config = AppConfig::from_env();
        clear_env();

        assert_eq!(config.room_timeout, Duration::from_secs(3600));
        assert_eq!(config.max_attempts, 10);
    }
}
