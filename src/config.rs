use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::trivia::Difficulty;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub addr: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub redis_url: String,
    pub session_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriviaConfig {
    pub base_url: String,
    pub api_path: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    pub questions_per_session: u32,
    pub category: Option<u32>,
    pub difficulty: Option<Difficulty>,
    pub reveal_delay_secs: u64,
    pub advance_delay_secs: u64,
    pub open_timeout_secs: u64,
}

impl GameConfig {
    pub fn reveal_delay(&self) -> Duration {
        Duration::from_secs(self.reveal_delay_secs)
    }

    pub fn advance_delay(&self) -> Duration {
        Duration::from_secs(self.advance_delay_secs)
    }

    pub fn open_timeout(&self) -> Duration {
        Duration::from_secs(self.open_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub trivia: TriviaConfig,
    pub game: GameConfig,
}

/// The `RUN_ENV` selecting `config/{env}`; `local` when unset.
pub fn run_env() -> String {
    env::var("RUN_ENV").unwrap_or_else(|_| "local".into())
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = run_env();

        let builder = ::config::Config::builder()
            .add_source(config::File::with_name("config/default.toml"))
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::File::with_name("config/local.toml").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_file_deserializes() {
        let config: Config = ::config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.database.backend, StoreBackend::Redis);
        assert_eq!(config.game.questions_per_session, 10);
        assert_eq!(config.game.reveal_delay(), Duration::from_secs(5));
        assert_eq!(config.game.advance_delay(), Duration::from_secs(5));
        assert!(config.game.difficulty.is_none());
    }

    #[test]
    #[serial]
    fn test_run_env_defaults_to_local() {
        let previous = env::var("RUN_ENV").ok();

        env::remove_var("RUN_ENV");
        assert_eq!(run_env(), "local");
        env::set_var("RUN_ENV", "staging");
        assert_eq!(run_env(), "staging");

        match previous {
            Some(value) => env::set_var("RUN_ENV", value),
            None => env::remove_var("RUN_ENV"),
        }
    }
}
