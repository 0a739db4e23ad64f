use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use danci_survey::SurveyConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    /// JSON word bank; synthetic questions are served when unset
    pub word_bank_path: Option<PathBuf>,
    /// JSON verified-word ledger keyed by learner id
    pub prior_ledger_path: Option<PathBuf>,
    pub question_time_limit_ms: u64,
    pub survey: SurveyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 3000,
            log_level: "info".to_string(),
            word_bank_path: None,
            prior_ledger_path: None,
            question_time_limit_ms: 15_000,
            survey: SurveyConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(defaults.port);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(defaults.host);

        let log_level = std::env::var("RUST_LOG").unwrap_or(defaults.log_level);

        let question_time_limit_ms = std::env::var("QUESTION_TIME_LIMIT_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(defaults.question_time_limit_ms);

        Self {
            host,
            port,
            log_level,
            word_bank_path: env_path("WORD_BANK_PATH"),
            prior_ledger_path: env_path("PRIOR_LEDGER_PATH"),
            question_time_limit_ms,
            survey: SurveyConfig::from_env(),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
