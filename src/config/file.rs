use crate::config::ServerConfig;
use crate::utils::error::{BookingError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerSection>,
    pub payments: Option<PaymentsSection>,
    pub sweeper: Option<SweeperSection>,
    pub notifications: Option<NotificationsSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    pub bind_addr: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsSection {
    pub gateway_url: Option<String>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperSection {
    pub pending_timeout_hours: Option<i64>,
    pub interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsSection {
    pub webhook_url: Option<String>,
}

impl FileConfig {
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Err(BookingError::ConfigError {
                message: format!("Config file not found: {}", path),
            });
        }

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| BookingError::ConfigError {
            message: format!("Failed to parse {}: {}", path, e),
        })
    }

    /// File values override flag/default values where present.
    pub fn apply_to(&self, config: &mut ServerConfig) {
        if let Some(server) = &self.server {
            if let Some(bind_addr) = &server.bind_addr {
                config.bind_addr = bind_addr.clone();
            }
        }
        if let Some(payments) = &self.payments {
            if let Some(url) = &payments.gateway_url {
                config.gateway_url = Some(url.clone());
            }
            if let Some(attempts) = payments.retry_attempts {
                config.gateway_retry_attempts = attempts;
            }
            if let Some(delay) = payments.retry_delay_ms {
                config.gateway_retry_delay_ms = delay;
            }
        }
        if let Some(sweeper) = &self.sweeper {
            if let Some(timeout) = sweeper.pending_timeout_hours {
                config.pending_timeout_hours = timeout;
            }
            if let Some(interval) = sweeper.interval_secs {
                config.sweep_interval_secs = interval;
            }
        }
        if let Some(notifications) = &self.notifications {
            if let Some(url) = &notifications.webhook_url {
                config.notify_url = Some(url.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_load_and_merge() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
bind_addr = "0.0.0.0:9000"

[payments]
gateway_url = "https://payments.example/api"
retry_attempts = 5

[sweeper]
pending_timeout_hours = 48
"#
        )
        .unwrap();

        let loaded = FileConfig::load(file.path().to_str().unwrap()).unwrap();
        let mut config = ServerConfig::parse_from(["slotbook"]);
        loaded.apply_to(&mut config);

        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(
            config.gateway_url.as_deref(),
            Some("https://payments.example/api")
        );
        assert_eq!(config.gateway_retry_attempts, 5);
        assert_eq!(config.pending_timeout_hours, 48);
        // Untouched values keep their defaults.
        assert_eq!(config.sweep_interval_secs, 300);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = FileConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, BookingError::ConfigError { .. }));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not [valid toml").unwrap();
        let err = FileConfig::load(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, BookingError::ConfigError { .. }));
    }
}
