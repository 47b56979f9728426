pub mod file;

use crate::utils::error::{BookingError, Result};
use crate::utils::validation::{validate_positive_number, validate_range, validate_url, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "slotbook")]
#[command(about = "Reservation coordinator for time-slotted service bookings")]
pub struct ServerConfig {
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub bind_addr: String,

    /// Payment gateway base URL. Without it the in-process sandbox
    /// gateway is used.
    #[arg(long)]
    pub gateway_url: Option<String>,

    /// Notification webhook endpoint. Without it outcomes are only logged.
    #[arg(long)]
    pub notify_url: Option<String>,

    /// Hours a reservation may sit pending before the sweeper expires it.
    #[arg(long, default_value = "24")]
    pub pending_timeout_hours: i64,

    #[arg(long, default_value = "300")]
    pub sweep_interval_secs: u64,

    #[arg(long, default_value = "3")]
    pub gateway_retry_attempts: u32,

    #[arg(long, default_value = "200")]
    pub gateway_retry_delay_ms: u64,

    /// Optional TOML file whose values override the flags above.
    #[arg(long)]
    pub config_file: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Emit JSON logs for aggregation instead of the compact console format.
    #[arg(long)]
    pub log_json: bool,
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<()> {
        if self.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(BookingError::InvalidConfigValueError {
                field: "bind_addr".to_string(),
                value: self.bind_addr.clone(),
                reason: "Not a valid socket address".to_string(),
            });
        }

        if let Some(url) = &self.gateway_url {
            validate_url("gateway_url", url)?;
        }
        if let Some(url) = &self.notify_url {
            validate_url("notify_url", url)?;
        }

        validate_range("pending_timeout_hours", self.pending_timeout_hours, 1, 168)?;
        validate_positive_number("sweep_interval_secs", self.sweep_interval_secs, 1)?;
        validate_range("gateway_retry_attempts", self.gateway_retry_attempts, 1, 10)?;

        Ok(())
    }
}
