use thiserror::Error;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Invalid slot: {reason}")]
    InvalidSlot { reason: String },

    #[error("Slot is not available")]
    SlotUnavailable,

    #[error("Slot already held by another reservation")]
    SlotConflict,

    #[error("Payment was declined: {reason}")]
    PaymentDeclined { reason: String },

    #[error("Payment gateway unavailable: {reason}")]
    GatewayUnavailable { reason: String },

    #[error("Payment hold not found: {hold_id}")]
    HoldNotFound { hold_id: String },

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Reservation is not in the expected state: {reason}")]
    InvalidState { reason: String },

    #[error("Reservation not found: {id}")]
    NotFound { id: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Conflict,
    Payment,
    Transient,
    Authorization,
    Storage,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Expected rejection, caller picks another slot or retries later.
    Low,
    /// Transient, safe to retry.
    Medium,
    /// Request failed, state is consistent.
    High,
    /// Needs operator attention (config, storage).
    Critical,
}

impl BookingError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidSlot { .. } => ErrorCategory::Validation,
            Self::SlotUnavailable | Self::SlotConflict => ErrorCategory::Conflict,
            Self::PaymentDeclined { .. } | Self::HoldNotFound { .. } => ErrorCategory::Payment,
            Self::GatewayUnavailable { .. } | Self::HttpError(_) => ErrorCategory::Transient,
            Self::Forbidden { .. } => ErrorCategory::Authorization,
            Self::InvalidState { .. } | Self::NotFound { .. } => ErrorCategory::Validation,
            Self::StorageError { .. } => ErrorCategory::Storage,
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            Self::SerializationError(_) | Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidSlot { .. }
            | Self::SlotUnavailable
            | Self::SlotConflict
            | Self::PaymentDeclined { .. }
            | Self::Forbidden { .. }
            | Self::InvalidState { .. }
            | Self::NotFound { .. } => ErrorSeverity::Low,
            Self::GatewayUnavailable { .. } | Self::HttpError(_) => ErrorSeverity::Medium,
            Self::HoldNotFound { .. } | Self::SerializationError(_) | Self::IoError(_) => {
                ErrorSeverity::High
            }
            Self::StorageError { .. }
            | Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorSeverity::Critical,
        }
    }

    /// Whether the same request can be resubmitted safely.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::GatewayUnavailable { .. } | Self::HttpError(_))
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Validation => "Check the day, hour and span against the operating window",
            ErrorCategory::Conflict => "Pick another slot or try again later",
            ErrorCategory::Payment => "Use a different payment method",
            ErrorCategory::Transient => "Retry the request after a short delay",
            ErrorCategory::Authorization => "Verify the acting account owns this reservation",
            ErrorCategory::Storage => "Check datastore connectivity",
            ErrorCategory::Configuration => "Fix the configuration and restart",
            ErrorCategory::System => "Inspect the server logs",
        }
    }

    /// Stable message safe to show to clients and providers.
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::InvalidSlot { reason } => format!("That slot is not valid: {}", reason),
            Self::SlotUnavailable | Self::SlotConflict => {
                "That slot has just been taken, please choose another".to_string()
            }
            Self::PaymentDeclined { .. } => "Your payment was declined".to_string(),
            Self::GatewayUnavailable { .. } | Self::HttpError(_) => {
                "Payments are temporarily unavailable, please retry".to_string()
            }
            Self::Forbidden { .. } => "You are not allowed to act on this reservation".to_string(),
            Self::InvalidState { .. } => "This reservation has already been resolved".to_string(),
            Self::NotFound { .. } => "Reservation not found".to_string(),
            _ => "Something went wrong, please try again".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BookingError>;
