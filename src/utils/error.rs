use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("InvalidJobSettings: {reason}")]
    InvalidJobSettings { reason: String },

    #[error("Obsolete Adjustments: removed {count} from invoice {invoice_id}")]
    ObsoleteAdjustments { invoice_id: Uuid, count: usize },

    #[error("Empty Persisted Invoice: {invoice_id}")]
    EmptyPersistedInvoice { invoice_id: Uuid },

    #[error("Invoice conflict: account {account_id} already has invoice {existing_id} for {created_at}")]
    InvoiceConflict {
        account_id: Uuid,
        created_at: DateTime<Utc>,
        existing_id: Uuid,
    },

    #[error("Store error: {message}")]
    StoreError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

pub type Result<T> = std::result::Result<T, JobError>;

/// Stable tag for a reported error, independent of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidJobSettings,
    ObsoleteAdjustments,
    EmptyPersistedInvoice,
    InvoiceConflict,
    Store,
    Io,
    Serialization,
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Settings,
    Drift,
    Storage,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorKind {
    pub fn category(self) -> ErrorCategory {
        match self {
            ErrorKind::InvalidJobSettings => ErrorCategory::Settings,
            ErrorKind::ObsoleteAdjustments | ErrorKind::EmptyPersistedInvoice => {
                ErrorCategory::Drift
            }
            ErrorKind::InvoiceConflict | ErrorKind::Store | ErrorKind::Io => {
                ErrorCategory::Storage
            }
            ErrorKind::Serialization | ErrorKind::Config => ErrorCategory::Configuration,
        }
    }

    /// 嚴重程度: drift 已被處理，只需留意；設定錯誤會中止整個執行
    pub fn severity(self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Drift => ErrorSeverity::Low,
            ErrorCategory::Storage => ErrorSeverity::Medium,
            ErrorCategory::Settings => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    /// 根據錯誤嚴重程度決定退出碼
    pub fn exit_code(self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl JobError {
    pub fn invalid_settings(reason: impl Into<String>) -> Self {
        JobError::InvalidJobSettings {
            reason: reason.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        JobError::StoreError {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            JobError::InvalidJobSettings { .. } => ErrorKind::InvalidJobSettings,
            JobError::ObsoleteAdjustments { .. } => ErrorKind::ObsoleteAdjustments,
            JobError::EmptyPersistedInvoice { .. } => ErrorKind::EmptyPersistedInvoice,
            JobError::InvoiceConflict { .. } => ErrorKind::InvoiceConflict,
            JobError::StoreError { .. } => ErrorKind::Store,
            JobError::IoError(_) => ErrorKind::Io,
            JobError::SerializationError(_) => ErrorKind::Serialization,
            JobError::ConfigError { .. }
            | JobError::ConfigValidationError { .. }
            | JobError::InvalidConfigValueError { .. }
            | JobError::MissingConfigError { .. } => ErrorKind::Config,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind().category()
    }

    pub fn severity(&self) -> ErrorSeverity {
        self.kind().severity()
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.kind() {
            ErrorKind::InvalidJobSettings => {
                "Check accounts_distributor_id and the requested year/month"
            }
            ErrorKind::ObsoleteAdjustments => {
                "Investigate why billable periods changed after they were invoiced"
            }
            ErrorKind::EmptyPersistedInvoice => {
                "Investigate why an invoice existed for a window with no billable periods"
            }
            ErrorKind::InvoiceConflict => "Re-run the job; another run created the invoice first",
            ErrorKind::Store | ErrorKind::Io => "Check the ledger store is reachable and writable",
            ErrorKind::Serialization => "Check the ledger file is valid JSON",
            ErrorKind::Config => "Check the job configuration file",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            JobError::InvalidJobSettings { reason } => {
                format!("Job settings are invalid: {}", reason)
            }
            JobError::MissingConfigError { field } => {
                format!("Configuration is missing '{}'", field)
            }
            other => other.to_string(),
        }
    }
}
