pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::{
    ledger_file::LedgerFile,
    memory::{InMemoryStore, LedgerSnapshot},
    sink::{CollectingErrorSink, TracingErrorSink},
};
pub use crate::core::{
    cleanup::InvoiceCleanup,
    gate::ConfigGate,
    job::{RunStatus, RunSummary, UpdateUserInvoices},
    reconciler::UserInvoiceReconciler,
    window::PeriodWindowResolver,
};
pub use utils::error::{JobError, Result};
