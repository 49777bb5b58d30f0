use crate::config::toml_config::TomlConfig;
use crate::utils::error::Result;
use crate::utils::validation::{validate_range, validate_required_field, Validate};
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "update-user-invoices")]
#[command(about = "Sync each account's draft invoice with its billable periods")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "invoice-sync.toml")]
    pub config: String,

    /// Override the ledger file from config
    #[arg(long)]
    pub store: Option<String>,

    /// Reconcile this year (requires --month)
    #[arg(long)]
    pub year: Option<i32>,

    /// Reconcile this month, 1-12 (requires --year)
    #[arg(long)]
    pub month: Option<u32>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Reconcile without writing the ledger back
    #[arg(long)]
    pub dry_run: bool,
}

impl CliConfig {
    /// 套用命令列覆蓋設定
    pub fn apply_overrides(&self, config: &mut TomlConfig) {
        if let Some(store) = &self.store {
            config.store.path = store.clone();
            tracing::info!("🔧 Store path overridden to: {}", store);
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if self.year.is_some() || self.month.is_some() {
            validate_required_field("--year", &self.year)?;
            let month = validate_required_field("--month", &self.month)?;
            validate_range("--month", *month, 1, 12)?;
        }
        Ok(())
    }
}
