use crate::domain::model::{Account, BillablePeriod, Distributor, GlobalConfig, Invoice};
use crate::utils::error::{JobError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Persistence for accounts, their billable periods and invoices.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn accounts(&self) -> Result<Vec<Account>>;

    async fn find_distributor(&self, id: Uuid) -> Result<Option<Distributor>>;

    /// Full listing for the account; callers filter by window.
    async fn billable_periods(&self, account_id: Uuid) -> Result<Vec<BillablePeriod>>;

    /// Find-or-build. Returns the invoice whose `created_at` equals
    /// `window_start`, or an unsaved draft pinned to it.
    async fn invoice_for(
        &self,
        account_id: Uuid,
        window_start: DateTime<Utc>,
        distributor_id: Option<Uuid>,
    ) -> Result<Invoice>;

    async fn save_invoice(&self, invoice: &mut Invoice) -> Result<()>;

    async fn destroy_invoice(&self, invoice_id: Uuid) -> Result<()>;
}

/// Fire-and-forget anomaly reporting. Never affects control flow.
pub trait ErrorSink: Send + Sync {
    fn notify(&self, error: &JobError, context: serde_json::Value);
}

pub trait ConfigProvider: Send + Sync {
    fn accounts_distributor_id(&self) -> Option<Uuid>;
    fn grace_period(&self) -> Duration;
    fn concurrent_accounts(&self) -> usize;
}

impl ConfigProvider for GlobalConfig {
    fn accounts_distributor_id(&self) -> Option<Uuid> {
        self.accounts_distributor_id
    }

    fn grace_period(&self) -> Duration {
        Duration::hours(crate::core::window::DEFAULT_GRACE_HOURS)
    }

    fn concurrent_accounts(&self) -> usize {
        1
    }
}
