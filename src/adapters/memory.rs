use crate::domain::model::{Account, BillablePeriod, Distributor, Invoice};
use crate::domain::ports::AccountStore;
use crate::utils::error::{JobError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Everything the job reads and writes, as one serializable value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub distributors: Vec<Distributor>,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub billable_periods: Vec<BillablePeriod>,
    #[serde(default)]
    pub invoices: Vec<Invoice>,
}

/// In-process `AccountStore`. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<LedgerSnapshot>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            state: Arc::new(Mutex::new(snapshot)),
        }
    }

    pub async fn snapshot(&self) -> LedgerSnapshot {
        self.state.lock().await.clone()
    }

    pub async fn insert_distributor(&self, distributor: Distributor) {
        self.state.lock().await.distributors.push(distributor);
    }

    pub async fn insert_account(&self, account: Account) {
        self.state.lock().await.accounts.push(account);
    }

    pub async fn insert_billable_period(&self, period: BillablePeriod) {
        self.state.lock().await.billable_periods.push(period);
    }

    pub async fn remove_billable_period(&self, id: Uuid) {
        self.state.lock().await.billable_periods.retain(|p| p.id != id);
    }

    pub async fn invoice(&self, id: Uuid) -> Option<Invoice> {
        let state = self.state.lock().await;
        state.invoices.iter().find(|i| i.id == id).cloned()
    }

    pub async fn invoices_for(&self, account_id: Uuid) -> Vec<Invoice> {
        let state = self.state.lock().await;
        state
            .invoices
            .iter()
            .filter(|i| i.account_id == account_id)
            .cloned()
            .collect()
    }

    pub async fn invoice_count(&self) -> usize {
        self.state.lock().await.invoices.len()
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn accounts(&self) -> Result<Vec<Account>> {
        Ok(self.state.lock().await.accounts.clone())
    }

    async fn find_distributor(&self, id: Uuid) -> Result<Option<Distributor>> {
        let state = self.state.lock().await;
        Ok(state.distributors.iter().find(|d| d.id == id).cloned())
    }

    async fn billable_periods(&self, account_id: Uuid) -> Result<Vec<BillablePeriod>> {
        let state = self.state.lock().await;
        Ok(state
            .billable_periods
            .iter()
            .filter(|p| p.owner_id == account_id)
            .cloned()
            .collect())
    }

    async fn invoice_for(
        &self,
        account_id: Uuid,
        window_start: DateTime<Utc>,
        distributor_id: Option<Uuid>,
    ) -> Result<Invoice> {
        let state = self.state.lock().await;
        let existing = state
            .invoices
            .iter()
            .find(|i| i.account_id == account_id && i.created_at == window_start);

        Ok(match existing {
            Some(invoice) => invoice.clone(),
            None => Invoice::draft(account_id, window_start, distributor_id),
        })
    }

    async fn save_invoice(&self, invoice: &mut Invoice) -> Result<()> {
        let mut state = self.state.lock().await;

        if let Some(slot) = state.invoices.iter_mut().find(|i| i.id == invoice.id) {
            invoice.mark_persisted();
            *slot = invoice.clone();
            return Ok(());
        }

        // 同一帳戶同一窗口只允許一張發票
        if let Some(other) = state
            .invoices
            .iter()
            .find(|i| i.account_id == invoice.account_id && i.created_at == invoice.created_at)
        {
            return Err(JobError::InvoiceConflict {
                account_id: invoice.account_id,
                created_at: invoice.created_at,
                existing_id: other.id,
            });
        }

        invoice.mark_persisted();
        state.invoices.push(invoice.clone());
        Ok(())
    }

    async fn destroy_invoice(&self, invoice_id: Uuid) -> Result<()> {
        self.state.lock().await.invoices.retain(|i| i.id != invoice_id);
        Ok(())
    }
}
