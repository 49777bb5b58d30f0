use crate::core::cleanup::{CleanupOutcome, InvoiceCleanup};
use crate::domain::model::{Account, BillablePeriod, PendingAdjustment, Window};
use crate::domain::ports::{AccountStore, ErrorSink};
use crate::utils::error::{JobError, Result};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Reconciled(CleanupOutcome),
    /// Reported and left untouched (key mismatch, completed invoice).
    Skipped,
    /// A collaborator failed; reported.
    Failed,
}

/// Periods overlapping the window, ordered by `begins_at` (stable).
pub fn select_billable_periods(periods: Vec<BillablePeriod>, window: &Window) -> Vec<BillablePeriod> {
    let mut selected: Vec<_> = periods
        .into_iter()
        .filter(|p| window.overlaps(p.begins_at, p.ends_at))
        .collect();
    selected.sort_by_key(|p| p.begins_at);
    selected
}

pub struct UserInvoiceReconciler<'a, S: AccountStore> {
    store: &'a S,
    sink: &'a dyn ErrorSink,
    distributor_id: Option<Uuid>,
}

impl<'a, S: AccountStore> UserInvoiceReconciler<'a, S> {
    pub fn new(store: &'a S, sink: &'a dyn ErrorSink, distributor_id: Option<Uuid>) -> Self {
        Self {
            store,
            sink,
            distributor_id,
        }
    }

    /// Never fails: every problem is reported to the sink.
    pub async fn reconcile(&self, account: &Account, window: &Window) -> ReconcileOutcome {
        let periods = match self.store.billable_periods(account.id).await {
            Ok(periods) => select_billable_periods(periods, window),
            Err(e) => {
                self.report(&e, account, window);
                return ReconcileOutcome::Failed;
            }
        };

        tracing::debug!(
            "Account {}: {} billable period(s) in window",
            account.id,
            periods.len()
        );

        self.update_invoice_for(account, window, &periods).await
    }

    pub async fn update_invoice_for(
        &self,
        account: &Account,
        window: &Window,
        periods: &[BillablePeriod],
    ) -> ReconcileOutcome {
        match self.try_update_invoice_for(account, window, periods).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.report(&e, account, window);
                ReconcileOutcome::Failed
            }
        }
    }

    async fn try_update_invoice_for(
        &self,
        account: &Account,
        window: &Window,
        periods: &[BillablePeriod],
    ) -> Result<ReconcileOutcome> {
        let mut invoice = self
            .store
            .invoice_for(account.id, window.start, self.distributor_id)
            .await?;

        if invoice.created_at != window.start {
            let error = JobError::invalid_settings(format!(
                "invoice {} was created at {}, expected {}",
                invoice.id, invoice.created_at, window.start
            ));
            self.report(&error, account, window);
            return Ok(ReconcileOutcome::Skipped);
        }

        if invoice.is_complete() {
            let error = JobError::invalid_settings(format!(
                "invoice {} is already complete",
                invoice.id
            ));
            self.report(&error, account, window);
            return Ok(ReconcileOutcome::Skipped);
        }

        let current: Vec<PendingAdjustment> = periods.iter().map(PendingAdjustment::from).collect();

        let outcome = InvoiceCleanup::new(self.store, self.sink)
            .clean_up_and_save(&mut invoice, &current)
            .await?;

        Ok(ReconcileOutcome::Reconciled(outcome))
    }

    fn report(&self, error: &JobError, account: &Account, window: &Window) {
        self.sink.notify(
            error,
            json!({
                "account_id": account.id,
                "window_start": window.start,
                "window_end": window.end,
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::adapters::sink::CollectingErrorSink;
    use crate::core::cleanup::InvoiceDisposition;
    use crate::domain::model::{Adjustment, AdjustmentSource, Distributor, Invoice};
    use crate::utils::error::ErrorKind;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    fn start_of_july() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()
    }

    fn july() -> Window {
        Window::new(start_of_july(), Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap())
    }

    fn period(owner: &Account, begins_at: DateTime<Utc>, days: i64, cents: i64, label: &str) -> BillablePeriod {
        BillablePeriod {
            id: Uuid::new_v4(),
            owner_id: owner.id,
            begins_at,
            ends_at: begins_at + Duration::days(days),
            bill: Decimal::new(cents, 2),
            label: label.to_string(),
        }
    }

    struct Fixture {
        store: InMemoryStore,
        sink: CollectingErrorSink,
        account: Account,
        distributor: Distributor,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let account = Account {
            id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
        };
        let distributor = Distributor {
            id: Uuid::new_v4(),
            name: "Accounts".to_string(),
        };
        store.insert_account(account.clone()).await;
        store.insert_distributor(distributor.clone()).await;
        Fixture {
            store,
            sink: CollectingErrorSink::new(),
            account,
            distributor,
        }
    }

    #[test]
    fn test_selection_excludes_period_ending_at_window_start() {
        let owner = Account {
            id: Uuid::new_v4(),
            email: String::new(),
        };
        let old = period(&owner, start_of_july() - Duration::days(30), 30, 100, "Old");
        let straddling = period(&owner, start_of_july() - Duration::days(2), 5, 100, "Straddle");
        let late = period(&owner, start_of_july() + Duration::days(12), 8, 100, "Late");
        let early = period(&owner, start_of_july(), 12, 100, "Early");
        let next = period(&owner, july().end, 3, 100, "Next");

        let selected = select_billable_periods(
            vec![late.clone(), old, next, early.clone(), straddling.clone()],
            &july(),
        );

        assert_eq!(selected, vec![straddling, early, late]);
    }

    #[tokio::test]
    async fn test_creates_adjustments_for_each_billing_item() {
        let f = fixture().await;
        let bp1 = period(&f.account, start_of_july(), 12, 12345, "BP1 Item");
        let bp2 = period(&f.account, start_of_july() + Duration::days(12), 8, 54321, "BP2 Item");

        let outcome = UserInvoiceReconciler::new(&f.store, &f.sink, Some(f.distributor.id))
            .update_invoice_for(&f.account, &july(), &[bp1.clone(), bp2.clone()])
            .await;

        assert!(matches!(
            outcome,
            ReconcileOutcome::Reconciled(CleanupOutcome {
                created: 2,
                disposition: InvoiceDisposition::Saved,
                ..
            })
        ));
        let invoices = f.store.invoices_for(f.account.id).await;
        assert_eq!(invoices.len(), 1);
        let invoice = &invoices[0];
        assert_eq!(invoice.created_at, start_of_july());
        assert_eq!(invoice.distributor_id, Some(f.distributor.id));

        let adjustments: Vec<_> = invoice.reconciled_adjustments().collect();
        assert_eq!(
            adjustments.iter().map(|a| a.source_id).collect::<Vec<_>>(),
            vec![Some(bp1.id), Some(bp2.id)]
        );
        assert_eq!(
            adjustments.iter().map(|a| a.amount).collect::<Vec<_>>(),
            vec![Decimal::new(12345, 2), Decimal::new(54321, 2)]
        );
        assert_eq!(
            adjustments.iter().map(|a| a.label.as_str()).collect::<Vec<_>>(),
            vec!["BP1 Item", "BP2 Item"]
        );
        assert_eq!(invoice.total(), Decimal::new(66666, 2));
        assert!(f.sink.kinds().is_empty());
    }

    /// Store whose find-or-create hands back a fixed invoice.
    struct MisKeyedStore {
        inner: InMemoryStore,
        invoice: Invoice,
    }

    #[async_trait::async_trait]
    impl AccountStore for MisKeyedStore {
        async fn accounts(&self) -> Result<Vec<Account>> {
            self.inner.accounts().await
        }

        async fn find_distributor(&self, id: Uuid) -> Result<Option<Distributor>> {
            self.inner.find_distributor(id).await
        }

        async fn billable_periods(&self, account_id: Uuid) -> Result<Vec<BillablePeriod>> {
            self.inner.billable_periods(account_id).await
        }

        async fn invoice_for(
            &self,
            _account_id: Uuid,
            _window_start: DateTime<Utc>,
            _distributor_id: Option<Uuid>,
        ) -> Result<Invoice> {
            Ok(self.invoice.clone())
        }

        async fn save_invoice(&self, invoice: &mut Invoice) -> Result<()> {
            self.inner.save_invoice(invoice).await
        }

        async fn destroy_invoice(&self, invoice_id: Uuid) -> Result<()> {
            self.inner.destroy_invoice(invoice_id).await
        }
    }

    #[tokio::test]
    async fn test_invoice_not_created_at_window_start_is_snagged() {
        let f = fixture().await;
        let mut invoice = Invoice::draft(f.account.id, start_of_july() + Duration::days(1), None);
        f.store.save_invoice(&mut invoice).await.unwrap();
        let store = MisKeyedStore {
            inner: f.store.clone(),
            invoice: invoice.clone(),
        };
        let bp1 = period(&f.account, start_of_july(), 12, 12345, "BP1 Item");

        let outcome = UserInvoiceReconciler::new(&store, &f.sink, Some(f.distributor.id))
            .update_invoice_for(&f.account, &july(), &[bp1])
            .await;

        assert_eq!(outcome, ReconcileOutcome::Skipped);
        assert_eq!(f.sink.kinds(), vec![ErrorKind::InvalidJobSettings]);
        let stored = f.store.invoice(invoice.id).await.unwrap();
        assert!(stored.adjustments.is_empty());
    }

    #[tokio::test]
    async fn test_completed_invoice_is_snagged_and_untouched() {
        let f = fixture().await;
        let existing = period(&f.account, start_of_july(), 12, 12345, "BP1 Item");
        let mut invoice = Invoice::draft(f.account.id, start_of_july(), Some(f.distributor.id));
        invoice.adjustments.push(Adjustment {
            id: Uuid::new_v4(),
            source_type: AdjustmentSource::BillablePeriod,
            source_id: Some(existing.id),
            amount: Decimal::new(100, 2),
            label: "Stale".to_string(),
        });
        invoice.complete(start_of_july() + Duration::days(2));
        f.store.save_invoice(&mut invoice).await.unwrap();

        let outcome = UserInvoiceReconciler::new(&f.store, &f.sink, Some(f.distributor.id))
            .update_invoice_for(&f.account, &july(), &[existing])
            .await;

        assert_eq!(outcome, ReconcileOutcome::Skipped);
        assert_eq!(f.sink.kinds(), vec![ErrorKind::InvalidJobSettings]);
        let stored = f.store.invoice(invoice.id).await.unwrap();
        assert_eq!(stored.adjustments, invoice.adjustments);
    }

    #[tokio::test]
    async fn test_reconcile_selects_periods_from_store() {
        let f = fixture().await;
        let old = period(&f.account, start_of_july() - Duration::days(30), 30, 66666, "Old Item");
        let bp1 = period(&f.account, start_of_july(), 12, 12345, "BP1 Item");
        f.store.insert_billable_period(old).await;
        f.store.insert_billable_period(bp1.clone()).await;

        let outcome = UserInvoiceReconciler::new(&f.store, &f.sink, Some(f.distributor.id))
            .reconcile(&f.account, &july())
            .await;

        assert!(matches!(outcome, ReconcileOutcome::Reconciled(_)));
        let invoices = f.store.invoices_for(f.account.id).await;
        let invoice = &invoices[0];
        let sources: Vec<_> = invoice.reconciled_adjustments().map(|a| a.source_id).collect();
        assert_eq!(sources, vec![Some(bp1.id)]);
    }
}
