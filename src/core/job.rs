use crate::core::cleanup::InvoiceDisposition;
use crate::core::gate::ConfigGate;
use crate::core::reconciler::{ReconcileOutcome, UserInvoiceReconciler};
use crate::core::window::PeriodWindowResolver;
use crate::domain::model::{Distributor, Window};
use crate::domain::ports::{AccountStore, ConfigProvider, ErrorSink};
use crate::utils::error::{ErrorKind, JobError, Result};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde_json::json;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// The run stopped before touching any account.
    Aborted(ErrorKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub status: RunStatus,
    pub window: Option<Window>,
    pub accounts_processed: usize,
    pub accounts_skipped: usize,
    pub accounts_failed: usize,
    pub invoices_saved: usize,
    pub invoices_destroyed: usize,
    pub invoices_discarded: usize,
    pub adjustments_created: usize,
    pub adjustments_updated: usize,
    pub adjustments_removed: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    fn new(status: RunStatus, window: Option<Window>, started: Instant) -> Self {
        Self {
            status,
            window,
            accounts_processed: 0,
            accounts_skipped: 0,
            accounts_failed: 0,
            invoices_saved: 0,
            invoices_destroyed: 0,
            invoices_discarded: 0,
            adjustments_created: 0,
            adjustments_updated: 0,
            adjustments_removed: 0,
            elapsed: started.elapsed(),
        }
    }

    fn record(&mut self, outcome: &ReconcileOutcome) {
        self.accounts_processed += 1;
        match outcome {
            ReconcileOutcome::Reconciled(cleanup) => {
                self.adjustments_created += cleanup.created;
                self.adjustments_updated += cleanup.updated;
                self.adjustments_removed += cleanup.removed;
                match cleanup.disposition {
                    InvoiceDisposition::Saved => self.invoices_saved += 1,
                    InvoiceDisposition::Destroyed => self.invoices_destroyed += 1,
                    InvoiceDisposition::Discarded => self.invoices_discarded += 1,
                }
            }
            ReconcileOutcome::Skipped => self.accounts_skipped += 1,
            ReconcileOutcome::Failed => self.accounts_failed += 1,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// Job entry point: gate, resolve the window, reconcile every account.
pub struct UpdateUserInvoices<S: AccountStore, C: ConfigProvider, E: ErrorSink> {
    store: S,
    config: C,
    sink: E,
}

impl<S: AccountStore, C: ConfigProvider, E: ErrorSink> UpdateUserInvoices<S, C, E> {
    pub fn new(store: S, config: C, sink: E) -> Self {
        Self {
            store,
            config,
            sink,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn perform(&self, year: Option<i32>, month: Option<u32>) -> RunSummary {
        self.perform_at(Utc::now(), year, month).await
    }

    pub async fn perform_at(
        &self,
        now: DateTime<Utc>,
        year: Option<i32>,
        month: Option<u32>,
    ) -> RunSummary {
        let started = Instant::now();
        tracing::info!("🚀 Starting invoice update run");

        let distributor = match ConfigGate::new(&self.store, &self.config).check().await {
            Ok(distributor) => distributor,
            Err(e) => return self.abort(e, None, started),
        };

        let resolver = PeriodWindowResolver::new(self.config.grace_period());
        let window = match resolver.resolve(now, year, month) {
            Ok(window) => window,
            Err(e) => return self.abort(e, None, started),
        };
        tracing::info!("📅 Billing window: {} .. {}", window.start, window.end);

        match self.reconcile_accounts(&distributor, &window, started).await {
            Ok(summary) => summary,
            Err(e) => self.abort(e, Some(window), started),
        }
    }

    async fn reconcile_accounts(
        &self,
        distributor: &Distributor,
        window: &Window,
        started: Instant,
    ) -> Result<RunSummary> {
        let accounts = self.store.accounts().await?;
        tracing::info!("👥 Reconciling {} account(s)", accounts.len());

        let reconciler = UserInvoiceReconciler::new(&self.store, &self.sink, Some(distributor.id));
        let reconciler = &reconciler;

        // 每個帳戶各自獨立；並行度由設定決定
        let outcomes: Vec<ReconcileOutcome> = stream::iter(accounts.iter())
            .map(move |account| reconciler.reconcile(account, window))
            .buffer_unordered(self.config.concurrent_accounts().max(1))
            .collect()
            .await;

        let mut summary = RunSummary::new(RunStatus::Completed, Some(*window), started);
        for outcome in &outcomes {
            summary.record(outcome);
        }
        summary.elapsed = started.elapsed();

        tracing::info!(
            "✅ Run finished: {} account(s), {} saved, {} destroyed, {} skipped, {} failed",
            summary.accounts_processed,
            summary.invoices_saved,
            summary.invoices_destroyed,
            summary.accounts_skipped,
            summary.accounts_failed
        );

        Ok(summary)
    }

    fn abort(&self, error: JobError, window: Option<Window>, started: Instant) -> RunSummary {
        tracing::error!("❌ Run aborted: {}", error);
        self.sink.notify(
            &error,
            json!({
                "job": "update_user_invoices",
                "window_start": window.map(|w| w.start),
            }),
        );
        RunSummary::new(RunStatus::Aborted(error.kind()), window, started)
    }
}
