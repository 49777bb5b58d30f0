use crate::domain::model::{Adjustment, AdjustmentSource, Invoice, PendingAdjustment};
use crate::domain::ports::{AccountStore, ErrorSink};
use crate::utils::error::{JobError, Result};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceDisposition {
    Saved,
    Destroyed,
    /// Never persisted and nothing to bill: dropped without a store call.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupOutcome {
    pub removed: usize,
    pub created: usize,
    pub updated: usize,
    pub disposition: InvoiceDisposition,
}

/// Brings an invoice's reconciliation-owned adjustments in line with the
/// expected set, then saves the invoice or destroys it when nothing is left.
pub struct InvoiceCleanup<'a, S: AccountStore> {
    store: &'a S,
    sink: &'a dyn ErrorSink,
}

impl<'a, S: AccountStore> InvoiceCleanup<'a, S> {
    pub fn new(store: &'a S, sink: &'a dyn ErrorSink) -> Self {
        Self { store, sink }
    }

    pub async fn clean_up_and_save(
        &self,
        invoice: &mut Invoice,
        current_adjustments: &[PendingAdjustment],
    ) -> Result<CleanupOutcome> {
        let obsolete = remove_obsolete(invoice, current_adjustments);
        let (created, updated) = upsert(invoice, current_adjustments);
        order_reconciled(invoice, current_adjustments);

        let disposition = if invoice.reconciled_adjustments().next().is_some() {
            self.store.save_invoice(invoice).await?;
            InvoiceDisposition::Saved
        } else if invoice.is_persisted() {
            self.store.destroy_invoice(invoice.id).await?;
            InvoiceDisposition::Destroyed
        } else {
            InvoiceDisposition::Discarded
        };

        // 只在寫入成功後回報
        self.report_obsolete(invoice, &obsolete);
        if disposition == InvoiceDisposition::Destroyed {
            self.sink.notify(
                &JobError::EmptyPersistedInvoice {
                    invoice_id: invoice.id,
                },
                json!({
                    "invoice_id": invoice.id,
                    "account_id": invoice.account_id,
                    "created_at": invoice.created_at,
                }),
            );
        }

        let removed = obsolete.len();
        tracing::debug!(
            "Invoice {} cleaned up: removed={}, created={}, updated={}, {:?}",
            invoice.id,
            removed,
            created,
            updated,
            disposition
        );

        Ok(CleanupOutcome {
            removed,
            created,
            updated,
            disposition,
        })
    }

    fn report_obsolete(&self, invoice: &Invoice, obsolete: &[Option<Uuid>]) {
        if obsolete.is_empty() {
            return;
        }
        self.sink.notify(
            &JobError::ObsoleteAdjustments {
                invoice_id: invoice.id,
                count: obsolete.len(),
            },
            json!({
                "invoice_id": invoice.id,
                "account_id": invoice.account_id,
                "source_ids": obsolete,
            }),
        );
    }
}

/// 移除不再對應任何 billable period 的調整項（含重複項）
fn remove_obsolete(invoice: &mut Invoice, current: &[PendingAdjustment]) -> Vec<Option<Uuid>> {
    let current_ids: HashSet<Uuid> = current.iter().map(|a| a.source_id).collect();
    let mut kept_ids = HashSet::new();
    let mut obsolete = Vec::new();

    invoice.adjustments.retain(|adjustment| {
        if !adjustment.is_reconciliation_owned() {
            return true;
        }
        let keep = adjustment
            .source_id
            .is_some_and(|id| current_ids.contains(&id) && kept_ids.insert(id));
        if !keep {
            obsolete.push(adjustment.source_id);
        }
        keep
    });

    obsolete
}

fn upsert(invoice: &mut Invoice, current: &[PendingAdjustment]) -> (usize, usize) {
    let mut created = 0;
    let mut updated = 0;

    for pending in current {
        let existing = invoice.adjustments.iter_mut().find(|a| {
            a.is_reconciliation_owned() && a.source_id == Some(pending.source_id)
        });

        match existing {
            Some(adjustment) => {
                if adjustment.amount != pending.amount || adjustment.label != pending.label {
                    adjustment.amount = pending.amount;
                    adjustment.label = pending.label.clone();
                    updated += 1;
                }
            }
            None => {
                invoice.adjustments.push(Adjustment {
                    id: Uuid::new_v4(),
                    source_type: AdjustmentSource::BillablePeriod,
                    source_id: Some(pending.source_id),
                    amount: pending.amount,
                    label: pending.label.clone(),
                });
                created += 1;
            }
        }
    }

    (created, updated)
}

/// Owned adjustments follow the order of `current`; other adjustments keep their slots.
fn order_reconciled(invoice: &mut Invoice, current: &[PendingAdjustment]) {
    let rank: HashMap<Uuid, usize> = current
        .iter()
        .enumerate()
        .map(|(i, pending)| (pending.source_id, i))
        .collect();
    let slots: Vec<usize> = invoice
        .adjustments
        .iter()
        .enumerate()
        .filter(|(_, a)| a.is_reconciliation_owned())
        .map(|(i, _)| i)
        .collect();

    let mut owned: Vec<Adjustment> = slots
        .iter()
        .map(|&i| invoice.adjustments[i].clone())
        .collect();
    owned.sort_by_key(|a| {
        a.source_id
            .and_then(|id| rank.get(&id).copied())
            .unwrap_or(usize::MAX)
    });

    for (slot, adjustment) in slots.into_iter().zip(owned) {
        invoice.adjustments[slot] = adjustment;
    }
}
