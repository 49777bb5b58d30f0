use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Half-open billing window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// A period that merely touches the window's start does not overlap it.
    pub fn overlaps(&self, begins_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> bool {
        begins_at < self.end && ends_at > self.start
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distributor {
    pub id: Uuid,
    pub name: String,
}

/// One unit of metered usage. `bill` and `label` are computed upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillablePeriod {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub begins_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub bill: Decimal,
    pub label: String,
}

impl BillablePeriod {
    pub fn source_id(&self) -> Uuid {
        self.id
    }

    pub fn adjustment_label(&self) -> &str {
        &self.label
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "snake_case")]
pub enum AdjustmentSource {
    /// Owned by invoice reconciliation.
    BillablePeriod,
    Promotion,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub id: Uuid,
    pub source_type: AdjustmentSource,
    pub source_id: Option<Uuid>,
    pub amount: Decimal,
    pub label: String,
}

impl Adjustment {
    pub fn is_reconciliation_owned(&self) -> bool {
        self.source_type == AdjustmentSource::BillablePeriod
    }
}

/// Target state of one reconciliation-owned adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAdjustment {
    pub source_id: Uuid,
    pub amount: Decimal,
    pub label: String,
}

impl From<&BillablePeriod> for PendingAdjustment {
    fn from(period: &BillablePeriod) -> Self {
        Self {
            source_id: period.source_id(),
            amount: period.bill,
            label: period.adjustment_label().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceState {
    Cart,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub account_id: Uuid,
    pub distributor_id: Option<Uuid>,
    /// Pinned to the window start; this is the lookup key.
    pub created_at: DateTime<Utc>,
    pub state: InvoiceState,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub adjustments: Vec<Adjustment>,
    #[serde(skip, default = "loaded_from_store")]
    persisted: bool,
}

fn loaded_from_store() -> bool {
    true
}

impl Invoice {
    /// 建立尚未保存的草稿發票
    pub fn draft(account_id: Uuid, created_at: DateTime<Utc>, distributor_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            distributor_id,
            created_at,
            state: InvoiceState::Cart,
            completed_at: None,
            adjustments: Vec::new(),
            persisted: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state == InvoiceState::Complete
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn mark_persisted(&mut self) {
        self.persisted = true;
    }

    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.state = InvoiceState::Complete;
        self.completed_at = Some(at);
    }

    pub fn reconciled_adjustments(&self) -> impl Iterator<Item = &Adjustment> {
        self.adjustments.iter().filter(|a| a.is_reconciliation_owned())
    }

    pub fn total(&self) -> Decimal {
        self.adjustments.iter().map(|a| a.amount).sum()
    }
}

/// Process-wide settings the job reads but never writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub accounts_distributor_id: Option<Uuid>,
}
