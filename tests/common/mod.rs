#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use invoice_sync::domain::model::{Account, BillablePeriod, Distributor, GlobalConfig};
use invoice_sync::InMemoryStore;
use rust_decimal::Decimal;
use uuid::Uuid;

pub fn start_of_july() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()
}

pub struct Ledger {
    pub store: InMemoryStore,
    pub distributor: Distributor,
    pub user: Account,
}

impl Ledger {
    pub async fn new() -> Self {
        let store = InMemoryStore::new();
        let distributor = Distributor {
            id: Uuid::new_v4(),
            name: "Accounts Distributor".to_string(),
        };
        store.insert_distributor(distributor.clone()).await;
        let user = Self::add_user(&store, "user@example.com").await;
        Self {
            store,
            distributor,
            user,
        }
    }

    pub async fn add_user(store: &InMemoryStore, email: &str) -> Account {
        let account = Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
        };
        store.insert_account(account.clone()).await;
        account
    }

    pub fn config(&self) -> GlobalConfig {
        GlobalConfig {
            accounts_distributor_id: Some(self.distributor.id),
        }
    }

    pub async fn add_period(
        &self,
        owner: &Account,
        begins_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        cents: i64,
    ) -> BillablePeriod {
        let period = BillablePeriod {
            id: Uuid::new_v4(),
            owner_id: owner.id,
            begins_at,
            ends_at,
            bill: Decimal::new(cents, 2),
            label: format!("Usage {} - {}", begins_at.date_naive(), ends_at.date_naive()),
        };
        self.store.insert_billable_period(period.clone()).await;
        period
    }

    /// Same fixtures as a typical month: one June period, two July periods.
    pub async fn with_standard_periods(&self) -> [BillablePeriod; 3] {
        let july = start_of_july();
        [
            self.add_period(&self.user, july - Duration::days(30), july, 66666)
                .await,
            self.add_period(&self.user, july, july + Duration::days(10), 12345)
                .await,
            self.add_period(
                &self.user,
                july + Duration::days(12),
                july + Duration::days(20),
                54321,
            )
            .await,
        ]
    }
}
