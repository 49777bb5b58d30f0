use crate::domain::model::Distributor;
use crate::domain::ports::{AccountStore, ConfigProvider};
use crate::utils::error::{JobError, Result};

/// Refuses to run unless the accounts distributor is configured and exists.
pub struct ConfigGate<'a, S: AccountStore, C: ConfigProvider> {
    store: &'a S,
    config: &'a C,
}

impl<'a, S: AccountStore, C: ConfigProvider> ConfigGate<'a, S, C> {
    pub fn new(store: &'a S, config: &'a C) -> Self {
        Self { store, config }
    }

    pub async fn check(&self) -> Result<Distributor> {
        let id = self
            .config
            .accounts_distributor_id()
            .ok_or_else(|| JobError::invalid_settings("accounts_distributor_id is not set"))?;

        match self.store.find_distributor(id).await? {
            Some(distributor) => {
                tracing::debug!("Accounts distributor resolved: {} ({})", distributor.name, id);
                Ok(distributor)
            }
            None => Err(JobError::invalid_settings(format!(
                "accounts distributor {} does not exist",
                id
            ))),
        }
    }
}
