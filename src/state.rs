use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::access::DenialLog;
use crate::services::ai::LlmProvider;
use crate::services::identity::IdentityProvider;
use crate::services::payments::PaymentGateway;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub payments: Box<dyn PaymentGateway>,
    pub identity: Box<dyn IdentityProvider>,
    pub llm: Box<dyn LlmProvider>,
    pub denials: DenialLog,
}

impl AppState {
    /// Lock the store connection. Never hold the guard across an `.await`.
    pub fn db(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| anyhow::anyhow!("database connection mutex poisoned"))
    }
}
