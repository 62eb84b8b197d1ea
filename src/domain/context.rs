use crate::config::FlowConfig;
use std::sync::Arc;
use uuid::Uuid;

/// Identity of one transaction. Immutable once created.
#[derive(Debug, Clone)]
pub struct TransactionContext {
    config: Arc<FlowConfig>,
    correlation_id: Uuid,
    return_target: Option<String>,
}

impl TransactionContext {
    /// Starts a new transaction with a fresh correlation id.
    ///
    /// Without an explicit `return_target` the config's default is used.
    pub fn new(config: Arc<FlowConfig>, return_target: Option<String>) -> Self {
        let return_target = return_target.or_else(|| config.return_target.clone());
        Self {
            config,
            correlation_id: Uuid::new_v4(),
            return_target,
        }
    }

    /// Rebuilds the context of a transaction that outlived its host.
    pub fn restore(
        config: Arc<FlowConfig>,
        correlation_id: Uuid,
        return_target: Option<String>,
    ) -> Self {
        Self {
            config,
            correlation_id,
            return_target,
        }
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    pub fn return_target(&self) -> Option<&str> {
        self.return_target.as_deref()
    }
}
