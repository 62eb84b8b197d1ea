use super::csv::outcome_writer::TransactionReport;
use super::csv::script_reader::ScriptStep;
use crate::application::orchestrator::{HostPorts, Orchestrator};
use crate::config::FlowConfig;
use crate::domain::context::TransactionContext;
use crate::domain::ports::SnapshotStoreFactory;
use crate::domain::request::{DetailsPayload, PaymentPayload};
use crate::domain::result::TerminalOutcome;
use crate::error::Result;
use crate::infrastructure::presenter::TracingPresenter;
use crate::infrastructure::scripted::ScriptedBackend;
use crate::infrastructure::worker::InMemoryWorker;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::info;

/// Plays a scenario script against an in-memory worker.
///
/// Every step that can start a worker call waits until the calls in flight
/// have been answered, so the script reads as a linear story.
pub struct ScenarioReplay {
    config: Arc<FlowConfig>,
    backend: ScriptedBackend,
    worker: InMemoryWorker,
    stores: SnapshotStoreFactory,
    orchestrator: Orchestrator,
    outcome: oneshot::Receiver<TerminalOutcome>,
}

impl ScenarioReplay {
    /// Must be called inside a tokio runtime: the worker task starts here.
    pub fn new(
        config: Arc<FlowConfig>,
        stores: SnapshotStoreFactory,
        return_target: Option<String>,
    ) -> Self {
        let backend = ScriptedBackend::new();
        let worker = InMemoryWorker::spawn(Arc::new(backend.clone()));
        let context = TransactionContext::new(config.clone(), return_target);
        let ports = host_ports(&worker, &stores);
        let (orchestrator, outcome) = Orchestrator::new(context, ports);

        Self {
            config,
            backend,
            worker,
            stores,
            orchestrator,
            outcome,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub async fn apply(&mut self, step: ScriptStep) -> Result<()> {
        match step {
            ScriptStep::Respond(result) => {
                self.backend.push(result);
                return Ok(());
            }
            ScriptStep::Connect => self.orchestrator.connect().await?,
            ScriptStep::Disconnect => return self.orchestrator.disconnect().await,
            ScriptStep::Pay { method, amount } => {
                let payload = PaymentPayload {
                    method,
                    amount,
                    currency: self.config.currency.clone(),
                    reference: None,
                };
                self.orchestrator.submit_payment(payload).await?
            }
            ScriptStep::Details { key, value } => {
                let mut payload = DetailsPayload::default();
                payload.details.insert(key, value);
                self.orchestrator.submit_details(payload).await?
            }
            ScriptStep::Event(event) => self.orchestrator.on_external_event(event).await?,
            ScriptStep::Cancel => self.orchestrator.cancel().await?,
            ScriptStep::Restart => return self.restart().await,
        }
        self.orchestrator.settle().await
    }

    /// Drops the current host and rebuilds it from the persisted snapshot.
    async fn restart(&mut self) -> Result<()> {
        let correlation_id = self.orchestrator.context().correlation_id();
        self.orchestrator.disconnect().await?;

        let Some(snapshot) = (self.stores)().load(correlation_id).await? else {
            info!(%correlation_id, "no snapshot to restore, keeping current host");
            return Ok(());
        };
        let ports = host_ports(&self.worker, &self.stores);
        let (orchestrator, outcome) = Orchestrator::restore(self.config.clone(), snapshot, ports);
        self.orchestrator = orchestrator;
        self.outcome = outcome;
        Ok(())
    }

    pub fn finish(mut self) -> TransactionReport {
        TransactionReport {
            transaction: self.orchestrator.context().correlation_id(),
            outcome: self.outcome.try_recv().ok(),
            state: self.orchestrator.state(),
        }
    }
}

fn host_ports(worker: &InMemoryWorker, stores: &SnapshotStoreFactory) -> HostPorts {
    HostPorts {
        channel: Box::new(worker.clone()),
        presenter: Box::new(TracingPresenter::new()),
        snapshots: stores(),
    }
}
