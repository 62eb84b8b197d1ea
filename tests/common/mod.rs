#![allow(dead_code)]

use payflow::application::orchestrator::{HostPorts, Orchestrator};
use payflow::config::FlowConfig;
use payflow::domain::action::{ActionDescriptor, ActionKind};
use payflow::domain::context::TransactionContext;
use payflow::domain::ports::SnapshotStore;
use payflow::domain::request::{Amount, PaymentMethodKind, PaymentPayload};
use payflow::domain::result::{TerminalOutcome, WorkerResult};
use payflow::infrastructure::in_memory::InMemorySnapshotStore;
use payflow::infrastructure::presenter::RecordingPresenter;
use payflow::infrastructure::scripted::ScriptedBackend;
use payflow::infrastructure::worker::InMemoryWorker;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Everything a test needs around one orchestrator. Clones of the worker,
/// backend and store are shared with the orchestrator.
pub struct Harness {
    pub config: Arc<FlowConfig>,
    pub backend: ScriptedBackend,
    pub worker: InMemoryWorker,
    pub presenter: RecordingPresenter,
    pub store: InMemorySnapshotStore,
}

impl Harness {
    pub fn new() -> Self {
        let backend = ScriptedBackend::new();
        let worker = InMemoryWorker::spawn(Arc::new(backend.clone()));
        Self {
            config: Arc::new(FlowConfig::default()),
            backend,
            worker,
            presenter: RecordingPresenter::new(),
            store: InMemorySnapshotStore::new(),
        }
    }

    pub fn ports(&self) -> HostPorts {
        HostPorts {
            channel: Box::new(self.worker.clone()),
            presenter: Box::new(self.presenter.clone()),
            snapshots: Box::new(self.store.clone()),
        }
    }

    pub fn start(&self) -> (Orchestrator, oneshot::Receiver<TerminalOutcome>) {
        let context = TransactionContext::new(self.config.clone(), Some("shop://done".into()));
        Orchestrator::new(context, self.ports())
    }

    /// Rebuilds a host from the stored snapshot, the way a recreated host does.
    pub async fn restore(
        &self,
        orchestrator: &Orchestrator,
    ) -> (Orchestrator, oneshot::Receiver<TerminalOutcome>) {
        let snapshot = self
            .store
            .load(orchestrator.context().correlation_id())
            .await
            .unwrap()
            .expect("snapshot should be stored");
        Orchestrator::restore(self.config.clone(), snapshot, self.ports())
    }

    pub async fn wait_for_retained(&self, count: usize) {
        while self.worker.retained().await < count {
            tokio::task::yield_now().await;
        }
    }
}

pub fn card_payment() -> PaymentPayload {
    PaymentPayload {
        method: PaymentMethodKind::Card,
        amount: Amount::new(dec!(10.00)).unwrap(),
        currency: "EUR".into(),
        reference: Some("order-1".into()),
    }
}

pub fn finished(code: &str) -> WorkerResult {
    WorkerResult::Finished {
        result_code: code.to_string(),
    }
}

pub fn failed(reason: &str, fatal: bool) -> WorkerResult {
    WorkerResult::Failed {
        reason: reason.to_string(),
        message: format!("{reason} message"),
        fatal,
    }
}

pub fn redirect(scheme: &str) -> WorkerResult {
    WorkerResult::ActionRequired(
        ActionDescriptor::new(ActionKind::Redirect)
            .with_return_scheme(scheme)
            .with_payment_data("pd-1"),
    )
}

pub fn challenge() -> WorkerResult {
    WorkerResult::ActionRequired(
        ActionDescriptor::new(ActionKind::ChallengeDisplay).with_payment_data("pd-3ds"),
    )
}
