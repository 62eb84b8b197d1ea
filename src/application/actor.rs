use super::orchestrator::Orchestrator;
use crate::domain::action::ExternalEvent;
use crate::domain::request::{DetailsPayload, PaymentPayload};
use crate::domain::snapshot::FlowSnapshot;
use crate::error::{FlowError, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

type CommandResponder<T> = oneshot::Sender<Result<T>>;

/// Inputs serialized through the orchestrator task.
#[derive(Debug)]
pub enum FlowCommand {
    SubmitPayment {
        payload: PaymentPayload,
        resp: CommandResponder<()>,
    },
    SubmitDetails {
        payload: DetailsPayload,
        resp: CommandResponder<()>,
    },
    ExternalEvent {
        event: ExternalEvent,
        resp: CommandResponder<()>,
    },
    Cancel {
        resp: CommandResponder<()>,
    },
    Connect {
        resp: CommandResponder<()>,
    },
    Disconnect {
        resp: CommandResponder<()>,
    },
    Snapshot {
        resp: CommandResponder<FlowSnapshot>,
    },
    /// Disconnects and stops the task, handing the orchestrator back.
    Shutdown {
        resp: CommandResponder<()>,
    },
}

/// Cheap, clonable entry point for every thread that talks to the transaction.
#[derive(Clone)]
pub struct OrchestratorHandle {
    sender: mpsc::Sender<FlowCommand>,
}

/// Moves `orchestrator` into a task that is the single writer of its state.
///
/// Commands and worker results are processed one at a time, in arrival order.
/// The join handle returns the orchestrator once the task stops.
pub fn spawn(orchestrator: Orchestrator) -> (OrchestratorHandle, JoinHandle<Orchestrator>) {
    let capacity = orchestrator.context().config().mailbox_capacity.max(1);
    let (sender, receiver) = mpsc::channel(capacity);
    let task = tokio::spawn(run(orchestrator, receiver));
    (OrchestratorHandle { sender }, task)
}

async fn run(
    mut orchestrator: Orchestrator,
    mut commands: mpsc::Receiver<FlowCommand>,
) -> Orchestrator {
    loop {
        tokio::select! {
            Some(delivered) = orchestrator.next_result() => {
                if let Err(e) = orchestrator.on_worker_result(delivered).await {
                    warn!(error = %e, "failed to process worker result");
                }
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("all handles dropped, stopping orchestrator task");
                    break;
                };
                if handle(&mut orchestrator, command).await {
                    break;
                }
            }
        }
    }
    orchestrator
}

/// Returns `true` when the task should stop.
async fn handle(orchestrator: &mut Orchestrator, command: FlowCommand) -> bool {
    match command {
        FlowCommand::SubmitPayment { payload, resp } => {
            reply(resp, orchestrator.submit_payment(payload).await)
        }
        FlowCommand::SubmitDetails { payload, resp } => {
            reply(resp, orchestrator.submit_details(payload).await)
        }
        FlowCommand::ExternalEvent { event, resp } => {
            reply(resp, orchestrator.on_external_event(event).await)
        }
        FlowCommand::Cancel { resp } => reply(resp, orchestrator.cancel().await),
        FlowCommand::Connect { resp } => reply(resp, orchestrator.connect().await),
        FlowCommand::Disconnect { resp } => reply(resp, orchestrator.disconnect().await),
        FlowCommand::Snapshot { resp } => reply(resp, Ok(orchestrator.snapshot())),
        FlowCommand::Shutdown { resp } => {
            reply(resp, orchestrator.disconnect().await);
            return true;
        }
    }
    false
}

fn reply<T>(resp: CommandResponder<T>, result: Result<T>) {
    if resp.send(result).is_err() {
        debug!("caller dropped the response channel");
    }
}

impl OrchestratorHandle {
    pub async fn submit_payment(&self, payload: PaymentPayload) -> Result<()> {
        self.request(|resp| FlowCommand::SubmitPayment { payload, resp })
            .await
    }

    pub async fn submit_details(&self, payload: DetailsPayload) -> Result<()> {
        self.request(|resp| FlowCommand::SubmitDetails { payload, resp })
            .await
    }

    pub async fn external_event(&self, event: ExternalEvent) -> Result<()> {
        self.request(|resp| FlowCommand::ExternalEvent { event, resp })
            .await
    }

    pub async fn cancel(&self) -> Result<()> {
        self.request(|resp| FlowCommand::Cancel { resp }).await
    }

    pub async fn connect(&self) -> Result<()> {
        self.request(|resp| FlowCommand::Connect { resp }).await
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.request(|resp| FlowCommand::Disconnect { resp }).await
    }

    pub async fn snapshot(&self) -> Result<FlowSnapshot> {
        self.request(|resp| FlowCommand::Snapshot { resp }).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.request(|resp| FlowCommand::Shutdown { resp }).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(CommandResponder<T>) -> FlowCommand,
    ) -> Result<T> {
        let (resp, receiver) = oneshot::channel();
        self.sender
            .send(command(resp))
            .await
            .map_err(|_| FlowError::OrchestratorStopped)?;
        receiver.await.map_err(|_| FlowError::OrchestratorStopped)?
    }
}
