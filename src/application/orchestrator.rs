use super::outcome::OutcomeLatch;
use crate::config::FlowConfig;
use crate::domain::action::{ActionDescriptor, ExternalEvent};
use crate::domain::context::TransactionContext;
use crate::domain::machine::{ActionState, ActionStateMachine, FailureCause, Step};
use crate::domain::ports::{PresenterBox, SnapshotStoreBox, WorkerChannelBox};
use crate::domain::queue::{Accepted, ConnectionQueue};
use crate::domain::request::{DetailsPayload, PaymentPayload, SubmissionRequest};
use crate::domain::result::{DeliveredResult, RequestId, TerminalOutcome, WorkerResult};
use crate::domain::snapshot::FlowSnapshot;
use crate::error::{FlowError, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, instrument, warn};

/// The collaborators a host wires into an orchestrator.
pub struct HostPorts {
    pub channel: WorkerChannelBox,
    pub presenter: PresenterBox,
    pub snapshots: SnapshotStoreBox,
}

/// Host-side owner of one transaction.
///
/// Forwards submissions through the connection queue, demultiplexes worker
/// results between direct outcomes and the action state machine, and emits
/// exactly one terminal outcome. Every method takes `&mut self`: callers that
/// receive input from several sources go through [`super::actor::spawn`].
pub struct Orchestrator {
    context: TransactionContext,
    channel: WorkerChannelBox,
    presenter: PresenterBox,
    snapshots: SnapshotStoreBox,
    queue: ConnectionQueue,
    machine: ActionStateMachine,
    in_flight: usize,
    cancel_pending: bool,
    last_processed: Option<RequestId>,
    outcome: OutcomeLatch,
    results: Option<mpsc::UnboundedReceiver<DeliveredResult>>,
}

impl Orchestrator {
    /// Starts a transaction. The receiver yields its terminal outcome.
    pub fn new(
        context: TransactionContext,
        ports: HostPorts,
    ) -> (Self, oneshot::Receiver<TerminalOutcome>) {
        let (outcome, receiver) = OutcomeLatch::new(context.correlation_id());
        info!(
            correlation_id = %context.correlation_id(),
            environment = ?context.config().environment,
            "starting transaction"
        );

        let orchestrator = Self {
            context,
            channel: ports.channel,
            presenter: ports.presenter,
            snapshots: ports.snapshots,
            queue: ConnectionQueue::new(),
            machine: ActionStateMachine::new(),
            in_flight: 0,
            cancel_pending: false,
            last_processed: None,
            outcome,
            results: None,
        };
        (orchestrator, receiver)
    }

    /// Rebuilds the host of a transaction from its last snapshot.
    ///
    /// The restored instance starts disconnected; results the worker produced
    /// meanwhile arrive on the next [`Orchestrator::connect`].
    pub fn restore(
        config: Arc<FlowConfig>,
        snapshot: FlowSnapshot,
        ports: HostPorts,
    ) -> (Self, oneshot::Receiver<TerminalOutcome>) {
        let context = TransactionContext::restore(
            config,
            snapshot.correlation_id,
            snapshot.return_target,
        );
        let (outcome, receiver) = OutcomeLatch::new(context.correlation_id());
        info!(
            correlation_id = %context.correlation_id(),
            state = %snapshot.machine.state(),
            "restoring transaction"
        );

        let orchestrator = Self {
            context,
            channel: ports.channel,
            presenter: ports.presenter,
            snapshots: ports.snapshots,
            queue: snapshot.queue,
            machine: snapshot.machine,
            in_flight: snapshot.in_flight,
            cancel_pending: snapshot.cancel_pending,
            last_processed: snapshot.last_processed,
            outcome,
            results: None,
        };
        (orchestrator, receiver)
    }

    pub fn context(&self) -> &TransactionContext {
        &self.context
    }

    pub fn state(&self) -> ActionState {
        self.machine.state()
    }

    pub fn live_action(&self) -> Option<&ActionDescriptor> {
        self.machine.live_action()
    }

    pub fn queue(&self) -> &ConnectionQueue {
        &self.queue
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn outcome(&self) -> Option<&TerminalOutcome> {
        self.outcome.emitted()
    }

    pub fn is_closed(&self) -> bool {
        self.outcome.emitted().is_some()
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            correlation_id: self.context.correlation_id(),
            return_target: self.context.return_target().map(str::to_string),
            machine: self.machine.clone(),
            queue: self.queue.clone(),
            in_flight: self.in_flight,
            cancel_pending: self.cancel_pending,
            last_processed: self.last_processed,
        }
    }

    /// Links to the worker. Results retained while disconnected are processed
    /// before any queued request goes out.
    #[instrument(skip_all, fields(correlation_id = %self.context.correlation_id()))]
    pub async fn connect(&mut self) -> Result<()> {
        if self.results.is_some() && self.channel.is_connected().await {
            debug!("already connected");
        } else {
            let (listener, results) = mpsc::unbounded_channel();
            self.channel.connect(listener).await?;
            self.results = Some(results);
            info!("connected to worker");
            self.drain_results().await?;
        }

        // Held requests, including ones an earlier flush could not deliver
        if !self.is_closed() && !self.queue.is_empty() {
            let accepted = self.queue.on_connected(self.channel.as_ref()).await;
            self.track(accepted);
        }
        self.persist().await
    }

    /// Releases the link. Work the worker already accepted keeps running.
    #[instrument(skip_all, fields(correlation_id = %self.context.correlation_id()))]
    pub async fn disconnect(&mut self) -> Result<()> {
        self.channel.disconnect().await?;
        if self.results.take().is_some() {
            info!("disconnected from worker");
        }
        Ok(())
    }

    #[instrument(skip_all, fields(correlation_id = %self.context.correlation_id()))]
    pub async fn submit_payment(&mut self, payload: PaymentPayload) -> Result<()> {
        self.ensure_open()?;
        let state = self.machine.state();
        if state != ActionState::Idle {
            return Err(FlowError::InvalidTransition {
                state,
                operation: "submit a payment",
            });
        }
        self.ensure_no_call_in_flight("submit a payment with a call in flight")?;
        self.submit(SubmissionRequest::PaymentSubmission(payload))
            .await
    }

    #[instrument(skip_all, fields(correlation_id = %self.context.correlation_id()))]
    pub async fn submit_details(&mut self, payload: DetailsPayload) -> Result<()> {
        self.ensure_open()?;
        match self.machine.state() {
            ActionState::Idle => {
                self.ensure_no_call_in_flight("submit details with a call in flight")?
            }
            ActionState::AwaitingExternalEvent => self.machine.on_details_provided()?,
            state => {
                return Err(FlowError::InvalidTransition {
                    state,
                    operation: "submit details",
                });
            }
        }
        self.submit(SubmissionRequest::DetailsSubmission(payload))
            .await
    }

    /// Feeds a resumption signal to the live action, if there is one.
    #[instrument(skip_all, fields(correlation_id = %self.context.correlation_id()))]
    pub async fn on_external_event(&mut self, event: ExternalEvent) -> Result<()> {
        let state = self.machine.state();
        if self.is_closed() || state != ActionState::AwaitingExternalEvent {
            info!(%state, discriminator = ?event.discriminator, "discarding external event with no live action");
            return Ok(());
        }

        let step = self.machine.on_external_event(&event)?;
        self.apply(step).await?;
        self.persist().await
    }

    /// User cancellation. Deferred while a worker call is in flight.
    #[instrument(skip_all, fields(correlation_id = %self.context.correlation_id()))]
    pub async fn cancel(&mut self) -> Result<()> {
        if self.is_closed() {
            debug!("cancel after terminal outcome ignored");
            return Ok(());
        }

        match self.machine.state() {
            ActionState::Idle if self.in_flight > 0 => {
                info!("cancel deferred until the in-flight call returns");
                self.cancel_pending = true;
            }
            ActionState::Idle => return self.finish(TerminalOutcome::Canceled).await,
            _ => {
                let step = self.machine.cancel()?;
                self.apply(step).await?;
            }
        }
        self.persist().await
    }

    /// Waits for the next worker result, pending forever while disconnected.
    pub async fn next_result(&mut self) -> Option<DeliveredResult> {
        match self.results.as_mut() {
            Some(results) => {
                let next = results.recv().await;
                if next.is_none() {
                    self.results = None;
                }
                next
            }
            None => std::future::pending().await,
        }
    }

    /// Waits for and processes one worker result. `false` when disconnected.
    pub async fn process_next_result(&mut self) -> Result<bool> {
        if self.results.is_none() {
            return Ok(false);
        }
        match self.next_result().await {
            Some(delivered) => {
                self.on_worker_result(delivered).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Processes results until no call is in flight or the link drops.
    pub async fn settle(&mut self) -> Result<()> {
        while self.in_flight > 0 && self.process_next_result().await? {}
        Ok(())
    }

    #[instrument(skip_all, fields(correlation_id = %self.context.correlation_id(), request_id = %delivered.request_id))]
    pub async fn on_worker_result(&mut self, delivered: DeliveredResult) -> Result<()> {
        let DeliveredResult { request_id, result } = delivered;
        if self.last_processed.is_some_and(|last| request_id <= last) {
            debug!("dropping redelivered result");
            return self.channel.acknowledge(request_id).await;
        }

        self.last_processed = Some(request_id);
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.in_flight == 0 {
            self.presenter.present_loading(false);
        }

        if self.is_closed() {
            warn!("result arrived after the transaction finished");
        } else {
            self.handle_result(request_id, result).await?;
            self.persist().await?;
        }
        self.channel.acknowledge(request_id).await
    }

    async fn handle_result(&mut self, request_id: RequestId, result: WorkerResult) -> Result<()> {
        match self.machine.state() {
            ActionState::Idle => match result {
                WorkerResult::Finished { result_code } => {
                    self.finish(TerminalOutcome::Success(result_code)).await
                }
                WorkerResult::Failed {
                    reason,
                    message,
                    fatal: true,
                } => self.fail(reason, message).await,
                _ if self.cancel_pending => self.finish(TerminalOutcome::Canceled).await,
                WorkerResult::Failed {
                    reason, message, ..
                } => {
                    self.recover(reason, message);
                    Ok(())
                }
                WorkerResult::ActionRequired(descriptor) => {
                    let step = self.machine.dispatch(descriptor, self.presenter.as_ref())?;
                    self.apply(step).await
                }
            },
            ActionState::Resolving => {
                let step = self
                    .machine
                    .on_worker_result(result, self.presenter.as_ref())?;
                self.apply(step).await
            }
            state => {
                error!(
                    %request_id,
                    %state,
                    "worker answered a request the flow was not waiting on"
                );
                Err(FlowError::InvalidTransition {
                    state,
                    operation: "process a worker result",
                })
            }
        }
    }

    async fn apply(&mut self, step: Step) -> Result<()> {
        match step {
            Step::AwaitingEvent(kind) => {
                debug!(%kind, "awaiting external event");
                Ok(())
            }
            Step::SubmitDetails(payload) => {
                self.submit(SubmissionRequest::DetailsSubmission(payload))
                    .await
            }
            Step::Unmatched => Ok(()),
            Step::CancelDeferred => {
                info!("cancel deferred until the in-flight call returns");
                Ok(())
            }
            Step::Completed(result_code) => {
                self.finish(TerminalOutcome::Success(result_code)).await
            }
            Step::Failed(FailureCause::UserCanceled) => {
                self.finish(TerminalOutcome::Canceled).await
            }
            Step::Failed(FailureCause::Worker { reason, message }) => {
                self.fail(reason, message).await
            }
            Step::Recoverable { reason, message } => {
                self.recover(reason, message);
                Ok(())
            }
        }
    }

    async fn fail(&mut self, reason: String, message: String) -> Result<()> {
        self.presenter.present_error(&message, true);
        let failure = FlowError::WorkerFailure {
            reason: reason.clone(),
            message,
            fatal: true,
        };
        warn!(error = %failure, "closing transaction");
        self.finish(TerminalOutcome::Error(reason)).await
    }

    /// Non-fatal failures go to the presenter only; the user may try again.
    fn recover(&self, reason: String, message: String) {
        self.presenter.present_error(&message, false);
        let failure = FlowError::WorkerFailure {
            reason,
            message,
            fatal: false,
        };
        info!(error = %failure, "absorbed non-fatal failure");
    }

    async fn submit(&mut self, request: SubmissionRequest) -> Result<()> {
        let accepted = self.queue.enqueue(request, self.channel.as_ref()).await;
        self.track(accepted);
        self.persist().await
    }

    fn track(&mut self, accepted: Vec<Accepted>) {
        if accepted.is_empty() {
            return;
        }
        self.in_flight += accepted.len();
        self.presenter.present_loading(true);
    }

    async fn drain_results(&mut self) -> Result<()> {
        let Some(mut results) = self.results.take() else {
            return Ok(());
        };
        let mut drained = Ok(());
        while let Ok(delivered) = results.try_recv() {
            drained = self.on_worker_result(delivered).await;
            if drained.is_err() {
                break;
            }
        }
        self.results = Some(results);
        drained
    }

    async fn finish(&mut self, outcome: TerminalOutcome) -> Result<()> {
        debug_assert!(
            !self.is_closed(),
            "terminal outcome emitted twice for {}",
            self.context.correlation_id()
        );
        self.outcome.emit(outcome)?;
        self.queue.clear();
        self.cancel_pending = false;
        self.presenter.present_loading(false);
        self.snapshots.remove(self.context.correlation_id()).await
    }

    /// Unsent requests are overwritten in the queue, but an accepted call
    /// must be answered before the next one starts.
    fn ensure_no_call_in_flight(&self, operation: &'static str) -> Result<()> {
        if self.in_flight > 0 {
            info!(in_flight = self.in_flight, "rejecting submission while a call is in flight");
            return Err(FlowError::InvalidTransition {
                state: self.machine.state(),
                operation,
            });
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(FlowError::TransactionClosed(self.context.correlation_id()))
        } else {
            Ok(())
        }
    }

    async fn persist(&self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.snapshots.save(&self.snapshot()).await
    }
}
