use super::action::{ActionDescriptor, ActionKind, ExternalEvent};
use super::ports::Presenter;
use super::registry::{ActionResumptionRegistry, Resolution};
use super::request::DetailsPayload;
use super::result::WorkerResult;
use crate::error::{FlowError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActionState {
    #[default]
    Idle,
    Dispatched,
    AwaitingExternalEvent,
    Resolving,
    Completed,
    Failed,
}

impl ActionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionState::Completed | ActionState::Failed)
    }
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionState::Idle => "idle",
            ActionState::Dispatched => "dispatched",
            ActionState::AwaitingExternalEvent => "awaiting external event",
            ActionState::Resolving => "resolving",
            ActionState::Completed => "completed",
            ActionState::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    UserCanceled,
    Worker { reason: String, message: String },
}

/// What the host has to do after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// The action was presented and the machine waits for its external event.
    AwaitingEvent(ActionKind),
    SubmitDetails(DetailsPayload),
    /// The event belongs to no live action; nothing changed.
    Unmatched,
    /// A call is in flight; the cancel applies once its result is processed.
    CancelDeferred,
    Completed(String),
    Failed(FailureCause),
    /// Non-fatal worker failure: back to `Idle`, the transaction stays open.
    Recoverable { reason: String, message: String },
}

/// Drives one action instance to completion.
///
/// `Idle -> Dispatched -> AwaitingExternalEvent -> Resolving -> {Completed | Failed}`,
/// with `Resolving -> Dispatched` for chained actions and `Resolving -> Idle` for
/// non-fatal failures. A rejected call never changes the state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionStateMachine {
    state: ActionState,
    registry: ActionResumptionRegistry,
    cancel_requested: bool,
}

impl ActionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    pub fn live_action(&self) -> Option<&ActionDescriptor> {
        self.registry.live()
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested
    }

    pub fn dispatch(
        &mut self,
        descriptor: ActionDescriptor,
        presenter: &dyn Presenter,
    ) -> Result<Step> {
        self.expect(ActionState::Idle, "dispatch an action")?;
        Ok(self.present(descriptor, presenter))
    }

    pub fn on_external_event(&mut self, event: &ExternalEvent) -> Result<Step> {
        self.expect(ActionState::AwaitingExternalEvent, "resume from an external event")?;

        match self.registry.resolve(event) {
            Resolution::Matched(descriptor) => {
                self.transition(ActionState::Resolving);
                Ok(Step::SubmitDetails(DetailsPayload {
                    payment_data: descriptor.payload.payment_data,
                    details: event.payload.clone(),
                }))
            }
            Resolution::NoMatch => {
                warn!(discriminator = ?event.discriminator, "{}", FlowError::UnmatchedExternalEvent);
                Ok(Step::Unmatched)
            }
        }
    }

    /// The action's component produced the details itself; no event will follow.
    pub fn on_details_provided(&mut self) -> Result<()> {
        self.expect(ActionState::AwaitingExternalEvent, "accept action details")?;
        self.registry.clear();
        self.transition(ActionState::Resolving);
        Ok(())
    }

    pub fn on_worker_result(
        &mut self,
        result: WorkerResult,
        presenter: &dyn Presenter,
    ) -> Result<Step> {
        self.expect(ActionState::Resolving, "process a worker result")?;
        let cancel_requested = std::mem::take(&mut self.cancel_requested);

        let step = match result {
            WorkerResult::Finished { result_code } => {
                self.transition(ActionState::Completed);
                Step::Completed(result_code)
            }
            WorkerResult::Failed {
                reason,
                message,
                fatal: true,
            } => {
                self.transition(ActionState::Failed);
                Step::Failed(FailureCause::Worker { reason, message })
            }
            _ if cancel_requested => {
                info!("applying deferred cancellation");
                self.transition(ActionState::Failed);
                Step::Failed(FailureCause::UserCanceled)
            }
            WorkerResult::Failed {
                reason, message, ..
            } => {
                self.transition(ActionState::Idle);
                Step::Recoverable { reason, message }
            }
            WorkerResult::ActionRequired(descriptor) => self.present(descriptor, presenter),
        };
        Ok(step)
    }

    pub fn cancel(&mut self) -> Result<Step> {
        match self.state {
            ActionState::Dispatched | ActionState::AwaitingExternalEvent => {
                self.registry.clear();
                self.transition(ActionState::Failed);
                Ok(Step::Failed(FailureCause::UserCanceled))
            }
            ActionState::Resolving => {
                self.cancel_requested = true;
                Ok(Step::CancelDeferred)
            }
            state => Err(FlowError::InvalidTransition {
                state,
                operation: "cancel",
            }),
        }
    }

    fn present(&mut self, descriptor: ActionDescriptor, presenter: &dyn Presenter) -> Step {
        let kind = descriptor.kind;
        self.transition(ActionState::Dispatched);
        presenter.present(&descriptor);
        self.registry.register(descriptor);
        self.transition(ActionState::AwaitingExternalEvent);
        Step::AwaitingEvent(kind)
    }

    fn expect(&self, expected: ActionState, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(FlowError::InvalidTransition {
                state: self.state,
                operation,
            })
        }
    }

    fn transition(&mut self, to: ActionState) {
        info!(from = %self.state, to = %to, "action state transition");
        self.state = to;
    }
}
