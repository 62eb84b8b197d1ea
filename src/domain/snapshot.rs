use super::machine::ActionStateMachine;
use super::queue::ConnectionQueue;
use super::result::RequestId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The minimum state a recreated host needs to resume a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSnapshot {
    pub correlation_id: Uuid,
    pub return_target: Option<String>,
    pub machine: ActionStateMachine,
    pub queue: ConnectionQueue,
    /// Requests accepted by the worker whose results were not processed yet.
    pub in_flight: usize,
    /// Cancel requested while a payment call was in flight.
    pub cancel_pending: bool,
    pub last_processed: Option<RequestId>,
}
