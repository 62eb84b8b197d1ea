use super::action::ActionDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sequence number the worker assigns to each accepted request.
///
/// Ids increase in acceptance order, which is also the delivery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The single, final answer of the worker to one accepted request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkerResult {
    Finished {
        result_code: String,
    },
    ActionRequired(ActionDescriptor),
    Failed {
        reason: String,
        message: String,
        fatal: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveredResult {
    pub request_id: RequestId,
    pub result: WorkerResult,
}

/// What the caller that started the transaction finally receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalOutcome {
    Success(String),
    Canceled,
    Error(String),
}

impl fmt::Display for TerminalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalOutcome::Success(code) => write!(f, "success({code})"),
            TerminalOutcome::Canceled => write!(f, "canceled"),
            TerminalOutcome::Error(reason) => write!(f, "error({reason})"),
        }
    }
}
