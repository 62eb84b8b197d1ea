use crate::domain::result::TerminalOutcome;
use crate::error::{FlowError, Result};
use tokio::sync::oneshot;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Delivers the terminal outcome to the caller, once.
pub struct OutcomeLatch {
    correlation_id: Uuid,
    sender: Option<oneshot::Sender<TerminalOutcome>>,
    emitted: Option<TerminalOutcome>,
}

impl OutcomeLatch {
    pub fn new(correlation_id: Uuid) -> (Self, oneshot::Receiver<TerminalOutcome>) {
        let (sender, receiver) = oneshot::channel();
        let latch = Self {
            correlation_id,
            sender: Some(sender),
            emitted: None,
        };
        (latch, receiver)
    }

    pub fn emit(&mut self, outcome: TerminalOutcome) -> Result<()> {
        if let Some(first) = &self.emitted {
            error!(
                correlation_id = %self.correlation_id,
                %first,
                second = %outcome,
                "terminal outcome emitted twice"
            );
            return Err(FlowError::DuplicateTerminalEmission(self.correlation_id));
        }

        info!(correlation_id = %self.correlation_id, %outcome, "transaction finished");
        if let Some(sender) = self.sender.take()
            && sender.send(outcome.clone()).is_err()
        {
            debug!(correlation_id = %self.correlation_id, "caller stopped listening for the outcome");
        }
        self.emitted = Some(outcome);
        Ok(())
    }

    pub fn emitted(&self) -> Option<&TerminalOutcome> {
        self.emitted.as_ref()
    }
}
