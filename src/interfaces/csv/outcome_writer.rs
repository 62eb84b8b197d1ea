use crate::domain::machine::ActionState;
use crate::domain::result::TerminalOutcome;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;
use uuid::Uuid;

/// Where a transaction ended up after a replay.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionReport {
    pub transaction: Uuid,
    pub outcome: Option<TerminalOutcome>,
    pub state: ActionState,
}

#[derive(Serialize)]
struct OutcomeRecord {
    transaction: Uuid,
    outcome: &'static str,
    detail: String,
}

impl From<&TransactionReport> for OutcomeRecord {
    fn from(report: &TransactionReport) -> Self {
        let (outcome, detail) = match &report.outcome {
            Some(TerminalOutcome::Success(code)) => ("success", code.clone()),
            Some(TerminalOutcome::Canceled) => ("canceled", String::new()),
            Some(TerminalOutcome::Error(reason)) => ("error", reason.clone()),
            None => ("pending", report.state.to_string()),
        };
        Self {
            transaction: report.transaction,
            outcome,
            detail,
        }
    }
}

/// Writes `transaction,outcome,detail` rows to any `Write` sink.
pub struct OutcomeWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OutcomeWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_report(&mut self, report: &TransactionReport) -> Result<()> {
        self.writer.serialize(OutcomeRecord::from(report))?;
        self.writer.flush()?;
        Ok(())
    }
}
