use crate::domain::action::{
    ActionDescriptor, ActionKind, AppSwitchProvider, ExternalEvent, parse_query,
};
use crate::domain::request::{Amount, PaymentMethodKind};
use crate::domain::result::WorkerResult;
use crate::error::{FlowError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use std::str::FromStr;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ScriptOp {
    Respond,
    Connect,
    Disconnect,
    Pay,
    Details,
    Event,
    Cancel,
    Restart,
}

#[derive(Debug, Deserialize)]
struct ScriptRecord {
    op: ScriptOp,
    kind: Option<String>,
    value: Option<String>,
}

/// One line of a scenario script.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    /// Program the worker's answer to the next request.
    Respond(WorkerResult),
    Connect,
    Disconnect,
    Pay {
        method: PaymentMethodKind,
        amount: Amount,
    },
    Details {
        key: String,
        value: String,
    },
    Event(ExternalEvent),
    Cancel,
    /// Recreate the host from its persisted snapshot.
    Restart,
}

impl TryFrom<ScriptRecord> for ScriptStep {
    type Error = FlowError;

    fn try_from(record: ScriptRecord) -> Result<Self> {
        let raw_kind = record.kind.unwrap_or_default();
        let kind = raw_kind.to_ascii_lowercase();
        let value = record.value;

        let step = match record.op {
            ScriptOp::Respond => ScriptStep::Respond(scripted_result(&kind, value)?),
            ScriptOp::Connect => ScriptStep::Connect,
            ScriptOp::Disconnect => ScriptStep::Disconnect,
            ScriptOp::Pay => {
                let amount = value
                    .as_deref()
                    .ok_or_else(|| invalid("pay requires an amount"))?;
                let amount = Decimal::from_str(amount)
                    .map_err(|e| invalid(&format!("bad amount {amount}: {e}")))?;
                ScriptStep::Pay {
                    method: kind.parse()?,
                    amount: Amount::new(amount)?,
                }
            }
            ScriptOp::Details => {
                if raw_kind.is_empty() {
                    return Err(invalid("details requires a key"));
                }
                ScriptStep::Details {
                    key: raw_kind,
                    value: value.unwrap_or_default(),
                }
            }
            ScriptOp::Event => ScriptStep::Event(scripted_event(&kind, value)?),
            ScriptOp::Cancel => ScriptStep::Cancel,
            ScriptOp::Restart => ScriptStep::Restart,
        };
        Ok(step)
    }
}

fn scripted_result(kind: &str, value: Option<String>) -> Result<WorkerResult> {
    let action = |kind: ActionKind| {
        let mut descriptor = ActionDescriptor::new(kind).with_payment_data("scripted");
        descriptor.native_return_scheme = value.clone();
        WorkerResult::ActionRequired(descriptor)
    };

    match kind {
        "finished" => Ok(WorkerResult::Finished {
            result_code: value.clone().unwrap_or_else(|| "Authorised".to_string()),
        }),
        "redirect" => Ok(action(ActionKind::Redirect)),
        "wechat" => Ok(action(ActionKind::AppSwitch(AppSwitchProvider::WeChat))),
        "googlepay" => Ok(action(ActionKind::AppSwitch(AppSwitchProvider::GooglePay))),
        "challenge" => Ok(action(ActionKind::ChallengeDisplay)),
        "fatal" => Ok(WorkerResult::Failed {
            reason: "Refused".to_string(),
            message: value.clone().unwrap_or_else(|| "Payment refused".to_string()),
            fatal: true,
        }),
        "retryable" => Ok(WorkerResult::Failed {
            reason: "Retryable".to_string(),
            message: value.clone().unwrap_or_else(|| "Please try again".to_string()),
            fatal: false,
        }),
        other => Err(invalid(&format!("unknown response kind: {other}"))),
    }
}

fn scripted_event(kind: &str, value: Option<String>) -> Result<ExternalEvent> {
    let value = value.unwrap_or_default();
    match kind {
        "return_url" => Ok(ExternalEvent::return_url(&value)),
        "wechat" => Ok(ExternalEvent::app_switch(
            AppSwitchProvider::WeChat,
            parse_query(&value),
        )),
        "googlepay" => Ok(ExternalEvent::app_switch(
            AppSwitchProvider::GooglePay,
            parse_query(&value),
        )),
        "challenge" => Ok(ExternalEvent::challenge(parse_query(&value))),
        other => Err(invalid(&format!("unknown event kind: {other}"))),
    }
}

fn invalid(message: &str) -> FlowError {
    FlowError::ValidationError(message.to_string())
}

/// Reads scenario steps from a CSV source with an `op, kind, value` header.
pub struct ScriptReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ScriptReader<R> {
    /// Creates a new `ScriptReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and validates steps.
    ///
    /// A malformed row yields an error and reading continues with the next one.
    pub fn steps(self) -> impl Iterator<Item = Result<ScriptStep>> {
        self.reader
            .into_deserialize::<ScriptRecord>()
            .map(|result| result.map_err(FlowError::from).and_then(ScriptStep::try_from))
    }
}
