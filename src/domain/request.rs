use crate::error::FlowError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Represents a positive monetary amount for a payment submission.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, FlowError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(FlowError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = FlowError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethodKind {
    Card,
    Ideal,
    WeChatPay,
    GooglePay,
}

impl FromStr for PaymentMethodKind {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "card" | "scheme" => Ok(Self::Card),
            "ideal" => Ok(Self::Ideal),
            "wechatpay" => Ok(Self::WeChatPay),
            "googlepay" => Ok(Self::GooglePay),
            other => Err(FlowError::ValidationError(format!(
                "Unknown payment method: {other}"
            ))),
        }
    }
}

/// What the user selected and confirmed on the payment screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPayload {
    pub method: PaymentMethodKind,
    pub amount: Amount,
    pub currency: String,
    pub reference: Option<String>,
}

/// Additional details that resume a payment after an action.
///
/// `payment_data` is the opaque state the worker handed out with the action and
/// expects back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailsPayload {
    pub payment_data: Option<String>,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    Payment,
    Details,
}

impl RequestKind {
    /// Flush order: a details call can only follow a payment attempt.
    pub const FLUSH_ORDER: [RequestKind; 2] = [RequestKind::Payment, RequestKind::Details];
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Payment => write!(f, "payment"),
            RequestKind::Details => write!(f, "details"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SubmissionRequest {
    PaymentSubmission(PaymentPayload),
    DetailsSubmission(DetailsPayload),
}

impl SubmissionRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            SubmissionRequest::PaymentSubmission(_) => RequestKind::Payment,
            SubmissionRequest::DetailsSubmission(_) => RequestKind::Details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1.0)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.0)),
            Err(FlowError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::try_from(dec!(-1.0)),
            Err(FlowError::ValidationError(_))
        ));
    }

    #[test]
    fn test_payment_method_parsing() {
        assert_eq!("scheme".parse::<PaymentMethodKind>().unwrap(), PaymentMethodKind::Card);
        assert_eq!("iDEAL".parse::<PaymentMethodKind>().unwrap(), PaymentMethodKind::Ideal);
        assert_eq!(
            "wechatpay".parse::<PaymentMethodKind>().unwrap(),
            PaymentMethodKind::WeChatPay
        );
        assert!("bitcoin".parse::<PaymentMethodKind>().is_err());
    }

    #[test]
    fn test_request_kind_and_flush_order() {
        let details = SubmissionRequest::DetailsSubmission(DetailsPayload::default());
        assert_eq!(details.kind(), RequestKind::Details);
        assert!(RequestKind::FLUSH_ORDER[0] < RequestKind::FLUSH_ORDER[1]);
    }
}
