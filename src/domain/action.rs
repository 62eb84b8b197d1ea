use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppSwitchProvider {
    WeChat,
    GooglePay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Redirect,
    AppSwitch(AppSwitchProvider),
    ChallengeDisplay,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Redirect => write!(f, "redirect"),
            ActionKind::AppSwitch(AppSwitchProvider::WeChat) => write!(f, "app_switch(wechat)"),
            ActionKind::AppSwitch(AppSwitchProvider::GooglePay) => {
                write!(f, "app_switch(googlepay)")
            }
            ActionKind::ChallengeDisplay => write!(f, "challenge"),
        }
    }
}

/// Data the worker attached to an action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionPayload {
    /// Opaque state echoed back in the details call.
    pub payment_data: Option<String>,
    /// Presentation data such as a redirect URL or challenge token.
    pub data: BTreeMap<String, String>,
}

/// A step the worker asked the host to complete outside the request/response channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub kind: ActionKind,
    pub payload: ActionPayload,
    pub native_return_scheme: Option<String>,
}

impl ActionDescriptor {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            payload: ActionPayload::default(),
            native_return_scheme: None,
        }
    }

    pub fn with_return_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.native_return_scheme = Some(scheme.into());
        self
    }

    pub fn with_payment_data(mut self, payment_data: impl Into<String>) -> Self {
        self.payload.payment_data = Some(payment_data.into());
        self
    }

    /// Whether an event carrying `discriminator` can resume this action.
    ///
    /// Return URLs must start with the native return scheme when one is set.
    /// App-switch actions also accept a return URL, but only on their scheme.
    pub fn accepts(&self, discriminator: &EventDiscriminator) -> bool {
        match (&self.kind, discriminator) {
            (ActionKind::Redirect, EventDiscriminator::ReturnUrl(url)) => self.scheme_matches(url),
            (ActionKind::AppSwitch(expected), EventDiscriminator::AppSwitchCallback(actual)) => {
                expected == actual
            }
            (ActionKind::AppSwitch(_), EventDiscriminator::ReturnUrl(url)) => {
                self.native_return_scheme.is_some() && self.scheme_matches(url)
            }
            (ActionKind::ChallengeDisplay, EventDiscriminator::ChallengeResult) => true,
            _ => false,
        }
    }

    fn scheme_matches(&self, url: &str) -> bool {
        match &self.native_return_scheme {
            Some(scheme) => url.starts_with(scheme.as_str()),
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventDiscriminator {
    ReturnUrl(String),
    AppSwitchCallback(AppSwitchProvider),
    ChallengeResult,
}

/// A signal that arrives outside the request/response channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalEvent {
    pub discriminator: EventDiscriminator,
    pub payload: BTreeMap<String, String>,
}

impl ExternalEvent {
    /// Builds an event from a return URL; its query parameters become the payload.
    ///
    /// Values are taken as-is, without percent-decoding.
    pub fn return_url(url: &str) -> Self {
        let query = url.split_once('?').map(|(_, query)| query);
        Self {
            discriminator: EventDiscriminator::ReturnUrl(url.to_string()),
            payload: parse_query(query.unwrap_or_default()),
        }
    }

    pub fn app_switch(provider: AppSwitchProvider, payload: BTreeMap<String, String>) -> Self {
        Self {
            discriminator: EventDiscriminator::AppSwitchCallback(provider),
            payload,
        }
    }

    pub fn challenge(payload: BTreeMap<String, String>) -> Self {
        Self {
            discriminator: EventDiscriminator::ChallengeResult,
            payload,
        }
    }
}

/// Splits `a=1&b&c=3` into a map. A key without `=` maps to an empty value.
pub fn parse_query(query: &str) -> BTreeMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_scheme_matching() {
        let action = ActionDescriptor::new(ActionKind::Redirect).with_return_scheme("myapp://return");

        assert!(action.accepts(&EventDiscriminator::ReturnUrl(
            "myapp://return?redirectResult=abc".into()
        )));
        assert!(!action.accepts(&EventDiscriminator::ReturnUrl(
            "otherapp://return?redirectResult=abc".into()
        )));
        assert!(!action.accepts(&EventDiscriminator::ChallengeResult));
    }

    #[test]
    fn test_redirect_without_scheme_accepts_any_return_url() {
        let action = ActionDescriptor::new(ActionKind::Redirect);
        assert!(action.accepts(&EventDiscriminator::ReturnUrl("https://shop/return".into())));
    }

    #[test]
    fn test_app_switch_matching() {
        let action = ActionDescriptor::new(ActionKind::AppSwitch(AppSwitchProvider::WeChat));

        assert!(action.accepts(&EventDiscriminator::AppSwitchCallback(
            AppSwitchProvider::WeChat
        )));
        assert!(!action.accepts(&EventDiscriminator::AppSwitchCallback(
            AppSwitchProvider::GooglePay
        )));
        // No scheme means a return URL cannot be attributed to the app switch
        assert!(!action.accepts(&EventDiscriminator::ReturnUrl("myapp://x".into())));

        let action = action.with_return_scheme("wx123://");
        assert!(action.accepts(&EventDiscriminator::ReturnUrl("wx123://pay?ok=1".into())));
    }

    #[test]
    fn test_return_url_query_parsing() {
        let event = ExternalEvent::return_url("myapp://return?redirectResult=abc&flag&empty=");

        assert_eq!(event.payload.get("redirectResult").unwrap(), "abc");
        assert_eq!(event.payload.get("flag").unwrap(), "");
        assert_eq!(event.payload.get("empty").unwrap(), "");
        assert_eq!(
            event.discriminator,
            EventDiscriminator::ReturnUrl("myapp://return?redirectResult=abc&flag&empty=".into())
        );

        let bare = ExternalEvent::return_url("myapp://return");
        assert!(bare.payload.is_empty());
    }
}
