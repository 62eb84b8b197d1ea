use crate::domain::action::{ActionDescriptor, ActionKind, AppSwitchProvider};
use crate::domain::ports::Presenter;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

/// Presenter for headless hosts: logs what would be shown.
///
/// Presentation is picked once per action kind; there is no per-method subtype.
#[derive(Debug, Default, Clone)]
pub struct TracingPresenter;

impl TracingPresenter {
    pub fn new() -> Self {
        Self
    }
}

impl Presenter for TracingPresenter {
    fn present(&self, action: &ActionDescriptor) {
        let target = action.payload.data.get("url").map(String::as_str);
        match action.kind {
            ActionKind::Redirect => info!(url = ?target, "opening redirect"),
            ActionKind::AppSwitch(AppSwitchProvider::WeChat) => {
                info!(scheme = ?action.native_return_scheme, "switching to WeChat")
            }
            ActionKind::AppSwitch(AppSwitchProvider::GooglePay) => {
                info!("launching Google Pay sheet")
            }
            ActionKind::ChallengeDisplay => info!("displaying challenge"),
        }
    }

    fn present_error(&self, message: &str, fatal: bool) {
        if fatal {
            error!(detail = message, "payment failed");
        } else {
            warn!(detail = message, "payment attempt failed, returning to selection");
        }
    }

    fn present_loading(&self, loading: bool) {
        info!(loading, "loading indicator");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PresentationEvent {
    Action(ActionDescriptor),
    Error { message: String, fatal: bool },
    Loading(bool),
}

/// Presenter that remembers every call. Clones share the same record.
#[derive(Debug, Default, Clone)]
pub struct RecordingPresenter {
    events: Arc<Mutex<Vec<PresentationEvent>>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PresentationEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn actions(&self) -> Vec<ActionDescriptor> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PresentationEvent::Action(action) => Some(action),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<(String, bool)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PresentationEvent::Error { message, fatal } => Some((message, fatal)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: PresentationEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl Presenter for RecordingPresenter {
    fn present(&self, action: &ActionDescriptor) {
        self.record(PresentationEvent::Action(action.clone()));
    }

    fn present_error(&self, message: &str, fatal: bool) {
        self.record(PresentationEvent::Error {
            message: message.to_string(),
            fatal,
        });
    }

    fn present_loading(&self, loading: bool) {
        self.record(PresentationEvent::Loading(loading));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_presenter_shares_record_across_clones() {
        let presenter = RecordingPresenter::new();
        let clone = presenter.clone();

        clone.present_loading(true);
        clone.present(&ActionDescriptor::new(ActionKind::ChallengeDisplay));
        clone.present_error("declined", true);

        assert_eq!(presenter.events().len(), 3);
        assert_eq!(presenter.actions().len(), 1);
        assert_eq!(presenter.errors(), vec![("declined".to_string(), true)]);
    }
}
