use super::action::{ActionDescriptor, ExternalEvent};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Matched(ActionDescriptor),
    NoMatch,
}

/// Holds the one outstanding action and resolves resumption events against it.
///
/// A descriptor resolves at most once: the match consumes it, so a duplicate
/// delivery of the same event reports `NoMatch`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionResumptionRegistry {
    live: Option<ActionDescriptor>,
}

impl ActionResumptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: ActionDescriptor) {
        debug!(kind = %descriptor.kind, "registering live action");
        if let Some(previous) = self.live.replace(descriptor) {
            warn!(
                kind = %previous.kind,
                "replacing an unresolved live action"
            );
        }
    }

    pub fn resolve(&mut self, event: &ExternalEvent) -> Resolution {
        match self.live.take() {
            Some(descriptor) if descriptor.accepts(&event.discriminator) => {
                Resolution::Matched(descriptor)
            }
            other => {
                self.live = other;
                Resolution::NoMatch
            }
        }
    }

    /// Discards the live descriptor, e.g. on user cancellation.
    pub fn clear(&mut self) -> Option<ActionDescriptor> {
        self.live.take()
    }

    pub fn live(&self) -> Option<&ActionDescriptor> {
        self.live.as_ref()
    }
}
