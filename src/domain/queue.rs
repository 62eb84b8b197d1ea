use super::ports::WorkerChannel;
use super::request::{DetailsPayload, PaymentPayload, RequestKind, SubmissionRequest};
use super::result::RequestId;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A request the worker accepted during a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accepted {
    pub kind: RequestKind,
    pub request_id: RequestId,
}

/// Holds at most one unsent request per kind until the worker can take it.
///
/// A newer request of a kind overwrites the unsent older one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionQueue {
    payment: Option<PaymentPayload>,
    details: Option<DetailsPayload>,
}

impl ConnectionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `request` and delivers right away when the channel is connected.
    pub async fn enqueue(
        &mut self,
        request: SubmissionRequest,
        channel: &dyn WorkerChannel,
    ) -> Vec<Accepted> {
        let kind = request.kind();
        let replaced = match request {
            SubmissionRequest::PaymentSubmission(payload) => {
                self.payment.replace(payload).is_some()
            }
            SubmissionRequest::DetailsSubmission(payload) => {
                self.details.replace(payload).is_some()
            }
        };
        if replaced {
            debug!(%kind, "overwriting unsent request");
        }

        if channel.is_connected().await {
            self.flush(channel).await
        } else {
            debug!(%kind, "worker not connected, holding request");
            Vec::new()
        }
    }

    pub async fn on_connected(&mut self, channel: &dyn WorkerChannel) -> Vec<Accepted> {
        self.flush(channel).await
    }

    /// Sends held requests in flush order. A rejected request stays queued and
    /// blocks the ones behind it.
    async fn flush(&mut self, channel: &dyn WorkerChannel) -> Vec<Accepted> {
        let mut accepted = Vec::new();

        for kind in RequestKind::FLUSH_ORDER {
            let Some(request) = self.peek(kind) else {
                continue;
            };
            match channel.send(request).await {
                Ok(request_id) => {
                    debug!(%kind, %request_id, "request accepted by worker");
                    self.take(kind);
                    accepted.push(Accepted { kind, request_id });
                }
                Err(e) => {
                    warn!(%kind, error = %e, "delivery failed, request stays queued");
                    break;
                }
            }
        }

        accepted
    }

    pub fn clear(&mut self) {
        self.payment = None;
        self.details = None;
    }

    pub fn is_empty(&self) -> bool {
        self.payment.is_none() && self.details.is_none()
    }

    pub fn pending(&self, kind: RequestKind) -> bool {
        match kind {
            RequestKind::Payment => self.payment.is_some(),
            RequestKind::Details => self.details.is_some(),
        }
    }

    fn peek(&self, kind: RequestKind) -> Option<SubmissionRequest> {
        match kind {
            RequestKind::Payment => self
                .payment
                .clone()
                .map(SubmissionRequest::PaymentSubmission),
            RequestKind::Details => self
                .details
                .clone()
                .map(SubmissionRequest::DetailsSubmission),
        }
    }

    fn take(&mut self, kind: RequestKind) {
        match kind {
            RequestKind::Payment => self.payment = None,
            RequestKind::Details => self.details = None,
        }
    }
}
