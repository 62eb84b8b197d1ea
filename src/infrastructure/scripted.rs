use crate::domain::ports::PaymentBackend;
use crate::domain::request::SubmissionRequest;
use crate::domain::result::WorkerResult;
use crate::error::{FlowError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Backend answering each request with the next pre-programmed result.
///
/// Clones share the same script and request log.
#[derive(Debug, Default, Clone)]
pub struct ScriptedBackend {
    responses: Arc<Mutex<VecDeque<WorkerResult>>>,
    received: Arc<Mutex<Vec<SubmissionRequest>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, result: WorkerResult) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(result);
        }
    }

    /// Requests executed so far, in execution order.
    pub fn received(&self) -> Vec<SubmissionRequest> {
        self.received
            .lock()
            .map(|received| received.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PaymentBackend for ScriptedBackend {
    async fn execute(&self, request: &SubmissionRequest) -> Result<WorkerResult> {
        if let Ok(mut received) = self.received.lock() {
            received.push(request.clone());
        }
        let next = self
            .responses
            .lock()
            .map_err(|_| FlowError::InternalError("script lock poisoned".into()))?
            .pop_front();
        next.ok_or_else(|| {
            FlowError::ValidationError(format!("no scripted response for {} request", request.kind()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::DetailsPayload;

    #[tokio::test]
    async fn test_responses_in_order_then_error() {
        let backend = ScriptedBackend::new();
        backend.push(WorkerResult::Finished {
            result_code: "Authorised".into(),
        });
        let request = SubmissionRequest::DetailsSubmission(DetailsPayload::default());

        let first = backend.execute(&request).await.unwrap();
        assert!(matches!(first, WorkerResult::Finished { .. }));
        assert!(backend.execute(&request).await.is_err());
        assert_eq!(backend.received().len(), 2);
    }
}
