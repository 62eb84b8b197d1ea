use crate::domain::ports::{PaymentBackend, ResultListener, WorkerChannel};
use crate::domain::request::SubmissionRequest;
use crate::domain::result::{DeliveredResult, RequestId, WorkerResult};
use crate::error::{FlowError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

struct Job {
    request_id: RequestId,
    request: SubmissionRequest,
}

/// Worker-side view of the host link.
#[derive(Default)]
struct Link {
    listener: Option<ResultListener>,
    last_id: u64,
    /// Results kept until the host acknowledges them, keyed in acceptance order.
    retained: BTreeMap<RequestId, WorkerResult>,
}

impl Link {
    fn is_attached(&self) -> bool {
        self.listener.as_ref().is_some_and(|l| !l.is_closed())
    }

    fn deliver(&mut self, request_id: RequestId, result: WorkerResult) {
        let Some(listener) = &self.listener else {
            debug!(%request_id, "no host attached, retaining result");
            return;
        };
        if listener
            .send(DeliveredResult { request_id, result })
            .is_err()
        {
            debug!(%request_id, "host listener dropped, retaining result");
            self.listener = None;
        }
    }
}

/// A worker process living beside the host.
///
/// Clones share the same worker, so a recreated host reaches the work its
/// predecessor started. One task executes requests FIFO, which keeps results
/// in acceptance order.
#[derive(Clone)]
pub struct InMemoryWorker {
    link: Arc<Mutex<Link>>,
    jobs: mpsc::UnboundedSender<Job>,
}

impl InMemoryWorker {
    /// Starts the worker task. Must be called inside a tokio runtime.
    pub fn spawn(backend: Arc<dyn PaymentBackend>) -> Self {
        let (jobs, rx) = mpsc::unbounded_channel();
        let link = Arc::new(Mutex::new(Link::default()));
        tokio::spawn(run(backend, rx, link.clone()));
        Self { link, jobs }
    }

    /// Number of results produced but not yet acknowledged by a host.
    pub async fn retained(&self) -> usize {
        self.link.lock().await.retained.len()
    }
}

async fn run(
    backend: Arc<dyn PaymentBackend>,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    link: Arc<Mutex<Link>>,
) {
    while let Some(Job {
        request_id,
        request,
    }) = jobs.recv().await
    {
        let result = match backend.execute(&request).await {
            Ok(result) => result,
            Err(e) => {
                warn!(%request_id, error = %e, "backend call failed");
                WorkerResult::Failed {
                    reason: "BackendError".to_string(),
                    message: e.to_string(),
                    fatal: false,
                }
            }
        };

        let mut link = link.lock().await;
        link.retained.insert(request_id, result.clone());
        link.deliver(request_id, result);
    }
    debug!("worker stopped");
}

#[async_trait]
impl WorkerChannel for InMemoryWorker {
    async fn connect(&self, listener: ResultListener) -> Result<()> {
        let mut link = self.link.lock().await;
        link.listener = Some(listener);

        let retained: Vec<_> = link
            .retained
            .iter()
            .map(|(id, result)| (*id, result.clone()))
            .collect();
        if !retained.is_empty() {
            debug!(count = retained.len(), "redelivering retained results");
        }
        for (request_id, result) in retained {
            link.deliver(request_id, result);
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.link.lock().await.listener = None;
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.link.lock().await.is_attached()
    }

    async fn send(&self, request: SubmissionRequest) -> Result<RequestId> {
        let mut link = self.link.lock().await;
        if !link.is_attached() {
            return Err(FlowError::NotConnected);
        }

        let request_id = RequestId(link.last_id + 1);
        self.jobs
            .send(Job {
                request_id,
                request,
            })
            .map_err(|_| {
                FlowError::InternalError(Box::new(std::io::Error::other("worker task stopped")))
            })?;
        link.last_id = request_id.0;
        Ok(request_id)
    }

    async fn acknowledge(&self, request_id: RequestId) -> Result<()> {
        self.link.lock().await.retained.remove(&request_id);
        Ok(())
    }
}
