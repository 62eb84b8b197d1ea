use super::action::ActionDescriptor;
use super::request::SubmissionRequest;
use super::result::{DeliveredResult, RequestId, WorkerResult};
use super::snapshot::FlowSnapshot;
use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Sink the worker pushes results into while a host is attached.
pub type ResultListener = mpsc::UnboundedSender<DeliveredResult>;

/// Link between the host and the worker process.
#[async_trait]
pub trait WorkerChannel: Send + Sync {
    /// Attaches `listener` and redelivers every unacknowledged result, in
    /// acceptance order, before returning. Replaces any previous listener.
    async fn connect(&self, listener: ResultListener) -> Result<()>;
    /// Detaches the host. Work already accepted keeps running on the worker.
    async fn disconnect(&self) -> Result<()>;
    async fn is_connected(&self) -> bool;
    /// Fails with `NotConnected` when no listener is attached.
    async fn send(&self, request: SubmissionRequest) -> Result<RequestId>;
    /// Lets the worker forget a result the host has fully processed.
    async fn acknowledge(&self, request_id: RequestId) -> Result<()>;
}

/// The worker's upstream: performs the actual backend call for one request.
#[async_trait]
pub trait PaymentBackend: Send + Sync {
    async fn execute(&self, request: &SubmissionRequest) -> Result<WorkerResult>;
}

/// Host presentation layer. Fire-and-forget.
pub trait Presenter: Send + Sync {
    fn present(&self, action: &ActionDescriptor);
    fn present_error(&self, message: &str, fatal: bool);
    fn present_loading(&self, loading: bool);
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, snapshot: &FlowSnapshot) -> Result<()>;
    async fn load(&self, correlation_id: Uuid) -> Result<Option<FlowSnapshot>>;
    async fn remove(&self, correlation_id: Uuid) -> Result<()>;
}

pub type WorkerChannelBox = Box<dyn WorkerChannel>;
pub type PresenterBox = Box<dyn Presenter>;
pub type SnapshotStoreBox = Box<dyn SnapshotStore>;
pub type SnapshotStoreFactory = Box<dyn Fn() -> SnapshotStoreBox + Send + Sync>;
