use crate::domain::ports::SnapshotStore;
use crate::domain::snapshot::FlowSnapshot;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A thread-safe in-memory store for flow snapshots.
///
/// Clones share the same map, so a snapshot written by one host is visible to
/// the host that replaces it within the same process.
#[derive(Default, Clone)]
pub struct InMemorySnapshotStore {
    snapshots: Arc<RwLock<HashMap<Uuid, FlowSnapshot>>>,
}

impl InMemorySnapshotStore {
    /// Creates a new, empty in-memory snapshot store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save(&self, snapshot: &FlowSnapshot) -> Result<()> {
        let mut snapshots = self.snapshots.write().await;
        snapshots.insert(snapshot.correlation_id, snapshot.clone());
        Ok(())
    }

    async fn load(&self, correlation_id: Uuid) -> Result<Option<FlowSnapshot>> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots.get(&correlation_id).cloned())
    }

    async fn remove(&self, correlation_id: Uuid) -> Result<()> {
        let mut snapshots = self.snapshots.write().await;
        snapshots.remove(&correlation_id);
        Ok(())
    }
}
