use crate::domain::ports::SnapshotStore;
use crate::domain::snapshot::FlowSnapshot;
use crate::error::{FlowError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Column Family for storing flow snapshots.
pub const CF_SNAPSHOTS: &str = "snapshots";

/// A persistent snapshot store using RocksDB.
///
/// Snapshots are JSON values keyed by the correlation id bytes, so a
/// transaction survives the host process itself.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbSnapshotStore {
    db: Arc<DB>,
}

impl RocksDbSnapshotStore {
    /// Opens or creates a RocksDB instance at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_snapshots = ColumnFamilyDescriptor::new(CF_SNAPSHOTS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_snapshots])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn handle(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(CF_SNAPSHOTS).ok_or_else(|| {
            FlowError::InternalError(Box::new(std::io::Error::other(
                "Snapshots column family not found",
            )))
        })
    }
}

#[async_trait]
impl SnapshotStore for RocksDbSnapshotStore {
    async fn save(&self, snapshot: &FlowSnapshot) -> Result<()> {
        let cf = self.handle()?;
        let value = serde_json::to_vec(snapshot)?;
        self.db.put_cf(cf, snapshot.correlation_id.as_bytes(), value)?;
        Ok(())
    }

    async fn load(&self, correlation_id: Uuid) -> Result<Option<FlowSnapshot>> {
        let cf = self.handle()?;
        match self.db.get_cf(cf, correlation_id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn remove(&self, correlation_id: Uuid) -> Result<()> {
        let cf = self.handle()?;
        self.db.delete_cf(cf, correlation_id.as_bytes())?;
        Ok(())
    }
}
