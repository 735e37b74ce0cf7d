//! In-memory session store with a hard cap on live sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use tower_sessions::SessionStore;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store;
use tracing::{debug, warn};

/// Holds session records in memory. Expired records are dropped on load and
/// by [`BoundedMemoryStore::purge_expired`]; once `capacity` live sessions
/// exist, the one closest to expiry is evicted to make room.
#[derive(Clone, Debug)]
pub(crate) struct BoundedMemoryStore {
    records: Arc<Mutex<HashMap<Id, Record>>>,
    capacity: usize,
}

impl BoundedMemoryStore {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    // nothing panics while holding the lock, a poisoned map is still consistent
    fn records(&self) -> MutexGuard<'_, HashMap<Id, Record>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of records currently held, expired or not.
    pub(crate) fn len(&self) -> usize {
        self.records().len()
    }

    /// Drops every expired record, returning how many went.
    pub(crate) fn purge_expired(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        let mut records = self.records();
        let before = records.len();
        records.retain(|_, record| record.expiry_date > now);
        before - records.len()
    }

    fn insert(&self, record: &Record) {
        let now = OffsetDateTime::now_utc();
        let mut records = self.records();
        if !records.contains_key(&record.id) && records.len() >= self.capacity {
            records.retain(|_, existing| existing.expiry_date > now);
            if records.len() >= self.capacity {
                let oldest = records
                    .values()
                    .min_by_key(|existing| existing.expiry_date)
                    .map(|existing| existing.id);
                if let Some(oldest) = oldest {
                    warn!("Session store is full ({} sessions), evicting the oldest", self.capacity);
                    records.remove(&oldest);
                }
            }
        }
        records.insert(record.id, record.clone());
    }
}

#[async_trait]
impl SessionStore for BoundedMemoryStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        while self.records().contains_key(&record.id) {
            record.id = Id::default();
        }
        self.insert(record);
        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.insert(record);
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let mut records = self.records();
        match records.get(session_id) {
            Some(record) if record.expiry_date > OffsetDateTime::now_utc() => Ok(Some(record.clone())),
            Some(_) => {
                records.remove(session_id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.records().remove(session_id);
        Ok(())
    }
}

/// Purges expired sessions every `period`, for as long as the server runs.
pub(crate) async fn purge_expired_sessions(store: BoundedMemoryStore, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        let purged = store.purge_expired();
        if purged > 0 {
            debug!("Purged {purged} expired sessions, {} left", store.len());
        }
    }
}
