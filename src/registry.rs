//! Window registry
//!
//! Maps logical window identity to its [`SyncRecord`] behind one lock. Every
//! access is a short critical section: callers copy out what they need, drop
//! the lock, talk to the host, then write back. A reverse index resolves host
//! handles carried by inbound notifications.

use crate::client::WindowId;
use crate::error::SyncError;
use crate::host::HostWindowId;
use crate::record::SyncRecord;
use log::trace;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct RegistryInner {
    records: HashMap<WindowId, SyncRecord>,
    by_host: HashMap<HostWindowId, WindowId>,
}

/// Thread-safe table of sync records.
#[derive(Debug, Default)]
pub struct Registry {
    inner: Mutex<RegistryInner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record; a second record for the same window is refused
    pub fn insert(&self, record: SyncRecord) -> Result<(), SyncError> {
        let mut inner = self.inner.lock();
        if inner.records.contains_key(&record.id) {
            return Err(SyncError::AlreadyRegistered(record.id));
        }
        if let Some(host) = record.host {
            inner.by_host.insert(host, record.id);
        }
        trace!("registered {}", record.id);
        inner.records.insert(record.id, record);
        Ok(())
    }

    pub fn remove(&self, id: WindowId) -> Option<SyncRecord> {
        let mut inner = self.inner.lock();
        let record = inner.records.remove(&id)?;
        if let Some(host) = record.host {
            inner.by_host.remove(&host);
        }
        trace!("unregistered {}", id);
        Some(record)
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.inner.lock().records.contains_key(&id)
    }

    /// Copy of the record, detached from the registry
    pub fn snapshot(&self, id: WindowId) -> Option<SyncRecord> {
        self.inner.lock().records.get(&id).cloned()
    }

    /// Runs `f` on the record under the lock.
    ///
    /// `f` must not call out to the host or the client model.
    pub fn update<R>(&self, id: WindowId, f: impl FnOnce(&mut SyncRecord) -> R) -> Option<R> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let record = inner.records.get_mut(&id)?;
        let before = record.host;
        let result = f(record);
        let after = record.host;
        if before != after {
            if let Some(host) = before {
                inner.by_host.remove(&host);
            }
            if let Some(host) = after {
                inner.by_host.insert(host, id);
            }
        }
        Some(result)
    }

    /// Runs `f` on every record under the lock
    pub fn for_each_mut(&self, mut f: impl FnMut(&mut SyncRecord)) {
        let mut inner = self.inner.lock();
        for record in inner.records.values_mut() {
            f(record);
        }
    }

    /// Resolves a host handle to the logical window it backs
    pub fn find_by_host(&self, host: HostWindowId) -> Option<WindowId> {
        self.inner.lock().by_host.get(&host).copied()
    }

    /// Host handle of a window, optionally only if it is on screen
    pub fn host_window(&self, id: WindowId, require_on_screen: bool) -> Option<HostWindowId> {
        let inner = self.inner.lock();
        let record = inner.records.get(&id)?;
        if require_on_screen && !record.on_screen() {
            return None;
        }
        record.host
    }

    pub fn ids(&self) -> Vec<WindowId> {
        let mut ids: Vec<_> = self.inner.lock().records.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().records.is_empty()
    }
}
