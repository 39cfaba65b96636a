//! Logical execution chains.
//!
//! A [`Chain`] is the explicit value that ties statements together: every
//! statement issued with the same chain against the same database key runs in
//! the transaction that chain has open for that key, if any.

use crate::db::driver::{IsolationLevel, NativeTransaction};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Handle to a logical execution chain.
///
/// Clones share the chain. [`Chain::fork`] creates a child chain that sees
/// the parent's open transactions but whose own transactions stay invisible
/// to the parent.
#[derive(Clone)]
pub struct Chain {
    inner: Arc<ChainInner>,
}

struct ChainInner {
    id: Uuid,
    parent: Option<Uuid>,
    slots: Mutex<HashMap<String, Arc<ActiveTransaction>>>,
}

impl Chain {
    /// Start an unrelated chain with no open transactions.
    pub fn new() -> Self {
        Self::with_slots(None, HashMap::new())
    }

    fn with_slots(parent: Option<Uuid>, slots: HashMap<String, Arc<ActiveTransaction>>) -> Self {
        Self {
            inner: Arc::new(ChainInner {
                id: Uuid::new_v4(),
                parent,
                slots: Mutex::new(slots),
            }),
        }
    }

    /// Child chain inheriting the transactions open right now.
    pub fn fork(&self) -> Self {
        let slots = self
            .lock()
            .iter()
            .filter(|(_, tx)| !tx.is_finished())
            .map(|(key, tx)| (key.clone(), Arc::clone(tx)))
            .collect();
        Self::with_slots(Some(self.inner.id), slots)
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn parent_id(&self) -> Option<Uuid> {
        self.inner.parent
    }

    /// True if both handles refer to the same chain.
    pub fn same_chain(&self, other: &Chain) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// True if a transaction is open on this chain for `key`.
    pub fn in_transaction(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Keys with an open transaction.
    pub fn active_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .lock()
            .iter()
            .filter(|(_, tx)| !tx.is_finished())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub(crate) fn get(&self, key: &str) -> Option<Arc<ActiveTransaction>> {
        self.lock()
            .get(key)
            .filter(|tx| !tx.is_finished())
            .cloned()
    }

    /// Store `tx` unless an open transaction already occupies the slot.
    pub(crate) fn try_insert(&self, key: &str, tx: Arc<ActiveTransaction>) -> bool {
        let mut slots = self.lock();
        if slots.get(key).is_some_and(|existing| !existing.is_finished()) {
            return false;
        }
        slots.insert(key.to_string(), tx);
        true
    }

    pub(crate) fn take(&self, key: &str) -> Option<Arc<ActiveTransaction>> {
        let mut slots = self.lock();
        match slots.remove(key) {
            Some(tx) if !tx.is_finished() => Some(tx),
            _ => None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<ActiveTransaction>>> {
        match self.inner.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner.id)
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("id", &self.inner.id)
            .field("parent", &self.inner.parent)
            .field("active", &self.active_keys())
            .finish()
    }
}

/// A native transaction owned by one chain slot.
///
/// Statements from concurrent tasks sharing the chain are serialized on the
/// inner async mutex.
pub(crate) struct ActiveTransaction {
    tx: tokio::sync::Mutex<Option<Box<dyn NativeTransaction>>>,
    failed: AtomicBool,
    finished: AtomicBool,
    pub(crate) isolation: Option<IsolationLevel>,
    pub(crate) started_at: DateTime<Utc>,
}

impl ActiveTransaction {
    pub(crate) fn new(tx: Box<dyn NativeTransaction>, isolation: Option<IsolationLevel>) -> Self {
        Self {
            tx: tokio::sync::Mutex::new(Some(tx)),
            failed: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            isolation,
            started_at: Utc::now(),
        }
    }

    pub(crate) fn native(&self) -> &tokio::sync::Mutex<Option<Box<dyn NativeTransaction>>> {
        &self.tx
    }

    /// Record a failed statement; the transaction can then only roll back.
    pub(crate) fn mark_failed(&self) {
        self.failed.store(true, Ordering::Release);
    }

    pub(crate) fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Take the native transaction for commit or rollback.
    pub(crate) async fn finish(&self) -> Option<Box<dyn NativeTransaction>> {
        self.finished.store(true, Ordering::Release);
        self.tx.lock().await.take()
    }
}
