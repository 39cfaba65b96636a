use crate::repository::Repository;
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// One repository per domain type, resolved by type.
#[derive(Default)]
pub struct Repositories {
    entries: RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl Repositories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the repository for `D`. The first registration wins; later
    /// ones return `false` and are dropped.
    pub fn register<D: 'static>(&self, repository: Arc<dyn Repository<D>>) -> bool {
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let id = TypeId::of::<D>();
        if entries.contains_key(&id) {
            warn!(domain = type_name::<D>(), "Repository already registered");
            return false;
        }
        entries.insert(id, Box::new(repository));
        debug!(domain = type_name::<D>(), "Registered repository");
        true
    }

    pub fn get<D: 'static>(&self) -> Option<Arc<dyn Repository<D>>> {
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries
            .get(&TypeId::of::<D>())
            .and_then(|entry| entry.downcast_ref::<Arc<dyn Repository<D>>>())
            .cloned()
    }

    pub fn contains<D: 'static>(&self) -> bool {
        self.get::<D>().is_some()
    }

    pub fn len(&self) -> usize {
        match self.entries.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repositories")
            .field("len", &self.len())
            .finish()
    }
}
