use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

/// Page-level resources shared by every listbox mounted on the same page:
/// the focus cursor, the active-instance slot and the ancestor event bus.
/// Entries are keyed by type, so each resource type exists at most once.
#[derive(Clone, Default)]
pub struct PageResources {
    inner: Arc<RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>>,
}

impl PageResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_arc<T>(&self, value: Arc<T>) -> Result<(), SharedStateError>
    where
        T: Send + Sync + 'static,
    {
        let mut guard = self.inner.write().map_err(|_| SharedStateError::Poisoned)?;
        let type_id = TypeId::of::<T>();
        if guard.contains_key(&type_id) {
            return Err(SharedStateError::AlreadyExists);
        }
        guard.insert(type_id, Box::new(value));
        Ok(())
    }

    pub fn get<T>(&self) -> Result<Arc<T>, SharedStateError>
    where
        T: Send + Sync + 'static,
    {
        let guard = self.inner.read().map_err(|_| SharedStateError::Poisoned)?;
        guard
            .get(&TypeId::of::<T>())
            .ok_or(SharedStateError::Missing)?
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or(SharedStateError::TypeMismatch)
    }

    /// Fetch `T`, creating it with `make` on first use. Concurrent first uses
    /// agree on a single instance.
    pub fn get_or_insert_with<T, F>(&self, make: F) -> Result<Arc<T>, SharedStateError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let mut guard = self.inner.write().map_err(|_| SharedStateError::Poisoned)?;
        let entry = guard
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Arc::new(make())) as Box<dyn Any + Send + Sync>);
        entry
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or(SharedStateError::TypeMismatch)
    }
}

#[derive(Debug, Error)]
pub enum SharedStateError {
    #[error("page resource already exists")]
    AlreadyExists,
    #[error("page resource missing")]
    Missing,
    #[error("page resource type mismatch")]
    TypeMismatch,
    #[error("page resources poisoned")]
    Poisoned,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Counter(u32);

    #[test]
    fn duplicate_insert_fails() {
        let resources = PageResources::new();
        resources.insert_arc(Arc::new(Counter(1))).unwrap();
        let err = resources.insert_arc(Arc::new(Counter(2))).unwrap_err();
        assert!(matches!(err, SharedStateError::AlreadyExists));
        assert_eq!(resources.get::<Counter>().unwrap().0, 1);
    }

    #[test]
    fn missing_resource() {
        let resources = PageResources::new();
        assert!(matches!(
            resources.get::<Counter>().unwrap_err(),
            SharedStateError::Missing
        ));
    }

    #[test]
    fn clones_share_lazily_created_resources() {
        let resources = PageResources::new();
        let page_view = resources.clone();
        let first = resources.get_or_insert_with(|| Counter(7)).unwrap();
        let second = page_view.get_or_insert_with(|| Counter(99)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.0, 7);
    }
}
