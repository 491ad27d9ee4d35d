use std::sync::Arc;

use arc_swap::ArcSwap;
use eureka_core::{Applications, Instance};

/// Last successfully fetched view of the registry.
///
/// Readers get an immutable snapshot; a refresh swaps the whole map in one step.
#[derive(Debug, Default)]
pub struct RegistryCache {
    snapshot: ArcSwap<Applications>,
}

impl RegistryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<Applications> {
        self.snapshot.load_full()
    }

    pub fn replace(&self, applications: Applications) {
        self.snapshot.store(Arc::new(applications));
    }

    pub fn instances(&self, app: &str) -> Option<Vec<Instance>> {
        self.snapshot.load().get(app).cloned()
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_swaps_whole_snapshot() {
        let cache = RegistryCache::new();
        let mut first = Applications::new();
        first.insert("foo".to_string(), vec![Instance::default()]);
        cache.replace(first);

        let before = cache.snapshot();

        let mut second = Applications::new();
        second.insert("bar".to_string(), Vec::new());
        cache.replace(second);

        assert!(before.contains_key("foo"));
        assert!(cache.instances("foo").is_none());
        assert_eq!(cache.instances("bar"), Some(Vec::new()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let cache = RegistryCache::new();
        let mut apps = Applications::new();
        apps.insert("ORDERS".to_string(), vec![Instance::default()]);
        cache.replace(apps);

        assert!(cache.instances("ORDERS").is_some());
        assert!(cache.instances("orders").is_none());
    }
}
