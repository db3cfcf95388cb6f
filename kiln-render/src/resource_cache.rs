use fnv::FnvHashMap;
use kiln_api::KilnResult;
use std::sync::{Arc, Mutex};

/// Key into one of the GPU object caches. Zero is never a valid key; descriptor types
/// reserve it to mean "hash not yet computed".
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHash(u64);

impl ResourceHash {
    pub fn from_raw(hash: u64) -> Self {
        debug_assert_ne!(hash, 0);
        ResourceHash(hash)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

struct ResourceCacheInner<ResourceT> {
    resources: FnvHashMap<ResourceHash, Arc<ResourceT>>,
    create_count: u64,
}

/// Hash-keyed cache of reference-counted objects. Insertion is lazy on first miss;
/// entries are never evicted individually, only bulk-cleared. Within one generation a
/// hash always maps to the same object.
pub struct ResourceCache<ResourceT> {
    inner: Mutex<ResourceCacheInner<ResourceT>>,
    debug_name: &'static str,
}

impl<ResourceT> ResourceCache<ResourceT> {
    pub fn new(debug_name: &'static str) -> Self {
        ResourceCache {
            inner: Mutex::new(ResourceCacheInner {
                resources: Default::default(),
                create_count: 0,
            }),
            debug_name,
        }
    }

    pub fn get(
        &self,
        hash: ResourceHash,
    ) -> Option<Arc<ResourceT>> {
        self.inner.lock().unwrap().resources.get(&hash).cloned()
    }

    /// Return the cached object for `hash`, or build one with `create_fn` and insert it.
    /// A failed build inserts nothing, so a later call can retry.
    pub fn get_or_create<F: FnOnce() -> KilnResult<ResourceT>>(
        &self,
        hash: ResourceHash,
        create_fn: F,
    ) -> KilnResult<Arc<ResourceT>> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(resource) = inner.resources.get(&hash) {
            return Ok(resource.clone());
        }

        log::trace!("Creating {} for hash {:x}", self.debug_name, hash.as_u64());
        let resource = Arc::new(create_fn()?);
        inner.create_count += 1;
        inner.resources.insert(hash, resource.clone());
        Ok(resource)
    }

    /// Visit every live entry. Used for the default-constant-buffer rebind broadcast,
    /// the one case where cached objects are updated in place.
    pub fn for_each<F: FnMut(&Arc<ResourceT>)>(
        &self,
        mut f: F,
    ) {
        let inner = self.inner.lock().unwrap();
        for resource in inner.resources.values() {
            f(resource);
        }
    }

    /// Drop every cached entry, beginning a new cache generation
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        log::debug!(
            "Clearing {} cache, dropping {} entries",
            self.debug_name,
            inner.resources.len()
        );
        inner.resources.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds performed since creation, across all generations
    pub fn create_count(&self) -> u64 {
        self.inner.lock().unwrap().create_count
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn get_or_create_builds_once_per_hash() {
        let cache = ResourceCache::<u32>::new("test");
        let hash = ResourceHash::from_raw(17);

        let a = cache.get_or_create(hash, || Ok(5)).unwrap();
        let b = cache.get_or_create(hash, || panic!("should not rebuild")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.create_count(), 1);
    }

    #[test]
    fn failed_build_is_not_inserted() {
        let cache = ResourceCache::<u32>::new("test");
        let hash = ResourceHash::from_raw(17);

        assert!(cache.get_or_create(hash, || Err("nope".into())).is_err());
        assert!(cache.get(hash).is_none());
        assert_eq!(cache.create_count(), 0);

        // A retry after the failure can succeed
        assert!(cache.get_or_create(hash, || Ok(5)).is_ok());
        assert_eq!(cache.create_count(), 1);
    }

    #[test]
    fn clear_begins_a_new_generation() {
        let cache = ResourceCache::<u32>::new("test");
        let hash = ResourceHash::from_raw(17);

        cache.get_or_create(hash, || Ok(5)).unwrap();
        cache.clear();
        assert!(cache.get(hash).is_none());
        cache.get_or_create(hash, || Ok(6)).unwrap();
        assert_eq!(cache.create_count(), 2);
    }
}
