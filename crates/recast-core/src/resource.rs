//! Transient resource handle tracking.
//!
//! Every encoded output that needs an addressable reference (an object URL
//! in the browser) gets a [`ResourceHandle`]. The [`ResourceManager`] records
//! which handles are live and guarantees each one is released exactly once:
//! explicitly through [`ResourceManager::revoke`], or when the manager is
//! dropped.
//!
//! The actual allocation is delegated to a [`ResourceBackend`]. The WASM
//! bindings use `Blob` + `URL.createObjectURL`; [`MemoryBackend`] keeps the
//! bytes in a map and is what native callers and tests use.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::{debug, trace};

/// Errors raised while allocating a handle.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The backend could not allocate a handle for the bytes.
    #[error("Failed to create resource handle: {0}")]
    CreateFailed(String),
}

/// Allocates and releases addressable references to byte buffers.
pub trait ResourceBackend {
    /// Allocate a new handle for `bytes` and return its address.
    fn create(&mut self, bytes: &[u8], mime_type: &str) -> Result<String, ResourceError>;

    /// Release a previously created address. Called at most once per address.
    fn revoke(&mut self, url: &str);
}

/// Source of manager identities, so a handle is only ever recognised by
/// the manager that created it.
static NEXT_OWNER: AtomicU64 = AtomicU64::new(0);

/// A live reference to a byte buffer, as handed to the display surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    owner: u64,
    id: u64,
    url: String,
}

impl ResourceHandle {
    /// Address of the resource (an object URL in the browser).
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Tracks live handles and pairs every create with exactly one revoke.
#[derive(Debug)]
pub struct ResourceManager<B: ResourceBackend> {
    backend: B,
    owner: u64,
    live: HashMap<u64, String>,
    next_id: u64,
    created: u64,
    revoked: u64,
}

impl<B: ResourceBackend> ResourceManager<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            owner: NEXT_OWNER.fetch_add(1, Ordering::Relaxed),
            live: HashMap::new(),
            next_id: 0,
            created: 0,
            revoked: 0,
        }
    }

    /// Allocate a new handle and record it as live.
    pub fn create(&mut self, bytes: &[u8], mime_type: &str) -> Result<ResourceHandle, ResourceError> {
        let url = self.backend.create(bytes, mime_type)?;
        let id = self.next_id;
        self.next_id += 1;
        self.created += 1;
        self.live.insert(id, url.clone());
        trace!(id, url = %url, bytes = bytes.len(), "resource handle created");
        Ok(ResourceHandle {
            owner: self.owner,
            id,
            url,
        })
    }

    /// Release a handle.
    ///
    /// Idempotent: revoking an already-revoked or unknown handle does
    /// nothing, and so does a handle created by another manager. Returns
    /// `true` if this call released it.
    pub fn revoke(&mut self, handle: &ResourceHandle) -> bool {
        if !self.is_live(handle) {
            return false;
        }
        self.revoke_id(handle.id)
    }

    /// Release the live handle with this address, if any.
    pub fn revoke_url(&mut self, url: &str) -> bool {
        let id = self
            .live
            .iter()
            .find_map(|(id, live_url)| (live_url == url).then_some(*id));
        match id {
            Some(id) => self.revoke_id(id),
            None => false,
        }
    }

    /// Swap a handle for one pointing at `bytes`.
    ///
    /// The new handle is created before the old one is released, so if the
    /// create fails the old handle is still valid and still live.
    pub fn replace(
        &mut self,
        old: Option<&ResourceHandle>,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<ResourceHandle, ResourceError> {
        let new = self.create(bytes, mime_type)?;
        if let Some(old) = old {
            self.revoke(old);
        }
        Ok(new)
    }

    /// Release every live handle. Returns how many were released.
    pub fn revoke_all(&mut self) -> usize {
        let ids: Vec<u64> = self.live.keys().copied().collect();
        ids.into_iter().filter(|&id| self.revoke_id(id)).count()
    }

    pub fn is_live(&self, handle: &ResourceHandle) -> bool {
        handle.owner == self.owner && self.live.get(&handle.id) == Some(&handle.url)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Total handles created over the manager's lifetime.
    pub fn created_count(&self) -> u64 {
        self.created
    }

    /// Total handles released over the manager's lifetime.
    pub fn revoked_count(&self) -> u64 {
        self.revoked
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn revoke_id(&mut self, id: u64) -> bool {
        match self.live.remove(&id) {
            Some(url) => {
                self.backend.revoke(&url);
                self.revoked += 1;
                trace!(id, url = %url, "resource handle revoked");
                true
            }
            None => false,
        }
    }
}

impl<B: ResourceBackend> Drop for ResourceManager<B> {
    fn drop(&mut self) {
        let leaked = self.revoke_all();
        if leaked > 0 {
            debug!(count = leaked, "revoked handles still live at drop");
        }
    }
}

/// Backend that keeps the bytes in memory under synthetic addresses.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    next: u64,
    entries: HashMap<String, (String, Vec<u8>)>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes behind a live address.
    pub fn get(&self, url: &str) -> Option<&[u8]> {
        self.entries.get(url).map(|(_, bytes)| bytes.as_slice())
    }

    pub fn mime_type(&self, url: &str) -> Option<&str> {
        self.entries.get(url).map(|(mime, _)| mime.as_str())
    }

    /// Number of buffers currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResourceBackend for MemoryBackend {
    fn create(&mut self, bytes: &[u8], mime_type: &str) -> Result<String, ResourceError> {
        let url = format!("memory:recast/{}", self.next);
        self.next += 1;
        self.entries
            .insert(url.clone(), (mime_type.to_string(), bytes.to_vec()));
        Ok(url)
    }

    fn revoke(&mut self, url: &str) {
        self.entries.remove(url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Backend that refuses every allocation.
    struct FailingBackend;

    impl ResourceBackend for FailingBackend {
        fn create(&mut self, _bytes: &[u8], _mime_type: &str) -> Result<String, ResourceError> {
            Err(ResourceError::CreateFailed("out of handles".to_string()))
        }

        fn revoke(&mut self, _url: &str) {
            panic!("nothing was created");
        }
    }

    #[test]
    fn test_create_and_revoke() {
        let mut manager = ResourceManager::new(MemoryBackend::new());
        let handle = manager.create(b"abc", "image/png").unwrap();

        assert!(manager.is_live(&handle));
        assert_eq!(manager.live_count(), 1);
        assert_eq!(manager.backend().get(handle.url()), Some(&b"abc"[..]));
        assert_eq!(manager.backend().mime_type(handle.url()), Some("image/png"));

        assert!(manager.revoke(&handle));
        assert!(!manager.is_live(&handle));
        assert_eq!(manager.live_count(), 0);
        assert!(manager.backend().is_empty());
    }

    #[test]
    fn test_revoke_is_idempotent() {
        let mut manager = ResourceManager::new(MemoryBackend::new());
        let handle = manager.create(b"abc", "image/png").unwrap();

        assert!(manager.revoke(&handle));
        assert!(!manager.revoke(&handle));
        assert_eq!(manager.revoked_count(), 1);
    }

    #[test]
    fn test_revoke_unknown_is_noop() {
        let mut manager = ResourceManager::new(MemoryBackend::new());
        let stranger = ResourceHandle {
            owner: u64::MAX,
            id: 42,
            url: "memory:recast/42".to_string(),
        };
        assert!(!manager.revoke(&stranger));
        assert!(!manager.revoke_url("blob:nowhere"));
        assert_eq!(manager.revoked_count(), 0);
    }

    #[test]
    fn test_handle_from_other_manager_is_ignored() {
        let mut a = ResourceManager::new(MemoryBackend::new());
        let mut b = ResourceManager::new(MemoryBackend::new());
        let ha = a.create(b"a", "image/png").unwrap();
        let hb = b.create(b"b", "image/png").unwrap();
        assert_eq!((ha.id(), ha.url()), (hb.id(), hb.url()));

        assert!(!b.is_live(&ha));
        assert!(!b.revoke(&ha));
        assert!(b.is_live(&hb));
        assert_eq!(b.live_count(), 1);
        assert_eq!(b.revoked_count(), 0);

        assert!(a.revoke(&ha));
        assert!(b.revoke(&hb));
    }

    #[test]
    fn test_revoke_by_url() {
        let mut manager = ResourceManager::new(MemoryBackend::new());
        let a = manager.create(b"a", "image/png").unwrap();
        let b = manager.create(b"b", "image/png").unwrap();

        assert!(manager.revoke_url(a.url()));
        assert!(!manager.is_live(&a));
        assert!(manager.is_live(&b));
    }

    #[test]
    fn test_replace_revokes_old() {
        let mut manager = ResourceManager::new(MemoryBackend::new());
        let old = manager.create(b"old", "image/jpeg").unwrap();
        let new = manager.replace(Some(&old), b"new", "image/jpeg").unwrap();

        assert!(!manager.is_live(&old));
        assert!(manager.is_live(&new));
        assert_ne!(old.url(), new.url());
        assert_eq!(manager.live_count(), 1);
        assert_eq!(manager.backend().get(new.url()), Some(&b"new"[..]));
    }

    #[test]
    fn test_replace_without_previous() {
        let mut manager = ResourceManager::new(MemoryBackend::new());
        let handle = manager.replace(None, b"first", "image/png").unwrap();
        assert!(manager.is_live(&handle));
        assert_eq!(manager.live_count(), 1);
    }

    #[test]
    fn test_replace_after_external_revoke() {
        let mut manager = ResourceManager::new(MemoryBackend::new());
        let old = manager.create(b"old", "image/png").unwrap();
        manager.revoke(&old);

        let new = manager.replace(Some(&old), b"new", "image/png").unwrap();
        assert_eq!(manager.live_count(), 1);
        assert_eq!(manager.revoked_count(), 1);
        assert!(manager.is_live(&new));
    }

    #[test]
    fn test_failed_create_records_nothing() {
        let mut manager = ResourceManager::new(FailingBackend);
        assert!(manager.create(b"x", "image/png").is_err());
        assert_eq!(manager.live_count(), 0);
        assert_eq!(manager.created_count(), 0);
    }

    #[test]
    fn test_revoke_all() {
        let mut manager = ResourceManager::new(MemoryBackend::new());
        for _ in 0..3 {
            manager.create(b"x", "image/png").unwrap();
        }
        assert_eq!(manager.revoke_all(), 3);
        assert_eq!(manager.live_count(), 0);
        assert!(manager.backend().is_empty());
        assert_eq!(manager.revoke_all(), 0);
    }

    #[test]
    fn test_drop_revokes_live_handles() {
        use std::cell::RefCell;
        use std::rc::Rc;

        #[derive(Default)]
        struct Recording(Rc<RefCell<Vec<String>>>);

        impl ResourceBackend for Recording {
            fn create(&mut self, _bytes: &[u8], _mime: &str) -> Result<String, ResourceError> {
                Ok(format!("rec:{}", self.0.borrow().len()))
            }

            fn revoke(&mut self, url: &str) {
                self.0.borrow_mut().push(url.to_string());
            }
        }

        let revoked = Rc::new(RefCell::new(Vec::new()));
        {
            let mut manager = ResourceManager::new(Recording(revoked.clone()));
            manager.create(b"x", "image/png").unwrap();
        }
        assert_eq!(*revoked.borrow(), vec!["rec:0".to_string()]);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[derive(Debug, Clone)]
    enum Op {
        Create,
        Revoke(usize),
        Replace(Option<usize>),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Create),
            (0usize..32).prop_map(Op::Revoke),
            proptest::option::of(0usize..32).prop_map(Op::Replace),
        ]
    }

    proptest! {
        /// Property: live handles always equal effective creates minus
        /// effective revokes, and match an independent model.
        #[test]
        fn prop_resource_balance(ops in prop::collection::vec(op_strategy(), 0..64)) {
            let mut manager = ResourceManager::new(MemoryBackend::new());
            let mut issued: Vec<ResourceHandle> = Vec::new();
            let mut model: HashSet<u64> = HashSet::new();

            for op in ops {
                match op {
                    Op::Create => {
                        let handle = manager.create(b"data", "image/png").unwrap();
                        model.insert(handle.id());
                        issued.push(handle);
                    }
                    Op::Revoke(i) => {
                        if let Some(handle) = issued.get(i) {
                            let was_live = model.remove(&handle.id());
                            prop_assert_eq!(manager.revoke(handle), was_live);
                        }
                    }
                    Op::Replace(i) => {
                        let old = i.and_then(|i| issued.get(i)).cloned();
                        let new = manager.replace(old.as_ref(), b"data", "image/png").unwrap();
                        if let Some(old) = old {
                            model.remove(&old.id());
                        }
                        model.insert(new.id());
                        issued.push(new);
                    }
                }

                prop_assert_eq!(manager.live_count(), model.len());
                prop_assert_eq!(
                    manager.live_count() as u64,
                    manager.created_count() - manager.revoked_count()
                );
                prop_assert_eq!(manager.backend().len(), model.len());
            }
        }
    }
}
