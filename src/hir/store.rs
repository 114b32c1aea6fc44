//! UID directory with weak references and fault-in.
//!
//! The [`IdentityStore`] is the only strong owner of model objects. Anything
//! else refers to them by [`Uid`] and goes through [`IdentityStore::resolve`]
//! on every access, so a removed object simply stops resolving.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::base::FileId;

use super::codec;
use super::decl::{Declaration, OffsetList};
use super::error::StoreError;
use super::ids::{Uid, UidKey};

/// Store ids are process-wide so UIDs of different projects never collide.
/// Ids are never reused; allocation fails once the `u16` range is spent.
static NEXT_STORE_ID: AtomicU32 = AtomicU32::new(0);

fn allocate_store_id() -> Result<u16, StoreError> {
    NEXT_STORE_ID
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, advance_store_id)
        .map_err(|_| StoreError::StoreIdsExhausted)
        .and_then(|id| u16::try_from(id).map_err(|_| StoreError::StoreIdsExhausted))
}

/// The counter value after handing out `next`, or `None` once `next` no
/// longer fits a UID's store bits.
fn advance_store_id(next: u32) -> Option<u32> {
    (next <= u32::from(u16::MAX)).then(|| next + 1)
}

// ============================================================================
// ENTITIES
// ============================================================================

/// Per-file unit: top-level declarations, file-level using directives and
/// the include list used for visibility.
#[derive(Debug)]
pub struct FileUnit {
    pub file: FileId,
    pub path: String,
    pub uid: Uid,
    pub declarations: OffsetList,
    /// Files this file includes; `None` until the host reports them.
    pub includes: RwLock<Option<Vec<FileId>>>,
}

impl FileUnit {
    pub fn new(uid: Uid, file: FileId, path: impl Into<String>) -> Self {
        Self {
            file,
            path: path.into(),
            uid,
            declarations: OffsetList::new(),
            includes: RwLock::new(None),
        }
    }
}

/// An object registered in the store.
#[derive(Debug, Clone)]
pub enum Entity {
    Declaration(Arc<Declaration>),
    File(Arc<FileUnit>),
}

impl Entity {
    pub fn uid(&self) -> Uid {
        match self {
            Self::Declaration(decl) => decl.uid(),
            Self::File(unit) => unit.uid,
        }
    }

    pub fn as_declaration(&self) -> Option<&Arc<Declaration>> {
        match self {
            Self::Declaration(decl) => Some(decl),
            Self::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&Arc<FileUnit>> {
        match self {
            Self::File(unit) => Some(unit),
            Self::Declaration(_) => None,
        }
    }
}

// ============================================================================
// PERSISTENCE BACKENDS
// ============================================================================

/// Key/value persistence beneath the store.
pub trait Storage: Send + Sync + fmt::Debug {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory backend, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blobs: RwLock<FxHashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.blobs.write().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.blobs.read().get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.blobs.write().remove(key);
        Ok(())
    }
}

/// One file per key under a root directory.
#[derive(Debug)]
pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            key: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.bin"))
    }
}

impl Storage for DirStorage {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        std::fs::write(self.path_for(key), bytes).map_err(|source| StoreError::Io {
            key: key.to_string(),
            source,
        })
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match std::fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

// ============================================================================
// IDENTITY STORE
// ============================================================================

pub struct IdentityStore {
    id: u16,
    next_slot: AtomicU64,
    live: RwLock<FxHashMap<Uid, Entity>>,
    /// Content key → last UID issued for it.
    keys: RwLock<FxHashMap<UidKey, Uid>>,
    /// Objects dropped from memory whose blobs remain in storage.
    evicted: RwLock<FxHashSet<Uid>>,
    storage: Option<Arc<dyn Storage>>,
}

impl fmt::Debug for IdentityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityStore")
            .field("id", &self.id)
            .field("live", &self.live.read().len())
            .field("evicted", &self.evicted.read().len())
            .field("storage", &self.storage)
            .finish()
    }
}

impl Default for IdentityStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl IdentityStore {
    /// # Panics
    ///
    /// When the process has already created 65,536 stores. Use
    /// [`IdentityStore::try_new`] to handle that case.
    pub fn new(storage: Option<Arc<dyn Storage>>) -> Self {
        match Self::try_new(storage) {
            Ok(store) => store,
            Err(err) => panic!("{err}"),
        }
    }

    /// A store with a fresh process-wide id, or
    /// [`StoreError::StoreIdsExhausted`] once every id has been handed out.
    pub fn try_new(storage: Option<Arc<dyn Storage>>) -> Result<Self, StoreError> {
        let id = allocate_store_id().inspect_err(|err| tracing::error!("[STORE] {err}"))?;
        Ok(Self {
            id,
            next_slot: AtomicU64::new(1),
            live: RwLock::new(FxHashMap::default()),
            keys: RwLock::new(FxHashMap::default()),
            evicted: RwLock::new(FxHashSet::default()),
            storage,
        })
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn has_storage(&self) -> bool {
        self.storage.is_some()
    }

    pub fn owns(&self, uid: Uid) -> bool {
        uid.store() == self.id
    }

    /// UID for `key`: the previous one if its object is gone, else fresh.
    fn assign(&self, key: UidKey) -> Uid {
        let mut keys = self.keys.write();
        if let Some(&uid) = keys.get(&key) {
            let in_use = self.live.read().contains_key(&uid) || self.evicted.read().contains(&uid);
            if !in_use {
                return uid;
            }
        }
        let uid = Uid::new(self.id, self.next_slot.fetch_add(1, Ordering::Relaxed));
        keys.insert(key, uid);
        uid
    }

    /// Register a file unit built for the UID assigned to `key`.
    pub fn put_file(&self, key: UidKey, build: impl FnOnce(Uid) -> FileUnit) -> Arc<FileUnit> {
        let uid = self.assign(key);
        let unit = Arc::new(build(uid));
        debug_assert_eq!(unit.uid, uid, "file unit built with a foreign uid");
        self.live.write().insert(uid, Entity::File(unit.clone()));
        unit
    }

    /// Register a declaration built for the UID assigned to `key`.
    pub fn put_declaration(
        &self,
        key: UidKey,
        build: impl FnOnce(Uid) -> Declaration,
    ) -> Arc<Declaration> {
        let uid = self.assign(key);
        let decl = Arc::new(build(uid));
        debug_assert_eq!(decl.uid(), uid, "declaration built with a foreign uid");
        self.live
            .write()
            .insert(uid, Entity::Declaration(decl.clone()));
        decl
    }

    /// UID most recently issued for `key`, whether or not it is still live.
    pub fn uid_for(&self, key: &UidKey) -> Option<Uid> {
        self.keys.read().get(key).copied()
    }

    pub fn is_live(&self, uid: Uid) -> bool {
        self.live.read().contains_key(&uid)
    }

    /// Live object, else faulted in from storage, else `None`.
    pub fn resolve(&self, uid: Uid) -> Option<Entity> {
        if let Some(entity) = self.live.read().get(&uid) {
            return Some(entity.clone());
        }
        if !self.evicted.read().contains(&uid) {
            return None;
        }
        self.fault_in(uid)
    }

    fn fault_in(&self, uid: Uid) -> Option<Entity> {
        let storage = self.storage.as_ref()?;
        let key = uid.storage_key();
        let bytes = match storage.get(&key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!("[STORE] fault-in of {uid} failed: {err}");
                return None;
            }
        };
        let entity = match codec::decode(&key, &bytes) {
            Ok(entity) => entity,
            Err(err) => {
                tracing::warn!("[STORE] fault-in of {uid} failed: {err}");
                return None;
            }
        };
        tracing::trace!("[STORE] faulted in {uid}");
        let mut live = self.live.write();
        if let Some(existing) = live.get(&uid) {
            return Some(existing.clone());
        }
        self.evicted.write().remove(&uid);
        live.insert(uid, entity.clone());
        Some(entity)
    }

    pub fn declaration(&self, uid: Uid) -> Option<Arc<Declaration>> {
        match self.resolve(uid)? {
            Entity::Declaration(decl) => Some(decl),
            Entity::File(_) => None,
        }
    }

    pub fn file_unit(&self, uid: Uid) -> Option<Arc<FileUnit>> {
        match self.resolve(uid)? {
            Entity::File(unit) => Some(unit),
            Entity::Declaration(_) => None,
        }
    }

    /// Forget `uid`; its persisted blob goes too. Removing twice is a no-op.
    pub fn remove(&self, uid: Uid) -> Option<Entity> {
        let removed = self.live.write().remove(&uid);
        let was_evicted = self.evicted.write().remove(&uid);
        if removed.is_some() || was_evicted {
            if let Some(storage) = &self.storage {
                if let Err(err) = storage.remove(&uid.storage_key()) {
                    tracing::warn!("[STORE] could not drop blob of {uid}: {err}");
                }
            }
        }
        removed
    }

    /// Write `uid` to storage and drop it from memory; the next
    /// [`resolve`](Self::resolve) faults it back in.
    pub fn evict(&self, uid: Uid) -> Result<(), StoreError> {
        let storage = self.storage.as_ref().ok_or(StoreError::NoStorage)?;
        let entity = self
            .live
            .read()
            .get(&uid)
            .cloned()
            .ok_or(StoreError::NotLive { uid })?;
        let bytes = codec::encode(&entity)?;
        storage.put(&uid.storage_key(), &bytes)?;
        self.evicted.write().insert(uid);
        self.live.write().remove(&uid);
        tracing::trace!("[STORE] evicted {uid}");
        Ok(())
    }

    /// Persist every live object without dropping it. Returns the count.
    pub fn flush(&self) -> Result<usize, StoreError> {
        let storage = self.storage.as_ref().ok_or(StoreError::NoStorage)?;
        let entities: Vec<Entity> = self.live.read().values().cloned().collect();
        for entity in &entities {
            storage.put(&entity.uid().storage_key(), &codec::encode(entity)?)?;
        }
        Ok(entities.len())
    }

    pub fn live_count(&self) -> usize {
        self.live.read().len()
    }

    /// Snapshot of live UIDs, sorted.
    pub fn live_uids(&self) -> Vec<Uid> {
        let mut uids: Vec<Uid> = self.live.read().keys().copied().collect();
        uids.sort();
        uids
    }
}
