//! The project: identity store, file units, merged namespaces and the
//! indexes that tie declarations together.
//!
//! A project is written by one thread at a time (through the host) and read
//! by any number of threads. Every structure behind it is individually
//! locked, so readers never wait for a whole re-render.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use crate::base::{FileId, SCOPE_SEPARATOR};

use super::config::ModelConfig;
use super::decl::{DeclData, Declaration, MAX_SCOPE_DEPTH, NamespaceData};
use super::error::StoreError;
use super::forward;
use super::ids::{DeclKind, Uid, UidKey};
use super::resolve::{LookupKind, ResolveContext, Resolver};
use super::store::{Entity, FileUnit, IdentityStore, Storage};
use super::template::Instantiation;
use super::types::TypeHead;

type InstantiationKey = (Uid, String);

#[derive(Debug)]
pub struct Project {
    name: String,
    config: ModelConfig,
    store: IdentityStore,
    generation: AtomicU64,
    global: Uid,
    files: RwLock<FxHashMap<FileId, Uid>>,
    /// Qualified name → merged namespace.
    namespaces: RwLock<IndexMap<SmolStr, Uid>>,
    /// Qualified name of a template → its specializations, in registration order.
    specializations: RwLock<FxHashMap<SmolStr, Vec<Uid>>>,
    /// Qualified name → forward declarations of it.
    forwards: RwLock<FxHashMap<SmolStr, Vec<Uid>>>,
    /// (scope, qualified name) → unresolved placeholder.
    unresolved: Mutex<FxHashMap<(Uid, SmolStr), Uid>>,
    instantiations: RwLock<FxHashMap<InstantiationKey, Arc<Instantiation>>>,
    libraries: RwLock<Vec<Arc<Project>>>,
}

impl Project {
    /// # Panics
    ///
    /// When the process has run out of store ids; see [`Project::try_new`].
    pub fn new(name: impl Into<String>, config: ModelConfig) -> Self {
        Self::build(name.into(), config, IdentityStore::new(None))
    }

    pub fn try_new(name: impl Into<String>, config: ModelConfig) -> Result<Self, StoreError> {
        Ok(Self::build(name.into(), config, IdentityStore::try_new(None)?))
    }

    /// Project whose store can evict objects to `storage` and fault them
    /// back in.
    ///
    /// # Panics
    ///
    /// When the process has run out of store ids.
    pub fn with_storage(name: impl Into<String>, config: ModelConfig, storage: Arc<dyn Storage>) -> Self {
        Self::build(name.into(), config, IdentityStore::new(Some(storage)))
    }

    fn build(name: String, config: ModelConfig, store: IdentityStore) -> Self {
        let global = store
            .put_declaration(UidKey::Namespace { qualified: SmolStr::default() }, |uid| {
                Declaration::new(
                    uid,
                    DeclKind::Namespace,
                    "",
                    DeclData::Namespace(NamespaceData::default()),
                )
            })
            .uid();
        let mut namespaces = IndexMap::new();
        namespaces.insert(SmolStr::default(), global);
        tracing::debug!("[PROJECT] `{name}` created with store {}", store.id());
        Self {
            name,
            config,
            store,
            generation: AtomicU64::new(1),
            global,
            files: RwLock::new(FxHashMap::default()),
            namespaces: RwLock::new(namespaces),
            specializations: RwLock::new(FxHashMap::default()),
            forwards: RwLock::new(FxHashMap::default()),
            unresolved: Mutex::new(FxHashMap::default()),
            instantiations: RwLock::new(FxHashMap::default()),
            libraries: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn store(&self) -> &IdentityStore {
        &self.store
    }

    pub fn global_namespace(&self) -> Uid {
        self.global
    }

    // ========================================================================
    // GENERATIONS
    // ========================================================================

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Start a new parse generation. Every cached classifier and
    /// instantiation from earlier generations becomes stale.
    pub fn advance_generation(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.instantiations.write().clear();
        tracing::debug!("[PROJECT] `{}` generation {generation}", self.name);
        generation
    }

    // ========================================================================
    // OBJECTS
    // ========================================================================

    /// Resolve a UID issued by this project or one of its libraries.
    pub fn resolve_uid(&self, uid: Uid) -> Option<Entity> {
        if self.store.owns(uid) {
            return self.store.resolve(uid);
        }
        self.libraries
            .read()
            .iter()
            .find_map(|library| library.resolve_uid(uid))
    }

    pub fn declaration(&self, uid: Uid) -> Option<Arc<Declaration>> {
        match self.resolve_uid(uid)? {
            Entity::Declaration(decl) => Some(decl),
            Entity::File(_) => None,
        }
    }

    /// Whether `uid` was issued by a library rather than this project.
    pub fn is_library_uid(&self, uid: Uid) -> bool {
        !self.store.owns(uid)
    }

    // ------------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------------

    /// The unit for `file`, created on first use.
    pub fn add_file(&self, file: FileId, path: impl Into<String>) -> Arc<FileUnit> {
        if let Some(unit) = self.file_unit(file) {
            return unit;
        }
        let path = path.into();
        let unit = self
            .store
            .put_file(UidKey::File(file), |uid| FileUnit::new(uid, file, path));
        self.files.write().insert(file, unit.uid);
        unit
    }

    pub fn file_unit(&self, file: FileId) -> Option<Arc<FileUnit>> {
        let uid = *self.files.read().get(&file)?;
        self.store.file_unit(uid)
    }

    pub fn file_unit_by_uid(&self, uid: Uid) -> Option<Arc<FileUnit>> {
        self.store.file_unit(uid)
    }

    pub fn files(&self) -> Vec<FileId> {
        let mut files: Vec<FileId> = self.files.read().keys().copied().collect();
        files.sort();
        files
    }

    /// Record the files `file` includes. Without a record every
    /// declaration is visible from `file`.
    pub fn set_includes(&self, file: FileId, includes: Vec<FileId>) {
        if let Some(unit) = self.file_unit(file) {
            *unit.includes.write() = Some(includes);
        }
    }

    /// Whether `decl` may be seen from `from`: declared in `from` itself,
    /// in a file it transitively includes, or in a library.
    pub fn is_visible(&self, decl: &Declaration, from: Option<FileId>) -> bool {
        if !self.config.visibility_check {
            return true;
        }
        let (Some(from), Some(file)) = (from, decl.file()) else {
            return true;
        };
        if from == file || self.is_library_uid(decl.uid()) {
            return true;
        }
        let Some(unit) = self.file_unit(from) else {
            return true;
        };
        let Some(direct) = unit.includes.read().clone() else {
            return true;
        };

        let mut seen = FxHashSet::default();
        let mut pending = direct;
        while let Some(next) = pending.pop() {
            if next == file {
                return true;
            }
            if !seen.insert(next) {
                continue;
            }
            if let Some(included) = self.file_unit(next) {
                pending.extend(included.includes.read().iter().flatten().copied());
            }
        }
        false
    }

    // ------------------------------------------------------------------------
    // Libraries
    // ------------------------------------------------------------------------

    /// Search `library` after this project's own scopes.
    pub fn add_library(&self, library: Arc<Project>) {
        tracing::debug!("[PROJECT] `{}` uses library `{}`", self.name, library.name());
        self.libraries.write().push(library);
    }

    pub fn libraries(&self) -> Vec<Arc<Project>> {
        self.libraries.read().clone()
    }

    // ========================================================================
    // NAMESPACES
    // ========================================================================

    /// The merged namespace `name` inside `parent`, created on first use.
    ///
    /// Anonymous namespaces (empty `name`) are distinct per file. Inline and
    /// anonymous namespaces are transparent to lookup in `parent`.
    pub fn namespace_for(
        &self,
        parent: Uid,
        name: &str,
        file: Option<FileId>,
        is_inline: bool,
    ) -> Option<Arc<Declaration>> {
        let parent_decl = self.declaration(parent)?;
        let parent_data = parent_decl.namespace_data()?;
        let parent_name = self
            .namespaces
            .read()
            .iter()
            .find(|(_, uid)| **uid == parent)
            .map(|(key, _)| key.to_string())
            .unwrap_or_else(|| parent_decl.qualified_name(self));
        let segment = if name.is_empty() {
            match file {
                Some(file) => format!("<anonymous:{}>", file.index()),
                None => "<anonymous>".to_string(),
            }
        } else {
            name.to_string()
        };
        let qualified = if parent_name.is_empty() {
            SmolStr::new(&segment)
        } else {
            SmolStr::new(format!("{parent_name}{SCOPE_SEPARATOR}{segment}"))
        };

        let existing = self.namespaces.read().get(&qualified).copied();
        let ns = match existing
            .and_then(|uid| self.declaration(uid))
            .filter(|d| d.is_valid())
        {
            Some(ns) => ns,
            None => {
                let ns = self
                    .store
                    .put_declaration(UidKey::Namespace { qualified: qualified.clone() }, |uid| {
                        Declaration::new(
                            uid,
                            DeclKind::Namespace,
                            name,
                            DeclData::Namespace(NamespaceData::default()),
                        )
                        .with_scope(Some(parent))
                    });
                parent_data.declarations.insert(ns.entry());
                self.namespaces.write().insert(qualified.clone(), ns.uid());
                tracing::trace!("[PROJECT] namespace `{qualified}` is {}", ns.uid());
                ns
            }
        };
        if is_inline || name.is_empty() {
            if let Some(data) = ns.namespace_data() {
                data.transparent.store(true, Ordering::Release);
            }
        }
        Some(ns)
    }

    /// Merged namespaces, in creation order.
    pub fn namespaces(&self) -> Vec<Arc<Declaration>> {
        let uids: Vec<Uid> = self.namespaces.read().values().copied().collect();
        uids.into_iter().filter_map(|uid| self.declaration(uid)).collect()
    }

    // ========================================================================
    // REGISTRATION
    // ========================================================================

    /// Index a freshly rendered declaration and bind forward declarations.
    pub fn register(&self, decl: &Arc<Declaration>) {
        if decl.is_specialization() {
            let qualified = SmolStr::new(decl.qualified_name(self));
            self.specializations
                .write()
                .entry(qualified)
                .or_default()
                .push(decl.uid());
            return;
        }
        if let Some(data) = decl.forward_data() {
            let scope_name = decl
                .scope()
                .and_then(|s| self.declaration(s))
                .map(|s| s.qualified_name(self))
                .unwrap_or_default();
            let qualified = if scope_name.is_empty() {
                data.path.to_string()
            } else {
                format!("{scope_name}{SCOPE_SEPARATOR}{}", data.path)
            };
            self.forwards
                .write()
                .entry(SmolStr::new(qualified.trim_start_matches(SCOPE_SEPARATOR)))
                .or_default()
                .push(decl.uid());
            forward::bind_forward(self, decl);
            return;
        }
        if decl.kind().is_classifier() {
            forward::bind_definition(self, decl);
        }
    }

    /// Live forward declarations of the qualified name.
    pub fn forwards_named(&self, qualified: &str) -> Vec<Arc<Declaration>> {
        let uids = self
            .forwards
            .read()
            .get(qualified)
            .cloned()
            .unwrap_or_default();
        uids.into_iter()
            .filter_map(|uid| self.declaration(uid))
            .filter(|d| d.is_valid())
            .collect()
    }

    /// Live specializations of `template`, in registration order.
    pub fn specializations_of(&self, template: &Declaration) -> Vec<Arc<Declaration>> {
        let qualified = template.qualified_name(self);
        let uids = self
            .specializations
            .read()
            .get(qualified.as_str())
            .cloned()
            .unwrap_or_default();
        uids.into_iter()
            .filter_map(|uid| self.declaration(uid))
            .filter(|d| d.is_valid() && d.is_specialization())
            .collect()
    }

    /// The primary template `spec` specializes: the template of the same
    /// name in the same scope that is not itself a specialization. Among
    /// function overloads the one taking as many parameters wins. `None`
    /// when `spec` is not a specialization.
    pub fn base_template(&self, spec: &Declaration) -> Option<Arc<Declaration>> {
        if !spec.is_specialization() {
            return None;
        }
        let scope = spec.scope().and_then(|uid| self.declaration(uid))?;
        let kind = if spec.kind().is_function() {
            LookupKind::Function
        } else {
            LookupKind::Class
        };
        let ctx = ResolveContext::new(self);
        let candidates: Vec<Arc<Declaration>> = Resolver::new(self, &ctx)
            .lookup_in(&scope, spec.name(), kind)
            .into_iter()
            .filter(|d| d.is_template())
            .collect();
        let arity = |d: &Declaration| d.function_data().map(|f| f.params.len());
        let found = candidates
            .iter()
            .find(|d| arity(d) == arity(spec))
            .or_else(|| candidates.first())
            .cloned();
        if found.is_none() {
            tracing::debug!("[PROJECT] no primary template for specialization {}", spec.uid());
        }
        found
    }

    /// The unresolved placeholder for (`scope`, `qualified`), built by
    /// `build` when none is alive.
    pub fn unresolved_placeholder(
        &self,
        scope: Uid,
        qualified: SmolStr,
        build: impl FnOnce(&IdentityStore) -> Arc<Declaration>,
    ) -> Arc<Declaration> {
        let mut registry = self.unresolved.lock();
        let key = (scope, qualified);
        if let Some(existing) = registry
            .get(&key)
            .and_then(|uid| self.declaration(*uid))
            .filter(|d| d.is_valid())
        {
            return existing;
        }
        let decl = build(&self.store);
        registry.insert(key, decl.uid());
        decl
    }

    /// Re-parent `decl` under `scope`.
    ///
    /// A scope never becomes its own ancestor; such a request is refused.
    pub fn set_scope(&self, decl: &Declaration, scope: Option<Uid>) {
        let mut current = scope;
        let mut depth = 0;
        while let Some(uid) = current {
            if uid == decl.uid() {
                debug_assert!(false, "{} would become its own ancestor", decl.uid());
                tracing::warn!("[PROJECT] refused to make {} its own ancestor", decl.uid());
                return;
            }
            depth += 1;
            if depth > MAX_SCOPE_DEPTH {
                break;
            }
            current = self.declaration(uid).and_then(|d| d.scope());
        }
        decl.replace_scope(scope);
    }

    // ------------------------------------------------------------------------
    // Instantiation cache
    // ------------------------------------------------------------------------

    pub fn cached_instantiation(&self, template: Uid, args: &str, generation: u64) -> Option<Arc<Instantiation>> {
        let cache = self.instantiations.read();
        let hit = cache.get(&(template, args.to_string()))?;
        (hit.generation == generation && hit.template.is_valid()).then(|| hit.clone())
    }

    pub fn store_instantiation(&self, template: Uid, args: String, instance: Arc<Instantiation>) {
        self.instantiations.write().insert((template, args), instance);
    }

    pub fn instantiation_count(&self) -> usize {
        self.instantiations.read().len()
    }

    // ========================================================================
    // DISPOSAL
    // ========================================================================

    /// Dispose `uid` and everything it owns.
    ///
    /// The declaration is invalidated, unlinked from every list that holds
    /// it and removed from the store. Holders of its `Arc` keep reading
    /// stale but well-formed data. Disposing twice is a no-op.
    pub fn dispose(&self, uid: Uid) {
        if uid == self.global || !self.store.owns(uid) {
            return;
        }
        let Some(decl) = self.store.declaration(uid) else {
            self.store.remove(uid);
            return;
        };
        decl.invalidate();

        for list in decl.owned_lists() {
            for entry in list.take() {
                self.dispose(entry.uid);
            }
        }
        for owned in decl.owned_extras() {
            self.dispose(owned);
        }

        self.detach(&decl);
        if let Some(data) = decl.namespace_definition_data() {
            if let Some(ns) = data.namespace.and_then(|n| self.declaration(n)) {
                let empty = ns.namespace_data().is_some_and(|n| {
                    n.definitions.remove(uid);
                    n.definitions.is_empty()
                });
                if empty {
                    self.dispose(ns.uid());
                }
            }
        }
        if decl.kind() == DeclKind::Namespace {
            self.namespaces.write().retain(|_, v| *v != uid);
        }
        self.unindex(uid);
        self.store.remove(uid);
        tracing::trace!("[PROJECT] disposed {uid} ({} `{}`)", decl.kind(), decl.name());
    }

    /// Remove `decl` from the lists of its scope, its owner, its file and
    /// the classifier its type declares.
    fn detach(&self, decl: &Declaration) {
        let uid = decl.uid();
        for holder in [decl.scope(), decl.owner()].into_iter().flatten() {
            match self.resolve_uid(holder) {
                Some(Entity::Declaration(holder)) => {
                    for list in holder.lists() {
                        list.remove(uid);
                    }
                }
                Some(Entity::File(unit)) => {
                    unit.declarations.remove(uid);
                }
                None => {}
            }
        }
        if let Some(unit) = decl.file().and_then(|f| self.file_unit(f)) {
            unit.declarations.remove(uid);
        }
        if let Some(TypeHead::Declared { uid: declared, .. }) = decl.declared_type().map(|t| &t.head) {
            if let Some(declared) = self.declaration(*declared) {
                for list in declared.lists() {
                    list.remove(uid);
                }
            }
        }
    }

    /// Drop `uid` from the project-wide indexes, disposing unresolved
    /// placeholders that were created for it as a scope.
    fn unindex(&self, uid: Uid) {
        for uids in self.specializations.write().values_mut() {
            uids.retain(|u| *u != uid);
        }
        for uids in self.forwards.write().values_mut() {
            uids.retain(|u| *u != uid);
        }
        let orphans: Vec<Uid> = {
            let mut registry = self.unresolved.lock();
            let orphans = registry
                .iter()
                .filter(|((scope, _), _)| *scope == uid)
                .map(|(_, placeholder)| *placeholder)
                .collect();
            registry.retain(|(scope, _), placeholder| *scope != uid && *placeholder != uid);
            orphans
        };
        for placeholder in orphans {
            self.dispose(placeholder);
        }
        self.instantiations.write().retain(|(template, _), instance| {
            *template != uid && instance.specialization.as_ref().is_none_or(|s| s.uid() != uid)
        });
    }

    /// Dispose every declaration rendered from `file`. The file unit stays.
    pub fn dispose_file(&self, file: FileId) -> usize {
        let Some(unit) = self.file_unit(file) else {
            return 0;
        };
        let entries = unit.declarations.take();
        let count = entries.len();
        for entry in entries {
            self.dispose(entry.uid);
        }
        tracing::debug!("[PROJECT] disposed {count} top-level declaration(s) of {file}");
        count
    }
}
