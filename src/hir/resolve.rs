//! Name resolution.
//!
//! Lookup of a path from a scope proceeds in three stages:
//!
//! 1. the lexical scope chain: class members (including base classes),
//!    template parameters, function parameters and locals, enumerators of
//!    unscoped enums, namespace contents;
//! 2. at each namespace, its using-declarations, using-directives and inline
//!    namespaces, and at the global namespace the file-level using
//!    directives of the starting file that precede the starting offset;
//! 3. library projects.
//!
//! Every step runs under a [`ResolveContext`] that carries the parse
//! generation, the starting file and offset, and the recursion guard.
//! Exceeding the guard makes the lookup fail with `None`; it never panics.

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::base::{FileId, QualifiedName, TextSize};

use super::decl::{Declaration, MAX_SCOPE_DEPTH, MemberEntry};
use super::forward;
use super::ids::{ClassKey, DeclKind, Uid};
use super::project::Project;
use super::template::Instantiation;

// ============================================================================
// CONTEXT
// ============================================================================

/// Per-query resolution state.
///
/// A context is cheap to build and is not shared between threads; each
/// reader makes its own.
#[derive(Debug)]
pub struct ResolveContext {
    generation: u64,
    file: Option<FileId>,
    offset: Option<TextSize>,
    limit: u32,
    in_flight: RefCell<FxHashSet<Uid>>,
    depth: Cell<u32>,
}

impl ResolveContext {
    /// Context with no starting file: every declaration is visible.
    pub fn new(project: &Project) -> Self {
        Self {
            generation: project.generation(),
            file: None,
            offset: None,
            limit: project.config().recursion_limit,
            in_flight: RefCell::new(FxHashSet::default()),
            depth: Cell::new(0),
        }
    }

    /// Context for a query made at `offset` in `file`.
    pub fn at(project: &Project, file: FileId, offset: Option<TextSize>) -> Self {
        Self {
            file: Some(file),
            offset,
            ..Self::new(project)
        }
    }

    /// Context for a library project, continuing this context's depth.
    pub fn for_library(&self, library: &Project) -> Self {
        Self {
            generation: library.generation(),
            file: None,
            offset: None,
            limit: self.limit,
            in_flight: RefCell::new(FxHashSet::default()),
            depth: Cell::new(self.depth.get()),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn file(&self) -> Option<FileId> {
        self.file
    }

    pub fn offset(&self) -> Option<TextSize> {
        self.offset
    }

    pub fn depth(&self) -> u32 {
        self.depth.get()
    }

    /// Mark `uid` as being expanded. Returns `None` when it already is.
    pub fn enter(&self, uid: Uid) -> Option<FlightGuard<'_>> {
        if !self.in_flight.borrow_mut().insert(uid) {
            tracing::trace!("[RESOLVE] cycle through {uid}");
            return None;
        }
        Some(FlightGuard { ctx: self, uid })
    }

    /// Go one level deeper. Returns `None` past the recursion limit.
    pub fn descend(&self) -> Option<DepthGuard<'_>> {
        let depth = self.depth.get();
        if depth >= self.limit {
            tracing::trace!("[RESOLVE] recursion limit {} reached", self.limit);
            return None;
        }
        self.depth.set(depth + 1);
        Some(DepthGuard { ctx: self })
    }
}

/// Releases an [`ResolveContext::enter`] mark on drop.
#[must_use]
pub struct FlightGuard<'a> {
    ctx: &'a ResolveContext,
    uid: Uid,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.ctx.in_flight.borrow_mut().remove(&self.uid);
    }
}

/// Restores the depth of a [`ResolveContext::descend`] on drop.
#[must_use]
pub struct DepthGuard<'a> {
    ctx: &'a ResolveContext,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.ctx.depth.set(self.ctx.depth.get().saturating_sub(1));
    }
}

// ============================================================================
// LOOKUP KINDS
// ============================================================================

/// Which declarations a lookup accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    Any,
    /// Anything usable as a type.
    Classifier,
    Class,
    Enum,
    Namespace,
    NamespaceOrClassifier,
    Function,
    Variable,
    /// Variables, enumerators, functions and non-type template parameters.
    Value,
}

impl LookupKind {
    pub fn accepts(self, decl: &Declaration) -> bool {
        let kind = decl.kind();
        match self {
            Self::Any => !matches!(kind, DeclKind::UsingDirective | DeclKind::Friend),
            Self::Classifier => is_type_like(decl),
            Self::Class => {
                kind.is_class()
                    || kind == DeclKind::ClassForwardDeclaration
                    || kind.is_type_alias()
                    || kind == DeclKind::TemplateParameter
            }
            Self::Enum => {
                matches!(kind, DeclKind::Enum | DeclKind::EnumForwardDeclaration)
                    || kind.is_type_alias()
            }
            Self::Namespace => is_namespace_like(decl),
            Self::NamespaceOrClassifier => is_namespace_like(decl) || is_type_like(decl),
            Self::Function => kind.is_function(),
            Self::Variable => kind.is_variable(),
            Self::Value => {
                kind.is_variable()
                    || kind.is_function()
                    || kind == DeclKind::Enumerator
                    || (kind == DeclKind::TemplateParameter && decl.declared_type().is_some())
            }
        }
    }

    /// Kinds whose hits dereference forward declarations.
    fn wants_definitions(self) -> bool {
        matches!(
            self,
            Self::Classifier | Self::Class | Self::Enum | Self::NamespaceOrClassifier
        )
    }
}

fn is_type_like(decl: &Declaration) -> bool {
    let kind = decl.kind();
    kind.is_classifier()
        || kind.is_forward()
        || kind.is_type_alias()
        || (kind == DeclKind::TemplateParameter && decl.declared_type().is_none())
}

fn is_namespace_like(decl: &Declaration) -> bool {
    decl.kind() == DeclKind::Namespace
        || (decl.kind() == DeclKind::NamespaceDefinition && decl.using_path().is_some())
}

// ============================================================================
// RESOLVED
// ============================================================================

/// What a classifier lookup produced.
#[derive(Debug, Clone)]
pub enum Resolved {
    Decl(Arc<Declaration>),
    /// A class template applied to arguments.
    Instance(Arc<Instantiation>),
}

impl Resolved {
    /// The declaration itself, or the primary template of an instance.
    pub fn declaration(&self) -> &Arc<Declaration> {
        match self {
            Self::Decl(decl) => decl,
            Self::Instance(instance) => &instance.template,
        }
    }

    pub fn uid(&self) -> Uid {
        self.declaration().uid()
    }

    pub fn is_placeholder(&self) -> bool {
        self.declaration().is_placeholder()
    }

    /// Qualified name, without template arguments.
    pub fn qualified_name(&self, project: &Project) -> String {
        self.declaration().qualified_name(project)
    }

    pub fn as_instance(&self) -> Option<&Arc<Instantiation>> {
        match self {
            Self::Instance(instance) => Some(instance),
            Self::Decl(_) => None,
        }
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

pub struct Resolver<'a> {
    project: &'a Project,
    ctx: &'a ResolveContext,
    /// Skip forward declarations instead of dereferencing them.
    definitions_only: bool,
    /// Where the name being resolved was written. File-level using
    /// directives are read here instead of at the context's start.
    site: Option<(FileId, TextSize)>,
}

impl<'a> Resolver<'a> {
    pub fn new(project: &'a Project, ctx: &'a ResolveContext) -> Self {
        Self {
            project,
            ctx,
            definitions_only: false,
            site: None,
        }
    }

    /// Resolver that only returns definitions, never forward declarations.
    pub fn definitions(project: &'a Project, ctx: &'a ResolveContext) -> Self {
        Self {
            definitions_only: true,
            ..Self::new(project, ctx)
        }
    }

    /// Read file-level using directives at `offset` in `file` rather than
    /// at the context's starting point. Visibility still follows the context.
    pub fn written_at(mut self, file: Option<FileId>, offset: TextSize) -> Self {
        self.site = file.map(|file| (file, offset));
        self
    }

    pub fn project(&self) -> &'a Project {
        self.project
    }

    pub fn context(&self) -> &'a ResolveContext {
        self.ctx
    }

    /// Resolve `path` as seen from `scope`.
    pub fn resolve(
        &self,
        scope: Uid,
        path: &QualifiedName,
        kind: LookupKind,
    ) -> Option<Arc<Declaration>> {
        let found = self.resolve_local(scope, path, kind);
        if found.is_some() {
            return found;
        }
        self.resolve_in_libraries(path, kind)
    }

    fn resolve_local(
        &self,
        scope: Uid,
        path: &QualifiedName,
        kind: LookupKind,
    ) -> Option<Arc<Declaration>> {
        let (first, rest) = path.segments.split_first()?;
        let _depth = self.ctx.descend()?;
        let first_kind = if rest.is_empty() {
            kind
        } else {
            LookupKind::NamespaceOrClassifier
        };

        let mut current = if path.is_global {
            let global = self.project.declaration(self.project.global_namespace())?;
            self.pick(self.lookup_in(&global, first, first_kind))?
        } else {
            self.lookup_unqualified(scope, first, first_kind)?
        };

        for (i, segment) in rest.iter().enumerate() {
            let segment_kind = if i + 1 == rest.len() {
                kind
            } else {
                LookupKind::NamespaceOrClassifier
            };
            let owner = self.as_scope(&current)?;
            current = self.member_of(&owner, segment, segment_kind)?;
        }
        tracing::trace!("[RESOLVE] `{path}` -> {}", current.uid());
        Some(current)
    }

    /// Fully-qualified lookup in each library project.
    fn resolve_in_libraries(&self, path: &QualifiedName, kind: LookupKind) -> Option<Arc<Declaration>> {
        for library in self.project.libraries() {
            let ctx = self.ctx.for_library(&library);
            let resolver = Resolver {
                project: &library,
                ctx: &ctx,
                definitions_only: self.definitions_only,
                site: None,
            };
            if let Some(found) = resolver.resolve(library.global_namespace(), path, kind) {
                tracing::trace!("[RESOLVE] `{path}` found in library {}", library.name());
                return Some(found);
            }
        }
        None
    }

    /// Look `name` up in the members of an already-resolved scope.
    pub fn member_of(
        &self,
        owner: &Resolved,
        name: &str,
        kind: LookupKind,
    ) -> Option<Arc<Declaration>> {
        match owner {
            Resolved::Decl(decl) => self.pick(self.lookup_in(decl, name, kind)),
            Resolved::Instance(instance) => {
                let candidates = instance
                    .find_member(self.project, self.ctx, name)
                    .into_iter()
                    .filter_map(|d| self.accept(d, kind))
                    .collect();
                self.pick(candidates)
            }
        }
    }

    /// Turn a resolved path segment into something with members:
    /// namespace aliases, typedefs and forward declarations are followed.
    fn as_scope(&self, decl: &Arc<Declaration>) -> Option<Resolved> {
        let _guard = self.ctx.enter(decl.uid())?;
        match decl.kind() {
            DeclKind::NamespaceDefinition => {
                let target = decl.using_path()?;
                let scope = decl.scope().unwrap_or_else(|| self.project.global_namespace());
                let ns = self.resolve(scope, target, LookupKind::Namespace)?;
                self.as_scope(&ns)
            }
            DeclKind::Typedef | DeclKind::TypeAlias => {
                decl.alias_type()?.classifier(self.project, self.ctx)
            }
            DeclKind::ClassForwardDeclaration | DeclKind::EnumForwardDeclaration => {
                forward::real_target(self.project, self.ctx, decl).map(Resolved::Decl)
            }
            DeclKind::TemplateParameter => None,
            _ => Some(Resolved::Decl(decl.clone())),
        }
    }

    // ------------------------------------------------------------------------
    // Unqualified lookup
    // ------------------------------------------------------------------------

    fn lookup_unqualified(
        &self,
        scope: Uid,
        name: &str,
        kind: LookupKind,
    ) -> Option<Arc<Declaration>> {
        let global = self.project.global_namespace();
        let mut current = Some(scope);
        let mut steps = 0;
        while let Some(uid) = current {
            steps += 1;
            if steps > MAX_SCOPE_DEPTH {
                break;
            }
            let Some(decl) = self.project.declaration(uid) else {
                // File units sit directly below the global namespace.
                if let Some(unit) = self.project.file_unit_by_uid(uid) {
                    if let Some(hit) = self.pick(self.using_hits(&unit.declarations.snapshot(), name, kind, None)) {
                        return Some(hit);
                    }
                    current = Some(global);
                    continue;
                }
                break;
            };
            if let Some(hit) = self.pick(self.lookup_in(&decl, name, kind)) {
                return Some(hit);
            }
            if uid == global {
                return self.pick(self.file_level_hits(name, kind));
            }
            current = self.enclosing_scope(&decl);
        }
        None
    }

    /// Next scope outward. A dead scope is skipped through the owner.
    fn enclosing_scope(&self, decl: &Declaration) -> Option<Uid> {
        let global = self.project.global_namespace();
        if decl.uid() == global {
            return None;
        }
        if let Some(scope) = decl.scope() {
            if self.project.resolve_uid(scope).is_some() {
                return Some(scope);
            }
        }
        let owner_scope = decl
            .owner()
            .and_then(|owner| self.project.declaration(owner))
            .and_then(|owner| owner.scope());
        Some(owner_scope.unwrap_or(global))
    }

    /// Using directives and declarations written at file level before the
    /// point the name was written, or before the context's starting point
    /// when the resolver has no site.
    fn file_level_hits(&self, name: &str, kind: LookupKind) -> Vec<Arc<Declaration>> {
        let (file, offset) = match self.site {
            Some((file, offset)) => (Some(file), Some(offset)),
            None => (self.ctx.file(), self.ctx.offset()),
        };
        let Some(unit) = file.and_then(|f| self.project.file_unit(f)) else {
            return Vec::new();
        };
        let entries: Vec<MemberEntry> = unit
            .declarations
            .snapshot()
            .into_iter()
            .filter(|e| offset.is_none_or(|offset| e.start < offset))
            .collect();
        self.using_hits(&entries, name, kind, None)
    }

    // ------------------------------------------------------------------------
    // Scope contents
    // ------------------------------------------------------------------------

    /// Candidates for `name` directly inside `decl`, including what its
    /// bases, using directives and inline namespaces contribute.
    pub fn lookup_in(&self, decl: &Declaration, name: &str, kind: LookupKind) -> Vec<Arc<Declaration>> {
        let mut entries = Vec::new();
        let mut using_entries = Vec::new();
        match decl.kind() {
            k if k.is_class() => {
                if let Some(class) = decl.class_data() {
                    let members = class.members.snapshot();
                    entries.extend(members.iter().filter(|e| e.name == name).cloned());
                    entries.extend(self.enumerator_entries(&members, name));
                    using_entries = members;
                }
            }
            DeclKind::Enum => {
                if let Some(data) = decl.enum_data() {
                    entries.extend(data.enumerators.named(name));
                }
            }
            k if k.is_function() => {
                if let Some(function) = decl.function_data() {
                    entries.extend(function.params.named(name));
                    let body = function.body.snapshot();
                    entries.extend(body.iter().filter(|e| e.name == name).cloned());
                    entries.extend(self.enumerator_entries(&body, name));
                    using_entries = body;
                }
            }
            DeclKind::Namespace => {
                if let Some(ns) = decl.namespace_data() {
                    let contents = ns.declarations.snapshot();
                    entries.extend(contents.iter().filter(|e| e.name == name).cloned());
                    entries.extend(self.enumerator_entries(&contents, name));
                    using_entries = contents;
                }
            }
            _ => {}
        }
        if let Some(template) = decl.template() {
            entries.extend(template.params.named(name));
        }

        let mut found: Vec<Arc<Declaration>> = entries
            .iter()
            .filter_map(|e| self.project.declaration(e.uid))
            .filter_map(|d| self.accept(d, kind))
            .collect();
        if !found.is_empty() {
            return found;
        }

        found = self.using_hits(&using_entries, name, kind, Some(decl.uid()));
        if !found.is_empty() {
            return found;
        }

        if decl.kind() == DeclKind::Namespace {
            found = self.transparent_hits(&using_entries, name, kind);
        }
        if found.is_empty() && decl.kind().is_class() {
            found = self.base_hits(decl, name, kind);
        }
        found
    }

    /// Enumerators of unscoped enums listed in `entries`.
    fn enumerator_entries(&self, entries: &[MemberEntry], name: &str) -> Vec<MemberEntry> {
        entries
            .iter()
            .filter(|e| e.kind == DeclKind::Enum)
            .filter_map(|e| self.project.declaration(e.uid))
            .filter(|d| d.is_unscoped_enum())
            .flat_map(|d| d.enum_data().map(|e| e.enumerators.named(name)).unwrap_or_default())
            .collect()
    }

    /// What the using declarations and directives among `entries` bring in.
    fn using_hits(
        &self,
        entries: &[MemberEntry],
        name: &str,
        kind: LookupKind,
        holder: Option<Uid>,
    ) -> Vec<Arc<Declaration>> {
        let mut out = Vec::new();
        for entry in entries {
            match entry.kind {
                DeclKind::UsingDeclaration if entry.name == name => {
                    let Some(using) = self.project.declaration(entry.uid) else {
                        continue;
                    };
                    let Some(_guard) = self.ctx.enter(using.uid()) else {
                        continue;
                    };
                    let Some(path) = using.using_path() else {
                        continue;
                    };
                    let scope = self.using_scope(&using, holder);
                    out.extend(self.resolve(scope, path, kind));
                }
                DeclKind::UsingDirective => {
                    let Some(using) = self.project.declaration(entry.uid) else {
                        continue;
                    };
                    let Some(_guard) = self.ctx.enter(using.uid()) else {
                        continue;
                    };
                    let Some(path) = using.using_path() else {
                        continue;
                    };
                    let scope = self.using_scope(&using, holder);
                    let Some(ns) = self.resolve(scope, path, LookupKind::Namespace) else {
                        continue;
                    };
                    if let Some(Resolved::Decl(ns)) = self.as_scope(&ns) {
                        out.extend(self.lookup_in(&ns, name, kind));
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn using_scope(&self, using: &Declaration, holder: Option<Uid>) -> Uid {
        using
            .scope()
            .or(holder)
            .unwrap_or_else(|| self.project.global_namespace())
    }

    /// Names of inline and anonymous namespaces leak into their parent.
    fn transparent_hits(&self, entries: &[MemberEntry], name: &str, kind: LookupKind) -> Vec<Arc<Declaration>> {
        let mut out = Vec::new();
        for entry in entries.iter().filter(|e| e.kind == DeclKind::Namespace) {
            let Some(ns) = self.project.declaration(entry.uid) else {
                continue;
            };
            let transparent = ns
                .namespace_data()
                .is_some_and(|n| n.transparent.load(std::sync::atomic::Ordering::Acquire));
            if !transparent {
                continue;
            }
            let Some(_guard) = self.ctx.enter(ns.uid()) else {
                continue;
            };
            out.extend(self.lookup_in(&ns, name, kind));
        }
        out
    }

    fn base_hits(&self, class: &Declaration, name: &str, kind: LookupKind) -> Vec<Arc<Declaration>> {
        let Some(_guard) = self.ctx.enter(class.uid()) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for base in class.bases() {
            let Some(resolved) = base.base.classifier(self.project, self.ctx) else {
                continue;
            };
            match &resolved {
                Resolved::Decl(decl) => out.extend(self.lookup_in(decl, name, kind)),
                Resolved::Instance(_) => out.extend(self.member_of(&resolved, name, kind)),
            }
            if !out.is_empty() {
                break;
            }
        }
        out
    }

    // ------------------------------------------------------------------------
    // Filtering
    // ------------------------------------------------------------------------

    /// Apply the lookup kind, skip specializations and dereference
    /// forward declarations for type lookups.
    fn accept(&self, decl: Arc<Declaration>, kind: LookupKind) -> Option<Arc<Declaration>> {
        if !decl.is_valid() || decl.is_specialization() || !kind.accepts(&decl) {
            return None;
        }
        if decl.kind().is_forward() {
            if self.definitions_only {
                return None;
            }
            if kind.wants_definitions() {
                return forward::real_target(self.project, self.ctx, &decl);
            }
        }
        Some(decl)
    }

    /// Prefer a valid, visible, non-placeholder candidate; else the first.
    fn pick(&self, candidates: Vec<Arc<Declaration>>) -> Option<Arc<Declaration>> {
        let preferred = candidates.iter().position(|d| {
            d.is_valid() && !d.is_placeholder() && self.project.is_visible(d, self.ctx.file())
        });
        let index = preferred.unwrap_or(0);
        candidates.into_iter().nth(index)
    }

    /// Class or enum definition named `path`, for binding forward
    /// declarations. Falls back to the last segment alone when the
    /// qualified lookup fails.
    pub fn find_definition(&self, scope: Uid, path: &QualifiedName, key: ClassKey) -> Option<Arc<Declaration>> {
        let kind = match key {
            ClassKey::Enum => LookupKind::Enum,
            _ => LookupKind::Class,
        };
        let is_definition = |d: &Arc<Declaration>| d.kind().is_classifier() && !d.is_placeholder();
        if let Some(found) = self.resolve(scope, path, kind).filter(is_definition) {
            return Some(found);
        }
        if path.segments.len() < 2 {
            return None;
        }
        let last = QualifiedName::new(vec![path.last()?.clone()]);
        self.resolve(scope, &last, kind).filter(is_definition)
    }
}

/// Convenience for one-off lookups of a `::`-separated name from the
/// global namespace.
pub fn resolve_qualified(project: &Project, ctx: &ResolveContext, qualified: &str, kind: LookupKind) -> Option<Arc<Declaration>> {
    let path = QualifiedName::parse(qualified);
    Resolver::new(project, ctx).resolve(project.global_namespace(), &path, kind)
}
