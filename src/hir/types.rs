//! Type expressions and their classifier cache.
//!
//! A [`Type`] describes how a declaration's type was written: the head
//! (builtin, name, anonymous class, `decltype` or function pointer), the
//! qualifier layers of a nested name, pointer/reference/array decorations,
//! per-level cv bits and template arguments.
//!
//! ## Qualifier bits
//!
//! Bit `i` of `const_mask`/`volatile_mask` qualifies the value reached after
//! `i` dereferences; bit 0 is the declared entity itself.
//!
//! ```text
//! const int* p        pointer_depth 1, const_mask 0b10
//! int* const p        pointer_depth 1, const_mask 0b01
//! const char* const*  pointer_depth 2, const_mask 0b110
//! ```
//!
//! Pointer depth saturates at [`MAX_POINTER_DEPTH`] so every level keeps
//! its bit.
//!
//! ## Classifier resolution
//!
//! [`Type::classifier`] memoizes its answer keyed by parse generation and
//! starting file. A cached answer is reused only while the classifier is
//! still valid, is not a placeholder and is visible from the starting file.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::base::{FileId, Name, QualifiedName, SCOPE_SEPARATOR, TextSize};

use super::decl::Declaration;
use super::forward;
use super::ids::{ClassKey, DeclKind, Uid};
use super::project::Project;
use super::resolve::{LookupKind, ResolveContext, Resolved, Resolver};
use super::template::{self, Instantiation};

// ============================================================================
// TYPE
// ============================================================================

/// Reference decoration of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReferenceKind {
    #[default]
    None,
    LValue,
    RValue,
}

/// What a type is, before decorations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeHead {
    /// `int`, `unsigned long`, `auto`
    Builtin(SmolStr),
    /// A name to resolve; qualifier segments live in [`Type::qualifier`].
    Named(Name),
    /// A class or enum defined in the same statement (`struct { } x;`).
    Declared { uid: Uid, name: Name },
    /// `decltype(expr)`, kept as expression text.
    Decltype(String),
    /// `R (*)(P...)`
    FunctionPointer {
        ret: Box<Type>,
        params: Vec<Type>,
        variadic: bool,
    },
}

/// One template argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpecializationParam {
    Type(Type),
    Expression(String),
    /// Arguments collected by a variadic template parameter.
    Pack(Vec<SpecializationParam>),
}

impl SpecializationParam {
    pub fn text(&self) -> String {
        match self {
            Self::Type(ty) => ty.text(),
            Self::Expression(text) => text.clone(),
            Self::Pack(items) => items.iter().map(Self::text).collect::<Vec<_>>().join(", "),
        }
    }

    /// Text with every resolvable name replaced by its qualified name.
    pub fn canonical_text(&self, project: &Project, ctx: &ResolveContext) -> String {
        match self {
            Self::Type(ty) => ty.canonical_text(project, ctx),
            Self::Expression(text) => text.clone(),
            Self::Pack(items) => items
                .iter()
                .map(|p| p.canonical_text(project, ctx))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    pub fn as_type(&self) -> Option<&Type> {
        match self {
            Self::Type(ty) => Some(ty),
            _ => None,
        }
    }
}

/// A type expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Type {
    pub head: TypeHead,
    /// Layer for the enclosing name: `B` in `A::B::C`, which in turn has `A`.
    pub qualifier: Option<Box<Type>>,
    /// Written with a leading `::` (set on the outermost name layer).
    pub is_global: bool,
    pub pointer_depth: u8,
    pub const_mask: u32,
    pub volatile_mask: u32,
    pub reference: ReferenceKind,
    pub array_depth: u8,
    pub pack_expansion: bool,
    /// `struct S x;`
    pub elaborated: Option<ClassKey>,
    /// `None` is not an instantiation; `Some(vec![])` is `T<>`.
    pub instantiation: Option<Vec<SpecializationParam>>,
    pub file: Option<FileId>,
    pub offset: TextSize,
    /// Scope the type was written in; names resolve from here.
    pub scope: Option<Uid>,
    #[serde(skip)]
    pub cache: ClassifierCache,
}

/// Deepest pointer nesting a [`Type`] records; further levels are dropped.
pub const MAX_POINTER_DEPTH: u8 = 31;

impl Type {
    fn with_head(head: TypeHead) -> Self {
        Self {
            head,
            qualifier: None,
            is_global: false,
            pointer_depth: 0,
            const_mask: 0,
            volatile_mask: 0,
            reference: ReferenceKind::None,
            array_depth: 0,
            pack_expansion: false,
            elaborated: None,
            instantiation: None,
            file: None,
            offset: TextSize::new(0),
            scope: None,
            cache: ClassifierCache::default(),
        }
    }

    pub fn builtin(name: impl Into<SmolStr>) -> Self {
        Self::with_head(TypeHead::Builtin(name.into()))
    }

    pub fn named(name: impl Into<Name>) -> Self {
        Self::with_head(TypeHead::Named(name.into()))
    }

    pub fn declared(uid: Uid, name: impl Into<Name>) -> Self {
        Self::with_head(TypeHead::Declared {
            uid,
            name: name.into(),
        })
    }

    pub fn decltype(expr: impl Into<String>) -> Self {
        Self::with_head(TypeHead::Decltype(expr.into()))
    }

    pub fn function_pointer(ret: Type, params: Vec<Type>, variadic: bool) -> Self {
        let mut ty = Self::with_head(TypeHead::FunctionPointer {
            ret: Box::new(ret),
            params,
            variadic,
        });
        ty.pointer_depth = 1;
        ty
    }

    /// Build `A::B::C` as nested layers; the last segment is the head.
    pub fn from_path(path: &QualifiedName) -> Option<Self> {
        let mut layers = path.segments.iter();
        let mut current = Self::named(layers.next()?.clone());
        current.is_global = path.is_global;
        for segment in layers {
            let mut next = Self::named(segment.clone());
            next.qualifier = Some(Box::new(current));
            current = next;
        }
        Some(current)
    }

    /// Set the source site on this layer and every nested layer.
    pub fn at(mut self, file: Option<FileId>, offset: TextSize, scope: Option<Uid>) -> Self {
        self.set_site(file, offset, scope);
        self
    }

    fn set_site(&mut self, file: Option<FileId>, offset: TextSize, scope: Option<Uid>) {
        self.file = file;
        self.offset = offset;
        self.scope = scope;
        if let Some(q) = self.qualifier.as_deref_mut() {
            q.set_site(file, offset, scope);
        }
    }

    pub fn with_pointer(mut self) -> Self {
        if self.pointer_depth >= MAX_POINTER_DEPTH {
            tracing::warn!("[TYPE] pointer depth saturated at {MAX_POINTER_DEPTH}");
            return self;
        }
        self.const_mask <<= 1;
        self.volatile_mask <<= 1;
        self.pointer_depth += 1;
        self
    }

    pub fn with_const(mut self) -> Self {
        self.const_mask |= 1;
        self
    }

    pub fn with_reference(mut self, reference: ReferenceKind) -> Self {
        self.reference = reference;
        self
    }

    pub fn with_args(mut self, args: Vec<SpecializationParam>) -> Self {
        self.instantiation = Some(args);
        self
    }

    // ------------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------------

    pub fn name(&self) -> Option<&Name> {
        match &self.head {
            TypeHead::Named(name) => Some(name),
            _ => None,
        }
    }

    /// The written name path (`A::B::C`), without template arguments.
    pub fn path(&self) -> QualifiedName {
        let mut segments = Vec::new();
        let mut is_global = false;
        let mut layer = Some(self);
        while let Some(ty) = layer {
            if let TypeHead::Named(name) = &ty.head {
                segments.push(name.clone());
            }
            is_global = ty.is_global;
            layer = ty.qualifier.as_deref();
        }
        segments.reverse();
        QualifiedName {
            is_global,
            segments,
        }
    }

    /// Whether any qualifier layer carries template arguments.
    pub fn has_qualifier_instantiation(&self) -> bool {
        let mut layer = self.qualifier.as_deref();
        while let Some(ty) = layer {
            if ty.instantiation.is_some() {
                return true;
            }
            layer = ty.qualifier.as_deref();
        }
        false
    }

    pub fn is_pointer(&self) -> bool {
        self.pointer_depth > 0
    }

    pub fn is_reference(&self) -> bool {
        self.reference != ReferenceKind::None
    }

    pub fn is_instantiation(&self) -> bool {
        self.instantiation.is_some()
    }

    /// Const-ness of the value reached after `level` dereferences.
    pub fn is_const_at(&self, level: u8) -> bool {
        level < 32 && self.const_mask & (1 << level) != 0
    }

    pub fn is_volatile_at(&self, level: u8) -> bool {
        level < 32 && self.volatile_mask & (1 << level) != 0
    }

    pub fn is_top_level_const(&self) -> bool {
        self.is_const_at(0)
    }

    /// Const-ness of the innermost pointee (`const T*` → true).
    pub fn is_base_const(&self) -> bool {
        self.is_const_at(self.pointer_depth)
    }

    /// Apply this type's decorations on top of `base`, as when `T* const&`
    /// is written and `T` stands for `base`.
    pub fn decorate(&self, mut base: Type) -> Type {
        let shift = u32::from(self.pointer_depth);
        base.const_mask = base.const_mask.checked_shl(shift).unwrap_or(0) | self.const_mask;
        base.volatile_mask =
            base.volatile_mask.checked_shl(shift).unwrap_or(0) | self.volatile_mask;
        base.pointer_depth = base
            .pointer_depth
            .saturating_add(self.pointer_depth)
            .min(MAX_POINTER_DEPTH);
        base.reference = match (base.reference, self.reference) {
            (r, ReferenceKind::None) => r,
            (ReferenceKind::LValue, _) | (_, ReferenceKind::LValue) => ReferenceKind::LValue,
            _ => ReferenceKind::RValue,
        };
        base.array_depth = base.array_depth.saturating_add(self.array_depth);
        base.pack_expansion = false;
        base.cache = ClassifierCache::default();
        base
    }

    // ------------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------------

    /// The type as written, normalized (`const std::vector<int>*`).
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, None);
        out
    }

    /// The type with aliases expanded and names fully qualified.
    ///
    /// Names that do not resolve keep their written form.
    pub fn canonical_text(&self, project: &Project, ctx: &ResolveContext) -> String {
        let expanded = self.underlying(project, ctx);
        let ty = expanded.as_ref().unwrap_or(self);
        let mut out = String::new();
        ty.write(&mut out, Some((project, ctx)));
        out
    }

    fn write(&self, out: &mut String, canon: Option<(&Project, &ResolveContext)>) {
        if let TypeHead::FunctionPointer {
            ret,
            params,
            variadic,
        } = &self.head
        {
            ret.write(out, canon);
            out.push_str(" (");
            for level in (0..self.pointer_depth).rev() {
                out.push('*');
                self.write_cv(out, level, true);
            }
            self.write_reference(out);
            out.push_str(")(");
            let mut parts: Vec<String> = params
                .iter()
                .map(|p| {
                    let mut s = String::new();
                    p.write(&mut s, canon);
                    s
                })
                .collect();
            if *variadic {
                parts.push("...".to_string());
            }
            out.push_str(&parts.join(", "));
            out.push(')');
            return;
        }

        self.write_cv(out, self.pointer_depth, false);
        if let Some(key) = self.elaborated.filter(|_| canon.is_none()) {
            out.push_str(key.as_str());
            out.push(' ');
        }
        self.write_head(out, canon);
        for level in (0..self.pointer_depth).rev() {
            out.push('*');
            self.write_cv(out, level, true);
        }
        self.write_reference(out);
        for _ in 0..self.array_depth {
            out.push_str("[]");
        }
        if self.pack_expansion {
            out.push_str("...");
        }
    }

    fn write_cv(&self, out: &mut String, level: u8, after: bool) {
        for (set, word) in [
            (self.is_const_at(level), "const"),
            (self.is_volatile_at(level), "volatile"),
        ] {
            if set {
                if after {
                    out.push(' ');
                }
                out.push_str(word);
                if !after {
                    out.push(' ');
                }
            }
        }
    }

    fn write_reference(&self, out: &mut String) {
        match self.reference {
            ReferenceKind::None => {}
            ReferenceKind::LValue => out.push('&'),
            ReferenceKind::RValue => out.push_str("&&"),
        }
    }

    fn write_head(&self, out: &mut String, canon: Option<(&Project, &ResolveContext)>) {
        match &self.head {
            TypeHead::Builtin(name) => out.push_str(name),
            TypeHead::Decltype(expr) => {
                out.push_str("decltype(");
                out.push_str(expr);
                out.push(')');
            }
            TypeHead::Declared { uid, name } => {
                let qualified = canon
                    .and_then(|(project, _)| {
                        project.declaration(*uid).map(|d| d.qualified_name(project))
                    })
                    .filter(|q| !q.is_empty());
                match qualified {
                    Some(q) => out.push_str(&q),
                    None if name.is_empty() => out.push_str("<anonymous>"),
                    None => out.push_str(name),
                }
            }
            TypeHead::Named(_) => {
                let resolved = canon.and_then(|(project, ctx)| {
                    self.classifier(project, ctx)
                        .filter(|r| !r.is_placeholder())
                        .map(|r| r.qualified_name(project))
                });
                match resolved {
                    Some(name) => out.push_str(&name),
                    None => self.write_path(out, canon),
                }
                self.write_args(out, canon);
            }
            TypeHead::FunctionPointer { .. } => {}
        }
    }

    fn write_path(&self, out: &mut String, canon: Option<(&Project, &ResolveContext)>) {
        match self.qualifier.as_deref() {
            Some(q) => {
                q.write_path(out, canon);
                q.write_args(out, canon);
                out.push_str(SCOPE_SEPARATOR);
            }
            None if self.is_global => out.push_str(SCOPE_SEPARATOR),
            None => {}
        }
        if let TypeHead::Named(name) = &self.head {
            out.push_str(name);
        }
    }

    fn write_args(&self, out: &mut String, canon: Option<(&Project, &ResolveContext)>) {
        let Some(args) = &self.instantiation else {
            return;
        };
        let parts: Vec<String> = args
            .iter()
            .map(|arg| match canon {
                Some((project, ctx)) => arg.canonical_text(project, ctx),
                None => arg.text(),
            })
            .collect();
        out.push('<');
        out.push_str(&parts.join(", "));
        out.push('>');
    }

    // ------------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------------

    /// The classifier this type names, resolving lazily and caching the
    /// answer for the context's generation and starting file.
    ///
    /// Unknown names yield an unresolved placeholder; builtins, `decltype`
    /// and names bound to template parameters yield `None`.
    pub fn classifier(&self, project: &Project, ctx: &ResolveContext) -> Option<Resolved> {
        if let Some(hit) = self.cache.lookup(project, ctx) {
            return Some(hit);
        }
        tracing::debug!("[TYPE] classifier cache miss for `{}`", self.text());
        let resolved = self.resolve_classifier(project, ctx)?;
        self.cache.store(ctx, &resolved);
        Some(resolved)
    }

    fn resolve_classifier(&self, project: &Project, ctx: &ResolveContext) -> Option<Resolved> {
        let _depth = ctx.descend()?;
        let name = match &self.head {
            TypeHead::Named(name) => name,
            TypeHead::Declared { uid, .. } => {
                return project
                    .declaration(*uid)
                    .filter(|d| d.is_valid())
                    .map(Resolved::Decl);
            }
            TypeHead::Builtin(_) | TypeHead::Decltype(_) | TypeHead::FunctionPointer { .. } => {
                return None;
            }
        };

        let resolver = Resolver::new(project, ctx).written_at(self.file, self.offset);
        let scope = self.scope.unwrap_or_else(|| project.global_namespace());
        let found = match self.qualifier.as_deref() {
            Some(q) if self.has_qualifier_instantiation() => {
                let owner = q.classifier(project, ctx)?;
                let member = resolver.member_of(&owner, name, LookupKind::Classifier);
                if let (Resolved::Instance(instance), Some(decl)) = (&owner, &member) {
                    if decl.kind().is_type_alias() {
                        let _guard = ctx.enter(decl.uid())?;
                        let target = instance.member_type(decl)?;
                        return self.decorate(target).classifier(project, ctx);
                    }
                }
                member
            }
            _ => resolver.resolve(scope, &self.path(), LookupKind::Classifier),
        };

        match found {
            Some(decl) => self.finish(project, ctx, decl),
            None if self.is_dependent(&resolver, scope) => None,
            None => {
                let origin_scope = self.scope?;
                forward::unresolved_placeholder(project, origin_scope, &self.path(), self.elaborated)
                    .map(Resolved::Decl)
            }
        }
    }

    fn finish(
        &self,
        project: &Project,
        ctx: &ResolveContext,
        decl: Arc<Declaration>,
    ) -> Option<Resolved> {
        match decl.kind() {
            DeclKind::Typedef | DeclKind::TypeAlias => {
                let _guard = ctx.enter(decl.uid())?;
                let target = decl.alias_type()?;
                let target = match (&self.instantiation, decl.template_params()) {
                    (Some(args), Some(params)) if !params.is_empty() => {
                        template::substitute_alias(project, &decl, args, target)
                    }
                    _ => target.clone(),
                };
                self.decorate(target).classifier(project, ctx)
            }
            DeclKind::TemplateParameter => None,
            _ => match &self.instantiation {
                Some(args) if decl.is_template() => {
                    match template::instantiate(project, ctx, &decl, args) {
                        Some(instance) => Some(Resolved::Instance(instance)),
                        None => Some(Resolved::Decl(decl)),
                    }
                }
                _ => Some(Resolved::Decl(decl)),
            },
        }
    }

    /// Names rooted at a template parameter (`T::type`) stay unresolved
    /// without a placeholder.
    fn is_dependent(&self, resolver: &Resolver<'_>, scope: Uid) -> bool {
        let path = self.path();
        let Some(first) = path.segments.first() else {
            return false;
        };
        resolver
            .resolve(scope, &QualifiedName::new(vec![first.clone()]), LookupKind::Classifier)
            .is_some_and(|d| d.kind() == DeclKind::TemplateParameter)
    }

    /// This type with typedef and alias names expanded.
    ///
    /// Returns `None` when the alias chain is cyclic or too deep.
    pub fn underlying(&self, project: &Project, ctx: &ResolveContext) -> Option<Type> {
        let TypeHead::Named(_) = &self.head else {
            return Some(self.clone());
        };
        if self.has_qualifier_instantiation() {
            return Some(self.clone());
        }
        let scope = self.scope.unwrap_or_else(|| project.global_namespace());
        let found = Resolver::new(project, ctx)
            .written_at(self.file, self.offset)
            .resolve(scope, &self.path(), LookupKind::Classifier);
        let Some(alias) = found.filter(|d| d.kind().is_type_alias()) else {
            return Some(self.clone());
        };
        let _guard = ctx.enter(alias.uid())?;
        let target = alias.alias_type()?;
        let target = match (&self.instantiation, alias.template_params()) {
            (Some(args), Some(params)) if !params.is_empty() => {
                template::substitute_alias(project, &alias, args, target)
            }
            _ => target.clone(),
        };
        self.decorate(target).underlying(project, ctx)
    }
}

// ============================================================================
// CLASSIFIER CACHE
// ============================================================================

#[derive(Debug, Clone)]
struct CacheEntry {
    generation: u64,
    file: Option<FileId>,
    uid: Uid,
    instance: Option<Arc<Instantiation>>,
}

/// Last classifier a [`Type`] resolved to, keyed by generation and file.
///
/// Holds only the UID of a declaration, never the declaration itself.
/// Never serialized and ignored by equality.
#[derive(Debug, Default)]
pub struct ClassifierCache {
    entry: Mutex<Option<CacheEntry>>,
}

impl ClassifierCache {
    fn lookup(&self, project: &Project, ctx: &ResolveContext) -> Option<Resolved> {
        let entry = self.entry.lock().clone()?;
        if entry.generation != ctx.generation() || entry.file != ctx.file() {
            return None;
        }
        let decl = project.declaration(entry.uid)?;
        if !decl.is_valid() || decl.is_placeholder() || !project.is_visible(&decl, ctx.file()) {
            return None;
        }
        Some(match entry.instance {
            Some(instance) => Resolved::Instance(instance),
            None => Resolved::Decl(decl),
        })
    }

    fn store(&self, ctx: &ResolveContext, resolved: &Resolved) {
        let (uid, instance) = match resolved {
            Resolved::Decl(decl) => (decl.uid(), None),
            Resolved::Instance(instance) => (instance.template.uid(), Some(instance.clone())),
        };
        *self.entry.lock() = Some(CacheEntry {
            generation: ctx.generation(),
            file: ctx.file(),
            uid,
            instance,
        });
    }

    /// Forget the cached answer.
    pub fn clear(&self) {
        *self.entry.lock() = None;
    }

    /// Generation of the cached answer, if any.
    pub fn cached_generation(&self) -> Option<u64> {
        self.entry.lock().as_ref().map(|e| e.generation)
    }
}

impl Clone for ClassifierCache {
    fn clone(&self) -> Self {
        Self {
            entry: Mutex::new(self.entry.lock().clone()),
        }
    }
}

impl PartialEq for ClassifierCache {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}
