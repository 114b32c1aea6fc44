//! AnalysisHost and Analysis: the single writer and its readers.
//!
//! The `AnalysisHost` owns the parse database and applies file changes to
//! the project one at a time. `Analysis` handles are cheap to clone, can be
//! sent to any thread and answer queries concurrently with each other and
//! with the host.
//!
//! ## Usage
//!
//! ```
//! use cppmodel::ide::AnalysisHost;
//!
//! let mut host = AnalysisHost::new();
//! let update = host.set_file_text("shapes.h", "namespace geo { struct Point { int x; int y; }; }");
//! assert!(update.render.errors.is_empty());
//!
//! let analysis = host.analysis();
//! let point = analysis.resolve("geo::Point", None, None).unwrap();
//! assert_eq!(analysis.members(point.uid, &Default::default()).len(), 2);
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use salsa::Setter;

use crate::base::{FileId, FileIdAllocator, LineCol, LineIndex, QualifiedName, TextSize};
use crate::hir::{
    Declaration, Entity, FileText, Instantiation, LookupKind, ModelConfig, Project,
    RenderOutcome, ResolveContext, Resolved, Resolver, RootDatabase, Uid, file_includes,
    parse_file, parse_type, render_tree,
};

use super::info::{DeclInfo, MemberFilter};
use super::scope;

// ============================================================================
// HOST
// ============================================================================

/// What applying one file's text did.
#[derive(Debug)]
pub struct FileUpdate {
    pub file: FileId,
    /// Top-level declarations of the previous text that were disposed.
    pub disposed: usize,
    pub syntax_errors: Vec<String>,
    pub render: RenderOutcome,
}

/// Owns all mutable state.
///
/// Apply changes via `set_file_text()` and `remove_file()`, then take
/// `analysis()` handles for queries.
pub struct AnalysisHost {
    db: RootDatabase,
    project: Arc<Project>,
    ids: FileIdAllocator,
    /// Path → file, in the order files were first seen.
    files: IndexMap<String, FileId>,
    inputs: FxHashMap<FileId, FileText>,
    paths: Arc<FxHashMap<FileId, String>>,
    lines: Arc<FxHashMap<FileId, Arc<LineIndex>>>,
}

impl Default for AnalysisHost {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisHost {
    pub fn new() -> Self {
        Self::with_config(ModelConfig::default())
    }

    pub fn with_config(config: ModelConfig) -> Self {
        Self::with_project(Arc::new(Project::new("workspace", config)))
    }

    /// Host writing into an existing project, e.g. one backed by storage.
    pub fn with_project(project: Arc<Project>) -> Self {
        Self {
            db: RootDatabase::new(),
            project,
            ids: FileIdAllocator::new(),
            files: IndexMap::new(),
            inputs: FxHashMap::default(),
            paths: Arc::new(FxHashMap::default()),
            lines: Arc::new(FxHashMap::default()),
        }
    }

    pub fn project(&self) -> &Arc<Project> {
        &self.project
    }

    /// Search `library` after the workspace's own declarations.
    pub fn add_library(&mut self, library: Arc<Project>) {
        self.project.add_library(library);
        self.project.advance_generation();
    }

    /// Replace the text of `path`, re-rendering its declarations.
    ///
    /// Declarations of the previous text are disposed first; the parse
    /// generation advances, so cached classifiers elsewhere re-resolve.
    pub fn set_file_text(&mut self, path: &str, text: impl Into<String>) -> FileUpdate {
        let text = text.into();
        let file = match self.files.get(path) {
            Some(&file) => file,
            None => {
                let file = self.ids.alloc();
                self.files.insert(path.to_string(), file);
                file
            }
        };
        Arc::make_mut(&mut self.lines).insert(file, Arc::new(LineIndex::new(&text)));
        Arc::make_mut(&mut self.paths).insert(file, path.to_string());

        let input = match self.inputs.get(&file).copied() {
            Some(input) => {
                input.set_text(&mut self.db).to(text);
                input
            }
            None => {
                let input = FileText::new(&self.db, file, text);
                self.inputs.insert(file, input);
                input
            }
        };

        let disposed = self.project.dispose_file(file);
        self.project.add_file(file, path);
        let parse = parse_file(&self.db, input);
        let render = render_tree(&self.project, file, &parse.syntax());
        self.link_includes();

        tracing::debug!(
            "[HOST] `{path}` ({file}): disposed {disposed}, rendered {}, {} syntax error(s)",
            render.declarations.len(),
            parse.errors.len()
        );
        FileUpdate {
            file,
            disposed,
            syntax_errors: parse.errors,
            render,
        }
    }

    /// Forget `path`. Its declarations are disposed; the id is not reused.
    pub fn remove_file(&mut self, path: &str) -> bool {
        let Some(file) = self.files.shift_remove(path) else {
            return false;
        };
        self.inputs.remove(&file);
        Arc::make_mut(&mut self.paths).remove(&file);
        Arc::make_mut(&mut self.lines).remove(&file);
        let disposed = self.project.dispose_file(file);
        self.project.advance_generation();
        self.link_includes();
        tracing::debug!("[HOST] removed `{path}` ({file}), disposed {disposed}");
        true
    }

    pub fn file_id(&self, path: &str) -> Option<FileId> {
        self.files.get(path).copied()
    }

    pub fn file_path(&self, file: FileId) -> Option<&str> {
        self.paths.get(&file).map(String::as_str)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// A read-only handle on the current state.
    pub fn analysis(&self) -> Analysis {
        Analysis {
            project: self.project.clone(),
            paths: self.paths.clone(),
            lines: self.lines.clone(),
        }
    }

    /// Recompute every file's include list against the known paths.
    /// Includes of files the host does not know are dropped.
    fn link_includes(&self) {
        for (path, &file) in &self.files {
            let Some(&input) = self.inputs.get(&file) else {
                continue;
            };
            let includes: Vec<FileId> = file_includes(&self.db, input)
                .iter()
                .filter_map(|include| self.include_target(include))
                .filter(|&target| target != file)
                .collect();
            tracing::trace!("[HOST] `{path}` includes {} known file(s)", includes.len());
            self.project.set_includes(file, includes);
        }
    }

    /// The known file an `#include` spelling refers to: an exact path, or
    /// a path ending in `/spelling`.
    fn include_target(&self, include: &str) -> Option<FileId> {
        let include = include.replace('\\', "/");
        if let Some(&file) = self.files.get(include.as_str()) {
            return Some(file);
        }
        let suffix = format!("/{}", include.trim_start_matches("./"));
        self.files
            .iter()
            .find(|(path, _)| path.replace('\\', "/").ends_with(&suffix))
            .map(|(_, &file)| file)
    }
}

// ============================================================================
// ANALYSIS
// ============================================================================

/// A read-only handle on the model.
///
/// Every query builds its own resolution context, so handles may be used
/// from many threads at once. Returned collections are owned snapshots.
#[derive(Clone)]
pub struct Analysis {
    project: Arc<Project>,
    paths: Arc<FxHashMap<FileId, String>>,
    lines: Arc<FxHashMap<FileId, Arc<LineIndex>>>,
}

impl Analysis {
    pub fn project(&self) -> &Arc<Project> {
        &self.project
    }

    pub fn file_path(&self, file: FileId) -> Option<&str> {
        self.paths.get(&file).map(String::as_str)
    }

    /// Byte offset of a line/column position in `file`.
    pub fn offset(&self, file: FileId, pos: LineCol) -> Option<TextSize> {
        self.lines.get(&file)?.offset(pos)
    }

    pub fn declaration(&self, uid: Uid) -> Option<DeclInfo> {
        self.project.declaration(uid).map(|d| self.info(&d))
    }

    // ------------------------------------------------------------------------
    // Scopes and members
    // ------------------------------------------------------------------------

    /// Declarations directly inside `scope`: namespace contents, class
    /// members, enumerators, function parameters and locals, or what a
    /// file unit lists at top level.
    pub fn declarations(&self, scope: Uid) -> Vec<DeclInfo> {
        let entries = match self.project.resolve_uid(scope) {
            Some(Entity::Declaration(decl)) => decl.children(),
            Some(Entity::File(unit)) => unit.declarations.snapshot(),
            None => return Vec::new(),
        };
        entries
            .iter()
            .filter_map(|e| self.project.declaration(e.uid))
            .map(|d| self.info(&d))
            .collect()
    }

    /// Everything `file` declares at namespace level, namespace blocks
    /// included, in source order.
    pub fn file_declarations(&self, file: FileId) -> Vec<DeclInfo> {
        scope::file_outline(&self.project, file)
            .iter()
            .map(|d| self.info(d))
            .collect()
    }

    /// Members of the class or enum `class`, in source order.
    pub fn members(&self, class: Uid, filter: &MemberFilter) -> Vec<DeclInfo> {
        let Some(decl) = self.project.declaration(class) else {
            return Vec::new();
        };
        let ctx = self.context_of(&decl);
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        self.collect_members(&ctx, &decl, filter, &mut seen, &mut out);
        out
    }

    fn collect_members(
        &self,
        ctx: &ResolveContext,
        decl: &Declaration,
        filter: &MemberFilter,
        seen: &mut FxHashSet<Uid>,
        out: &mut Vec<DeclInfo>,
    ) {
        if !seen.insert(decl.uid()) {
            return;
        }
        out.extend(
            decl.children()
                .iter()
                .filter_map(|e| self.project.declaration(e.uid))
                .filter(|d| filter.accepts(d))
                .map(|d| self.info(&d)),
        );
        if !filter.include_inherited {
            return;
        }
        for base in decl.bases() {
            match base.base.classifier(&self.project, ctx) {
                Some(Resolved::Decl(base)) => self.collect_members(ctx, &base, filter, seen, out),
                Some(Resolved::Instance(instance)) => {
                    if !seen.insert(instance.template.uid()) {
                        continue;
                    }
                    out.extend(
                        instance
                            .members(&self.project)
                            .iter()
                            .filter(|m| filter.accepts(m))
                            .map(|m| self.instance_member(&instance, m)),
                    );
                }
                None => {}
            }
        }
    }

    /// Members of the classifier a type written as `type_text` in `file`
    /// resolves to. Members of a template instance carry substituted types.
    pub fn members_of_type(&self, file: FileId, type_text: &str) -> Vec<DeclInfo> {
        let Some(ty) = parse_type(type_text, file, self.project.global_namespace()) else {
            return Vec::new();
        };
        let ctx = ResolveContext::at(&self.project, file, None);
        match ty.classifier(&self.project, &ctx) {
            Some(Resolved::Decl(decl)) => self.members(decl.uid(), &MemberFilter::default()),
            Some(Resolved::Instance(instance)) => instance
                .members(&self.project)
                .iter()
                .map(|m| self.instance_member(&instance, m))
                .collect(),
            None => Vec::new(),
        }
    }

    fn instance_member(&self, instance: &Instantiation, member: &Declaration) -> DeclInfo {
        let mut info = self.info(member);
        if let Some(ty) = instance.member_type(member) {
            info.type_text = Some(ty.text());
        }
        info
    }

    // ------------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------------

    /// Resolve a `::`-separated name. With a file, lookup starts in the
    /// innermost scope around `offset` (the global namespace without one)
    /// and sees that file's using directives before `offset`.
    pub fn resolve(&self, qualified: &str, file: Option<FileId>, offset: Option<TextSize>) -> Option<DeclInfo> {
        let path = QualifiedName::parse(qualified);
        if path.is_empty() {
            return None;
        }
        let (ctx, scope) = match file {
            Some(file) => {
                let scope = offset
                    .and_then(|offset| scope::scope_at(&self.project, file, offset))
                    .unwrap_or_else(|| self.project.global_namespace());
                (ResolveContext::at(&self.project, file, offset), scope)
            }
            None => (ResolveContext::new(&self.project), self.project.global_namespace()),
        };
        let found = Resolver::new(&self.project, &ctx).resolve(scope, &path, LookupKind::Any)?;
        tracing::trace!("[ANALYSIS] `{qualified}` -> {}", found.uid());
        Some(self.info(&found))
    }

    /// [`resolve`](Self::resolve) at a line/column position.
    pub fn resolve_at(&self, qualified: &str, file: FileId, pos: LineCol) -> Option<DeclInfo> {
        let offset = self.offset(file, pos)?;
        self.resolve(qualified, Some(file), Some(offset))
    }

    /// Resolve many names in parallel.
    pub fn resolve_many(&self, queries: &[(String, Option<FileId>)]) -> Vec<Option<DeclInfo>> {
        queries
            .par_iter()
            .map(|(qualified, file)| self.resolve(qualified, *file, None))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------------

    /// The type `decl` declares, as written.
    pub fn type_text(&self, decl: Uid) -> Option<String> {
        let decl = self.project.declaration(decl)?;
        decl.declared_type().map(|t| t.text())
    }

    /// The type `decl` declares with aliases expanded and names qualified,
    /// as seen from the file that declares it.
    pub fn canonical_type_text(&self, decl: Uid) -> Option<String> {
        let decl = self.project.declaration(decl)?;
        let ty = decl.declared_type()?;
        Some(ty.canonical_text(&self.project, &self.context_of(&decl)))
    }

    /// Context seeing what the file declaring `decl` sees.
    fn context_of(&self, decl: &Declaration) -> ResolveContext {
        match decl.file() {
            Some(file) => ResolveContext::at(&self.project, file, None),
            None => ResolveContext::new(&self.project),
        }
    }

    fn info(&self, decl: &Declaration) -> DeclInfo {
        let start = decl
            .file()
            .and_then(|f| self.lines.get(&f))
            .map(|index| index.line_col(decl.start()));
        DeclInfo::new(&self.project, decl, start)
    }
}
