//! Helpers for building projects and hosts from source text.

use std::sync::Arc;

use cppmodel::base::FileId;
use cppmodel::hir::{
    Declaration, LookupKind, ModelConfig, Project, ResolveContext, render_source, resolve_qualified,
};
use cppmodel::ide::AnalysisHost;

/// A project with `source` rendered as file 0. Panics on render errors.
pub fn project_from(source: &str) -> Project {
    let project = Project::new("test", ModelConfig::default());
    let outcome = render_source(&project, FileId::new(0), source);
    assert!(outcome.errors.is_empty(), "render errors: {:?}", outcome.errors);
    project
}

/// A project with one file per source, numbered in order.
pub fn project_from_files(sources: &[&str]) -> Project {
    let project = Project::new("test", ModelConfig::default());
    for (index, source) in sources.iter().enumerate() {
        render_source(&project, FileId::new(index as u32), source);
    }
    project
}

/// A host with one file named `path`.
pub fn host_with(path: &str, source: &str) -> (AnalysisHost, FileId) {
    let mut host = AnalysisHost::new();
    let update = host.set_file_text(path, source);
    assert!(update.syntax_errors.is_empty(), "syntax errors in `{path}`: {:?}", update.syntax_errors);
    (host, update.file)
}

pub fn lookup(project: &Project, qualified: &str, kind: LookupKind) -> Option<Arc<Declaration>> {
    let ctx = ResolveContext::new(project);
    resolve_qualified(project, &ctx, qualified, kind)
}

/// Resolve `qualified` or panic with the name.
pub fn assert_resolves(project: &Project, qualified: &str, kind: LookupKind) -> Arc<Declaration> {
    lookup(project, qualified, kind).unwrap_or_else(|| panic!("`{qualified}` did not resolve"))
}

pub fn assert_not_found(project: &Project, qualified: &str, kind: LookupKind) {
    if let Some(found) = lookup(project, qualified, kind) {
        panic!("`{qualified}` unexpectedly resolved to {} `{}`", found.kind(), found.qualified_name(project));
    }
}

/// Names of the declarations in `decl`'s child list, in list order.
pub fn child_names(decl: &Declaration) -> Vec<String> {
    decl.children().iter().map(|e| e.name.to_string()).collect()
}

/// The classifier of the type a variable or field declares, by qualified name.
pub fn classifier_of(project: &Project, variable: &str) -> Option<String> {
    let ctx = ResolveContext::new(project);
    let decl = assert_resolves(project, variable, LookupKind::Variable);
    decl.declared_type()?
        .classifier(project, &ctx)
        .map(|r| r.qualified_name(project))
}
