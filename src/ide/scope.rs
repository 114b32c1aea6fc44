//! Walking a file's declarations by position.

use std::sync::Arc;

use crate::base::{FileId, TextSize};
use crate::hir::{DeclKind, Declaration, Project, Uid};

/// Declarations `file` lists at namespace level, with the contents of its
/// namespace blocks spliced in after each block.
pub(super) fn file_outline(project: &Project, file: FileId) -> Vec<Arc<Declaration>> {
    let Some(unit) = project.file_unit(file) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut pending: Vec<Arc<Declaration>> = unit
        .declarations
        .snapshot()
        .iter()
        .rev()
        .filter_map(|e| project.declaration(e.uid))
        .collect();
    while let Some(decl) = pending.pop() {
        if decl.kind() == DeclKind::NamespaceDefinition {
            pending.extend(
                decl.children()
                    .iter()
                    .rev()
                    .filter_map(|e| project.declaration(e.uid)),
            );
        }
        out.push(decl);
    }
    out
}

/// The innermost scope of `file` around `offset`: a namespace, class, enum
/// or function body.
pub(super) fn scope_at(project: &Project, file: FileId, offset: TextSize) -> Option<Uid> {
    let unit = project.file_unit(file)?;
    let mut scope = None;
    let mut candidates = unit.declarations.snapshot();
    loop {
        let Some(decl) = candidates
            .iter()
            .filter(|e| e.file.is_none_or(|f| f == file) && e.start <= offset)
            .filter_map(|e| project.declaration(e.uid))
            .find(|d| d.range().contains(offset) && is_enclosing(d))
        else {
            return scope;
        };
        scope = Some(match decl.namespace_definition_data() {
            Some(block) => block.namespace.unwrap_or_else(|| project.global_namespace()),
            None => decl.uid(),
        });
        candidates = decl.children();
    }
}

fn is_enclosing(decl: &Declaration) -> bool {
    match decl.kind() {
        DeclKind::NamespaceDefinition => decl.using_path().is_none(),
        DeclKind::Enum => true,
        kind if kind.is_class() => true,
        kind if kind.is_function() => decl.function_data().is_some_and(|f| f.has_body),
        _ => false,
    }
}
