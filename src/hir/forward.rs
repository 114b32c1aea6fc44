//! Forward declarations and placeholder classifiers.
//!
//! For every (scope, name) a classifier moves through these states:
//!
//! ```text
//! Unseen ──forward decl──▶ Placeholder-only ──definition──▶ Bound
//!    │                           ▲                            │
//!    └──unresolved reference─────┘◀────definition disposed────┘
//! ```
//!
//! A forward declaration owns at most one placeholder. Unresolved type names
//! get a placeholder from the project's registry instead, which lives until
//! the scope it was created for is disposed.

use std::sync::Arc;

use smol_str::SmolStr;

use crate::base::{QualifiedName, TextRange};

use super::decl::{ClassData, DeclData, Declaration, EnumData};
use super::ids::{ClassKey, DeclKind, PlaceholderOrigin, Uid, UidKey};
use super::project::Project;
use super::resolve::{LookupKind, ResolveContext, Resolver};

/// The classifier a forward declaration stands for: its bound definition
/// while that is alive, else a definition found by lookup, else its own
/// placeholder.
pub fn real_target(
    project: &Project,
    ctx: &ResolveContext,
    forward: &Arc<Declaration>,
) -> Option<Arc<Declaration>> {
    let data = forward.forward_data()?;
    let bound = *data.target.read();
    if let Some(target) = bound.and_then(|uid| project.declaration(uid)) {
        if target.is_valid() {
            return Some(target);
        }
    }

    let _guard = ctx.enter(forward.uid())?;
    let scope = forward
        .scope()
        .unwrap_or_else(|| project.global_namespace());
    if let Some(definition) = Resolver::definitions(project, ctx).find_definition(scope, &data.path, data.key) {
        tracing::trace!(
            "[FORWARD] {} bound to {}",
            forward.uid(),
            definition.uid()
        );
        *data.target.write() = Some(definition.uid());
        return Some(definition);
    }
    placeholder_for(project, forward)
}

/// The placeholder owned by `forward`, created on first use.
///
/// Owned placeholders are registered in the store but listed in no scope,
/// so name lookup never finds them directly.
pub fn placeholder_for(project: &Project, forward: &Declaration) -> Option<Arc<Declaration>> {
    let data = forward.forward_data()?;
    let existing = *data.placeholder.read();
    if let Some(placeholder) = existing.and_then(|uid| project.declaration(uid)) {
        return Some(placeholder);
    }
    let name = data.path.last()?.clone();
    let key = UidKey::Placeholder {
        owner: forward.uid(),
        qualified: SmolStr::new(data.path.to_string()),
        origin: PlaceholderOrigin::Forward,
    };
    let scope = forward.scope();
    let range = forward.range();
    let placeholder = project.store().put_declaration(key, |uid| {
        placeholder_decl(uid, name, data.key, PlaceholderOrigin::Forward)
            .in_file(forward.file(), range)
            .with_scope(scope)
    });
    *data.placeholder.write() = Some(placeholder.uid());
    tracing::debug!(
        "[FORWARD] placeholder {} for `{}`",
        placeholder.uid(),
        data.path
    );
    Some(placeholder)
}

/// Placeholder for a type name that resolved to nothing, one per
/// (scope, qualified name).
pub fn unresolved_placeholder(
    project: &Project,
    scope: Uid,
    path: &QualifiedName,
    key: Option<ClassKey>,
) -> Option<Arc<Declaration>> {
    let name = path.last()?.clone();
    let qualified = SmolStr::new(path.to_string());
    let placeholder = project.unresolved_placeholder(scope, qualified.clone(), |store| {
        let key = key.unwrap_or(ClassKey::Class);
        let decl = store.put_declaration(
            UidKey::Placeholder {
                owner: scope,
                qualified,
                origin: PlaceholderOrigin::Unresolved,
            },
            |uid| {
                placeholder_decl(uid, name, key, PlaceholderOrigin::Unresolved)
                    .in_file(None, TextRange::default())
                    .with_scope(Some(scope))
            },
        );
        tracing::debug!("[FORWARD] unresolved placeholder {} for `{path}`", decl.uid());
        decl
    });
    Some(placeholder)
}

fn placeholder_decl(uid: Uid, name: SmolStr, key: ClassKey, origin: PlaceholderOrigin) -> Declaration {
    let data = match key {
        ClassKey::Enum => DeclData::Enum(EnumData {
            placeholder: Some(origin),
            ..EnumData::default()
        }),
        _ => DeclData::Class(ClassData {
            placeholder: Some(origin),
            ..ClassData::default()
        }),
    };
    Declaration::new(uid, key.definition_kind(), name, data)
}

/// Point every forward declaration of `definition`'s qualified name at it.
pub fn bind_definition(project: &Project, definition: &Declaration) -> usize {
    if definition.is_placeholder() || !definition.kind().is_classifier() {
        return 0;
    }
    let qualified = definition.qualified_name(project);
    let mut bound = 0;
    for forward in project.forwards_named(&qualified) {
        let Some(data) = forward.forward_data() else {
            continue;
        };
        if data.key.definition_kind().is_class() != definition.kind().is_class() {
            continue;
        }
        *data.target.write() = Some(definition.uid());
        bound += 1;
    }
    if bound > 0 {
        tracing::trace!("[FORWARD] `{qualified}` bound {bound} forward declaration(s)");
    }
    bound
}

/// Bind a newly registered forward declaration to an existing definition.
pub fn bind_forward(project: &Project, forward: &Arc<Declaration>) {
    let Some(data) = forward.forward_data() else {
        return;
    };
    let ctx = ResolveContext::new(project);
    let scope = forward
        .scope()
        .unwrap_or_else(|| project.global_namespace());
    if let Some(definition) = Resolver::definitions(project, &ctx).resolve(scope, &data.path, key_lookup(data.key)) {
        if definition.kind().is_classifier() && !definition.is_placeholder() {
            *data.target.write() = Some(definition.uid());
        }
    }
}

fn key_lookup(key: ClassKey) -> LookupKind {
    match key {
        ClassKey::Enum => LookupKind::Enum,
        _ => LookupKind::Class,
    }
}

/// Link a class or enum definition to the member forward declaration it
/// completes.
///
/// The class to search is the one named by the definition's qualifier
/// (`struct A::B { }`), or else `current_class` when the definition is
/// nested in a class body. On a match the forward declaration is rebound
/// and the definition is re-parented under the forward's class. Returns
/// the class the definition now belongs to.
pub fn link_member_forward(
    project: &Project,
    definition: &Arc<Declaration>,
    qualifier: &[SmolStr],
    current_class: Option<Uid>,
) -> Option<Uid> {
    if !definition.kind().is_classifier() || definition.is_placeholder() {
        return None;
    }
    let class = if qualifier.is_empty() {
        project.declaration(current_class?)?
    } else {
        let ctx = ResolveContext::new(project);
        let scope = definition
            .scope()
            .unwrap_or_else(|| project.global_namespace());
        let path = QualifiedName::new(qualifier.to_vec());
        Resolver::definitions(project, &ctx).resolve(scope, &path, LookupKind::Class)?
    };
    if !class.kind().is_class() {
        return None;
    }

    let members = class.class_data()?.members.named(definition.name());
    let forward = members
        .iter()
        .filter(|e| matches!(e.kind, DeclKind::ClassForwardDeclaration | DeclKind::EnumForwardDeclaration))
        .filter_map(|e| project.declaration(e.uid))
        .find(|f| f.is_valid())?;
    let data = forward.forward_data()?;
    *data.target.write() = Some(definition.uid());
    if definition.scope() != Some(class.uid()) {
        project.set_scope(definition, Some(class.uid()));
    }
    tracing::debug!(
        "[FORWARD] `{}` completes member forward declaration in {}",
        definition.name(),
        class.uid()
    );
    Some(class.uid())
}
