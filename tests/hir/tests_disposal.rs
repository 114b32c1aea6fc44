//! Disposal: invalidation, unlinking and re-rendering.

use cppmodel::base::FileId;
use cppmodel::hir::{Entity, LookupKind, Project, render_source};

use crate::helpers::model_helpers::*;
use crate::helpers::source_fixtures::*;

/// Every list held by a live object names only live objects.
fn assert_no_dangling_entries(project: &Project) {
    for uid in project.store().live_uids() {
        let entries = match project.store().resolve(uid) {
            Some(Entity::Declaration(decl)) => {
                assert!(decl.is_valid(), "{uid} is live but invalid");
                decl.lists().iter().flat_map(|l| l.snapshot()).collect::<Vec<_>>()
            }
            Some(Entity::File(unit)) => unit.declarations.snapshot(),
            None => continue,
        };
        for entry in entries {
            assert!(
                project.resolve_uid(entry.uid).is_some(),
                "{uid} lists dead {} `{}`",
                entry.uid,
                entry.name
            );
        }
    }
}

#[test]
fn test_dispose_file_leaves_no_dangling_entries() {
    let project = project_from_files(&[GEOMETRY_H, GEOMETRY_CPP]);
    assert_no_dangling_entries(&project);

    project.dispose_file(FileId::new(1));
    assert_no_dangling_entries(&project);
    assert_resolves(&project, "geo::Circle::area", LookupKind::Function);

    project.dispose_file(FileId::new(0));
    assert_no_dangling_entries(&project);
    assert_not_found(&project, "geo", LookupKind::Namespace);
}

#[test]
fn test_disposed_handles_stay_readable() {
    let project = project_from(GEOMETRY_H);
    let shape = assert_resolves(&project, "geo::Shape", LookupKind::Class);
    let members_before = child_names(&shape);

    project.dispose_file(FileId::new(0));

    assert!(!shape.is_valid());
    assert_eq!(shape.name().as_str(), "Shape");
    assert!(project.declaration(shape.uid()).is_none());
    // Members were disposed with the class and unlinked from its list.
    assert!(!members_before.is_empty());
    assert!(child_names(&shape).is_empty());
}

#[test]
fn test_rerender_reuses_uids_of_unchanged_declarations() {
    let project = project_from(FORWARD_THEN_DEFINE);
    let node = assert_resolves(&project, "Node", LookupKind::Class);

    project.dispose_file(FileId::new(0));
    assert!(project.resolve_uid(node.uid()).is_none());
    render_source(&project, FileId::new(0), FORWARD_THEN_DEFINE);

    let again = assert_resolves(&project, "Node", LookupKind::Class);
    assert_eq!(again.uid(), node.uid());
    assert!(again.is_valid());
    assert!(!node.is_valid());
}

#[test]
fn test_edit_gives_moved_declarations_new_uids() {
    let project = project_from("struct A { };\nstruct B { };");
    let b = assert_resolves(&project, "B", LookupKind::Class);

    project.dispose_file(FileId::new(0));
    render_source(&project, FileId::new(0), "struct A { int grown; };\nstruct B { };");

    let moved = assert_resolves(&project, "B", LookupKind::Class);
    assert_ne!(moved.uid(), b.uid());
}

#[test]
fn test_other_files_survive_a_dispose() {
    let project = project_from_files(&["struct Kept { int k; };", "struct Gone { };"]);
    project.dispose_file(FileId::new(1));

    assert_resolves(&project, "Kept::k", LookupKind::Variable);
    assert_not_found(&project, "Gone", LookupKind::Class);
    assert_no_dangling_entries(&project);
}

#[test]
fn test_references_into_a_disposed_file_fall_back_to_placeholders() {
    let project = project_from_files(&["struct Target { };", "Target use;"]);
    assert_eq!(classifier_of(&project, "use").as_deref(), Some("Target"));
    let real = assert_resolves(&project, "Target", LookupKind::Class);

    project.dispose_file(FileId::new(0));
    let ctx = cppmodel::hir::ResolveContext::new(&project);
    let use_decl = assert_resolves(&project, "use", LookupKind::Variable);
    let fallback = use_decl.declared_type().unwrap().classifier(&project, &ctx).unwrap();
    assert!(fallback.is_placeholder());
    assert_ne!(fallback.uid(), real.uid());

    render_source(&project, FileId::new(0), "struct Target { };");
    let ctx = cppmodel::hir::ResolveContext::new(&project);
    let restored = use_decl.declared_type().unwrap().classifier(&project, &ctx).unwrap();
    assert!(!restored.is_placeholder());
}

#[test]
fn test_friend_functions_are_disposed_with_their_class() {
    let project = project_from("class C { friend void touch(C& c); };");
    let class = assert_resolves(&project, "C", LookupKind::Class);
    let friend = class.class_data().unwrap().friends.snapshot();
    assert_eq!(friend.len(), 1);
    let live_before = project.store().live_count();

    project.dispose(class.uid());
    assert!(project.store().live_count() < live_before);
    assert!(project.resolve_uid(friend[0].uid).is_none());
    assert_no_dangling_entries(&project);
}
