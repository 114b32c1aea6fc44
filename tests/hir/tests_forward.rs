//! Forward declarations, their placeholders and late binding.

use cppmodel::base::FileId;
use cppmodel::hir::{
    DeclKind, LookupKind, PlaceholderOrigin, ResolveContext, real_target, render_source,
};

use crate::helpers::model_helpers::*;
use crate::helpers::source_fixtures::*;

#[test]
fn test_use_before_definition_resolves_to_definition() {
    let project = project_from(FORWARD_THEN_DEFINE);
    assert_eq!(classifier_of(&project, "List::head").as_deref(), Some("Node"));
    assert_eq!(classifier_of(&project, "Node::next").as_deref(), Some("Node"));

    let ctx = ResolveContext::new(&project);
    let list = assert_resolves(&project, "List", LookupKind::Class);
    let head = assert_resolves(&project, "List::head", LookupKind::Variable);
    let node = head.declared_type().unwrap().classifier(&project, &ctx).unwrap();
    assert!(!node.is_placeholder());
    assert_eq!(node.declaration().kind(), DeclKind::Struct);
    assert!(node.declaration().start() > list.start());
}

#[test]
fn test_forward_declarations_are_bound_to_the_definition() {
    let project = project_from(FORWARD_THEN_DEFINE);
    let ctx = ResolveContext::new(&project);
    let node = assert_resolves(&project, "Node", LookupKind::Class);

    let forwards = project.forwards_named("Node");
    assert_eq!(forwards.len(), 1);
    let forward = &forwards[0];
    assert_eq!(*forward.forward_data().unwrap().target.read(), Some(node.uid()));
    assert_eq!(real_target(&project, &ctx, forward).map(|d| d.uid()), Some(node.uid()));
}

#[test]
fn test_undefined_forward_yields_a_stable_placeholder() {
    let project = project_from("struct Opaque;\nOpaque* handle;\nOpaque* other;");
    let ctx = ResolveContext::new(&project);
    let handle = assert_resolves(&project, "handle", LookupKind::Variable);
    let other = assert_resolves(&project, "other", LookupKind::Variable);

    let first = handle.declared_type().unwrap().classifier(&project, &ctx).unwrap();
    let second = other.declared_type().unwrap().classifier(&project, &ctx).unwrap();
    assert!(first.is_placeholder());
    assert_eq!(first.declaration().placeholder_origin(), Some(PlaceholderOrigin::Forward));
    assert_eq!(first.uid(), second.uid());
    assert_eq!(first.qualified_name(&project), "Opaque");
}

#[test]
fn test_definition_in_a_later_file_replaces_the_placeholder() {
    let project = project_from_files(&["struct Late;\nLate* ptr;"]);
    let ctx = ResolveContext::new(&project);
    let ptr = assert_resolves(&project, "ptr", LookupKind::Variable);
    let placeholder = ptr.declared_type().unwrap().classifier(&project, &ctx).unwrap();
    assert!(placeholder.is_placeholder());

    render_source(&project, FileId::new(1), "struct Late { int ready; };");
    let ctx = ResolveContext::new(&project);
    let real = ptr.declared_type().unwrap().classifier(&project, &ctx).unwrap();
    assert!(!real.is_placeholder());
    assert_eq!(real.declaration().file(), Some(FileId::new(1)));
    assert_resolves(&project, "Late::ready", LookupKind::Variable);
}

#[test]
fn test_disposed_definition_reverts_to_the_placeholder() {
    let project = project_from_files(&["struct Late;\nLate* ptr;", "struct Late { };"]);
    let ctx = ResolveContext::new(&project);
    let ptr = assert_resolves(&project, "ptr", LookupKind::Variable);
    assert!(!ptr.declared_type().unwrap().classifier(&project, &ctx).unwrap().is_placeholder());

    project.dispose_file(FileId::new(1));
    let after = ptr.declared_type().unwrap().classifier(&project, &ctx).unwrap();
    assert!(after.is_placeholder());
    assert_eq!(after.declaration().placeholder_origin(), Some(PlaceholderOrigin::Forward));
}

#[test]
fn test_member_forward_completed_out_of_line() {
    let project = project_from(NESTED_OUT_OF_LINE);
    let stream = assert_resolves(&project, "io::Stream", LookupKind::Class);
    let buffer = assert_resolves(&project, "io::Stream::Buffer", LookupKind::Class);

    assert!(!buffer.is_placeholder());
    assert_eq!(buffer.kind(), DeclKind::Struct);
    assert_eq!(buffer.scope(), Some(stream.uid()));
    assert_eq!(buffer.qualified_name(&project), "io::Stream::Buffer");
    assert_eq!(classifier_of(&project, "io::Stream::buffer").as_deref(), Some("io::Stream::Buffer"));
    assert_resolves(&project, "io::Stream::Buffer::data", LookupKind::Variable);
}

#[test]
fn test_enum_forward_binds_to_enum() {
    let project = project_from("enum class Mode : int;\nMode current;\nenum class Mode : int { On, Off };");
    assert_eq!(classifier_of(&project, "current").as_deref(), Some("Mode"));
    let mode = assert_resolves(&project, "Mode", LookupKind::Enum);
    assert_eq!(mode.kind(), DeclKind::Enum);
    assert_resolves(&project, "Mode::Off", LookupKind::Value);
}
