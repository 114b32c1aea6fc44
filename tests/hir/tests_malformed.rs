//! Malformed input aborts only the construct it affects.

use cppmodel::base::FileId;
use cppmodel::hir::{LookupKind, ModelConfig, Project, RenderError, render_source};
use rstest::rstest;

use crate::helpers::model_helpers::*;

fn render(text: &str) -> (Project, Vec<RenderError>) {
    let project = Project::new("malformed", ModelConfig::default());
    let outcome = render_source(&project, FileId::new(0), text);
    (project, outcome.errors)
}

#[test]
fn test_declaration_without_declarator_is_reported() {
    let (project, errors) = render("struct Before { };\ntypedef int;\nstruct After { };");
    assert!(matches!(errors.as_slice(), [RenderError::MissingDeclarator { .. }]));
    assert_resolves(&project, "Before", LookupKind::Class);
    assert_resolves(&project, "After", LookupKind::Class);
}

#[test]
fn test_namespace_inside_class_is_unsupported() {
    let (project, errors) = render("struct S { namespace N { } int kept; };");
    assert!(errors.iter().any(|e| matches!(e, RenderError::Unsupported { .. })));
    assert_resolves(&project, "S::kept", LookupKind::Variable);
    assert_not_found(&project, "N", LookupKind::Namespace);
}

#[test]
fn test_error_ranges_point_into_the_source() {
    let text = "int ok;\ntypedef int;\n";
    let (_, errors) = render(text);
    let range = errors[0].range();
    assert!(usize::from(range.end()) <= text.len());
    assert!(text[usize::from(range.start())..].starts_with("typedef"));
}

#[rstest]
#[case::unbalanced_brace("struct A { int x;\nstruct B { };")]
#[case::garbage_tokens("@@ $$ struct C { };")]
#[case::stray_close("} } struct D { };")]
#[case::half_template("template<class T struct E { };")]
#[case::empty("")]
fn test_garbage_never_panics(#[case] text: &str) {
    let (project, _) = render(text);
    // The project stays usable.
    render_source(&project, FileId::new(1), "struct Fine { };");
    assert_resolves(&project, "Fine", LookupKind::Class);
}

#[test]
fn test_recovered_class_keeps_members_before_the_error() {
    let (project, _) = render("struct Partial { int first; @@@ };\nint after;");
    assert_resolves(&project, "Partial", LookupKind::Class);
    assert_resolves(&project, "after", LookupKind::Variable);
}
