//! Qualified names across namespaces, classes and files.

use cppmodel::base::{FileId, QualifiedName};
use cppmodel::hir::{DeclKind, LookupKind, ResolveContext, Resolver};
use rstest::rstest;

use crate::helpers::model_helpers::*;
use crate::helpers::source_fixtures::*;

#[rstest]
#[case("geo", LookupKind::Namespace)]
#[case("geo::Point", LookupKind::Class)]
#[case("geo::Point::x", LookupKind::Variable)]
#[case("geo::Unit::Inch", LookupKind::Value)]
#[case("geo::Shape::area", LookupKind::Function)]
#[case("geo::Array", LookupKind::Class)]
#[case("geo::detail::v2::counter", LookupKind::Variable)]
fn test_qualified_name_round_trips(#[case] qualified: &str, #[case] kind: LookupKind) {
    let project = project_from(GEOMETRY_H);
    let decl = assert_resolves(&project, qualified, kind);
    assert_eq!(decl.qualified_name(&project), qualified);
}

#[test]
fn test_inline_namespace_member_reachable_without_it() {
    let project = project_from(GEOMETRY_H);
    let counter = assert_resolves(&project, "geo::detail::counter", LookupKind::Variable);
    assert_eq!(counter.qualified_name(&project), "geo::detail::v2::counter");
}

#[test]
fn test_alias_names_resolve_as_types() {
    let project = project_from(GEOMETRY_H);
    let vec2 = assert_resolves(&project, "geo::Vec2", LookupKind::Classifier);
    assert_eq!(vec2.kind(), DeclKind::Typedef);
    let size = assert_resolves(&project, "geo::Size", LookupKind::Classifier);
    assert_eq!(size.alias_type().map(|t| t.text()).as_deref(), Some("unsigned long"));
}

#[test]
fn test_out_of_line_definition_takes_the_class_name() {
    let project = project_from_files(&[GEOMETRY_H, GEOMETRY_CPP]);
    let circle = assert_resolves(&project, "geo::Circle", LookupKind::Class);
    let unit = project.file_unit(FileId::new(1)).unwrap();
    let definition = unit
        .declarations
        .snapshot()
        .into_iter()
        .filter_map(|e| project.declaration(e.uid))
        .find(|d| d.name() == "area")
        .expect("Circle::area definition");

    assert_eq!(definition.kind(), DeclKind::FunctionDefinition);
    assert_eq!(definition.scope(), Some(circle.uid()));
    assert_eq!(definition.qualified_name(&project), "geo::Circle::area");

    let declared = *definition.function_data().unwrap().declaration.read();
    let declaration = project.declaration(declared.unwrap()).unwrap();
    assert_eq!(declaration.kind(), DeclKind::Method);
    assert_eq!(declaration.file(), Some(FileId::new(0)));
    // The class lists its own declaration only.
    assert_eq!(circle.children().iter().filter(|e| e.name == "area").count(), 1);
}

#[test]
fn test_out_of_line_body_sees_class_members() {
    let project = project_from_files(&[GEOMETRY_H, GEOMETRY_CPP]);
    let unit = project.file_unit(FileId::new(1)).unwrap();
    let definition = unit
        .declarations
        .snapshot()
        .into_iter()
        .filter_map(|e| project.declaration(e.uid))
        .find(|d| d.name() == "area")
        .unwrap();
    let ctx = ResolveContext::new(&project);
    let radius = Resolver::new(&project, &ctx)
        .resolve(definition.uid(), &QualifiedName::parse("radius"), LookupKind::Value)
        .expect("radius from inside Circle::area");
    assert_eq!(radius.qualified_name(&project), "geo::Circle::radius");
}

#[test]
fn test_set_scope_renames_descendants() {
    let project = project_from("namespace a { struct S { int v; }; }\nnamespace b { }");
    let s = assert_resolves(&project, "a::S", LookupKind::Class);
    let v = assert_resolves(&project, "a::S::v", LookupKind::Variable);
    let b = assert_resolves(&project, "b", LookupKind::Namespace);

    project.set_scope(&s, Some(b.uid()));
    assert_eq!(s.qualified_name(&project), "b::S");
    assert_eq!(v.qualified_name(&project), "b::S::v");
}

#[test]
fn test_global_qualifier() {
    let project = project_from("int x;\nnamespace n { int x; }");
    let global = assert_resolves(&project, "::x", LookupKind::Variable);
    assert_eq!(global.qualified_name(&project), "x");
    assert_eq!(assert_resolves(&project, "n::x", LookupKind::Variable).qualified_name(&project), "n::x");
}

#[test]
fn test_namespace_spans_files_under_one_name() {
    let project = project_from_files(&["namespace m { int a; }", "namespace m { int b; }"]);
    let a = assert_resolves(&project, "m::a", LookupKind::Variable);
    let b = assert_resolves(&project, "m::b", LookupKind::Variable);
    assert_eq!(a.scope(), b.scope());
    assert_eq!(project.namespaces().iter().filter(|n| n.name() == "m").count(), 1);
}

const USING_SITE: &str = "namespace X { struct T { }; }\nnamespace Y { struct T { }; }\nusing namespace X;\nT v;";

#[rstest]
#[case::written_file(Some(FileId::new(0)))]
#[case::other_file(Some(FileId::new(1)))]
#[case::no_file(None)]
fn test_type_sees_using_directives_where_it_was_written(#[case] start: Option<FileId>) {
    let project = project_from_files(&[USING_SITE, "int w;"]);
    let ctx = match start {
        Some(file) => ResolveContext::at(&project, file, None),
        None => ResolveContext::new(&project),
    };
    let v = assert_resolves(&project, "v", LookupKind::Variable);
    let found = v.declared_type().unwrap().classifier(&project, &ctx).unwrap();
    assert_eq!(found.qualified_name(&project), "X::T");
    assert!(!found.declaration().is_placeholder());
    // No placeholder is left behind for the unqualified name.
    assert_not_found(&project, "T", LookupKind::Class);
}
