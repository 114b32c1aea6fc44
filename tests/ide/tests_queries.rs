//! Analysis queries: scopes, members and types.

use cppmodel::hir::{DeclKind, Visibility};
use cppmodel::ide::{Analysis, AnalysisHost, MemberFilter};
use rstest::rstest;

use crate::helpers::model_helpers::*;
use crate::helpers::source_fixtures::*;

fn geometry() -> (AnalysisHost, Analysis) {
    let (host, _) = host_with("geometry.h", GEOMETRY_H);
    let analysis = host.analysis();
    (host, analysis)
}

fn names(infos: &[cppmodel::ide::DeclInfo]) -> Vec<String> {
    infos.iter().map(|i| i.name.to_string()).collect()
}

#[test]
fn test_declarations_of_a_namespace() {
    let (_host, analysis) = geometry();
    let geo = analysis.resolve("geo", None, None).unwrap();
    let listed = names(&analysis.declarations(geo.uid));
    assert!(listed.iter().any(|n| n == "detail"));
    // Declarations with a source position keep source order; the
    // specialization of `Array` is listed after the primary.
    let positioned: Vec<&String> = listed.iter().filter(|n| *n != "detail").collect();
    assert_eq!(
        positioned,
        vec!["Unit", "Point", "Vec2", "Shape", "Circle", "Array", "Array", "Size"]
    );
}

#[test]
fn test_declarations_of_a_file_unit() {
    let (host, file) = host_with("two.h", "namespace a { int x; }\nint y;");
    let analysis = host.analysis();
    let unit = host.project().file_unit(file).unwrap();
    let listed = analysis.declarations(unit.uid);
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].kind, DeclKind::NamespaceDefinition);
    assert_eq!(listed[1].name, "y");
}

#[test]
fn test_file_declarations_splice_namespace_blocks() {
    let (host, file) = host_with("outline.h", "int first;\nnamespace a { int inner; namespace b { int deeper; } }\nint last;");
    let outline = host.analysis().file_declarations(file);
    let kinds_and_names: Vec<(DeclKind, String)> =
        outline.iter().map(|i| (i.kind, i.name.to_string())).collect();
    assert_eq!(
        kinds_and_names,
        vec![
            (DeclKind::Variable, "first".to_string()),
            (DeclKind::NamespaceDefinition, "a".to_string()),
            (DeclKind::Variable, "inner".to_string()),
            (DeclKind::NamespaceDefinition, "b".to_string()),
            (DeclKind::Variable, "deeper".to_string()),
            (DeclKind::Variable, "last".to_string()),
        ]
    );
}

#[rstest]
#[case::everything(MemberFilter::default(), &["Shape", "~Shape", "unit", "id"], 6)]
#[case::by_name(MemberFilter::named("area"), &["area"], 1)]
#[case::fields_only(MemberFilter::of_kinds([DeclKind::Field]), &["unit", "id"], 2)]
fn test_members_with_filter(#[case] filter: MemberFilter, #[case] includes: &[&str], #[case] count: usize) {
    let (_host, analysis) = geometry();
    let shape = analysis.resolve("geo::Shape", None, None).unwrap();
    let members = analysis.members(shape.uid, &filter);
    let listed = names(&members);
    assert_eq!(members.len(), count, "{listed:?}");
    for name in includes {
        assert!(listed.iter().any(|n| n == name), "missing `{name}` in {listed:?}");
    }
}

#[test]
fn test_member_visibility_follows_access_specifiers() {
    let (_host, analysis) = geometry();
    let shape = analysis.resolve("geo::Shape", None, None).unwrap();
    let members = analysis.members(shape.uid, &MemberFilter::of_kinds([DeclKind::Field]));
    let by_name = |n: &str| members.iter().find(|m| m.name == n).unwrap().visibility;
    assert_eq!(by_name("unit"), Visibility::Protected);
    assert_eq!(by_name("id"), Visibility::Private);
}

#[test]
fn test_inherited_members_follow_own_members() {
    let (_host, analysis) = geometry();
    let circle = analysis.resolve("geo::Circle", None, None).unwrap();

    let own = names(&analysis.members(circle.uid, &MemberFilter::default()));
    assert_eq!(own, vec!["area", "centre", "radius"]);

    let all = names(&analysis.members(circle.uid, &MemberFilter::default().inherited()));
    assert_eq!(&all[..3], &own[..]);
    assert!(all.iter().any(|n| n == "name"));
    assert!(all.iter().any(|n| n == "unit"));
}

#[test]
fn test_inherited_members_from_a_template_base() {
    let (host, _) = host_with(
        "base.h",
        "template<class T> struct Holder { T held; };\nstruct Item { };\nstruct Bag : Holder<Item> { int count; };",
    );
    let analysis = host.analysis();
    let bag = analysis.resolve("Bag", None, None).unwrap();
    let members = analysis.members(bag.uid, &MemberFilter::default().inherited());
    let held = members.iter().find(|m| m.name == "held").unwrap();
    assert_eq!(held.type_text.as_deref(), Some("Item"));
}

#[test]
fn test_members_of_type_substitutes_arguments() {
    let (host, file) = host_with("geometry.h", GEOMETRY_H);
    let members = host.analysis().members_of_type(file, "geo::Array<double>");
    let begin = members.iter().find(|m| m.name == "begin").unwrap();
    assert_eq!(begin.type_text.as_deref(), Some("double*"));
    let value_type = members.iter().find(|m| m.name == "value_type").unwrap();
    assert_eq!(value_type.type_text.as_deref(), Some("double"));
}

#[rstest]
#[case::plain_class("geo::Point", &["x", "y"])]
#[case::pointer_to_class("const geo::Point*", &["x", "y"])]
#[case::through_typedef("geo::Vec2", &["x", "y"])]
#[case::specialization("geo::Array<bool>", &["bits", "value_type", "items", "begin"])]
#[case::builtin("int", &[])]
fn test_members_of_type(#[case] type_text: &str, #[case] expected: &[&str]) {
    let (host, file) = host_with("geometry.h", GEOMETRY_H);
    let members = host.analysis().members_of_type(file, type_text);
    assert_eq!(names(&members), expected);
}

#[test]
fn test_members_of_type_sees_the_file_using_directives() {
    let (host, file) = host_with(
        "using.h",
        "namespace geo { struct Point { int x; int y; }; }\nusing namespace geo;",
    );
    let members = host.analysis().members_of_type(file, "Point");
    assert_eq!(names(&members), ["x", "y"]);
}

#[test]
fn test_type_text_and_canonical_text() {
    let (host, _) = host_with(
        "types.h",
        "namespace geo { struct Point { }; typedef Point Vec2; }\nusing namespace geo;\nconst Vec2* corner;",
    );
    let analysis = host.analysis();
    let corner = analysis.resolve("corner", None, None).unwrap();
    assert_eq!(analysis.type_text(corner.uid).as_deref(), Some("const Vec2*"));
    assert_eq!(analysis.canonical_type_text(corner.uid).as_deref(), Some("const geo::Point*"));
    assert_eq!(corner.type_text.as_deref(), Some("const Vec2*"));

    let geo = analysis.resolve("geo", None, None).unwrap();
    assert_eq!(analysis.type_text(geo.uid), None);
}

#[test]
fn test_declaration_info_is_a_snapshot() {
    let (_host, analysis) = geometry();
    let size = analysis.resolve("geo::Size", None, None).unwrap();
    assert_eq!(size.kind, DeclKind::TypeAlias);
    assert_eq!(size.qualified_name, "geo::Size");
    assert!(size.is_valid);
    assert!(!size.is_placeholder);
    assert_eq!(analysis.declaration(size.uid), Some(size));
}
