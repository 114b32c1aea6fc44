//! AnalysisHost: file lifecycle and includes.

use cppmodel::LineCol;
use cppmodel::base::{FileId, TextSize};
use cppmodel::hir::{DeclKind, LookupKind, ResolveContext};
use cppmodel::ide::AnalysisHost;
use rstest::rstest;

use crate::helpers::model_helpers::*;
use crate::helpers::source_fixtures::*;

fn offset_of(text: &str, needle: &str) -> TextSize {
    TextSize::from(text.find(needle).unwrap_or_else(|| panic!("`{needle}` not in source")) as u32)
}

fn includes_of(host: &AnalysisHost, file: FileId) -> Vec<FileId> {
    let unit = host.project().file_unit(file).unwrap();
    let includes = unit.includes.read().clone();
    includes.unwrap_or_default()
}

#[test]
fn test_set_file_text_renders_the_file() {
    let (host, file) = host_with("geometry.h", GEOMETRY_H);
    assert_eq!(host.file_id("geometry.h"), Some(file));
    assert_eq!(host.file_path(file), Some("geometry.h"));
    assert_eq!(host.file_count(), 1);

    let analysis = host.analysis();
    let circle = analysis.resolve("geo::Circle", None, None).unwrap();
    assert_eq!(circle.kind, DeclKind::Class);
    assert_eq!(circle.file, Some(file));
    assert_eq!(circle.start.map(|p| p.line), Some(27));
}

#[test]
fn test_replacing_text_disposes_the_old_declarations() {
    let (mut host, file) = host_with("a.h", "struct Old { int a; };");
    let before = host.analysis();
    let old = before.resolve("Old", None, None).unwrap();

    let update = host.set_file_text("a.h", "struct New { int b; };");
    assert_eq!(update.file, file);
    assert_eq!(update.disposed, 1);
    assert!(update.render.errors.is_empty());

    let after = host.analysis();
    assert!(after.resolve("Old", None, None).is_none());
    assert!(after.resolve("New::b", None, None).is_some());
    // The earlier snapshot is owned data and stays as it was.
    assert_eq!(old.name, "Old");
    assert!(after.declaration(old.uid).is_none());
}

#[test]
fn test_unchanged_text_keeps_uids() {
    let (mut host, _) = host_with("a.h", "namespace n { struct S { int v; }; }");
    let first = host.analysis().resolve("n::S::v", None, None).unwrap();
    host.set_file_text("a.h", "namespace n { struct S { int v; }; }");
    let second = host.analysis().resolve("n::S::v", None, None).unwrap();
    assert_eq!(first.uid, second.uid);
}

#[test]
fn test_remove_file() {
    let (mut host, _) = host_with("a.h", "int gone;");
    host.set_file_text("b.h", "int kept;");
    assert!(host.remove_file("a.h"));
    assert!(!host.remove_file("a.h"));
    assert_eq!(host.file_count(), 1);
    assert_eq!(host.file_id("a.h"), None);

    let analysis = host.analysis();
    assert!(analysis.resolve("gone", None, None).is_none());
    assert!(analysis.resolve("kept", None, None).is_some());
}

#[rstest]
#[case::exact("geometry.h")]
#[case::suffix("src/geo/geometry.h")]
fn test_includes_link_to_known_files(#[case] header_path: &str) {
    let mut host = AnalysisHost::new();
    let header = host.set_file_text(header_path, GEOMETRY_H).file;
    let source = host.set_file_text("main.cpp", GEOMETRY_CPP).file;

    assert_eq!(includes_of(&host, source), vec![header]);
}

#[test]
fn test_includes_update_when_the_header_arrives_later() {
    let mut host = AnalysisHost::new();
    let source = host.set_file_text("main.cpp", GEOMETRY_CPP).file;
    assert!(includes_of(&host, source).is_empty());

    let header = host.set_file_text("geometry.h", GEOMETRY_H).file;
    assert_eq!(includes_of(&host, source), vec![header]);
}

#[test]
fn test_included_declaration_preferred_over_unrelated_one() {
    let mut host = AnalysisHost::new();
    host.set_file_text("x.h", "struct Config { int from_x; };");
    let y = host.set_file_text("y.h", "struct Config { int from_y; };").file;
    let main = host.set_file_text("main.cpp", "#include \"y.h\"\nConfig config;").file;

    let analysis = host.analysis();
    let config = analysis.resolve("Config", Some(main), None).unwrap();
    assert_eq!(config.file, Some(y));
}

#[test]
fn test_file_level_using_applies_after_its_position() {
    let text = "namespace lib { int value; }\nint before;\nusing namespace lib;\nint after;";
    let (host, file) = host_with("u.cpp", text);
    let analysis = host.analysis();

    let early = offset_of(text, "int before");
    let late = offset_of(text, "int after");
    assert!(analysis.resolve("value", Some(file), Some(early)).is_none());
    let value = analysis.resolve("value", Some(file), Some(late)).unwrap();
    assert_eq!(value.qualified_name, "lib::value");
    // Without a file there is no file-level context.
    assert!(analysis.resolve("value", None, None).is_none());
}

#[test]
fn test_resolve_at_starts_in_the_innermost_scope() {
    let text = "namespace n {\n  struct S { int m; };\n  void f() {\n    int local;\n  }\n}\n";
    let (host, file) = host_with("scope.cpp", text);
    let analysis = host.analysis();

    let in_body = LineCol { line: 3, col: 14 };
    let local = analysis.resolve_at("local", file, in_body).unwrap();
    assert_eq!(local.qualified_name, "n::f::local");
    let s = analysis.resolve_at("S", file, in_body).unwrap();
    assert_eq!(s.qualified_name, "n::S");

    let outside = LineCol { line: 5, col: 1 };
    assert!(analysis.resolve_at("local", file, outside).is_none());
    assert!(analysis.resolve_at("S", file, outside).is_none());
    assert!(analysis.resolve_at("n::S", file, outside).is_some());
}

#[test]
fn test_resolve_at_position_past_the_end() {
    let (host, file) = host_with("tiny.h", "int x;");
    assert!(host.analysis().resolve_at("x", file, LineCol { line: 9, col: 0 }).is_none());
}

#[test]
fn test_library_added_through_the_host() {
    let library = project_from("namespace ext { struct Widget { int w; }; }");
    let (mut host, file) = host_with("app.cpp", "ext::Widget widget;");
    host.add_library(std::sync::Arc::new(library));

    let analysis = host.analysis();
    let widget = analysis.resolve("widget", Some(file), None).unwrap();
    assert_eq!(analysis.canonical_type_text(widget.uid).as_deref(), Some("ext::Widget"));
}

#[test]
fn test_type_from_an_included_file_keeps_its_own_using_directives() {
    let mut host = AnalysisHost::new();
    let header = host
        .set_file_text("a.h", "namespace X { struct T { }; }\nnamespace Y { struct T { }; }\nusing namespace X;\nT v;")
        .file;
    let main = host.set_file_text("b.cpp", "#include \"a.h\"\nint w;").file;
    assert_eq!(includes_of(&host, main), vec![header]);

    let project = host.project().clone();
    let v = assert_resolves(&project, "v", LookupKind::Variable);
    let ctx = ResolveContext::at(&project, main, None);
    let found = v.declared_type().unwrap().classifier(&project, &ctx).unwrap();
    assert_eq!(found.qualified_name(&project), "X::T");
    assert_eq!(found.declaration().file(), Some(header));
}

#[test]
fn test_cached_classifier_follows_a_definition_moved_to_another_file() {
    let mut host = AnalysisHost::new();
    let first = host.set_file_text("first.h", "struct Target { int v; };").file;
    let second = host.set_file_text("second.h", "int unrelated;").file;
    let user = host
        .set_file_text("user.cpp", "#include \"first.h\"\n#include \"second.h\"\nTarget t;")
        .file;

    let project = host.project().clone();
    let t = assert_resolves(&project, "t", LookupKind::Variable);
    let ty = t.declared_type().unwrap();
    let before = ty.classifier(&project, &ResolveContext::at(&project, user, None)).unwrap();
    assert_eq!(before.declaration().file(), Some(first));
    assert_eq!(ty.cache.cached_generation(), Some(project.generation()));

    host.set_file_text("first.h", "int moved_out;");
    host.set_file_text("second.h", "struct Target { int v; int w; };");
    assert!(!before.declaration().is_valid());

    let after = ty.classifier(&project, &ResolveContext::at(&project, user, None)).unwrap();
    assert_ne!(after.uid(), before.uid());
    assert_eq!(after.declaration().file(), Some(second));
    assert!(after.declaration().is_valid());
    assert_eq!(after.declaration().children().len(), 2);
    assert_eq!(ty.cache.cached_generation(), Some(project.generation()));
}
