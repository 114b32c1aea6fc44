//! Child lists stay in source order.

use cppmodel::base::{FileId, Name, TextSize};
use cppmodel::hir::{DeclKind, LookupKind, MemberEntry, OffsetList, Uid, render_source};
use rstest::rstest;

use crate::helpers::model_helpers::*;
use crate::helpers::source_fixtures::*;

fn entry(slot: u64, file: u32, start: u32, name: &str) -> MemberEntry {
    MemberEntry {
        uid: Uid::new(0, slot),
        kind: DeclKind::Variable,
        file: Some(FileId::new(file)),
        start: TextSize::from(start),
        name: Name::new(name),
    }
}

fn names(list: &OffsetList) -> Vec<String> {
    list.snapshot().iter().map(|e| e.name.to_string()).collect()
}

#[test]
fn test_insert_orders_by_position_not_arrival() {
    let list = OffsetList::new();
    list.insert(entry(1, 0, 30, "c"));
    list.insert(entry(2, 0, 10, "a"));
    list.insert(entry(3, 0, 20, "b"));
    assert_eq!(names(&list), vec!["a", "b", "c"]);
}

#[test]
fn test_insert_orders_files_before_offsets() {
    let list = OffsetList::new();
    list.insert(entry(1, 1, 0, "second_file"));
    list.insert(entry(2, 0, 500, "first_file"));
    assert_eq!(names(&list), vec!["first_file", "second_file"]);
}

#[test]
fn test_insert_is_idempotent_per_uid() {
    let list = OffsetList::new();
    list.insert(entry(1, 0, 10, "a"));
    list.insert(entry(1, 0, 10, "a"));
    assert_eq!(list.len(), 1);
    assert!(list.remove(Uid::new(0, 1)));
    assert!(!list.remove(Uid::new(0, 1)));
    assert!(list.is_empty());
}

#[test]
fn test_equal_positions_keep_insertion_order() {
    let list = OffsetList::new();
    list.insert(entry(1, 0, 4, "x"));
    list.insert(entry(2, 0, 4, "y"));
    assert_eq!(names(&list), vec!["x", "y"]);
}

#[test]
fn test_from_entries_sorts() {
    let list = OffsetList::from_entries(vec![entry(1, 0, 9, "late"), entry(2, 0, 1, "early")]);
    assert_eq!(names(&list), vec!["early", "late"]);
}

#[test]
fn test_class_members_follow_source_order() {
    let project = project_from("struct S { int z; void a(); int m; struct Inner { }; };");
    let s = assert_resolves(&project, "S", LookupKind::Class);
    assert_eq!(child_names(&s), vec!["z", "a", "m", "Inner"]);
}

#[rstest]
#[case::in_order(&[0, 1])]
#[case::reversed(&[1, 0])]
fn test_namespace_contents_ordered_regardless_of_render_order(#[case] order: &[u32]) {
    let sources = ["namespace n { int a; int b; }", "namespace n { int c; }"];
    let project = cppmodel::hir::Project::new("order", Default::default());
    for &index in order {
        render_source(&project, FileId::new(index), sources[index as usize]);
    }
    let n = assert_resolves(&project, "n", LookupKind::Namespace);
    assert_eq!(child_names(&n), vec!["a", "b", "c"]);
}

#[test]
fn test_enumerators_in_declaration_order() {
    let project = project_from("enum Color { Red, Green = 4, Blue };");
    let color = assert_resolves(&project, "Color", LookupKind::Enum);
    assert_eq!(child_names(&color), vec!["Red", "Green", "Blue"]);
}

#[test]
fn test_function_lists_params_then_locals() {
    let project = project_from("int f(int a, int b) { int local; return a; }");
    let f = assert_resolves(&project, "f", LookupKind::Function);
    assert_eq!(child_names(&f), vec!["a", "b", "local"]);
}

#[test]
fn test_geometry_shape_members() {
    let project = project_from(GEOMETRY_H);
    let shape = assert_resolves(&project, "geo::Shape", LookupKind::Class);
    let entries = shape.children();
    assert!(entries.windows(2).all(|w| w[0].start <= w[1].start));
    assert!(entries.iter().any(|e| e.name == "area"));
}
