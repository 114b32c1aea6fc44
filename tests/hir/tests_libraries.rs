//! Library projects searched after the main project.

use std::sync::Arc;

use cppmodel::base::FileId;
use cppmodel::hir::{LookupKind, ModelConfig, Project, ResolveContext, render_source};

use crate::helpers::model_helpers::*;

const LIBRARY: &str = "namespace std { template<class T> struct vector { T* data; }; struct string { }; }";

fn library() -> Arc<Project> {
    let library = Arc::new(Project::new("stdlib", ModelConfig::default()));
    render_source(&library, FileId::new(0), LIBRARY);
    library
}

#[test]
fn test_library_declarations_resolve_from_user_code() {
    let project = project_from("std::string name;");
    project.add_library(library());

    let ctx = ResolveContext::at(&project, FileId::new(0), None);
    let name = assert_resolves(&project, "name", LookupKind::Variable);
    let string = name.declared_type().unwrap().classifier(&project, &ctx).unwrap();
    assert!(!string.is_placeholder());
    assert!(project.is_library_uid(string.uid()));
    assert_eq!(string.qualified_name(&project), "std::string");
}

#[test]
fn test_library_templates_instantiate() {
    let project = project_from("struct Item { };\nstd::vector<Item> items;");
    project.add_library(library());

    let ctx = ResolveContext::new(&project);
    let items = assert_resolves(&project, "items", LookupKind::Variable);
    let resolved = items.declared_type().unwrap().classifier(&project, &ctx).unwrap();
    let instance = resolved.as_instance().expect("instance of std::vector");
    let data = instance
        .members(&project)
        .into_iter()
        .find(|m| m.name() == "data")
        .unwrap();
    assert_eq!(instance.member_type(&data).unwrap().text(), "Item*");
}

#[test]
fn test_project_declarations_shadow_library_ones() {
    let project = project_from("namespace std { struct string { int local; }; }");
    project.add_library(library());

    let string = assert_resolves(&project, "std::string", LookupKind::Class);
    assert!(!project.is_library_uid(string.uid()));
    assert_resolves(&project, "std::string::local", LookupKind::Variable);
    // Names only the library has still come from it.
    let vector = assert_resolves(&project, "std::vector", LookupKind::Class);
    assert!(project.is_library_uid(vector.uid()));
}

#[test]
fn test_library_disposal_is_seen_by_users() {
    let lib = library();
    let project = project_from("int anchor;");
    project.add_library(lib.clone());
    assert_resolves(&project, "std::string", LookupKind::Class);

    lib.dispose_file(FileId::new(0));
    assert_not_found(&project, "std::string", LookupKind::Class);
}
