//! Classifier caching across parse generations.

use std::sync::Arc;

use cppmodel::base::FileId;
use cppmodel::hir::{LookupKind, ModelConfig, Project, ResolveContext, render_source};

use crate::helpers::model_helpers::*;

#[test]
fn test_same_generation_reuses_the_cached_answer() {
    let project = project_from("struct A { };\nA a;");
    let ctx = ResolveContext::new(&project);
    let ty = assert_resolves(&project, "a", LookupKind::Variable).declared_type().cloned().unwrap();

    let first = ty.classifier(&project, &ctx).unwrap();
    let generation = ty.cache.cached_generation();
    let second = ty.classifier(&project, &ctx).unwrap();
    assert_eq!(first.uid(), second.uid());
    assert_eq!(ty.cache.cached_generation(), generation);
    assert_eq!(generation, Some(project.generation()));
}

#[test]
fn test_rebinding_after_an_edit() {
    let project = project_from_files(&["struct Target { int v; };", "Target t;"]);
    let t = assert_resolves(&project, "t", LookupKind::Variable);
    let ctx = ResolveContext::new(&project);
    let before = t.declared_type().unwrap().classifier(&project, &ctx).unwrap();

    project.dispose_file(FileId::new(0));
    render_source(&project, FileId::new(0), "struct Other { };\nstruct Target { int v; int w; };");

    let ctx = ResolveContext::new(&project);
    let after = t.declared_type().unwrap().classifier(&project, &ctx).unwrap();
    assert_ne!(after.uid(), before.uid());
    assert!(after.declaration().is_valid());
    assert!(!before.declaration().is_valid());
    assert_eq!(after.declaration().children().len(), 2);
}

#[test]
fn test_new_shadowing_declaration_wins_in_next_generation() {
    let project = project_from_files(&[
        "struct Thing { };\nnamespace app { struct User { Thing member; }; }",
    ]);
    assert_eq!(classifier_of(&project, "app::User::member").as_deref(), Some("Thing"));

    // A closer declaration appears in another file.
    render_source(&project, FileId::new(1), "namespace app { struct Thing { }; }");
    assert_eq!(classifier_of(&project, "app::User::member").as_deref(), Some("app::Thing"));
}

#[test]
fn test_stale_context_still_answers() {
    let project = project_from("struct A { };\nA a;");
    let stale = ResolveContext::new(&project);
    render_source(&project, FileId::new(1), "int unrelated;");
    assert!(stale.generation() < project.generation());

    let a = assert_resolves(&project, "a", LookupKind::Variable);
    let found = a.declared_type().unwrap().classifier(&project, &stale).unwrap();
    assert_eq!(found.qualified_name(&project), "A");
}

#[test]
fn test_generation_is_per_project() {
    let one = Arc::new(Project::new("one", ModelConfig::default()));
    let two = Project::new("two", ModelConfig::default());
    render_source(&one, FileId::new(0), "int x;");
    render_source(&one, FileId::new(1), "int y;");
    assert!(one.generation() > two.generation());
}
