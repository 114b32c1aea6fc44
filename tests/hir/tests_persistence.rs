//! Eviction to storage and fault-in through weak UIDs.

use std::sync::Arc;

use cppmodel::base::FileId;
use cppmodel::hir::{
    DirStorage, LookupKind, MemoryStorage, ModelConfig, Project, StoreError, render_source,
};
use rstest::rstest;

use crate::helpers::model_helpers::*;
use crate::helpers::source_fixtures::*;

fn stored_project(storage: Arc<MemoryStorage>, source: &str) -> Project {
    let project = Project::with_storage("persisted", ModelConfig::default(), storage);
    render_source(&project, FileId::new(0), source);
    project
}

#[test]
fn test_evicted_declaration_faults_back_in() {
    let storage = Arc::new(MemoryStorage::new());
    let project = stored_project(storage.clone(), GEOMETRY_H);
    let point = assert_resolves(&project, "geo::Point", LookupKind::Class);
    let uid = point.uid();
    drop(point);

    project.store().evict(uid).unwrap();
    assert!(!project.store().is_live(uid));
    assert_eq!(storage.len(), 1);

    let again = assert_resolves(&project, "geo::Point", LookupKind::Class);
    assert_eq!(again.uid(), uid);
    assert!(project.store().is_live(uid));
    assert_eq!(child_names(&again), vec!["x", "y"]);
}

#[test]
fn test_lookup_through_an_evicted_scope() {
    let storage = Arc::new(MemoryStorage::new());
    let project = stored_project(storage, GEOMETRY_H);
    let geo = assert_resolves(&project, "geo", LookupKind::Namespace).uid();
    let circle = assert_resolves(&project, "geo::Circle", LookupKind::Class).uid();
    project.store().evict(geo).unwrap();
    project.store().evict(circle).unwrap();

    let radius = assert_resolves(&project, "geo::Circle::radius", LookupKind::Variable);
    assert_eq!(radius.qualified_name(&project), "geo::Circle::radius");
    assert_eq!(classifier_of(&project, "geo::Circle::centre").as_deref(), Some("geo::Point"));
}

#[test]
fn test_dir_storage_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(DirStorage::new(dir.path().join("blobs")).unwrap());
    let project = Project::with_storage("dir", ModelConfig::default(), storage.clone());
    render_source(&project, FileId::new(0), FORWARD_THEN_DEFINE);

    let node = assert_resolves(&project, "Node", LookupKind::Class).uid();
    project.store().evict(node).unwrap();
    let blob = dir.path().join("blobs").join(format!("{}.bin", node.storage_key()));
    assert!(blob.exists());

    let faulted = project.declaration(node).unwrap();
    assert_eq!(faulted.name(), "Node");
    assert_eq!(classifier_of(&project, "List::head").as_deref(), Some("Node"));
}

#[test]
fn test_flush_persists_without_dropping() {
    let storage = Arc::new(MemoryStorage::new());
    let project = stored_project(storage.clone(), "struct A { int a; };");
    let live = project.store().live_count();
    let written = project.store().flush().unwrap();
    assert_eq!(written, live);
    assert_eq!(storage.len(), live);
    assert_eq!(project.store().live_count(), live);
}

#[test]
fn test_disposing_removes_the_blob() {
    let storage = Arc::new(MemoryStorage::new());
    let project = stored_project(storage.clone(), "struct Gone { };");
    let gone = assert_resolves(&project, "Gone", LookupKind::Class).uid();
    project.store().evict(gone).unwrap();
    assert_eq!(storage.len(), 1);

    project.dispose_file(FileId::new(0));
    assert!(storage.is_empty());
    assert!(project.declaration(gone).is_none());
}

#[rstest]
#[case::evict(true)]
#[case::flush(false)]
fn test_without_storage_is_an_error(#[case] evict: bool) {
    let project = project_from("int x;");
    let uid = assert_resolves(&project, "x", LookupKind::Variable).uid();
    let result = if evict {
        project.store().evict(uid)
    } else {
        project.store().flush().map(|_| ())
    };
    assert!(matches!(result, Err(StoreError::NoStorage)));
    assert!(project.store().is_live(uid));
}

#[test]
fn test_evicting_a_dead_uid_is_an_error() {
    let storage = Arc::new(MemoryStorage::new());
    let project = stored_project(storage, "int x;");
    let uid = assert_resolves(&project, "x", LookupKind::Variable).uid();
    project.dispose_file(FileId::new(0));
    assert!(matches!(project.store().evict(uid), Err(StoreError::NotLive { .. })));
}
