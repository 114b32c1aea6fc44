//! Readers alongside the single writer.

use std::sync::atomic::{AtomicBool, Ordering};

use cppmodel::ide::{Analysis, AnalysisHost, DeclInfo, MemberFilter};

use crate::helpers::model_helpers::*;
use crate::helpers::source_fixtures::*;

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_handles_cross_threads() {
    assert_send_sync::<Analysis>();
    assert_send_sync::<DeclInfo>();
    assert_send_sync::<cppmodel::hir::Project>();
}

#[test]
fn test_resolve_many_keeps_query_order() {
    let (host, file) = host_with("geometry.h", GEOMETRY_H);
    let queries: Vec<(String, Option<cppmodel::FileId>)> = vec![
        ("geo::Point".to_string(), None),
        ("geo::Nope".to_string(), None),
        ("geo::Circle::radius".to_string(), Some(file)),
        ("geo::Unit::Inch".to_string(), None),
    ];
    let results = host.analysis().resolve_many(&queries);
    let names: Vec<Option<String>> = results
        .into_iter()
        .map(|r| r.map(|info| info.qualified_name))
        .collect();
    assert_eq!(
        names,
        vec![
            Some("geo::Point".to_string()),
            None,
            Some("geo::Circle::radius".to_string()),
            Some("geo::Unit::Inch".to_string()),
        ]
    );
}

#[test]
fn test_readers_run_while_the_host_writes() {
    let mut host = AnalysisHost::new();
    host.set_file_text("geometry.h", GEOMETRY_H);
    let analysis = host.analysis();
    let done = AtomicBool::new(false);

    std::thread::scope(|scope| {
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let analysis = analysis.clone();
                let done = &done;
                scope.spawn(move || {
                    let mut rounds = 0usize;
                    while !done.load(Ordering::Acquire) || rounds == 0 {
                        let circle = analysis.resolve("geo::Circle", None, None).expect("geo::Circle");
                        let members = analysis.members(circle.uid, &MemberFilter::default().inherited());
                        assert!(members.iter().any(|m| m.name == "radius"));
                        rounds += 1;
                    }
                    rounds
                })
            })
            .collect();

        for round in 0..20 {
            host.set_file_text("scratch.cpp", format!("int scratch_{round};\nstruct Tmp{round} {{ }};"));
        }
        done.store(true, Ordering::Release);

        for reader in readers {
            assert!(reader.join().expect("reader panicked") > 0);
        }
    });

    let analysis = host.analysis();
    assert!(analysis.resolve("scratch_19", None, None).is_some());
    assert!(analysis.resolve("scratch_18", None, None).is_none());
}

#[test]
fn test_snapshots_taken_before_an_edit_stay_usable() {
    let (mut host, _) = host_with("a.h", "struct Before { int a; };");
    let old = host.analysis();
    host.set_file_text("a.h", "struct After { int b; };");

    // A handle shares the live model; it sees the edit without crashing.
    assert!(old.resolve("Before", None, None).is_none());
    assert!(old.resolve("After", None, None).is_some());
}
