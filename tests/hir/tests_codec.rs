//! Every object a render produces survives the record codec.

use cppmodel::base::FileId;
use cppmodel::hir::{Entity, ModelConfig, Project, decode, encode, render_source, to_record};
use rstest::rstest;

use crate::helpers::source_fixtures::*;

fn rendered(sources: &[&str]) -> Project {
    let project = Project::new("codec", ModelConfig::default());
    for (index, source) in sources.iter().enumerate() {
        render_source(&project, FileId::new(index as u32), source);
    }
    project
}

fn live_entities(project: &Project) -> Vec<Entity> {
    project
        .store()
        .live_uids()
        .into_iter()
        .filter_map(|uid| project.store().resolve(uid))
        .collect()
}

#[rstest]
#[case::geometry(&[GEOMETRY_H, GEOMETRY_CPP])]
#[case::forwards(&[FORWARD_THEN_DEFINE])]
#[case::nested(&[NESTED_OUT_OF_LINE])]
fn test_live_objects_round_trip(#[case] sources: &[&str]) {
    let project = rendered(sources);
    let entities = live_entities(&project);
    assert!(!entities.is_empty());

    for entity in entities {
        let key = entity.uid().storage_key();
        let bytes = encode(&entity).unwrap();
        let decoded = decode(&key, &bytes).unwrap();
        assert_eq!(decoded.uid(), entity.uid());
        assert_eq!(to_record(&decoded), to_record(&entity), "{key} changed in the codec");
    }
}

#[test]
fn test_disposed_objects_keep_their_invalid_flag() {
    let project = rendered(&[FORWARD_THEN_DEFINE]);
    let entities = live_entities(&project);
    project.dispose_file(FileId::new(0));

    for entity in entities {
        let Entity::Declaration(decl) = entity else {
            continue;
        };
        let decoded = decode("k", &encode(&Entity::Declaration(decl.clone())).unwrap()).unwrap();
        let decoded = decoded.as_declaration().unwrap();
        assert_eq!(decoded.is_valid(), decl.is_valid());
        assert_eq!(decoded.qualified_name(&project), decl.qualified_name(&project));
    }
}

#[test]
fn test_truncated_blob_is_an_error() {
    let project = rendered(&[GEOMETRY_H]);
    let entity = live_entities(&project).pop().unwrap();
    let bytes = encode(&entity).unwrap();
    assert!(decode("truncated", &bytes[..bytes.len() / 2]).is_err());
}
