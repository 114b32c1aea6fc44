//! Every input round-trips through the syntax tree.

use cppmodel::parser::{AstNode, SourceFile, SyntaxKind, parse};
use rstest::rstest;

use crate::helpers::source_fixtures::*;

#[rstest]
#[case::geometry_header(GEOMETRY_H)]
#[case::geometry_source(GEOMETRY_CPP)]
#[case::forward_then_define(FORWARD_THEN_DEFINE)]
#[case::nested_out_of_line(NESTED_OUT_OF_LINE)]
#[case::comments("// line\n/* block\n */ int x; // trailing\n")]
#[case::garbage("@@ struct { ;; }} template<")]
#[case::unterminated_comment("int a; /* never closed")]
#[case::crlf("struct A {\r\n  int b;\r\n};\r\n")]
#[case::empty("")]
fn test_tree_text_equals_input(#[case] text: &str) {
    let result = parse(text);
    assert_eq!(result.syntax().to_string(), text);
}

#[rstest]
#[case::geometry_header(GEOMETRY_H)]
#[case::geometry_source(GEOMETRY_CPP)]
#[case::forward_then_define(FORWARD_THEN_DEFINE)]
#[case::nested_out_of_line(NESTED_OUT_OF_LINE)]
fn test_fixtures_parse_cleanly(#[case] text: &str) {
    let result = parse(text);
    assert!(result.ok(), "{:?}", result.errors);
}

#[test]
fn test_errors_carry_ranges_inside_the_input() {
    let text = "struct A { int x };\nint y = ;\n";
    let result = parse(text);
    for error in &result.errors {
        assert!(usize::from(error.range.end()) <= text.len(), "{error:?}");
    }
}

#[test]
fn test_source_file_lists_includes() {
    let result = parse(GEOMETRY_CPP);
    let source = SourceFile::cast(result.syntax()).unwrap();
    assert_eq!(source.includes(), vec!["geometry.h".to_string()]);

    let result = parse("#include <vector>\n#define X 1\n#include \"a/b.h\"\n");
    let source = SourceFile::cast(result.syntax()).unwrap();
    assert_eq!(source.includes(), vec!["vector".to_string(), "a/b.h".to_string()]);
}

#[test]
fn test_top_level_items_of_the_header() {
    let result = parse(FORWARD_THEN_DEFINE);
    let kinds: Vec<SyntaxKind> = result.syntax().children().map(|n| n.kind()).collect();
    assert_eq!(
        kinds,
        vec![SyntaxKind::CLASS_FWD, SyntaxKind::SIMPLE_DECL, SyntaxKind::SIMPLE_DECL]
    );
}
