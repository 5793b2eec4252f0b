mod common;
use common::*;

use expect_test::expect;
use grove_langs::sexp;
use grove_syntax::SyntaxErrorKind;

#[test]
fn test_nested_list() {
    let source = "(a (b c))";
    let tree = parse(&sexp(), source).unwrap();
    let root = tree.root_node();
    assert_eq!(root.kind(), "list");
    assert_eq!(root.byte_range(), range(0, 9));
    assert_eq!(root.named_child_count(), 2);
    assert_eq!(root.named_child(0).unwrap().kind(), "atom");
    assert_eq!(root.named_child(1).unwrap().kind(), "list");
    expect![[r#"
        list@0..9
          "("@0..1
          atom@1..2 "a"
          list@3..8
            "("@3..4
            atom@4..5 "b"
            atom@6..7 "c"
            ")"@7..8
          ")"@8..9
    "#]]
    .assert_eq(&dump(&tree, source));
}

#[test]
fn test_insert_atom_reuses_untouched_tokens() {
    let source = "(a (b c))";
    let language = sexp();
    let old = parse(&language, source).unwrap();
    let change = InputEdit::insert(source, TextSize::new(8), " d");
    let new = reparse(&edit(&old, &change), "(a (b c) d)").unwrap();

    let root = new.root_node();
    assert_eq!(root.to_sexp(), "(list (atom) (list (atom) (atom)) (atom))");
    assert_eq!(root.byte_range(), range(0, 11));
    assert_eq!(root.named_child_count(), 3);
    assert_eq!(root.child(0).unwrap().id(), old.root_node().child(0).unwrap().id());
    assert_eq!(
        dump(&new, "(a (b c) d)"),
        dump(&parse(&language, "(a (b c) d)").unwrap(), "(a (b c) d)")
    );
}

#[test]
fn test_comments_and_strings() {
    let source = "(define (f x) ; note\n  \"s (t)\")";
    let tree = parse(&sexp(), source).unwrap();
    assert_eq!(
        tree.root_node().to_sexp(),
        "(list (atom) (list (atom) (atom)) (comment) (string))"
    );
    assert!(tree.errors().is_empty());
    assert_lossless(&tree, source);
}

#[test]
fn test_unclosed_list_gets_missing_paren() {
    let source = "(a (b c)";
    let tree = parse(&sexp(), source).unwrap();
    assert_eq!(
        tree.root_node().to_sexp(),
        "(list (atom) (list (atom) (atom)) (MISSING \")\"))"
    );
    let errors = tree.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, SyntaxErrorKind::Missing(")".into()));
}

#[test]
fn test_extra_close_paren_is_an_error() {
    let source = "(a))";
    let tree = parse(&sexp(), source).unwrap();
    let root = tree.root_node();
    assert_eq!(root.to_sexp(), "(list (atom) (ERROR))");
    assert_eq!(root.byte_range(), range(0, 4));
    let errors = tree.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, SyntaxErrorKind::Unexpected);
    assert_eq!(errors[0].range, range(3, 4));
}

#[test]
fn test_edits_match_fresh_parses() {
    let source = "(let ((x 1) (y \"two\"))\n  ; body\n  (+ x y))\n";
    let language = sexp();
    let cases: &[(u32, u32, &str)] = &[
        (0, 0, " "),
        (5, 5, "(z 0) "),
        (9, 10, "10"),
        (14, 15, ""),
        (24, 26, ";"),
        (33, 34, "(- "),
        (40, 41, ""),
        (0, 1, ""),
        (43, 43, "(tail)"),
    ];
    for &(start, end, replacement) in cases {
        let (_, tree, text) = edit_and_compare(&language, source, range(start, end), replacement);
        assert_lossless(&tree, &text);
    }
}

#[test]
fn test_noop_edit_matches_fresh_parse() {
    let source = "(a (b c) \"d\")";
    let language = sexp();
    for offset in 0..=u32::try_from(source.len()).unwrap() {
        let (_, tree, text) = edit_and_compare(&language, source, range(offset, offset), "");
        assert_eq!(text, source);
        assert_lossless(&tree, &text);
    }
}

#[test]
fn test_every_node_spans_its_children() {
    let source = "(a (b (c d) e) ; x\n f)";
    let tree = parse(&sexp(), source).unwrap();
    for node in tree.root_node().preorder() {
        if let (Some(first), Some(last)) = (node.child(0), node.child(node.child_count().saturating_sub(1))) {
            assert_eq!(node.start_byte(), first.start_byte());
            assert_eq!(node.end_byte(), last.end_byte());
        }
    }
    assert_eq!(tree.root_node().byte_range(), range(0, 22));
}

#[test]
fn test_deeply_nested_edit() {
    let depth = 100_000;
    let source = format!("{}a{}", "(".repeat(depth), ")".repeat(depth));
    let language = sexp();
    let old = parse(&language, &source).unwrap();

    let change = InputEdit::insert(&source, TextSize::new(depth as u32), "b ");
    let new_text = format!("{}b a{}", "(".repeat(depth), ")".repeat(depth));
    let new = reparse(&edit(&old, &change), new_text.as_str()).unwrap();

    let expected = format!(
        "{}(list (atom) (atom)){}",
        "(list ".repeat(depth - 1),
        ")".repeat(depth - 1)
    );
    assert_eq!(new.root_node().to_sexp(), expected);
    assert!(new.errors().is_empty());
    assert_eq!(
        new.root_node().to_sexp(),
        parse(&language, &new_text).unwrap().root_node().to_sexp()
    );
}
