mod common;
use common::*;

fn range(start: u32, end: u32) -> TextRange {
    TextRange::new(TextSize::new(start), TextSize::new(end))
}

#[test]
fn test_append_statement_reuses_earlier_ones() {
    let language = calc();
    let source = "a = 1;\nb = 2;\n";
    let old = parse(&language, source).unwrap();
    let change = InputEdit::insert(source, TextSize::new(14), "c = 3;\n");
    let edited = edit(&old, &change);

    let mut parser = Parser::with_language(language.clone());
    let new = parser
        .parse("a = 1;\nb = 2;\nc = 3;\n", Some(&edited))
        .unwrap();
    assert_eq!(new.root_node().named_child_count(), 3);
    assert!(parser.stats().reused_subtrees >= 1);
    assert!(parser.stats().reused_bytes >= 6);

    let old_first = old.root_node().named_child(0).unwrap();
    let new_first = new.root_node().named_child(0).unwrap();
    assert_eq!(old_first.id(), new_first.id());
}

#[test]
fn test_old_tree_is_untouched() {
    let language = calc();
    let source = "a = 1;\n";
    let old = parse(&language, source).unwrap();
    let before = debug_tree(&old, source);
    let edited = edit(&old, &InputEdit::replace(source, range(4, 5), "42"));
    let _ = reparse(&edited, "a = 42;\n").unwrap();
    assert_eq!(debug_tree(&old, source), before);
    assert!(!old.root_node().has_changes());
    assert!(edited.root_node().has_changes());
}

#[test]
fn test_edit_marks_touching_nodes() {
    let language = calc();
    let source = "a = 1;\nb = 2;\n";
    let old = parse(&language, source).unwrap();
    let edited = edit(&old, &InputEdit::replace(source, range(11, 12), "7"));
    let root = edited.root_node();
    assert!(root.has_changes());
    assert!(!root.named_child(0).unwrap().has_changes());
    let second = root.named_child(1).unwrap();
    assert!(second.has_changes());
    assert_eq!(second.byte_range(), range(7, 13));
}

#[test]
fn test_edit_shifts_following_nodes() {
    let language = calc();
    let source = "a = 1;\nb = 2;\n";
    let old = parse(&language, source).unwrap();
    let edited = edit(&old, &InputEdit::insert(source, TextSize::new(0), "\n\n"));
    let second = edited.root_node().named_child(1).unwrap();
    assert_eq!(second.byte_range(), range(9, 15));
    assert_eq!(second.start_position().row, 3);
}

#[test]
fn test_reparse_matches_fresh_parse() {
    let language = calc();
    let source = "a = 1 + 2;\nb = (a - 3) * a;\n# note\nc = b;\n";
    let cases: &[(u32, u32, &str)] = &[
        (4, 5, "10"),
        (0, 0, "z = 0;\n"),
        (9, 10, ""),
        (9, 10, "; d = 4;"),
        (16, 17, "("),
        (28, 32, "comment"),
        (0, 42, ""),
        (42, 42, "d"),
        (5, 6, "@"),
        (12, 13, "bb"),
    ];
    for &(start, end, replacement) in cases {
        let (_, tree, text) = edit_and_compare(&language, source, range(start, end), replacement);
        assert_lossless(&tree, &text);
    }
}

#[test]
fn test_repeated_edits() {
    let language = calc();
    let mut text = String::from("x = 1;\n");
    let mut tree = parse(&language, &text).unwrap();
    for step in 0..10u32 {
        let offset = TextSize::of(text.as_str());
        let line = format!("v{step} = v{} + {step};\n", step.saturating_sub(1));
        let change = InputEdit::insert(&text, offset, &line);
        text.push_str(&line);
        tree = reparse(&edit(&tree, &change), text.as_str()).unwrap();
        let fresh = parse(&language, &text).unwrap();
        assert_eq!(debug_tree(&tree, &text), debug_tree(&fresh, &text));
    }
    assert_eq!(tree.root_node().named_child_count(), 11);
}

#[test]
fn test_fixing_an_error_clears_it() {
    let language = calc();
    let (_, broken, text) = edit_and_compare(&language, "a = 1;\nb = 2;\n", range(5, 6), "");
    assert_eq!(text, "a = 1\nb = 2;\n");
    assert!(broken.root_node().has_error());

    let change = InputEdit::insert(&text, TextSize::new(5), ";");
    let fixed = reparse(&edit(&broken, &change), "a = 1;\nb = 2;\n").unwrap();
    assert!(!fixed.root_node().has_error());
    assert!(fixed.errors().is_empty());
}

#[test]
fn test_changed_ranges_cover_edit() {
    let language = calc();
    let source = "a = 1;\nb = 2;\nc = 3;\n";
    let (old, new, _) = edit_and_compare(&language, source, range(11, 12), "x + y");
    let changed = new.changed_ranges(&old);
    assert!(!changed.is_empty());
    assert!(changed
        .iter()
        .any(|range| range.contains_inclusive(TextSize::new(11))));
    assert!(changed
        .iter()
        .all(|range| range.start() >= TextSize::new(7)));
}

#[test]
fn test_language_mismatch_falls_back_to_full_parse() {
    let calc_a = calc();
    let calc_b = calc();
    let source = "a = 1;\n";
    let old = parse(&calc_a, source).unwrap();
    let mut parser = Parser::with_language(calc_b);
    let tree = parser.parse(source, Some(&old)).unwrap();
    assert_eq!(parser.stats().reused_subtrees, 0);
    assert_eq!(parser.stats().reused_leaves, 0);
    assert_eq!(tree.root_node().to_sexp(), old.root_node().to_sexp());
}

#[test]
fn test_unedited_tree_with_wrong_length_is_ignored() {
    let language = calc();
    let old = parse(&language, "a = 1;\n").unwrap();
    let mut parser = Parser::with_language(language);
    let tree = parser.parse("a = 12;\n", Some(&old)).unwrap();
    assert_eq!(parser.stats().reused_leaves, 0);
    assert_eq!(tree.len(), TextSize::new(8));
}
