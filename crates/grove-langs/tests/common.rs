//! Shared helpers for grammar tests.
#![allow(dead_code, unused_imports)]

use std::sync::Arc;

pub use grove_syntax::{edit, parse, reparse, InputEdit, Language, Node, Tree};
pub use text_size::{TextRange, TextSize};

/// Formats a tree for snapshot testing, one node per line. Anonymous extras
/// are left out.
pub fn dump(tree: &Tree, source: &str) -> String {
    let mut output = String::new();
    dump_node(tree.root_node(), source, &mut output, 0);
    for error in tree.errors() {
        output.push_str(&format!("error: {error}\n"));
    }
    output
}

fn dump_node(node: Node<'_>, source: &str, out: &mut String, depth: usize) {
    if node.is_extra() && !node.is_named() {
        return;
    }
    let kind = if node.is_named() {
        node.kind().to_string()
    } else {
        format!("{:?}", node.kind())
    };
    let missing = if node.is_missing() { "MISSING " } else { "" };
    out.push_str(&format!(
        "{}{missing}{kind}@{}..{}",
        "  ".repeat(depth),
        u32::from(node.start_byte()),
        u32::from(node.end_byte())
    ));
    if node.child_count() == 0 && node.is_named() && !node.is_missing() {
        if let Some(text) = node.utf8_text(source) {
            out.push_str(&format!(" {text:?}"));
        }
    }
    out.push('\n');
    for child in node.children() {
        dump_node(child, source, out, depth + 1);
    }
}

pub fn range(start: u32, end: u32) -> TextRange {
    TextRange::new(TextSize::new(start), TextSize::new(end))
}

/// Replaces `range` of `old` with `replacement`, reparses incrementally and
/// checks the result against a fresh parse of the new text.
pub fn edit_and_compare(
    language: &Arc<Language>,
    old: &str,
    range: TextRange,
    replacement: &str,
) -> (Tree, Tree, String) {
    let old_tree = parse(language, old).unwrap();
    let change = InputEdit::replace(old, range, replacement);
    let mut new_text = old.to_string();
    new_text.replace_range(usize::from(range.start())..usize::from(range.end()), replacement);

    let incremental = reparse(&edit(&old_tree, &change), new_text.as_str()).unwrap();
    let fresh = parse(language, &new_text).unwrap();
    assert_eq!(
        dump(&incremental, &new_text),
        dump(&fresh, &new_text),
        "incremental parse of {new_text:?} differs from a fresh parse"
    );
    (old_tree, incremental, new_text)
}

/// Leaves cover `source` exactly, in order.
pub fn assert_lossless(tree: &Tree, source: &str) {
    let mut end = 0u32;
    let mut text = String::new();
    for node in tree.root_node().preorder() {
        if node.child_count() == 0 {
            assert_eq!(u32::from(node.start_byte()), end, "gap before {node:?}");
            end = u32::from(node.end_byte());
            text.push_str(node.utf8_text(source).unwrap());
        }
    }
    assert_eq!(text, source);
}

pub fn kinds<'t>(node: Node<'t>) -> Vec<&'t str> {
    node.preorder()
        .filter(|node| node.is_named())
        .map(|node| node.kind())
        .collect()
}
