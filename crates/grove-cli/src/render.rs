//! Text renderings of syntax trees.

use std::fmt::Write;

use grove_syntax::{Node, Tree};

use crate::cli::Format;

pub fn render(tree: &Tree, source: &str, format: Format) -> String {
    match format {
        Format::Sexp => tree.root_node().to_sexp(),
        Format::Tree => outline(tree, source),
    }
}

/// One line per node: kind, byte range and start position, with the text of
/// named leaves. Anonymous extras such as whitespace are left out.
pub fn outline(tree: &Tree, source: &str) -> String {
    let mut out = String::new();
    write_node(&mut out, tree.root_node(), source, 0);
    out
}

fn write_node(out: &mut String, node: Node<'_>, source: &str, depth: usize) {
    if node.is_extra() && !node.is_named() {
        return;
    }
    let indent = "  ".repeat(depth);
    let missing = if node.is_missing() { "MISSING " } else { "" };
    let kind = if node.is_named() {
        node.kind().to_string()
    } else {
        format!("{:?}", node.kind())
    };
    let range = node.byte_range();
    let _ = write!(
        out,
        "{indent}{missing}{kind} {}..{} [{}]",
        u32::from(range.start()),
        u32::from(range.end()),
        node.start_position()
    );
    if node.is_named() && node.child_count() == 0 && !node.is_missing() {
        if let Some(text) = node.utf8_text(source) {
            let _ = write!(out, " {text:?}");
        }
    }
    out.push('\n');
    for child in node.children() {
        write_node(out, child, source, depth + 1);
    }
}
