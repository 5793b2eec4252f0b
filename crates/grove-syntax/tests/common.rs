//! Shared fixture grammar and helpers for parser tests.
#![allow(dead_code, unused_imports)]

use std::sync::Arc;

use grove_syntax::language::{GrammarBuilder, LexContext, Lexeme, Scanner, Symbol};
pub use grove_syntax::{edit, parse, reparse, InputEdit, Language, Node, Parser, Tree};
use logos::Logos;
pub use text_size::{TextRange, TextSize};

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum CalcToken {
    #[regex(r"[ \t\r\n]+")]
    Whitespace,
    #[regex(r"#[^\n]*", allow_greedy = true)]
    Comment,
    #[regex(r"[0-9]+")]
    Number,
    #[regex(r"[a-z_][a-z0-9_]*")]
    Identifier,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("=")]
    Eq,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(";")]
    Semicolon,
}

struct CalcScanner {
    symbols: Vec<(CalcToken, Symbol)>,
}

impl Scanner for CalcScanner {
    fn scan(&self, text: &str, _: &LexContext<'_>) -> Option<Lexeme> {
        let mut lexer = CalcToken::lexer(text);
        let kind = lexer.next()?.ok()?;
        let span = lexer.span();
        if span.start != 0 {
            return None;
        }
        let symbol = self
            .symbols
            .iter()
            .find(|(token, _)| *token == kind)
            .map(|(_, symbol)| *symbol)?;
        Some(Lexeme::new(symbol, TextSize::new(span.end as u32), 1))
    }
}

/// A small statement language: assignments and expression statements over
/// `+ - *` with the usual precedence, plus `#` comments.
pub fn calc() -> Arc<Language> {
    let mut g = GrammarBuilder::new("calc");
    let whitespace = g.extra("whitespace", false);
    let comment = g.extra("comment", true);
    let number = g.named_token("number");
    let identifier = g.named_token("identifier");
    let plus = g.token("+");
    let minus = g.token("-");
    let star = g.token("*");
    let eq = g.token("=");
    let lparen = g.token("(");
    let rparen = g.token(")");
    let semicolon = g.token(";");

    let program = g.rule("program");
    let statement = g.hidden_rule("_statement");
    let assignment = g.rule("assignment");
    let expression_statement = g.rule("expression_statement");
    let expression = g.hidden_rule("_expression");
    let binary = g.rule("binary_expression");
    let parenthesized = g.rule("parenthesized_expression");
    let statements = g.repeat("_statements", statement);

    g.production(program, [statements]);
    g.production(statement, [assignment]);
    g.production(statement, [expression_statement]);
    g.production(assignment, [identifier, eq, expression, semicolon]);
    g.production(expression_statement, [expression, semicolon]);
    g.production(expression, [binary]);
    g.production(expression, [parenthesized]);
    g.production(expression, [number]);
    g.production(expression, [identifier]);
    g.production(binary, [expression, plus, expression]).prec_left(1);
    g.production(binary, [expression, minus, expression]).prec_left(1);
    g.production(binary, [expression, star, expression]).prec_left(2);
    g.production(parenthesized, [lparen, expression, rparen]);
    g.start(program);

    let scanner = CalcScanner {
        symbols: vec![
            (CalcToken::Whitespace, whitespace),
            (CalcToken::Comment, comment),
            (CalcToken::Number, number),
            (CalcToken::Identifier, identifier),
            (CalcToken::Plus, plus),
            (CalcToken::Minus, minus),
            (CalcToken::Star, star),
            (CalcToken::Eq, eq),
            (CalcToken::LParen, lparen),
            (CalcToken::RParen, rparen),
            (CalcToken::Semicolon, semicolon),
        ],
    };
    Arc::new(g.build(scanner).unwrap())
}

/// Formats a tree for snapshot testing. Anonymous extras are left out.
pub fn debug_tree(tree: &Tree, source: &str) -> String {
    let mut output = String::new();
    format_node(tree.root_node(), source, &mut output, 0);

    let errors = tree.errors();
    if !errors.is_empty() {
        output.push_str("---\nErrors:\n");
        for err in errors {
            output.push_str(&format!("  - {}\n", err));
        }
    }
    output
}

fn format_node(node: Node<'_>, source: &str, out: &mut String, depth: usize) {
    if node.is_extra() && !node.is_named() {
        return;
    }
    let indent = "  ".repeat(depth);
    let kind = if node.is_named() {
        node.kind().to_string()
    } else {
        format!("{:?}", node.kind())
    };
    let missing = if node.is_missing() { "MISSING " } else { "" };
    out.push_str(&format!(
        "{}{}{}@{}..{}",
        indent,
        missing,
        kind,
        u32::from(node.start_byte()),
        u32::from(node.end_byte())
    ));
    if node.child_count() == 0 && node.is_named() && !node.is_missing() {
        if let Some(text) = node.utf8_text(source) {
            out.push_str(&format!(" {:?}", text));
        }
    }
    out.push('\n');
    for child in node.children() {
        format_node(child, source, out, depth + 1);
    }
}

/// Applies `replacement` at `range` of `old` to both the text and the tree,
/// reparses, and checks the result against a fresh parse.
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

    let edited = edit(&old_tree, &change);
    let incremental = reparse(&edited, new_text.as_str()).unwrap();
    let fresh = parse(language, &new_text).unwrap();
    assert_eq!(
        debug_tree(&incremental, &new_text),
        debug_tree(&fresh, &new_text),
        "incremental parse of {new_text:?} differs from a fresh parse"
    );
    (old_tree, incremental, new_text)
}

/// Every byte of `source` is covered by exactly one leaf, in order.
pub fn assert_lossless(tree: &Tree, source: &str) {
    let mut text = String::new();
    let mut end = 0u32;
    for node in tree.root_node().preorder() {
        if node.child_count() == 0 {
            assert_eq!(u32::from(node.start_byte()), end, "gap before {node:?}");
            end = u32::from(node.end_byte());
            text.push_str(node.utf8_text(source).unwrap());
        }
    }
    assert_eq!(text, source);
}
