mod common;
use common::*;

use std::sync::Arc;

use grove_syntax::language::{GrammarBuilder, LexContext, Lexeme, Scanner, Symbol};
use grove_syntax::SyntaxErrorKind;
use logos::Logos;

// Error Recovery
#[test]
fn test_missing_semicolon_at_end() {
    let source = "x = 1";
    let tree = parse(&calc(), source).unwrap();
    assert_eq!(
        tree.root_node().to_sexp(),
        "(program (assignment (identifier) (number) (MISSING \";\")))"
    );
    let errors = tree.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, SyntaxErrorKind::Missing(";".into()));
    assert_eq!(errors[0].range, TextRange::empty(TextSize::new(5)));
    assert_eq!(errors[0].to_string(), "0:5: missing `;` at 5");
}

#[test]
fn test_unexpected_token_is_skipped() {
    let source = "x = 1 ) ;";
    let tree = parse(&calc(), source).unwrap();
    assert_eq!(
        tree.root_node().to_sexp(),
        "(program (assignment (identifier) (number) (ERROR)))"
    );
    let errors = tree.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, SyntaxErrorKind::Unexpected);
    assert_eq!(
        errors[0].range,
        TextRange::new(TextSize::new(6), TextSize::new(7))
    );
    assert_lossless(&tree, source);
}

#[test]
fn test_unrecognised_bytes_become_error_tokens() {
    let source = "x = @;";
    let tree = parse(&calc(), source).unwrap();
    assert!(tree.root_node().has_error());
    let error = tree
        .root_node()
        .preorder()
        .find(|node| node.is_error() && node.utf8_text(source) == Some("@"))
        .expect("error token for `@`");
    assert_eq!(error.child_count(), 0);
    assert!(!tree.errors().is_empty());
    assert_lossless(&tree, source);
}

#[test]
fn test_garbage_only_input() {
    let source = "@@@";
    let tree = parse(&calc(), source).unwrap();
    let root = tree.root_node();
    assert_eq!(root.kind(), "program");
    assert_eq!(root.end_byte(), TextSize::new(3));
    assert_eq!(root.named_child(0).unwrap().kind(), "ERROR");
    assert_lossless(&tree, source);
}

#[test]
fn test_unclosed_parenthesis_is_closed_at_end() {
    let source = "y = (1 + 2";
    let tree = parse(&calc(), source).unwrap();
    assert_eq!(
        tree.root_node().to_sexp(),
        "(program (assignment (identifier) (parenthesized_expression (binary_expression (number) (number)) (MISSING \")\")) (MISSING \";\")))"
    );
}

#[test]
fn test_statement_after_error_is_intact() {
    let source = "a = = 1;\nb = 2;\n";
    let tree = parse(&calc(), source).unwrap();
    let root = tree.root_node();
    assert!(root.has_error());
    let last = root
        .named_children()
        .filter(|node| !node.is_extra())
        .last()
        .unwrap();
    assert_eq!(last.kind(), "assignment");
    assert_eq!(last.utf8_text(source), Some("b = 2;"));
    assert!(!last.has_error());
    assert_lossless(&tree, source);
}

#[test]
fn test_errors_are_reported_in_document_order() {
    let source = "a = 1\nb = ) 2;\n";
    let tree = parse(&calc(), source).unwrap();
    let errors = tree.errors();
    assert!(errors.len() >= 2, "{errors:?}");
    assert!(errors
        .windows(2)
        .all(|pair| pair[0].range.start() <= pair[1].range.start()));
    assert_lossless(&tree, source);
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum TerminatorToken {
    #[regex(r" +")]
    Space,
    #[regex(r"[a-z]+")]
    Word,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,
}

struct TerminatorScanner {
    symbols: Vec<(TerminatorToken, Symbol)>,
}

impl Scanner for TerminatorScanner {
    fn scan(&self, text: &str, _: &LexContext<'_>) -> Option<Lexeme> {
        let mut lexer = TerminatorToken::lexer(text);
        let kind = lexer.next()?.ok()?;
        let symbol = self
            .symbols
            .iter()
            .find(|(token, _)| *token == kind)
            .map(|(_, symbol)| *symbol)?;
        Some(Lexeme::new(symbol, TextSize::new(lexer.span().end as u32), 1))
    }
}

/// Statements are a word closed by either `;` or `.`. The terminators are
/// declared in the order given, with the given insertion costs.
fn terminators(declared: [(TerminatorToken, &str, u32); 2]) -> Arc<Language> {
    let mut g = GrammarBuilder::new("terminators");
    let space = g.extra("space", false);
    let word = g.named_token("word");
    let mut symbols = vec![(TerminatorToken::Space, space), (TerminatorToken::Word, word)];
    for (token, text, cost) in declared {
        let symbol = g.token(text);
        g.missing_cost(symbol, cost);
        symbols.push((token, symbol));
    }

    let program = g.rule("program");
    let statement = g.rule("statement");
    let statements = g.repeat("_statements", statement);
    g.production(program, [statements]);
    for &(_, terminator) in &symbols[2..] {
        g.production(statement, [word, terminator]);
    }
    g.start(program);
    Arc::new(g.build(TerminatorScanner { symbols }).unwrap())
}

#[test]
fn test_cheapest_missing_token_is_inserted() {
    let language = terminators([
        (TerminatorToken::Semicolon, ";", 3),
        (TerminatorToken::Dot, ".", 1),
    ]);
    let tree = parse(&language, "a b").unwrap();
    assert_eq!(
        tree.root_node().to_sexp(),
        "(program (statement (word) (MISSING \".\")) (statement (word) (MISSING \".\")))"
    );
    let errors = tree.errors();
    assert_eq!(errors.len(), 2);
    assert!(errors
        .iter()
        .all(|error| error.kind == SyntaxErrorKind::Missing(".".into())));
}

#[test]
fn test_equal_costs_insert_the_earlier_declared_token() {
    let semicolon_first = terminators([
        (TerminatorToken::Semicolon, ";", 1),
        (TerminatorToken::Dot, ".", 1),
    ]);
    let tree = parse(&semicolon_first, "a b").unwrap();
    assert_eq!(
        tree.root_node().to_sexp(),
        "(program (statement (word) (MISSING \";\")) (statement (word) (MISSING \";\")))"
    );

    let dot_first = terminators([
        (TerminatorToken::Dot, ".", 1),
        (TerminatorToken::Semicolon, ";", 1),
    ]);
    let tree = parse(&dot_first, "a b").unwrap();
    assert_eq!(
        tree.root_node().to_sexp(),
        "(program (statement (word) (MISSING \".\")) (statement (word) (MISSING \".\")))"
    );
}
