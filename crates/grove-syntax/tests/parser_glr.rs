//! Grammars with unresolved conflicts, parsed by forking stack versions.

mod common;
use common::*;

use std::sync::Arc;

use grove_syntax::language::{GrammarBuilder, LexContext, Lexeme, Scanner, Symbol};
use grove_syntax::ParserOptions;
use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum WordToken {
    #[regex(r" +")]
    Space,
    #[regex(r"[a-z]+")]
    Word,
    #[token(";")]
    Semicolon,
}

struct WordScanner {
    space: Symbol,
    word: Symbol,
    semicolon: Symbol,
}

impl Scanner for WordScanner {
    fn scan(&self, text: &str, _: &LexContext<'_>) -> Option<Lexeme> {
        let mut lexer = WordToken::lexer(text);
        let symbol = match lexer.next()?.ok()? {
            WordToken::Space => self.space,
            WordToken::Word => self.word,
            WordToken::Semicolon => self.semicolon,
        };
        Some(Lexeme::new(symbol, TextSize::new(lexer.span().end as u32), 1))
    }
}

/// `a b;` is both a declaration and a call. Without dynamic precedence the
/// first action of the conflict, the shift into the declaration, wins.
fn declarations(prefer_calls: bool) -> Arc<Language> {
    let mut g = GrammarBuilder::new("declarations");
    let space = g.extra("space", false);
    let word = g.named_token("word");
    let semicolon = g.token(";");

    let program = g.rule("program");
    let statement = g.hidden_rule("_statement");
    let declaration = g.rule("declaration");
    let call = g.rule("call");
    let call_statement = g.rule("call_statement");
    let statements = g.repeat("_statements", statement);

    g.production(program, [statements]);
    g.production(statement, [declaration]);
    g.production(statement, [call_statement]);
    g.production(declaration, [word, word, semicolon]);
    g.production(call_statement, [call, semicolon]);
    let dynamic = if prefer_calls { 1 } else { 0 };
    g.production(call, [word, word]).dynamic(dynamic);
    g.start(program);

    Arc::new(
        g.build(WordScanner {
            space,
            word,
            semicolon,
        })
        .unwrap(),
    )
}

#[test]
fn test_conflict_is_recorded_in_table() {
    assert!(declarations(false).table().conflict_count() > 0);
}

#[test]
fn test_first_action_wins_without_dynamic_precedence() {
    let mut parser = Parser::with_language(declarations(false));
    let tree = parser.parse("int x;", None).unwrap();
    assert_eq!(
        tree.root_node().to_sexp(),
        "(program (declaration (word) (word)))"
    );
    assert!(parser.stats().max_versions >= 2);
    assert!(tree.errors().is_empty());
}

#[test]
fn test_dynamic_precedence_picks_call() {
    let mut parser = Parser::with_language(declarations(true));
    let tree = parser.parse("int x;", None).unwrap();
    assert_eq!(
        tree.root_node().to_sexp(),
        "(program (call_statement (call (word) (word))))"
    );
}

#[test]
fn test_versions_merge_between_statements() {
    let source = "a b; c d; e f;";
    let mut parser = Parser::with_language(declarations(false));
    let tree = parser.parse(source, None).unwrap();
    assert_eq!(tree.root_node().named_child_count(), 3);
    assert!(parser.stats().max_versions <= parser.options().max_versions);
    assert_lossless(&tree, source);
}

#[test]
fn test_single_version_limit_still_parses() {
    let mut parser = Parser::with_language(declarations(true));
    parser.set_options(ParserOptions {
        max_versions: 1,
        ..ParserOptions::default()
    });
    let tree = parser.parse("a b;", None).unwrap();
    assert_eq!(tree.root_node().named_child_count(), 1);
    assert!(!tree.root_node().has_error());
}

#[test]
fn test_ambiguous_nodes_are_rebuilt_on_reparse() {
    let language = declarations(false);
    let source = "a b; c d; e f;";
    let (old, new, text) = edit_and_compare(
        &language,
        source,
        TextRange::new(TextSize::new(10), TextSize::new(11)),
        "x",
    );
    assert_eq!(text, "a b; c d; x f;");
    let old_first = old.root_node().named_child(0).unwrap();
    let new_first = new.root_node().named_child(0).unwrap();
    assert_eq!(old_first.kind(), new_first.kind());
    // Built while two versions were live, so it was parsed again.
    assert_ne!(old_first.id(), new_first.id());
}
