//! S-expressions.
//!
//! A document is a single list. Lists hold atoms, strings and nested lists,
//! separated by whitespace; `;` starts a comment that runs to the end of the
//! line.

use grove_syntax::language::{GrammarBuilder, GrammarError, LexContext, Lexeme, Scanner, Symbol};
use grove_syntax::Language;
use logos::Logos;
use text_size::TextSize;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,

    #[regex(r";[^\n]*", allow_greedy = true)]
    Comment,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[regex(r#""([^"\\]|\\.)*""#)]
    String,

    #[regex(r#"[^ \t\r\n\f();"]+"#)]
    Atom,
}

struct SexpScanner {
    whitespace: Symbol,
    comment: Symbol,
    lparen: Symbol,
    rparen: Symbol,
    string: Symbol,
    atom: Symbol,
}

impl Scanner for SexpScanner {
    fn scan(&self, text: &str, _: &LexContext<'_>) -> Option<Lexeme> {
        let mut lexer = TokenKind::lexer(text);
        let kind = lexer.next()?.ok()?;
        let span = lexer.span();
        if span.start != 0 {
            return None;
        }
        // Delimited tokens end on their own closing byte; the rest stop at
        // the first byte they reject.
        let (symbol, lookahead) = match kind {
            TokenKind::Whitespace => (self.whitespace, 1),
            TokenKind::Comment => (self.comment, 1),
            TokenKind::LParen => (self.lparen, 0),
            TokenKind::RParen => (self.rparen, 0),
            TokenKind::String => (self.string, 0),
            TokenKind::Atom => (self.atom, 1),
        };
        let len = TextSize::try_from(span.end).ok()?;
        Some(Lexeme::new(symbol, len, lookahead))
    }
}

/// Builds the S-expression language.
///
/// # Errors
///
/// Never in practice; the grammar is fixed.
pub fn grammar() -> Result<Language, GrammarError> {
    let mut g = GrammarBuilder::new("sexp");
    let whitespace = g.extra("whitespace", false);
    let comment = g.extra("comment", true);
    let lparen = g.token("(");
    let rparen = g.token(")");
    let string = g.named_token("string");
    let atom = g.named_token("atom");

    let list = g.rule("list");
    let item = g.hidden_rule("_item");
    let items = g.repeat("_items", item);

    g.production(list, [lparen, items, rparen]);
    g.production(item, [atom]);
    g.production(item, [string]);
    g.production(item, [list]);
    g.start(list);

    g.build(SexpScanner {
        whitespace,
        comment,
        lparen,
        rparen,
        string,
        atom,
    })
}
