//! `grove-syntax` - Incremental, error-tolerant GLR parsing with persistent
//! concrete syntax trees.
//!
//! The crate is language-agnostic. A [`Language`] bundles a parse table built
//! by [`GrammarBuilder`](language::GrammarBuilder) with a [`Scanner`] that
//! turns text into tokens. On top of that:
//!
//! - **Parser**: a GLR driver that forks on conflicts and merges equivalent
//!   stacks
//! - **Syntax Tree**: immutable nodes shared between revisions of a document
//! - **Incremental reparsing**: subtrees whose text and context are unchanged
//!   are reused rather than rebuilt
//! - **Error recovery**: malformed input ends up in `ERROR` and `MISSING`
//!   nodes, and a tree is always produced
//!
//! # Design Principles
//!
//! - **Lossless**: every byte of input, extras included, belongs to a leaf
//! - **Deterministic**: reparsing an edited tree yields the same tree as
//!   parsing the new text from scratch
//! - **Cheap snapshots**: trees are reference counted and never mutated, so
//!   old revisions stay valid for readers on other threads
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use grove_syntax::language::{GrammarBuilder, LexContext, Lexeme, Scanner, Symbol};
//! use grove_syntax::{edit, parse, reparse, InputEdit};
//! use text_size::TextSize;
//!
//! struct Words {
//!     word: Symbol,
//!     space: Symbol,
//! }
//!
//! impl Scanner for Words {
//!     fn scan(&self, text: &str, _: &LexContext<'_>) -> Option<Lexeme> {
//!         let spaces = text.bytes().take_while(|b| *b == b' ').count();
//!         if spaces > 0 {
//!             return Some(Lexeme::new(self.space, TextSize::new(spaces as u32), 1));
//!         }
//!         let len = text.bytes().take_while(u8::is_ascii_alphabetic).count();
//!         (len > 0).then(|| Lexeme::new(self.word, TextSize::new(len as u32), 1))
//!     }
//! }
//!
//! let mut grammar = GrammarBuilder::new("words");
//! let word = grammar.named_token("word");
//! let space = grammar.extra("space", false);
//! let words = grammar.repeat("_words", word);
//! let doc = grammar.rule("doc");
//! grammar.production(doc, [words]);
//! grammar.start(doc);
//! let language = Arc::new(grammar.build(Words { word, space }).unwrap());
//!
//! let tree = parse(&language, "hello world").unwrap();
//! assert_eq!(tree.root_node().to_sexp(), "(doc (word) (word))");
//!
//! let change = InputEdit::insert("hello world", TextSize::new(11), " again");
//! let edited = edit(&tree, &change);
//! let tree = reparse(&edited, "hello world again").unwrap();
//! assert_eq!(tree.root_node().named_child_count(), 3);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod language;
pub mod parser;
pub mod text;
pub mod tree;

use std::sync::Arc;

pub use error::{ParseError, PartialTree};
pub use language::{Language, LexContext, Lexeme, Scanner, Symbol};
pub use parser::{CancellationFlag, ParseStats, Parser, ParserOptions};
pub use text::{Input, Length, Point};
pub use tree::{InputEdit, Node, SyntaxError, SyntaxErrorKind, Tree, TreeCursor};

/// Parses `text` from scratch.
///
/// # Errors
///
/// See [`Parser::parse`].
pub fn parse(language: &Arc<Language>, text: &str) -> Result<Tree, ParseError> {
    Parser::with_language(Arc::clone(language)).parse(text, None)
}

/// Returns `tree` adjusted for `change`; see [`Tree::edit`].
#[must_use]
pub fn edit(tree: &Tree, change: &InputEdit) -> Tree {
    tree.edit(change)
}

/// Parses the text behind an edited tree, reusing what the edits left intact.
///
/// # Errors
///
/// See [`Parser::parse`].
pub fn reparse(edited: &Tree, input: impl Input) -> Result<Tree, ParseError> {
    Parser::new().reparse(edited, input)
}
