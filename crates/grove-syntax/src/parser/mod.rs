//! The incremental GLR parser.
//!
//! [`Parser`] turns text into a [`Tree`] for one [`Language`]. Given an edited
//! old tree it reuses every subtree whose text and context are unchanged, and
//! the result is the same tree a fresh parse of the new text would produce.
//!
//! ```
//! use std::sync::Arc;
//!
//! use grove_syntax::language::{GrammarBuilder, LexContext, Lexeme, Scanner, Symbol};
//! use grove_syntax::parser::Parser;
//! use text_size::TextSize;
//!
//! struct Letters(Symbol);
//!
//! impl Scanner for Letters {
//!     fn scan(&self, text: &str, _: &LexContext<'_>) -> Option<Lexeme> {
//!         let len = text.bytes().take_while(u8::is_ascii_lowercase).count();
//!         (len > 0).then(|| Lexeme::new(self.0, TextSize::new(len as u32), 1))
//!     }
//! }
//!
//! let mut grammar = GrammarBuilder::new("letters");
//! let word = grammar.named_token("word");
//! let doc = grammar.rule("doc");
//! grammar.production(doc, [word]);
//! grammar.start(doc);
//! let language = Arc::new(grammar.build(Letters(word)).unwrap());
//!
//! let mut parser = Parser::with_language(language);
//! let tree = parser.parse("abc", None).unwrap();
//! assert_eq!(tree.root_node().to_sexp(), "(doc (word))");
//! ```

mod builder;
mod driver;
mod recovery;
mod reuse;
mod stack;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::ParseError;
use crate::language::Language;
use crate::text::{Input, Text};
use crate::tree::Tree;

use driver::Driver;

/// Shared flag for stopping a parse from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// A lowered flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks every parse holding this flag to stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Lowers the flag again.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Whether [`cancel`](Self::cancel) was called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Limits and switches for a parse.
#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// Stack versions kept alive at once.
    pub max_versions: usize,
    /// Tokens error recovery may delete before trying other repairs.
    pub max_skipped_tokens: usize,
    /// Missing tokens error recovery may insert at the end of input.
    pub max_insertions: usize,
    /// Wall-clock budget.
    pub timeout: Option<Duration>,
    /// Checked together with the timeout.
    pub cancellation: Option<CancellationFlag>,
    /// Parse steps between cancellation checks.
    pub check_interval: usize,
    /// Reuse subtrees of the old tree. Disabling this makes incremental
    /// parses behave like fresh ones.
    pub reuse: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_versions: 6,
            max_skipped_tokens: 3,
            max_insertions: 4,
            timeout: None,
            cancellation: None,
            check_interval: 64,
            reuse: true,
        }
    }
}

/// Counters from the last successful parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Tokens produced by the scanner.
    pub tokens_lexed: usize,
    /// Tokens taken from the old tree.
    pub reused_leaves: usize,
    /// Nodes taken whole from the old tree.
    pub reused_subtrees: usize,
    /// Bytes covered by reused nodes.
    pub reused_bytes: u64,
    /// Most stack versions alive at once.
    pub max_versions: usize,
    /// Times error recovery ran.
    pub recoveries: usize,
}

/// A reusable parser.
#[derive(Debug, Default)]
pub struct Parser {
    language: Option<Arc<Language>>,
    options: ParserOptions,
    stats: ParseStats,
}

impl Parser {
    /// A parser with no language; set one before parsing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A parser for `language`.
    #[must_use]
    pub fn with_language(language: Arc<Language>) -> Self {
        Self {
            language: Some(language),
            ..Self::default()
        }
    }

    /// Replaces the language used by later parses.
    pub fn set_language(&mut self, language: Arc<Language>) {
        self.language = Some(language);
    }

    /// The current language.
    #[must_use]
    pub fn language(&self) -> Option<&Arc<Language>> {
        self.language.as_ref()
    }

    /// Replaces the limits used by later parses.
    pub fn set_options(&mut self, options: ParserOptions) {
        self.options = options;
    }

    /// The current limits.
    #[must_use]
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Counters from the last successful parse.
    #[must_use]
    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    /// Parses `text`. If `old_tree` is given it must already reflect the
    /// edits that turned its text into `text`.
    ///
    /// # Errors
    ///
    /// [`ParseError::NoLanguage`] without a language,
    /// [`ParseError::Cancelled`] when cancelled, and the internal errors if a
    /// language's table is inconsistent. Syntax errors are reported in the
    /// tree instead.
    pub fn parse(&mut self, text: &str, old_tree: Option<&Tree>) -> Result<Tree, ParseError> {
        self.parse_text(&Text::new(text), old_tree)
    }

    /// Like [`parse`](Self::parse), reading the text from `input`.
    ///
    /// # Errors
    ///
    /// As for [`parse`](Self::parse).
    pub fn parse_input<I: Input>(
        &mut self,
        mut input: I,
        old_tree: Option<&Tree>,
    ) -> Result<Tree, ParseError> {
        let text = Text::read(&mut input);
        self.parse_text(&text, old_tree)
    }

    /// Reparses after edits, using the language of `edited`.
    ///
    /// # Errors
    ///
    /// As for [`parse`](Self::parse).
    pub fn reparse<I: Input>(&mut self, edited: &Tree, input: I) -> Result<Tree, ParseError> {
        self.language = Some(Arc::clone(edited.language()));
        self.parse_input(input, Some(edited))
    }

    fn parse_text(&mut self, text: &Text, old_tree: Option<&Tree>) -> Result<Tree, ParseError> {
        let language = self.language.clone().ok_or(ParseError::NoLanguage)?;
        let old_root = old_tree.and_then(|tree| {
            if !Arc::ptr_eq(tree.language(), &language) {
                warn!(
                    old = tree.language().name(),
                    new = language.name(),
                    "old tree has a different language, parsing from scratch"
                );
                return None;
            }
            if tree.len() != text.len() {
                warn!(
                    tree = u32::from(tree.len()),
                    text = u32::from(text.len()),
                    "old tree does not match the text, was it edited? parsing from scratch"
                );
                return None;
            }
            Some(Arc::clone(tree.root()))
        });

        let _span = tracing::debug_span!(
            "parse",
            language = language.name(),
            len = u32::from(text.len()),
            incremental = old_root.is_some()
        )
        .entered();

        let driver = Driver::new(&language, text, &self.options, old_root);
        let (root, stats) = driver.run()?;
        self.stats = stats;
        debug!(
            tokens = stats.tokens_lexed,
            reused_subtrees = stats.reused_subtrees,
            reused_bytes = stats.reused_bytes,
            versions = stats.max_versions,
            recoveries = stats.recoveries,
            "parse finished"
        );
        Ok(Tree::new(root, language))
    }
}
