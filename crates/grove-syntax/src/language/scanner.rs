//! The scanner interface grammars implement.

use text_size::TextSize;

use super::{LexMode, Symbol, SymbolSet};

/// A grammar's tokenizer.
///
/// The parser calls [`Scanner::scan`] with the text remaining at the current
/// position and a [`LexContext`] describing which contextual tokens the parse
/// table accepts there. The end of input is handled by the parser and never
/// reaches the scanner.
pub trait Scanner: Send + Sync {
    /// Classifies the token at the start of `text`.
    ///
    /// Returns `None` when no token matches. The parser then emits a one-byte
    /// error token and continues after it.
    fn scan(&self, text: &str, context: &LexContext<'_>) -> Option<Lexeme>;
}

/// A scanned token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lexeme {
    /// The token's terminal symbol.
    pub symbol: Symbol,
    /// Length in bytes. Must be positive.
    pub len: TextSize,
    /// How many bytes past the token end the scanner examined to decide on it.
    ///
    /// An edit within this many bytes after a token may change how the token
    /// is classified, so such tokens are never reused across that edit.
    pub lookahead: u32,
}

impl Lexeme {
    /// Creates a lexeme.
    #[must_use]
    pub fn new(symbol: Symbol, len: TextSize, lookahead: u32) -> Self {
        Self {
            symbol,
            len,
            lookahead,
        }
    }
}

/// Parser-provided context for one scan.
#[derive(Debug, Clone, Copy)]
pub struct LexContext<'a> {
    mode: LexMode,
    contextual: Option<&'a SymbolSet>,
}

impl<'a> LexContext<'a> {
    pub(crate) fn new(mode: LexMode, contextual: Option<&'a SymbolSet>) -> Self {
        Self { mode, contextual }
    }

    /// The lex mode of the current parse state.
    #[must_use]
    pub fn mode(&self) -> LexMode {
        self.mode
    }

    /// Returns true when contextual token `symbol` is expected here.
    ///
    /// Non-contextual tokens are always allowed; scanners only need to ask
    /// about the tokens they declared contextual.
    #[must_use]
    pub fn allows(&self, symbol: Symbol) -> bool {
        self.contextual.is_some_and(|set| set.contains(symbol))
    }
}
