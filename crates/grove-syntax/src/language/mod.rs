//! Languages: symbol tables, parse tables and scanners.
//!
//! A [`Language`] is the immutable, shareable resource a grammar hands to the
//! parser. It bundles three things:
//!
//! - **Symbols**: names and display flags for every terminal and nonterminal
//! - **Parse table**: the LR automaton, with one action list per state and lookahead
//! - **Scanner**: the grammar's tokenizer, consulted with a lex mode per state
//!
//! Tables are produced by [`GrammarBuilder`] and shared behind an `Arc` by
//! every parse of that language.

mod builder;
mod scanner;
mod set;

pub use builder::{Assoc, GrammarBuilder, GrammarError, ProductionBuilder};
pub use scanner::{LexContext, Lexeme, Scanner};
pub use set::SymbolSet;

use std::fmt;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

/// A grammar symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u16);

impl Symbol {
    /// The end-of-input terminal. Every language declares it first.
    pub const END: Symbol = Symbol(0);
    /// The symbol of error nodes and unrecognised bytes.
    pub const ERROR: Symbol = Symbol(u16::MAX);

    /// Creates a symbol from its raw id.
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// The raw id.
    #[must_use]
    pub const fn id(self) -> u16 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        usize::from(self.0)
    }
}

/// A state of the parse automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StateId(u16);

impl StateId {
    /// The initial state.
    pub const START: StateId = StateId(0);

    pub(crate) fn new(id: u16) -> Self {
        Self(id)
    }

    pub(crate) fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies the set of tokens a scanner may produce in some parse states.
///
/// States that accept the same contextual tokens share a lex mode, so a token
/// scanned in one of them is valid in all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LexMode(u16);

impl LexMode {
    pub(crate) fn new(id: u16) -> Self {
        Self(id)
    }

    /// The raw id.
    #[must_use]
    pub fn id(self) -> u16 {
        self.0
    }
}

/// Index of a production in the parse table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProductionId(u16);

impl ProductionId {
    pub(crate) fn new(id: u16) -> Self {
        Self(id)
    }

    pub(crate) fn index(self) -> usize {
        usize::from(self.0)
    }
}

/// A parse action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Consume the lookahead and enter the given state.
    Shift(StateId),
    /// Pop the production's children and push the production's symbol.
    Reduce(ProductionId),
    /// The start symbol is complete and the input is exhausted.
    Accept,
}

/// What the driver needs to know about a production at reduce time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Production {
    /// Left-hand side.
    pub lhs: Symbol,
    /// Number of right-hand side symbols.
    pub len: u16,
    /// Dynamic precedence added to nodes built by this production.
    pub dynamic_precedence: i16,
}

/// Display and behaviour flags of a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolMetadata {
    /// Kind name reported by nodes of this symbol.
    pub name: SmolStr,
    /// Tokens are terminals; everything else is built by reductions.
    pub terminal: bool,
    /// Named nodes appear in S-expressions; anonymous ones are literal tokens.
    pub named: bool,
    /// Hidden nonterminals are flattened into their parent.
    pub visible: bool,
    /// Extras may appear anywhere between tokens.
    pub extra: bool,
    /// Tokens that are only produced where the parse table expects them.
    pub contextual: bool,
    /// Relative cost of inserting this token during error recovery.
    pub missing_cost: u32,
}

/// An LR parse table.
#[derive(Debug)]
pub struct ParseTable {
    actions: Vec<FxHashMap<Symbol, Box<[Action]>>>,
    gotos: Vec<FxHashMap<Symbol, StateId>>,
    lex_modes: Vec<LexMode>,
    mode_tokens: Vec<SymbolSet>,
    productions: Vec<Production>,
}

impl ParseTable {
    /// Actions for `symbol` in `state`. Empty when the symbol is unexpected.
    #[must_use]
    pub fn actions(&self, state: StateId, symbol: Symbol) -> &[Action] {
        match self
            .actions
            .get(state.index())
            .and_then(|row| row.get(&symbol))
        {
            Some(actions) => &actions[..],
            None => &[],
        }
    }

    /// Returns true when `symbol` has any action in `state`.
    #[must_use]
    pub fn expects(&self, state: StateId, symbol: Symbol) -> bool {
        !self.actions(state, symbol).is_empty()
    }

    /// The state entered after reducing to `symbol` on top of `state`.
    #[must_use]
    pub fn goto(&self, state: StateId, symbol: Symbol) -> Option<StateId> {
        self.gotos.get(state.index())?.get(&symbol).copied()
    }

    /// The lex mode used to scan the token that follows `state`.
    #[must_use]
    pub fn lex_mode(&self, state: StateId) -> LexMode {
        self.lex_modes.get(state.index()).copied().unwrap_or_default()
    }

    /// The contextual tokens that may be produced in `mode`.
    #[must_use]
    pub fn mode_tokens(&self, mode: LexMode) -> Option<&SymbolSet> {
        self.mode_tokens.get(usize::from(mode.0))
    }

    /// Looks up a production.
    #[must_use]
    pub fn production(&self, id: ProductionId) -> Option<&Production> {
        self.productions.get(id.index())
    }

    /// Number of states.
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.actions.len()
    }

    /// Number of distinct lex modes.
    #[must_use]
    pub fn lex_mode_count(&self) -> usize {
        self.mode_tokens.len()
    }

    /// Number of (state, lookahead) cells holding more than one action.
    #[must_use]
    pub fn conflict_count(&self) -> usize {
        self.actions
            .iter()
            .flat_map(FxHashMap::values)
            .filter(|actions| actions.len() > 1)
            .count()
    }
}

/// A grammar's complete, immutable parsing resource.
pub struct Language {
    name: SmolStr,
    symbols: Vec<SymbolMetadata>,
    error: SymbolMetadata,
    start: Symbol,
    table: ParseTable,
    scanner: Box<dyn Scanner>,
}

impl Language {
    /// The language name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The start symbol.
    #[must_use]
    pub fn start_symbol(&self) -> Symbol {
        self.start
    }

    /// The parse table.
    #[must_use]
    pub fn table(&self) -> &ParseTable {
        &self.table
    }

    /// The scanner.
    #[must_use]
    pub fn scanner(&self) -> &dyn Scanner {
        self.scanner.as_ref()
    }

    /// Number of declared symbols, including [`Symbol::END`].
    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Metadata for `symbol`.
    #[must_use]
    pub fn metadata(&self, symbol: Symbol) -> &SymbolMetadata {
        if symbol == Symbol::ERROR {
            return &self.error;
        }
        self.symbols.get(symbol.index()).unwrap_or(&self.error)
    }

    /// The kind name of `symbol`.
    #[must_use]
    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        &self.metadata(symbol).name
    }

    /// The first symbol called `name`. Aliased tokens share a name; this
    /// returns the one declared first.
    #[must_use]
    pub fn symbol_for_name(&self, name: &str) -> Option<Symbol> {
        if name == "ERROR" {
            return Some(Symbol::ERROR);
        }
        self.symbols
            .iter()
            .position(|meta| meta.name == name)
            .and_then(|index| u16::try_from(index).ok())
            .map(Symbol::new)
    }

    /// Returns true for named symbols.
    #[must_use]
    pub fn is_named(&self, symbol: Symbol) -> bool {
        self.metadata(symbol).named
    }

    /// Returns true for extras.
    #[must_use]
    pub fn is_extra(&self, symbol: Symbol) -> bool {
        self.metadata(symbol).extra
    }

    /// Returns true for terminals.
    #[must_use]
    pub fn is_terminal(&self, symbol: Symbol) -> bool {
        self.metadata(symbol).terminal
    }

    /// Returns true unless `symbol` is a hidden nonterminal.
    #[must_use]
    pub fn is_visible(&self, symbol: Symbol) -> bool {
        self.metadata(symbol).visible
    }

    /// Error-recovery cost of inserting `symbol`.
    #[must_use]
    pub fn missing_cost(&self, symbol: Symbol) -> u32 {
        self.metadata(symbol).missing_cost
    }

    /// Terminals that may be synthesised by error recovery, in declaration order.
    pub fn insertable_terminals(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.symbols
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, meta)| meta.terminal && !meta.extra)
            .filter_map(|(index, _)| u16::try_from(index).ok().map(Symbol::new))
    }
}

impl fmt::Debug for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Language")
            .field("name", &self.name)
            .field("symbols", &self.symbols.len())
            .field("states", &self.table.state_count())
            .finish_non_exhaustive()
    }
}
