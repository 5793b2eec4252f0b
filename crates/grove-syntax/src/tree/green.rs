//! Immutable, reference-counted tree nodes.
//!
//! Green nodes know their length but not their position, so an unchanged
//! subtree can be shared verbatim between two revisions of a document. Besides
//! the syntax they record what the incremental parser needs to decide whether
//! a subtree can be reused: the parse state it was built in, the lex mode of
//! its first token, the token that followed it and how far past its end the
//! scanner looked.

use std::sync::Arc;

use crate::language::{Language, LexMode, StateId, Symbol};
use crate::text::Length;

/// Shared handle to a green node.
pub(crate) type Subtree = Arc<GreenNode>;

/// The token that triggered the reduction of a node, with the mode it was
/// scanned in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Follow {
    pub(crate) symbol: Symbol,
    pub(crate) mode: LexMode,
}

#[derive(Debug, Clone)]
pub(crate) struct GreenNode {
    pub(crate) symbol: Symbol,
    pub(crate) len: Length,
    pub(crate) children: Vec<Subtree>,
    pub(crate) token: bool,
    pub(crate) is_extra: bool,
    pub(crate) is_error: bool,
    pub(crate) is_missing: bool,
    pub(crate) has_error: bool,
    pub(crate) has_changes: bool,
    /// Built while several stack versions were live; never reused.
    pub(crate) fragile: bool,
    pub(crate) parse_state: StateId,
    /// Lex mode of the first token.
    pub(crate) lex_mode: LexMode,
    /// Symbol of the first token.
    pub(crate) first_leaf: Option<Symbol>,
    pub(crate) lookahead: u32,
    pub(crate) follow: Option<Follow>,
    pub(crate) error_cost: u32,
    pub(crate) dynamic_precedence: i32,
}

impl GreenNode {
    /// A scanned token.
    pub(crate) fn leaf(
        symbol: Symbol,
        len: Length,
        lookahead: u32,
        mode: LexMode,
        is_extra: bool,
    ) -> Self {
        Self {
            symbol,
            len,
            children: Vec::new(),
            token: true,
            is_extra,
            is_error: symbol == Symbol::ERROR,
            is_missing: false,
            has_error: symbol == Symbol::ERROR,
            has_changes: false,
            fragile: false,
            parse_state: StateId::START,
            lex_mode: mode,
            first_leaf: Some(symbol),
            lookahead,
            follow: None,
            error_cost: 0,
            dynamic_precedence: 0,
        }
    }

    /// A zero-width token synthesised by error recovery.
    pub(crate) fn missing(symbol: Symbol, mode: LexMode, cost: u32) -> Self {
        let mut node = Self::leaf(symbol, Length::ZERO, 0, mode, false);
        node.is_missing = true;
        node.has_error = true;
        node.error_cost = cost;
        node
    }

    /// An interior node. Hidden children are spliced in place.
    pub(crate) fn branch(
        symbol: Symbol,
        children: Vec<Subtree>,
        parse_state: StateId,
        language: &Language,
    ) -> Self {
        let mut node = Self {
            symbol,
            len: Length::ZERO,
            children: flatten(children, language),
            token: false,
            is_extra: false,
            is_error: symbol == Symbol::ERROR,
            is_missing: false,
            has_error: symbol == Symbol::ERROR,
            has_changes: false,
            fragile: false,
            parse_state,
            lex_mode: LexMode::default(),
            first_leaf: None,
            lookahead: 0,
            follow: None,
            error_cost: 0,
            dynamic_precedence: 0,
        };
        node.summarize();
        node
    }

    /// Recomputes the fields derived from the children.
    pub(crate) fn summarize(&mut self) {
        let mut len = Length::ZERO;
        let mut reach = 0u32;
        let mut has_error = self.is_error;
        let mut error_cost = 0u32;
        let mut dynamic_precedence = 0i32;
        let mut first = None;
        for child in &self.children {
            let end = u32::from(len.bytes) + u32::from(child.len.bytes);
            reach = reach.max(end.saturating_add(child.lookahead));
            len += child.len;
            has_error |= child.has_error;
            error_cost = error_cost.saturating_add(child.error_cost);
            dynamic_precedence = dynamic_precedence.saturating_add(child.dynamic_precedence);
            if first.is_none() {
                first = child.first_leaf.map(|symbol| (symbol, child.lex_mode));
            }
        }
        self.len = len;
        self.lookahead = reach.saturating_sub(u32::from(len.bytes));
        self.has_error = has_error;
        self.error_cost = error_cost;
        self.dynamic_precedence = dynamic_precedence;
        if let Some((symbol, mode)) = first {
            self.first_leaf = Some(symbol);
            self.lex_mode = mode;
        } else {
            self.first_leaf = None;
        }
    }

    /// Scanned or synthesised token, as opposed to a reduced node.
    pub(crate) fn is_leaf(&self) -> bool {
        self.token
    }

    /// Counted by reductions: not an extra, not an error.
    pub(crate) fn is_counted(&self) -> bool {
        !self.is_extra && !self.is_error
    }

    /// The first token of this subtree, descending through first children.
    pub(crate) fn first_token(self: &Arc<Self>) -> Option<Subtree> {
        let mut node = self;
        while !node.token {
            node = node.children.first()?;
        }
        Some(Arc::clone(node))
    }
}

/// Splices the children of hidden nonterminals into `children`.
///
/// A uniquely owned hidden child donates its child vector, which keeps long
/// left-recursive repetitions linear.
fn flatten(children: Vec<Subtree>, language: &Language) -> Vec<Subtree> {
    if !children
        .iter()
        .any(|child| !child.token && !child.is_error && !language.is_visible(child.symbol))
    {
        return children;
    }
    let mut out: Vec<Subtree> = Vec::with_capacity(children.len());
    for child in children {
        if child.token || child.is_error || language.is_visible(child.symbol) {
            out.push(child);
            continue;
        }
        match Arc::try_unwrap(child) {
            Ok(mut inner) => {
                if out.is_empty() {
                    out = std::mem::take(&mut inner.children);
                } else {
                    out.append(&mut inner.children);
                }
            }
            Err(shared) => out.extend(shared.children.iter().cloned()),
        }
    }
    out
}

impl Drop for GreenNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(child) = pending.pop() {
            if let Some(mut inner) = Arc::into_inner(child) {
                pending.append(&mut inner.children);
            }
        }
    }
}
