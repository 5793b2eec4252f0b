//! Error types for parsing.
//!
//! Malformed input is never an error: it is recorded in the tree as error and
//! missing nodes. The variants here are either cancellations or violations of
//! the parser's own invariants.

use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;
use text_size::TextSize;
use thiserror::Error;

use crate::language::{Language, StateId};
use crate::text::Length;
use crate::tree::green::Subtree;
use crate::tree::{Anchor, Node};

/// Why a parse did not produce a tree.
#[derive(Debug, Error)]
pub enum ParseError {
    /// No language was set on the parser.
    #[error("parser has no language")]
    NoLanguage,
    /// The stack did not reduce to a single root at the end of input.
    #[error("parse finished with {remaining} unreduced nodes on the stack")]
    IncompleteParse {
        /// Number of counted nodes left on the stack.
        remaining: usize,
    },
    /// A reduction led to a state with no goto entry.
    #[error("parse table has no goto from state {state} on `{symbol}`")]
    MissingGoto {
        /// State below the reduced node.
        state: StateId,
        /// Symbol of the reduced node.
        symbol: SmolStr,
    },
    /// A reduction needed more nodes than the stack holds.
    #[error("stack underflow while reducing `{symbol}`")]
    StackUnderflow {
        /// Symbol of the production being reduced.
        symbol: SmolStr,
    },
    /// The cancellation flag was raised or the timeout elapsed.
    #[error("parse cancelled after {} bytes", u32::from(.0.parsed_len()))]
    Cancelled(Box<PartialTree>),
}

impl ParseError {
    /// Returns true for cancellations, which are not defects.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ParseError::Cancelled(_))
    }
}

/// What a cancelled parse had built so far.
///
/// A partial tree never claims to cover the document: its fragments are the
/// subtrees on the most advanced stack, and they end at [`parsed_len`].
///
/// [`parsed_len`]: PartialTree::parsed_len
pub struct PartialTree {
    language: Arc<Language>,
    fragments: Vec<(Subtree, Length)>,
    parsed: Length,
}

impl PartialTree {
    pub(crate) fn new(language: Arc<Language>, fragments: Vec<Subtree>) -> Self {
        let mut offset = Length::ZERO;
        let fragments = fragments
            .into_iter()
            .map(|fragment| {
                let start = offset;
                offset += fragment.len;
                (fragment, start)
            })
            .collect();
        Self {
            language,
            fragments,
            parsed: offset,
        }
    }

    /// Bytes covered by the fragments.
    #[must_use]
    pub fn parsed_len(&self) -> TextSize {
        self.parsed.bytes
    }

    /// Always false; see the type documentation.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        false
    }

    /// The language being parsed.
    #[must_use]
    pub fn language(&self) -> &Arc<Language> {
        &self.language
    }

    /// Completed subtrees in document order.
    pub fn fragments(&self) -> impl Iterator<Item = Node<'_>> {
        self.fragments.iter().map(|(fragment, start)| {
            Node::new(fragment, *start, Anchor::new(fragment, *start, &self.language))
        })
    }
}

impl fmt::Debug for PartialTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialTree")
            .field("language", &self.language.name())
            .field("fragments", &self.fragments.len())
            .field("parsed_len", &self.parsed_len())
            .finish()
    }
}
