//! Turning stack operations into green nodes.

use std::sync::Arc;

use drop_bomb::DropBomb;

use super::stack::Stack;
use crate::error::ParseError;
use crate::language::{Language, ProductionId, StateId, Symbol};
use crate::tree::green::{Follow, GreenNode, Subtree};

pub(crate) const ERROR_COST_PER_RECOVERY: u32 = 500;
pub(crate) const ERROR_COST_PER_SKIPPED_TREE: u32 = 100;
pub(crate) const ERROR_COST_PER_SKIPPED_BYTE: u32 = 1;
pub(crate) const ERROR_COST_PER_MISSING_TREE: u32 = 110;

/// Builds nodes for one language. Every version of a parse shares it.
#[derive(Clone, Copy)]
pub(crate) struct TreeBuilder<'l> {
    language: &'l Language,
}

impl<'l> TreeBuilder<'l> {
    pub(crate) fn new(language: &'l Language) -> Self {
        Self { language }
    }

    /// Pushes a scanned or reused subtree and moves to `state`.
    pub(crate) fn shift(&self, stack: &mut Stack, state: StateId, subtree: Subtree) {
        let mode = self.language.table().lex_mode(state);
        stack.push(state, subtree, mode);
    }

    /// Pushes an extra or an error node without changing state.
    pub(crate) fn push_uncounted(&self, stack: &mut Stack, subtree: Subtree) {
        let state = stack.state();
        let mode = stack.next_mode();
        stack.push(state, subtree, mode);
    }

    /// Replaces the top `len` counted entries with a node for `production`.
    ///
    /// Uncounted entries above the last child stay outside the new node and
    /// are pushed back on top of it.
    pub(crate) fn reduce(
        &self,
        stack: &mut Stack,
        id: ProductionId,
        follow: Follow,
        fragile: bool,
    ) -> Result<(), ParseError> {
        let table = self.language.table();
        let Some(production) = table.production(id) else {
            return Err(ParseError::StackUnderflow {
                symbol: "<unknown production>".into(),
            });
        };
        let Some(mut children) = stack.pop_counted(usize::from(production.len)) else {
            return Err(ParseError::StackUnderflow {
                symbol: self.language.symbol_name(production.lhs).into(),
            });
        };
        let split = children
            .iter()
            .rposition(|child| child.is_counted())
            .map_or(0, |last| last + 1);
        let trailing = children.split_off(split);

        let base = stack.state();
        let Some(next) = table.goto(base, production.lhs) else {
            return Err(ParseError::MissingGoto {
                state: base,
                symbol: self.language.symbol_name(production.lhs).into(),
            });
        };
        let mut node = GreenNode::branch(production.lhs, children, base, self.language);
        node.follow = Some(follow);
        node.fragile = fragile;
        node.dynamic_precedence = node
            .dynamic_precedence
            .saturating_add(i32::from(production.dynamic_precedence));
        self.shift(stack, next, Arc::new(node));
        for extra in trailing {
            self.push_uncounted(stack, extra);
        }
        Ok(())
    }

    /// Pops the finished stack into a root node.
    ///
    /// Exactly one counted entry must remain. Extras before and after it are
    /// folded into the root so that the root spans the whole document.
    pub(crate) fn finish(&self, stack: &mut Stack) -> Result<Subtree, ParseError> {
        let mut entries = stack.pop_all();
        let counted: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_counted())
            .map(|(index, _)| index)
            .collect();
        let &[index] = counted.as_slice() else {
            return Err(ParseError::IncompleteParse {
                remaining: counted.len(),
            });
        };
        if entries.len() == 1 {
            return Ok(entries.swap_remove(0));
        }

        let trailing = entries.split_off(index + 1);
        let root = entries.swap_remove(index);
        let mut children = entries;
        children.extend(root.children.iter().cloned());
        children.extend(trailing);
        let mut node = GreenNode::branch(root.symbol, children, root.parse_state, self.language);
        node.follow = root.follow;
        node.fragile = root.fragile;
        node.dynamic_precedence = root.dynamic_precedence;
        Ok(Arc::new(node))
    }

    /// Starts collecting subtrees for an error node.
    pub(crate) fn error_region(&self) -> ErrorRegion {
        ErrorRegion {
            children: Vec::new(),
            bomb: DropBomb::new("uncompleted error region"),
        }
    }

    /// A zero-width token standing in for `symbol`.
    pub(crate) fn missing(&self, symbol: Symbol, stack: &Stack) -> Subtree {
        let cost = ERROR_COST_PER_RECOVERY
            + ERROR_COST_PER_MISSING_TREE.saturating_mul(self.language.missing_cost(symbol));
        Arc::new(GreenNode::missing(symbol, stack.next_mode(), cost))
    }
}

/// Subtrees skipped by error recovery, on their way into an error node.
///
/// A region must be completed into a node or abandoned.
pub(crate) struct ErrorRegion {
    children: Vec<Subtree>,
    bomb: DropBomb,
}

impl ErrorRegion {
    pub(crate) fn push(&mut self, subtree: Subtree) {
        self.children.push(subtree);
    }

    pub(crate) fn extend(&mut self, subtrees: impl IntoIterator<Item = Subtree>) {
        self.children.extend(subtrees);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Wraps the collected subtrees in an error node priced by how much it
    /// skipped.
    pub(crate) fn complete(mut self, builder: &TreeBuilder<'_>, state: StateId) -> Subtree {
        self.bomb.defuse();
        let skipped = self.children.iter().filter(|child| !child.is_extra).count();
        let skipped = u32::try_from(skipped).unwrap_or(u32::MAX);
        let mut node = GreenNode::branch(
            Symbol::ERROR,
            std::mem::take(&mut self.children),
            state,
            builder.language,
        );
        node.error_cost = node
            .error_cost
            .saturating_add(ERROR_COST_PER_RECOVERY)
            .saturating_add(ERROR_COST_PER_SKIPPED_TREE.saturating_mul(skipped))
            .saturating_add(ERROR_COST_PER_SKIPPED_BYTE.saturating_mul(u32::from(node.len.bytes)));
        Arc::new(node)
    }

    /// Gives the collected subtrees back.
    pub(crate) fn abandon(mut self) -> Vec<Subtree> {
        self.bomb.defuse();
        std::mem::take(&mut self.children)
    }
}
