//! Persistent parse stacks.
//!
//! A stack is a linked list of reference-counted entries, so forking a GLR
//! version is a pointer copy and versions share everything below the point
//! where they diverged.

use std::sync::Arc;

use crate::language::{LexMode, StateId};
use crate::text::Length;
use crate::tree::green::Subtree;

struct StackNode {
    state: StateId,
    subtree: Option<Subtree>,
    prev: Option<Arc<StackNode>>,
    /// Absolute position after this entry.
    position: Length,
    error_cost: u32,
    dynamic_precedence: i32,
    /// Mode for scanning the token after this entry.
    next_mode: LexMode,
}

impl Drop for StackNode {
    fn drop(&mut self) {
        let mut prev = self.prev.take();
        while let Some(node) = prev {
            prev = match Arc::into_inner(node) {
                Some(mut inner) => inner.prev.take(),
                None => None,
            };
        }
    }
}

#[derive(Clone)]
pub(crate) struct Stack {
    head: Arc<StackNode>,
}

impl Stack {
    pub(crate) fn new(state: StateId, mode: LexMode) -> Self {
        Self {
            head: Arc::new(StackNode {
                state,
                subtree: None,
                prev: None,
                position: Length::ZERO,
                error_cost: 0,
                dynamic_precedence: 0,
                next_mode: mode,
            }),
        }
    }

    pub(crate) fn state(&self) -> StateId {
        self.head.state
    }

    pub(crate) fn position(&self) -> Length {
        self.head.position
    }

    pub(crate) fn error_cost(&self) -> u32 {
        self.head.error_cost
    }

    pub(crate) fn dynamic_precedence(&self) -> i32 {
        self.head.dynamic_precedence
    }

    pub(crate) fn next_mode(&self) -> LexMode {
        self.head.next_mode
    }

    pub(crate) fn push(&mut self, state: StateId, subtree: Subtree, next_mode: LexMode) {
        let node = StackNode {
            state,
            position: self.head.position + subtree.len,
            error_cost: self.head.error_cost.saturating_add(subtree.error_cost),
            dynamic_precedence: self
                .head
                .dynamic_precedence
                .saturating_add(subtree.dynamic_precedence),
            next_mode,
            subtree: Some(subtree),
            prev: Some(Arc::clone(&self.head)),
        };
        self.head = Arc::new(node);
    }

    /// Pops entries until `count` counted entries have been removed, along
    /// with every uncounted entry above the deepest of them. Returns the
    /// popped subtrees in document order, or `None` if the stack is too
    /// shallow.
    pub(crate) fn pop_counted(&mut self, count: usize) -> Option<Vec<Subtree>> {
        let mut popped = Vec::new();
        let mut remaining = count;
        let mut cursor = Arc::clone(&self.head);
        while remaining > 0 {
            let subtree = cursor.subtree.clone()?;
            if subtree.is_counted() {
                remaining -= 1;
            }
            popped.push(subtree);
            cursor = cursor.prev.clone()?;
        }
        popped.reverse();
        self.head = cursor;
        Some(popped)
    }

    /// Empties the stack and returns every subtree in document order.
    pub(crate) fn pop_all(&mut self) -> Vec<Subtree> {
        let mut popped = Vec::new();
        let mut cursor = Arc::clone(&self.head);
        while let Some(prev) = cursor.prev.clone() {
            if let Some(subtree) = &cursor.subtree {
                popped.push(Arc::clone(subtree));
            }
            cursor = prev;
        }
        popped.reverse();
        self.head = cursor;
        popped
    }

    /// Subtrees in document order, leaving the stack as it is.
    pub(crate) fn subtrees(&self) -> Vec<Subtree> {
        let mut copy = self.clone();
        copy.pop_all()
    }

    /// The states below each counted entry plus the current state, bottom
    /// first. This is the view reductions see.
    pub(crate) fn counted_states(&self) -> Vec<StateId> {
        let mut states = Vec::new();
        let mut cursor = Some(&self.head);
        while let Some(node) = cursor {
            match &node.subtree {
                Some(subtree) if subtree.is_counted() => states.push(node.state),
                Some(_) => {}
                None => states.push(node.state),
            }
            cursor = node.prev.as_ref();
        }
        states.reverse();
        states
    }
}
