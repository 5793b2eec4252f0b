//! Walking an edited tree for subtrees the parser may reuse.

use crate::text::Length;
use crate::tree::green::Subtree;

struct Frame {
    node: Subtree,
    start: Length,
    /// Index of the current child of `node`.
    child: usize,
}

/// A position in the old tree, moving forward in document order.
///
/// The current node is always the leftmost node at its position that has not
/// been passed yet. [`advance`](Self::advance) steps over it and
/// [`descend`](Self::descend) steps into it.
pub(crate) struct ReusableNode {
    stack: Vec<Frame>,
}

impl ReusableNode {
    pub(crate) fn new(root: Subtree) -> Self {
        let mut reusable = Self { stack: Vec::new() };
        if !root.len.is_empty() {
            reusable.stack.push(Frame {
                node: root,
                start: Length::ZERO,
                child: usize::MAX,
            });
        }
        reusable
    }

    /// The current node and its absolute start.
    pub(crate) fn current(&self) -> Option<(Subtree, Length)> {
        let frame = self.stack.last()?;
        if frame.child == usize::MAX {
            return Some((frame.node.clone(), frame.start));
        }
        let child = frame.node.children.get(frame.child)?;
        Some((child.clone(), frame.start))
    }

    /// Moves past the current node.
    pub(crate) fn advance(&mut self) {
        while let Some(frame) = self.stack.last_mut() {
            if frame.child == usize::MAX {
                self.stack.clear();
                return;
            }
            if let Some(child) = frame.node.children.get(frame.child) {
                frame.start += child.len;
                frame.child += 1;
            }
            if frame.child < frame.node.children.len() {
                return;
            }
            self.stack.pop();
            // The parent's cursor still points at the finished child.
        }
    }

    /// Moves to the first child of the current node. Returns false at a
    /// leaf, leaving the position unchanged.
    pub(crate) fn descend(&mut self) -> bool {
        let Some((node, start)) = self.current() else {
            return false;
        };
        if node.children.is_empty() {
            return false;
        }
        self.stack.push(Frame {
            node,
            start,
            child: 0,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::language::{LexMode, Symbol};
    use crate::tree::green::GreenNode;

    fn leaf(text: &str) -> Subtree {
        Arc::new(GreenNode::leaf(
            Symbol::new(1),
            Length::of_str(text),
            0,
            LexMode::default(),
            false,
        ))
    }

    fn node(children: Vec<Subtree>) -> Subtree {
        let mut node = GreenNode::leaf(Symbol::new(2), Length::ZERO, 0, LexMode::default(), false);
        node.token = false;
        node.children = children;
        node.summarize();
        Arc::new(node)
    }

    #[test]
    fn test_descend_and_advance_visit_in_document_order() {
        let inner = node(vec![leaf("b"), leaf("c")]);
        let root = node(vec![leaf("a"), inner, leaf("d")]);
        let mut reusable = ReusableNode::new(root);

        assert!(reusable.descend());
        let (first, start) = reusable.current().unwrap();
        assert_eq!(first.len, Length::of_str("a"));
        assert_eq!(start, Length::ZERO);

        reusable.advance();
        let (second, start) = reusable.current().unwrap();
        assert_eq!(second.len, Length::of_str("bc"));
        assert_eq!(start, Length::of_str("a"));

        assert!(reusable.descend());
        reusable.advance();
        reusable.advance();
        let (last, start) = reusable.current().unwrap();
        assert_eq!(last.len, Length::of_str("d"));
        assert_eq!(start, Length::of_str("abc"));

        assert!(!reusable.descend());
        reusable.advance();
        assert!(reusable.current().is_none());
    }
}
