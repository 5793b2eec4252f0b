//! Depth-first traversal.

use text_size::TextSize;

use super::Node;

/// A stateful cursor for walking a tree.
///
/// The cursor remembers the path from its starting node, so moving to a
/// parent or sibling is constant time, unlike [`Node::parent`].
#[derive(Clone)]
pub struct TreeCursor<'t> {
    /// Each node on the path with its index among its siblings.
    stack: Vec<(Node<'t>, usize)>,
}

impl<'t> TreeCursor<'t> {
    pub(crate) fn new(node: Node<'t>) -> Self {
        Self {
            stack: vec![(node, 0)],
        }
    }

    /// The current node.
    #[must_use]
    pub fn node(&self) -> Node<'t> {
        self.stack[self.stack.len() - 1].0
    }

    /// Depth below the starting node.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    /// Restarts the walk at `node`.
    pub fn reset(&mut self, node: Node<'t>) {
        self.stack.clear();
        self.stack.push((node, 0));
    }

    /// Moves to the first child. Returns false at a leaf.
    pub fn goto_first_child(&mut self) -> bool {
        match self.node().child(0) {
            Some(child) => {
                self.stack.push((child, 0));
                true
            }
            None => false,
        }
    }

    /// Moves to the next sibling. Returns false at the last child or at the
    /// starting node.
    pub fn goto_next_sibling(&mut self) -> bool {
        let depth = self.stack.len();
        if depth < 2 {
            return false;
        }
        let (current, index) = self.stack[depth - 1];
        let parent = self.stack[depth - 2].0;
        let Some(green) = parent.green().children.get(index + 1) else {
            return false;
        };
        let next = Node::new(green, current.position + current.green.len, current.anchor);
        self.stack[depth - 1] = (next, index + 1);
        true
    }

    /// Moves to the parent. Returns false at the starting node.
    pub fn goto_parent(&mut self) -> bool {
        if self.stack.len() < 2 {
            return false;
        }
        self.stack.pop();
        true
    }

    /// Moves to the first child that extends past `byte` and returns its
    /// index.
    pub fn goto_first_child_for_byte(&mut self, byte: TextSize) -> Option<usize> {
        let (index, child) = self
            .node()
            .children()
            .enumerate()
            .find(|(_, child)| child.end_byte() > byte)?;
        self.stack.push((child, index));
        Some(index)
    }
}

/// Pre-order iterator over a node and its descendants.
pub struct Preorder<'t> {
    cursor: TreeCursor<'t>,
    done: bool,
}

impl<'t> Preorder<'t> {
    pub(crate) fn new(node: Node<'t>) -> Self {
        Self {
            cursor: TreeCursor::new(node),
            done: false,
        }
    }
}

impl<'t> Iterator for Preorder<'t> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Node<'t>> {
        if self.done {
            return None;
        }
        let node = self.cursor.node();
        if !self.cursor.goto_first_child() {
            while !self.cursor.goto_next_sibling() {
                if !self.cursor.goto_parent() {
                    self.done = true;
                    break;
                }
            }
        }
        Some(node)
    }
}
