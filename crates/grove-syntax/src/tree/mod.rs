//! Persistent concrete syntax trees.
//!
//! A [`Tree`] owns an immutable green root. [`Node`] is a cheap, copyable view
//! that adds an absolute position to a green node while traversing. Parent
//! links are not stored: [`Node::parent`] walks down from the root again, which
//! keeps ownership strictly parent-to-child and lets revisions share subtrees.

mod cursor;
mod edit;
pub(crate) mod green;

pub use cursor::{Preorder, TreeCursor};
pub use edit::InputEdit;

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use crate::language::{Language, Symbol};
use crate::text::{Length, Point};
use green::Subtree;

/// A syntax tree produced by a parse.
#[derive(Clone)]
pub struct Tree {
    root: Subtree,
    language: Arc<Language>,
}

impl Tree {
    pub(crate) fn new(root: Subtree, language: Arc<Language>) -> Self {
        Self { root, language }
    }

    pub(crate) fn root(&self) -> &Subtree {
        &self.root
    }

    /// The root node. It spans the whole document.
    #[must_use]
    pub fn root_node(&self) -> Node<'_> {
        Node::new(&self.root, Length::ZERO, Anchor::new(&self.root, Length::ZERO, &self.language))
    }

    /// The language the tree was parsed with.
    #[must_use]
    pub fn language(&self) -> &Arc<Language> {
        &self.language
    }

    /// Length of the parsed document in bytes.
    #[must_use]
    pub fn len(&self) -> TextSize {
        self.root.len.bytes
    }

    /// Returns true for an empty document.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.len.is_empty()
    }

    /// A cursor positioned at the root.
    #[must_use]
    pub fn walk(&self) -> TreeCursor<'_> {
        TreeCursor::new(self.root_node())
    }

    /// Error and missing nodes, in document order.
    #[must_use]
    pub fn errors(&self) -> Vec<SyntaxError> {
        let mut errors = Vec::new();
        if !self.root.has_error {
            return errors;
        }
        let mut cursor = self.walk();
        'walk: loop {
            let node = cursor.node();
            let descend = if node.is_error() {
                errors.push(SyntaxError {
                    kind: SyntaxErrorKind::Unexpected,
                    range: node.byte_range(),
                    position: node.start_position(),
                });
                false
            } else if node.is_missing() {
                errors.push(SyntaxError {
                    kind: SyntaxErrorKind::Missing(SmolStr::new(node.kind())),
                    range: node.byte_range(),
                    position: node.start_position(),
                });
                false
            } else {
                node.has_error()
            };
            if descend && cursor.goto_first_child() {
                continue;
            }
            while !cursor.goto_next_sibling() {
                if !cursor.goto_parent() {
                    break 'walk;
                }
            }
        }
        errors
    }

    /// Byte ranges of this tree whose structure differs from `old`.
    ///
    /// Subtrees shared with `old` are unchanged by construction. Every node
    /// that is not shared but whose children all are (including leaves)
    /// contributes its range; the ranges are then merged.
    #[must_use]
    pub fn changed_ranges(&self, old: &Tree) -> Vec<TextRange> {
        let mut shared: FxHashSet<*const green::GreenNode> = FxHashSet::default();
        let mut pending = vec![&old.root];
        while let Some(node) = pending.pop() {
            shared.insert(Arc::as_ptr(node));
            pending.extend(node.children.iter());
        }

        let mut ranges = Vec::new();
        let mut pending = vec![self.root_node()];
        while let Some(node) = pending.pop() {
            if shared.contains(&Arc::as_ptr(node.green)) {
                continue;
            }
            let fresh: Vec<Node<'_>> = node
                .children()
                .filter(|child| !shared.contains(&Arc::as_ptr(child.green)))
                .collect();
            if fresh.is_empty() {
                ranges.push(node.byte_range());
            } else {
                pending.extend(fresh);
            }
        }

        ranges.sort_by_key(|range| (range.start(), range.end()));
        let mut merged: Vec<TextRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if range.start() <= last.end() => {
                    *last = last.cover(range);
                }
                _ => merged.push(range),
            }
        }
        merged
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("language", &self.language.name())
            .field("root", &self.root_node().to_sexp())
            .finish()
    }
}

/// Where a traversal started: the root it descends from and that root's
/// absolute position.
#[derive(Clone, Copy)]
pub(crate) struct Anchor<'t> {
    root: &'t Subtree,
    offset: Length,
    language: &'t Language,
}

impl<'t> Anchor<'t> {
    pub(crate) fn new(root: &'t Subtree, offset: Length, language: &'t Language) -> Self {
        Self {
            root,
            offset,
            language,
        }
    }
}

/// A node of a [`Tree`] at an absolute position.
#[derive(Clone, Copy)]
pub struct Node<'t> {
    green: &'t Subtree,
    position: Length,
    anchor: Anchor<'t>,
}

impl<'t> Node<'t> {
    pub(crate) fn new(green: &'t Subtree, position: Length, anchor: Anchor<'t>) -> Self {
        Self {
            green,
            position,
            anchor,
        }
    }

    pub(crate) fn green(&self) -> &'t Subtree {
        self.green
    }

    /// Identity of the underlying subtree. Two revisions that share a subtree
    /// report the same id for it.
    #[must_use]
    pub fn id(&self) -> usize {
        Arc::as_ptr(self.green) as usize
    }

    /// The node's grammar symbol.
    #[must_use]
    pub fn symbol(&self) -> Symbol {
        self.green.symbol
    }

    /// The node's kind name.
    #[must_use]
    pub fn kind(&self) -> &'t str {
        self.anchor.language.symbol_name(self.green.symbol)
    }

    /// Named nodes correspond to named rules and tokens; anonymous nodes are
    /// literal tokens such as punctuation.
    #[must_use]
    pub fn is_named(&self) -> bool {
        self.anchor.language.is_named(self.green.symbol)
    }

    /// Returns true for extras such as whitespace and comments.
    #[must_use]
    pub fn is_extra(&self) -> bool {
        self.green.is_extra
    }

    /// Returns true for error nodes.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.green.is_error
    }

    /// Returns true for zero-width tokens inserted by error recovery.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.green.is_missing
    }

    /// Returns true if the node is or contains an error or missing node.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.green.has_error
    }

    /// Returns true if an edit touched this node.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.green.has_changes
    }

    /// Start offset in bytes.
    #[must_use]
    pub fn start_byte(&self) -> TextSize {
        self.position.bytes
    }

    /// End offset in bytes.
    #[must_use]
    pub fn end_byte(&self) -> TextSize {
        self.position.bytes + self.green.len.bytes
    }

    /// The node's byte range.
    #[must_use]
    pub fn byte_range(&self) -> TextRange {
        TextRange::new(self.start_byte(), self.end_byte())
    }

    /// Start row and column.
    #[must_use]
    pub fn start_position(&self) -> Point {
        self.position.point()
    }

    /// End row and column.
    #[must_use]
    pub fn end_position(&self) -> Point {
        (self.position + self.green.len).point()
    }

    /// Number of children, including anonymous tokens and extras.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.green.children.len()
    }

    /// The child at `index`.
    #[must_use]
    pub fn child(&self, index: usize) -> Option<Node<'t>> {
        self.children().nth(index)
    }

    /// All children in order.
    #[must_use]
    pub fn children(&self) -> Children<'t> {
        Children {
            iter: self.green.children.iter(),
            position: self.position,
            anchor: self.anchor,
        }
    }

    /// Number of named children.
    #[must_use]
    pub fn named_child_count(&self) -> usize {
        self.named_children().count()
    }

    /// The named child at `index`, counting only named children.
    #[must_use]
    pub fn named_child(&self, index: usize) -> Option<Node<'t>> {
        self.named_children().nth(index)
    }

    /// Named children in order.
    pub fn named_children(&self) -> impl Iterator<Item = Node<'t>> {
        self.children().filter(Node::is_named)
    }

    /// The parent node, or `None` at the root.
    ///
    /// Searches down from the root on every call. Use a [`TreeCursor`] to
    /// walk up or along a tree.
    #[must_use]
    pub fn parent(&self) -> Option<Node<'t>> {
        let root = Node::new(self.anchor.root, self.anchor.offset, self.anchor);
        if root == *self {
            return None;
        }
        let mut pending = vec![root];
        while let Some(node) = pending.pop() {
            for child in node.children() {
                if child == *self {
                    return Some(node);
                }
                if !child.green.token
                    && child.start_byte() <= self.start_byte()
                    && self.end_byte() <= child.end_byte()
                {
                    pending.push(child);
                }
            }
        }
        None
    }

    fn index_in_parent(&self, parent: &Node<'t>) -> Option<usize> {
        parent.children().position(|child| child == *self)
    }

    /// The next sibling. Finds the parent first, see [`Node::parent`];
    /// [`TreeCursor::goto_next_sibling`] steps in constant time.
    #[must_use]
    pub fn next_sibling(&self) -> Option<Node<'t>> {
        let parent = self.parent()?;
        let index = self.index_in_parent(&parent)?;
        parent.child(index + 1)
    }

    /// The previous sibling. Finds the parent first, see [`Node::parent`].
    #[must_use]
    pub fn prev_sibling(&self) -> Option<Node<'t>> {
        let parent = self.parent()?;
        let index = self.index_in_parent(&parent)?;
        parent.child(index.checked_sub(1)?)
    }

    /// The smallest descendant that contains `start..end`.
    #[must_use]
    pub fn descendant_for_byte_range(&self, start: TextSize, end: TextSize) -> Node<'t> {
        let mut node = *self;
        'descend: loop {
            for child in node.children() {
                // An empty range at a boundary belongs to the node that starts there.
                if child.start_byte() <= start
                    && end <= child.end_byte()
                    && (start != end || start < child.end_byte())
                {
                    node = child;
                    continue 'descend;
                }
            }
            return node;
        }
    }

    /// A cursor starting at this node.
    #[must_use]
    pub fn walk(&self) -> TreeCursor<'t> {
        TreeCursor::new(*self)
    }

    /// This node and its descendants in document order.
    #[must_use]
    pub fn preorder(&self) -> Preorder<'t> {
        Preorder::new(*self)
    }

    /// The node's source text, given the document it was parsed from.
    #[must_use]
    pub fn utf8_text<'s>(&self, source: &'s str) -> Option<&'s str> {
        source.get(usize::from(self.start_byte())..usize::from(self.end_byte()))
    }

    /// Renders the named structure as an S-expression.
    ///
    /// Anonymous tokens are omitted unless missing; missing tokens render as
    /// `(MISSING name)`.
    #[must_use]
    pub fn to_sexp(&self) -> String {
        let mut out = String::new();
        write_sexp(*self, &mut out);
        out
    }
}

enum SexpStep<'t> {
    Open { node: Node<'t>, nested: bool },
    Close,
}

fn write_sexp(node: Node<'_>, out: &mut String) {
    let mut pending = vec![SexpStep::Open {
        node,
        nested: false,
    }];
    while let Some(step) = pending.pop() {
        let (node, nested) = match step {
            SexpStep::Close => {
                out.push(')');
                continue;
            }
            SexpStep::Open { node, nested } => (node, nested),
        };
        if nested {
            out.push(' ');
        }
        if node.is_missing() {
            out.push_str("(MISSING ");
            if node.is_named() {
                out.push_str(node.kind());
            } else {
                out.push('"');
                out.push_str(node.kind());
                out.push('"');
            }
            out.push(')');
            continue;
        }
        out.push('(');
        out.push_str(node.kind());
        pending.push(SexpStep::Close);
        let first = pending.len();
        pending.extend(
            node.children()
                .filter(|child| child.is_named() || child.is_missing())
                .map(|child| SexpStep::Open {
                    node: child,
                    nested: true,
                }),
        );
        pending[first..].reverse();
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(self.green, other.green) && self.position == other.position
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}..{}",
            self.kind(),
            u32::from(self.start_byte()),
            u32::from(self.end_byte())
        )
    }
}

/// Iterator over the children of a [`Node`].
#[derive(Clone)]
pub struct Children<'t> {
    iter: std::slice::Iter<'t, Subtree>,
    position: Length,
    anchor: Anchor<'t>,
}

impl<'t> Iterator for Children<'t> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Node<'t>> {
        let green = self.iter.next()?;
        let node = Node::new(green, self.position, self.anchor);
        self.position += green.len;
        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

/// A syntax error recorded in a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// What went wrong.
    pub kind: SyntaxErrorKind,
    /// Affected bytes. Empty for missing tokens.
    pub range: TextRange,
    /// Row and column of the range start.
    pub position: Point,
}

/// Kinds of [`SyntaxError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    /// Input that could not be fitted into the grammar.
    Unexpected,
    /// A token recovery had to insert.
    Missing(SmolStr),
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = u32::from(self.range.start());
        let end = u32::from(self.range.end());
        match &self.kind {
            SyntaxErrorKind::Unexpected => {
                write!(f, "{}: unexpected input at {start}..{end}", self.position)
            }
            SyntaxErrorKind::Missing(kind) => {
                write!(f, "{}: missing `{kind}` at {start}", self.position)
            }
        }
    }
}
