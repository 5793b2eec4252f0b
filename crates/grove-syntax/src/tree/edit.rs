//! Applying text edits to trees.

use std::sync::Arc;

use text_size::{TextRange, TextSize};

use super::green::{GreenNode, Subtree};
use super::Tree;
use crate::text::{Length, Point};

/// One contiguous text replacement.
///
/// The bytes `start_byte..old_end_byte` of the old document were replaced by
/// new text ending at `new_end_byte`. Points give the same offsets as rows and
/// byte columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEdit {
    /// Start of the replaced span.
    pub start_byte: TextSize,
    /// End of the replaced span in the old text.
    pub old_end_byte: TextSize,
    /// End of the replacement in the new text.
    pub new_end_byte: TextSize,
    /// Row and column of `start_byte`.
    pub start_position: Point,
    /// Row and column of `old_end_byte` in the old text.
    pub old_end_position: Point,
    /// Row and column of `new_end_byte` in the new text.
    pub new_end_position: Point,
}

impl InputEdit {
    /// Describes replacing `range` of `old_text` with `replacement`.
    ///
    /// `range` is clamped to the text.
    #[must_use]
    pub fn replace(old_text: &str, range: TextRange, replacement: &str) -> Self {
        let bytes = old_text.as_bytes();
        let end = usize::from(range.end()).min(bytes.len());
        let start = usize::from(range.start()).min(end);
        let start_len = Length::of_bytes(&bytes[..start]);
        let old_end_len = start_len + Length::of_bytes(&bytes[start..end]);
        let new_end_len = start_len + Length::of_str(replacement);
        Self {
            start_byte: start_len.bytes,
            old_end_byte: old_end_len.bytes,
            new_end_byte: new_end_len.bytes,
            start_position: start_len.extent,
            old_end_position: old_end_len.extent,
            new_end_position: new_end_len.extent,
        }
    }

    /// Describes inserting `text` at `offset`.
    #[must_use]
    pub fn insert(old_text: &str, offset: TextSize, text: &str) -> Self {
        Self::replace(old_text, TextRange::empty(offset), text)
    }

    /// Describes deleting `range`.
    #[must_use]
    pub fn delete(old_text: &str, range: TextRange) -> Self {
        Self::replace(old_text, range, "")
    }

    fn old_end(&self) -> Length {
        Length::new(self.old_end_byte, self.old_end_position)
    }

    fn new_end(&self) -> Length {
        Length::new(self.new_end_byte, self.new_end_position)
    }

    /// Maps an old absolute position to its new one. The edit start stays
    /// put, so a node starting there takes in the new text. Positions inside
    /// the replaced span collapse to the end of the replacement.
    fn map(&self, position: Length) -> Length {
        if position.bytes <= self.start_byte {
            position
        } else if position.bytes >= self.old_end_byte {
            self.shift(position)
        } else {
            self.new_end()
        }
    }

    /// Maps a position at or after the replaced span.
    fn shift(&self, position: Length) -> Length {
        self.new_end() + (position - self.old_end())
    }

    /// Returns this edit limited to a document of `len`.
    fn clamped(&self, len: Length) -> Self {
        let mut edit = *self;
        if edit.old_end_byte > len.bytes {
            edit.old_end_byte = len.bytes;
            edit.old_end_position = len.extent;
        }
        if edit.start_byte > edit.old_end_byte {
            edit.start_byte = edit.old_end_byte;
            edit.start_position = edit.old_end_position;
        }
        if edit.new_end_byte < edit.start_byte {
            edit.new_end_byte = edit.start_byte;
            edit.new_end_position = edit.start_position;
        }
        edit
    }
}

impl Tree {
    /// Returns a copy of this tree with `edit` applied.
    ///
    /// Nodes after the edit move; nodes that overlap or touch it, including
    /// through the bytes their tokens' scanners examined, are resized and
    /// marked changed. Everything else is shared with `self`, which stays
    /// valid.
    #[must_use]
    pub fn edit(&self, edit: &InputEdit) -> Tree {
        let len = self.root().len;
        let edit = edit.clamped(len);
        let root = edit_subtree(self.root(), &edit, len);
        Tree::new(root, Arc::clone(self.language()))
    }
}

/// A node on the changed spine whose children are being edited.
struct Frame<'a> {
    node: &'a Subtree,
    start: Length,
    /// Start of the next child to visit.
    offset: Length,
    next: usize,
    children: Vec<Subtree>,
}

impl<'a> Frame<'a> {
    fn new(node: &'a Subtree, start: Length) -> Self {
        Self {
            node,
            start,
            offset: start,
            next: 0,
            children: Vec::with_capacity(node.children.len()),
        }
    }

    /// The node resized for `edit`, with its edited children.
    ///
    /// `doc_end` is the old document length; nodes ending there grow with
    /// text appended at the end.
    fn finish(&mut self, edit: &InputEdit, doc_end: Length) -> Subtree {
        let end = self.start + self.node.len;
        let new_start = edit.map(self.start);
        let new_end = if end.bytes == doc_end.bytes {
            edit.shift(end)
        } else {
            edit.map(end)
        };
        let mut edited = GreenNode::clone(self.node);
        edited.children = std::mem::take(&mut self.children);
        edited.len = new_end - new_start;
        edited.has_changes = true;
        Arc::new(edited)
    }
}

/// Returns true when `edit` can neither move nor resize `node`, nor change
/// how its tokens scan.
fn is_untouched(node: &Subtree, start: Length, edit: &InputEdit) -> bool {
    let end = start + node.len;
    let reach = u32::from(end.bytes).saturating_add(node.lookahead);
    reach < u32::from(edit.start_byte) || start.bytes > edit.old_end_byte
}

/// Rebuilds the spine of nodes touched by `edit`, sharing everything else.
/// Walks down with an explicit stack so document depth is not bounded by
/// the thread's stack.
fn edit_subtree(root: &Subtree, edit: &InputEdit, doc_end: Length) -> Subtree {
    if is_untouched(root, Length::ZERO, edit) {
        return Arc::clone(root);
    }
    let mut stack = vec![Frame::new(root, Length::ZERO)];
    let mut edited_root = None;
    while let Some(frame) = stack.last_mut() {
        let node = frame.node;
        if let Some(child) = node.children.get(frame.next) {
            let child_start = frame.offset;
            frame.offset += child.len;
            frame.next += 1;
            if is_untouched(child, child_start, edit) {
                frame.children.push(Arc::clone(child));
            } else {
                stack.push(Frame::new(child, child_start));
            }
            continue;
        }
        let edited = frame.finish(edit, doc_end);
        stack.pop();
        match stack.last_mut() {
            Some(parent) => parent.children.push(edited),
            None => edited_root = Some(edited),
        }
    }
    edited_root.unwrap_or_else(|| Arc::clone(root))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_computes_points() {
        let edit = InputEdit::replace(
            "ab\ncd\nef",
            TextRange::new(TextSize::new(4), TextSize::new(7)),
            "X\nYZ",
        );
        assert_eq!(edit.start_byte, TextSize::new(4));
        assert_eq!(edit.old_end_byte, TextSize::new(7));
        assert_eq!(edit.new_end_byte, TextSize::new(8));
        assert_eq!(edit.start_position, Point::new(1, 1));
        assert_eq!(edit.old_end_position, Point::new(2, 1));
        assert_eq!(edit.new_end_position, Point::new(2, 2));
    }

    #[test]
    fn test_map_shifts_positions_after_edit() {
        let text = "(a b)\n(c)";
        let edit = InputEdit::insert(text, TextSize::new(3), "xy\n");
        let after = Length::of_str("(a b)\n(");
        let mapped = edit.map(after);
        assert_eq!(mapped, Length::of_str("(a xy\nb)\n("));
        let before = Length::of_str("(a");
        assert_eq!(edit.map(before), before);
        let at = Length::of_str("(a ");
        assert_eq!(edit.map(at), at);
    }

    #[test]
    fn test_clamp_limits_edit_to_document() {
        let edit = InputEdit {
            start_byte: TextSize::new(10),
            old_end_byte: TextSize::new(12),
            new_end_byte: TextSize::new(11),
            start_position: Point::new(0, 10),
            old_end_position: Point::new(0, 12),
            new_end_position: Point::new(0, 11),
        };
        let clamped = edit.clamped(Length::of_str("abc"));
        assert_eq!(clamped.start_byte, TextSize::new(3));
        assert_eq!(clamped.old_end_byte, TextSize::new(3));
        assert_eq!(clamped.new_end_byte, TextSize::new(11));
    }
}
