//! Byte lengths paired with row/column extents.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};

use text_size::TextSize;

/// A zero-based row/column position. Columns count bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Point {
    /// Zero-based line number.
    pub row: u32,
    /// Byte offset from the start of the line.
    pub column: u32,
}

impl Point {
    /// Creates a new point.
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.column)
    }
}

/// The size of a span of text, both in bytes and as a row/column extent.
///
/// Lengths are what the green tree stores: a node knows how long it is but not
/// where it starts. Adding lengths is associative, so the length of a parent is
/// always the sum of the lengths of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Length {
    /// Number of bytes.
    pub bytes: TextSize,
    /// Rows and trailing columns spanned.
    pub extent: Point,
}

impl Length {
    /// The empty length.
    pub const ZERO: Length = Length {
        bytes: TextSize::new(0),
        extent: Point::new(0, 0),
    };

    /// Creates a length from its parts.
    #[must_use]
    pub const fn new(bytes: TextSize, extent: Point) -> Self {
        Self { bytes, extent }
    }

    /// Measures a byte string. Newlines advance the row.
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut row = 0u32;
        let mut column = 0u32;
        for &byte in bytes {
            if byte == b'\n' {
                row += 1;
                column = 0;
            } else {
                column += 1;
            }
        }
        let len = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
        Self::new(TextSize::new(len), Point::new(row, column))
    }

    /// Measures a string.
    #[must_use]
    pub fn of_str(text: &str) -> Self {
        Self::of_bytes(text.as_bytes())
    }

    /// Returns true for the empty length.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.bytes == TextSize::new(0)
    }

    /// Interprets this length as an absolute position and returns its point.
    #[must_use]
    pub fn point(self) -> Point {
        self.extent
    }
}

impl Add for Length {
    type Output = Length;

    fn add(self, rhs: Length) -> Length {
        let extent = if rhs.extent.row > 0 {
            Point::new(self.extent.row + rhs.extent.row, rhs.extent.column)
        } else {
            Point::new(self.extent.row, self.extent.column + rhs.extent.column)
        };
        Length::new(self.bytes + rhs.bytes, extent)
    }
}

impl AddAssign for Length {
    fn add_assign(&mut self, rhs: Length) {
        *self = *self + rhs;
    }
}

/// Saturating difference: `(a + b) - a == b` for any lengths `a` and `b`.
impl Sub for Length {
    type Output = Length;

    fn sub(self, rhs: Length) -> Length {
        let bytes = self.bytes.checked_sub(rhs.bytes).unwrap_or_default();
        let extent = if self.extent.row > rhs.extent.row {
            Point::new(self.extent.row - rhs.extent.row, self.extent.column)
        } else {
            Point::new(0, self.extent.column.saturating_sub(rhs.extent.column))
        };
        Length::new(bytes, extent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_of_str_counts_rows_and_columns() {
        let len = Length::of_str("ab\ncd\nefg");
        assert_eq!(len.bytes, TextSize::new(9));
        assert_eq!(len.extent, Point::new(2, 3));
    }

    #[test]
    fn test_add_is_associative() {
        let a = Length::of_str("x\ny");
        let b = Length::of_str("zz");
        let c = Length::of_str("\nw");
        assert_eq!((a + b) + c, a + (b + c));
        assert_eq!(a + b + c, Length::of_str("x\nyzz\nw"));
    }

    #[test]
    fn test_sub_inverts_add() {
        let a = Length::of_str("(a\n  b");
        for tail in ["", "c", "\n", "cd\nef", "\n\n"] {
            let b = Length::of_str(tail);
            assert_eq!((a + b) - a, b, "tail {tail:?}");
        }
    }
}
