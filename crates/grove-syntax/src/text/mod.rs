//! Source text access.
//!
//! The parser never owns the caller's storage. It pulls bytes through the
//! [`Input`] trait, one chunk at a time, and keeps the validated text in a
//! [`Text`] for the duration of a single parse.

mod length;

pub use length::{Length, Point};

use std::borrow::Cow;

use text_size::{TextRange, TextSize};

/// A source of document bytes.
///
/// `read` returns the bytes starting at `offset`. Chunks may be any length; an
/// empty chunk marks the end of the document.
pub trait Input {
    /// Returns the chunk that starts at `offset`.
    fn read(&mut self, offset: usize) -> Cow<'_, [u8]>;
}

impl Input for &str {
    fn read(&mut self, offset: usize) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes().get(offset..).unwrap_or_default())
    }
}

impl Input for &[u8] {
    fn read(&mut self, offset: usize) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.get(offset..).unwrap_or_default())
    }
}

impl Input for String {
    fn read(&mut self, offset: usize) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes().get(offset..).unwrap_or_default())
    }
}

/// Adapts a read-at-offset callback to [`Input`].
///
/// ```
/// use grove_syntax::text::{ChunkReader, Input};
///
/// let lines = ["(a\n", " b)"];
/// let mut input = ChunkReader::new(|offset: usize| {
///     let mut start = 0;
///     for line in lines {
///         if offset < start + line.len() {
///             return line.as_bytes()[offset - start..].to_vec();
///         }
///         start += line.len();
///     }
///     Vec::new()
/// });
/// assert_eq!(&*input.read(1), b"a\n");
/// ```
pub struct ChunkReader<F> {
    callback: F,
}

impl<F> ChunkReader<F> {
    /// Wraps a callback.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F, T> Input for ChunkReader<F>
where
    F: FnMut(usize) -> T,
    T: AsRef<[u8]>,
{
    fn read(&mut self, offset: usize) -> Cow<'_, [u8]> {
        Cow::Owned((self.callback)(offset).as_ref().to_vec())
    }
}

/// Document text collected from an [`Input`].
///
/// Text is stored as runs of valid UTF-8. Bytes that are not valid UTF-8 split
/// the runs, so [`Text::str_at`] returns `None` exactly at offsets a scanner
/// cannot look at as a string.
#[derive(Debug, Clone, Default)]
pub struct Text {
    segments: Vec<Segment>,
    len: TextSize,
}

#[derive(Debug, Clone)]
struct Segment {
    start: TextSize,
    text: String,
}

impl Text {
    /// Builds text from a string.
    #[must_use]
    pub fn new(source: &str) -> Self {
        Self::from_bytes(source.as_bytes())
    }

    /// Builds text from raw bytes, which need not be valid UTF-8.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut text = Self::default();
        text.extend(bytes);
        text
    }

    /// Pulls every chunk out of `input`.
    pub fn read(input: &mut dyn Input) -> Self {
        let mut bytes = Vec::new();
        loop {
            let chunk = input.read(bytes.len());
            if chunk.is_empty() {
                break;
            }
            let room = (u32::MAX as usize).saturating_sub(bytes.len());
            if chunk.len() >= room {
                bytes.extend_from_slice(&chunk[..room]);
                tracing::warn!("input truncated at {} bytes", u32::MAX);
                break;
            }
            bytes.extend_from_slice(&chunk);
        }
        Self::from_bytes(&bytes)
    }

    fn extend(&mut self, mut bytes: &[u8]) {
        let mut offset = u32::from(self.len) as usize;
        while !bytes.is_empty() {
            let (valid, skip) = match std::str::from_utf8(bytes) {
                Ok(valid) => (valid, 0),
                Err(err) => {
                    let (head, _) = bytes.split_at(err.valid_up_to());
                    let skip = err.error_len().unwrap_or(bytes.len() - head.len());
                    (std::str::from_utf8(head).unwrap_or_default(), skip)
                }
            };
            if !valid.is_empty() {
                self.segments.push(Segment {
                    start: to_size(offset),
                    text: valid.to_owned(),
                });
            }
            let consumed = valid.len() + skip;
            offset += consumed;
            bytes = &bytes[consumed..];
        }
        self.len = to_size(offset);
    }

    /// Total length in bytes.
    #[must_use]
    pub fn len(&self) -> TextSize {
        self.len
    }

    /// Returns true for empty text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == TextSize::new(0)
    }

    /// The valid UTF-8 run starting at `offset` and extending to the end of
    /// its segment. `None` when `offset` is inside an invalid byte sequence or
    /// not on a character boundary.
    #[must_use]
    pub fn str_at(&self, offset: TextSize) -> Option<&str> {
        let segment = self.segment_for(offset)?;
        let local = u32::from(offset - segment.start) as usize;
        segment.text.get(local..)
    }

    /// The text covered by `range`, when it lies inside one valid run.
    #[must_use]
    pub fn slice(&self, range: TextRange) -> Option<&str> {
        let segment = self.segment_for(range.start())?;
        let start = u32::from(range.start() - segment.start) as usize;
        let end = u32::from(range.end() - segment.start) as usize;
        segment.text.get(start..end)
    }

    /// Measures `range`, counting rows for every `\n` byte.
    #[must_use]
    pub fn measure(&self, range: TextRange) -> Length {
        if let Some(text) = self.slice(range) {
            return Length::of_str(text);
        }
        let mut len = Length::ZERO;
        let mut offset = range.start();
        while offset < range.end() {
            let byte_len = match self.str_at(offset).and_then(|s| s.chars().next()) {
                Some(ch) => to_size(ch.len_utf8()),
                None => TextSize::new(1),
            };
            let step = byte_len.min(range.end() - offset);
            len += match self.str_at(offset) {
                Some(s) if s.starts_with('\n') => Length::new(step, Point::new(1, 0)),
                _ => Length::new(step, Point::new(0, u32::from(step))),
            };
            offset += step;
        }
        len
    }

    fn segment_for(&self, offset: TextSize) -> Option<&Segment> {
        let index = match self
            .segments
            .binary_search_by(|segment| segment.start.cmp(&offset))
        {
            Ok(index) => index,
            Err(0) => return None,
            Err(index) => index - 1,
        };
        let segment = self.segments.get(index)?;
        let end = segment.start + TextSize::of(segment.text.as_str());
        (offset < end).then_some(segment)
    }

    /// Returns the whole text when it is valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self.segments.as_slice() {
            [] => Some(""),
            [only] if TextSize::of(only.text.as_str()) == self.len => Some(&only.text),
            _ => None,
        }
    }
}

fn to_size(len: usize) -> TextSize {
    TextSize::try_from(len).unwrap_or(TextSize::new(u32::MAX))
}
