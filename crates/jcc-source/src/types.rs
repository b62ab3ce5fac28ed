//! Type definitions for source code representation.
//!
//! This module defines the core types used for representing source positions,
//! ranges, and files in the JCC compiler:
//!
//! - `FileId`: a unique identifier for a source file
//! - `Span`: a byte range within a single file
//! - `SourceRange`: a span paired with the file it belongs to
//! - `SourceFile` and `SourceManager`: file storage with efficient
//!   offset-to-line/column lookup
//!
//! Every AST node, diagnostic and expression node carries a `SourceRange` so
//! that semantic errors can point back into the program text.

use std::fmt;
use std::ops::Range;

use rustc_hash::FxHashMap;

/// A unique identifier for a source file.
///
/// `FileId` is a newtype wrapper around `u32` that uniquely identifies a
/// source file within a [`SourceManager`]. Id 0 is reserved for synthetic
/// ranges (built-in declarations, implicit supertypes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId(u32);

impl FileId {
    /// Creates a new `FileId` with the given value.
    #[must_use]
    pub const fn new(id: u32) -> Self { Self(id) }

    /// The file id used for ranges that do not come from any real file.
    #[must_use]
    pub const fn synthetic() -> Self { Self(0) }

    /// Returns the inner value of the `FileId`.
    #[must_use]
    pub const fn value(self) -> u32 { self.0 }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "file:{}", self.0) }
}

/// A byte range within a single source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    /// Start offset (inclusive)
    pub start: usize,
    /// End offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Creates a new span with the given start and end offsets.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self { Self { start, end } }

    /// Merges two spans, creating a new span that covers both.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        Self::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl Default for Span {
    fn default() -> Self { Self::new(0, 0) }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self { Self { start: range.start, end: range.end } }
}

impl From<Span> for Range<usize> {
    fn from(span: Span) -> Self { span.start..span.end }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A span together with the file it belongs to.
///
/// This is the location unit carried by AST nodes and diagnostics. A
/// default-constructed range is synthetic and points at no real source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceRange {
    /// The file the span refers into
    pub file: FileId,
    /// The byte range within the file
    pub span: Span,
}

impl SourceRange {
    /// Creates a new source range.
    #[must_use]
    pub const fn new(file: FileId, span: Span) -> Self { Self { file, span } }

    /// A range that points at no real source text.
    #[must_use]
    pub const fn synthetic() -> Self {
        Self { file: FileId::synthetic(), span: Span::new(0, 0) }
    }

    /// Returns true if this range does not point into any real file.
    #[must_use]
    pub const fn is_synthetic(&self) -> bool { self.file.value() == 0 }

    /// Creates a range covering both inputs.
    ///
    /// ## Panics
    ///
    /// Panics if the ranges are from different (non-synthetic) files.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        if self.is_synthetic() {
            return *other;
        }
        if other.is_synthetic() {
            return *self;
        }
        assert_eq!(self.file, other.file, "cannot merge ranges from different files");
        Self { file: self.file, span: self.span.merge(&other.span) }
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.span)
    }
}

impl Default for FileId {
    fn default() -> Self { Self::synthetic() }
}

/// A source file representation.
///
/// Contains the content of the file, its name, and precomputed line start
/// positions for efficient line/column lookup.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Identifier of the file
    pub id: FileId,
    /// Name of the file (usually a path)
    pub name: String,
    /// Content of the file
    pub content: String,
    /// Byte offsets of line starts (first entry is always 0)
    line_starts: Vec<usize>,
}

impl SourceFile {
    /// Creates a new source file with the given id, name, and content.
    #[must_use]
    pub fn new(id: FileId, name: String, content: String) -> Self {
        let line_starts = Self::compute_line_starts(&content);
        Self { id, name, content, line_starts }
    }

    /// Computes the byte offsets of all line starts in the content.
    fn compute_line_starts(content: &str) -> Vec<usize> {
        let mut line_starts = vec![0];
        for (i, c) in content.char_indices() {
            if c == '\n' {
                line_starts.push(i + 1);
            }
        }
        line_starts
    }

    /// Converts a byte offset to a 1-indexed (line, column) pair.
    ///
    /// ## Panics
    ///
    /// Panics if the byte offset is past the end of the file.
    #[must_use]
    pub fn line_column(&self, offset: usize) -> (usize, usize) {
        assert!(
            offset <= self.content.len(),
            "byte offset {} out of range for file with length {}",
            offset,
            self.content.len()
        );
        match self.line_starts.binary_search(&offset) {
            // Exact match means it's at the start of a line
            Ok(line) => (line + 1, 1),
            // No exact match, `line` is the insertion point (we're on line - 1)
            Err(line) => {
                let line = line - 1;
                let column = offset - self.line_starts[line] + 1;
                (line + 1, column)
            }
        }
    }

    /// Returns the text at the given span.
    ///
    /// ## Panics
    ///
    /// Panics if the span's range is invalid for this file.
    #[must_use]
    pub fn text_at(&self, span: Span) -> &str { &self.content[span.start..span.end] }
}

/// A manager for source files.
///
/// The `SourceManager` keeps track of all source files and assigns unique
/// [`FileId`]s to them. Id 0 is never handed out; it is the synthetic file.
#[derive(Debug, Default)]
pub struct SourceManager {
    /// Map from `FileId` to `SourceFile`
    files: FxHashMap<FileId, SourceFile>,
    /// Next available file id (0 is reserved)
    next_id: u32,
}

impl SourceManager {
    /// Creates a new empty `SourceManager`.
    #[must_use]
    pub fn new() -> Self { Self { files: FxHashMap::default(), next_id: 1 } }

    /// Adds a new source file and returns its `FileId`.
    pub fn add_file(&mut self, name: String, content: String) -> FileId {
        let id = FileId::new(self.next_id);
        self.next_id += 1;
        let _ = self.files.insert(id, SourceFile::new(id, name, content));
        id
    }

    /// Returns the source file with the given id, if it exists.
    #[must_use]
    pub fn file(&self, id: FileId) -> Option<&SourceFile> { self.files.get(&id) }

    /// Returns the text at the given range, if the file exists.
    #[must_use]
    pub fn text_at(&self, range: SourceRange) -> Option<&str> {
        self.file(range.file).map(|file| file.text_at(range.span))
    }

    /// Returns the number of files registered.
    #[must_use]
    pub fn file_count(&self) -> usize { self.files.len() }
}
