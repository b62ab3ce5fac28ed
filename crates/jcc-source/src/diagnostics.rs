//! Diagnostic collection.
//!
//! Semantic passes report every error they find and keep traversing, so a
//! single run can surface many problems. The [`DiagnosticEngine`] is the
//! sink for those reports; rendering the collected diagnostics for a user is
//! the driver's job, not ours.

use std::fmt;

use crate::types::SourceRange;

/// The maximum number of source ranges a diagnostic may carry.
pub const MAX_RANGES: usize = 3;

/// The maximum number of inline arguments a diagnostic may carry.
pub const MAX_ARGS: usize = 10;

/// An inline argument attached to a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagArg {
    /// A textual argument (a name, a rendered type, ...)
    Text(String),
    /// An integer argument (an index, a count, ...)
    Int(i64),
}

impl fmt::Display for DiagArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Int(n) => write!(f, "{n}"),
        }
    }
}

impl From<String> for DiagArg {
    fn from(s: String) -> Self { Self::Text(s) }
}

impl From<&str> for DiagArg {
    fn from(s: &str) -> Self { Self::Text(s.to_string()) }
}

impl From<i64> for DiagArg {
    fn from(n: i64) -> Self { Self::Int(n) }
}

/// A single collected diagnostic.
///
/// Carries a stable machine-readable code, a rendered message, up to
/// [`MAX_RANGES`] source ranges (the first is the primary location) and up
/// to [`MAX_ARGS`] inline arguments.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Stable machine-readable code, e.g. `"unresolved-type"`
    pub code: &'static str,
    /// Human-readable message
    pub message: String,
    /// Source ranges; the first is the primary location
    ranges: Vec<SourceRange>,
    /// Inline arguments
    args: Vec<DiagArg>,
}

impl Diagnostic {
    /// Creates a new diagnostic with a primary range.
    #[must_use]
    pub fn new(code: &'static str, message: String, primary: SourceRange) -> Self {
        Self { code, message, ranges: vec![primary], args: Vec::new() }
    }

    /// Attaches a secondary range. Ranges past [`MAX_RANGES`] are dropped.
    #[must_use]
    pub fn with_range(mut self, range: SourceRange) -> Self {
        if self.ranges.len() < MAX_RANGES {
            self.ranges.push(range);
        }
        self
    }

    /// Attaches an inline argument. Arguments past [`MAX_ARGS`] are dropped.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<DiagArg>) -> Self {
        if self.args.len() < MAX_ARGS {
            self.args.push(arg.into());
        }
        self
    }

    /// Returns the primary source range.
    #[must_use]
    pub fn primary_range(&self) -> SourceRange { self.ranges[0] }

    /// Returns all attached ranges.
    #[must_use]
    pub fn ranges(&self) -> &[SourceRange] { &self.ranges }

    /// Returns all attached arguments.
    #[must_use]
    pub fn args(&self) -> &[DiagArg] { &self.args }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for range in &self.ranges {
            write!(f, "{range} ")?;
        }
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Collects diagnostics across compiler passes.
///
/// Reporting never aborts anything; passes that must not run over a broken
/// program consult [`DiagnosticEngine::has_errors`] before mutating.
#[derive(Debug, Default)]
pub struct DiagnosticEngine {
    errors: Vec<Diagnostic>,
}

impl DiagnosticEngine {
    /// Creates a new empty engine.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Records an error diagnostic.
    pub fn report(&mut self, diagnostic: Diagnostic) { self.errors.push(diagnostic); }

    /// Returns true if any error has been reported.
    #[must_use]
    pub fn has_errors(&self) -> bool { !self.errors.is_empty() }

    /// Returns the number of reported errors.
    #[must_use]
    pub fn error_count(&self) -> usize { self.errors.len() }

    /// Returns all reported errors in report order.
    #[must_use]
    pub fn errors(&self) -> &[Diagnostic] { &self.errors }
}
