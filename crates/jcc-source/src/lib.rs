//! Source file handling and diagnostics for the JCC compiler.
//!
//! This crate provides the types every other crate in the workspace builds
//! on: file identifiers, byte spans, the source manager, and the diagnostic
//! engine that collects errors without aborting the pass that found them.

pub mod diagnostics;
pub mod types;
