//! Smart links between documents.
//!
//! # Responsibility
//! - Detect candidate link anchors in block text.
//! - Render and parse the `[anchor](/documents/{id})` markup.
//!
//! # Invariants
//! - The markdown-style markup is the only text format contract of core.

pub mod detector;
pub mod markup;
