//! Document domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep block editing pure: no storage or logging in this layer.
//!
//! # Invariants
//! - Every document and version is identified by a stable UUID.
//! - Versions own immutable copies of past block trees.

pub mod block;
pub mod document;
pub mod version;
