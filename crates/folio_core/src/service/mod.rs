//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep UI/transport layers decoupled from storage details.

pub mod document_service;
pub mod snapshot_diff;
pub mod time_machine;
