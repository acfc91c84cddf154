//! Core domain logic for Folio block documents.
//! This crate is the single source of truth for document, link and version
//! invariants.

pub mod config;
pub mod db;
pub mod link;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use db::{open_configured, open_db, open_db_in_memory, DbError};
pub use link::detector::{LinkCandidate, LinkDetector, MatchKind};
pub use link::markup::{
    extract_links, link_first_occurrence, link_markup, link_selection, SmartLink,
};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::block::{
    Block, BlockId, BlockTree, BlockTreeValidationError, BlockType, EditorKey, KeyOutcome,
};
pub use model::document::{
    Document, DocumentId, DocumentTemplate, DocumentTitle, DocumentUpdate, NewDocument, Session,
    Snapshot,
};
pub use model::version::{DocumentVersion, SnapshotError, VersionId, VersionInput};
pub use repo::document_repo::{DocumentListQuery, DocumentRepository, SqliteDocumentRepository};
pub use repo::version_repo::{SqliteVersionRepository, VersionRepository};
pub use repo::{RepoError, RepoResult};
pub use service::document_service::{
    DocumentListResult, DocumentService, DocumentServiceError, DocumentServiceResult,
    ThumbnailRenderer,
};
pub use service::snapshot_diff::{diff_snapshots, BlockChange, FieldChange, SnapshotDiff};
pub use service::time_machine::{Selection, TimeMachine, ViewMode};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
