//! Document version (snapshot log entry) model.
//!
//! # Invariants
//! - `version_number` is 1-based and equals the entry's position in the
//!   chronological log.
//! - Versions are never mutated once created.
//! - `blocks` holds the serialized block tree; it never aliases the live tree.

use crate::model::block::BlockTree;
use crate::model::document::{DocumentId, Snapshot};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for versions.
pub type VersionId = Uuid;

/// Stored snapshot plus sequence number and creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentVersion {
    pub id: VersionId,
    pub document_id: DocumentId,
    pub version_number: u32,
    pub title: String,
    pub emoji: Option<String>,
    pub cover_image: Option<String>,
    pub blocks: String,
    /// Rendered preview as a data URI. Absent when capture was skipped.
    pub thumbnail: Option<String>,
    /// Epoch milliseconds.
    pub created_at: i64,
}

impl DocumentVersion {
    /// Parses the stored block tree into a displayable snapshot.
    ///
    /// # Errors
    /// - Returns `SnapshotError` when `blocks` is not a valid serialized tree
    ///   or holds no blocks.
    pub fn snapshot(&self) -> Result<Snapshot, SnapshotError> {
        let blocks = BlockTree::from_json(&self.blocks).map_err(|err| SnapshotError {
            version_id: self.id,
            message: err.to_string(),
        })?;
        if blocks.is_empty() {
            return Err(SnapshotError {
                version_id: self.id,
                message: "snapshot holds no blocks".to_string(),
            });
        }
        Ok(Snapshot {
            title: self.title.clone(),
            emoji: self.emoji.clone(),
            cover_image: self.cover_image.clone(),
            blocks,
        })
    }
}

/// Input for appending one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInput {
    pub title: String,
    pub emoji: Option<String>,
    pub cover_image: Option<String>,
    pub blocks: String,
    pub thumbnail: Option<String>,
}

impl VersionInput {
    /// Serializes `snapshot` into a version input without thumbnail.
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self, serde_json::Error> {
        Ok(Self {
            title: snapshot.title.clone(),
            emoji: snapshot.emoji.clone(),
            cover_image: snapshot.cover_image.clone(),
            blocks: snapshot.blocks.to_json()?,
            thumbnail: None,
        })
    }
}

/// A stored snapshot could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotError {
    pub version_id: VersionId,
    pub message: String,
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "malformed snapshot in version {}: {}",
            self.version_id, self.message
        )
    }
}

impl Error for SnapshotError {}

#[cfg(test)]
mod tests {
    use super::DocumentVersion;
    use uuid::Uuid;

    fn version(blocks: &str) -> DocumentVersion {
        DocumentVersion {
            id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            version_number: 1,
            title: "Plan".to_string(),
            emoji: None,
            cover_image: None,
            blocks: blocks.to_string(),
            thumbnail: None,
            created_at: 0,
        }
    }

    #[test]
    fn snapshot_rejects_malformed_blocks() {
        let err = version("{not json").snapshot().unwrap_err();
        assert!(err.to_string().contains("malformed snapshot"));
    }

    #[test]
    fn snapshot_rejects_empty_tree() {
        assert!(version("[]").snapshot().is_err());
    }

    #[test]
    fn snapshot_parses_valid_blocks() {
        let snapshot = version(r#"[{"id":"a","type":"paragraph","content":"hi","children":[]}]"#)
            .snapshot()
            .unwrap();
        assert_eq!(snapshot.title, "Plan");
        assert_eq!(snapshot.blocks.len(), 1);
    }
}
