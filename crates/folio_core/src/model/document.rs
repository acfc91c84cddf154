//! Document aggregate model.
//!
//! # Responsibility
//! - Define the persisted document record and its create/update inputs.
//! - Provide the displayable `Snapshot` projection shared with versions.
//!
//! # Invariants
//! - `id` is stable and never reused.
//! - `blocks` always holds at least one block after `NewDocument` resolution.
//! - Updates are full replacements; there are no partial patches.

use crate::model::block::{Block, BlockTree, BlockType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for documents.
pub type DocumentId = Uuid;

/// Acting user context supplied by the external auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub organization_id: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>, organization_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            organization_id: organization_id.into(),
        }
    }
}

/// Persisted document record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub blocks: BlockTree,
    pub emoji: Option<String>,
    pub cover_image: Option<String>,
    pub is_favorite: bool,
    pub is_starred: bool,
    pub created_by: String,
    pub organization_id: String,
    pub parent_id: Option<DocumentId>,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl Document {
    /// Displayable state of the live document. Owns a copy of the blocks.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            title: self.title.clone(),
            emoji: self.emoji.clone(),
            cover_image: self.cover_image.clone(),
            blocks: self.blocks.clone(),
        }
    }

    /// The boolean owner check; the only permission rule modeled in core.
    pub fn is_owned_by(&self, session: &Session) -> bool {
        self.created_by == session.user_id
    }
}

/// Lightweight `{id, title}` projection used by link detection and search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTitle {
    pub id: DocumentId,
    pub title: String,
}

/// Complete, immutable copy of a document's displayable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub title: String,
    pub emoji: Option<String>,
    pub cover_image: Option<String>,
    pub blocks: BlockTree,
}

/// Caller input for document creation.
///
/// Blank titles and empty block trees are resolved by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewDocument {
    pub title: Option<String>,
    pub blocks: Option<BlockTree>,
    pub emoji: Option<String>,
    pub cover_image: Option<String>,
    pub parent_id: Option<DocumentId>,
}

impl NewDocument {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

/// Full-replace update input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpdate {
    pub title: String,
    pub blocks: BlockTree,
    pub emoji: Option<String>,
    pub cover_image: Option<String>,
    pub is_favorite: bool,
    pub is_starred: bool,
}

impl DocumentUpdate {
    /// Starts an update from the current document state.
    pub fn from_document(document: &Document) -> Self {
        Self {
            title: document.title.clone(),
            blocks: document.blocks.clone(),
            emoji: document.emoji.clone(),
            cover_image: document.cover_image.clone(),
            is_favorite: document.is_favorite,
            is_starred: document.is_starred,
        }
    }

    /// Replaces the displayable fields with `snapshot`, keeping flags.
    pub fn apply_snapshot(mut self, snapshot: Snapshot) -> Self {
        self.title = snapshot.title;
        self.emoji = snapshot.emoji;
        self.cover_image = snapshot.cover_image;
        self.blocks = snapshot.blocks;
        self
    }
}

/// Title plus two seed blocks used to start a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTemplate {
    pub title: String,
    pub seed: [Block; 2],
}

impl DocumentTemplate {
    pub fn new(title: impl Into<String>, first: Block, second: Block) -> Self {
        Self {
            title: title.into(),
            seed: [first, second],
        }
    }

    /// Heading repeating the title followed by an empty paragraph.
    pub fn titled(title: impl Into<String>) -> Self {
        let title = title.into();
        let heading = Block::new(BlockType::Heading1, title.clone());
        Self::new(title, heading, Block::new_paragraph())
    }

    /// Materializes the seed blocks with fresh ids.
    pub fn blocks(&self) -> BlockTree {
        let blocks = self
            .seed
            .iter()
            .map(|block| {
                let mut fresh = Block::new(block.kind, block.content.clone());
                fresh.done = block.done;
                fresh
            })
            .collect::<Vec<_>>();
        BlockTree::new(blocks)
    }
}
