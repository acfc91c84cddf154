//! Version log repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Append immutable document snapshots and list them chronologically.
//!
//! # Invariants
//! - `version_number` is `count + 1` at append time, starting at 1.
//! - Count read and insert run in one `IMMEDIATE` transaction, so appends to
//!   one document are serialized; `UNIQUE(document_uuid, version_number)`
//!   rejects any lost-append race that slips through.
//! - Stored versions are never updated or deleted.

use crate::db::now_epoch_ms;
use crate::model::document::DocumentId;
use crate::model::version::{DocumentVersion, VersionId, VersionInput};
use crate::repo::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const VERSION_SELECT_SQL: &str = "SELECT
    uuid,
    document_uuid,
    version_number,
    title,
    emoji,
    cover_image,
    blocks,
    thumbnail,
    created_at
FROM document_versions";

/// Repository interface for the append-only version log.
pub trait VersionRepository {
    /// Appends one snapshot and returns the stored version.
    fn create_version(
        &self,
        document_id: DocumentId,
        input: &VersionInput,
    ) -> RepoResult<DocumentVersion>;
    /// Lists versions ordered by `version_number ASC`.
    fn list_versions(&self, document_id: DocumentId) -> RepoResult<Vec<DocumentVersion>>;
    fn get_version(&self, version_id: VersionId) -> RepoResult<Option<DocumentVersion>>;
    fn count_versions(&self, document_id: DocumentId) -> RepoResult<u32>;
}

/// SQLite-backed version repository.
pub struct SqliteVersionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVersionRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl VersionRepository for SqliteVersionRepository<'_> {
    fn create_version(
        &self,
        document_id: DocumentId,
        input: &VersionInput,
    ) -> RepoResult<DocumentVersion> {
        let document_uuid = document_id.to_string();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM documents WHERE uuid = ?1);",
            [document_uuid.as_str()],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::DocumentNotFound(document_id));
        }

        let version_number: u32 = tx.query_row(
            "SELECT COALESCE(MAX(version_number), 0) + 1
             FROM document_versions
             WHERE document_uuid = ?1;",
            [document_uuid.as_str()],
            |row| row.get(0),
        )?;

        let version = DocumentVersion {
            id: Uuid::new_v4(),
            document_id,
            version_number,
            title: input.title.clone(),
            emoji: input.emoji.clone(),
            cover_image: input.cover_image.clone(),
            blocks: input.blocks.clone(),
            thumbnail: input.thumbnail.clone(),
            created_at: now_epoch_ms(),
        };

        tx.execute(
            "INSERT INTO document_versions (
                uuid,
                document_uuid,
                version_number,
                title,
                emoji,
                cover_image,
                blocks,
                thumbnail,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                version.id.to_string(),
                document_uuid,
                version.version_number,
                version.title.as_str(),
                version.emoji.as_deref(),
                version.cover_image.as_deref(),
                version.blocks.as_str(),
                version.thumbnail.as_deref(),
                version.created_at,
            ],
        )?;
        tx.commit()?;

        Ok(version)
    }

    fn list_versions(&self, document_id: DocumentId) -> RepoResult<Vec<DocumentVersion>> {
        let mut stmt = self.conn.prepare(&format!(
            "{VERSION_SELECT_SQL}
             WHERE document_uuid = ?1
             ORDER BY version_number ASC;"
        ))?;
        let mut rows = stmt.query([document_id.to_string()])?;
        let mut versions = Vec::new();
        while let Some(row) = rows.next()? {
            versions.push(parse_version_row(row)?);
        }
        Ok(versions)
    }

    fn get_version(&self, version_id: VersionId) -> RepoResult<Option<DocumentVersion>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{VERSION_SELECT_SQL} WHERE uuid = ?1;"))?;
        stmt.query_row([version_id.to_string()], |row| Ok(parse_version_row(row)))
            .optional()?
            .transpose()
    }

    fn count_versions(&self, document_id: DocumentId) -> RepoResult<u32> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM document_versions WHERE document_uuid = ?1;",
            [document_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn parse_version_row(row: &Row<'_>) -> RepoResult<DocumentVersion> {
    let uuid_text: String = row.get("uuid")?;
    let document_text: String = row.get("document_uuid")?;
    let version_number: i64 = row.get("version_number")?;
    let version_number = u32::try_from(version_number)
        .ok()
        .filter(|value| *value >= 1)
        .ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid version_number `{version_number}` in document_versions.version_number"
            ))
        })?;

    Ok(DocumentVersion {
        id: parse_uuid(&uuid_text, "document_versions.uuid")?,
        document_id: parse_uuid(&document_text, "document_versions.document_uuid")?,
        version_number,
        title: row.get("title")?,
        emoji: row.get("emoji")?,
        cover_image: row.get("cover_image")?,
        blocks: row.get("blocks")?,
        thumbnail: row.get("thumbnail")?,
        created_at: row.get("created_at")?,
    })
}
