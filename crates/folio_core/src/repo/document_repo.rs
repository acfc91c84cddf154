//! Document repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist documents with their block tree as an opaque JSON string.
//! - Serve the workspace title index used by link detection and search.
//!
//! # Invariants
//! - Write paths call `BlockTree::validate()` before SQL mutations.
//! - Updates replace every mutable field at once (no partial patches).
//! - Lists are ordered by `updated_at DESC, uuid ASC`.
//! - Documents are never hard-deleted here.

use crate::db::now_epoch_ms;
use crate::link::markup::DOCUMENT_LINK_PREFIX;
use crate::model::block::BlockTree;
use crate::model::document::{Document, DocumentId, DocumentTitle, DocumentUpdate};
use crate::repo::{
    bool_to_int, ensure_connection_ready, parse_flag, parse_uuid, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const DOCUMENT_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    blocks,
    emoji,
    cover_image,
    is_favorite,
    is_starred,
    created_by,
    organization_id,
    parent_uuid,
    created_at,
    updated_at
FROM documents";

/// Filter and pagination options for document lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentListQuery {
    pub organization_id: Option<String>,
    pub parent_id: Option<DocumentId>,
    pub favorites_only: bool,
    pub starred_only: bool,
    /// Maximum rows. `None` returns every match.
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for documents.
pub trait DocumentRepository {
    /// Inserts one document and returns its id.
    fn create_document(&self, document: &Document) -> RepoResult<DocumentId>;
    /// Loads one document.
    fn get_document(&self, id: DocumentId) -> RepoResult<Option<Document>>;
    /// Replaces mutable fields and bumps `updated_at`.
    fn update_document(&self, id: DocumentId, update: &DocumentUpdate) -> RepoResult<()>;
    fn list_documents(&self, query: &DocumentListQuery) -> RepoResult<Vec<Document>>;
    /// Returns the `{id, title}` index of every document.
    fn list_all_titles(&self) -> RepoResult<Vec<DocumentTitle>>;
    /// Case-insensitive substring match over titles.
    fn search_documents_by_text(&self, text: &str) -> RepoResult<Vec<DocumentTitle>>;
    /// Documents whose blocks contain a smart link to `target`.
    fn find_documents_linking_to(&self, target: DocumentId) -> RepoResult<Vec<DocumentTitle>>;
}

/// SQLite-backed document repository.
pub struct SqliteDocumentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl DocumentRepository for SqliteDocumentRepository<'_> {
    fn create_document(&self, document: &Document) -> RepoResult<DocumentId> {
        document.blocks.validate()?;
        let blocks = document.blocks.to_json()?;
        self.conn.execute(
            "INSERT INTO documents (
                uuid,
                title,
                blocks,
                emoji,
                cover_image,
                is_favorite,
                is_starred,
                created_by,
                organization_id,
                parent_uuid,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
            params![
                document.id.to_string(),
                document.title.as_str(),
                blocks,
                document.emoji.as_deref(),
                document.cover_image.as_deref(),
                bool_to_int(document.is_favorite),
                bool_to_int(document.is_starred),
                document.created_by.as_str(),
                document.organization_id.as_str(),
                document.parent_id.map(|id| id.to_string()),
                document.created_at,
                document.updated_at,
            ],
        )?;
        Ok(document.id)
    }

    fn get_document(&self, id: DocumentId) -> RepoResult<Option<Document>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{DOCUMENT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_document_row(row)?));
        }
        Ok(None)
    }

    fn update_document(&self, id: DocumentId, update: &DocumentUpdate) -> RepoResult<()> {
        update.blocks.validate()?;
        let blocks = update.blocks.to_json()?;
        let changed = self.conn.execute(
            "UPDATE documents
             SET
                title = ?1,
                blocks = ?2,
                emoji = ?3,
                cover_image = ?4,
                is_favorite = ?5,
                is_starred = ?6,
                updated_at = MAX(?7, updated_at + 1)
             WHERE uuid = ?8;",
            params![
                update.title.as_str(),
                blocks,
                update.emoji.as_deref(),
                update.cover_image.as_deref(),
                bool_to_int(update.is_favorite),
                bool_to_int(update.is_starred),
                now_epoch_ms(),
                id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::DocumentNotFound(id));
        }
        Ok(())
    }

    fn list_documents(&self, query: &DocumentListQuery) -> RepoResult<Vec<Document>> {
        let mut sql = format!("{DOCUMENT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(organization_id) = query.organization_id.as_ref() {
            sql.push_str(" AND organization_id = ?");
            bind_values.push(Value::Text(organization_id.clone()));
        }
        if let Some(parent_id) = query.parent_id {
            sql.push_str(" AND parent_uuid = ?");
            bind_values.push(Value::Text(parent_id.to_string()));
        }
        if query.favorites_only {
            sql.push_str(" AND is_favorite = 1");
        }
        if query.starred_only {
            sql.push_str(" AND is_starred = 1");
        }

        sql.push_str(" ORDER BY updated_at DESC, uuid ASC");

        match query.limit {
            Some(limit) => {
                sql.push_str(" LIMIT ?");
                bind_values.push(Value::Integer(i64::from(limit)));
                if query.offset > 0 {
                    sql.push_str(" OFFSET ?");
                    bind_values.push(Value::Integer(i64::from(query.offset)));
                }
            }
            None if query.offset > 0 => {
                sql.push_str(" LIMIT -1 OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
            None => {}
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            documents.push(parse_document_row(row)?);
        }
        Ok(documents)
    }

    fn list_all_titles(&self) -> RepoResult<Vec<DocumentTitle>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, title
             FROM documents
             ORDER BY updated_at DESC, uuid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut titles = Vec::new();
        while let Some(row) = rows.next()? {
            titles.push(parse_title_row(row)?);
        }
        Ok(titles)
    }

    fn search_documents_by_text(&self, text: &str) -> RepoResult<Vec<DocumentTitle>> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        // SQLite `lower()`/`LIKE` fold ASCII only; fold in Rust instead.
        let titles = self.list_all_titles()?;
        Ok(titles
            .into_iter()
            .filter(|entry| entry.title.to_lowercase().contains(&needle))
            .collect())
    }

    fn find_documents_linking_to(&self, target: DocumentId) -> RepoResult<Vec<DocumentTitle>> {
        let pattern = format!("%]({DOCUMENT_LINK_PREFIX}{target})%");
        let mut stmt = self.conn.prepare(
            "SELECT uuid, title
             FROM documents
             WHERE blocks LIKE ?1
               AND uuid <> ?2
             ORDER BY updated_at DESC, uuid ASC;",
        )?;
        let mut rows = stmt.query(params![pattern, target.to_string()])?;
        let mut titles = Vec::new();
        while let Some(row) = rows.next()? {
            titles.push(parse_title_row(row)?);
        }
        Ok(titles)
    }
}

fn parse_document_row(row: &Row<'_>) -> RepoResult<Document> {
    let uuid_text: String = row.get("uuid")?;
    let id = parse_uuid(&uuid_text, "documents.uuid")?;
    let parent_id = row
        .get::<_, Option<String>>("parent_uuid")?
        .map(|value| parse_uuid(&value, "documents.parent_uuid"))
        .transpose()?;

    let blocks_text: String = row.get("blocks")?;
    let blocks = BlockTree::from_json(&blocks_text).map_err(|err| {
        RepoError::InvalidData(format!("invalid blocks json for document {id}: {err}"))
    })?;

    Ok(Document {
        id,
        title: row.get("title")?,
        blocks,
        emoji: row.get("emoji")?,
        cover_image: row.get("cover_image")?,
        is_favorite: parse_flag(row.get("is_favorite")?, "documents.is_favorite")?,
        is_starred: parse_flag(row.get("is_starred")?, "documents.is_starred")?,
        created_by: row.get("created_by")?,
        organization_id: row.get("organization_id")?,
        parent_id,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_title_row(row: &Row<'_>) -> RepoResult<DocumentTitle> {
    let uuid_text: String = row.get("uuid")?;
    Ok(DocumentTitle {
        id: parse_uuid(&uuid_text, "documents.uuid")?,
        title: row.get("title")?,
    })
}
