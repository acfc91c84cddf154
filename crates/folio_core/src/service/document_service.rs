//! Document use-case service.
//!
//! # Responsibility
//! - Create, read and fully replace documents.
//! - Append one version per successful update (best effort).
//! - Restore past versions and build time machine navigators.
//! - Serve the link workflow: title index, target search, backlinks.
//!
//! # Invariants
//! - `update` uses full replacement semantics.
//! - A version records the state that was just saved (post-update).
//! - Version append and thumbnail failures never fail the update.
//! - A malformed snapshot aborts restore before touching the document.

use crate::config::CoreConfig;
use crate::db::now_epoch_ms;
use crate::link::detector::LinkDetector;
use crate::model::block::{BlockTree, BlockTreeValidationError};
use crate::model::document::{
    Document, DocumentId, DocumentTemplate, DocumentTitle, DocumentUpdate, NewDocument, Session,
};
use crate::model::version::{DocumentVersion, SnapshotError, VersionId, VersionInput};
use crate::repo::document_repo::{DocumentListQuery, DocumentRepository};
use crate::repo::version_repo::VersionRepository;
use crate::repo::RepoError;
use crate::service::time_machine::TimeMachine;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

/// Renders a document view to an image for version thumbnails.
///
/// Implemented outside core (UI layer). Failures are tolerated.
pub trait ThumbnailRenderer {
    /// Returns a `data:` URI for the rendered document.
    fn render(&self, document: &Document) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// Service error for document use-cases.
#[derive(Debug)]
pub enum DocumentServiceError {
    /// Target document does not exist.
    DocumentNotFound(DocumentId),
    /// Target version does not exist.
    VersionNotFound(VersionId),
    /// Version belongs to another document.
    VersionMismatch {
        document_id: DocumentId,
        version_id: VersionId,
    },
    /// Block tree rejected before write (e.g. duplicate block ids).
    InvalidBlocks(BlockTreeValidationError),
    /// Stored snapshot cannot be parsed; restore aborted.
    MalformedSnapshot(SnapshotError),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for DocumentServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DocumentNotFound(id) => write!(f, "document not found: {id}"),
            Self::VersionNotFound(id) => write!(f, "document version not found: {id}"),
            Self::VersionMismatch {
                document_id,
                version_id,
            } => write!(
                f,
                "version {version_id} does not belong to document {document_id}"
            ),
            Self::InvalidBlocks(err) => write!(f, "invalid block tree: {err}"),
            Self::MalformedSnapshot(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent document state: {details}")
            }
        }
    }
}

impl Error for DocumentServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidBlocks(err) => Some(err),
            Self::MalformedSnapshot(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for DocumentServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::DocumentNotFound(id) => Self::DocumentNotFound(id),
            RepoError::VersionNotFound(id) => Self::VersionNotFound(id),
            RepoError::Validation(err) => Self::InvalidBlocks(err),
            other => Self::Repo(other),
        }
    }
}

impl From<SnapshotError> for DocumentServiceError {
    fn from(value: SnapshotError) -> Self {
        Self::MalformedSnapshot(value)
    }
}

pub type DocumentServiceResult<T> = Result<T, DocumentServiceError>;

/// List result envelope used by service callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentListResult {
    /// Items sorted by `updated_at DESC, uuid ASC`.
    pub items: Vec<Document>,
    /// Effective normalized limit used by the query.
    pub applied_limit: u32,
}

/// Document service facade over repository implementations.
pub struct DocumentService<D: DocumentRepository, V: VersionRepository> {
    documents: D,
    versions: V,
    config: CoreConfig,
    thumbnails: Option<Box<dyn ThumbnailRenderer>>,
}

impl<D: DocumentRepository, V: VersionRepository> DocumentService<D, V> {
    /// Creates a service with default configuration and no thumbnails.
    pub fn new(documents: D, versions: V) -> Self {
        Self::with_config(documents, versions, CoreConfig::default())
    }

    pub fn with_config(documents: D, versions: V, config: CoreConfig) -> Self {
        Self {
            documents,
            versions,
            config,
            thumbnails: None,
        }
    }

    /// Attaches the external thumbnail renderer.
    pub fn with_thumbnail_renderer(mut self, renderer: Box<dyn ThumbnailRenderer>) -> Self {
        self.thumbnails = Some(renderer);
        self
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Creates one document owned by the acting session.
    ///
    /// Blank titles fall back to the configured default title; an empty
    /// block tree becomes one empty paragraph. No version is recorded.
    pub fn create(
        &self,
        session: &Session,
        input: NewDocument,
    ) -> DocumentServiceResult<Document> {
        let title = input
            .title
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| self.config.default_title.clone());
        let blocks = input
            .blocks
            .filter(|blocks| !blocks.is_empty())
            .unwrap_or_else(BlockTree::single_paragraph);
        let now = now_epoch_ms();

        let document = Document {
            id: Uuid::new_v4(),
            title,
            blocks,
            emoji: input.emoji,
            cover_image: input.cover_image,
            is_favorite: false,
            is_starred: false,
            created_by: session.user_id.clone(),
            organization_id: session.organization_id.clone(),
            parent_id: input.parent_id,
            created_at: now,
            updated_at: now,
        };

        let id = self.documents.create_document(&document)?;
        info!(
            "event=document_create module=service status=ok document_id={} block_count={}",
            id,
            document.blocks.len()
        );
        self.documents
            .get_document(id)?
            .ok_or(DocumentServiceError::InconsistentState(
                "created document not found in read-back",
            ))
    }

    /// Creates one document from a template title and its two seed blocks.
    pub fn create_from_template(
        &self,
        session: &Session,
        template: &DocumentTemplate,
    ) -> DocumentServiceResult<Document> {
        self.create(
            session,
            NewDocument {
                title: Some(template.title.clone()),
                blocks: Some(template.blocks()),
                ..NewDocument::default()
            },
        )
    }

    /// Loads one document, failing with `DocumentNotFound` when absent.
    pub fn get(&self, id: DocumentId) -> DocumentServiceResult<Document> {
        self.documents
            .get_document(id)?
            .ok_or(DocumentServiceError::DocumentNotFound(id))
    }

    /// Fully replaces a document and records the saved state as a version.
    ///
    /// Concurrent updates to one document are last-write-wins.
    pub fn update(
        &self,
        id: DocumentId,
        mut update: DocumentUpdate,
    ) -> DocumentServiceResult<Document> {
        if update.blocks.is_empty() {
            update.blocks = BlockTree::single_paragraph();
        }
        self.documents.update_document(id, &update)?;
        let document = self
            .documents
            .get_document(id)?
            .ok_or(DocumentServiceError::InconsistentState(
                "updated document not found in read-back",
            ))?;

        info!(
            "event=document_update module=service status=ok document_id={} block_count={}",
            id,
            document.blocks.len()
        );
        self.record_version(&document);
        Ok(document)
    }

    /// Flips the favorite flag through a regular update.
    pub fn toggle_favorite(&self, id: DocumentId) -> DocumentServiceResult<Document> {
        let document = self.get(id)?;
        let mut update = DocumentUpdate::from_document(&document);
        update.is_favorite = !document.is_favorite;
        self.update(id, update)
    }

    /// Flips the starred flag through a regular update.
    pub fn toggle_starred(&self, id: DocumentId) -> DocumentServiceResult<Document> {
        let document = self.get(id)?;
        let mut update = DocumentUpdate::from_document(&document);
        update.is_starred = !document.is_starred;
        self.update(id, update)
    }

    /// Lists documents with normalized pagination.
    pub fn list_documents(
        &self,
        mut query: DocumentListQuery,
    ) -> DocumentServiceResult<DocumentListResult> {
        let applied_limit = self.config.normalize_limit(query.limit);
        query.limit = Some(applied_limit);
        let items = self.documents.list_documents(&query)?;
        Ok(DocumentListResult {
            items,
            applied_limit,
        })
    }

    /// Versions of one document in chronological order.
    pub fn list_versions(&self, id: DocumentId) -> DocumentServiceResult<Vec<DocumentVersion>> {
        self.get(id)?;
        Ok(self.versions.list_versions(id)?)
    }

    /// Navigator over the document's version log, starting at live.
    pub fn time_machine(&self, id: DocumentId) -> DocumentServiceResult<TimeMachine> {
        Ok(TimeMachine::new(self.list_versions(id)?))
    }

    /// Restores `version_id` into the live document.
    ///
    /// Title, emoji, cover and blocks come from the version; flags are kept.
    /// The restore is saved as a normal update and therefore appends a new
    /// version. A malformed snapshot aborts before anything is written.
    pub fn restore_version(
        &self,
        id: DocumentId,
        version_id: VersionId,
    ) -> DocumentServiceResult<Document> {
        let version = self
            .versions
            .get_version(version_id)?
            .ok_or(DocumentServiceError::VersionNotFound(version_id))?;
        if version.document_id != id {
            return Err(DocumentServiceError::VersionMismatch {
                document_id: id,
                version_id,
            });
        }

        let snapshot = version.snapshot().map_err(|err| {
            warn!(
                "event=version_restore module=service status=error document_id={} version_id={} error_code=malformed_snapshot",
                id, version_id
            );
            DocumentServiceError::from(err)
        })?;
        let current = self.get(id)?;
        let update = DocumentUpdate::from_document(&current).apply_snapshot(snapshot);

        info!(
            "event=version_restore module=service status=start document_id={} version_number={}",
            id, version.version_number
        );
        self.update(id, update)
    }

    /// `{id, title}` index of every document.
    pub fn list_all_titles(&self) -> DocumentServiceResult<Vec<DocumentTitle>> {
        Ok(self.documents.list_all_titles()?)
    }

    /// Detector compiled from the current workspace title index.
    pub fn link_detector(&self) -> DocumentServiceResult<LinkDetector> {
        Ok(LinkDetector::new(self.list_all_titles()?))
    }

    /// Confirm step of the link workflow: titles containing `text`.
    pub fn search_link_targets(&self, text: &str) -> DocumentServiceResult<Vec<DocumentTitle>> {
        Ok(self.documents.search_documents_by_text(text)?)
    }

    /// Documents whose blocks link to `id`.
    pub fn backlinks(&self, id: DocumentId) -> DocumentServiceResult<Vec<DocumentTitle>> {
        Ok(self.documents.find_documents_linking_to(id)?)
    }

    /// The single permission rule: only the creator owns a document.
    pub fn is_owner(&self, session: &Session, document: &Document) -> bool {
        document.is_owned_by(session)
    }

    fn record_version(&self, document: &Document) {
        let mut input = match VersionInput::from_snapshot(&document.snapshot()) {
            Ok(input) => input,
            Err(err) => {
                warn!(
                    "event=version_create module=service status=error document_id={} error_code=serialize_failed error={}",
                    document.id, err
                );
                return;
            }
        };
        input.thumbnail = self.capture_thumbnail(document);

        match self.versions.create_version(document.id, &input) {
            Ok(version) => info!(
                "event=version_create module=service status=ok document_id={} version_number={} has_thumbnail={}",
                document.id,
                version.version_number,
                version.thumbnail.is_some()
            ),
            Err(err) => warn!(
                "event=version_create module=service status=error document_id={} error_code=append_failed error={}",
                document.id, err
            ),
        }
    }

    fn capture_thumbnail(&self, document: &Document) -> Option<String> {
        let renderer = self.thumbnails.as_ref()?;
        let started_at = Instant::now();
        let rendered = renderer.render(document);
        let elapsed = started_at.elapsed();

        match rendered {
            Ok(_) if elapsed > self.config.thumbnail_budget() => {
                debug!(
                    "event=thumbnail_capture module=service status=skipped document_id={} duration_ms={} reason=over_budget",
                    document.id,
                    elapsed.as_millis()
                );
                None
            }
            Ok(uri) => Some(uri),
            Err(err) => {
                debug!(
                    "event=thumbnail_capture module=service status=skipped document_id={} reason=render_failed error={}",
                    document.id, err
                );
                None
            }
        }
    }
}
