//! Time machine navigation over one document's version log.
//!
//! # Responsibility
//! - Map the scrubber position (0..=100) to a stored version or "live".
//! - Step, jump and select across versions for timeline/grid/compare views.
//!
//! # Invariants
//! - Position 100 is the live document, never a stored version.
//! - For position `p < 100` the selected index is
//!   `floor((count - 1) * p / 100)`.
//! - `next`/`previous` never leave `[0, count - 1]`; `previous` from live
//!   selects the newest version.
//! - Restoring is not done here; see `DocumentService::restore_version`.

use crate::model::document::Snapshot;
use crate::model::version::{DocumentVersion, SnapshotError, VersionId};
use crate::service::snapshot_diff::{diff_snapshots, SnapshotDiff};

/// Scrubber position of the live document.
pub const LIVE_POSITION: u8 = 100;

/// Alternative renderings of the same selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    Timeline,
    Grid,
    Compare,
}

/// Current selection of the navigator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Live,
    /// Index into the chronological version list.
    Version(usize),
}

/// Navigator state over an immutable version list.
#[derive(Debug, Clone)]
pub struct TimeMachine {
    versions: Vec<DocumentVersion>,
    selection: Selection,
    view_mode: ViewMode,
}

impl TimeMachine {
    /// Starts at the live document in timeline mode.
    ///
    /// `versions` must be in chronological order, as returned by
    /// `VersionRepository::list_versions`.
    pub fn new(versions: Vec<DocumentVersion>) -> Self {
        Self {
            versions,
            selection: Selection::Live,
            view_mode: ViewMode::default(),
        }
    }

    pub fn versions(&self) -> &[DocumentVersion] {
        &self.versions
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn is_live(&self) -> bool {
        self.selection == Selection::Live
    }

    /// Selected index, `None` while live.
    pub fn selected_index(&self) -> Option<usize> {
        match self.selection {
            Selection::Live => None,
            Selection::Version(index) => Some(index),
        }
    }

    pub fn selected_version(&self) -> Option<&DocumentVersion> {
        self.selected_index()
            .and_then(|index| self.versions.get(index))
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    /// Scrubber position for the current selection.
    ///
    /// Returns the smallest position that maps back to the selected index.
    ///
    /// The newest version has no such position below 100 and reports 99.
    /// `set_position(99)` selects the second newest version when there are
    /// more than two, so this value does not round-trip for the newest
    /// version. Keep the selection itself (`selected_index`) as the source of
    /// truth and use the position only to draw the scrubber.
    pub fn position(&self) -> u8 {
        match self.selection {
            Selection::Live => LIVE_POSITION,
            Selection::Version(index) => {
                let span = self.versions.len().saturating_sub(1);
                if span == 0 {
                    return 0;
                }
                let position = (index * 100).div_ceil(span);
                u8::try_from(position.min(99)).unwrap_or(99)
            }
        }
    }

    /// Moves the scrubber. Values above 100 are clamped to live.
    pub fn set_position(&mut self, position: u8) {
        self.selection = index_for_position(self.versions.len(), position)
            .map_or(Selection::Live, Selection::Version);
    }

    /// Steps to the next (newer) version, staying at the newest one.
    pub fn next(&mut self) {
        if let Selection::Version(index) = self.selection {
            let last = self.versions.len().saturating_sub(1);
            self.selection = Selection::Version((index + 1).min(last));
        }
    }

    /// Steps to the previous (older) version. From live, selects the newest.
    pub fn previous(&mut self) {
        self.selection = match self.selection {
            Selection::Live if self.versions.is_empty() => Selection::Live,
            Selection::Live => Selection::Version(self.versions.len() - 1),
            Selection::Version(index) => Selection::Version(index.saturating_sub(1)),
        };
    }

    pub fn jump_to_live(&mut self) {
        self.selection = Selection::Live;
    }

    /// Selects a version by id (grid or compare click).
    ///
    /// Returns `false` and keeps the selection when the id is unknown.
    pub fn select_version(&mut self, version_id: VersionId) -> bool {
        match self
            .versions
            .iter()
            .position(|version| version.id == version_id)
        {
            Some(index) => {
                self.selection = Selection::Version(index);
                true
            }
            None => false,
        }
    }

    /// Diff from the selected version to `live`. `None` while live.
    pub fn compare(&self, live: &Snapshot) -> Option<Result<SnapshotDiff, SnapshotError>> {
        let version = self.selected_version()?;
        Some(
            version
                .snapshot()
                .map(|snapshot| diff_snapshots(&snapshot, live)),
        )
    }

    /// Diff from the version before the selected one to the selected one.
    ///
    /// `None` while live or when the first version is selected.
    pub fn compare_with_previous(&self) -> Option<Result<SnapshotDiff, SnapshotError>> {
        let index = self.selected_index()?;
        let older = self.versions.get(index.checked_sub(1)?)?;
        let newer = self.versions.get(index)?;
        Some(older.snapshot().and_then(|before| {
            let after = newer.snapshot()?;
            Ok(diff_snapshots(&before, &after))
        }))
    }
}

/// Maps a scrubber position to a version index; `None` means live.
pub fn index_for_position(version_count: usize, position: u8) -> Option<usize> {
    if version_count == 0 || position >= LIVE_POSITION {
        return None;
    }
    Some((version_count - 1) * usize::from(position) / 100)
}
