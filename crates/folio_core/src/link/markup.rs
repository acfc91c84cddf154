//! Smart-link markup: `[anchor](/documents/{id})`.
//!
//! # Responsibility
//! - Render, parse and splice smart links into raw block text.
//!
//! # Invariants
//! - Markup is plain text; it must round-trip through string storage.
//! - Rewrites never touch text outside the targeted span.

use crate::model::document::DocumentId;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use uuid::Uuid;

/// Path prefix every smart-link target starts with.
pub const DOCUMENT_LINK_PREFIX: &str = "/documents/";

static SMART_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\]]+)\]\(/documents/([0-9A-Fa-f-]{36})\)").expect("valid smart link regex")
});

/// One smart link found in block text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartLink {
    pub anchor_text: String,
    pub target_id: DocumentId,
    /// Byte range of the whole markup in the source text.
    pub range: Range<usize>,
}

/// Renders one smart link.
pub fn link_markup(anchor_text: &str, target_id: DocumentId) -> String {
    format!("[{anchor_text}]({DOCUMENT_LINK_PREFIX}{target_id})")
}

/// Extracts smart links in source order. Malformed targets are skipped.
pub fn extract_links(content: &str) -> Vec<SmartLink> {
    SMART_LINK_RE
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let target_id = Uuid::parse_str(caps.get(2)?.as_str()).ok()?;
            Some(SmartLink {
                anchor_text: caps.get(1)?.as_str().to_string(),
                target_id,
                range: whole.range(),
            })
        })
        .collect()
}

/// Byte ranges already covered by smart-link markup.
pub(crate) fn linked_ranges(content: &str) -> Vec<Range<usize>> {
    SMART_LINK_RE
        .find_iter(content)
        .map(|found| found.range())
        .collect()
}

/// Wraps the selected span `selection` of `content` in a smart link.
///
/// Returns `None` when the selection is empty, out of bounds, not on char
/// boundaries, or overlaps an existing smart link.
pub fn link_selection(
    content: &str,
    selection: Range<usize>,
    target_id: DocumentId,
) -> Option<String> {
    if selection.start >= selection.end
        || selection.end > content.len()
        || !content.is_char_boundary(selection.start)
        || !content.is_char_boundary(selection.end)
    {
        return None;
    }
    let overlaps = linked_ranges(content)
        .iter()
        .any(|linked| linked.start < selection.end && selection.start < linked.end);
    if overlaps {
        return None;
    }

    let anchor = &content[selection.clone()];
    let mut rewritten = String::with_capacity(content.len() + 52);
    rewritten.push_str(&content[..selection.start]);
    rewritten.push_str(&link_markup(anchor, target_id));
    rewritten.push_str(&content[selection.end..]);
    Some(rewritten)
}

/// Links the first literal occurrence of `anchor_text`.
///
/// Leaves `content` unchanged when the anchor does not occur. Prefer
/// [`link_selection`] when the caller knows the selected offsets; this form
/// relinks the earliest duplicate.
pub fn link_first_occurrence(content: &str, anchor_text: &str, target_id: DocumentId) -> String {
    if anchor_text.is_empty() {
        return content.to_string();
    }
    match content.find(anchor_text) {
        Some(start) => link_selection(content, start..start + anchor_text.len(), target_id)
            .unwrap_or_else(|| content.to_string()),
        None => content.to_string(),
    }
}
