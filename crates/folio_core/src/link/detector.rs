//! Smart-link candidate detection.
//!
//! # Responsibility
//! - Propose link targets for one block's text from the workspace title index.
//!
//! # Invariants
//! - Exact title matches are yielded before heuristic matches.
//! - A heuristic word already covered by an exact match is never yielded.
//! - Spans inside existing smart links are ignored.
//! - An empty workspace yields nothing.

use crate::link::markup::linked_ranges;
use crate::model::document::{DocumentId, DocumentTitle};
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;
use std::ops::Range;

const MIN_MATCH_CHARS: usize = 4;

/// How a candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Known document title occurring in the text.
    Exact { document_id: DocumentId },
    /// Capitalized word that may name a document.
    Heuristic,
}

/// One proposed link anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCandidate {
    /// Literal text as it appears in the block.
    pub anchor_text: String,
    /// Byte range of `anchor_text` in the block text.
    pub range: Range<usize>,
    pub kind: MatchKind,
}

#[derive(Debug)]
struct TitleMatcher {
    title: DocumentTitle,
    folded_words: Vec<String>,
    pattern: Regex,
}

/// Title index compiled for repeated detection passes.
#[derive(Debug)]
pub struct LinkDetector {
    matchers: Vec<TitleMatcher>,
    has_documents: bool,
}

impl LinkDetector {
    /// Builds a detector from the workspace `{id, title}` index.
    ///
    /// Titles of 3 characters or fewer are not matched. When several
    /// documents share a title (ignoring case) the first one wins.
    pub fn new(titles: Vec<DocumentTitle>) -> Self {
        let has_documents = !titles.is_empty();
        let mut seen = HashSet::new();
        let mut matchers = Vec::new();
        for title in titles {
            let trimmed = title.title.trim();
            if trimmed.chars().count() < MIN_MATCH_CHARS {
                continue;
            }
            if !seen.insert(trimmed.to_lowercase()) {
                continue;
            }
            let Ok(pattern) = RegexBuilder::new(&regex::escape(trimmed))
                .case_insensitive(true)
                .build()
            else {
                continue;
            };
            let folded_words = trimmed
                .split(|c: char| !c.is_alphanumeric())
                .filter(|word| !word.is_empty())
                .map(str::to_lowercase)
                .collect();
            matchers.push(TitleMatcher {
                title: DocumentTitle {
                    id: title.id,
                    title: trimmed.to_string(),
                },
                folded_words,
                pattern,
            });
        }
        Self {
            matchers,
            has_documents,
        }
    }

    /// Whether the workspace index had no documents at all.
    pub fn is_empty(&self) -> bool {
        !self.has_documents
    }

    /// Returns a lazy, restartable candidate sequence for `text`.
    pub fn detect<'a>(&'a self, text: &'a str) -> LinkCandidates<'a> {
        let phase = if self.has_documents {
            Phase::Exact { next: 0 }
        } else {
            Phase::Done
        };
        LinkCandidates {
            detector: self,
            text,
            linked: linked_ranges(text),
            matched_words: HashSet::new(),
            seen_words: HashSet::new(),
            phase,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Exact { next: usize },
    Heuristic { cursor: usize },
    Done,
}

/// Iterator over link candidates of one text.
///
/// Cloning restarts from the clone point; calling `LinkDetector::detect`
/// again restarts from the beginning.
#[derive(Debug, Clone)]
pub struct LinkCandidates<'a> {
    detector: &'a LinkDetector,
    text: &'a str,
    linked: Vec<Range<usize>>,
    matched_words: HashSet<String>,
    seen_words: HashSet<String>,
    phase: Phase,
}

impl LinkCandidates<'_> {
    fn overlaps_link(&self, range: &Range<usize>) -> bool {
        self.linked
            .iter()
            .any(|linked| linked.start < range.end && range.start < linked.end)
    }

    fn next_exact(&mut self, index: usize) -> Option<LinkCandidate> {
        let detector = self.detector;
        let matcher = &detector.matchers[index];
        let found = matcher
            .pattern
            .find_iter(self.text)
            .map(|found| found.range())
            .find(|range| !self.overlaps_link(range))?;
        self.matched_words.extend(matcher.folded_words.iter().cloned());
        Some(LinkCandidate {
            anchor_text: self.text[found.clone()].to_string(),
            range: found,
            kind: MatchKind::Exact {
                document_id: matcher.title.id,
            },
        })
    }

    fn is_heuristic_word(&mut self, range: &Range<usize>) -> bool {
        let text = self.text;
        let word = &text[range.clone()];
        let starts_upper = word.chars().next().is_some_and(char::is_uppercase);
        if !starts_upper || word.chars().count() < MIN_MATCH_CHARS {
            return false;
        }
        if self.overlaps_link(range) {
            return false;
        }
        let folded = word.to_lowercase();
        if self.matched_words.contains(&folded) {
            return false;
        }
        self.seen_words.insert(folded)
    }
}

impl Iterator for LinkCandidates<'_> {
    type Item = LinkCandidate;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.phase {
                Phase::Exact { next } => {
                    if next >= self.detector.matchers.len() {
                        self.phase = Phase::Heuristic { cursor: 0 };
                        continue;
                    }
                    self.phase = Phase::Exact { next: next + 1 };
                    if let Some(candidate) = self.next_exact(next) {
                        return Some(candidate);
                    }
                }
                Phase::Heuristic { cursor } => {
                    let Some(range) = next_word(self.text, cursor) else {
                        self.phase = Phase::Done;
                        return None;
                    };
                    self.phase = Phase::Heuristic { cursor: range.end };
                    if self.is_heuristic_word(&range) {
                        return Some(LinkCandidate {
                            anchor_text: self.text[range.clone()].to_string(),
                            range,
                            kind: MatchKind::Heuristic,
                        });
                    }
                }
                Phase::Done => return None,
            }
        }
    }
}

fn next_word(text: &str, cursor: usize) -> Option<Range<usize>> {
    let rest = text.get(cursor..)?;
    let start = rest.find(char::is_alphanumeric)?;
    let word = &rest[start..];
    let len = word
        .find(|c: char| !c.is_alphanumeric())
        .unwrap_or(word.len());
    Some(cursor + start..cursor + start + len)
}

#[cfg(test)]
mod tests {
    use super::{LinkDetector, MatchKind};
    use crate::link::markup::link_markup;
    use crate::model::document::DocumentTitle;
    use uuid::Uuid;

    fn titles(names: &[&str]) -> Vec<DocumentTitle> {
        names
            .iter()
            .map(|name| DocumentTitle {
                id: Uuid::new_v4(),
                title: name.to_string(),
            })
            .collect()
    }

    fn anchors(detector: &LinkDetector, text: &str) -> Vec<String> {
        detector
            .detect(text)
            .map(|candidate| candidate.anchor_text)
            .collect()
    }

    #[test]
    fn exact_matches_suppress_heuristic_duplicates() {
        let detector = LinkDetector::new(titles(&["Project Alpha", "Roadmap"]));
        let found = detector
            .detect("See Project Alpha for the Roadmap details")
            .collect::<Vec<_>>();
        let names = found
            .iter()
            .map(|candidate| candidate.anchor_text.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Project Alpha", "Roadmap"]);
        assert!(found
            .iter()
            .all(|candidate| matches!(candidate.kind, MatchKind::Exact { .. })));
    }

    #[test]
    fn exact_match_is_case_insensitive_and_keeps_source_casing() {
        let detector = LinkDetector::new(titles(&["Roadmap"]));
        assert_eq!(anchors(&detector, "check the ROADMAP"), vec!["ROADMAP"]);
    }

    #[test]
    fn short_titles_are_ignored() {
        let detector = LinkDetector::new(titles(&["API"]));
        assert!(anchors(&detector, "the API is live").is_empty());
    }

    #[test]
    fn heuristic_yields_capitalized_words_once() {
        let detector = LinkDetector::new(titles(&["Roadmap"]));
        let found = detector
            .detect("Ask Maria about Budget and Budget again")
            .collect::<Vec<_>>();
        let names = found
            .iter()
            .map(|candidate| candidate.anchor_text.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Maria", "Budget"]);
        assert!(found
            .iter()
            .all(|candidate| candidate.kind == MatchKind::Heuristic));
    }

    #[test]
    fn empty_workspace_yields_nothing() {
        let detector = LinkDetector::new(Vec::new());
        assert!(detector.is_empty());
        assert!(anchors(&detector, "Project Alpha Roadmap").is_empty());
    }

    #[test]
    fn existing_links_are_skipped() {
        let index = titles(&["Roadmap"]);
        let linked = link_markup("Roadmap", index[0].id);
        let detector = LinkDetector::new(index);
        assert!(anchors(&detector, &format!("see {linked}")).is_empty());
    }

    #[test]
    fn candidates_restart_from_clone() {
        let detector = LinkDetector::new(titles(&["Roadmap"]));
        let text = "Roadmap and Budget";
        let mut first = detector.detect(text);
        let fresh = first.clone();
        assert!(first.next().is_some());
        assert_eq!(fresh.count(), 2);
    }
}
