//! Block tree domain model.
//!
//! # Responsibility
//! - Define the typed content unit (`Block`) that composes one document.
//! - Provide in-place mutations over the ordered top-level block sequence.
//! - Encode the keyboard-driven edit policy (Enter / Backspace).
//!
//! # Invariants
//! - Block ids are unique within one document.
//! - A document always keeps at least one block; `delete` refuses to remove
//!   the last remaining block.
//! - Mutations targeting an unknown id are silent no-ops (return `false`).
//! - Only depth 0 is edited; `children` is carried through untouched.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Block identifier. Plain string so legacy ids survive round-trips.
pub type BlockId = String;

const TODO_DONE_MARKER: &str = "[x]";
const TODO_OPEN_MARKER: &str = "[ ]";

/// Block content category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockType {
    #[serde(rename = "paragraph")]
    Paragraph,
    #[serde(rename = "heading-1")]
    Heading1,
    #[serde(rename = "heading-2")]
    Heading2,
    #[serde(rename = "heading-3")]
    Heading3,
    #[serde(rename = "bullet-list")]
    BulletList,
    #[serde(rename = "numbered-list")]
    NumberedList,
    #[serde(rename = "todo-list")]
    TodoList,
    #[serde(rename = "code")]
    Code,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "table")]
    Table,
}

impl BlockType {
    /// Stable wire name, identical to the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Heading1 => "heading-1",
            Self::Heading2 => "heading-2",
            Self::Heading3 => "heading-3",
            Self::BulletList => "bullet-list",
            Self::NumberedList => "numbered-list",
            Self::TodoList => "todo-list",
            Self::Code => "code",
            Self::Image => "image",
            Self::Table => "table",
        }
    }
}

/// One typed, independently editable unit of document content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredBlock", into = "StoredBlock")]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockType,
    /// Raw text. May embed smart links `[text](/documents/{id})`.
    pub content: String,
    /// Reserved nested structure. Always present, never edited here.
    pub children: Vec<Block>,
    /// Completion flag, meaningful only for `BlockType::TodoList`.
    pub done: bool,
}

/// At-rest block shape.
///
/// `done` is always written for todo blocks. A todo block read without it
/// predates the flag and carries its state as a leading content marker.
#[derive(Serialize, Deserialize)]
struct StoredBlock {
    id: BlockId,
    #[serde(rename = "type")]
    kind: BlockType,
    content: String,
    #[serde(default)]
    children: Vec<Block>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    done: Option<bool>,
}

impl From<StoredBlock> for Block {
    fn from(stored: StoredBlock) -> Self {
        let mut block = Self {
            id: stored.id,
            kind: stored.kind,
            content: stored.content,
            children: stored.children,
            done: stored.done.unwrap_or(false),
        };
        if stored.done.is_none() {
            block.normalize_todo_marker();
        }
        block
    }
}

impl From<Block> for StoredBlock {
    fn from(block: Block) -> Self {
        let done = (block.kind == BlockType::TodoList || block.done).then_some(block.done);
        Self {
            id: block.id,
            kind: block.kind,
            content: block.content,
            children: block.children,
            done,
        }
    }
}

/// Write-time rejection of a malformed block tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockTreeValidationError {
    /// A document body needs at least one block.
    Empty,
    /// Two blocks (at any depth) share this id.
    DuplicateId(BlockId),
}

impl Display for BlockTreeValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "block tree holds no blocks"),
            Self::DuplicateId(id) => write!(f, "duplicate block id `{id}`"),
        }
    }
}

impl Error for BlockTreeValidationError {}

impl Block {
    /// Creates a block with a fresh unique id.
    pub fn new(kind: BlockType, content: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), kind, content)
    }

    /// Creates a block with a caller-provided id.
    pub fn with_id(id: impl Into<BlockId>, kind: BlockType, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            content: content.into(),
            children: Vec::new(),
            done: false,
        }
    }

    /// Default block inserted by the editor: empty paragraph.
    pub fn new_paragraph() -> Self {
        Self::new(BlockType::Paragraph, "")
    }

    /// Flips completion for todo blocks. Other block types are left as is.
    ///
    /// Returns whether the block was toggled.
    pub fn toggle_todo(&mut self) -> bool {
        if self.kind != BlockType::TodoList {
            return false;
        }
        self.done = !self.done;
        true
    }

    /// Moves a legacy leading `[x]` / `[ ]` marker out of `content` into `done`.
    ///
    /// Applies to todo blocks only; content without a marker is untouched.
    pub fn normalize_todo_marker(&mut self) {
        if self.kind != BlockType::TodoList {
            return;
        }
        if let Some((done, rest)) = split_todo_marker(&self.content) {
            self.done = done;
            self.content = rest.to_string();
        }
    }

    /// Renders todo content in the legacy marker form (`[x] text`).
    pub fn marker_content(&self) -> String {
        if self.kind != BlockType::TodoList {
            return self.content.clone();
        }
        let marker = if self.done {
            TODO_DONE_MARKER
        } else {
            TODO_OPEN_MARKER
        };
        format!("{marker} {}", self.content)
    }

    /// Whether the block carries no visible text.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Toggles the completion marker of marker-encoded todo content.
///
/// Strips any existing leading marker and prepends the opposite one, keeping
/// the trailing text. Content without a marker counts as not done.
pub fn toggle_todo_marker(content: &str) -> String {
    let (done, rest) = split_todo_marker(content).unwrap_or((false, content));
    let marker = if done {
        TODO_OPEN_MARKER
    } else {
        TODO_DONE_MARKER
    };
    if rest.is_empty() {
        marker.to_string()
    } else {
        format!("{marker} {rest}")
    }
}

fn split_todo_marker(content: &str) -> Option<(bool, &str)> {
    let (done, rest) = if let Some(rest) = content.strip_prefix(TODO_DONE_MARKER) {
        (true, rest)
    } else if let Some(rest) = content.strip_prefix("[X]") {
        (true, rest)
    } else if let Some(rest) = content.strip_prefix(TODO_OPEN_MARKER) {
        (false, rest)
    } else {
        return None;
    };
    Some((done, rest.strip_prefix(' ').unwrap_or(rest)))
}

/// Key events relevant to the block edit protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKey {
    Enter { shift: bool },
    Backspace,
}

/// Result of applying one key event to the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyOutcome {
    /// Whether the tree handled the key (caller should suppress default).
    pub handled: bool,
    /// Block that should receive focus after the key, if it changed.
    pub focus: Option<BlockId>,
}

impl KeyOutcome {
    fn ignored() -> Self {
        Self {
            handled: false,
            focus: None,
        }
    }
}

/// Ordered top-level block sequence of one document.
///
/// Serialized transparently as a JSON array; stored as an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockTree(Vec<Block>);

impl BlockTree {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self(blocks)
    }

    /// Tree holding one empty paragraph, the minimum valid document body.
    pub fn single_paragraph() -> Self {
        Self(vec![Block::new_paragraph()])
    }

    /// Parses the at-rest string form.
    ///
    /// Legacy todo blocks stored without `done` have their leading marker
    /// moved into the flag; trees written by `to_json` round-trip unchanged.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Checks write-time rules: at least one block, ids unique at any depth.
    pub fn validate(&self) -> Result<(), BlockTreeValidationError> {
        if self.0.is_empty() {
            return Err(BlockTreeValidationError::Empty);
        }
        let mut seen = HashSet::new();
        let mut pending = self.0.iter().collect::<Vec<_>>();
        while let Some(block) = pending.pop() {
            if !seen.insert(block.id.as_str()) {
                return Err(BlockTreeValidationError::DuplicateId(block.id.clone()));
            }
            pending.extend(block.children.iter());
        }
        Ok(())
    }

    /// Serializes to the at-rest string form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.0
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&Block> {
        self.0.iter().find(|block| block.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.0.iter().position(|block| block.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|block| block.id.as_str())
    }

    /// Inserts `new_block` immediately after `after_id`.
    ///
    /// Returns `false` and leaves the tree unchanged when `after_id` is absent
    /// or `new_block` reuses an id already in the tree.
    pub fn insert_after(&mut self, after_id: &str, new_block: Block) -> bool {
        if self.contains_id(&new_block.id) {
            return false;
        }
        match self.position(after_id) {
            Some(index) => {
                self.0.insert(index + 1, new_block);
                true
            }
            None => false,
        }
    }

    /// Removes the block with `id`, unless it is the only remaining block.
    pub fn delete(&mut self, id: &str) -> bool {
        if self.0.len() <= 1 {
            return false;
        }
        match self.position(id) {
            Some(index) => {
                self.0.remove(index);
                true
            }
            None => false,
        }
    }

    /// Replaces the content of block `id`.
    pub fn set_content(&mut self, id: &str, content: impl Into<String>) -> bool {
        match self.find_mut(id) {
            Some(block) => {
                block.content = content.into();
                true
            }
            None => false,
        }
    }

    /// Changes the type of block `id`, preserving id, content and children.
    pub fn set_type(&mut self, id: &str, kind: BlockType) -> bool {
        match self.find_mut(id) {
            Some(block) => {
                block.kind = kind;
                if kind != BlockType::TodoList {
                    block.done = false;
                }
                true
            }
            None => false,
        }
    }

    /// Flips completion of todo block `id`.
    pub fn toggle_todo(&mut self, id: &str) -> bool {
        self.find_mut(id).is_some_and(Block::toggle_todo)
    }

    /// Applies the keyboard edit policy for the focused block.
    ///
    /// - Enter (no shift): insert an empty paragraph after the focused block
    ///   and focus it.
    /// - Backspace on an empty block while more than one block remains:
    ///   delete it and focus the previous block (the new first block when the
    ///   first one was removed).
    pub fn handle_key(&mut self, focused_id: &str, key: EditorKey) -> KeyOutcome {
        match key {
            EditorKey::Enter { shift: true } => KeyOutcome::ignored(),
            EditorKey::Enter { shift: false } => {
                let block = Block::new_paragraph();
                let new_id = block.id.clone();
                if self.insert_after(focused_id, block) {
                    KeyOutcome {
                        handled: true,
                        focus: Some(new_id),
                    }
                } else {
                    KeyOutcome::ignored()
                }
            }
            EditorKey::Backspace => {
                let Some(index) = self.position(focused_id) else {
                    return KeyOutcome::ignored();
                };
                if !self.0[index].is_empty() || self.0.len() <= 1 {
                    return KeyOutcome::ignored();
                }
                self.0.remove(index);
                let focus_index = index.saturating_sub(1);
                KeyOutcome {
                    handled: true,
                    focus: self.0.get(focus_index).map(|block| block.id.clone()),
                }
            }
        }
    }

    /// Concatenated block text, one line per block.
    pub fn plain_text(&self) -> String {
        self.0
            .iter()
            .map(|block| block.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn contains_id(&self, id: &str) -> bool {
        let mut pending = self.0.iter().collect::<Vec<_>>();
        while let Some(block) = pending.pop() {
            if block.id == id {
                return true;
            }
            pending.extend(block.children.iter());
        }
        false
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Block> {
        self.0.iter_mut().find(|block| block.id == id)
    }
}

impl From<Vec<Block>> for BlockTree {
    fn from(value: Vec<Block>) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        toggle_todo_marker, Block, BlockTree, BlockTreeValidationError, BlockType, EditorKey,
    };

    fn tree(ids: &[&str]) -> BlockTree {
        BlockTree::new(
            ids.iter()
                .map(|id| Block::with_id(*id, BlockType::Paragraph, format!("text {id}")))
                .collect(),
        )
    }

    #[test]
    fn delete_removes_exactly_one_block() {
        let mut blocks = tree(&["a", "b", "c"]);
        assert!(blocks.delete("b"));
        assert_eq!(blocks.len(), 2);
        assert!(blocks.find("b").is_none());
    }

    #[test]
    fn delete_keeps_last_block() {
        let mut blocks = tree(&["only"]);
        assert!(!blocks.delete("only"));
        assert_eq!(blocks, tree(&["only"]));
    }

    #[test]
    fn insert_then_delete_round_trips() {
        let original = tree(&["a", "b", "c"]);
        let mut blocks = original.clone();
        let inserted = Block::new_paragraph();
        let inserted_id = inserted.id.clone();

        assert!(blocks.insert_after("b", inserted));
        assert_eq!(blocks.ids().collect::<Vec<_>>()[2], inserted_id);
        assert!(blocks.delete(&inserted_id));
        assert_eq!(blocks, original);
    }

    #[test]
    fn insert_after_unknown_id_is_noop() {
        let mut blocks = tree(&["a"]);
        assert!(!blocks.insert_after("missing", Block::new_paragraph()));
        assert_eq!(blocks, tree(&["a"]));
    }

    #[test]
    fn set_content_last_write_wins() {
        let mut twice = tree(&["a", "b"]);
        twice.set_content("a", "x");
        twice.set_content("a", "y");
        let mut once = tree(&["a", "b"]);
        once.set_content("a", "y");
        assert_eq!(twice, once);
        assert!(!once.set_content("missing", "z"));
    }

    #[test]
    fn set_type_preserves_id_and_content() {
        let mut blocks = tree(&["a"]);
        assert!(blocks.set_type("a", BlockType::Heading2));
        let block = blocks.find("a").unwrap();
        assert_eq!(block.kind, BlockType::Heading2);
        assert_eq!(block.content, "text a");
    }

    #[test]
    fn todo_marker_toggle_round_trips() {
        let once = toggle_todo_marker("[ ] buy milk");
        assert_eq!(once, "[x] buy milk");
        assert_eq!(toggle_todo_marker(&once), "[ ] buy milk");
    }

    #[test]
    fn todo_marker_toggle_never_double_prefixes() {
        assert_eq!(toggle_todo_marker("buy milk"), "[x] buy milk");
        assert_eq!(toggle_todo_marker("[x]buy milk"), "[ ] buy milk");
        assert_eq!(toggle_todo_marker("call [x] later"), "[x] call [x] later");
        assert_eq!(toggle_todo_marker(""), "[x]");
    }

    #[test]
    fn todo_flag_toggle_only_applies_to_todo_blocks() {
        let mut todo = Block::with_id("t", BlockType::TodoList, "buy milk");
        assert!(todo.toggle_todo());
        assert!(todo.done);
        assert_eq!(todo.marker_content(), "[x] buy milk");

        let mut para = Block::with_id("p", BlockType::Paragraph, "text");
        assert!(!para.toggle_todo());
        assert!(!para.done);
    }

    #[test]
    fn from_json_normalizes_legacy_markers() {
        let raw = r#"[{"id":"1","type":"todo-list","content":"[x] ship it","children":[]}]"#;
        let blocks = BlockTree::from_json(raw).unwrap();
        let block = blocks.find("1").unwrap();
        assert!(block.done);
        assert_eq!(block.content, "ship it");
    }

    #[test]
    fn todo_text_that_looks_like_a_marker_survives_round_trip() {
        let literal = Block::with_id("t", BlockType::TodoList, "[x] is literal text");
        let mut open_box = Block::with_id("u", BlockType::TodoList, "[ ] open box");
        open_box.done = true;
        let original = BlockTree::new(vec![literal, open_box]);

        let raw = original.to_json().unwrap();
        assert!(raw.contains(r#""done":false"#));
        let back = BlockTree::from_json(&raw).unwrap();
        assert_eq!(back, original);
        assert_eq!(BlockTree::from_json(&back.to_json().unwrap()).unwrap(), original);
    }

    #[test]
    fn insert_after_refuses_existing_id() {
        let mut blocks = tree(&["a", "b"]);
        assert!(!blocks.insert_after("a", Block::with_id("b", BlockType::Paragraph, "dup")));
        assert!(!blocks.insert_after("a", Block::with_id("a", BlockType::Paragraph, "dup")));
        assert_eq!(blocks, tree(&["a", "b"]));
    }

    #[test]
    fn validate_rejects_duplicate_and_empty_trees() {
        assert_eq!(tree(&["a", "b"]).validate(), Ok(()));
        assert_eq!(
            tree(&["a", "a"]).validate(),
            Err(BlockTreeValidationError::DuplicateId("a".to_string()))
        );
        assert_eq!(
            BlockTree::new(Vec::new()).validate(),
            Err(BlockTreeValidationError::Empty)
        );

        let mut parent = Block::with_id("p", BlockType::BulletList, "parent");
        parent.children.push(Block::with_id("p", BlockType::Paragraph, "nested"));
        assert_eq!(
            BlockTree::new(vec![parent]).validate(),
            Err(BlockTreeValidationError::DuplicateId("p".to_string()))
        );
    }

    #[test]
    fn json_uses_kebab_case_type_names() {
        let blocks = BlockTree::new(vec![Block::with_id("h", BlockType::Heading1, "Title")]);
        let raw = blocks.to_json().unwrap();
        assert!(raw.contains(r#""type":"heading-1""#));
        assert!(raw.contains(r#""children":[]"#));
        assert!(!raw.contains("done"));
    }

    #[test]
    fn enter_inserts_and_focuses_new_block() {
        let mut blocks = tree(&["a", "b"]);
        let outcome = blocks.handle_key("a", EditorKey::Enter { shift: false });
        assert!(outcome.handled);
        let focus = outcome.focus.unwrap();
        assert_eq!(blocks.position(&focus), Some(1));
        assert!(blocks.find(&focus).unwrap().is_empty());

        let shifted = blocks.handle_key("a", EditorKey::Enter { shift: true });
        assert!(!shifted.handled);
        assert_eq!(blocks.len(), 3);
    }

    #[test]
    fn backspace_on_empty_block_focuses_previous() {
        let mut blocks = tree(&["a", "b"]);
        blocks.set_content("b", "");
        let outcome = blocks.handle_key("b", EditorKey::Backspace);
        assert!(outcome.handled);
        assert_eq!(outcome.focus.as_deref(), Some("a"));
        assert_eq!(blocks.len(), 1);

        blocks.set_content("a", "");
        let last = blocks.handle_key("a", EditorKey::Backspace);
        assert!(!last.handled);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn backspace_on_non_empty_block_is_ignored() {
        let mut blocks = tree(&["a", "b"]);
        let outcome = blocks.handle_key("b", EditorKey::Backspace);
        assert!(!outcome.handled);
        assert_eq!(blocks.len(), 2);
    }
}
