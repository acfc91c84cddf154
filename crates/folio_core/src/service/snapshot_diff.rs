//! Snapshot comparison for the time machine compare view.
//!
//! # Invariants
//! - Blocks are matched by id at depth 0; children are not compared.
//! - An empty diff means both snapshots render identically.

use crate::model::block::{Block, BlockId, BlockType};
use crate::model::document::Snapshot;
use std::collections::HashMap;

/// Change of one scalar field between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange<T> {
    pub before: T,
    pub after: T,
}

/// Change of one block between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockChange {
    Added {
        id: BlockId,
        index: usize,
    },
    Removed {
        id: BlockId,
        index: usize,
    },
    ContentChanged {
        id: BlockId,
        before: String,
        after: String,
    },
    TypeChanged {
        id: BlockId,
        before: BlockType,
        after: BlockType,
    },
    TodoToggled {
        id: BlockId,
        done: bool,
    },
    /// Block kept but its order relative to the other kept blocks changed.
    Moved {
        id: BlockId,
        from: usize,
        to: usize,
    },
}

/// Differences from an older snapshot (`before`) to a newer one (`after`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub title: Option<FieldChange<String>>,
    pub emoji: Option<FieldChange<Option<String>>>,
    pub cover_image: Option<FieldChange<Option<String>>>,
    pub blocks: Vec<BlockChange>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.emoji.is_none()
            && self.cover_image.is_none()
            && self.blocks.is_empty()
    }
}

/// Compares two snapshots.
pub fn diff_snapshots(before: &Snapshot, after: &Snapshot) -> SnapshotDiff {
    SnapshotDiff {
        title: field_change(&before.title, &after.title),
        emoji: field_change(&before.emoji, &after.emoji),
        cover_image: field_change(&before.cover_image, &after.cover_image),
        blocks: diff_blocks(before.blocks.blocks(), after.blocks.blocks()),
    }
}

fn field_change<T: Clone + PartialEq>(before: &T, after: &T) -> Option<FieldChange<T>> {
    (before != after).then(|| FieldChange {
        before: before.clone(),
        after: after.clone(),
    })
}

fn diff_blocks(before: &[Block], after: &[Block]) -> Vec<BlockChange> {
    let before_index: HashMap<&str, usize> = before
        .iter()
        .enumerate()
        .map(|(index, block)| (block.id.as_str(), index))
        .collect();
    let after_index: HashMap<&str, usize> = after
        .iter()
        .enumerate()
        .map(|(index, block)| (block.id.as_str(), index))
        .collect();

    let mut changes = Vec::new();

    for (index, block) in before.iter().enumerate() {
        if !after_index.contains_key(block.id.as_str()) {
            changes.push(BlockChange::Removed {
                id: block.id.clone(),
                index,
            });
        }
    }

    // Old positions of kept blocks, in `after` order. Blocks outside the
    // longest increasing run are the ones that moved.
    let kept_old_positions = after
        .iter()
        .filter_map(|block| before_index.get(block.id.as_str()).copied())
        .collect::<Vec<_>>();
    let stable = longest_increasing_run(&kept_old_positions);
    let mut kept_cursor = 0;

    for (index, block) in after.iter().enumerate() {
        let Some(&old_index) = before_index.get(block.id.as_str()) else {
            changes.push(BlockChange::Added {
                id: block.id.clone(),
                index,
            });
            continue;
        };
        let old = &before[old_index];

        if !stable[kept_cursor] {
            changes.push(BlockChange::Moved {
                id: block.id.clone(),
                from: old_index,
                to: index,
            });
        }
        kept_cursor += 1;

        if old.kind != block.kind {
            changes.push(BlockChange::TypeChanged {
                id: block.id.clone(),
                before: old.kind,
                after: block.kind,
            });
        }
        if old.content != block.content {
            changes.push(BlockChange::ContentChanged {
                id: block.id.clone(),
                before: old.content.clone(),
                after: block.content.clone(),
            });
        }
        if old.done != block.done {
            changes.push(BlockChange::TodoToggled {
                id: block.id.clone(),
                done: block.done,
            });
        }
    }

    changes
}

/// Marks the members of one longest strictly increasing subsequence.
fn longest_increasing_run(sequence: &[usize]) -> Vec<bool> {
    let mut tails: Vec<usize> = Vec::new();
    let mut previous: Vec<Option<usize>> = vec![None; sequence.len()];
    for (position, &value) in sequence.iter().enumerate() {
        let slot = tails.partition_point(|&tail| sequence[tail] < value);
        if slot > 0 {
            previous[position] = Some(tails[slot - 1]);
        }
        if slot == tails.len() {
            tails.push(position);
        } else {
            tails[slot] = position;
        }
    }

    let mut stable = vec![false; sequence.len()];
    let mut cursor = tails.last().copied();
    while let Some(position) = cursor {
        stable[position] = true;
        cursor = previous[position];
    }
    stable
}
