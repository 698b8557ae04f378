use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::warn;

use super::column::ColumnKind;

pub type ParticipantId = String;
pub type BlockId = String;

/// One categorical box in a column, holding the participants that mention it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Block {
    pub id: BlockId,
    pub column: ColumnKind,
    pub title: String,
    pub participants: Vec<ParticipantId>,
    /// `(participant, detail)` pairs shown in tooltips.
    pub content: Vec<(ParticipantId, String)>,
}

impl Block {
    pub fn new(column: ColumnKind, title: &str, participants: Vec<ParticipantId>) -> Self {
        Self {
            id: column.block_id(title),
            column,
            title: title.to_owned(),
            participants,
            content: Vec::new(),
        }
    }

    pub fn with_content(mut self, content: Vec<(ParticipantId, String)>) -> Self {
        self.content = content;
        self
    }

    /// Participants with repeats removed, first occurrence wins.
    pub fn unique_participants(&self) -> Vec<&str> {
        let mut seen = HashSet::with_capacity(self.participants.len());
        self.participants
            .iter()
            .map(String::as_str)
            .filter(|participant| seen.insert(*participant))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BlockRef {
    pub id: BlockId,
    pub title: String,
}

/// Inserts `block`, or concatenates its participants and content onto an
/// existing block with the same id.
pub fn update_blocks(blocks: &mut Vec<Block>, block: Block) {
    if let Some(existing) = blocks.iter_mut().find(|existing| existing.id == block.id) {
        existing.participants.extend(block.participants);
        existing.content.extend(block.content);
    } else {
        blocks.push(block);
    }
}

/// Descending by participant count, then case-insensitive title.
pub fn sort_blocks(blocks: &mut [Block]) {
    blocks.sort_by(|a, b| {
        b.participants
            .len()
            .cmp(&a.participants.len())
            .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
            .then_with(|| a.title.cmp(&b.title))
    });
}

pub(crate) fn dedup_in_order(values: Vec<ParticipantId>) -> Vec<ParticipantId> {
    let mut seen = HashSet::with_capacity(values.len());
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

/// Participants and content collected per block id while walking records.
#[derive(Debug)]
pub(crate) struct CategoryAccumulator {
    column: ColumnKind,
    participants: HashMap<BlockId, Vec<ParticipantId>>,
    content: HashMap<BlockId, Vec<(ParticipantId, String)>>,
}

impl CategoryAccumulator {
    pub(crate) fn new(column: ColumnKind) -> Self {
        Self {
            column,
            participants: HashMap::new(),
            content: HashMap::new(),
        }
    }

    pub(crate) fn push(&mut self, category: &str, participant: &str, detail: impl Into<String>) {
        let id = self.column.block_id(category);
        self.participants
            .entry(id.clone())
            .or_default()
            .push(participant.to_owned());
        self.content
            .entry(id)
            .or_default()
            .push((participant.to_owned(), detail.into()));
    }

    /// Emits one block per canonical category, including empty ones, sorted
    /// for display.
    pub(crate) fn into_blocks(mut self, categories: &[String]) -> Vec<Block> {
        let mut blocks = Vec::with_capacity(categories.len());
        for category in categories {
            let id = self.column.block_id(category);
            let participants = self.participants.remove(&id).unwrap_or_default();
            let content = self.content.remove(&id).unwrap_or_default();
            update_blocks(
                &mut blocks,
                Block {
                    id,
                    column: self.column,
                    title: category.clone(),
                    participants: dedup_in_order(participants),
                    content,
                },
            );
        }

        if !self.participants.is_empty() {
            let mut unknown = self.participants.keys().cloned().collect::<Vec<_>>();
            unknown.sort();
            warn!(
                column = %self.column,
                ?unknown,
                "participant categories missing from metadata vocabulary"
            );
        }

        sort_blocks(&mut blocks);
        blocks
    }
}
