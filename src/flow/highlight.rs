use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use super::block::{Block, BlockId, ParticipantId};
use super::column::ColumnKind;
use super::combination::{BlockCombinations, CombinationId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Highlight {
    Highlighted,
    Dismissed,
}

/// Block id to highlight state. Blocks without an entry render normally.
pub type HighlightMap = HashMap<BlockId, Highlight>;

/// Highlights every stage block sharing a participant with `participants`
/// and dismisses the rest. Participant blocks are left alone.
pub fn highlight_by_participants<'a>(
    blocks: impl IntoIterator<Item = &'a Block>,
    participants: &[ParticipantId],
) -> HighlightMap {
    blocks
        .into_iter()
        .filter(|block| block.column != ColumnKind::Participant)
        .map(|block| {
            let state = if block.participants.iter().any(|p| participants.contains(p)) {
                Highlight::Highlighted
            } else {
                Highlight::Dismissed
            };
            (block.id.clone(), state)
        })
        .collect()
}

/// Highlights blocks carrying one of `combinations`. The other blocks of the
/// clicked block's column are dismissed regardless. `None` clears every
/// highlight.
pub fn highlight_by_combinations<'a>(
    blocks: impl IntoIterator<Item = &'a Block>,
    block_combinations: &BlockCombinations,
    combinations: Option<&BTreeSet<CombinationId>>,
    clicked: &Block,
) -> HighlightMap {
    let Some(combinations) = combinations else {
        return HighlightMap::new();
    };

    blocks
        .into_iter()
        .map(|block| {
            let state = if block.column == clicked.column && block.id != clicked.id {
                Highlight::Dismissed
            } else if block_combinations
                .combinations(&block.id)
                .any(|combination| combinations.contains(&combination))
            {
                Highlight::Highlighted
            } else {
                Highlight::Dismissed
            };
            (block.id.clone(), state)
        })
        .collect()
}
