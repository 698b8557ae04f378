use std::collections::{BTreeMap, BTreeSet, HashMap};

use eframe::egui::pos2;
use serde::Serialize;
use tracing::debug;

use super::block::{BlockId, ParticipantId};
use super::column::ColumnKind;
use super::combination::{BlockCombinations, CombinationId};
use super::geometry::{BandAnchor, BlockGeometry, FlowPath, compute_block_offset, generate_flow};
use super::link::{Link, LinkSet, links_between_columns};
use crate::error::{FlowError, Result};

/// `[start, end]` share of a block's height, both in `[0, 1]`.
pub type Band = [f32; 2];

/// Vertical band of every combination inside every block.
///
/// Bands follow the block's group order, touch end to start and cover
/// `[0, 1]`. Blocks without participants have no bands.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockOffsetRatios {
    bands: HashMap<BlockId, Vec<(CombinationId, Band)>>,
}

impl BlockOffsetRatios {
    pub fn new(block_combinations: &BlockCombinations) -> Self {
        let bands = block_combinations
            .block_ids()
            .map(|block_id| (block_id.to_owned(), block_bands(block_combinations, block_id)))
            .collect();
        Self { bands }
    }

    pub fn bands(&self, block_id: &str) -> &[(CombinationId, Band)] {
        self.bands.get(block_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn band(&self, block_id: &str, combination: CombinationId) -> Option<Band> {
        self.bands(block_id)
            .iter()
            .find(|(candidate, _)| *candidate == combination)
            .map(|(_, band)| *band)
    }
}

fn block_bands(block_combinations: &BlockCombinations, block_id: &str) -> Vec<(CombinationId, Band)> {
    let groups = block_combinations.groups(block_id);
    let total = groups.iter().map(|group| group.participants.len()).sum::<usize>();
    if total == 0 {
        return Vec::new();
    }

    // Cumulative counts keep the last band ending at exactly 1.
    let mut seen = 0usize;
    groups
        .iter()
        .map(|group| {
            let start = seen as f32 / total as f32;
            seen += group.participants.len();
            (group.combination, [start, seen as f32 / total as f32])
        })
        .collect()
}

/// One drawable ribbon.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PathData {
    pub id: CombinationId,
    pub source: BlockId,
    pub target: BlockId,
    pub source_column: ColumnKind,
    pub target_column: ColumnKind,
    pub participants: Vec<ParticipantId>,
    pub path: FlowPath,
}

impl PathData {
    fn from_link(link: &Link, path: FlowPath) -> Self {
        Self {
            id: link.combination,
            source: link.source.clone(),
            target: link.target.clone(),
            source_column: link.source_column,
            target_column: link.target_column,
            participants: link.participants().to_vec(),
            path,
        }
    }
}

/// Ribbons of one render pass. Blocks that could not be measured are listed
/// in `unmeasured`; their ribbons were skipped and should be retried once
/// layout has settled.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FlowPaths {
    pub paths: Vec<PathData>,
    pub unmeasured: BTreeSet<BlockId>,
}

impl FlowPaths {
    pub fn is_complete(&self) -> bool {
        self.unmeasured.is_empty()
    }

    pub fn extend(&mut self, other: FlowPaths) {
        self.paths.extend(other.paths);
        self.unmeasured.extend(other.unmeasured);
    }

    fn anchor(
        &mut self,
        geometry: &dyn BlockGeometry,
        block_id: &str,
        band: Band,
        is_start: bool,
    ) -> Option<BandAnchor> {
        let anchor = compute_block_offset(geometry, block_id, band, is_start);
        if anchor.is_none() {
            self.unmeasured.insert(block_id.to_owned());
        }
        anchor
    }

    fn push_link(
        &mut self,
        geometry: &dyn BlockGeometry,
        link: &Link,
        source_band: Band,
        target_band: Band,
    ) {
        let source = self.anchor(geometry, &link.source, source_band, true);
        let target = self.anchor(geometry, &link.target, target_band, false);
        if let (Some(source), Some(target)) = (source, target) {
            let path = generate_flow(source.pos, target.pos, source.height, target.height);
            self.paths.push(PathData::from_link(link, path));
        }
    }

    fn log_unmeasured(&self) {
        if !self.is_complete() {
            debug!(unmeasured = ?self.unmeasured, "skipped ribbons of unmeasured blocks");
        }
    }
}

/// Links and ribbons between one pair of columns.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ColumnFlow {
    pub links: LinkSet,
    pub paths: FlowPaths,
}

/// One ribbon per link, from the combination's band in the source block to
/// its band in the target block.
pub fn generate_paths(
    links: &LinkSet,
    offsets: &BlockOffsetRatios,
    geometry: &dyn BlockGeometry,
) -> FlowPaths {
    let mut paths = FlowPaths::default();
    for link in links {
        let bands = (
            offsets.band(&link.source, link.combination),
            offsets.band(&link.target, link.combination),
        );
        if let (Some(source_band), Some(target_band)) = bands {
            paths.push_link(geometry, link, source_band, target_band);
        }
    }
    paths.log_unmeasured();
    paths
}

pub fn paths_between_columns(
    block_combinations: &BlockCombinations,
    passthrough: Option<&BTreeSet<CombinationId>>,
    src_block_ids: &[BlockId],
    dst_block_ids: &[BlockId],
    src_column: ColumnKind,
    dst_column: ColumnKind,
    geometry: &dyn BlockGeometry,
) -> ColumnFlow {
    let links = links_between_columns(
        block_combinations,
        passthrough,
        src_block_ids,
        dst_block_ids,
        src_column,
        dst_column,
    );
    let paths = generate_paths(&links, &BlockOffsetRatios::new(block_combinations), geometry);
    ColumnFlow { links, paths }
}

/// Ribbons leaving the first column of a flow, whose blocks define the
/// combinations.
///
/// When no combination is held by more than one populated source block the
/// general case applies. Otherwise a combination spans source blocks: with
/// two populated blocks this is resolved by [`overlapping_paths`], with more
/// it is rejected with [`FlowError::UnsupportedOverlap`].
pub fn first_column_paths(
    participant_combinations: &BTreeMap<ParticipantId, CombinationId>,
    block_participants: &HashMap<BlockId, Vec<ParticipantId>>,
    src_block_ids: &[BlockId],
    dst_block_ids: &[BlockId],
    src_column: ColumnKind,
    dst_column: ColumnKind,
    geometry: &dyn BlockGeometry,
) -> Result<ColumnFlow> {
    let block_combinations = BlockCombinations::build(
        src_block_ids
            .iter()
            .chain(dst_block_ids)
            .filter_map(|block_id| block_participants.get_key_value(block_id))
            .map(|(block_id, participants)| (block_id.as_str(), participants.as_slice())),
        participant_combinations,
    );

    let populated = src_block_ids
        .iter()
        .filter(|block_id| !block_combinations.groups(block_id).is_empty())
        .collect::<Vec<_>>();
    let mut holders: BTreeMap<CombinationId, usize> = BTreeMap::new();
    for block_id in &populated {
        for combination in block_combinations.combinations(block_id) {
            *holders.entry(combination).or_default() += 1;
        }
    }
    let spans_blocks = holders.values().any(|count| *count > 1);

    if !spans_blocks {
        return Ok(paths_between_columns(
            &block_combinations,
            None,
            src_block_ids,
            dst_block_ids,
            src_column,
            dst_column,
            geometry,
        ));
    }

    let [first, second] = populated.as_slice() else {
        return Err(FlowError::UnsupportedOverlap {
            source_blocks: populated.len(),
            combinations: holders.len(),
        });
    };

    let links = links_between_columns(
        &block_combinations,
        None,
        src_block_ids,
        dst_block_ids,
        src_column,
        dst_column,
    );
    let paths = overlapping_paths(
        &block_combinations,
        &links,
        [first.as_str(), second.as_str()],
        geometry,
    );
    Ok(ColumnFlow { links, paths })
}

/// Ribbons for two source blocks that share one combination.
///
/// The upper block (by rendered position) stacks its own combination above
/// the shared one, the lower block stacks the shared one above its own, so
/// the shared bands meet. The shared combination leaves as one ribbon per
/// target, spanning both of its source bands, and is attributed to the upper
/// block.
pub fn overlapping_paths(
    block_combinations: &BlockCombinations,
    links: &LinkSet,
    source_blocks: [&str; 2],
    geometry: &dyn BlockGeometry,
) -> FlowPaths {
    let offsets = BlockOffsetRatios::new(block_combinations);
    let mut paths = FlowPaths::default();

    let rects = source_blocks.map(|block_id| geometry.block_rect(block_id));
    let [Some(first_rect), Some(second_rect)] = rects else {
        for (block_id, rect) in source_blocks.iter().zip(rects) {
            if rect.is_none() {
                paths.unmeasured.insert((*block_id).to_owned());
            }
        }
        paths.log_unmeasured();
        return paths;
    };
    let (upper, lower) = if first_rect.top() < second_rect.top() {
        (source_blocks[0], source_blocks[1])
    } else {
        (source_blocks[1], source_blocks[0])
    };

    let upper_combinations = block_combinations.combinations(upper).collect::<Vec<_>>();
    let lower_combinations = block_combinations.combinations(lower).collect::<Vec<_>>();
    let Some(shared) = upper_combinations
        .iter()
        .copied()
        .find(|combination| lower_combinations.contains(combination))
    else {
        return generate_paths(links, &offsets, geometry);
    };
    let upper_only = upper_combinations.iter().copied().find(|c| *c != shared);
    let lower_only = lower_combinations.iter().copied().find(|c| *c != shared);

    let width = |block_id: &str, combination| {
        offsets
            .band(block_id, combination)
            .map_or(0.0, |[start, end]| end - start)
    };
    let upper_cutoff = upper_only.map_or(0.0, |combination| width(upper, combination));
    let lower_cutoff = if lower_only.is_some() { width(lower, shared) } else { 1.0 };

    let source_band = |block_id: &str, combination: CombinationId| -> Option<Band> {
        if block_id == upper {
            if Some(combination) == upper_only {
                return Some([0.0, upper_cutoff]);
            }
            return (combination == shared).then_some([upper_cutoff, 1.0]);
        }
        if block_id == lower {
            if combination == shared {
                return Some([0.0, lower_cutoff]);
            }
            return (Some(combination) == lower_only).then_some([lower_cutoff, 1.0]);
        }
        offsets.band(block_id, combination)
    };

    for link in links.iter().filter(|link| link.combination != shared) {
        let bands = (
            source_band(&link.source, link.combination),
            offsets.band(&link.target, link.combination),
        );
        if let (Some(source), Some(target)) = bands {
            paths.push_link(geometry, link, source, target);
        }
    }

    let upper_anchor = paths.anchor(geometry, upper, [upper_cutoff, 1.0], true);
    let lower_anchor = paths.anchor(geometry, lower, [0.0, lower_cutoff], true);
    let (Some(upper_anchor), Some(lower_anchor)) = (upper_anchor, lower_anchor) else {
        paths.log_unmeasured();
        return paths;
    };
    let top = upper_anchor.pos.y.min(lower_anchor.pos.y);
    let bottom = (upper_anchor.pos.y + upper_anchor.height)
        .max(lower_anchor.pos.y + lower_anchor.height);
    let source_start = pos2(upper_anchor.pos.x, top);

    let mut shared_targets: Vec<(&Link, Vec<ParticipantId>)> = Vec::new();
    for link in links.iter().filter(|link| link.combination == shared) {
        match shared_targets.iter_mut().find(|(first, _)| first.target == link.target) {
            Some((_, participants)) => {
                for participant in link.participants() {
                    if !participants.contains(participant) {
                        participants.push(participant.clone());
                    }
                }
            }
            None => shared_targets.push((link, link.participants().to_vec())),
        }
    }

    for (link, participants) in shared_targets {
        let Some(target_band) = offsets.band(&link.target, shared) else {
            continue;
        };
        let Some(target) = paths.anchor(geometry, &link.target, target_band, false) else {
            continue;
        };
        paths.paths.push(PathData {
            id: shared,
            source: upper.to_owned(),
            target: link.target.clone(),
            source_column: link.source_column,
            target_column: link.target_column,
            participants,
            path: generate_flow(source_start, target.pos, bottom - top, target.height),
        });
    }

    paths.log_unmeasured();
    paths
}
