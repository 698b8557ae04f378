use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use tracing::debug;

use super::aggregate::BlockAggregator;
use super::block::{Block, BlockId, ParticipantId};
use super::column::{ColumnKind, connected_components};
use super::combination::{BlockCombinations, CombinationId, Combinations, generate_combinations_from};
use super::geometry::BlockGeometry;
use super::highlight::{Highlight, HighlightMap, highlight_by_combinations};
use super::palette::ColorAssigner;
use super::paths::{ColumnFlow, PathData, first_column_paths, paths_between_columns};
use crate::error::Result;

/// Flow through one run of adjacent clicked columns, continuing into the
/// next visible column.
#[derive(Clone, Debug, Serialize)]
pub struct ComponentFlow {
    pub columns: Vec<ColumnKind>,
    pub combinations: Combinations,
    /// One entry per adjacent column pair.
    pub column_flows: Vec<ColumnFlow>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct FlowFrame {
    pub components: Vec<ComponentFlow>,
    pub highlights: HighlightMap,
}

impl FlowFrame {
    pub fn paths(&self) -> impl Iterator<Item = &PathData> {
        self.components
            .iter()
            .flat_map(|component| component.column_flows.iter())
            .flat_map(|flow| flow.paths.paths.iter())
    }

    pub fn unmeasured(&self) -> BTreeSet<BlockId> {
        self.components
            .iter()
            .flat_map(|component| component.column_flows.iter())
            .flat_map(|flow| flow.paths.unmeasured.iter().cloned())
            .collect()
    }

    /// Whether every ribbon could be placed. An incomplete frame should be
    /// recomputed once layout has settled.
    pub fn is_complete(&self) -> bool {
        self.components
            .iter()
            .flat_map(|component| component.column_flows.iter())
            .all(|flow| flow.paths.is_complete())
    }

    pub fn combinations(&self) -> impl Iterator<Item = &Combinations> {
        self.components.iter().map(|component| &component.combinations)
    }
}

/// Selection plus color memory, kept across render cycles.
#[derive(Clone, Debug, Default)]
pub struct FlowSession {
    clicked: Vec<Block>,
    colors: ColorAssigner,
}

impl FlowSession {
    /// Selects `block`, or deselects it when already selected. Returns whether
    /// it is selected afterwards.
    pub fn toggle(&mut self, block: &Block) -> bool {
        if let Some(index) = self.clicked.iter().position(|clicked| clicked.id == block.id) {
            self.clicked.remove(index);
            false
        } else {
            self.clicked.push(block.clone());
            true
        }
    }

    pub fn clear(&mut self) {
        self.clicked.clear();
        self.colors.clear();
    }

    pub fn clicked(&self) -> &[Block] {
        &self.clicked
    }

    pub fn is_clicked(&self, block_id: &str) -> bool {
        self.clicked.iter().any(|block| block.id == block_id)
    }

    pub fn colors(&self) -> &ColorAssigner {
        &self.colors
    }

    /// Recomputes combinations, colors, links and ribbons for the current
    /// selection over the columns in `order`.
    pub fn recompute(
        &mut self,
        aggregator: &BlockAggregator,
        order: &[ColumnKind],
        geometry: &dyn BlockGeometry,
    ) -> Result<FlowFrame> {
        self.clicked = self
            .clicked
            .iter()
            .filter_map(|block| aggregator.block(&block.id).cloned())
            .collect();

        let block_participants = aggregator.block_participants();
        let mut frame = FlowFrame::default();
        let mut next_index = 0;
        let mut combination_ids = Vec::new();
        let mut participant_combinations = BTreeMap::new();

        for component in connected_components(order, &self.clicked) {
            let flow = self.component_flow(
                aggregator,
                &block_participants,
                order,
                component,
                next_index,
                geometry,
            )?;
            next_index += flow.combinations.len();
            combination_ids.extend(flow.combinations.ids());
            participant_combinations.extend(
                flow.combinations
                    .participant_combinations()
                    .iter()
                    .map(|(participant, combination)| (participant.clone(), *combination)),
            );

            merge_highlights(&mut frame.highlights, self.component_highlights(aggregator, &flow));
            frame.components.push(flow);
        }

        self.colors.assign(&combination_ids, &participant_combinations);
        debug!(
            components = frame.components.len(),
            combinations = combination_ids.len(),
            complete = frame.is_complete(),
            "recomputed flows"
        );
        Ok(frame)
    }

    fn component_flow(
        &self,
        aggregator: &BlockAggregator,
        block_participants: &HashMap<BlockId, Vec<ParticipantId>>,
        order: &[ColumnKind],
        component: Vec<ColumnKind>,
        first_index: usize,
        geometry: &dyn BlockGeometry,
    ) -> Result<ComponentFlow> {
        let mut columns = component;
        if let Some(&last) = columns.last()
            && let Some(position) = order.iter().position(|column| *column == last)
            && let Some(&next) = order.get(position + 1)
        {
            columns.push(next);
        }

        let first_column = columns[0];
        let sources = self
            .clicked
            .iter()
            .filter(|block| block.column == first_column)
            .cloned()
            .collect::<Vec<_>>();
        let combinations = generate_combinations_from(&sources, first_index);

        let downstream = BlockCombinations::build(
            columns[1..].iter().flat_map(|column| {
                aggregator
                    .blocks(*column)
                    .iter()
                    .map(|block| (block.id.as_str(), block.participants.as_slice()))
            }),
            combinations.participant_combinations(),
        );

        let mut src_block_ids = sources.iter().map(|block| block.id.clone()).collect::<Vec<_>>();
        let mut passthrough: Option<BTreeSet<CombinationId>> = None;
        let mut column_flows = Vec::with_capacity(columns.len().saturating_sub(1));

        for pair in columns.windows(2) {
            let [src_column, dst_column] = [pair[0], pair[1]];
            let dst_block_ids = self.target_block_ids(aggregator, dst_column);

            let flow = match &passthrough {
                None => first_column_paths(
                    combinations.participant_combinations(),
                    block_participants,
                    &src_block_ids,
                    &dst_block_ids,
                    src_column,
                    dst_column,
                    geometry,
                )?,
                Some(passthrough) => paths_between_columns(
                    &downstream,
                    Some(passthrough),
                    &src_block_ids,
                    &dst_block_ids,
                    src_column,
                    dst_column,
                    geometry,
                ),
            };

            src_block_ids = flow.links.targets();
            passthrough = Some(flow.links.combinations());
            column_flows.push(flow);
        }

        Ok(ComponentFlow {
            columns,
            combinations,
            column_flows,
        })
    }

    /// Clicked blocks of a clicked column, every block otherwise.
    fn target_block_ids(&self, aggregator: &BlockAggregator, column: ColumnKind) -> Vec<BlockId> {
        let clicked = self
            .clicked
            .iter()
            .filter(|block| block.column == column)
            .map(|block| block.id.clone())
            .collect::<Vec<_>>();
        if !clicked.is_empty() {
            return clicked;
        }
        aggregator
            .blocks(column)
            .iter()
            .map(|block| block.id.clone())
            .collect()
    }

    fn component_highlights(&self, aggregator: &BlockAggregator, flow: &ComponentFlow) -> HighlightMap {
        let blocks = flow
            .columns
            .iter()
            .flat_map(|column| aggregator.blocks(*column))
            .collect::<Vec<_>>();
        let block_combinations = BlockCombinations::build(
            blocks
                .iter()
                .map(|block| (block.id.as_str(), block.participants.as_slice())),
            flow.combinations.participant_combinations(),
        );
        let combinations = flow.combinations.ids().into_iter().collect::<BTreeSet<_>>();

        let mut highlights = HighlightMap::new();
        for clicked in self.clicked.iter().filter(|block| flow.columns.contains(&block.column)) {
            merge_highlights(
                &mut highlights,
                highlight_by_combinations(
                    blocks.iter().copied(),
                    &block_combinations,
                    Some(&combinations),
                    clicked,
                ),
            );
        }
        highlights
    }
}

/// Highlighted wins over dismissed.
fn merge_highlights(into: &mut HighlightMap, from: HighlightMap) {
    for (block_id, state) in from {
        into.entry(block_id)
            .and_modify(|existing| {
                if state == Highlight::Highlighted {
                    *existing = Highlight::Highlighted;
                }
            })
            .or_insert(state);
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{Rect, pos2, vec2};

    use super::*;
    use crate::flow::dataset::Dataset;

    const DATASET: &str = r#"{
        "background": [
            {"summary": {"id": "A", "categories": ["Farmer", "Official"]}},
            {"summary": {"id": "B", "categories": ["Farmer", "Official"]}},
            {"summary": {"id": "C", "categories": ["Farmer"]}},
            {"summary": {"id": "D", "categories": ["Official"]}}
        ],
        "drivers_of_change": [
            {"summary": {"id": "A", "factors": [{"factor_name": "sea level", "category": "Climate"}]}},
            {"summary": {"id": "B", "factors": [{"factor_name": "dams", "category": "Infrastructure"}]}},
            {"summary": {"id": "C", "factors": [{"factor_name": "storms", "category": "Climate"}]}}
        ],
        "metadata": {
            "participant_categories": ["Farmer", "Official"],
            "factor_categories": ["Climate", "Infrastructure"]
        }
    }"#;

    fn aggregator() -> BlockAggregator {
        BlockAggregator::new(&Dataset::from_json_str(DATASET).expect("parses")).expect("aggregates")
    }

    /// Stacks every block of a column at `x`, one unit of height per participant.
    fn stacked(aggregator: &BlockAggregator, columns: &[ColumnKind]) -> HashMap<BlockId, Rect> {
        let mut rects = HashMap::new();
        for (index, column) in columns.iter().enumerate() {
            let mut y = 0.0;
            for block in aggregator.blocks(*column) {
                let height = 10.0 * block.participants.len() as f32;
                rects.insert(
                    block.id.clone(),
                    Rect::from_min_size(pos2(index as f32 * 100.0, y), vec2(20.0, height)),
                );
                y += height + 10.0;
            }
        }
        rects
    }

    #[test]
    fn no_selection_no_flows() {
        let aggregator = aggregator();
        let mut session = FlowSession::default();
        let frame = session
            .recompute(&aggregator, &ColumnKind::DEFAULT_ORDER, &HashMap::<BlockId, Rect>::new())
            .expect("empty frame");
        assert!(frame.components.is_empty());
        assert!(frame.is_complete());
    }

    #[test]
    fn clicked_block_flows_into_next_column() {
        let aggregator = aggregator();
        let order = [ColumnKind::Category, ColumnKind::Factor];
        let geometry = stacked(&aggregator, &order);
        let mut session = FlowSession::default();
        let farmer = aggregator.block("category-farmer").expect("farmer").clone();
        assert!(session.toggle(&farmer));

        let frame = session.recompute(&aggregator, &order, &geometry).expect("flows");
        assert_eq!(frame.components.len(), 1);
        assert_eq!(frame.components[0].columns, order);
        assert!(frame.is_complete());

        let mut pairs = frame
            .paths()
            .map(|path| (path.target.as_str(), path.participants.len()))
            .collect::<Vec<_>>();
        pairs.sort();
        assert_eq!(
            pairs,
            [("factor-category-climate", 2), ("factor-category-infrastructure", 1)]
        );
        assert!(session.colors().color(CombinationId(0)).is_some());
        assert_eq!(frame.highlights["category-official"], Highlight::Dismissed);
        assert_eq!(frame.highlights["category-farmer"], Highlight::Highlighted);
    }

    #[test]
    fn overlapping_selection_shares_one_ribbon() {
        let aggregator = aggregator();
        let order = [ColumnKind::Category, ColumnKind::Factor];
        let geometry = stacked(&aggregator, &order);
        let mut session = FlowSession::default();
        for id in ["category-farmer", "category-official"] {
            session.toggle(aggregator.block(id).expect("block"));
        }

        let frame = session.recompute(&aggregator, &order, &geometry).expect("two-way overlap");
        let combinations = &frame.components[0].combinations;
        assert_eq!(combinations.len(), 3);

        let shared = combinations.combination_of("A").expect("A combined");
        let shared_paths = frame.paths().filter(|path| path.id == shared).count();
        let shared_targets = frame
            .components[0]
            .column_flows[0]
            .links
            .iter()
            .filter(|link| link.combination == shared)
            .map(|link| link.target.clone())
            .collect::<BTreeSet<_>>();
        assert_eq!(shared_paths, shared_targets.len());
    }

    #[test]
    fn toggle_deselects_and_colors_survive() {
        let aggregator = aggregator();
        let order = [ColumnKind::Category, ColumnKind::Factor];
        let geometry = stacked(&aggregator, &order);
        let mut session = FlowSession::default();
        let farmer = aggregator.block("category-farmer").expect("farmer").clone();

        session.toggle(&farmer);
        session.recompute(&aggregator, &order, &geometry).expect("flows");
        let first = session.colors().combination_colors().clone();
        session.recompute(&aggregator, &order, &geometry).expect("flows");
        assert_eq!(session.colors().combination_colors(), &first);

        assert!(!session.toggle(&farmer));
        assert!(session.clicked().is_empty());
        assert!(!session.is_clicked("category-farmer"));
    }
}
