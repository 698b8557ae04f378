use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use super::block::{Block, BlockId, CategoryAccumulator, ParticipantId, sort_blocks, update_blocks};
use super::column::{ColumnKind, Stage};
use super::dataset::{
    BackgroundSummary, Chunk, Dataset, DecisionMakingSummary, DriversSummary, Fairness,
    FutureManagementSummary, Group, Metadata,
};
use crate::error::{FlowError, Result};

/// Blocks of every column, built from the stage chunks of one or more
/// datasets.
#[derive(Clone, Debug, Default)]
pub struct BlockAggregator {
    columns: BTreeMap<ColumnKind, Vec<Block>>,
    decision_participants: usize,
}

/// Blocks produced from a single dataset before they are merged in.
struct StageBlocks {
    columns: Vec<(ColumnKind, Vec<Block>)>,
    participants: BTreeSet<ParticipantId>,
    decision_participants: usize,
}

impl BlockAggregator {
    pub fn new(dataset: &Dataset) -> Result<Self> {
        let mut aggregator = Self::default();
        aggregator.extend(dataset)?;
        Ok(aggregator)
    }

    /// Aggregates `dataset` and merges its blocks into the existing ones by
    /// block id. On error nothing is merged.
    pub fn extend(&mut self, dataset: &Dataset) -> Result<()> {
        let stage_blocks = aggregate_dataset(dataset)?;

        for (column, blocks) in stage_blocks.columns {
            self.merge_column(column, blocks);
        }

        let participant_blocks = stage_blocks
            .participants
            .iter()
            .map(|participant| Block::new(ColumnKind::Participant, participant, vec![participant.clone()]))
            .collect::<Vec<_>>();
        let existing = self.columns.entry(ColumnKind::Participant).or_default();
        for block in participant_blocks {
            if !existing.iter().any(|known| known.id == block.id) {
                existing.push(block);
            }
        }
        sort_blocks(existing);

        self.decision_participants += stage_blocks.decision_participants;
        Ok(())
    }

    fn merge_column(&mut self, column: ColumnKind, blocks: Vec<Block>) {
        let existing = self.columns.entry(column).or_default();
        for block in blocks {
            update_blocks(existing, block);
        }

        if column == ColumnKind::Fairness {
            for block in existing.iter_mut() {
                let key = block.id.trim_start_matches(column.prefix()).to_owned();
                block.title = fairness_title(&key, block.participants.len());
            }
        } else {
            sort_blocks(existing);
        }
    }

    pub fn blocks(&self, column: ColumnKind) -> &[Block] {
        self.columns.get(&column).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn block(&self, id: &str) -> Option<&Block> {
        self.columns
            .values()
            .flat_map(|blocks| blocks.iter())
            .find(|block| block.id == id)
    }

    /// `(block id, participants)` for every stage column, in column order.
    pub fn all_block_participants(&self) -> Vec<(BlockId, Vec<ParticipantId>)> {
        self.columns
            .iter()
            .filter(|(column, _)| **column != ColumnKind::Participant)
            .flat_map(|(_, blocks)| blocks.iter())
            .map(|block| (block.id.clone(), block.participants.clone()))
            .collect()
    }

    pub fn block_participants(&self) -> HashMap<BlockId, Vec<ParticipantId>> {
        self.all_block_participants().into_iter().collect()
    }

    /// Sum of block sizes for a stage. The decision-making stage reports the
    /// largest of its three group columns.
    pub fn total_participants(&self, stage: Stage) -> usize {
        let column_total =
            |column| self.blocks(column).iter().map(|block| block.participants.len()).sum::<usize>();

        match stage {
            Stage::Participant => self.blocks(ColumnKind::Participant).len(),
            Stage::Background => column_total(ColumnKind::Category),
            Stage::DriversOfChange => column_total(ColumnKind::Factor),
            Stage::FutureManagement => column_total(ColumnKind::Strategy),
            Stage::DecisionMaking => [
                ColumnKind::Represented,
                ColumnKind::NotRepresented,
                ColumnKind::OthersToInclude,
            ]
            .into_iter()
            .map(column_total)
            .max()
            .unwrap_or(0),
        }
    }

    pub fn max_participants(&self) -> usize {
        [
            Stage::Background,
            Stage::DriversOfChange,
            Stage::FutureManagement,
            Stage::DecisionMaking,
        ]
        .into_iter()
        .map(|stage| self.total_participants(stage))
        .max()
        .unwrap_or(0)
    }

    /// Number of decision-making records aggregated so far.
    pub fn decision_participants(&self) -> usize {
        self.decision_participants
    }

    /// Participant counts of the fair/unfair blocks and every group block.
    pub fn block_totals(&self) -> BTreeMap<BlockId, usize> {
        let mut totals = BTreeMap::new();
        for fairness in [Fairness::Fair, Fairness::Unfair] {
            let id = format!("{}{}", ColumnKind::Fairness.prefix(), fairness.key());
            let count = self
                .blocks(ColumnKind::Fairness)
                .iter()
                .find(|block| block.id == id)
                .map_or(0, |block| block.participants.len());
            totals.insert(id, count);
        }

        for column in [
            ColumnKind::Represented,
            ColumnKind::NotRepresented,
            ColumnKind::OthersToInclude,
        ] {
            for block in self.blocks(column) {
                totals.insert(block.id.clone(), block.participants.len());
            }
        }
        totals
    }
}

fn fairness_title(key: &str, count: usize) -> String {
    format!("{key}: {count}")
}

fn aggregate_dataset(dataset: &Dataset) -> Result<StageBlocks> {
    let mut participants = BTreeSet::new();
    let metadata = &dataset.metadata;

    let category = aggregate_background(&dataset.background, metadata, &mut participants)?;
    let factor = aggregate_drivers(&dataset.drivers_of_change, metadata, &mut participants)?;
    let strategy =
        aggregate_future_management(&dataset.future_management, metadata, &mut participants)?;
    let mut columns = vec![
        (ColumnKind::Category, category),
        (ColumnKind::Factor, factor),
        (ColumnKind::Strategy, strategy),
    ];
    columns.extend(aggregate_decision_making(
        &dataset.decision_making,
        metadata,
        &mut participants,
    )?);

    Ok(StageBlocks {
        columns,
        participants,
        decision_participants: dataset.decision_making.len(),
    })
}

fn participant_id(stage: Stage, index: usize, id: Option<&String>) -> Result<&str> {
    match id.map(|id| id.trim()) {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(FlowError::MissingParticipantId { stage, index }),
    }
}

fn required<'a, T>(
    stage: Stage,
    participant: &str,
    field: &'static str,
    value: Option<&'a T>,
) -> Result<&'a T> {
    value.ok_or_else(|| FlowError::missing(stage, participant, field))
}

/// A required, non-blank text field.
fn required_text<'a>(
    stage: Stage,
    participant: &str,
    field: &'static str,
    value: Option<&'a String>,
) -> Result<&'a str> {
    let value = required(stage, participant, field, value)?;
    if value.trim().is_empty() {
        return Err(FlowError::malformed(stage, participant, field, value.as_str()));
    }
    Ok(value.as_str())
}

fn aggregate_background(
    chunks: &[Chunk<BackgroundSummary>],
    metadata: &Metadata,
    participants: &mut BTreeSet<ParticipantId>,
) -> Result<Vec<Block>> {
    const STAGE: Stage = Stage::Background;
    let mut accumulator = CategoryAccumulator::new(ColumnKind::Category);

    for (index, chunk) in chunks.iter().enumerate() {
        let summary = &chunk.summary;
        let id = participant_id(STAGE, index, summary.id.as_ref())?;
        let categories = required(STAGE, id, "categories", summary.categories.as_ref())?;
        let occupation = summary.relationship.clone().unwrap_or_default();

        for category in categories {
            if category.trim().is_empty() {
                return Err(FlowError::malformed(STAGE, id, "categories", category.as_str()));
            }
            accumulator.push(category, id, occupation.clone());
        }
        participants.insert(id.to_owned());
    }

    let blocks = accumulator.into_blocks(metadata.categories(ColumnKind::Category));
    debug!(stage = %STAGE, records = chunks.len(), blocks = blocks.len(), "aggregated stage");
    Ok(blocks)
}

fn aggregate_drivers(
    chunks: &[Chunk<DriversSummary>],
    metadata: &Metadata,
    participants: &mut BTreeSet<ParticipantId>,
) -> Result<Vec<Block>> {
    const STAGE: Stage = Stage::DriversOfChange;
    let mut accumulator = CategoryAccumulator::new(ColumnKind::Factor);

    for (index, chunk) in chunks.iter().enumerate() {
        let summary = &chunk.summary;
        let id = participant_id(STAGE, index, summary.id.as_ref())?;
        let factors = required(STAGE, id, "factors", summary.factors.as_ref())?;

        for factor in factors {
            let category = required_text(STAGE, id, "factors.category", factor.category.as_ref())?;
            let name = required_text(STAGE, id, "factors.factor_name", factor.factor_name.as_ref())?;
            accumulator.push(category, id, name);
        }
        participants.insert(id.to_owned());
    }

    let blocks = accumulator.into_blocks(metadata.categories(ColumnKind::Factor));
    debug!(stage = %STAGE, records = chunks.len(), blocks = blocks.len(), "aggregated stage");
    Ok(blocks)
}

fn aggregate_future_management(
    chunks: &[Chunk<FutureManagementSummary>],
    metadata: &Metadata,
    participants: &mut BTreeSet<ParticipantId>,
) -> Result<Vec<Block>> {
    const STAGE: Stage = Stage::FutureManagement;
    let mut accumulator = CategoryAccumulator::new(ColumnKind::Strategy);

    for (index, chunk) in chunks.iter().enumerate() {
        let summary = &chunk.summary;
        let id = participant_id(STAGE, index, summary.id.as_ref())?;
        let strategies = required(
            STAGE,
            id,
            "important salinity management strategies",
            summary.strategies.as_ref(),
        )?;

        for strategy in strategies {
            let category =
                required_text(STAGE, id, "strategies.category", strategy.category.as_ref())?;
            let name = required_text(STAGE, id, "strategies.strategy", strategy.strategy.as_ref())?;
            accumulator.push(category, id, name);
        }
        participants.insert(id.to_owned());
    }

    let blocks = accumulator.into_blocks(metadata.categories(ColumnKind::Strategy));
    debug!(stage = %STAGE, records = chunks.len(), blocks = blocks.len(), "aggregated stage");
    Ok(blocks)
}

fn push_groups(
    accumulator: &mut CategoryAccumulator,
    participant: &str,
    field: &'static str,
    groups: Option<&Vec<Group>>,
) -> Result<()> {
    const STAGE: Stage = Stage::DecisionMaking;
    for group in required(STAGE, participant, field, groups)? {
        let category = required_text(STAGE, participant, field, group.category.as_ref())?;
        let name = required_text(STAGE, participant, field, group.group.as_ref())?;
        accumulator.push(category, participant, name);
    }
    Ok(())
}

fn aggregate_decision_making(
    chunks: &[Chunk<DecisionMakingSummary>],
    metadata: &Metadata,
    participants: &mut BTreeSet<ParticipantId>,
) -> Result<Vec<(ColumnKind, Vec<Block>)>> {
    const STAGE: Stage = Stage::DecisionMaking;
    let mut fairness: BTreeMap<&'static str, Vec<ParticipantId>> = BTreeMap::new();
    let mut represented = CategoryAccumulator::new(ColumnKind::Represented);
    let mut not_represented = CategoryAccumulator::new(ColumnKind::NotRepresented);
    let mut others = CategoryAccumulator::new(ColumnKind::OthersToInclude);

    for (index, chunk) in chunks.iter().enumerate() {
        let summary = &chunk.summary;
        let id = participant_id(STAGE, index, summary.id.as_ref())?;

        let raw_fairness = required(STAGE, id, "Is the process fair", summary.fairness.as_ref())?;
        let answer = Fairness::parse(raw_fairness).ok_or_else(|| {
            FlowError::malformed(STAGE, id, "Is the process fair", raw_fairness.as_str())
        })?;
        fairness.entry(answer.key()).or_default().push(id.to_owned());

        push_groups(&mut represented, id, "Who is represented", summary.represented.as_ref())?;
        push_groups(
            &mut not_represented,
            id,
            "Who is not represented",
            summary.not_represented.as_ref(),
        )?;
        push_groups(
            &mut others,
            id,
            "What other people to connect with",
            summary.others_to_include.as_ref(),
        )?;
        participants.insert(id.to_owned());
    }

    let fairness_blocks = Fairness::ALL
        .into_iter()
        .map(|answer| {
            let members = fairness.remove(answer.key()).unwrap_or_default();
            let content = members
                .iter()
                .map(|participant| (participant.clone(), answer.key().to_owned()))
                .collect();
            let mut block = Block::new(ColumnKind::Fairness, answer.key(), members).with_content(content);
            block.title = fairness_title(answer.key(), block.participants.len());
            block
        })
        .collect::<Vec<_>>();

    debug!(stage = %STAGE, records = chunks.len(), "aggregated stage");
    Ok(vec![
        (ColumnKind::Fairness, fairness_blocks),
        (
            ColumnKind::Represented,
            represented.into_blocks(metadata.categories(ColumnKind::Represented)),
        ),
        (
            ColumnKind::NotRepresented,
            not_represented.into_blocks(metadata.categories(ColumnKind::NotRepresented)),
        ),
        (
            ColumnKind::OthersToInclude,
            others.into_blocks(metadata.categories(ColumnKind::OthersToInclude)),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATASET: &str = r#"{
        "background": [
            {"summary": {"id": "A", "categories": ["Farmer", "Official"], "relationship to the delta": "grower"}},
            {"summary": {"id": "B", "categories": ["Farmer"], "relationship to the delta": "trader"}},
            {"summary": {"id": "C", "categories": ["Scientist"]}}
        ],
        "drivers_of_change": [
            {"summary": {"id": "A", "factors": [
                {"factor_name": "sea level", "category": "Climate"},
                {"factor_name": "dams", "category": "Infrastructure"}
            ]}},
            {"summary": {"id": "B", "factors": [{"factor_name": "storms", "category": "Climate"}]}}
        ],
        "future_management": [
            {"summary": {"id": "A", "important salinity management strategies": [
                {"strategy": "sluice gates", "category": "Engineering"}
            ]}}
        ],
        "decision_making": [
            {"summary": {"id": "A", "Is the process fair": "Fair",
                "Who is represented": [{"group": "Ministry", "category": "Government"}],
                "Who is not represented": [{"group": "Farmers", "category": "Local people"}],
                "What other people to connect with": []}},
            {"summary": {"id": "B", "Is the process fair": "unclear",
                "Who is represented": [{"group": "Province", "category": "Government"}],
                "Who is not represented": [],
                "What other people to connect with": [{"group": "NGOs", "category": "Civil society"}]}}
        ],
        "metadata": {
            "participant_categories": ["Farmer", "Official", "Scientist", "Student"],
            "factor_categories": ["Climate", "Infrastructure"],
            "strategy_categories": ["Engineering", "Policy"],
            "represented_categories": ["Government"],
            "not_represented_categories": ["Local people"],
            "others_to_include_categories": ["Civil society"]
        }
    }"#;

    fn aggregator() -> BlockAggregator {
        BlockAggregator::new(&Dataset::from_json_str(DATASET).expect("fixture parses"))
            .expect("fixture aggregates")
    }

    #[test]
    fn background_blocks_sorted_with_empty_placeholders() {
        let aggregator = aggregator();
        let blocks = aggregator.blocks(ColumnKind::Category);
        let ids = blocks.iter().map(|block| block.id.as_str()).collect::<Vec<_>>();
        assert_eq!(
            ids,
            [
                "category-farmer",
                "category-official",
                "category-scientist",
                "category-student"
            ]
        );
        assert_eq!(blocks[0].participants, ["A", "B"]);
        assert_eq!(blocks[0].content[1], ("B".to_owned(), "trader".to_owned()));
        assert!(blocks[3].participants.is_empty());
    }

    #[test]
    fn fairness_blocks_keep_fixed_order_and_counted_titles() {
        let aggregator = aggregator();
        let titles = aggregator
            .blocks(ColumnKind::Fairness)
            .iter()
            .map(|block| block.title.as_str())
            .collect::<Vec<_>>();
        assert_eq!(titles, ["fair: 1", "unfair: 0", "unclear: 1"]);
        assert_eq!(aggregator.blocks(ColumnKind::Fairness)[0].id, "rect-fair");
    }

    #[test]
    fn totals_follow_stage_rules() {
        let aggregator = aggregator();
        assert_eq!(aggregator.total_participants(Stage::Background), 4);
        assert_eq!(aggregator.total_participants(Stage::DriversOfChange), 3);
        assert_eq!(aggregator.total_participants(Stage::FutureManagement), 1);
        assert_eq!(aggregator.total_participants(Stage::DecisionMaking), 2);
        assert_eq!(aggregator.max_participants(), 4);
        assert_eq!(aggregator.decision_participants(), 2);

        let totals = aggregator.block_totals();
        assert_eq!(totals["rect-fair"], 1);
        assert_eq!(totals["rect-unfair"], 0);
        assert_eq!(totals["represented-government"], 2);
        assert!(!totals.contains_key("rect-unclear"));
    }

    #[test]
    fn participant_column_lists_everyone_once() {
        let aggregator = aggregator();
        let ids = aggregator
            .blocks(ColumnKind::Participant)
            .iter()
            .map(|block| block.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["participant-a", "participant-b", "participant-c"]);
    }

    #[test]
    fn missing_field_names_participant() {
        let dataset = Dataset::from_json_str(
            r#"{"drivers_of_change": [{"summary": {"id": "P7"}}]}"#,
        )
        .expect("parses");
        let error = BlockAggregator::new(&dataset).expect_err("contract violation");
        match error {
            FlowError::MissingField {
                stage,
                participant,
                field,
            } => {
                assert_eq!(stage, Stage::DriversOfChange);
                assert_eq!(participant, "P7");
                assert_eq!(field, "factors");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_id_reports_record_index() {
        let dataset = Dataset::from_json_str(
            r#"{"background": [{"summary": {"id": "A", "categories": []}}, {"summary": {}}]}"#,
        )
        .expect("parses");
        assert!(matches!(
            BlockAggregator::new(&dataset),
            Err(FlowError::MissingParticipantId {
                stage: Stage::Background,
                index: 1
            })
        ));
    }

    #[test]
    fn unknown_fairness_is_malformed() {
        let dataset = Dataset::from_json_str(
            r#"{"decision_making": [{"summary": {"id": "Q", "Is the process fair": "sometimes",
                "Who is represented": [], "Who is not represented": [],
                "What other people to connect with": []}}]}"#,
        )
        .expect("parses");
        assert!(matches!(
            BlockAggregator::new(&dataset),
            Err(FlowError::MalformedValue { field: "Is the process fair", .. })
        ));
    }

    #[test]
    fn extend_merges_disjoint_records_by_block_id() {
        let mut aggregator = aggregator();
        let extra = Dataset::from_json_str(
            r#"{
                "background": [{"summary": {"id": "D", "categories": ["Student", "Farmer"]}}],
                "decision_making": [{"summary": {"id": "D", "Is the process fair": "unfair",
                    "Who is represented": [], "Who is not represented": [],
                    "What other people to connect with": []}}],
                "metadata": {"participant_categories": ["Farmer", "Student"]}
            }"#,
        )
        .expect("parses");
        aggregator.extend(&extra).expect("merges");

        let farmer = aggregator.block("category-farmer").expect("farmer block");
        assert_eq!(farmer.participants, ["A", "B", "D"]);
        let student = aggregator.block("category-student").expect("student block");
        assert_eq!(student.participants, ["D"]);
        assert_eq!(aggregator.blocks(ColumnKind::Category).len(), 4);
        assert_eq!(aggregator.block("rect-unfair").map(|b| b.title.as_str()), Some("unfair: 1"));
        assert_eq!(aggregator.decision_participants(), 3);
    }

    #[test]
    fn failed_extend_leaves_blocks_untouched() {
        let mut aggregator = aggregator();
        let before = aggregator.all_block_participants();
        let broken = Dataset::from_json_str(
            r#"{"background": [{"summary": {"id": "E", "categories": ["Farmer"]}}],
                "future_management": [{"summary": {"id": "E"}}]}"#,
        )
        .expect("parses");
        assert!(aggregator.extend(&broken).is_err());
        assert_eq!(aggregator.all_block_participants(), before);
    }
}
