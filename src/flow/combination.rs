use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Serialize, Serializer};
use tracing::debug;

use super::block::{Block, BlockId, BlockRef, ParticipantId};

/// Index of a combination in discovery order, rendered as `c-{index}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CombinationId(pub usize);

impl fmt::Display for CombinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c-{}", self.0)
    }
}

impl Serialize for CombinationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Combination {
    pub id: CombinationId,
    pub member_block_ids: BTreeSet<BlockId>,
    /// Member blocks in the order the first participant listed them.
    pub content: Vec<BlockRef>,
}

/// Output of [`generate_combinations`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Combinations {
    combinations: Vec<Combination>,
    participant_combinations: BTreeMap<ParticipantId, CombinationId>,
    mentioned_participants: Vec<ParticipantId>,
}

impl Combinations {
    pub fn len(&self) -> usize {
        self.combinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Combination> {
        self.combinations.iter()
    }

    pub fn ids(&self) -> Vec<CombinationId> {
        self.combinations.iter().map(|combination| combination.id).collect()
    }

    pub fn get(&self, id: CombinationId) -> Option<&Combination> {
        self.combinations
            .iter()
            .find(|combination| combination.id == id)
    }

    /// Blocks spanned by a combination, for legends and tooltips.
    pub fn content(&self, id: CombinationId) -> Option<&[BlockRef]> {
        self.get(id).map(|combination| combination.content.as_slice())
    }

    pub fn combination_content(&self) -> BTreeMap<CombinationId, Vec<BlockRef>> {
        self.combinations
            .iter()
            .map(|combination| (combination.id, combination.content.clone()))
            .collect()
    }

    pub fn participant_combinations(&self) -> &BTreeMap<ParticipantId, CombinationId> {
        &self.participant_combinations
    }

    pub fn combination_of(&self, participant: &str) -> Option<CombinationId> {
        self.participant_combinations.get(participant).copied()
    }

    /// Participants in first-seen order.
    pub fn mentioned_participants(&self) -> &[ParticipantId] {
        &self.mentioned_participants
    }

    pub fn participants_of(&self, id: CombinationId) -> Vec<&str> {
        self.mentioned_participants
            .iter()
            .filter(|participant| self.combination_of(participant) == Some(id))
            .map(String::as_str)
            .collect()
    }
}

/// Groups the participants of `blocks` into combinations: two participants
/// share a combination iff they appear in exactly the same set of blocks.
pub fn generate_combinations(blocks: &[Block]) -> Combinations {
    generate_combinations_from(blocks, 0)
}

/// Like [`generate_combinations`], numbering combinations from `first_index`
/// so that several flows can be colored side by side.
pub fn generate_combinations_from(blocks: &[Block], first_index: usize) -> Combinations {
    let titles = blocks
        .iter()
        .map(|block| (block.id.as_str(), block.title.as_str()))
        .collect::<HashMap<_, _>>();

    let mut mentioned: Vec<&str> = Vec::new();
    let mut memberships: HashMap<&str, Vec<&str>> = HashMap::new();
    for block in blocks {
        for participant in block.unique_participants() {
            let member_of = memberships.entry(participant).or_insert_with(|| {
                mentioned.push(participant);
                Vec::new()
            });
            if !member_of.contains(&block.id.as_str()) {
                member_of.push(block.id.as_str());
            }
        }
    }

    let mut index_by_key: HashMap<BTreeSet<BlockId>, usize> = HashMap::new();
    let mut combinations: Vec<Combination> = Vec::new();
    let mut participant_combinations = BTreeMap::new();

    for participant in &mentioned {
        let member_of = &memberships[participant];
        let key = member_of
            .iter()
            .map(|id| (*id).to_owned())
            .collect::<BTreeSet<_>>();

        let index = *index_by_key.entry(key.clone()).or_insert_with(|| {
            let index = first_index + combinations.len();
            combinations.push(Combination {
                id: CombinationId(index),
                member_block_ids: key,
                content: member_of
                    .iter()
                    .map(|id| BlockRef {
                        id: (*id).to_owned(),
                        title: titles.get(id).copied().unwrap_or_default().to_owned(),
                    })
                    .collect(),
            });
            index
        });
        participant_combinations.insert((*participant).to_owned(), CombinationId(index));
    }

    debug!(
        blocks = blocks.len(),
        participants = mentioned.len(),
        combinations = combinations.len(),
        "generated combinations"
    );

    Combinations {
        combinations,
        participant_combinations,
        mentioned_participants: mentioned.into_iter().map(str::to_owned).collect(),
    }
}

/// Participants of one block that fall in one combination.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CombinationGroup {
    pub combination: CombinationId,
    pub participants: Vec<ParticipantId>,
}

/// For every block, its participants grouped by combination, groups ordered
/// by first appearance in the block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockCombinations {
    groups: HashMap<BlockId, Vec<CombinationGroup>>,
}

impl BlockCombinations {
    /// Participants without a combination are left out. Repeated block ids
    /// are merged.
    pub fn build<'a>(
        blocks: impl IntoIterator<Item = (&'a str, &'a [ParticipantId])>,
        participant_combinations: &BTreeMap<ParticipantId, CombinationId>,
    ) -> Self {
        let mut groups: HashMap<BlockId, Vec<CombinationGroup>> = HashMap::new();
        for (block_id, participants) in blocks {
            let block_groups = groups.entry(block_id.to_owned()).or_default();
            for participant in participants {
                let Some(&combination) = participant_combinations.get(participant) else {
                    continue;
                };
                match block_groups
                    .iter_mut()
                    .find(|group| group.combination == combination)
                {
                    Some(group) => {
                        if !group.participants.contains(participant) {
                            group.participants.push(participant.clone());
                        }
                    }
                    None => block_groups.push(CombinationGroup {
                        combination,
                        participants: vec![participant.clone()],
                    }),
                }
            }
        }
        Self { groups }
    }

    pub fn from_blocks(blocks: &[Block], combinations: &Combinations) -> Self {
        Self::build(
            blocks
                .iter()
                .map(|block| (block.id.as_str(), block.participants.as_slice())),
            combinations.participant_combinations(),
        )
    }

    pub fn contains_block(&self, block_id: &str) -> bool {
        self.groups.contains_key(block_id)
    }

    pub fn block_ids(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Unknown blocks have no groups.
    pub fn groups(&self, block_id: &str) -> &[CombinationGroup] {
        self.groups.get(block_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn group(&self, block_id: &str, combination: CombinationId) -> Option<&CombinationGroup> {
        self.groups(block_id)
            .iter()
            .find(|group| group.combination == combination)
    }

    pub fn combinations(&self, block_id: &str) -> impl Iterator<Item = CombinationId> + '_ {
        self.groups(block_id).iter().map(|group| group.combination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::column::ColumnKind;

    fn block(title: &str, participants: &[&str]) -> Block {
        Block::new(
            ColumnKind::Category,
            title,
            participants.iter().map(|p| (*p).to_owned()).collect(),
        )
    }

    #[test]
    fn shared_membership_forms_one_combination() {
        let blocks = [block("X", &["A", "B", "C"]), block("Y", &["A", "B"])];
        let combinations = generate_combinations(&blocks);

        assert_eq!(combinations.len(), 2);
        assert_eq!(combinations.combination_of("A"), Some(CombinationId(0)));
        assert_eq!(combinations.combination_of("B"), Some(CombinationId(0)));
        assert_eq!(combinations.combination_of("C"), Some(CombinationId(1)));
        assert_eq!(combinations.participants_of(CombinationId(0)), ["A", "B"]);

        let content = combinations.content(CombinationId(0)).expect("c-0 exists");
        let titles = content.iter().map(|r| r.title.as_str()).collect::<Vec<_>>();
        assert_eq!(titles, ["X", "Y"]);
        assert_eq!(combinations.mentioned_participants(), ["A", "B", "C"]);
    }

    #[test]
    fn membership_compared_as_sets() {
        // Two entries for X: A is seen in X before Y, B in Y before X.
        let blocks = [block("X", &["A"]), block("Y", &["B", "A"]), block("X", &["B"])];
        let combinations = generate_combinations(&blocks);

        assert_eq!(combinations.len(), 1);
        assert_eq!(combinations.combination_of("A"), combinations.combination_of("B"));
        let members = &combinations.get(CombinationId(0)).expect("c-0").member_block_ids;
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn duplicate_participants_do_not_split_combinations() {
        let blocks = [block("X", &["A", "A", "B"])];
        let combinations = generate_combinations(&blocks);
        assert_eq!(combinations.len(), 1);
        assert_eq!(combinations.participants_of(CombinationId(0)), ["A", "B"]);
    }

    #[test]
    fn empty_blocks_give_empty_output() {
        let combinations = generate_combinations(&[block("X", &[])]);
        assert!(combinations.is_empty());
        assert!(combinations.participant_combinations().is_empty());

        let grouped = BlockCombinations::from_blocks(&[block("X", &[])], &combinations);
        assert!(grouped.contains_block("category-x"));
        assert!(grouped.groups("category-x").is_empty());
    }

    #[test]
    fn block_groups_follow_first_appearance() {
        let blocks = [block("X", &["C", "A", "B"]), block("Y", &["A", "B"])];
        let combinations = generate_combinations(&blocks);
        let grouped = BlockCombinations::from_blocks(&blocks, &combinations);

        let x = grouped.groups("category-x");
        assert_eq!(x.len(), 2);
        assert_eq!(x[0].combination, combinations.combination_of("C").expect("C mapped"));
        assert_eq!(x[1].participants, ["A", "B"]);
        assert_eq!(grouped.combinations("category-y").count(), 1);
        assert!(grouped.groups("category-z").is_empty());
    }

    #[test]
    fn numbering_can_start_later() {
        let blocks = [block("X", &["A"]), block("Y", &["B"])];
        let combinations = generate_combinations_from(&blocks, 5);
        assert_eq!(combinations.ids(), [CombinationId(5), CombinationId(6)]);
        assert_eq!(combinations.participants_of(CombinationId(6)), ["B"]);
        assert!(combinations.get(CombinationId(0)).is_none());
    }

    #[test]
    fn ids_render_with_prefix() {
        assert_eq!(CombinationId(3).to_string(), "c-3");
        assert_eq!(
            serde_json::to_string(&CombinationId(12)).expect("serializes"),
            "\"c-12\""
        );
    }
}
