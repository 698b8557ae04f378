use std::collections::BTreeSet;

use serde::Serialize;

use super::block::{BlockId, ParticipantId};
use super::column::ColumnKind;
use super::combination::{BlockCombinations, CombinationId};

/// Participants of one combination flowing from a source block to a target
/// block. `value` always equals the number of participants.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Link {
    pub source: BlockId,
    pub target: BlockId,
    pub source_column: ColumnKind,
    pub target_column: ColumnKind,
    pub combination: CombinationId,
    participants: Vec<ParticipantId>,
    value: usize,
}

impl Link {
    pub fn participants(&self) -> &[ParticipantId] {
        &self.participants
    }

    pub fn value(&self) -> usize {
        self.value
    }

    fn merge_participants(&mut self, participants: &[ParticipantId]) {
        for participant in participants {
            if !self.participants.contains(participant) {
                self.participants.push(participant.clone());
            }
        }
        self.value = self.participants.len();
    }
}

/// Links keyed by `(source, target, combination)`, in discovery order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LinkSet {
    links: Vec<Link>,
}

impl LinkSet {
    /// Adds a link, or merges `participants` into the link already holding
    /// the same triple.
    pub fn add(
        &mut self,
        source: &str,
        target: &str,
        source_column: ColumnKind,
        target_column: ColumnKind,
        combination: CombinationId,
        participants: &[ParticipantId],
    ) {
        if let Some(link) = self.links.iter_mut().find(|link| {
            link.source == source && link.target == target && link.combination == combination
        }) {
            link.merge_participants(participants);
            return;
        }

        let mut link = Link {
            source: source.to_owned(),
            target: target.to_owned(),
            source_column,
            target_column,
            combination,
            participants: Vec::with_capacity(participants.len()),
            value: 0,
        };
        link.merge_participants(participants);
        self.links.push(link);
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    /// Combinations carried by at least one link.
    pub fn combinations(&self) -> BTreeSet<CombinationId> {
        self.links.iter().map(|link| link.combination).collect()
    }

    /// Target blocks in first-linked order.
    pub fn targets(&self) -> Vec<BlockId> {
        let mut targets: Vec<BlockId> = Vec::new();
        for link in &self.links {
            if !targets.contains(&link.target) {
                targets.push(link.target.clone());
            }
        }
        targets
    }
}

impl<'a> IntoIterator for &'a LinkSet {
    type Item = &'a Link;
    type IntoIter = std::slice::Iter<'a, Link>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}

/// Links every source block to every target block through the combinations
/// they share. With `passthrough` set, only those combinations are
/// considered. The participants of a link are the source group members that
/// are also in the target group; pairs sharing none are not linked.
pub fn links_between_columns(
    block_combinations: &BlockCombinations,
    passthrough: Option<&BTreeSet<CombinationId>>,
    src_block_ids: &[BlockId],
    dst_block_ids: &[BlockId],
    src_column: ColumnKind,
    dst_column: ColumnKind,
) -> LinkSet {
    let allowed = |combination: &CombinationId| passthrough.is_none_or(|set| set.contains(combination));
    let mut links = LinkSet::default();

    for src_block_id in src_block_ids {
        for src_group in block_combinations
            .groups(src_block_id)
            .iter()
            .filter(|group| allowed(&group.combination))
        {
            for dst_block_id in dst_block_ids {
                let Some(dst_group) = block_combinations.group(dst_block_id, src_group.combination)
                else {
                    continue;
                };

                let participants = src_group
                    .participants
                    .iter()
                    .filter(|participant| dst_group.participants.contains(participant))
                    .cloned()
                    .collect::<Vec<_>>();
                if participants.is_empty() {
                    continue;
                }
                links.add(
                    src_block_id,
                    dst_block_id,
                    src_column,
                    dst_column,
                    src_group.combination,
                    &participants,
                );
            }
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn owned(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    #[test]
    fn rediscovery_updates_single_link() {
        let mut links = LinkSet::default();
        let participants = owned(&["A", "B"]);
        for _ in 0..2 {
            links.add(
                "category-x",
                "factor-category-z",
                ColumnKind::Category,
                ColumnKind::Factor,
                CombinationId(0),
                &participants,
            );
        }

        assert_eq!(links.len(), 1);
        let link = links.iter().next().expect("one link");
        assert_eq!(link.value(), 2);
        assert_eq!(link.participants(), participants.as_slice());
    }

    #[test]
    fn distinct_combinations_stay_separate() {
        let mut links = LinkSet::default();
        links.add("a", "b", ColumnKind::Category, ColumnKind::Factor, CombinationId(0), &owned(&["A"]));
        links.add("a", "b", ColumnKind::Category, ColumnKind::Factor, CombinationId(1), &owned(&["B"]));
        links.add("a", "b", ColumnKind::Category, ColumnKind::Factor, CombinationId(0), &owned(&["C"]));

        assert_eq!(links.len(), 2);
        let values = links.iter().map(Link::value).collect::<Vec<_>>();
        assert_eq!(values, [2, 1]);
        assert_eq!(links.targets(), ["b"]);
    }

    fn fixture() -> BlockCombinations {
        let participant_combinations = BTreeMap::from([
            ("A".to_owned(), CombinationId(0)),
            ("B".to_owned(), CombinationId(0)),
            ("C".to_owned(), CombinationId(1)),
        ]);
        let x = owned(&["A", "B", "C"]);
        let y = owned(&["A", "B"]);
        let z = owned(&["A", "C"]);
        let w = owned(&["B"]);
        BlockCombinations::build(
            [
                ("category-x", x.as_slice()),
                ("category-y", y.as_slice()),
                ("factor-category-z", z.as_slice()),
                ("factor-category-w", w.as_slice()),
            ],
            &participant_combinations,
        )
    }

    #[test]
    fn links_intersect_participants_per_combination() {
        let block_combinations = fixture();
        let links = links_between_columns(
            &block_combinations,
            None,
            &owned(&["category-x"]),
            &owned(&["factor-category-z", "factor-category-w"]),
            ColumnKind::Category,
            ColumnKind::Factor,
        );

        let summary = links
            .iter()
            .map(|link| (link.target.as_str(), link.combination, link.participants().to_vec()))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            [
                ("factor-category-z", CombinationId(0), owned(&["A"])),
                ("factor-category-w", CombinationId(0), owned(&["B"])),
                ("factor-category-z", CombinationId(1), owned(&["C"])),
            ]
        );
        assert!(links.iter().all(|link| link.value() == link.participants().len()));
    }

    #[test]
    fn passthrough_restricts_combinations() {
        let block_combinations = fixture();
        let passthrough = BTreeSet::from([CombinationId(1)]);
        let links = links_between_columns(
            &block_combinations,
            Some(&passthrough),
            &owned(&["category-x", "category-y"]),
            &owned(&["factor-category-z", "factor-category-w"]),
            ColumnKind::Category,
            ColumnKind::Factor,
        );

        assert_eq!(links.len(), 1);
        assert_eq!(links.combinations(), passthrough);
    }

    #[test]
    fn empty_blocks_contribute_nothing() {
        let links = links_between_columns(
            &fixture(),
            None,
            &owned(&["category-empty"]),
            &owned(&["factor-category-z"]),
            ColumnKind::Category,
            ColumnKind::Factor,
        );
        assert!(links.is_empty());
    }
}
