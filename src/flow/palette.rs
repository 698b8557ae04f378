use std::collections::BTreeMap;

use eframe::egui::Color32;

use super::block::ParticipantId;
use super::combination::CombinationId;

pub const PALETTE: [Color32; 16] = [
    Color32::from_rgb(0xae, 0xe1, 0xd7),
    Color32::from_rgb(0xf8, 0xb8, 0x97),
    Color32::from_rgb(0xf4, 0xcf, 0xdd),
    Color32::from_rgb(0xf9, 0xea, 0x9a),
    Color32::from_rgb(0xcc, 0xc7, 0xb9),
    Color32::from_rgb(0xea, 0xf9, 0xd9),
    Color32::from_rgb(0xc0, 0xd6, 0xdf),
    Color32::from_rgb(0xe2, 0xd4, 0xba),
    Color32::from_rgb(0xa5, 0xff, 0xd6),
    Color32::from_rgb(0xfe, 0xd9, 0xb7),
    Color32::from_rgb(0xf0, 0x71, 0x67),
    Color32::from_rgb(0xf6, 0xc0, 0xd0),
    Color32::from_rgb(0xd0, 0xa5, 0xc0),
    Color32::from_rgb(0xf1, 0xde, 0xdc),
    Color32::from_rgb(0xe1, 0xda, 0xbd),
    Color32::from_rgb(0xab, 0xc7, 0x98),
];

/// Keeps combination colors stable across render cycles.
///
/// A combination that was colored before keeps its color. A new one takes
/// `PALETTE[(previously colored + rank) % 16]`, where rank counts new
/// combinations in this call starting at 1. Combinations missing from a call
/// lose their color, so their palette slots can be handed out again. More than
/// sixteen live combinations repeat colors.
#[derive(Clone, Debug, Default)]
pub struct ColorAssigner {
    combination_colors: BTreeMap<CombinationId, Color32>,
    participant_colors: BTreeMap<ParticipantId, Color32>,
}

impl ColorAssigner {
    pub fn assign(
        &mut self,
        combinations: &[CombinationId],
        participant_combinations: &BTreeMap<ParticipantId, CombinationId>,
    ) {
        let previously_colored = self.combination_colors.len();
        let mut new_rank = 0usize;
        let mut combination_colors = BTreeMap::new();

        for &combination in combinations {
            let color = match self.combination_colors.get(&combination) {
                Some(&color) => color,
                None => {
                    new_rank += 1;
                    PALETTE[(previously_colored + new_rank) % PALETTE.len()]
                }
            };
            combination_colors.insert(combination, color);
        }

        self.participant_colors = participant_combinations
            .iter()
            .filter_map(|(participant, combination)| {
                combination_colors
                    .get(combination)
                    .map(|&color| (participant.clone(), color))
            })
            .collect();
        self.combination_colors = combination_colors;
    }

    pub fn color(&self, combination: CombinationId) -> Option<Color32> {
        self.combination_colors.get(&combination).copied()
    }

    pub fn participant_color(&self, participant: &str) -> Option<Color32> {
        self.participant_colors.get(participant).copied()
    }

    pub fn combination_colors(&self) -> &BTreeMap<CombinationId, Color32> {
        &self.combination_colors
    }

    pub fn clear(&mut self) {
        self.combination_colors.clear();
        self.participant_colors.clear();
    }
}

pub fn to_hex(color: Color32) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r(), color.g(), color.b())
}
