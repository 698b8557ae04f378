use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::block::Block;

/// Interview stage a column belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Participant,
    Background,
    DriversOfChange,
    FutureManagement,
    DecisionMaking,
}

impl Stage {
    pub fn key(self) -> &'static str {
        match self {
            Self::Participant => "participant",
            Self::Background => "background",
            Self::DriversOfChange => "drivers_of_change",
            Self::FutureManagement => "future_management",
            Self::DecisionMaking => "decision_making",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnKind {
    Participant,
    Category,
    Factor,
    Strategy,
    Fairness,
    Represented,
    NotRepresented,
    OthersToInclude,
}

impl ColumnKind {
    pub const ALL: [Self; 8] = [
        Self::Participant,
        Self::Category,
        Self::Factor,
        Self::Strategy,
        Self::Fairness,
        Self::Represented,
        Self::NotRepresented,
        Self::OthersToInclude,
    ];

    /// Columns shown when nothing else is requested.
    pub const DEFAULT_ORDER: [Self; 7] = [
        Self::Category,
        Self::Factor,
        Self::Strategy,
        Self::Fairness,
        Self::Represented,
        Self::NotRepresented,
        Self::OthersToInclude,
    ];

    /// Block id prefix; also serves as the column id.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Participant => "participant-",
            Self::Category => "category-",
            Self::Factor => "factor-category-",
            Self::Strategy => "strategy-",
            Self::Fairness => "rect-",
            Self::Represented => "represented-",
            Self::NotRepresented => "not-represented-",
            Self::OthersToInclude => "others-to-include-",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Participant => "Participant",
            Self::Category => "Categories",
            Self::Factor => "Factors",
            Self::Strategy => "Strategies",
            Self::Fairness => "Fairness",
            Self::Represented => "Involved Groups",
            Self::NotRepresented => "Overlooked Groups",
            Self::OthersToInclude => "Others to Include",
        }
    }

    pub fn stage(self) -> Stage {
        match self {
            Self::Participant => Stage::Participant,
            Self::Category => Stage::Background,
            Self::Factor => Stage::DriversOfChange,
            Self::Strategy => Stage::FutureManagement,
            Self::Fairness | Self::Represented | Self::NotRepresented | Self::OthersToInclude => {
                Stage::DecisionMaking
            }
        }
    }

    pub fn block_id(self, category: &str) -> String {
        format!("{}{}", self.prefix(), normalize_category(category))
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Participant => "participant",
            Self::Category => "category",
            Self::Factor => "factor",
            Self::Strategy => "strategy",
            Self::Fairness => "fairness",
            Self::Represented => "represented",
            Self::NotRepresented => "not-represented",
            Self::OthersToInclude => "others-to-include",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ColumnKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|column| column.key() == wanted || column.prefix().trim_end_matches('-') == wanted)
            .ok_or_else(|| {
                let known = Self::ALL.map(Self::key).join(", ");
                format!("unknown column `{value}` (expected one of: {known})")
            })
    }
}

/// Lowercases and turns spaces into hyphens.
pub fn normalize_category(category: &str) -> String {
    category.to_lowercase().replace(' ', "-")
}

/// Splits `ordered` into maximal runs of adjacent columns that contain at
/// least one clicked block.
pub fn connected_components(ordered: &[ColumnKind], clicked: &[Block]) -> Vec<Vec<ColumnKind>> {
    let mut components = Vec::new();
    let mut current = Vec::new();

    for &column in ordered {
        if clicked.iter().any(|block| block.column == column) {
            current.push(column);
        } else if !current.is_empty() {
            components.push(std::mem::take(&mut current));
        }
    }

    if !current.is_empty() {
        components.push(current);
    }
    components
}
