use std::path::Path;

use serde::Deserialize;

use super::column::ColumnKind;
use crate::error::{FlowError, Result};

/// Interview dataset as delivered by the server.
///
/// Per-participant fields are optional here so that a missing field can be
/// reported together with the participant it belongs to.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub background: Vec<Chunk<BackgroundSummary>>,
    #[serde(default)]
    pub drivers_of_change: Vec<Chunk<DriversSummary>>,
    #[serde(default)]
    pub future_management: Vec<Chunk<FutureManagementSummary>>,
    #[serde(default)]
    pub decision_making: Vec<Chunk<DecisionMakingSummary>>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Dataset {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| FlowError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Chunk<S> {
    #[serde(default)]
    pub summary: S,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct BackgroundSummary {
    pub id: Option<String>,
    pub categories: Option<Vec<String>>,
    #[serde(rename = "relationship to the delta")]
    pub relationship: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DriversSummary {
    pub id: Option<String>,
    pub factors: Option<Vec<Factor>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Factor {
    pub factor_name: Option<String>,
    pub category: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FutureManagementSummary {
    pub id: Option<String>,
    #[serde(rename = "important salinity management strategies")]
    pub strategies: Option<Vec<Strategy>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Strategy {
    pub strategy: Option<String>,
    pub category: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DecisionMakingSummary {
    pub id: Option<String>,
    #[serde(rename = "Is the process fair")]
    pub fairness: Option<String>,
    #[serde(rename = "Who is represented")]
    pub represented: Option<Vec<Group>>,
    #[serde(rename = "Who is not represented")]
    pub not_represented: Option<Vec<Group>>,
    #[serde(rename = "What other people to connect with")]
    pub others_to_include: Option<Vec<Group>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Group {
    pub group: Option<String>,
    pub category: Option<String>,
}

/// Canonical category vocabulary per column. Absent lists are empty.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub participant_categories: Vec<String>,
    #[serde(default)]
    pub factor_categories: Vec<String>,
    #[serde(default)]
    pub strategy_categories: Vec<String>,
    #[serde(default)]
    pub represented_categories: Vec<String>,
    #[serde(default)]
    pub not_represented_categories: Vec<String>,
    #[serde(default)]
    pub others_to_include_categories: Vec<String>,
}

impl Metadata {
    pub fn categories(&self, column: ColumnKind) -> &[String] {
        match column {
            ColumnKind::Category => &self.participant_categories,
            ColumnKind::Factor => &self.factor_categories,
            ColumnKind::Strategy => &self.strategy_categories,
            ColumnKind::Represented => &self.represented_categories,
            ColumnKind::NotRepresented => &self.not_represented_categories,
            ColumnKind::OthersToInclude => &self.others_to_include_categories,
            ColumnKind::Participant | ColumnKind::Fairness => &[],
        }
    }
}

/// Fixed answer set of the fairness question.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Fairness {
    Fair,
    Unfair,
    Unclear,
}

impl Fairness {
    pub const ALL: [Self; 3] = [Self::Fair, Self::Unfair, Self::Unclear];

    pub fn key(self) -> &'static str {
        match self {
            Self::Fair => "fair",
            Self::Unfair => "unfair",
            Self::Unclear => "unclear",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        Self::ALL.into_iter().find(|fairness| fairness.key() == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_renamed_fields_and_ignores_extras() {
        let dataset = Dataset::from_json_str(
            r#"{
                "background": [{
                    "id": "chunk-1",
                    "conversation": [],
                    "summary": {
                        "id": "p1",
                        "age": 40,
                        "categories": ["Farmer"],
                        "relationship to the delta": "rice grower"
                    }
                }],
                "decision_making": [{
                    "summary": {
                        "id": "p1",
                        "Is the process fair": "Unfair",
                        "Who is represented": [{"group": "Officials", "category": "Government"}],
                        "Who is not represented": [],
                        "What other people to connect with": []
                    }
                }],
                "metadata": {"participant_categories": ["Farmer"]}
            }"#,
        )
        .expect("valid dataset");

        let background = &dataset.background[0].summary;
        assert_eq!(background.id.as_deref(), Some("p1"));
        assert_eq!(background.relationship.as_deref(), Some("rice grower"));
        assert_eq!(
            dataset.decision_making[0].summary.fairness.as_deref(),
            Some("Unfair")
        );
        assert!(dataset.metadata.factor_categories.is_empty());
        assert!(dataset.drivers_of_change.is_empty());
    }

    #[test]
    fn fairness_is_case_insensitive() {
        assert_eq!(Fairness::parse(" Fair "), Some(Fairness::Fair));
        assert_eq!(Fairness::parse("UNCLEAR"), Some(Fairness::Unclear));
        assert_eq!(Fairness::parse("maybe"), None);
    }

    #[test]
    fn invalid_json_is_reported() {
        assert!(matches!(
            Dataset::from_json_str("{"),
            Err(FlowError::Json(_))
        ));
    }
}
