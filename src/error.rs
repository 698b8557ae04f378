use std::path::PathBuf;

use crate::flow::Stage;

/// Errors raised while turning a dataset into blocks and flows.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("{stage} record #{index} has no participant id")]
    MissingParticipantId { stage: Stage, index: usize },

    #[error("{stage} record for participant {participant} is missing `{field}`")]
    MissingField {
        stage: Stage,
        participant: String,
        field: &'static str,
    },

    #[error("{stage} record for participant {participant} has malformed `{field}`: {value:?}")]
    MalformedValue {
        stage: Stage,
        participant: String,
        field: &'static str,
        value: String,
    },

    /// More than two source blocks share combinations; only the two-block
    /// overlap is resolved.
    #[error(
        "cannot resolve overlapping combinations across {source_blocks} source blocks \
         ({combinations} combinations)"
    )]
    UnsupportedOverlap {
        source_blocks: usize,
        combinations: usize,
    },

    #[error("invalid dataset JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FlowError {
    pub(crate) fn missing(stage: Stage, participant: &str, field: &'static str) -> Self {
        Self::MissingField {
            stage,
            participant: participant.to_owned(),
            field,
        }
    }

    pub(crate) fn malformed(
        stage: Stage,
        participant: &str,
        field: &'static str,
        value: impl Into<String>,
    ) -> Self {
        Self::MalformedValue {
            stage,
            participant: participant.to_owned(),
            field,
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;
