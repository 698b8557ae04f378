pub mod aggregate;
pub mod block;
pub mod column;
pub mod combination;
pub mod dataset;
pub mod geometry;
pub mod highlight;
pub mod link;
pub mod palette;
pub mod paths;
pub mod session;

pub use aggregate::BlockAggregator;
pub use block::{Block, BlockId, BlockRef, ParticipantId};
pub use column::{ColumnKind, Stage};
pub use combination::{BlockCombinations, CombinationId, Combinations, generate_combinations};
pub use dataset::Dataset;
pub use geometry::{BlockGeometry, FlowPath};
pub use highlight::{Highlight, HighlightMap};
pub use link::{Link, LinkSet};
pub use palette::ColorAssigner;
pub use paths::{BlockOffsetRatios, ColumnFlow, FlowPaths, PathData};
pub use session::{FlowFrame, FlowSession};
