use std::collections::HashMap;

use eframe::egui::{Pos2, Rect, Vec2, pos2, vec2};
use interview_flow::flow::{BlockAggregator, BlockGeometry, BlockId, ColumnKind};

#[derive(Clone, Copy, Debug)]
pub(crate) struct LayoutConfig {
    pub(crate) column_width: f32,
    pub(crate) column_gap: f32,
    pub(crate) block_gap: f32,
    pub(crate) min_block_height: f32,
    /// Height shared by the blocks of the fullest stage.
    pub(crate) content_height: f32,
    pub(crate) header_height: f32,
    pub(crate) margin: Vec2,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            column_width: 150.0,
            column_gap: 190.0,
            block_gap: 8.0,
            min_block_height: 6.0,
            content_height: 720.0,
            header_height: 28.0,
            margin: vec2(24.0, 16.0),
        }
    }
}

/// Block rectangles in world space, one column after another.
#[derive(Clone, Debug, Default)]
pub(crate) struct ColumnLayout {
    rects: HashMap<BlockId, Rect>,
    headers: Vec<(ColumnKind, Rect)>,
}

impl ColumnLayout {
    pub(crate) fn compute(
        aggregator: &BlockAggregator,
        columns: &[ColumnKind],
        config: &LayoutConfig,
    ) -> Self {
        let max_participants = aggregator.max_participants().max(1) as f32;
        let mut rects = HashMap::new();
        let mut headers = Vec::with_capacity(columns.len());

        for (index, column) in columns.iter().enumerate() {
            let x = config.margin.x + index as f32 * (config.column_width + config.column_gap);
            headers.push((
                *column,
                Rect::from_min_size(
                    pos2(x, config.margin.y),
                    vec2(config.column_width, config.header_height),
                ),
            ));

            let mut y = config.margin.y + config.header_height + config.block_gap;
            for block in aggregator.blocks(*column) {
                let share = block.participants.len() as f32 / max_participants;
                let height = config.min_block_height + share * config.content_height;
                rects.insert(
                    block.id.clone(),
                    Rect::from_min_size(pos2(x, y), vec2(config.column_width, height)),
                );
                y += height + config.block_gap;
            }
        }

        Self { rects, headers }
    }

    pub(crate) fn headers(&self) -> &[(ColumnKind, Rect)] {
        &self.headers
    }

    pub(crate) fn block_at(&self, world: Pos2) -> Option<&str> {
        self.rects
            .iter()
            .find(|(_, rect)| rect.contains(world))
            .map(|(block_id, _)| block_id.as_str())
    }
}

impl BlockGeometry for ColumnLayout {
    fn block_rect(&self, block_id: &str) -> Option<Rect> {
        self.rects.get(block_id).copied()
    }
}
