use std::collections::HashMap;
use std::fmt::Write as _;

use eframe::egui::{Pos2, Rect, pos2};
use serde::{Serialize, Serializer};

use super::block::BlockId;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCommand {
    MoveTo(Pos2),
    LineTo(Pos2),
    CubicTo { c1: Pos2, c2: Pos2, to: Pos2 },
    Close,
}

/// Closed outline of one flow ribbon, as drawing commands.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlowPath {
    commands: Vec<PathCommand>,
}

impl FlowPath {
    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    /// SVG path data (`d` attribute).
    pub fn to_svg(&self) -> String {
        let mut d = String::new();
        for command in &self.commands {
            match command {
                PathCommand::MoveTo(p) => {
                    let _ = write!(d, "M{},{}", fmt_num(p.x), fmt_num(p.y));
                }
                PathCommand::LineTo(p) => {
                    let _ = write!(d, "L{},{}", fmt_num(p.x), fmt_num(p.y));
                }
                PathCommand::CubicTo { c1, c2, to } => {
                    let _ = write!(
                        d,
                        "C{},{},{},{},{},{}",
                        fmt_num(c1.x),
                        fmt_num(c1.y),
                        fmt_num(c2.x),
                        fmt_num(c2.y),
                        fmt_num(to.x),
                        fmt_num(to.y)
                    );
                }
                PathCommand::Close => d.push('Z'),
            }
        }
        d
    }

    /// Samples the two curved edges of a ribbon, both running from source to
    /// target. `None` if the path is not a ribbon.
    pub fn sample_edges(&self, steps: usize) -> Option<(Vec<Pos2>, Vec<Pos2>)> {
        let steps = steps.max(1);
        let mut current = None;
        let mut curves = Vec::with_capacity(2);

        for command in &self.commands {
            match *command {
                PathCommand::MoveTo(p) | PathCommand::LineTo(p) => current = Some(p),
                PathCommand::CubicTo { c1, c2, to } => {
                    curves.push((current?, c1, c2, to));
                    current = Some(to);
                }
                PathCommand::Close => {}
            }
        }

        let [top, bottom] = curves.as_slice() else {
            return None;
        };
        let sample = |&(p0, c1, c2, p1): &(Pos2, Pos2, Pos2, Pos2)| {
            (0..=steps)
                .map(|i| cubic_point(p0, c1, c2, p1, i as f32 / steps as f32))
                .collect::<Vec<_>>()
        };

        let upper = sample(top);
        let mut lower = sample(bottom);
        lower.reverse();
        Some((upper, lower))
    }
}

impl Serialize for FlowPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_svg())
    }
}

fn fmt_num(value: f32) -> String {
    let text = format!("{value:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" { "0".to_owned() } else { text.to_owned() }
}

pub fn cubic_point(p0: Pos2, c1: Pos2, c2: Pos2, p1: Pos2, t: f32) -> Pos2 {
    let mt = 1.0 - t;
    let a = mt * mt * mt;
    let b = 3.0 * mt * mt * t;
    let c = 3.0 * mt * t * t;
    let d = t * t * t;
    pos2(
        a * p0.x + b * c1.x + c * c2.x + d * p1.x,
        a * p0.y + b * c1.y + c * c2.y + d * p1.y,
    )
}

/// Ribbon from a band on the source block's right edge to a band on the
/// target block's left edge. Both curves bend at the horizontal midpoint.
pub fn generate_flow(
    source_start: Pos2,
    target_end: Pos2,
    source_height: f32,
    target_height: f32,
) -> FlowPath {
    let mid_x = (source_start.x + target_end.x) / 2.0;
    let source_bottom = source_start.y + source_height;
    let target_bottom = target_end.y + target_height;

    FlowPath {
        commands: vec![
            PathCommand::MoveTo(source_start),
            PathCommand::CubicTo {
                c1: pos2(mid_x, source_start.y),
                c2: pos2(mid_x, target_end.y),
                to: target_end,
            },
            PathCommand::LineTo(pos2(target_end.x, target_bottom)),
            PathCommand::CubicTo {
                c1: pos2(mid_x, target_bottom),
                c2: pos2(mid_x, source_bottom),
                to: pos2(source_start.x, source_bottom),
            },
            PathCommand::LineTo(source_start),
            PathCommand::Close,
        ],
    }
}

/// Where rendered blocks are. Layout must have settled before paths are
/// generated; a block that is not measurable yet reports `None`.
pub trait BlockGeometry {
    fn block_rect(&self, block_id: &str) -> Option<Rect>;

    /// Origin of the drawing surface. Anchors are relative to it.
    fn origin(&self) -> Pos2 {
        Pos2::ZERO
    }
}

impl BlockGeometry for HashMap<BlockId, Rect> {
    fn block_rect(&self, block_id: &str) -> Option<Rect> {
        self.get(block_id).copied()
    }
}

/// Top-left anchor and height of a band on a block edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandAnchor {
    pub pos: Pos2,
    pub height: f32,
}

/// Anchor of the `[start, end]` band of `block_id`, on its right edge when
/// `is_start`, its left edge otherwise.
pub fn compute_block_offset(
    geometry: &dyn BlockGeometry,
    block_id: &str,
    band: [f32; 2],
    is_start: bool,
) -> Option<BandAnchor> {
    let rect = geometry.block_rect(block_id)?;
    let origin = geometry.origin();
    let x = if is_start { rect.right() } else { rect.left() };

    Some(BandAnchor {
        pos: pos2(x - origin.x, rect.top() + rect.height() * band[0] - origin.y),
        height: rect.height() * (band[1] - band[0]),
    })
}
