use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, StrokeKind, Ui, vec2};
use interview_flow::flow::highlight::highlight_by_participants;
use interview_flow::flow::{BlockGeometry, FlowFrame, Highlight, ParticipantId};
use tracing::warn;

use super::super::ViewModel;
use super::super::render_utils::{
    blend_color, dim_color, draw_background, ribbon_contains, ribbon_shape, with_alpha,
    world_to_screen,
};

const RIBBON_STEPS: usize = 24;

struct HoveredRibbon {
    text: String,
    participants: Vec<ParticipantId>,
}

impl ViewModel {
    fn refresh_frame(&mut self) {
        if !self.frame_dirty {
            return;
        }

        match self
            .session
            .recompute(&self.aggregator, &self.columns, &self.layout)
        {
            Ok(frame) => {
                self.frame = frame;
                self.flow_error = None;
            }
            Err(error) => {
                warn!(%error, "could not compute flow for the current selection");
                self.frame = FlowFrame::default();
                self.flow_error = Some(error.to_string());
            }
        }

        // Retried on the next repaint.
        self.frame_dirty = !self.frame.is_complete();
    }

    fn block_title<'a>(&'a self, block_id: &'a str) -> &'a str {
        self.aggregator
            .block(block_id)
            .map_or(block_id, |block| block.title.as_str())
    }

    pub(in crate::app) fn draw_flow(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_pan(&response);
        self.refresh_frame();

        let (pan, zoom) = (self.pan, self.zoom);
        let to_screen = move |world: Pos2| world_to_screen(rect, pan, zoom, world);
        let to_screen_rect = move |world: Rect| Rect::from_min_max(to_screen(world.min), to_screen(world.max));

        let guides = self
            .layout
            .headers()
            .iter()
            .map(|(_, header)| to_screen(header.center()).x)
            .collect::<Vec<_>>();
        draw_background(&painter, rect, &guides);

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .filter(|pointer| rect.contains(*pointer));

        let mut hovered_ribbon = None;
        for path in self.frame.paths() {
            let Some((top, bottom)) = path.path.sample_edges(RIBBON_STEPS) else {
                continue;
            };
            let top = top.into_iter().map(to_screen).collect::<Vec<_>>();
            let bottom = bottom.into_iter().map(to_screen).collect::<Vec<_>>();

            let is_hovered = hovered_ribbon.is_none()
                && pointer.is_some_and(|pointer| ribbon_contains(&top, &bottom, pointer));
            if is_hovered {
                hovered_ribbon = Some(HoveredRibbon {
                    text: format!(
                        "{}  |  {} > {}  |  {} participants",
                        path.id,
                        self.block_title(&path.source),
                        self.block_title(&path.target),
                        path.participants.len()
                    ),
                    participants: path.participants.clone(),
                });
            }

            let color = self
                .session
                .colors()
                .color(path.id)
                .unwrap_or(Color32::GRAY);
            let alpha = if is_hovered { 215 } else { 140 };
            painter.add(ribbon_shape(&top, &bottom, with_alpha(color, alpha)));
        }

        self.hover_highlights = hovered_ribbon.as_ref().map(|ribbon| {
            highlight_by_participants(
                self.columns
                    .iter()
                    .flat_map(|column| self.aggregator.blocks(*column)),
                &ribbon.participants,
            )
        });
        let highlights = self.hover_highlights.as_ref().unwrap_or(&self.frame.highlights);

        let hovered_block = if hovered_ribbon.is_none() {
            self.hovered_block(rect, pointer)
        } else {
            None
        };
        if hovered_block.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        let base_color = Color32::from_rgb(86, 98, 112);
        let clicked_color = Color32::from_rgb(245, 206, 93);
        let font_size = (11.5 * zoom.sqrt()).clamp(9.0, 15.0);

        for column in &self.columns {
            for block in self.aggregator.blocks(*column) {
                let Some(world) = self.layout.block_rect(&block.id) else {
                    continue;
                };
                let screen = to_screen_rect(world);
                if !screen.intersects(rect) {
                    continue;
                }

                let is_clicked = self.session.is_clicked(&block.id);
                let is_hovered = hovered_block.as_deref() == Some(block.id.as_str());
                let fill = match highlights.get(&block.id) {
                    Some(Highlight::Highlighted) => {
                        blend_color(base_color, Color32::from_rgb(103, 196, 255), 0.55)
                    }
                    Some(Highlight::Dismissed) => dim_color(base_color, 0.45),
                    None if is_hovered => blend_color(base_color, Color32::from_rgb(255, 164, 101), 0.4),
                    None => base_color,
                };
                painter.rect_filled(screen, 2.0, fill);

                let stroke = if is_clicked {
                    Stroke::new(2.2, clicked_color)
                } else {
                    Stroke::new(1.0, Color32::from_rgba_unmultiplied(15, 15, 15, 190))
                };
                painter.rect_stroke(screen, 2.0, stroke, StrokeKind::Inside);

                if screen.height() >= font_size || is_hovered || is_clicked {
                    painter.text(
                        screen.left_center() + vec2(5.0, 0.0),
                        Align2::LEFT_CENTER,
                        format!("{} ({})", block.title, block.unique_participants().len()),
                        FontId::proportional(font_size),
                        Color32::from_gray(238),
                    );
                }
            }
        }

        for (column, header) in self.layout.headers() {
            painter.text(
                to_screen_rect(*header).center(),
                Align2::CENTER_CENTER,
                column.title(),
                FontId::proportional(13.0),
                Color32::from_gray(220),
            );
        }

        if let Some(ribbon) = &hovered_ribbon {
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                &ribbon.text,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        } else if self.session.clicked().is_empty() {
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                "Click a block to trace its participants. Scroll to zoom, drag to pan.",
                FontId::proportional(13.0),
                Color32::from_gray(170),
            );
        }

        if response.clicked_by(egui::PointerButton::Primary) {
            self.apply_block_click(hovered_block);
        }
    }
}
