use eframe::egui::{self, Pos2, Rect, Ui};

use super::super::ViewModel;
use super::super::render_utils::screen_to_world;

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let world_before = screen_to_world(rect, self.pan, self.zoom, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(0.2, 4.0);
        self.pan = pointer - rect.min - (world_before.to_vec2() * self.zoom);
    }

    pub(in crate::app) fn handle_graph_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(egui::PointerButton::Primary)
            || response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.pan += response.drag_delta();
        }
    }

    /// Block under the pointer, in world space.
    pub(in crate::app) fn hovered_block(&self, rect: Rect, pointer: Option<Pos2>) -> Option<String> {
        let pointer = pointer.filter(|pointer| rect.contains(*pointer))?;
        let world = screen_to_world(rect, self.pan, self.zoom, pointer);
        self.layout.block_at(world).map(str::to_owned)
    }

    pub(in crate::app) fn apply_block_click(&mut self, block_id: Option<String>) {
        if let Some(block_id) = block_id {
            self.toggle_block(&block_id);
        }
    }
}
