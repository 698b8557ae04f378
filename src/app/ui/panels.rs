use std::path::PathBuf;

use eframe::egui::{self, Align, Context, Layout, Vec2};
use interview_flow::flow::{BlockAggregator, ColumnKind, FlowFrame, FlowSession, Stage};

use super::super::{ColumnLayout, LayoutConfig, ViewModel};

impl ViewModel {
    pub(in crate::app) fn new(aggregator: BlockAggregator, columns: Vec<ColumnKind>) -> Self {
        let layout_config = LayoutConfig::default();
        let layout = ColumnLayout::compute(&aggregator, &columns, &layout_config);

        Self {
            aggregator,
            columns,
            layout_config,
            layout,
            session: FlowSession::default(),
            frame: FlowFrame::default(),
            frame_dirty: true,
            flow_error: None,
            hover_highlights: None,
            search: String::new(),
            search_match_cache: None,
            pan: Vec2::ZERO,
            zoom: 1.0,
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        datasets: &[PathBuf],
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("interview-flow");
                    ui.separator();
                    let names = datasets
                        .iter()
                        .filter_map(|path| path.file_name())
                        .map(|name| name.to_string_lossy())
                        .collect::<Vec<_>>();
                    ui.label(format!("datasets: {}", names.join(", ")));
                    ui.label(format!(
                        "participants: {}",
                        self.aggregator.total_participants(Stage::Participant)
                    ));
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload data"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    if ui
                        .add_enabled(!self.session.clicked().is_empty(), egui::Button::new("Clear selection"))
                        .clicked()
                    {
                        self.clear_selection();
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(format!("ribbons: {}", self.frame.paths().count()));
                    });
                });
            });

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            if is_loading {
                ui.vertical_centered(|ui| {
                    ui.add_space(120.0);
                    ui.heading("Reloading interview data...");
                    ui.add_space(8.0);
                    ui.spinner();
                });
            } else {
                self.draw_flow(ui);
            }
        });
    }

    pub(in crate::app) fn toggle_block(&mut self, block_id: &str) {
        let Some(block) = self.aggregator.block(block_id) else {
            return;
        };
        self.session.toggle(block);
        self.frame_dirty = true;
    }

    pub(in crate::app) fn clear_selection(&mut self) {
        self.session.clear();
        self.frame = FlowFrame::default();
        self.flow_error = None;
        self.frame_dirty = true;
    }

    pub(in crate::app) fn relayout(&mut self) {
        self.layout = ColumnLayout::compute(&self.aggregator, &self.columns, &self.layout_config);
        self.frame_dirty = true;
    }
}
