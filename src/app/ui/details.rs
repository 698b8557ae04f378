use eframe::egui::{self, Color32, RichText, Sense, Ui, vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use interview_flow::flow::palette::to_hex;
use interview_flow::flow::{ColumnKind, Stage};

use super::super::{SearchMatch, SearchMatchCache, ViewModel};

const MAX_SEARCH_ROWS: usize = 24;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

fn color_swatch(ui: &mut Ui, color: Color32) {
    let (rect, _) = ui.allocate_exact_size(vec2(12.0, 12.0), Sense::hover());
    ui.painter().rect_filled(rect, 2.0, color);
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        egui::ScrollArea::vertical().show(ui, |ui| {
            if let Some(error) = &self.flow_error {
                ui.colored_label(Color32::from_rgb(240, 113, 103), error.as_str());
                ui.separator();
            }

            self.draw_selection(ui);
            ui.separator();
            self.draw_legend(ui);
            ui.separator();
            self.draw_search(ui);
            ui.separator();
            self.draw_totals(ui);
            ui.separator();
            self.draw_layout_controls(ui);
        });
    }

    fn draw_selection(&mut self, ui: &mut Ui) {
        ui.heading("Selection");
        ui.add_space(4.0);

        if self.session.clicked().is_empty() {
            ui.label("Click blocks to trace their participants.");
            return;
        }

        let mut deselect = None;
        for block in self.session.clicked() {
            ui.horizontal(|ui| {
                if ui.small_button("x").clicked() {
                    deselect = Some(block.id.clone());
                }
                ui.label(RichText::new(&block.title).strong());
                ui.small(format!(
                    "{} | {} participants",
                    block.column.title(),
                    block.unique_participants().len()
                ));
            });
        }

        if let Some(block_id) = deselect {
            self.toggle_block(&block_id);
        }
    }

    fn draw_legend(&self, ui: &mut Ui) {
        ui.heading("Combinations");
        ui.add_space(4.0);

        let mut any = false;
        for combinations in self.frame.combinations() {
            for combination in combinations.iter() {
                any = true;
                let color = self
                    .session
                    .colors()
                    .color(combination.id)
                    .unwrap_or(Color32::GRAY);
                let titles = combination
                    .content
                    .iter()
                    .map(|block| block.title.as_str())
                    .collect::<Vec<_>>()
                    .join(" + ");

                ui.horizontal(|ui| {
                    color_swatch(ui, color);
                    ui.label(RichText::new(combination.id.to_string()).monospace())
                        .on_hover_text(to_hex(color));
                    ui.small(format!(
                        "{} ({})",
                        titles,
                        combinations.participants_of(combination.id).len()
                    ));
                });
            }
        }

        if !any {
            ui.label("No combinations for the current selection.");
        }
    }

    fn search_matches(&mut self) -> Vec<SearchMatch> {
        let query = self.search.trim();
        if query.is_empty() {
            return Vec::new();
        }

        if let Some(cached) = &self.search_match_cache
            && cached.query == query
        {
            return cached.matches.clone();
        }

        let matcher = SkimMatcherV2::default();
        let mut matches = self
            .columns
            .iter()
            .flat_map(|column| self.aggregator.blocks(*column))
            .filter_map(|block| {
                fuzzy_match_score(&matcher, &block.title, query).map(|score| SearchMatch {
                    block_id: block.id.clone(),
                    title: block.title.clone(),
                    column: block.column,
                    score,
                })
            })
            .collect::<Vec<_>>();
        matches.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.title.cmp(&b.title)));
        matches.truncate(MAX_SEARCH_ROWS);

        self.search_match_cache = Some(SearchMatchCache {
            query: query.to_owned(),
            matches: matches.clone(),
        });
        matches
    }

    fn draw_search(&mut self, ui: &mut Ui) {
        ui.heading("Find block");
        ui.add_space(4.0);
        ui.add(egui::TextEdit::singleline(&mut self.search).hint_text("category, factor, group..."));

        let matches = self.search_matches();
        let mut toggled = None;
        for entry in &matches {
            let selected = self.session.is_clicked(&entry.block_id);
            let label = format!("{}  ({})", entry.title, entry.column.title());
            if ui.selectable_label(selected, label).clicked() {
                toggled = Some(entry.block_id.clone());
            }
        }

        if let Some(block_id) = toggled {
            self.toggle_block(&block_id);
        }
    }

    fn draw_totals(&self, ui: &mut Ui) {
        ui.heading("Participants");
        ui.add_space(4.0);

        for stage in [
            Stage::Background,
            Stage::DriversOfChange,
            Stage::FutureManagement,
            Stage::DecisionMaking,
        ] {
            ui.label(format!(
                "{stage}: {}",
                self.aggregator.total_participants(stage)
            ));
        }
        ui.label(format!(
            "decision-making records: {}",
            self.aggregator.decision_participants()
        ));

        egui::CollapsingHeader::new("Decision-making blocks")
            .default_open(false)
            .show(ui, |ui| {
                for (block_id, count) in self.aggregator.block_totals() {
                    let title = self
                        .aggregator
                        .block(&block_id)
                        .map_or(block_id.as_str(), |block| block.title.as_str());
                    ui.small(format!("{title}: {count}"));
                }
            });
    }

    fn draw_layout_controls(&mut self, ui: &mut Ui) {
        ui.heading("Layout");
        ui.add_space(4.0);

        let mut changed = false;
        changed |= ui
            .add(egui::Slider::new(&mut self.layout_config.content_height, 240.0..=2400.0).text("height"))
            .changed();
        changed |= ui
            .add(egui::Slider::new(&mut self.layout_config.column_gap, 60.0..=480.0).text("column gap"))
            .changed();
        changed |= ui
            .add(egui::Slider::new(&mut self.layout_config.block_gap, 0.0..=32.0).text("block gap"))
            .changed();
        if changed {
            self.relayout();
        }

        if ui.button("Reset view").clicked() {
            self.pan = egui::Vec2::ZERO;
            self.zoom = 1.0;
        }

        let hidden = ColumnKind::ALL
            .into_iter()
            .filter(|column| !self.columns.contains(column))
            .map(ColumnKind::title)
            .collect::<Vec<_>>();
        if !hidden.is_empty() {
            ui.small(format!("hidden columns: {}", hidden.join(", ")));
        }
    }
}
