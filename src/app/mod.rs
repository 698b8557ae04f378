use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context, Vec2};
use interview_flow::flow::{BlockAggregator, ColumnKind, FlowFrame, FlowSession, HighlightMap};

mod graph;
mod layout;
mod load;
mod render_utils;
mod ui;

pub(crate) use self::layout::{ColumnLayout, LayoutConfig};
pub(crate) use self::load::load_aggregator;

pub struct FlowViewerApp {
    datasets: Vec<PathBuf>,
    columns: Vec<ColumnKind>,
    state: AppState,
    reload_rx: Option<Receiver<Result<BlockAggregator, String>>>,
}

enum AppState {
    Loading {
        rx: Receiver<Result<BlockAggregator, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    aggregator: BlockAggregator,
    columns: Vec<ColumnKind>,
    layout_config: LayoutConfig,
    layout: ColumnLayout,
    session: FlowSession,
    frame: FlowFrame,
    /// Selection or layout changed, or the last frame could not place every
    /// ribbon.
    frame_dirty: bool,
    flow_error: Option<String>,
    hover_highlights: Option<HighlightMap>,
    search: String,
    search_match_cache: Option<SearchMatchCache>,
    pan: Vec2,
    zoom: f32,
}

struct SearchMatchCache {
    query: String,
    matches: Vec<SearchMatch>,
}

#[derive(Clone)]
struct SearchMatch {
    block_id: String,
    title: String,
    column: ColumnKind,
    score: i64,
}

impl FlowViewerApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        datasets: Vec<PathBuf>,
        columns: Vec<ColumnKind>,
    ) -> Self {
        let state = Self::start_load(datasets.clone());
        Self {
            datasets,
            columns,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(datasets: Vec<PathBuf>) -> Receiver<Result<BlockAggregator, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load_aggregator(&datasets).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(datasets: Vec<PathBuf>) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(datasets),
        }
    }

    fn ready(&self, aggregator: BlockAggregator) -> AppState {
        AppState::Ready(Box::new(ViewModel::new(aggregator, self.columns.clone())))
    }
}

impl eframe::App for FlowViewerApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                if let Ok(result) = rx.try_recv() {
                    transition = Some(result);
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading interview data...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                let mut retry = false;
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load interview data");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    retry = ui.button("Retry").clicked();
                });
                if retry {
                    self.state = Self::start_load(self.datasets.clone());
                    return;
                }
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &self.datasets, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.datasets.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => transition = Some(result),
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition = Some(Err("Background load worker disconnected".to_owned()));
                        }
                    }
                }
            }
        }

        if let Some(result) = transition {
            self.reload_rx = None;
            self.state = match result {
                Ok(aggregator) => self.ready(aggregator),
                Err(error) => AppState::Error(error),
            };
        }
    }
}
