mod app;

use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::Parser;
use interview_flow::flow::{BlockAggregator, ColumnKind};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Interview dataset files; blocks with the same id are merged.
    #[arg(required = true)]
    datasets: Vec<PathBuf>,

    /// Visible columns, left to right.
    #[arg(long, value_delimiter = ',', default_values_t = ColumnKind::DEFAULT_ORDER)]
    columns: Vec<ColumnKind>,

    /// Print per-column block totals as JSON instead of opening the viewer.
    #[arg(long)]
    summary: bool,

    /// Log filter, overriding RUST_LOG.
    #[arg(long)]
    log_filter: Option<String>,
}

#[derive(Serialize)]
struct ColumnSummary<'a> {
    column: ColumnKind,
    title: &'static str,
    participants: usize,
    blocks: Vec<BlockSummary<'a>>,
}

#[derive(Serialize)]
struct BlockSummary<'a> {
    id: &'a str,
    title: &'a str,
    participants: usize,
}

fn init_tracing(filter: Option<&str>) {
    let filter = filter
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn summarize<'a>(aggregator: &'a BlockAggregator, columns: &[ColumnKind]) -> Vec<ColumnSummary<'a>> {
    columns
        .iter()
        .map(|column| ColumnSummary {
            column: *column,
            title: column.title(),
            participants: aggregator.total_participants(column.stage()),
            blocks: aggregator
                .blocks(*column)
                .iter()
                .map(|block| BlockSummary {
                    id: &block.id,
                    title: &block.title,
                    participants: block.unique_participants().len(),
                })
                .collect(),
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_filter.as_deref());

    if args.summary {
        let aggregator = app::load_aggregator(&args.datasets)?;
        let summary = summarize(&aggregator, &args.columns);
        let json = serde_json::to_string_pretty(&summary).context("failed to encode summary")?;
        println!("{json}");
        return Ok(());
    }

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "interview-flow",
        options,
        Box::new(move |cc| {
            Ok(Box::new(app::FlowViewerApp::new(
                cc,
                args.datasets.clone(),
                args.columns.clone(),
            )))
        }),
    )
    .map_err(|error| anyhow!("viewer exited with an error: {error}"))
}
