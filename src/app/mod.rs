use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use eframe::egui::{self, Context};
use tracing::{error, info};

use crate::model::{GraphDataset, HighlightState, load_dataset, load_highlight};

mod filter;
mod flow;
mod graph;
mod highlight;
mod input;
mod physics;
mod render_utils;
mod search;
mod selection;
mod tooltip;
mod ui;
mod viewport;

use filter::{FilterOptions, QuickFilterState};
use flow::{FlowFilter, LegendItem};
use graph::{GraphEvent, GraphView};
use input::{ShortcutDispatcher, SubscriptionId};
use search::NodeSearch;
use selection::{CommandPalette, Selection};

/// Startup settings gathered from the command line.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub dataset_path: PathBuf,
    pub highlight_path: Option<PathBuf>,
    pub search_debounce: Duration,
}

pub struct AtlasApp {
    config: AppConfig,
    state: AppState,
    reload_rx: Option<Receiver<Result<LoadedData, String>>>,
}

/// Everything one background load produces.
struct LoadedData {
    dataset: GraphDataset,
    highlight: Option<HighlightState>,
}

enum AppState {
    Loading {
        rx: Receiver<Result<LoadedData, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    dataset: GraphDataset,
    graph: GraphView,
    selection: Selection,
    /// Highlight currently shown: search results win over the file highlight.
    highlight: HighlightState,
    highlight_revision: u64,
    file_highlight: Option<HighlightState>,
    search_highlight: Option<HighlightState>,
    search: NodeSearch,
    search_debounce: Duration,
    flow_filter: FlowFilter,
    flow_types: Vec<String>,
    quick_filter: QuickFilterState,
    filter_options: FilterOptions,
    filter_matches: Option<HashSet<String>>,
    filter_revision: u64,
    filter_key: Option<(QuickFilterState, u64)>,
    palette: CommandPalette,
    focus_palette_query: bool,
    shortcuts: ShortcutDispatcher,
    graph_shortcuts: Vec<SubscriptionId>,
    palette_shortcuts: Vec<SubscriptionId>,
    legend: Vec<LegendItem>,
    events: Vec<GraphEvent>,
    /// Last failed reload; the previous dataset stays on screen.
    reload_error: Option<String>,
}

fn load(config: &AppConfig) -> Result<LoadedData> {
    let dataset = load_dataset(&config.dataset_path)?;
    let highlight = config
        .highlight_path
        .as_deref()
        .map(load_highlight)
        .transpose()?;
    Ok(LoadedData { dataset, highlight })
}

impl AtlasApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let state = Self::start_load(&config);
        Self {
            config,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(config: &AppConfig) -> Receiver<Result<LoadedData, String>> {
        let (tx, rx) = mpsc::channel();
        let config = config.clone();

        thread::spawn(move || {
            let result = load(&config).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(config: &AppConfig) -> AppState {
        info!(path = %config.dataset_path.display(), "loading graph dataset");
        AppState::Loading {
            rx: Self::spawn_load(config),
        }
    }

    fn loaded(data: LoadedData, search_debounce: Duration) -> AppState {
        info!(
            nodes = data.dataset.node_count(),
            links = data.dataset.link_count(),
            highlight = data.highlight.is_some(),
            "graph dataset loaded"
        );
        AppState::Ready(Box::new(ViewModel::new(data, search_debounce)))
    }
}

fn failed(message: String) -> AppState {
    error!(%message, "graph dataset load failed");
    AppState::Error(message)
}

impl eframe::App for AtlasApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(data)) => {
                        transition = Some(Self::loaded(data, self.config.search_debounce));
                    }
                    Ok(Err(message)) => transition = Some(failed(message)),
                    Err(TryRecvError::Empty) => ctx.request_repaint_after(Duration::from_millis(50)),
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(failed("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading infrastructure graph...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(message) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load the infrastructure graph");
                    ui.add_space(6.0);
                    ui.label(message.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(&self.config));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &self.config, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    info!(path = %self.config.dataset_path.display(), "reloading graph dataset");
                    self.reload_rx = Some(Self::spawn_load(&self.config));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => model.reload_finished(result),
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint_after(Duration::from_millis(50));
                        }
                        Err(TryRecvError::Disconnected) => model.reload_finished(Err(
                            "Background load worker disconnected".to_owned(),
                        )),
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}
