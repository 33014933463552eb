use std::collections::BTreeSet;
use std::time::Duration;

use eframe::egui::{self, Align, Context, Layout};
use tracing::{debug, error, info};

use crate::model::{GraphDataset, HighlightState};

use super::super::filter::{FilterOptions, QuickFilterState};
use super::super::flow::{FlowFilter, FlowLayoutConfig};
use super::super::graph::{GraphEvent, GraphInputs, GraphView};
use super::super::input::{
    Shortcut, ShortcutDispatcher, graph_bindings, palette_bindings, subscribe_all,
};
use super::super::physics::LayoutConfig;
use super::super::search::{NodeSearch, SearchUpdate};
use super::super::selection::{CommandPalette, PaletteOutcome, Selection};
use super::super::viewport::{PALETTE_FRAME_STRENGTH, ViewportConfig};
use super::super::{AppConfig, LoadedData, ViewModel};

fn flow_types(dataset: &GraphDataset) -> Vec<String> {
    dataset
        .links
        .iter()
        .flat_map(|link| link.flows.iter().chain(&link.review_flows))
        .map(|flow| flow.flow_type.trim())
        .filter(|flow_type| !flow_type.is_empty())
        .map(str::to_owned)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

impl ViewModel {
    pub(in crate::app) fn new(data: LoadedData, search_debounce: Duration) -> Self {
        let LoadedData { dataset, highlight } = data;
        let graph = GraphView::new(
            &dataset,
            LayoutConfig::default(),
            FlowLayoutConfig::default(),
            ViewportConfig::default(),
        );

        let mut palette = CommandPalette::default();
        palette.set_nodes(&dataset.nodes);
        let mut shortcuts = ShortcutDispatcher::default();
        let graph_shortcuts = subscribe_all(&mut shortcuts, graph_bindings());

        let mut model = Self {
            graph,
            selection: Selection::default(),
            highlight: HighlightState::default(),
            highlight_revision: 0,
            file_highlight: highlight,
            search_highlight: None,
            search: NodeSearch::new(&dataset.nodes, search_debounce),
            search_debounce,
            flow_filter: FlowFilter::default(),
            flow_types: flow_types(&dataset),
            quick_filter: QuickFilterState::default(),
            filter_options: FilterOptions::from_nodes(&dataset.nodes),
            filter_matches: None,
            filter_revision: 0,
            filter_key: None,
            palette,
            focus_palette_query: false,
            shortcuts,
            graph_shortcuts,
            palette_shortcuts: Vec::new(),
            legend: Vec::new(),
            events: Vec::new(),
            reload_error: None,
            dataset,
        };
        model.refresh_highlight();
        model
    }

    /// Swaps in a reloaded dataset. Selection and filters survive for ids
    /// that still exist.
    pub(in crate::app) fn replace_dataset(&mut self, data: LoadedData) {
        let LoadedData { dataset, highlight } = data;
        self.graph
            .set_dataset(&dataset, self.flow_filter.show_proposals);

        self.selection.retain_existing(
            |id| dataset.node(id).is_some(),
            |id| dataset.link(id).is_some(),
        );
        self.palette.set_nodes(&dataset.nodes);
        self.filter_options = FilterOptions::from_nodes(&dataset.nodes);
        self.flow_types = flow_types(&dataset);
        self.filter_key = None;

        let query = std::mem::take(&mut self.search.query);
        self.search = NodeSearch::new(&dataset.nodes, self.search_debounce);
        self.search.query = query;
        self.search_highlight = None;
        if highlight.is_some() {
            self.file_highlight = highlight;
        }

        self.dataset = dataset;
        self.refresh_highlight();
    }

    /// Applies a background reload. A failure keeps the current dataset and
    /// is reported in the top bar until the next successful reload.
    pub(in crate::app) fn reload_finished(&mut self, result: Result<LoadedData, String>) {
        match result {
            Ok(data) => {
                info!(
                    nodes = data.dataset.node_count(),
                    links = data.dataset.link_count(),
                    "graph dataset reloaded"
                );
                self.reload_error = None;
                self.replace_dataset(data);
            }
            Err(message) => {
                error!(%message, "graph dataset reload failed, keeping the current graph");
                self.reload_error = Some(message);
            }
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        config: &AppConfig,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        let now = ctx.input(|input| input.time);
        self.handle_shortcuts(ctx, now);
        self.poll_search(ctx, now);
        self.refresh_quick_filter();

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("infra-atlas");
                    ui.separator();
                    ui.label(format!("dataset: {}", config.dataset_path.display()));
                    ui.label(format!("nodes: {}", self.dataset.node_count()));
                    ui.label(format!("links: {}", self.dataset.link_count()));
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload dataset"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    if let Some(message) = &self.reload_error {
                        ui.colored_label(ui.visuals().error_fg_color, "Reload failed")
                            .on_hover_text(message.as_str());
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if is_loading {
                            ui.spinner();
                        }
                        let registry = self.graph.registry();
                        ui.label(format!(
                            "drawn: {} nodes, {} links, {} flows",
                            registry.nodes.len(),
                            registry.links.len(),
                            self.graph.render_flows().len()
                        ));
                        if let Some(label) = &self.highlight.label {
                            ui.label(label.as_str());
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_controls(ui, now));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_details(ui));

        self.draw_palette(ctx, now);

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.sync_graph();
                if self.graph.show(ui, &mut self.events) {
                    ctx.request_repaint();
                }
            });

        if !self.events.is_empty() {
            self.apply_events();
            ctx.request_repaint();
        }
    }

    fn sync_graph(&mut self) {
        self.graph.sync(
            &GraphInputs {
                links: &self.dataset.links,
                selection: &self.selection,
                highlight: &self.highlight,
                highlight_revision: self.highlight_revision,
                flow_filter: &self.flow_filter,
                filter_matches: self.filter_matches.as_ref(),
                filter_revision: self.filter_revision,
            },
            &mut self.events,
        );
    }

    fn apply_events(&mut self) {
        for event in std::mem::take(&mut self.events) {
            match event {
                GraphEvent::SelectNode { id, modifiers } => {
                    self.selection.click_node(&id, modifiers);
                }
                GraphEvent::SelectEdge(id) => self.selection.select_edge(&id),
                GraphEvent::ClearSelection => self.selection.clear(),
                GraphEvent::LegendChanged(items) => self.legend = items,
            }
        }
    }

    fn handle_shortcuts(&mut self, ctx: &Context, now: f64) {
        for shortcut in self.shortcuts.poll(ctx) {
            self.apply_shortcut(shortcut, now);
        }
    }

    pub(in crate::app) fn apply_shortcut(&mut self, shortcut: Shortcut, now: f64) {
        match shortcut {
            Shortcut::ClearSelection => self.selection.clear(),
            Shortcut::OpenPalette => self.open_palette(),
            Shortcut::PalettePrevious => self.palette.move_active(-1),
            Shortcut::PaletteNext => self.palette.move_active(1),
            Shortcut::PaletteConfirm => {
                let outcome = self.palette.confirm();
                self.palette_outcome(outcome, now);
            }
            Shortcut::PaletteClose => self.close_palette(),
        }
    }

    /// The palette takes over the keyboard while open: graph shortcuts are
    /// unsubscribed until it closes.
    pub(in crate::app) fn open_palette(&mut self) {
        if self.palette.is_open() {
            return;
        }
        self.palette.open();
        self.focus_palette_query = true;
        self.shortcuts.unsubscribe_all(&mut self.graph_shortcuts);
        self.palette_shortcuts = subscribe_all(&mut self.shortcuts, palette_bindings());
        debug!(listeners = self.shortcuts.listener_count(), "command palette opened");
    }

    pub(in crate::app) fn close_palette(&mut self) {
        self.palette.close();
        self.shortcuts.unsubscribe_all(&mut self.palette_shortcuts);
        if self.graph_shortcuts.is_empty() {
            self.graph_shortcuts = subscribe_all(&mut self.shortcuts, graph_bindings());
        }
    }

    pub(in crate::app) fn palette_outcome(&mut self, outcome: PaletteOutcome, now: f64) {
        match outcome {
            PaletteOutcome::Idle => {}
            PaletteOutcome::Closed => self.close_palette(),
            PaletteOutcome::Selected(id) => {
                self.close_palette();
                self.selection.select_single(&id);
                self.graph
                    .frame_nodes(std::slice::from_ref(&id), PALETTE_FRAME_STRENGTH, now);
            }
        }
    }

    fn poll_search(&mut self, ctx: &Context, now: f64) {
        if let Some(update) = self.search.poll(now) {
            self.apply_search_update(update);
        }
        if let Some(deadline) = self.search.deadline() {
            let wait = (deadline - now).max(0.0);
            ctx.request_repaint_after(Duration::from_secs_f64(wait));
        }
    }

    pub(in crate::app) fn apply_search_update(&mut self, update: SearchUpdate) {
        self.search_highlight = match update {
            SearchUpdate::Cleared => None,
            SearchUpdate::Results(highlight) => {
                debug!(matches = highlight.node_ids.len(), "search highlight updated");
                Some(highlight)
            }
        };
        self.refresh_highlight();
    }

    pub(in crate::app) fn clear_highlight(&mut self) {
        self.search.query.clear();
        if let Some(SearchUpdate::Cleared) = self.search.query_changed(0.0) {
            self.search_highlight = None;
        }
        self.file_highlight = None;
        self.refresh_highlight();
    }

    /// Recomputes the shown highlight; bumps its revision only on change.
    fn refresh_highlight(&mut self) {
        let next = self
            .search_highlight
            .as_ref()
            .or(self.file_highlight.as_ref())
            .cloned()
            .unwrap_or_default();
        if next != self.highlight {
            self.highlight = next;
            self.highlight_revision += 1;
        }
    }

    /// Recomputes quick filter matches when the filter or the node
    /// selection changed.
    pub(in crate::app) fn refresh_quick_filter(&mut self) {
        let key = (self.quick_filter.clone(), self.selection.revision());
        if self.filter_key.as_ref() == Some(&key) {
            return;
        }

        let matches = self.quick_filter.is_active().then(|| {
            self.quick_filter
                .compute_matches(&self.dataset.nodes, self.selection.nodes())
        });
        if matches != self.filter_matches {
            self.filter_matches = matches;
            self.filter_revision += 1;
        }
        self.filter_key = Some(key);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::app::selection::ClickModifiers;
    use crate::model::{GraphLink, GraphNode};

    fn data() -> LoadedData {
        let node = |id: &str, env: &str| GraphNode {
            id: id.to_owned(),
            name: id.to_uppercase(),
            kind: "application".to_owned(),
            metadata: json!({ "env": env }).as_object().cloned().unwrap_or_default(),
            ..GraphNode::default()
        };
        LoadedData {
            dataset: GraphDataset {
                nodes: vec![node("a", "keab"), node("b", "process"), node("c", "keab")],
                links: vec![GraphLink {
                    id: "ab".to_owned(),
                    source: "a".to_owned(),
                    target: "b".to_owned(),
                    ..GraphLink::default()
                }],
            },
            highlight: Some(HighlightState::from_ids(
                ["c".to_owned()],
                [],
                Some("Path".to_owned()),
            )),
        }
    }

    fn model() -> ViewModel {
        ViewModel::new(data(), Duration::from_millis(180))
    }

    #[test]
    fn search_results_take_precedence_over_the_file_highlight() {
        let mut model = model();
        assert_eq!(model.highlight.label.as_deref(), Some("Path"));
        let revision = model.highlight_revision;

        model.apply_search_update(SearchUpdate::Results(HighlightState::from_ids(
            ["a".to_owned()],
            [],
            Some("Search: aa".to_owned()),
        )));
        assert_eq!(model.highlight.label.as_deref(), Some("Search: aa"));
        assert!(model.highlight_revision > revision);

        model.apply_search_update(SearchUpdate::Cleared);
        assert_eq!(model.highlight.label.as_deref(), Some("Path"));

        model.clear_highlight();
        assert!(model.highlight.is_empty());
    }

    #[test]
    fn selection_and_highlight_change_independently() {
        let mut model = model();
        model.apply_search_update(SearchUpdate::Results(HighlightState::from_ids(
            ["b".to_owned()],
            [],
            Some("Search: bb".to_owned()),
        )));
        let highlight = model.highlight.clone();
        let revision = model.highlight_revision;

        model.events.push(GraphEvent::SelectNode {
            id: "a".to_owned(),
            modifiers: ClickModifiers::default(),
        });
        model.apply_events();
        assert_eq!(model.selection.primary(), Some("a"));
        assert_eq!(model.highlight, highlight);

        model.events.push(GraphEvent::ClearSelection);
        model.apply_events();
        assert!(model.selection.is_empty());
        assert_eq!(model.highlight, highlight);
        assert_eq!(model.highlight_revision, revision);

        model.selection.select_single("c");
        model.clear_highlight();
        assert!(model.highlight.is_empty());
        assert_eq!(model.selection.nodes(), ["c"]);
    }

    #[test]
    fn graph_events_drive_the_selection() {
        let mut model = model();
        model.events.push(GraphEvent::SelectNode {
            id: "a".to_owned(),
            modifiers: ClickModifiers::default(),
        });
        model.apply_events();
        assert_eq!(model.selection.primary(), Some("a"));

        model.events.push(GraphEvent::SelectEdge("ab".to_owned()));
        model.apply_events();
        assert_eq!(model.selection.edge(), Some("ab"));
        assert!(model.selection.nodes().is_empty());

        model.events.push(GraphEvent::ClearSelection);
        model.apply_events();
        assert!(model.selection.is_empty());
        assert!(model.events.is_empty());
    }

    #[test]
    fn palette_swaps_shortcut_subscriptions_and_frames_the_pick() {
        let mut model = model();
        assert_eq!(model.shortcuts.listener_count(), 2);

        model.apply_shortcut(Shortcut::OpenPalette, 0.0);
        assert!(model.palette.is_open());
        assert_eq!(model.shortcuts.listener_count(), 4);

        model.palette.query = "b".to_owned();
        model.palette.query_changed();
        model.apply_shortcut(Shortcut::PaletteConfirm, 0.0);
        assert!(!model.palette.is_open());
        assert_eq!(model.selection.nodes(), ["b"]);
        assert_eq!(model.shortcuts.listener_count(), 2);

        model.apply_shortcut(Shortcut::OpenPalette, 0.0);
        model.apply_shortcut(Shortcut::PaletteClose, 0.0);
        assert!(!model.palette.is_open());
        assert_eq!(model.shortcuts.listener_count(), 2);
    }

    #[test]
    fn quick_filter_matches_track_filter_and_selection() {
        let mut model = model();
        model.refresh_quick_filter();
        assert_eq!(model.filter_matches, None);
        let revision = model.filter_revision;

        model.quick_filter.env = Some(crate::app::filter::Scope::Keab);
        model.refresh_quick_filter();
        let matches = model.filter_matches.clone().unwrap_or_default();
        assert!(matches.contains("a") && matches.contains("c") && !matches.contains("b"));
        assert!(model.filter_revision > revision);

        let revision = model.filter_revision;
        model.refresh_quick_filter();
        assert_eq!(model.filter_revision, revision);

        model.selection.select_single("b");
        model.refresh_quick_filter();
        assert!(model.filter_matches.as_ref().is_some_and(|m| m.contains("b")));
    }

    #[test]
    fn failed_reload_keeps_the_current_graph() {
        let mut model = model();
        model.selection.select_single("a");

        model.reload_finished(Err("dataset.json: expected value".to_owned()));
        assert_eq!(model.reload_error.as_deref(), Some("dataset.json: expected value"));
        assert_eq!(model.dataset.node_count(), 3);
        assert_eq!(model.selection.nodes(), ["a"]);

        let mut next = data();
        next.dataset.nodes.retain(|node| node.id != "b");
        model.reload_finished(Ok(next));
        assert_eq!(model.reload_error, None);
        assert_eq!(model.dataset.node_count(), 2);
        assert_eq!(model.selection.nodes(), ["a"]);
    }

    #[test]
    fn reloading_keeps_surviving_selection() {
        let mut model = model();
        model.selection.select_single("c");
        let mut next = data();
        next.dataset.nodes.retain(|node| node.id != "c");
        next.highlight = None;
        model.replace_dataset(next);

        assert!(model.selection.is_empty());
        assert_eq!(model.dataset.node_count(), 2);
        assert_eq!(model.highlight.label.as_deref(), Some("Path"));
    }
}
