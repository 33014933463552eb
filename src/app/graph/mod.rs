//! Graph canvas: owns the layout simulation, the persistent visuals bound to
//! it, the flow overlay and the camera.

mod binder;
mod build;
mod interaction;
mod view;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use eframe::egui::Vec2;
use tracing::{debug, info};

pub(in crate::app) use binder::{FLOW_HIT_WIDTH, LINK_HIT_WIDTH, VisualRegistry};
pub(in crate::app) use build::{SimGraph, SimLink, SimNode, build_sim_graph};

use self::interaction::PointerState;
use super::filter::apply_quick_filter_dimming;
use super::flow::{
    FlowCompositor, FlowFilter, FlowInputs, FlowLayoutConfig, LegendItem, RenderFlow, TaggedFlow,
    active_edge_ids, build_legend, flows_by_edge, visible_category_ids,
};
use super::highlight::apply_selection_styles;
use super::physics::{LayoutConfig, Simulation, ticks_for_frame};
use super::selection::{ClickModifiers, Selection};
use super::viewport::{Viewport, ViewportConfig};
use crate::model::{GraphDataset, GraphLink, HighlightState};

/// Notifications for the owner of the canvas.
#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) enum GraphEvent {
    SelectNode {
        id: String,
        modifiers: ClickModifiers,
    },
    SelectEdge(String),
    ClearSelection,
    LegendChanged(Vec<LegendItem>),
}

/// Everything outside the canvas that its visuals depend on.
pub(in crate::app) struct GraphInputs<'a> {
    pub links: &'a [GraphLink],
    pub selection: &'a Selection,
    pub highlight: &'a HighlightState,
    pub highlight_revision: u64,
    pub flow_filter: &'a FlowFilter,
    /// `None` when the quick filter is inactive.
    pub filter_matches: Option<&'a HashSet<String>>,
    pub filter_revision: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct StyleKey {
    selection: u64,
    highlight: u64,
    generation: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct DimmingKey {
    filter: u64,
    generation: u64,
}

pub(in crate::app) struct GraphView {
    simulation: Simulation,
    layout: LayoutConfig,
    flow_layout: FlowLayoutConfig,
    registry: VisualRegistry,
    compositor: FlowCompositor,
    flows_by_edge: HashMap<String, Vec<TaggedFlow>>,
    flows_with_proposals: bool,
    category_names: HashMap<String, String>,
    legend: Vec<LegendItem>,
    render_flows: Arc<Vec<RenderFlow>>,
    emitted_legend: Option<Vec<LegendItem>>,
    viewport: Viewport,
    size: Vec2,
    epoch: u64,
    style_key: Option<StyleKey>,
    dimming_key: Option<DimmingKey>,
    pointer: PointerState,
}

impl GraphView {
    pub fn new(
        dataset: &GraphDataset,
        layout: LayoutConfig,
        flow_layout: FlowLayoutConfig,
        viewport: ViewportConfig,
    ) -> Self {
        let graph = build_sim_graph(&dataset.nodes, &dataset.links);
        let mut view = Self {
            simulation: Simulation::new(graph, layout, Vec2::ZERO, 0),
            layout,
            flow_layout,
            registry: VisualRegistry::default(),
            compositor: FlowCompositor::default(),
            flows_by_edge: HashMap::new(),
            flows_with_proposals: false,
            category_names: dataset.category_names(),
            legend: Vec::new(),
            render_flows: Arc::default(),
            emitted_legend: None,
            viewport: Viewport::new(viewport),
            size: Vec2::ZERO,
            epoch: 0,
            style_key: None,
            dimming_key: None,
            pointer: PointerState::default(),
        };
        view.registry.bind_graph(view.simulation.graph());
        view.rebuild_flow_index(&dataset.links, false);
        view
    }

    /// Replaces the dataset. The old simulation is stopped before the new
    /// arena is built; no state carries over except surviving visuals.
    pub fn set_dataset(&mut self, dataset: &GraphDataset, show_proposals: bool) {
        self.simulation.stop();
        self.pointer = PointerState::default();

        self.epoch += 1;
        let graph = build_sim_graph(&dataset.nodes, &dataset.links);
        let center = self.size * 0.5;
        self.simulation = Simulation::new(graph, self.layout, center, self.epoch);

        let (nodes, links) = self.registry.bind_graph(self.simulation.graph());
        info!(
            epoch = self.epoch,
            nodes = self.simulation.nodes().len(),
            links = self.simulation.graph().links.len(),
            nodes_entered = nodes.entered,
            nodes_exited = nodes.exited,
            links_entered = links.entered,
            links_exited = links.exited,
            "graph dataset replaced"
        );

        self.category_names = dataset.category_names();
        self.compositor.invalidate();
        self.rebuild_flow_index(&dataset.links, show_proposals);
        self.style_key = None;
        self.dimming_key = None;
    }

    fn rebuild_flow_index(&mut self, links: &[GraphLink], show_proposals: bool) {
        self.flows_by_edge = flows_by_edge(links, show_proposals);
        self.flows_with_proposals = show_proposals;
        let ids = visible_category_ids(self.flows_by_edge_in_link_order());
        self.legend = build_legend(&ids, &self.category_names);
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn registry(&self) -> &VisualRegistry {
        &self.registry
    }

    pub fn render_flows(&self) -> &Arc<Vec<RenderFlow>> {
        &self.render_flows
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    fn flows_by_edge_in_link_order(&self) -> impl Iterator<Item = &[TaggedFlow]> {
        self.simulation
            .graph()
            .links
            .iter()
            .filter_map(|link| self.flows_by_edge.get(&link.id).map(Vec::as_slice))
    }

    /// Camera command: animates to the live positions of `node_ids`.
    pub fn frame_nodes(&mut self, node_ids: &[String], strength: f32, now: f64) -> bool {
        let framed = self
            .viewport
            .frame_nodes(self.simulation.nodes(), node_ids, self.size, strength, now);
        if framed {
            debug!(nodes = node_ids.len(), strength, "framing nodes");
        }
        framed
    }

    /// Brings derived visual state in line with `inputs`. Cheap when nothing
    /// changed: every stage is keyed on the revisions it depends on.
    pub fn sync(&mut self, inputs: &GraphInputs<'_>, events: &mut Vec<GraphEvent>) {
        if inputs.flow_filter.show_proposals != self.flows_with_proposals {
            self.rebuild_flow_index(inputs.links, inputs.flow_filter.show_proposals);
        }

        if self.emitted_legend.as_ref() != Some(&self.legend) {
            self.emitted_legend = Some(self.legend.clone());
            events.push(GraphEvent::LegendChanged(self.legend.clone()));
        }

        self.simulation
            .sync_selection_pins(inputs.selection.primary());

        let style_key = StyleKey {
            selection: inputs.selection.revision(),
            highlight: inputs.highlight_revision,
            generation: self.registry.generation(),
        };
        if self.style_key != Some(style_key) {
            apply_selection_styles(
                &mut self.registry,
                self.simulation.graph(),
                inputs.selection,
                inputs.highlight,
            );
            self.style_key = Some(style_key);
        }

        let active = active_edge_ids(
            inputs.links,
            inputs.selection.edge(),
            inputs.selection.nodes(),
        );
        let rendered = self.compositor.compose(&FlowInputs {
            graph: self.simulation.graph(),
            flows_by_edge: &self.flows_by_edge,
            active_edge_ids: &active,
            filter: inputs.flow_filter,
            focus_node_id: inputs.selection.primary(),
            category_names: &self.category_names,
            sim_epoch: self.simulation.epoch(),
        });
        if !Arc::ptr_eq(&rendered, &self.render_flows) {
            self.registry.bind_flows(&rendered);
            self.render_flows = rendered;
            self.pointer.hovered_flow = None;
            self.dimming_key = None;
        }

        let dimming_key = DimmingKey {
            filter: inputs.filter_revision,
            generation: self.registry.generation(),
        };
        if self.dimming_key != Some(dimming_key) {
            apply_quick_filter_dimming(
                &mut self.registry,
                self.simulation.graph(),
                &self.render_flows,
                inputs.filter_matches,
            );
            self.dimming_key = Some(dimming_key);
        }
    }

    /// Tracks the canvas size; the layout centers on the middle of it.
    fn set_size(&mut self, size: Vec2) {
        if size == self.size {
            return;
        }
        self.size = size;
        self.simulation.set_center(size * 0.5);
    }

    /// Runs the simulation steps owed for a frame of `delta_seconds`.
    /// Returns whether any step ran.
    fn advance_simulation(&mut self, delta_seconds: f32) -> bool {
        let mut stepped = false;
        for _ in 0..ticks_for_frame(delta_seconds) {
            if !self.simulation.tick(|_| stepped = true) {
                break;
            }
        }
        stepped
    }

    pub fn reheat(&mut self) {
        self.simulation.reheat();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Flow, GraphNode};

    fn dataset() -> GraphDataset {
        let node = |id: &str| GraphNode {
            id: id.to_owned(),
            name: id.to_uppercase(),
            ..GraphNode::default()
        };
        let flow = |id: &str, direction: &str, category: Option<&str>| Flow {
            id: id.to_owned(),
            direction: Some(direction.to_owned()),
            data_category_id: category.map(str::to_owned),
            ..Flow::default()
        };
        GraphDataset {
            nodes: vec![node("a"), node("b"), node("c")],
            links: vec![
                GraphLink {
                    id: "ab".to_owned(),
                    source: "a".to_owned(),
                    target: "b".to_owned(),
                    flows: vec![flow("f1", "bidirectional", Some("cat-1"))],
                    review_flows: vec![flow("f2", "forward", Some("cat-2"))],
                    ..GraphLink::default()
                },
                GraphLink {
                    id: "bc".to_owned(),
                    source: "b".to_owned(),
                    target: "c".to_owned(),
                    flows: vec![flow("f3", "reverse", None)],
                    ..GraphLink::default()
                },
                GraphLink {
                    id: "dangling".to_owned(),
                    source: "a".to_owned(),
                    target: "zz".to_owned(),
                    ..GraphLink::default()
                },
            ],
        }
    }

    fn view(dataset: &GraphDataset) -> GraphView {
        GraphView::new(
            dataset,
            LayoutConfig::default(),
            FlowLayoutConfig::default(),
            ViewportConfig::default(),
        )
    }

    struct Fixture {
        selection: Selection,
        highlight: HighlightState,
        filter: FlowFilter,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                selection: Selection::default(),
                highlight: HighlightState::default(),
                filter: FlowFilter::default(),
            }
        }

        fn inputs<'a>(
            &'a self,
            dataset: &'a GraphDataset,
            matches: Option<&'a HashSet<String>>,
            filter_revision: u64,
        ) -> GraphInputs<'a> {
            GraphInputs {
                links: &dataset.links,
                selection: &self.selection,
                highlight: &self.highlight,
                highlight_revision: 0,
                flow_filter: &self.filter,
                filter_matches: matches,
                filter_revision,
            }
        }
    }

    #[test]
    fn flows_follow_the_selection() {
        let dataset = dataset();
        let mut view = view(&dataset);
        let mut fixture = Fixture::new();
        let mut events = Vec::new();

        view.sync(&fixture.inputs(&dataset, None, 0), &mut events);
        assert!(view.render_flows().is_empty());

        fixture.selection.select_single("b");
        view.sync(&fixture.inputs(&dataset, None, 0), &mut events);
        let ids = view
            .render_flows()
            .iter()
            .map(|flow| flow.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["ab:f1:forward:t", "ab:f1:reverse:t", "bc:f3:reverse:t"]);
        assert_eq!(view.registry().flows.len(), 3);

        let before = Arc::clone(view.render_flows());
        view.sync(&fixture.inputs(&dataset, None, 0), &mut events);
        assert!(Arc::ptr_eq(&before, view.render_flows()));
    }

    #[test]
    fn legend_is_emitted_once_until_it_changes() {
        let dataset = dataset();
        let mut view = view(&dataset);
        let mut fixture = Fixture::new();
        let mut events = Vec::new();

        view.sync(&fixture.inputs(&dataset, None, 0), &mut events);
        view.sync(&fixture.inputs(&dataset, None, 0), &mut events);
        let legends = events
            .iter()
            .filter_map(|event| match event {
                GraphEvent::LegendChanged(items) => Some(items.len()),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(legends, [2]);

        events.clear();
        fixture.filter.show_proposals = true;
        view.sync(&fixture.inputs(&dataset, None, 0), &mut events);
        assert!(matches!(events.as_slice(), [GraphEvent::LegendChanged(items)] if items.len() == 3));
    }

    #[test]
    fn quick_filter_dims_without_touching_selection_styles() {
        let dataset = dataset();
        let mut view = view(&dataset);
        let mut fixture = Fixture::new();
        fixture.selection.select_single("a");
        let mut events = Vec::new();

        let matches = HashSet::from(["a".to_owned()]);
        view.sync(&fixture.inputs(&dataset, Some(&matches), 1), &mut events);

        let a = view.registry().nodes.get("a").unwrap();
        assert_eq!(a.filter_opacity, 1.0);
        assert_eq!(a.radius, 9.0);
        let c = view.registry().nodes.get("c").unwrap();
        assert!(c.filter_opacity < 1.0);
        assert_eq!(view.registry().links.get("ab").unwrap().filter_opacity, 1.0);
        assert!(view.registry().links.get("bc").unwrap().filter_opacity < 1.0);

        view.sync(&fixture.inputs(&dataset, None, 2), &mut events);
        assert_eq!(view.registry().nodes.get("c").unwrap().filter_opacity, 1.0);
        assert_eq!(view.registry().nodes.get("a").unwrap().radius, 9.0);
    }

    #[test]
    fn replacing_the_dataset_restarts_the_simulation() {
        let dataset = dataset();
        let mut view = view(&dataset);
        let epoch = view.simulation().epoch();

        let mut smaller = dataset.clone();
        smaller.nodes.retain(|node| node.id != "c");
        view.set_dataset(&smaller, false);

        assert!(view.simulation().epoch() > epoch);
        assert!(view.simulation().is_running());
        assert_eq!(view.simulation().graph().links.len(), 1);
        assert!(view.registry().nodes.get("c").is_none());
    }

    #[test]
    fn framing_unknown_nodes_is_a_no_op() {
        let dataset = dataset();
        let mut view = view(&dataset);
        view.set_size(Vec2::new(960.0, 600.0));
        assert!(!view.frame_nodes(&["missing".to_owned()], 1.0, 0.0));
        assert!(view.frame_nodes(&["a".to_owned()], 1.0, 0.0));
        assert!(view.viewport().is_animating());
    }
}
