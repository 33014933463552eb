use std::collections::HashMap;

use eframe::egui::Color32;

use super::super::flow::RenderFlow;
use super::super::render_utils::{EDGE_COLOR, NODE_STROKE_COLOR, OrdinalColors};
use super::build::SimGraph;

/// Wide invisible stroke used for link click targeting.
pub(in crate::app) const LINK_HIT_WIDTH: f32 = 16.0;
/// Wide invisible stroke used for flow hover targeting.
pub(in crate::app) const FLOW_HIT_WIDTH: f32 = 18.0;

const BASE_NODE_RADIUS: f32 = 6.0;
const BASE_NODE_STROKE_WIDTH: f32 = 1.5;
const BASE_LINK_WIDTH: f32 = 1.5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(in crate::app) struct JoinStats {
    pub entered: usize,
    pub updated: usize,
    pub exited: usize,
}

impl JoinStats {
    pub fn changed_membership(self) -> bool {
        self.entered > 0 || self.exited > 0
    }
}

/// Persistent visuals keyed by entity id. A join keeps existing visuals for
/// ids that survive, creates visuals for new ids and drops the rest.
#[derive(Debug)]
pub(in crate::app) struct KeyedLayer<V> {
    order: Vec<String>,
    visuals: HashMap<String, V>,
}

impl<V> Default for KeyedLayer<V> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            visuals: HashMap::new(),
        }
    }
}

impl<V> KeyedLayer<V> {
    pub fn join<T>(
        &mut self,
        data: &[T],
        key: impl Fn(&T) -> &str,
        mut enter: impl FnMut(&T) -> V,
        mut update: impl FnMut(&T, &mut V),
    ) -> JoinStats {
        let mut stats = JoinStats::default();
        let mut next = HashMap::with_capacity(data.len());
        let mut order = Vec::with_capacity(data.len());

        for datum in data {
            let id = key(datum);
            if next.contains_key(id) {
                continue;
            }
            let visual = match self.visuals.remove(id) {
                Some(mut visual) => {
                    update(datum, &mut visual);
                    stats.updated += 1;
                    visual
                }
                None => {
                    stats.entered += 1;
                    enter(datum)
                }
            };
            order.push(id.to_owned());
            next.insert(id.to_owned(), visual);
        }

        stats.exited = self.visuals.len();
        self.visuals = next;
        self.order = order;
        stats
    }

    pub fn get(&self, id: &str) -> Option<&V> {
        self.visuals.get(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Visuals in bind order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.order
            .iter()
            .filter_map(|id| self.visuals.get(id).map(|visual| (id.as_str(), visual)))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.visuals.values_mut()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct NodeVisual {
    pub index: usize,
    pub label: String,
    pub fill: Color32,
    pub radius: f32,
    pub stroke_color: Color32,
    pub stroke_width: f32,
    pub highlight_opacity: f32,
    pub label_highlight_opacity: f32,
    pub filter_opacity: f32,
    pub filter_fill: Option<Color32>,
}

impl NodeVisual {
    pub fn opacity(&self) -> f32 {
        self.highlight_opacity * self.filter_opacity
    }

    pub fn label_opacity(&self) -> f32 {
        self.label_highlight_opacity * self.filter_opacity
    }

    pub fn effective_fill(&self) -> Color32 {
        self.filter_fill.unwrap_or(self.fill)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct LinkVisual {
    pub index: usize,
    pub width: f32,
    pub color: Color32,
    pub filter_opacity: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct FlowVisual {
    pub position: usize,
    pub link_index: usize,
    pub filter_opacity: f32,
}

#[derive(Default)]
pub(in crate::app) struct VisualRegistry {
    pub nodes: KeyedLayer<NodeVisual>,
    pub links: KeyedLayer<LinkVisual>,
    pub flows: KeyedLayer<FlowVisual>,
    kind_colors: OrdinalColors,
    generation: u64,
}

impl VisualRegistry {
    /// Incremented whenever a join adds or removes visuals.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn bind_graph(&mut self, graph: &SimGraph) -> (JoinStats, JoinStats) {
        let indexed_nodes = graph.nodes.iter().enumerate().collect::<Vec<_>>();
        let kind_colors = &mut self.kind_colors;
        let node_stats = self.nodes.join(
            &indexed_nodes,
            |(_, node)| node.id.as_str(),
            |(index, node)| NodeVisual {
                index: *index,
                label: node.name.clone(),
                fill: kind_colors.color(&node.kind),
                radius: BASE_NODE_RADIUS,
                stroke_color: NODE_STROKE_COLOR,
                stroke_width: BASE_NODE_STROKE_WIDTH,
                highlight_opacity: 1.0,
                label_highlight_opacity: 0.9,
                filter_opacity: 1.0,
                filter_fill: None,
            },
            |(index, node), visual| {
                visual.index = *index;
                visual.label.clone_from(&node.name);
            },
        );

        let indexed_links = graph.links.iter().enumerate().collect::<Vec<_>>();
        let link_stats = self.links.join(
            &indexed_links,
            |(_, link)| link.id.as_str(),
            |(index, _)| LinkVisual {
                index: *index,
                width: BASE_LINK_WIDTH,
                color: EDGE_COLOR,
                filter_opacity: 1.0,
            },
            |(index, _), visual| visual.index = *index,
        );

        // Kind colors are refreshed on update too; a node may change kind
        // between refreshes.
        for (_, node) in &indexed_nodes {
            let color = self.kind_colors.color(&node.kind);
            if let Some(visual) = self.nodes.visuals.get_mut(&node.id) {
                visual.fill = color;
            }
        }

        if node_stats.changed_membership() || link_stats.changed_membership() {
            self.generation += 1;
        }
        (node_stats, link_stats)
    }

    pub fn bind_flows(&mut self, flows: &[RenderFlow]) -> JoinStats {
        let indexed = flows.iter().enumerate().collect::<Vec<_>>();
        let stats = self.flows.join(
            &indexed,
            |(_, flow)| flow.id.as_str(),
            |(position, flow)| FlowVisual {
                position: *position,
                link_index: flow.link_index,
                filter_opacity: 1.0,
            },
            |(position, flow), visual| {
                visual.position = *position;
                visual.link_index = flow.link_index;
            },
        );
        if stats.changed_membership() {
            self.generation += 1;
        }
        stats
    }
}
