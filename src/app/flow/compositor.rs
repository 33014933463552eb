use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use eframe::egui::Color32;
use tracing::debug;

use crate::model::{Flow, GraphLink};

use super::super::graph::{SimGraph, SimLink};
use super::super::render_utils::{FLOW_INCOMING_COLOR, FLOW_OUTGOING_COLOR};
use super::legend::{category_id, category_name};
use super::{
    DashPattern, FlowDir, FlowFilter, FlowFreqClass, FlowLineDir, normalize_flow_dir,
    normalize_frequency_class,
};

const NIL_UUID: &str = "00000000-0000-0000-0000-000000000000";

/// Bumped whenever the cache key gains or loses an input.
const FLOW_CACHE_KEY_VERSION: u32 = 2;

/// A flow plus whether it came from the unapproved proposal list.
#[derive(Clone, Debug)]
pub(in crate::app) struct TaggedFlow {
    pub flow: Flow,
    pub is_review: bool,
}

/// Edge id -> flows to draw for it. Proposals are appended after published
/// flows when `show_proposals` is set.
pub(in crate::app) fn flows_by_edge(
    links: &[GraphLink],
    show_proposals: bool,
) -> HashMap<String, Vec<TaggedFlow>> {
    links
        .iter()
        .map(|link| {
            let published = link.flows.iter().map(|flow| TaggedFlow {
                flow: flow.clone(),
                is_review: false,
            });
            let proposals = link
                .review_flows
                .iter()
                .filter(|_| show_proposals)
                .map(|flow| TaggedFlow {
                    flow: flow.clone(),
                    is_review: true,
                });
            (link.id.clone(), published.chain(proposals).collect())
        })
        .collect()
}

/// Edges eligible for flow overlays. A selected edge wins; otherwise every
/// link touching a selected node; otherwise nothing.
pub(in crate::app) fn active_edge_ids<'a>(
    links: impl IntoIterator<Item = &'a GraphLink>,
    selected_edge_id: Option<&str>,
    selected_node_ids: &[String],
) -> BTreeSet<String> {
    if let Some(edge_id) = selected_edge_id {
        return BTreeSet::from([edge_id.to_owned()]);
    }

    if selected_node_ids.is_empty() {
        return BTreeSet::new();
    }

    links
        .into_iter()
        .filter(|link| {
            selected_node_ids
                .iter()
                .any(|node_id| link.touches(node_id))
        })
        .map(|link| link.id.clone())
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct RenderFlow {
    pub id: String,
    pub edge_id: String,
    pub link_index: usize,
    pub flow: Flow,
    pub dir: FlowLineDir,
    pub lane_index: usize,
    pub lane_count: usize,
    pub category_id: String,
    pub category_name: String,
    pub stroke: Color32,
    pub dash: DashPattern,
    pub dash_offset: f32,
    pub freq_class: FlowFreqClass,
    pub is_review: bool,
}

impl RenderFlow {
    pub fn period_secs(&self) -> f32 {
        self.freq_class.animation_period_secs()
    }

    pub fn stroke_width(&self) -> f32 {
        if self.is_review { 2.4 } else { 3.2 }
    }

    pub fn stroke_opacity(&self) -> f32 {
        if self.is_review { 0.55 } else { 0.96 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct FlowFingerprint {
    edge_id: String,
    flow_id: String,
    flow_type: String,
    direction: String,
    is_review: bool,
}

/// Everything the overlay list depends on. Two equal keys always produce the
/// same render flows.
#[derive(Clone, Debug, PartialEq, Eq)]
struct FlowCacheKey {
    version: u32,
    active_edge_ids: Vec<String>,
    filter: FlowFilter,
    focus_node_id: Option<String>,
    flows: Vec<FlowFingerprint>,
    sim_epoch: u64,
}

impl FlowCacheKey {
    fn from_inputs(inputs: &FlowInputs<'_>) -> Self {
        let mut flows = Vec::new();
        for edge_id in inputs.active_edge_ids {
            let Some(edge_flows) = inputs.flows_by_edge.get(edge_id) else {
                continue;
            };
            flows.extend(edge_flows.iter().enumerate().map(|(index, tagged)| {
                FlowFingerprint {
                    edge_id: edge_id.clone(),
                    flow_id: if tagged.flow.id.is_empty() {
                        index.to_string()
                    } else {
                        tagged.flow.id.clone()
                    },
                    flow_type: tagged.flow.flow_type.clone(),
                    direction: tagged.flow.direction.clone().unwrap_or_default(),
                    is_review: tagged.is_review,
                }
            }));
        }

        Self {
            version: FLOW_CACHE_KEY_VERSION,
            active_edge_ids: inputs.active_edge_ids.iter().cloned().collect(),
            filter: inputs.filter.clone(),
            focus_node_id: inputs.focus_node_id.map(str::to_owned),
            flows,
            sim_epoch: inputs.sim_epoch,
        }
    }
}

pub(in crate::app) struct FlowInputs<'a> {
    pub graph: &'a SimGraph,
    pub flows_by_edge: &'a HashMap<String, Vec<TaggedFlow>>,
    pub active_edge_ids: &'a BTreeSet<String>,
    pub filter: &'a FlowFilter,
    pub focus_node_id: Option<&'a str>,
    pub category_names: &'a HashMap<String, String>,
    pub sim_epoch: u64,
}

/// Memoizing builder for the flow overlay list.
#[derive(Default)]
pub(in crate::app) struct FlowCompositor {
    cached: Option<(FlowCacheKey, Arc<Vec<RenderFlow>>)>,
}

impl FlowCompositor {
    /// Returns the previous `Arc` untouched when no input changed.
    pub fn compose(&mut self, inputs: &FlowInputs<'_>) -> Arc<Vec<RenderFlow>> {
        let key = FlowCacheKey::from_inputs(inputs);
        if let Some((cached_key, rendered)) = &self.cached
            && *cached_key == key
        {
            return Arc::clone(rendered);
        }

        let rendered = Arc::new(build_render_flows(inputs));
        debug!(
            active_edges = inputs.active_edge_ids.len(),
            render_flows = rendered.len(),
            "flow overlay recomputed"
        );
        self.cached = Some((key, Arc::clone(&rendered)));
        rendered
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

fn stroke_for(dir: FlowLineDir, source_id: &str, target_id: &str, focus: Option<&str>) -> Color32 {
    let Some(focus) = focus else {
        return match dir {
            FlowLineDir::Forward => FLOW_OUTGOING_COLOR,
            FlowLineDir::Reverse => FLOW_INCOMING_COLOR,
        };
    };

    let destination = match dir {
        FlowLineDir::Forward => target_id,
        FlowLineDir::Reverse => source_id,
    };
    if destination == focus {
        FLOW_INCOMING_COLOR
    } else {
        FLOW_OUTGOING_COLOR
    }
}

fn build_render_flows(inputs: &FlowInputs<'_>) -> Vec<RenderFlow> {
    let mut rendered = Vec::new();

    for (link_index, link) in inputs.graph.links.iter().enumerate() {
        if !inputs.active_edge_ids.contains(&link.id) {
            continue;
        }

        let Some(edge_flows) = inputs.flows_by_edge.get(&link.id) else {
            continue;
        };
        let kept = edge_flows
            .iter()
            .filter(|tagged| inputs.filter.keeps(&tagged.flow))
            .collect::<Vec<_>>();
        let lane_count = kept.len();

        for (lane_index, tagged) in kept.into_iter().enumerate() {
            push_flow_entries(
                &mut rendered,
                inputs,
                link,
                link_index,
                tagged,
                lane_index,
                lane_count,
            );
        }
    }

    rendered
}

fn push_flow_entries(
    rendered: &mut Vec<RenderFlow>,
    inputs: &FlowInputs<'_>,
    link: &SimLink,
    link_index: usize,
    tagged: &TaggedFlow,
    lane_index: usize,
    lane_count: usize,
) {
    let flow = &tagged.flow;
    let freq_class = normalize_frequency_class(flow.frequency.as_deref());
    let dash = freq_class.dash_pattern();
    let category = category_id(flow.data_category_id.as_deref());
    let category_label = category_name(&category, inputs.category_names);
    let base_id = if flow.id.is_empty() || flow.id == NIL_UUID {
        format!("implicit:{lane_index}")
    } else {
        flow.id.clone()
    };
    let truth_tag = if tagged.is_review { "r" } else { "t" };
    let (source_id, target_id) = inputs.graph.link_endpoint_ids(link);

    let lanes: &[(FlowLineDir, f32)] = match normalize_flow_dir(flow.direction.as_deref()) {
        FlowDir::Forward => &[(FlowLineDir::Forward, 0.0)],
        FlowDir::Reverse => &[(FlowLineDir::Reverse, 0.0)],
        FlowDir::Both => &[
            (FlowLineDir::Forward, 0.0),
            (FlowLineDir::Reverse, dash.half_cycle()),
        ],
    };

    for &(dir, dash_offset) in lanes {
        let dir_label = match dir {
            FlowLineDir::Forward => "forward",
            FlowLineDir::Reverse => "reverse",
        };
        rendered.push(RenderFlow {
            id: format!("{}:{base_id}:{dir_label}:{truth_tag}", link.id),
            edge_id: link.id.clone(),
            link_index,
            flow: flow.clone(),
            dir,
            lane_index,
            lane_count,
            category_id: category.clone(),
            category_name: category_label.clone(),
            stroke: stroke_for(dir, source_id, target_id, inputs.focus_node_id),
            dash,
            dash_offset,
            freq_class,
            is_review: tagged.is_review,
        });
    }
}
