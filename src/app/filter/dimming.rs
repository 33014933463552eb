use std::collections::HashSet;

use super::super::flow::RenderFlow;
use super::super::graph::{SimGraph, VisualRegistry};
use super::super::render_utils::DIM_NODE_FILL;

/// Opacity of filtered-out nodes, labels and halos.
pub(in crate::app) const DIM_NODE_OPACITY: f32 = 0.18;
/// Opacity of filtered-out links, flows and their hit lines.
pub(in crate::app) const DIM_EDGE_OPACITY: f32 = 0.12;

/// Writes the quick-filter channel of every visual. `matches` is `None`
/// when the filter is inactive, which restores full opacity.
pub(in crate::app) fn apply_quick_filter_dimming(
    registry: &mut VisualRegistry,
    graph: &SimGraph,
    flows: &[RenderFlow],
    matches: Option<&HashSet<String>>,
) {
    let Some(matches) = matches else {
        for visual in registry.nodes.values_mut() {
            visual.filter_opacity = 1.0;
            visual.filter_fill = None;
        }
        for visual in registry.links.values_mut() {
            visual.filter_opacity = 1.0;
        }
        for visual in registry.flows.values_mut() {
            visual.filter_opacity = 1.0;
        }
        return;
    };

    for visual in registry.nodes.values_mut() {
        let matched = graph
            .nodes
            .get(visual.index)
            .is_some_and(|node| matches.contains(&node.id));
        visual.filter_opacity = if matched { 1.0 } else { DIM_NODE_OPACITY };
        visual.filter_fill = (!matched).then_some(DIM_NODE_FILL);
    }

    let link_matches = |link_index: usize| {
        graph.links.get(link_index).is_some_and(|link| {
            let (source, target) = graph.link_endpoint_ids(link);
            matches.contains(source) || matches.contains(target)
        })
    };
    let edge_opacity = |matched: bool| if matched { 1.0 } else { DIM_EDGE_OPACITY };

    for visual in registry.links.values_mut() {
        visual.filter_opacity = edge_opacity(link_matches(visual.index));
    }
    for visual in registry.flows.values_mut() {
        let link_index = flows
            .get(visual.position)
            .map_or(visual.link_index, |flow| flow.link_index);
        visual.filter_opacity = edge_opacity(link_matches(link_index));
    }
}
