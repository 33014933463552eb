//! Selection and highlight styling. Writes only the highlight channel of the
//! visual registry; the quick filter owns its own channel.

use super::graph::{SimGraph, VisualRegistry};
use super::render_utils::{ACCENT_COLOR, EDGE_COLOR, MUTED_EDGE_COLOR, NODE_STROKE_COLOR};
use super::selection::Selection;
use crate::model::HighlightState;

const PRIMARY_RADIUS: f32 = 9.0;
const MEMBER_RADIUS: f32 = 8.0;
const NODE_RADIUS: f32 = 6.0;

const PRIMARY_STROKE_WIDTH: f32 = 2.5;
const MEMBER_STROKE_WIDTH: f32 = 2.2;
const NODE_STROKE_WIDTH: f32 = 1.5;

const SELECTED_LINK_WIDTH: f32 = 3.0;
const LINK_WIDTH: f32 = 1.5;

const DIMMED_NODE_OPACITY: f32 = 0.25;
const LABEL_OPACITY: f32 = 0.9;
const DIMMED_LABEL_OPACITY: f32 = 0.12;

pub(super) fn apply_selection_styles(
    registry: &mut VisualRegistry,
    graph: &SimGraph,
    selection: &Selection,
    highlight: &HighlightState,
) {
    let dims = highlight.dims_others();

    for visual in registry.links.values_mut() {
        let Some(link) = graph.links.get(visual.index) else {
            continue;
        };
        let selected = selection.edge() == Some(link.id.as_str());
        visual.width = if selected {
            SELECTED_LINK_WIDTH
        } else {
            LINK_WIDTH
        };
        visual.color = if selected {
            ACCENT_COLOR
        } else if dims {
            if highlight.edge_ids.contains(&link.id) {
                ACCENT_COLOR
            } else {
                MUTED_EDGE_COLOR
            }
        } else {
            EDGE_COLOR
        };
    }

    for visual in registry.nodes.values_mut() {
        let Some(node) = graph.nodes.get(visual.index) else {
            continue;
        };
        let primary = selection.primary() == Some(node.id.as_str());
        let member = selection.contains_node(&node.id);

        (visual.radius, visual.stroke_width) = if primary {
            (PRIMARY_RADIUS, PRIMARY_STROKE_WIDTH)
        } else if member {
            (MEMBER_RADIUS, MEMBER_STROKE_WIDTH)
        } else {
            (NODE_RADIUS, NODE_STROKE_WIDTH)
        };
        visual.stroke_color = if primary || member {
            ACCENT_COLOR
        } else {
            NODE_STROKE_COLOR
        };

        let faded = dims && !highlight.node_ids.contains(&node.id);
        visual.highlight_opacity = if faded { DIMMED_NODE_OPACITY } else { 1.0 };
        visual.label_highlight_opacity = if faded {
            DIMMED_LABEL_OPACITY
        } else {
            LABEL_OPACITY
        };
    }
}

#[cfg(test)]
mod tests {
    use super::super::graph::build_sim_graph;
    use super::super::selection::ClickModifiers;
    use super::*;
    use crate::model::{GraphLink, GraphNode};

    fn fixture() -> (SimGraph, VisualRegistry) {
        let nodes = ["a", "b", "c"].map(|id| GraphNode {
            id: id.to_owned(),
            ..GraphNode::default()
        });
        let links = [("ab", "a", "b"), ("bc", "b", "c")].map(|(id, source, target)| GraphLink {
            id: id.to_owned(),
            source: source.to_owned(),
            target: target.to_owned(),
            ..GraphLink::default()
        });
        let graph = build_sim_graph(&nodes, &links);
        let mut registry = VisualRegistry::default();
        registry.bind_graph(&graph);
        (graph, registry)
    }

    #[test]
    fn primary_and_members_are_emphasized() {
        let (graph, mut registry) = fixture();
        let mut selection = Selection::default();
        selection.click_node("a", ClickModifiers::default());
        selection.click_node(
            "b",
            ClickModifiers {
                toggle: false,
                add: true,
            },
        );
        apply_selection_styles(&mut registry, &graph, &selection, &HighlightState::default());

        let b = registry.nodes.get("b").unwrap();
        assert_eq!((b.radius, b.stroke_width), (PRIMARY_RADIUS, PRIMARY_STROKE_WIDTH));
        let a = registry.nodes.get("a").unwrap();
        assert_eq!((a.radius, a.stroke_width), (MEMBER_RADIUS, MEMBER_STROKE_WIDTH));
        assert_eq!(a.stroke_color, ACCENT_COLOR);
        let c = registry.nodes.get("c").unwrap();
        assert_eq!(c.radius, NODE_RADIUS);
        assert_eq!(c.stroke_color, NODE_STROKE_COLOR);
        assert_eq!(c.highlight_opacity, 1.0);
    }

    #[test]
    fn highlight_fades_non_members_independently_of_selection() {
        let (graph, mut registry) = fixture();
        let mut selection = Selection::default();
        selection.select_edge("bc");
        let highlight = HighlightState::from_ids(["a".to_owned()], ["ab".to_owned()], None);
        apply_selection_styles(&mut registry, &graph, &selection, &highlight);

        assert_eq!(registry.nodes.get("a").unwrap().highlight_opacity, 1.0);
        let b = registry.nodes.get("b").unwrap();
        assert_eq!(b.highlight_opacity, DIMMED_NODE_OPACITY);
        assert_eq!(b.label_highlight_opacity, DIMMED_LABEL_OPACITY);

        let ab = registry.links.get("ab").unwrap();
        assert_eq!((ab.width, ab.color), (LINK_WIDTH, ACCENT_COLOR));
        let bc = registry.links.get("bc").unwrap();
        assert_eq!((bc.width, bc.color), (SELECTED_LINK_WIDTH, ACCENT_COLOR));
    }

    #[test]
    fn highlight_without_dim_flag_leaves_defaults() {
        let (graph, mut registry) = fixture();
        let mut highlight = HighlightState::from_ids(["a".to_owned()], [], None);
        highlight.dim_others = false;
        apply_selection_styles(&mut registry, &graph, &Selection::default(), &highlight);

        assert_eq!(registry.nodes.get("c").unwrap().highlight_opacity, 1.0);
        assert_eq!(registry.links.get("bc").unwrap().color, EDGE_COLOR);
    }
}
