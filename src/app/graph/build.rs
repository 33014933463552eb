use std::collections::HashMap;

use eframe::egui::Vec2;
use tracing::debug;

use crate::model::{GraphLink, GraphNode};

/// Simulation projection of a [`GraphNode`]. Position state is owned by the
/// layout engine and only read by the render layer.
#[derive(Clone, Debug)]
pub(in crate::app) struct SimNode {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub pos: Vec2,
    pub velocity: Vec2,
    pub drag_pin: Option<Vec2>,
    pub selection_pin: Option<Vec2>,
}

impl SimNode {
    fn from_graph_node(node: &GraphNode) -> Self {
        Self {
            id: node.id.clone(),
            kind: node.kind.clone(),
            name: node.display_name().to_owned(),
            pos: Vec2::ZERO,
            velocity: Vec2::ZERO,
            drag_pin: None,
            selection_pin: None,
        }
    }

    /// Drag wins over selection so the two pin sources never fight.
    pub fn fixed_position(&self) -> Option<Vec2> {
        self.drag_pin.or(self.selection_pin)
    }
}

/// Simulation projection of a [`GraphLink`] whose endpoints are indices into
/// the node arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::app) struct SimLink {
    pub id: String,
    pub kind: String,
    pub source: usize,
    pub target: usize,
}

#[derive(Clone, Debug, Default)]
pub(in crate::app) struct SimGraph {
    pub nodes: Vec<SimNode>,
    pub links: Vec<SimLink>,
    pub index_by_id: HashMap<String, usize>,
}

impl SimGraph {
    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn link_endpoint_ids(&self, link: &SimLink) -> (&str, &str) {
        (
            self.nodes[link.source].id.as_str(),
            self.nodes[link.target].id.as_str(),
        )
    }
}

/// Builds simulation entities from the current dataset. Links whose endpoints
/// do not resolve are dropped without error.
pub(in crate::app) fn build_sim_graph(nodes: &[GraphNode], links: &[GraphLink]) -> SimGraph {
    let mut sim_nodes = Vec::with_capacity(nodes.len());
    let mut index_by_id = HashMap::with_capacity(nodes.len());
    for node in nodes {
        if index_by_id.contains_key(&node.id) {
            debug!(node_id = %node.id, "duplicate node id ignored");
            continue;
        }
        index_by_id.insert(node.id.clone(), sim_nodes.len());
        sim_nodes.push(SimNode::from_graph_node(node));
    }

    let mut dropped = 0usize;
    let sim_links = links
        .iter()
        .filter_map(|link| {
            let resolved = index_by_id
                .get(&link.source)
                .copied()
                .zip(index_by_id.get(&link.target).copied());
            if resolved.is_none() {
                dropped += 1;
            }
            resolved.map(|(source, target)| SimLink {
                id: link.id.clone(),
                kind: link.kind.clone(),
                source,
                target,
            })
        })
        .collect::<Vec<_>>();

    if dropped > 0 {
        debug!(dropped, kept = sim_links.len(), "links with unresolved endpoints excluded");
    }

    SimGraph {
        nodes: sim_nodes,
        links: sim_links,
        index_by_id,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn node(id: &str) -> GraphNode {
        GraphNode {
            id: id.to_owned(),
            kind: "system".to_owned(),
            name: id.to_uppercase(),
            ..GraphNode::default()
        }
    }

    fn link(id: &str, source: &str, target: &str) -> GraphLink {
        GraphLink {
            id: id.to_owned(),
            source: source.to_owned(),
            target: target.to_owned(),
            ..GraphLink::default()
        }
    }

    #[test]
    fn dangling_link_is_dropped_silently() {
        let graph = build_sim_graph(&[node("X")], &[link("e1", "X", "Y")]);
        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.links.is_empty());
    }

    #[test]
    fn resolved_links_are_exactly_the_fully_connected_ones() {
        let nodes = ["a", "b", "c"].map(node);
        let links = [
            link("ab", "a", "b"),
            link("bc", "b", "c"),
            link("cz", "c", "z"),
            link("za", "z", "a"),
            link("aa", "a", "a"),
        ];
        let graph = build_sim_graph(&nodes, &links);

        let expected = links
            .iter()
            .filter(|l| {
                graph.index_by_id.contains_key(&l.source) && graph.index_by_id.contains_key(&l.target)
            })
            .map(|l| l.id.as_str())
            .collect::<HashSet<_>>();
        let actual = graph.links.iter().map(|l| l.id.as_str()).collect::<HashSet<_>>();

        assert_eq!(actual, expected);
        assert_eq!(graph.links.len(), 3);

        let bc = graph.links.iter().find(|l| l.id == "bc").unwrap();
        assert_eq!(graph.link_endpoint_ids(bc), ("b", "c"));
    }

    #[test]
    fn sim_nodes_start_unpinned_at_origin() {
        let graph = build_sim_graph(&[node("a")], &[]);
        let sim = &graph.nodes[0];
        assert_eq!(sim.pos, Vec2::ZERO);
        assert_eq!(sim.name, "A");
        assert!(sim.fixed_position().is_none());
    }

    #[test]
    fn drag_pin_overrides_selection_pin() {
        let mut graph = build_sim_graph(&[node("a")], &[]);
        let sim = &mut graph.nodes[0];
        sim.selection_pin = Some(Vec2::new(1.0, 1.0));
        sim.drag_pin = Some(Vec2::new(5.0, 5.0));
        assert_eq!(sim.fixed_position(), Some(Vec2::new(5.0, 5.0)));
        sim.drag_pin = None;
        assert_eq!(sim.fixed_position(), Some(Vec2::new(1.0, 1.0)));
    }
}
