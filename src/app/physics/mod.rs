mod forces;
mod quadtree;

use std::collections::BTreeSet;

use eframe::egui::{Vec2, vec2};
use tracing::debug;

use super::graph::{SimGraph, SimNode};
use forces::{
    CollisionParams, LinkCoefficients, accumulate_charge_for_node, accumulate_collision_pairs,
    apply_centering, apply_link_springs,
};
use quadtree::QuadNode;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct LayoutConfig {
    pub charge: f32,
    pub link_distance: f32,
    pub collision_radius: f32,
    pub alpha_decay: f32,
    pub alpha_min: f32,
    pub velocity_decay: f32,
    pub drag_alpha_target: f32,
    pub theta: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            charge: -220.0,
            link_distance: 90.0,
            collision_radius: 14.0,
            alpha_decay: 0.06,
            alpha_min: 0.001,
            velocity_decay: 0.4,
            drag_alpha_target: 0.3,
            theta: 0.9,
        }
    }
}

const INITIAL_RADIUS: f32 = 10.0;

/// Sunflower spiral seed positions around the origin.
fn phyllotaxis(index: usize) -> Vec2 {
    let angle = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
    let radius = INITIAL_RADIUS * (0.5 + index as f32).sqrt();
    let theta = index as f32 * angle;
    vec2(radius * theta.cos(), radius * theta.sin())
}

/// Force-directed layout over one dataset's node arena. The simulation is
/// the only writer of node positions; everything else reads [`Self::graph`].
pub(in crate::app) struct Simulation {
    graph: SimGraph,
    config: LayoutConfig,
    center: Vec2,
    alpha: f32,
    alpha_target: f32,
    running: bool,
    epoch: u64,
    link_coefficients: LinkCoefficients,
    pinned_by_selection: BTreeSet<usize>,
    dragging: Option<usize>,
    positions: Vec<Vec2>,
    collision_deltas: Vec<Vec2>,
}

impl Simulation {
    pub fn new(mut graph: SimGraph, config: LayoutConfig, center: Vec2, epoch: u64) -> Self {
        // Nodes arrive at the origin; coincident points would get no charge
        // force, so spread them on a spiral first.
        for (index, node) in graph.nodes.iter_mut().enumerate() {
            node.pos = phyllotaxis(index);
            node.velocity = Vec2::ZERO;
        }
        let link_coefficients = LinkCoefficients::new(graph.nodes.len(), &graph.links);
        debug!(
            epoch,
            nodes = graph.nodes.len(),
            links = graph.links.len(),
            "simulation started"
        );

        Self {
            graph,
            config,
            center,
            alpha: 1.0,
            alpha_target: 0.0,
            running: true,
            epoch,
            link_coefficients,
            pinned_by_selection: BTreeSet::new(),
            dragging: None,
            positions: Vec::new(),
            collision_deltas: Vec::new(),
        }
    }

    pub fn graph(&self) -> &SimGraph {
        &self.graph
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.graph.nodes
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_center(&mut self, center: Vec2) {
        if (self.center - center).length_sq() > 0.25 {
            self.center = center;
            self.restart();
        }
    }

    pub fn restart(&mut self) {
        self.running = true;
    }

    /// Reheats the layout so it settles again.
    pub fn reheat(&mut self) {
        self.alpha = 1.0;
        self.restart();
    }

    pub fn stop(&mut self) {
        if self.running {
            debug!(epoch = self.epoch, alpha = self.alpha, "simulation stopped");
        }
        self.running = false;
    }

    /// Advances one step and hands the updated arena to `on_tick`. Returns
    /// whether the simulation is still running afterwards.
    pub fn tick(&mut self, mut on_tick: impl FnMut(&[SimNode])) -> bool {
        if !self.running {
            return false;
        }

        self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
        self.step();
        on_tick(&self.graph.nodes);

        if self.alpha < self.config.alpha_min {
            self.stop();
        }
        self.running
    }

    fn step(&mut self) {
        let alpha = self.alpha;
        let nodes = &mut self.graph.nodes;
        if nodes.is_empty() {
            return;
        }

        apply_link_springs(
            nodes,
            &self.graph.links,
            &self.link_coefficients,
            self.config.link_distance,
            alpha,
        );

        self.positions.clear();
        self.positions.extend(nodes.iter().map(|node| node.pos));
        if let Some(tree) = QuadNode::build(&self.positions) {
            for (index, node) in nodes.iter_mut().enumerate() {
                if !node.pos.x.is_finite() || !node.pos.y.is_finite() {
                    continue;
                }
                accumulate_charge_for_node(
                    &tree,
                    index,
                    &self.positions,
                    self.config.charge,
                    self.config.theta,
                    alpha,
                    &mut node.velocity,
                );
            }
        }

        apply_centering(nodes, self.center);

        self.positions.clear();
        self.positions
            .extend(nodes.iter().map(|node| node.pos + node.velocity));
        self.collision_deltas.clear();
        self.collision_deltas.resize(nodes.len(), Vec2::ZERO);
        if let Some(tree) = QuadNode::build(&self.positions) {
            accumulate_collision_pairs(
                &tree,
                &tree,
                true,
                &self.positions,
                CollisionParams {
                    radius: self.config.collision_radius,
                    strength: 1.0,
                },
                &mut self.collision_deltas,
            );
        }

        let retain = 1.0 - self.config.velocity_decay;
        for (node, collision) in nodes.iter_mut().zip(&self.collision_deltas) {
            if let Some(fixed) = node.fixed_position() {
                node.pos = fixed;
                node.velocity = Vec2::ZERO;
                continue;
            }
            node.velocity = (node.velocity + *collision) * retain;
            node.pos += node.velocity;
        }
    }

    /// Pins `index` under the pointer and keeps the rest of the layout warm.
    pub fn begin_drag(&mut self, index: usize) {
        let Some(node) = self.graph.nodes.get_mut(index) else {
            return;
        };
        node.drag_pin = Some(node.pos);
        self.dragging = Some(index);
        self.alpha_target = self.config.drag_alpha_target;
        self.restart();
    }

    pub fn drag_to(&mut self, index: usize, world: Vec2) {
        if let Some(node) = self.graph.nodes.get_mut(index) {
            node.drag_pin = Some(world);
        }
    }

    /// Releases the drag pin. A node also pinned by selection stays where it
    /// was dropped.
    pub fn end_drag(&mut self, index: usize) {
        if let Some(node) = self.graph.nodes.get_mut(index) {
            if let Some(dropped) = node.drag_pin.take()
                && self.pinned_by_selection.contains(&index)
            {
                node.selection_pin = Some(dropped);
            }
        }
        self.dragging = None;
        self.alpha_target = 0.0;
    }

    pub fn dragging(&self) -> Option<usize> {
        self.dragging
    }

    /// Pins the selection anchor in place and releases any previously pinned
    /// node.
    pub fn sync_selection_pins(&mut self, anchor: Option<&str>) {
        let desired = anchor.and_then(|id| self.graph.node_index(id));

        let stale = self
            .pinned_by_selection
            .iter()
            .copied()
            .filter(|&index| Some(index) != desired)
            .collect::<Vec<_>>();
        for index in stale {
            self.pinned_by_selection.remove(&index);
            if let Some(node) = self.graph.nodes.get_mut(index) {
                node.selection_pin = None;
            }
        }

        if let Some(index) = desired
            && self.pinned_by_selection.insert(index)
            && let Some(node) = self.graph.nodes.get_mut(index)
        {
            node.selection_pin = Some(node.pos);
        }
    }
}

/// How many simulation steps to run for a frame of `delta_seconds`, assuming
/// the layout was tuned for 60 steps per second.
pub(in crate::app) fn ticks_for_frame(delta_seconds: f32) -> usize {
    ((delta_seconds * 60.0).round() as usize).clamp(1, 4)
}

#[cfg(test)]
mod tests {
    use super::super::graph::build_sim_graph;
    use super::*;
    use crate::model::{GraphLink, GraphNode};

    fn graph(ids: &[&str], edges: &[(&str, &str)]) -> SimGraph {
        let nodes = ids
            .iter()
            .map(|id| GraphNode {
                id: (*id).to_owned(),
                ..GraphNode::default()
            })
            .collect::<Vec<_>>();
        let links = edges
            .iter()
            .map(|(source, target)| GraphLink {
                id: format!("{source}-{target}"),
                source: (*source).to_owned(),
                target: (*target).to_owned(),
                ..GraphLink::default()
            })
            .collect::<Vec<_>>();
        build_sim_graph(&nodes, &links)
    }

    fn run_to_rest(simulation: &mut Simulation, limit: usize) -> usize {
        let mut ticks = 0;
        while ticks < limit && simulation.tick(|_| {}) {
            ticks += 1;
        }
        ticks
    }

    #[test]
    fn seeds_are_distinct() {
        let simulation = Simulation::new(
            graph(&["a", "b", "c"], &[]),
            LayoutConfig::default(),
            Vec2::ZERO,
            1,
        );
        let nodes = simulation.nodes();
        assert_ne!(nodes[0].pos, nodes[1].pos);
        assert_ne!(nodes[1].pos, nodes[2].pos);
    }

    #[test]
    fn layout_converges_and_stops() {
        let center = vec2(480.0, 300.0);
        let mut simulation = Simulation::new(
            graph(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("c", "d")]),
            LayoutConfig::default(),
            center,
            1,
        );

        let ticks = run_to_rest(&mut simulation, 1_000);
        assert!(ticks < 200, "took {ticks} ticks");
        assert!(!simulation.is_running());
        assert!(!simulation.tick(|_| panic!("stopped simulation must not tick")));

        let nodes = simulation.nodes();
        assert!(nodes.iter().all(|node| node.pos.x.is_finite() && node.pos.y.is_finite()));
        for (index, a) in nodes.iter().enumerate() {
            for b in &nodes[index + 1..] {
                assert!((a.pos - b.pos).length() > 20.0);
            }
        }

        let mean = nodes.iter().fold(Vec2::ZERO, |sum, node| sum + node.pos) / nodes.len() as f32;
        assert!((mean - center).length() < 2.0);
    }

    #[test]
    fn tick_callback_sees_every_node() {
        let mut simulation = Simulation::new(
            graph(&["a", "b"], &[("a", "b")]),
            LayoutConfig::default(),
            Vec2::ZERO,
            3,
        );
        let mut seen = 0;
        simulation.tick(|nodes| seen = nodes.len());
        assert_eq!(seen, 2);
        assert_eq!(simulation.epoch(), 3);
    }

    #[test]
    fn dragging_pins_and_reheats() {
        let mut simulation = Simulation::new(
            graph(&["a", "b", "c"], &[("a", "b")]),
            LayoutConfig::default(),
            Vec2::ZERO,
            1,
        );
        run_to_rest(&mut simulation, 1_000);
        assert!(!simulation.is_running());

        simulation.begin_drag(0);
        simulation.drag_to(0, vec2(300.0, -40.0));
        assert!(simulation.is_running());
        for _ in 0..30 {
            simulation.tick(|_| {});
        }
        assert_eq!(simulation.nodes()[0].pos, vec2(300.0, -40.0));
        assert!(simulation.alpha() > 0.1);

        simulation.end_drag(0);
        assert!(simulation.nodes()[0].drag_pin.is_none());
        assert!(simulation.dragging().is_none());
        run_to_rest(&mut simulation, 1_000);
        assert!(!simulation.is_running());
    }

    #[test]
    fn selection_pin_holds_until_selection_moves() {
        let mut simulation = Simulation::new(
            graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]),
            LayoutConfig::default(),
            Vec2::ZERO,
            1,
        );
        simulation.sync_selection_pins(Some("b"));
        let pinned_at = simulation.nodes()[1].pos;
        for _ in 0..20 {
            simulation.tick(|_| {});
        }
        assert_eq!(simulation.nodes()[1].pos, pinned_at);
        assert_eq!(simulation.pinned_by_selection.iter().copied().collect::<Vec<_>>(), vec![1]);

        simulation.sync_selection_pins(Some("c"));
        assert!(simulation.nodes()[1].selection_pin.is_none());
        assert!(simulation.nodes()[2].selection_pin.is_some());

        simulation.sync_selection_pins(None);
        assert_eq!(simulation.pinned_by_selection.len(), 0);
        assert!(simulation.nodes().iter().all(|node| node.fixed_position().is_none()));
    }

    #[test]
    fn dropping_a_selected_node_keeps_it_at_the_drop_point() {
        let mut simulation = Simulation::new(
            graph(&["a", "b"], &[("a", "b")]),
            LayoutConfig::default(),
            Vec2::ZERO,
            1,
        );
        simulation.sync_selection_pins(Some("a"));
        simulation.begin_drag(0);
        simulation.drag_to(0, vec2(50.0, 50.0));
        simulation.end_drag(0);
        assert_eq!(simulation.nodes()[0].fixed_position(), Some(vec2(50.0, 50.0)));
    }

    #[test]
    fn frame_ticks_are_bounded() {
        assert_eq!(ticks_for_frame(0.0), 1);
        assert_eq!(ticks_for_frame(1.0 / 60.0), 1);
        assert_eq!(ticks_for_frame(1.0 / 30.0), 2);
        assert_eq!(ticks_for_frame(1.0), 4);
    }
}
