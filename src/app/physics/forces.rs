use eframe::egui::{Vec2, vec2};

use super::super::graph::{SimLink, SimNode};
use super::quadtree::QuadNode;

/// Tiny deterministic nudge for exactly coincident points.
fn jiggle(seed: usize) -> f32 {
    let phase = ((seed as f32) * 0.618_034 + 0.37).fract();
    (phase - 0.5) * 1e-6
}

fn nonzero_delta(delta: Vec2, seed: usize) -> Vec2 {
    vec2(
        if delta.x == 0.0 { jiggle(seed) } else { delta.x },
        if delta.y == 0.0 { jiggle(seed + 1) } else { delta.y },
    )
}

/// Per-link spring stiffness and how the correction is split between the two
/// endpoints, both derived from endpoint degree.
pub(super) struct LinkCoefficients {
    pub(super) strengths: Vec<f32>,
    pub(super) biases: Vec<f32>,
}

impl LinkCoefficients {
    pub(super) fn new(node_count: usize, links: &[SimLink]) -> Self {
        let mut degree = vec![0usize; node_count];
        for link in links {
            degree[link.source] += 1;
            degree[link.target] += 1;
        }

        let strengths = links
            .iter()
            .map(|link| 1.0 / degree[link.source].min(degree[link.target]).max(1) as f32)
            .collect();
        let biases = links
            .iter()
            .map(|link| {
                let source = degree[link.source] as f32;
                let target = degree[link.target] as f32;
                source / (source + target).max(1.0)
            })
            .collect();

        Self { strengths, biases }
    }
}

pub(super) fn apply_link_springs(
    nodes: &mut [SimNode],
    links: &[SimLink],
    coefficients: &LinkCoefficients,
    distance: f32,
    alpha: f32,
) {
    for (index, link) in links.iter().enumerate() {
        let (source, target) = (link.source, link.target);
        if source == target {
            continue;
        }

        let predicted_source = nodes[source].pos + nodes[source].velocity;
        let predicted_target = nodes[target].pos + nodes[target].velocity;
        let delta = nonzero_delta(predicted_target - predicted_source, index);
        let length = delta.length();
        let scale = (length - distance) / length * alpha * coefficients.strengths[index];
        let correction = delta * scale;
        let bias = coefficients.biases[index];

        nodes[target].velocity -= correction * bias;
        nodes[source].velocity += correction * (1.0 - bias);
    }
}

/// Barnes-Hut accumulation of the many-body force on one node. `strength` is
/// negative for repulsion.
pub(super) fn accumulate_charge_for_node(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    strength: f32,
    theta: f32,
    alpha: f32,
    velocity: &mut Vec2,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other_index in &node.indices {
            if other_index == index {
                continue;
            }
            let delta = nonzero_delta(positions[other_index] - point, index + other_index);
            let mut distance_sq = delta.length_sq();
            if distance_sq < 1.0 {
                distance_sq = distance_sq.sqrt();
            }
            *velocity += delta * (strength * alpha / distance_sq);
        }
        return;
    }

    let delta = node.center_of_mass - point;
    let distance_sq = delta.length_sq().max(1.0);
    let can_approximate = !node.bounds.contains(point)
        && (node.bounds.side_length() * node.bounds.side_length()) / (theta * theta)
            < distance_sq;

    if can_approximate {
        *velocity += delta * (strength * node.mass * alpha / distance_sq);
        return;
    }

    for child in node.children.iter().flatten() {
        accumulate_charge_for_node(child, index, positions, strength, theta, alpha, velocity);
    }
}

/// Shifts every node so the mean position lands on `center`.
pub(super) fn apply_centering(nodes: &mut [SimNode], center: Vec2) {
    if nodes.is_empty() {
        return;
    }

    let mut mean = Vec2::ZERO;
    for node in nodes.iter() {
        mean += node.pos;
    }
    mean /= nodes.len() as f32;

    let shift = mean - center;
    if !shift.x.is_finite() || !shift.y.is_finite() {
        return;
    }
    for node in nodes.iter_mut() {
        node.pos -= shift;
    }
}

#[derive(Clone, Copy)]
pub(super) struct CollisionParams {
    pub(super) radius: f32,
    pub(super) strength: f32,
}

impl CollisionParams {
    fn contact_distance(self) -> f32 {
        self.radius * 2.0
    }
}

fn resolve_pair(from: usize, to: usize, predicted: &[Vec2], params: CollisionParams, deltas: &mut [Vec2]) {
    let contact = params.contact_distance();
    let delta = nonzero_delta(predicted[from] - predicted[to], from + to);
    let distance_sq = delta.length_sq();
    if distance_sq >= contact * contact {
        return;
    }

    let distance = distance_sq.sqrt();
    let push = delta * ((contact - distance) / distance * params.strength);
    deltas[from] += push * 0.5;
    deltas[to] -= push * 0.5;
}

/// Dual-tree traversal over predicted positions; only cells closer than the
/// contact distance are compared pairwise.
pub(super) fn accumulate_collision_pairs(
    node_a: &QuadNode,
    node_b: &QuadNode,
    same_node: bool,
    predicted: &[Vec2],
    params: CollisionParams,
    deltas: &mut [Vec2],
) {
    let contact = params.contact_distance();
    if node_a.bounds.distance_sq_to(node_b.bounds) > contact * contact {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        if same_node {
            for (position, &from) in node_a.indices.iter().enumerate() {
                for &to in &node_a.indices[position + 1..] {
                    resolve_pair(from, to, predicted, params, deltas);
                }
            }
        } else {
            for &from in &node_a.indices {
                for &to in &node_b.indices {
                    resolve_pair(from, to, predicted, params, deltas);
                }
            }
        }
        return;
    }

    if same_node {
        for first in 0..4 {
            let Some(child_a) = node_a.children[first].as_ref() else {
                continue;
            };

            accumulate_collision_pairs(child_a, child_a, true, predicted, params, deltas);

            for second in (first + 1)..4 {
                let Some(child_b) = node_a.children[second].as_ref() else {
                    continue;
                };
                accumulate_collision_pairs(child_a, child_b, false, predicted, params, deltas);
            }
        }
        return;
    }

    let split_a = if node_a.is_leaf() {
        false
    } else if node_b.is_leaf() {
        true
    } else {
        node_a.bounds.half_extent >= node_b.bounds.half_extent
    };

    if split_a {
        for child in node_a.children.iter().flatten() {
            accumulate_collision_pairs(child, node_b, false, predicted, params, deltas);
        }
    } else {
        for child in node_b.children.iter().flatten() {
            accumulate_collision_pairs(node_a, child, false, predicted, params, deltas);
        }
    }
}
