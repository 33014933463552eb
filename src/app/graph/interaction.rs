use eframe::egui::{self, Pos2, Rect, Response, Ui};

use super::super::render_utils::distance_to_segment;
use super::super::selection::ClickModifiers;
use super::{FLOW_HIT_WIDTH, GraphEvent, GraphView, LINK_HIT_WIDTH};

/// Smallest on-screen node hit radius, so tiny zoom levels stay clickable.
const MIN_NODE_HIT_RADIUS: f32 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum Hit {
    Node(usize),
    /// Position in the current render flow list.
    Flow(usize),
    Link(usize),
    Background,
}

#[derive(Clone, Copy, Debug, Default)]
pub(super) struct PointerState {
    pub hovered_flow: Option<usize>,
    pub hover_pos: Option<Pos2>,
    pub dragging_node: Option<usize>,
    pub panning: bool,
}

fn nearest<T: Copy>(candidates: impl Iterator<Item = (T, f32)>) -> Option<T> {
    candidates
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(item, _)| item)
}

impl GraphView {
    /// What sits under `pointer`. Nodes win over flows, flows over links.
    pub(in crate::app) fn hit_test(&self, rect: Rect, pointer: Pos2) -> Hit {
        let transform = self.viewport.transform;
        let nodes = self.simulation.nodes();

        let node_hit = nearest(self.registry.nodes.iter().filter_map(|(_, visual)| {
            let node = nodes.get(visual.index)?;
            let center = transform.to_screen(rect, node.pos);
            let radius = ((visual.radius + visual.stroke_width * 0.5) * transform.k)
                .max(MIN_NODE_HIT_RADIUS);
            let distance = center.distance(pointer);
            (distance <= radius).then_some((visual.index, distance))
        }));
        if let Some(index) = node_hit {
            return Hit::Node(index);
        }

        let links = &self.simulation.graph().links;
        let flow_hit = nearest(self.render_flows.iter().enumerate().filter_map(|(position, flow)| {
            let link = links.get(flow.link_index)?;
            let line = self.flow_layout.line(
                nodes.get(link.source)?.pos,
                nodes.get(link.target)?.pos,
                flow.dir,
                flow.lane_index,
                flow.lane_count,
            );
            let distance = distance_to_segment(
                pointer,
                transform.to_screen(rect, line.start),
                transform.to_screen(rect, line.end),
            );
            (distance <= FLOW_HIT_WIDTH * 0.5).then_some((position, distance))
        }));
        if let Some(position) = flow_hit {
            return Hit::Flow(position);
        }

        let link_hit = nearest(self.registry.links.iter().filter_map(|(_, visual)| {
            let link = links.get(visual.index)?;
            let distance = distance_to_segment(
                pointer,
                transform.to_screen(rect, nodes.get(link.source)?.pos),
                transform.to_screen(rect, nodes.get(link.target)?.pos),
            );
            (distance <= LINK_HIT_WIDTH * 0.5).then_some((visual.index, distance))
        }));
        link_hit.map_or(Hit::Background, Hit::Link)
    }

    pub(in crate::app) fn handle_zoom(&mut self, ui: &Ui, rect: Rect, response: &Response) {
        if !response.hovered() {
            return;
        }

        let (scroll, pinch) = ui.input(|input| (input.raw_scroll_delta.y, input.zoom_delta()));
        let wheel_factor = if scroll.abs() > f32::EPSILON {
            (1.0 + scroll * 0.0018).clamp(0.85, 1.15)
        } else {
            1.0
        };
        let factor = wheel_factor * pinch;
        if (factor - 1.0).abs() <= f32::EPSILON {
            return;
        }

        let anchor = response
            .hover_pos()
            .unwrap_or_else(|| rect.center());
        self.viewport.zoom_at(anchor - rect.min, factor);
    }

    /// Node drags move the node's pin; drags that start elsewhere pan.
    pub(in crate::app) fn handle_drag(&mut self, ui: &Ui, rect: Rect, response: &Response) {
        if response.drag_started_by(egui::PointerButton::Primary) {
            let origin = ui
                .input(|input| input.pointer.press_origin())
                .or_else(|| response.interact_pointer_pos());
            match origin.map(|pointer| self.hit_test(rect, pointer)) {
                Some(Hit::Node(index)) => {
                    self.simulation.begin_drag(index);
                    self.pointer.dragging_node = Some(index);
                }
                _ => self.pointer.panning = true,
            }
        }

        if let Some(index) = self.pointer.dragging_node {
            if let Some(pointer) = response.interact_pointer_pos() {
                let world = self.viewport.transform.to_world(rect, pointer);
                self.simulation.drag_to(index, world);
            }
        } else if (self.pointer.panning && response.dragged_by(egui::PointerButton::Primary))
            || response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.viewport.pan_by(response.drag_delta());
        }

        if response.drag_stopped() {
            if let Some(index) = self.pointer.dragging_node.take() {
                self.simulation.end_drag(index);
            }
            self.pointer.panning = false;
        }
    }

    pub(in crate::app) fn handle_click(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &Response,
        events: &mut Vec<GraphEvent>,
    ) {
        if !response.clicked_by(egui::PointerButton::Primary) {
            return;
        }
        let Some(pointer) = response.interact_pointer_pos() else {
            return;
        };

        match self.hit_test(rect, pointer) {
            Hit::Node(index) => {
                if let Some(node) = self.simulation.nodes().get(index) {
                    let modifiers = ClickModifiers::from_egui(ui.input(|input| input.modifiers));
                    events.push(GraphEvent::SelectNode {
                        id: node.id.clone(),
                        modifiers,
                    });
                }
            }
            Hit::Link(index) => {
                if let Some(link) = self.simulation.graph().links.get(index) {
                    events.push(GraphEvent::SelectEdge(link.id.clone()));
                }
            }
            Hit::Flow(_) => {}
            Hit::Background => events.push(GraphEvent::ClearSelection),
        }
    }

    pub(in crate::app) fn update_hover(&mut self, ui: &Ui, rect: Rect, response: &Response) {
        self.pointer.hover_pos = response.hover_pos();
        let hit = self
            .pointer
            .hover_pos
            .filter(|_| self.pointer.dragging_node.is_none())
            .map(|pointer| self.hit_test(rect, pointer));

        self.pointer.hovered_flow = match hit {
            Some(Hit::Flow(position)) => Some(position),
            _ => None,
        };

        let cursor = match hit {
            Some(Hit::Node(_) | Hit::Link(_)) => Some(egui::CursorIcon::PointingHand),
            Some(Hit::Flow(_)) => Some(egui::CursorIcon::Help),
            _ if self.pointer.dragging_node.is_some() => Some(egui::CursorIcon::Grabbing),
            _ => None,
        };
        if let Some(cursor) = cursor {
            ui.output_mut(|output| output.cursor_icon = cursor);
        }
    }
}
