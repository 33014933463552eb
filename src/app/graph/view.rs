use eframe::egui::{
    self, Align2, Color32, FontId, Painter, Pos2, Rect, Sense, Shape, Stroke, Ui, Vec2, vec2,
};

use super::super::flow::{DASH_TRAVEL_PER_PERIOD, RenderFlow};
use super::super::render_utils::{
    LABEL_COLOR, LABEL_HALO_COLOR, circle_visible, draw_background, edge_visible, halo_width,
    with_opacity,
};
use super::super::tooltip::{FlowTooltip, tooltip_position};
use super::{GraphEvent, GraphView};

const LABEL_OFFSET: Vec2 = vec2(10.0, 2.0);
const LABEL_LIFT: f32 = 10.0;
const LABEL_FONT_SIZE: f32 = 12.0;
/// Labels smaller than this on screen are not drawn.
const MIN_LABEL_SCREEN_SIZE: f32 = 5.0;
const TOOLTIP_MAX_WIDTH: f32 = 320.0;

/// Dash phase for `flow` at time `now`, in screen units within one cycle.
pub(super) fn dash_phase(flow: &RenderFlow, now: f64) -> f32 {
    let cycle = flow.dash.cycle_length();
    if cycle <= 0.0 {
        return 0.0;
    }
    let period = f64::from(flow.period_secs().max(0.01));
    let travelled = ((now / period).fract() as f32) * DASH_TRAVEL_PER_PERIOD;
    (travelled + flow.dash_offset).rem_euclid(cycle)
}

/// Dashed line whose pattern starts `phase` units in, including the partial
/// dash that wraps around to the start.
fn dashed_line(start: Pos2, end: Pos2, stroke: Stroke, dash: f32, gap: f32, phase: f32) -> Vec<Shape> {
    let mut shapes = Vec::new();
    let length = start.distance(end);
    if length <= f32::EPSILON {
        return shapes;
    }

    // The pattern starts at `phase`, so the tail of the previous dash covers
    // the first `phase - gap` units.
    let tail = phase - gap;
    if tail > 0.0 {
        let direction = (end - start) / length;
        shapes.push(Shape::line_segment(
            [start, start + direction * tail.min(length)],
            stroke,
        ));
    }
    shapes.extend(Shape::dashed_line_with_offset(
        &[start, end],
        stroke,
        &[dash],
        &[gap],
        phase,
    ));
    shapes
}

impl GraphView {
    /// Allocates the canvas, runs interaction, the simulation and the camera,
    /// then paints. Returns whether another frame is needed soon.
    pub(in crate::app) fn show(&mut self, ui: &mut Ui, events: &mut Vec<GraphEvent>) -> bool {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        self.set_size(rect.size());

        let (now, delta) = ui.input(|input| (input.time, input.stable_dt));

        self.handle_zoom(ui, rect, &response);
        self.handle_drag(ui, rect, &response);
        self.handle_click(ui, rect, &response, events);

        let stepped = self.advance_simulation(delta.clamp(1.0 / 240.0, 1.0 / 20.0));
        self.viewport.advance(now);
        self.update_hover(ui, rect, &response);

        let painter = ui.painter_at(rect);
        draw_background(&painter, rect, self.viewport.transform);
        self.paint_links(&painter, rect);
        self.paint_flows(&painter, rect, now);
        self.paint_nodes(&painter, rect);
        self.paint_labels(&painter, rect);
        self.show_flow_tooltip(ui, rect);

        stepped
            || self.viewport.is_animating()
            || self.simulation.is_running()
            || self.simulation.dragging().is_some()
            || !self.registry.flows.is_empty()
    }

    fn paint_links(&self, painter: &Painter, rect: Rect) {
        let transform = self.viewport.transform;
        let nodes = self.simulation.nodes();
        for (_, visual) in self.registry.links.iter() {
            let Some(link) = self.simulation.graph().links.get(visual.index) else {
                continue;
            };
            let (Some(source), Some(target)) = (nodes.get(link.source), nodes.get(link.target))
            else {
                continue;
            };
            let start = transform.to_screen(rect, source.pos);
            let end = transform.to_screen(rect, target.pos);
            if !edge_visible(rect, start, end, visual.width) {
                continue;
            }
            painter.line_segment(
                [start, end],
                Stroke::new(visual.width, with_opacity(visual.color, visual.filter_opacity)),
            );
        }
    }

    fn paint_flows(&self, painter: &Painter, rect: Rect, now: f64) {
        let transform = self.viewport.transform;
        let nodes = self.simulation.nodes();
        let links = &self.simulation.graph().links;

        for (_, visual) in self.registry.flows.iter() {
            let Some(flow) = self.render_flows.get(visual.position) else {
                continue;
            };
            let Some(link) = links.get(flow.link_index) else {
                continue;
            };
            let (Some(source), Some(target)) = (nodes.get(link.source), nodes.get(link.target))
            else {
                continue;
            };

            let line = self.flow_layout.line(
                source.pos,
                target.pos,
                flow.dir,
                flow.lane_index,
                flow.lane_count,
            );
            let start = transform.to_screen(rect, line.start);
            let end = transform.to_screen(rect, line.end);
            if !edge_visible(rect, start, end, flow.stroke_width()) {
                continue;
            }

            let color = with_opacity(flow.stroke, flow.stroke_opacity() * visual.filter_opacity);
            let stroke = Stroke::new(flow.stroke_width(), color);
            painter.extend(dashed_line(
                start,
                end,
                stroke,
                flow.dash.dash,
                flow.dash.gap,
                dash_phase(flow, now),
            ));
        }
    }

    fn paint_nodes(&self, painter: &Painter, rect: Rect) {
        let transform = self.viewport.transform;
        let nodes = self.simulation.nodes();
        for (_, visual) in self.registry.nodes.iter() {
            let Some(node) = nodes.get(visual.index) else {
                continue;
            };
            let center = transform.to_screen(rect, node.pos);
            let radius = visual.radius * transform.k;
            if !center.x.is_finite() || !center.y.is_finite() || !circle_visible(rect, center, radius) {
                continue;
            }

            let opacity = visual.opacity();
            painter.circle(
                center,
                radius,
                with_opacity(visual.effective_fill(), opacity),
                Stroke::new(
                    visual.stroke_width * transform.k,
                    with_opacity(visual.stroke_color, opacity),
                ),
            );
        }
    }

    fn paint_labels(&self, painter: &Painter, rect: Rect) {
        let transform = self.viewport.transform;
        let font_size = LABEL_FONT_SIZE * transform.k;
        if font_size < MIN_LABEL_SCREEN_SIZE {
            return;
        }
        let font = FontId::proportional(font_size);
        let halo = halo_width(transform.k) * transform.k * 0.5;
        let halo_offsets = [vec2(-halo, 0.0), vec2(halo, 0.0), vec2(0.0, -halo), vec2(0.0, halo)];

        let nodes = self.simulation.nodes();
        for (_, visual) in self.registry.nodes.iter() {
            let Some(node) = nodes.get(visual.index) else {
                continue;
            };
            if visual.label.is_empty() {
                continue;
            }
            let anchor = transform.to_screen(
                rect,
                node.pos + LABEL_OFFSET - vec2(0.0, LABEL_LIFT),
            );
            if !rect.expand(200.0).contains(anchor) {
                continue;
            }

            let opacity = visual.label_opacity();
            let halo_color = with_opacity(LABEL_HALO_COLOR, opacity);
            for offset in halo_offsets {
                painter.text(
                    anchor + offset,
                    Align2::LEFT_BOTTOM,
                    &visual.label,
                    font.clone(),
                    halo_color,
                );
            }
            painter.text(
                anchor,
                Align2::LEFT_BOTTOM,
                &visual.label,
                font.clone(),
                with_opacity(LABEL_COLOR, opacity),
            );
        }
    }

    fn show_flow_tooltip(&self, ui: &Ui, rect: Rect) {
        let (Some(position), Some(pointer)) = (self.pointer.hovered_flow, self.pointer.hover_pos)
        else {
            return;
        };
        let Some(flow) = self.render_flows.get(position) else {
            return;
        };

        let tooltip = FlowTooltip::for_flow(flow);
        let origin = rect.min + tooltip_position(pointer - rect.min, rect.size());
        egui::Area::new(ui.id().with("flow-tooltip"))
            .order(egui::Order::Tooltip)
            .fixed_pos(origin)
            .interactable(false)
            .show(ui.ctx(), |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_max_width(TOOLTIP_MAX_WIDTH);
                    ui.label(
                        egui::RichText::new(&tooltip.title)
                            .strong()
                            .color(flow.stroke),
                    );
                    for line in &tooltip.lines {
                        ui.label(egui::RichText::new(line).small().color(Color32::from_gray(210)));
                    }
                });
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::flow::{DashPattern, FlowFreqClass, FlowLineDir};
    use crate::model::Flow;

    fn flow(freq_class: FlowFreqClass, dash_offset: f32) -> RenderFlow {
        RenderFlow {
            id: "e:f:forward:t".to_owned(),
            edge_id: "e".to_owned(),
            link_index: 0,
            flow: Flow::default(),
            dir: FlowLineDir::Forward,
            lane_index: 0,
            lane_count: 1,
            category_id: "__none__".to_owned(),
            category_name: "Uncategorized".to_owned(),
            stroke: Color32::WHITE,
            dash: DashPattern::FLOW,
            dash_offset,
            freq_class,
            is_review: false,
        }
    }

    #[test]
    fn dash_phase_travels_and_wraps() {
        let continuous = flow(FlowFreqClass::Continuous, 0.0);
        assert_eq!(dash_phase(&continuous, 0.0), 0.0);
        // A full period travels a whole number of cycles.
        assert!(dash_phase(&continuous, 1.05) < 1e-3 || dash_phase(&continuous, 1.05) > 13.99);

        let quarter = dash_phase(&continuous, 1.05 / 8.0);
        assert!((quarter - 7.0).abs() < 1e-3);
    }

    #[test]
    fn reverse_half_of_a_bidirectional_flow_is_half_a_cycle_apart() {
        let forward = flow(FlowFreqClass::Batch, 0.0);
        let reverse = flow(FlowFreqClass::Batch, DashPattern::FLOW.half_cycle());
        for now in [0.0, 0.3, 1.7] {
            let delta = (dash_phase(&reverse, now) - dash_phase(&forward, now)).rem_euclid(14.0);
            assert!((delta - 7.0).abs() < 1e-3);
        }
    }

    #[test]
    fn dashed_line_fills_the_wrapped_tail() {
        let stroke = Stroke::new(1.0, Color32::WHITE);
        let plain = dashed_line(Pos2::ZERO, Pos2::new(100.0, 0.0), stroke, 8.0, 6.0, 0.0);
        let shifted = dashed_line(Pos2::ZERO, Pos2::new(100.0, 0.0), stroke, 8.0, 6.0, 10.0);
        assert!(!plain.is_empty());
        let Some(Shape::LineSegment { points, .. }) = shifted.first() else {
            panic!("expected a leading tail segment");
        };
        assert_eq!(points[0], Pos2::ZERO);
        assert_eq!(points[1], Pos2::new(4.0, 0.0));
        assert!(dashed_line(Pos2::ZERO, Pos2::ZERO, stroke, 8.0, 6.0, 3.0).is_empty());
    }
}
