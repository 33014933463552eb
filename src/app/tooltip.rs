use eframe::egui::{Vec2, vec2};

use super::flow::{FlowLineDir, RenderFlow};

const POINTER_OFFSET: Vec2 = vec2(14.0, 14.0);
const EDGE_MARGIN: f32 = 10.0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct FlowTooltip {
    pub title: String,
    pub lines: Vec<String>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

impl FlowTooltip {
    pub fn for_flow(render: &RenderFlow) -> Self {
        let flow = &render.flow;
        let flow_type = non_empty(Some(&flow.flow_type)).unwrap_or("Flow");
        let title = if render.is_review {
            format!("Proposal: {flow_type}")
        } else {
            flow_type.to_owned()
        };

        let mut lines = vec![
            if render.is_review {
                "Status: Proposal (needs review)".to_owned()
            } else {
                "Status: Published".to_owned()
            },
            format!("Category: {}", render.category_name),
            match render.dir {
                FlowLineDir::Reverse => "Direction: Incoming".to_owned(),
                FlowLineDir::Forward => "Direction: Outgoing".to_owned(),
            },
        ];
        if let Some(raw) = non_empty(flow.direction.as_deref()) {
            lines.push(format!("Direction (raw): {raw}"));
        }
        if let Some(protocol) = non_empty(flow.protocol.as_deref()) {
            lines.push(format!("Protocol: {protocol}"));
        }
        if let Some(frequency) = non_empty(flow.frequency.as_deref()) {
            lines.push(format!("Frequency: {frequency}"));
        }
        if let Some(note) = non_empty(flow.note.as_deref()) {
            lines.push(format!("Note: {note}"));
        }

        Self { title, lines }
    }
}

/// Container-relative tooltip origin for a container-relative pointer.
pub(super) fn tooltip_position(pointer: Vec2, container: Vec2) -> Vec2 {
    let wanted = pointer + POINTER_OFFSET;
    let max = (container - vec2(EDGE_MARGIN, EDGE_MARGIN)).max(vec2(EDGE_MARGIN, EDGE_MARGIN));
    wanted.clamp(vec2(EDGE_MARGIN, EDGE_MARGIN), max)
}

#[cfg(test)]
mod tests {
    use eframe::egui::Color32;

    use super::*;
    use crate::app::flow::{DashPattern, FlowFreqClass};
    use crate::model::Flow;

    fn render(flow: Flow, dir: FlowLineDir, is_review: bool) -> RenderFlow {
        RenderFlow {
            id: "e1:f1:forward:t".to_owned(),
            edge_id: "e1".to_owned(),
            link_index: 0,
            flow,
            dir,
            lane_index: 0,
            lane_count: 1,
            category_id: "__none__".to_owned(),
            category_name: "Uncategorized".to_owned(),
            stroke: Color32::WHITE,
            dash: DashPattern::FLOW,
            dash_offset: 0.0,
            freq_class: FlowFreqClass::Unknown,
            is_review,
        }
    }

    #[test]
    fn published_flow_lines() {
        let flow = Flow {
            flow_type: "API".to_owned(),
            direction: Some("source_to_target".to_owned()),
            protocol: Some("HTTPS".to_owned()),
            frequency: Some(" ".to_owned()),
            ..Flow::default()
        };
        let tooltip = FlowTooltip::for_flow(&render(flow, FlowLineDir::Forward, false));
        assert_eq!(tooltip.title, "API");
        assert_eq!(
            tooltip.lines,
            [
                "Status: Published",
                "Category: Uncategorized",
                "Direction: Outgoing",
                "Direction (raw): source_to_target",
                "Protocol: HTTPS",
            ]
        );
    }

    #[test]
    fn proposal_without_type() {
        let flow = Flow {
            note: Some("pending".to_owned()),
            ..Flow::default()
        };
        let tooltip = FlowTooltip::for_flow(&render(flow, FlowLineDir::Reverse, true));
        assert_eq!(tooltip.title, "Proposal: Flow");
        assert_eq!(tooltip.lines[0], "Status: Proposal (needs review)");
        assert_eq!(tooltip.lines[2], "Direction: Incoming");
        assert_eq!(tooltip.lines.last().map(String::as_str), Some("Note: pending"));
    }

    #[test]
    fn position_is_offset_and_clamped() {
        let size = vec2(400.0, 300.0);
        assert_eq!(tooltip_position(vec2(100.0, 50.0), size), vec2(114.0, 64.0));
        assert_eq!(tooltip_position(vec2(395.0, 299.0), size), vec2(390.0, 290.0));
        assert_eq!(tooltip_position(vec2(-50.0, -50.0), size), vec2(10.0, 10.0));
    }
}
