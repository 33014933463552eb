use eframe::egui::{Vec2, vec2};

/// Lanes are this many world units apart.
pub(in crate::app) const DEFAULT_LANE_SPACING: f32 = 10.0;
/// Flow lines stop this far short of each node marker.
pub(in crate::app) const DEFAULT_TRIM: f32 = 12.0;

const MIN_EDGE_LENGTH: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct FlowLayoutConfig {
    pub lane_spacing: f32,
    pub trim: f32,
}

impl Default for FlowLayoutConfig {
    fn default() -> Self {
        Self {
            lane_spacing: DEFAULT_LANE_SPACING,
            trim: DEFAULT_TRIM,
        }
    }
}

impl FlowLayoutConfig {
    pub fn line(
        self,
        source: Vec2,
        target: Vec2,
        dir: FlowLineDir,
        lane_index: usize,
        lane_count: usize,
    ) -> FlowLine {
        compute_flow_line(
            source,
            target,
            dir,
            lane_index,
            lane_count,
            self.lane_spacing,
            self.trim,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(in crate::app) enum FlowLineDir {
    Forward,
    Reverse,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct FlowLine {
    pub start: Vec2,
    pub end: Vec2,
}

/// Offset and trimmed endpoints of one flow lane between `source` and
/// `target`. Reverse lanes run target to source.
pub(in crate::app) fn compute_flow_line(
    source: Vec2,
    target: Vec2,
    dir: FlowLineDir,
    lane_index: usize,
    lane_count: usize,
    lane_spacing: f32,
    trim: f32,
) -> FlowLine {
    let delta = target - source;
    let length = delta.length();
    let length = if length.is_finite() {
        length.max(MIN_EDGE_LENGTH)
    } else {
        MIN_EDGE_LENGTH
    };

    let normal = vec2(-delta.y, delta.x) / length;
    let lane_count = lane_count.max(1);
    let offset = (lane_index as f32 - (lane_count as f32 - 1.0) / 2.0) * lane_spacing;
    let lane_shift = normal * offset;
    let trim_shift = delta / length * trim;

    let start = source + trim_shift + lane_shift;
    let end = target - trim_shift + lane_shift;

    match dir {
        FlowLineDir::Forward => FlowLine { start, end },
        FlowLineDir::Reverse => FlowLine {
            start: end,
            end: start,
        },
    }
}
