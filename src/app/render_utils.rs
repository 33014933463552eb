use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2};

use super::viewport::ViewTransform;

/// Observable 10 categorical scheme.
pub(super) const OBSERVABLE10: [Color32; 10] = [
    Color32::from_rgb(0x42, 0x69, 0xd0),
    Color32::from_rgb(0xef, 0xb1, 0x18),
    Color32::from_rgb(0xff, 0x72, 0x5c),
    Color32::from_rgb(0x6c, 0xc5, 0xb0),
    Color32::from_rgb(0x3c, 0xa9, 0x51),
    Color32::from_rgb(0xff, 0x8a, 0xb7),
    Color32::from_rgb(0xa4, 0x63, 0xf2),
    Color32::from_rgb(0x97, 0xbb, 0xf5),
    Color32::from_rgb(0x9c, 0x6b, 0x4e),
    Color32::from_rgb(0x94, 0x98, 0xa0),
];

pub(super) const ACCENT_COLOR: Color32 = Color32::from_rgb(94, 162, 255);
pub(super) const SUCCESS_COLOR: Color32 = Color32::from_rgb(72, 199, 142);
pub(super) const FLOW_OUTGOING_COLOR: Color32 = ACCENT_COLOR;
pub(super) const FLOW_INCOMING_COLOR: Color32 = SUCCESS_COLOR;
pub(super) const EDGE_COLOR: Color32 = Color32::from_rgba_premultiplied(58, 62, 70, 150);
pub(super) const MUTED_EDGE_COLOR: Color32 = Color32::from_rgb(52, 58, 66);
pub(super) const NODE_STROKE_COLOR: Color32 = Color32::from_rgb(22, 24, 28);
pub(super) const DIM_NODE_FILL: Color32 = Color32::from_rgb(70, 76, 86);
pub(super) const LABEL_COLOR: Color32 = Color32::from_gray(226);
pub(super) const LABEL_HALO_COLOR: Color32 = Color32::from_rgba_premultiplied(14, 17, 22, 235);

const GRID_STEP: f32 = 28.0;

/// Ordinal color scale: the first distinct key gets the first palette entry,
/// and so on, wrapping after ten.
#[derive(Clone, Debug, Default)]
pub(super) struct OrdinalColors {
    domain: Vec<String>,
}

impl OrdinalColors {
    pub fn color(&mut self, key: &str) -> Color32 {
        let key = if key.trim().is_empty() { "default" } else { key };
        let index = match self.domain.iter().position(|known| known == key) {
            Some(index) => index,
            None => {
                self.domain.push(key.to_owned());
                self.domain.len() - 1
            }
        };
        OBSERVABLE10[index % OBSERVABLE10.len()]
    }
}

/// Scales a color's alpha by `opacity`.
pub(super) fn with_opacity(color: Color32, opacity: f32) -> Color32 {
    color.gamma_multiply(opacity.clamp(0.0, 1.0))
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, transform: ViewTransform) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = GRID_STEP * transform.k.clamp(0.6, 1.8);
    let origin = rect.min + Vec2::new(transform.x, transform.y);
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 60));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let min_x = start.x.min(end.x) - padding;
    let max_x = start.x.max(end.x) + padding;
    let min_y = start.y.min(end.y) - padding;
    let max_y = start.y.max(end.y) + padding;

    !(max_x < rect.left() || min_x > rect.right() || max_y < rect.top() || min_y > rect.bottom())
}

/// Shortest distance from `point` to the segment `start..end`.
pub(super) fn distance_to_segment(point: Pos2, start: Pos2, end: Pos2) -> f32 {
    let segment = end - start;
    let length_sq = segment.length_sq();
    if length_sq <= f32::EPSILON {
        return point.distance(start);
    }

    let t = ((point - start).dot(segment) / length_sq).clamp(0.0, 1.0);
    point.distance(start + segment * t)
}

/// Label halo stroke width for zoom scale `k`.
pub(super) fn halo_width(k: f32) -> f32 {
    (3.6 / k.max(0.6)).max(1.2)
}

#[cfg(test)]
mod tests {
    use eframe::egui::pos2;

    use super::*;

    #[test]
    fn ordinal_colors_assign_in_first_seen_order() {
        let mut colors = OrdinalColors::default();
        assert_eq!(colors.color("system"), OBSERVABLE10[0]);
        assert_eq!(colors.color("service"), OBSERVABLE10[1]);
        assert_eq!(colors.color("system"), OBSERVABLE10[0]);
        assert_eq!(colors.color(""), OBSERVABLE10[2]);
        assert_eq!(colors.color("default"), OBSERVABLE10[2]);
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let start = pos2(0.0, 0.0);
        let end = pos2(10.0, 0.0);
        assert_eq!(distance_to_segment(pos2(5.0, 3.0), start, end), 3.0);
        assert_eq!(distance_to_segment(pos2(-4.0, 3.0), start, end), 5.0);
        assert_eq!(distance_to_segment(pos2(2.0, 2.0), start, start), 8.0_f32.sqrt());
    }

    #[test]
    fn halo_width_shrinks_with_zoom() {
        assert!((halo_width(0.1) - 6.0).abs() < 1e-4);
        assert_eq!(halo_width(1.0), 3.6);
        assert_eq!(halo_width(6.0), 1.2);
    }

    #[test]
    fn edges_outside_the_viewport_are_culled() {
        let rect = Rect::from_min_max(pos2(0.0, 0.0), pos2(100.0, 100.0));
        assert!(edge_visible(rect, pos2(-10.0, 50.0), pos2(110.0, 50.0), 0.0));
        assert!(!edge_visible(rect, pos2(200.0, 0.0), pos2(300.0, 10.0), 2.0));
        assert!(circle_visible(rect, pos2(-3.0, 50.0), 5.0));
    }
}
