//! Pan/zoom transform and the "frame these nodes" camera command.

use eframe::egui::{Pos2, Rect, Vec2, vec2};
use tracing::trace;

use super::graph::SimNode;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct ViewportConfig {
    pub min_scale: f32,
    pub max_scale: f32,
    pub fit_padding: f32,
    pub fit_fill: f32,
    pub fit_duration_secs: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 6.0,
            fit_padding: 420.0,
            fit_fill: 0.92,
            fit_duration_secs: 0.26,
        }
    }
}

/// Strength used when framing a node picked from the command palette.
pub(in crate::app) const PALETTE_FRAME_STRENGTH: f32 = 0.18;

/// `screen = world * k + (x, y)`, relative to the graph container.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct ViewTransform {
    pub x: f32,
    pub y: f32,
    pub k: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ViewTransform {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        k: 1.0,
    };

    pub fn apply(self, world: Vec2) -> Vec2 {
        world * self.k + vec2(self.x, self.y)
    }

    pub fn invert(self, local: Vec2) -> Vec2 {
        (local - vec2(self.x, self.y)) / self.k
    }

    pub fn to_screen(self, rect: Rect, world: Vec2) -> Pos2 {
        rect.min + self.apply(world)
    }

    pub fn to_world(self, rect: Rect, screen: Pos2) -> Vec2 {
        self.invert(screen - rect.min)
    }

    fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            k: self.k + (other.k - self.k) * t,
        }
    }
}

fn ease_cubic_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0) * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

#[derive(Clone, Copy, Debug)]
struct CameraAnimation {
    from: ViewTransform,
    to: ViewTransform,
    started_at: f64,
    duration_secs: f32,
}

#[derive(Clone, Debug, Default)]
pub(in crate::app) struct Viewport {
    pub transform: ViewTransform,
    pub config: ViewportConfig,
    animation: Option<CameraAnimation>,
}

impl Viewport {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            transform: ViewTransform::IDENTITY,
            config,
            animation: None,
        }
    }

    pub fn scale(&self) -> f32 {
        self.transform.k
    }

    /// Zooms by `factor` keeping the container-relative `anchor` fixed.
    pub fn zoom_at(&mut self, anchor: Vec2, factor: f32) {
        self.animation = None;
        let world = self.transform.invert(anchor);
        let k = (self.transform.k * factor).clamp(self.config.min_scale, self.config.max_scale);
        self.transform = ViewTransform {
            x: anchor.x - world.x * k,
            y: anchor.y - world.y * k,
            k,
        };
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.animation = None;
        self.transform.x += delta.x;
        self.transform.y += delta.y;
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Transform that centers the bounding box of `points` in a viewport of
    /// `size`. `None` when no point is finite or the viewport is empty.
    pub fn fit_transform(
        &self,
        points: impl IntoIterator<Item = Vec2>,
        size: Vec2,
        strength: f32,
    ) -> Option<ViewTransform> {
        if size.x <= 0.0 || size.y <= 0.0 {
            return None;
        }

        let mut min = vec2(f32::INFINITY, f32::INFINITY);
        let mut max = vec2(f32::NEG_INFINITY, f32::NEG_INFINITY);
        let mut any = false;
        for point in points {
            if !point.x.is_finite() || !point.y.is_finite() {
                continue;
            }
            any = true;
            min = min.min(point);
            max = max.max(point);
        }
        if !any {
            return None;
        }

        let dx = (max.x - min.x).max(1.0);
        let dy = (max.y - min.y).max(1.0);
        let room_x = (size.x - self.config.fit_padding).max(1.0);
        let room_y = (size.y - self.config.fit_padding).max(1.0);

        let raw = self.config.fit_fill / (dx / room_x).max(dy / room_y);
        let k = (raw * strength).clamp(self.config.min_scale, self.config.max_scale);
        let center = (min + max) * 0.5;

        Some(ViewTransform {
            x: size.x / 2.0 - k * center.x,
            y: size.y / 2.0 - k * center.y,
            k,
        })
    }

    /// Animates toward the live positions of `node_ids`. No-op when none of
    /// them resolve to a finite position.
    pub fn frame_nodes(
        &mut self,
        nodes: &[SimNode],
        node_ids: &[String],
        size: Vec2,
        strength: f32,
        now: f64,
    ) -> bool {
        let points = nodes
            .iter()
            .filter(|node| node_ids.iter().any(|id| *id == node.id))
            .map(|node| node.pos);
        let Some(target) = self.fit_transform(points, size, strength) else {
            trace!(requested = node_ids.len(), "frame request had no resolvable positions");
            return false;
        };

        self.animation = Some(CameraAnimation {
            from: self.transform,
            to: target,
            started_at: now,
            duration_secs: self.config.fit_duration_secs,
        });
        true
    }

    /// Advances a running camera animation. Returns true while still moving.
    pub fn advance(&mut self, now: f64) -> bool {
        let Some(animation) = self.animation else {
            return false;
        };

        let elapsed = (now - animation.started_at) as f32;
        let t = if animation.duration_secs > 0.0 {
            elapsed / animation.duration_secs
        } else {
            1.0
        };

        if t >= 1.0 {
            self.transform = animation.to;
            self.animation = None;
            return false;
        }

        self.transform = animation.from.lerp(animation.to, ease_cubic_in_out(t));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim_node(id: &str, x: f32, y: f32) -> SimNode {
        SimNode {
            id: id.to_owned(),
            kind: String::new(),
            name: id.to_owned(),
            pos: vec2(x, y),
            velocity: Vec2::ZERO,
            drag_pin: None,
            selection_pin: None,
        }
    }

    #[test]
    fn fit_three_nodes_in_default_viewport() {
        let viewport = Viewport::default();
        let points = [vec2(0.0, 0.0), vec2(100.0, 0.0), vec2(0.0, 100.0)];
        let size = vec2(960.0, 600.0);
        let fit = viewport.fit_transform(points, size, 1.0).unwrap();

        let width_fit = (size.x - viewport.config.fit_padding) / 100.0;
        assert!(fit.k <= width_fit);
        assert!((0.1..=6.0).contains(&fit.k));

        let center = fit.apply(vec2(50.0, 50.0));
        assert!((center - size / 2.0).length() < 1e-3);
    }

    #[test]
    fn fit_scale_is_clamped() {
        let viewport = Viewport::default();
        let size = vec2(960.0, 600.0);
        let single = viewport.fit_transform([vec2(5.0, 5.0)], size, 1.0).unwrap();
        assert_eq!(single.k, 6.0);

        let huge = viewport
            .fit_transform([vec2(0.0, 0.0), vec2(1.0e6, 1.0e6)], size, 1.0)
            .unwrap();
        assert_eq!(huge.k, 0.1);
    }

    #[test]
    fn frame_without_resolvable_nodes_is_noop() {
        let mut viewport = Viewport::default();
        let nodes = [sim_node("a", f32::NAN, 0.0)];
        let framed = viewport.frame_nodes(
            &nodes,
            &["a".to_owned(), "missing".to_owned()],
            vec2(960.0, 600.0),
            1.0,
            0.0,
        );
        assert!(!framed);
        assert_eq!(viewport.transform, ViewTransform::IDENTITY);
    }

    #[test]
    fn frame_animation_lands_on_target() {
        let mut viewport = Viewport::default();
        let nodes = [sim_node("a", 200.0, 100.0), sim_node("b", 260.0, 180.0)];
        let ids = ["a".to_owned(), "b".to_owned()];
        let size = vec2(960.0, 600.0);
        let target = viewport
            .fit_transform(nodes.iter().map(|node| node.pos), size, 1.0)
            .unwrap();

        assert!(viewport.frame_nodes(&nodes, &ids, size, 1.0, 10.0));
        assert!(viewport.advance(10.1));
        assert_ne!(viewport.transform, target);
        assert!(!viewport.advance(11.0));
        assert_eq!(viewport.transform, target);
    }

    #[test]
    fn zoom_keeps_anchor_fixed() {
        let mut viewport = Viewport::default();
        let anchor = vec2(300.0, 200.0);
        let world_before = viewport.transform.invert(anchor);
        viewport.zoom_at(anchor, 1.5);
        let world_after = viewport.transform.invert(anchor);
        assert!((world_before - world_after).length() < 1e-3);
        assert_eq!(viewport.scale(), 1.5);

        viewport.zoom_at(anchor, 100.0);
        assert_eq!(viewport.scale(), 6.0);
    }
}
