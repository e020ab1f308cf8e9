//! Shape generation for 2D primitives
//!
//! Every function returns a triangle list in local coordinates; the
//! [`Painter`](super::painter::Painter) places it in the scene.

use glam::Vec2;
use std::f32::consts::PI;

use super::vertex::Vertex;
use crate::with_alpha;

fn quad(vertices: &mut Vec<Vertex>, corners: [Vec2; 4], colors: [[f32; 4]; 4]) {
    let [a, b, c, d] = corners;
    vertices.push(Vertex::new(a.x, a.y, colors[0]));
    vertices.push(Vertex::new(b.x, b.y, colors[1]));
    vertices.push(Vertex::new(c.x, c.y, colors[2]));

    vertices.push(Vertex::new(c.x, c.y, colors[2]));
    vertices.push(Vertex::new(b.x, b.y, colors[1]));
    vertices.push(Vertex::new(d.x, d.y, colors[3]));
}

/// Axis-aligned filled rectangle
pub fn rect(x: f32, y: f32, width: f32, height: f32, color: [f32; 4]) -> Vec<Vertex> {
    gradient_rect(x, y, width, height, color, color)
}

/// Rectangle blending from `top` to `bottom`
pub fn gradient_rect(
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    top: [f32; 4],
    bottom: [f32; 4],
) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity(6);
    quad(
        &mut vertices,
        [
            Vec2::new(x, y),
            Vec2::new(x + width, y),
            Vec2::new(x, y + height),
            Vec2::new(x + width, y + height),
        ],
        [top, top, bottom, bottom],
    );
    vertices
}

/// Rectangle blending from `left` to `right`
pub fn horizontal_gradient_rect(
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    left: [f32; 4],
    right: [f32; 4],
) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity(6);
    quad(
        &mut vertices,
        [
            Vec2::new(x, y),
            Vec2::new(x + width, y),
            Vec2::new(x, y + height),
            Vec2::new(x + width, y + height),
        ],
        [left, right, left, right],
    );
    vertices
}

/// Generate vertices for a filled circle
pub fn circle(center: Vec2, radius: f32, color: [f32; 4], segments: u32) -> Vec<Vertex> {
    glow(center, radius, color, color, segments)
}

/// Filled circle blending from `inner` at the centre to `outer` at the rim
pub fn glow(
    center: Vec2,
    radius: f32,
    inner: [f32; 4],
    outer: [f32; 4],
    segments: u32,
) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity((segments * 3) as usize);

    for i in 0..segments {
        let theta1 = (i as f32 / segments as f32) * 2.0 * PI;
        let theta2 = ((i + 1) as f32 / segments as f32) * 2.0 * PI;

        // Triangle from center to edge
        vertices.push(Vertex::new(center.x, center.y, inner));
        vertices.push(Vertex::new(
            center.x + radius * theta1.cos(),
            center.y + radius * theta1.sin(),
            outer,
        ));
        vertices.push(Vertex::new(
            center.x + radius * theta2.cos(),
            center.y + radius * theta2.sin(),
            outer,
        ));
    }

    vertices
}

/// Band between two radii over `[start, start + span)`
pub fn arc_band(
    center: Vec2,
    inner_radius: f32,
    outer_radius: f32,
    start: f32,
    span: f32,
    color: [f32; 4],
    segments: u32,
) -> Vec<Vertex> {
    let segments = segments.max(1);
    let mut vertices = Vec::with_capacity((segments * 6) as usize);

    for i in 0..segments {
        let theta1 = start + (i as f32 / segments as f32) * span;
        let theta2 = start + ((i + 1) as f32 / segments as f32) * span;
        let (s1, c1) = theta1.sin_cos();
        let (s2, c2) = theta2.sin_cos();

        // Two triangles per segment
        quad(
            &mut vertices,
            [
                center + Vec2::new(c1, s1) * inner_radius,
                center + Vec2::new(c1, s1) * outer_radius,
                center + Vec2::new(c2, s2) * inner_radius,
                center + Vec2::new(c2, s2) * outer_radius,
            ],
            [color; 4],
        );
    }

    vertices
}

/// Generate vertices for a ring (hollow circle)
pub fn ring(
    center: Vec2,
    inner_radius: f32,
    outer_radius: f32,
    color: [f32; 4],
    segments: u32,
) -> Vec<Vertex> {
    arc_band(center, inner_radius, outer_radius, 0.0, 2.0 * PI, color, segments)
}

/// Ring broken into `dashes` evenly spaced dashes with equal gaps
pub fn dashed_ring(
    center: Vec2,
    radius: f32,
    thickness: f32,
    dashes: u32,
    phase: f32,
    color: [f32; 4],
) -> Vec<Vertex> {
    let step = 2.0 * PI / dashes.max(1) as f32;
    let mut vertices = Vec::new();
    for i in 0..dashes {
        let start = phase + i as f32 * step;
        vertices.extend(arc_band(
            center,
            radius - thickness / 2.0,
            radius + thickness / 2.0,
            start,
            step / 2.0,
            color,
            2,
        ));
    }
    vertices
}

/// Convex polygon as a triangle fan around its first point
pub fn polygon(points: &[Vec2], color: [f32; 4]) -> Vec<Vertex> {
    if points.len() < 3 {
        return Vec::new();
    }
    let mut vertices = Vec::with_capacity((points.len() - 2) * 3);
    for pair in points[1..].windows(2) {
        vertices.push(Vertex::new(points[0].x, points[0].y, color));
        vertices.push(Vertex::new(pair[0].x, pair[0].y, color));
        vertices.push(Vertex::new(pair[1].x, pair[1].y, color));
    }
    vertices
}

/// Star-shaped polygon fanned from `center`; handles concave outlines
pub fn star_fan(center: Vec2, outline: &[Vec2], color: [f32; 4]) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity(outline.len() * 3);
    for i in 0..outline.len() {
        let a = outline[i];
        let b = outline[(i + 1) % outline.len()];
        vertices.push(Vertex::new(center.x, center.y, color));
        vertices.push(Vertex::new(a.x, a.y, color));
        vertices.push(Vertex::new(b.x, b.y, color));
    }
    vertices
}

/// Straight stroke of the given width
pub fn line(a: Vec2, b: Vec2, width: f32, color: [f32; 4]) -> Vec<Vertex> {
    let dir = (b - a).normalize_or_zero();
    let perp = Vec2::new(-dir.y, dir.x) * (width / 2.0);
    let mut vertices = Vec::with_capacity(6);
    quad(&mut vertices, [a + perp, a - perp, b + perp, b - perp], [color; 4]);
    vertices
}

/// Polyline stroke, one quad per segment
pub fn polyline(points: &[Vec2], width: f32, color: [f32; 4]) -> Vec<Vertex> {
    points
        .windows(2)
        .flat_map(|pair| line(pair[0], pair[1], width, color))
        .collect()
}

/// Area between a polyline and the horizontal line `floor_y`
pub fn silhouette(points: &[Vec2], floor_y: f32, color: [f32; 4]) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity(points.len().saturating_sub(1) * 6);
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        quad(
            &mut vertices,
            [a, b, Vec2::new(a.x, floor_y), Vec2::new(b.x, floor_y)],
            [color; 4],
        );
    }
    vertices
}

/// Tapered fading trail behind a moving dot; `trail` is oldest first
pub fn trail(trail: &[Vec2], radius: f32, color: [f32; 4]) -> Vec<Vertex> {
    if trail.len() < 2 {
        return Vec::new();
    }

    let mut vertices = Vec::with_capacity(trail.len() * 6);
    let trail_len = trail.len() as f32;

    for i in 0..trail.len() - 1 {
        let (p1, p2) = (trail[i], trail[i + 1]);

        // Newest end is widest and most opaque
        let t1 = (i + 1) as f32 / trail_len;
        let t2 = (i + 2) as f32 / trail_len;
        let color1 = with_alpha(color, color[3] * t1 * 0.6);
        let color2 = with_alpha(color, color[3] * t2 * 0.6);
        let width1 = radius * t1;
        let width2 = radius * t2;

        let dir = (p2 - p1).normalize_or_zero();
        let perp = Vec2::new(-dir.y, dir.x);

        quad(
            &mut vertices,
            [p1 + perp * width1, p1 - perp * width1, p2 + perp * width2, p2 - perp * width2],
            [color1, color1, color2, color2],
        );
    }

    vertices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_counts() {
        assert_eq!(rect(0.0, 0.0, 10.0, 10.0, [1.0; 4]).len(), 6);
        assert_eq!(circle(Vec2::ZERO, 5.0, [1.0; 4], 12).len(), 36);
        assert_eq!(ring(Vec2::ZERO, 4.0, 5.0, [1.0; 4], 12).len(), 72);
        assert_eq!(polygon(&[Vec2::ZERO, Vec2::X, Vec2::Y, Vec2::ONE], [1.0; 4]).len(), 6);
        assert!(polygon(&[Vec2::ZERO, Vec2::X], [1.0; 4]).is_empty());
        assert!(trail(&[Vec2::ZERO], 3.0, [1.0; 4]).is_empty());
    }

    #[test]
    fn test_gradient_rect_colors() {
        let top = [1.0, 0.0, 0.0, 1.0];
        let bottom = [0.0, 0.0, 1.0, 1.0];
        let vertices = gradient_rect(0.0, 0.0, 10.0, 20.0, top, bottom);
        for v in &vertices {
            let expected = if v.position[1] == 0.0 { top } else { bottom };
            assert_eq!(v.color, expected);
        }
    }

    #[test]
    fn test_silhouette_reaches_floor() {
        let points = [Vec2::new(0.0, 10.0), Vec2::new(50.0, 20.0), Vec2::new(100.0, 5.0)];
        let vertices = silhouette(&points, 600.0, [1.0; 4]);
        assert_eq!(vertices.len(), 12);
        assert!(vertices.iter().any(|v| v.position[1] == 600.0));
        assert!(vertices.iter().all(|v| v.position[1] <= 600.0));
    }

    #[test]
    fn test_dashed_ring_stays_on_radius() {
        let vertices = dashed_ring(Vec2::ZERO, 50.0, 2.0, 16, 0.0, [1.0; 4]);
        assert_eq!(vertices.len(), 16 * 2 * 6);
        for v in &vertices {
            let r = Vec2::from(v.position).length();
            assert!((49.0 - 1e-3..=51.0 + 1e-3).contains(&r));
        }
    }
}
