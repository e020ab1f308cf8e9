//! Immediate-mode vertex painter with a save/restore transform stack

use glam::{Affine2, Vec2};

use super::vertex::Vertex;

/// Collects triangles in canvas space
///
/// Shapes are built in local space and mapped through the current
/// transform; their alpha is scaled by the current global alpha.
#[derive(Debug)]
pub struct Painter {
    vertices: Vec<Vertex>,
    transform: Affine2,
    alpha: f32,
    stack: Vec<(Affine2, f32)>,
}

impl Default for Painter {
    fn default() -> Self {
        Self::new()
    }
}

impl Painter {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(capacity),
            transform: Affine2::IDENTITY,
            alpha: 1.0,
            stack: Vec::new(),
        }
    }

    pub fn save(&mut self) {
        self.stack.push((self.transform, self.alpha));
    }

    /// Pop the last saved state; unbalanced restores are ignored
    pub fn restore(&mut self) {
        if let Some((transform, alpha)) = self.stack.pop() {
            self.transform = transform;
            self.alpha = alpha;
        }
    }

    pub fn translate(&mut self, offset: Vec2) {
        self.transform = self.transform * Affine2::from_translation(offset);
    }

    pub fn rotate(&mut self, angle: f32) {
        self.transform = self.transform * Affine2::from_angle(angle);
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    /// Append local-space triangles
    pub fn fill(&mut self, shape: Vec<Vertex>) {
        if self.alpha <= 0.0 {
            return;
        }
        let identity = self.transform == Affine2::IDENTITY;
        self.vertices.extend(shape.into_iter().map(|v| {
            let position = if identity {
                v.position
            } else {
                self.transform
                    .transform_point2(Vec2::from(v.position))
                    .to_array()
            };
            let mut color = v.color;
            color[3] *= self.alpha;
            Vertex { position, color }
        }));
    }

    /// Hand over the collected triangles
    pub fn finish(self) -> Vec<Vertex> {
        self.vertices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::shapes;

    #[test]
    fn test_translate_and_restore() {
        let mut painter = Painter::new();
        painter.save();
        painter.translate(Vec2::new(10.0, 20.0));
        painter.fill(shapes::rect(0.0, 0.0, 1.0, 1.0, [1.0; 4]));
        painter.restore();
        painter.fill(shapes::rect(0.0, 0.0, 1.0, 1.0, [1.0; 4]));

        let vertices = painter.finish();
        assert_eq!(vertices[0].position, [10.0, 20.0]);
        assert_eq!(vertices[6].position, [0.0, 0.0]);
    }

    #[test]
    fn test_rotation_about_translated_origin() {
        let mut painter = Painter::new();
        painter.translate(Vec2::new(100.0, 100.0));
        painter.rotate(std::f32::consts::FRAC_PI_2);
        painter.fill(shapes::rect(10.0, 0.0, 1.0, 1.0, [1.0; 4]));
        let p = Vec2::from(painter.finish()[0].position);
        assert!((p - Vec2::new(100.0, 110.0)).length() < 1e-4);
    }

    #[test]
    fn test_alpha_scales_and_skips() {
        let mut painter = Painter::new();
        painter.save();
        painter.set_alpha(0.5);
        painter.fill(shapes::rect(0.0, 0.0, 1.0, 1.0, [1.0, 1.0, 1.0, 0.8]));
        painter.set_alpha(0.0);
        painter.fill(shapes::rect(0.0, 0.0, 1.0, 1.0, [1.0; 4]));
        painter.restore();
        painter.fill(shapes::rect(0.0, 0.0, 1.0, 1.0, [1.0; 4]));

        let vertices = painter.finish();
        assert_eq!(vertices.len(), 12);
        assert!((vertices[0].color[3] - 0.4).abs() < 1e-6);
        assert_eq!(vertices[6].color[3], 1.0);
    }

    #[test]
    fn test_alpha_clamps() {
        let mut painter = Painter::new();
        painter.set_alpha(3.0);
        painter.fill(shapes::rect(0.0, 0.0, 1.0, 1.0, [1.0, 1.0, 1.0, 0.5]));
        assert_eq!(painter.finish()[0].color[3], 0.5);
    }

    #[test]
    fn test_unbalanced_restore_is_ignored() {
        let mut painter = Painter::new();
        painter.translate(Vec2::new(5.0, 5.0));
        painter.restore();
        painter.fill(shapes::rect(0.0, 0.0, 1.0, 1.0, [1.0; 4]));
        assert_eq!(painter.finish()[0].position, [5.0, 5.0]);
    }
}
