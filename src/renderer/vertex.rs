//! Vertex types for 2D rendering

use bytemuck::{Pod, Zeroable};

/// Simple 2D vertex with position and color
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    pub const fn new(x: f32, y: f32, color: [f32; 4]) -> Self {
        Self {
            position: [x, y],
            color,
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Colors for game elements
pub mod colors {
    use crate::rgb;

    pub const WHITE: [f32; 4] = rgb(0xffffff);
    pub const SLEIGH: [f32; 4] = rgb(0xb91c1c);
    pub const RUNNER: [f32; 4] = rgb(0xfbbf24);
    pub const SANTA_FACE: [f32; 4] = rgb(0xfca5a5);
    pub const SANTA_HAT: [f32; 4] = rgb(0xef4444);
    pub const WARP_AURA: [f32; 4] = rgb(0xd8b4fe);
    pub const GEAR_SKY: [f32; 4] = rgb(0x52525b);
    pub const GEAR_OBSTACLE: [f32; 4] = rgb(0x71717a);
    pub const GEAR_HUB: [f32; 4] = rgb(0x27272a);
    pub const TREE: [f32; 4] = rgb(0x166534);
    pub const TRUNK: [f32; 4] = rgb(0x78350f);
    pub const BIRD: [f32; 4] = rgb(0x1e293b);
    pub const SNOW: [f32; 4] = rgb(0xf1f5f9);
    pub const BUILDING: [f32; 4] = rgb(0x3f3f46);
    pub const WINDOW: [f32; 4] = rgb(0xfde68a);
    pub const CLOUD: [f32; 4] = rgb(0xe2e8f0);
    pub const TOWER: [f32; 4] = rgb(0x18181b);
    pub const CLOCK_FACE: [f32; 4] = rgb(0xfbbf24);
    pub const RUINS: [f32; 4] = rgb(0x27272a);
    pub const CORE: [f32; 4] = rgb(0x7c3aed);
    pub const ENVELOPE: [f32; 4] = rgb(0xfef3c7);
    pub const SEAL: [f32; 4] = rgb(0xdc2626);
    pub const VIGNETTE: [f32; 4] = [0.0, 0.0, 0.0, 0.45];
}
