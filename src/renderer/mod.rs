//! WebGPU rendering module
//!
//! The scene is tessellated on the CPU into coloured triangles in canvas
//! space, then mapped to clip space and drawn with a single pipeline.

pub mod painter;
pub mod pipeline;
pub mod scene;
pub mod shapes;
pub mod vertex;

pub use painter::Painter;
pub use pipeline::{CanvasTransform, RenderState};
pub use scene::SceneRenderer;
pub use vertex::Vertex;
