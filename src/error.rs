//! Startup failures
//!
//! The simulation is infallible; the only thing that can stop a run from
//! starting is failing to acquire somewhere to draw.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("no browser window")]
    NoWindow,
    #[error("canvas element `{0}` not found")]
    NoCanvas(&'static str),
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}
