//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Variable timestep, clamped per frame
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod collision;
pub mod narrative;
pub mod spawn;
pub mod state;
pub mod tick;

pub use collision::collides;
pub use narrative::progress_ratio;
pub use state::{
    GameEvent, GameMode, Obstacle, ObstacleKind, Particle, ParticleKind, Player, Powerup,
    PowerupKind, Rect, RunState,
};
pub use tick::{apply_powerup, clamp_dt, jump, shoot, update};
