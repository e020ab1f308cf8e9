//! Sleigh Ride - a side-scrolling arcade runner
//!
//! Core modules:
//! - `sim`: Per-frame simulation (physics, spawning, collisions, narrative)
//! - `driver`: Frame driver and phase state machine
//! - `renderer`: Scene tessellation and the WebGPU pipeline
//! - `audio`: Audio collaborator interface and Web Audio backend
//! - `persistence`: Persistent key/value flags
//! - `settings`: Player preferences (quality, motion, volumes)
//! - `error`: Startup failures
//! - `tuning`: Data-driven act table and narrative registries
//! - `ui`: HUD snapshot handed to the overlay

pub mod audio;
pub mod driver;
pub mod error;
pub mod persistence;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod tuning;
pub mod ui;

pub use driver::{FrameDriver, FrameOutcome, GamePhase, RunListener};
pub use error::StartupError;
pub use settings::{QualityPreset, Settings};

/// Game configuration constants
///
/// Distances are canvas pixels, times are seconds, speeds are pixels/second.
pub mod consts {
    /// Logical canvas size
    pub const CANVAS_WIDTH: f32 = 1200.0;
    pub const CANVAS_HEIGHT: f32 = 600.0;
    /// Height of the band the player can fly in (ground strip below)
    pub const PLAY_FIELD_HEIGHT: f32 = CANVAS_HEIGHT - 50.0;

    /// Upper bound on a frame's delta time
    pub const MAX_FRAME_DT: f32 = 0.1;
    /// Per-frame tuning values are expressed against this nominal rate
    pub const NOMINAL_FPS: f32 = 60.0;

    /// Player defaults
    pub const PLAYER_X: f32 = 150.0;
    pub const PLAYER_START_Y: f32 = 300.0;
    pub const PLAYER_WIDTH: f32 = 60.0;
    pub const PLAYER_HEIGHT: f32 = 30.0;
    pub const START_LIVES: i32 = 3;
    pub const MAX_LIVES: i32 = 5;

    /// Downward acceleration (pixels/s²)
    pub const GRAVITY: f32 = 1440.0;
    /// Vertical velocity set by a jump (pixels/s, negative is up)
    pub const JUMP_VELOCITY: f32 = -480.0;
    /// Tilt target per unit of vertical velocity, and its clamp
    pub const TILT_PER_VELOCITY: f32 = 0.05 / NOMINAL_FPS;
    pub const MAX_TILT: f32 = 0.5;
    /// Rate constant of the exponential tilt approach (1/s)
    pub const TILT_RATE: f32 = 6.0;

    /// World scroll speed at progress 0, and the extra speed gained by progress 1
    pub const BASE_SPEED: f32 = 300.0;
    pub const PROGRESS_SPEED_BONUS: f32 = 240.0;
    /// Score gained per pixel scrolled
    pub const SCORE_PER_DISTANCE: f32 = 0.1;

    /// Time-dilation factor while time warp is active
    pub const TIME_WARP_FACTOR: f32 = 0.2;

    /// Invincibility after a crash
    pub const INVINCIBILITY_SECS: f32 = 2.0;
    /// Camera shake impulse on crash
    pub const CRASH_SHAKE: f32 = 20.0;
    /// Shake retained per nominal frame
    pub const SHAKE_DECAY: f32 = 0.9;

    /// Snowball projectile
    pub const PROJECTILE_SPEED: f32 = 900.0;
    pub const PROJECTILE_SIZE: f32 = 12.0;
    pub const SCORE_PER_OBSTACLE: f32 = 50.0;

    /// Run length
    pub const TOTAL_GAME_TIME_SECS: f32 = 720.0;
    pub const VICTORY_DISTANCE: f32 = 300_000.0;
    /// Progress at which the story ending begins
    pub const ENDING_PROGRESS: f32 = 0.99;
    /// Remaining time at which the warning sting plays
    pub const TIME_WARNING_SECS: f32 = 30.0;

    /// Full-screen flash on act change
    pub const ACT_FLASH_SECS: f32 = 1.0;
    /// How long narrative text stays up
    pub const DIALOGUE_SECS: f32 = 5.0;
    pub const WISH_SECS: f32 = 6.0;
}

/// Linear interpolation between two colours
#[inline]
pub fn lerp_color(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    let t = t.clamp(0.0, 1.0);
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
        a[3] + (b[3] - a[3]) * t,
    ]
}

/// Build an opaque colour from a `0xRRGGBB` literal
#[inline]
pub const fn rgb(hex: u32) -> [f32; 4] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
        1.0,
    ]
}

/// Replace the alpha channel of a colour
#[inline]
pub const fn with_alpha(color: [f32; 4], alpha: f32) -> [f32; 4] {
    [color[0], color[1], color[2], alpha]
}
