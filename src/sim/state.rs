//! Run state and entity records
//!
//! Everything that lives for exactly one run is owned by [`RunState`] and
//! rebuilt from scratch when a run starts.

use std::collections::HashSet;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::consts::*;
use crate::tuning::DialogueLine;

/// Axis-aligned rectangle, top-left origin
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Bounded or endless run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum GameMode {
    /// Progress clamps at 1.0 and the ending fires at 99%
    #[default]
    Story,
    /// Progress is unbounded, no ending
    Endless,
}

/// The sleigh
#[derive(Debug, Clone)]
pub struct Player {
    pub rect: Rect,
    /// Vertical velocity (pixels/s, positive is down)
    pub vy: f32,
    pub lives: i32,
    pub snowballs: u32,
    pub invincible_timer: f32,
    pub healing_timer: f32,
    pub speed_timer: f32,
    pub time_warp_timer: f32,
    /// Cosmetic tilt (radians)
    pub angle: f32,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            rect: Rect::new(PLAYER_X, PLAYER_START_Y, PLAYER_WIDTH, PLAYER_HEIGHT),
            vy: 0.0,
            lives: START_LIVES,
            snowballs: 0,
            invincible_timer: 0.0,
            healing_timer: 0.0,
            speed_timer: 0.0,
            time_warp_timer: 0.0,
            angle: 0.0,
        }
    }
}

impl Player {
    #[inline]
    pub fn is_invincible(&self) -> bool {
        self.invincible_timer > 0.0
    }

    #[inline]
    pub fn time_warp_active(&self) -> bool {
        self.time_warp_timer > 0.0
    }
}

/// Obstacle variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObstacleKind {
    Tree,
    Bird,
    Snowman,
    Building,
    Cloud,
    Gear,
    GlitchBlock,
}

impl ObstacleKind {
    /// Airborne variants spawn at a random height, the rest sit on the ground
    pub fn is_airborne(self) -> bool {
        matches!(
            self,
            ObstacleKind::Bird | ObstacleKind::Cloud | ObstacleKind::Gear | ObstacleKind::GlitchBlock
        )
    }

    pub fn spins(self) -> bool {
        self == ObstacleKind::Gear
    }
}

#[derive(Debug, Clone)]
pub struct Obstacle {
    pub id: u32,
    pub kind: ObstacleKind,
    pub rect: Rect,
    pub rotation: f32,
    pub dead: bool,
}

/// Powerup variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PowerupKind {
    Speed,
    Snowballs,
    Blast,
    Healing,
    TimeWarp,
}

impl PowerupKind {
    pub const ALL: [PowerupKind; 5] = [
        PowerupKind::Speed,
        PowerupKind::Snowballs,
        PowerupKind::Blast,
        PowerupKind::Healing,
        PowerupKind::TimeWarp,
    ];
}

#[derive(Debug, Clone)]
pub struct Powerup {
    pub id: u32,
    pub kind: PowerupKind,
    pub rect: Rect,
    /// Phase of the bobbing animation (radians)
    pub float_phase: f32,
    pub dead: bool,
}

/// Trail point for projectile rendering
pub const TRAIL_LENGTH: usize = 8;

#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: u32,
    pub rect: Rect,
    /// Horizontal velocity (pixels/s)
    pub vx: f32,
    /// Recent centres, newest first
    pub trail: Vec<Vec2>,
    pub dead: bool,
}

impl Projectile {
    /// Record current centre to trail (call each frame)
    pub fn record_trail(&mut self) {
        self.trail.insert(0, self.rect.center());
        if self.trail.len() > TRAIL_LENGTH {
            self.trail.pop();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LandmarkKind {
    ClockTower,
    Ruins,
    FinalConstruct,
}

#[derive(Debug, Clone)]
pub struct Landmark {
    pub id: u32,
    pub kind: LandmarkKind,
    pub name: &'static str,
    pub rect: Rect,
    pub dead: bool,
}

/// Collectible envelope carrying a narrative message
#[derive(Debug, Clone)]
pub struct Letter {
    pub id: u32,
    pub message: &'static str,
    pub rect: Rect,
    pub float_phase: f32,
    pub dead: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleKind {
    Snow,
    Sparkle,
    Debris,
    Smoke,
    Glow,
    Shockwave,
    Life,
    Glitch,
}

/// Visual-only particle; never collides
#[derive(Debug, Clone)]
pub struct Particle {
    pub kind: ParticleKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub color: [f32; 4],
    pub radius: f32,
    /// Remaining life, 1.0 at birth
    pub life: f32,
    /// Life lost per second
    pub decay: f32,
}

/// Terrain sample spacing (pixels)
pub const TERRAIN_STEP: f32 = 50.0;
/// Samples per layer (covers the canvas plus a margin)
pub const TERRAIN_SAMPLES: usize = ((CANVAS_WIDTH + 200.0) / TERRAIN_STEP) as usize + 1;
/// Height of samples appended while scrolling
pub const TERRAIN_RECYCLE_AMPLITUDE: f32 = 50.0;

/// A parallax strip of height samples
#[derive(Debug, Clone)]
pub struct TerrainLayer {
    pub samples: Vec<f32>,
    /// Scroll offset in (-TERRAIN_STEP, 0]
    pub offset: f32,
    /// Fraction of world speed this layer scrolls at
    pub speed: f32,
    /// Baseline y the samples are added to
    pub base_y: f32,
}

impl TerrainLayer {
    /// Random walk of samples bounded by `amplitude`
    pub fn generate(rng: &mut impl Rng, speed: f32, base_y: f32, amplitude: f32, roughness: f32) -> Self {
        let mut y: f32 = 0.0;
        let samples = (0..TERRAIN_SAMPLES)
            .map(|_| {
                y += (rng.random::<f32>() - 0.5) * roughness;
                y = y.clamp(-amplitude, amplitude);
                y
            })
            .collect();
        Self {
            samples,
            offset: 0.0,
            speed,
            base_y,
        }
    }

    /// Shift left by `dx`, recycling samples as the offset wraps
    pub fn scroll(&mut self, dx: f32, rng: &mut impl Rng) {
        self.offset -= dx;
        while self.offset <= -TERRAIN_STEP {
            self.offset += TERRAIN_STEP;
            self.samples.remove(0);
            self.samples
                .push((rng.random::<f32>() - 0.5) * TERRAIN_RECYCLE_AMPLITUDE);
        }
    }
}

/// A powerup picked up since the last HUD snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollectedPowerup {
    pub id: u32,
    pub kind: PowerupKind,
}

/// Text shown by the overlay until the run clock passes `expires_at`
#[derive(Debug, Clone)]
pub struct TimedText<T> {
    pub value: T,
    pub expires_at: f32,
}

/// Discrete happenings of a frame, drained by the frame driver
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Jump,
    Shoot,
    Crash { lives: i32 },
    ObstacleDestroyed,
    PowerupCollected(PowerupKind),
    LetterCollected,
    ActChanged { from: Option<usize>, to: usize },
    Dialogue(&'static str),
    LandmarkSpawned(LandmarkKind),
    EndingStarted,
    TimeWarning,
}

/// Complete per-run state
#[derive(Debug, Clone)]
pub struct RunState {
    pub seed: u64,
    pub mode: GameMode,
    pub rng: Pcg32,

    pub player: Player,
    pub obstacles: Vec<Obstacle>,
    pub powerups: Vec<Powerup>,
    pub projectiles: Vec<Projectile>,
    pub landmarks: Vec<Landmark>,
    pub letters: Vec<Letter>,
    pub particles: Vec<Particle>,
    pub terrain: [TerrainLayer; 3],

    /// Cumulative scroll distance (pixels)
    pub distance: f32,
    pub score: f32,
    /// Countdown (real seconds)
    pub time_left: f32,
    /// Real seconds since the run began playing
    pub clock: f32,
    /// Scroll speed of the last update (pixels/s)
    pub current_speed: f32,
    pub act_index: Option<usize>,
    pub ending: bool,
    /// Pass through obstacles (debug)
    pub cinematic: bool,

    pub fired_moments: HashSet<&'static str>,
    pub fired_landmarks: HashSet<LandmarkKind>,
    pub fired_letters: HashSet<&'static str>,
    pub time_warning_fired: bool,

    pub dialogue: Option<TimedText<DialogueLine>>,
    pub wish: Option<TimedText<&'static str>>,
    pub collected: Vec<CollectedPowerup>,

    pub shake: f32,
    pub flash_timer: f32,

    pub events: Vec<GameEvent>,
    /// Maximum live particles
    pub particle_cap: usize,
    next_id: u32,
}

/// Default particle budget
pub const MAX_PARTICLES: usize = 500;
/// Share of the particle cap ambient weather may occupy; bursts get the rest
pub const WEATHER_SHARE: f32 = 0.6;

impl RunState {
    /// Create a fresh run with the given seed
    pub fn new(seed: u64, mode: GameMode) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let terrain = [
            TerrainLayer::generate(&mut rng, 0.2, CANVAS_HEIGHT - 150.0, 150.0, 80.0),
            TerrainLayer::generate(&mut rng, 0.5, CANVAS_HEIGHT - 80.0, 50.0, 30.0),
            TerrainLayer::generate(&mut rng, 0.8, CANVAS_HEIGHT - 20.0, 20.0, 10.0),
        ];
        Self {
            seed,
            mode,
            rng,
            player: Player::default(),
            obstacles: Vec::new(),
            powerups: Vec::new(),
            projectiles: Vec::new(),
            landmarks: Vec::new(),
            letters: Vec::new(),
            particles: Vec::new(),
            terrain,
            distance: 0.0,
            score: 0.0,
            time_left: TOTAL_GAME_TIME_SECS,
            clock: 0.0,
            current_speed: BASE_SPEED,
            act_index: None,
            ending: false,
            cinematic: false,
            fired_moments: HashSet::new(),
            fired_landmarks: HashSet::new(),
            fired_letters: HashSet::new(),
            time_warning_fired: false,
            dialogue: None,
            wish: None,
            collected: Vec::new(),
            shake: 0.0,
            flash_timer: 0.0,
            events: Vec::new(),
            particle_cap: MAX_PARTICLES,
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Time-dilation factor applied to the world
    #[inline]
    pub fn time_factor(&self) -> f32 {
        if self.player.time_warp_active() {
            TIME_WARP_FACTOR
        } else {
            1.0
        }
    }

    /// Current act, act 0 before the first update
    #[inline]
    pub fn act(&self) -> usize {
        self.act_index.unwrap_or(0)
    }

    /// Particle count above which weather stops spawning
    pub fn weather_cap(&self) -> usize {
        (self.particle_cap as f32 * WEATHER_SHARE) as usize
    }

    /// Emit `count` particles at `pos`
    pub fn burst(&mut self, pos: Vec2, kind: ParticleKind, count: usize, color: [f32; 4]) {
        for _ in 0..count {
            if self.particles.len() >= self.particle_cap {
                return;
            }
            let radius = self.rng.random_range(2.0..5.0);
            let vel = Vec2::new(
                self.rng.random::<f32>() - 0.5,
                self.rng.random::<f32>() - 0.5,
            ) * 5.0
                * NOMINAL_FPS;
            self.particles.push(Particle {
                kind,
                pos,
                vel,
                color,
                radius,
                life: 1.0,
                decay: 1.0,
            });
        }
    }

    /// Drop tombstoned entities
    pub fn sweep(&mut self) {
        self.obstacles.retain(|o| !o.dead);
        self.powerups.retain(|p| !p.dead);
        self.projectiles.retain(|p| !p.dead);
        self.landmarks.retain(|l| !l.dead);
        self.letters.retain(|l| !l.dead);
        self.particles.retain(|p| p.life > 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_run_is_fresh() {
        let state = RunState::new(7, GameMode::Story);
        assert_eq!(state.player.lives, START_LIVES);
        assert_eq!(state.player.snowballs, 0);
        assert_eq!(state.distance, 0.0);
        assert_eq!(state.time_left, TOTAL_GAME_TIME_SECS);
        assert!(state.obstacles.is_empty());
        assert!(state.fired_moments.is_empty());
        assert!(!state.ending);
        for layer in &state.terrain {
            assert_eq!(layer.samples.len(), TERRAIN_SAMPLES);
        }
    }

    #[test]
    fn test_terrain_recycles_without_growth() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut layer = TerrainLayer::generate(&mut rng, 0.5, 500.0, 50.0, 30.0);
        let second = layer.samples[1];
        layer.scroll(TERRAIN_STEP * 1.5, &mut rng);
        assert_eq!(layer.samples.len(), TERRAIN_SAMPLES);
        assert_eq!(layer.samples[0], second);
        assert!(layer.offset <= 0.0 && layer.offset > -TERRAIN_STEP);

        for _ in 0..1000 {
            layer.scroll(37.0, &mut rng);
        }
        assert_eq!(layer.samples.len(), TERRAIN_SAMPLES);
    }

    #[test]
    fn test_burst_respects_cap() {
        let mut state = RunState::new(1, GameMode::Story);
        state.particle_cap = 10;
        state.burst(Vec2::ZERO, ParticleKind::Debris, 25, [1.0; 4]);
        assert_eq!(state.particles.len(), 10);
    }

    #[test]
    fn test_sweep_removes_tombstones() {
        let mut state = RunState::new(1, GameMode::Story);
        for dead in [false, true, false] {
            let id = state.next_entity_id();
            state.obstacles.push(Obstacle {
                id,
                kind: ObstacleKind::Tree,
                rect: Rect::new(0.0, 0.0, 10.0, 10.0),
                rotation: 0.0,
                dead,
            });
        }
        state.sweep();
        assert_eq!(state.obstacles.len(), 2);
        assert!(state.obstacles.iter().all(|o| !o.dead));
    }

    #[test]
    fn test_projectile_trail_is_bounded() {
        let mut p = Projectile {
            id: 1,
            rect: Rect::new(0.0, 0.0, PROJECTILE_SIZE, PROJECTILE_SIZE),
            vx: PROJECTILE_SPEED,
            trail: Vec::new(),
            dead: false,
        };
        for i in 0..20 {
            p.rect.x = i as f32;
            p.record_trail();
        }
        assert_eq!(p.trail.len(), TRAIL_LENGTH);
        assert_eq!(p.trail[0].x, 19.0 + PROJECTILE_SIZE / 2.0);
    }
}
