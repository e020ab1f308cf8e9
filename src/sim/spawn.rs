//! Per-frame entity spawning
//!
//! Obstacles, powerups and snow are independent Bernoulli trials each
//! frame, with a probability proportional to world time so time warp
//! throttles arrivals along with motion. Landmarks and letters are placed
//! by the narrative tracker through the helpers at the bottom.

use glam::Vec2;
use rand::Rng;

use super::state::{
    Landmark, Letter, Obstacle, ObstacleKind, Particle, ParticleKind, Powerup, PowerupKind, Rect,
    RunState,
};
use crate::consts::*;
use crate::rgb;
use crate::tuning::{
    ActConfig, LandmarkEntry, LetterEntry, OBSTACLE_SPAWN_RATE, POWERUP_SPAWN_RATE, SNOW_SPAWN_RATE,
};

/// New entities enter this far right of the canvas
pub const SPAWN_X: f32 = CANVAS_WIDTH + 100.0;
pub const OBSTACLE_SIZE: f32 = 60.0;
pub const GROUND_Y: f32 = CANVAS_HEIGHT - 100.0;
pub const POWERUP_SIZE: f32 = 40.0;
pub const LETTER_SIZE: (f32, f32) = (36.0, 24.0);
pub const LANDMARK_SIZE: (f32, f32) = (250.0, 350.0);

/// Probability of a spawn on a frame lasting `world_dt` seconds
#[inline]
pub fn spawn_probability(base_rate: f32, multiplier: f32, world_dt: f32) -> f32 {
    base_rate * multiplier * world_dt * NOMINAL_FPS
}

/// Decide whether an obstacle spawns this frame, and where
pub fn roll_obstacle<R: Rng>(
    rng: &mut R,
    act: &ActConfig,
    world_dt: f32,
) -> Option<(ObstacleKind, f32)> {
    let p = spawn_probability(OBSTACLE_SPAWN_RATE, act.spawn_rate_multiplier, world_dt);
    if rng.random::<f32>() >= p {
        return None;
    }
    let kind = act.obstacles[rng.random_range(0..act.obstacles.len())];
    let y = if kind.is_airborne() {
        rng.random::<f32>() * (CANVAS_HEIGHT - 200.0)
    } else {
        GROUND_Y
    };
    Some((kind, y))
}

/// Decide whether a powerup spawns this frame, and where
pub fn roll_powerup<R: Rng>(rng: &mut R, world_dt: f32) -> Option<(PowerupKind, f32)> {
    let p = spawn_probability(POWERUP_SPAWN_RATE, 1.0, world_dt);
    if rng.random::<f32>() >= p {
        return None;
    }
    let kind = PowerupKind::ALL[rng.random_range(0..PowerupKind::ALL.len())];
    let y = rng.random::<f32>() * (CANVAS_HEIGHT - 200.0) + 50.0;
    Some((kind, y))
}

/// Run the probabilistic spawners for one frame
pub fn run_spawners(state: &mut RunState, act: &ActConfig, world_dt: f32) {
    if let Some((kind, y)) = roll_obstacle(&mut state.rng, act, world_dt) {
        let id = state.next_entity_id();
        log::debug!("Spawned {:?} at y={:.0}", kind, y);
        state.obstacles.push(Obstacle {
            id,
            kind,
            rect: Rect::new(SPAWN_X, y, OBSTACLE_SIZE, OBSTACLE_SIZE),
            rotation: 0.0,
            dead: false,
        });
    }

    if let Some((kind, y)) = roll_powerup(&mut state.rng, world_dt) {
        let id = state.next_entity_id();
        log::debug!("Spawned {:?} powerup", kind);
        state.powerups.push(Powerup {
            id,
            kind,
            rect: Rect::new(SPAWN_X, y, POWERUP_SIZE, POWERUP_SIZE),
            float_phase: 0.0,
            dead: false,
        });
    }

    spawn_weather(state, act, world_dt);
}

/// Snowflakes drifting in from the top
fn spawn_weather(state: &mut RunState, act: &ActConfig, world_dt: f32) {
    if act.weather_intensity <= 0.0 {
        return;
    }
    let p = spawn_probability(SNOW_SPAWN_RATE, act.weather_intensity, world_dt);
    // High intensities may yield several flakes per frame
    let mut budget = p;
    let cap = state.weather_cap();
    while budget > 0.0 && state.particles.len() < cap {
        if state.rng.random::<f32>() < budget.min(1.0) {
            let x = state.rng.random::<f32>() * (CANVAS_WIDTH + 200.0);
            let radius = state.rng.random_range(1.0..3.0);
            let fall = state.rng.random_range(40.0..100.0);
            state.particles.push(Particle {
                kind: ParticleKind::Snow,
                pos: Vec2::new(x, -10.0),
                vel: Vec2::new(-20.0, fall),
                color: rgb(0xffffff),
                radius,
                life: 1.0,
                decay: 0.12,
            });
        }
        budget -= 1.0;
    }
}

/// Place a landmark just off the right edge
pub fn spawn_landmark(state: &mut RunState, landmark: &LandmarkEntry) {
    let id = state.next_entity_id();
    let (width, height) = LANDMARK_SIZE;
    state.landmarks.push(Landmark {
        id,
        kind: landmark.kind,
        name: landmark.name,
        rect: Rect::new(CANVAS_WIDTH + 200.0, CANVAS_HEIGHT - height, width, height),
        dead: false,
    });
}

/// Place a letter envelope at a random height
pub fn spawn_letter(state: &mut RunState, letter: &LetterEntry) {
    let id = state.next_entity_id();
    let y = state.rng.random_range(100.0..400.0);
    let (width, height) = LETTER_SIZE;
    state.letters.push(Letter {
        id,
        message: letter.message,
        rect: Rect::new(SPAWN_X, y, width, height),
        float_phase: 0.0,
        dead: false,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::GameMode;
    use crate::tuning::ACTS;
    use rand::RngCore;

    /// Returns the same word forever
    struct ConstRng(u32);

    impl RngCore for ConstRng {
        fn next_u32(&mut self) -> u32 {
            self.0
        }

        fn next_u64(&mut self) -> u64 {
            ((self.0 as u64) << 32) | self.0 as u64
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            for (i, byte) in dst.iter_mut().enumerate() {
                *byte = self.0.to_le_bytes()[i % 4];
            }
        }
    }

    #[test]
    fn test_probability_scales_with_world_time() {
        let normal = spawn_probability(OBSTACLE_SPAWN_RATE, 1.0, 1.0 / 60.0);
        let warped = spawn_probability(OBSTACLE_SPAWN_RATE, 1.0, 0.2 / 60.0);
        assert!((normal - 0.015).abs() < 1e-6);
        assert!((warped - normal * 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_low_draw_spawns_act_variant() {
        let mut rng = ConstRng(0);
        let (kind, _) = roll_obstacle(&mut rng, &ACTS[1], 1.0 / 60.0).expect("should spawn");
        assert!(ACTS[1].obstacles.contains(&kind));
    }

    #[test]
    fn test_high_draw_never_spawns() {
        let mut rng = ConstRng(u32::MAX);
        for act in &ACTS {
            assert!(roll_obstacle(&mut rng, act, MAX_FRAME_DT).is_none());
        }
        assert!(roll_powerup(&mut rng, MAX_FRAME_DT).is_none());
    }

    #[test]
    fn test_final_act_spawns_nothing() {
        let mut rng = ConstRng(0);
        assert!(roll_obstacle(&mut rng, &ACTS[4], 1.0 / 60.0).is_none());
    }

    #[test]
    fn test_ground_variants_sit_on_ground() {
        let mut state = RunState::new(11, GameMode::Story);
        for _ in 0..20_000 {
            run_spawners(&mut state, &ACTS[0], 1.0 / 60.0);
        }
        assert!(!state.obstacles.is_empty());
        for o in &state.obstacles {
            if o.kind.is_airborne() {
                assert!(o.rect.y >= 0.0 && o.rect.y < CANVAS_HEIGHT - 200.0);
            } else {
                assert_eq!(o.rect.y, GROUND_Y);
            }
            assert_eq!(o.rect.x, SPAWN_X);
        }
    }

    #[test]
    fn test_heavy_weather_leaves_room_for_bursts() {
        let mut state = RunState::new(9, GameMode::Story);
        let stormiest = ACTS
            .iter()
            .max_by(|a, b| a.weather_intensity.total_cmp(&b.weather_intensity))
            .expect("acts");
        for _ in 0..600 {
            spawn_weather(&mut state, stormiest, 1.0 / 60.0);
        }
        assert!(state.particles.len() <= state.weather_cap());
        assert!(state.particles.len() > state.weather_cap() / 2);

        let before = state.particles.len();
        state.burst(Vec2::new(100.0, 100.0), ParticleKind::Sparkle, 20, rgb(0xffffff));
        assert_eq!(state.particles.len(), before + 20);
    }

    #[test]
    fn test_zero_world_time_spawns_nothing() {
        let mut state = RunState::new(5, GameMode::Story);
        for _ in 0..10_000 {
            run_spawners(&mut state, &ACTS[2], 0.0);
        }
        assert!(state.obstacles.is_empty());
        assert!(state.powerups.is_empty());
        assert!(state.particles.is_empty());
    }
}
