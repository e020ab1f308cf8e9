//! Per-frame simulation update
//!
//! World time (`dt` scaled by the time-dilation factor) drives scrolling,
//! spawning and buff countdowns. Real time drives the player's own
//! physics, projectiles, the run clock and the time-warp countdown itself,
//! so time warp slows the world without slowing the sleigh.

use glam::Vec2;

use super::collision::collides;
use super::narrative::{check_ending, expire_text, fire_triggers, update_act};
use super::spawn::run_spawners;
use super::state::{
    CollectedPowerup, GameEvent, ObstacleKind, ParticleKind, PowerupKind, Projectile, Rect,
    RunState, TimedText,
};
use crate::consts::*;
use crate::rgb;
use crate::tuning::{
    ACTS, SNOWBALLS_PER_PICKUP, SPEED_BUFF_MULTIPLIER, powerup_color, powerup_duration,
};

/// Entities are retired once fully past these x positions
const OBSTACLE_EXIT_X: f32 = -100.0;
const POWERUP_EXIT_X: f32 = -50.0;
const LANDMARK_EXIT_X: f32 = -300.0;
/// Gear obstacles spin this fast (radians per world second)
const GEAR_SPIN: f32 = 3.0;
/// Powerups and letters bob at this rate (radians per world second)
const FLOAT_RATE: f32 = 3.0;

/// Clamp a raw frame delta into `[0, MAX_FRAME_DT]`
#[inline]
pub fn clamp_dt(dt: f32) -> f32 {
    if dt.is_finite() {
        dt.clamp(0.0, MAX_FRAME_DT)
    } else {
        0.0
    }
}

/// World scroll speed for a progress ratio (pixels/s)
pub fn world_speed(progress: f32, speed_buff: bool) -> f32 {
    let multiplier = if speed_buff { SPEED_BUFF_MULTIPLIER } else { 1.0 };
    (BASE_SPEED + progress * PROGRESS_SPEED_BONUS) * multiplier
}

/// Start a jump; ignored during the ending
pub fn jump(state: &mut RunState) -> bool {
    if state.ending {
        return false;
    }
    state.player.vy = JUMP_VELOCITY;
    let pos = Vec2::new(state.player.rect.x, state.player.rect.y + 20.0);
    state.burst(pos, ParticleKind::Smoke, 3, rgb(0xffffff));
    state.events.push(GameEvent::Jump);
    true
}

/// Throw a snowball if there is ammo; ignored during the ending
pub fn shoot(state: &mut RunState) -> bool {
    if state.ending || state.player.snowballs == 0 {
        return false;
    }
    state.player.snowballs -= 1;
    let id = state.next_entity_id();
    let rect = state.player.rect;
    state.projectiles.push(Projectile {
        id,
        rect: Rect::new(
            rect.right(),
            rect.y + rect.height / 2.0,
            PROJECTILE_SIZE,
            PROJECTILE_SIZE,
        ),
        vx: PROJECTILE_SPEED,
        trail: Vec::new(),
        dead: false,
    });
    state.events.push(GameEvent::Shoot);
    true
}

/// Advance the run by one frame of `dt` real seconds
pub fn update(state: &mut RunState, dt: f32) {
    let dt = clamp_dt(dt);
    let world_dt = dt * state.time_factor();

    // Clocks and timers
    state.time_left = (state.time_left - dt).max(0.0);
    state.clock += dt;
    let player = &mut state.player;
    player.time_warp_timer = (player.time_warp_timer - dt).max(0.0);
    player.speed_timer = (player.speed_timer - world_dt).max(0.0);
    player.healing_timer = (player.healing_timer - world_dt).max(0.0);
    player.invincible_timer = (player.invincible_timer - world_dt).max(0.0);
    state.flash_timer = (state.flash_timer - dt).max(0.0);

    // Progress, act and speed
    let progress = state.progress();
    let act_index = update_act(state, progress);
    let act = &ACTS[act_index];
    let speed = world_speed(progress, state.player.speed_timer > 0.0);
    state.current_speed = speed;

    fire_triggers(state, progress);
    check_ending(state, progress);

    if !state.ending {
        state.distance += speed * world_dt;
        state.score += speed * SCORE_PER_DISTANCE * world_dt;
        integrate_player(state, dt);
        run_spawners(state, act, world_dt);
    }

    // Parallax terrain
    for layer in state.terrain.iter_mut() {
        layer.scroll(speed * layer.speed * world_dt, &mut state.rng);
    }

    update_obstacles(state, speed * act.obstacle_speed_multiplier * world_dt, world_dt);
    update_pickups(state, speed * world_dt, world_dt);
    update_projectiles(state, dt);
    update_particles(state, dt, speed * world_dt);

    // Camera shake decays per nominal frame
    state.shake *= SHAKE_DECAY.powf(dt * NOMINAL_FPS);
    if state.shake < 0.01 {
        state.shake = 0.0;
    }

    expire_text(state);
    state.sweep();
}

/// Gravity, integration, floor/ceiling clamp and tilt
fn integrate_player(state: &mut RunState, dt: f32) {
    let player = &mut state.player;
    player.vy += GRAVITY * dt;
    player.rect.y += player.vy * dt;

    let floor = PLAY_FIELD_HEIGHT - player.rect.height;
    if player.rect.y > floor {
        player.rect.y = floor;
        player.vy = 0.0;
    }
    if player.rect.y < 0.0 {
        player.rect.y = 0.0;
        player.vy = 0.0;
    }

    let target = (player.vy * TILT_PER_VELOCITY).clamp(-MAX_TILT, MAX_TILT);
    player.angle += (target - player.angle) * (1.0 - (-TILT_RATE * dt).exp());
}

fn update_obstacles(state: &mut RunState, dx: f32, world_dt: f32) {
    let player_rect = state.player.rect;
    let vulnerable = !state.cinematic && !state.player.is_invincible();
    let mut crashed = false;

    for obstacle in state.obstacles.iter_mut() {
        obstacle.rect.x -= dx;
        if obstacle.kind.spins() {
            obstacle.rotation += GEAR_SPIN * world_dt;
        }
        if obstacle.rect.x < OBSTACLE_EXIT_X {
            obstacle.dead = true;
        }
        // One crash per frame; the invincibility it grants covers the rest
        if vulnerable && !crashed && !obstacle.dead && collides(&player_rect, &obstacle.rect) {
            obstacle.dead = true;
            crashed = true;
        }
    }

    if crashed {
        let player = &mut state.player;
        player.lives = (player.lives - 1).max(0);
        player.invincible_timer = INVINCIBILITY_SECS;
        state.shake = CRASH_SHAKE;
        let lives = player.lives;
        log::debug!("Crash, {} lives left", lives);
        state.burst(
            Vec2::new(player_rect.x, player_rect.y),
            ParticleKind::Debris,
            15,
            rgb(0xef4444),
        );
        state.events.push(GameEvent::Crash { lives });
    }
}

/// Powerups, letters and landmarks all scroll at plain world speed
fn update_pickups(state: &mut RunState, dx: f32, world_dt: f32) {
    let player_rect = state.player.rect;
    let mut collected: Vec<(u32, PowerupKind, Vec2)> = Vec::new();

    for powerup in state.powerups.iter_mut() {
        powerup.rect.x -= dx;
        powerup.float_phase += FLOAT_RATE * world_dt;
        if powerup.rect.x < POWERUP_EXIT_X {
            powerup.dead = true;
        } else if collides(&player_rect, &powerup.rect) {
            powerup.dead = true;
            collected.push((powerup.id, powerup.kind, powerup.rect.center()));
        }
    }

    for (id, kind, pos) in collected {
        log::debug!("Collected {:?}", kind);
        apply_powerup(state, kind);
        state.collected.push(CollectedPowerup { id, kind });
        state.burst(pos, ParticleKind::Sparkle, 20, powerup_color(kind));
        state.events.push(GameEvent::PowerupCollected(kind));
    }

    let mut wishes: Vec<(&'static str, Vec2)> = Vec::new();
    for letter in state.letters.iter_mut() {
        letter.rect.x -= dx;
        letter.float_phase += FLOAT_RATE * world_dt;
        if letter.rect.x < POWERUP_EXIT_X {
            letter.dead = true;
        } else if collides(&player_rect, &letter.rect) {
            letter.dead = true;
            wishes.push((letter.message, letter.rect.center()));
        }
    }
    for (message, pos) in wishes {
        state.wish = Some(TimedText {
            value: message,
            expires_at: state.clock + WISH_SECS,
        });
        state.burst(pos, ParticleKind::Glow, 12, rgb(0xfde68a));
        state.events.push(GameEvent::LetterCollected);
    }

    for landmark in state.landmarks.iter_mut() {
        landmark.rect.x -= dx;
        if landmark.rect.x < LANDMARK_EXIT_X {
            landmark.dead = true;
        }
    }
}

/// Particles thrown off by a destroyed obstacle
fn wreckage(kind: ObstacleKind) -> (ParticleKind, [f32; 4]) {
    match kind {
        ObstacleKind::GlitchBlock => (ParticleKind::Glitch, rgb(0xd946ef)),
        _ => (ParticleKind::Debris, rgb(0xffffff)),
    }
}

/// Apply a pickup's effect to the player
pub fn apply_powerup(state: &mut RunState, kind: PowerupKind) {
    let duration = powerup_duration(kind).unwrap_or(0.0);
    match kind {
        PowerupKind::TimeWarp => state.player.time_warp_timer = duration,
        PowerupKind::Speed => state.player.speed_timer = duration,
        PowerupKind::Healing => {
            state.player.healing_timer = duration;
            state.player.lives = (state.player.lives + 1).min(MAX_LIVES);
            let pos = state.player.rect.center();
            state.burst(pos, ParticleKind::Life, 10, rgb(0x22c55e));
        }
        PowerupKind::Snowballs => state.player.snowballs += SNOWBALLS_PER_PICKUP,
        PowerupKind::Blast => {
            let mut glitched: Vec<Vec2> = Vec::new();
            let mut cleared = 0;
            for obstacle in state.obstacles.iter_mut() {
                let on_screen = obstacle.rect.x < CANVAS_WIDTH && obstacle.rect.right() > 0.0;
                if on_screen && !obstacle.dead {
                    obstacle.dead = true;
                    cleared += 1;
                    if obstacle.kind == ObstacleKind::GlitchBlock {
                        glitched.push(obstacle.rect.center());
                    }
                }
            }
            state.score += cleared as f32 * SCORE_PER_OBSTACLE;
            for pos in glitched {
                let (kind, color) = wreckage(ObstacleKind::GlitchBlock);
                state.burst(pos, kind, 8, color);
            }
            state.shake = state.shake.max(CRASH_SHAKE / 2.0);
            let pos = state.player.rect.center();
            state.burst(pos, ParticleKind::Shockwave, 24, rgb(0xeab308));
            log::debug!("Blast cleared {} obstacles", cleared);
        }
    }
}

fn update_projectiles(state: &mut RunState, dt: f32) {
    let mut hits: Vec<(ObstacleKind, Vec2)> = Vec::new();

    for projectile in state.projectiles.iter_mut() {
        projectile.rect.x += projectile.vx * dt;
        projectile.record_trail();
        if projectile.rect.x > CANVAS_WIDTH {
            projectile.dead = true;
            continue;
        }
        for obstacle in state.obstacles.iter_mut() {
            if !obstacle.dead && collides(&projectile.rect, &obstacle.rect) {
                obstacle.dead = true;
                projectile.dead = true;
                hits.push((obstacle.kind, Vec2::new(obstacle.rect.x, obstacle.rect.y)));
                break;
            }
        }
    }

    for (obstacle, pos) in hits {
        state.score += SCORE_PER_OBSTACLE;
        let (kind, color) = wreckage(obstacle);
        state.burst(pos, kind, 10, color);
        state.events.push(GameEvent::ObstacleDestroyed);
    }
}

fn update_particles(state: &mut RunState, dt: f32, world_dx: f32) {
    for particle in state.particles.iter_mut() {
        particle.pos += particle.vel * dt;
        particle.life -= particle.decay * dt;
        if particle.kind == ParticleKind::Snow {
            particle.pos.x -= world_dx * 0.5;
        }
    }
}
