//! Scene tessellation
//!
//! Turns a [`RunState`] into a canvas-space triangle list, back to front.
//! Background props and render-only randomness (shake jitter, glitch
//! triggers, glitch colours) belong to the renderer so drawing never
//! touches the simulation's RNG.

use std::f32::consts::PI;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::painter::Painter;
use super::shapes;
use super::vertex::{Vertex, colors};
use crate::consts::*;
use crate::settings::{QualityPreset, Settings};
use crate::sim::state::{
    Landmark, LandmarkKind, Letter, Obstacle, ObstacleKind, ParticleKind, Player, Powerup,
    PowerupKind, Projectile, RunState, TERRAIN_STEP, TerrainLayer,
};
use crate::tuning::{ACTS, ActConfig, AmbientEffect, TerrainStyle, powerup_color};
use crate::{lerp_color, rgb, with_alpha};

/// Frames a glitch persists once triggered
const GLITCH_FRAMES: u32 = 5;
/// Background gear count
const GEAR_COUNT: usize = 5;
/// Far to near terrain opacity
const TERRAIN_ALPHA: [f32; 3] = [0.7, 0.85, 1.0];
/// Curve subdivisions per terrain sample
const SMOOTH_STEPS: usize = 4;
const SPIKE_HEIGHT: f32 = 30.0;
const FOG_HEIGHT: f32 = 90.0;
const CIRCLE_SEGMENTS: u32 = 20;

#[derive(Debug, Clone)]
struct Star {
    pos: Vec2,
    size: f32,
    phase: f32,
}

#[derive(Debug, Clone)]
struct BackgroundGear {
    pos: Vec2,
    radius: f32,
    teeth: u32,
    /// Angular speed (radians/s)
    speed: f32,
}

/// Owns the background props and draws frames
#[derive(Debug, Clone)]
pub struct SceneRenderer {
    rng: Pcg32,
    stars: Vec<Star>,
    gears: Vec<BackgroundGear>,
    glitch_frames: u32,
    glitch_offset: Vec2,
    last_vertex_count: usize,
}

impl SceneRenderer {
    pub fn new(seed: u64, quality: QualityPreset) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let stars = generate_stars(&mut rng, quality.star_count());
        let gears = (0..GEAR_COUNT)
            .map(|_| BackgroundGear {
                pos: Vec2::new(
                    rng.random::<f32>() * CANVAS_WIDTH,
                    rng.random::<f32>() * CANVAS_HEIGHT,
                ),
                radius: rng.random_range(30.0..80.0),
                teeth: rng.random_range(8..16),
                speed: (rng.random::<f32>() - 0.5) * 0.02 * NOMINAL_FPS,
            })
            .collect();
        Self {
            rng,
            stars,
            gears,
            glitch_frames: 0,
            glitch_offset: Vec2::ZERO,
            last_vertex_count: 0,
        }
    }

    pub fn star_count(&self) -> usize {
        self.stars.len()
    }

    /// Frames left on the current glitch
    pub fn glitch_frames(&self) -> u32 {
        self.glitch_frames
    }

    /// Regenerate the star field when the preset's star count changes
    pub fn set_quality(&mut self, quality: QualityPreset) {
        if self.stars.len() != quality.star_count() {
            self.stars = generate_stars(&mut self.rng, quality.star_count());
        }
    }

    /// Build one frame
    pub fn draw(&mut self, state: &RunState, time_ms: f64, settings: &Settings) -> Vec<Vertex> {
        self.set_quality(settings.quality);
        let act = &ACTS[state.act()];
        let secs = (time_ms / 1000.0) as f32;
        let mut painter = Painter::with_capacity(self.last_vertex_count);

        self.roll_glitch(act, settings);
        let glitching = self.glitch_frames > 0;
        if glitching {
            painter.save();
            painter.translate(self.glitch_offset);
        }

        painter.fill(shapes::gradient_rect(
            0.0,
            0.0,
            CANVAS_WIDTH,
            CANVAS_HEIGHT,
            act.sky[0],
            act.sky[1],
        ));
        draw_ambient(&mut painter, act.ambient, state, secs);
        self.draw_stars(&mut painter, time_ms);
        if act.gears {
            for gear in &self.gears {
                draw_gear(
                    &mut painter,
                    gear.pos,
                    gear.radius,
                    gear.teeth,
                    gear.speed * secs,
                    colors::GEAR_SKY,
                );
            }
        }
        draw_terrain(&mut painter, &state.terrain, act, settings.quality.fog_enabled());

        painter.save();
        if settings.effective_screen_shake() && state.shake > 0.0 {
            let jitter = Vec2::new(
                self.rng.random::<f32>() - 0.5,
                self.rng.random::<f32>() - 0.5,
            );
            painter.translate(jitter * state.shake);
        }

        for landmark in &state.landmarks {
            draw_landmark(&mut painter, landmark, secs);
        }
        for obstacle in &state.obstacles {
            self.draw_obstacle(&mut painter, obstacle);
        }
        for powerup in &state.powerups {
            draw_powerup(&mut painter, powerup);
        }
        for letter in &state.letters {
            draw_letter(&mut painter, letter);
        }
        for projectile in &state.projectiles {
            draw_projectile(&mut painter, projectile);
        }
        draw_player(&mut painter, &state.player, time_ms, secs);
        for particle in &state.particles {
            painter.set_alpha(particle.life);
            if particle.kind == ParticleKind::Glitch {
                painter.fill(shapes::rect(
                    particle.pos.x,
                    particle.pos.y,
                    particle.radius,
                    particle.radius,
                    particle.color,
                ));
            } else {
                painter.fill(shapes::circle(particle.pos, particle.radius, particle.color, 8));
            }
        }
        painter.set_alpha(1.0);
        draw_vignette(&mut painter);
        painter.restore();

        if glitching {
            painter.restore();
            self.glitch_frames -= 1;
        }

        if settings.effective_act_flash() && state.flash_timer > 0.0 {
            painter.fill(shapes::rect(
                0.0,
                0.0,
                CANVAS_WIDTH,
                CANVAS_HEIGHT,
                with_alpha(colors::WHITE, state.flash_timer.min(1.0)),
            ));
        }
        if glitching {
            self.draw_glitch_overlay(&mut painter);
        }

        let vertices = painter.finish();
        self.last_vertex_count = vertices.len();
        vertices
    }

    fn roll_glitch(&mut self, act: &ActConfig, settings: &Settings) {
        if !settings.effective_glitch() {
            self.glitch_frames = 0;
            return;
        }
        if self.rng.random::<f32>() < act.glitch_intensity * 0.1 {
            self.glitch_offset = Vec2::new(
                (self.rng.random::<f32>() - 0.5) * 10.0,
                (self.rng.random::<f32>() - 0.5) * 5.0,
            );
            self.glitch_frames = GLITCH_FRAMES;
        }
    }

    fn draw_stars(&self, painter: &mut Painter, time_ms: f64) {
        for star in &self.stars {
            let alpha = 0.5 + 0.5 * (time_ms * 0.005 + star.phase as f64).sin() as f32;
            painter.fill(shapes::circle(
                star.pos,
                star.size,
                with_alpha(colors::WHITE, alpha),
                8,
            ));
        }
    }

    fn draw_obstacle(&mut self, painter: &mut Painter, obstacle: &Obstacle) {
        let r = &obstacle.rect;
        let (w, h) = (r.width, r.height);
        painter.save();
        painter.translate(Vec2::new(r.x, r.y));
        match obstacle.kind {
            ObstacleKind::Tree => {
                painter.fill(shapes::rect(w * 0.4, h * 0.75, w * 0.2, h * 0.25, colors::TRUNK));
                painter.fill(shapes::polygon(
                    &[Vec2::new(w / 2.0, 0.0), Vec2::new(w, h * 0.8), Vec2::new(0.0, h * 0.8)],
                    colors::TREE,
                ));
                painter.fill(shapes::polygon(
                    &[Vec2::new(w / 2.0, 0.0), Vec2::new(w * 0.7, h * 0.3), Vec2::new(w * 0.3, h * 0.3)],
                    colors::SNOW,
                ));
            }
            ObstacleKind::Bird => {
                let flap = (obstacle.rect.x * 0.05).sin() * h * 0.4;
                let body = Vec2::new(w / 2.0, h / 2.0);
                painter.fill(shapes::polygon(
                    &[body, Vec2::new(0.0, h / 2.0 - flap), Vec2::new(w * 0.3, h / 2.0)],
                    colors::BIRD,
                ));
                painter.fill(shapes::polygon(
                    &[body, Vec2::new(w * 0.7, h / 2.0), Vec2::new(w, h / 2.0 - flap)],
                    colors::BIRD,
                ));
                painter.fill(shapes::circle(body, h * 0.2, colors::BIRD, 12));
            }
            ObstacleKind::Snowman => {
                painter.fill(shapes::circle(Vec2::new(w / 2.0, h * 0.7), w * 0.3, colors::SNOW, CIRCLE_SEGMENTS));
                painter.fill(shapes::circle(Vec2::new(w / 2.0, h * 0.3), w * 0.2, colors::SNOW, CIRCLE_SEGMENTS));
                painter.fill(shapes::rect(w * 0.35, 0.0, w * 0.3, h * 0.12, colors::GEAR_HUB));
                painter.fill(shapes::circle(Vec2::new(w * 0.55, h * 0.3), 2.5, colors::RUNNER, 6));
            }
            ObstacleKind::Building => {
                painter.fill(shapes::rect(0.0, 0.0, w, h, colors::BUILDING));
                for row in 0..3 {
                    for col in 0..2 {
                        painter.fill(shapes::rect(
                            w * (0.2 + col as f32 * 0.4),
                            h * (0.15 + row as f32 * 0.28),
                            w * 0.2,
                            h * 0.14,
                            colors::WINDOW,
                        ));
                    }
                }
            }
            ObstacleKind::Cloud => {
                for (cx, cy, radius) in [(0.3, 0.6, 0.25), (0.55, 0.4, 0.3), (0.75, 0.6, 0.22)] {
                    painter.fill(shapes::circle(
                        Vec2::new(w * cx, h * cy),
                        w * radius,
                        colors::CLOUD,
                        CIRCLE_SEGMENTS,
                    ));
                }
            }
            ObstacleKind::Gear => {
                let radius = w.min(h) / 2.0 - 5.0;
                draw_gear(
                    painter,
                    Vec2::new(w / 2.0, h / 2.0),
                    radius,
                    6,
                    obstacle.rotation,
                    colors::GEAR_OBSTACLE,
                );
            }
            ObstacleKind::GlitchBlock => {
                let color = [self.rng.random::<f32>(), 0.0, self.rng.random::<f32>(), 1.0];
                painter.fill(shapes::rect(0.0, 0.0, w, h, color));
            }
        }
        painter.restore();
    }

    fn draw_glitch_overlay(&mut self, painter: &mut Painter) {
        let tint = if self.rng.random_bool(0.5) {
            rgb(0xff00ff)
        } else {
            rgb(0x00ffff)
        };
        painter.fill(shapes::rect(0.0, 0.0, CANVAS_WIDTH, CANVAS_HEIGHT, with_alpha(tint, 0.08)));
        for _ in 0..3 {
            let y = self.rng.random::<f32>() * CANVAS_HEIGHT;
            let height = self.rng.random_range(2.0..12.0);
            let shift = (self.rng.random::<f32>() - 0.5) * 20.0;
            painter.fill(shapes::rect(shift, y, CANVAS_WIDTH, height, with_alpha(tint, 0.25)));
        }
    }
}

fn generate_stars(rng: &mut Pcg32, count: usize) -> Vec<Star> {
    (0..count)
        .map(|_| Star {
            pos: Vec2::new(
                rng.random::<f32>() * CANVAS_WIDTH,
                rng.random::<f32>() * (CANVAS_HEIGHT / 2.0),
            ),
            size: rng.random::<f32>() * 2.0 + 1.0,
            phase: rng.random::<f32>() * PI * 2.0,
        })
        .collect()
}

/// Deterministic hash in [0, 1) for stateless background motion
fn hash01(i: u32) -> f32 {
    ((i as f32 * 12.9898).sin() * 43_758.547).fract().abs()
}

/// Append a tessellated quadratic curve from `from` (excluded) to `to`
fn quadratic(from: Vec2, control: Vec2, to: Vec2, steps: usize, out: &mut Vec<Vec2>) {
    for s in 1..=steps {
        let t = s as f32 / steps as f32;
        let u = 1.0 - t;
        out.push(from * (u * u) + control * (2.0 * u * t) + to * (t * t));
    }
}

/// Gear outline alternating between tooth tip and root
fn gear_outline(radius: f32, teeth: u32) -> Vec<Vec2> {
    let points = teeth * 2;
    (0..points)
        .map(|i| {
            let angle = 2.0 * PI * i as f32 / points as f32;
            let r = if i % 2 == 0 { radius + 5.0 } else { radius };
            Vec2::from_angle(angle) * r
        })
        .collect()
}

fn draw_gear(painter: &mut Painter, center: Vec2, radius: f32, teeth: u32, angle: f32, color: [f32; 4]) {
    painter.save();
    painter.translate(center);
    painter.rotate(angle);
    painter.fill(shapes::star_fan(Vec2::ZERO, &gear_outline(radius, teeth), color));
    painter.fill(shapes::circle(Vec2::ZERO, (radius - 5.0) / 2.0, colors::GEAR_HUB, 16));
    painter.restore();
}

fn draw_ambient(painter: &mut Painter, effect: AmbientEffect, state: &RunState, secs: f32) {
    match effect {
        AmbientEffect::Aurora => {
            let bands = [
                with_alpha(rgb(0x22c55e), 0.12),
                with_alpha(rgb(0x2dd4bf), 0.10),
                with_alpha(rgb(0xa855f7), 0.08),
            ];
            for (band, color) in bands.into_iter().enumerate() {
                let b = band as f32;
                let points: Vec<Vec2> = (0..=32)
                    .map(|i| {
                        let x = -50.0 + i as f32 * 40.0;
                        let y = 90.0 + b * 35.0 + (x * 0.004 + secs * 0.6 + b * 1.7).sin() * 25.0;
                        Vec2::new(x, y)
                    })
                    .collect();
                painter.fill(shapes::polyline(&points, 36.0, color));
            }
        }
        AmbientEffect::Haze => {
            let haze = rgb(0xa1a1aa);
            for i in 0..4 {
                let y = 150.0 + i as f32 * 90.0 + (secs * 0.3 + i as f32).sin() * 10.0;
                painter.fill(shapes::gradient_rect(
                    0.0,
                    y,
                    CANVAS_WIDTH,
                    80.0,
                    with_alpha(haze, 0.0),
                    with_alpha(haze, 0.12),
                ));
            }
        }
        AmbientEffect::Grid => {
            let color = with_alpha(rgb(0xc084fc), 0.25);
            let horizon = CANVAS_HEIGHT * 0.45;
            for i in 1..=10 {
                let t = i as f32 / 10.0;
                let y = horizon + (CANVAS_HEIGHT - horizon) * t * t;
                painter.fill(shapes::line(Vec2::new(0.0, y), Vec2::new(CANVAS_WIDTH, y), 1.0, color));
            }
            let spacing = 80.0;
            let scroll = (state.distance * 0.5).rem_euclid(spacing);
            for k in -8..24 {
                let bottom = k as f32 * spacing - scroll;
                let top = CANVAS_WIDTH / 2.0 + (bottom - CANVAS_WIDTH / 2.0) * 0.1;
                painter.fill(shapes::line(
                    Vec2::new(top, horizon),
                    Vec2::new(bottom, CANVAS_HEIGHT),
                    1.0,
                    color,
                ));
            }
        }
        AmbientEffect::Embers => {
            let ember = rgb(0xf97316);
            for i in 0..40u32 {
                let x = (hash01(i) * CANVAS_WIDTH - secs * 30.0 * (0.5 + hash01(i + 100)))
                    .rem_euclid(CANVAS_WIDTH);
                let rise = secs * 60.0 * (0.5 + hash01(i + 200)) + hash01(i + 300) * CANVAS_HEIGHT;
                let y = CANVAS_HEIGHT - rise.rem_euclid(CANVAS_HEIGHT);
                let alpha = 0.4 + 0.4 * (secs * 4.0 + i as f32).sin();
                painter.fill(shapes::circle(
                    Vec2::new(x, y),
                    1.5 + hash01(i + 400) * 2.0,
                    with_alpha(ember, alpha),
                    6,
                ));
            }
        }
        AmbientEffect::Rift => {
            let center = Vec2::new(CANVAS_WIDTH / 2.0, CANVAS_HEIGHT * 0.4);
            let radius = 140.0 + (secs * 2.0).sin() * 15.0;
            let violet = rgb(0x7c3aed);
            painter.fill(shapes::glow(
                center,
                radius * 1.6,
                with_alpha(colors::WHITE, 0.7),
                with_alpha(rgb(0xc4b5fd), 0.0),
                48,
            ));
            painter.fill(shapes::ring(center, radius, radius + 4.0, with_alpha(violet, 0.6), 48));
            painter.fill(shapes::dashed_ring(
                center,
                radius * 1.25,
                2.0,
                24,
                -secs * 0.5,
                with_alpha(violet, 0.4),
            ));
        }
    }
}

/// Canvas-space outline of a terrain layer in the given style
fn terrain_outline(layer: &TerrainLayer, style: TerrainStyle) -> Vec<Vec2> {
    let points: Vec<Vec2> = layer
        .samples
        .iter()
        .enumerate()
        .map(|(i, &sample)| Vec2::new(layer.offset + i as f32 * TERRAIN_STEP, layer.base_y + sample))
        .collect();
    if points.len() < 2 {
        return points;
    }

    match style {
        TerrainStyle::Jagged => points,
        TerrainStyle::Smooth => {
            let mut out = vec![points[0]];
            for i in 1..points.len() - 1 {
                let mid = (points[i] + points[i + 1]) / 2.0;
                let from = out[out.len() - 1];
                quadratic(from, points[i], mid, SMOOTH_STEPS, &mut out);
            }
            out
        }
        TerrainStyle::Stepped => points
            .windows(2)
            .flat_map(|pair| [pair[0], Vec2::new(pair[1].x, pair[0].y)])
            .collect(),
        TerrainStyle::Spiked => {
            let mut out = Vec::with_capacity(points.len() * 2);
            for pair in points.windows(2) {
                out.push(pair[0]);
                out.push(Vec2::new(
                    (pair[0].x + pair[1].x) / 2.0,
                    pair[0].y.min(pair[1].y) - SPIKE_HEIGHT,
                ));
            }
            out.push(points[points.len() - 1]);
            out
        }
    }
}

fn draw_terrain(painter: &mut Painter, layers: &[TerrainLayer; 3], act: &ActConfig, fog: bool) {
    for (i, layer) in layers.iter().enumerate() {
        if fog && i > 0 {
            let haze = act.sky[1];
            painter.fill(shapes::gradient_rect(
                0.0,
                layer.base_y - FOG_HEIGHT,
                CANVAS_WIDTH,
                FOG_HEIGHT + 40.0,
                with_alpha(haze, 0.0),
                with_alpha(haze, 0.35),
            ));
        }
        let color = with_alpha(act.terrain_colors[i], TERRAIN_ALPHA[i]);
        let outline = terrain_outline(layer, act.terrain);
        painter.fill(shapes::silhouette(&outline, CANVAS_HEIGHT, color));
    }
}

fn draw_landmark(painter: &mut Painter, landmark: &Landmark, secs: f32) {
    let r = &landmark.rect;
    let (w, h) = (r.width, r.height);
    painter.save();
    painter.translate(Vec2::new(r.x, r.y));
    match landmark.kind {
        LandmarkKind::ClockTower => {
            painter.fill(shapes::rect(0.0, 0.0, w, h, colors::TOWER));
            let face = Vec2::new(w / 2.0, 50.0);
            painter.fill(shapes::circle(face, 40.0, colors::CLOCK_FACE, 32));
            let hour = Vec2::from_angle(secs * 0.1 - PI / 2.0) * 20.0;
            let minute = Vec2::from_angle(secs * 1.2 - PI / 2.0) * 32.0;
            painter.fill(shapes::line(face, face + hour, 4.0, colors::TOWER));
            painter.fill(shapes::line(face, face + minute, 2.5, colors::TOWER));
        }
        LandmarkKind::Ruins => {
            let column = w / 7.0;
            for (i, height) in [1.0, 0.6, 0.85, 0.4, 0.7].into_iter().enumerate() {
                let x = i as f32 * (w - column) / 4.0;
                painter.fill(shapes::rect(x, h * (1.0 - height), column, h * height, colors::RUINS));
            }
            painter.fill(shapes::rect(0.0, 0.0, w * 0.55, 20.0, colors::RUINS));
        }
        LandmarkKind::FinalConstruct => {
            let center = Vec2::new(w / 2.0, h / 2.0);
            let pulse = 1.0 + 0.1 * (secs * 3.0).sin();
            painter.fill(shapes::glow(
                center,
                w / 2.0 * pulse,
                with_alpha(colors::CORE, 0.8),
                with_alpha(colors::CORE, 0.0),
                48,
            ));
            painter.fill(shapes::ring(center, w * 0.35, w * 0.35 + 6.0, with_alpha(colors::WHITE, 0.7), 48));
            painter.fill(shapes::dashed_ring(center, w * 0.42, 3.0, 18, secs, colors::CORE));
            painter.fill(shapes::circle(center, 30.0, colors::WHITE, CIRCLE_SEGMENTS));
        }
    }
    painter.restore();
}

fn draw_powerup(painter: &mut Painter, powerup: &Powerup) {
    let color = powerup_color(powerup.kind);
    let center = powerup.rect.center() + Vec2::new(0.0, powerup.float_phase.sin() * 5.0);
    painter.fill(shapes::glow(center, 28.0, with_alpha(color, 0.5), with_alpha(color, 0.0), 24));
    painter.fill(shapes::circle(center, 15.0, color, CIRCLE_SEGMENTS));

    painter.save();
    painter.translate(center);
    let white = colors::WHITE;
    match powerup.kind {
        PowerupKind::Speed => {
            let bolt = [
                Vec2::new(3.0, -8.0),
                Vec2::new(-3.0, 1.0),
                Vec2::new(3.0, 1.0),
                Vec2::new(-3.0, 8.0),
            ];
            painter.fill(shapes::polyline(&bolt, 2.5, white));
        }
        PowerupKind::Snowballs => {
            painter.fill(shapes::circle(Vec2::ZERO, 5.0, white, 12));
        }
        PowerupKind::Blast => {
            let outline: Vec<Vec2> = (0..10)
                .map(|i| {
                    let r = if i % 2 == 0 { 8.0 } else { 3.5 };
                    Vec2::from_angle(i as f32 * PI / 5.0 - PI / 2.0) * r
                })
                .collect();
            painter.fill(shapes::star_fan(Vec2::ZERO, &outline, white));
        }
        PowerupKind::Healing => {
            painter.fill(shapes::rect(-2.0, -7.0, 4.0, 14.0, white));
            painter.fill(shapes::rect(-7.0, -2.0, 14.0, 4.0, white));
        }
        PowerupKind::TimeWarp => {
            painter.fill(shapes::polygon(
                &[Vec2::new(-6.0, -8.0), Vec2::new(6.0, -8.0), Vec2::ZERO],
                white,
            ));
            painter.fill(shapes::polygon(
                &[Vec2::ZERO, Vec2::new(6.0, 8.0), Vec2::new(-6.0, 8.0)],
                white,
            ));
        }
    }
    painter.restore();
}

fn draw_letter(painter: &mut Painter, letter: &Letter) {
    let r = &letter.rect;
    let bob = letter.float_phase.sin() * 5.0;
    let center = r.center() + Vec2::new(0.0, bob);
    painter.fill(shapes::glow(
        center,
        30.0,
        with_alpha(colors::WINDOW, 0.4),
        with_alpha(colors::WINDOW, 0.0),
        20,
    ));

    painter.save();
    painter.translate(Vec2::new(r.x, r.y + bob));
    painter.fill(shapes::rect(0.0, 0.0, r.width, r.height, colors::ENVELOPE));
    painter.fill(shapes::polygon(
        &[
            Vec2::ZERO,
            Vec2::new(r.width, 0.0),
            Vec2::new(r.width / 2.0, r.height / 2.0),
        ],
        lerp_color(colors::ENVELOPE, colors::TRUNK, 0.25),
    ));
    painter.fill(shapes::circle(
        Vec2::new(r.width / 2.0, r.height / 2.0),
        4.0,
        colors::SEAL,
        10,
    ));
    painter.restore();
}

fn draw_projectile(painter: &mut Painter, projectile: &Projectile) {
    let radius = projectile.rect.width / 2.0;
    let center = projectile.rect.center();
    let oldest_first: Vec<Vec2> = projectile.trail.iter().rev().copied().collect();
    painter.fill(shapes::trail(&oldest_first, radius, colors::WHITE));
    painter.fill(shapes::glow(
        center,
        radius * 2.0,
        with_alpha(colors::WHITE, 0.5),
        with_alpha(colors::WHITE, 0.0),
        16,
    ));
    painter.fill(shapes::circle(center, radius, colors::WHITE, 12));
}

fn draw_player(painter: &mut Painter, player: &Player, time_ms: f64, secs: f32) {
    if player.is_invincible() && (time_ms / 50.0).floor() as i64 % 2 == 0 {
        return;
    }

    painter.save();
    painter.translate(player.rect.center());
    painter.rotate(player.angle);

    painter.fill(shapes::rect(-30.0, 0.0, 60.0, 20.0, colors::SLEIGH));
    let mut runner = vec![Vec2::new(-25.0, 20.0)];
    quadratic(runner[0], Vec2::new(0.0, 25.0), Vec2::new(25.0, 20.0), 8, &mut runner);
    painter.fill(shapes::polyline(&runner, 3.0, colors::RUNNER));

    if player.time_warp_active() {
        painter.fill(shapes::dashed_ring(Vec2::ZERO, 50.0, 2.0, 32, secs, colors::WARP_AURA));
    }

    painter.fill(shapes::circle(Vec2::new(0.0, -10.0), 8.0, colors::SANTA_FACE, 16));
    painter.fill(shapes::polygon(
        &[Vec2::new(-8.0, -14.0), Vec2::new(8.0, -14.0), Vec2::new(0.0, -28.0)],
        colors::SANTA_HAT,
    ));
    painter.restore();
}

fn draw_vignette(painter: &mut Painter) {
    let edge = colors::VIGNETTE;
    let clear = with_alpha(edge, 0.0);
    let band = 140.0;
    // Overdraw past the edges so shake never uncovers them
    let margin = 40.0;
    let (w, h) = (CANVAS_WIDTH + 2.0 * margin, CANVAS_HEIGHT + 2.0 * margin);
    painter.fill(shapes::gradient_rect(-margin, -margin, w, band, edge, clear));
    painter.fill(shapes::gradient_rect(-margin, CANVAS_HEIGHT + margin - band, w, band, clear, edge));
    painter.fill(shapes::horizontal_gradient_rect(-margin, -margin, band, h, edge, clear));
    painter.fill(shapes::horizontal_gradient_rect(CANVAS_WIDTH + margin - band, -margin, band, h, clear, edge));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{GameMode, Particle, Rect};

    fn calm() -> Settings {
        Settings {
            glitch: false,
            ..Settings::default()
        }
    }

    #[test]
    fn test_star_count_follows_quality() {
        let mut scene = SceneRenderer::new(1, QualityPreset::Low);
        assert_eq!(scene.star_count(), 30);
        scene.set_quality(QualityPreset::High);
        assert_eq!(scene.star_count(), 160);
    }

    #[test]
    fn test_sky_is_drawn_first() {
        let mut scene = SceneRenderer::new(1, QualityPreset::Medium);
        let state = RunState::new(1, GameMode::Story);
        let vertices = scene.draw(&state, 0.0, &calm());
        assert_eq!(vertices[0].position, [0.0, 0.0]);
        assert_eq!(vertices[0].color, ACTS[0].sky[0]);
        assert!(vertices[..6].iter().any(|v| v.position == [CANVAS_WIDTH, CANVAS_HEIGHT]));
    }

    #[test]
    fn test_invincible_player_blinks() {
        let mut scene = SceneRenderer::new(1, QualityPreset::Medium);
        let mut state = RunState::new(1, GameMode::Story);
        state.player.invincible_timer = 1.0;
        let hidden = scene.draw(&state, 0.0, &calm()).len();
        let shown = scene.draw(&state, 50.0, &calm()).len();
        assert!(shown > hidden);
    }

    #[test]
    fn test_time_warp_adds_aura() {
        let mut scene = SceneRenderer::new(1, QualityPreset::Medium);
        let mut state = RunState::new(1, GameMode::Story);
        let plain = scene.draw(&state, 100.0, &calm()).len();
        state.player.time_warp_timer = 3.0;
        let warped = scene.draw(&state, 100.0, &calm()).len();
        assert_eq!(warped - plain, 32 * 2 * 6);
    }

    #[test]
    fn test_glitch_particles_are_squares() {
        let mut scene = SceneRenderer::new(1, QualityPreset::Medium);
        let mut state = RunState::new(1, GameMode::Story);
        let plain = scene.draw(&state, 100.0, &calm()).len();

        let particle = |kind: ParticleKind| Particle {
            kind,
            pos: Vec2::new(300.0, 300.0),
            vel: Vec2::ZERO,
            color: [1.0; 4],
            radius: 4.0,
            life: 0.5,
            decay: 1.0,
        };
        state.particles.push(particle(ParticleKind::Glitch));
        let glitch = scene.draw(&state, 100.0, &calm()).len();
        assert_eq!(glitch - plain, 6);

        state.particles[0] = particle(ParticleKind::Sparkle);
        let sparkle = scene.draw(&state, 100.0, &calm()).len();
        assert_eq!(sparkle - plain, 8 * 3);
    }

    #[test]
    fn test_flash_respects_settings() {
        let mut scene = SceneRenderer::new(1, QualityPreset::Medium);
        let mut state = RunState::new(1, GameMode::Story);
        state.flash_timer = 0.5;

        let vertices = scene.draw(&state, 0.0, &calm());
        let last = &vertices[vertices.len() - 6..];
        assert!(last.iter().all(|v| v.color == [1.0, 1.0, 1.0, 0.5]));

        let reduced = Settings {
            reduced_motion: true,
            ..calm()
        };
        let vertices = scene.draw(&state, 0.0, &reduced);
        assert!(vertices[vertices.len() - 1].color != [1.0, 1.0, 1.0, 0.5]);
    }

    #[test]
    fn test_shake_toggle() {
        let mut scene = SceneRenderer::new(1, QualityPreset::Medium);
        let mut state = RunState::new(1, GameMode::Story);
        state.shake = 20.0;
        let still = Settings {
            screen_shake: false,
            ..calm()
        };
        assert_eq!(scene.draw(&state, 200.0, &still), scene.draw(&state, 200.0, &still));

        let a = scene.draw(&state, 200.0, &calm());
        let b = scene.draw(&state, 200.0, &calm());
        assert_ne!(a, b);
    }

    #[test]
    fn test_glitch_gated_by_settings() {
        let mut state = RunState::new(1, GameMode::Story);
        state.act_index = Some(4);

        let mut scene = SceneRenderer::new(9, QualityPreset::Medium);
        for _ in 0..300 {
            scene.draw(&state, 0.0, &calm());
            assert_eq!(scene.glitch_frames(), 0);
        }

        let mut triggered = false;
        for _ in 0..300 {
            scene.draw(&state, 0.0, &Settings::default());
            triggered |= scene.glitch_frames() > 0;
        }
        assert!(triggered);
    }

    #[test]
    fn test_every_obstacle_kind_draws() {
        let mut scene = SceneRenderer::new(1, QualityPreset::Medium);
        let mut state = RunState::new(1, GameMode::Story);
        let mut previous = scene.draw(&state, 0.0, &calm()).len();
        for (i, kind) in [
            ObstacleKind::Tree,
            ObstacleKind::Bird,
            ObstacleKind::Snowman,
            ObstacleKind::Building,
            ObstacleKind::Cloud,
            ObstacleKind::Gear,
            ObstacleKind::GlitchBlock,
        ]
        .into_iter()
        .enumerate()
        {
            state.obstacles.push(Obstacle {
                id: i as u32,
                kind,
                rect: Rect::new(400.0 + i as f32 * 80.0, 300.0, 60.0, 60.0),
                rotation: 0.3,
                dead: false,
            });
            let count = scene.draw(&state, 0.0, &calm()).len();
            assert!(count > previous, "{:?} drew nothing", kind);
            previous = count;
        }
    }

    #[test]
    fn test_terrain_styles() {
        let layer = TerrainLayer {
            samples: vec![0.0, -10.0, 5.0, -20.0],
            offset: -10.0,
            speed: 0.5,
            base_y: 500.0,
        };

        let jagged = terrain_outline(&layer, TerrainStyle::Jagged);
        assert_eq!(jagged.len(), 4);
        assert_eq!(jagged[1], Vec2::new(40.0, 490.0));

        let stepped = terrain_outline(&layer, TerrainStyle::Stepped);
        assert_eq!(stepped.len(), 6);
        for pair in stepped.chunks(2) {
            assert_eq!(pair[0].y, pair[1].y);
        }

        let spiked = terrain_outline(&layer, TerrainStyle::Spiked);
        assert_eq!(spiked.len(), 7);
        assert_eq!(spiked[1].y, 490.0 - SPIKE_HEIGHT);

        let smooth = terrain_outline(&layer, TerrainStyle::Smooth);
        assert_eq!(smooth.len(), 1 + 2 * SMOOTH_STEPS);
        assert_eq!(smooth[0], jagged[0]);
    }

    #[test]
    fn test_gear_outline_alternates_radii() {
        let outline = gear_outline(25.0, 6);
        assert_eq!(outline.len(), 12);
        assert!((outline[0].length() - 30.0).abs() < 1e-4);
        assert!((outline[1].length() - 25.0).abs() < 1e-4);
    }
}
