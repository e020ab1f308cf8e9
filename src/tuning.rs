//! Data-driven game balance
//!
//! The five acts, their visual styling, and the one-shot narrative
//! registries are plain tables here so the simulation and the renderer
//! look them up instead of branching on act indices.

use serde::Serialize;

use crate::rgb;
use crate::sim::state::{LandmarkKind, ObstacleKind, PowerupKind};

/// Silhouette used when drawing the parallax terrain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerrainStyle {
    /// Quadratic curves through the samples
    Smooth,
    /// Flat steps at each sample
    Stepped,
    /// Straight segments between samples
    Jagged,
    /// Spikes between samples
    Spiked,
}

/// Background effect drawn behind the star field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbientEffect {
    Aurora,
    Haze,
    Grid,
    Embers,
    Rift,
}

/// Per-act configuration
#[derive(Debug, Clone)]
pub struct ActConfig {
    pub name: &'static str,
    pub description: &'static str,
    /// Sky gradient, top then bottom
    pub sky: [[f32; 4]; 2],
    /// Terrain colours, far to near
    pub terrain_colors: [[f32; 4]; 3],
    pub obstacle_speed_multiplier: f32,
    pub spawn_rate_multiplier: f32,
    pub weather_intensity: f32,
    /// Probability scale of a glitch starting on a given frame
    pub glitch_intensity: f32,
    pub terrain: TerrainStyle,
    pub ambient: AmbientEffect,
    pub gears: bool,
    pub obstacles: &'static [ObstacleKind],
}

const FOREST: &[ObstacleKind] = &[ObstacleKind::Tree, ObstacleKind::Bird, ObstacleKind::Snowman];
const CLOCKWORK: &[ObstacleKind] = &[ObstacleKind::Gear, ObstacleKind::Building];
const FRACTURE: &[ObstacleKind] = &[ObstacleKind::GlitchBlock, ObstacleKind::Cloud];

/// Progress percentages at which each act begins
pub const ACT_THRESHOLDS: [f32; 5] = [0.0, 20.0, 50.0, 75.0, 95.0];

pub static ACTS: [ActConfig; 5] = [
    ActConfig {
        name: "Echoes of North Pole",
        description: "Something feels... off. The snow is falling upwards.",
        sky: [rgb(0x1e3a8a), rgb(0x172554)],
        terrain_colors: [rgb(0x334155), rgb(0x475569), rgb(0xcbd5e1)],
        obstacle_speed_multiplier: 1.0,
        spawn_rate_multiplier: 1.0,
        weather_intensity: 1.0,
        glitch_intensity: 0.05,
        terrain: TerrainStyle::Smooth,
        ambient: AmbientEffect::Aurora,
        gears: false,
        obstacles: FOREST,
    },
    ActConfig {
        name: "The Clockwork Sky",
        description: "Massive gears turn in the heavens. Time is leaking.",
        sky: [rgb(0x3f3f46), rgb(0x52525b)],
        terrain_colors: [rgb(0x27272a), rgb(0x3f3f46), rgb(0xa1a1aa)],
        obstacle_speed_multiplier: 1.1,
        spawn_rate_multiplier: 1.2,
        weather_intensity: 2.0,
        glitch_intensity: 0.1,
        terrain: TerrainStyle::Stepped,
        ambient: AmbientEffect::Haze,
        gears: true,
        obstacles: CLOCKWORK,
    },
    ActConfig {
        name: "Fractured Reality",
        description: "The world is breaking apart. Don't touch the voids.",
        sky: [rgb(0x2e1065), rgb(0x4c1d95)],
        terrain_colors: [rgb(0x1e1b4b), rgb(0x3b0764), rgb(0x7c3aed)],
        obstacle_speed_multiplier: 1.3,
        spawn_rate_multiplier: 1.3,
        weather_intensity: 4.0,
        glitch_intensity: 0.3,
        terrain: TerrainStyle::Jagged,
        ambient: AmbientEffect::Grid,
        gears: false,
        obstacles: FRACTURE,
    },
    ActConfig {
        name: "The Timekeeper's Fortress",
        description: "He is trying to rewrite history. Stop him.",
        sky: [rgb(0x000000), rgb(0xbe123c)],
        terrain_colors: [rgb(0x1c1917), rgb(0x450a0a), rgb(0x7f1d1d)],
        obstacle_speed_multiplier: 1.6,
        spawn_rate_multiplier: 1.5,
        weather_intensity: 0.0,
        glitch_intensity: 0.5,
        terrain: TerrainStyle::Spiked,
        ambient: AmbientEffect::Embers,
        gears: true,
        obstacles: FOREST,
    },
    ActConfig {
        name: "The Event Horizon",
        description: "The end of time.",
        sky: [rgb(0xffffff), rgb(0xe2e8f0)],
        terrain_colors: [rgb(0xcbd5e1), rgb(0x94a3b8), rgb(0x64748b)],
        obstacle_speed_multiplier: 0.0,
        spawn_rate_multiplier: 0.0,
        weather_intensity: 20.0,
        glitch_intensity: 0.8,
        terrain: TerrainStyle::Smooth,
        ambient: AmbientEffect::Rift,
        gears: false,
        obstacles: FOREST,
    },
];

/// Index of the act whose threshold is the highest one not above `progress * 100`
pub fn act_index_for(progress: f32) -> usize {
    let percent = progress * 100.0;
    ACT_THRESHOLDS
        .iter()
        .rposition(|&threshold| percent >= threshold)
        .unwrap_or(0)
}

/// Per-60fps-frame probability of an obstacle spawning at multiplier 1.0
pub const OBSTACLE_SPAWN_RATE: f32 = 0.015;
/// Per-60fps-frame probability of a powerup spawning
pub const POWERUP_SPAWN_RATE: f32 = 0.005;
/// Per-60fps-frame probability of one snowflake per unit of weather intensity
pub const SNOW_SPAWN_RATE: f32 = 0.08;

/// Who is speaking a line of dialogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Speaker {
    Santa,
    Rudolph,
    Timekeeper,
}

/// A scripted line shown by the overlay
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialogueLine {
    pub id: &'static str,
    pub speaker: Speaker,
    pub text: &'static str,
}

/// Dialogue that fires once when progress reaches `progress`
#[derive(Debug, Clone)]
pub struct StoryMoment {
    pub progress: f32,
    pub dialogue: DialogueLine,
}

const fn moment(progress: f32, id: &'static str, speaker: Speaker, text: &'static str) -> StoryMoment {
    StoryMoment {
        progress,
        dialogue: DialogueLine { id, speaker, text },
    }
}

pub static STORY_MOMENTS: [StoryMoment; 10] = [
    moment(0.01, "act1_start", Speaker::Rudolph, "Santa! The sky... it's glitching! What is happening to the North Pole?"),
    moment(0.05, "act1_santa", Speaker::Santa, "The flow of time is turbulent. Hold steady, old friend."),
    moment(0.20, "act2_intro", Speaker::Timekeeper, "Anomaly detected. Subject: Santa Claus. Status: Obsolete."),
    moment(0.25, "act2_santa", Speaker::Santa, "Who are you? Why are you twisting the world like this?"),
    moment(0.50, "act3_tk", Speaker::Timekeeper, "Magic is chaotic. Inefficient. I am bringing perfect order."),
    moment(0.55, "act3_rudolph", Speaker::Rudolph, "Inefficient?! It's Joy! It's Hope! You can't just delete it!"),
    moment(0.75, "act4_tk", Speaker::Timekeeper, "Resistance is futile. History is being overwritten. Goodbye, Claus."),
    moment(0.80, "act4_santa", Speaker::Santa, "History isn't written in ink, Timekeeper. It's written in the heart!"),
    moment(0.95, "act5_finale", Speaker::Rudolph, "We're breaking through! The barrier is shattering!"),
    moment(0.98, "act5_santa", Speaker::Santa, "NOW! Unleash everything we have!"),
];

/// Landmark that scrolls past once when progress reaches `progress`
#[derive(Debug, Clone, Copy)]
pub struct LandmarkEntry {
    pub progress: f32,
    pub kind: LandmarkKind,
    pub name: &'static str,
}

pub static LANDMARKS: [LandmarkEntry; 3] = [
    LandmarkEntry { progress: 0.25, kind: LandmarkKind::ClockTower, name: "The Infinite Clock" },
    LandmarkEntry { progress: 0.55, kind: LandmarkKind::Ruins, name: "Ruins of Tomorrow" },
    LandmarkEntry { progress: 0.99, kind: LandmarkKind::FinalConstruct, name: "The Temporal Core" },
];

/// Letter envelope that drifts in once when progress reaches `progress`
#[derive(Debug, Clone, Copy)]
pub struct LetterEntry {
    pub id: &'static str,
    pub progress: f32,
    pub message: &'static str,
}

pub static NARRATIVE_LETTERS: [LetterEntry; 3] = [
    LetterEntry { id: "letter_anomaly", progress: 0.15, message: "ALERT: Chronal anomaly detected in Sector 4. Proceed with caution." },
    LetterEntry { id: "letter_timekeeper", progress: 0.45, message: "To whoever finds this: The Timekeeper lied. Order is not peace." },
    LetterEntry { id: "letter_hope", progress: 0.80, message: "Santa... if you can hear this... we haven't forgotten you yet." },
];

/// How long each powerup's buff lasts, if it has one
pub fn powerup_duration(kind: PowerupKind) -> Option<f32> {
    match kind {
        PowerupKind::TimeWarp => Some(5.0),
        PowerupKind::Speed => Some(7.0),
        PowerupKind::Healing => Some(5.0),
        PowerupKind::Snowballs | PowerupKind::Blast => None,
    }
}

/// Ammo granted by a snowball pickup
pub const SNOWBALLS_PER_PICKUP: u32 = 5;
/// World speed multiplier while the speed buff runs
pub const SPEED_BUFF_MULTIPLIER: f32 = 1.5;

pub fn powerup_color(kind: PowerupKind) -> [f32; 4] {
    match kind {
        PowerupKind::Speed => rgb(0xef4444),
        PowerupKind::Snowballs => rgb(0x06b6d4),
        PowerupKind::Blast => rgb(0xeab308),
        PowerupKind::Healing => rgb(0x22c55e),
        PowerupKind::TimeWarp => rgb(0xa855f7),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_act_index_thresholds() {
        assert_eq!(act_index_for(0.0), 0);
        assert_eq!(act_index_for(0.199), 0);
        assert_eq!(act_index_for(0.20), 1);
        assert_eq!(act_index_for(0.5), 2);
        assert_eq!(act_index_for(0.80), 3);
        assert_eq!(act_index_for(0.95), 4);
        assert_eq!(act_index_for(1.0), 4);
        // Endless mode runs past 100%
        assert_eq!(act_index_for(3.5), 4);
    }

    #[test]
    fn test_registries_sorted_and_unique() {
        for pair in STORY_MOMENTS.windows(2) {
            assert!(pair[0].progress <= pair[1].progress);
            assert_ne!(pair[0].dialogue.id, pair[1].dialogue.id);
        }
        for pair in LANDMARKS.windows(2) {
            assert!(pair[0].progress < pair[1].progress);
            assert_ne!(pair[0].kind, pair[1].kind);
        }
    }

    #[test]
    fn test_every_act_has_obstacles() {
        for act in &ACTS {
            assert!(!act.obstacles.is_empty(), "{} has no obstacles", act.name);
        }
    }
}
