//! HUD snapshot handed to the overlay
//!
//! The overlay is a read-only consumer refreshed at roughly 10 Hz. Each
//! snapshot drains the powerups collected since the previous one.

use serde::Serialize;

use crate::sim::state::{CollectedPowerup, RunState};
use crate::tuning::{ACTS, DialogueLine};

/// Everything the overlay shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HudSnapshot {
    pub lives: i32,
    pub snowballs: u32,
    /// Progress in percent
    pub progress: f32,
    pub time_left: f32,
    /// `m:ss` rendering of `time_left`
    pub time_text: String,
    pub act_index: usize,
    pub act_name: &'static str,
    /// One-line flavour text for the act
    pub act_description: &'static str,
    pub score: u32,
    pub speed_timer: f32,
    pub healing_timer: f32,
    pub time_warp_timer: f32,
    pub collected: Vec<CollectedPowerup>,
    pub dialogue: Option<DialogueLine>,
    pub wish: Option<&'static str>,
}

impl HudSnapshot {
    /// Build a snapshot, draining the run's collected-powerup list
    pub fn capture(state: &mut RunState) -> Self {
        let act_index = state.act();
        let collected = std::mem::take(&mut state.collected);
        let player = &state.player;
        Self {
            lives: player.lives,
            snowballs: player.snowballs,
            progress: state.progress() * 100.0,
            time_left: state.time_left,
            time_text: format_time(state.time_left),
            act_index,
            act_name: ACTS[act_index].name,
            act_description: ACTS[act_index].description,
            score: state.score.max(0.0) as u32,
            speed_timer: player.speed_timer,
            healing_timer: player.healing_timer,
            time_warp_timer: player.time_warp_timer,
            collected,
            dialogue: state.dialogue.as_ref().map(|d| d.value.clone()),
            wish: state.wish.as_ref().map(|w| w.value),
        }
    }
}

/// Format seconds as `m:ss`
pub fn format_time(seconds: f32) -> String {
    let total = seconds.max(0.0).floor() as u32;
    format!("{}:{:02}", total / 60, total % 60)
}

/// HUD refresh bucket (milliseconds of frame timestamp)
pub const HUD_BUCKET_MS: f64 = 100.0;

/// True when the frame ending at `timestamp_ms` crossed into a new bucket
pub fn hud_refresh_due(timestamp_ms: f64, dt_secs: f32) -> bool {
    let previous = timestamp_ms - dt_secs as f64 * 1000.0;
    (timestamp_ms / HUD_BUCKET_MS).floor() > (previous / HUD_BUCKET_MS).floor()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{GameMode, PowerupKind};

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(720.0), "12:00");
        assert_eq!(format_time(65.9), "1:05");
        assert_eq!(format_time(9.0), "0:09");
        assert_eq!(format_time(-3.0), "0:00");
    }

    #[test]
    fn test_throttle_buckets() {
        assert!(hud_refresh_due(1005.0, 0.016));
        assert!(!hud_refresh_due(1050.0, 0.016));
        assert!(hud_refresh_due(1100.0, 0.016));
        // A long frame still emits once
        assert!(hud_refresh_due(1399.0, 0.1));
    }

    #[test]
    fn test_throttle_rate_is_about_ten_hz() {
        let mut emitted = 0;
        let mut t = 0.0;
        for _ in 0..600 {
            t += 1000.0 / 60.0;
            if hud_refresh_due(t, 1.0 / 60.0) {
                emitted += 1;
            }
        }
        assert!((99..=101).contains(&emitted), "{}", emitted);
    }

    #[test]
    fn test_capture_drains_collected() {
        let mut state = RunState::new(1, GameMode::Story);
        state.collected.push(CollectedPowerup {
            id: 7,
            kind: PowerupKind::Speed,
        });
        let first = HudSnapshot::capture(&mut state);
        assert_eq!(first.collected.len(), 1);
        assert_eq!(first.lives, 3);
        assert_eq!(first.act_name, ACTS[0].name);
        assert_eq!(first.time_text, "12:00");

        let second = HudSnapshot::capture(&mut state);
        assert!(second.collected.is_empty());
    }

    #[test]
    fn test_snapshot_serialises() {
        let mut state = RunState::new(1, GameMode::Story);
        let json = serde_json::to_string(&HudSnapshot::capture(&mut state)).unwrap_or_default();
        assert!(json.contains("\"act_name\""));
        assert!(json.contains("\"dialogue\":null"));
    }

    #[test]
    fn test_snapshot_follows_act_description() {
        let mut state = RunState::new(1, GameMode::Story);
        state.act_index = Some(2);
        let snapshot = HudSnapshot::capture(&mut state);
        assert_eq!(snapshot.act_index, 2);
        assert_eq!(snapshot.act_description, ACTS[2].description);
    }
}
