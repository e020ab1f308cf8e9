//! Progress tracking and one-shot story triggers
//!
//! Progress is cumulative scroll distance over the victory distance. Every
//! registry entry is guarded by a fired-set on the run, so an entry fires
//! on the first frame its threshold is reached and never again that run.

use super::spawn::{spawn_landmark, spawn_letter};
use super::state::{GameEvent, GameMode, RunState, TimedText};
use crate::consts::*;
use crate::tuning::{LANDMARKS, NARRATIVE_LETTERS, STORY_MOMENTS, act_index_for};

/// Progress ratio for a distance; clamped to 1.0 in story mode
pub fn progress_ratio(distance: f32, mode: GameMode) -> f32 {
    let ratio = distance / VICTORY_DISTANCE;
    match mode {
        GameMode::Story => ratio.min(1.0),
        GameMode::Endless => ratio,
    }
}

impl RunState {
    #[inline]
    pub fn progress(&self) -> f32 {
        progress_ratio(self.distance, self.mode)
    }
}

/// Resolve the act for `progress`, announcing a change
///
/// The first resolution of a run also reports a change (from `None`) so the
/// act music starts, but only later changes flash the screen.
pub fn update_act(state: &mut RunState, progress: f32) -> usize {
    let index = act_index_for(progress);
    if state.act_index != Some(index) {
        let from = state.act_index;
        if from.is_some() {
            state.flash_timer = ACT_FLASH_SECS;
            log::info!("Act {} -> {}", from.unwrap_or(0) + 1, index + 1);
        }
        state.act_index = Some(index);
        state.events.push(GameEvent::ActChanged { from, to: index });
    }
    index
}

/// Fire every registry entry whose threshold has been reached
pub fn fire_triggers(state: &mut RunState, progress: f32) {
    for moment in STORY_MOMENTS.iter() {
        let id = moment.dialogue.id;
        if progress >= moment.progress && state.fired_moments.insert(id) {
            log::debug!("Dialogue {}", id);
            state.dialogue = Some(TimedText {
                value: moment.dialogue.clone(),
                expires_at: state.clock + DIALOGUE_SECS,
            });
            state.events.push(GameEvent::Dialogue(id));
        }
    }

    for landmark in LANDMARKS.iter() {
        if progress >= landmark.progress && state.fired_landmarks.insert(landmark.kind) {
            log::info!("Landmark ahead: {}", landmark.name);
            spawn_landmark(state, landmark);
            state.events.push(GameEvent::LandmarkSpawned(landmark.kind));
        }
    }

    for letter in NARRATIVE_LETTERS.iter() {
        if progress >= letter.progress && state.fired_letters.insert(letter.id) {
            log::info!("Letter {} drifting in", letter.id);
            spawn_letter(state, letter);
        }
    }

    if !state.time_warning_fired && state.time_left <= TIME_WARNING_SECS {
        state.time_warning_fired = true;
        state.events.push(GameEvent::TimeWarning);
    }
}

/// Start the ending once story progress reaches the end; returns true on the starting frame
pub fn check_ending(state: &mut RunState, progress: f32) -> bool {
    if state.mode == GameMode::Story && progress >= ENDING_PROGRESS && !state.ending {
        state.ending = true;
        log::info!("Ending sequence started (score {:.0})", state.score);
        state.events.push(GameEvent::EndingStarted);
        return true;
    }
    false
}

/// Clear dialogue and wish text whose time has passed
pub fn expire_text(state: &mut RunState) {
    if state
        .dialogue
        .as_ref()
        .is_some_and(|d| state.clock >= d.expires_at)
    {
        state.dialogue = None;
    }
    if state.wish.as_ref().is_some_and(|w| state.clock >= w.expires_at) {
        state.wish = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::ACTS;

    #[test]
    fn test_progress_clamps_in_story_only() {
        assert_eq!(progress_ratio(VICTORY_DISTANCE * 2.0, GameMode::Story), 1.0);
        assert_eq!(progress_ratio(VICTORY_DISTANCE * 2.0, GameMode::Endless), 2.0);
        assert_eq!(progress_ratio(VICTORY_DISTANCE / 2.0, GameMode::Story), 0.5);
    }

    #[test]
    fn test_every_entry_fires_exactly_once() {
        let mut state = RunState::new(1, GameMode::Endless);
        let mut progress = 0.0;
        while progress < 1.2 {
            fire_triggers(&mut state, progress);
            progress += 0.003;
        }
        // Re-scanning past every threshold fires nothing new
        for _ in 0..10 {
            fire_triggers(&mut state, 1.2);
        }

        let dialogues = state
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::Dialogue(_)))
            .count();
        let landmarks = state
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::LandmarkSpawned(_)))
            .count();
        assert_eq!(dialogues, STORY_MOMENTS.len());
        assert_eq!(landmarks, LANDMARKS.len());
        assert_eq!(state.landmarks.len(), LANDMARKS.len());
        assert_eq!(state.letters.len(), NARRATIVE_LETTERS.len());
    }

    #[test]
    fn test_update_loop_fires_each_entry_once() {
        let mut state = RunState::new(2, GameMode::Endless);
        state.cinematic = true;
        let mut dialogues = 0;
        let mut landmarks = 0;
        while state.progress() < 1.1 {
            state.distance += 500.0;
            crate::sim::tick::update(&mut state, 1.0 / 60.0);
            for event in state.events.drain(..) {
                match event {
                    GameEvent::Dialogue(_) => dialogues += 1,
                    GameEvent::LandmarkSpawned(_) => landmarks += 1,
                    _ => {}
                }
            }
        }
        assert_eq!(dialogues, STORY_MOMENTS.len());
        assert_eq!(landmarks, LANDMARKS.len());
        assert_eq!(state.fired_letters.len(), NARRATIVE_LETTERS.len());
    }

    #[test]
    fn test_act_change_flashes_after_first() {
        let mut state = RunState::new(1, GameMode::Story);
        assert_eq!(update_act(&mut state, 0.0), 0);
        assert_eq!(state.flash_timer, 0.0);
        assert_eq!(
            state.events,
            vec![GameEvent::ActChanged { from: None, to: 0 }]
        );

        assert_eq!(update_act(&mut state, 0.1), 0);
        assert_eq!(state.events.len(), 1);

        assert_eq!(update_act(&mut state, 0.21), 1);
        assert_eq!(state.flash_timer, ACT_FLASH_SECS);
        assert_eq!(ACTS[1].name, "The Clockwork Sky");
    }

    #[test]
    fn test_ending_fires_once_in_story() {
        let mut state = RunState::new(1, GameMode::Story);
        assert!(!check_ending(&mut state, 0.98));
        assert!(check_ending(&mut state, 0.99));
        assert!(!check_ending(&mut state, 1.0));
        assert!(state.ending);

        let mut endless = RunState::new(1, GameMode::Endless);
        assert!(!check_ending(&mut endless, 5.0));
        assert!(!endless.ending);
    }

    #[test]
    fn test_dialogue_expires_unless_superseded() {
        let mut state = RunState::new(1, GameMode::Story);
        fire_triggers(&mut state, 0.01);
        let first = state.dialogue.as_ref().map(|d| d.value.id);
        assert_eq!(first, Some("act1_start"));

        state.clock = DIALOGUE_SECS - 0.1;
        expire_text(&mut state);
        assert!(state.dialogue.is_some());

        // A newer line replaces the old one and carries its own expiry
        fire_triggers(&mut state, 0.05);
        state.clock = DIALOGUE_SECS + 0.1;
        expire_text(&mut state);
        assert_eq!(state.dialogue.as_ref().map(|d| d.value.id), Some("act1_santa"));

        state.clock = 2.0 * DIALOGUE_SECS;
        expire_text(&mut state);
        assert!(state.dialogue.is_none());
    }

    #[test]
    fn test_time_warning_once() {
        let mut state = RunState::new(1, GameMode::Story);
        state.time_left = 10.0;
        fire_triggers(&mut state, 0.0);
        fire_triggers(&mut state, 0.0);
        let warnings = state
            .events
            .iter()
            .filter(|e| **e == GameEvent::TimeWarning)
            .count();
        assert_eq!(warnings, 1);
    }
}
