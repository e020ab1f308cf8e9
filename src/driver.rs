//! Frame driver and phase state machine
//!
//! The host calls [`FrameDriver::frame`] once per animation frame with the
//! frame timestamp. The driver derives a clamped `dt`, advances the intro or
//! the run, forwards simulation events to the audio sink, pushes throttled
//! HUD snapshots to the listener, and reports when the loop should stop.

use serde::Serialize;

use crate::audio::{AudioSink, SoundEffect};
use crate::consts::*;
use crate::sim::state::{GameEvent, GameMode, RunState};
use crate::sim::tick::{self, clamp_dt};
use crate::ui::{HudSnapshot, hud_refresh_due};

/// Intro length once the player has watched it
pub const SHORT_INTRO_SECS: f32 = 2.0;
/// Full scripted intro length
pub const FULL_INTRO_SECS: f32 = 17.0;
/// Stage boundaries of the full intro
pub const INTRO_STAGE_SECS: [f32; 4] = [4.0, 8.0, 11.0, 14.0];
/// Ending theme fade-in
pub const ENDING_FADE_SECS: f64 = 10.0;

/// Top-level game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GamePhase {
    /// Pre-play transition; the run has just been reset
    Intro,
    Playing,
    GameOver,
    Victory,
}

impl GamePhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, GamePhase::GameOver | GamePhase::Victory)
    }
}

/// Whether the host should schedule another frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue,
    Stop,
}

/// Host-side observers of a run
///
/// Every method has an empty default so hosts implement only what they show.
pub trait RunListener {
    /// The intro elapsed and play began
    fn on_intro_finished(&mut self) {}
    /// The story ending started; called exactly once per run
    fn on_victory(&mut self, _score: u32) {}
    /// Lives reached zero
    fn on_game_over(&mut self, _score: u32) {}
    /// Throttled HUD refresh
    fn on_hud(&mut self, _snapshot: &HudSnapshot) {}
}

/// Listener that ignores everything
#[derive(Debug, Default)]
pub struct NoopListener;

impl RunListener for NoopListener {}

/// Owns the run and sequences it frame by frame
pub struct FrameDriver<A: AudioSink> {
    phase: GamePhase,
    mode: GameMode,
    state: RunState,
    audio: A,
    base_seed: u64,
    runs: u64,
    intro_seen: bool,
    intro_elapsed: f32,
    last_timestamp: Option<f64>,
    particle_cap: usize,
    cinematic: bool,
}

impl<A: AudioSink> FrameDriver<A> {
    /// Create a driver sitting in the intro of a first run
    pub fn new(audio: A, seed: u64, mode: GameMode, intro_seen: bool) -> Self {
        let mut driver = Self {
            phase: GamePhase::Intro,
            mode,
            state: RunState::new(seed, mode),
            audio,
            base_seed: seed,
            runs: 0,
            intro_seen,
            intro_elapsed: 0.0,
            last_timestamp: None,
            particle_cap: crate::sim::state::MAX_PARTICLES,
            cinematic: false,
        };
        driver.start_run(mode);
        driver
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut RunState {
        &mut self.state
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    pub fn intro_seen(&self) -> bool {
        self.intro_seen
    }

    pub fn set_particle_cap(&mut self, cap: usize) {
        self.particle_cap = cap;
        self.state.particle_cap = cap;
    }

    /// Length of the current intro
    pub fn intro_duration(&self) -> f32 {
        if self.intro_seen {
            SHORT_INTRO_SECS
        } else {
            FULL_INTRO_SECS
        }
    }

    /// Stage of the full intro script (0..=4)
    pub fn intro_stage(&self) -> usize {
        INTRO_STAGE_SECS
            .iter()
            .filter(|&&t| self.intro_elapsed >= t)
            .count()
    }

    /// Begin a new run in `mode`, entering the intro
    pub fn start_run(&mut self, mode: GameMode) {
        self.mode = mode;
        self.enter(GamePhase::Intro);
    }

    /// Jump straight into play; reported like a finished intro
    pub fn skip_intro(&mut self, listener: &mut dyn RunListener) -> bool {
        if self.phase != GamePhase::Intro {
            return false;
        }
        self.finish_intro(listener);
        true
    }

    fn finish_intro(&mut self, listener: &mut dyn RunListener) {
        self.intro_seen = true;
        self.enter(GamePhase::Playing);
        listener.on_intro_finished();
    }

    /// Toggle obstacle pass-through (debug)
    pub fn toggle_cinematic(&mut self) -> bool {
        self.cinematic = !self.cinematic;
        self.state.cinematic = self.cinematic;
        log::info!("Cinematic mode {}", if self.cinematic { "on" } else { "off" });
        self.cinematic
    }

    /// Jump input; ignored outside active play
    pub fn jump(&mut self) -> bool {
        if self.phase != GamePhase::Playing {
            return false;
        }
        let jumped = tick::jump(&mut self.state);
        self.dispatch_events(&mut NoopListener);
        jumped
    }

    /// Shoot input; ignored outside active play
    pub fn shoot(&mut self) -> bool {
        if self.phase != GamePhase::Playing {
            return false;
        }
        let shot = tick::shoot(&mut self.state);
        self.dispatch_events(&mut NoopListener);
        shot
    }

    fn enter(&mut self, phase: GamePhase) {
        // A spent run entered directly into play is also started fresh
        let reset = match phase {
            GamePhase::Intro => true,
            GamePhase::Playing => {
                self.state.player.lives <= 0 && self.state.time_left >= TOTAL_GAME_TIME_SECS
            }
            GamePhase::GameOver | GamePhase::Victory => false,
        };
        if reset {
            self.reset_run();
        }
        if phase.is_terminal() || phase == GamePhase::Intro {
            self.audio.set_ambient_volume(0.0);
        }
        if self.phase != phase {
            log::info!("Phase {:?} -> {:?}", self.phase, phase);
        }
        self.phase = phase;
        self.intro_elapsed = 0.0;
    }

    fn reset_run(&mut self) {
        self.runs += 1;
        let seed = self.base_seed.wrapping_add(self.runs);
        self.state = RunState::new(seed, self.mode);
        self.state.particle_cap = self.particle_cap;
        self.state.cinematic = self.cinematic;
        // The previous run's last frame may be long ago
        self.last_timestamp = None;
        self.audio.stop_ending_music();
        log::info!("Run reset ({:?}, seed {})", self.mode, seed);
    }

    /// Advance one animation frame
    pub fn frame(&mut self, timestamp_ms: f64, listener: &mut dyn RunListener) -> FrameOutcome {
        let raw = match self.last_timestamp {
            Some(previous) => ((timestamp_ms - previous) / 1000.0) as f32,
            None => 0.0,
        };
        self.last_timestamp = Some(timestamp_ms);
        let dt = clamp_dt(raw);

        match self.phase {
            GamePhase::Intro => {
                self.intro_elapsed += dt;
                if self.intro_elapsed >= self.intro_duration() {
                    self.finish_intro(listener);
                }
                FrameOutcome::Continue
            }
            GamePhase::Playing => self.play_frame(timestamp_ms, dt, listener),
            GamePhase::GameOver | GamePhase::Victory => FrameOutcome::Stop,
        }
    }

    fn play_frame(&mut self, timestamp_ms: f64, dt: f32, listener: &mut dyn RunListener) -> FrameOutcome {
        tick::update(&mut self.state, dt);
        self.audio.set_ambient_volume(self.state.current_speed);
        let victory = self.dispatch_events(listener);

        if hud_refresh_due(timestamp_ms, dt) {
            listener.on_hud(&HudSnapshot::capture(&mut self.state));
        }

        if self.state.player.lives <= 0 {
            let score = self.score();
            log::info!("Game over (score {})", score);
            self.enter(GamePhase::GameOver);
            listener.on_game_over(score);
            return FrameOutcome::Stop;
        }
        if victory {
            self.enter(GamePhase::Victory);
            return FrameOutcome::Stop;
        }
        FrameOutcome::Continue
    }

    /// Forward queued simulation events; returns true if the ending started
    fn dispatch_events(&mut self, listener: &mut dyn RunListener) -> bool {
        let mut victory = false;
        for event in std::mem::take(&mut self.state.events) {
            if let Some(effect) = SoundEffect::for_event(&event) {
                self.audio.play_one_shot(effect);
            }
            match event {
                GameEvent::ActChanged { to, .. } => self.audio.play_level_music(to),
                GameEvent::EndingStarted => {
                    self.audio.play_ending_music(0.0, ENDING_FADE_SECS);
                    listener.on_victory(self.score());
                    victory = true;
                }
                _ => {}
            }
        }
        victory
    }

    fn score(&self) -> u32 {
        self.state.score.max(0.0) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{MemoryStore, ProgressFlags};
    use crate::sim::state::{Obstacle, ObstacleKind, Rect};

    const FRAME_MS: f64 = 1000.0 / 60.0;

    #[derive(Debug, Default)]
    struct RecordingAudio {
        effects: Vec<SoundEffect>,
        tracks: Vec<usize>,
        ambient: Vec<f32>,
        endings: usize,
        ending_stops: usize,
    }

    impl AudioSink for RecordingAudio {
        fn initialize(&mut self) {}
        fn play_one_shot(&mut self, effect: SoundEffect) {
            self.effects.push(effect);
        }
        fn play_level_music(&mut self, act_index: usize) {
            self.tracks.push(act_index);
        }
        fn stop_music(&mut self) {}
        fn play_ending_music(&mut self, _offset_secs: f64, _fade_secs: f64) {
            self.endings += 1;
        }
        fn stop_ending_music(&mut self) {
            self.ending_stops += 1;
        }
        fn set_ambient_volume(&mut self, speed: f32) {
            self.ambient.push(speed);
        }
    }

    #[derive(Debug, Default)]
    struct Recorder {
        intros: usize,
        victories: usize,
        game_overs: usize,
        huds: usize,
    }

    impl RunListener for Recorder {
        fn on_intro_finished(&mut self) {
            self.intros += 1;
        }
        fn on_victory(&mut self, _score: u32) {
            self.victories += 1;
        }
        fn on_game_over(&mut self, _score: u32) {
            self.game_overs += 1;
        }
        fn on_hud(&mut self, _snapshot: &HudSnapshot) {
            self.huds += 1;
        }
    }

    struct Harness {
        driver: FrameDriver<RecordingAudio>,
        listener: Recorder,
        now: f64,
    }

    impl Harness {
        fn playing(mode: GameMode) -> Self {
            let mut driver = FrameDriver::new(RecordingAudio::default(), 42, mode, true);
            let mut listener = Recorder::default();
            driver.skip_intro(&mut listener);
            let mut harness = Self {
                driver,
                listener,
                now: 0.0,
            };
            harness.step();
            harness
        }

        fn step(&mut self) -> FrameOutcome {
            self.now += FRAME_MS;
            self.driver.frame(self.now, &mut self.listener)
        }
    }

    #[test]
    fn test_intro_lengths() {
        let mut listener = Recorder::default();
        let mut fresh = FrameDriver::new(RecordingAudio::default(), 1, GameMode::Story, false);
        let mut seen = FrameDriver::new(RecordingAudio::default(), 1, GameMode::Story, true);
        let mut now = 0.0;
        for _ in 0..(3 * 60) {
            now += FRAME_MS;
            fresh.frame(now, &mut listener);
            seen.frame(now, &mut listener);
        }
        assert_eq!(seen.phase(), GamePhase::Playing);
        assert_eq!(fresh.phase(), GamePhase::Intro);
        assert_eq!(listener.intros, 1);

        for _ in 0..(15 * 60) {
            now += FRAME_MS;
            fresh.frame(now, &mut listener);
        }
        assert_eq!(fresh.phase(), GamePhase::Playing);
        assert!(fresh.intro_seen());
        assert_eq!(listener.intros, 2);
    }

    #[test]
    fn test_skipped_intro_is_reported_once() {
        let mut driver = FrameDriver::new(RecordingAudio::default(), 1, GameMode::Story, false);
        let mut listener = Recorder::default();
        assert!(driver.skip_intro(&mut listener));
        assert_eq!(driver.phase(), GamePhase::Playing);
        assert!(driver.intro_seen());
        assert_eq!(listener.intros, 1);

        // Only an intro can be skipped
        assert!(!driver.skip_intro(&mut listener));
        assert_eq!(listener.intros, 1);
    }

    #[test]
    fn test_skipped_intro_stays_short_after_reload() {
        struct FlagListener {
            store: MemoryStore,
            flags: ProgressFlags,
        }

        impl RunListener for FlagListener {
            fn on_intro_finished(&mut self) {
                self.flags.mark_intro_seen(&mut self.store);
            }
        }

        let store = MemoryStore::new();
        let flags = ProgressFlags::load(&store);
        let mut listener = FlagListener { store, flags };
        let mut driver =
            FrameDriver::new(RecordingAudio::default(), 1, GameMode::Story, listener.flags.intro_seen);
        assert_eq!(driver.intro_duration(), FULL_INTRO_SECS);
        driver.skip_intro(&mut listener);

        let reloaded = ProgressFlags::load(&listener.store);
        assert!(reloaded.intro_seen);
        let driver = FrameDriver::new(RecordingAudio::default(), 2, GameMode::Story, reloaded.intro_seen);
        assert_eq!(driver.intro_duration(), SHORT_INTRO_SECS);
    }

    #[test]
    fn test_intro_stages_advance() {
        let mut driver = FrameDriver::new(RecordingAudio::default(), 1, GameMode::Story, false);
        let mut listener = NoopListener;
        assert_eq!(driver.intro_stage(), 0);
        let mut now = 0.0;
        for _ in 0..(9 * 10) {
            now += 100.0;
            driver.frame(now, &mut listener);
        }
        assert_eq!(driver.intro_stage(), 2);
    }

    #[test]
    fn test_inputs_ignored_outside_play() {
        let mut driver = FrameDriver::new(RecordingAudio::default(), 1, GameMode::Story, false);
        driver.state_mut().player.snowballs = 3;
        assert!(!driver.jump());
        assert!(!driver.shoot());
        assert_eq!(driver.state().player.snowballs, 3);
    }

    #[test]
    fn test_first_frame_starts_act_music() {
        let harness = Harness::playing(GameMode::Story);
        assert_eq!(harness.driver.audio().tracks, vec![0]);
        assert!(harness.driver.audio().ambient.last().is_some_and(|&s| s > 0.0));
    }

    #[test]
    fn test_inputs_play_effects() {
        let mut harness = Harness::playing(GameMode::Story);
        assert!(harness.driver.jump());
        assert!(!harness.driver.shoot());
        harness.driver.state_mut().player.snowballs = 1;
        assert!(harness.driver.shoot());
        assert_eq!(
            harness.driver.audio().effects,
            vec![SoundEffect::Jump, SoundEffect::Shoot]
        );
    }

    #[test]
    fn test_victory_fires_once() {
        let mut harness = Harness::playing(GameMode::Story);
        harness.driver.state_mut().distance = VICTORY_DISTANCE * 0.985;

        let mut stopped = false;
        for _ in 0..(60 * 60) {
            if harness.step() == FrameOutcome::Stop {
                stopped = true;
                break;
            }
        }
        assert!(stopped);
        assert_eq!(harness.driver.phase(), GamePhase::Victory);
        assert!(harness.driver.state().ending);
        assert_eq!(harness.listener.victories, 1);
        assert_eq!(harness.driver.audio().endings, 1);

        // The host may keep calling in
        for _ in 0..30 {
            assert_eq!(harness.step(), FrameOutcome::Stop);
        }
        for _ in 0..30 {
            tick::update(harness.driver.state_mut(), 1.0 / 60.0);
        }
        assert!(harness.driver.state().ending);
        assert!(
            !harness
                .driver
                .state()
                .events
                .contains(&GameEvent::EndingStarted)
        );
        assert_eq!(harness.listener.victories, 1);
    }

    #[test]
    fn test_endless_never_ends() {
        let mut harness = Harness::playing(GameMode::Endless);
        harness.driver.toggle_cinematic();
        harness.driver.state_mut().distance = VICTORY_DISTANCE * 1.5;
        for _ in 0..120 {
            assert_eq!(harness.step(), FrameOutcome::Continue);
        }
        assert!(!harness.driver.state().ending);
        assert_eq!(harness.listener.victories, 0);
    }

    #[test]
    fn test_game_over_on_third_crash() {
        let mut harness = Harness::playing(GameMode::Story);
        let mut crashes = 0;

        loop {
            // Let any invincibility window run out without taking hits
            harness.driver.toggle_cinematic();
            for _ in 0..(INVINCIBILITY_SECS * 60.0) as usize + 10 {
                harness.driver.state_mut().powerups.clear();
                assert_eq!(harness.step(), FrameOutcome::Continue);
            }
            harness.driver.toggle_cinematic();
            assert!(!harness.driver.state().player.is_invincible());

            let state = harness.driver.state_mut();
            state.obstacles.clear();
            state.powerups.clear();
            let lives_before = state.player.lives;
            let rect = state.player.rect;
            let id = state.next_entity_id();
            state.obstacles.push(Obstacle {
                id,
                kind: ObstacleKind::Snowman,
                rect: Rect::new(rect.x, rect.y, 60.0, 60.0),
                rotation: 0.0,
                dead: false,
            });

            let outcome = harness.step();
            crashes += 1;
            let lives = harness.driver.state().player.lives;
            assert_eq!(lives, lives_before - 1);
            if lives == 0 {
                assert_eq!(outcome, FrameOutcome::Stop);
                assert_eq!(harness.driver.phase(), GamePhase::GameOver);
                break;
            }
            assert_eq!(outcome, FrameOutcome::Continue);
            assert_eq!(harness.driver.phase(), GamePhase::Playing);
            assert_eq!(harness.listener.game_overs, 0);
        }

        assert_eq!(crashes, START_LIVES);
        assert_eq!(harness.listener.game_overs, 1);
        assert_eq!(harness.driver.audio().ambient.last(), Some(&0.0));
        assert!(
            harness
                .driver
                .audio()
                .effects
                .iter()
                .filter(|e| **e == SoundEffect::Crash)
                .count()
                >= START_LIVES as usize
        );
    }

    #[test]
    fn test_hud_refreshes_at_ten_hz() {
        let mut harness = Harness::playing(GameMode::Story);
        harness.driver.toggle_cinematic();
        let before = harness.listener.huds;
        for _ in 0..120 {
            harness.step();
        }
        let emitted = harness.listener.huds - before;
        assert!((19..=21).contains(&emitted), "{}", emitted);
    }

    #[test]
    fn test_new_run_resets_state() {
        let mut harness = Harness::playing(GameMode::Story);
        for _ in 0..60 {
            harness.step();
        }
        assert!(harness.driver.state().distance > 0.0);

        harness.driver.start_run(GameMode::Endless);
        let state = harness.driver.state();
        assert_eq!(harness.driver.phase(), GamePhase::Intro);
        assert_eq!(state.distance, 0.0);
        assert_eq!(state.mode, GameMode::Endless);
        assert!(state.fired_moments.is_empty());
        assert_eq!(state.time_left, TOTAL_GAME_TIME_SECS);
        assert!(harness.driver.audio().ending_stops >= 2);
    }

    #[test]
    fn test_restart_does_not_inherit_stale_timestamp() {
        let mut harness = Harness::playing(GameMode::Story);
        for _ in 0..30 {
            harness.step();
        }
        harness.driver.start_run(GameMode::Story);

        // The host resumes much later
        harness.now += 60_000.0;
        harness.step();
        assert_eq!(harness.driver.intro_elapsed, 0.0);
        harness.step();
        assert!((harness.driver.intro_elapsed - (FRAME_MS / 1000.0) as f32).abs() < 1e-4);
    }

    #[test]
    fn test_playing_with_spent_run_resets() {
        let mut driver = FrameDriver::new(RecordingAudio::default(), 3, GameMode::Story, true);
        driver.state_mut().player.lives = 0;
        driver.state_mut().score = 999.0;
        driver.skip_intro(&mut NoopListener);
        assert_eq!(driver.state().player.lives, START_LIVES);
        assert_eq!(driver.state().score, 0.0);
    }
}
