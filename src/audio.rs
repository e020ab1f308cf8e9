//! Audio collaborator
//!
//! The frame driver talks to audio only through [`AudioSink`]. The browser
//! backend synthesises one-shot effects with Web Audio oscillators and
//! streams the act music and ending theme from media elements routed
//! through gain nodes, so cross-fades are plain gain ramps.

use crate::sim::state::{GameEvent, PowerupKind};

/// One-shot sound effects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// Jump impulse
    Jump,
    /// Snowball thrown
    Shoot,
    /// Obstacle hit, by the sleigh or a snowball
    Crash,
    /// Powerup collected
    Powerup(PowerupKind),
    /// Healing pickup
    Heal,
    /// Letter collected
    CollectWish,
    /// Thirty seconds left on the clock
    TimeWarning,
}

impl SoundEffect {
    /// Effect to play for a simulation event, if any
    pub fn for_event(event: &GameEvent) -> Option<Self> {
        match event {
            GameEvent::Jump => Some(SoundEffect::Jump),
            GameEvent::Shoot => Some(SoundEffect::Shoot),
            GameEvent::Crash { .. } | GameEvent::ObstacleDestroyed => Some(SoundEffect::Crash),
            GameEvent::PowerupCollected(PowerupKind::Healing) => Some(SoundEffect::Heal),
            GameEvent::PowerupCollected(kind) => Some(SoundEffect::Powerup(*kind)),
            GameEvent::LetterCollected => Some(SoundEffect::CollectWish),
            GameEvent::TimeWarning => Some(SoundEffect::TimeWarning),
            GameEvent::ActChanged { .. }
            | GameEvent::Dialogue(_)
            | GameEvent::LandmarkSpawned(_)
            | GameEvent::EndingStarted => None,
        }
    }
}

/// Looping background tracks, one per act before the finale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MusicTrack {
    Wonderland,
    GrayWorld,
    OceanOfSilence,
    GreatBlizzard,
}

impl MusicTrack {
    pub const ALL: [MusicTrack; 4] = [
        MusicTrack::Wonderland,
        MusicTrack::GrayWorld,
        MusicTrack::OceanOfSilence,
        MusicTrack::GreatBlizzard,
    ];

    /// Track for an act; the finale is silent until the ending theme
    pub fn for_act(act_index: usize) -> Option<Self> {
        Self::ALL.get(act_index).copied()
    }

    pub fn path(&self) -> &'static str {
        match self {
            MusicTrack::Wonderland => "./wonderland.mp3",
            MusicTrack::GrayWorld => "./gray_world.mp3",
            MusicTrack::OceanOfSilence => "./ocean_of_silence.mp3",
            MusicTrack::GreatBlizzard => "./great_blizzard.mp3",
        }
    }
}

pub const ENDING_TRACK: &str = "./ending.mp3";
/// Act music cross-fade length (seconds)
pub const MUSIC_FADE_SECS: f64 = 1.5;
/// Act music plays at this gain
pub const MUSIC_GAIN: f32 = 0.3;

/// Gain of the wind/runner loop for a scroll speed in pixels/s
///
/// Zero speed silences the loop; any motion keeps it within a quiet band.
pub fn ambient_gain(speed: f32) -> f32 {
    if speed <= 0.0 {
        0.0
    } else {
        (speed / 3000.0).clamp(0.05, 0.2)
    }
}

/// Cross-fade from one act track to another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MusicChange {
    pub from: Option<MusicTrack>,
    pub to: Option<MusicTrack>,
}

/// Which act track is wanted and which one is actually audible
///
/// Requests made before the audio graph exists are remembered and started
/// by [`MusicCue::sync`] once it is built.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MusicCue {
    wanted: Option<MusicTrack>,
    playing: Option<MusicTrack>,
}

impl MusicCue {
    /// Record the wanted track; returns the change to apply when `ready`
    pub fn request(&mut self, next: Option<MusicTrack>, ready: bool) -> Option<MusicChange> {
        self.wanted = next;
        if ready { self.sync() } else { None }
    }

    /// Bring the audible track in line with the wanted one
    pub fn sync(&mut self) -> Option<MusicChange> {
        if self.playing == self.wanted {
            return None;
        }
        let change = MusicChange {
            from: self.playing,
            to: self.wanted,
        };
        self.playing = self.wanted;
        Some(change)
    }

    pub fn playing(&self) -> Option<MusicTrack> {
        self.playing
    }
}

/// Operations the game core needs from an audio backend
pub trait AudioSink {
    /// Create the audio graph; call from a user gesture
    fn initialize(&mut self);
    fn play_one_shot(&mut self, effect: SoundEffect);
    /// Cross-fade to the act's track; no-op if it is already playing
    fn play_level_music(&mut self, act_index: usize);
    fn stop_music(&mut self);
    fn play_ending_music(&mut self, offset_secs: f64, fade_secs: f64);
    fn stop_ending_music(&mut self);
    /// Drive the wind loop from the current world speed
    fn set_ambient_volume(&mut self, speed: f32);
}

/// Silent backend for native builds and tests
#[derive(Debug, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn initialize(&mut self) {
        log::trace!("audio: initialize");
    }

    fn play_one_shot(&mut self, effect: SoundEffect) {
        log::trace!("audio: {:?}", effect);
    }

    fn play_level_music(&mut self, act_index: usize) {
        log::trace!("audio: level music {}", act_index);
    }

    fn stop_music(&mut self) {
        log::trace!("audio: stop music");
    }

    fn play_ending_music(&mut self, offset_secs: f64, fade_secs: f64) {
        log::trace!("audio: ending music at {}s, fade {}s", offset_secs, fade_secs);
    }

    fn stop_ending_music(&mut self) {
        log::trace!("audio: stop ending music");
    }

    fn set_ambient_volume(&mut self, speed: f32) {
        log::trace!("audio: ambient {}", ambient_gain(speed));
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::WebAudio;

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::Cell;
    use std::rc::Rc;

    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use web_sys::{
        AudioBufferSourceNode, AudioContext, BiquadFilterType, GainNode, HtmlAudioElement,
        OscillatorNode, OscillatorType,
    };

    use super::{
        AudioSink, ENDING_TRACK, MUSIC_FADE_SECS, MUSIC_GAIN, MusicChange, MusicCue, MusicTrack,
        SoundEffect, ambient_gain,
    };

    /// A media element routed through its own gain node
    struct Stream {
        element: HtmlAudioElement,
        gain: Option<GainNode>,
        /// Bumped on every start; stale pause callbacks compare against it
        generation: Rc<Cell<u32>>,
    }

    impl Stream {
        fn new(src: &str, looping: bool) -> Option<Self> {
            let element = HtmlAudioElement::new_with_src(src).ok()?;
            element.set_loop(looping);
            element.set_preload("auto");
            Some(Self {
                element,
                gain: None,
                generation: Rc::new(Cell::new(0)),
            })
        }

        fn connect(&mut self, ctx: &AudioContext, out: &GainNode) {
            if self.gain.is_some() {
                return;
            }
            let Ok(source) = ctx.create_media_element_source(&self.element) else {
                log::warn!("Failed to route media element");
                return;
            };
            let Ok(gain) = ctx.create_gain() else { return };
            gain.gain().set_value(0.0);
            if source.connect_with_audio_node(&gain).is_ok()
                && gain.connect_with_audio_node(out).is_ok()
            {
                self.gain = Some(gain);
            }
        }

        fn ramp_to(&self, ctx: &AudioContext, target: f32, secs: f64) {
            let Some(gain) = &self.gain else {
                self.element.set_volume(target as f64);
                return;
            };
            let t = ctx.current_time();
            let param = gain.gain();
            param.cancel_scheduled_values(t).ok();
            param.set_value_at_time(param.value(), t).ok();
            param.linear_ramp_to_value_at_time(target, t + secs).ok();
        }

        fn start(&self, offset: f64) {
            self.generation.set(self.generation.get().wrapping_add(1));
            self.element.set_current_time(offset);
            match self.element.play() {
                Ok(promise) => {
                    wasm_bindgen_futures::spawn_local(async move {
                        if let Err(e) = wasm_bindgen_futures::JsFuture::from(promise).await {
                            log::warn!("Music playback rejected: {:?}", e);
                        }
                    });
                }
                Err(e) => log::warn!("Music playback failed: {:?}", e),
            }
        }

        /// Pause and rewind once a fade-out has finished, unless restarted meanwhile
        fn stop_after(&self, secs: f64) {
            let element = self.element.clone();
            let generation = self.generation.clone();
            let expected = generation.get();
            let callback = Closure::once_into_js(move || {
                if generation.get() == expected {
                    let _ = element.pause();
                    element.set_current_time(0.0);
                }
            });
            if let Some(window) = web_sys::window() {
                let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
                    callback.unchecked_ref(),
                    (secs * 1000.0) as i32,
                );
            }
        }

        fn stop_now(&self) {
            self.generation.set(self.generation.get().wrapping_add(1));
            let _ = self.element.pause();
            self.element.set_current_time(0.0);
            if let Some(gain) = &self.gain {
                gain.gain().set_value(0.0);
            } else {
                self.element.set_volume(0.0);
            }
        }
    }

    /// Web Audio backend
    pub struct WebAudio {
        ctx: Option<AudioContext>,
        sfx: Option<GainNode>,
        music: Option<GainNode>,
        sleigh: Option<GainNode>,
        tracks: Vec<(MusicTrack, Stream)>,
        cue: MusicCue,
        ending: Option<Stream>,
        sfx_volume: f32,
        music_volume: f32,
    }

    impl Default for WebAudio {
        fn default() -> Self {
            Self::new(0.8, 0.7)
        }
    }

    impl WebAudio {
        /// Media elements are created up front; the context waits for a gesture
        pub fn new(sfx_volume: f32, music_volume: f32) -> Self {
            let tracks = MusicTrack::ALL
                .iter()
                .filter_map(|&track| Stream::new(track.path(), true).map(|s| (track, s)))
                .collect();
            Self {
                ctx: None,
                sfx: None,
                music: None,
                sleigh: None,
                tracks,
                cue: MusicCue::default(),
                ending: Stream::new(ENDING_TRACK, false),
                sfx_volume,
                music_volume,
            }
        }

        fn build_graph(&mut self) -> Option<()> {
            let ctx = match AudioContext::new() {
                Ok(ctx) => ctx,
                Err(_) => {
                    log::warn!("Failed to create AudioContext - audio disabled");
                    return None;
                }
            };

            let master = ctx.create_gain().ok()?;
            master.gain().set_value(0.5);
            master.connect_with_audio_node(&ctx.destination()).ok()?;

            let sfx = ctx.create_gain().ok()?;
            sfx.gain().set_value(self.sfx_volume);
            sfx.connect_with_audio_node(&master).ok()?;

            let music = ctx.create_gain().ok()?;
            music.gain().set_value(self.music_volume);
            music.connect_with_audio_node(&master).ok()?;

            for (_, stream) in self.tracks.iter_mut() {
                stream.connect(&ctx, &music);
            }
            if let Some(ending) = self.ending.as_mut() {
                ending.connect(&ctx, &music);
            }

            self.sleigh = start_sleigh_loop(&ctx, &sfx);
            self.sfx = Some(sfx);
            self.music = Some(music);
            self.ctx = Some(ctx);
            log::info!("Audio graph ready");
            Some(())
        }

        fn resume_if_suspended(&self) {
            if let Some(ctx) = &self.ctx {
                if ctx.state() == web_sys::AudioContextState::Suspended {
                    let _ = ctx.resume();
                }
            }
        }

        /// Create an oscillator with gain envelope, routed into the effects bus
        fn create_osc(
            &self,
            ctx: &AudioContext,
            freq: f32,
            osc_type: OscillatorType,
        ) -> Option<(OscillatorNode, GainNode)> {
            let bus = self.sfx.as_ref()?;
            let osc = ctx.create_oscillator().ok()?;
            let gain = ctx.create_gain().ok()?;

            osc.set_type(osc_type);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(bus).ok()?;

            Some((osc, gain))
        }

        /// Low-passed white noise with a decaying envelope
        fn noise_burst(&self, ctx: &AudioContext, duration: f64, cutoff: f32, q: f32, vol: f32) {
            let Some(bus) = &self.sfx else { return };
            let Some(source) = noise_source(ctx, duration) else {
                return;
            };
            let Ok(filter) = ctx.create_biquad_filter() else {
                return;
            };
            filter.set_type(BiquadFilterType::Lowpass);
            filter.frequency().set_value(cutoff);
            filter.q().set_value(q);
            let Ok(gain) = ctx.create_gain() else { return };
            let t = ctx.current_time();
            gain.gain().set_value_at_time(vol, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + duration)
                .ok();

            if source.connect_with_audio_node(&filter).is_ok()
                && filter.connect_with_audio_node(&gain).is_ok()
                && gain.connect_with_audio_node(bus).is_ok()
            {
                source.start().ok();
            }
        }

        // === Sound generators ===

        /// Jump - rising sine
        fn play_jump(&self, ctx: &AudioContext) {
            let Some((osc, gain)) = self.create_osc(ctx, 150.0, OscillatorType::Sine) else {
                return;
            };
            let t = ctx.current_time();

            gain.gain().set_value_at_time(0.2, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.2)
                .ok();
            osc.frequency().set_value_at_time(150.0, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(300.0, t + 0.2)
                .ok();

            osc.start().ok();
            osc.stop_with_when(t + 0.2).ok();
        }

        /// Shoot - short noise puff
        fn play_shoot(&self, ctx: &AudioContext) {
            self.noise_burst(ctx, 0.05, 2000.0, 0.0, 0.3);
        }

        /// Crash - low triangle thud over filtered noise
        fn play_crash(&self, ctx: &AudioContext) {
            if let Some((osc, gain)) = self.create_osc(ctx, 60.0, OscillatorType::Triangle) {
                let t = ctx.current_time();
                gain.gain().set_value_at_time(0.4, t).ok();
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.01, t + 0.3)
                    .ok();
                osc.frequency().set_value_at_time(60.0, t).ok();
                osc.frequency()
                    .exponential_ramp_to_value_at_time(20.0, t + 0.3)
                    .ok();
                osc.start().ok();
                osc.stop_with_when(t + 0.3).ok();
            }
            self.noise_burst(ctx, 0.3, 500.0, 50.0, 0.3);
        }

        /// Powerup - soft C major arpeggio
        fn play_powerup(&self, ctx: &AudioContext) {
            for (i, freq) in [523.25, 659.25, 783.99, 1046.5].iter().enumerate() {
                let delay = i as f64 * 0.05;
                if let Some((osc, gain)) = self.create_osc(ctx, *freq, OscillatorType::Sine) {
                    let t = ctx.current_time() + delay;
                    gain.gain().set_value_at_time(0.05, t).ok();
                    gain.gain()
                        .exponential_ramp_to_value_at_time(0.001, t + 0.1)
                        .ok();
                    osc.start_with_when(t).ok();
                    osc.stop_with_when(t + 0.1).ok();
                }
            }
        }

        /// Heal - linear glide up
        fn play_heal(&self, ctx: &AudioContext) {
            let Some((osc, gain)) = self.create_osc(ctx, 400.0, OscillatorType::Sine) else {
                return;
            };
            let t = ctx.current_time();

            osc.frequency().set_value_at_time(400.0, t).ok();
            osc.frequency()
                .linear_ramp_to_value_at_time(600.0, t + 0.5)
                .ok();
            gain.gain().set_value_at_time(0.2, t).ok();
            gain.gain().linear_ramp_to_value_at_time(0.0, t + 0.5).ok();

            osc.start().ok();
            osc.stop_with_when(t + 0.5).ok();
        }

        /// Wish - slow shimmering rise
        fn play_collect_wish(&self, ctx: &AudioContext) {
            let Some((osc, gain)) = self.create_osc(ctx, 800.0, OscillatorType::Sine) else {
                return;
            };
            let t = ctx.current_time();

            osc.frequency().set_value_at_time(800.0, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(1200.0, t + 1.0)
                .ok();
            gain.gain().set_value_at_time(0.0, t).ok();
            gain.gain().linear_ramp_to_value_at_time(0.1, t + 0.2).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.001, t + 1.0)
                .ok();

            osc.start_with_when(t).ok();
            osc.stop_with_when(t + 1.0).ok();
        }

        /// Time warning - single A5 pulse
        fn play_time_warning(&self, ctx: &AudioContext) {
            let Some((osc, gain)) = self.create_osc(ctx, 880.0, OscillatorType::Sine) else {
                return;
            };
            let t = ctx.current_time();

            gain.gain().set_value_at_time(0.0, t).ok();
            gain.gain().linear_ramp_to_value_at_time(0.2, t + 0.1).ok();
            gain.gain().linear_ramp_to_value_at_time(0.0, t + 0.5).ok();

            osc.start().ok();
            osc.stop_with_when(t + 0.5).ok();
        }

        fn transition_music(&mut self, next: Option<MusicTrack>) {
            let ready = self.ctx.is_some();
            if let Some(change) = self.cue.request(next, ready) {
                self.apply_music(change);
            }
        }

        fn apply_music(&self, change: MusicChange) {
            let Some(ctx) = self.ctx.clone() else { return };
            if let Some(old) = change.from.and_then(|t| self.stream(t)) {
                old.ramp_to(&ctx, 0.0, MUSIC_FADE_SECS);
                old.stop_after(MUSIC_FADE_SECS);
            }
            if let Some(new) = change.to.and_then(|t| self.stream(t)) {
                new.start(0.0);
                new.ramp_to(&ctx, MUSIC_GAIN, MUSIC_FADE_SECS);
            }
        }

        fn stream(&self, track: MusicTrack) -> Option<&Stream> {
            self.tracks
                .iter()
                .find(|(t, _)| *t == track)
                .map(|(_, stream)| stream)
        }
    }

    impl AudioSink for WebAudio {
        fn initialize(&mut self) {
            if self.ctx.is_some() {
                self.resume_if_suspended();
                return;
            }
            if self.build_graph().is_none() {
                self.ctx = None;
                return;
            }
            // Start whatever the game asked for before the first gesture
            if let Some(change) = self.cue.sync() {
                self.apply_music(change);
            }
        }

        fn play_one_shot(&mut self, effect: SoundEffect) {
            let Some(ctx) = self.ctx.clone() else { return };
            self.resume_if_suspended();

            match effect {
                SoundEffect::Jump => self.play_jump(&ctx),
                SoundEffect::Shoot => self.play_shoot(&ctx),
                SoundEffect::Crash => self.play_crash(&ctx),
                SoundEffect::Powerup(_) => self.play_powerup(&ctx),
                SoundEffect::Heal => self.play_heal(&ctx),
                SoundEffect::CollectWish => self.play_collect_wish(&ctx),
                SoundEffect::TimeWarning => self.play_time_warning(&ctx),
            }
        }

        fn play_level_music(&mut self, act_index: usize) {
            self.transition_music(MusicTrack::for_act(act_index));
        }

        fn stop_music(&mut self) {
            self.transition_music(None);
        }

        fn play_ending_music(&mut self, offset_secs: f64, fade_secs: f64) {
            self.stop_music();
            let Some(ctx) = self.ctx.clone() else {
                log::warn!("Ending music requested before audio init");
                return;
            };
            let Some(ending) = &self.ending else {
                log::warn!("Ending audio element not initialized");
                return;
            };
            log::info!("Ending music, fading in over {}s", fade_secs);
            ending.stop_now();
            ending.start(offset_secs);
            ending.ramp_to(&ctx, 1.0, fade_secs);
        }

        fn stop_ending_music(&mut self) {
            if let Some(ending) = &self.ending {
                ending.stop_now();
            }
        }

        fn set_ambient_volume(&mut self, speed: f32) {
            if let (Some(ctx), Some(sleigh)) = (&self.ctx, &self.sleigh) {
                sleigh
                    .gain()
                    .set_target_at_time(ambient_gain(speed), ctx.current_time(), 0.1)
                    .ok();
            }
        }
    }

    fn noise_source(ctx: &AudioContext, duration: f64) -> Option<AudioBufferSourceNode> {
        let rate = ctx.sample_rate();
        let len = (rate as f64 * duration) as u32;
        let buffer = ctx.create_buffer(1, len.max(1), rate).ok()?;
        let mut data: Vec<f32> = (0..len.max(1))
            .map(|_| rand::random::<f32>() * 2.0 - 1.0)
            .collect();
        buffer.copy_to_channel(&mut data, 0).ok()?;
        let source = ctx.create_buffer_source().ok()?;
        source.set_buffer(Some(&buffer));
        Some(source)
    }

    /// Wind and runner hiss, silent until the driver raises it
    fn start_sleigh_loop(ctx: &AudioContext, bus: &GainNode) -> Option<GainNode> {
        let source = noise_source(ctx, 2.0)?;
        source.set_loop(true);
        let filter = ctx.create_biquad_filter().ok()?;
        filter.set_type(BiquadFilterType::Lowpass);
        filter.frequency().set_value(400.0);
        let gain = ctx.create_gain().ok()?;
        gain.gain().set_value(0.0);

        source.connect_with_audio_node(&filter).ok()?;
        filter.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(bus).ok()?;
        source.start().ok()?;
        Some(gain)
    }
}
