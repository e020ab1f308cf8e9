//! Game settings and preferences
//!
//! Persisted as one JSON blob in the flag store, separate from the
//! progression flags.

use serde::{Deserialize, Serialize};

use crate::persistence::FlagStore;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    /// Next preset in the Low -> Medium -> High cycle
    pub fn next(self) -> Self {
        match self {
            QualityPreset::Low => QualityPreset::Medium,
            QualityPreset::Medium => QualityPreset::High,
            QualityPreset::High => QualityPreset::Low,
        }
    }

    /// Maximum live particles for this preset
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 150,
            QualityPreset::Medium => 500,
            QualityPreset::High => 1000,
        }
    }

    /// Background stars generated per renderer
    pub fn star_count(&self) -> usize {
        match self {
            QualityPreset::Low => 30,
            QualityPreset::Medium => 80,
            QualityPreset::High => 160,
        }
    }

    /// Whether to draw the fog bands between terrain layers
    pub fn fog_enabled(&self) -> bool {
        !matches!(self, QualityPreset::Low)
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,

    // === Visual Effects ===
    /// Camera shake on crashes and blasts
    pub screen_shake: bool,
    /// Full-screen flash on act changes
    pub act_flash: bool,
    /// Glitch overlay in the later acts
    pub glitch: bool,
    /// Particle effects (snow, debris, sparkles)
    pub particles: bool,

    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    /// Music volume (0.0 - 1.0)
    pub music_volume: f32,

    // === Accessibility ===
    /// Reduced motion (no shake, flash or glitch)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,

            screen_shake: true,
            act_flash: true,
            glitch: true,
            particles: true,

            master_volume: 0.8,
            sfx_volume: 1.0,
            music_volume: 0.7,

            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Apply a quality preset (updates quality-dependent settings)
    pub fn apply_preset(&mut self, preset: QualityPreset) {
        self.quality = preset;

        // Low preset drops the glitch overlay for performance
        if preset == QualityPreset::Low {
            self.glitch = false;
        }
    }

    /// Step to the next quality preset
    pub fn cycle_quality(&mut self) -> QualityPreset {
        self.apply_preset(self.quality.next());
        self.quality
    }

    pub fn toggle_reduced_motion(&mut self) -> bool {
        self.reduced_motion = !self.reduced_motion;
        self.reduced_motion
    }

    /// Effective screen shake (respects reduced_motion)
    pub fn effective_screen_shake(&self) -> bool {
        self.screen_shake && !self.reduced_motion
    }

    /// Effective act flash (respects reduced_motion)
    pub fn effective_act_flash(&self) -> bool {
        self.act_flash && !self.reduced_motion
    }

    /// Effective glitch overlay (respects reduced_motion)
    pub fn effective_glitch(&self) -> bool {
        self.glitch && !self.reduced_motion
    }

    /// Effective particle count cap
    pub fn max_particles(&self) -> usize {
        if !self.particles {
            0
        } else {
            self.quality.max_particles()
        }
    }

    pub fn effective_sfx_volume(&self) -> f32 {
        (self.master_volume * self.sfx_volume).clamp(0.0, 1.0)
    }

    pub fn effective_music_volume(&self) -> f32 {
        (self.master_volume * self.music_volume).clamp(0.0, 1.0)
    }

    /// Storage key
    pub const STORAGE_KEY: &'static str = "sleigh_ride_settings";

    /// Load settings, falling back to defaults on missing or corrupt data
    pub fn load(store: &dyn FlagStore) -> Self {
        match store.get(Self::STORAGE_KEY) {
            Some(json) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings");
                    settings
                }
                Err(e) => {
                    log::warn!("Discarding corrupt settings: {}", e);
                    Self::default()
                }
            },
            None => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &mut dyn FlagStore) {
        match serde_json::to_string(self) {
            Ok(json) => {
                store.set(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
            Err(e) => log::warn!("Failed to serialise settings: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[test]
    fn test_reduced_motion_disables_effects() {
        let settings = Settings {
            reduced_motion: true,
            ..Settings::default()
        };
        assert!(!settings.effective_screen_shake());
        assert!(!settings.effective_act_flash());
        assert!(!settings.effective_glitch());
    }

    #[test]
    fn test_low_preset() {
        let mut settings = Settings::default();
        settings.apply_preset(QualityPreset::Low);
        assert!(!settings.glitch);
        assert_eq!(settings.max_particles(), 150);
        assert!(!settings.quality.fog_enabled());
    }

    #[test]
    fn test_particles_off_caps_at_zero() {
        let settings = Settings {
            particles: false,
            ..Settings::default()
        };
        assert_eq!(settings.max_particles(), 0);
    }

    #[test]
    fn test_save_then_load() {
        let mut store = MemoryStore::new();
        let mut settings = Settings::default();
        settings.apply_preset(QualityPreset::High);
        settings.music_volume = 0.25;
        settings.save(&mut store);
        assert_eq!(Settings::load(&store), settings);
    }

    #[test]
    fn test_corrupt_json_falls_back() {
        let mut store = MemoryStore::new();
        store.set(Settings::STORAGE_KEY, "{not json");
        assert_eq!(Settings::load(&store), Settings::default());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let mut store = MemoryStore::new();
        store.set(Settings::STORAGE_KEY, r#"{"quality":"Low"}"#);
        let settings = Settings::load(&store);
        assert_eq!(settings.quality, QualityPreset::Low);
        assert!(settings.screen_shake);
    }

    #[test]
    fn test_quality_cycles_through_presets() {
        let mut settings = Settings::default();
        assert_eq!(settings.cycle_quality(), QualityPreset::High);
        assert_eq!(settings.max_particles(), 1000);
        assert_eq!(settings.cycle_quality(), QualityPreset::Low);
        assert!(!settings.glitch);
        assert_eq!(settings.cycle_quality(), QualityPreset::Medium);
    }

    #[test]
    fn test_toggles_survive_reload() {
        let mut store = MemoryStore::new();
        let mut settings = Settings::load(&store);
        assert!(settings.toggle_reduced_motion());
        settings.cycle_quality();
        settings.save(&mut store);

        let reloaded = Settings::load(&store);
        assert!(reloaded.reduced_motion);
        assert_eq!(reloaded.quality, QualityPreset::High);
        assert!(!reloaded.effective_act_flash());
    }
}
