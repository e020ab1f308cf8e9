//! Persistent progression flags
//!
//! A tiny key/value store behind [`FlagStore`]: browser LocalStorage on
//! wasm32, an in-memory map elsewhere. Only three flags are tracked: the
//! last acknowledged version, story completion and whether the full intro
//! has been watched.

use std::collections::HashMap;

/// Version string shown in the update notice
pub const CURRENT_VERSION: &str = "1.3";

pub const VERSION_KEY: &str = "sleigh_ride_version";
pub const STORY_COMPLETE_KEY: &str = "sleigh_ride_story_complete";
pub const INTRO_SEEN_KEY: &str = "sleigh_ride_intro_seen";

/// String key/value storage
pub trait FlagStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

/// Volatile store for native builds and tests
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlagStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

/// Browser LocalStorage; silently read-empty when storage is unavailable
#[cfg(target_arch = "wasm32")]
pub struct LocalStorageStore {
    storage: Option<web_sys::Storage>,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorageStore {
    pub fn new() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();
        if storage.is_none() {
            log::warn!("LocalStorage unavailable - progress will not persist");
        }
        Self { storage }
    }
}

#[cfg(target_arch = "wasm32")]
impl Default for LocalStorageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_arch = "wasm32")]
impl FlagStore for LocalStorageStore {
    fn get(&self, key: &str) -> Option<String> {
        self.storage.as_ref()?.get_item(key).ok().flatten()
    }

    fn set(&mut self, key: &str, value: &str) {
        if let Some(storage) = &self.storage {
            if storage.set_item(key, value).is_err() {
                log::warn!("Failed to write {}", key);
            }
        }
    }
}

/// Progression flags read at startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressFlags {
    /// Version the player last acknowledged, if any
    pub seen_version: Option<String>,
    /// Unlocks endless mode
    pub story_complete: bool,
    /// Shortens the intro to the quick transition
    pub intro_seen: bool,
}

impl ProgressFlags {
    pub fn load(store: &dyn FlagStore) -> Self {
        let flags = Self {
            seen_version: store.get(VERSION_KEY),
            story_complete: store.get(STORY_COMPLETE_KEY).as_deref() == Some("true"),
            intro_seen: store.get(INTRO_SEEN_KEY).as_deref() == Some("true"),
        };
        log::info!(
            "Loaded flags: story_complete={} intro_seen={}",
            flags.story_complete,
            flags.intro_seen
        );
        flags
    }

    /// Whether the "update available" notice should show
    pub fn needs_update_notice(&self) -> bool {
        self.seen_version.as_deref() != Some(CURRENT_VERSION)
    }

    /// Endless mode is locked until the story has been finished once
    pub fn endless_unlocked(&self) -> bool {
        self.story_complete
    }

    pub fn acknowledge_version(&mut self, store: &mut dyn FlagStore) {
        self.seen_version = Some(CURRENT_VERSION.to_string());
        store.set(VERSION_KEY, CURRENT_VERSION);
    }

    pub fn mark_intro_seen(&mut self, store: &mut dyn FlagStore) {
        self.intro_seen = true;
        store.set(INTRO_SEEN_KEY, "true");
    }

    pub fn mark_story_complete(&mut self, store: &mut dyn FlagStore) {
        if !self.story_complete {
            log::info!("Story complete - endless mode unlocked");
        }
        self.story_complete = true;
        store.set(STORY_COMPLETE_KEY, "true");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_store_defaults() {
        let store = MemoryStore::new();
        let flags = ProgressFlags::load(&store);
        assert_eq!(flags, ProgressFlags::default());
        assert!(flags.needs_update_notice());
        assert!(!flags.endless_unlocked());
    }

    #[test]
    fn test_flags_round_trip_through_store() {
        let mut store = MemoryStore::new();
        let mut flags = ProgressFlags::load(&store);
        flags.mark_intro_seen(&mut store);
        flags.mark_story_complete(&mut store);
        flags.acknowledge_version(&mut store);

        let reloaded = ProgressFlags::load(&store);
        assert!(reloaded.intro_seen);
        assert!(reloaded.endless_unlocked());
        assert!(!reloaded.needs_update_notice());
        assert_eq!(store.get(STORY_COMPLETE_KEY).as_deref(), Some("true"));
    }

    #[test]
    fn test_only_literal_true_counts() {
        let mut store = MemoryStore::new();
        store.set(STORY_COMPLETE_KEY, "yes");
        store.set(INTRO_SEEN_KEY, "TRUE");
        store.set(VERSION_KEY, "1.2");
        let flags = ProgressFlags::load(&store);
        assert!(!flags.story_complete);
        assert!(!flags.intro_seen);
        assert!(flags.needs_update_notice());
    }
}
