//! Engine configuration loading.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable engine parameters, usually loaded from the game's setup
/// file. All fields have conservative defaults so an empty config is
/// valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Whether audio output is enabled at all. When false the engine
    /// refuses to load decoders and `advance()` is a no-op.
    pub sound_enabled: bool,

    /// Whether music track changes crossfade (per-type rates still
    /// come from the catalog). Turning this off mid-fade collapses any
    /// fade in progress.
    pub crossfade_enabled: bool,

    /// Number of slots in the decoded-sound cache.
    pub cache_entries: usize,

    /// Maximum number of pending tracks in the play queue.
    pub max_queue_len: usize,

    /// Poll streaming decoders from a background thread instead of
    /// only from the per-frame advance.
    pub threaded_polling: bool,

    /// Main loop frame rate; used to convert crossfade steps to
    /// milliseconds for the early-dequeue lead time.
    pub frames_per_second: u32,

    /// Bytes fed to a streaming decoder per refill.
    pub stream_chunk_size: usize,

    /// Distance within which a positional sound plays at full volume.
    pub full_volume_distance: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            crossfade_enabled: true,
            cache_entries: 16,
            max_queue_len: 10,
            threaded_polling: false,
            frames_per_second: 40,
            stream_chunk_size: 32 * 1024,
            full_volume_distance: 25,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file; missing keys fall back to
    /// defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Validate internally consistent settings.
    pub fn validate(&self) -> Result<()> {
        if self.cache_entries == 0 {
            return Err(Error::Config("cache_entries must be at least 1".into()));
        }
        if self.frames_per_second == 0 {
            return Err(Error::Config("frames_per_second must be nonzero".into()));
        }
        if self.stream_chunk_size == 0 {
            return Err(Error::Config("stream_chunk_size must be nonzero".into()));
        }
        Ok(())
    }
}
