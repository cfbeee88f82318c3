//! Audio catalog: clip and clip-type metadata from the game data.
//!
//! Every playable asset is described by an [`AudioClip`] entry carrying
//! its file name, format, and playback defaults. Clips belong to an
//! [`AudioClipType`], which decides channel reservation, the crossfade
//! rate for track changes, and how far volume drops while speech plays.
//! Reserved channels are packed from channel 0 in catalog type order;
//! the shared pool starts right after them.

use foley_common::types::{AudioType, ClipId, ClipRef, FileFormat, MAX_SOUND_CHANNELS};
use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::{Error, Result};

/// One playable asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioClip {
    pub id: ClipId,
    /// Name scripts use to refer to the clip ("aDoorSlam").
    pub script_name: String,
    /// Asset file name inside the game's resources.
    pub file_name: String,
    pub format: FileFormat,
    pub clip_type: AudioType,
    /// Default playback volume, 0-100%.
    pub default_volume: i32,
    pub default_priority: i32,
    pub default_repeat: bool,
}

/// A category of clips sharing channel and mixing policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioClipType {
    pub id: AudioType,
    /// Channels reserved exclusively for this type; 0 means the shared
    /// pool.
    pub reserved_channels: u32,
    /// Volume percent faded per crossfade step when a track of this
    /// type replaces another; 0 disables crossfading for the type.
    pub crossfade_speed: i32,
    /// Percent subtracted from clips of this type while speech plays.
    pub speech_volume_drop: i32,
}

/// The loaded catalog. Construction validates cross references so the
/// engine can index without checking.
pub struct AudioCatalog {
    clips: Vec<AudioClip>,
    types: Vec<AudioClipType>,
}

impl AudioCatalog {
    pub fn new(types: Vec<AudioClipType>, clips: Vec<AudioClip>) -> Result<Self> {
        for (i, t) in types.iter().enumerate() {
            if t.id.0 as usize != i {
                return Err(Error::Config(format!(
                    "audio type at index {i} has id {}",
                    t.id.0
                )));
            }
        }
        for (i, clip) in clips.iter().enumerate() {
            if clip.id.0 as usize != i {
                return Err(Error::Config(format!(
                    "audio clip at index {i} has id {}",
                    clip.id.0
                )));
            }
            if clip.clip_type.0 as usize >= types.len() {
                return Err(Error::Config(format!(
                    "clip {} references missing type {}",
                    clip.script_name, clip.clip_type.0
                )));
            }
        }
        let reserved: u32 = types.iter().map(|t| t.reserved_channels).sum();
        if reserved as usize > MAX_SOUND_CHANNELS {
            return Err(Error::Config(format!(
                "audio types reserve {reserved} channels, only {MAX_SOUND_CHANNELS} exist"
            )));
        }
        Ok(Self { clips, types })
    }

    pub fn clip(&self, id: ClipId) -> Option<&AudioClip> {
        self.clips.get(id.0 as usize)
    }

    pub fn clip_type(&self, id: AudioType) -> Option<&AudioClipType> {
        self.types.get(id.0 as usize)
    }

    /// Type metadata for a clip id, when both exist.
    pub fn type_of(&self, clip: ClipId) -> Option<&AudioClipType> {
        self.clip(clip).and_then(|c| self.clip_type(c.clip_type))
    }

    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Total channels reserved across all types.
    pub fn reserved_channel_count(&self) -> usize {
        self.types
            .iter()
            .map(|t| t.reserved_channels as usize)
            .sum()
    }

    /// The packed sub-range of channels reserved for `id`, or `None`
    /// when the type uses the shared pool.
    pub fn reserved_range(&self, id: AudioType) -> Option<Range<usize>> {
        let t = self.clip_type(id)?;
        if t.reserved_channels == 0 {
            return None;
        }
        let start: usize = self
            .types
            .iter()
            .take(id.0 as usize)
            .map(|t| t.reserved_channels as usize)
            .sum();
        Some(start..start + t.reserved_channels as usize)
    }

    /// Channels a clip of type `id` may play on: its reserved range, or
    /// the shared pool after all reservations.
    pub fn eligible_range(&self, id: AudioType) -> Range<usize> {
        match self.reserved_range(id) {
            Some(range) => range,
            None => self.reserved_channel_count()..MAX_SOUND_CHANNELS,
        }
    }

    pub fn find_by_name(&self, script_name: &str) -> Option<&AudioClip> {
        self.clips
            .iter()
            .find(|c| c.script_name.eq_ignore_ascii_case(script_name))
    }

    /// Resolve a script-side reference to a canonical clip id.
    ///
    /// Legacy numbers map onto the generated names older game data
    /// carries ("aSound3", "aMusic5"). Unresolvable references yield
    /// `None`; playing a missing clip is a silent no-op, not an error.
    pub fn resolve(&self, clip_ref: ClipRef) -> Option<ClipId> {
        match clip_ref {
            ClipRef::Clip(id) => self.clip(id).map(|c| c.id),
            ClipRef::Legacy { number, is_music } => {
                if number < 0 {
                    return None;
                }
                let prefix = if is_music { "aMusic" } else { "aSound" };
                self.find_by_name(&format!("{prefix}{number}")).map(|c| c.id)
            }
        }
    }
}
