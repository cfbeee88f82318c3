//! Playing sound instances.
//!
//! A [`SoundClip`] is one playing (or paused) sound: per-instance volume
//! and panning state plus control over a decoder backend. The engine
//! owns clips through channel slots as [`ClipHandle`]s; the per-instance
//! lock is what lets the background poll thread drive decoding while the
//! game thread adjusts volume or seeks.

mod buffered;
mod loader;
mod sample;
mod sequence;
mod stream;
mod tracker;

pub use buffered::BufferedClip;
pub use loader::load_sound_clip;
pub use sample::SampleClip;
pub use sequence::SequenceClip;
pub use stream::StreamClip;
pub use tracker::TrackerClip;

use crate::voice::VoiceId;
use crate::Result;
use foley_common::types::{AudioType, ClipId, FileFormat};
use foley_common::volume::{clamp_internal, pan_percent_to_internal, percent_to_internal};
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared, lockable ownership of a playing clip.
pub type ClipHandle = Arc<Mutex<Box<dyn SoundClip>>>;

/// Wrap a freshly built clip for channel assignment.
pub fn into_handle(clip: Box<dyn SoundClip>) -> ClipHandle {
    Arc::new(Mutex::new(clip))
}

/// State common to every clip variant.
///
/// Volume is tracked in two mirrored domains: `vol` is the internal
/// 0-255 value handed to the backend, `vol_percent` the 0-100 value the
/// scripting boundary sees. `original_vol_percent` remembers the volume
/// before temporary overrides (fast-forward muting) so it can be
/// restored. The final audible volume adds the speech-drop and
/// directional modifiers, clamped back into range.
#[derive(Debug, Clone)]
pub struct ClipBase {
    pub done: bool,
    pub paused: bool,
    pub repeat: bool,
    pub priority: i32,
    /// Internal 0-255 volume.
    pub vol: i32,
    /// External 0-100% mirror of `vol`.
    pub vol_percent: i32,
    /// Volume before any temporary override.
    pub original_vol_percent: i32,
    /// Internal 0-255 panning, 128 center.
    pub panning: i32,
    /// External -100..100% mirror of `panning`.
    pub panning_percent: i32,
    /// Speech-drop adjustment, zero or negative.
    pub vol_modifier: i32,
    /// Positional-attenuation adjustment, zero or negative.
    pub directional_modifier: i32,
    /// Catalog clip this instance was loaded from.
    pub source_clip: Option<ClipId>,
    pub clip_type: Option<AudioType>,
    /// Source position for ambient attenuation; x of -1 means the clip
    /// is not positional.
    pub x_source: i32,
    pub y_source: i32,
    pub max_distance: i32,
}

impl ClipBase {
    pub fn new(vol_percent: i32) -> Self {
        Self {
            done: false,
            paused: false,
            repeat: false,
            priority: 50,
            vol: percent_to_internal(vol_percent),
            vol_percent,
            original_vol_percent: vol_percent,
            panning: 128,
            panning_percent: 0,
            vol_modifier: 0,
            directional_modifier: 0,
            source_clip: None,
            clip_type: None,
            x_source: -1,
            y_source: 0,
            max_distance: 0,
        }
    }

    /// Volume actually sent to the backend.
    pub fn effective_volume(&self) -> i32 {
        clamp_internal(self.vol + self.vol_modifier + self.directional_modifier)
    }

    pub fn is_positional(&self) -> bool {
        self.x_source >= 0
    }
}

/// One playing sound instance.
///
/// Variants implement the backend-specific methods; the volume and
/// panning setters are shared and funnel through [`SoundClip::apply_volume`],
/// which pushes the combined state to the backend.
pub trait SoundClip: Send {
    fn base(&self) -> &ClipBase;

    fn base_mut(&mut self) -> &mut ClipBase;

    fn format(&self) -> FileFormat;

    /// Drive decoding one step. Returns true once the clip has finished.
    fn poll(&mut self) -> bool;

    /// Begin playback with the current base state.
    fn play(&mut self) -> Result<()>;

    /// Stop playback and release backend resources. Idempotent.
    fn destroy(&mut self);

    /// Push the combined volume and panning state to the backend.
    fn apply_volume(&mut self);

    /// Restart from the beginning.
    fn restart(&mut self) -> Result<()>;

    /// Reposition playback. The unit is format-specific: milliseconds,
    /// beats, or a pattern index.
    fn seek(&mut self, pos: i32) -> Result<()>;

    /// Current position in the format's native unit.
    fn position(&self) -> i32;

    /// Current position in milliseconds, 0 when the format cannot say.
    fn position_ms(&self) -> i32;

    /// Total length in milliseconds, 0 when unknown.
    fn length_ms(&self) -> i32;

    fn voice(&self) -> Option<VoiceId> {
        None
    }

    fn supports_seek(&self) -> bool {
        true
    }

    fn pause(&mut self) {
        self.base_mut().paused = true;
    }

    fn resume(&mut self) {
        self.base_mut().paused = false;
    }

    fn is_done(&self) -> bool {
        self.base().done
    }

    /// Begin playback at `offset` (native units) when the format can
    /// seek; otherwise from the start.
    fn play_from(&mut self, offset: i32) -> Result<()> {
        self.play()?;
        if offset > 0 && self.supports_seek() {
            self.seek(offset)?;
        }
        Ok(())
    }

    /// Set the internal 0-255 volume, keeping the percent mirror.
    fn set_volume(&mut self, vol: i32) {
        let base = self.base_mut();
        base.vol = clamp_internal(vol);
        self.apply_volume();
    }

    /// Set volume from the external 0-100% domain, updating both
    /// mirrors.
    fn set_volume_percent(&mut self, percent: i32) {
        let base = self.base_mut();
        base.vol_percent = percent;
        base.vol = percent_to_internal(percent);
        self.apply_volume();
    }

    /// Set both volume domains explicitly, used when restoring saved
    /// state where the mirrors may disagree.
    fn set_volume_direct(&mut self, vol: i32, percent: i32) {
        let base = self.base_mut();
        base.vol = vol;
        base.vol_percent = percent;
        self.apply_volume();
    }

    fn set_speech_modifier(&mut self, modifier: i32) {
        self.base_mut().vol_modifier = modifier;
        self.apply_volume();
    }

    fn set_directional_modifier(&mut self, modifier: i32) {
        self.base_mut().directional_modifier = modifier;
        self.apply_volume();
    }

    /// Set the internal 0-255 panning.
    fn set_panning(&mut self, panning: i32) {
        self.base_mut().panning = panning.clamp(0, 255);
        self.apply_volume();
    }

    /// Set panning from the external -100..100% domain.
    fn set_panning_percent(&mut self, percent: i32) {
        let base = self.base_mut();
        base.panning_percent = percent;
        base.panning = pan_percent_to_internal(percent);
        self.apply_volume();
    }
}

/// Lag correction for decode-ahead formats.
///
/// Compressed decoders report the position of the data they decoded
/// last, which runs one output buffer ahead of what is audible. The
/// tracker keeps the previous two decode positions and offsets the
/// audible voice position by them, giving a position estimate accurate
/// to within one buffer.
#[derive(Debug, Clone, Default)]
pub struct PositionTracker {
    last_but_one_but_one: i32,
    last_but_one: i32,
    last_decode_ms: i32,
}

impl PositionTracker {
    pub fn start_at(pos: i32) -> Self {
        Self {
            last_but_one_but_one: pos,
            last_but_one: pos,
            last_decode_ms: pos,
        }
    }

    /// Record the decoder's latest decode position.
    pub fn observe(&mut self, decode_ms: i32) {
        if self.last_decode_ms != decode_ms {
            self.last_but_one_but_one = self.last_but_one;
            self.last_but_one = self.last_decode_ms;
            self.last_decode_ms = decode_ms;
        }
    }

    /// Estimate the audible position from the voice offset within the
    /// current output buffer.
    pub fn corrected(&self, voice_offset_ms: i32, at_end: bool) -> i32 {
        if voice_offset_ms < 0 {
            return self.last_but_one;
        }
        let mut offs = voice_offset_ms;
        if !at_end && self.last_but_one_but_one > 0 {
            offs -= self.last_but_one - self.last_but_one_but_one;
        }
        if at_end {
            offs + self.last_but_one
        } else {
            offs + self.last_but_one_but_one
        }
    }
}
