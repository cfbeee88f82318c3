//! Core identifier and reference types shared by the engine and the
//! scripting boundary.

use serde::{Deserialize, Serialize};

/// Number of regular playback channels.
pub const MAX_SOUND_CHANNELS: usize = 8;

/// Index of the reserved crossfade channel (one past the regular pool).
pub const CROSSFADE_CHANNEL: usize = MAX_SOUND_CHANNELS;

/// Total number of channel slots including the crossfade channel.
pub const TOTAL_CHANNELS: usize = MAX_SOUND_CHANNELS + 1;

/// Channel conventionally hosting speech; ambient sounds duck while it
/// is live, and ambient playback refuses this index.
pub const SPEECH_CHANNEL: usize = 0;

/// Channel hosting the current music track in legacy bookkeeping.
pub const MUSIC_CHANNEL: usize = 2;

/// Stable index of a clip in the loaded audio catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClipId(pub u32);

/// Index of an audio clip type (category) in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioType(pub u32);

/// How a clip is addressed at the scripting boundary.
///
/// Older game data addresses sounds and music by bare numbers that map
/// onto generated catalog entries ("sound3", "music5"); newer data uses
/// catalog ids directly. Script calls resolve either form to a
/// [`ClipId`] once, at the boundary, and the engine only ever sees the
/// canonical id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipRef {
    /// Old-style numeric sound/music number.
    Legacy { number: i32, is_music: bool },
    /// Canonical catalog id.
    Clip(ClipId),
}

/// Storage format of a clip's backing asset.
///
/// The engine dispatches on this tag to pick a decoder variant; the
/// formats' bitstreams themselves are opaque to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileFormat {
    /// Uncompressed sample played on a hardware voice.
    Wave,
    /// Compressed audio streamed and decoded ahead in chunks.
    CompressedStream,
    /// Compressed audio fully pre-decoded through the sound cache.
    CompressedBuffered,
    /// Sequenced music handled by the host sequencer.
    Sequence,
    /// Tracker module addressed by pattern index.
    TrackerModule,
}

/// Scope selector for per-type volume changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeScope {
    /// Retune channels currently playing clips of the type.
    Existing,
    /// Change the default applied to future plays of the type.
    FutureDefault,
    /// Both of the above.
    Both,
}
