//! Audio block of the save-game stream.
//!
//! Fixed little-endian layout, written and read in strict field order:
//! catalog clip count, channel count, then per channel either a -1
//! sentinel or the clip id followed by position, priority, repeat, raw
//! volume, raw pan, the two percent mirrors, and the room source tie
//! (x, y, max distance). After the channels
//! come the crossfade fields, the queue, the ambient descriptors, the
//! legacy current-music id, and a magic sentinel the outer format uses
//! to detect corruption.

use crate::ambient::AmbientSound;
use crate::crossfade::CrossfadeSnapshot;
use crate::{Error, Result};
use foley_common::types::{ClipId, TOTAL_CHANNELS};
use std::io::{Read, Write};

/// Sentinel terminating the audio block.
pub const AUDIO_STATE_MAGIC: u32 = 0xbeef_cafe;

const NO_CLIP: i32 = -1;

/// Far above any configurable queue cap; a longer saved queue means the
/// block is corrupt.
const MAX_SAVED_QUEUE: usize = 256;

/// Saved fields of one occupied channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedChannel {
    pub clip: ClipId,
    /// Position in the clip's native unit (ms, beats, or pattern).
    pub position: i32,
    pub priority: i32,
    pub repeat: bool,
    pub vol: i32,
    pub panning: i32,
    pub vol_percent: i32,
    pub panning_percent: i32,
    /// Room source tie, x of -1 when the channel is not positional.
    pub x_source: i32,
    pub y_source: i32,
    pub max_distance: i32,
}

/// Saved fields of one queue entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedQueueEntry {
    pub clip: ClipId,
    pub priority: i32,
    pub repeat: bool,
}

/// The whole audio block, parsed but not yet applied.
#[derive(Debug, Clone, Default)]
pub struct SavedState {
    pub channels: Vec<Option<SavedChannel>>,
    pub crossfade: CrossfadeSnapshot,
    pub queue: Vec<SavedQueueEntry>,
    pub ambient: Vec<Option<AmbientSound>>,
    pub current_music: Option<ClipId>,
}

fn write_i32<W: Write>(w: &mut W, value: i32) -> Result<()> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_u32<W: Write>(w: &mut W, value: u32) -> Result<()> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_bool<W: Write>(w: &mut W, value: bool) -> Result<()> {
    write_i32(w, value as i32)
}

fn read_i32<R: Read>(r: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_bool<R: Read>(r: &mut R) -> Result<bool> {
    Ok(read_i32(r)? != 0)
}

fn channel_to_i32(ch: Option<usize>) -> i32 {
    ch.map(|c| c as i32).unwrap_or(NO_CLIP)
}

fn i32_to_channel(value: i32) -> Result<Option<usize>> {
    if value == NO_CLIP {
        return Ok(None);
    }
    if value < 0 || value as usize >= TOTAL_CHANNELS {
        return Err(Error::SaveMismatch(format!(
            "crossfade channel {value} out of range"
        )));
    }
    Ok(Some(value as usize))
}

/// Write the audio block. `clip_count` is the catalog size the state
/// was captured against; restore refuses a different catalog.
pub fn write_state<W: Write>(w: &mut W, clip_count: u32, state: &SavedState) -> Result<()> {
    write_u32(w, clip_count)?;
    write_u32(w, state.channels.len() as u32)?;

    for saved in &state.channels {
        match saved {
            Some(s) => {
                write_i32(w, s.clip.0 as i32)?;
                write_i32(w, s.position)?;
                write_i32(w, s.priority)?;
                write_bool(w, s.repeat)?;
                write_i32(w, s.vol)?;
                write_i32(w, s.panning)?;
                write_i32(w, s.vol_percent)?;
                write_i32(w, s.panning_percent)?;
                write_i32(w, s.x_source)?;
                write_i32(w, s.y_source)?;
                write_i32(w, s.max_distance)?;
            }
            None => write_i32(w, NO_CLIP)?,
        }
    }

    write_i32(w, channel_to_i32(state.crossfade.in_channel))?;
    write_i32(w, channel_to_i32(state.crossfade.out_channel))?;
    write_i32(w, state.crossfade.step)?;
    write_i32(w, state.crossfade.in_rate)?;
    write_i32(w, state.crossfade.out_rate)?;
    write_i32(w, state.crossfade.in_target)?;
    write_i32(w, state.crossfade.out_initial)?;

    write_u32(w, state.queue.len() as u32)?;
    for entry in &state.queue {
        write_i32(w, entry.clip.0 as i32)?;
        write_i32(w, entry.priority)?;
        write_bool(w, entry.repeat)?;
    }

    write_u32(w, state.ambient.len() as u32)?;
    for slot in &state.ambient {
        match slot {
            Some(a) => {
                write_bool(w, true)?;
                write_i32(w, a.x)?;
                write_i32(w, a.y)?;
                write_i32(w, a.vol)?;
                write_i32(w, a.clip.0 as i32)?;
                write_i32(w, a.max_distance)?;
            }
            None => write_bool(w, false)?,
        }
    }

    write_i32(w, state.current_music.map(|c| c.0 as i32).unwrap_or(NO_CLIP))?;
    write_u32(w, AUDIO_STATE_MAGIC)?;
    Ok(())
}

fn read_clip_id<R: Read>(r: &mut R, clip_count: u32) -> Result<ClipId> {
    let raw = read_i32(r)?;
    if raw < 0 || raw as u32 >= clip_count {
        return Err(Error::SaveMismatch(format!(
            "saved clip id {raw} outside catalog of {clip_count}"
        )));
    }
    Ok(ClipId(raw as u32))
}

/// Parse the audio block without touching any live state. Returns the
/// catalog clip count the save was taken against and the parsed state.
pub fn read_state<R: Read>(r: &mut R) -> Result<(u32, SavedState)> {
    let clip_count = read_u32(r)?;
    let channel_count = read_u32(r)? as usize;
    if channel_count != TOTAL_CHANNELS {
        return Err(Error::SaveMismatch(format!(
            "save has {channel_count} channels, engine has {TOTAL_CHANNELS}"
        )));
    }

    let mut channels = Vec::with_capacity(channel_count);
    for _ in 0..channel_count {
        let raw = read_i32(r)?;
        if raw == NO_CLIP {
            channels.push(None);
            continue;
        }
        if raw < 0 || raw as u32 >= clip_count {
            return Err(Error::SaveMismatch(format!(
                "saved clip id {raw} outside catalog of {clip_count}"
            )));
        }
        channels.push(Some(SavedChannel {
            clip: ClipId(raw as u32),
            position: read_i32(r)?,
            priority: read_i32(r)?,
            repeat: read_bool(r)?,
            vol: read_i32(r)?,
            panning: read_i32(r)?,
            vol_percent: read_i32(r)?,
            panning_percent: read_i32(r)?,
            x_source: read_i32(r)?,
            y_source: read_i32(r)?,
            max_distance: read_i32(r)?,
        }));
    }

    let crossfade = CrossfadeSnapshot {
        in_channel: i32_to_channel(read_i32(r)?)?,
        out_channel: i32_to_channel(read_i32(r)?)?,
        step: read_i32(r)?,
        in_rate: read_i32(r)?,
        out_rate: read_i32(r)?,
        in_target: read_i32(r)?,
        out_initial: read_i32(r)?,
    };

    let queue_len = read_u32(r)? as usize;
    if queue_len > MAX_SAVED_QUEUE {
        return Err(Error::SaveMismatch(format!(
            "saved queue of {queue_len} entries is not plausible"
        )));
    }
    let mut queue = Vec::with_capacity(queue_len);
    for _ in 0..queue_len {
        queue.push(SavedQueueEntry {
            clip: read_clip_id(r, clip_count)?,
            priority: read_i32(r)?,
            repeat: read_bool(r)?,
        });
    }

    let ambient_count = read_u32(r)? as usize;
    if ambient_count != TOTAL_CHANNELS {
        return Err(Error::SaveMismatch(format!(
            "save has {ambient_count} ambient slots, engine has {TOTAL_CHANNELS}"
        )));
    }
    let mut ambient = Vec::with_capacity(ambient_count);
    for channel in 0..ambient_count {
        if !read_bool(r)? {
            ambient.push(None);
            continue;
        }
        ambient.push(Some(AmbientSound {
            channel,
            x: read_i32(r)?,
            y: read_i32(r)?,
            vol: read_i32(r)?,
            clip: read_clip_id(r, clip_count)?,
            max_distance: read_i32(r)?,
        }));
    }

    let music_raw = read_i32(r)?;
    let current_music = if music_raw == NO_CLIP {
        None
    } else {
        Some(read_validated_music(music_raw, clip_count)?)
    };

    let magic = read_u32(r)?;
    if magic != AUDIO_STATE_MAGIC {
        return Err(Error::SaveMismatch(format!(
            "bad audio block sentinel {magic:#x}"
        )));
    }

    Ok((clip_count, SavedState {
        channels,
        crossfade,
        queue,
        ambient,
        current_music,
    }))
}

fn read_validated_music(raw: i32, clip_count: u32) -> Result<ClipId> {
    if raw < 0 || raw as u32 >= clip_count {
        return Err(Error::SaveMismatch(format!(
            "saved music clip {raw} outside catalog of {clip_count}"
        )));
    }
    Ok(ClipId(raw as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> SavedState {
        let mut channels = vec![None; TOTAL_CHANNELS];
        channels[2] = Some(SavedChannel {
            clip: ClipId(3),
            position: 1500,
            priority: 40,
            repeat: true,
            vol: 204,
            panning: 128,
            vol_percent: 80,
            panning_percent: 0,
            x_source: 140,
            y_source: 60,
            max_distance: 250,
        });
        let mut ambient = vec![None; TOTAL_CHANNELS];
        ambient[4] = Some(AmbientSound {
            channel: 4,
            x: 120,
            y: 90,
            vol: 180,
            clip: ClipId(1),
            max_distance: 200,
        });
        SavedState {
            channels,
            crossfade: CrossfadeSnapshot {
                in_channel: Some(2),
                out_channel: Some(8),
                step: 2,
                in_rate: 20,
                out_rate: 20,
                in_target: 80,
                out_initial: 100,
            },
            queue: vec![SavedQueueEntry {
                clip: ClipId(0),
                priority: 10,
                repeat: false,
            }],
            ambient,
            current_music: Some(ClipId(3)),
        }
    }

    #[test]
    fn state_round_trips_through_bytes() {
        let state = sample_state();
        let mut bytes = Vec::new();
        write_state(&mut bytes, 5, &state).unwrap();

        let (clip_count, restored) = read_state(&mut bytes.as_slice()).unwrap();
        assert_eq!(clip_count, 5);
        assert_eq!(restored.channels[2], state.channels[2]);
        assert_eq!(restored.crossfade.in_channel, Some(2));
        assert_eq!(restored.crossfade.out_channel, Some(8));
        assert_eq!(restored.queue, state.queue);
        assert_eq!(restored.ambient[4], state.ambient[4]);
        assert_eq!(restored.current_music, Some(ClipId(3)));
    }

    #[test]
    fn clip_id_beyond_catalog_is_a_mismatch() {
        let state = sample_state();
        let mut bytes = Vec::new();
        // catalog of 2 clips cannot hold saved clip id 3
        write_state(&mut bytes, 2, &state).unwrap();
        assert!(matches!(
            read_state(&mut bytes.as_slice()),
            Err(Error::SaveMismatch(_))
        ));
    }

    #[test]
    fn absurd_queue_length_is_a_mismatch() {
        let state = SavedState {
            channels: vec![None; TOTAL_CHANNELS],
            ambient: vec![None; TOTAL_CHANNELS],
            ..Default::default()
        };
        let mut bytes = Vec::new();
        write_state(&mut bytes, 5, &state).unwrap();

        // the queue length sits after the two counts, nine channel
        // sentinels, and seven crossfade fields
        let at = 4 + 4 + TOTAL_CHANNELS * 4 + 7 * 4;
        bytes[at..at + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            read_state(&mut bytes.as_slice()),
            Err(Error::SaveMismatch(_))
        ));
    }

    #[test]
    fn corrupt_sentinel_is_detected() {
        let state = sample_state();
        let mut bytes = Vec::new();
        write_state(&mut bytes, 5, &state).unwrap();
        let end = bytes.len();
        bytes[end - 1] ^= 0xff;
        assert!(matches!(
            read_state(&mut bytes.as_slice()),
            Err(Error::SaveMismatch(_))
        ));
    }

    #[test]
    fn truncated_block_is_an_io_error() {
        let state = sample_state();
        let mut bytes = Vec::new();
        write_state(&mut bytes, 5, &state).unwrap();
        bytes.truncate(bytes.len() / 2);
        assert!(read_state(&mut bytes.as_slice()).is_err());
    }
}
