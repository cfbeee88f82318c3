//! Decoder backend abstraction.
//!
//! Compressed formats are decoded by host-supplied codecs; the engine
//! only drives them. Three shapes exist: [`StreamCodec`] consumes the
//! compressed file in chunks while playing, [`BufferedCodec`] decodes
//! from a whole in-memory file, and [`Sequencer`]/[`TrackerModule`]
//! cover sequenced music where the notion of position is beats or
//! pattern indices rather than milliseconds. [`CodecProvider`] bundles
//! the constructors.
//!
//! [`NullCodecs`] is the silent provider used with audio disabled and in
//! tests. It models time deterministically: one source byte equals one
//! millisecond of audio, and each poll advances playback by
//! [`NULL_POLL_STEP_MS`].

use crate::voice::{Sample, VoiceId};
use crate::{Error, Result};
use std::sync::Arc;

/// Outcome of polling a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    Playing,
    Finished,
}

/// Decoder fed compressed data in chunks while it plays.
pub trait StreamCodec: Send {
    /// Start playback. Volume and panning are internal 0-255 values.
    fn start(&mut self, volume: i32, panning: i32) -> Result<()>;

    /// True when the decoder has drained its input buffer and wants the
    /// next chunk.
    fn wants_data(&self) -> bool;

    /// Feed the next chunk of the compressed file; `last` marks the
    /// final chunk.
    fn feed(&mut self, chunk: &[u8], last: bool);

    fn poll(&mut self) -> PollStatus;

    fn adjust(&mut self, volume: i32, panning: i32);

    fn stop(&mut self);

    /// Position of the most recently decoded data in milliseconds. Runs
    /// ahead of what is audible.
    fn decode_position_ms(&self) -> i32;

    /// Audible position within the decoder's current output buffer.
    /// Negative when nothing is playing.
    fn voice_offset_ms(&self) -> i32;

    /// True once the final chunk has been consumed.
    fn at_end(&self) -> bool;

    /// Total length in milliseconds, or 0 when the stream cannot say.
    fn length_ms(&self) -> i32;

    fn voice(&self) -> Option<VoiceId>;
}

/// Decoder over a complete compressed file held in memory.
pub trait BufferedCodec: Send {
    fn start(&mut self, volume: i32, panning: i32, repeat: bool) -> Result<()>;

    fn poll(&mut self) -> PollStatus;

    fn adjust(&mut self, volume: i32, panning: i32, repeat: bool);

    fn stop(&mut self);

    /// Rewind to the start without stopping.
    fn rewind(&mut self);

    /// Skip decoding forward to `pos` milliseconds.
    fn seek_ms(&mut self, pos: i32);

    /// Position of the most recently decoded data in milliseconds.
    fn decode_position_ms(&self) -> i32;

    /// Audible position within the current output buffer. Negative when
    /// nothing is playing.
    fn voice_offset_ms(&self) -> i32;

    /// True once decoding has reached the end of the file.
    fn at_end(&self) -> bool;

    fn length_ms(&self) -> i32;

    fn voice(&self) -> Option<VoiceId>;
}

/// Host sequencer for sequenced music. Position is in beats.
pub trait Sequencer: Send {
    fn start(&mut self, repeat: bool) -> Result<()>;

    fn stop(&mut self);

    fn pause(&mut self);

    fn resume(&mut self);

    /// Volume in the internal 0-255 domain.
    fn set_volume(&mut self, volume: i32);

    fn position_beats(&self) -> i32;

    fn seek_beats(&mut self, beats: i32);

    fn length_ms(&self) -> i32;

    fn finished(&self) -> bool;
}

/// Tracker module player. Position is a pattern index.
pub trait TrackerModule: Send {
    fn start(&mut self, repeat: bool) -> Result<()>;

    fn stop(&mut self);

    fn pause(&mut self);

    fn resume(&mut self);

    fn set_volume(&mut self, volume: i32);

    /// Current pattern index, -1 when not playing.
    fn current_pattern(&self) -> i32;

    fn seek_pattern(&mut self, pattern: i32);

    fn playing(&self) -> bool;
}

/// Constructs decoders for the formats the engine dispatches on.
pub trait CodecProvider: Send + Sync {
    /// Decode a whole uncompressed file into a mixer-ready sample.
    fn load_sample(&self, data: &[u8]) -> Result<Sample>;

    fn open_stream(&self) -> Result<Box<dyn StreamCodec>>;

    fn open_buffered(&self, data: Arc<Vec<u8>>) -> Result<Box<dyn BufferedCodec>>;

    fn open_sequence(&self, data: &[u8]) -> Result<Box<dyn Sequencer>>;

    fn open_tracker(&self, data: &[u8]) -> Result<Box<dyn TrackerModule>>;
}

/// Milliseconds each null decoder advances per poll.
pub const NULL_POLL_STEP_MS: i32 = 10;

/// Codec provider that decodes nothing and plays silence.
///
/// Durations derive from file size at one millisecond per byte, so a
/// 500-byte asset behaves like a half-second clip.
#[derive(Default)]
pub struct NullCodecs;

impl NullCodecs {
    pub fn new() -> Self {
        Self
    }
}

struct NullStream {
    playing: bool,
    fed_ms: i32,
    played_ms: i32,
    ended: bool,
    want: bool,
}

impl StreamCodec for NullStream {
    fn start(&mut self, _volume: i32, _panning: i32) -> Result<()> {
        self.playing = true;
        Ok(())
    }

    fn wants_data(&self) -> bool {
        self.want && !self.ended
    }

    fn feed(&mut self, chunk: &[u8], last: bool) {
        self.fed_ms += chunk.len() as i32;
        self.ended = last;
        self.want = false;
    }

    fn poll(&mut self) -> PollStatus {
        if !self.playing {
            return PollStatus::Finished;
        }
        self.played_ms += NULL_POLL_STEP_MS;
        self.want = true;
        if self.ended && self.played_ms >= self.fed_ms {
            self.playing = false;
            return PollStatus::Finished;
        }
        PollStatus::Playing
    }

    fn adjust(&mut self, _volume: i32, _panning: i32) {}

    fn stop(&mut self) {
        self.playing = false;
    }

    fn decode_position_ms(&self) -> i32 {
        self.fed_ms
    }

    fn voice_offset_ms(&self) -> i32 {
        // offset within the current output buffer, not the whole stream
        if self.playing {
            self.played_ms % NULL_POLL_STEP_MS
        } else {
            -1
        }
    }

    fn at_end(&self) -> bool {
        self.ended
    }

    fn length_ms(&self) -> i32 {
        0
    }

    fn voice(&self) -> Option<VoiceId> {
        None
    }
}

struct NullBuffered {
    length_ms: i32,
    pos_ms: i32,
    playing: bool,
    repeat: bool,
}

impl BufferedCodec for NullBuffered {
    fn start(&mut self, _volume: i32, _panning: i32, repeat: bool) -> Result<()> {
        self.playing = true;
        self.repeat = repeat;
        self.pos_ms = 0;
        Ok(())
    }

    fn poll(&mut self) -> PollStatus {
        if !self.playing {
            return PollStatus::Finished;
        }
        self.pos_ms += NULL_POLL_STEP_MS;
        if self.pos_ms >= self.length_ms {
            if self.repeat {
                self.pos_ms = 0;
            } else {
                self.playing = false;
                return PollStatus::Finished;
            }
        }
        PollStatus::Playing
    }

    fn adjust(&mut self, _volume: i32, _panning: i32, repeat: bool) {
        self.repeat = repeat;
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn rewind(&mut self) {
        self.pos_ms = 0;
    }

    fn seek_ms(&mut self, pos: i32) {
        self.pos_ms = pos.clamp(0, self.length_ms);
    }

    fn decode_position_ms(&self) -> i32 {
        self.pos_ms
    }

    fn voice_offset_ms(&self) -> i32 {
        // offset within the current output buffer, not the whole file
        if self.playing {
            self.pos_ms % NULL_POLL_STEP_MS
        } else {
            -1
        }
    }

    fn at_end(&self) -> bool {
        self.pos_ms >= self.length_ms
    }

    fn length_ms(&self) -> i32 {
        self.length_ms
    }

    fn voice(&self) -> Option<VoiceId> {
        None
    }
}

struct NullSequence {
    length_ms: i32,
    beats: i32,
    playing: bool,
    paused: bool,
    repeat: bool,
}

impl Sequencer for NullSequence {
    fn start(&mut self, repeat: bool) -> Result<()> {
        self.playing = true;
        self.paused = false;
        self.repeat = repeat;
        self.beats = 0;
        Ok(())
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn set_volume(&mut self, _volume: i32) {}

    fn position_beats(&self) -> i32 {
        if self.playing {
            self.beats
        } else {
            -1
        }
    }

    fn seek_beats(&mut self, beats: i32) {
        self.beats = beats.max(0);
    }

    fn length_ms(&self) -> i32 {
        self.length_ms
    }

    fn finished(&self) -> bool {
        !self.playing
    }
}

struct NullTracker {
    patterns: i32,
    pattern: i32,
    playing: bool,
}

impl TrackerModule for NullTracker {
    fn start(&mut self, _repeat: bool) -> Result<()> {
        self.playing = true;
        self.pattern = 0;
        Ok(())
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn pause(&mut self) {}

    fn resume(&mut self) {}

    fn set_volume(&mut self, _volume: i32) {}

    fn current_pattern(&self) -> i32 {
        if self.playing {
            self.pattern
        } else {
            -1
        }
    }

    fn seek_pattern(&mut self, pattern: i32) {
        self.pattern = pattern.clamp(0, self.patterns.saturating_sub(1));
    }

    fn playing(&self) -> bool {
        self.playing
    }
}

impl CodecProvider for NullCodecs {
    fn load_sample(&self, data: &[u8]) -> Result<Sample> {
        if data.is_empty() {
            return Err(Error::DecodeOpen("empty sample file".into()));
        }
        // one frame per byte at 1 kHz keeps durations equal to file size
        Ok(Sample {
            data: Arc::new(data.to_vec()),
            frames: data.len() as u32,
            frequency: 1000,
            stereo: false,
        })
    }

    fn open_stream(&self) -> Result<Box<dyn StreamCodec>> {
        Ok(Box::new(NullStream {
            playing: false,
            fed_ms: 0,
            played_ms: 0,
            ended: false,
            want: true,
        }))
    }

    fn open_buffered(&self, data: Arc<Vec<u8>>) -> Result<Box<dyn BufferedCodec>> {
        if data.is_empty() {
            return Err(Error::DecodeOpen("empty audio file".into()));
        }
        Ok(Box::new(NullBuffered {
            length_ms: data.len() as i32,
            pos_ms: 0,
            playing: false,
            repeat: false,
        }))
    }

    fn open_sequence(&self, data: &[u8]) -> Result<Box<dyn Sequencer>> {
        if data.is_empty() {
            return Err(Error::DecodeOpen("empty sequence file".into()));
        }
        Ok(Box::new(NullSequence {
            length_ms: data.len() as i32,
            beats: 0,
            playing: false,
            paused: false,
            repeat: false,
        }))
    }

    fn open_tracker(&self, data: &[u8]) -> Result<Box<dyn TrackerModule>> {
        if data.is_empty() {
            return Err(Error::DecodeOpen("empty module file".into()));
        }
        Ok(Box::new(NullTracker {
            patterns: (data.len() as i32 / 64).max(1),
            pattern: 0,
            playing: false,
        }))
    }
}
