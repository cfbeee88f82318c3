//! Chunked streaming playback of compressed audio.
//!
//! The compressed file stays on disk; each poll tops the decoder up
//! with the next chunk when it asks for one. Streams cannot seek or
//! restart, since the already-consumed part of the file is gone.

use super::{ClipBase, PositionTracker, SoundClip};
use crate::assets::AssetReader;
use crate::codec::{PollStatus, StreamCodec};
use crate::voice::VoiceId;
use crate::{Error, Result};
use foley_common::types::FileFormat;
use std::io::Read;

pub struct StreamClip {
    base: ClipBase,
    codec: Box<dyn StreamCodec>,
    reader: Box<dyn AssetReader>,
    chunk: Vec<u8>,
    tracker: PositionTracker,
}

impl StreamClip {
    pub fn new(
        codec: Box<dyn StreamCodec>,
        reader: Box<dyn AssetReader>,
        chunk_size: usize,
        vol_percent: i32,
    ) -> Self {
        Self {
            base: ClipBase::new(vol_percent),
            codec,
            reader,
            chunk: vec![0; chunk_size],
            tracker: PositionTracker::default(),
        }
    }

    fn feed_chunk(&mut self) -> Result<()> {
        let remaining = self.reader.remaining();
        if remaining == 0 {
            return Ok(());
        }
        let want = (self.chunk.len() as u64).min(remaining) as usize;
        self.reader.read_exact(&mut self.chunk[..want])?;
        let last = self.reader.remaining() == 0;
        self.codec.feed(&self.chunk[..want], last);
        Ok(())
    }
}

impl SoundClip for StreamClip {
    fn base(&self) -> &ClipBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ClipBase {
        &mut self.base
    }

    fn format(&self) -> FileFormat {
        FileFormat::CompressedStream
    }

    fn poll(&mut self) -> bool {
        if self.base.done {
            return true;
        }
        if self.base.paused {
            return false;
        }
        if self.codec.wants_data() {
            if let Err(e) = self.feed_chunk() {
                tracing::warn!(error = %e, "stream refill failed, stopping clip");
                self.destroy();
                return true;
            }
        }
        self.tracker.observe(self.codec.decode_position_ms());
        if self.codec.poll() == PollStatus::Finished {
            self.base.done = true;
        }
        self.base.done
    }

    fn play(&mut self) -> Result<()> {
        // prime the decoder before the first poll
        self.feed_chunk()?;
        self.codec
            .start(self.base.effective_volume(), self.base.panning)?;
        self.base.done = false;
        Ok(())
    }

    fn destroy(&mut self) {
        self.codec.stop();
        self.base.done = true;
    }

    fn apply_volume(&mut self) {
        let volume = self.base.effective_volume();
        let panning = self.base.panning;
        self.codec.adjust(volume, panning);
    }

    fn restart(&mut self) -> Result<()> {
        Err(Error::InvalidParameter(
            "streamed audio cannot restart".into(),
        ))
    }

    fn seek(&mut self, _pos: i32) -> Result<()> {
        Err(Error::InvalidParameter(
            "streamed audio cannot seek".into(),
        ))
    }

    fn supports_seek(&self) -> bool {
        false
    }

    fn position(&self) -> i32 {
        self.position_ms()
    }

    fn position_ms(&self) -> i32 {
        if self.base.done {
            return 0;
        }
        self.tracker
            .corrected(self.codec.voice_offset_ms(), self.codec.at_end())
    }

    fn length_ms(&self) -> i32 {
        self.codec.length_ms()
    }

    fn voice(&self) -> Option<VoiceId> {
        self.codec.voice()
    }
}

impl Drop for StreamClip {
    fn drop(&mut self) {
        self.destroy();
    }
}
