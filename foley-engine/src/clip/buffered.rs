//! Buffered playback of compressed audio through the sound cache.
//!
//! The whole compressed file sits in a shared cache buffer, so these
//! clips can seek, restart, and resume from a saved position. Position
//! queries go through the decode-lag tracker since the decoder reports
//! where it last decoded, not what is audible.

use super::{ClipBase, PositionTracker, SoundClip};
use crate::cache::SharedBuffer;
use crate::codec::{BufferedCodec, PollStatus};
use crate::voice::VoiceId;
use crate::Result;
use foley_common::types::FileFormat;

pub struct BufferedClip {
    base: ClipBase,
    codec: Box<dyn BufferedCodec>,
    // pins the cache entry while this clip is alive
    _buffer: SharedBuffer,
    tracker: PositionTracker,
}

impl BufferedClip {
    pub fn new(codec: Box<dyn BufferedCodec>, buffer: SharedBuffer, vol_percent: i32) -> Self {
        Self {
            base: ClipBase::new(vol_percent),
            codec,
            _buffer: buffer,
            tracker: PositionTracker::default(),
        }
    }
}

impl SoundClip for BufferedClip {
    fn base(&self) -> &ClipBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ClipBase {
        &mut self.base
    }

    fn format(&self) -> FileFormat {
        FileFormat::CompressedBuffered
    }

    fn poll(&mut self) -> bool {
        if self.base.done {
            return true;
        }
        if self.base.paused {
            return false;
        }
        self.tracker.observe(self.codec.decode_position_ms());
        if self.codec.poll() == PollStatus::Finished && !self.base.repeat {
            self.base.done = true;
        }
        self.base.done
    }

    fn play(&mut self) -> Result<()> {
        self.play_from(0)
    }

    fn play_from(&mut self, offset: i32) -> Result<()> {
        self.codec.start(
            self.base.effective_volume(),
            self.base.panning,
            self.base.repeat,
        )?;
        if offset > 0 {
            self.codec.seek_ms(offset);
        }
        self.tracker = PositionTracker::start_at(offset);
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
        let repeat = self.base.repeat;
        self.codec.adjust(volume, panning, repeat);
    }

    fn restart(&mut self) -> Result<()> {
        self.codec.stop();
        self.codec.rewind();
        self.play_from(0)
    }

    /// Seek to an absolute millisecond position.
    fn seek(&mut self, pos: i32) -> Result<()> {
        self.codec.stop();
        self.play_from(pos.max(0))
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

impl Drop for BufferedClip {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecProvider, NullCodecs, NULL_POLL_STEP_MS};
    use std::sync::Arc;

    fn buffered_clip(len_ms: usize) -> BufferedClip {
        let buffer = Arc::new(vec![0u8; len_ms]);
        let codec = NullCodecs::new().open_buffered(buffer.clone()).unwrap();
        BufferedClip::new(codec, buffer, 100)
    }

    #[test]
    fn finishes_after_its_length_elapses() {
        let mut clip = buffered_clip(30);
        clip.play().unwrap();

        let polls = 30 / NULL_POLL_STEP_MS;
        for _ in 0..polls - 1 {
            assert!(!clip.poll());
        }
        assert!(clip.poll());
    }

    #[test]
    fn repeating_clip_never_finishes_on_its_own() {
        let mut clip = buffered_clip(20);
        clip.base_mut().repeat = true;
        clip.play().unwrap();

        for _ in 0..50 {
            assert!(!clip.poll());
        }
    }

    #[test]
    fn seek_restarts_playback_at_the_target() {
        let mut clip = buffered_clip(5000);
        clip.play().unwrap();
        clip.seek(2000).unwrap();

        clip.poll();
        let pos = clip.position_ms();
        assert!(pos >= 2000, "position {pos} before seek target");
    }

    #[test]
    fn play_from_resumes_a_saved_position() {
        let mut clip = buffered_clip(5000);
        clip.play_from(1500).unwrap();
        clip.poll();
        assert!(clip.position_ms() >= 1500);
    }

    #[test]
    fn restart_rewinds_to_zero() {
        let mut clip = buffered_clip(5000);
        clip.play_from(3000).unwrap();
        clip.restart().unwrap();
        assert!(clip.position_ms() < 1000);
    }
}
