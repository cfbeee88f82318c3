//! Sequenced music through the host sequencer.
//!
//! Position is measured in beats and millisecond positions are unknown,
//! so queries degrade to zero. Pausing actually halts the sequencer
//! rather than just muting it.

use super::{ClipBase, SoundClip};
use crate::codec::Sequencer;
use crate::Result;
use foley_common::types::FileFormat;

pub struct SequenceClip {
    base: ClipBase,
    seq: Box<dyn Sequencer>,
}

impl SequenceClip {
    pub fn new(seq: Box<dyn Sequencer>, vol_percent: i32) -> Self {
        Self {
            base: ClipBase::new(vol_percent),
            seq,
        }
    }
}

impl SoundClip for SequenceClip {
    fn base(&self) -> &ClipBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ClipBase {
        &mut self.base
    }

    fn format(&self) -> FileFormat {
        FileFormat::Sequence
    }

    fn poll(&mut self) -> bool {
        if self.base.done {
            return true;
        }
        if self.base.paused {
            return false;
        }
        if self.seq.finished() && !self.base.repeat {
            self.base.done = true;
        }
        self.base.done
    }

    fn play(&mut self) -> Result<()> {
        self.seq.start(self.base.repeat)?;
        self.seq.set_volume(self.base.effective_volume());
        self.base.done = false;
        Ok(())
    }

    fn destroy(&mut self) {
        self.seq.stop();
        self.base.done = true;
    }

    fn apply_volume(&mut self) {
        let volume = self.base.effective_volume();
        self.seq.set_volume(volume);
    }

    fn restart(&mut self) -> Result<()> {
        self.seq.stop();
        self.play()
    }

    /// Seek to an absolute beat.
    fn seek(&mut self, pos: i32) -> Result<()> {
        self.seq.seek_beats(pos.max(0));
        Ok(())
    }

    fn position(&self) -> i32 {
        self.seq.position_beats()
    }

    fn position_ms(&self) -> i32 {
        0
    }

    fn length_ms(&self) -> i32 {
        self.seq.length_ms()
    }

    fn pause(&mut self) {
        self.base.paused = true;
        self.seq.pause();
    }

    fn resume(&mut self) {
        self.base.paused = false;
        self.seq.resume();
    }
}

impl Drop for SequenceClip {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecProvider, NullCodecs};

    fn sequence_clip() -> SequenceClip {
        let seq = NullCodecs::new().open_sequence(&[0; 100]).unwrap();
        SequenceClip::new(seq, 80)
    }

    #[test]
    fn seek_and_position_use_beats() {
        let mut clip = sequence_clip();
        clip.play().unwrap();

        clip.seek(16).unwrap();
        assert_eq!(clip.position(), 16);
        assert_eq!(clip.position_ms(), 0);
    }

    #[test]
    fn pause_halts_the_sequencer() {
        let mut clip = sequence_clip();
        clip.play().unwrap();

        clip.pause();
        assert!(!clip.poll());
        clip.resume();
        assert!(!clip.poll());
    }

    #[test]
    fn destroy_stops_and_finishes() {
        let mut clip = sequence_clip();
        clip.play().unwrap();
        clip.destroy();
        assert!(clip.is_done());
    }
}
