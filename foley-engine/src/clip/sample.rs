//! Uncompressed sample playback on a mixer voice.

use super::{ClipBase, SoundClip};
use crate::voice::{Sample, VoiceDriver, VoiceId};
use crate::{Error, Result};
use foley_common::types::FileFormat;
use std::sync::Arc;

/// Clip backed by a fully decoded sample and a hardware voice.
pub struct SampleClip {
    base: ClipBase,
    sample: Sample,
    driver: Arc<dyn VoiceDriver>,
    voice: Option<VoiceId>,
}

impl SampleClip {
    pub fn new(sample: Sample, driver: Arc<dyn VoiceDriver>, vol_percent: i32) -> Self {
        Self {
            base: ClipBase::new(vol_percent),
            sample,
            driver,
            voice: None,
        }
    }

    fn frames_to_ms(&self, frames: i32) -> i32 {
        if self.sample.frequency < 100 || frames < 0 {
            return 0;
        }
        ((frames as i64 * 1000) / self.sample.frequency as i64) as i32
    }
}

impl SoundClip for SampleClip {
    fn base(&self) -> &ClipBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ClipBase {
        &mut self.base
    }

    fn format(&self) -> FileFormat {
        FileFormat::Wave
    }

    fn poll(&mut self) -> bool {
        if self.base.done {
            return true;
        }
        if self.base.paused {
            return false;
        }
        match self.voice {
            Some(v) if self.driver.voice_position(v) >= 0 => false,
            _ => {
                self.base.done = true;
                true
            }
        }
    }

    fn play(&mut self) -> Result<()> {
        let voice = self
            .driver
            .acquire_voice(
                &self.sample,
                self.base.effective_volume(),
                self.base.panning,
                self.base.repeat,
            )
            .ok_or_else(|| Error::DecodeOpen("mixer is out of voices".into()))?;
        self.voice = Some(voice);
        self.base.done = false;
        Ok(())
    }

    fn destroy(&mut self) {
        if let Some(v) = self.voice.take() {
            self.driver.release_voice(v);
        }
        self.base.done = true;
    }

    fn apply_volume(&mut self) {
        if let Some(v) = self.voice {
            self.driver.set_voice_volume(v, self.base.effective_volume());
            self.driver.set_voice_panning(v, self.base.panning);
        }
    }

    fn restart(&mut self) -> Result<()> {
        self.destroy();
        self.base.done = false;
        self.play()
    }

    /// Seek to an absolute frame offset.
    fn seek(&mut self, pos: i32) -> Result<()> {
        if pos < 0 {
            return Err(Error::InvalidParameter(format!(
                "negative seek position {pos}"
            )));
        }
        if let Some(v) = self.voice {
            self.driver.set_voice_position(v, pos);
        }
        Ok(())
    }

    fn position(&self) -> i32 {
        match self.voice {
            Some(v) => self.driver.voice_position(v),
            None => 0,
        }
    }

    fn position_ms(&self) -> i32 {
        self.frames_to_ms(self.position())
    }

    fn length_ms(&self) -> i32 {
        self.sample.length_ms()
    }

    fn voice(&self) -> Option<VoiceId> {
        self.voice
    }
}

impl Drop for SampleClip {
    fn drop(&mut self) {
        self.destroy();
    }
}
