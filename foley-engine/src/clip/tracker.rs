//! Tracker module playback.
//!
//! Modules address position by pattern index; millisecond positions and
//! lengths are unknown.

use super::{ClipBase, SoundClip};
use crate::codec::TrackerModule;
use crate::Result;
use foley_common::types::FileFormat;

pub struct TrackerClip {
    base: ClipBase,
    module: Box<dyn TrackerModule>,
}

impl TrackerClip {
    pub fn new(module: Box<dyn TrackerModule>, vol_percent: i32) -> Self {
        Self {
            base: ClipBase::new(vol_percent),
            module,
        }
    }
}

impl SoundClip for TrackerClip {
    fn base(&self) -> &ClipBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ClipBase {
        &mut self.base
    }

    fn format(&self) -> FileFormat {
        FileFormat::TrackerModule
    }

    fn poll(&mut self) -> bool {
        if self.base.done {
            return true;
        }
        if self.base.paused {
            return false;
        }
        if !self.module.playing() && !self.base.repeat {
            self.base.done = true;
        }
        self.base.done
    }

    fn play(&mut self) -> Result<()> {
        self.module.start(self.base.repeat)?;
        self.module.set_volume(self.base.effective_volume());
        self.base.done = false;
        Ok(())
    }

    fn destroy(&mut self) {
        self.module.stop();
        self.base.done = true;
    }

    fn apply_volume(&mut self) {
        let volume = self.base.effective_volume();
        self.module.set_volume(volume);
    }

    fn restart(&mut self) -> Result<()> {
        self.module.stop();
        self.play()
    }

    /// Seek to a pattern index.
    fn seek(&mut self, pos: i32) -> Result<()> {
        self.module.seek_pattern(pos.max(0));
        Ok(())
    }

    fn position(&self) -> i32 {
        self.module.current_pattern()
    }

    fn position_ms(&self) -> i32 {
        0
    }

    fn length_ms(&self) -> i32 {
        0
    }

    fn pause(&mut self) {
        self.base.paused = true;
        self.module.pause();
    }

    fn resume(&mut self) {
        self.base.paused = false;
        self.module.resume();
    }
}

impl Drop for TrackerClip {
    fn drop(&mut self) {
        self.destroy();
    }
}
