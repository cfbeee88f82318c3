//! The fixed channel table.
//!
//! Channels own their clips: assigning a handle into an occupied slot
//! destroys the previous occupant first, and a clip is never reachable
//! from two slots. Each slot also remembers the last catalog clip it
//! played, which script queries use after a sound has finished.

use crate::clip::ClipHandle;
use foley_common::types::{ClipId, TOTAL_CHANNELS};

#[derive(Default)]
struct ChannelSlot {
    clip: Option<ClipHandle>,
    last_played: Option<ClipId>,
}

pub struct ChannelTable {
    slots: Vec<ChannelSlot>,
}

impl Default for ChannelTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelTable {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(TOTAL_CHANNELS);
        slots.resize_with(TOTAL_CHANNELS, ChannelSlot::default);
        Self { slots }
    }

    pub fn get(&self, index: usize) -> Option<&ClipHandle> {
        self.slots.get(index).and_then(|s| s.clip.as_ref())
    }

    /// Put `handle` on `index`, destroying any prior occupant.
    pub fn assign(&mut self, index: usize, handle: ClipHandle) {
        self.clear(index);
        let slot = &mut self.slots[index];
        slot.last_played = handle.lock().base().source_clip;
        slot.clip = Some(handle);
    }

    /// Remove and return the occupant without destroying it.
    pub fn take(&mut self, index: usize) -> Option<ClipHandle> {
        self.slots.get_mut(index).and_then(|s| s.clip.take())
    }

    /// Destroy and drop the occupant of `index`.
    pub fn clear(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            if let Some(handle) = slot.clip.take() {
                handle.lock().destroy();
            }
        }
    }

    /// Move the occupant of `from` onto `to`, destroying whatever was
    /// on `to`.
    pub fn move_clip(&mut self, from: usize, to: usize) {
        if from == to {
            return;
        }
        if let Some(handle) = self.take(from) {
            self.assign(to, handle);
        }
    }

    /// True when the slot holds a clip that has not finished.
    pub fn is_playing(&self, index: usize) -> bool {
        match self.get(index) {
            Some(handle) => !handle.lock().is_done(),
            None => false,
        }
    }

    /// Catalog clip currently playing on the slot, if any.
    pub fn playing_clip(&self, index: usize) -> Option<ClipId> {
        let handle = self.get(index)?;
        let clip = handle.lock();
        if clip.is_done() {
            return None;
        }
        clip.base().source_clip
    }

    pub fn last_played(&self, index: usize) -> Option<ClipId> {
        self.slots.get(index).and_then(|s| s.last_played)
    }

    /// Clone every live handle, for the background poll thread.
    pub fn live_handles(&self) -> Vec<ClipHandle> {
        self.slots
            .iter()
            .filter_map(|s| s.clip.clone())
            .collect()
    }

    /// Run `f` against the occupant of `index` under its lock.
    pub fn with_clip<R>(
        &self,
        index: usize,
        f: impl FnOnce(&mut dyn crate::clip::SoundClip) -> R,
    ) -> Option<R> {
        let handle = self.get(index)?;
        let mut clip = handle.lock();
        Some(f(clip.as_mut()))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::{into_handle, SampleClip, SoundClip};
    use crate::voice::{NullDriver, Sample};
    use std::sync::Arc;

    fn handle(driver: &Arc<NullDriver>, clip_id: u32) -> ClipHandle {
        let sample = Sample {
            data: Arc::new(vec![0; 100]),
            frames: 100,
            frequency: 1000,
            stereo: false,
        };
        let mut clip = SampleClip::new(sample, driver.clone(), 100);
        clip.base_mut().source_clip = Some(ClipId(clip_id));
        clip.play().unwrap();
        into_handle(Box::new(clip))
    }

    #[test]
    fn assign_destroys_the_previous_occupant() {
        let driver = Arc::new(NullDriver::new());
        let mut table = ChannelTable::new();

        let first = handle(&driver, 1);
        table.assign(3, first.clone());
        table.assign(3, handle(&driver, 2));

        assert!(first.lock().is_done());
        assert_eq!(driver.live_voices(), 1);
        assert_eq!(table.playing_clip(3), Some(ClipId(2)));
    }

    #[test]
    fn clear_destroys_and_empties() {
        let driver = Arc::new(NullDriver::new());
        let mut table = ChannelTable::new();
        table.assign(0, handle(&driver, 7));

        table.clear(0);
        assert!(table.get(0).is_none());
        assert!(!table.is_playing(0));
        assert_eq!(driver.live_voices(), 0);
        // remembered even after the clip is gone
        assert_eq!(table.last_played(0), Some(ClipId(7)));
    }

    #[test]
    fn move_clip_keeps_single_ownership() {
        let driver = Arc::new(NullDriver::new());
        let mut table = ChannelTable::new();
        table.assign(2, handle(&driver, 5));

        table.move_clip(2, 8);
        assert!(table.get(2).is_none());
        assert_eq!(table.playing_clip(8), Some(ClipId(5)));
        assert_eq!(driver.live_voices(), 1);
    }

    #[test]
    fn finished_clip_is_not_playing() {
        let driver = Arc::new(NullDriver::new());
        let mut table = ChannelTable::new();
        table.assign(1, handle(&driver, 3));

        driver.advance_all(200);
        table.with_clip(1, |c| c.poll());
        assert!(!table.is_playing(1));
        assert_eq!(table.playing_clip(1), None);
    }
}
