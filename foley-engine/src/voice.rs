//! Mixer voice abstraction.
//!
//! Uncompressed samples play on hardware mixer voices owned by the
//! platform layer. [`VoiceDriver`] is that seam: the engine acquires a
//! voice for a sample, adjusts it while playing, and releases it when the
//! clip is destroyed. [`NullDriver`] is the silent implementation used
//! when audio output is disabled and by the test suites; it models voice
//! positions deterministically so playback logic stays testable.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Opaque identifier of an allocated mixer voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceId(pub u64);

/// A decoded sample ready for voice playback. The PCM payload is shared
/// so the sound cache and playing clips can hold the same buffer.
#[derive(Clone)]
pub struct Sample {
    pub data: Arc<Vec<u8>>,
    pub frames: u32,
    pub frequency: u32,
    pub stereo: bool,
}

impl Sample {
    /// Duration in milliseconds, zero when the frequency is unusable.
    pub fn length_ms(&self) -> i32 {
        if self.frequency < 100 {
            return 0;
        }
        ((self.frames as u64 * 1000) / self.frequency as u64) as i32
    }
}

/// Platform mixer interface for sample playback.
///
/// Volume is the internal 0-255 domain, panning 0-255 with 128 center.
/// Implementations are shared across threads and use interior
/// mutability.
pub trait VoiceDriver: Send + Sync {
    /// Start `sample` on a fresh voice. `None` means the mixer is out of
    /// voices and the clip fails to start.
    fn acquire_voice(
        &self,
        sample: &Sample,
        volume: i32,
        panning: i32,
        repeat: bool,
    ) -> Option<VoiceId>;

    fn set_voice_volume(&self, voice: VoiceId, volume: i32);

    fn set_voice_panning(&self, voice: VoiceId, panning: i32);

    /// Reposition playback to an absolute frame offset.
    fn set_voice_position(&self, voice: VoiceId, frames: i32);

    /// Current playback position in frames, or -1 once the voice has
    /// finished a non-repeating sample.
    fn voice_position(&self, voice: VoiceId) -> i32;

    fn release_voice(&self, voice: VoiceId);
}

struct NullVoice {
    frames: i32,
    position: i32,
    repeat: bool,
    volume: i32,
    panning: i32,
}

/// Voice driver that mixes nothing.
///
/// Voices hold their position until [`NullDriver::advance_all`] moves
/// them, which lets tests step playback frame by frame.
#[derive(Default)]
pub struct NullDriver {
    state: Mutex<NullDriverState>,
}

#[derive(Default)]
struct NullDriverState {
    next_id: u64,
    voices: HashMap<VoiceId, NullVoice>,
}

impl NullDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance every live voice by `frames`, wrapping repeating voices
    /// and finishing the rest.
    pub fn advance_all(&self, frames: i32) {
        let mut state = self.state.lock();
        for voice in state.voices.values_mut() {
            if voice.position < 0 {
                continue;
            }
            voice.position += frames;
            if voice.position >= voice.frames {
                if voice.repeat {
                    voice.position %= voice.frames.max(1);
                } else {
                    voice.position = -1;
                }
            }
        }
    }

    /// Number of currently allocated voices.
    pub fn live_voices(&self) -> usize {
        self.state.lock().voices.len()
    }

    /// Last volume set on `voice`, if it is still allocated.
    pub fn voice_volume(&self, voice: VoiceId) -> Option<i32> {
        self.state.lock().voices.get(&voice).map(|v| v.volume)
    }

    /// Last panning set on `voice`, if it is still allocated.
    pub fn voice_panning(&self, voice: VoiceId) -> Option<i32> {
        self.state.lock().voices.get(&voice).map(|v| v.panning)
    }
}

impl VoiceDriver for NullDriver {
    fn acquire_voice(
        &self,
        sample: &Sample,
        volume: i32,
        panning: i32,
        repeat: bool,
    ) -> Option<VoiceId> {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = VoiceId(state.next_id);
        state.voices.insert(
            id,
            NullVoice {
                frames: sample.frames as i32,
                position: 0,
                repeat,
                volume,
                panning,
            },
        );
        Some(id)
    }

    fn set_voice_volume(&self, voice: VoiceId, volume: i32) {
        if let Some(v) = self.state.lock().voices.get_mut(&voice) {
            v.volume = volume;
        }
    }

    fn set_voice_panning(&self, voice: VoiceId, panning: i32) {
        if let Some(v) = self.state.lock().voices.get_mut(&voice) {
            v.panning = panning;
        }
    }

    fn set_voice_position(&self, voice: VoiceId, frames: i32) {
        if let Some(v) = self.state.lock().voices.get_mut(&voice) {
            v.position = frames.clamp(0, v.frames);
        }
    }

    fn voice_position(&self, voice: VoiceId) -> i32 {
        self.state
            .lock()
            .voices
            .get(&voice)
            .map(|v| v.position)
            .unwrap_or(-1)
    }

    fn release_voice(&self, voice: VoiceId) {
        self.state.lock().voices.remove(&voice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(frames: u32) -> Sample {
        Sample {
            data: Arc::new(vec![0; frames as usize]),
            frames,
            frequency: 1000,
            stereo: false,
        }
    }

    #[test]
    fn voice_finishes_after_its_frames_elapse() {
        let driver = NullDriver::new();
        let v = driver
            .acquire_voice(&sample(100), 255, 128, false)
            .unwrap();

        driver.advance_all(60);
        assert_eq!(driver.voice_position(v), 60);
        driver.advance_all(60);
        assert_eq!(driver.voice_position(v), -1);
    }

    #[test]
    fn repeating_voice_wraps_instead_of_finishing() {
        let driver = NullDriver::new();
        let v = driver.acquire_voice(&sample(100), 255, 128, true).unwrap();

        driver.advance_all(250);
        assert_eq!(driver.voice_position(v), 50);
    }

    #[test]
    fn release_frees_the_voice() {
        let driver = NullDriver::new();
        let v = driver
            .acquire_voice(&sample(10), 255, 128, false)
            .unwrap();
        assert_eq!(driver.live_voices(), 1);

        driver.release_voice(v);
        assert_eq!(driver.live_voices(), 0);
        assert_eq!(driver.voice_position(v), -1);
    }

    #[test]
    fn sample_length_guards_tiny_frequencies() {
        let mut s = sample(22050);
        s.frequency = 22050;
        assert_eq!(s.length_ms(), 1000);
        s.frequency = 50;
        assert_eq!(s.length_ms(), 0);
    }
}
