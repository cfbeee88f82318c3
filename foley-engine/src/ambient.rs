//! Ambient positional sounds.
//!
//! An ambient sound is a looping clip tied to a room coordinate. Each
//! tick its channel volume is recomputed from the listener distance:
//! full volume inside a small radius, then a linear roll-off that
//! reaches silence at the configured max distance. While speech plays,
//! the source volume is ducked first, by an absolute target or a
//! relative subtraction depending on the configured drop's sign.

use foley_common::types::{ClipId, TOTAL_CHANNELS};

/// One channel's ambient descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmbientSound {
    pub channel: usize,
    pub x: i32,
    pub y: i32,
    /// Source volume, internal 1-255 domain.
    pub vol: i32,
    pub clip: ClipId,
    pub max_distance: i32,
}

/// Per-channel ambient slots.
#[derive(Default)]
pub struct AmbientTable {
    slots: Vec<Option<AmbientSound>>,
}

impl AmbientTable {
    pub fn new() -> Self {
        Self {
            slots: vec![None; TOTAL_CHANNELS],
        }
    }

    pub fn get(&self, channel: usize) -> Option<&AmbientSound> {
        self.slots.get(channel).and_then(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, channel: usize) -> Option<&mut AmbientSound> {
        self.slots.get_mut(channel).and_then(|s| s.as_mut())
    }

    pub fn set(&mut self, sound: AmbientSound) {
        let channel = sound.channel;
        if channel < self.slots.len() {
            self.slots[channel] = Some(sound);
        }
    }

    pub fn clear(&mut self, channel: usize) {
        if let Some(slot) = self.slots.get_mut(channel) {
            *slot = None;
        }
    }

    pub fn clear_all(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AmbientSound> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }
}

/// Duck `volume` for active speech. A negative `drop` sets the volume
/// to its absolute value exactly; a positive one subtracts. The result
/// stays in [0, 255].
pub fn duck_for_speech(volume: i32, drop: i32) -> i32 {
    let ducked = if drop < 0 { -drop } else { volume - drop };
    ducked.clamp(0, 255)
}

/// Attenuate `volume` by the distance between listener and source.
/// Full volume within `full_radius`, silence at `max_distance` and
/// beyond.
pub fn volume_for_distance(
    volume: i32,
    listener: (i32, i32),
    source: (i32, i32),
    max_distance: i32,
    full_radius: i32,
) -> i32 {
    let dx = (listener.0 - source.0) as f64;
    let dy = (listener.1 - source.1) as f64;
    let distance = (dx * dx + dy * dy).sqrt() as i32;
    if distance <= full_radius {
        return volume.clamp(0, 255);
    }
    if distance >= max_distance {
        return 0;
    }
    // linear roll-off across the span between the radius and silence
    let span = (max_distance - full_radius).max(1);
    let wanted = volume - ((distance - full_radius) * volume) / span;
    wanted.clamp(0, 255)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: i32 = 25;

    #[test]
    fn full_volume_at_the_source() {
        assert_eq!(volume_for_distance(200, (10, 10), (10, 10), 100, FULL), 200);
        // still full just inside the radius
        assert_eq!(volume_for_distance(200, (30, 10), (10, 10), 100, FULL), 200);
    }

    #[test]
    fn silent_at_and_beyond_max_distance() {
        assert_eq!(volume_for_distance(200, (110, 10), (10, 10), 100, FULL), 0);
        assert_eq!(volume_for_distance(200, (500, 10), (10, 10), 100, FULL), 0);
    }

    #[test]
    fn attenuation_is_monotonically_non_increasing() {
        let mut last = 256;
        for x in 0..200 {
            let vol = volume_for_distance(180, (x, 0), (0, 0), 120, FULL);
            assert!(vol <= last, "volume rose from {last} to {vol} at x={x}");
            last = vol;
        }
        assert_eq!(last, 0);
    }

    #[test]
    fn negative_drop_sets_absolute_volume() {
        assert_eq!(duck_for_speech(240, -80), 80);
        assert_eq!(duck_for_speech(10, -80), 80);
    }

    #[test]
    fn positive_drop_subtracts_and_clamps() {
        assert_eq!(duck_for_speech(240, 60), 180);
        assert_eq!(duck_for_speech(40, 60), 0);
    }

    #[test]
    fn table_tracks_one_descriptor_per_channel() {
        let mut table = AmbientTable::new();
        table.set(AmbientSound {
            channel: 3,
            x: 50,
            y: 60,
            vol: 200,
            clip: ClipId(4),
            max_distance: 120,
        });

        assert_eq!(table.get(3).map(|a| a.clip), Some(ClipId(4)));
        assert_eq!(table.iter().count(), 1);
        table.clear(3);
        assert!(table.get(3).is_none());
    }
}
