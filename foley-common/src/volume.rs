//! Volume and panning domain conversions.
//!
//! The engine works in an internal 0-255 volume domain (what the
//! platform mixer accepts) while the scripting boundary exposes
//! 0-100%. Panning is -100..100% externally and 0..255 internally with
//! 128 as center. Conversions round toward zero, matching the integer
//! arithmetic of the original game data.

/// Maximum internal volume.
pub const VOL_MAX: i32 = 255;

/// Maximum external volume percentage.
pub const PERCENT_MAX: i32 = 100;

/// Convert an external 0-100% volume to the internal 0-255 domain.
pub fn percent_to_internal(percent: i32) -> i32 {
    (percent * VOL_MAX) / PERCENT_MAX
}

/// Convert an internal 0-255 volume to the external 0-100% domain.
pub fn internal_to_percent(internal: i32) -> i32 {
    (internal * PERCENT_MAX) / VOL_MAX
}

/// Convert external -100..100% panning to the internal 0..255 domain.
pub fn pan_percent_to_internal(percent: i32) -> i32 {
    ((percent + 100) * VOL_MAX) / 200
}

/// Clamp an internal volume into 0..=255.
pub fn clamp_internal(vol: i32) -> i32 {
    vol.clamp(0, VOL_MAX)
}

/// True if `percent` is a valid external volume.
pub fn valid_percent(percent: i32) -> bool {
    (0..=PERCENT_MAX).contains(&percent)
}

/// True if `percent` is a valid external panning value.
pub fn valid_pan_percent(percent: i32) -> bool {
    (-100..=100).contains(&percent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_round_trips_at_extremes() {
        assert_eq!(percent_to_internal(0), 0);
        assert_eq!(percent_to_internal(100), 255);
        assert_eq!(internal_to_percent(255), 100);
        assert_eq!(internal_to_percent(0), 0);
    }

    #[test]
    fn conversion_rounds_toward_zero() {
        // 50% -> 127 (not 128): integer division truncates
        assert_eq!(percent_to_internal(50), 127);
        assert_eq!(internal_to_percent(127), 49);
    }

    #[test]
    fn pan_maps_center_and_extremes() {
        assert_eq!(pan_percent_to_internal(-100), 0);
        assert_eq!(pan_percent_to_internal(0), 127);
        assert_eq!(pan_percent_to_internal(100), 255);
    }

    #[test]
    fn clamp_bounds_internal_volume() {
        assert_eq!(clamp_internal(-20), 0);
        assert_eq!(clamp_internal(300), 255);
        assert_eq!(clamp_internal(128), 128);
    }
}
