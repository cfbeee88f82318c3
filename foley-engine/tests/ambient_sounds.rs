//! Ambient positional sounds through the engine.

mod common;

use common::*;
use foley_common::types::ClipRef;
use foley_engine::Error;

#[test]
fn ambient_volume_follows_the_listener() {
    let mut engine = engine();
    engine
        .play_ambient(1, ClipRef::Clip(BROOK), 200, 100, 0, 125)
        .unwrap();
    assert!(engine.is_channel_playing(1));

    // listener at the origin, source 100 away: 75 into the 100-unit
    // roll-off span
    assert_eq!(engine.channel_volume(1), Some(50));

    engine.set_listener(100, 0);
    assert_eq!(engine.channel_volume(1), Some(200));

    engine.set_listener(175, 0);
    assert_eq!(engine.channel_volume(1), Some(100));

    // at and past max distance the loop is silent but keeps playing
    engine.set_listener(300, 0);
    assert_eq!(engine.channel_volume(1), Some(0));
    assert!(engine.is_channel_playing(1));
}

#[test]
fn zero_x_makes_the_sound_non_positional() {
    let mut engine = engine();
    engine
        .play_ambient(1, ClipRef::Clip(BROOK), 200, 0, 0, 125)
        .unwrap();

    engine.set_listener(5000, 5000);
    assert_eq!(engine.channel_volume(1), Some(200));
}

#[test]
fn speech_ducks_ambient_before_attenuating() {
    let mut engine = engine();
    engine
        .play_ambient(1, ClipRef::Clip(BROOK), 200, 100, 0, 125)
        .unwrap();

    play(&mut engine, SPEECH_LINE, 90);
    advance(&mut engine, 1);
    // ducked 200 - 60 = 140, then attenuated across 75 of 100 units
    assert_eq!(engine.channel_volume(1), Some(35));

    engine.stop_channel(0).unwrap();
    advance(&mut engine, 1);
    assert_eq!(engine.channel_volume(1), Some(50));
}

#[test]
fn negative_drop_sets_an_absolute_speech_level() {
    let mut engine = engine();
    engine
        .play_ambient(1, ClipRef::Clip(BROOK), 200, 0, 0, 0)
        .unwrap();
    engine.set_ambient_speech_drop(-80);

    play(&mut engine, SPEECH_LINE, 90);
    advance(&mut engine, 1);
    assert_eq!(engine.channel_volume(1), Some(80));
}

#[test]
fn replaying_the_same_clip_moves_the_source() {
    let mut engine = engine();
    engine
        .play_ambient(1, ClipRef::Clip(BROOK), 200, 0, 0, 0)
        .unwrap();
    advance(&mut engine, 3);

    // same clip on the same channel: the loop is not restarted
    engine
        .play_ambient(1, ClipRef::Clip(BROOK), 150, 100, 0, 125)
        .unwrap();
    assert!(engine.is_channel_playing(1));
    assert_eq!(engine.channel_volume(1), Some(38));
}

#[test]
fn located_channel_attenuates_like_an_ambient_source() {
    let mut engine = engine();
    let channel = play(&mut engine, DOOR_SLAM, 10);
    engine.set_channel_location(channel, 100, 0, 125).unwrap();

    // source 100 away from the origin, 75 into the 100-unit span
    assert_eq!(engine.channel_volume(channel), Some(64));

    engine.set_listener(100, 0);
    assert_eq!(engine.channel_volume(channel), Some(255));

    // (0, 0) unties the channel from the room
    engine.set_listener(0, 0);
    engine.set_channel_location(channel, 0, 0, 0).unwrap();
    assert_eq!(engine.channel_volume(channel), Some(255));
}

#[test]
fn bad_channel_locations_are_rejected() {
    let mut engine = engine();
    let channel = play(&mut engine, DOOR_SLAM, 10);
    assert!(matches!(
        engine.set_channel_location(channel, -5, 0, 125),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        engine.set_channel_location(channel, 100, 0, 0),
        Err(Error::InvalidParameter(_))
    ));
}

#[test]
fn channel_volume_control_routes_through_the_descriptor() {
    let mut engine = engine();
    engine
        .play_ambient(1, ClipRef::Clip(BROOK), 200, 0, 0, 0)
        .unwrap();

    engine.set_channel_volume(1, 50).unwrap();
    assert_eq!(engine.channel_volume(1), Some(127));
}

#[test]
fn stop_ambient_clears_channel_and_descriptor() {
    let mut engine = engine();
    engine
        .play_ambient(1, ClipRef::Clip(BROOK), 200, 100, 0, 125)
        .unwrap();

    engine.stop_ambient(1).unwrap();
    assert!(!engine.is_channel_playing(1));

    // the channel now behaves as a plain channel again
    engine.set_channel_volume(1, 60).unwrap();
}

#[test]
fn reserved_and_out_of_range_channels_are_rejected() {
    let mut engine = engine();
    assert!(matches!(
        engine.play_ambient(0, ClipRef::Clip(BROOK), 200, 0, 0, 0),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        engine.play_ambient(8, ClipRef::Clip(BROOK), 200, 0, 0, 0),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        engine.play_ambient(1, ClipRef::Clip(BROOK), 0, 0, 0, 0),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        engine.play_ambient(1, ClipRef::Clip(BROOK), 256, 0, 0, 0),
        Err(Error::InvalidParameter(_))
    ));
}
