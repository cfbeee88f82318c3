//! Crossfaded track changes end to end.

mod common;

use common::*;
use foley_common::types::{ClipRef, CROSSFADE_CHANNEL, MUSIC_CHANNEL};
use foley_engine::crossfade::FadeState;

#[test]
fn music_change_fades_old_out_and_new_in() {
    let mut engine = engine();
    play(&mut engine, THEME, 50);
    advance(&mut engine, 3);

    // replace the track without queueing
    let channel = engine
        .play_clip(ClipRef::Clip(REPRISE), None, None, 0, false)
        .unwrap();
    assert_eq!(channel, Some(MUSIC_CHANNEL));
    assert_eq!(engine.playing_clip(CROSSFADE_CHANNEL), Some(THEME));
    assert_eq!(engine.playing_clip(MUSIC_CHANNEL), Some(REPRISE));
    assert_eq!(engine.crossfade_state(), FadeState::Both);
    assert_eq!(engine.current_music(), Some(REPRISE));
    // incoming track starts silent
    assert_eq!(engine.channel_volume(MUSIC_CHANNEL), Some(0));

    // reprise reaches its 80% target on the fourth step
    advance(&mut engine, 4);
    assert_eq!(engine.crossfade_state(), FadeState::FadingOut);
    assert_eq!(engine.channel_volume(MUSIC_CHANNEL), Some(204));

    // the outgoing track dies on the fifth
    advance(&mut engine, 1);
    assert_eq!(engine.crossfade_state(), FadeState::Idle);
    assert!(!engine.is_channel_playing(CROSSFADE_CHANNEL));
    assert!(engine.is_channel_playing(MUSIC_CHANNEL));
}

#[test]
fn fade_volume_rises_one_step_per_frame() {
    let mut engine = engine();
    play(&mut engine, THEME, 50);
    engine
        .play_clip(ClipRef::Clip(REPRISE), None, None, 0, false)
        .unwrap();

    let mut last = -1;
    for _ in 0..4 {
        advance(&mut engine, 1);
        let vol = engine.channel_volume(MUSIC_CHANNEL).unwrap();
        assert!(vol > last, "fade-in went from {last} to {vol}");
        last = vol;
    }
}

#[test]
fn stopping_a_crossfading_type_fades_it_out() {
    let mut engine = engine();
    play(&mut engine, THEME, 50);
    advance(&mut engine, 2);

    engine.stop_channel(MUSIC_CHANNEL).unwrap();
    assert!(!engine.is_channel_playing(MUSIC_CHANNEL));
    assert_eq!(engine.playing_clip(CROSSFADE_CHANNEL), Some(THEME));
    assert_eq!(engine.crossfade_state(), FadeState::FadingOut);
    assert_eq!(engine.current_music(), None);

    advance(&mut engine, 5);
    assert!(!engine.is_channel_playing(CROSSFADE_CHANNEL));
    assert_eq!(engine.crossfade_state(), FadeState::Idle);
}

#[test]
fn stopping_a_plain_sound_is_immediate() {
    let mut engine = engine();
    let channel = play(&mut engine, DOOR_SLAM, 10);

    engine.stop_channel(channel).unwrap();
    assert!(!engine.is_channel_playing(channel));
    assert!(!engine.is_channel_playing(CROSSFADE_CHANNEL));
    assert_eq!(engine.crossfade_state(), FadeState::Idle);
}

#[test]
fn disabling_crossfade_collapses_a_running_fade() {
    let mut engine = engine();
    play(&mut engine, THEME, 50);
    engine
        .play_clip(ClipRef::Clip(REPRISE), None, None, 0, false)
        .unwrap();
    advance(&mut engine, 1);
    assert_eq!(engine.crossfade_state(), FadeState::Both);

    engine.set_crossfade_enabled(false);
    assert_eq!(engine.crossfade_state(), FadeState::Idle);
    assert!(!engine.is_channel_playing(CROSSFADE_CHANNEL));
    // the incoming track snaps straight to its target volume
    assert_eq!(engine.channel_volume(MUSIC_CHANNEL), Some(204));

    // and later track changes are hard cuts
    engine
        .play_clip(ClipRef::Clip(THEME), None, None, 0, false)
        .unwrap();
    assert!(!engine.is_channel_playing(CROSSFADE_CHANNEL));
    assert_eq!(engine.channel_volume(MUSIC_CHANNEL), Some(255));
}
