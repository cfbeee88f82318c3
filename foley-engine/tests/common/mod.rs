//! Shared fixture: a small game catalog over in-memory assets and the
//! null backend, where one asset byte equals one millisecond of audio.
#![allow(dead_code)]

use foley_common::config::EngineConfig;
use foley_common::types::{AudioType, ClipId, FileFormat};
use foley_engine::assets::MemStore;
use foley_engine::catalog::{AudioCatalog, AudioClip, AudioClipType};
use foley_engine::codec::NullCodecs;
use foley_engine::voice::NullDriver;
use foley_engine::{AudioEngine, Backend};
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Route engine logs through the test harness, honoring RUST_LOG.
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub const SPEECH: AudioType = AudioType(0);
pub const AMBIENT: AudioType = AudioType(1);
pub const MUSIC: AudioType = AudioType(2);
pub const SOUND: AudioType = AudioType(3);

pub const SPEECH_LINE: ClipId = ClipId(0);
pub const BROOK: ClipId = ClipId(1);
pub const THEME: ClipId = ClipId(2);
pub const REPRISE: ClipId = ClipId(3);
pub const DOOR_SLAM: ClipId = ClipId(4);
pub const FOOTSTEP: ClipId = ClipId(5);
pub const EXPLOSION: ClipId = ClipId(6);

/// Asset sizes in bytes, which the null codecs read as milliseconds.
const FILES: &[(&str, usize)] = &[
    ("speech.ogg", 500),
    ("brook.ogg", 2000),
    ("theme.ogg", 1000),
    ("reprise.ogg", 1000),
    ("door.ogg", 200),
    ("step.ogg", 200),
    ("boom.ogg", 400),
];

fn clip_type(id: AudioType, reserved: u32, fade: i32, drop: i32) -> AudioClipType {
    AudioClipType {
        id,
        reserved_channels: reserved,
        crossfade_speed: fade,
        speech_volume_drop: drop,
    }
}

fn clip(
    id: ClipId,
    name: &str,
    file: &str,
    clip_type: AudioType,
    volume: i32,
    priority: i32,
) -> AudioClip {
    AudioClip {
        id,
        script_name: name.into(),
        file_name: file.into(),
        format: FileFormat::CompressedBuffered,
        clip_type,
        default_volume: volume,
        default_priority: priority,
        default_repeat: false,
    }
}

/// Speech on channel 0, ambient loops on channel 1, music on channel 2,
/// plain sounds share channels 3..8. Music crossfades at 20% per step.
pub fn catalog() -> AudioCatalog {
    let mut brook = clip(BROOK, "aBrook", "brook.ogg", AMBIENT, 100, 50);
    brook.default_repeat = true;
    AudioCatalog::new(
        vec![
            clip_type(SPEECH, 1, 0, 0),
            clip_type(AMBIENT, 1, 0, 0),
            clip_type(MUSIC, 1, 20, 0),
            clip_type(SOUND, 0, 0, 60),
        ],
        vec![
            clip(SPEECH_LINE, "aSpeechLine", "speech.ogg", SPEECH, 100, 90),
            brook,
            clip(THEME, "aTheme", "theme.ogg", MUSIC, 100, 50),
            clip(REPRISE, "aReprise", "reprise.ogg", MUSIC, 80, 50),
            clip(DOOR_SLAM, "aDoorSlam", "door.ogg", SOUND, 100, 10),
            clip(FOOTSTEP, "aFootstep", "step.ogg", SOUND, 100, 5),
            clip(EXPLOSION, "aExplosion", "boom.ogg", SOUND, 100, 20),
        ],
    )
    .unwrap()
}

pub fn backend() -> Backend {
    let mut store = MemStore::new();
    for (name, size) in FILES {
        store.insert(*name, vec![0u8; *size]);
    }
    Backend {
        assets: Arc::new(store),
        voices: Arc::new(NullDriver::new()),
        codecs: Arc::new(NullCodecs::new()),
    }
}

pub fn engine_with(config: EngineConfig) -> AudioEngine {
    init_tracing();
    AudioEngine::new(config, catalog(), backend()).unwrap()
}

pub fn engine() -> AudioEngine {
    engine_with(EngineConfig::default())
}

/// Run `n` frames of the game loop.
pub fn advance(engine: &mut AudioEngine, n: usize) {
    for _ in 0..n {
        engine.advance().unwrap();
    }
}

/// Play `clip` through admission control, panicking if it was refused.
pub fn play(engine: &mut AudioEngine, clip: ClipId, priority: i32) -> usize {
    engine
        .play_clip(
            foley_common::types::ClipRef::Clip(clip),
            Some(priority),
            None,
            0,
            true,
        )
        .unwrap()
        .expect("clip should have been admitted")
}
