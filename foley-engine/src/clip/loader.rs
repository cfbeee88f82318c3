//! Clip construction: catalog entry to ready-to-play instance.

use super::{BufferedClip, SampleClip, SequenceClip, SoundClip, StreamClip, TrackerClip};
use crate::cache::SoundCache;
use crate::catalog::AudioCatalog;
use crate::{Backend, Error, Result};
use foley_common::config::EngineConfig;
use foley_common::types::{ClipId, FileFormat};

/// Build a clip instance for `clip_id`, dispatching on the catalog's
/// format tag.
///
/// `volume_override` replaces the clip's default volume when the host
/// has retuned the clip's type. The instance is primed with the catalog
/// defaults but not yet playing; the caller decides when and where.
pub fn load_sound_clip(
    catalog: &AudioCatalog,
    clip_id: ClipId,
    repeat: bool,
    backend: &Backend,
    cache: &SoundCache,
    config: &EngineConfig,
    volume_override: Option<i32>,
) -> Result<Box<dyn SoundClip>> {
    if !config.sound_enabled {
        return Err(Error::DecodeOpen("audio output is disabled".into()));
    }
    let entry = catalog
        .clip(clip_id)
        .ok_or_else(|| Error::InvalidParameter(format!("unknown clip id {}", clip_id.0)))?;

    let vol_percent = volume_override.unwrap_or(entry.default_volume);
    tracing::debug!(
        clip = %entry.script_name,
        file = %entry.file_name,
        format = ?entry.format,
        vol_percent,
        repeat,
        "loading sound clip"
    );

    let mut clip: Box<dyn SoundClip> = match entry.format {
        FileFormat::Wave => {
            let data = backend.assets.read(&entry.file_name)?;
            let sample = backend.codecs.load_sample(&data)?;
            Box::new(SampleClip::new(
                sample,
                backend.voices.clone(),
                vol_percent,
            ))
        }
        FileFormat::CompressedStream => {
            let reader = backend.assets.open(&entry.file_name)?;
            let codec = backend.codecs.open_stream()?;
            Box::new(StreamClip::new(
                codec,
                reader,
                config.stream_chunk_size,
                vol_percent,
            ))
        }
        FileFormat::CompressedBuffered => {
            let buffer = cache.get_or_load(&entry.file_name, backend.assets.as_ref())?;
            let codec = backend.codecs.open_buffered(buffer.clone())?;
            Box::new(BufferedClip::new(codec, buffer, vol_percent))
        }
        FileFormat::Sequence => {
            let data = backend.assets.read(&entry.file_name)?;
            let seq = backend.codecs.open_sequence(&data)?;
            Box::new(SequenceClip::new(seq, vol_percent))
        }
        FileFormat::TrackerModule => {
            let data = backend.assets.read(&entry.file_name)?;
            let module = backend.codecs.open_tracker(&data)?;
            Box::new(TrackerClip::new(module, vol_percent))
        }
    };

    let base = clip.base_mut();
    base.repeat = repeat;
    base.priority = entry.default_priority;
    base.original_vol_percent = vol_percent;
    base.source_clip = Some(entry.id);
    base.clip_type = Some(entry.clip_type);
    Ok(clip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemStore;
    use crate::catalog::{AudioClip, AudioClipType};
    use crate::codec::NullCodecs;
    use crate::voice::NullDriver;
    use foley_common::types::AudioType;
    use std::sync::Arc;

    fn backend_with(files: &[(&str, usize)]) -> Backend {
        let mut store = MemStore::new();
        for (name, size) in files {
            store.insert(*name, vec![0u8; *size]);
        }
        Backend {
            assets: Arc::new(store),
            voices: Arc::new(NullDriver::new()),
            codecs: Arc::new(NullCodecs::new()),
        }
    }

    fn catalog_with(format: FileFormat, file_name: &str) -> AudioCatalog {
        AudioCatalog::new(
            vec![AudioClipType {
                id: AudioType(0),
                reserved_channels: 0,
                crossfade_speed: 0,
                speech_volume_drop: 0,
            }],
            vec![AudioClip {
                id: ClipId(0),
                script_name: "aTest0".into(),
                file_name: file_name.into(),
                format,
                clip_type: AudioType(0),
                default_volume: 70,
                default_priority: 42,
                default_repeat: false,
            }],
        )
        .unwrap()
    }

    #[test]
    fn loads_defaults_from_the_catalog() {
        let backend = backend_with(&[("a.ogg", 100)]);
        let catalog = catalog_with(FileFormat::CompressedBuffered, "a.ogg");
        let cache = SoundCache::new(4);

        let clip = load_sound_clip(
            &catalog,
            ClipId(0),
            true,
            &backend,
            &cache,
            &EngineConfig::default(),
            None,
        )
        .unwrap();

        let base = clip.base();
        assert_eq!(base.vol_percent, 70);
        assert_eq!(base.priority, 42);
        assert!(base.repeat);
        assert_eq!(base.source_clip, Some(ClipId(0)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn volume_override_beats_the_default() {
        let backend = backend_with(&[("a.wav", 100)]);
        let catalog = catalog_with(FileFormat::Wave, "a.wav");
        let cache = SoundCache::new(4);

        let clip = load_sound_clip(
            &catalog,
            ClipId(0),
            false,
            &backend,
            &cache,
            &EngineConfig::default(),
            Some(25),
        )
        .unwrap();
        assert_eq!(clip.base().vol_percent, 25);
        assert_eq!(clip.base().original_vol_percent, 25);
    }

    #[test]
    fn missing_file_is_a_decode_open_error() {
        let backend = backend_with(&[]);
        let catalog = catalog_with(FileFormat::Wave, "gone.wav");
        let cache = SoundCache::new(4);

        let result = load_sound_clip(
            &catalog,
            ClipId(0),
            false,
            &backend,
            &cache,
            &EngineConfig::default(),
            None,
        );
        assert!(matches!(result, Err(Error::DecodeOpen(_))));
    }

    #[test]
    fn disabled_audio_refuses_to_load() {
        let backend = backend_with(&[("a.wav", 10)]);
        let catalog = catalog_with(FileFormat::Wave, "a.wav");
        let cache = SoundCache::new(4);
        let config = EngineConfig {
            sound_enabled: false,
            ..Default::default()
        };

        let result = load_sound_clip(
            &catalog,
            ClipId(0),
            false,
            &backend,
            &cache,
            &config,
            None,
        );
        assert!(matches!(result, Err(Error::DecodeOpen(_))));
    }
}
