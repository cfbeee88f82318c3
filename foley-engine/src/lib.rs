//! Real-time audio channel management and mixing engine.
//!
//! A fixed pool of playback channels hosts decoder-backed sound clips,
//! with priority-based admission when the pool is full, crossfaded
//! track changes, distance-attenuated ambient loops, a pending-track
//! queue, and full save/restore of the playback state. The platform
//! mixer, asset storage, and compressed-format decoders are consumed
//! through traits; [`AudioEngine`] ties the pieces together behind one
//! per-frame [`AudioEngine::advance`] entry point.

pub mod allocator;
pub mod ambient;
pub mod assets;
pub mod cache;
pub mod catalog;
pub mod channels;
pub mod clip;
pub mod codec;
pub mod crossfade;
pub mod engine;
pub mod error;
pub mod queue;
pub mod savegame;
pub mod voice;

pub use engine::{AudioEngine, ChannelStatus};
pub use error::{Error, Result};

use assets::AssetStore;
use codec::CodecProvider;
use std::sync::Arc;
use voice::VoiceDriver;

/// The host-supplied platform seams the engine plays through.
#[derive(Clone)]
pub struct Backend {
    pub assets: Arc<dyn AssetStore>,
    pub voices: Arc<dyn VoiceDriver>,
    pub codecs: Arc<dyn CodecProvider>,
}

impl Backend {
    /// Silent backend: no assets, no mixer output. Used when audio is
    /// disabled and by tests that provide their own asset store.
    pub fn silent() -> Self {
        Self {
            assets: Arc::new(assets::MemStore::new()),
            voices: Arc::new(voice::NullDriver::new()),
            codecs: Arc::new(codec::NullCodecs::new()),
        }
    }
}
