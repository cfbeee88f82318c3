//! The engine context: channel table, crossfader, ambient slots, and
//! queue behind one per-frame advance.
//!
//! All control operations (play, stop, volume, seek, save/restore) run
//! on the game thread. [`AudioEngine::advance`] is called once per
//! frame and steps the crossfade, drains the queue, recomputes speech
//! ducking and positional attenuation, and polls decoders unless a
//! background poll thread is configured to do that instead.

use crate::allocator::{select_channel, snapshot_occupants, Selection};
use crate::ambient::{duck_for_speech, volume_for_distance, AmbientSound, AmbientTable};
use crate::cache::SoundCache;
use crate::catalog::AudioCatalog;
use crate::channels::ChannelTable;
use crate::clip::{into_handle, load_sound_clip, ClipHandle, SoundClip};
use crate::crossfade::{Crossfader, FadeState};
use crate::queue::{PlayQueue, QueueEntry};
use crate::savegame::{self, SavedChannel, SavedQueueEntry, SavedState};
use crate::{Backend, Error, Result};
use foley_common::config::EngineConfig;
use foley_common::types::{
    AudioType, ClipId, ClipRef, VolumeScope, CROSSFADE_CHANNEL, MAX_SOUND_CHANNELS,
    MUSIC_CHANNEL, SPEECH_CHANNEL, TOTAL_CHANNELS,
};
use foley_common::volume::{percent_to_internal, valid_pan_percent, valid_percent};
use parking_lot::Mutex;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Position reported while the game fast-forwards through a cutscene,
/// so any script waiting for a position is released immediately.
const FAST_FORWARD_POSITION_MS: i32 = 999_999_999;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Answer to a channel query from the scripting boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStatus {
    pub is_playing: bool,
    pub clip: Option<ClipId>,
    pub position_ms: i32,
    pub length_ms: i32,
}

struct Poller {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

pub struct AudioEngine {
    config: EngineConfig,
    catalog: AudioCatalog,
    backend: Backend,
    cache: SoundCache,
    channels: ChannelTable,
    crossfader: Crossfader,
    ambient: AmbientTable,
    queue: PlayQueue,
    /// Per-type default volume overrides, percent.
    type_volume_overrides: Vec<Option<i32>>,
    /// Per-type speech-drop overrides, percent.
    speech_drop_overrides: Vec<Option<i32>>,
    /// Ducking applied to ambient source volume while speech plays:
    /// positive subtracts, negative sets the absolute level.
    ambient_speech_drop: i32,
    listener: (i32, i32),
    fast_forward: bool,
    current_music: Option<ClipId>,
    poll_roster: Arc<Mutex<Vec<ClipHandle>>>,
    poller: Option<Poller>,
}

impl AudioEngine {
    pub fn new(config: EngineConfig, catalog: AudioCatalog, backend: Backend) -> Result<Self> {
        config.validate()?;
        let type_count = catalog.type_count();
        let poll_roster = Arc::new(Mutex::new(Vec::new()));
        let poller = if config.threaded_polling && config.sound_enabled {
            Some(Self::spawn_poller(poll_roster.clone())?)
        } else {
            None
        };
        tracing::info!(
            clips = catalog.clip_count(),
            types = type_count,
            reserved = catalog.reserved_channel_count(),
            threaded = poller.is_some(),
            "audio engine up"
        );
        Ok(Self {
            cache: SoundCache::new(config.cache_entries),
            queue: PlayQueue::new(config.max_queue_len),
            config,
            catalog,
            backend,
            channels: ChannelTable::new(),
            crossfader: Crossfader::new(),
            ambient: AmbientTable::new(),
            type_volume_overrides: vec![None; type_count],
            speech_drop_overrides: vec![None; type_count],
            ambient_speech_drop: 60,
            listener: (0, 0),
            fast_forward: false,
            current_music: None,
            poll_roster,
            poller,
        })
    }

    fn spawn_poller(roster: Arc<Mutex<Vec<ClipHandle>>>) -> Result<Poller> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let handle = thread::Builder::new()
            .name("audio-poll".into())
            .spawn(move || {
                while !flag.load(Ordering::Relaxed) {
                    let handles: Vec<ClipHandle> = roster.lock().clone();
                    for handle in handles {
                        handle.lock().poll();
                    }
                    thread::sleep(POLL_INTERVAL);
                }
            })?;
        Ok(Poller {
            stop,
            handle: Some(handle),
        })
    }

    fn refresh_roster(&self) {
        *self.poll_roster.lock() = self.channels.live_handles();
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &AudioCatalog {
        &self.catalog
    }

    /// Stop everything and join the poll thread. Also runs on drop.
    pub fn shutdown(&mut self) {
        self.stop_all(None);
        if let Some(mut poller) = self.poller.take() {
            poller.stop.store(true, Ordering::Relaxed);
            if let Some(handle) = poller.handle.take() {
                let _ = handle.join();
            }
        }
    }

    // ---- per-frame tick ------------------------------------------------

    /// Advance the engine one frame. A no-op while audio is disabled.
    pub fn advance(&mut self) -> Result<()> {
        if !self.config.sound_enabled {
            return Ok(());
        }
        if self.poller.is_none() {
            for handle in self.channels.live_handles() {
                handle.lock().poll();
            }
        }
        self.crossfader.tick(&mut self.channels)?;
        self.update_music_bookkeeping();
        self.drain_queue()?;
        self.update_speech_ducking();
        self.update_ambient();
        self.update_directional();
        self.refresh_roster();
        Ok(())
    }

    fn update_music_bookkeeping(&mut self) {
        if self.current_music.is_some() && !self.channels.is_playing(MUSIC_CHANNEL) {
            tracing::debug!("music track finished");
            self.current_music = None;
        }
    }

    // ---- playback ------------------------------------------------------

    /// Play a clip, choosing a channel through admission control.
    ///
    /// `priority` and `repeat` default to the catalog entry's values.
    /// With `queue_if_busy` the request is queued instead of competing
    /// with equal-priority occupants; without it, pending entries of the
    /// same type are dropped first. Returns the channel used, or `None`
    /// when the request was denied, queued, or the asset would not load.
    pub fn play_clip(
        &mut self,
        clip_ref: ClipRef,
        priority: Option<i32>,
        repeat: Option<bool>,
        from_offset: i32,
        queue_if_busy: bool,
    ) -> Result<Option<usize>> {
        if !self.config.sound_enabled {
            return Ok(None);
        }
        if from_offset < 0 {
            return Err(Error::InvalidParameter(format!(
                "negative play offset {from_offset}"
            )));
        }
        let Some(clip_id) = self.catalog.resolve(clip_ref) else {
            tracing::warn!(?clip_ref, "play request for unknown clip");
            return Ok(None);
        };
        let (clip_type, default_priority, default_repeat) = match self.catalog.clip(clip_id) {
            Some(e) => (e.clip_type, e.default_priority, e.default_repeat),
            None => return Ok(None),
        };
        let priority = priority.unwrap_or(default_priority);
        let repeat = repeat.unwrap_or(default_repeat);

        if !queue_if_busy {
            let catalog = &self.catalog;
            self.queue
                .retain(|e| catalog.clip(e.clip).map(|c| c.clip_type) != Some(clip_type));
        }

        let range = self.catalog.eligible_range(clip_type);
        let occupants = snapshot_occupants(&self.channels);
        match select_channel(range, &occupants, clip_type, priority, !queue_if_busy) {
            Selection::Denied => {
                if queue_if_busy {
                    self.enqueue(clip_id, priority, repeat);
                } else {
                    tracing::debug!(
                        clip = clip_id.0,
                        priority,
                        "no channel available to interrupt"
                    );
                }
                Ok(None)
            }
            Selection::Free(ch) => {
                self.stop_and_destroy(ch, true);
                self.launch(ch, clip_id, priority, repeat, from_offset, None, false)
            }
            Selection::Evict(ch) => {
                let faded = self.stop_or_fade_out(ch);
                self.launch(ch, clip_id, priority, repeat, from_offset, None, faded)
            }
        }
    }

    fn enqueue(&mut self, clip: ClipId, priority: i32, repeat: bool) {
        let entry = QueueEntry {
            clip,
            priority,
            repeat,
            cached: None,
        };
        if let Err(e) = self.queue.push(entry) {
            tracing::warn!(clip = clip.0, error = %e, "dropping play request");
            return;
        }
        self.preload_queue_head();
    }

    /// Start a loaded (or loadable) clip on a specific channel.
    fn launch(
        &mut self,
        ch: usize,
        clip_id: ClipId,
        priority: i32,
        repeat: bool,
        offset: i32,
        preloaded: Option<Box<dyn SoundClip>>,
        fade_in_candidate: bool,
    ) -> Result<Option<usize>> {
        let volume_override = self.type_volume_override(clip_id);
        let mut clip = match preloaded {
            Some(clip) => clip,
            None => match load_sound_clip(
                &self.catalog,
                clip_id,
                repeat,
                &self.backend,
                &self.cache,
                &self.config,
                volume_override,
            ) {
                Ok(clip) => clip,
                Err(e) => {
                    tracing::warn!(clip = clip_id.0, error = %e, "clip failed to load, playing nothing");
                    return Ok(None);
                }
            },
        };
        clip.base_mut().priority = priority;

        if fade_in_candidate && self.config.crossfade_enabled {
            let speed = self
                .catalog
                .type_of(clip_id)
                .map(|t| t.crossfade_speed)
                .unwrap_or(0);
            if speed > 0 {
                let target = clip.base().vol_percent;
                self.crossfader.begin_fade_in(ch, speed, target);
                clip.set_volume_percent(0);
            }
        }
        if self.fast_forward {
            clip.set_volume_percent(0);
        }

        if let Err(e) = clip.play_from(offset) {
            tracing::warn!(clip = clip_id.0, error = %e, "clip failed to start");
            self.crossfader.note_channel_stopped(ch);
            return Ok(None);
        }
        self.channels.assign(ch, into_handle(clip));
        if ch == MUSIC_CHANNEL {
            self.current_music = Some(clip_id);
        }
        self.refresh_roster();
        tracing::debug!(clip = clip_id.0, channel = ch, priority, "clip playing");
        Ok(Some(ch))
    }

    // ---- stopping ------------------------------------------------------

    /// Stop a channel, fading it out when its type crossfades.
    pub fn stop_channel(&mut self, ch: usize) -> Result<()> {
        self.check_channel(ch)?;
        self.stop_or_fade_out(ch);
        self.refresh_roster();
        Ok(())
    }

    /// Stop every channel and pending entry, or only those of one type.
    pub fn stop_all(&mut self, clip_type: Option<AudioType>) {
        match clip_type {
            None => {
                self.queue.clear();
                for ch in 0..TOTAL_CHANNELS {
                    self.stop_and_destroy(ch, true);
                }
                self.crossfader.reset();
            }
            Some(t) => {
                let catalog = &self.catalog;
                self.queue
                    .retain(|e| catalog.clip(e.clip).map(|c| c.clip_type) != Some(t));
                for ch in 0..TOTAL_CHANNELS {
                    let matches = self
                        .channels
                        .playing_clip(ch)
                        .and_then(|id| self.catalog.clip(id))
                        .map(|c| c.clip_type)
                        == Some(t);
                    if matches {
                        self.stop_and_destroy(ch, true);
                    }
                }
            }
        }
        self.refresh_roster();
    }

    /// Stop a specific clip wherever it is playing or queued.
    pub fn stop_clip(&mut self, clip_ref: ClipRef) -> Result<()> {
        let Some(clip_id) = self.catalog.resolve(clip_ref) else {
            return Ok(());
        };
        self.queue.retain(|e| e.clip != clip_id);
        for ch in 0..TOTAL_CHANNELS {
            if self.channels.playing_clip(ch) == Some(clip_id) {
                self.stop_or_fade_out(ch);
            }
        }
        self.refresh_roster();
        Ok(())
    }

    /// Crossfade-aware stop: a clip whose type has a crossfade rate is
    /// moved to the dedicated crossfade channel and faded out there;
    /// anything else stops immediately. Returns whether a fade started.
    fn stop_or_fade_out(&mut self, ch: usize) -> bool {
        let fade_speed = self
            .channels
            .playing_clip(ch)
            .and_then(|id| self.catalog.type_of(id))
            .map(|t| t.crossfade_speed)
            .unwrap_or(0);
        if self.config.crossfade_enabled
            && fade_speed > 0
            && ch != CROSSFADE_CHANNEL
            && self.channels.is_playing(ch)
        {
            self.stop_and_destroy(CROSSFADE_CHANNEL, false);
            let vol = self
                .channels
                .with_clip(ch, |c| c.base().vol_percent)
                .unwrap_or(0);
            self.channels.move_clip(ch, CROSSFADE_CHANNEL);
            self.ambient.clear(ch);
            self.crossfader.note_channel_stopped(ch);
            if ch == MUSIC_CHANNEL {
                self.current_music = None;
            }
            self.crossfader.begin_fade_out(CROSSFADE_CHANNEL, vol, fade_speed);
            true
        } else {
            self.stop_and_destroy(ch, true);
            false
        }
    }

    /// Destroy the channel's clip and repair every back-reference in
    /// the same operation.
    fn stop_and_destroy(&mut self, ch: usize, reset_legacy: bool) {
        self.channels.clear(ch);
        self.crossfader.note_channel_stopped(ch);
        self.ambient.clear(ch);
        if reset_legacy && ch == MUSIC_CHANNEL {
            self.current_music = None;
        }
    }

    // ---- queue ---------------------------------------------------------

    fn drain_queue(&mut self) -> Result<()> {
        self.try_early_music_handoff()?;

        let mut index = 0;
        while index < self.queue.len() {
            let (clip_id, priority) = match self.queue.get(index) {
                Some(e) => (e.clip, e.priority),
                None => break,
            };
            let clip_type = match self.catalog.clip(clip_id) {
                Some(c) => c.clip_type,
                None => {
                    self.queue.remove(index);
                    continue;
                }
            };
            let range = self.catalog.eligible_range(clip_type);
            let occupants = snapshot_occupants(&self.channels);
            match select_channel(range, &occupants, clip_type, priority, false) {
                Selection::Denied => index += 1,
                selection => {
                    if let Some(entry) = self.queue.remove(index) {
                        self.admit(selection, entry)?;
                    }
                }
            }
        }
        self.preload_queue_head();
        Ok(())
    }

    fn admit(&mut self, selection: Selection, entry: QueueEntry) -> Result<()> {
        match selection {
            Selection::Free(ch) => {
                self.stop_and_destroy(ch, true);
                self.launch(ch, entry.clip, entry.priority, entry.repeat, 0, entry.cached, false)?;
            }
            Selection::Evict(ch) => {
                let faded = self.stop_or_fade_out(ch);
                self.launch(
                    ch,
                    entry.clip,
                    entry.priority,
                    entry.repeat,
                    0,
                    entry.cached,
                    faded,
                )?;
            }
            Selection::Denied => {}
        }
        Ok(())
    }

    /// Dequeue the next track slightly before the current one ends so
    /// the crossfade completes right at the boundary.
    fn try_early_music_handoff(&mut self) -> Result<()> {
        if !self.config.crossfade_enabled || !self.crossfader.is_idle() {
            return Ok(());
        }
        let Some(head) = self.queue.front() else {
            return Ok(());
        };
        let head_clip = head.clip;
        let rate = self
            .catalog
            .type_of(head_clip)
            .map(|t| t.crossfade_speed)
            .unwrap_or(0);
        if rate <= 0 {
            return Ok(());
        }
        let Some((pos, len)) = self
            .channels
            .with_clip(MUSIC_CHANNEL, |c| (c.position_ms(), c.length_ms()))
        else {
            return Ok(());
        };
        if len <= 0 || pos <= 0 || !self.channels.is_playing(MUSIC_CHANNEL) {
            return Ok(());
        }
        let target = self
            .type_volume_override(head_clip)
            .or_else(|| self.catalog.clip(head_clip).map(|c| c.default_volume))
            .unwrap_or(100);
        let steps = target / rate.max(1);
        let lead_ms = steps * 1000 / self.config.frames_per_second as i32;
        if pos < len - lead_ms {
            return Ok(());
        }

        tracing::debug!(clip = head_clip.0, pos, len, lead_ms, "early crossfade to next track");
        if let Some(entry) = self.queue.pop() {
            let clip_type = match self.catalog.clip(entry.clip) {
                Some(c) => c.clip_type,
                None => return Ok(()),
            };
            let range = self.catalog.eligible_range(clip_type);
            let occupants = snapshot_occupants(&self.channels);
            match select_channel(range, &occupants, clip_type, entry.priority, true) {
                Selection::Denied => self.queue.push_front(entry),
                selection => self.admit(selection, entry)?,
            }
        }
        Ok(())
    }

    fn preload_queue_head(&mut self) {
        if !self.queue.head_needs_load() {
            return;
        }
        let (clip_id, repeat) = match self.queue.front() {
            Some(e) => (e.clip, e.repeat),
            None => return,
        };
        let volume_override = self.type_volume_override(clip_id);
        match load_sound_clip(
            &self.catalog,
            clip_id,
            repeat,
            &self.backend,
            &self.cache,
            &self.config,
            volume_override,
        ) {
            Ok(clip) => {
                if let Some(head) = self.queue.front_mut() {
                    head.cached = Some(clip);
                }
            }
            Err(e) => {
                tracing::warn!(clip = clip_id.0, error = %e, "queued clip failed to load, dropping");
                self.queue.pop();
            }
        }
    }

    // ---- channel controls ----------------------------------------------

    /// Set a channel's volume, 0-100%. Routes to the ambient descriptor
    /// when the channel hosts an ambient sound, since distance
    /// attenuation recomputes from the source volume each tick.
    pub fn set_channel_volume(&mut self, ch: usize, percent: i32) -> Result<()> {
        self.check_channel(ch)?;
        if !valid_percent(percent) {
            return Err(Error::InvalidParameter(format!(
                "volume {percent}% out of range"
            )));
        }
        if let Some(amb) = self.ambient.get_mut(ch) {
            amb.vol = percent_to_internal(percent).max(1);
            self.update_ambient();
            return Ok(());
        }
        self.channels.with_clip(ch, |c| {
            c.set_volume_percent(percent);
            c.base_mut().original_vol_percent = percent;
        });
        Ok(())
    }

    /// Set a channel's panning, -100..100%.
    pub fn set_channel_pan(&mut self, ch: usize, percent: i32) -> Result<()> {
        self.check_channel(ch)?;
        if !valid_pan_percent(percent) {
            return Err(Error::InvalidParameter(format!(
                "pan {percent}% out of range"
            )));
        }
        self.channels.with_clip(ch, |c| c.set_panning_percent(percent));
        Ok(())
    }

    /// Tie a playing channel to a room coordinate so its volume follows
    /// the listener distance, like an ambient source. `(0, 0)` unties
    /// it and restores full volume.
    pub fn set_channel_location(&mut self, ch: usize, x: i32, y: i32, max_distance: i32) -> Result<()> {
        self.check_channel(ch)?;
        if x < 0 || y < 0 {
            return Err(Error::InvalidParameter(format!(
                "negative source location ({x}, {y})"
            )));
        }
        if (x != 0 || y != 0) && max_distance <= 0 {
            return Err(Error::InvalidParameter(format!(
                "max distance {max_distance} for a positional source"
            )));
        }
        self.channels.with_clip(ch, |c| {
            let base = c.base_mut();
            if x == 0 && y == 0 {
                base.x_source = -1;
                base.y_source = 0;
                base.max_distance = 0;
            } else {
                base.x_source = x;
                base.y_source = y;
                base.max_distance = max_distance;
            }
        });
        self.update_directional();
        Ok(())
    }

    /// Seek a channel to `pos` in its clip's native unit.
    pub fn seek_channel(&mut self, ch: usize, pos: i32) -> Result<()> {
        self.check_channel(ch)?;
        if pos < 0 {
            return Err(Error::InvalidParameter(format!(
                "negative seek position {pos}"
            )));
        }
        match self.channels.with_clip(ch, |c| c.seek(pos)) {
            Some(result) => result,
            None => Ok(()),
        }
    }

    pub fn pause_channel(&mut self, ch: usize) -> Result<()> {
        self.check_channel(ch)?;
        self.channels.with_clip(ch, |c| c.pause());
        Ok(())
    }

    pub fn resume_channel(&mut self, ch: usize) -> Result<()> {
        self.check_channel(ch)?;
        self.channels.with_clip(ch, |c| c.resume());
        Ok(())
    }

    pub fn channel_status(&self, ch: usize) -> Result<ChannelStatus> {
        self.check_channel(ch)?;
        let (position_ms, length_ms) = self
            .channels
            .with_clip(ch, |c| (c.position_ms(), c.length_ms()))
            .unwrap_or((0, 0));
        // during a cutscene skip, scripts polling a channel must not
        // block: nothing reports as playing and positions saturate
        if self.fast_forward {
            return Ok(ChannelStatus {
                is_playing: false,
                clip: self.channels.playing_clip(ch),
                position_ms: FAST_FORWARD_POSITION_MS,
                length_ms,
            });
        }
        Ok(ChannelStatus {
            is_playing: self.channels.is_playing(ch),
            clip: self.channels.playing_clip(ch),
            position_ms,
            length_ms,
        })
    }

    /// Last clip the channel played, surviving the clip's destruction.
    pub fn last_played(&self, ch: usize) -> Option<ClipId> {
        self.channels.last_played(ch)
    }

    /// Effective audible volume of the channel's clip, internal 0-255,
    /// with the speech and positional modifiers applied.
    pub fn channel_volume(&self, ch: usize) -> Option<i32> {
        self.channels.with_clip(ch, |c| c.base().effective_volume())
    }

    /// Internal 0-255 panning of the channel's clip, 128 center.
    pub fn channel_panning(&self, ch: usize) -> Option<i32> {
        self.channels.with_clip(ch, |c| c.base().panning)
    }

    pub fn is_channel_playing(&self, ch: usize) -> bool {
        self.channels.is_playing(ch)
    }

    pub fn playing_clip(&self, ch: usize) -> Option<ClipId> {
        self.channels.playing_clip(ch)
    }

    pub fn current_music(&self) -> Option<ClipId> {
        self.current_music
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn crossfade_state(&self) -> FadeState {
        self.crossfader.state()
    }

    /// True when the clip exists in the catalog and its asset can be
    /// opened.
    pub fn clip_is_available(&self, clip_ref: ClipRef) -> bool {
        self.catalog
            .resolve(clip_ref)
            .and_then(|id| self.catalog.clip(id))
            .map(|c| self.backend.assets.exists(&c.file_name))
            .unwrap_or(false)
    }

    // ---- type-wide controls --------------------------------------------

    /// Retune a clip type's volume: currently playing channels, the
    /// default for future plays, or both.
    pub fn set_type_volume(
        &mut self,
        clip_type: AudioType,
        percent: i32,
        scope: VolumeScope,
    ) -> Result<()> {
        if self.catalog.clip_type(clip_type).is_none() {
            return Err(Error::InvalidParameter(format!(
                "unknown audio type {}",
                clip_type.0
            )));
        }
        if !valid_percent(percent) {
            return Err(Error::InvalidParameter(format!(
                "volume {percent}% out of range"
            )));
        }
        if matches!(scope, VolumeScope::Existing | VolumeScope::Both) {
            for ch in 0..TOTAL_CHANNELS {
                let matches = self
                    .channels
                    .playing_clip(ch)
                    .and_then(|id| self.catalog.clip(id))
                    .map(|c| c.clip_type)
                    == Some(clip_type);
                if matches && self.ambient.get(ch).is_none() {
                    self.channels.with_clip(ch, |c| {
                        c.set_volume_percent(percent);
                        c.base_mut().original_vol_percent = percent;
                    });
                }
            }
        }
        if matches!(scope, VolumeScope::FutureDefault | VolumeScope::Both) {
            self.type_volume_overrides[clip_type.0 as usize] = Some(percent);
        }
        Ok(())
    }

    /// Override how far clips of a type drop while speech plays,
    /// percent.
    pub fn set_type_speech_drop(&mut self, clip_type: AudioType, drop: i32) -> Result<()> {
        if self.catalog.clip_type(clip_type).is_none() {
            return Err(Error::InvalidParameter(format!(
                "unknown audio type {}",
                clip_type.0
            )));
        }
        self.speech_drop_overrides[clip_type.0 as usize] = Some(drop);
        Ok(())
    }

    /// Set the ambient ducking applied while speech plays: positive
    /// subtracts from the source volume, negative sets it outright.
    pub fn set_ambient_speech_drop(&mut self, drop: i32) {
        self.ambient_speech_drop = drop;
    }

    // ---- ambient and positional ----------------------------------------

    /// Start a looping positional sound on an explicit channel. An `x`
    /// of 0 makes the sound non-positional (full volume everywhere).
    /// Replaying the same clip on its channel just moves the source.
    pub fn play_ambient(
        &mut self,
        ch: usize,
        clip_ref: ClipRef,
        vol: i32,
        x: i32,
        y: i32,
        max_distance: i32,
    ) -> Result<()> {
        if ch == SPEECH_CHANNEL || ch >= MAX_SOUND_CHANNELS {
            return Err(Error::InvalidParameter(format!(
                "ambient sound cannot use channel {ch}"
            )));
        }
        if !(1..=255).contains(&vol) {
            return Err(Error::InvalidParameter(format!(
                "ambient volume {vol} out of range"
            )));
        }
        let Some(clip_id) = self.catalog.resolve(clip_ref) else {
            tracing::warn!(?clip_ref, "ambient request for unknown clip");
            return Ok(());
        };

        if self.ambient.get(ch).map(|a| a.clip) == Some(clip_id) && self.channels.is_playing(ch)
        {
            if let Some(a) = self.ambient.get_mut(ch) {
                a.vol = vol;
                a.x = x;
                a.y = y;
                a.max_distance = max_distance;
            }
            self.update_ambient();
            return Ok(());
        }

        self.stop_and_destroy(ch, true);
        let volume_override = self.type_volume_override(clip_id);
        let mut clip = match load_sound_clip(
            &self.catalog,
            clip_id,
            true,
            &self.backend,
            &self.cache,
            &self.config,
            volume_override,
        ) {
            Ok(clip) => clip,
            Err(e) => {
                tracing::warn!(clip = clip_id.0, error = %e, "ambient clip failed to load");
                return Ok(());
            }
        };
        clip.set_volume(vol);
        if let Err(e) = clip.play() {
            tracing::warn!(clip = clip_id.0, error = %e, "ambient clip failed to start");
            return Ok(());
        }
        self.channels.assign(ch, into_handle(clip));
        self.ambient.set(AmbientSound {
            channel: ch,
            x,
            y,
            vol,
            clip: clip_id,
            max_distance,
        });
        self.update_ambient();
        self.refresh_roster();
        Ok(())
    }

    pub fn stop_ambient(&mut self, ch: usize) -> Result<()> {
        if ch == SPEECH_CHANNEL || ch >= MAX_SOUND_CHANNELS {
            return Err(Error::InvalidParameter(format!(
                "ambient sound cannot use channel {ch}"
            )));
        }
        self.stop_and_destroy(ch, true);
        self.refresh_roster();
        Ok(())
    }

    /// Move the listener; ambient and positional volumes recompute
    /// immediately rather than waiting for the next tick.
    pub fn set_listener(&mut self, x: i32, y: i32) {
        self.listener = (x, y);
        self.update_ambient();
        self.update_directional();
    }

    fn update_speech_ducking(&mut self) {
        let speech_active = self.channels.is_playing(SPEECH_CHANNEL);
        for ch in 0..TOTAL_CHANNELS {
            if ch == SPEECH_CHANNEL || self.ambient.get(ch).is_some() {
                continue;
            }
            let Some(clip_id) = self.channels.playing_clip(ch) else {
                continue;
            };
            let Some(type_meta) = self.catalog.type_of(clip_id) else {
                continue;
            };
            let drop = self
                .speech_drop_overrides
                .get(type_meta.id.0 as usize)
                .copied()
                .flatten()
                .unwrap_or(type_meta.speech_volume_drop);
            let modifier = if speech_active && drop > 0 {
                -(drop * 255 / 100)
            } else {
                0
            };
            self.channels.with_clip(ch, |c| {
                if c.base().vol_modifier != modifier {
                    c.set_speech_modifier(modifier);
                }
            });
        }
    }

    fn update_ambient(&mut self) {
        let speech_active = self.channels.is_playing(SPEECH_CHANNEL);
        let descriptors: Vec<AmbientSound> = self.ambient.iter().copied().collect();
        for amb in descriptors {
            if !self.channels.is_playing(amb.channel) {
                continue;
            }
            let mut vol = amb.vol;
            if speech_active {
                vol = duck_for_speech(vol, self.ambient_speech_drop);
            }
            if amb.x != 0 && amb.max_distance > 0 {
                vol = volume_for_distance(
                    vol,
                    self.listener,
                    (amb.x, amb.y),
                    amb.max_distance,
                    self.config.full_volume_distance,
                );
            }
            if self.fast_forward {
                vol = 0;
            }
            self.channels.with_clip(amb.channel, |c| c.set_volume(vol));
        }
    }

    fn update_directional(&mut self) {
        let listener = self.listener;
        let full = self.config.full_volume_distance;
        for ch in 0..TOTAL_CHANNELS {
            if self.ambient.get(ch).is_some() {
                continue;
            }
            self.channels.with_clip(ch, |c| {
                let base = c.base();
                if !base.is_positional() || base.max_distance <= 0 {
                    if base.directional_modifier != 0 {
                        c.set_directional_modifier(0);
                    }
                    return;
                }
                let attenuated = volume_for_distance(
                    base.vol,
                    listener,
                    (base.x_source, base.y_source),
                    base.max_distance,
                    full,
                );
                let modifier = attenuated - base.vol;
                if base.directional_modifier != modifier {
                    c.set_directional_modifier(modifier);
                }
            });
        }
    }

    // ---- global modes --------------------------------------------------

    /// Enter or leave cutscene fast-forward. Entering mutes every live
    /// channel; leaving restores their pre-skip volumes.
    pub fn set_fast_forward(&mut self, on: bool) {
        if self.fast_forward == on {
            return;
        }
        self.fast_forward = on;
        for handle in self.channels.live_handles() {
            let mut clip = handle.lock();
            if on {
                clip.set_volume_percent(0);
            } else {
                let original = clip.base().original_vol_percent;
                clip.set_volume_percent(original);
            }
        }
    }

    pub fn set_crossfade_enabled(&mut self, enabled: bool) {
        self.config.crossfade_enabled = enabled;
        if !enabled {
            self.crossfader.collapse(&mut self.channels);
        }
    }

    // ---- persistence ---------------------------------------------------

    /// Write the audio block for the save-game stream.
    pub fn save_state<W: Write>(&self, w: &mut W) -> Result<()> {
        let mut channels = Vec::with_capacity(TOTAL_CHANNELS);
        for ch in 0..TOTAL_CHANNELS {
            let saved = self.channels.get(ch).and_then(|handle| {
                let clip = handle.lock();
                if clip.is_done() {
                    return None;
                }
                let base = clip.base();
                let id = base.source_clip?;
                Some(SavedChannel {
                    clip: id,
                    position: clip.position(),
                    priority: base.priority,
                    repeat: base.repeat,
                    vol: base.vol,
                    panning: base.panning,
                    vol_percent: base.vol_percent,
                    panning_percent: base.panning_percent,
                    x_source: base.x_source,
                    y_source: base.y_source,
                    max_distance: base.max_distance,
                })
            });
            channels.push(saved);
        }
        let queue = self
            .queue
            .iter()
            .map(|e| SavedQueueEntry {
                clip: e.clip,
                priority: e.priority,
                repeat: e.repeat,
            })
            .collect();
        let mut ambient = vec![None; TOTAL_CHANNELS];
        for a in self.ambient.iter() {
            ambient[a.channel] = Some(*a);
        }
        let state = SavedState {
            channels,
            crossfade: self.crossfader.snapshot(),
            queue,
            ambient,
            current_music: self.current_music,
        };
        savegame::write_state(w, self.catalog.clip_count() as u32, &state)
    }

    /// Rebuild playback from a saved audio block. The block is parsed
    /// and validated in full before any live state is touched, so a
    /// mismatched save leaves the current session playing.
    pub fn restore_state<R: Read>(&mut self, r: &mut R) -> Result<()> {
        let (clip_count, state) = savegame::read_state(r)?;
        if clip_count as usize != self.catalog.clip_count() {
            return Err(Error::SaveMismatch(format!(
                "save taken against {clip_count} clips, catalog has {}",
                self.catalog.clip_count()
            )));
        }

        self.stop_all(None);
        self.crossfader.reset();
        self.current_music = None;

        for (ch, saved) in state.channels.iter().enumerate() {
            if let Some(s) = saved {
                self.restore_channel(ch, s);
            }
        }
        self.crossfader.restore(state.crossfade);
        self.crossfader.revalidate(&self.channels);
        for slot in state.ambient.into_iter().flatten() {
            if self.channels.is_playing(slot.channel) {
                self.ambient.set(slot);
            }
        }
        for entry in state.queue {
            let overflow = self
                .queue
                .push(QueueEntry {
                    clip: entry.clip,
                    priority: entry.priority,
                    repeat: entry.repeat,
                    cached: None,
                })
                .is_err();
            if overflow {
                tracing::warn!(
                    clip = entry.clip.0,
                    "saved queue exceeds the configured cap, entry dropped"
                );
            }
        }
        self.preload_queue_head();
        self.current_music = state.current_music;
        self.update_speech_ducking();
        self.update_ambient();
        self.update_directional();
        self.refresh_roster();
        Ok(())
    }

    fn restore_channel(&mut self, ch: usize, s: &SavedChannel) {
        let volume_override = self.type_volume_override(s.clip);
        let mut clip = match load_sound_clip(
            &self.catalog,
            s.clip,
            s.repeat,
            &self.backend,
            &self.cache,
            &self.config,
            volume_override,
        ) {
            Ok(clip) => clip,
            Err(e) => {
                tracing::warn!(channel = ch, clip = s.clip.0, error = %e, "saved clip failed to reload");
                return;
            }
        };
        clip.base_mut().priority = s.priority;
        if let Err(e) = clip.play() {
            tracing::warn!(channel = ch, clip = s.clip.0, error = %e, "saved clip failed to start");
            return;
        }
        self.channels.assign(ch, into_handle(clip));
        // playback restarted at zero, so seek explicitly to the saved
        // spot; streams cannot, and degrade to playing from the start
        if s.position > 0 {
            if let Some(Err(e)) = self.channels.with_clip(ch, |c| c.seek(s.position)) {
                tracing::debug!(channel = ch, error = %e, "saved position not restored");
            }
        }
        self.channels.with_clip(ch, |c| {
            c.set_panning(s.panning);
            c.base_mut().panning_percent = s.panning_percent;
            c.set_volume_direct(s.vol, s.vol_percent);
            let base = c.base_mut();
            base.original_vol_percent = s.vol_percent;
            base.x_source = s.x_source;
            base.y_source = s.y_source;
            base.max_distance = s.max_distance;
        });
        if ch == MUSIC_CHANNEL {
            self.current_music = Some(s.clip);
        }
    }

    // ---- helpers -------------------------------------------------------

    fn check_channel(&self, ch: usize) -> Result<()> {
        if ch >= TOTAL_CHANNELS {
            return Err(Error::InvalidParameter(format!(
                "channel {ch} out of range"
            )));
        }
        Ok(())
    }

    fn type_volume_override(&self, clip: ClipId) -> Option<i32> {
        let t = self.catalog.clip(clip)?.clip_type;
        self.type_volume_overrides.get(t.0 as usize).copied().flatten()
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
