//! Bounded FIFO of pending tracks.
//!
//! The head entry carries an eagerly loaded clip instance so playback
//! can start the moment a channel frees up, with no load latency at the
//! track boundary. The engine drains the queue from its per-frame
//! advance.

use crate::clip::SoundClip;
use crate::{Error, Result};
use foley_common::types::ClipId;
use std::collections::VecDeque;

pub struct QueueEntry {
    pub clip: ClipId,
    pub priority: i32,
    pub repeat: bool,
    /// Pre-loaded instance for the head entry.
    pub cached: Option<Box<dyn SoundClip>>,
}

pub struct PlayQueue {
    entries: VecDeque<QueueEntry>,
    capacity: usize,
}

impl PlayQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry; fails when the queue is at capacity.
    pub fn push(&mut self, entry: QueueEntry) -> Result<()> {
        if self.entries.len() >= self.capacity {
            return Err(Error::ResourceExhausted(format!(
                "play queue is full ({} entries)",
                self.capacity
            )));
        }
        tracing::debug!(clip = entry.clip.0, depth = self.entries.len(), "track queued");
        self.entries.push_back(entry);
        Ok(())
    }

    pub fn front(&self) -> Option<&QueueEntry> {
        self.entries.front()
    }

    pub fn get(&self, index: usize) -> Option<&QueueEntry> {
        self.entries.get(index)
    }

    pub fn front_mut(&mut self) -> Option<&mut QueueEntry> {
        self.entries.front_mut()
    }

    pub fn pop(&mut self) -> Option<QueueEntry> {
        self.entries.pop_front()
    }

    /// Put a just-popped entry back at the head.
    pub fn push_front(&mut self, entry: QueueEntry) {
        self.entries.push_front(entry);
    }

    /// Remove the entry at `index`, returning it.
    pub fn remove(&mut self, index: usize) -> Option<QueueEntry> {
        self.entries.remove(index)
    }

    /// Drop every entry for which `matches` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&QueueEntry) -> bool) {
        self.entries.retain(|e| keep(e));
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// True when the head entry still needs its instance loaded.
    pub fn head_needs_load(&self) -> bool {
        matches!(self.entries.front(), Some(e) if e.cached.is_none())
    }
}
