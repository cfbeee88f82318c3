//! Channel admission: pick a channel for a new clip or deny it.
//!
//! A clip may only use the channels its type is eligible for. A free
//! channel in that range wins immediately; otherwise an occupant of the
//! same type may be evicted, but only one that loses to the request:
//! higher priority numbers are more important, and unless the request
//! may interrupt equal priorities its effective priority is lowered by
//! one first, so equal-priority occupants survive. Among evictable
//! occupants the one closest to the requester's priority goes, keeping
//! the least important background sounds running.

use crate::channels::ChannelTable;
use foley_common::types::AudioType;
use std::ops::Range;

/// What the allocator decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Channel is idle; play there.
    Free(usize),
    /// Channel holds a same-type clip that loses to the request; stop
    /// it and play there.
    Evict(usize),
    /// Every eligible channel holds something that outranks the
    /// request.
    Denied,
}

/// Snapshot of one channel for the selection scan.
#[derive(Debug, Clone, Copy)]
pub struct Occupant {
    pub live: bool,
    pub finished: bool,
    pub priority: i32,
    pub clip_type: Option<AudioType>,
}

impl Occupant {
    pub fn idle() -> Self {
        Self {
            live: false,
            finished: true,
            priority: 0,
            clip_type: None,
        }
    }
}

/// Snapshot the channel table for a selection scan.
pub fn snapshot_occupants(channels: &ChannelTable) -> Vec<Occupant> {
    (0..channels.len())
        .map(|i| match channels.get(i) {
            Some(handle) => {
                let clip = handle.lock();
                let base = clip.base();
                Occupant {
                    live: true,
                    finished: clip.is_done(),
                    priority: base.priority,
                    clip_type: base.clip_type,
                }
            }
            None => Occupant::idle(),
        })
        .collect()
}

/// Choose a channel in `range` for a clip of `clip_type` at
/// `priority`.
pub fn select_channel(
    range: Range<usize>,
    occupants: &[Occupant],
    clip_type: AudioType,
    priority: i32,
    interrupt_equal: bool,
) -> Selection {
    let effective = if interrupt_equal {
        priority
    } else {
        priority - 1
    };

    let mut victim: Option<(usize, i32)> = None;
    for index in range {
        let occ = match occupants.get(index) {
            Some(occ) => *occ,
            None => continue,
        };
        if !occ.live || occ.finished {
            return Selection::Free(index);
        }
        if occ.clip_type != Some(clip_type) || occ.priority > effective {
            continue;
        }
        // strict comparison keeps the first-scanned channel on ties
        match victim {
            Some((_, best)) if occ.priority <= best => {}
            _ => victim = Some((index, occ.priority)),
        }
    }

    match victim {
        Some((index, _)) => Selection::Evict(index),
        None => Selection::Denied,
    }
}
