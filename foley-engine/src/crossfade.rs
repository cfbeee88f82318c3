//! Crossfade state machine.
//!
//! At most one crossfade runs at a time. The outgoing track is moved
//! onto the dedicated crossfade channel and fades from its starting
//! volume down to zero; the incoming track fades up on its regular
//! channel toward its target. Volumes are computed from the shared step
//! counter in the external percent domain, so a fade from 100 at rate
//! 20 passes through 100, 80, 60, 40, 20 and destroys the outgoing
//! clip on the fifth tick.

use crate::channels::ChannelTable;
use crate::{Error, Result};

/// Current shape of the crossfade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeState {
    Idle,
    FadingOut,
    FadingIn(usize),
    Both,
}

/// Serializable copy of the crossfade fields, in save-block order.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossfadeSnapshot {
    pub in_channel: Option<usize>,
    pub out_channel: Option<usize>,
    pub step: i32,
    pub in_rate: i32,
    pub out_rate: i32,
    pub in_target: i32,
    pub out_initial: i32,
}

#[derive(Debug, Default)]
pub struct Crossfader {
    in_channel: Option<usize>,
    out_channel: Option<usize>,
    step: i32,
    /// Percent gained per step by the incoming track.
    in_rate: i32,
    /// Percent lost per step by the outgoing track.
    out_rate: i32,
    /// Percent the incoming track settles at.
    in_target: i32,
    /// Percent the outgoing track started from.
    out_initial: i32,
}

impl Crossfader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FadeState {
        match (self.in_channel, self.out_channel) {
            (None, None) => FadeState::Idle,
            (None, Some(_)) => FadeState::FadingOut,
            (Some(ch), None) => FadeState::FadingIn(ch),
            (Some(_), Some(_)) => FadeState::Both,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state() == FadeState::Idle
    }

    pub fn in_channel(&self) -> Option<usize> {
        self.in_channel
    }

    pub fn out_channel(&self) -> Option<usize> {
        self.out_channel
    }

    /// Begin fading out `channel` from `initial_percent`, restarting
    /// the step counter.
    pub fn begin_fade_out(&mut self, channel: usize, initial_percent: i32, rate: i32) {
        tracing::debug!(channel, initial_percent, rate, "crossfade out begins");
        self.out_channel = Some(channel);
        self.out_initial = initial_percent;
        self.out_rate = rate.max(1);
        self.step = 0;
    }

    /// Begin fading `channel` in toward `target_percent`. Keeps the
    /// running step counter when paired with an in-progress fade-out.
    pub fn begin_fade_in(&mut self, channel: usize, rate: i32, target_percent: i32) {
        tracing::debug!(channel, target_percent, rate, "crossfade in begins");
        self.in_channel = Some(channel);
        self.in_rate = rate.max(1);
        self.in_target = target_percent;
        if self.out_channel.is_none() {
            self.step = 0;
        }
    }

    /// Forget any role referencing `channel`; called whenever a channel
    /// is stopped out from under the fade.
    pub fn note_channel_stopped(&mut self, channel: usize) {
        if self.in_channel == Some(channel) {
            self.in_channel = None;
        }
        if self.out_channel == Some(channel) {
            self.out_channel = None;
        }
        if self.is_idle() {
            self.step = 0;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Advance the fade one step, adjusting channel volumes and
    /// destroying the outgoing clip once it reaches silence.
    pub fn tick(&mut self, channels: &mut ChannelTable) -> Result<()> {
        if self.is_idle() {
            return Ok(());
        }
        self.step += 1;

        if let Some(out) = self.out_channel {
            let volume = self.out_initial - self.step * self.out_rate;
            if volume > 0 {
                channels
                    .with_clip(out, |clip| clip.set_volume_percent(volume))
                    .ok_or_else(|| {
                        Error::Internal(format!("crossfade out channel {out} has no clip"))
                    })?;
            } else {
                tracing::debug!(channel = out, "crossfade out complete");
                channels.clear(out);
                self.out_channel = None;
            }
        }

        if let Some(inn) = self.in_channel {
            let volume = (self.step * self.in_rate).min(self.in_target);
            channels
                .with_clip(inn, |clip| clip.set_volume_percent(volume))
                .ok_or_else(|| {
                    Error::Internal(format!("crossfade in channel {inn} has no clip"))
                })?;
            if volume >= self.in_target {
                tracing::debug!(channel = inn, "crossfade in complete");
                self.in_channel = None;
            }
        }

        if self.is_idle() {
            self.step = 0;
        }
        Ok(())
    }

    /// Collapse a fade in progress: the outgoing clip is destroyed
    /// outright and the incoming one snaps to its target volume. Used
    /// when crossfading is disabled mid-transition.
    pub fn collapse(&mut self, channels: &mut ChannelTable) {
        if let Some(out) = self.out_channel.take() {
            channels.clear(out);
        }
        if let Some(inn) = self.in_channel.take() {
            let target = self.in_target;
            channels.with_clip(inn, |clip| clip.set_volume_percent(target));
        }
        self.reset();
    }

    pub fn snapshot(&self) -> CrossfadeSnapshot {
        CrossfadeSnapshot {
            in_channel: self.in_channel,
            out_channel: self.out_channel,
            step: self.step,
            in_rate: self.in_rate,
            out_rate: self.out_rate,
            in_target: self.in_target,
            out_initial: self.out_initial,
        }
    }

    pub fn restore(&mut self, snapshot: CrossfadeSnapshot) {
        self.in_channel = snapshot.in_channel;
        self.out_channel = snapshot.out_channel;
        self.step = snapshot.step;
        self.in_rate = snapshot.in_rate.max(1);
        self.out_rate = snapshot.out_rate.max(1);
        self.in_target = snapshot.in_target;
        self.out_initial = snapshot.out_initial;
    }

    /// Drop any role whose channel no longer holds a live clip. Called
    /// after restore, once all channels are reconstructed.
    pub fn revalidate(&mut self, channels: &ChannelTable) {
        if let Some(inn) = self.in_channel {
            if !channels.is_playing(inn) {
                self.in_channel = None;
            }
        }
        if let Some(out) = self.out_channel {
            if !channels.is_playing(out) {
                self.out_channel = None;
            }
        }
        if self.is_idle() {
            self.step = 0;
        }
    }
}
