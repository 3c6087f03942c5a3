// Copyright 2026 the Rhythmite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interactive clock control.
//!
//! A [`ClockController`] is a borrowing handle over one clock, obtained from
//! [`TimeManager::controller`](crate::manager::TimeManager::controller). It carries no
//! state of its own: every operation enqueues a [`Command`] on the target
//! clock and returns; the command resolves at the next tick. The one
//! exception is [`seek_aligned_to_last_tick`], which resolves synchronously
//! against the last tick's time.
//!
//! # Queue policy
//!
//! Commands resolve in issue order, with three refinements:
//!
//! - A later command of the same kind replaces the earlier one in place (two
//!   queued seeks resolve as one seek, at the first seek's position in the
//!   order).
//! - Everything issued after a queued `Remove` is dropped.
//! - When both `Begin` and another command survive to the same tick, the
//!   begin applies first whatever the issue order, so the other command
//!   operates on the freshly begun clock.
//!
//! Commands addressed to a clock that has already been removed are silent
//! no-ops — removal is asynchronous, and a handle that was valid when issued
//! stays safe to use. A handle whose slot has been *recycled* by later
//! instantiations panics instead; that is a stale-handle bug at the call
//! site.
//!
//! [`seek_aligned_to_last_tick`]: ClockController::seek_aligned_to_last_tick

use crate::clock::ClockId;
use crate::manager::{AccessError, ControlError, TimeManager};
use crate::time::TimeSpan;
use crate::trace::CommandKind;

/// Where a seek target is measured from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekOrigin {
    /// Offset from the start of the active period.
    BeginTime,
    /// Offset from the end of one iteration (the resolved natural duration);
    /// usually negative. Unresolvable on a `Forever` duration, in which case
    /// the seek is ignored.
    Duration,
}

/// A queued interactive operation on one clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Command {
    Begin,
    Pause,
    Resume,
    Seek { offset: TimeSpan, origin: SeekOrigin },
    SkipToFill,
    Stop,
    Remove,
}

impl Command {
    pub(crate) fn kind(self) -> CommandKind {
        match self {
            Self::Begin => CommandKind::Begin,
            Self::Pause => CommandKind::Pause,
            Self::Resume => CommandKind::Resume,
            Self::Seek { .. } => CommandKind::Seek,
            Self::SkipToFill => CommandKind::SkipToFill,
            Self::Stop => CommandKind::Stop,
            Self::Remove => CommandKind::Remove,
        }
    }
}

/// A borrowing handle for interactive control of one clock.
///
/// See the [module docs](self) for the command queue policy.
#[derive(Debug)]
pub struct ClockController<'a> {
    manager: &'a mut TimeManager,
    id: ClockId,
}

impl<'a> ClockController<'a> {
    pub(crate) fn new(manager: &'a mut TimeManager, id: ClockId) -> Self {
        Self { manager, id }
    }

    /// The clock this controller addresses.
    #[must_use]
    pub fn clock(&self) -> ClockId {
        self.id
    }

    /// Restarts the clock: local time zero at the next tick.
    ///
    /// Cancels a scheduled natural begin. A direct pause survives — the clock
    /// begins held at zero until resumed.
    pub fn begin(&mut self) -> Result<(), AccessError> {
        self.command(Command::Begin)
    }

    /// Freezes the clock's local time from the next tick on.
    ///
    /// Children freeze with it, because their axis stops advancing; their own
    /// pause flags are untouched.
    pub fn pause(&mut self) -> Result<(), AccessError> {
        self.command(Command::Pause)
    }

    /// Clears a direct pause; local time continues from the held value.
    pub fn resume(&mut self) -> Result<(), AccessError> {
        self.command(Command::Resume)
    }

    /// Moves local time to `offset` from `origin` at the next tick.
    ///
    /// A seek may cross state boundaries in either direction: past the end of
    /// the active period it completes and fills (or stops) without any
    /// intermediate ticks; back into the window it revives a finished clock.
    /// Pause holds the clock at the seeked position without blocking the
    /// seek.
    pub fn seek(&mut self, offset: TimeSpan, origin: SeekOrigin) -> Result<(), AccessError> {
        self.command(Command::Seek { offset, origin })
    }

    /// Like [`seek`](Self::seek), but resolved immediately against the last
    /// tick's time instead of being queued.
    ///
    /// Observable values across the subtree are recomputed before this
    /// returns, and any resulting events fire synchronously. Queued commands
    /// are not resolved early. Before the first tick, the seek stages the
    /// clock's position; values materialize at the first tick.
    pub fn seek_aligned_to_last_tick(
        &mut self,
        offset: TimeSpan,
        origin: SeekOrigin,
    ) -> Result<(), AccessError> {
        self.manager.seek_aligned(self.id, offset, origin)
    }

    /// Forces the end of the active period at the next tick.
    ///
    /// Takes effect even from never-begun: the clock goes straight to its
    /// fill behavior with the resolved end values, never observably passing
    /// through `Active`. Ignored on a clock with no end (`Forever` duration
    /// or endless repeat). Idempotent.
    pub fn skip_to_fill(&mut self) -> Result<(), AccessError> {
        self.command(Command::SkipToFill)
    }

    /// Stops the clock at the next tick.
    ///
    /// Not a completion: no `Completed` event fires. The clock stays stopped
    /// until an interactive [`begin`](Self::begin); the originally scheduled
    /// begin does not re-arm.
    pub fn stop(&mut self) -> Result<(), AccessError> {
        self.command(Command::Stop)
    }

    /// Detaches the clock and its whole subtree at the next tick.
    ///
    /// `RemoveRequested` fires once at resolution; after that the subtree's
    /// slots are reclaimed and its handles report as removed. Removal is the
    /// only way a clock leaves the tree.
    pub fn remove(&mut self) -> Result<(), AccessError> {
        self.command(Command::Remove)
    }

    /// Sets the interactive speed ratio, applied at the next tick to
    /// subsequent advancement only.
    ///
    /// The ratio multiplies the configured one and must be finite and
    /// positive. Already-elapsed local time is never rescaled.
    pub fn set_speed_ratio(&mut self, ratio: f64) -> Result<(), ControlError> {
        self.manager.stage_speed_ratio(self.id, ratio)
    }

    fn command(&mut self, command: Command) -> Result<(), AccessError> {
        self.manager.enqueue(self.id, command)
    }
}
