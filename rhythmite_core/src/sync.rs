// Copyright 2026 the Rhythmite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! External playback sources that clocks synchronize against.
//!
//! Some leaves represent playback the engine does not control: a media
//! pipeline buffers, seeks coarsely, and drifts against wall time. A
//! [`SlipSource`] is the engine's view of such a backend. Binding one to a
//! sync-capable leaf (see
//! [`TimeManager::bind_slip_source`](crate::manager::TimeManager::bind_slip_source))
//! changes how that leaf — and, through the container's
//! [`SlipBehavior`](crate::timeline::SlipBehavior), its whole subtree — derives time:
//! the leaf reports the source's position instead of clock arithmetic, and a
//! slipping container shifts every sibling window to stay in lock-step with
//! it.
//!
//! The engine samples a source at most once per tick, however many clocks in
//! the tree consult it; all of them see the same sampled value. A source is
//! free to report positions that move backward (a pipeline stall or coarse
//! seek); reported positions are clamped to `[0, duration]` before use.

use crate::time::{TimePoint, TimeSpan};

/// An external source of playback position, such as a media pipeline.
///
/// Implementations are owned by the engine once bound and are queried during
/// ticks on the manager's thread.
pub trait SlipSource: core::fmt::Debug {
    /// The source's natural duration, if known.
    ///
    /// A bound leaf with `Automatic` duration resolves to this value; an
    /// unknown duration (`None`, a live stream) resolves the leaf as
    /// unbounded.
    fn duration(&self) -> Option<TimeSpan>;

    /// The source's current playback position at `now`.
    ///
    /// Called at most once per tick. Values outside `[0, duration]` are
    /// clamped by the caller.
    fn position(&mut self, now: TimePoint) -> TimeSpan;
}
