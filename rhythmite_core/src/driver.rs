// Copyright 2026 the Rhythmite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host contract for pump loops.
//!
//! Rhythmite never reads a clock by itself. A host drives the engine, and
//! provides the following pieces:
//!
//! - **Time source** — Implements [`TimeSource`] over the platform's
//!   monotonic clock (an `Instant` baseline, a display-link timestamp, an
//!   audio clock), converted to engine units through [`Timebase`]. The
//!   engine only ever sees [`TimePoint`]s.
//!
//! - **Tick pump** — The loop or callback that feeds readings to
//!   [`TimeManager::tick`] and hands the returned [`TickChanges`] to
//!   whatever consumes them. This is host-specific and not abstracted by a
//!   trait because frame callbacks, timer queues, and test scripts differ
//!   fundamentally in shape.
//!
//! - **Pacing** — Decides when the next tick happens: every frame while
//!   [`needs_tick`] reports work, a timer armed at [`next_boundary`] while
//!   the tree is dormant with a scheduled begin or end ahead, fully parked
//!   otherwise. Pacing is an optimization only; a host that ticks every
//!   frame regardless is correct.
//!
//! # Crate boundaries
//!
//! `rhythmite_core` owns the timeline model, the clock tree, and this
//! contract module. Host crates depend on `rhythmite_core` and provide the
//! platform glue; application code depends on both and wires them together
//! in a pump loop.
//!
//! [`needs_tick`]: crate::manager::TimeManager::needs_tick
//! [`next_boundary`]: crate::manager::TimeManager::next_boundary
//! [`TickChanges`]: crate::clock::TickChanges
//! [`TimeManager::tick`]: crate::manager::TimeManager::tick
//! [`Timebase`]: crate::time::Timebase

use crate::time::TimePoint;

/// Supplies monotonic host time readings to a pump loop.
///
/// Both wall-clock hosts and scripted test sources implement this trait,
/// enabling generic pump loops and deterministic replays.
///
/// # Pump pseudocode
///
/// A typical frame callback wires the pieces together like this:
///
/// ```rust,ignore
/// fn on_frame(manager: &mut TimeManager, source: &mut impl TimeSource) {
///     let changes = manager.tick(source.now()).unwrap();
///
///     // Present: repaint anything whose clock moved this tick
///     for &(clock, time) in &changes.times {
///         repaint(clock, time);
///     }
///
///     // Pace: frames while content moves, a timer for a scheduled
///     // boundary, parked until the next command otherwise
///     if !manager.needs_tick() {
///         park_until_command();
///     } else if changes.times.is_empty() {
///         arm_wakeup(manager.next_boundary());
///     } else {
///         request_next_frame();
///     }
/// }
/// ```
pub trait TimeSource {
    /// Reads the current host time in engine units.
    ///
    /// Readings must be non-decreasing. [`TimeManager::tick`] clamps a
    /// regression to the previous tick, but it cannot invent the forward
    /// progress a stalled source withholds.
    ///
    /// [`TimeManager::tick`]: crate::manager::TimeManager::tick
    fn now(&mut self) -> TimePoint;
}
