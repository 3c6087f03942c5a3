// Copyright 2026 the Rhythmite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the tick loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! manager calls at each stage of a tick. All method bodies default to no-ops,
//! so implementing only the events you care about is fine.
//!
//! [`Tracer`] holds an optional `&mut dyn TraceSink`. With the `trace` feature
//! disabled every `Tracer` method is an empty body the optimizer erases; with
//! it enabled, each call costs one `Option` check before reaching the sink.
//!
//! [`TickSummaryBuilder`] is a convenience helper that collects per-tick
//! counts and produces a [`TickSummary`] at the end.
//!
//! # Crate features
//!
//! - `trace` — turns the `Tracer` methods into real dispatches.
//! - `trace-rich` (implies `trace`) — gates the whole-[`TickChanges`] sink
//!   method for consumers that want full per-tick change lists.

use crate::clock::{ClockId, ClockState, TickChanges};
use crate::time::TimePoint;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which interactive command resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Interactive begin.
    Begin,
    /// Pause.
    Pause,
    /// Resume from pause.
    Resume,
    /// Seek to an offset.
    Seek,
    /// Skip to the fill period.
    SkipToFill,
    /// Stop.
    Stop,
    /// Detach from the tree.
    Remove,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when the manager begins a tick.
#[derive(Clone, Copy, Debug)]
pub struct TickBeginEvent {
    /// Monotonic tick counter.
    pub index: u64,
    /// Host time supplied for this tick.
    pub now: TimePoint,
    /// Number of live clocks at the start of the tick.
    pub live_clocks: u32,
}

/// Emitted when a queued interactive command takes effect.
#[derive(Clone, Copy, Debug)]
pub struct CommandResolvedEvent {
    /// The clock the command targets.
    pub clock: ClockId,
    /// Which command resolved.
    pub kind: CommandKind,
}

/// Emitted when a clock's lifecycle state changes during recompute.
#[derive(Clone, Copy, Debug)]
pub struct StateChangeEvent {
    /// The clock whose state changed.
    pub clock: ClockId,
    /// The state the clock entered.
    pub state: ClockState,
}

/// Per-tick summary produced by [`TickSummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct TickSummary {
    /// Tick counter.
    pub index: u64,
    /// Host time of the tick.
    pub now: TimePoint,
    /// Number of live clocks at the start of the tick.
    pub live_clocks: u32,
    /// Queued commands that resolved this tick.
    pub commands_resolved: u32,
    /// Clocks whose state changed.
    pub states_changed: u32,
    /// Clocks whose current time changed.
    pub times_changed: u32,
    /// Clocks whose global speed changed.
    pub speeds_changed: u32,
    /// Clocks that completed their active period.
    pub completions: u32,
    /// Clocks detached at the end of the tick.
    pub removals: u32,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the tick loop.
///
/// Every method defaults to a no-op; override just the events a sink
/// cares about.
pub trait TraceSink {
    /// Called when the manager begins a tick.
    fn on_tick_begin(&mut self, e: &TickBeginEvent) {
        _ = e;
    }

    /// Called when a queued interactive command takes effect.
    fn on_command_resolved(&mut self, e: &CommandResolvedEvent) {
        _ = e;
    }

    /// Called for each clock whose state changed this tick.
    fn on_state_change(&mut self, e: &StateChangeEvent) {
        _ = e;
    }

    /// Called for each clock that completed this tick.
    fn on_completed(&mut self, clock: ClockId) {
        _ = clock;
    }

    /// Called with a per-tick summary after the tick committed.
    fn on_tick_summary(&mut self, s: &TickSummary) {
        _ = s;
    }

    /// Called with the full change lists for a tick (requires `trace-rich`
    /// feature).
    #[cfg(feature = "trace-rich")]
    fn on_tick_changes(&mut self, index: u64, changes: &TickChanges) {
        _ = (index, changes);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Dispatch handle over an optional [`TraceSink`].
///
/// With `trace` disabled the methods are empty and vanish at compile time;
/// with it enabled each one is a single `Option` check in front of the sink
/// call.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`TickBeginEvent`].
    #[inline]
    pub fn tick_begin(&mut self, e: &TickBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_tick_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CommandResolvedEvent`].
    #[inline]
    pub fn command_resolved(&mut self, e: &CommandResolvedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_command_resolved(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`StateChangeEvent`].
    #[inline]
    pub fn state_change(&mut self, e: &StateChangeEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_state_change(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a completion.
    #[inline]
    pub fn completed(&mut self, clock: ClockId) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_completed(clock);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = clock;
        }
    }

    /// Emits a [`TickSummary`].
    #[inline]
    pub fn tick_summary(&mut self, s: &TickSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_tick_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits the full change lists (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn tick_changes(&mut self, index: u64, changes: &TickChanges) {
        if let Some(s) = &mut self.sink {
            s.on_tick_changes(index, changes);
        }
    }
}

// ---------------------------------------------------------------------------
// TickSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects per-tick counts and produces a [`TickSummary`].
#[derive(Debug)]
pub struct TickSummaryBuilder {
    begin: TickBeginEvent,
    commands_resolved: u32,
    states_changed: u32,
    times_changed: u32,
    speeds_changed: u32,
    completions: u32,
    removals: u32,
}

impl TickSummaryBuilder {
    /// Starts building a summary for the given tick.
    #[must_use]
    pub fn new(begin: &TickBeginEvent) -> Self {
        Self {
            begin: *begin,
            commands_resolved: 0,
            states_changed: 0,
            times_changed: 0,
            speeds_changed: 0,
            completions: 0,
            removals: 0,
        }
    }

    /// Records how many queued commands resolved.
    pub fn set_commands_resolved(&mut self, count: u32) {
        self.commands_resolved = count;
    }

    /// Records counts from the tick's change lists.
    pub fn record_changes(&mut self, changes: &TickChanges) {
        self.states_changed = count(changes.states.len());
        self.times_changed = count(changes.times.len());
        self.speeds_changed = count(changes.speeds.len());
        self.completions = count(changes.completed.len());
        self.removals = count(changes.removed.len());
    }

    /// Consumes the builder and produces the final [`TickSummary`].
    #[must_use]
    pub fn finish(self) -> TickSummary {
        TickSummary {
            index: self.begin.index,
            now: self.begin.now,
            live_clocks: self.begin.live_clocks,
            commands_resolved: self.commands_resolved,
            states_changed: self.states_changed,
            times_changed: self.times_changed,
            speeds_changed: self.speeds_changed,
            completions: self.completions,
            removals: self.removals,
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "change list lengths capped at u32::MAX for the summary"
)]
fn count(n: usize) -> u32 {
    n.min(u32::MAX as usize) as u32
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
