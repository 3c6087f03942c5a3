// Copyright 2026 the Rhythmite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`], printing one line per trace
//! event to a [`Write`](std::io::Write) destination (stderr by default), with
//! timestamps converted to microseconds through a [`Timebase`].

use std::io::Write;

use rhythmite_core::clock::{ClockId, ClockState, TickChanges};
use rhythmite_core::time::{TimePoint, Timebase};
use rhythmite_core::trace::{
    CommandKind, CommandResolvedEvent, StateChangeEvent, TickBeginEvent, TickSummary, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    timebase: Timebase,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("timebase", &self.timebase)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr(timebase: Timebase) -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
            timebase,
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }

    fn units_to_us(&self, units: i64) -> f64 {
        self.timebase.units_to_nanos(units) as f64 / 1000.0
    }

    fn point_us(&self, t: TimePoint) -> f64 {
        self.units_to_us(t.units())
    }
}

fn kind_name(kind: CommandKind) -> &'static str {
    match kind {
        CommandKind::Begin => "begin",
        CommandKind::Pause => "pause",
        CommandKind::Resume => "resume",
        CommandKind::Seek => "seek",
        CommandKind::SkipToFill => "skip-to-fill",
        CommandKind::Stop => "stop",
        CommandKind::Remove => "remove",
    }
}

fn state_name(state: ClockState) -> &'static str {
    match state {
        ClockState::Stopped => "stopped",
        ClockState::Active => "active",
        ClockState::Filling => "filling",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_tick_begin(&mut self, e: &TickBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[tick] index={} now={:.1}µs live={}",
            e.index,
            self.point_us(e.now),
            e.live_clocks,
        );
    }

    fn on_command_resolved(&mut self, e: &CommandResolvedEvent) {
        let _ = writeln!(
            self.writer,
            "[command] clock={}@{} {}",
            e.clock.index(),
            e.clock.generation(),
            kind_name(e.kind),
        );
    }

    fn on_state_change(&mut self, e: &StateChangeEvent) {
        let _ = writeln!(
            self.writer,
            "[state] clock={}@{} {}",
            e.clock.index(),
            e.clock.generation(),
            state_name(e.state),
        );
    }

    fn on_completed(&mut self, clock: ClockId) {
        let _ = writeln!(
            self.writer,
            "[completed] clock={}@{}",
            clock.index(),
            clock.generation(),
        );
    }

    fn on_tick_summary(&mut self, s: &TickSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] index={} commands={} states={} times={} speeds={} \
             completed={} removed={}",
            s.index,
            s.commands_resolved,
            s.states_changed,
            s.times_changed,
            s.speeds_changed,
            s.completions,
            s.removals,
        );
    }

    fn on_tick_changes(&mut self, index: u64, changes: &TickChanges) {
        let _ = writeln!(
            self.writer,
            "[changes] index={index} added={} requested={} topology={}",
            changes.added.len(),
            changes.remove_requested.len(),
            changes.topology_changed,
        );
    }
}
