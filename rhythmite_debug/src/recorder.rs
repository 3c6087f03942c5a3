// Copyright 2026 the Rhythmite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`], encoding each event as a tagged
//! fixed-size little-endian record appended to a `Vec<u8>`. [`decode`] walks
//! the bytes back out as an iterator of [`RecordedEvent`].
//!
//! The rich event ([`on_tick_changes`](TraceSink::on_tick_changes)) stores
//! only the structural counts the per-tick summary does not already carry;
//! per-clock change lists are not encoded.

use rhythmite_core::clock::{ClockId, ClockState, TickChanges};
use rhythmite_core::time::TimePoint;
use rhythmite_core::trace::{
    CommandKind, CommandResolvedEvent, StateChangeEvent, TickBeginEvent, TickSummary, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_TICK_BEGIN: u8 = 1;
const TAG_COMMAND_RESOLVED: u8 = 2;
const TAG_STATE_CHANGE: u8 = 3;
const TAG_COMPLETED: u8 = 4;
const TAG_TICK_SUMMARY: u8 = 5;
const TAG_TICK_CHANGES: u8 = 6;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_clock(&mut self, id: ClockId) {
        self.write_u32(id.index());
        self.write_u32(id.generation());
    }

    fn write_state(&mut self, s: ClockState) {
        self.write_u8(match s {
            ClockState::Stopped => 0,
            ClockState::Active => 1,
            ClockState::Filling => 2,
        });
    }

    fn write_kind(&mut self, k: CommandKind) {
        self.write_u8(match k {
            CommandKind::Begin => 0,
            CommandKind::Pause => 1,
            CommandKind::Resume => 2,
            CommandKind::Seek => 3,
            CommandKind::SkipToFill => 4,
            CommandKind::Stop => 5,
            CommandKind::Remove => 6,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_tick_begin(&mut self, e: &TickBeginEvent) {
        self.write_u8(TAG_TICK_BEGIN);
        self.write_u64(e.index);
        self.write_i64(e.now.units());
        self.write_u32(e.live_clocks);
    }

    fn on_command_resolved(&mut self, e: &CommandResolvedEvent) {
        self.write_u8(TAG_COMMAND_RESOLVED);
        self.write_clock(e.clock);
        self.write_kind(e.kind);
    }

    fn on_state_change(&mut self, e: &StateChangeEvent) {
        self.write_u8(TAG_STATE_CHANGE);
        self.write_clock(e.clock);
        self.write_state(e.state);
    }

    fn on_completed(&mut self, clock: ClockId) {
        self.write_u8(TAG_COMPLETED);
        self.write_clock(clock);
    }

    fn on_tick_summary(&mut self, s: &TickSummary) {
        self.write_u8(TAG_TICK_SUMMARY);
        self.write_u64(s.index);
        self.write_i64(s.now.units());
        self.write_u32(s.live_clocks);
        self.write_u32(s.commands_resolved);
        self.write_u32(s.states_changed);
        self.write_u32(s.times_changed);
        self.write_u32(s.speeds_changed);
        self.write_u32(s.completions);
        self.write_u32(s.removals);
    }

    fn on_tick_changes(&mut self, index: u64, changes: &TickChanges) {
        self.write_u8(TAG_TICK_CHANGES);
        self.write_u64(index);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "added count capped at u32::MAX for recording"
        )]
        self.write_u32(changes.added.len().min(u32::MAX as usize) as u32);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "removal request count capped at u32::MAX for recording"
        )]
        self.write_u32(changes.remove_requested.len().min(u32::MAX as usize) as u32);
        self.write_u8(u8::from(changes.topology_changed));
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A clock handle flattened to its raw slot index and generation.
///
/// Recordings outlive the tree that produced them, so decoded events carry
/// the raw fields of the original [`ClockId`] rather than a live handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordedClock {
    /// Slot index of the recorded handle.
    pub index: u32,
    /// Slot generation of the recorded handle.
    pub generation: u32,
}

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`TickBeginEvent`].
    TickBegin(TickBeginEvent),
    /// A resolved interactive command.
    CommandResolved {
        /// The clock the command targeted.
        clock: RecordedClock,
        /// Which command resolved.
        kind: CommandKind,
    },
    /// A clock lifecycle state change.
    StateChange {
        /// The clock whose state changed.
        clock: RecordedClock,
        /// The state the clock entered.
        state: ClockState,
    },
    /// A completed active period.
    Completed {
        /// The clock that completed.
        clock: RecordedClock,
    },
    /// A [`TickSummary`].
    TickSummary(TickSummary),
    /// Structural change counts for a tick.
    TickChanges {
        /// Tick counter.
        index: u64,
        /// Number of clocks added since the last tick.
        added: u32,
        /// Number of removal roots that resolved this tick.
        remove_requested: u32,
        /// Whether the tree topology changed.
        topology_changed: bool,
    },
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = u64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_i64(&mut self) -> Option<i64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = i64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_clock(&mut self) -> Option<RecordedClock> {
        Some(RecordedClock {
            index: self.read_u32()?,
            generation: self.read_u32()?,
        })
    }

    fn read_state(&mut self) -> Option<ClockState> {
        Some(match self.read_u8()? {
            0 => ClockState::Stopped,
            1 => ClockState::Active,
            _ => ClockState::Filling,
        })
    }

    fn read_kind(&mut self) -> Option<CommandKind> {
        Some(match self.read_u8()? {
            0 => CommandKind::Begin,
            1 => CommandKind::Pause,
            2 => CommandKind::Resume,
            3 => CommandKind::Seek,
            4 => CommandKind::SkipToFill,
            5 => CommandKind::Stop,
            _ => CommandKind::Remove,
        })
    }

    fn decode_tick_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::TickBegin(TickBeginEvent {
            index: self.read_u64()?,
            now: TimePoint(self.read_i64()?),
            live_clocks: self.read_u32()?,
        }))
    }

    fn decode_command_resolved(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::CommandResolved {
            clock: self.read_clock()?,
            kind: self.read_kind()?,
        })
    }

    fn decode_state_change(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::StateChange {
            clock: self.read_clock()?,
            state: self.read_state()?,
        })
    }

    fn decode_completed(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Completed {
            clock: self.read_clock()?,
        })
    }

    fn decode_tick_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::TickSummary(TickSummary {
            index: self.read_u64()?,
            now: TimePoint(self.read_i64()?),
            live_clocks: self.read_u32()?,
            commands_resolved: self.read_u32()?,
            states_changed: self.read_u32()?,
            times_changed: self.read_u32()?,
            speeds_changed: self.read_u32()?,
            completions: self.read_u32()?,
            removals: self.read_u32()?,
        }))
    }

    fn decode_tick_changes(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::TickChanges {
            index: self.read_u64()?,
            added: self.read_u32()?,
            remove_requested: self.read_u32()?,
            topology_changed: self.read_u8()? != 0,
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_TICK_BEGIN => self.decode_tick_begin(),
            TAG_COMMAND_RESOLVED => self.decode_command_resolved(),
            TAG_STATE_CHANGE => self.decode_state_change(),
            TAG_COMPLETED => self.decode_completed(),
            TAG_TICK_SUMMARY => self.decode_tick_summary(),
            TAG_TICK_CHANGES => self.decode_tick_changes(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_begin() -> TickBeginEvent {
        TickBeginEvent {
            index: 7,
            now: TimePoint(1_000_000),
            live_clocks: 3,
        }
    }

    fn sample_summary() -> TickSummary {
        TickSummary {
            index: 7,
            now: TimePoint(1_000_000),
            live_clocks: 3,
            commands_resolved: 2,
            states_changed: 1,
            times_changed: 4,
            speeds_changed: 1,
            completions: 1,
            removals: 0,
        }
    }

    #[test]
    fn round_trip_tick_begin() {
        let mut rec = RecorderSink::new();
        let orig = sample_begin();
        rec.on_tick_begin(&orig);

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RecordedEvent::TickBegin(e) => {
                assert_eq!(e.index, orig.index);
                assert_eq!(e.now, orig.now);
                assert_eq!(e.live_clocks, orig.live_clocks);
            }
            other => panic!("expected TickBegin, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_tick_summary() {
        let mut rec = RecorderSink::new();
        let orig = sample_summary();
        rec.on_tick_summary(&orig);

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RecordedEvent::TickSummary(s) => {
                assert_eq!(s.index, orig.index);
                assert_eq!(s.now, orig.now);
                assert_eq!(s.live_clocks, orig.live_clocks);
                assert_eq!(s.commands_resolved, orig.commands_resolved);
                assert_eq!(s.states_changed, orig.states_changed);
                assert_eq!(s.times_changed, orig.times_changed);
                assert_eq!(s.speeds_changed, orig.speeds_changed);
                assert_eq!(s.completions, orig.completions);
                assert_eq!(s.removals, orig.removals);
            }
            other => panic!("expected TickSummary, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_negative_time() {
        // Units are signed; a recording made left of the origin survives.
        let mut rec = RecorderSink::new();
        rec.on_tick_begin(&TickBeginEvent {
            index: 0,
            now: TimePoint(-500),
            live_clocks: 0,
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RecordedEvent::TickBegin(e) => assert_eq!(e.now, TimePoint(-500)),
            other => panic!("expected TickBegin, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_multiple_events() {
        let mut rec = RecorderSink::new();
        rec.on_tick_begin(&sample_begin());
        rec.on_tick_summary(&sample_summary());

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], RecordedEvent::TickBegin(_)));
        assert!(matches!(events[1], RecordedEvent::TickSummary(_)));
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        let events: Vec<_> = decode(&[]).collect();
        assert!(events.is_empty());
    }

    #[test]
    fn truncated_record_is_dropped() {
        let mut rec = RecorderSink::new();
        rec.on_tick_begin(&sample_begin());
        let bytes = rec.as_bytes();

        let events: Vec<_> = decode(&bytes[..bytes.len() - 1]).collect();
        assert!(events.is_empty());
    }

    #[test]
    fn records_a_live_tick() {
        use rhythmite_core::manager::TimeManager;
        use rhythmite_core::time::TimeSpan;
        use rhythmite_core::timeline::{Duration, Timeline};
        use rhythmite_core::trace::Tracer;

        let mut manager = TimeManager::new();
        let fade = Timeline {
            duration: Duration::Timed(TimeSpan(100)),
            ..Timeline::new()
        };
        let clock = manager.create_clock(&fade, true).unwrap();
        manager.controller(clock).pause().unwrap();

        let mut rec = RecorderSink::new();
        let mut changes = TickChanges::default();
        manager
            .tick_traced(TimePoint(0), &mut changes, &mut Tracer::new(&mut rec))
            .unwrap();

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 5, "begin, command, state, changes, summary");

        match &events[0] {
            RecordedEvent::TickBegin(e) => {
                assert_eq!(e.index, 0);
                assert_eq!(e.live_clocks, 1);
            }
            other => panic!("expected TickBegin, got {other:?}"),
        }
        match &events[1] {
            RecordedEvent::CommandResolved { clock, kind } => {
                assert_eq!(*kind, CommandKind::Pause);
                assert_eq!(clock.index, 0);
                assert_eq!(clock.generation, 0);
            }
            other => panic!("expected CommandResolved, got {other:?}"),
        }
        match &events[2] {
            RecordedEvent::StateChange { state, .. } => {
                assert_eq!(*state, ClockState::Active);
            }
            other => panic!("expected StateChange, got {other:?}"),
        }
        match &events[3] {
            RecordedEvent::TickChanges {
                added,
                remove_requested,
                topology_changed,
                ..
            } => {
                assert_eq!(*added, 1);
                assert_eq!(*remove_requested, 0);
                assert!(*topology_changed, "first tick rebuilds the traversal");
            }
            other => panic!("expected TickChanges, got {other:?}"),
        }
        match &events[4] {
            RecordedEvent::TickSummary(s) => {
                assert_eq!(s.commands_resolved, 1);
                assert_eq!(s.states_changed, 1);
                assert_eq!(s.completions, 0);
            }
            other => panic!("expected TickSummary, got {other:?}"),
        }
    }
}
