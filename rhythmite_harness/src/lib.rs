// Copyright 2026 the Rhythmite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deterministic replay harness for rhythmite clock trees.
//!
//! Scenario tests and demos drive a [`TimeManager`] with scripted time
//! instead of a wall clock: [`ScriptedSource`] replays a fixed tick
//! schedule, [`ScriptedSlip`] stands in for an external media pipeline, and
//! [`EventLog`] captures observer callbacks for order-sensitive assertions.
//! [`pump`] runs a manager through a whole script and summarizes the run.
//!
//! [`TimeManager`]: rhythmite_core::manager::TimeManager

#![no_std]

extern crate alloc;

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use rhythmite_core::clock::{ClockId, ClockState, TickChanges};
use rhythmite_core::driver::TimeSource;
use rhythmite_core::events::ClockObserver;
use rhythmite_core::manager::{AccessError, TimeManager};
use rhythmite_core::sync::SlipSource;
use rhythmite_core::time::{TimePoint, TimeSpan};

/// Scripted monotonic time readings for deterministic replays.
///
/// Feeds a fixed sequence of [`TimePoint`]s to a pump loop. Once the script
/// is exhausted the source holds its final reading, like a stalled host
/// clock; an empty script reads the axis origin forever.
#[derive(Clone, Debug)]
pub struct ScriptedSource {
    readings: Vec<TimePoint>,
    cursor: usize,
}

impl ScriptedSource {
    /// A source that reads the given unit values in order.
    #[must_use]
    pub fn from_units(units: &[i64]) -> Self {
        Self {
            readings: units.iter().copied().map(TimePoint).collect(),
            cursor: 0,
        }
    }

    /// A source stepping from `start` in `count` uniform `step` increments.
    #[must_use]
    pub fn stepped(start: i64, step: i64, count: usize) -> Self {
        let mut readings = Vec::with_capacity(count);
        let mut at = start;
        for _ in 0..count {
            readings.push(TimePoint(at));
            at += step;
        }
        Self {
            readings,
            cursor: 0,
        }
    }

    /// Whether every scripted reading has been consumed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.readings.len()
    }

    /// How many scripted readings remain.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.readings.len().saturating_sub(self.cursor)
    }
}

impl TimeSource for ScriptedSource {
    fn now(&mut self) -> TimePoint {
        let Some(&reading) = self.readings.get(self.cursor) else {
            return self.readings.last().copied().unwrap_or(TimePoint::ZERO);
        };
        self.cursor += 1;
        reading
    }
}

/// Shared sample counter handle for a [`ScriptedSlip`] that has been moved
/// into the engine.
#[derive(Clone, Debug, Default)]
pub struct SampleCount(Rc<Cell<u64>>);

impl SampleCount {
    /// How many times the engine has sampled the source so far.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

/// Scripted playback positions for a sync-capable leaf.
///
/// Each engine sample consumes one scripted position; once exhausted the
/// source holds its final position, like a pipeline paused at end of stream.
#[derive(Debug)]
pub struct ScriptedSlip {
    duration: Option<TimeSpan>,
    positions: Vec<TimeSpan>,
    cursor: usize,
    samples: Rc<Cell<u64>>,
}

impl ScriptedSlip {
    /// A source with the given natural duration (`None` for unbounded)
    /// reporting the given positions in order.
    ///
    /// Returns the boxed source and a counter tracking how often the engine
    /// samples it.
    #[must_use]
    pub fn new(duration_units: Option<i64>, position_units: &[i64]) -> (Box<Self>, SampleCount) {
        let samples = Rc::new(Cell::new(0));
        let slip = Box::new(Self {
            duration: duration_units.map(TimeSpan),
            positions: position_units.iter().copied().map(TimeSpan).collect(),
            cursor: 0,
            samples: Rc::clone(&samples),
        });
        (slip, SampleCount(samples))
    }
}

impl SlipSource for ScriptedSlip {
    fn duration(&self) -> Option<TimeSpan> {
        self.duration
    }

    fn position(&mut self, _now: TimePoint) -> TimeSpan {
        self.samples.set(self.samples.get() + 1);
        let Some(&position) = self.positions.get(self.cursor) else {
            return self.positions.last().copied().unwrap_or(TimeSpan::ZERO);
        };
        self.cursor += 1;
        position
    }
}

/// One observer callback, as captured by a [`RecordingObserver`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ObservedEvent {
    /// `on_state_invalidated`.
    State(ClockId, ClockState),
    /// `on_time_invalidated`.
    Time(ClockId, Option<TimeSpan>),
    /// `on_speed_invalidated`.
    Speed(ClockId, f64),
    /// `on_completed`.
    Completed(ClockId),
    /// `on_remove_requested`.
    RemoveRequested(ClockId),
}

/// Shared, clonable capture of observer callbacks.
///
/// Hand [`observer`](Self::observer) results to
/// [`TimeManager::subscribe`](rhythmite_core::manager::TimeManager::subscribe)
/// — one log can back any number of subscriptions, and events arrive in
/// exactly the order the engine fired them.
#[derive(Clone, Debug, Default)]
pub struct EventLog(Rc<RefCell<Vec<ObservedEvent>>>);

impl EventLog {
    /// An empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A boxed observer that appends every callback to this log.
    #[must_use]
    pub fn observer(&self) -> Box<RecordingObserver> {
        Box::new(RecordingObserver {
            log: Rc::clone(&self.0),
        })
    }

    /// Drains and returns everything captured so far.
    pub fn take(&self) -> Vec<ObservedEvent> {
        core::mem::take(&mut *self.0.borrow_mut())
    }

    /// Copies out everything captured so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ObservedEvent> {
        self.0.borrow().clone()
    }

    /// Discards everything captured so far.
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    /// How many events are captured.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Whether nothing is captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

/// A [`ClockObserver`] that forwards every callback into an [`EventLog`].
#[derive(Debug)]
pub struct RecordingObserver {
    log: Rc<RefCell<Vec<ObservedEvent>>>,
}

impl ClockObserver for RecordingObserver {
    fn on_state_invalidated(&mut self, clock: ClockId, state: ClockState) {
        self.log.borrow_mut().push(ObservedEvent::State(clock, state));
    }

    fn on_time_invalidated(&mut self, clock: ClockId, time: Option<TimeSpan>) {
        self.log.borrow_mut().push(ObservedEvent::Time(clock, time));
    }

    fn on_speed_invalidated(&mut self, clock: ClockId, speed: f64) {
        self.log.borrow_mut().push(ObservedEvent::Speed(clock, speed));
    }

    fn on_completed(&mut self, clock: ClockId) {
        self.log.borrow_mut().push(ObservedEvent::Completed(clock));
    }

    fn on_remove_requested(&mut self, clock: ClockId) {
        self.log.borrow_mut().push(ObservedEvent::RemoveRequested(clock));
    }
}

/// Aggregate change counts accumulated by [`pump`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PumpStats {
    /// Ticks driven.
    pub ticks: u64,
    /// State-change events across all ticks.
    pub states_changed: u64,
    /// Time-change events across all ticks.
    pub times_changed: u64,
    /// Speed-change events across all ticks.
    pub speeds_changed: u64,
    /// Terminal completions across all ticks.
    pub completions: u64,
    /// Clocks reclaimed across all ticks.
    pub removals: u64,
}

/// Drives `manager` through every remaining reading of `source`.
///
/// Subscribed observers fire as usual; the returned stats summarize the run
/// for coarse assertions. Fine-grained assertions belong on an [`EventLog`]
/// or on the manager's read API between individual ticks.
pub fn pump(
    manager: &mut TimeManager,
    source: &mut ScriptedSource,
) -> Result<PumpStats, AccessError> {
    let mut stats = PumpStats::default();
    let mut changes = TickChanges::default();
    while !source.is_exhausted() {
        let now = source.now();
        manager.tick_into(now, &mut changes)?;
        stats.ticks += 1;
        stats.states_changed += count(changes.states.len());
        stats.times_changed += count(changes.times.len());
        stats.speeds_changed += count(changes.speeds.len());
        stats.completions += count(changes.completed.len());
        stats.removals += count(changes.removed.len());
    }
    Ok(stats)
}

fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}
