// Copyright 2026 the Rhythmite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] converts a [`RecorderSink`](super::recorder::RecorderSink) capture
//! into [Chrome Trace Event Format][spec] JSON: tick and clock records become
//! instant events, and activations become duration slices.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::collections::HashSet;
use std::io::{self, Write};

use serde_json::{Value, json};

use rhythmite_core::clock::ClockState;
use rhythmite_core::time::Timebase;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Timestamps are converted to microseconds using the provided [`Timebase`].
/// Clock-scoped records carry no timestamp of their own; they inherit the time
/// of the enclosing tick. Each clock's slot index becomes a thread lane so
/// per-clock activity reads as parallel tracks, and the stretch a clock spends
/// `Active` is rendered as a duration slice on its lane. An activation still
/// open when the recording ends is left unterminated.
pub fn export(bytes: &[u8], timebase: Timebase, writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut active: HashSet<u32> = HashSet::new();
    let mut now_us = 0.0;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::TickBegin(e) => {
                now_us = units_to_us(e.now.units(), timebase);
                events.push(json!({
                    "ph": "i",
                    "name": "TickBegin",
                    "cat": "Tick",
                    "ts": now_us,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "index": e.index,
                        "live_clocks": e.live_clocks,
                    }
                }));
            }
            RecordedEvent::CommandResolved { clock, kind } => {
                events.push(json!({
                    "ph": "i",
                    "name": format!("{kind:?}"),
                    "cat": "Command",
                    "ts": now_us,
                    "pid": 0,
                    "tid": clock.index,
                    "s": "t",
                    "args": {
                        "clock": format!("{}@{}", clock.index, clock.generation),
                    }
                }));
            }
            RecordedEvent::StateChange { clock, state } => {
                if state == ClockState::Active && active.insert(clock.index) {
                    events.push(json!({
                        "ph": "B",
                        "name": "Active",
                        "cat": "Activation",
                        "ts": now_us,
                        "pid": 0,
                        "tid": clock.index,
                        "args": {
                            "clock": format!("{}@{}", clock.index, clock.generation),
                        }
                    }));
                } else if state != ClockState::Active && active.remove(&clock.index) {
                    events.push(json!({
                        "ph": "E",
                        "name": "Active",
                        "cat": "Activation",
                        "ts": now_us,
                        "pid": 0,
                        "tid": clock.index,
                        "args": {
                            "clock": format!("{}@{}", clock.index, clock.generation),
                        }
                    }));
                }
                events.push(json!({
                    "ph": "i",
                    "name": "StateChange",
                    "cat": "Clock",
                    "ts": now_us,
                    "pid": 0,
                    "tid": clock.index,
                    "s": "t",
                    "args": {
                        "clock": format!("{}@{}", clock.index, clock.generation),
                        "state": format!("{state:?}"),
                    }
                }));
            }
            RecordedEvent::Completed { clock } => {
                events.push(json!({
                    "ph": "i",
                    "name": "Completed",
                    "cat": "Clock",
                    "ts": now_us,
                    "pid": 0,
                    "tid": clock.index,
                    "s": "t",
                    "args": {
                        "clock": format!("{}@{}", clock.index, clock.generation),
                    }
                }));
            }
            RecordedEvent::TickSummary(s) => {
                events.push(json!({
                    "ph": "i",
                    "name": "TickSummary",
                    "cat": "Summary",
                    "ts": units_to_us(s.now.units(), timebase),
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "index": s.index,
                        "live_clocks": s.live_clocks,
                        "commands_resolved": s.commands_resolved,
                        "states_changed": s.states_changed,
                        "times_changed": s.times_changed,
                        "speeds_changed": s.speeds_changed,
                        "completions": s.completions,
                        "removals": s.removals,
                    }
                }));
            }
            RecordedEvent::TickChanges {
                index,
                added,
                remove_requested,
                topology_changed,
            } => {
                events.push(json!({
                    "ph": "i",
                    "name": "TickChanges",
                    "cat": "Rich",
                    "ts": now_us,
                    "pid": 0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "index": index,
                        "added": added,
                        "remove_requested": remove_requested,
                        "topology_changed": topology_changed,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn units_to_us(units: i64, timebase: Timebase) -> f64 {
    timebase.units_to_nanos(units) as f64 / 1000.0
}
