// Copyright 2026 the Rhythmite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Staggered timeline demo that exercises the tracing and diagnostics
//! pipeline.
//!
//! Builds a small presentation tree (a fade, a sliding auto-reverse pass, and
//! a repeating pulse inside one group), pumps it at a synthetic 60 Hz while
//! recording events to both a
//! [`PrettyPrintSink`](rhythmite_debug::pretty::PrettyPrintSink) and a
//! [`RecorderSink`](rhythmite_debug::recorder::RecorderSink), then exports a
//! Chrome trace JSON file.

use std::fs::File;
use std::io::BufWriter;

use rhythmite_core::clock::{ClockId, TickChanges};
use rhythmite_core::manager::TimeManager;
use rhythmite_core::time::{TimePoint, TimeSpan, Timebase};
use rhythmite_core::timeline::{Duration, RepeatBehavior, Timeline};
use rhythmite_core::trace::{
    CommandResolvedEvent, StateChangeEvent, TickBeginEvent, TickSummary, TraceSink, Tracer,
};

use rhythmite_debug::pretty::PrettyPrintSink;
use rhythmite_debug::recorder::RecorderSink;

const FRAME_COUNT: i64 = 45;
/// 16.6ms refresh interval in nanoseconds (≈60 Hz).
const REFRESH_INTERVAL_NS: i64 = 16_666_667;

fn main() {
    let timebase = Timebase::NANOS;

    // -- sinks -------------------------------------------------------------
    let mut tee = TeeSink {
        pretty: PrettyPrintSink::new(Box::new(std::io::stdout()), timebase),
        recorder: RecorderSink::new(),
    };

    // -- clock tree --------------------------------------------------------
    let fade_in = Timeline {
        duration: Duration::Timed(TimeSpan(250_000_000)),
        ..Timeline::new()
    };
    let slide = Timeline {
        begin: Some(TimeSpan(100_000_000)),
        duration: Duration::Timed(TimeSpan(300_000_000)),
        auto_reverse: true,
        ..Timeline::new()
    };
    let pulse = Timeline {
        duration: Duration::Timed(TimeSpan(120_000_000)),
        repeat: RepeatBehavior::Count(3.0),
        ..Timeline::new()
    };
    let show = Timeline::group(vec![fade_in, slide, pulse]);

    let mut manager = TimeManager::new();
    let root = manager.create_clock(&show, true).expect("valid timeline");

    // Attach order follows the group's child order.
    let children: Vec<ClockId> = manager.children(root).collect();
    let pulse_clock = children[2];

    // -- simulated loop ----------------------------------------------------
    let start = 1_000_000_000; // start at 1s
    let mut changes = TickChanges::default();

    for frame in 0..FRAME_COUNT {
        // Hold the pulse for ten frames mid-run so command resolution and the
        // resulting state changes show up in the trace.
        if frame == 10 {
            manager
                .controller(pulse_clock)
                .pause()
                .expect("same-thread access");
        }
        if frame == 20 {
            manager
                .controller(pulse_clock)
                .resume()
                .expect("same-thread access");
        }

        let now = TimePoint(start + frame * REFRESH_INTERVAL_NS);
        manager
            .tick_traced(now, &mut changes, &mut Tracer::new(&mut tee))
            .expect("same-thread access");
    }

    println!(
        "final: root {:?} time {:?} needs_tick={} after {FRAME_COUNT} frames",
        manager.current_state(root),
        manager.current_time(root),
        manager.needs_tick(),
    );

    // -- export Chrome trace -----------------------------------------------
    let path = "trace.json";
    let file = File::create(path).expect("failed to create trace.json");
    let mut writer = BufWriter::new(file);
    rhythmite_debug::chrome::export(tee.recorder.as_bytes(), timebase, &mut writer)
        .expect("failed to write Chrome trace");

    println!("Wrote {path} ({FRAME_COUNT} ticks)");
}

/// Forwards every event to both a pretty printer and a binary recorder.
struct TeeSink {
    pretty: PrettyPrintSink,
    recorder: RecorderSink,
}

impl TraceSink for TeeSink {
    fn on_tick_begin(&mut self, e: &TickBeginEvent) {
        self.pretty.on_tick_begin(e);
        self.recorder.on_tick_begin(e);
    }

    fn on_command_resolved(&mut self, e: &CommandResolvedEvent) {
        self.pretty.on_command_resolved(e);
        self.recorder.on_command_resolved(e);
    }

    fn on_state_change(&mut self, e: &StateChangeEvent) {
        self.pretty.on_state_change(e);
        self.recorder.on_state_change(e);
    }

    fn on_completed(&mut self, clock: ClockId) {
        self.pretty.on_completed(clock);
        self.recorder.on_completed(clock);
    }

    fn on_tick_summary(&mut self, s: &TickSummary) {
        self.pretty.on_tick_summary(s);
        self.recorder.on_tick_summary(s);
    }

    fn on_tick_changes(&mut self, index: u64, changes: &TickChanges) {
        self.pretty.on_tick_changes(index, changes);
        self.recorder.on_tick_changes(index, changes);
    }
}
