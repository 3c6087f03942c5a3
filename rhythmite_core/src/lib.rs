// Copyright 2026 the Rhythmite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core timeline model and clock tree for hierarchical timing.
//!
//! `rhythmite_core` turns declarative timeline descriptions into trees of
//! running clocks and advances them in discrete, deterministic ticks. It is
//! `no_std` compatible (with `alloc`) and uses array-based struct-of-arrays
//! storage with index handles for cache-friendly traversal.
//!
//! # Architecture
//!
//! The crate is organized around a tick loop that turns host time readings
//! into incremental clock updates:
//!
//! ```text
//!   Host pump (monotonic time)
//!       │
//!       ▼
//!   TimePoint ──► TimeManager::tick() ──► resolve queued commands,
//!                                         recompute the tree top-down
//!                                             │
//!                                             ▼
//!   ClockController ◄── host reacts ◄── TickChanges / ClockObserver
//!   (queues commands
//!    for the next tick)
//! ```
//!
//! **[`timeline`]** — Declarative timing descriptions: duration, begin
//! offset, repeat, auto-reverse, fill, speed ratio, slip. Validated before
//! any clock exists.
//!
//! **[`clock`]** — Struct-of-arrays clock tree with generational handles.
//! One clock per timeline node; local times, iterations, and speeds are
//! recomputed top-down each tick.
//!
//! **[`manager`]** — [`TimeManager`](manager::TimeManager), the tick driver.
//! Owns the tree, the global time axis, and the observer registry.
//!
//! **[`controller`]** — [`ClockController`](controller::ClockController) for
//! interactive commands (begin, pause, seek, …), queued per clock and
//! resolved at the next tick.
//!
//! **[`events`]** — [`ClockObserver`](events::ClockObserver) callbacks with
//! a fixed within-tick firing order.
//!
//! **[`sync`]** — [`SlipSource`](sync::SlipSource) for leaves that follow an
//! external clock (audio, video) instead of predicted time.
//!
//! **[`dirty`]** — Multi-channel dirty tracking via `understory_dirty`.
//! STATE and TIME are diff-driven; SPEED propagates to descendants; TOPOLOGY
//! triggers a traversal rebuild.
//!
//! **[`time`]** — Integer engine units: [`TimePoint`](time::TimePoint),
//! [`TimeSpan`](time::TimeSpan), and [`Timebase`](time::Timebase) for
//! conversion at the host boundary.
//!
//! **[`driver`]** — The [`TimeSource`](driver::TimeSource) trait and the
//! pump contract hosts implement to drive the engine.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! tick-loop instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables the owning-thread guard on
//!   [`TimeManager`](manager::TimeManager); without it the guard is a no-op
//!   and builds stay single-threaded by construction.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-tick
//!   full change-list events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod clock;
pub mod controller;
pub mod dirty;
pub mod driver;
pub mod events;
pub mod manager;
pub mod sync;
pub mod time;
pub mod timeline;
pub mod trace;
