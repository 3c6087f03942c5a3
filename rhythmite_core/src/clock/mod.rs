// Copyright 2026 the Rhythmite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clock tree data model.
//!
//! A *clock* is the run-time instantiation of a [`Timeline`](crate::timeline::Timeline)
//! node. Each clock has:
//!
//! - **Identity** — a generational handle ([`ClockId`]) that becomes stale
//!   when the clock is discarded, preventing use-after-free bugs at the API
//!   level.
//! - **Topology** — parent, first-child, and sibling links forming an ordered
//!   tree that mirrors the timeline's document order.
//! - **Configuration** — a snapshot copied from the timeline at
//!   instantiation: begin offset, duration, repeat, fill, speed ratio, and
//!   the rest. Editing a timeline after instantiation does not affect live
//!   clocks.
//! - **Observables** — run-time state produced by each tick: the
//!   [`ClockState`], current local time, iteration ordinal, progress
//!   fraction, direction flag, and accumulated global speed.
//!
//! Clocks are stored in struct-of-arrays layout with index-based handles
//! for cache-friendly traversal.
//!
//! # Dirty tracking
//!
//! Tick evaluation marks a dirty channel (see [`dirty`](crate::dirty)) for
//! every observable that changed, and the manager drains those channels to
//! fire observer callbacks in a deterministic order:
//!
//! - **STATE** / **TIME** — diff-driven; marked only when the recomputed
//!   value differs from the previous tick's.
//! - **SPEED** — propagates child-to-parent dependencies, since a clock's
//!   global speed is the product of its own factor and its parent's.
//! - **TOPOLOGY** — structural changes (instantiation, removal) that trigger
//!   a traversal-order rebuild.

mod compute;
mod evaluate;
mod id;
mod store;
mod traverse;

pub use evaluate::TickChanges;
pub use id::{ClockId, INVALID};
pub use store::ClockState;
pub use traverse::Children;

pub(crate) use store::ClockStore;
