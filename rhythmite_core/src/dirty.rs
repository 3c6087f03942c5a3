// Copyright 2026 the Rhythmite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! Rhythmite uses multi-channel dirty tracking (via [`understory_dirty`]) to
//! collect, per tick, which clocks changed which observable — and to drain
//! those sets in a deterministic order that becomes the documented event
//! firing order (state before time before speed).
//!
//! # Propagation semantics
//!
//! - **Diff-driven** — [`STATE`] and [`TIME`] are marked during the tick
//!   recompute pass, on the clocks whose observable actually changed. They
//!   use the default policy: time advancement already touches every live
//!   clock top-down, so there is nothing to propagate.
//!
//! - **Propagating** — [`SPEED`] is an inherited product
//!   (`global_speed = parent_global_speed * own_factor`), so it uses
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) and child-to-parent
//!   dependency edges: marking a clock whose own factor changed (pause,
//!   resume, ratio change, direction flip, activation) pulls its whole
//!   subtree into the drain. Drained candidates are still diffed before an
//!   event fires — an already-paused child under a re-paced parent keeps
//!   speed 0.0 and stays silent.
//!
//! - **Structural** — [`TOPOLOGY`] is marked on instantiation and removal.
//!   It triggers a traversal-order rebuild during the next tick but does not
//!   propagate.
//!
//! # Consumption
//!
//! Callers never query dirty state directly. Each
//! [`TimeManager::tick`](crate::manager::TimeManager::tick) drains all
//! channels and surfaces the results as
//! [`TickChanges`](crate::clock::TickChanges), in event order.

use understory_dirty::Channel;

/// Clock state (`Stopped`/`Active`/`Filling`) changed.
pub const STATE: Channel = Channel::new(0);

/// Clock local time or iteration changed.
pub const TIME: Channel = Channel::new(1);

/// A factor of the clock's global speed changed — requires recomputation for
/// descendants.
pub const SPEED: Channel = Channel::new(2);

/// Tree topology changed — triggers traversal order rebuild.
pub const TOPOLOGY: Channel = Channel::new(3);
