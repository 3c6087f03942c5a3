// Copyright 2026 the Rhythmite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Observer interface for per-clock change notification.
//!
//! This module provides a [`ClockObserver`] trait with per-event methods that
//! the manager calls synchronously while a tick commits. All method bodies
//! default to no-ops, so implementing only the events you care about is fine.
//!
//! Observers attach to a single clock via
//! [`TimeManager::subscribe`](crate::manager::TimeManager::subscribe), which returns a
//! [`SubscriptionId`] for later detach. Within one tick a clock's observers
//! fire in a fixed order — all state changes first, then times, then speeds,
//! then completions, then remove requests — and within one event kind in
//! attach order. Callers that prefer polling can ignore this module entirely
//! and read the [`TickChanges`](crate::clock::TickChanges) returned from
//! [`TimeManager::tick`](crate::manager::TimeManager::tick) instead.

use crate::clock::{ClockId, ClockState};
use crate::time::TimeSpan;

/// Receives change notifications for one clock.
///
/// All methods default to no-ops; an implementation overrides the events it
/// wants. Payloads are passed by value; they are snapshots of the clock's
/// observables at the end of the tick.
pub trait ClockObserver {
    /// Called when the clock's state changed this tick.
    fn on_state_invalidated(&mut self, clock: ClockId, state: ClockState) {
        _ = (clock, state);
    }

    /// Called when the clock's current time changed this tick.
    ///
    /// `None` means the clock currently reports no time (stopped, or active
    /// but not yet begun).
    fn on_time_invalidated(&mut self, clock: ClockId, time: Option<TimeSpan>) {
        _ = (clock, time);
    }

    /// Called when the clock's global speed changed this tick.
    fn on_speed_invalidated(&mut self, clock: ClockId, speed: f64) {
        _ = (clock, speed);
    }

    /// Called when the clock finished its active period this tick.
    ///
    /// Fires once per completion; a clock that is re-begun or sought back
    /// before its end can complete again later.
    fn on_completed(&mut self, clock: ClockId) {
        _ = clock;
    }

    /// Called when the clock is about to be detached from the tree.
    ///
    /// This is the last event the observer receives; the subscription dies
    /// with the clock.
    fn on_remove_requested(&mut self, clock: ClockId) {
        _ = clock;
    }
}

/// Handle to an attached [`ClockObserver`].
///
/// Returned by [`TimeManager::subscribe`](crate::manager::TimeManager::subscribe) and
/// consumed by [`TimeManager::unsubscribe`](crate::manager::TimeManager::unsubscribe).
/// Ids are never reused within one manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::INVALID;

    #[test]
    fn default_methods_are_noops() {
        struct Silent;
        impl ClockObserver for Silent {}

        let id = ClockId {
            idx: INVALID,
            generation: 0,
        };
        let mut observer = Silent;
        observer.on_state_invalidated(id, ClockState::Stopped);
        observer.on_time_invalidated(id, Some(TimeSpan(5)));
        observer.on_speed_invalidated(id, 1.0);
        observer.on_completed(id);
        observer.on_remove_requested(id);
    }
}
