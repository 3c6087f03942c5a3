// Copyright 2026 the Rhythmite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The tick driver that owns the clock tree.
//!
//! [`TimeManager`] owns every clock, the global time axis, and the observer
//! registry. A host loop drives it by calling [`tick`](TimeManager::tick)
//! with monotonic [`TimePoint`]s (see the [driver contract](crate::driver));
//! everything else — interactive control, observation, slip binding — happens
//! between ticks through the manager.
//!
//! The manager is single-threaded: it records its constructing thread and
//! every mutating entry point fails with [`AccessError`] from any other
//! thread. Reads are unguarded; they take `&self` and nothing mutates under
//! them.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::clock::{Children, ClockId, ClockState, ClockStore, INVALID, TickChanges};
use crate::controller::{ClockController, Command, SeekOrigin};
use crate::events::{ClockObserver, SubscriptionId};
use crate::sync::SlipSource;
use crate::time::{TimePoint, TimeSpan};
use crate::timeline::{Duration, Timeline, TimelineError};
use crate::trace::{StateChangeEvent, TickBeginEvent, TickSummaryBuilder, Tracer};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A mutating call reached the manager from a thread other than the one that
/// created it.
///
/// The call had no effect; the engine stays intact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessError;

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("time manager used outside its owning thread")
    }
}

impl core::error::Error for AccessError {}

/// Why a clock could not be created or configured.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ControlError {
    /// Cross-thread use; see [`AccessError`].
    Access(AccessError),
    /// The timeline failed validation.
    Timeline(TimelineError),
    /// An interactive speed ratio that is not finite and positive.
    SpeedRatio(f64),
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access(e) => e.fmt(f),
            Self::Timeline(e) => write!(f, "invalid timeline: {e}"),
            Self::SpeedRatio(r) => {
                write!(f, "speed ratio must be finite and positive, got {r}")
            }
        }
    }
}

impl core::error::Error for ControlError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Access(e) => Some(e),
            Self::Timeline(e) => Some(e),
            Self::SpeedRatio(_) => None,
        }
    }
}

impl From<AccessError> for ControlError {
    fn from(e: AccessError) -> Self {
        Self::Access(e)
    }
}

impl From<TimelineError> for ControlError {
    fn from(e: TimelineError) -> Self {
        Self::Timeline(e)
    }
}

// ---------------------------------------------------------------------------
// Thread affinity
// ---------------------------------------------------------------------------

/// Owning-thread guard. On `no_std` targets the build is single-threaded by
/// construction and the guard is a ZST.
#[derive(Clone, Copy, Debug)]
struct Affinity {
    #[cfg(feature = "std")]
    owner: std::thread::ThreadId,
}

impl Affinity {
    fn new() -> Self {
        #[cfg(feature = "std")]
        {
            Self {
                owner: std::thread::current().id(),
            }
        }
        #[cfg(not(feature = "std"))]
        {
            Self {}
        }
    }

    fn check(self) -> Result<(), AccessError> {
        #[cfg(feature = "std")]
        {
            if std::thread::current().id() == self.owner {
                Ok(())
            } else {
                Err(AccessError)
            }
        }
        #[cfg(not(feature = "std"))]
        {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// TimeManager
// ---------------------------------------------------------------------------

/// Owns the clock tree, the global time axis, and the observer registry.
///
/// ```
/// use rhythmite_core::manager::TimeManager;
/// use rhythmite_core::time::{TimePoint, TimeSpan};
/// use rhythmite_core::timeline::{Duration, Timeline};
///
/// let mut manager = TimeManager::new();
/// let fade = Timeline {
///     duration: Duration::Timed(TimeSpan(100)),
///     ..Timeline::new()
/// };
/// let clock = manager.create_clock(&fade, true).unwrap();
///
/// manager.tick(TimePoint(0)).unwrap();
/// manager.tick(TimePoint(60)).unwrap();
/// assert_eq!(manager.current_time(clock), Some(TimeSpan(60)));
/// ```
pub struct TimeManager {
    store: ClockStore,
    current_time: Option<TimePoint>,
    running: bool,
    changes: TickChanges,
    subscriptions: Vec<(SubscriptionId, ClockId, Box<dyn ClockObserver>)>,
    next_subscription: u64,
    tick_index: u64,
    affinity: Affinity,
}

impl fmt::Debug for TimeManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeManager")
            .field("store", &self.store)
            .field("current_time", &self.current_time)
            .field("running", &self.running)
            .field("subscriptions", &self.subscriptions.len())
            .field("tick_index", &self.tick_index)
            .finish_non_exhaustive()
    }
}

impl Default for TimeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeManager {
    /// Creates a manager with no clocks, accepting ticks, owned by the
    /// calling thread.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: ClockStore::new(),
            current_time: None,
            running: true,
            changes: TickChanges::default(),
            subscriptions: Vec::new(),
            next_subscription: 0,
            tick_index: 0,
            affinity: Affinity::new(),
        }
    }

    // -- Clock lifecycle --

    /// Validates `timeline` and materializes a clock tree from it, returning
    /// the root handle.
    ///
    /// With `begin_now`, a root whose timeline carries a begin offset anchors
    /// its window to the next tick; otherwise the clock waits for an
    /// interactive [`begin`](ClockController::begin).
    pub fn create_clock(
        &mut self,
        timeline: &Timeline,
        begin_now: bool,
    ) -> Result<ClockId, ControlError> {
        self.affinity.check()?;
        timeline.validate()?;
        Ok(self.store.instantiate(timeline, begin_now))
    }

    /// Returns an interactive control handle for one clock.
    ///
    /// The handle borrows the manager; commands it issues resolve at the
    /// next tick. See [`ClockController`] for the queue policy.
    pub fn controller(&mut self, clock: ClockId) -> ClockController<'_> {
        ClockController::new(self, clock)
    }

    /// Binds an external time source to a sync-capable leaf.
    ///
    /// If the leaf's duration is `Automatic` it re-resolves from the source
    /// immediately, and `Automatic` ancestors re-aggregate. Binding to an
    /// already-removed clock is a silent no-op.
    ///
    /// # Panics
    ///
    /// Panics if the handle's slot was recycled, or if the clock is not a
    /// `can_slip` leaf.
    pub fn bind_slip_source(
        &mut self,
        clock: ClockId,
        source: Box<dyn SlipSource>,
    ) -> Result<(), AccessError> {
        self.affinity.check()?;
        if self.store.was_removed(clock) {
            return Ok(());
        }
        self.store.bind_slip_source(clock, source);
        Ok(())
    }

    // -- Ticking --

    /// Advances every clock to `now`, returning the changes.
    ///
    /// The returned buffer is reused by the next tick; copy out anything
    /// that must outlive it. See [`tick_into`](Self::tick_into) for the
    /// caller-owned-buffer variant and the exact tick semantics.
    pub fn tick(&mut self, now: TimePoint) -> Result<&TickChanges, AccessError> {
        let mut changes = core::mem::take(&mut self.changes);
        let result = self.tick_into(now, &mut changes);
        self.changes = changes;
        result.map(|()| &self.changes)
    }

    /// Advances every clock to `now`, recording changes into `changes`.
    ///
    /// One tick is one discrete advancement of the whole tree: queued
    /// commands resolve first, then every clock recomputes top-down, then
    /// events fire in a fixed order (states, then times, then speeds, then
    /// completions, then removals). While the manager is stopped the tick is
    /// ignored and `changes` comes back empty. A `now` earlier than the last
    /// tick clamps to the last tick; a host time anomaly never rewinds the
    /// tree.
    pub fn tick_into(
        &mut self,
        now: TimePoint,
        changes: &mut TickChanges,
    ) -> Result<(), AccessError> {
        self.tick_traced(now, changes, &mut Tracer::none())
    }

    /// Like [`tick_into`](Self::tick_into), dispatching trace events to
    /// `tracer` along the way.
    pub fn tick_traced(
        &mut self,
        now: TimePoint,
        changes: &mut TickChanges,
        tracer: &mut Tracer<'_>,
    ) -> Result<(), AccessError> {
        self.affinity.check()?;
        if !self.running {
            changes.clear();
            return Ok(());
        }

        let now = match self.current_time {
            Some(last) => now.max(last),
            None => now,
        };
        self.current_time = Some(now);

        let begin = TickBeginEvent {
            index: self.tick_index,
            now,
            live_clocks: self.store.live_count(),
        };
        tracer.tick_begin(&begin);

        let commands = self.store.tick_into(now, changes, tracer);

        for &(clock, state) in &changes.states {
            tracer.state_change(&StateChangeEvent { clock, state });
        }
        for &clock in &changes.completed {
            tracer.completed(clock);
        }
        #[cfg(feature = "trace-rich")]
        tracer.tick_changes(begin.index, changes);

        Self::notify(&mut self.subscriptions, changes);
        self.reap_subscriptions(changes);

        let mut summary = TickSummaryBuilder::new(&begin);
        summary.set_commands_resolved(commands);
        summary.record_changes(changes);
        tracer.tick_summary(&summary.finish());

        self.tick_index += 1;
        Ok(())
    }

    /// Discards every clock and subscription and forgets global time.
    ///
    /// The next tick re-establishes the time axis from its `now`. The
    /// running flag is untouched.
    pub fn restart(&mut self) -> Result<(), AccessError> {
        self.affinity.check()?;
        self.store = ClockStore::new();
        self.subscriptions.clear();
        self.changes.clear();
        self.current_time = None;
        self.tick_index = 0;
        Ok(())
    }

    /// Resumes accepting ticks after [`stop`](Self::stop).
    pub fn start(&mut self) -> Result<(), AccessError> {
        self.affinity.check()?;
        self.running = true;
        Ok(())
    }

    /// Makes subsequent ticks no-ops without discarding anything.
    ///
    /// Queued commands stay queued and resolve on the first tick after
    /// [`start`](Self::start).
    pub fn stop(&mut self) -> Result<(), AccessError> {
        self.affinity.check()?;
        self.running = false;
        Ok(())
    }

    // -- Observation --

    /// Attaches an observer to one clock's event stream.
    ///
    /// Observers fire synchronously during the tick, in the per-tick event
    /// order and in attach order within one clock. An observer attached to
    /// an already-removed clock never fires; the returned id is still
    /// accepted by [`unsubscribe`](Self::unsubscribe).
    ///
    /// # Panics
    ///
    /// Panics if the handle's slot was recycled by a later clock.
    pub fn subscribe(
        &mut self,
        clock: ClockId,
        observer: Box<dyn ClockObserver>,
    ) -> Result<SubscriptionId, AccessError> {
        self.affinity.check()?;
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        if !self.store.was_removed(clock) {
            self.store.validate(clock);
            self.subscriptions.push((id, clock, observer));
        }
        Ok(id)
    }

    /// Detaches a previously attached observer.
    ///
    /// Unknown ids, including those minted against removed clocks, are
    /// silent no-ops.
    pub fn unsubscribe(&mut self, subscription: SubscriptionId) -> Result<(), AccessError> {
        self.affinity.check()?;
        self.subscriptions.retain(|(id, _, _)| *id != subscription);
        Ok(())
    }

    /// Dispatches one tick's changes to the per-clock observers.
    fn notify(
        subscriptions: &mut [(SubscriptionId, ClockId, Box<dyn ClockObserver>)],
        changes: &TickChanges,
    ) {
        if subscriptions.is_empty() {
            return;
        }
        for &(id, state) in &changes.states {
            for (_, clock, observer) in subscriptions.iter_mut() {
                if *clock == id {
                    observer.on_state_invalidated(id, state);
                }
            }
        }
        for &(id, time) in &changes.times {
            for (_, clock, observer) in subscriptions.iter_mut() {
                if *clock == id {
                    observer.on_time_invalidated(id, time);
                }
            }
        }
        for &(id, speed) in &changes.speeds {
            for (_, clock, observer) in subscriptions.iter_mut() {
                if *clock == id {
                    observer.on_speed_invalidated(id, speed);
                }
            }
        }
        for &id in &changes.completed {
            for (_, clock, observer) in subscriptions.iter_mut() {
                if *clock == id {
                    observer.on_completed(id);
                }
            }
        }
        for &id in &changes.remove_requested {
            for (_, clock, observer) in subscriptions.iter_mut() {
                if *clock == id {
                    observer.on_remove_requested(id);
                }
            }
        }
    }

    /// Drops subscriptions whose clock went away this tick.
    fn reap_subscriptions(&mut self, changes: &TickChanges) {
        if changes.removed.is_empty() {
            return;
        }
        self.subscriptions
            .retain(|(_, clock, _)| !changes.removed.contains(clock));
    }

    // -- Controller plumbing --

    pub(crate) fn enqueue(&mut self, clock: ClockId, command: Command) -> Result<(), AccessError> {
        self.affinity.check()?;
        if self.store.was_removed(clock) {
            return Ok(());
        }
        self.store.push_command(clock, command);
        Ok(())
    }

    pub(crate) fn seek_aligned(
        &mut self,
        clock: ClockId,
        offset: TimeSpan,
        origin: SeekOrigin,
    ) -> Result<(), AccessError> {
        self.affinity.check()?;
        if self.store.was_removed(clock) {
            return Ok(());
        }
        let mut changes = core::mem::take(&mut self.changes);
        self.store
            .seek_synchronous(clock, offset, origin, self.current_time, &mut changes);
        Self::notify(&mut self.subscriptions, &changes);
        self.changes = changes;
        Ok(())
    }

    pub(crate) fn stage_speed_ratio(
        &mut self,
        clock: ClockId,
        ratio: f64,
    ) -> Result<(), ControlError> {
        self.affinity.check()?;
        if !(ratio.is_finite() && ratio > 0.0) {
            return Err(ControlError::SpeedRatio(ratio));
        }
        if self.store.was_removed(clock) {
            return Ok(());
        }
        self.store.stage_ratio(clock, ratio);
        Ok(())
    }

    // -- Read API --

    /// The global time established by the last tick, if one ran.
    #[must_use]
    pub fn time(&self) -> Option<TimePoint> {
        self.current_time
    }

    /// The lifecycle state of a clock. A removed clock reads as stopped.
    #[must_use]
    pub fn current_state(&self, clock: ClockId) -> ClockState {
        if self.store.was_removed(clock) {
            return ClockState::Stopped;
        }
        self.store.state_of(clock)
    }

    /// The current local time of a clock, if it exposes one.
    #[must_use]
    pub fn current_time(&self, clock: ClockId) -> Option<TimeSpan> {
        if self.store.was_removed(clock) {
            return None;
        }
        self.store.time_of(clock)
    }

    /// The 1-based iteration ordinal of a clock, if running or filling.
    #[must_use]
    pub fn current_iteration(&self, clock: ClockId) -> Option<u64> {
        if self.store.was_removed(clock) {
            return None;
        }
        self.store.iteration_of(clock)
    }

    /// The progress fraction through the current iteration, if any.
    #[must_use]
    pub fn current_progress(&self, clock: ClockId) -> Option<f64> {
        if self.store.was_removed(clock) {
            return None;
        }
        self.store.progress_of(clock)
    }

    /// The accumulated speed of a clock relative to global time.
    #[must_use]
    pub fn current_global_speed(&self, clock: ClockId) -> f64 {
        if self.store.was_removed(clock) {
            return 0.0;
        }
        self.store.global_speed_of(clock)
    }

    /// Whether the clock is directly paused. Ancestor pauses show up in the
    /// global speed instead.
    #[must_use]
    pub fn is_paused(&self, clock: ClockId) -> bool {
        !self.store.was_removed(clock) && self.store.is_paused(clock)
    }

    /// Whether the clock is in the backward phase of an auto-reversing
    /// iteration.
    #[must_use]
    pub fn is_reversed(&self, clock: ClockId) -> bool {
        !self.store.was_removed(clock) && self.store.is_reversed(clock)
    }

    /// The resolved duration of one iteration: [`Timed`](Duration::Timed) or
    /// [`Forever`](Duration::Forever). A removed clock reads as unresolved
    /// ([`Automatic`](Duration::Automatic)).
    #[must_use]
    pub fn natural_duration(&self, clock: ClockId) -> Duration {
        if self.store.was_removed(clock) {
            return Duration::Automatic;
        }
        self.store.natural_duration_of(clock)
    }

    /// The parent of a clock, if any.
    #[must_use]
    pub fn parent(&self, clock: ClockId) -> Option<ClockId> {
        if self.store.was_removed(clock) {
            return None;
        }
        self.store.parent_of(clock)
    }

    /// An iterator over the direct children of a clock, in document order.
    #[must_use]
    pub fn children(&self, clock: ClockId) -> Children<'_> {
        if self.store.was_removed(clock) {
            return Children::new(&self.store, INVALID);
        }
        self.store.children(clock)
    }

    // -- Driver hints --

    /// Whether anything would progress if the host ticked now or at an
    /// upcoming boundary.
    ///
    /// Conservative: `true` may mean only bookkeeping work, but `false`
    /// means ticking changes nothing until a new command arrives. Hosts may
    /// ignore this and tick every frame; correctness never depends on it.
    #[must_use]
    pub fn needs_tick(&self) -> bool {
        self.running
            && (self.store.has_pending_work()
                || self.store.any_active_needs_ticks()
                || self.store.next_boundary(self.current_time).is_some())
    }

    /// The earliest upcoming root begin or end boundary, if one is known.
    ///
    /// A host loop with nothing active can sleep until this point instead of
    /// polling. Child boundaries are not reported; a container that is
    /// running already demands ticks.
    #[must_use]
    pub fn next_boundary(&self) -> Option<TimePoint> {
        if !self.running {
            return None;
        }
        self.store.next_boundary(self.current_time)
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;

    use super::*;
    use crate::timeline::Duration;

    fn leaf(duration_units: i64) -> Timeline {
        Timeline {
            duration: Duration::Timed(TimeSpan(duration_units)),
            ..Timeline::new()
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Event {
        State(ClockState),
        Time(Option<TimeSpan>),
        Speed(f64),
        Completed,
        RemoveRequested,
    }

    /// Observer that appends every callback to a shared log.
    #[derive(Debug)]
    struct Recorder {
        log: Rc<RefCell<Vec<Event>>>,
    }

    impl Recorder {
        fn new() -> (Box<Self>, Rc<RefCell<Vec<Event>>>) {
            let log = Rc::new(RefCell::new(Vec::new()));
            let recorder = Box::new(Self {
                log: Rc::clone(&log),
            });
            (recorder, log)
        }
    }

    impl ClockObserver for Recorder {
        fn on_state_invalidated(&mut self, _clock: ClockId, state: ClockState) {
            self.log.borrow_mut().push(Event::State(state));
        }

        fn on_time_invalidated(&mut self, _clock: ClockId, time: Option<TimeSpan>) {
            self.log.borrow_mut().push(Event::Time(time));
        }

        fn on_speed_invalidated(&mut self, _clock: ClockId, speed: f64) {
            self.log.borrow_mut().push(Event::Speed(speed));
        }

        fn on_completed(&mut self, _clock: ClockId) {
            self.log.borrow_mut().push(Event::Completed);
        }

        fn on_remove_requested(&mut self, _clock: ClockId) {
            self.log.borrow_mut().push(Event::RemoveRequested);
        }
    }

    #[test]
    fn first_tick_reports_added_clocks() {
        let mut manager = TimeManager::new();
        let clock = manager.create_clock(&leaf(100), true).unwrap();

        let changes = manager.tick(TimePoint(0)).unwrap();
        assert_eq!(changes.added, vec![clock]);
        assert!(changes.topology_changed);
        assert_eq!(manager.current_state(clock), ClockState::Active);
        assert_eq!(manager.time(), Some(TimePoint(0)));
    }

    #[test]
    fn events_fire_as_state_then_time_then_speed_then_completed() {
        let mut manager = TimeManager::new();
        let clock = manager.create_clock(&leaf(100), true).unwrap();
        let (recorder, log) = Recorder::new();
        manager.subscribe(clock, recorder).unwrap();

        manager.tick(TimePoint(0)).unwrap();
        assert_eq!(
            log.borrow().as_slice(),
            &[
                Event::State(ClockState::Active),
                Event::Time(Some(TimeSpan::ZERO)),
                Event::Speed(1.0),
            ]
        );

        log.borrow_mut().clear();
        manager.tick(TimePoint(100)).unwrap();
        assert_eq!(
            log.borrow().as_slice(),
            &[
                Event::State(ClockState::Stopped),
                Event::Time(None),
                Event::Speed(0.0),
                Event::Completed,
            ]
        );
    }

    #[test]
    fn unsubscribe_silences_the_observer() {
        let mut manager = TimeManager::new();
        let clock = manager.create_clock(&leaf(100), true).unwrap();
        let (recorder, log) = Recorder::new();
        let subscription = manager.subscribe(clock, recorder).unwrap();

        manager.tick(TimePoint(0)).unwrap();
        assert!(!log.borrow().is_empty());

        log.borrow_mut().clear();
        manager.unsubscribe(subscription).unwrap();
        manager.tick(TimePoint(50)).unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn removal_notifies_once_then_reaps_the_subscription() {
        let mut manager = TimeManager::new();
        let group = Timeline::group(vec![leaf(100), leaf(100)]);
        let root = manager.create_clock(&group, true).unwrap();
        let (recorder, log) = Recorder::new();
        manager.subscribe(root, recorder).unwrap();
        manager.tick(TimePoint(0)).unwrap();
        log.borrow_mut().clear();

        manager.controller(root).remove().unwrap();
        let changes = manager.tick(TimePoint(10)).unwrap();
        assert_eq!(changes.remove_requested, vec![root]);
        assert_eq!(changes.removed.len(), 3, "root and both children reclaimed");
        assert_eq!(log.borrow().as_slice(), &[Event::RemoveRequested]);

        log.borrow_mut().clear();
        manager.tick(TimePoint(20)).unwrap();
        assert!(log.borrow().is_empty(), "the subscription died with the clock");
    }

    #[test]
    fn commands_to_a_removed_clock_are_silent() {
        let mut manager = TimeManager::new();
        let clock = manager.create_clock(&leaf(100), true).unwrap();
        manager.controller(clock).remove().unwrap();
        manager.tick(TimePoint(0)).unwrap();

        manager.controller(clock).begin().unwrap();
        manager.controller(clock).pause().unwrap();
        manager.controller(clock).set_speed_ratio(2.0).unwrap();
        manager
            .controller(clock)
            .seek_aligned_to_last_tick(TimeSpan(10), SeekOrigin::BeginTime)
            .unwrap();

        assert_eq!(manager.current_state(clock), ClockState::Stopped);
        assert_eq!(manager.current_time(clock), None);
        assert_eq!(manager.current_global_speed(clock), 0.0);
        assert_eq!(manager.natural_duration(clock), Duration::Automatic);
        assert!(manager.children(clock).next().is_none());
    }

    #[test]
    fn subscribing_to_a_removed_clock_never_fires() {
        let mut manager = TimeManager::new();
        let clock = manager.create_clock(&leaf(100), true).unwrap();
        manager.controller(clock).remove().unwrap();
        manager.tick(TimePoint(0)).unwrap();

        let (recorder, log) = Recorder::new();
        let subscription = manager.subscribe(clock, recorder).unwrap();
        manager.tick(TimePoint(10)).unwrap();
        assert!(log.borrow().is_empty());
        manager.unsubscribe(subscription).unwrap();
    }

    #[test]
    #[should_panic(expected = "stale ClockId")]
    fn a_recycled_handle_panics() {
        let mut manager = TimeManager::new();
        let old = manager.create_clock(&leaf(100), true).unwrap();
        manager.controller(old).remove().unwrap();
        manager.tick(TimePoint(0)).unwrap();

        // The replacement recycles the slot; the old handle is now a bug.
        let _replacement = manager.create_clock(&leaf(100), true).unwrap();
        let _ = manager.controller(old).begin();
    }

    #[test]
    fn stopped_manager_ignores_ticks_but_keeps_queues() {
        let mut manager = TimeManager::new();
        let clock = manager.create_clock(&leaf(100), true).unwrap();
        manager.tick(TimePoint(0)).unwrap();

        manager.stop().unwrap();
        manager.controller(clock).pause().unwrap();
        let changes = manager.tick(TimePoint(50)).unwrap();
        assert!(changes.states.is_empty() && changes.times.is_empty());
        assert_eq!(manager.time(), Some(TimePoint(0)), "global time held");
        assert!(!manager.is_paused(clock), "commands wait while stopped");

        manager.start().unwrap();
        manager.tick(TimePoint(50)).unwrap();
        assert!(manager.is_paused(clock));
        assert_eq!(manager.current_time(clock), Some(TimeSpan(50)));
    }

    #[test]
    fn host_time_going_backward_clamps_to_the_last_tick() {
        let mut manager = TimeManager::new();
        let clock = manager.create_clock(&leaf(100), true).unwrap();
        manager.tick(TimePoint(0)).unwrap();
        manager.tick(TimePoint(60)).unwrap();

        manager.tick(TimePoint(40)).unwrap();
        assert_eq!(manager.time(), Some(TimePoint(60)));
        assert_eq!(manager.current_time(clock), Some(TimeSpan(60)), "never rewinds");
    }

    #[test]
    fn restart_discards_clocks_subscriptions_and_time() {
        let mut manager = TimeManager::new();
        let clock = manager.create_clock(&leaf(100), true).unwrap();
        let (recorder, log) = Recorder::new();
        manager.subscribe(clock, recorder).unwrap();
        manager.tick(TimePoint(0)).unwrap();

        manager.restart().unwrap();
        assert_eq!(manager.time(), None);
        assert!(!manager.needs_tick());

        let replacement = manager.create_clock(&leaf(100), true).unwrap();
        log.borrow_mut().clear();
        manager.tick(TimePoint(1000)).unwrap();
        assert_eq!(
            manager.current_time(replacement),
            Some(TimeSpan::ZERO),
            "global time re-anchors at the first tick after restart"
        );
        assert!(log.borrow().is_empty(), "old subscriptions died with the restart");
    }

    #[test]
    fn seek_aligned_fires_synchronously_between_ticks() {
        let mut manager = TimeManager::new();
        let clock = manager.create_clock(&leaf(100), true).unwrap();
        manager.tick(TimePoint(0)).unwrap();
        let (recorder, log) = Recorder::new();
        manager.subscribe(clock, recorder).unwrap();

        manager
            .controller(clock)
            .seek_aligned_to_last_tick(TimeSpan(30), SeekOrigin::BeginTime)
            .unwrap();
        assert_eq!(manager.current_time(clock), Some(TimeSpan(30)), "no tick ran");
        assert_eq!(log.borrow().as_slice(), &[Event::Time(Some(TimeSpan(30)))]);
    }

    #[test]
    fn create_clock_rejects_a_malformed_timeline() {
        let mut manager = TimeManager::new();
        let bad = leaf(-5);
        assert_eq!(
            manager.create_clock(&bad, true),
            Err(ControlError::Timeline(TimelineError::NegativeDuration))
        );
    }

    #[test]
    fn speed_ratio_domain_is_enforced() {
        let mut manager = TimeManager::new();
        let clock = manager.create_clock(&leaf(100), true).unwrap();

        assert!(matches!(
            manager.controller(clock).set_speed_ratio(0.0),
            Err(ControlError::SpeedRatio(_))
        ));
        assert!(matches!(
            manager.controller(clock).set_speed_ratio(-1.0),
            Err(ControlError::SpeedRatio(_))
        ));
        assert!(matches!(
            manager.controller(clock).set_speed_ratio(f64::NAN),
            Err(ControlError::SpeedRatio(_))
        ));
        manager.controller(clock).set_speed_ratio(2.0).unwrap();
    }

    #[test]
    fn needs_tick_follows_pending_work() {
        let mut manager = TimeManager::new();
        assert!(!manager.needs_tick(), "an empty manager is quiet");
        assert_eq!(manager.next_boundary(), None);

        let clock = manager.create_clock(&leaf(100), true).unwrap();
        assert!(manager.needs_tick(), "a pending first-tick begin wants resolving");

        manager.tick(TimePoint(0)).unwrap();
        assert!(manager.needs_tick(), "an active clock keeps ticking");

        manager.tick(TimePoint(100)).unwrap();
        assert_eq!(manager.current_state(clock), ClockState::Stopped);
        assert!(!manager.needs_tick(), "a finished tree goes quiet");

        manager.controller(clock).begin().unwrap();
        assert!(manager.needs_tick(), "a queued command revives the loop");
    }

    #[test]
    fn stopped_manager_reports_no_tick_needs() {
        let mut manager = TimeManager::new();
        manager.create_clock(&leaf(100), true).unwrap();
        manager.stop().unwrap();
        assert!(!manager.needs_tick());
        assert_eq!(manager.next_boundary(), None);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_receives_the_tick_lifecycle() {
        use crate::trace::{CommandKind, CommandResolvedEvent, TickSummary, TraceSink};

        #[derive(Default)]
        struct Sink {
            begins: Vec<(u64, i64, u32)>,
            commands: Vec<CommandKind>,
            states: Vec<ClockState>,
            completions: u32,
            summaries: Vec<TickSummary>,
        }

        impl TraceSink for Sink {
            fn on_tick_begin(&mut self, e: &TickBeginEvent) {
                self.begins.push((e.index, e.now.units(), e.live_clocks));
            }

            fn on_command_resolved(&mut self, e: &CommandResolvedEvent) {
                self.commands.push(e.kind);
            }

            fn on_state_change(&mut self, e: &StateChangeEvent) {
                self.states.push(e.state);
            }

            fn on_completed(&mut self, _clock: ClockId) {
                self.completions += 1;
            }

            fn on_tick_summary(&mut self, s: &TickSummary) {
                self.summaries.push(*s);
            }
        }

        let mut manager = TimeManager::new();
        let clock = manager.create_clock(&leaf(100), true).unwrap();
        manager.controller(clock).pause().unwrap();

        let mut sink = Sink::default();
        let mut changes = TickChanges::default();
        manager
            .tick_traced(TimePoint(0), &mut changes, &mut Tracer::new(&mut sink))
            .unwrap();

        assert_eq!(sink.begins, vec![(0, 0, 1)]);
        assert_eq!(sink.commands, vec![CommandKind::Pause]);
        assert_eq!(sink.states, vec![ClockState::Active]);
        assert_eq!(sink.completions, 0);
        assert_eq!(sink.summaries.len(), 1);
        assert_eq!(sink.summaries[0].commands_resolved, 1);
        assert_eq!(sink.summaries[0].states_changed, 1);
        assert_eq!(sink.summaries[0].times_changed, 1);
    }
}
