// Copyright 2026 the Rhythmite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays clock storage with allocation, topology, and scheduling
//! state.

use alloc::boxed::Box;
use alloc::vec::Vec;

use understory_dirty::{CycleHandling, DirtyTracker};

use crate::controller::Command;
use crate::dirty;
use crate::sync::SlipSource;
use crate::time::{TimePoint, TimeSpan};
use crate::timeline::{Duration, EndSync, FillBehavior, RepeatBehavior, SlipBehavior, Timeline};

use super::compute::{self, IterDuration};
use super::id::{ClockId, INVALID};
use super::traverse::Children;

/// The lifecycle state of a clock.
///
/// A clock is `Stopped` before its begin point (and after its active period
/// when its fill behavior is [`Stop`](FillBehavior::Stop)), `Active` while its
/// local time advances through the active period, and `Filling` when it holds
/// its final values past the active period under
/// [`HoldLast`](FillBehavior::HoldLast).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClockState {
    /// Not running and exposing no time values.
    #[default]
    Stopped,
    /// Inside the active period; local time advances with the parent axis.
    Active,
    /// Past the active period, holding the final time values.
    Filling,
}

/// Whether a clock was instantiated from a leaf timeline or a container.
///
/// Decided once at instantiation; there is no runtime type inspection beyond
/// this tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Leaf,
    Group,
}

/// Per-clock configuration snapshot, copied out of the timeline at
/// instantiation.
///
/// Clocks own their configuration: editing a [`Timeline`] after
/// [`instantiate`](ClockStore::instantiate) never affects live clocks.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ClockConfig {
    pub(crate) begin: Option<TimeSpan>,
    pub(crate) duration: Duration,
    pub(crate) auto_reverse: bool,
    pub(crate) repeat: RepeatBehavior,
    pub(crate) fill: FillBehavior,
    pub(crate) speed_ratio: f64,
    pub(crate) slip: SlipBehavior,
    pub(crate) end_sync: EndSync,
    pub(crate) needs_ticks_when_active: bool,
    pub(crate) can_slip: bool,
    pub(crate) kind: NodeKind,
}

impl ClockConfig {
    fn from_timeline(timeline: &Timeline) -> Self {
        Self {
            begin: timeline.begin,
            duration: timeline.duration,
            auto_reverse: timeline.auto_reverse,
            repeat: timeline.repeat,
            fill: timeline.fill,
            speed_ratio: timeline.speed_ratio,
            slip: timeline.slip,
            end_sync: timeline.end_sync,
            needs_ticks_when_active: timeline.needs_ticks_when_active,
            can_slip: timeline.can_slip,
            kind: if timeline.children.is_empty() {
                NodeKind::Leaf
            } else {
                NodeKind::Group
            },
        }
    }
}

/// Where a clock's active window sits on its parent's axis.
///
/// For root clocks the parent axis is the manager's global time; for children
/// it is the container's current iteration time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BeginState {
    /// No window; only an interactive begin can start the clock.
    Unscheduled,
    /// Root created with `begin_now`; the window anchors to the next tick.
    PendingFirstTick,
    /// Window begins at this offset on the parent axis.
    At(TimeSpan),
}

/// Struct-of-arrays storage for all clocks.
///
/// Clocks are addressed by [`ClockId`] handles. Internally, each clock
/// occupies a slot in parallel arrays. Discarded clocks are recycled via a
/// free list, and generation counters prevent stale handle access.
#[derive(Debug)]
pub(crate) struct ClockStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Configuration (fixed at instantiation, durations re-resolved on
    // -- source bind and child removal) --
    pub(crate) config: Vec<ClockConfig>,
    pub(crate) resolved: Vec<IterDuration>,
    pub(crate) total: Vec<Option<TimeSpan>>,

    // -- Scheduling state (written by command resolution and ticks) --
    pub(crate) begin_state: Vec<BeginState>,
    pub(crate) begun: Vec<bool>,
    pub(crate) basis_parent: Vec<TimeSpan>,
    pub(crate) basis_local: Vec<TimeSpan>,
    pub(crate) interactive_ratio: Vec<f64>,
    pub(crate) pending_ratio: Vec<Option<f64>>,
    pub(crate) paused: Vec<bool>,
    pub(crate) expired: Vec<bool>,
    pub(crate) removing: Vec<bool>,
    pub(crate) parent_phase: Vec<u64>,
    pub(crate) queue: Vec<Vec<Command>>,

    // -- Slip state --
    pub(crate) slip_source: Vec<Option<Box<dyn SlipSource>>>,
    pub(crate) slip_tick: Vec<Option<TimePoint>>,
    pub(crate) slip_pos: Vec<TimeSpan>,
    pub(crate) grow_extra: Vec<TimeSpan>,

    // -- Observables (written by tick evaluation) --
    pub(crate) state: Vec<ClockState>,
    pub(crate) obs_time: Vec<Option<TimeSpan>>,
    pub(crate) obs_iteration: Vec<Option<u64>>,
    pub(crate) obs_progress: Vec<Option<f64>>,
    pub(crate) obs_reversed: Vec<bool>,
    pub(crate) global_speed: Vec<f64>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Traversal cache --
    pub(crate) traversal_order: Vec<u32>,
    pub(crate) traversal_dirty: bool,

    // -- Lifecycle tracking --
    pub(crate) pending_added: Vec<ClockId>,
    pub(crate) pending_removed: Vec<ClockId>,
}

impl Default for ClockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockStore {
    /// Creates an empty clock store.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            config: Vec::new(),
            resolved: Vec::new(),
            total: Vec::new(),
            begin_state: Vec::new(),
            begun: Vec::new(),
            basis_parent: Vec::new(),
            basis_local: Vec::new(),
            interactive_ratio: Vec::new(),
            pending_ratio: Vec::new(),
            paused: Vec::new(),
            expired: Vec::new(),
            removing: Vec::new(),
            parent_phase: Vec::new(),
            queue: Vec::new(),
            slip_source: Vec::new(),
            slip_tick: Vec::new(),
            slip_pos: Vec::new(),
            grow_extra: Vec::new(),
            state: Vec::new(),
            obs_time: Vec::new(),
            obs_iteration: Vec::new(),
            obs_progress: Vec::new(),
            obs_reversed: Vec::new(),
            global_speed: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            traversal_order: Vec::new(),
            traversal_dirty: true,
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
        }
    }

    // -- Instantiation API --

    /// Materializes a clock tree from a timeline and returns the root handle.
    ///
    /// One slot is allocated per timeline node, children in document order so
    /// sibling evaluation order is reproducible. Natural durations are
    /// resolved bottom-up as part of instantiation. The caller is expected to
    /// have validated the timeline; a malformed one produces a malformed
    /// clock, not an error.
    ///
    /// With `begin_now`, a root whose timeline has a begin offset anchors its
    /// window to the next tick; otherwise the clock waits for an interactive
    /// begin.
    pub(crate) fn instantiate(&mut self, timeline: &Timeline, begin_now: bool) -> ClockId {
        let root = self.build_node(timeline, INVALID);
        self.begin_state[root as usize] = match (begin_now, timeline.begin) {
            (true, Some(_)) => BeginState::PendingFirstTick,
            _ => BeginState::Unscheduled,
        };
        ClockId {
            idx: root,
            generation: self.generation[root as usize],
        }
    }

    /// Recursively builds one node and its children, resolving natural
    /// durations post-order (children first).
    fn build_node(&mut self, timeline: &Timeline, parent: u32) -> u32 {
        let idx = self.alloc_slot(ClockConfig::from_timeline(timeline));

        if parent != INVALID {
            self.begin_state[idx as usize] = match timeline.begin {
                Some(b) => BeginState::At(b),
                None => BeginState::Unscheduled,
            };
            self.attach_last(parent, idx);
        }

        for child in &timeline.children {
            self.build_node(child, idx);
        }

        self.resolve_natural(idx);
        idx
    }

    /// Creates one slot with default runtime state and returns its index.
    fn alloc_slot(&mut self, config: ClockConfig) -> u32 {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            self.generation[idx as usize] += 1;
            self.parent[idx as usize] = INVALID;
            self.first_child[idx as usize] = INVALID;
            self.next_sibling[idx as usize] = INVALID;
            self.prev_sibling[idx as usize] = INVALID;
            self.config[idx as usize] = config;
            self.resolved[idx as usize] = IterDuration::Finite(TimeSpan::ZERO);
            self.total[idx as usize] = Some(TimeSpan::ZERO);
            self.begin_state[idx as usize] = BeginState::Unscheduled;
            self.begun[idx as usize] = false;
            self.basis_parent[idx as usize] = TimeSpan::ZERO;
            self.basis_local[idx as usize] = TimeSpan::ZERO;
            self.interactive_ratio[idx as usize] = 1.0;
            self.pending_ratio[idx as usize] = None;
            self.paused[idx as usize] = false;
            self.expired[idx as usize] = false;
            self.removing[idx as usize] = false;
            self.parent_phase[idx as usize] = 0;
            self.queue[idx as usize].clear();
            self.slip_source[idx as usize] = None;
            self.slip_tick[idx as usize] = None;
            self.slip_pos[idx as usize] = TimeSpan::ZERO;
            self.grow_extra[idx as usize] = TimeSpan::ZERO;
            self.state[idx as usize] = ClockState::Stopped;
            self.obs_time[idx as usize] = None;
            self.obs_iteration[idx as usize] = None;
            self.obs_progress[idx as usize] = None;
            self.obs_reversed[idx as usize] = false;
            self.global_speed[idx as usize] = 0.0;
            idx
        } else {
            // Allocate a new slot.
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.config.push(config);
            self.resolved.push(IterDuration::Finite(TimeSpan::ZERO));
            self.total.push(Some(TimeSpan::ZERO));
            self.begin_state.push(BeginState::Unscheduled);
            self.begun.push(false);
            self.basis_parent.push(TimeSpan::ZERO);
            self.basis_local.push(TimeSpan::ZERO);
            self.interactive_ratio.push(1.0);
            self.pending_ratio.push(None);
            self.paused.push(false);
            self.expired.push(false);
            self.removing.push(false);
            self.parent_phase.push(0);
            self.queue.push(Vec::new());
            self.slip_source.push(None);
            self.slip_tick.push(None);
            self.slip_pos.push(TimeSpan::ZERO);
            self.grow_extra.push(TimeSpan::ZERO);
            self.state.push(ClockState::Stopped);
            self.obs_time.push(None);
            self.obs_iteration.push(None);
            self.obs_progress.push(None);
            self.obs_reversed.push(false);
            self.global_speed.push(0.0);
            self.generation.push(0);
            idx
        };

        self.traversal_dirty = true;
        self.pending_added.push(ClockId {
            idx,
            generation: self.generation[idx as usize],
        });
        self.dirty.mark(idx, dirty::TOPOLOGY);
        idx
    }

    /// Appends `child` as the last child of `parent` and adds the inherited
    /// dirty dependency edges (a child's observable time and speed depend on
    /// its container's).
    fn attach_last(&mut self, parent: u32, child: u32) {
        self.parent[child as usize] = parent;
        self.prev_sibling[child as usize] = INVALID;
        self.next_sibling[child as usize] = INVALID;

        if self.first_child[parent as usize] == INVALID {
            self.first_child[parent as usize] = child;
        } else {
            // Walk to last child.
            let mut last = self.first_child[parent as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = child;
            self.prev_sibling[child as usize] = last;
        }

        let _ = self.dirty.add_dependency(child, parent, dirty::TIME);
        let _ = self.dirty.add_dependency(child, parent, dirty::SPEED);

        self.traversal_dirty = true;
        self.dirty.mark(parent, dirty::TOPOLOGY);
    }

    // -- Natural duration resolution --

    /// Resolves this node's iteration duration and total active span from its
    /// configuration, slip source, and (for `Automatic` containers) its
    /// children. Children must already be resolved.
    pub(crate) fn resolve_natural(&mut self, idx: u32) {
        let i = idx as usize;
        let resolved = match (self.config[i].kind, self.config[i].duration) {
            (_, Duration::Timed(d)) => IterDuration::Finite(d),
            (_, Duration::Forever) => IterDuration::Forever,
            (NodeKind::Leaf, Duration::Automatic) => match &self.slip_source[i] {
                // A bound source with an unknown length plays until told
                // otherwise; an unbound leaf has nothing to wait for.
                Some(source) => match source.duration() {
                    Some(d) => IterDuration::Finite(d),
                    None => IterDuration::Forever,
                },
                None => IterDuration::Finite(TimeSpan::ZERO),
            },
            (NodeKind::Group, Duration::Automatic) => self.aggregate_children(idx),
        };
        self.resolved[i] = resolved;
        self.total[i] =
            compute::total_active(resolved, self.config[i].auto_reverse, self.config[i].repeat);
    }

    /// Derives an `Automatic` container's iteration duration from its
    /// children's windows per the end-sync policy.
    fn aggregate_children(&self, idx: u32) -> IterDuration {
        let wait_for_all = self.config[idx as usize].end_sync == EndSync::AllChildren;
        let mut end = TimeSpan::ZERO;
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            match self.child_window_end(child as usize) {
                // A child that never begins cannot be waited on under either
                // policy; a never-ending child pins the container only when
                // the container waits for all children.
                ChildWindowEnd::Unscheduled => {}
                ChildWindowEnd::Never => {
                    if wait_for_all {
                        return IterDuration::Forever;
                    }
                }
                ChildWindowEnd::At(e) => end = end.max(e),
            }
            child = self.next_sibling[child as usize];
        }
        IterDuration::Finite(end)
    }

    /// Where a child's natural window ends on this container's iteration
    /// axis, scaled by the child's speed ratio.
    fn child_window_end(&self, c: usize) -> ChildWindowEnd {
        let Some(begin) = self.config[c].begin else {
            return ChildWindowEnd::Unscheduled;
        };
        match self.total[c] {
            None => ChildWindowEnd::Never,
            Some(total) => {
                let width = TimeSpan::from_f64(total.to_f64() / self.config[c].speed_ratio);
                ChildWindowEnd::At(begin + width)
            }
        }
    }

    /// Re-resolves every `Automatic` ancestor of `idx`, bottom-up.
    ///
    /// Used when a slip source bind supplies a leaf duration after the tree
    /// was built. Runtime child removal instead goes through
    /// [`reaggregate_after_removal`](Self::reaggregate_after_removal), which
    /// honors the latch policy.
    fn reresolve_ancestors(&mut self, idx: u32) {
        let mut p = self.parent[idx as usize];
        while p != INVALID {
            if self.config[p as usize].duration == Duration::Automatic {
                self.resolve_natural(p);
            }
            p = self.parent[p as usize];
        }
    }

    /// Re-resolves `Automatic` ancestors after a child removal.
    ///
    /// Last-child aggregation latches at instantiation, so only containers
    /// waiting on all children reschedule here.
    fn reaggregate_after_removal(&mut self, old_parent: u32) {
        let mut p = old_parent;
        while p != INVALID {
            if self.config[p as usize].duration == Duration::Automatic
                && self.config[p as usize].end_sync == EndSync::AllChildren
            {
                self.resolve_natural(p);
            }
            p = self.parent[p as usize];
        }
    }

    // -- Removal API --

    /// Frees the subtree rooted at `id`, detaching it from its parent.
    ///
    /// Queued commands and slip sources are dropped with the slots. Automatic
    /// ancestors waiting on all children are re-resolved.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub(crate) fn remove_subtree(&mut self, id: ClockId) {
        self.validate(id);
        let root = id.idx;
        let old_parent = self.parent[root as usize];

        if old_parent != INVALID {
            self.unlink_from_parent(root);
        }

        let mut stack = alloc::vec![root];
        while let Some(idx) = stack.pop() {
            let mut child = self.first_child[idx as usize];
            while child != INVALID {
                stack.push(child);
                child = self.next_sibling[child as usize];
            }

            let i = idx as usize;
            self.pending_removed.push(ClockId {
                idx,
                generation: self.generation[i],
            });

            // Remove dirty tracking dependencies, then bump the generation so
            // old handles immediately fail validation.
            self.dirty.remove_key(idx);
            self.generation[i] += 1;
            self.queue[i].clear();
            self.slip_source[i] = None;
            self.removing[i] = false;
            self.free_list.push(idx);
            self.dirty.mark(idx, dirty::TOPOLOGY);
        }

        self.traversal_dirty = true;
        if old_parent != INVALID {
            self.reaggregate_after_removal(old_parent);
        }
    }

    /// Returns whether the given handle refers to a live clock.
    #[must_use]
    pub(crate) fn is_alive(&self, id: ClockId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    /// Returns whether the handle refers to a clock that was removed and
    /// whose slot has not been recycled.
    ///
    /// Commands against such a handle are silent no-ops; a recycled handle is
    /// a programmer error and still panics in [`validate`](Self::validate).
    #[must_use]
    pub(crate) fn was_removed(&self, id: ClockId) -> bool {
        id.idx < self.len
            && self.free_list.contains(&id.idx)
            && self.generation[id.idx as usize] == id.generation + 1
    }

    // -- Topology queries --

    /// Returns the parent of a clock, if any.
    #[must_use]
    pub(crate) fn parent_of(&self, id: ClockId) -> Option<ClockId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        if p == INVALID {
            None
        } else {
            Some(ClockId {
                idx: p,
                generation: self.generation[p as usize],
            })
        }
    }

    /// Returns an iterator over the direct children of a clock.
    #[must_use]
    pub(crate) fn children(&self, id: ClockId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns the root clocks in slot order.
    #[must_use]
    pub(crate) fn roots(&self) -> Vec<ClockId> {
        let mut roots = Vec::new();
        for idx in 0..self.len {
            if self.parent[idx as usize] == INVALID && !self.free_list.contains(&idx) {
                roots.push(ClockId {
                    idx,
                    generation: self.generation[idx as usize],
                });
            }
        }
        roots
    }

    // -- Command intake --

    /// Appends a command to a clock's queue under the queue policy: a later
    /// command of the same kind replaces the earlier in place, and nothing
    /// lands behind a queued removal.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub(crate) fn push_command(&mut self, id: ClockId, command: Command) {
        self.validate(id);
        let q = &mut self.queue[id.idx as usize];
        if q.iter().any(|c| matches!(c, Command::Remove)) {
            return;
        }
        if let Some(slot) = q
            .iter_mut()
            .find(|c| core::mem::discriminant(&**c) == core::mem::discriminant(&command))
        {
            *slot = command;
        } else {
            q.push(command);
        }
    }

    /// Stages an interactive speed ratio to apply at the next tick.
    ///
    /// The caller validates the ratio's domain.
    pub(crate) fn stage_ratio(&mut self, id: ClockId, ratio: f64) {
        self.validate(id);
        self.pending_ratio[id.idx as usize] = Some(ratio);
    }

    // -- Slip binding --

    /// Binds an external time source to a sync-capable leaf.
    ///
    /// If the leaf's duration is `Automatic` it re-resolves from the source,
    /// and `Automatic` ancestors re-aggregate (binding is setup, not a
    /// runtime reschedule, so the last-child latch does not apply yet).
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the clock is not a `can_slip` leaf.
    pub(crate) fn bind_slip_source(&mut self, id: ClockId, source: Box<dyn SlipSource>) {
        self.validate(id);
        let i = id.idx as usize;
        assert!(
            self.config[i].kind == NodeKind::Leaf && self.config[i].can_slip,
            "clock {id:?} cannot host a slip source (needs a can_slip leaf)"
        );
        self.slip_source[i] = Some(source);
        self.resolve_natural(id.idx);
        self.reresolve_ancestors(id.idx);
    }

    /// Samples a leaf's slip source, memoized per manager tick.
    ///
    /// The raw report is clamped to `[0, source duration]`; direction is not
    /// policed, since slip tracks the source in either direction.
    pub(crate) fn sample_slip(&mut self, idx: u32, now: TimePoint) -> TimeSpan {
        let i = idx as usize;
        if self.slip_tick[i] == Some(now) {
            return self.slip_pos[i];
        }
        let Some(source) = self.slip_source[i].as_mut() else {
            return TimeSpan::ZERO;
        };
        let raw = source.position(now);
        let ceiling = source.duration();
        let mut pos = raw.max(TimeSpan::ZERO);
        if let Some(limit) = ceiling {
            pos = pos.min(limit);
        }
        self.slip_tick[i] = Some(now);
        self.slip_pos[i] = pos;
        pos
    }

    // -- Observable getters --

    /// Returns the lifecycle state of a clock.
    #[must_use]
    pub(crate) fn state_of(&self, id: ClockId) -> ClockState {
        self.validate(id);
        self.state[id.idx as usize]
    }

    /// Returns the current local time of a clock, if it exposes one.
    #[must_use]
    pub(crate) fn time_of(&self, id: ClockId) -> Option<TimeSpan> {
        self.validate(id);
        self.obs_time[id.idx as usize]
    }

    /// Returns the 1-based iteration ordinal of a clock, if running or
    /// filling.
    #[must_use]
    pub(crate) fn iteration_of(&self, id: ClockId) -> Option<u64> {
        self.validate(id);
        self.obs_iteration[id.idx as usize]
    }

    /// Returns the progress fraction of a clock, if it exposes one.
    #[must_use]
    pub(crate) fn progress_of(&self, id: ClockId) -> Option<f64> {
        self.validate(id);
        self.obs_progress[id.idx as usize]
    }

    /// Returns the accumulated speed of a clock relative to global time.
    #[must_use]
    pub(crate) fn global_speed_of(&self, id: ClockId) -> f64 {
        self.validate(id);
        self.global_speed[id.idx as usize]
    }

    /// Returns whether the clock is directly paused (ancestor pauses show up
    /// in the global speed instead).
    #[must_use]
    pub(crate) fn is_paused(&self, id: ClockId) -> bool {
        self.validate(id);
        self.paused[id.idx as usize]
    }

    /// Returns whether the clock is in the backward phase of an
    /// auto-reversing iteration.
    #[must_use]
    pub(crate) fn is_reversed(&self, id: ClockId) -> bool {
        self.validate(id);
        self.obs_reversed[id.idx as usize]
    }

    /// Returns the resolved duration of one iteration.
    ///
    /// `Automatic` never survives resolution, so the result is either
    /// [`Timed`](Duration::Timed) or [`Forever`](Duration::Forever).
    #[must_use]
    pub(crate) fn natural_duration_of(&self, id: ClockId) -> Duration {
        self.validate(id);
        match self.resolved[id.idx as usize] {
            IterDuration::Finite(d) => Duration::Timed(d),
            IterDuration::Forever => Duration::Forever,
        }
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: ClockId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale ClockId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Removes `idx` from its parent's child list without touching dirty
    /// state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            // Was first child.
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }
}

enum ChildWindowEnd {
    /// The child never begins on its own.
    Unscheduled,
    /// The child begins but never ends.
    Never,
    /// The child's window ends here on the container's iteration axis.
    At(TimeSpan),
}
