// Copyright 2026 the Rhythmite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tick evaluation and change tracking.
//!
//! One tick is a single top-down pass over the clock tree in depth-first
//! pre-order, so every clock sees its container's freshly computed axis:
//!
//! 1. **Resolve** — pending first-tick begins, staged speed ratios, and the
//!    clock's command queue (an interactive begin conceptually precedes the
//!    rest of the same tick's queue).
//! 2. **Recompute** — derive the clock's local time from its position on the
//!    parent axis and its accumulated basis, fold it through the repeat and
//!    reversal rules, and land on a state.
//! 3. **Diff** — compare every observable against the previous tick, record
//!    real changes into [`TickChanges`] in traversal order, and mark the
//!    matching dirty channel (inherited channels propagate eagerly to
//!    descendants).
//!
//! Detachment requested by a removal command happens at the end of the tick,
//! after the change lists are final, so the removal notification always
//! precedes the slots being reclaimed.

use alloc::vec::Vec;

use understory_dirty::EagerPolicy;

use crate::controller::{Command, SeekOrigin};
use crate::dirty;
use crate::time::{TimePoint, TimeSpan};
use crate::timeline::{FillBehavior, SlipBehavior};
use crate::trace::{CommandKind, CommandResolvedEvent, Tracer};

use super::compute::{self, IterDuration};
use super::id::{ClockId, INVALID};
use super::store::{BeginState, ClockState, ClockStore, NodeKind};

/// The set of changes produced by a single tick.
///
/// Lists are ordered the way events fire: clocks appear in traversal order
/// within each list, and the lists themselves follow the per-tick event
/// order (state, time, speed, completion, removal). Callers that prefer
/// polling over observer callbacks can consume this directly.
#[derive(Clone, Debug, Default)]
pub struct TickChanges {
    /// Clocks whose lifecycle state changed, with the new state.
    pub states: Vec<(ClockId, ClockState)>,
    /// Clocks whose time observables changed, with the new local time.
    pub times: Vec<(ClockId, Option<TimeSpan>)>,
    /// Clocks whose accumulated global speed changed, with the new value.
    pub speeds: Vec<(ClockId, f64)>,
    /// Clocks that arrived at the end of their active period this tick.
    pub completed: Vec<ClockId>,
    /// Clocks whose removal resolved this tick, before detachment.
    pub remove_requested: Vec<ClockId>,
    /// Clocks added since the last tick.
    pub added: Vec<ClockId>,
    /// Clocks (including descendants of removal roots) whose slots were
    /// reclaimed since the last tick. These handles are already dead.
    pub removed: Vec<ClockId>,
    /// Whether the tree topology changed.
    pub topology_changed: bool,
}

impl TickChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.states.clear();
        self.times.clear();
        self.speeds.clear();
        self.completed.clear();
        self.remove_requested.clear();
        self.added.clear();
        self.removed.clear();
        self.topology_changed = false;
    }
}

/// The parent axis a clock evaluates against.
#[derive(Clone, Copy, Debug)]
enum Axis {
    /// Parent is stopped; the clock has no time source.
    Off,
    /// Parent is active: its iteration time and ordinal. Roots run on the
    /// global axis, which reads as one endless forward iteration.
    Live { tau: TimeSpan, iteration: u64 },
    /// Parent is filling; the axis holds at its final value.
    Frozen { tau: TimeSpan },
}

impl Axis {
    fn tau(self) -> TimeSpan {
        match self {
            Self::Off => TimeSpan::ZERO,
            Self::Live { tau, .. } | Self::Frozen { tau } => tau,
        }
    }
}

/// One clock's freshly computed observables, before diffing.
#[derive(Clone, Copy, Debug)]
struct NodeSnapshot {
    state: ClockState,
    time: Option<TimeSpan>,
    iteration: Option<u64>,
    progress: Option<f64>,
    reversed: bool,
    speed: f64,
}

impl NodeSnapshot {
    const STOPPED: Self = Self {
        state: ClockState::Stopped,
        time: None,
        iteration: None,
        progress: None,
        reversed: false,
        speed: 0.0,
    };
}

impl ClockStore {
    /// Advances the whole tree to `now`, recording changes into `changes`.
    ///
    /// The buffer is cleared first; reusing one across ticks avoids
    /// allocation. Returns how many queued commands resolved.
    pub(crate) fn tick_into(
        &mut self,
        now: TimePoint,
        changes: &mut TickChanges,
        tracer: &mut Tracer<'_>,
    ) -> u32 {
        changes.clear();

        if self.traversal_dirty {
            self.rebuild_traversal_order();
            changes.topology_changed = true;
            self.traversal_dirty = false;
        }

        let mut commands = 0;
        for k in 0..self.traversal_order.len() {
            let idx = self.traversal_order[k];
            commands += self.visit(idx, now, changes, true, tracer);
        }

        self.flush_channels();

        // Detach removal roots now that their notifications are recorded.
        for k in 0..changes.remove_requested.len() {
            let id = changes.remove_requested[k];
            self.remove_subtree(id);
        }
        if !changes.remove_requested.is_empty() {
            changes.topology_changed = true;
        }

        core::mem::swap(&mut self.pending_added, &mut changes.added);
        core::mem::swap(&mut self.pending_removed, &mut changes.removed);
        commands
    }

    /// Applies a seek against the last tick's axis and recomputes the tree
    /// immediately, without resolving any queued work.
    ///
    /// `now` is the last tick's time; before any tick exists the seek only
    /// stages the clock's basis, and values materialize on the first tick.
    pub(crate) fn seek_synchronous(
        &mut self,
        id: ClockId,
        offset: TimeSpan,
        origin: SeekOrigin,
        now: Option<TimePoint>,
        changes: &mut TickChanges,
    ) {
        self.validate(id);
        changes.clear();

        let i = id.idx as usize;
        let p = self.parent[i];
        let tau = if p == INVALID {
            now.map_or(TimeSpan::ZERO, |n| TimeSpan(n.units()))
        } else {
            self.obs_time[p as usize].unwrap_or(TimeSpan::ZERO)
        };
        if !self.apply_seek(i, offset, origin, tau) {
            return;
        }

        let Some(now) = now else { return };

        if self.traversal_dirty {
            self.rebuild_traversal_order();
            changes.topology_changed = true;
            self.traversal_dirty = false;
        }
        let mut tracer = Tracer::none();
        for k in 0..self.traversal_order.len() {
            let idx = self.traversal_order[k];
            self.visit(idx, now, changes, false, &mut tracer);
        }
        self.flush_channels();
    }

    /// Recomputes one clock against its parent's fresh axis, optionally
    /// resolving its queued work first. Returns how many commands resolved.
    fn visit(
        &mut self,
        idx: u32,
        now: TimePoint,
        changes: &mut TickChanges,
        resolve: bool,
        tracer: &mut Tracer<'_>,
    ) -> u32 {
        let i = idx as usize;
        let p = self.parent[i];

        // A subtree being detached takes no further part in the tick.
        if p != INVALID && self.removing[p as usize] {
            self.removing[i] = true;
            return 0;
        }

        let axis = if p == INVALID {
            Axis::Live {
                tau: TimeSpan(now.units()),
                iteration: 1,
            }
        } else {
            match self.state[p as usize] {
                ClockState::Stopped => Axis::Off,
                ClockState::Active => Axis::Live {
                    tau: self.obs_time[p as usize].unwrap_or(TimeSpan::ZERO),
                    iteration: self.obs_iteration[p as usize].unwrap_or(1),
                },
                ClockState::Filling => Axis::Frozen {
                    tau: self.obs_time[p as usize].unwrap_or(TimeSpan::ZERO),
                },
            }
        };

        let mut commands = 0;
        if resolve {
            if p == INVALID && self.begin_state[i] == BeginState::PendingFirstTick {
                // A begin-now root anchors its window to the first tick that
                // sees it.
                let anchor = TimeSpan(now.units());
                let b = self.config[i].begin.unwrap_or(TimeSpan::ZERO);
                self.begin_state[i] = BeginState::At(anchor + b);
                if self.begun[i] {
                    // A synchronous seek before the first tick staged a local
                    // time; keep it frozen across the anchoring.
                    self.basis_parent[i] = anchor;
                }
            }
            let tau = axis.tau();
            if let Some(ratio) = self.pending_ratio[i].take() {
                self.apply_ratio(i, tau, ratio);
            }
            commands = self.resolve_node_commands(idx, tau, changes, tracer);
            if self.removing[i] {
                return commands;
            }
        }

        match axis {
            Axis::Off => self.settle_under_stopped_parent(idx, changes),
            Axis::Live { tau, iteration } => {
                if self.parent_phase[i] != iteration {
                    // A real wrap re-projects the child's window onto the new
                    // container iteration; a paused child stays frozen.
                    if self.parent_phase[i] != 0 && !self.paused[i] {
                        self.reset_for_new_parent_iteration(i);
                    }
                    self.parent_phase[i] = iteration;
                }
                self.slip_adjust(idx, tau, now);
                self.evaluate_position(idx, tau, now, false, changes);
            }
            Axis::Frozen { tau } => self.evaluate_position(idx, tau, now, true, changes),
        }
        commands
    }

    /// Derives local time, state, and observables from the clock's position
    /// on the parent axis `tau`.
    fn evaluate_position(
        &mut self,
        idx: u32,
        tau: TimeSpan,
        now: TimePoint,
        frozen: bool,
        changes: &mut TickChanges,
    ) {
        let i = idx as usize;

        if !self.begun[i] {
            match self.begin_state[i] {
                BeginState::At(b) if tau >= b => {
                    self.begun[i] = true;
                    self.basis_parent[i] = b;
                    self.basis_local[i] = TimeSpan::ZERO;
                }
                _ => {
                    self.commit(idx, NodeSnapshot::STOPPED, changes);
                    return;
                }
            }
        }

        // A bound sync leaf takes its position from the source, not from
        // arithmetic on the parent axis.
        if self.config[i].kind == NodeKind::Leaf
            && self.config[i].can_slip
            && self.slip_source[i].is_some()
            && !self.paused[i]
            && !frozen
        {
            let m = self.sample_slip(idx, now);
            self.basis_parent[i] = tau;
            self.basis_local[i] = m;
        }

        let local_raw = self.local_time_at(i, tau);
        if local_raw < TimeSpan::ZERO {
            // The parent axis swept back before the window; re-arm.
            self.begun[i] = false;
            self.expired[i] = false;
            self.commit(idx, NodeSnapshot::STOPPED, changes);
            return;
        }

        let growing =
            self.config[i].slip == SlipBehavior::Grow && self.slip_child_running(i);
        let total_eff = if growing {
            None
        } else if let Some(t) = self.total[i] {
            if self.config[i].slip == SlipBehavior::Grow
                && self.grow_extra[i] == TimeSpan::ZERO
                && local_raw > t
            {
                // The sync child finished late; the period ends now.
                self.grow_extra[i] = local_raw - t;
            }
            Some(t + self.grow_extra[i])
        } else {
            None
        };

        let expired_now = total_eff.is_some_and(|t| local_raw >= t);
        let local = match total_eff {
            Some(t) if expired_now => t,
            _ => local_raw,
        };

        let state_new = if expired_now {
            match self.config[i].fill {
                FillBehavior::HoldLast => ClockState::Filling,
                FillBehavior::Stop => ClockState::Stopped,
            }
        } else if frozen {
            // Still nominally inside its window when the container ended:
            // clipped at the boundary.
            ClockState::Stopped
        } else {
            ClockState::Active
        };

        if expired_now && !self.expired[i] {
            changes.completed.push(self.id_at(idx));
        }
        self.expired[i] = expired_now;

        if state_new == ClockState::Stopped {
            self.commit(idx, NodeSnapshot::STOPPED, changes);
            return;
        }

        // A growing container parks its observables at the natural end while
        // stretched time covers the wait for its sync child.
        let at_natural_end = self.config[i].slip == SlipBehavior::Grow
            && self.total[i].is_some_and(|nt| local >= nt);
        let at_end = (expired_now && self.grow_extra[i] == TimeSpan::ZERO) || at_natural_end;
        let proj = compute::project(
            self.resolved[i],
            self.config[i].auto_reverse,
            self.config[i].repeat,
            local,
            at_end,
        );

        let p = self.parent[i];
        let parent_speed = if p == INVALID {
            1.0
        } else {
            self.global_speed[p as usize]
        };
        let own = if state_new == ClockState::Active && !self.paused[i] {
            let sign = if proj.reversed { -1.0 } else { 1.0 };
            self.effective_ratio(i) * sign
        } else {
            0.0
        };

        self.commit(
            idx,
            NodeSnapshot {
                state: state_new,
                time: Some(proj.time),
                iteration: Some(proj.iteration),
                progress: Some(proj.progress),
                reversed: proj.reversed,
                speed: parent_speed * own,
            },
            changes,
        );
    }

    /// Diffs freshly computed observables against the stored ones, recording
    /// real changes and marking dirty channels.
    fn commit(&mut self, idx: u32, snap: NodeSnapshot, changes: &mut TickChanges) {
        let i = idx as usize;
        let id = self.id_at(idx);

        if self.state[i] != snap.state {
            self.state[i] = snap.state;
            changes.states.push((id, snap.state));
            self.dirty.mark(idx, dirty::STATE);
        }

        let time_changed = self.obs_time[i] != snap.time
            || self.obs_iteration[i] != snap.iteration
            || self.obs_progress[i] != snap.progress
            || self.obs_reversed[i] != snap.reversed;
        if time_changed {
            self.obs_time[i] = snap.time;
            self.obs_iteration[i] = snap.iteration;
            self.obs_progress[i] = snap.progress;
            self.obs_reversed[i] = snap.reversed;
            changes.times.push((id, snap.time));
            if self.config[i].kind == NodeKind::Group {
                // A container's iteration time is its children's axis.
                self.dirty.mark_with(idx, dirty::TIME, &EagerPolicy);
            } else {
                self.dirty.mark(idx, dirty::TIME);
            }
        }

        if self.global_speed[i] != snap.speed {
            self.global_speed[i] = snap.speed;
            changes.speeds.push((id, snap.speed));
            self.dirty.mark_with(idx, dirty::SPEED, &EagerPolicy);
        }
    }

    // -- Command resolution --

    /// Resolves one clock's queued commands against its current axis time.
    /// Returns how many commands resolved.
    fn resolve_node_commands(
        &mut self,
        idx: u32,
        tau: TimeSpan,
        changes: &mut TickChanges,
        tracer: &mut Tracer<'_>,
    ) -> u32 {
        let i = idx as usize;
        if self.queue[i].is_empty() {
            return 0;
        }
        let mut queue = core::mem::take(&mut self.queue[i]);
        let mut resolved = 0;

        // An interactive begin conceptually precedes everything else resolved
        // on the same tick, whatever the issue order.
        if let Some(pos) = queue.iter().position(|c| matches!(c, Command::Begin)) {
            queue.remove(pos);
            self.apply_begin(i, tau);
            tracer.command_resolved(&CommandResolvedEvent {
                clock: self.id_at(idx),
                kind: CommandKind::Begin,
            });
            resolved += 1;
        }

        for command in queue.drain(..) {
            match command {
                Command::Begin => continue,
                Command::Pause => self.apply_pause(i, tau),
                Command::Resume => self.apply_resume(i, tau),
                Command::Seek { offset, origin } => {
                    let _ = self.apply_seek(i, offset, origin, tau);
                }
                Command::SkipToFill => self.apply_skip_to_fill(i, tau),
                Command::Stop => self.apply_stop(i),
                Command::Remove => {
                    self.removing[i] = true;
                    changes.remove_requested.push(self.id_at(idx));
                }
            }
            tracer.command_resolved(&CommandResolvedEvent {
                clock: self.id_at(idx),
                kind: command.kind(),
            });
            resolved += 1;
        }

        // Hand the drained buffer back to keep its capacity.
        self.queue[i] = queue;
        resolved
    }

    fn apply_begin(&mut self, i: usize, tau: TimeSpan) {
        self.begun[i] = true;
        self.expired[i] = false;
        self.basis_parent[i] = tau;
        self.basis_local[i] = TimeSpan::ZERO;
        self.begin_state[i] = BeginState::At(tau);
        self.grow_extra[i] = TimeSpan::ZERO;
    }

    fn apply_pause(&mut self, i: usize, tau: TimeSpan) {
        if self.paused[i] {
            return;
        }
        if self.begun[i] {
            // Fold the running local time into the basis before freezing.
            self.basis_local[i] = self.local_time_at(i, tau);
            self.basis_parent[i] = tau;
        }
        self.paused[i] = true;
    }

    fn apply_resume(&mut self, i: usize, tau: TimeSpan) {
        if !self.paused[i] {
            return;
        }
        self.paused[i] = false;
        if self.begun[i] {
            self.basis_parent[i] = tau;
        }
    }

    fn apply_ratio(&mut self, i: usize, tau: TimeSpan, ratio: f64) {
        // Rebase first so the new ratio scales subsequent advancement only.
        if self.begun[i] && !self.paused[i] {
            self.basis_local[i] = self.local_time_at(i, tau);
            self.basis_parent[i] = tau;
        }
        self.interactive_ratio[i] = ratio;
    }

    /// Returns whether the seek applied (a clock with no end cannot resolve
    /// a duration-relative target).
    fn apply_seek(
        &mut self,
        i: usize,
        offset: TimeSpan,
        origin: SeekOrigin,
        tau: TimeSpan,
    ) -> bool {
        let target = match origin {
            SeekOrigin::BeginTime => offset,
            SeekOrigin::Duration => match self.resolved[i] {
                IterDuration::Finite(d) => d + offset,
                IterDuration::Forever => return false,
            },
        };
        let mut target = target.max(TimeSpan::ZERO);
        if let Some(t) = self.total[i] {
            target = target.min(t + self.grow_extra[i]);
        }

        self.begun[i] = true;
        self.basis_parent[i] = tau;
        self.basis_local[i] = target;
        if self.begin_state[i] == BeginState::Unscheduled {
            self.begin_state[i] = BeginState::At(tau);
        }
        true
    }

    fn apply_skip_to_fill(&mut self, i: usize, tau: TimeSpan) {
        // There is no end to skip to on an unbounded clock.
        let Some(t) = self.total[i] else { return };
        self.begun[i] = true;
        self.basis_parent[i] = tau;
        self.basis_local[i] = t + self.grow_extra[i];
        if self.begin_state[i] == BeginState::Unscheduled {
            self.begin_state[i] = BeginState::At(tau);
        }
    }

    fn apply_stop(&mut self, i: usize) {
        self.begun[i] = false;
        self.expired[i] = false;
        self.basis_parent[i] = TimeSpan::ZERO;
        self.basis_local[i] = TimeSpan::ZERO;
        self.begin_state[i] = BeginState::Unscheduled;
        self.grow_extra[i] = TimeSpan::ZERO;
    }

    // -- Axis handling --

    /// Forces a clock into the no-parent-time state and re-arms its natural
    /// window for the container's next activation.
    fn settle_under_stopped_parent(&mut self, idx: u32, changes: &mut TickChanges) {
        let i = idx as usize;
        self.begun[i] = false;
        self.expired[i] = false;
        self.basis_parent[i] = TimeSpan::ZERO;
        self.basis_local[i] = TimeSpan::ZERO;
        self.begin_state[i] = self.natural_begin(i);
        self.parent_phase[i] = 0;
        self.grow_extra[i] = TimeSpan::ZERO;
        self.commit(idx, NodeSnapshot::STOPPED, changes);
    }

    /// Re-projects a child's window onto a new container iteration,
    /// discarding interactive anchors from the previous one.
    fn reset_for_new_parent_iteration(&mut self, i: usize) {
        self.begun[i] = false;
        self.expired[i] = false;
        self.basis_parent[i] = TimeSpan::ZERO;
        self.basis_local[i] = TimeSpan::ZERO;
        self.begin_state[i] = self.natural_begin(i);
    }

    // -- Slip --

    /// Locks a slipping container's local time to its governing sync child's
    /// reported position, shifting every sibling window with it.
    fn slip_adjust(&mut self, idx: u32, tau: TimeSpan, now: TimePoint) {
        let i = idx as usize;
        if self.config[i].slip != SlipBehavior::Slip || !self.begun[i] || self.paused[i] {
            return;
        }

        // First sync-capable child governs.
        let mut child = self.first_child[i];
        let governor = loop {
            if child == INVALID {
                return;
            }
            let c = child as usize;
            if self.config[c].can_slip {
                if self.slip_source[c].is_none() || !self.begun[c] {
                    return;
                }
                break c;
            }
            child = self.next_sibling[c];
        };

        let m = self.sample_slip(governor as u32, now);
        let BeginState::At(child_begin) = self.begin_state[governor] else {
            return;
        };
        let tau_target =
            child_begin + TimeSpan::from_f64(m.to_f64() / self.effective_ratio(governor));

        // Repeated containers track within their current iteration.
        let local_target = match self.resolved[i] {
            IterDuration::Finite(d) => {
                let span = compute::iteration_span(d, self.config[i].auto_reverse);
                let prior = self.obs_iteration[i].unwrap_or(1).saturating_sub(1);
                let prior = i64::try_from(prior).unwrap_or(i64::MAX);
                TimeSpan(span.units().saturating_mul(prior)) + tau_target
            }
            IterDuration::Forever => tau_target,
        };

        self.basis_parent[i] = tau;
        self.basis_local[i] = local_target.max(TimeSpan::ZERO);
    }

    /// Whether this container's governing sync child is still running, which
    /// keeps a growing container open past its natural end.
    fn slip_child_running(&self, i: usize) -> bool {
        let mut child = self.first_child[i];
        while child != INVALID {
            let c = child as usize;
            if self.config[c].can_slip {
                return self.slip_source[c].is_some() && self.begun[c] && !self.expired[c];
            }
            child = self.next_sibling[c];
        }
        false
    }

    // -- Scheduling hints --

    /// Number of live clock slots.
    pub(crate) fn live_count(&self) -> u32 {
        let free = u32::try_from(self.free_list.len()).unwrap_or(u32::MAX);
        self.len.saturating_sub(free)
    }

    /// Whether any clock has resolution work staged for the next tick.
    pub(crate) fn has_pending_work(&self) -> bool {
        for idx in 0..self.len {
            let i = idx as usize;
            if self.free_list.contains(&idx) {
                continue;
            }
            if !self.queue[i].is_empty()
                || self.pending_ratio[i].is_some()
                || self.begin_state[i] == BeginState::PendingFirstTick
            {
                return true;
            }
        }
        !self.pending_added.is_empty()
            || !self.pending_removed.is_empty()
            || (self.traversal_dirty && self.live_count() > 0)
    }

    /// Whether any live clock advances on its own and wants ticks for it.
    ///
    /// Containers always need ticks while running (they drive child
    /// windows); leaves opt in per configuration. A zero global speed means
    /// the clock is held by a pause somewhere on its chain, so nothing
    /// advances.
    pub(crate) fn any_active_needs_ticks(&self) -> bool {
        for idx in 0..self.len {
            let i = idx as usize;
            if self.free_list.contains(&idx)
                || self.state[i] != ClockState::Active
                || self.global_speed[i] == 0.0
            {
                continue;
            }
            if self.config[i].kind == NodeKind::Group || self.config[i].needs_ticks_when_active {
                return true;
            }
        }
        false
    }

    /// Earliest upcoming begin or end boundary among root clocks, strictly
    /// after `after`.
    ///
    /// Only root boundaries can be located without running a tick, since
    /// roots anchor directly to global time; child boundaries are covered by
    /// their container's need for ticks while active. End estimates round
    /// up, so a host that sleeps until the reported point never lands short
    /// of the boundary.
    pub(crate) fn next_boundary(&self, after: Option<TimePoint>) -> Option<TimePoint> {
        let floor = after.map_or(i64::MIN, TimePoint::units);
        let mut best: Option<i64> = None;
        for idx in 0..self.len {
            let i = idx as usize;
            if self.parent[i] != INVALID || self.free_list.contains(&idx) {
                continue;
            }
            let candidate = if !self.begun[i] {
                match self.begin_state[i] {
                    BeginState::At(b) if b.units() > floor => Some(b.units()),
                    _ => None,
                }
            } else if self.paused[i] || self.expired[i] {
                None
            } else {
                self.total[i].and_then(|t| {
                    let remaining = (t + self.grow_extra[i] - self.basis_local[i]).to_f64()
                        / self.effective_ratio(i);
                    let end = self.basis_parent[i] + TimeSpan::from_f64(libm::ceil(remaining));
                    (end.units() > floor).then_some(end.units())
                })
            };
            if let Some(c) = candidate {
                best = Some(best.map_or(c, |b| b.min(c)));
            }
        }
        best.map(TimePoint)
    }

    // -- Shared helpers --

    pub(crate) fn id_at(&self, idx: u32) -> ClockId {
        ClockId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    fn effective_ratio(&self, i: usize) -> f64 {
        self.config[i].speed_ratio * self.interactive_ratio[i]
    }

    /// Local time accumulated from the basis; frozen while paused.
    fn local_time_at(&self, i: usize, tau: TimeSpan) -> TimeSpan {
        if self.paused[i] {
            self.basis_local[i]
        } else {
            let advance = (tau - self.basis_parent[i]).to_f64() * self.effective_ratio(i);
            self.basis_local[i] + TimeSpan::from_f64(advance)
        }
    }

    fn natural_begin(&self, i: usize) -> BeginState {
        match self.config[i].begin {
            Some(b) => BeginState::At(b),
            None => BeginState::Unscheduled,
        }
    }

    /// Consumes this tick's channel marks (including eager propagation to
    /// dependents) so stale marks never leak into the next tick.
    fn flush_channels(&mut self) {
        let _: Vec<u32> = self
            .dirty
            .drain(dirty::STATE)
            .deterministic()
            .run()
            .collect();
        let _: Vec<u32> = self
            .dirty
            .drain(dirty::TIME)
            .affected()
            .deterministic()
            .run()
            .collect();
        let _: Vec<u32> = self
            .dirty
            .drain(dirty::SPEED)
            .affected()
            .deterministic()
            .run()
            .collect();
        let _: Vec<u32> = self
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .collect();
    }

    /// Rebuilds the depth-first pre-order traversal of all live clocks.
    fn rebuild_traversal_order(&mut self) {
        self.traversal_order.clear();
        for idx in 0..self.len {
            if self.parent[idx as usize] == INVALID && !self.free_list.contains(&idx) {
                self.dfs_collect(idx);
            }
        }
    }

    /// Depth-first pre-order collection starting from `idx`.
    fn dfs_collect(&mut self, idx: u32) {
        self.traversal_order.push(idx);
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.dfs_collect(child);
            child = self.next_sibling[child as usize];
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::rc::Rc;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::Cell;

    use super::*;
    use crate::sync::SlipSource;
    use crate::timeline::{Duration, RepeatBehavior, Timeline};

    const EPS: f64 = 1e-9;

    fn leaf(duration_units: i64) -> Timeline {
        let mut t = Timeline::new();
        t.duration = Duration::Timed(TimeSpan(duration_units));
        t
    }

    fn tick(store: &mut ClockStore, at: i64) -> TickChanges {
        let mut changes = TickChanges::default();
        store.tick_into(TimePoint(at), &mut changes, &mut Tracer::none());
        changes
    }

    #[test]
    fn window_lifecycle_matches_schedule() {
        let mut store = ClockStore::new();
        let mut t = leaf(100);
        t.begin = Some(TimeSpan(100));
        let id = store.instantiate(&t, true);

        tick(&mut store, 0);
        tick(&mut store, 99);
        assert_eq!(store.state_of(id), ClockState::Stopped);
        assert_eq!(store.time_of(id), None);

        tick(&mut store, 100);
        assert_eq!(store.state_of(id), ClockState::Active);
        assert_eq!(store.time_of(id), Some(TimeSpan::ZERO));
        assert_eq!(store.iteration_of(id), Some(1));

        tick(&mut store, 199);
        assert_eq!(store.state_of(id), ClockState::Active);
        assert_eq!(store.time_of(id), Some(TimeSpan(99)));

        let changes = tick(&mut store, 200);
        assert_eq!(store.state_of(id), ClockState::Stopped, "default fill stops");
        assert_eq!(store.time_of(id), None);
        assert_eq!(changes.completed, vec![id]);
    }

    #[test]
    fn hold_last_keeps_final_values() {
        let mut store = ClockStore::new();
        let mut t = leaf(100);
        t.begin = Some(TimeSpan(100));
        t.fill = FillBehavior::HoldLast;
        let id = store.instantiate(&t, true);

        tick(&mut store, 0);
        tick(&mut store, 250);
        assert_eq!(store.state_of(id), ClockState::Filling);
        assert_eq!(store.time_of(id), Some(TimeSpan(100)));
        assert!((store.progress_of(id).unwrap() - 1.0).abs() < EPS);
        assert_eq!(
            store.global_speed_of(id),
            0.0,
            "a filling clock no longer consumes time"
        );
    }

    #[test]
    fn begin_now_anchors_to_first_tick() {
        let mut store = ClockStore::new();
        let mut t = leaf(100);
        t.begin = Some(TimeSpan(10));
        let id = store.instantiate(&t, true);

        // The first tick the manager runs may start anywhere on the axis.
        tick(&mut store, 1000);
        assert_eq!(store.state_of(id), ClockState::Stopped);
        tick(&mut store, 1010);
        assert_eq!(store.state_of(id), ClockState::Active);
        tick(&mut store, 1060);
        assert_eq!(store.time_of(id), Some(TimeSpan(50)));
    }

    #[test]
    fn negative_begin_is_already_running_at_the_first_tick() {
        let mut store = ClockStore::new();
        let mut t = leaf(100);
        t.begin = Some(TimeSpan(-50));
        let id = store.instantiate(&t, true);

        tick(&mut store, 1000);
        assert_eq!(store.state_of(id), ClockState::Active);
        assert_eq!(
            store.time_of(id),
            Some(TimeSpan(50)),
            "a begin in the past catches up"
        );
    }

    #[test]
    fn unscheduled_timeline_waits_for_interactive_begin() {
        let mut store = ClockStore::new();
        let mut t = leaf(100);
        t.begin = None;
        let id = store.instantiate(&t, true);

        tick(&mut store, 0);
        tick(&mut store, 500);
        assert_eq!(store.state_of(id), ClockState::Stopped);

        store.push_command(id, Command::Begin);
        tick(&mut store, 600);
        assert_eq!(store.state_of(id), ClockState::Active);
        assert_eq!(store.time_of(id), Some(TimeSpan::ZERO));
        tick(&mut store, 650);
        assert_eq!(store.time_of(id), Some(TimeSpan(50)));
    }

    #[test]
    fn pause_freezes_local_time_until_resume() {
        let mut store = ClockStore::new();
        let mut t = leaf(200);
        t.begin = Some(TimeSpan(100));
        let id = store.instantiate(&t, true);

        tick(&mut store, 0);
        tick(&mut store, 150);
        assert_eq!(store.time_of(id), Some(TimeSpan(50)));

        // The pause resolves at the next tick and freezes that tick's time.
        store.push_command(id, Command::Pause);
        tick(&mut store, 160);
        assert!(store.is_paused(id));
        assert_eq!(store.time_of(id), Some(TimeSpan(60)));
        assert_eq!(store.global_speed_of(id), 0.0);

        tick(&mut store, 275);
        assert_eq!(store.time_of(id), Some(TimeSpan(60)), "paused time holds");

        store.push_command(id, Command::Resume);
        tick(&mut store, 275);
        assert_eq!(store.time_of(id), Some(TimeSpan(60)));
        assert!(!store.is_paused(id));

        tick(&mut store, 300);
        assert_eq!(store.time_of(id), Some(TimeSpan(85)), "resumes from held time");
    }

    #[test]
    fn pause_before_begin_starts_frozen_at_zero() {
        let mut store = ClockStore::new();
        let mut t = leaf(100);
        t.begin = Some(TimeSpan(100));
        let id = store.instantiate(&t, true);

        tick(&mut store, 0);
        store.push_command(id, Command::Pause);
        tick(&mut store, 50);
        assert_eq!(store.state_of(id), ClockState::Stopped);
        assert!(store.is_paused(id));

        tick(&mut store, 150);
        assert_eq!(store.state_of(id), ClockState::Active);
        assert_eq!(store.time_of(id), Some(TimeSpan::ZERO), "begins held at zero");
        tick(&mut store, 250);
        assert_eq!(store.time_of(id), Some(TimeSpan::ZERO));
    }

    #[test]
    fn seek_applies_at_next_tick_and_clock_runs_to_completion() {
        let mut store = ClockStore::new();
        let mut t = leaf(100);
        t.begin = Some(TimeSpan(100));
        let id = store.instantiate(&t, true);

        tick(&mut store, 0);
        tick(&mut store, 150);
        assert_eq!(store.time_of(id), Some(TimeSpan(50)));

        store.push_command(
            id,
            Command::Seek {
                offset: TimeSpan::ZERO,
                origin: SeekOrigin::BeginTime,
            },
        );
        assert_eq!(
            store.time_of(id),
            Some(TimeSpan(50)),
            "a queued seek does nothing until the next tick"
        );

        tick(&mut store, 200);
        assert_eq!(store.time_of(id), Some(TimeSpan::ZERO));

        tick(&mut store, 299);
        assert_eq!(store.state_of(id), ClockState::Active);
        let changes = tick(&mut store, 300);
        assert_eq!(store.state_of(id), ClockState::Stopped);
        assert_eq!(changes.completed, vec![id], "completes one duration after the seek");
    }

    #[test]
    fn seek_past_the_end_completes_without_intermediate_ticks() {
        let mut store = ClockStore::new();
        let mut t = leaf(100);
        t.begin = Some(TimeSpan::ZERO);
        t.fill = FillBehavior::HoldLast;
        let id = store.instantiate(&t, true);

        tick(&mut store, 0);
        store.push_command(
            id,
            Command::Seek {
                offset: TimeSpan(500),
                origin: SeekOrigin::BeginTime,
            },
        );
        let changes = tick(&mut store, 10);
        assert_eq!(store.state_of(id), ClockState::Filling);
        assert_eq!(changes.completed, vec![id]);

        // Seeking back into the window revives the clock.
        store.push_command(
            id,
            Command::Seek {
                offset: TimeSpan(30),
                origin: SeekOrigin::BeginTime,
            },
        );
        tick(&mut store, 20);
        assert_eq!(store.state_of(id), ClockState::Active);
        assert_eq!(store.time_of(id), Some(TimeSpan(30)));
    }

    #[test]
    fn duration_origin_seeks_relative_to_one_iteration() {
        let mut store = ClockStore::new();
        let mut t = leaf(100);
        t.begin = Some(TimeSpan::ZERO);
        t.fill = FillBehavior::HoldLast;
        let id = store.instantiate(&t, true);

        tick(&mut store, 0);
        store.push_command(
            id,
            Command::Seek {
                offset: TimeSpan(-30),
                origin: SeekOrigin::Duration,
            },
        );
        tick(&mut store, 10);
        assert_eq!(store.time_of(id), Some(TimeSpan(70)));
    }

    #[test]
    fn skip_to_fill_is_idempotent() {
        let mut store = ClockStore::new();
        let mut t = leaf(100);
        t.begin = Some(TimeSpan(100));
        t.fill = FillBehavior::HoldLast;
        let id = store.instantiate(&t, true);

        tick(&mut store, 0);
        store.push_command(id, Command::SkipToFill);
        store.push_command(id, Command::SkipToFill);
        let changes = tick(&mut store, 10);
        assert_eq!(store.state_of(id), ClockState::Filling);
        assert_eq!(store.time_of(id), Some(TimeSpan(100)));
        assert_eq!(changes.completed, vec![id], "two queued skips complete once");

        let changes = tick(&mut store, 20);
        assert!(changes.completed.is_empty(), "filling does not re-complete");
    }

    #[test]
    fn skip_to_fill_on_an_unbounded_clock_is_ignored() {
        let mut store = ClockStore::new();
        let mut t = leaf(100);
        t.begin = Some(TimeSpan::ZERO);
        t.repeat = RepeatBehavior::Forever;
        let id = store.instantiate(&t, true);

        tick(&mut store, 0);
        store.push_command(id, Command::SkipToFill);
        let changes = tick(&mut store, 10);
        assert_eq!(store.state_of(id), ClockState::Active);
        assert!(changes.completed.is_empty());
    }

    #[test]
    fn begin_resolves_before_skip_to_fill_regardless_of_issue_order() {
        let mut store = ClockStore::new();
        let mut t = leaf(100);
        t.begin = Some(TimeSpan::ZERO);
        t.fill = FillBehavior::HoldLast;
        let id = store.instantiate(&t, true);

        tick(&mut store, 0);
        tick(&mut store, 50);

        store.push_command(id, Command::SkipToFill);
        store.push_command(id, Command::Begin);
        let changes = tick(&mut store, 60);
        assert_eq!(
            store.state_of(id),
            ClockState::Filling,
            "the skip still lands after the begin re-arms the clock"
        );
        assert_eq!(store.time_of(id), Some(TimeSpan(100)));
        assert_eq!(changes.completed, vec![id]);
    }

    #[test]
    fn stop_holds_until_a_new_begin() {
        let mut store = ClockStore::new();
        let mut t = leaf(100);
        t.begin = Some(TimeSpan::ZERO);
        let id = store.instantiate(&t, true);

        tick(&mut store, 0);
        tick(&mut store, 50);
        assert_eq!(store.state_of(id), ClockState::Active);

        store.push_command(id, Command::Stop);
        let changes = tick(&mut store, 60);
        assert_eq!(store.state_of(id), ClockState::Stopped);
        assert!(
            changes.completed.is_empty(),
            "an interactive stop is not a completion"
        );

        tick(&mut store, 500);
        assert_eq!(store.state_of(id), ClockState::Stopped, "no natural re-begin");

        store.push_command(id, Command::Begin);
        tick(&mut store, 600);
        assert_eq!(store.state_of(id), ClockState::Active);
        assert_eq!(store.time_of(id), Some(TimeSpan::ZERO));
    }

    #[test]
    fn zero_duration_lands_in_fill_on_the_begin_tick() {
        let mut store = ClockStore::new();
        let mut t = leaf(0);
        t.begin = Some(TimeSpan(100));
        t.fill = FillBehavior::HoldLast;
        t.repeat = RepeatBehavior::Count(42.3);
        let id = store.instantiate(&t, true);

        tick(&mut store, 0);
        let changes = tick(&mut store, 100);
        assert_eq!(store.state_of(id), ClockState::Filling);
        assert_eq!(store.iteration_of(id), Some(43));
        assert!((store.progress_of(id).unwrap() - 0.3).abs() < EPS);
        assert_eq!(store.time_of(id), Some(TimeSpan::ZERO));
        assert_eq!(changes.completed, vec![id]);
        assert_eq!(
            changes.states,
            vec![(id, ClockState::Filling)],
            "no observable pass through the active state"
        );
    }

    #[test]
    fn interactive_ratio_rescales_subsequent_advancement_only() {
        let mut store = ClockStore::new();
        let mut t = leaf(100);
        t.begin = Some(TimeSpan::ZERO);
        let id = store.instantiate(&t, true);

        tick(&mut store, 0);
        tick(&mut store, 50);
        assert_eq!(store.time_of(id), Some(TimeSpan(50)));

        store.stage_ratio(id, 2.0);
        tick(&mut store, 50);
        assert_eq!(store.time_of(id), Some(TimeSpan(50)), "no retroactive rescale");
        assert_eq!(store.global_speed_of(id), 2.0);

        tick(&mut store, 70);
        assert_eq!(store.time_of(id), Some(TimeSpan(90)), "doubled from here on");
    }

    #[test]
    fn container_window_clips_children_at_its_boundary() {
        let mut store = ClockStore::new();
        let mut container = Timeline::group(vec![leaf(200)]);
        container.duration = Duration::Timed(TimeSpan(120));
        container.begin = Some(TimeSpan::ZERO);
        let root = store.instantiate(&container, true);
        let child = store.children(root).next().unwrap();

        tick(&mut store, 0);
        tick(&mut store, 119);
        assert_eq!(store.state_of(child), ClockState::Active);
        assert_eq!(store.time_of(child), Some(TimeSpan(119)));

        let changes = tick(&mut store, 120);
        assert_eq!(store.state_of(root), ClockState::Stopped);
        assert_eq!(store.state_of(child), ClockState::Stopped);
        assert_eq!(store.time_of(child), None);
        assert_eq!(
            changes.completed,
            vec![root],
            "a clipped child never reaches its own end"
        );
    }

    #[test]
    fn filling_container_freezes_its_axis_for_children() {
        let mut store = ClockStore::new();
        let mut done_child = leaf(30);
        done_child.fill = FillBehavior::HoldLast;
        let clipped_child = leaf(500);
        let mut container = Timeline::group(vec![done_child, clipped_child]);
        container.duration = Duration::Timed(TimeSpan(100));
        container.begin = Some(TimeSpan::ZERO);
        container.fill = FillBehavior::HoldLast;
        let root = store.instantiate(&container, true);
        let kids: Vec<_> = store.children(root).collect();

        tick(&mut store, 0);
        tick(&mut store, 150);
        assert_eq!(store.state_of(root), ClockState::Filling);
        assert_eq!(
            store.state_of(kids[0]),
            ClockState::Filling,
            "a child that finished holds its own fill"
        );
        assert_eq!(store.time_of(kids[0]), Some(TimeSpan(30)));
        assert_eq!(
            store.state_of(kids[1]),
            ClockState::Stopped,
            "a child cut mid-window is clipped, not filled"
        );
    }

    #[test]
    fn automatic_container_runs_until_its_last_child_ends() {
        let mut store = ClockStore::new();
        let first = leaf(100);
        let mut second = leaf(100);
        second.begin = Some(TimeSpan(50));
        let mut container = Timeline::group(vec![first, second]);
        container.begin = Some(TimeSpan::ZERO);
        let root = store.instantiate(&container, true);

        tick(&mut store, 0);
        tick(&mut store, 149);
        assert_eq!(store.state_of(root), ClockState::Active);
        let changes = tick(&mut store, 150);
        assert_eq!(store.state_of(root), ClockState::Stopped);
        assert!(changes.completed.contains(&root));
    }

    #[test]
    fn repeating_container_reprojects_child_windows() {
        let mut store = ClockStore::new();
        let mut child = leaf(50);
        child.begin = Some(TimeSpan(20));
        let mut container = Timeline::group(vec![child]);
        container.duration = Duration::Timed(TimeSpan(100));
        container.begin = Some(TimeSpan::ZERO);
        container.repeat = RepeatBehavior::Count(2.0);
        let root = store.instantiate(&container, true);
        let child = store.children(root).next().unwrap();

        tick(&mut store, 0);
        tick(&mut store, 30);
        assert_eq!(store.time_of(child), Some(TimeSpan(10)));
        tick(&mut store, 90);
        assert_eq!(store.state_of(child), ClockState::Stopped, "first window over");

        tick(&mut store, 130);
        assert_eq!(store.iteration_of(root), Some(2));
        assert_eq!(
            store.time_of(child),
            Some(TimeSpan(10)),
            "the child re-begins inside the second container iteration"
        );
    }

    #[test]
    fn reversed_container_sweep_replays_children_backward() {
        let mut store = ClockStore::new();
        let mut child = leaf(60);
        child.begin = Some(TimeSpan(20));
        let mut container = Timeline::group(vec![child]);
        container.duration = Duration::Timed(TimeSpan(100));
        container.begin = Some(TimeSpan::ZERO);
        container.auto_reverse = true;
        let root = store.instantiate(&container, true);
        let child = store.children(root).next().unwrap();

        tick(&mut store, 0);
        tick(&mut store, 70);
        assert_eq!(store.time_of(child), Some(TimeSpan(50)));
        assert!(store.global_speed_of(child) > 0.0);

        // t=130 folds to container time 70 on the way back down.
        tick(&mut store, 130);
        assert!(store.is_reversed(root));
        assert_eq!(store.time_of(child), Some(TimeSpan(50)));
        assert_eq!(
            store.global_speed_of(child),
            -1.0,
            "the container's backward sweep drives the child backward"
        );

        tick(&mut store, 165);
        assert_eq!(store.time_of(child), Some(TimeSpan(15)), "replayed in reverse");

        tick(&mut store, 185);
        assert_eq!(
            store.state_of(child),
            ClockState::Stopped,
            "the sweep passed back below the child's begin"
        );
    }

    #[test]
    fn remove_detaches_the_subtree_and_notifies_once() {
        let mut store = ClockStore::new();
        let mut container = Timeline::group(vec![leaf(100), leaf(100)]);
        container.begin = Some(TimeSpan::ZERO);
        let root = store.instantiate(&container, true);

        tick(&mut store, 0);
        store.push_command(root, Command::Remove);
        store.push_command(root, Command::Remove);
        let changes = tick(&mut store, 10);
        assert_eq!(changes.remove_requested, vec![root], "one notification");
        assert_eq!(changes.removed.len(), 3, "root and both children reclaimed");
        assert!(!store.is_alive(root));
        assert!(store.was_removed(root));

        let changes = tick(&mut store, 20);
        assert!(changes.remove_requested.is_empty());
        assert!(changes.removed.is_empty());
    }

    // -- Sync sources --

    /// A hand-driven source; tests move `position` between ticks through the
    /// shared handle.
    #[derive(Debug)]
    struct ScriptedSource {
        duration: Option<TimeSpan>,
        position: Rc<Cell<TimeSpan>>,
        queries: Rc<Cell<u32>>,
    }

    impl ScriptedSource {
        fn new(duration_units: i64) -> (Self, Rc<Cell<TimeSpan>>, Rc<Cell<u32>>) {
            let position = Rc::new(Cell::new(TimeSpan::ZERO));
            let queries = Rc::new(Cell::new(0));
            let source = Self {
                duration: Some(TimeSpan(duration_units)),
                position: Rc::clone(&position),
                queries: Rc::clone(&queries),
            };
            (source, position, queries)
        }
    }

    impl SlipSource for ScriptedSource {
        fn duration(&self) -> Option<TimeSpan> {
            self.duration
        }

        fn position(&mut self, _now: TimePoint) -> TimeSpan {
            self.queries.set(self.queries.get() + 1);
            self.position.get()
        }
    }

    #[test]
    fn sync_leaf_tracks_its_source() {
        let mut store = ClockStore::new();
        let mut media = leaf(100);
        media.can_slip = true;
        media.begin = Some(TimeSpan::ZERO);
        let id = store.instantiate(&media, true);
        let (source, position, _) = ScriptedSource::new(100);
        position.set(TimeSpan(30));
        store.bind_slip_source(id, Box::new(source));

        tick(&mut store, 0);
        tick(&mut store, 60);
        assert_eq!(
            store.time_of(id),
            Some(TimeSpan(30)),
            "a bound sync leaf reports the source position, not arithmetic time"
        );
    }

    #[test]
    fn slip_container_shifts_sibling_windows() {
        let mut store = ClockStore::new();
        let mut media = leaf(100);
        media.can_slip = true;
        media.begin = Some(TimeSpan::ZERO);
        let mut sibling = leaf(40);
        sibling.begin = Some(TimeSpan(50));
        let mut container = Timeline::group(vec![media, sibling]);
        container.begin = Some(TimeSpan::ZERO);
        container.slip = SlipBehavior::Slip;
        let root = store.instantiate(&container, true);
        let kids: Vec<_> = store.children(root).collect();

        let (source, position, _) = ScriptedSource::new(100);
        store.bind_slip_source(kids[0], Box::new(source));

        tick(&mut store, 0);
        // The source has only reached 30 by wall time 60: the container's
        // local time slips back to track it.
        position.set(TimeSpan(30));
        tick(&mut store, 60);
        assert_eq!(
            store.time_of(root),
            Some(TimeSpan(30)),
            "container time locks to the governor's reported position"
        );
        assert_eq!(
            store.state_of(kids[1]),
            ClockState::Stopped,
            "the sibling's window slipped later along with the container"
        );

        // Once the source covers the gap, downstream windows open on cue.
        position.set(TimeSpan(55));
        tick(&mut store, 85);
        assert_eq!(store.time_of(root), Some(TimeSpan(55)));
        assert_eq!(store.state_of(kids[1]), ClockState::Active);
        assert_eq!(store.time_of(kids[1]), Some(TimeSpan(5)));
    }

    #[test]
    fn source_is_sampled_once_per_tick() {
        let mut store = ClockStore::new();
        let mut media = leaf(100);
        media.can_slip = true;
        media.begin = Some(TimeSpan::ZERO);
        let mut container = Timeline::group(vec![media]);
        container.begin = Some(TimeSpan::ZERO);
        container.slip = SlipBehavior::Slip;
        let root = store.instantiate(&container, true);
        let media_id = store.children(root).next().unwrap();
        let (source, _, queries) = ScriptedSource::new(100);
        store.bind_slip_source(media_id, Box::new(source));

        // First tick: only the leaf samples (the governor has not begun when
        // the container resolves). Second tick: the container's slip pass and
        // the leaf both ask, and the memo answers the second request.
        tick(&mut store, 0);
        assert_eq!(queries.get(), 1);
        tick(&mut store, 10);
        assert_eq!(queries.get(), 2, "one real query per tick");
    }

    #[test]
    fn grow_container_stays_open_for_a_late_source() {
        let mut store = ClockStore::new();
        let mut media = leaf(100);
        media.can_slip = true;
        media.begin = Some(TimeSpan::ZERO);
        let mut container = Timeline::group(vec![media]);
        container.begin = Some(TimeSpan::ZERO);
        container.slip = SlipBehavior::Grow;
        let root = store.instantiate(&container, true);
        let media_id = store.children(root).next().unwrap();

        let (source, position, _) = ScriptedSource::new(100);
        store.bind_slip_source(media_id, Box::new(source));

        tick(&mut store, 0);
        tick(&mut store, 110);
        assert_eq!(
            store.state_of(root),
            ClockState::Active,
            "the container outlives its natural end while the media runs"
        );

        // The media finally reports completion at wall time 130.
        position.set(TimeSpan(100));
        tick(&mut store, 130);
        tick(&mut store, 131);
        assert_eq!(
            store.state_of(root),
            ClockState::Stopped,
            "once the media ends the container ends at the present, not in the past"
        );
    }

    // -- Scheduling hints --

    #[test]
    fn boundary_hint_reports_the_scheduled_begin_then_the_end() {
        let mut store = ClockStore::new();
        let mut t = leaf(100);
        t.begin = Some(TimeSpan(100));
        store.instantiate(&t, true);
        assert!(store.has_pending_work(), "the first-tick anchor is pending");

        tick(&mut store, 0);
        assert_eq!(store.next_boundary(Some(TimePoint(0))), Some(TimePoint(100)));

        tick(&mut store, 100);
        assert_eq!(store.next_boundary(Some(TimePoint(100))), Some(TimePoint(200)));
    }

    #[test]
    fn boundary_hint_scales_with_the_speed_ratio() {
        let mut store = ClockStore::new();
        let mut t = leaf(100);
        t.begin = Some(TimeSpan::ZERO);
        t.speed_ratio = 2.0;
        store.instantiate(&t, true);

        tick(&mut store, 0);
        assert_eq!(
            store.next_boundary(Some(TimePoint(0))),
            Some(TimePoint(50)),
            "a double-speed clock covers its duration in half the wall time"
        );
    }

    #[test]
    fn paused_and_finished_clocks_report_no_boundary() {
        let mut store = ClockStore::new();
        let mut t = leaf(100);
        t.begin = Some(TimeSpan::ZERO);
        let id = store.instantiate(&t, true);

        tick(&mut store, 0);
        store.push_command(id, Command::Pause);
        tick(&mut store, 10);
        assert_eq!(store.next_boundary(Some(TimePoint(10))), None);
        assert!(
            !store.any_active_needs_ticks(),
            "a held clock does not ask for ticks"
        );

        store.push_command(id, Command::Resume);
        tick(&mut store, 20);
        assert!(store.any_active_needs_ticks());

        tick(&mut store, 200);
        assert_eq!(store.state_of(id), ClockState::Stopped);
        assert_eq!(store.next_boundary(Some(TimePoint(200))), None);
        assert!(!store.any_active_needs_ticks());
        assert!(!store.has_pending_work());
    }
}
