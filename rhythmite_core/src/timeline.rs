// Copyright 2026 the Rhythmite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Immutable scheduling descriptors.
//!
//! A [`Timeline`] describes *when* something should run: begin offset,
//! duration, repetition, reversal, fill, speed, and (for containers) an
//! ordered list of child timelines. Timelines are plain data — they hold no
//! runtime state and may be shared; instantiating one through
//! [`TimeManager::create_clock`](crate::manager::TimeManager::create_clock)
//! produces a live clock tree that snapshots the config.
//!
//! Configuration is checked once, up front: [`Timeline::validate`] rejects
//! malformed descriptors with a [`TimelineError`] before any clock exists.
//! Validation never clamps — a negative duration is a bug at the call site,
//! not something to round up to zero.

use alloc::vec::Vec;
use core::fmt;

use crate::time::TimeSpan;

/// How long one iteration of a timeline runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Duration {
    /// A fixed span.
    Timed(TimeSpan),
    /// Derived from content: a container takes it from its children via
    /// [`EndSync`]; a sync leaf takes it from its bound source; a plain leaf
    /// resolves to zero.
    #[default]
    Automatic,
    /// Never ends on its own.
    Forever,
}

/// How many times the active period repeats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RepeatBehavior {
    /// Repeat for a (possibly fractional) number of iterations.
    Count(f64),
    /// Repeat until a fixed wall span has elapsed, regardless of where in an
    /// iteration that lands.
    Span(TimeSpan),
    /// Repeat without end.
    Forever,
}

impl Default for RepeatBehavior {
    fn default() -> Self {
        Self::Count(1.0)
    }
}

/// What a clock does once its active period has elapsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FillBehavior {
    /// Return to `Stopped`; observable time/iteration become `None`.
    #[default]
    Stop,
    /// Hold the end values and report `Filling`.
    HoldLast,
}

/// How a container reacts to a sync child drifting off the arithmetic
/// schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SlipBehavior {
    /// Ignore the child's reported time for scheduling purposes.
    #[default]
    None,
    /// Shift the container's own position to track the child's reported
    /// progress.
    Slip,
    /// Extend the container's duration so a slow child is not clipped.
    Grow,
}

/// How a container with [`Duration::Automatic`] derives its natural end from
/// its children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EndSync {
    /// End with the child whose window ends last, latched at instantiation.
    /// Children that never begin or never end are skipped (they get clipped).
    #[default]
    LastChild,
    /// End only when every child has ended; any never-ending child makes the
    /// container run forever. Recomputed when a child is removed.
    AllChildren,
}

/// An immutable scheduling descriptor.
///
/// Construct with struct-update syntax over [`Timeline::new`]. Instantiation
/// validates the whole tree; [`Timeline::validate`] runs the same check
/// standalone:
///
/// ```
/// use rhythmite_core::time::TimeSpan;
/// use rhythmite_core::timeline::{Duration, Timeline};
///
/// let tl = Timeline {
///     begin: Some(TimeSpan(100)),
///     duration: Duration::Timed(TimeSpan(100)),
///     ..Timeline::new()
/// };
/// assert!(tl.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Timeline {
    /// Offset from the parent's active start at which this timeline begins.
    /// `None` means it never begins on its own (only an interactive begin
    /// can activate it). May be negative.
    pub begin: Option<TimeSpan>,
    /// Length of one iteration.
    pub duration: Duration,
    /// Whether each iteration plays forward then backward. Doubles the span
    /// of one iteration.
    pub auto_reverse: bool,
    /// Repetition of the (possibly doubled) iteration.
    pub repeat: RepeatBehavior,
    /// Post-active behavior.
    pub fill: FillBehavior,
    /// Local time multiplier. Must be finite and positive.
    pub speed_ratio: f64,
    /// Container reaction to sync-child drift. Meaningless on leaves.
    pub slip: SlipBehavior,
    /// Automatic-duration aggregation policy. Meaningless on leaves.
    pub end_sync: EndSync,
    /// Whether this clock's `current_time` must be recomputed on every tick
    /// while active (animation-like leaves), or only at boundary-significant
    /// ticks (containers, plain waits). Affects only the manager's
    /// `needs_tick` hint, never state transitions.
    pub needs_ticks_when_active: bool,
    /// Leaf may be bound to an external time source.
    pub can_slip: bool,
    /// Ordered child timelines. Non-empty makes this a container.
    pub children: Vec<Timeline>,
}

impl Timeline {
    /// A leaf timeline with the default schedule: begins with its parent,
    /// automatic duration, one iteration, stop on completion, unit speed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            begin: Some(TimeSpan::ZERO),
            duration: Duration::Automatic,
            auto_reverse: false,
            repeat: RepeatBehavior::Count(1.0),
            fill: FillBehavior::Stop,
            speed_ratio: 1.0,
            slip: SlipBehavior::None,
            end_sync: EndSync::LastChild,
            needs_ticks_when_active: true,
            can_slip: false,
            children: Vec::new(),
        }
    }

    /// A container timeline over the given children, otherwise default.
    #[must_use]
    pub fn group(children: Vec<Self>) -> Self {
        Self {
            children,
            ..Self::new()
        }
    }

    /// Whether this timeline is a container.
    #[must_use]
    pub fn is_group(&self) -> bool {
        !self.children.is_empty()
    }

    /// Checks this timeline and all descendants for malformed configuration.
    ///
    /// Returns the first error found, depth-first.
    pub fn validate(&self) -> Result<(), TimelineError> {
        if let Duration::Timed(d) = self.duration
            && d.is_negative()
        {
            return Err(TimelineError::NegativeDuration);
        }
        match self.repeat {
            RepeatBehavior::Count(c) if !(c.is_finite() && c > 0.0) => {
                return Err(TimelineError::InvalidRepeatCount);
            }
            RepeatBehavior::Span(s) if s.is_negative() => {
                return Err(TimelineError::NegativeRepeatSpan);
            }
            _ => {}
        }
        if !(self.speed_ratio.is_finite() && self.speed_ratio > 0.0) {
            return Err(TimelineError::InvalidSpeedRatio);
        }
        if self.children.is_empty() {
            if self.slip != SlipBehavior::None {
                return Err(TimelineError::SlipOnLeaf);
            }
        } else {
            if self.can_slip {
                return Err(TimelineError::CanSlipOnGroup);
            }
            if self.slip != SlipBehavior::None && self.auto_reverse {
                return Err(TimelineError::SlipWithAutoReverse);
            }
            if self.slip != SlipBehavior::None
                && let Some(sync_child) = self.children.iter().find(|c| c.can_slip)
                && sync_child.begin.is_some_and(TimeSpan::is_negative)
            {
                return Err(TimelineError::NegativeSlipBegin);
            }
        }
        for child in &self.children {
            child.validate()?;
        }
        Ok(())
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

/// A malformed [`Timeline`] configuration, reported before any clock is
/// created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum TimelineError {
    /// `Duration::Timed` with a negative span.
    NegativeDuration,
    /// `RepeatBehavior::Count` that is not finite and positive.
    InvalidRepeatCount,
    /// `RepeatBehavior::Span` with a negative span.
    NegativeRepeatSpan,
    /// `speed_ratio` that is not finite and positive.
    InvalidSpeedRatio,
    /// `slip` set on a timeline without children.
    SlipOnLeaf,
    /// `can_slip` set on a timeline with children.
    CanSlipOnGroup,
    /// `Slip`/`Grow` on a container that auto-reverses; a reversing axis
    /// cannot coherently track a forward-only source.
    SlipWithAutoReverse,
    /// `Slip`/`Grow` on a container whose governing sync child begins in the
    /// past; the slip offset would be circular.
    NegativeSlipBegin,
}

impl fmt::Display for TimelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::NegativeDuration => "timeline duration must not be negative",
            Self::InvalidRepeatCount => "repeat count must be finite and positive",
            Self::NegativeRepeatSpan => "repeat span must not be negative",
            Self::InvalidSpeedRatio => "speed ratio must be finite and positive",
            Self::SlipOnLeaf => "slip behavior requires a container timeline",
            Self::CanSlipOnGroup => "can_slip applies to leaf timelines only",
            Self::SlipWithAutoReverse => "slip behavior cannot be combined with auto_reverse",
            Self::NegativeSlipBegin => {
                "a sync child of a slipping container cannot begin in the past"
            }
        };
        f.write_str(msg)
    }
}

impl core::error::Error for TimelineError {}
