// Copyright 2026 the Rhythmite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pure local-time projection math.
//!
//! Given a clock's accumulated local time (parent-relative, speed-applied,
//! clamped to its active period), these helpers fold it into the observable
//! tuple: 1-based iteration, time within the current iteration, progress in
//! `[0, 1]`, and direction. All repeat/auto-reverse arithmetic lives here so
//! the tick pass stays a traversal, and so the folding rules — including the
//! zero-width cases — are testable without a store.
//!
//! With `auto_reverse`, one iteration spans twice the configured duration
//! (forward then backward); fractional repeat counts apply to that doubled
//! span, which is what makes a 0.3-count reversed clock rest at progress 0.6
//! rather than 0.3.

use crate::time::TimeSpan;
use crate::timeline::RepeatBehavior;

/// An iteration duration after `Automatic` has been resolved away.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum IterDuration {
    /// One iteration runs for this span (possibly zero).
    Finite(TimeSpan),
    /// One iteration never ends.
    Forever,
}

/// The observable position within an active period.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Projection {
    /// 1-based iteration number.
    pub(crate) iteration: u64,
    /// Time within the current iteration, after reversal folding. Runs
    /// `0 → d` forward and `d → 0` during a reversed phase.
    pub(crate) time: TimeSpan,
    /// `time / duration`, or the documented constant for zero-width clocks.
    pub(crate) progress: f64,
    /// Whether the clock is currently in a reversed phase.
    pub(crate) reversed: bool,
}

/// The span one iteration occupies on the local axis.
#[inline]
pub(crate) fn iteration_span(d: TimeSpan, auto_reverse: bool) -> TimeSpan {
    if auto_reverse { TimeSpan(d.0 * 2) } else { d }
}

/// Total length of the active period on the local axis, or `None` when the
/// clock never expires on its own.
///
/// A zero-width iteration always yields a zero total: the clock completes
/// the instant it begins, whatever the repeat behavior says.
pub(crate) fn total_active(
    d: IterDuration,
    auto_reverse: bool,
    repeat: RepeatBehavior,
) -> Option<TimeSpan> {
    match d {
        IterDuration::Forever => match repeat {
            // A wall-span repeat bounds even an endless iteration.
            RepeatBehavior::Span(s) => Some(s),
            RepeatBehavior::Count(_) | RepeatBehavior::Forever => None,
        },
        IterDuration::Finite(d) if d == TimeSpan::ZERO => Some(TimeSpan::ZERO),
        IterDuration::Finite(d) => match repeat {
            RepeatBehavior::Count(c) => {
                let span = iteration_span(d, auto_reverse);
                Some(TimeSpan::from_f64(span.to_f64() * c))
            }
            RepeatBehavior::Span(s) => Some(s),
            RepeatBehavior::Forever => None,
        },
    }
}

/// Folds an accumulated local time into the observable position.
///
/// `local` must already be clamped to `[0, total_active]`; `at_end` selects
/// the expiry projection (the final, possibly fractional iteration) and is
/// ignored when the repeat never ends.
pub(crate) fn project(
    d: IterDuration,
    auto_reverse: bool,
    repeat: RepeatBehavior,
    local: TimeSpan,
    at_end: bool,
) -> Projection {
    let d = match d {
        IterDuration::Forever => {
            // One endless iteration; progress against an unbounded duration
            // is reported as 0.
            return Projection {
                iteration: 1,
                time: local,
                progress: 0.0,
                reversed: false,
            };
        }
        IterDuration::Finite(d) => d,
    };

    if d == TimeSpan::ZERO {
        return zero_width(auto_reverse, repeat);
    }

    let span = iteration_span(d, auto_reverse);
    let total = total_active(IterDuration::Finite(d), auto_reverse, repeat);
    let (iteration, w) = match total {
        // Ceiling division: the final iteration may be fractional.
        Some(total) if at_end => {
            let iteration = ((total.0 + span.0 - 1) / span.0).max(1);
            (iteration, total - TimeSpan((iteration - 1) * span.0))
        }
        // In flight. An endless repeat has no end to project.
        _ => {
            let iteration = local.0 / span.0 + 1;
            (iteration, local - TimeSpan((iteration - 1) * span.0))
        }
    };

    let (time, reversed) = if auto_reverse && w > d {
        (span - w, true)
    } else {
        (w, false)
    };

    #[expect(
        clippy::cast_sign_loss,
        reason = "iteration is computed from non-negative clamped local time"
    )]
    let iteration = iteration as u64;

    Projection {
        iteration,
        time,
        progress: time.to_f64() / d.to_f64(),
        reversed,
    }
}

/// The zero-width resting position.
///
/// A zero-duration clock is active for zero width but still occupies its
/// iterations; the fractional part of a repeat count decides where in the
/// (possibly doubled) final iteration it comes to rest:
///
/// - forward: fraction `f` rests at progress `f` (a whole count rests at 1).
/// - auto-reverse: the fraction covers `2f` of the up-then-down sweep, so it
///   rests at `2f` on the way up or `2 - 2f` on the way down (a whole count
///   rests at 0).
fn zero_width(auto_reverse: bool, repeat: RepeatBehavior) -> Projection {
    let count = match repeat {
        RepeatBehavior::Count(c) => c,
        // Wall-span and endless repeats of a zero-width iteration complete
        // as a single whole iteration.
        RepeatBehavior::Span(_) | RepeatBehavior::Forever => 1.0,
    };

    let fraction = count - libm::floor(count);
    #[expect(
        clippy::cast_sign_loss,
        clippy::cast_possible_truncation,
        reason = "validation guarantees a finite positive count"
    )]
    let iteration = (libm::ceil(count) as u64).max(1);

    let progress = if auto_reverse {
        if fraction == 0.0 {
            0.0
        } else {
            let sweep = 2.0 * fraction;
            if sweep <= 1.0 { sweep } else { 2.0 - sweep }
        }
    } else if fraction == 0.0 {
        1.0
    } else {
        fraction
    };

    Projection {
        iteration,
        time: TimeSpan::ZERO,
        progress,
        reversed: false,
    }
}
