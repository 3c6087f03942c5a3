// Copyright 2026 the Rhythmite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Timeline time values and unit conversion.
//!
//! [`TimePoint`] represents an instant on a time axis — the manager's global
//! axis, or a parent clock's local axis — in integer timeline units. The unit
//! itself is chosen by the host (tests use milliseconds); the engine only
//! requires that one axis uses one unit consistently.
//!
//! [`TimeSpan`] represents a signed distance between two instants in the same
//! units. Begin offsets may be negative (a clock scheduled to have begun in
//! the past), so both types are signed.
//!
//! [`Timebase`] carries the rational conversion factor from timeline units to
//! nanoseconds, matching the `mach_timebase_info` pattern (numer/denom
//! converts units → nanoseconds). Drivers use it to translate platform clocks
//! into timeline units; the trace exporters use it to emit microseconds.
//! All conversion arithmetic uses `i128` intermediates to avoid overflow.

use core::fmt;
use core::ops::{Add, Neg, Sub};

/// An instant on a time axis, in integer timeline units.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimePoint(pub i64);

impl TimePoint {
    /// The axis origin.
    pub const ZERO: Self = Self(0);

    /// Returns the raw unit value.
    #[inline]
    #[must_use]
    pub const fn units(self) -> i64 {
        self.0
    }

    /// Returns the span from `earlier` to `self` (negative if `earlier` is
    /// actually later).
    #[inline]
    #[must_use]
    pub const fn span_since(self, earlier: Self) -> TimeSpan {
        TimeSpan(self.0 - earlier.0)
    }

    /// Checked addition of a span.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, span: TimeSpan) -> Option<Self> {
        match self.0.checked_add(span.0) {
            Some(t) => Some(Self(t)),
            None => None,
        }
    }

    /// Checked subtraction of a span.
    #[inline]
    #[must_use]
    pub const fn checked_sub(self, span: TimeSpan) -> Option<Self> {
        match self.0.checked_sub(span.0) {
            Some(t) => Some(Self(t)),
            None => None,
        }
    }

    /// Returns the later of two instants.
    #[inline]
    #[must_use]
    pub const fn max(self, other: Self) -> Self {
        if self.0 >= other.0 { self } else { other }
    }

    /// Returns the earlier of two instants.
    #[inline]
    #[must_use]
    pub const fn min(self, other: Self) -> Self {
        if self.0 <= other.0 { self } else { other }
    }
}

impl Add<TimeSpan> for TimePoint {
    type Output = Self;

    #[inline]
    fn add(self, rhs: TimeSpan) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub<TimeSpan> for TimePoint {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: TimeSpan) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Sub for TimePoint {
    type Output = TimeSpan;

    #[inline]
    fn sub(self, rhs: Self) -> TimeSpan {
        TimeSpan(self.0 - rhs.0)
    }
}

impl fmt::Debug for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimePoint({})", self.0)
    }
}

/// A signed span between two instants, in timeline units.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeSpan(pub i64);

impl TimeSpan {
    /// A zero-length span.
    pub const ZERO: Self = Self(0);

    /// Returns the raw unit value.
    #[inline]
    #[must_use]
    pub const fn units(self) -> i64 {
        self.0
    }

    /// Whether this span is negative.
    #[inline]
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Saturating addition.
    #[inline]
    #[must_use]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Saturating subtraction.
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Clamps this span to `[lo, hi]`.
    #[inline]
    #[must_use]
    pub const fn clamp(self, lo: Self, hi: Self) -> Self {
        assert!(lo.0 <= hi.0, "clamp bounds inverted");
        if self.0 < lo.0 {
            lo
        } else if self.0 > hi.0 {
            hi
        } else {
            self
        }
    }

    /// Returns the larger of two spans.
    #[inline]
    #[must_use]
    pub const fn max(self, other: Self) -> Self {
        if self.0 >= other.0 { self } else { other }
    }

    /// Returns the smaller of two spans.
    #[inline]
    #[must_use]
    pub const fn min(self, other: Self) -> Self {
        if self.0 <= other.0 { self } else { other }
    }

    /// This span as an `f64`, for speed-ratio arithmetic.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "timeline units stay far below 2^53 in practice; ratio math is defined in f64"
    )]
    pub const fn to_f64(self) -> f64 {
        self.0 as f64
    }

    /// Builds a span from an `f64` unit value, rounding to nearest.
    ///
    /// Out-of-range values saturate at the `i64` bounds.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "the float-to-int cast saturates by definition; rounding happens first"
    )]
    pub fn from_f64(units: f64) -> Self {
        Self(libm::round(units) as i64)
    }
}

impl Add for TimeSpan {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for TimeSpan {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Neg for TimeSpan {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl fmt::Debug for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimeSpan({})", self.0)
    }
}

/// Rational conversion factor from timeline units to nanoseconds.
///
/// `nanoseconds = units * numer / denom`
///
/// This matches the `mach_timebase_info` pattern. A host that ticks the
/// engine in milliseconds uses `Timebase::MILLIS`; a host feeding raw
/// platform ticks picks the platform's ratio.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timebase {
    /// Numerator of the units-to-nanoseconds ratio.
    pub numer: u32,
    /// Denominator of the units-to-nanoseconds ratio.
    pub denom: u32,
}

impl Timebase {
    /// A timebase where units are already nanoseconds (1:1).
    pub const NANOS: Self = Self { numer: 1, denom: 1 };

    /// A timebase where units are milliseconds.
    pub const MILLIS: Self = Self {
        numer: 1_000_000,
        denom: 1,
    };

    /// Creates a new timebase with the given numerator and denominator.
    ///
    /// # Panics
    ///
    /// Panics if `denom` is zero.
    #[inline]
    #[must_use]
    pub const fn new(numer: u32, denom: u32) -> Self {
        assert!(denom != 0, "timebase denominator must not be zero");
        Self { numer, denom }
    }

    /// Converts a unit count to nanoseconds.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "i128 intermediate avoids overflow; truncation back to i64 is intentional"
    )]
    pub const fn units_to_nanos(self, units: i64) -> i64 {
        let wide = units as i128 * self.numer as i128 / self.denom as i128;
        wide as i64
    }

    /// Converts nanoseconds to a unit count.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "i128 intermediate avoids overflow; truncation back to i64 is intentional"
    )]
    pub const fn nanos_to_units(self, nanos: i64) -> i64 {
        let wide = nanos as i128 * self.denom as i128 / self.numer as i128;
        wide as i64
    }
}

impl fmt::Debug for Timebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timebase({}/{})", self.numer, self.denom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nanos_round_trip_identity_timebase() {
        let tb = Timebase::NANOS;
        assert_eq!(tb.units_to_nanos(1_000_000_000), 1_000_000_000, "identity timebase");
        assert_eq!(tb.nanos_to_units(1_000_000_000), 1_000_000_000);
    }

    #[test]
    fn millis_timebase() {
        let tb = Timebase::MILLIS;
        assert_eq!(tb.units_to_nanos(250), 250_000_000, "250 ms → 250e6 ns");
        assert_eq!(tb.nanos_to_units(250_000_000), 250);
    }

    #[test]
    fn signed_conversion() {
        // Negative begin offsets travel through the same conversion.
        let tb = Timebase::new(125, 3);
        let nanos = tb.units_to_nanos(-24_000_000);
        assert_eq!(nanos, -1_000_000_000, "sign survives the rational scale");
    }

    #[test]
    fn overflow_safe_conversion() {
        // Large value that would overflow i64 if multiplied naively.
        let tb = Timebase::new(125, 3);
        let _nanos = tb.units_to_nanos(i64::MAX / 2);
    }

    #[test]
    fn span_arithmetic() {
        let a = TimeSpan(100);
        let b = TimeSpan(30);
        assert_eq!((a + b).units(), 130);
        assert_eq!((a - b).units(), 70);
        assert_eq!(-a, TimeSpan(-100));
        assert_eq!(TimeSpan(-50).saturating_add(TimeSpan(20)), TimeSpan(-30));
    }

    #[test]
    fn span_clamp() {
        let lo = TimeSpan::ZERO;
        let hi = TimeSpan(100);
        assert_eq!(TimeSpan(-5).clamp(lo, hi), lo);
        assert_eq!(TimeSpan(50).clamp(lo, hi), TimeSpan(50));
        assert_eq!(TimeSpan(150).clamp(lo, hi), hi);
    }

    #[test]
    fn point_span_ops() {
        let t = TimePoint(1000);
        let d = TimeSpan(200);
        assert_eq!((t + d).units(), 1200);
        assert_eq!((t - d).units(), 800);
        assert_eq!(t.span_since(TimePoint(400)), TimeSpan(600));
        assert_eq!(t.span_since(TimePoint(1500)), TimeSpan(-500), "spans are signed");
    }

    #[test]
    fn span_float_round_trip() {
        assert_eq!(TimeSpan::from_f64(99.5), TimeSpan(100), "round to nearest");
        assert_eq!(TimeSpan::from_f64(-0.4), TimeSpan::ZERO);
        assert_eq!(TimeSpan(1234).to_f64(), 1234.0);
    }
}
