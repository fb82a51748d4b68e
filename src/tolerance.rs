//! The comparison tolerance used for all approximate equality checks.
//!
//! Monetary values accumulate floating-point error through growth factors
//! and row reduction, so every "is this zero" question in the crate goes
//! through a [`Tolerance`]. A process-wide default can be configured once
//! with [`set_default_tolerance`]; components capture the tolerance as an
//! explicit value at construction time, so changing the default later does
//! not affect objects that already exist.

use std::sync::atomic::{AtomicU64, Ordering};

/// Comparison tolerance, guaranteed to be in `(0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerance(f64);

/// The tolerance used when nothing else is configured.
pub const DEFAULT_TOLERANCE: f64 = 1e-3;

static PROCESS_DEFAULT: AtomicU64 = AtomicU64::new(u64::MAX);

impl Tolerance {
    /// Build a tolerance from a raw value.
    ///
    /// Returns `None` unless `0 < value <= 1` and the value is finite.
    pub fn new(value: f64) -> Option<Tolerance> {
        if value.is_finite() && value > 0.0 && value <= 1.0 {
            Some(Tolerance(value))
        } else {
            None
        }
    }

    pub fn get(&self) -> f64 {
        self.0
    }

    /// Is *value* indistinguishable from zero?
    pub fn is_zero(&self, value: f64) -> bool {
        value.abs() <= self.0
    }

    /// Are *a* and *b* indistinguishable?
    pub fn approx_eq(&self, a: f64, b: f64) -> bool {
        self.is_zero(a - b)
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance(default_tolerance())
    }
}

/// Set the process-wide default tolerance.
///
/// Values outside `(0, 1]`, infinities and NaN are silently ignored and
/// leave the previous default in place. Configure this before building
/// graphs and solvers: objects capture the default when constructed.
pub fn set_default_tolerance(value: f64) {
    if let Some(tolerance) = Tolerance::new(value) {
        PROCESS_DEFAULT.store(tolerance.0.to_bits(), Ordering::Relaxed);
    }
}

/// The current process-wide default tolerance.
pub fn default_tolerance() -> f64 {
    let bits = PROCESS_DEFAULT.load(Ordering::Relaxed);
    if bits == u64::MAX {
        DEFAULT_TOLERANCE
    } else {
        f64::from_bits(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admissible_range() {
        assert!(Tolerance::new(1e-6).is_some());
        assert!(Tolerance::new(1.0).is_some());
        assert!(Tolerance::new(0.0).is_none());
        assert!(Tolerance::new(-1e-3).is_none());
        assert!(Tolerance::new(1.5).is_none());
        assert!(Tolerance::new(f64::NAN).is_none());
        assert!(Tolerance::new(f64::INFINITY).is_none());
    }

    #[test]
    fn test_zero_and_equality_checks() {
        let tolerance = Tolerance::new(1e-3).expect("test");
        assert!(tolerance.is_zero(0.0));
        assert!(tolerance.is_zero(-1e-4));
        assert!(!tolerance.is_zero(2e-3));
        assert!(tolerance.approx_eq(1.0, 1.0005));
        assert!(!tolerance.approx_eq(1.0, 1.01));
    }

    #[test]
    fn test_invalid_default_is_ignored() {
        let before = default_tolerance();
        set_default_tolerance(f64::NAN);
        set_default_tolerance(-3.0);
        set_default_tolerance(2.0);
        assert_eq!(default_tolerance(), before);
    }
}
