use crate::error::{CoreError, CoreResult};

/// Remaining delays at or below this are treated as elapsed.
pub const DUE_EPSILON: f64 = 1e-12;

/// Absolute and relative slack for comparing clocks and state values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerances {
    pub abs: f64,
    pub rel: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

/// `|a - b|` within `abs`, or within `rel` of the larger magnitude.
pub fn nearly_equal(a: f64, b: f64, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    diff <= tol.abs || diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(value: f64, what: &'static str) -> CoreResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CoreError::NonFinite { what, value })
    }
}

/// Finite and strictly greater than zero.
pub fn ensure_positive(value: f64, what: &'static str) -> CoreResult<f64> {
    match ensure_finite(value, what)? {
        v if v > 0.0 => Ok(v),
        v => Err(CoreError::NotPositive { what, value: v }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_drift_counts_as_equal() {
        let tol = Tolerances::default();
        let mut clock = 0.0;
        for _ in 0..10 {
            clock += 0.1;
        }
        assert!(nearly_equal(clock, 1.0, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn non_finite_time_steps_are_rejected() {
        let err = ensure_finite(f64::NAN, "time step").unwrap_err();
        assert!(err.to_string().contains("time step"));
        assert!(ensure_finite(-0.5, "time step").is_ok());
    }

    #[test]
    fn positive_guard() {
        assert_eq!(ensure_positive(0.5, "tau"), Ok(0.5));
        assert_eq!(
            ensure_positive(0.0, "tau"),
            Err(CoreError::NotPositive {
                what: "tau",
                value: 0.0
            })
        );
        assert!(matches!(
            ensure_positive(f64::INFINITY, "tau"),
            Err(CoreError::NonFinite { .. })
        ));
    }
}
