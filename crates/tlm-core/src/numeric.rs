use crate::CoreError;

/// Floating point type used for every node slot and parameter.
pub type Real = f64;

/// Absolute/relative tolerance pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

impl Tolerances {
    pub const fn new(abs: Real, rel: Real) -> Self {
        Self { abs, rel }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    diff <= tol.abs || diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, CoreError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(CoreError::NotPositive { what, value: v })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_uses_either_bound() {
        let tol = Tolerances::new(1.0, 1e-3);
        assert!(nearly_equal(1e5, 1e5 + 50.0, tol));
        assert!(nearly_equal(0.0, 0.5, tol));
        assert!(!nearly_equal(1e5, 1.2e5, tol));
    }

    #[test]
    fn ensure_positive_rejects_zero_and_nan() {
        assert!(ensure_positive(2.0, "volume").is_ok());
        assert_eq!(
            ensure_positive(0.0, "volume"),
            Err(CoreError::NotPositive {
                what: "volume",
                value: 0.0
            })
        );
        let msg = ensure_positive(Real::NAN, "volume").unwrap_err().to_string();
        assert!(msg.contains("Non-finite"));
    }
}
