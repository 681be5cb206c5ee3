//! Bilinear-transform transfer functions.
//!
//! Polynomial coefficients are given in ascending powers of `s`:
//! `num = [a0, a1]` means `a1·s + a0`. Inputs and outputs are clamped to
//! [`Limits`]; a clamped output sets the saturation flag.
//!
//! The fixed-timestep types can snapshot their delayed samples with
//! [`backup`](FirstOrderTransferFunction::backup) and roll back with
//! [`restore_backup`](FirstOrderTransferFunction::restore_backup), which lets a
//! component retry a step after rejecting its result.

use tlm_core::Real;

use crate::delay::Delay;
use crate::error::{FilterError, FilterResult};

/// Output bounds of a transfer function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    pub min: Real,
    pub max: Real,
}

impl Limits {
    pub const UNBOUNDED: Limits = Limits {
        min: Real::NEG_INFINITY,
        max: Real::INFINITY,
    };

    pub fn new(min: Real, max: Real) -> FilterResult<Self> {
        if !(min < max) {
            return Err(FilterError::InvalidLimits { min, max });
        }
        Ok(Self { min, max })
    }

    /// Clamp `value`, returning whether it hit a bound.
    pub fn clamp(&self, value: Real) -> (Real, bool) {
        if value >= self.max {
            (self.max, true)
        } else if value <= self.min {
            (self.min, true)
        } else {
            (value, false)
        }
    }

    fn contain(&self, value: Real) -> Real {
        value.min(self.max).max(self.min)
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

fn check_timestep(timestep: Real) -> FilterResult<()> {
    if timestep > 0.0 && timestep.is_finite() {
        Ok(())
    } else {
        Err(FilterError::NonPositiveTimestep { value: timestep })
    }
}

fn first_order_coefficients(poly: [Real; 2], t: Real) -> [Real; 2] {
    [poly[0] * t - 2.0 * poly[1], poly[0] * t + 2.0 * poly[1]]
}

fn second_order_coefficients(poly: [Real; 3], t: Real) -> [Real; 3] {
    let t2 = t * t;
    [
        poly[0] * t2 + 2.0 * poly[1] * t + 4.0 * poly[2],
        2.0 * poly[0] * t2 - 8.0 * poly[2],
        poly[0] * t2 - 2.0 * poly[1] * t + 4.0 * poly[2],
    ]
}

fn check_leading(coeff: Real) -> FilterResult<()> {
    if coeff == 0.0 || !coeff.is_finite() {
        Err(FilterError::ZeroDenominator)
    } else {
        Ok(())
    }
}

fn backup_index(n: usize, available: usize) -> FilterResult<usize> {
    if n == 0 {
        return Err(FilterError::InvalidArg {
            what: "restore_backup counts from 1",
        });
    }
    if n > available {
        return Err(FilterError::BackupOutOfRange {
            requested: n,
            available,
        });
    }
    Ok(n - 1)
}

/// `G(s) = (a1·s + a0) / (b1·s + b0)` at a fixed timestep.
#[derive(Debug, Clone, PartialEq)]
pub struct FirstOrderTransferFunction {
    timestep: Real,
    coeff_u: [Real; 2],
    coeff_y: [Real; 2],
    delayed_u: Real,
    delayed_y: Real,
    value: Real,
    limits: Limits,
    saturated: bool,
    backups: Delay<[Real; 2]>,
}

impl FirstOrderTransferFunction {
    pub fn new(
        timestep: Real,
        num: [Real; 2],
        den: [Real; 2],
        u0: Real,
        y0: Real,
        limits: Limits,
    ) -> FilterResult<Self> {
        check_timestep(timestep)?;
        let delayed_y = limits.contain(y0);
        let mut tf = Self {
            timestep,
            coeff_u: [0.0; 2],
            coeff_y: [0.0; 2],
            delayed_u: u0,
            delayed_y,
            value: y0,
            limits,
            saturated: false,
            backups: Delay::new(1, [u0, delayed_y]),
        };
        tf.set_num_den(num, den)?;
        Ok(tf)
    }

    /// Low-pass filter `1 / (s/wc + 1)`.
    pub fn low_pass(timestep: Real, wc: Real, u0: Real, y0: Real, limits: Limits) -> FilterResult<Self> {
        if !(wc > 0.0) {
            return Err(FilterError::InvalidArg {
                what: "break frequency must be positive",
            });
        }
        Self::new(timestep, [1.0, 0.0], [1.0, 1.0 / wc], u0, y0, limits)
    }

    pub fn set_num_den(&mut self, num: [Real; 2], den: [Real; 2]) -> FilterResult<()> {
        let coeff_y = first_order_coefficients(den, self.timestep);
        check_leading(coeff_y[1])?;
        self.coeff_u = first_order_coefficients(num, self.timestep);
        self.coeff_y = coeff_y;
        Ok(())
    }

    pub fn set_limits(&mut self, limits: Limits) {
        self.limits = limits;
    }

    pub fn initialize_values(&mut self, u0: Real, y0: Real) {
        self.delayed_u = u0;
        self.delayed_y = y0;
        self.value = y0;
    }

    pub fn update(&mut self, u: Real) -> Real {
        let raw = (self.coeff_u[1] * u + self.coeff_u[0] * self.delayed_u
            - self.coeff_y[0] * self.delayed_y)
            / self.coeff_y[1];
        let (value, saturated) = self.limits.clamp(raw);
        self.value = value;
        self.saturated = saturated;
        self.delayed_y = value;
        self.delayed_u = u;
        value
    }

    pub fn update_with_backup(&mut self, u: Real) -> Real {
        self.backup();
        self.update(u)
    }

    pub fn backup(&mut self) {
        self.backups.update([self.delayed_u, self.delayed_y]);
    }

    /// Revert the delayed samples to the `n`-th most recent backup.
    pub fn restore_backup(&mut self, n: usize) -> FilterResult<()> {
        let idx = backup_index(n, self.backups.len())?;
        if let Some([u, y]) = self.backups.get(idx) {
            self.delayed_u = u;
            self.delayed_y = y;
        }
        Ok(())
    }

    pub fn set_backup_length(&mut self, n: usize) -> FilterResult<()> {
        if n == 0 {
            return Err(FilterError::ZeroBackupLength);
        }
        self.backups = Delay::new(n, [self.delayed_u, self.delayed_y]);
        Ok(())
    }

    pub fn value(&self) -> Real {
        self.value
    }

    pub fn set_value(&mut self, value: Real) {
        self.value = value;
    }

    pub fn delayed_u(&self) -> Real {
        self.delayed_u
    }

    pub fn delayed_y(&self) -> Real {
        self.delayed_y
    }

    pub fn is_saturated(&self) -> bool {
        self.saturated
    }

    pub fn timestep(&self) -> Real {
        self.timestep
    }

    /// Break frequency of a filter built with [`low_pass`](Self::low_pass).
    pub fn break_frequency(&self) -> Real {
        4.0 / (self.coeff_y[1] - self.coeff_y[0])
    }
}

/// `G(s) = (a2·s² + a1·s + a0) / (b2·s² + b1·s + b0)` at a fixed timestep.
#[derive(Debug, Clone, PartialEq)]
pub struct SecondOrderTransferFunction {
    timestep: Real,
    coeff_u: [Real; 3],
    coeff_y: [Real; 3],
    delayed_u: [Real; 2],
    delayed_y: [Real; 2],
    value: Real,
    limits: Limits,
    saturated: bool,
    backups: Delay<[Real; 4]>,
}

impl SecondOrderTransferFunction {
    pub fn new(
        timestep: Real,
        num: [Real; 3],
        den: [Real; 3],
        u0: Real,
        y0: Real,
        limits: Limits,
    ) -> FilterResult<Self> {
        check_timestep(timestep)?;
        let y = limits.contain(y0);
        let mut tf = Self {
            timestep,
            coeff_u: [0.0; 3],
            coeff_y: [0.0; 3],
            delayed_u: [u0, u0],
            delayed_y: [y, y],
            value: y0,
            limits,
            saturated: false,
            backups: Delay::new(1, [u0, u0, y, y]),
        };
        tf.set_num_den(num, den)?;
        Ok(tf)
    }

    /// Low-pass filter `w² / (s² + 2·d·w·s + w²)`.
    pub fn low_pass(
        timestep: Real,
        w: Real,
        damping: Real,
        u0: Real,
        y0: Real,
        limits: Limits,
    ) -> FilterResult<Self> {
        if !(w > 0.0) {
            return Err(FilterError::InvalidArg {
                what: "natural frequency must be positive",
            });
        }
        let den = [1.0, 2.0 * damping / w, 1.0 / (w * w)];
        Self::new(timestep, [1.0, 0.0, 0.0], den, u0, y0, limits)
    }

    pub fn set_num_den(&mut self, num: [Real; 3], den: [Real; 3]) -> FilterResult<()> {
        let coeff_y = second_order_coefficients(den, self.timestep);
        check_leading(coeff_y[0])?;
        self.coeff_u = second_order_coefficients(num, self.timestep);
        self.coeff_y = coeff_y;
        Ok(())
    }

    pub fn set_limits(&mut self, limits: Limits) {
        self.limits = limits;
    }

    pub fn initialize_values(&mut self, u0: Real, y0: Real) {
        self.delayed_u = [u0, u0];
        self.delayed_y = [y0, y0];
        self.value = y0;
    }

    pub fn update(&mut self, u: Real) -> Real {
        let [cu0, cu1, cu2] = self.coeff_u;
        let [cy0, cy1, cy2] = self.coeff_y;
        let raw = (cu0 * u + cu1 * self.delayed_u[0] + cu2 * self.delayed_u[1]
            - cy1 * self.delayed_y[0]
            - cy2 * self.delayed_y[1])
            / cy0;
        let (value, saturated) = self.limits.clamp(raw);
        self.value = value;
        self.saturated = saturated;
        self.delayed_u = [u, self.delayed_u[0]];
        self.delayed_y = [value, self.delayed_y[0]];
        value
    }

    pub fn update_with_backup(&mut self, u: Real) -> Real {
        self.backup();
        self.update(u)
    }

    pub fn backup(&mut self) {
        let [u1, u2] = self.delayed_u;
        let [y1, y2] = self.delayed_y;
        self.backups.update([u1, u2, y1, y2]);
    }

    pub fn restore_backup(&mut self, n: usize) -> FilterResult<()> {
        let idx = backup_index(n, self.backups.len())?;
        if let Some([u1, u2, y1, y2]) = self.backups.get(idx) {
            self.delayed_u = [u1, u2];
            self.delayed_y = [y1, y2];
        }
        Ok(())
    }

    pub fn set_backup_length(&mut self, n: usize) -> FilterResult<()> {
        if n == 0 {
            return Err(FilterError::ZeroBackupLength);
        }
        let [u1, u2] = self.delayed_u;
        let [y1, y2] = self.delayed_y;
        self.backups = Delay::new(n, [u1, u2, y1, y2]);
        Ok(())
    }

    pub fn value(&self) -> Real {
        self.value
    }

    pub fn set_value(&mut self, value: Real) {
        self.value = value;
    }

    /// `[u(k-1), u(k-2)]`
    pub fn delayed_u(&self) -> [Real; 2] {
        self.delayed_u
    }

    /// `[y(k-1), y(k-2)]`
    pub fn delayed_y(&self) -> [Real; 2] {
        self.delayed_y
    }

    pub fn is_saturated(&self) -> bool {
        self.saturated
    }
}

/// First order transfer function whose timestep is supplied on every update.
///
/// Coefficients are recomputed whenever the timestep changes. On saturation
/// both delayed samples are pinned to the bound.
#[derive(Debug, Clone, PartialEq)]
pub struct FirstOrderTransferFunctionVariable {
    num: [Real; 2],
    den: [Real; 2],
    timestep: Real,
    coeff_u: [Real; 2],
    coeff_y: [Real; 2],
    delayed_u: Real,
    delayed_y: Real,
    value: Real,
    limits: Limits,
}

impl FirstOrderTransferFunctionVariable {
    pub fn new(
        timestep: Real,
        num: [Real; 2],
        den: [Real; 2],
        u0: Real,
        y0: Real,
        limits: Limits,
    ) -> FilterResult<Self> {
        check_timestep(timestep)?;
        let mut tf = Self {
            num,
            den,
            timestep,
            coeff_u: [0.0; 2],
            coeff_y: [0.0; 2],
            delayed_u: u0,
            delayed_y: limits.contain(y0),
            value: y0,
            limits,
        };
        tf.set_num_den(num, den)?;
        Ok(tf)
    }

    pub fn set_num_den(&mut self, num: [Real; 2], den: [Real; 2]) -> FilterResult<()> {
        let coeff_y = first_order_coefficients(den, self.timestep);
        check_leading(coeff_y[1])?;
        self.num = num;
        self.den = den;
        self.coeff_u = first_order_coefficients(num, self.timestep);
        self.coeff_y = coeff_y;
        Ok(())
    }

    fn retime(&mut self, timestep: Real) {
        if timestep == self.timestep || check_timestep(timestep).is_err() {
            return;
        }
        let coeff_y = first_order_coefficients(self.den, timestep);
        if check_leading(coeff_y[1]).is_ok() {
            self.timestep = timestep;
            self.coeff_u = first_order_coefficients(self.num, timestep);
            self.coeff_y = coeff_y;
        }
    }

    pub fn initialize_values(&mut self, u0: Real, y0: Real) {
        self.delayed_u = u0;
        self.delayed_y = y0;
        self.value = y0;
    }

    pub fn update(&mut self, u: Real, timestep: Real) -> Real {
        self.retime(timestep);
        let value = (self.coeff_u[1] * u + self.coeff_u[0] * self.delayed_u
            - self.coeff_y[0] * self.delayed_y)
            / self.coeff_y[1];
        if value > self.limits.max {
            self.pin(self.limits.max)
        } else if value < self.limits.min {
            self.pin(self.limits.min)
        } else {
            self.delayed_y = value;
            self.delayed_u = u;
            self.value = value;
            value
        }
    }

    fn pin(&mut self, bound: Real) -> Real {
        self.delayed_u = bound;
        self.delayed_y = bound;
        self.value = bound;
        bound
    }

    pub fn value(&self) -> Real {
        self.value
    }

    pub fn timestep(&self) -> Real {
        self.timestep
    }
}

/// Second order counterpart of [`FirstOrderTransferFunctionVariable`].
#[derive(Debug, Clone, PartialEq)]
pub struct SecondOrderTransferFunctionVariable {
    num: [Real; 3],
    den: [Real; 3],
    timestep: Real,
    coeff_u: [Real; 3],
    coeff_y: [Real; 3],
    delayed_u: [Real; 2],
    delayed_y: [Real; 2],
    value: Real,
    limits: Limits,
}

impl SecondOrderTransferFunctionVariable {
    pub fn new(
        timestep: Real,
        num: [Real; 3],
        den: [Real; 3],
        u0: Real,
        y0: Real,
        limits: Limits,
    ) -> FilterResult<Self> {
        check_timestep(timestep)?;
        let y = limits.contain(y0);
        let mut tf = Self {
            num,
            den,
            timestep,
            coeff_u: [0.0; 3],
            coeff_y: [0.0; 3],
            delayed_u: [u0, u0],
            delayed_y: [y, y],
            value: y0,
            limits,
        };
        tf.set_num_den(num, den)?;
        Ok(tf)
    }

    pub fn set_num_den(&mut self, num: [Real; 3], den: [Real; 3]) -> FilterResult<()> {
        let coeff_y = second_order_coefficients(den, self.timestep);
        check_leading(coeff_y[0])?;
        self.num = num;
        self.den = den;
        self.coeff_u = second_order_coefficients(num, self.timestep);
        self.coeff_y = coeff_y;
        Ok(())
    }

    fn retime(&mut self, timestep: Real) {
        if timestep == self.timestep || check_timestep(timestep).is_err() {
            return;
        }
        let coeff_y = second_order_coefficients(self.den, timestep);
        if check_leading(coeff_y[0]).is_ok() {
            self.timestep = timestep;
            self.coeff_u = second_order_coefficients(self.num, timestep);
            self.coeff_y = coeff_y;
        }
    }

    pub fn initialize_values(&mut self, u0: Real, y0: Real) {
        self.delayed_u = [u0, u0];
        self.delayed_y = [y0, y0];
        self.value = y0;
    }

    pub fn update(&mut self, u: Real, timestep: Real) -> Real {
        self.retime(timestep);
        let [cu0, cu1, cu2] = self.coeff_u;
        let [cy0, cy1, cy2] = self.coeff_y;
        let value = (cu0 * u + cu1 * self.delayed_u[0] + cu2 * self.delayed_u[1]
            - (cy1 * self.delayed_y[0] + cy2 * self.delayed_y[1]))
            / cy0;
        let value = if value > self.limits.max {
            self.limits.max
        } else if value < self.limits.min {
            self.limits.min
        } else {
            value
        };
        self.delayed_u = [u, self.delayed_u[0]];
        self.delayed_y = [value, self.delayed_y[0]];
        self.value = value;
        value
    }

    pub fn value(&self) -> Real {
        self.value
    }

    pub fn timestep(&self) -> Real {
        self.timestep
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_first(tf: &mut FirstOrderTransferFunction, u: Real, steps: usize) -> Real {
        (0..steps).fold(0.0, |_, _| tf.update(u))
    }

    #[test]
    fn low_pass_converges_to_dc_gain() {
        let mut tf = FirstOrderTransferFunction::low_pass(1e-3, 10.0, 0.0, 0.0, Limits::UNBOUNDED).unwrap();
        let y = run_first(&mut tf, 1.0, 2000);
        assert!((y - 1.0).abs() < 1e-6, "y = {y}");
        assert!(!tf.is_saturated());
        assert!((tf.break_frequency() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn first_order_gain() {
        let mut tf =
            FirstOrderTransferFunction::new(1e-3, [2.0, 0.0], [1.0, 0.05], 0.0, 0.0, Limits::UNBOUNDED).unwrap();
        let y = run_first(&mut tf, 1.5, 2000);
        assert!((y - 3.0).abs() < 1e-6);
    }

    #[test]
    fn first_order_matches_difference_equation() {
        let t = 0.01;
        let (num, den) = ([1.0, 0.5], [2.0, 0.3]);
        let mut tf = FirstOrderTransferFunction::new(t, num, den, 0.0, 0.0, Limits::UNBOUNDED).unwrap();
        let cu = [num[0] * t - 2.0 * num[1], num[0] * t + 2.0 * num[1]];
        let cy = [den[0] * t - 2.0 * den[1], den[0] * t + 2.0 * den[1]];

        let (mut du, mut dy) = (0.0, 0.0);
        for u in [1.0, 0.5, -2.0, 3.0] {
            let expected = (cu[1] * u + cu[0] * du - cy[0] * dy) / cy[1];
            let y = tf.update(u);
            assert!((y - expected).abs() < 1e-12);
            du = u;
            dy = y;
        }
    }

    #[test]
    fn output_is_clamped() {
        let limits = Limits::new(-0.5, 0.5).unwrap();
        let mut tf = FirstOrderTransferFunction::low_pass(1e-3, 100.0, 0.0, 0.0, limits).unwrap();
        let y = run_first(&mut tf, 1.0, 500);
        assert_eq!(y, 0.5);
        assert!(tf.is_saturated());
        assert_eq!(tf.delayed_y(), 0.5);

        let y = run_first(&mut tf, -1.0, 500);
        assert_eq!(y, -0.5);
    }

    #[test]
    fn invalid_arguments() {
        assert_eq!(
            Limits::new(1.0, 1.0),
            Err(FilterError::InvalidLimits { min: 1.0, max: 1.0 })
        );
        assert_eq!(
            FirstOrderTransferFunction::new(1e-3, [1.0, 0.0], [0.0, 0.0], 0.0, 0.0, Limits::UNBOUNDED)
                .unwrap_err(),
            FilterError::ZeroDenominator
        );
        assert!(matches!(
            FirstOrderTransferFunction::low_pass(0.0, 1.0, 0.0, 0.0, Limits::UNBOUNDED),
            Err(FilterError::NonPositiveTimestep { .. })
        ));
        assert_eq!(
            SecondOrderTransferFunction::new(1e-3, [1.0, 0.0, 0.0], [0.0; 3], 0.0, 0.0, Limits::UNBOUNDED)
                .unwrap_err(),
            FilterError::ZeroDenominator
        );

        let mut tf = FirstOrderTransferFunction::low_pass(1e-3, 1.0, 0.0, 0.0, Limits::UNBOUNDED).unwrap();
        assert_eq!(tf.set_backup_length(0), Err(FilterError::ZeroBackupLength));
        assert!(tf.restore_backup(0).is_err());
        assert!(matches!(
            tf.restore_backup(2),
            Err(FilterError::BackupOutOfRange { requested: 2, available: 1 })
        ));
    }

    #[test]
    fn restore_reaches_further_back() {
        let mut tf = FirstOrderTransferFunction::low_pass(1e-3, 50.0, 0.0, 0.0, Limits::UNBOUNDED).unwrap();
        tf.set_backup_length(3).unwrap();

        let mut history = Vec::new();
        for u in [1.0, 2.0, 3.0] {
            history.push((tf.delayed_u(), tf.delayed_y()));
            tf.update_with_backup(u);
        }
        tf.restore_backup(3).unwrap();
        assert_eq!((tf.delayed_u(), tf.delayed_y()), history[0]);
        tf.restore_backup(1).unwrap();
        assert_eq!((tf.delayed_u(), tf.delayed_y()), history[2]);
    }

    #[test]
    fn set_value_overrides_output() {
        let mut tf = FirstOrderTransferFunction::low_pass(1e-3, 50.0, 0.0, 0.0, Limits::UNBOUNDED).unwrap();
        tf.update(1.0);
        tf.set_value(42.0);
        assert_eq!(tf.value(), 42.0);
    }

    #[test]
    fn second_order_low_pass_converges() {
        let mut tf =
            SecondOrderTransferFunction::low_pass(1e-3, 50.0, 0.7, 0.0, 0.0, Limits::UNBOUNDED).unwrap();
        let y = (0..2000).fold(0.0, |_, _| tf.update(1.0));
        assert!((y - 1.0).abs() < 1e-6, "y = {y}");
    }

    #[test]
    fn second_order_shifts_history() {
        let mut tf =
            SecondOrderTransferFunction::low_pass(1e-3, 50.0, 0.7, 0.0, 0.0, Limits::UNBOUNDED).unwrap();
        let y1 = tf.update(1.0);
        let y2 = tf.update(2.0);
        assert_eq!(tf.delayed_u(), [2.0, 1.0]);
        assert_eq!(tf.delayed_y(), [y2, y1]);
    }

    #[test]
    fn variable_matches_fixed_until_retimed() {
        let (num, den) = ([1.0, 0.0], [1.0, 0.02]);
        let mut fixed = FirstOrderTransferFunction::new(1e-3, num, den, 0.0, 0.0, Limits::UNBOUNDED).unwrap();
        let mut var =
            FirstOrderTransferFunctionVariable::new(1e-3, num, den, 0.0, 0.0, Limits::UNBOUNDED).unwrap();
        for _ in 0..10 {
            assert!((fixed.update(1.0) - var.update(1.0, 1e-3)).abs() < 1e-12);
        }

        let mut coarse = FirstOrderTransferFunction::new(2e-3, num, den, 0.0, 0.0, Limits::UNBOUNDED).unwrap();
        coarse.initialize_values(var.value(), var.value());
        var.initialize_values(var.value(), var.value());
        let expected = coarse.update(1.0);
        assert!((var.update(1.0, 2e-3) - expected).abs() < 1e-12);
        assert_eq!(var.timestep(), 2e-3);

        // A bad timestep is ignored
        var.update(1.0, -1.0);
        assert_eq!(var.timestep(), 2e-3);
    }

    #[test]
    fn variable_saturation_pins_history() {
        let limits = Limits::new(0.0, 0.2).unwrap();
        let mut var =
            FirstOrderTransferFunctionVariable::new(1e-2, [1.0, 0.0], [1.0, 0.01], 0.0, 0.0, limits).unwrap();
        for _ in 0..50 {
            var.update(1.0, 1e-2);
        }
        assert_eq!(var.value(), 0.2);
    }

    #[test]
    fn second_order_variable_tracks_fixed() {
        let den = [1.0, 2.0 * 0.7 / 50.0, 1.0 / 2500.0];
        let mut fixed =
            SecondOrderTransferFunction::new(1e-3, [1.0, 0.0, 0.0], den, 0.0, 0.0, Limits::UNBOUNDED).unwrap();
        let mut var =
            SecondOrderTransferFunctionVariable::new(1e-3, [1.0, 0.0, 0.0], den, 0.0, 0.0, Limits::UNBOUNDED)
                .unwrap();
        for _ in 0..20 {
            assert!((fixed.update(1.0) - var.update(1.0, 1e-3)).abs() < 1e-12);
        }
    }
}
