use nalgebra::{DMatrix, DVector};
use tlm_core::Real;
use tlm_node::{SlotRef, hydraulic, signal};
use tlm_solver::{EquationSystemSolver, NewtonOptions, NewtonSystem};

use super::{HydraulicSlots, two_port_efforts};
use crate::configurator::Configurator;
use crate::context::{InitContext, SimContext};
use crate::error::{ComponentError, ComponentResult};
use crate::traits::{CausalRole, Component};

#[derive(Debug, Clone, Copy)]
struct Bound {
    p1: HydraulicSlots,
    p2: HydraulicSlots,
    coefficient: SlotRef,
}

/// Linear restriction `q = Kc·Δp`.
///
/// If either side would go below zero pressure its wave variable and
/// impedance are zeroed and the flow re-solved, then pressures are clamped.
#[derive(Debug, Default)]
pub struct HydraulicLaminarOrifice {
    bound: Option<Bound>,
}

impl HydraulicLaminarOrifice {
    fn flow(kc: Real, c1: Real, zc1: Real, c2: Real, zc2: Real) -> Real {
        kc * (c1 - c2) / (1.0 + kc * (zc1 + zc2))
    }
}

impl Component for HydraulicLaminarOrifice {
    fn role(&self) -> CausalRole {
        CausalRole::Resistive
    }

    fn configure(&self, cfg: &mut Configurator) {
        cfg.add_power_port("P1", hydraulic::NAME);
        cfg.add_power_port("P2", hydraulic::NAME);
        cfg.add_input_variable("Kc", "Pressure-flow coefficient", "m^5/Ns", 1e-11);
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> ComponentResult<()> {
        self.bound = Some(Bound {
            p1: HydraulicSlots::of_port(ctx, "P1")?,
            p2: HydraulicSlots::of_port(ctx, "P2")?,
            coefficient: ctx.slot("Kc", signal::VALUE)?,
        });
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) {
        let Some(b) = self.bound else { return };
        let kc = ctx.read(b.coefficient).abs();
        let (mut c1, mut zc1) = b.p1.wave(ctx);
        let (mut c2, mut zc2) = b.p2.wave(ctx);

        let (mut p1, mut q1, mut p2, mut q2) =
            two_port_efforts(Self::flow(kc, c1, zc1, c2, zc2), c1, zc1, c2, zc2);

        if p1 < 0.0 || p2 < 0.0 {
            if p1 < 0.0 {
                c1 = 0.0;
                zc1 = 0.0;
            }
            if p2 < 0.0 {
                c2 = 0.0;
                zc2 = 0.0;
            }
            (p1, q1, p2, q2) = two_port_efforts(Self::flow(kc, c1, zc1, c2, zc2), c1, zc1, c2, zc2);
            p1 = p1.max(0.0);
            p2 = p2.max(0.0);
        }

        ctx.write(b.p1.p, p1);
        ctx.write(b.p1.q, q1);
        ctx.write(b.p2.p, p2);
        ctx.write(b.p2.q, q2);
    }
}

/// `Zc_sum·q + Δp(q) = c1 - c2` for the square-root orifice law with a linear
/// region below `dp_lam`.
#[derive(Debug, Clone, Copy)]
struct OrificeBalance {
    ks: Real,
    dp_lam: Real,
    zc_sum: Real,
    dc: Real,
}

impl OrificeBalance {
    fn q_lam(&self) -> Real {
        self.ks * self.dp_lam.sqrt()
    }

    fn pressure_drop(&self, q: Real) -> Real {
        if q.abs() > self.q_lam() {
            q.signum() * q * q / (self.ks * self.ks)
        } else {
            q * self.dp_lam.sqrt() / self.ks
        }
    }

    fn pressure_drop_slope(&self, q: Real) -> Real {
        if q.abs() > self.q_lam() {
            2.0 * q.abs() / (self.ks * self.ks)
        } else {
            self.dp_lam.sqrt() / self.ks
        }
    }
}

impl NewtonSystem for OrificeBalance {
    fn dimension(&self) -> usize {
        1
    }

    fn residual(&self, x: &DVector<f64>, out: &mut DVector<f64>) {
        out[0] = self.zc_sum * x[0] + self.pressure_drop(x[0]) - self.dc;
    }

    fn jacobian(&self, x: &DVector<f64>, out: &mut DMatrix<f64>) {
        out[(0, 0)] = self.zc_sum + self.pressure_drop_slope(x[0]);
    }
}

/// Turbulent restriction `q = Cq·A·√(2Δp/ρ)`, solved implicitly with Newton
/// iterations warm-started from the previous step's flow.
#[derive(Debug)]
pub struct HydraulicTurbulentOrifice {
    bound: Option<Bound>,
    solver: Option<EquationSystemSolver>,
    cq_factor: Real,
    dp_lam: Real,
    x: DVector<f64>,
}

impl Default for HydraulicTurbulentOrifice {
    fn default() -> Self {
        Self {
            bound: None,
            solver: None,
            cq_factor: 0.0,
            dp_lam: 0.0,
            x: DVector::zeros(1),
        }
    }
}

impl Component for HydraulicTurbulentOrifice {
    fn role(&self) -> CausalRole {
        CausalRole::Resistive
    }

    fn configure(&self, cfg: &mut Configurator) {
        cfg.add_power_port("P1", hydraulic::NAME);
        cfg.add_power_port("P2", hydraulic::NAME);
        cfg.add_input_variable("A", "Opening area", "m^2", 1e-5);
        cfg.add_real("C_q", "Flow coefficient", "-", 0.67);
        cfg.add_real("rho", "Oil density", "kg/m^3", 870.0);
        cfg.add_real("dp_lam", "Pressure drop below which flow is treated as laminar", "Pa", 1e3);
        cfg.add_integer("iterations", "Newton iterations per step", 2);
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> ComponentResult<()> {
        let cq = ctx.positive("C_q")?;
        let rho = ctx.positive("rho")?;
        self.dp_lam = ctx.positive("dp_lam")?;
        let iterations = ctx.integer("iterations")?;
        let iterations = usize::try_from(iterations)
            .ok()
            .filter(|&n| n > 0)
            .ok_or(ComponentError::InvalidParameter {
                name: "iterations".into(),
                what: "must be at least 1",
            })?;

        self.cq_factor = cq * (2.0 / rho).sqrt();
        self.solver = Some(EquationSystemSolver::new(1, NewtonOptions { iterations })?);
        let bound = Bound {
            p1: HydraulicSlots::of_port(ctx, "P1")?,
            p2: HydraulicSlots::of_port(ctx, "P2")?,
            coefficient: ctx.slot("A", signal::VALUE)?,
        };
        self.x[0] = ctx.read(bound.p2.q);
        self.bound = Some(bound);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) {
        let (Some(b), Some(solver)) = (self.bound, self.solver.as_mut()) else {
            return;
        };
        let (c1, zc1) = b.p1.wave(ctx);
        let (c2, zc2) = b.p2.wave(ctx);
        let ks = self.cq_factor * ctx.read(b.coefficient).max(0.0);

        let q2 = if ks > 0.0 {
            let balance = OrificeBalance {
                ks,
                dp_lam: self.dp_lam,
                zc_sum: zc1 + zc2,
                dc: c1 - c2,
            };
            if let Err(e) = solver.solve(&balance, &mut self.x) {
                ctx.stop_simulation(&e.to_string());
                return;
            }
            self.x[0]
        } else {
            self.x[0] = 0.0;
            0.0
        };

        let (p1, q1, p2, q2) = two_port_efforts(q2, c1, zc1, c2, zc2);
        ctx.write(b.p1.p, p1.max(0.0));
        ctx.write(b.p1.q, q1);
        ctx.write(b.p2.p, p2.max(0.0));
        ctx.write(b.p2.q, q2);
    }
}
