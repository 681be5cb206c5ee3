use tlm_core::Real;
use tlm_filters::{FirstOrderTransferFunction, Limits};
use tlm_node::{SlotRef, hydraulic, signal};

use super::{HydraulicSlots, hysteresis, turbulent_flow, two_port_efforts};
use crate::configurator::Configurator;
use crate::context::{InitContext, SimContext};
use crate::error::ComponentResult;
use crate::traits::{CausalRole, Component};

const P_NOM: Real = 7e6;

#[derive(Debug, Clone, Copy)]
struct Bound {
    p1: HydraulicSlots,
    p2: HydraulicSlots,
    p_max: SlotRef,
    tao: SlotRef,
    p_h: SlotRef,
    xv: SlotRef,
}

/// Pressure relief valve with a first-order spool and hysteresis.
///
/// The spool position is the output of a low-pass filter whose break
/// frequency depends on the operating point. If the resulting flow would
/// pull either side below zero pressure, the filter step is rolled back and
/// redone from the cavitating side's corrected wave variables.
#[derive(Debug, Default)]
pub struct HydraulicPressureReliefValve {
    bound: Option<Bound>,
    filter: Option<FirstOrderTransferFunction>,
    prev_x0: Real,
    cs: Real,
    cf: Real,
}

impl HydraulicPressureReliefValve {
    fn filter_den(wc: Real) -> [Real; 2] {
        [1.0, 1.0 / wc]
    }
}

impl Component for HydraulicPressureReliefValve {
    fn role(&self) -> CausalRole {
        CausalRole::Resistive
    }

    fn configure(&self, cfg: &mut Configurator) {
        cfg.add_power_port("P1", hydraulic::NAME);
        cfg.add_power_port("P2", hydraulic::NAME);
        cfg.add_output_variable("xv", "Equivalent spool position");
        cfg.add_input_variable("p_max", "Maximum opening pressure", "Pa", 20e6);
        cfg.add_input_variable("tao", "Time constant of spool", "s", 0.01);
        cfg.add_input_variable("p_h", "Hysteresis width", "Pa", 5e5);
        cfg.add_real("k_cs", "Steady state characteristic due to spring", "m^5/Ns", 1e-8);
        cfg.add_real("k_cf", "Steady state characteristic due to flow forces", "m^5/Ns", 1e-8);
        cfg.add_real("q_nom", "Flow with fully open valve at nominal pressure drop", "m^3/s", 1e-3);
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> ComponentResult<()> {
        let k_cs = ctx.positive("k_cs")?;
        let k_cf = ctx.positive("k_cf")?;
        let q_nom = ctx.positive("q_nom")?;
        let bound = Bound {
            p1: HydraulicSlots::of_port(ctx, "P1")?,
            p2: HydraulicSlots::of_port(ctx, "P2")?,
            p_max: ctx.slot("p_max", signal::VALUE)?,
            tao: ctx.slot("tao", signal::VALUE)?,
            p_h: ctx.slot("p_h", signal::VALUE)?,
            xv: ctx.slot("xv", signal::VALUE)?,
        };

        let x0max = q_nom / P_NOM.sqrt();
        self.cs = P_NOM.sqrt() / k_cs;
        self.cf = 1.0 / (k_cf * P_NOM.sqrt());
        self.prev_x0 = 0.0;

        let wc = 1.0 / ctx.read(bound.tao);
        self.filter = Some(FirstOrderTransferFunction::new(
            ctx.timestep(),
            [1.0, 0.0],
            Self::filter_den(wc),
            0.0,
            0.0,
            Limits::new(0.0, x0max)?,
        )?);
        ctx.write(bound.xv, 0.0);
        self.bound = Some(bound);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) {
        let (Some(b), Some(filter)) = (self.bound, self.filter.as_mut()) else {
            return;
        };
        let p1 = ctx.read(b.p1.p);
        let p2 = ctx.read(b.p2.p);
        let (mut c1, mut zc1) = b.p1.wave(ctx);
        let (mut c2, mut zc2) = b.p2.wave(ctx);
        let p_max = ctx.read(b.p_max);
        let p_h = ctx.read(b.p_h);
        let tao = ctx.read(b.tao);
        let prev = self.prev_x0;

        let dp = p1 - p2;
        let b1 = if dp * self.cf < 0.0 {
            self.cs
        } else {
            self.cs + dp * self.cf
        };
        let root = dp.abs().sqrt();
        let denom = 2.0 * root + (zc1 + zc2) * prev;
        let gamma = if denom != 0.0 { 2.0 * root / denom } else { 1.0 };
        let b2 = (gamma * (zc1 + zc2) * root).max(0.0);

        let xs = (gamma * c1 + b2 * prev / 2.0 - p_max) / (b1 + b2);
        let xh = p_h / (b1 + b2);
        let xsh = hysteresis(xs, xh, prev);

        let wc = (1.0 + b2 / b1) / tao;
        if let Err(e) = filter.set_num_den([1.0, 0.0], Self::filter_den(wc)) {
            ctx.stop_simulation(&e.to_string());
            return;
        }
        let mut x0 = filter.update_with_backup(xsh);

        let (mut p1, mut q1, mut p2, mut q2) =
            two_port_efforts(turbulent_flow(x0, c1, c2, zc1, zc2), c1, zc1, c2, zc2);

        if p1 < 0.0 || p2 < 0.0 {
            if p1 < 0.0 {
                c1 = 0.0;
                zc1 = 0.0;
            }
            if p2 < 0.0 {
                c2 = 0.0;
                zc2 = 0.0;
            }
            let xs = (c1 + b2 * x0 / 2.0 - p_max) / (b1 + b2);
            let xsh = hysteresis(xs, xh, prev);
            if let Err(e) = filter.restore_backup(1) {
                ctx.stop_simulation(&e.to_string());
                return;
            }
            x0 = filter.update(xsh);

            (p1, q1, p2, q2) =
                two_port_efforts(turbulent_flow(x0, c1, c2, zc1, zc2), c1, zc1, c2, zc2);
            p1 = p1.max(0.0);
            p2 = p2.max(0.0);
        }

        self.prev_x0 = x0;
        ctx.write(b.p1.p, p1);
        ctx.write(b.p1.q, q1);
        ctx.write(b.p2.p, p2);
        ctx.write(b.p2.q, q2);
        ctx.write(b.xv, x0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;
    use tlm_core::NodeId;
    use tlm_node::hydraulic::{CHAR_IMPEDANCE, FLOW, PRESSURE, WAVE_VARIABLE, node_type};

    fn setup(h: &mut Harness, c1: Real, c2: Real) -> (NodeId, NodeId, NodeId) {
        let a = h.node(node_type());
        let b = h.node(node_type());
        let xv = h.node(signal::node_type());
        for (node, c) in [(a, c1), (b, c2)] {
            h.set(node, WAVE_VARIABLE, c);
            h.set(node, PRESSURE, c.max(0.0));
            h.set(node, CHAR_IMPEDANCE, 1e8);
        }
        (a, b, xv)
    }

    fn run(h: &mut Harness, valve: &mut HydraulicPressureReliefValve, steps: usize) {
        for _ in 0..steps {
            h.advance();
            h.step(valve);
        }
    }

    #[test]
    fn stays_closed_below_cracking_pressure() {
        let mut h = Harness::new(1e-4);
        let (a, b, xv) = setup(&mut h, 1e6, 1e5);
        let mut valve = HydraulicPressureReliefValve::default();
        h.init(
            &mut valve,
            &[("P1", vec![a]), ("P2", vec![b]), ("xv", vec![xv])],
            &[],
        )
        .unwrap();
        run(&mut h, &mut valve, 50);
        assert_eq!(h.get(xv, signal::VALUE), 0.0);
        assert_eq!(h.get(b, FLOW), 0.0);
        assert_eq!(h.get(a, PRESSURE), 1e6);
    }

    #[test]
    fn opens_above_cracking_pressure() {
        let mut h = Harness::new(1e-4);
        let (a, b, xv) = setup(&mut h, 25e6, 1e5);
        let mut valve = HydraulicPressureReliefValve::default();
        h.init(
            &mut valve,
            &[("P1", vec![a]), ("P2", vec![b]), ("xv", vec![xv])],
            &[],
        )
        .unwrap();
        run(&mut h, &mut valve, 50);

        let x0max = 1e-3 / P_NOM.sqrt();
        let x = h.get(xv, signal::VALUE);
        assert!(x > 0.0 && x <= x0max);
        assert!(h.get(b, FLOW) > 0.0);
        assert_eq!(h.get(a, FLOW), -h.get(b, FLOW));
    }

    #[test]
    fn cavitation_is_resolved_locally() {
        let mut h = Harness::new(1e-4);
        let (a, b, xv) = setup(&mut h, 25e6, -5e6);
        let mut valve = HydraulicPressureReliefValve::default();
        h.init(
            &mut valve,
            &[("P1", vec![a]), ("P2", vec![b]), ("xv", vec![xv])],
            &[],
        )
        .unwrap();
        run(&mut h, &mut valve, 20);
        assert!(h.get(a, PRESSURE) >= 0.0);
        assert!(h.get(b, PRESSURE) >= 0.0);
        assert!(!h.abort.is_set());
    }

    #[test]
    fn unconnected_output_gets_placeholder() {
        let mut h = Harness::new(1e-4);
        let (a, b, _) = setup(&mut h, 1e6, 1e5);
        let mut valve = HydraulicPressureReliefValve::default();
        h.init(&mut valve, &[("P1", vec![a]), ("P2", vec![b])], &[])
            .unwrap();
        h.step(&mut valve);
    }
}
