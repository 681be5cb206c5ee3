use tlm_core::Real;
use tlm_node::hydraulic;

use super::HydraulicSlots;
use crate::configurator::Configurator;
use crate::context::{InitContext, SimContext};
use crate::error::{ComponentError, ComponentResult};
use crate::traits::{CausalRole, Component};

/// Lumped fluid volume with any number of connections on one multi-port.
///
/// Every connection sees the same impedance `Zc = (n+2)/2 · βe/V · dt/(1-α)`;
/// the wave variables are pulled towards the mean pressure with damping `α`.
#[derive(Debug, Default)]
pub struct HydraulicVolume {
    ports: Vec<HydraulicSlots>,
    zc: Real,
    alpha: Real,
}

impl Component for HydraulicVolume {
    fn role(&self) -> CausalRole {
        CausalRole::Storage
    }

    fn configure(&self, cfg: &mut Configurator) {
        cfg.add_power_multiport("P1", hydraulic::NAME);
        cfg.add_real("V", "Volume", "m^3", 1e-3);
        cfg.add_real("Beta_e", "Bulk modulus", "Pa", 1e9);
        cfg.add_real("alpha", "Low pass coefficient to dampen standing waves", "-", 0.1);
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> ComponentResult<()> {
        let volume = ctx.positive("V")?;
        let beta = ctx.positive("Beta_e")?;
        let alpha = ctx.real("alpha")?;
        if !(0.0..1.0).contains(&alpha) {
            return Err(ComponentError::InvalidParameter {
                name: "alpha".into(),
                what: "must be in [0, 1)",
            });
        }

        let nodes = ctx.port_nodes("P1")?;
        if nodes.is_empty() {
            return Err(ComponentError::Unconnected { name: "P1".into() });
        }
        self.ports = nodes
            .iter()
            .map(|&node| HydraulicSlots::bind(ctx, node))
            .collect::<ComponentResult<_>>()?;

        let n = self.ports.len() as Real;
        self.alpha = alpha;
        self.zc = (n + 2.0) / 2.0 * beta / volume * ctx.timestep() / (1.0 - alpha);

        for port in &self.ports {
            let c = ctx.read(port.p) + self.zc * ctx.read(port.q);
            ctx.write(port.c, c);
            ctx.write(port.zc, self.zc);
        }
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) {
        let n = self.ports.len() as Real;
        let p_mean = self
            .ports
            .iter()
            .map(|s| ctx.read(s.c) + 2.0 * ctx.read(s.zc) * ctx.read(s.q))
            .sum::<Real>()
            / n;

        for s in &self.ports {
            let (c, zc, q) = (ctx.read(s.c), ctx.read(s.zc), ctx.read(s.q));
            let c0 = 2.0 * p_mean - c - 2.0 * zc * q;
            let c_new = self.alpha * c + (1.0 - self.alpha) * c0 + (zc - self.zc) * q;
            ctx.write(s.c, c_new);
            ctx.write(s.zc, self.zc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;
    use tlm_node::hydraulic::{CHAR_IMPEDANCE, FLOW, PRESSURE, WAVE_VARIABLE, node_type};

    #[test]
    fn impedance_scales_with_connection_count() {
        let mut h = Harness::new(1e-3);
        let a = h.node(node_type());
        let b = h.node(node_type());
        let mut vol = HydraulicVolume::default();
        h.init(&mut vol, &[("P1", vec![a, b])], &[]).unwrap();

        // (2 + 2)/2 * 1e9 / 1e-3 * 1e-3 / 0.9
        let expected = 2.0 * 1e9 / 0.9;
        assert!((h.get(a, CHAR_IMPEDANCE) - expected).abs() / expected < 1e-12);
        assert_eq!(h.get(a, WAVE_VARIABLE), 1e5);
    }

    #[test]
    fn closed_volume_at_rest_stays_at_rest() {
        let mut h = Harness::new(1e-3);
        let a = h.node(node_type());
        let mut vol = HydraulicVolume::default();
        h.init(&mut vol, &[("P1", vec![a])], &[]).unwrap();
        for _ in 0..10 {
            h.advance();
            h.step(&mut vol);
        }
        assert!((h.get(a, WAVE_VARIABLE) - 1e5).abs() < 1e-6);
    }

    #[test]
    fn inflow_raises_wave_variable() {
        let mut h = Harness::new(1e-3);
        let a = h.node(node_type());
        let b = h.node(node_type());
        let mut vol = HydraulicVolume::default();
        h.init(&mut vol, &[("P1", vec![a, b])], &[]).unwrap();
        h.set(a, FLOW, 1e-4);
        h.set(a, PRESSURE, 1e5 + h.get(a, CHAR_IMPEDANCE) * 1e-4);
        h.step(&mut vol);
        assert!(h.get(b, WAVE_VARIABLE) > 1e5);
    }

    #[test]
    fn unconnected_volume_fails() {
        let mut h = Harness::new(1e-3);
        let mut vol = HydraulicVolume::default();
        assert!(matches!(
            h.init(&mut vol, &[], &[]),
            Err(ComponentError::Unconnected { .. })
        ));
    }
}
