use tlm_node::{SlotRef, mechanic, signal};

use super::MechanicSlots;
use crate::configurator::Configurator;
use crate::context::{InitContext, SimContext};
use crate::error::ComponentResult;
use crate::traits::{CausalRole, Component};

/// Imposes a force and integrates the resulting velocity into position.
#[derive(Debug, Default)]
pub struct MechanicForceSource {
    bound: Option<(MechanicSlots, SlotRef)>,
}

impl Component for MechanicForceSource {
    fn role(&self) -> CausalRole {
        CausalRole::Resistive
    }

    fn configure(&self, cfg: &mut Configurator) {
        cfg.add_power_port("P1", mechanic::NAME);
        cfg.add_input_variable("f", "Generated force", "N", 0.0);
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> ComponentResult<()> {
        self.bound = Some((MechanicSlots::of_port(ctx, "P1")?, ctx.slot("f", signal::VALUE)?));
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) {
        let Some((port, force)) = self.bound else { return };
        let f = ctx.read(force);
        let c = ctx.read(port.c);
        let zc = ctx.read(port.zc);
        let v = if zc > 0.0 { (f - c) / zc } else { 0.0 };
        let x = ctx.read(port.x) + v * ctx.timestep();

        ctx.write(port.f, f);
        ctx.write(port.v, v);
        ctx.write(port.x, x);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::ParameterValue;
    use crate::testing::Harness;
    use tlm_node::mechanic::{CHAR_IMPEDANCE, FORCE, POSITION, VELOCITY, WAVE_VARIABLE, node_type};

    #[test]
    fn velocity_from_line_impedance() {
        let mut h = Harness::new(0.01);
        let node = h.node(node_type());
        h.set(node, WAVE_VARIABLE, 10.0);
        h.set(node, CHAR_IMPEDANCE, 5.0);
        let mut source = MechanicForceSource::default();
        h.init(&mut source, &[("P1", vec![node])], &[("f", ParameterValue::Real(20.0))])
            .unwrap();

        h.step(&mut source);
        h.step(&mut source);
        assert_eq!(h.get(node, FORCE), 20.0);
        assert_eq!(h.get(node, VELOCITY), 2.0);
        assert!((h.get(node, POSITION) - 0.04).abs() < 1e-12);
    }

    #[test]
    fn rigid_line_does_not_move() {
        let mut h = Harness::new(0.01);
        let node = h.node(node_type());
        let mut source = MechanicForceSource::default();
        h.init(&mut source, &[("P1", vec![node])], &[("f", ParameterValue::Real(20.0))])
            .unwrap();
        h.step(&mut source);
        assert_eq!(h.get(node, VELOCITY), 0.0);
    }
}
