use tlm_node::{SlotRef, hydraulic, signal};

use super::HydraulicSlots;
use crate::configurator::Configurator;
use crate::context::{InitContext, SimContext};
use crate::error::ComponentResult;
use crate::traits::{CausalRole, Component};

/// Ideal pressure source on the storage side: `c = p`, `Zc = 0`.
#[derive(Debug, Default)]
pub struct HydraulicPressureSourceC {
    bound: Option<(HydraulicSlots, SlotRef)>,
}

impl Component for HydraulicPressureSourceC {
    fn role(&self) -> CausalRole {
        CausalRole::Storage
    }

    fn configure(&self, cfg: &mut Configurator) {
        cfg.add_power_port("P1", hydraulic::NAME);
        cfg.add_input_variable("p", "Set pressure", "Pa", 1e5);
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> ComponentResult<()> {
        let port = HydraulicSlots::of_port(ctx, "P1")?;
        let pressure = ctx.slot("p", signal::VALUE)?;
        let p = ctx.read(pressure);
        ctx.write(port.c, p);
        ctx.write(port.zc, 0.0);
        self.bound = Some((port, pressure));
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) {
        let Some((port, pressure)) = self.bound else { return };
        let p = ctx.read(pressure);
        ctx.write(port.c, p);
        ctx.write(port.zc, 0.0);
    }
}

/// Ideal flow source on the resistive side: imposes `q` and answers with
/// `p = c + q·Zc`.
#[derive(Debug, Default)]
pub struct HydraulicFlowSourceQ {
    bound: Option<(HydraulicSlots, SlotRef)>,
}

impl Component for HydraulicFlowSourceQ {
    fn role(&self) -> CausalRole {
        CausalRole::Resistive
    }

    fn configure(&self, cfg: &mut Configurator) {
        cfg.add_power_port("P1", hydraulic::NAME);
        cfg.add_input_variable("q", "Set flow", "m^3/s", 1e-3);
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> ComponentResult<()> {
        self.bound = Some((HydraulicSlots::of_port(ctx, "P1")?, ctx.slot("q", signal::VALUE)?));
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) {
        let Some((port, flow)) = self.bound else { return };
        let q = ctx.read(flow);
        let (c, zc) = port.wave(ctx);
        ctx.write(port.q, q);
        ctx.write(port.p, c + q * zc);
    }
}
