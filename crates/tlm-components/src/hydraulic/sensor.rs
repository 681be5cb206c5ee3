use tlm_node::{PortKind, PortSpec, SlotRef, hydraulic, signal};

use crate::configurator::Configurator;
use crate::context::{InitContext, SimContext};
use crate::error::ComponentResult;
use crate::traits::{CausalRole, Component};

/// Reads the pressure of a hydraulic node onto a signal.
#[derive(Debug, Default)]
pub struct HydraulicPressureSensor {
    bound: Option<(SlotRef, SlotRef)>,
}

impl Component for HydraulicPressureSensor {
    fn role(&self) -> CausalRole {
        CausalRole::Signal
    }

    fn configure(&self, cfg: &mut Configurator) {
        cfg.add_port(PortSpec::new("P1", PortKind::Read, hydraulic::NAME).required());
        cfg.add_output_variable("out", "Pressure");
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> ComponentResult<()> {
        let pressure = ctx.slot("P1", hydraulic::PRESSURE)?;
        let out = ctx.slot("out", signal::VALUE)?;
        let p = ctx.read(pressure);
        ctx.write(out, p);
        self.bound = Some((pressure, out));
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) {
        if let Some((pressure, out)) = self.bound {
            let p = ctx.read(pressure);
            ctx.write(out, p);
        }
    }
}
