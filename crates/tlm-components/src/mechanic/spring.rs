use tlm_core::Real;
use tlm_node::mechanic;

use super::MechanicSlots;
use crate::configurator::Configurator;
use crate::context::{InitContext, SimContext};
use crate::error::ComponentResult;
use crate::traits::{CausalRole, Component};

/// Massless linear spring, `Zc = k·dt`.
#[derive(Debug, Default)]
pub struct MechanicSpring {
    bound: Option<(MechanicSlots, MechanicSlots)>,
    zc: Real,
}

impl Component for MechanicSpring {
    fn role(&self) -> CausalRole {
        CausalRole::Storage
    }

    fn configure(&self, cfg: &mut Configurator) {
        cfg.add_power_port("P1", mechanic::NAME);
        cfg.add_power_port("P2", mechanic::NAME);
        cfg.add_real("k", "Spring coefficient", "N/m", 100.0);
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> ComponentResult<()> {
        let k = ctx.positive("k")?;
        let p1 = MechanicSlots::of_port(ctx, "P1")?;
        let p2 = MechanicSlots::of_port(ctx, "P2")?;
        self.zc = k * ctx.timestep();

        for port in [p1, p2] {
            let c = ctx.read(port.f) + self.zc * ctx.read(port.v);
            ctx.write(port.c, c);
            ctx.write(port.zc, self.zc);
        }
        self.bound = Some((p1, p2));
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) {
        let Some((p1, p2)) = self.bound else { return };
        let (v1, c1) = (ctx.read(p1.v), ctx.read(p1.c));
        let (v2, c2) = (ctx.read(p2.v), ctx.read(p2.c));

        ctx.write(p1.c, c2 + 2.0 * self.zc * v2);
        ctx.write(p2.c, c1 + 2.0 * self.zc * v1);
        ctx.write(p1.zc, self.zc);
        ctx.write(p2.zc, self.zc);
    }
}
