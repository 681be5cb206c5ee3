use tlm_node::SlotRef;

use super::value_slot;
use crate::configurator::Configurator;
use crate::context::{InitContext, SimContext};
use crate::error::ComponentResult;
use crate::traits::{CausalRole, Component};

#[derive(Debug, Default)]
pub struct SignalGain {
    slots: Option<(SlotRef, SlotRef, SlotRef)>,
}

impl Component for SignalGain {
    fn role(&self) -> CausalRole {
        CausalRole::Signal
    }

    fn configure(&self, cfg: &mut Configurator) {
        cfg.add_input_variable("in", "", "", 0.0);
        cfg.add_input_variable("k", "Gain", "", 1.0);
        cfg.add_output_variable("out", "");
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> ComponentResult<()> {
        let slots = (value_slot(ctx, "in")?, value_slot(ctx, "k")?, value_slot(ctx, "out")?);
        self.slots = Some(slots);
        self.simulate_one_timestep(ctx);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) {
        if let Some((input, k, out)) = self.slots {
            let y = ctx.read(k) * ctx.read(input);
            ctx.write(out, y);
        }
    }
}

/// Two-input arithmetic block.
#[derive(Debug, Clone, Copy)]
struct Binary {
    in1: SlotRef,
    in2: SlotRef,
    out: SlotRef,
}

impl Binary {
    fn configure(cfg: &mut Configurator) {
        cfg.add_input_variable("in1", "", "", 0.0);
        cfg.add_input_variable("in2", "", "", 0.0);
        cfg.add_output_variable("out", "");
    }

    fn bind(ctx: &InitContext<'_>) -> ComponentResult<Self> {
        Ok(Self {
            in1: value_slot(ctx, "in1")?,
            in2: value_slot(ctx, "in2")?,
            out: value_slot(ctx, "out")?,
        })
    }

    fn apply(self, ctx: &mut SimContext<'_>, op: impl Fn(f64, f64) -> f64) {
        let y = op(ctx.read(self.in1), ctx.read(self.in2));
        ctx.write(self.out, y);
    }
}

#[derive(Debug, Default)]
pub struct SignalAdd {
    slots: Option<Binary>,
}

impl Component for SignalAdd {
    fn role(&self) -> CausalRole {
        CausalRole::Signal
    }

    fn configure(&self, cfg: &mut Configurator) {
        Binary::configure(cfg);
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> ComponentResult<()> {
        let slots = Binary::bind(ctx)?;
        slots.apply(ctx, |a, b| a + b);
        self.slots = Some(slots);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) {
        if let Some(slots) = self.slots {
            slots.apply(ctx, |a, b| a + b);
        }
    }
}

/// `out = in1 - in2`
#[derive(Debug, Default)]
pub struct SignalSubtract {
    slots: Option<Binary>,
}

impl Component for SignalSubtract {
    fn role(&self) -> CausalRole {
        CausalRole::Signal
    }

    fn configure(&self, cfg: &mut Configurator) {
        Binary::configure(cfg);
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> ComponentResult<()> {
        let slots = Binary::bind(ctx)?;
        slots.apply(ctx, |a, b| a - b);
        self.slots = Some(slots);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) {
        if let Some(slots) = self.slots {
            slots.apply(ctx, |a, b| a - b);
        }
    }
}
