use tlm_core::Real;
use tlm_filters::{FirstOrderTransferFunction, Limits};
use tlm_node::SlotRef;

use super::value_slot;
use crate::configurator::Configurator;
use crate::context::{InitContext, SimContext};
use crate::error::ComponentResult;
use crate::traits::{CausalRole, Component};

/// One-step delay, `out(t) = in(t - dt)`.
///
/// Declares no direct feedthrough, so it runs ahead of the other signal
/// blocks and reads its input before the upstream block updates it.
#[derive(Debug, Default)]
pub struct SignalUnitDelay {
    slots: Option<(SlotRef, SlotRef)>,
}

impl Component for SignalUnitDelay {
    fn role(&self) -> CausalRole {
        CausalRole::Signal
    }

    fn configure(&self, cfg: &mut Configurator) {
        cfg.add_input_variable("in", "", "", 0.0);
        cfg.add_output_variable("out", "");
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> ComponentResult<()> {
        let (input, out) = (value_slot(ctx, "in")?, value_slot(ctx, "out")?);
        let u0 = ctx.read(input);
        ctx.write(out, u0);
        self.slots = Some((input, out));
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) {
        if let Some((input, out)) = self.slots {
            let previous = ctx.read(input);
            ctx.write(out, previous);
        }
    }

    fn direct_feedthrough(&self) -> bool {
        false
    }
}

/// Low-pass `1/(s/wc + 1)` with output limits.
#[derive(Debug, Default)]
pub struct SignalFirstOrderFilter {
    slots: Option<(SlotRef, SlotRef)>,
    filter: Option<FirstOrderTransferFunction>,
}

impl Component for SignalFirstOrderFilter {
    fn role(&self) -> CausalRole {
        CausalRole::Signal
    }

    fn configure(&self, cfg: &mut Configurator) {
        cfg.add_input_variable("in", "", "", 0.0);
        cfg.add_output_variable("out", "");
        cfg.add_real("wc", "Break frequency", "rad/s", 1000.0);
        cfg.add_real("y_min", "Lower output limit", "", -1.5e300);
        cfg.add_real("y_max", "Upper output limit", "", 1.5e300);
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> ComponentResult<()> {
        let wc = ctx.positive("wc")?;
        let limits = Limits::new(ctx.real("y_min")?, ctx.real("y_max")?)?;
        let (input, out) = (value_slot(ctx, "in")?, value_slot(ctx, "out")?);
        let u0: Real = ctx.read(input);
        let (y0, _) = limits.clamp(u0);

        self.filter = Some(FirstOrderTransferFunction::low_pass(ctx.timestep(), wc, u0, y0, limits)?);
        ctx.write(out, y0);
        self.slots = Some((input, out));
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) {
        if let (Some((input, out)), Some(filter)) = (self.slots, self.filter.as_mut()) {
            let y = filter.update(ctx.read(input));
            ctx.write(out, y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::ParameterValue;
    use crate::testing::Harness;
    use tlm_node::signal::{VALUE, node_type};

    #[test]
    fn unit_delay_passes_previous_input() {
        let mut h = Harness::new(0.1);
        let input = h.node(node_type());
        let out = h.node(node_type());
        let mut delay = SignalUnitDelay::default();
        h.init(&mut delay, &[("in", vec![input]), ("out", vec![out])], &[])
            .unwrap();
        assert!(!delay.direct_feedthrough());

        h.set(input, VALUE, 4.0);
        h.step(&mut delay);
        assert_eq!(h.get(out, VALUE), 4.0);
    }

    #[test]
    fn filter_settles_and_respects_limits() {
        let mut h = Harness::new(1e-3);
        let input = h.node(node_type());
        let out = h.node(node_type());
        let mut filter = SignalFirstOrderFilter::default();
        h.init(
            &mut filter,
            &[("in", vec![input]), ("out", vec![out])],
            &[("wc", ParameterValue::Real(100.0)), ("y_max", ParameterValue::Real(0.8))],
        )
        .unwrap();

        h.set(input, VALUE, 1.0);
        for _ in 0..2000 {
            h.step(&mut filter);
        }
        assert_eq!(h.get(out, VALUE), 0.8);
    }
}
