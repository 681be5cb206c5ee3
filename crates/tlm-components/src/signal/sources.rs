use std::f64::consts::PI;

use tlm_core::Real;
use tlm_node::SlotRef;

use super::value_slot;
use crate::configurator::Configurator;
use crate::context::{InitContext, SimContext};
use crate::error::ComponentResult;
use crate::traits::{CausalRole, Component};

#[derive(Debug, Default)]
pub struct SignalConstant {
    out: Option<SlotRef>,
    value: Real,
}

impl Component for SignalConstant {
    fn role(&self) -> CausalRole {
        CausalRole::Signal
    }

    fn configure(&self, cfg: &mut Configurator) {
        cfg.add_real("y", "Constant value", "", 1.0);
        cfg.add_output_variable("out", "");
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> ComponentResult<()> {
        self.value = ctx.real("y")?;
        let out = value_slot(ctx, "out")?;
        ctx.write(out, self.value);
        self.out = Some(out);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) {
        if let Some(out) = self.out {
            ctx.write(out, self.value);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct StepSlots {
    y0: SlotRef,
    amplitude: SlotRef,
    t_step: SlotRef,
    out: SlotRef,
}

/// `y_0` before `t_step`, `y_0 + y_A` from `t_step` on.
#[derive(Debug, Default)]
pub struct SignalStep {
    slots: Option<StepSlots>,
}

impl SignalStep {
    fn value(y0: Real, amplitude: Real, t_step: Real, t: Real) -> Real {
        if t < t_step { y0 } else { y0 + amplitude }
    }
}

impl Component for SignalStep {
    fn role(&self) -> CausalRole {
        CausalRole::Signal
    }

    fn configure(&self, cfg: &mut Configurator) {
        cfg.add_input_variable("y_0", "Base value", "", 0.0);
        cfg.add_input_variable("y_A", "Amplitude", "", 1.0);
        cfg.add_input_variable("t_step", "Step time", "s", 1.0);
        cfg.add_output_variable("out", "");
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> ComponentResult<()> {
        let s = StepSlots {
            y0: value_slot(ctx, "y_0")?,
            amplitude: value_slot(ctx, "y_A")?,
            t_step: value_slot(ctx, "t_step")?,
            out: value_slot(ctx, "out")?,
        };
        let y = Self::value(ctx.read(s.y0), ctx.read(s.amplitude), ctx.read(s.t_step), ctx.time());
        ctx.write(s.out, y);
        self.slots = Some(s);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) {
        let Some(s) = self.slots else { return };
        let y = Self::value(ctx.read(s.y0), ctx.read(s.amplitude), ctx.read(s.t_step), ctx.time());
        ctx.write(s.out, y);
    }
}

#[derive(Debug, Clone, Copy)]
struct SineSlots {
    frequency: SlotRef,
    amplitude: SlotRef,
    offset: SlotRef,
    t_start: SlotRef,
    out: SlotRef,
}

/// `y_offset + y_A·sin(2πf·(t - t_start))` once `t_start` is reached.
#[derive(Debug, Default)]
pub struct SignalSineWave {
    slots: Option<SineSlots>,
}

impl SignalSineWave {
    fn sample(&self, ctx: &SimContext<'_>, s: SineSlots) -> Real {
        let t = ctx.time();
        let t_start = ctx.read(s.t_start);
        let offset = ctx.read(s.offset);
        if t < t_start {
            offset
        } else {
            offset + ctx.read(s.amplitude) * (2.0 * PI * ctx.read(s.frequency) * (t - t_start)).sin()
        }
    }
}

impl Component for SignalSineWave {
    fn role(&self) -> CausalRole {
        CausalRole::Signal
    }

    fn configure(&self, cfg: &mut Configurator) {
        cfg.add_input_variable("f", "Frequency", "Hz", 1.0);
        cfg.add_input_variable("y_A", "Amplitude", "", 1.0);
        cfg.add_input_variable("y_offset", "Offset", "", 0.0);
        cfg.add_input_variable("t_start", "Start time", "s", 0.0);
        cfg.add_output_variable("out", "");
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> ComponentResult<()> {
        let s = SineSlots {
            frequency: value_slot(ctx, "f")?,
            amplitude: value_slot(ctx, "y_A")?,
            offset: value_slot(ctx, "y_offset")?,
            t_start: value_slot(ctx, "t_start")?,
            out: value_slot(ctx, "out")?,
        };
        let y = self.sample(ctx, s);
        ctx.write(s.out, y);
        self.slots = Some(s);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) {
        let Some(s) = self.slots else { return };
        let y = self.sample(ctx, s);
        ctx.write(s.out, y);
    }
}

#[derive(Debug, Clone, Copy)]
struct RampSlots {
    y0: SlotRef,
    amplitude: SlotRef,
    t_start: SlotRef,
    t_end: SlotRef,
    out: SlotRef,
}

/// Linear transition from `y_0` to `y_0 + y_A` between `t_start` and `t_end`.
#[derive(Debug, Default)]
pub struct SignalRamp {
    slots: Option<RampSlots>,
}

impl SignalRamp {
    fn value(y0: Real, amplitude: Real, t_start: Real, t_end: Real, t: Real) -> Real {
        if t < t_start {
            y0
        } else if t >= t_end {
            y0 + amplitude
        } else {
            y0 + amplitude * (t - t_start) / (t_end - t_start)
        }
    }

    fn sample(ctx: &SimContext<'_>, s: RampSlots) -> Real {
        Self::value(
            ctx.read(s.y0),
            ctx.read(s.amplitude),
            ctx.read(s.t_start),
            ctx.read(s.t_end),
            ctx.time(),
        )
    }
}

impl Component for SignalRamp {
    fn role(&self) -> CausalRole {
        CausalRole::Signal
    }

    fn configure(&self, cfg: &mut Configurator) {
        cfg.add_input_variable("y_0", "Base value", "", 0.0);
        cfg.add_input_variable("y_A", "Amplitude", "", 1.0);
        cfg.add_input_variable("t_start", "Start time", "s", 1.0);
        cfg.add_input_variable("t_end", "Stop time", "s", 2.0);
        cfg.add_output_variable("out", "");
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> ComponentResult<()> {
        let s = RampSlots {
            y0: value_slot(ctx, "y_0")?,
            amplitude: value_slot(ctx, "y_A")?,
            t_start: value_slot(ctx, "t_start")?,
            t_end: value_slot(ctx, "t_end")?,
            out: value_slot(ctx, "out")?,
        };
        let y = Self::sample(ctx, s);
        ctx.write(s.out, y);
        self.slots = Some(s);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) {
        let Some(s) = self.slots else { return };
        let y = Self::sample(ctx, s);
        ctx.write(s.out, y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::ParameterValue;
    use crate::testing::Harness;
    use tlm_node::signal::{VALUE, node_type};

    #[test]
    fn step_switches_at_step_time() {
        assert_eq!(SignalStep::value(0.0, 1.0, 1.0, 0.999), 0.0);
        assert_eq!(SignalStep::value(0.0, 1.0, 1.0, 1.0), 1.0);
        assert_eq!(SignalStep::value(2.0, -1.0, 0.0, 5.0), 1.0);
    }

    #[test]
    fn ramp_segments() {
        assert_eq!(SignalRamp::value(1.0, 2.0, 1.0, 3.0, 0.5), 1.0);
        assert_eq!(SignalRamp::value(1.0, 2.0, 1.0, 3.0, 2.0), 2.0);
        assert_eq!(SignalRamp::value(1.0, 2.0, 1.0, 3.0, 4.0), 3.0);
    }

    #[test]
    fn sine_quarter_period() {
        let mut h = Harness::new(0.25);
        let out = h.node(node_type());
        let mut sine = SignalSineWave::default();
        h.init(&mut sine, &[("out", vec![out])], &[("y_offset", ParameterValue::Real(1.0))])
            .unwrap();
        assert_eq!(h.get(out, VALUE), 1.0);
        h.advance();
        h.step(&mut sine);
        assert!((h.get(out, VALUE) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn constant_writes_parameter() {
        let mut h = Harness::new(0.1);
        let out = h.node(node_type());
        let mut constant = SignalConstant::default();
        h.init(&mut constant, &[("out", vec![out])], &[("y", ParameterValue::Real(-3.5))])
            .unwrap();
        h.set(out, VALUE, 0.0);
        h.step(&mut constant);
        assert_eq!(h.get(out, VALUE), -3.5);
    }
}
