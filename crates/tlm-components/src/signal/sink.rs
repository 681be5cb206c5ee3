use tlm_core::Real;
use tlm_node::{SlotRef, signal};

use crate::configurator::Configurator;
use crate::context::{InitContext, SimContext};
use crate::error::ComponentResult;
use crate::traits::{CausalRole, Component};

/// Upper bound on samples reserved per channel before the run starts.
const MAX_RESERVED_SAMPLES: usize = 1 << 16;

/// Records every signal connected to `in`, one channel per connection.
#[derive(Debug, Default)]
pub struct SignalSink {
    inputs: Vec<SlotRef>,
    time: Vec<Real>,
    channels: Vec<Vec<Real>>,
}

impl SignalSink {
    /// Times of the recorded samples.
    pub fn time(&self) -> &[Real] {
        &self.time
    }

    pub fn channel(&self, index: usize) -> Option<&[Real]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }
}

impl Component for SignalSink {
    fn role(&self) -> CausalRole {
        CausalRole::Signal
    }

    fn configure(&self, cfg: &mut Configurator) {
        cfg.add_read_multiport("in", signal::NAME);
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> ComponentResult<()> {
        self.inputs = ctx.multiport_slots("in", signal::VALUE)?;
        let steps = ((ctx.stop_time() - ctx.start_time()) / ctx.timestep())
            .round()
            .clamp(0.0, MAX_RESERVED_SAMPLES as Real) as usize;
        self.time = Vec::with_capacity(steps);
        self.channels = self
            .inputs
            .iter()
            .map(|_| Vec::with_capacity(steps))
            .collect();
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) {
        self.time.push(ctx.time());
        for (slot, channel) in self.inputs.iter().zip(&mut self.channels) {
            channel.push(ctx.read(*slot));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;
    use tlm_node::signal::{VALUE, node_type};

    #[test]
    fn records_each_connection() {
        let mut h = Harness::new(0.5);
        let a = h.node(node_type());
        let b = h.node(node_type());
        let mut sink = SignalSink::default();
        h.init(&mut sink, &[("in", vec![a, b])], &[]).unwrap();

        h.set(a, VALUE, 1.0);
        h.set(b, VALUE, -1.0);
        h.advance();
        h.step(&mut sink);
        h.set(a, VALUE, 2.0);
        h.advance();
        h.step(&mut sink);

        assert_eq!(sink.time(), &[0.5, 1.0]);
        assert_eq!(sink.channel(0).unwrap(), &[1.0, 2.0]);
        assert_eq!(sink.channel(1).unwrap(), &[-1.0, -1.0]);
        assert!(sink.channel(2).is_none());
    }

    #[test]
    fn long_span_reserves_bounded_storage() {
        let mut h = Harness::new(1e-3);
        h.stop_time = 1e13;
        let a = h.node(node_type());
        let mut sink = SignalSink::default();
        h.init(&mut sink, &[("in", vec![a])], &[]).unwrap();

        assert!(sink.time.capacity() <= MAX_RESERVED_SAMPLES);
        assert!(sink.channels[0].capacity() <= MAX_RESERVED_SAMPLES);

        h.set(a, VALUE, 3.0);
        h.advance();
        h.step(&mut sink);
        assert_eq!(sink.channel(0).unwrap(), &[3.0]);
    }
}
