//! Signal-domain blocks: sources, arithmetic, dynamics and a recorder.
//!
//! Inputs are input variables, so an unconnected input reads its parameter
//! value. Every block writes a single output named `out`.

mod dynamic;
mod math;
mod sink;
mod sources;

pub use dynamic::{SignalFirstOrderFilter, SignalUnitDelay};
pub use math::{SignalAdd, SignalGain, SignalSubtract};
pub use sink::SignalSink;
pub use sources::{SignalConstant, SignalRamp, SignalSineWave, SignalStep};

use tlm_node::{SlotRef, signal};

use crate::context::InitContext;
use crate::error::ComponentResult;

pub(crate) fn value_slot(ctx: &InitContext<'_>, port: &str) -> ComponentResult<SlotRef> {
    ctx.slot(port, signal::VALUE)
}
