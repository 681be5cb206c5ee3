//! The component contract.

use core::fmt;
use std::any::Any;

use tlm_core::MessageHandler;

use crate::configurator::Configurator;
use crate::context::{InitContext, SimContext};
use crate::error::ComponentResult;

/// Which pass of a timestep a component runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CausalRole {
    /// Writes wave variable and impedance; evaluated first.
    Storage,
    /// Reads wave variable and impedance, writes effort and flow.
    Resistive,
    /// Plain value-in/value-out, ordered by signal dependencies.
    Signal,
}

impl CausalRole {
    pub const EVALUATION_ORDER: [CausalRole; 3] =
        [CausalRole::Storage, CausalRole::Resistive, CausalRole::Signal];

    pub fn code(self) -> &'static str {
        match self {
            CausalRole::Storage => "C",
            CausalRole::Resistive => "Q",
            CausalRole::Signal => "S",
        }
    }
}

impl fmt::Display for CausalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A simulation component.
///
/// Lifecycle: `configure` once when added to a system, `initialize` before
/// each run, `simulate_one_timestep` every step, `finalize` after the run.
///
/// `simulate_one_timestep` reads the slots it bound during `initialize`,
/// writes only its own slots, and never fails; a component that reaches an
/// unrecoverable state calls [`SimContext::stop_simulation`].
pub trait Component: Any + Send {
    fn role(&self) -> CausalRole;

    /// Declare ports, parameters and start values.
    fn configure(&self, cfg: &mut Configurator);

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> ComponentResult<()>;

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>);

    fn finalize(&mut self, _ctx: &mut SimContext<'_>) {}

    /// Whether outputs depend on inputs within the same step. Components that
    /// return `false` may close a signal loop.
    fn direct_feedthrough(&self) -> bool {
        true
    }

    /// Extra model checks run before simulation.
    fn check_model(&self, _messages: &MessageHandler) -> bool {
        true
    }
}
