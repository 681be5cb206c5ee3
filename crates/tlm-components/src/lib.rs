//! tlm-components: the component contract and the built-in library.
//!
//! Provides:
//! - The [`Component`] trait and its causal roles (storage, resistive, signal)
//! - [`Configurator`] for declaring ports, parameters and start values
//! - [`InitContext`] / [`SimContext`], the only view a component has of its nodes
//! - Parameter resolution against system parameters
//! - [`ComponentFactory`] and the dynamic [`PluginLoader`]
//! - Built-in signal, hydraulic and mechanic components
//!
//! Components never own node memory: `initialize` resolves ports into
//! [`SlotRef`](tlm_node::SlotRef)s once, and every step reads and writes
//! through them.

pub mod configurator;
pub mod context;
pub mod error;
pub mod factory;
pub mod hydraulic;
pub mod mechanic;
pub mod parameter;
pub mod plugin;
pub mod signal;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use configurator::{ComponentSpec, Configurator, StartValue};
pub use context::{AbortFlag, InitContext, SimContext};
pub use error::{ComponentError, ComponentResult};
pub use factory::{ComponentFactory, Creator};
pub use parameter::{ParameterKind, ParameterSet, ParameterSpec, ParameterValue, resolve_parameters};
pub use plugin::{
    CORE_VERSION, PLUGIN_ABI_VERSION, PluginDeclaration, PluginLoader, PluginRegistrar,
    check_declaration,
};
pub use traits::{CausalRole, Component};

/// Type names of every built-in component, in registration order.
pub const BUILTIN_TYPES: [&str; 19] = [
    "SignalConstant",
    "SignalStep",
    "SignalSineWave",
    "SignalRamp",
    "SignalGain",
    "SignalAdd",
    "SignalSubtract",
    "SignalUnitDelay",
    "SignalFirstOrderFilter",
    "SignalSink",
    "HydraulicVolume",
    "HydraulicPressureSourceC",
    "HydraulicLaminarOrifice",
    "HydraulicFlowSourceQ",
    "HydraulicTurbulentOrifice",
    "HydraulicPressureReliefValve",
    "HydraulicPressureSensor",
    "MechanicSpring",
    "MechanicForceSource",
];

fn boxed<C: Component + Default>() -> Box<dyn Component> {
    Box::new(C::default())
}

/// Register the built-in library into `factory`.
pub fn register_builtin_components(factory: &mut ComponentFactory) {
    let creators: [fn() -> Box<dyn Component>; 19] = [
        boxed::<signal::SignalConstant>,
        boxed::<signal::SignalStep>,
        boxed::<signal::SignalSineWave>,
        boxed::<signal::SignalRamp>,
        boxed::<signal::SignalGain>,
        boxed::<signal::SignalAdd>,
        boxed::<signal::SignalSubtract>,
        boxed::<signal::SignalUnitDelay>,
        boxed::<signal::SignalFirstOrderFilter>,
        boxed::<signal::SignalSink>,
        boxed::<hydraulic::HydraulicVolume>,
        boxed::<hydraulic::HydraulicPressureSourceC>,
        boxed::<hydraulic::HydraulicLaminarOrifice>,
        boxed::<hydraulic::HydraulicFlowSourceQ>,
        boxed::<hydraulic::HydraulicTurbulentOrifice>,
        boxed::<hydraulic::HydraulicPressureReliefValve>,
        boxed::<hydraulic::HydraulicPressureSensor>,
        boxed::<mechanic::MechanicSpring>,
        boxed::<mechanic::MechanicForceSource>,
    ];
    for (name, create) in BUILTIN_TYPES.into_iter().zip(creators) {
        factory.register(name, create);
    }
}
