//! tlm-system: containing systems and the multi-system scheduler.
//!
//! Provides:
//! - [`ComponentSystem`]: child components, their connections and system
//!   parameters, model checks, and the storage/resistive/signal step loop
//! - Nested systems that run as one component inside their parent
//! - [`DataLog`] sampling of every node during a run
//! - [`Scheduler`]: cost-measured partitioning of independent systems
//!   across worker threads

pub mod error;
pub mod log;
pub mod progress;
pub mod scheduler;
pub mod settings;
pub mod system;

mod ordering;

pub use error::{SystemError, SystemResult};
pub use log::{DataLog, LogSeries};
pub use progress::ProgressHandle;
pub use scheduler::{
    ScheduleReport, Scheduler, SchedulerOptions, SchedulerState, partition_by_cost,
    partition_loads,
};
pub use settings::{SimulationSettings, num_steps};
pub use system::{
    Child, ChildEntry, ComponentSystem, JUNCTION_TOLERANCE, SUBSYSTEM_TYPE, SystemParameter,
    parse_endpoint,
};

use tlm_components::{Component, ComponentFactory};
use tlm_node::RegisterStatus;

/// Register the nested-system type with `factory`.
pub fn register_subsystem(factory: &mut ComponentFactory) -> RegisterStatus {
    factory.register(SUBSYSTEM_TYPE, || {
        Box::new(ComponentSystem::default()) as Box<dyn Component>
    })
}
