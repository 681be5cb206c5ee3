//! Run settings for a containing system.

use tlm_core::Real;

use crate::error::{SystemError, SystemResult};

/// Time span, step and logging density of one run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationSettings {
    pub start_time: Real,
    pub stop_time: Real,
    pub timestep: Real,
    /// Logged samples per run, in addition to the start sample.
    pub log_samples: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            stop_time: 10.0,
            timestep: 1e-3,
            log_samples: 2048,
        }
    }
}

impl SimulationSettings {
    pub fn validate(&self) -> SystemResult<()> {
        if !self.timestep.is_finite() || self.timestep <= 0.0 {
            return Err(SystemError::InvalidArg {
                what: "timestep must be positive",
            });
        }
        if !self.start_time.is_finite() || !self.stop_time.is_finite() {
            return Err(SystemError::InvalidArg {
                what: "start and stop time must be finite",
            });
        }
        if self.stop_time < self.start_time {
            return Err(SystemError::InvalidArg {
                what: "stop time before start time",
            });
        }
        Ok(())
    }

    /// Steps needed to go from `start_time` to `stop_time`.
    pub fn num_steps(&self) -> usize {
        num_steps(self.start_time, self.stop_time, self.timestep)
    }
}

/// `round((stop - start) / dt)`, zero for an empty or inverted span.
pub fn num_steps(start: Real, stop: Real, timestep: Real) -> usize {
    let steps = ((stop - start) / timestep).round();
    if steps.is_finite() && steps > 0.0 {
        steps as usize
    } else {
        0
    }
}
