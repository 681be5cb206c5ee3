//! tlm-filters: discrete-time building blocks for components.
//!
//! - [`Delay`]: fixed-length ring buffer used for time delays and backups
//! - First and second order transfer functions discretized with the bilinear
//!   transform, in fixed and variable timestep flavours

pub mod delay;
pub mod error;
pub mod transfer;

pub use delay::Delay;
pub use error::{FilterError, FilterResult};
pub use transfer::{
    FirstOrderTransferFunction, FirstOrderTransferFunctionVariable, Limits,
    SecondOrderTransferFunction, SecondOrderTransferFunctionVariable,
};
