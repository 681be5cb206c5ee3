//! Fixed-length delay line.

use std::collections::VecDeque;

use tlm_core::Real;

use crate::error::{FilterError, FilterResult};

/// Ring buffer holding the last `len` values pushed through it.
///
/// `update` pushes a new value and returns the one that falls out, so a
/// delay of `n` steps returns what was pushed `n` updates ago.
#[derive(Debug, Clone, PartialEq)]
pub struct Delay<T> {
    buf: VecDeque<T>,
}

impl<T: Copy> Delay<T> {
    /// A delay of `steps` samples, at least one.
    pub fn new(steps: usize, init: T) -> Self {
        let len = steps.max(1);
        Self {
            buf: std::iter::repeat_n(init, len).collect(),
        }
    }

    /// A delay covering `time_delay` seconds at sample time `timestep`.
    pub fn from_time(time_delay: Real, timestep: Real, init: T) -> FilterResult<Self> {
        if !(timestep > 0.0) {
            return Err(FilterError::NonPositiveTimestep { value: timestep });
        }
        if !(time_delay >= 0.0) {
            return Err(FilterError::InvalidArg {
                what: "time delay must be non-negative",
            });
        }
        let steps = (time_delay / timestep).round() as usize;
        Ok(Self::new(steps, init))
    }

    /// Push `value` and return the oldest sample.
    pub fn update(&mut self, value: T) -> T {
        let oldest = self.buf.pop_front().unwrap_or(value);
        self.buf.push_back(value);
        oldest
    }

    pub fn oldest(&self) -> T {
        self.buf[0]
    }

    pub fn newest(&self) -> T {
        self.buf[self.buf.len() - 1]
    }

    /// Sample `i` steps back from the newest; `get(0)` is the newest.
    pub fn get(&self, i: usize) -> Option<T> {
        let len = self.buf.len();
        (i < len).then(|| self.buf[len - 1 - i])
    }

    /// Sample `i` steps forward from the oldest.
    pub fn get_old(&self, i: usize) -> Option<T> {
        self.buf.get(i).copied()
    }

    pub fn fill(&mut self, value: T) {
        self.buf.iter_mut().for_each(|v| *v = value);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
