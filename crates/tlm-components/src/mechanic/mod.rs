//! Translational mechanics.

mod force_source;
mod spring;

pub use force_source::MechanicForceSource;
pub use spring::MechanicSpring;

use tlm_core::NodeId;
use tlm_node::{SlotRef, mechanic};

use crate::context::InitContext;
use crate::error::ComponentResult;

/// Velocity, force, position, wave variable and impedance of one mechanic node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MechanicSlots {
    pub v: SlotRef,
    pub f: SlotRef,
    pub x: SlotRef,
    pub c: SlotRef,
    pub zc: SlotRef,
}

impl MechanicSlots {
    pub fn bind(ctx: &InitContext<'_>, node: NodeId) -> ComponentResult<Self> {
        Ok(Self {
            v: ctx.node_slot(node, mechanic::VELOCITY)?,
            f: ctx.node_slot(node, mechanic::FORCE)?,
            x: ctx.node_slot(node, mechanic::POSITION)?,
            c: ctx.node_slot(node, mechanic::WAVE_VARIABLE)?,
            zc: ctx.node_slot(node, mechanic::CHAR_IMPEDANCE)?,
        })
    }

    pub fn of_port(ctx: &InitContext<'_>, port: &str) -> ComponentResult<Self> {
        Self::bind(ctx, ctx.node(port)?)
    }
}
