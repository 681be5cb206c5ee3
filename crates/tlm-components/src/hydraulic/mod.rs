//! Hydraulic components and the shared flow functions they use.
//!
//! Sign convention: flow at a port is positive into the component, so a
//! component with `q1 = -q2` passes flow from P1 to P2 when `q2 > 0`.

mod orifice;
mod sensor;
mod sources;
mod valve;
mod volume;

pub use orifice::{HydraulicLaminarOrifice, HydraulicTurbulentOrifice};
pub use sensor::HydraulicPressureSensor;
pub use sources::{HydraulicFlowSourceQ, HydraulicPressureSourceC};
pub use valve::HydraulicPressureReliefValve;
pub use volume::HydraulicVolume;

use tlm_core::{NodeId, Real};
use tlm_node::{SlotRef, hydraulic};

use crate::context::{InitContext, SimContext};
use crate::error::ComponentResult;

/// Flow, pressure, wave variable and impedance of one hydraulic node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HydraulicSlots {
    pub q: SlotRef,
    pub p: SlotRef,
    pub c: SlotRef,
    pub zc: SlotRef,
}

impl HydraulicSlots {
    pub fn bind(ctx: &InitContext<'_>, node: NodeId) -> ComponentResult<Self> {
        Ok(Self {
            q: ctx.node_slot(node, hydraulic::FLOW)?,
            p: ctx.node_slot(node, hydraulic::PRESSURE)?,
            c: ctx.node_slot(node, hydraulic::WAVE_VARIABLE)?,
            zc: ctx.node_slot(node, hydraulic::CHAR_IMPEDANCE)?,
        })
    }

    pub fn of_port(ctx: &InitContext<'_>, port: &str) -> ComponentResult<Self> {
        Self::bind(ctx, ctx.node(port)?)
    }

    /// `(c, Zc)` as written by the storage side.
    pub fn wave(&self, ctx: &SimContext<'_>) -> (Real, Real) {
        (ctx.read(self.c), ctx.read(self.zc))
    }
}

/// Flow from side 1 to side 2 through a turbulent restriction with flow
/// coefficient `ks`, solved in closed form against both TLM lines.
pub fn turbulent_flow(ks: Real, c1: Real, c2: Real, zc1: Real, zc2: Real) -> Real {
    let half = ks * (zc1 + zc2) / 2.0;
    if c1 > c2 {
        ks * ((c1 - c2 + half * half).sqrt() - half)
    } else {
        ks * (half - (c2 - c1 + half * half).sqrt())
    }
}

/// Dead band of width `xh` around the previous position.
pub fn hysteresis(xs: Real, xh: Real, previous: Real) -> Real {
    if xs > previous + xh / 2.0 {
        xs - xh / 2.0
    } else if xs < previous - xh / 2.0 {
        xs + xh / 2.0
    } else {
        previous
    }
}

/// Resolve `(p1, q1, p2, q2)` for a two-port passing `q2` from P1 to P2.
#[inline]
pub(crate) fn two_port_efforts(q2: Real, c1: Real, zc1: Real, c2: Real, zc2: Real) -> (Real, Real, Real, Real) {
    let q1 = -q2;
    (c1 + q1 * zc1, q1, c2 + q2 * zc2, q2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turbulent_flow_is_antisymmetric() {
        let ks = 2e-7;
        let forward = turbulent_flow(ks, 3e6, 1e6, 1e9, 2e9);
        let reverse = turbulent_flow(ks, 1e6, 3e6, 2e9, 1e9);
        assert!(forward > 0.0);
        assert!((forward + reverse).abs() < 1e-15);
    }

    #[test]
    fn turbulent_flow_satisfies_orifice_law() {
        let (ks, c1, c2, zc1, zc2) = (1e-7, 5e6, 1e6, 5e8, 5e8);
        let q = turbulent_flow(ks, c1, c2, zc1, zc2);
        let (p1, _, p2, _) = two_port_efforts(q, c1, zc1, c2, zc2);
        let from_law = ks * (p1 - p2).sqrt();
        assert!((q - from_law).abs() / q < 1e-9);
    }

    #[test]
    fn hysteresis_band() {
        assert_eq!(hysteresis(1.0, 0.5, 1.1), 1.1);
        assert_eq!(hysteresis(2.0, 0.5, 1.0), 1.75);
        assert_eq!(hysteresis(0.0, 0.5, 1.0), 0.25);
    }
}
