//! What a component sees while initializing and simulating.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tlm_core::{MessageHandler, NodeId, Real, Severity};
use tlm_node::{NodeTable, SlotRef};

use crate::configurator::ComponentSpec;
use crate::error::{ComponentError, ComponentResult};
use crate::parameter::ParameterSet;

/// Cooperative stop request shared between a system, its components and
/// whoever drives the run.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Whether both handles trip the same flag.
    pub fn same_as(&self, other: &AbortFlag) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

pub struct SimContext<'a> {
    nodes: &'a mut NodeTable,
    time: Real,
    timestep: Real,
    messages: &'a MessageHandler,
    abort: &'a AbortFlag,
    name: &'a str,
}

impl<'a> SimContext<'a> {
    pub fn new(
        nodes: &'a mut NodeTable,
        time: Real,
        timestep: Real,
        messages: &'a MessageHandler,
        abort: &'a AbortFlag,
        name: &'a str,
    ) -> Self {
        Self {
            nodes,
            time,
            timestep,
            messages,
            abort,
            name,
        }
    }

    #[inline]
    pub fn read(&self, slot: SlotRef) -> Real {
        self.nodes.get(slot)
    }

    #[inline]
    pub fn write(&mut self, slot: SlotRef, value: Real) {
        self.nodes.set(slot, value);
    }

    pub fn nodes(&self) -> &NodeTable {
        self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut NodeTable {
        self.nodes
    }

    /// Time at the end of the step being computed.
    pub fn time(&self) -> Real {
        self.time
    }

    pub fn timestep(&self) -> Real {
        self.timestep
    }

    /// Instance name of the component this context belongs to.
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn messages(&self) -> &'a MessageHandler {
        self.messages
    }

    pub fn abort_flag(&self) -> &'a AbortFlag {
        self.abort
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_set()
    }

    pub fn message(&self, severity: Severity, text: impl Into<String>) {
        self.messages.add(severity, text, Some(self.name));
    }

    pub fn info(&self, text: impl Into<String>) {
        self.message(Severity::Info, text);
    }

    pub fn warning(&self, text: impl Into<String>) {
        self.message(Severity::Warning, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.message(Severity::Error, text);
    }

    /// Report `reason` and trip the abort flag of the running system.
    pub fn stop_simulation(&self, reason: &str) {
        self.message(
            Severity::Error,
            format!("Simulation stopped by {} at t = {}: {reason}", self.name, self.time),
        );
        self.abort.set();
    }
}

/// Context for [`Component::initialize`](crate::Component::initialize).
///
/// Dereferences to the [`SimContext`] so slots can be read and written while
/// initializing, and adds port lookup and resolved parameters.
pub struct InitContext<'a> {
    sim: SimContext<'a>,
    spec: &'a ComponentSpec,
    bindings: &'a [Vec<NodeId>],
    parameters: &'a ParameterSet,
    stop_time: Real,
}

impl<'a> InitContext<'a> {
    /// `sim.time()` is the start time; `bindings[i]` holds the nodes of port `i`.
    pub fn new(
        sim: SimContext<'a>,
        spec: &'a ComponentSpec,
        bindings: &'a [Vec<NodeId>],
        parameters: &'a ParameterSet,
        stop_time: Real,
    ) -> Self {
        Self {
            sim,
            spec,
            bindings,
            parameters,
            stop_time,
        }
    }

    pub fn start_time(&self) -> Real {
        self.sim.time
    }

    pub fn stop_time(&self) -> Real {
        self.stop_time
    }

    pub fn spec(&self) -> &ComponentSpec {
        self.spec
    }

    pub fn parameters(&self) -> &ParameterSet {
        self.parameters
    }

    fn port_index(&self, port: &str) -> ComponentResult<usize> {
        self.spec
            .port_index(port)
            .ok_or_else(|| ComponentError::UnknownPort { name: port.to_owned() })
    }

    /// All nodes behind `port`, one per connection for multi-ports.
    pub fn port_nodes(&self, port: &str) -> ComponentResult<&'a [NodeId]> {
        let idx = self.port_index(port)?;
        Ok(self.bindings.get(idx).map_or(&[][..], Vec::as_slice))
    }

    /// The single node behind a non-multi port.
    pub fn node(&self, port: &str) -> ComponentResult<NodeId> {
        let idx = self.port_index(port)?;
        if self.spec.ports[idx].kind.is_multi() {
            return Err(ComponentError::MultiPort { name: port.to_owned() });
        }
        self.bindings
            .get(idx)
            .and_then(|nodes| nodes.first())
            .copied()
            .ok_or_else(|| ComponentError::Unconnected { name: port.to_owned() })
    }

    pub fn node_slot(&self, node: NodeId, slot: usize) -> ComponentResult<SlotRef> {
        Ok(self.sim.nodes.slot(node, slot)?)
    }

    pub fn slot(&self, port: &str, slot: usize) -> ComponentResult<SlotRef> {
        let node = self.node(port)?;
        self.node_slot(node, slot)
    }

    pub fn slot_by_name(&self, port: &str, slot: &str) -> ComponentResult<SlotRef> {
        let node = self.node(port)?;
        Ok(self.sim.nodes.slot_by_name(node, slot)?)
    }

    /// `slot` of every node behind a multi-port, in connection order.
    pub fn multiport_slots(&self, port: &str, slot: usize) -> ComponentResult<Vec<SlotRef>> {
        self.port_nodes(port)?
            .iter()
            .map(|&node| self.node_slot(node, slot))
            .collect()
    }

    pub fn real(&self, name: &str) -> ComponentResult<Real> {
        self.parameters.real(name)
    }

    pub fn integer(&self, name: &str) -> ComponentResult<i64> {
        self.parameters.integer(name)
    }

    pub fn boolean(&self, name: &str) -> ComponentResult<bool> {
        self.parameters.boolean(name)
    }

    pub fn text(&self, name: &str) -> ComponentResult<&str> {
        self.parameters.text(name)
    }

    /// A real parameter that must be strictly positive.
    pub fn positive(&self, name: &str) -> ComponentResult<Real> {
        let v = self.real(name)?;
        if v > 0.0 && v.is_finite() {
            Ok(v)
        } else {
            Err(ComponentError::InvalidParameter {
                name: name.to_owned(),
                what: "must be positive",
            })
        }
    }
}

impl<'a> Deref for InitContext<'a> {
    type Target = SimContext<'a>;

    fn deref(&self) -> &Self::Target {
        &self.sim
    }
}

impl DerefMut for InitContext<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.sim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configurator::Configurator;
    use crate::parameter::ParameterValue;
    use std::sync::Arc;
    use tlm_node::hydraulic;

    #[test]
    fn stop_simulation_trips_flag_and_reports() {
        let mut nodes = NodeTable::new();
        let messages = MessageHandler::new();
        let abort = AbortFlag::new();
        let ctx = SimContext::new(&mut nodes, 0.5, 1e-3, &messages, &abort, "orifice");

        ctx.stop_simulation("negative volume");
        assert!(abort.is_set());
        let msg = messages.get_message().unwrap();
        assert_eq!(msg.severity, Severity::Error);
        assert_eq!(msg.tag.as_deref(), Some("orifice"));
        assert!(msg.text.contains("negative volume"));
    }

    #[test]
    fn ports_resolve_to_slots() {
        let mut cfg = Configurator::new();
        cfg.add_power_port("P1", hydraulic::NAME);
        cfg.add_power_multiport("PM", hydraulic::NAME);
        cfg.add_real("V", "", "m^3", 1e-3);
        let spec = cfg.finish();

        let mut nodes = NodeTable::new();
        let node_type = Arc::new(hydraulic::node_type());
        let a = nodes.push_node(node_type.clone());
        let b = nodes.push_node(node_type.clone());
        let c = nodes.push_node(node_type);
        let bindings = vec![vec![a], vec![b, c]];
        let mut params = ParameterSet::new();
        params.insert("V", ParameterValue::Real(2e-3));

        let messages = MessageHandler::new();
        let abort = AbortFlag::new();
        let sim = SimContext::new(&mut nodes, 0.0, 1e-3, &messages, &abort, "vol");
        let ctx = InitContext::new(sim, &spec, &bindings, &params, 1.0);

        let p = ctx.slot("P1", hydraulic::PRESSURE).unwrap();
        assert_eq!(ctx.read(p), 1e5);
        assert_eq!(ctx.multiport_slots("PM", hydraulic::FLOW).unwrap().len(), 2);
        assert!(matches!(ctx.slot("PM", 0), Err(ComponentError::MultiPort { .. })));
        assert!(matches!(ctx.slot("P9", 0), Err(ComponentError::UnknownPort { .. })));
        assert_eq!(ctx.positive("V").unwrap(), 2e-3);
        assert_eq!(ctx.stop_time(), 1.0);
    }
}
