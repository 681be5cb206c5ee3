//! Minimal stand-in for a containing system, for exercising one or two
//! components against a hand-built node table.

use std::collections::BTreeMap;
use std::sync::Arc;

use tlm_core::{MessageHandler, NodeId, Real};
use tlm_node::{NodeFactory, NodeTable, NodeType, signal};

use crate::configurator::ComponentSpec;
use crate::context::{AbortFlag, InitContext, SimContext};
use crate::error::ComponentResult;
use crate::parameter::{ParameterValue, resolve_parameters};
use crate::traits::Component;

pub struct Harness {
    pub nodes: NodeTable,
    pub messages: MessageHandler,
    pub abort: AbortFlag,
    pub time: Real,
    pub timestep: Real,
    pub stop_time: Real,
}

impl Harness {
    pub fn new(timestep: Real) -> Self {
        Self {
            nodes: NodeTable::new(),
            messages: MessageHandler::new(),
            abort: AbortFlag::new(),
            time: 0.0,
            timestep,
            stop_time: 10.0,
        }
    }

    pub fn node(&mut self, node_type: NodeType) -> NodeId {
        self.nodes.push_node(Arc::new(node_type))
    }

    /// Bind `ports` by name and initialize. Unbound read and write ports get
    /// a placeholder node; input variables start it at their parameter value.
    pub fn init(
        &mut self,
        component: &mut dyn Component,
        ports: &[(&str, Vec<NodeId>)],
        parameters: &[(&str, ParameterValue)],
    ) -> ComponentResult<()> {
        let spec = ComponentSpec::of(component);
        spec.validate()?;
        let overrides: BTreeMap<String, ParameterValue> = parameters
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect();
        let params = resolve_parameters(&spec.parameters, &overrides, |_| None)?;

        let mut bindings = vec![Vec::new(); spec.ports.len()];
        for (name, nodes) in ports {
            if let Some(idx) = spec.port_index(name) {
                bindings[idx] = nodes.clone();
            }
        }
        for (idx, port) in spec.ports.iter().enumerate() {
            if !bindings[idx].is_empty() || port.kind.is_power() || port.kind.is_multi() {
                continue;
            }
            let node_type = NodeFactory::with_builtins()
                .get(&port.node_type)
                .map_or_else(signal::node_type, |t| (*t).clone());
            let node = self.node(node_type);
            if spec.is_input_variable(idx) {
                let value = params.real(&port.name)?;
                let slot = self.nodes.slot(node, signal::VALUE)?;
                self.nodes.set(slot, value);
            }
            bindings[idx].push(node);
        }

        let sim = SimContext::new(
            &mut self.nodes,
            self.time,
            self.timestep,
            &self.messages,
            &self.abort,
            "component",
        );
        let mut ctx = InitContext::new(sim, &spec, &bindings, &params, self.stop_time);
        component.initialize(&mut ctx)
    }

    /// Run one step at the current time.
    pub fn step(&mut self, component: &mut dyn Component) {
        let mut ctx = SimContext::new(
            &mut self.nodes,
            self.time,
            self.timestep,
            &self.messages,
            &self.abort,
            "component",
        );
        component.simulate_one_timestep(&mut ctx);
    }

    pub fn advance(&mut self) {
        self.time += self.timestep;
    }

    pub fn get(&self, node: NodeId, slot: usize) -> Real {
        self.nodes.node_values(node)[slot]
    }

    pub fn set(&mut self, node: NodeId, slot: usize, value: Real) {
        self.nodes.node_values_mut(node)[slot] = value;
    }
}
