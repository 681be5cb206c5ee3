//! Port and parameter declaration.

use std::collections::BTreeSet;

use tlm_core::Real;
use tlm_node::{PortKind, PortSpec, signal};

use crate::error::{ComponentError, ComponentResult};
use crate::parameter::{ParameterSpec, ParameterValue};
use crate::traits::Component;

/// Start value for one slot of the node behind a port, e.g. `P1#Pressure`.
#[derive(Debug, Clone, PartialEq)]
pub struct StartValue {
    pub port: String,
    pub slot: String,
    pub value: Real,
}

impl StartValue {
    /// Parse a `port#slot` key.
    pub fn parse_key(key: &str) -> Option<(&str, &str)> {
        let (port, slot) = key.split_once('#')?;
        (!port.is_empty() && !slot.is_empty()).then_some((port, slot))
    }
}

/// Collects what a component declares in [`Component::configure`].
#[derive(Debug, Clone, Default)]
pub struct Configurator {
    ports: Vec<PortSpec>,
    parameters: Vec<ParameterSpec>,
    input_variables: Vec<usize>,
    start_values: Vec<StartValue>,
}

impl Configurator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_port(&mut self, spec: PortSpec) -> usize {
        self.ports.push(spec);
        self.ports.len() - 1
    }

    pub fn add_power_port(&mut self, name: &str, node_type: &str) -> usize {
        self.add_port(PortSpec::new(name, PortKind::Power, node_type))
    }

    pub fn add_power_multiport(&mut self, name: &str, node_type: &str) -> usize {
        self.add_port(PortSpec::new(name, PortKind::PowerMulti, node_type))
    }

    pub fn add_read_port(&mut self, name: &str, node_type: &str) -> usize {
        self.add_port(PortSpec::new(name, PortKind::Read, node_type))
    }

    pub fn add_read_multiport(&mut self, name: &str, node_type: &str) -> usize {
        self.add_port(PortSpec::new(name, PortKind::ReadMulti, node_type))
    }

    pub fn add_write_port(&mut self, name: &str, node_type: &str) -> usize {
        self.add_port(PortSpec::new(name, PortKind::Write, node_type))
    }

    fn add_parameter(&mut self, name: &str, description: &str, unit: &str, default: ParameterValue) {
        self.parameters.push(ParameterSpec {
            name: name.to_owned(),
            description: description.to_owned(),
            unit: unit.to_owned(),
            default,
        });
    }

    pub fn add_real(&mut self, name: &str, description: &str, unit: &str, default: Real) {
        self.add_parameter(name, description, unit, ParameterValue::Real(default));
    }

    pub fn add_integer(&mut self, name: &str, description: &str, default: i64) {
        self.add_parameter(name, description, "", ParameterValue::Integer(default));
    }

    pub fn add_bool(&mut self, name: &str, description: &str, default: bool) {
        self.add_parameter(name, description, "", ParameterValue::Bool(default));
    }

    pub fn add_text(&mut self, name: &str, description: &str, default: &str) {
        self.add_parameter(name, description, "", ParameterValue::Text(default.to_owned()));
    }

    /// Optional signal input backed by a same-named real parameter.
    ///
    /// When the port is left unconnected its placeholder node carries the
    /// parameter value, so the component always reads the port.
    pub fn add_input_variable(&mut self, name: &str, description: &str, unit: &str, default: Real) -> usize {
        let port = self.add_port(
            PortSpec::new(name, PortKind::Read, signal::NAME)
                .with_default(default)
                .with_description(description),
        );
        self.add_real(name, description, unit, default);
        self.input_variables.push(port);
        port
    }

    pub fn add_output_variable(&mut self, name: &str, description: &str) -> usize {
        self.add_port(PortSpec::new(name, PortKind::Write, signal::NAME).with_description(description))
    }

    pub fn set_start_value(&mut self, port: &str, slot: &str, value: Real) {
        self.start_values.retain(|s| !(s.port == port && s.slot == slot));
        self.start_values.push(StartValue {
            port: port.to_owned(),
            slot: slot.to_owned(),
            value,
        });
    }

    pub fn finish(self) -> ComponentSpec {
        ComponentSpec {
            ports: self.ports,
            parameters: self.parameters,
            input_variables: self.input_variables,
            start_values: self.start_values,
        }
    }
}

/// Everything a component declared, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentSpec {
    pub ports: Vec<PortSpec>,
    pub parameters: Vec<ParameterSpec>,
    /// Port indices declared with [`Configurator::add_input_variable`].
    pub input_variables: Vec<usize>,
    pub start_values: Vec<StartValue>,
}

impl ComponentSpec {
    pub fn of(component: &dyn Component) -> Self {
        let mut cfg = Configurator::new();
        component.configure(&mut cfg);
        cfg.finish()
    }

    pub fn port_index(&self, name: &str) -> Option<usize> {
        self.ports.iter().position(|p| p.name == name)
    }

    pub fn port(&self, name: &str) -> Option<&PortSpec> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn is_input_variable(&self, port: usize) -> bool {
        self.input_variables.contains(&port)
    }

    pub fn validate(&self) -> ComponentResult<()> {
        let mut seen = BTreeSet::new();
        for port in &self.ports {
            if !seen.insert(port.name.as_str()) {
                return Err(ComponentError::Duplicate {
                    what: "port",
                    name: port.name.clone(),
                });
            }
        }
        let mut seen = BTreeSet::new();
        for param in &self.parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(ComponentError::Duplicate {
                    what: "parameter",
                    name: param.name.clone(),
                });
            }
        }
        for start in &self.start_values {
            if self.port(&start.port).is_none() {
                return Err(ComponentError::UnknownPort {
                    name: start.port.clone(),
                });
            }
        }
        Ok(())
    }
}
