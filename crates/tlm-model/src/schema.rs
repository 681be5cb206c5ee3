//! Model schema definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tlm_core::Real;

/// Type name of a nested system in [`ComponentDef::type_name`].
pub const SUBSYSTEM_TYPE: &str = "Subsystem";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelDef {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub simulation: SimulationDef,
    pub system: SystemDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationDef {
    pub start_time: Real,
    pub stop_time: Real,
    pub timestep: Real,
    pub log_samples: usize,
}

impl Default for SimulationDef {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            stop_time: 10.0,
            timestep: 1e-3,
            log_samples: 2048,
        }
    }
}

/// One level of the hierarchy. The root takes the model's name, a nested
/// system the name of the component that holds it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SystemDef {
    /// Own timestep; only meaningful together with `inherit_timestep: false`
    /// on a nested system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestep: Option<Real>,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub inherit_timestep: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<SystemParameterDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<SystemPortDef>,
    #[serde(default)]
    pub components: Vec<ComponentDef>,
    #[serde(default)]
    pub connections: Vec<ConnectionDef>,
}

fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemParameterDef {
    pub name: String,
    pub value: ValueDef,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PortKindDef {
    Power,
    Read,
    Write,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemPortDef {
    pub name: String,
    pub kind: PortKindDef,
    pub node_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, ParameterDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub start_values: Vec<StartValueDef>,
    /// Body of a [`SUBSYSTEM_TYPE`] component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<Box<SystemDef>>,
}

impl ComponentDef {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            parameters: BTreeMap::new(),
            start_values: Vec::new(),
            system: None,
        }
    }

    pub fn subsystem(name: impl Into<String>, system: SystemDef) -> Self {
        Self {
            system: Some(Box::new(system)),
            ..Self::new(name, SUBSYSTEM_TYPE)
        }
    }

    pub fn with_parameter(mut self, name: &str, value: impl Into<ParameterDef>) -> Self {
        self.parameters.insert(name.to_owned(), value.into());
        self
    }
}

/// A literal value. Untagged, so `3` reads as an integer and `3.0` as a real.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ValueDef {
    Bool(bool),
    Integer(i64),
    Real(Real),
    Text(String),
}

/// A component parameter: a literal, or `{ ref: name }` bound to a
/// parameter of the enclosing system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParameterDef {
    Ref {
        #[serde(rename = "ref")]
        target: String,
    },
    Value(ValueDef),
}

impl From<Real> for ParameterDef {
    fn from(v: Real) -> Self {
        ParameterDef::Value(ValueDef::Real(v))
    }
}

impl From<i64> for ParameterDef {
    fn from(v: i64) -> Self {
        ParameterDef::Value(ValueDef::Integer(v))
    }
}

impl From<bool> for ParameterDef {
    fn from(v: bool) -> Self {
        ParameterDef::Value(ValueDef::Bool(v))
    }
}

impl From<&str> for ParameterDef {
    fn from(v: &str) -> Self {
        ParameterDef::Value(ValueDef::Text(v.to_owned()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StartValueDef {
    pub port: String,
    pub slot: String,
    pub value: Real,
}

/// `"component.port"` on either side, or a bare `"port"` for a port of the
/// enclosing system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionDef {
    pub from: String,
    pub to: String,
}

impl ConnectionDef {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_read_refs_and_literals() {
        let yaml = "
name: gain
type: SignalGain
parameters:
  k: { ref: scale }
  n: 3
  x: 3.0
  on: true
  label: fast
";
        let def: ComponentDef = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.parameters["k"], ParameterDef::Ref { target: "scale".into() });
        assert_eq!(def.parameters["n"], ParameterDef::from(3_i64));
        assert_eq!(def.parameters["x"], ParameterDef::from(3.0));
        assert_eq!(def.parameters["on"], ParameterDef::from(true));
        assert_eq!(def.parameters["label"], ParameterDef::from("fast"));
        assert!(def.system.is_none());
    }

    #[test]
    fn system_defaults_inherit_timestep() {
        let def: SystemDef = serde_yaml::from_str("components: []").unwrap();
        assert!(def.inherit_timestep);
        assert_eq!(def.timestep, None);
        let json = serde_json::to_string(&def).unwrap();
        assert_eq!(json, r#"{"components":[],"connections":[]}"#);
    }
}
