//! Node type descriptors and the built-in physical domains.
//!
//! A node type is a fixed list of named `f64` slots. Components address slots
//! by index, so each built-in domain exports its slot indices as constants.

use tlm_core::Real;

/// Role a slot plays in the TLM exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// Flow-like variable summed across a junction (flow, velocity, current).
    Flow,
    /// Effort-like variable that must agree across a junction (pressure, force).
    Effort,
    /// Wave variable `c` written by storage components.
    WaveVariable,
    /// Characteristic impedance `Zc` written by storage components.
    Impedance,
    /// Auxiliary physical state (temperature, position).
    State,
    /// Plain signal value.
    Signal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotDescriptor {
    pub name: String,
    pub unit: String,
    pub kind: SlotKind,
    pub default: Real,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeType {
    name: String,
    slots: Vec<SlotDescriptor>,
}

impl NodeType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: Vec::new(),
        }
    }

    pub fn with_slot(
        mut self,
        name: impl Into<String>,
        unit: impl Into<String>,
        kind: SlotKind,
        default: Real,
    ) -> Self {
        self.slots.push(SlotDescriptor {
            name: name.into(),
            unit: unit.into(),
            kind,
            default,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slots(&self) -> &[SlotDescriptor] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot_index(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }

    pub fn defaults(&self) -> impl Iterator<Item = Real> + '_ {
        self.slots.iter().map(|s| s.default)
    }

    /// Index of the first slot of the given kind, if any.
    pub fn first_of(&self, kind: SlotKind) -> Option<usize> {
        self.slots.iter().position(|s| s.kind == kind)
    }
}

pub mod signal {
    use super::{NodeType, SlotKind};

    pub const NAME: &str = "signal";
    pub const VALUE: usize = 0;

    pub fn node_type() -> NodeType {
        NodeType::new(NAME).with_slot("Value", "", SlotKind::Signal, 0.0)
    }
}

pub mod hydraulic {
    use super::{NodeType, SlotKind};

    pub const NAME: &str = "hydraulic";
    pub const FLOW: usize = 0;
    pub const PRESSURE: usize = 1;
    pub const TEMPERATURE: usize = 2;
    pub const WAVE_VARIABLE: usize = 3;
    pub const CHAR_IMPEDANCE: usize = 4;
    pub const HEAT_FLOW: usize = 5;

    pub fn node_type() -> NodeType {
        NodeType::new(NAME)
            .with_slot("Flow", "m^3/s", SlotKind::Flow, 0.0)
            .with_slot("Pressure", "Pa", SlotKind::Effort, 1e5)
            .with_slot("Temperature", "K", SlotKind::State, 293.0)
            .with_slot("WaveVariable", "Pa", SlotKind::WaveVariable, 1e5)
            .with_slot("CharImpedance", "Ns/m^5", SlotKind::Impedance, 0.0)
            .with_slot("HeatFlow", "W", SlotKind::State, 0.0)
    }
}

pub mod mechanic {
    use super::{NodeType, SlotKind};

    pub const NAME: &str = "mechanic";
    pub const VELOCITY: usize = 0;
    pub const FORCE: usize = 1;
    pub const POSITION: usize = 2;
    pub const WAVE_VARIABLE: usize = 3;
    pub const CHAR_IMPEDANCE: usize = 4;
    pub const EQUIVALENT_MASS: usize = 5;

    pub fn node_type() -> NodeType {
        NodeType::new(NAME)
            .with_slot("Velocity", "m/s", SlotKind::Flow, 0.0)
            .with_slot("Force", "N", SlotKind::Effort, 0.0)
            .with_slot("Position", "m", SlotKind::State, 0.0)
            .with_slot("WaveVariable", "N", SlotKind::WaveVariable, 0.0)
            .with_slot("CharImpedance", "Ns/m", SlotKind::Impedance, 0.0)
            .with_slot("EquivalentMass", "kg", SlotKind::State, 1.0)
    }
}

pub mod rotational {
    use super::{NodeType, SlotKind};

    pub const NAME: &str = "rotational";
    pub const ANGULAR_VELOCITY: usize = 0;
    pub const TORQUE: usize = 1;
    pub const ANGLE: usize = 2;
    pub const WAVE_VARIABLE: usize = 3;
    pub const CHAR_IMPEDANCE: usize = 4;
    pub const EQUIVALENT_INERTIA: usize = 5;

    pub fn node_type() -> NodeType {
        NodeType::new(NAME)
            .with_slot("AngularVelocity", "rad/s", SlotKind::Flow, 0.0)
            .with_slot("Torque", "Nm", SlotKind::Effort, 0.0)
            .with_slot("Angle", "rad", SlotKind::State, 0.0)
            .with_slot("WaveVariable", "Nm", SlotKind::WaveVariable, 0.0)
            .with_slot("CharImpedance", "Nms/rad", SlotKind::Impedance, 0.0)
            .with_slot("EquivalentInertia", "kgm^2", SlotKind::State, 1.0)
    }
}

pub mod electric {
    use super::{NodeType, SlotKind};

    pub const NAME: &str = "electric";
    pub const VOLTAGE: usize = 0;
    pub const CURRENT: usize = 1;
    pub const WAVE_VARIABLE: usize = 2;
    pub const CHAR_IMPEDANCE: usize = 3;

    pub fn node_type() -> NodeType {
        NodeType::new(NAME)
            .with_slot("Voltage", "V", SlotKind::Effort, 0.0)
            .with_slot("Current", "A", SlotKind::Flow, 0.0)
            .with_slot("WaveVariable", "V", SlotKind::WaveVariable, 0.0)
            .with_slot("CharImpedance", "V/A", SlotKind::Impedance, 0.0)
    }
}

pub fn builtin_node_types() -> Vec<NodeType> {
    vec![
        signal::node_type(),
        hydraulic::node_type(),
        mechanic::node_type(),
        rotational::node_type(),
        electric::node_type(),
    ]
}
