//! The containing system: owns child components, their nodes and the
//! per-step evaluation order.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tlm_components::{
    AbortFlag, CausalRole, Component, ComponentSpec, InitContext, ParameterSet, ParameterValue,
    SimContext, StartValue, resolve_parameters,
};
use tlm_core::{CompId, MessageHandler, NodeId, Real, Severity, Tolerances};
use tlm_node::{
    Endpoint, JunctionBalance, NodeFactory, NodeIssue, NodeTable, PortKind, PortOwner, PortRef,
    PortSpec, Topology, signal,
};

use crate::error::{SystemError, SystemResult};
use crate::log::DataLog;
use crate::ordering::{signal_edges, stable_topological};
use crate::progress::ProgressHandle;
use crate::settings::{SimulationSettings, num_steps};

/// Effort spread tolerated across the branches of a multi-port junction.
pub const JUNCTION_TOLERANCE: Tolerances = Tolerances::new(1.0, 0.05);

/// Type name under which nested systems are registered.
pub const SUBSYSTEM_TYPE: &str = "Subsystem";

/// A child of a containing system.
pub enum Child {
    Leaf(Box<dyn Component>),
    System(Box<ComponentSystem>),
}

impl Child {
    pub fn as_component(&self) -> &dyn Component {
        match self {
            Child::Leaf(c) => c.as_ref(),
            Child::System(s) => s.as_ref(),
        }
    }

    pub fn as_component_mut(&mut self) -> &mut dyn Component {
        match self {
            Child::Leaf(c) => c.as_mut(),
            Child::System(s) => s.as_mut(),
        }
    }

    pub fn as_system(&self) -> Option<&ComponentSystem> {
        match self {
            Child::System(s) => Some(s.as_ref()),
            Child::Leaf(_) => None,
        }
    }

    pub fn role(&self) -> CausalRole {
        self.as_component().role()
    }
}

/// One child with its instance settings.
pub struct ChildEntry {
    name: String,
    type_name: String,
    component: Child,
    leaf_spec: ComponentSpec,
    parameters: BTreeMap<String, ParameterValue>,
    start_values: Vec<StartValue>,
}

impl ChildEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn child(&self) -> &Child {
        &self.component
    }

    /// Declared ports and parameters; a nested system is asked afresh since
    /// its boundary can still change.
    pub fn spec(&self) -> Cow<'_, ComponentSpec> {
        match &self.component {
            Child::Leaf(_) => Cow::Borrowed(&self.leaf_spec),
            Child::System(s) => Cow::Owned(ComponentSpec::of(s.as_ref())),
        }
    }

    /// Instance parameter values that replace the declared defaults.
    pub fn parameter_overrides(&self) -> &BTreeMap<String, ParameterValue> {
        &self.parameters
    }

    /// Instance start values, applied after the declared ones.
    pub fn start_values(&self) -> &[StartValue] {
        &self.start_values
    }
}

/// A named, typed system parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemParameter {
    pub value: ParameterValue,
    pub description: String,
}

/// Everything resolved for one run.
struct Runtime {
    nodes: NodeTable,
    order: Vec<CompId>,
    bindings: Vec<Vec<Vec<NodeId>>>,
    /// `(inner, outer)` node pairs of a nested system's boundary.
    boundary: Vec<(NodeId, NodeId)>,
    start_time: Real,
    timestep: Real,
    substeps: usize,
    step: usize,
}

pub struct ComponentSystem {
    name: String,
    timestep: Real,
    inherit_timestep: bool,
    log_samples: usize,
    children: Vec<Option<ChildEntry>>,
    topology: Topology,
    system_ports: Vec<PortSpec>,
    parameters: BTreeMap<String, SystemParameter>,
    node_types: Arc<NodeFactory>,
    messages: Arc<MessageHandler>,
    diagnostics: Arc<MessageHandler>,
    abort: AbortFlag,
    progress: ProgressHandle,
    runtime: Option<Runtime>,
    log: DataLog,
    time: Real,
    measured_cost: Option<Duration>,
}

impl Default for ComponentSystem {
    fn default() -> Self {
        Self::new(SUBSYSTEM_TYPE)
    }
}

impl fmt::Debug for ComponentSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentSystem")
            .field("name", &self.name)
            .field("timestep", &self.timestep)
            .field("children", &self.component_names().collect::<Vec<_>>())
            .field("system_ports", &self.system_ports.len())
            .field("initialized", &self.runtime.is_some())
            .finish()
    }
}

fn check_name(name: &str) -> SystemResult<()> {
    if name.is_empty() || name.contains(['.', '#']) || name.contains(char::is_whitespace) {
        return Err(SystemError::InvalidName {
            name: name.to_owned(),
        });
    }
    Ok(())
}

/// Split `comp.port` into its parts, or a bare `port` into `(None, port)`.
pub fn parse_endpoint(text: &str) -> SystemResult<(Option<&str>, &str)> {
    let bad = || SystemError::BadEndpoint {
        text: text.to_owned(),
    };
    match text.split_once('.') {
        Some((comp, port)) if !comp.is_empty() && !port.is_empty() && !port.contains('.') => {
            Ok((Some(comp), port))
        }
        Some(_) => Err(bad()),
        None if !text.is_empty() => Ok((None, text)),
        None => Err(bad()),
    }
}

impl ComponentSystem {
    pub fn new(name: impl Into<String>) -> Self {
        let abort = AbortFlag::new();
        let messages = Arc::new(MessageHandler::new());
        Self {
            name: name.into(),
            timestep: 1e-3,
            inherit_timestep: true,
            log_samples: SimulationSettings::default().log_samples,
            children: Vec::new(),
            topology: Topology::new(),
            system_ports: Vec::new(),
            parameters: BTreeMap::new(),
            node_types: Arc::new(NodeFactory::with_builtins()),
            diagnostics: Arc::new(MessageHandler::forwarding_to(Arc::clone(&messages))),
            messages,
            progress: ProgressHandle::with_abort(abort.clone()),
            abort,
            runtime: None,
            log: DataLog::default(),
            time: 0.0,
            measured_cost: None,
        }
    }

    /// Share a message queue and node registry with this system and every
    /// nested system below it.
    pub fn set_environment(&mut self, messages: Arc<MessageHandler>, node_types: Arc<NodeFactory>) {
        for entry in self.children.iter_mut().flatten() {
            if let Child::System(sub) = &mut entry.component {
                sub.set_environment(messages.clone(), node_types.clone());
            }
        }
        self.diagnostics = Arc::new(MessageHandler::forwarding_to(Arc::clone(&messages)));
        self.messages = messages;
        self.node_types = node_types;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn timestep(&self) -> Real {
        self.timestep
    }

    pub fn set_timestep(&mut self, timestep: Real) -> SystemResult<()> {
        if !timestep.is_finite() || timestep <= 0.0 {
            return Err(SystemError::InvalidArg {
                what: "timestep must be positive",
            });
        }
        self.timestep = timestep;
        Ok(())
    }

    /// Whether a nested system runs at its parent's timestep.
    pub fn inherits_timestep(&self) -> bool {
        self.inherit_timestep
    }

    pub fn set_inherit_timestep(&mut self, inherit: bool) {
        self.inherit_timestep = inherit;
    }

    pub fn log_samples(&self) -> usize {
        self.log_samples
    }

    pub fn set_log_samples(&mut self, samples: usize) {
        self.log_samples = samples;
    }

    pub fn messages(&self) -> &Arc<MessageHandler> {
        &self.messages
    }

    /// Counts of the messages this system and its nested systems reported
    /// since the last [`initialize`](Self::initialize). The messages
    /// themselves go to [`messages`](Self::messages).
    pub fn diagnostics(&self) -> &MessageHandler {
        &self.diagnostics
    }

    pub fn node_types(&self) -> &Arc<NodeFactory> {
        &self.node_types
    }

    pub fn progress(&self) -> ProgressHandle {
        self.progress.clone()
    }

    pub fn abort_flag(&self) -> &AbortFlag {
        &self.abort
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_set()
    }

    /// Time reached by the current run.
    pub fn time(&self) -> Real {
        self.time
    }

    pub fn measured_cost(&self) -> Option<Duration> {
        self.measured_cost
    }

    pub(crate) fn set_measured_cost(&mut self, cost: Duration) {
        self.measured_cost = Some(cost);
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    // Children

    fn entry(&self, id: CompId) -> Option<&ChildEntry> {
        self.children.get(id.index()).and_then(Option::as_ref)
    }

    fn live(&self) -> impl Iterator<Item = (CompId, &ChildEntry)> {
        self.children
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (CompId::from_index(i), e)))
    }

    pub fn component_id(&self, name: &str) -> Option<CompId> {
        self.live().find(|(_, e)| e.name == name).map(|(id, _)| id)
    }

    fn require_id(&self, name: &str) -> SystemResult<CompId> {
        self.component_id(name)
            .ok_or_else(|| SystemError::UnknownComponent {
                name: name.to_owned(),
            })
    }

    fn entry_mut(&mut self, name: &str) -> SystemResult<&mut ChildEntry> {
        let id = self.require_id(name)?;
        self.children
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| SystemError::UnknownComponent {
                name: name.to_owned(),
            })
    }

    /// Children in insertion order.
    pub fn children(&self) -> impl Iterator<Item = &ChildEntry> {
        self.children.iter().flatten()
    }

    pub fn child(&self, name: &str) -> Option<&ChildEntry> {
        self.children().find(|e| e.name == name)
    }

    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.children().map(|e| e.name.as_str())
    }

    pub fn num_components(&self) -> usize {
        self.children().count()
    }

    pub fn component(&self, name: &str) -> Option<&dyn Component> {
        self.child(name).map(|e| e.component.as_component())
    }

    pub fn component_mut(&mut self, name: &str) -> Option<&mut dyn Component> {
        self.entry_mut(name)
            .ok()
            .map(|e| e.component.as_component_mut())
    }

    /// Downcast a child to its concrete type.
    pub fn component_as<C: Component>(&self, name: &str) -> Option<&C> {
        let component: &dyn std::any::Any = self.component(name)?;
        component.downcast_ref::<C>()
    }

    pub fn subsystem(&self, name: &str) -> Option<&ComponentSystem> {
        self.child(name).and_then(|e| e.component.as_system())
    }

    pub fn subsystem_mut(&mut self, name: &str) -> Option<&mut ComponentSystem> {
        match &mut self.entry_mut(name).ok()?.component {
            Child::System(s) => Some(s.as_mut()),
            Child::Leaf(_) => None,
        }
    }

    /// Add a child created for `type_name`. A [`ComponentSystem`] passed
    /// here becomes a nested system sharing this system's environment.
    pub fn add_component(
        &mut self,
        name: &str,
        type_name: &str,
        component: Box<dyn Component>,
    ) -> SystemResult<CompId> {
        let any: &dyn std::any::Any = component.as_ref();
        let child = if any.is::<ComponentSystem>() {
            let boxed: Box<dyn std::any::Any> = component;
            match boxed.downcast::<ComponentSystem>() {
                Ok(sub) => Child::System(sub),
                Err(_) => {
                    return Err(SystemError::InvalidArg {
                        what: "subsystem downcast failed",
                    });
                }
            }
        } else {
            Child::Leaf(component)
        };
        self.insert_child(name, type_name, child)
    }

    pub fn add_subsystem(&mut self, name: &str, system: ComponentSystem) -> SystemResult<CompId> {
        self.insert_child(name, SUBSYSTEM_TYPE, Child::System(Box::new(system)))
    }

    fn insert_child(&mut self, name: &str, type_name: &str, mut child: Child) -> SystemResult<CompId> {
        check_name(name)?;
        if self.component_id(name).is_some() {
            return Err(SystemError::Duplicate {
                what: "component",
                name: name.to_owned(),
            });
        }
        let leaf_spec = match &mut child {
            Child::Leaf(c) => {
                let spec = ComponentSpec::of(c.as_ref());
                spec.validate()?;
                spec
            }
            Child::System(sub) => {
                sub.set_name(name);
                sub.set_environment(self.messages.clone(), self.node_types.clone());
                ComponentSpec::default()
            }
        };

        let id = CompId::from_index(self.children.len());
        self.children.push(Some(ChildEntry {
            name: name.to_owned(),
            type_name: type_name.to_owned(),
            component: child,
            leaf_spec,
            parameters: BTreeMap::new(),
            start_values: Vec::new(),
        }));
        tracing::debug!(system = %self.name, component = name, type_name, "component added");
        Ok(id)
    }

    /// Remove a child and every connection it takes part in.
    pub fn remove_component(&mut self, name: &str) -> SystemResult<()> {
        let id = self.require_id(name)?;
        self.topology.detach_owner(PortOwner::Component(id));
        self.children[id.index()] = None;
        tracing::debug!(system = %self.name, component = name, "component removed");
        Ok(())
    }

    pub fn rename_component(&mut self, old: &str, new: &str) -> SystemResult<()> {
        check_name(new)?;
        if old != new && self.component_id(new).is_some() {
            return Err(SystemError::Duplicate {
                what: "component",
                name: new.to_owned(),
            });
        }
        let entry = self.entry_mut(old)?;
        entry.name = new.to_owned();
        if let Child::System(sub) = &mut entry.component {
            sub.set_name(new);
        }
        Ok(())
    }

    // Boundary

    /// Declare a port on this system's boundary. Multi-ports are not allowed.
    pub fn add_system_port(&mut self, name: &str, kind: PortKind, node_type: &str) -> SystemResult<usize> {
        check_name(name)?;
        if kind.is_multi() {
            return Err(SystemError::InvalidArg {
                what: "system ports cannot be multi-ports",
            });
        }
        if !self.node_types.contains(node_type) {
            return Err(SystemError::UnknownNodeType {
                name: node_type.to_owned(),
            });
        }
        if self.system_ports.iter().any(|p| p.name == name) {
            return Err(SystemError::Duplicate {
                what: "system port",
                name: name.to_owned(),
            });
        }
        self.system_ports.push(PortSpec::new(name, kind, node_type));
        Ok(self.system_ports.len() - 1)
    }

    pub fn system_ports(&self) -> &[PortSpec] {
        &self.system_ports
    }

    // Connections

    /// Port reference and its declaration as seen from inside this system.
    fn resolve_endpoint(&self, text: &str) -> SystemResult<(PortRef, PortSpec)> {
        match parse_endpoint(text)? {
            (Some(comp), port) => {
                let id = self.require_id(comp)?;
                let entry = self.entry(id).ok_or_else(|| SystemError::UnknownComponent {
                    name: comp.to_owned(),
                })?;
                let spec = entry.spec();
                let idx = spec.port_index(port).ok_or_else(|| SystemError::UnknownPort {
                    component: comp.to_owned(),
                    port: port.to_owned(),
                })?;
                Ok((PortRef::component(id, idx), spec.ports[idx].clone()))
            }
            (None, port) => {
                let idx = self
                    .system_ports
                    .iter()
                    .position(|p| p.name == port)
                    .ok_or_else(|| SystemError::UnknownPort {
                        component: self.name.clone(),
                        port: port.to_owned(),
                    })?;
                Ok((PortRef::system(idx), self.system_ports[idx].mirrored()))
            }
        }
    }

    /// Connect two endpoints, each `component.port` or a bare system port name.
    pub fn connect(&mut self, a: &str, b: &str) -> SystemResult<NodeId> {
        let (port_a, spec_a) = self.resolve_endpoint(a)?;
        let (port_b, spec_b) = self.resolve_endpoint(b)?;
        if !self.node_types.contains(&spec_a.node_type) {
            return Err(SystemError::UnknownNodeType {
                name: spec_a.node_type,
            });
        }
        let node = self
            .topology
            .connect(Endpoint::new(port_a, &spec_a), Endpoint::new(port_b, &spec_b))?;
        tracing::debug!(system = %self.name, a, b, %node, "connected");
        Ok(node)
    }

    pub fn disconnect(&mut self, a: &str, b: &str) -> SystemResult<()> {
        let (port_a, _) = self.resolve_endpoint(a)?;
        let (port_b, _) = self.resolve_endpoint(b)?;
        self.topology.disconnect(port_a, port_b)?;
        tracing::debug!(system = %self.name, a, b, "disconnected");
        Ok(())
    }

    pub fn is_connected(&self, endpoint: &str) -> bool {
        self.resolve_endpoint(endpoint)
            .is_ok_and(|(port, _)| self.topology.is_connected(port))
    }

    /// `component.port` or the bare system port name for `port`.
    pub fn endpoint_name(&self, port: PortRef) -> String {
        match port.owner {
            PortOwner::System => self
                .system_ports
                .get(port.port)
                .map_or_else(|| format!("port{}", port.port), |p| p.name.clone()),
            PortOwner::Component(id) => match self.entry(id) {
                Some(entry) => {
                    let spec = entry.spec();
                    match spec.ports.get(port.port) {
                        Some(p) => format!("{}.{}", entry.name, p.name),
                        None => format!("{}.{}", entry.name, port.port),
                    }
                }
                None => port.to_string(),
            },
        }
    }

    /// Connections as endpoint pairs that rebuild the same topology when
    /// connected in order.
    pub fn connections(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (_, entry) in self.topology.live_nodes() {
            let hub = entry
                .writer()
                .or_else(|| {
                    entry
                        .attachments
                        .iter()
                        .find(|a| a.kind == PortKind::Power)
                        .map(|a| a.port)
                })
                .or_else(|| entry.attachments.first().map(|a| a.port));
            let Some(hub) = hub else {
                continue;
            };
            for attachment in entry.attachments.iter().filter(|a| a.port != hub) {
                pairs.push((self.endpoint_name(hub), self.endpoint_name(attachment.port)));
            }
        }
        pairs
    }

    // Parameters

    /// Set a system parameter, creating it if needed.
    pub fn set_parameter(&mut self, name: &str, value: impl Into<ParameterValue>) -> SystemResult<()> {
        check_name(name)?;
        let value = value.into();
        if matches!(value, ParameterValue::SystemRef(_)) {
            return Err(SystemError::InvalidArg {
                what: "system parameters hold values, not references",
            });
        }
        match self.parameters.get_mut(name) {
            Some(existing) => existing.value = value,
            None => {
                self.parameters.insert(
                    name.to_owned(),
                    SystemParameter {
                        value,
                        description: String::new(),
                    },
                );
            }
        }
        Ok(())
    }

    pub fn describe_parameter(&mut self, name: &str, description: &str) -> SystemResult<()> {
        let parameter = self
            .parameters
            .get_mut(name)
            .ok_or_else(|| SystemError::UnknownParameter {
                owner: self.name.clone(),
                name: name.to_owned(),
            })?;
        parameter.description = description.to_owned();
        Ok(())
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterValue> {
        self.parameters.get(name).map(|p| &p.value)
    }

    pub fn parameters(&self) -> impl Iterator<Item = (&str, &SystemParameter)> {
        self.parameters.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn remove_parameter(&mut self, name: &str) -> bool {
        self.parameters.remove(name).is_some()
    }

    /// Rename a system parameter and every child reference to it.
    pub fn rename_parameter(&mut self, old: &str, new: &str) -> SystemResult<()> {
        check_name(new)?;
        if self.parameters.contains_key(new) {
            return Err(SystemError::Duplicate {
                what: "system parameter",
                name: new.to_owned(),
            });
        }
        let parameter = self
            .parameters
            .remove(old)
            .ok_or_else(|| SystemError::UnknownParameter {
                owner: self.name.clone(),
                name: old.to_owned(),
            })?;
        self.parameters.insert(new.to_owned(), parameter);
        for entry in self.children.iter_mut().flatten() {
            for value in entry.parameters.values_mut() {
                if matches!(value, ParameterValue::SystemRef(target) if target == old) {
                    *value = ParameterValue::SystemRef(new.to_owned());
                }
            }
        }
        Ok(())
    }

    /// Override a child parameter, or bind it with [`ParameterValue::SystemRef`].
    pub fn set_component_parameter(
        &mut self,
        component: &str,
        name: &str,
        value: impl Into<ParameterValue>,
    ) -> SystemResult<()> {
        let entry = self.entry_mut(component)?;
        if entry.spec().parameter(name).is_none() {
            return Err(SystemError::UnknownParameter {
                owner: component.to_owned(),
                name: name.to_owned(),
            });
        }
        entry.parameters.insert(name.to_owned(), value.into());
        Ok(())
    }

    /// The override if set, otherwise the declared default.
    pub fn component_parameter(&self, component: &str, name: &str) -> Option<ParameterValue> {
        let entry = self.child(component)?;
        entry
            .parameters
            .get(name)
            .cloned()
            .or_else(|| entry.spec().parameter(name).map(|p| p.default.clone()))
    }

    /// Start value for `slot` of the node behind `component.port`.
    pub fn set_start_value(&mut self, component: &str, port: &str, slot: &str, value: Real) -> SystemResult<()> {
        let entry = self.child(component).ok_or_else(|| SystemError::UnknownComponent {
            name: component.to_owned(),
        })?;
        let Some(node_type) = entry.spec().port(port).map(|p| p.node_type.clone()) else {
            return Err(SystemError::UnknownPort {
                component: component.to_owned(),
                port: port.to_owned(),
            });
        };
        if !self.node_types.get(&node_type).is_some_and(|t| t.slot_index(slot).is_some()) {
            return Err(SystemError::Node(tlm_node::NodeError::UnknownSlot {
                node_type,
                slot: slot.to_owned(),
            }));
        }
        let entry = self.entry_mut(component)?;
        entry
            .start_values
            .retain(|s| !(s.port == port && s.slot == slot));
        entry.start_values.push(StartValue {
            port: port.to_owned(),
            slot: slot.to_owned(),
            value,
        });
        Ok(())
    }

    fn lookup_parameter<'s>(
        &'s self,
        overlay: Option<&'s ParameterSet>,
    ) -> impl Fn(&str) -> Option<&'s ParameterValue> {
        move |name| {
            overlay
                .and_then(|o| o.get(name))
                .or_else(|| self.parameters.get(name).map(|p| &p.value))
        }
    }

    // Roles and order

    /// Role of this system when nested: the role of the components behind
    /// its power ports, or signal if it has none.
    pub fn inferred_role(&self) -> SystemResult<CausalRole> {
        let mut role = None;
        for (idx, port) in self.system_ports.iter().enumerate() {
            if !port.kind.is_power() {
                continue;
            }
            for node in self.topology.nodes_of(PortRef::system(idx)) {
                let Some(entry) = self.topology.node(*node) else {
                    continue;
                };
                for attachment in entry.attachments.iter().filter(|a| a.kind.is_power()) {
                    let PortOwner::Component(id) = attachment.port.owner else {
                        continue;
                    };
                    let Some(child) = self.entry(id) else {
                        continue;
                    };
                    let inner = child.component.role();
                    match role {
                        None => role = Some(inner),
                        Some(r) if r != inner => {
                            return Err(SystemError::MixedRoles {
                                system: self.name.clone(),
                            });
                        }
                        Some(_) => {}
                    }
                }
            }
        }
        Ok(role.unwrap_or(CausalRole::Signal))
    }

    /// Storage children, then resistive, then signal children in dependency
    /// order. Blocks without direct feedthrough lead the signal pass.
    pub fn simulation_order(&self) -> SystemResult<Vec<CompId>> {
        let mut groups: BTreeMap<CausalRole, Vec<CompId>> = BTreeMap::new();
        let mut delayed = Vec::new();
        for (id, entry) in self.live() {
            if let Child::System(sub) = &entry.component {
                sub.inferred_role()?;
            }
            let role = entry.component.role();
            if role == CausalRole::Signal && !entry.component.as_component().direct_feedthrough() {
                delayed.push(id);
            } else {
                groups.entry(role).or_default().push(id);
            }
        }

        let edges = signal_edges(&self.topology);
        let mut order = Vec::with_capacity(self.children.len());
        for role in CausalRole::EVALUATION_ORDER {
            let members = groups.remove(&role).unwrap_or_default();
            if role == CausalRole::Signal {
                order.append(&mut delayed);
            }
            let (sorted, blocked) = stable_topological(&members, &edges);
            order.extend(sorted);
            if blocked.is_empty() {
                continue;
            }
            if role == CausalRole::Signal {
                return Err(SystemError::AlgebraicLoop {
                    components: blocked
                        .iter()
                        .filter_map(|id| self.entry(*id).map(|e| e.name.clone()))
                        .collect(),
                });
            }
            order.extend(blocked);
        }
        Ok(order)
    }

    // Checks

    /// Check connections, parameters and ordering of this system and every
    /// nested one, reporting each problem to the message queue.
    pub fn check_model_before_simulation(&self) -> bool {
        self.check_with(&self.diagnostics)
    }

    fn report(&self, messages: &MessageHandler, severity: Severity, text: String) {
        messages.add(severity, text, Some(self.name.as_str()));
    }

    fn check_with(&self, messages: &MessageHandler) -> bool {
        let mut ok = true;
        let mut used = BTreeSet::new();

        for (id, entry) in self.live() {
            let spec = entry.spec();
            for (idx, port) in spec.ports.iter().enumerate() {
                if port.is_required() && !self.topology.is_connected(PortRef::component(id, idx)) {
                    self.report(
                        messages,
                        Severity::Error,
                        format!("Port {}.{} is not connected", entry.name, port.name),
                    );
                    ok = false;
                }
            }
            if let Err(e) = resolve_parameters(&spec.parameters, &entry.parameters, self.lookup_parameter(None)) {
                self.report(messages, Severity::Error, format!("{}: {e}", entry.name));
                ok = false;
            }
            for value in entry.parameters.values() {
                if let ParameterValue::SystemRef(target) = value {
                    used.insert(target.as_str());
                }
            }
            if let Child::System(sub) = &entry.component {
                if let Err(e) = sub.inferred_role() {
                    self.report(messages, Severity::Error, e.to_string());
                    ok = false;
                }
            }
            if !entry.component.as_component().check_model(messages) {
                ok = false;
            }
        }

        for issue in self.topology.issues() {
            let NodeIssue::LonePowerPort { port, .. } = issue;
            self.report(
                messages,
                Severity::Error,
                format!("Power port {} has no power partner", self.endpoint_name(port)),
            );
            ok = false;
        }
        for (node, entry) in self.topology.live_nodes() {
            let read = entry.attachments.iter().any(|a| a.kind.is_reader());
            if read && entry.power_count() == 0 && !entry.has_writer() {
                self.report(
                    messages,
                    Severity::Error,
                    format!("Signal node {node} has readers but no writer"),
                );
                ok = false;
            }
        }
        for name in self.parameters.keys() {
            if !used.contains(name.as_str()) {
                self.report(
                    messages,
                    Severity::Warning,
                    format!("System parameter {name} is not used"),
                );
            }
        }
        if let Err(e) = self.simulation_order() {
            self.report(messages, Severity::Error, e.to_string());
            ok = false;
        }
        ok
    }

    // Running

    /// Freeze the topology, bind every port and apply start values.
    fn build_runtime(
        &self,
        start_time: Real,
        timestep: Real,
        substeps: usize,
        overlay: Option<&ParameterSet>,
    ) -> SystemResult<(Runtime, Vec<ComponentSpec>, Vec<ParameterSet>)> {
        let mut nodes = NodeTable::freeze(&self.topology, &self.node_types)?;
        let order = self.simulation_order()?;

        let n = self.children.len();
        let mut specs = vec![ComponentSpec::default(); n];
        let mut params = vec![ParameterSet::new(); n];
        let mut bindings = vec![Vec::new(); n];
        for (id, entry) in self.live() {
            let spec = entry.spec().into_owned();
            let set = resolve_parameters(&spec.parameters, &entry.parameters, self.lookup_parameter(overlay))?;

            let mut ports = Vec::with_capacity(spec.ports.len());
            for (idx, port) in spec.ports.iter().enumerate() {
                let mut bound = self.topology.nodes_of(PortRef::component(id, idx)).to_vec();
                if bound.is_empty() && !port.kind.is_multi() {
                    bound.push(self.placeholder(&mut nodes, &spec, idx, &set)?);
                }
                ports.push(bound);
            }
            specs[id.index()] = spec;
            params[id.index()] = set;
            bindings[id.index()] = ports;
        }

        let mut runtime = Runtime {
            nodes,
            order,
            bindings,
            boundary: Vec::new(),
            start_time,
            timestep,
            substeps,
            step: 0,
        };
        self.apply_start_values(&mut runtime, &specs)?;
        Ok((runtime, specs, params))
    }

    /// Private node for an unconnected single port, at its type defaults. An
    /// input variable carries its parameter value instead.
    fn placeholder(
        &self,
        nodes: &mut NodeTable,
        spec: &ComponentSpec,
        idx: usize,
        params: &ParameterSet,
    ) -> SystemResult<NodeId> {
        let port = &spec.ports[idx];
        let node_type = self
            .node_types
            .get(&port.node_type)
            .ok_or_else(|| SystemError::UnknownNodeType {
                name: port.node_type.clone(),
            })?;
        let is_signal = node_type.name() == signal::NAME;
        let node = nodes.push_node(node_type);
        let value = if spec.is_input_variable(idx) {
            Some(params.real(&port.name)?)
        } else {
            port.default_value.filter(|_| is_signal)
        };
        if let Some(value) = value {
            let slot = nodes.slot(node, signal::VALUE)?;
            nodes.set(slot, value);
        }
        Ok(node)
    }

    /// Signal, then resistive, then storage, so storage start values win on
    /// shared nodes.
    fn apply_start_values(&self, runtime: &mut Runtime, specs: &[ComponentSpec]) -> SystemResult<()> {
        for role in CausalRole::EVALUATION_ORDER.iter().rev() {
            for (id, entry) in self.live().filter(|(_, e)| e.component.role() == *role) {
                let spec = &specs[id.index()];
                for start in spec.start_values.iter().chain(&entry.start_values) {
                    let Some(idx) = spec.port_index(&start.port) else {
                        return Err(SystemError::UnknownPort {
                            component: entry.name.clone(),
                            port: start.port.clone(),
                        });
                    };
                    for node in &runtime.bindings[id.index()][idx] {
                        let slot = runtime.nodes.slot_by_name(*node, &start.slot)?;
                        runtime.nodes.set(slot, start.value);
                    }
                }
            }
        }
        Ok(())
    }

    /// Initialize children in simulation order. A failure is reported as an
    /// Error message and trips `abort`.
    fn initialize_children(
        &mut self,
        runtime: &mut Runtime,
        specs: &[ComponentSpec],
        params: &[ParameterSet],
        stop_time: Real,
        messages: &MessageHandler,
        abort: &AbortFlag,
    ) -> SystemResult<()> {
        for &id in &runtime.order {
            let Some(entry) = self.children.get_mut(id.index()).and_then(Option::as_mut) else {
                continue;
            };
            let sim = SimContext::new(
                &mut runtime.nodes,
                runtime.start_time,
                runtime.timestep,
                messages,
                abort,
                &entry.name,
            );
            let mut ctx = InitContext::new(
                sim,
                &specs[id.index()],
                &runtime.bindings[id.index()],
                &params[id.index()],
                stop_time,
            );
            if let Err(source) = entry.component.as_component_mut().initialize(&mut ctx) {
                messages.add(
                    Severity::Error,
                    format!("Initialization of {} failed: {source}", entry.name),
                    Some(self.name.as_str()),
                );
                abort.set();
                return Err(SystemError::InitializeFailed {
                    component: entry.name.clone(),
                    source,
                });
            }
        }
        Ok(())
    }

    fn log_nodes(&self) -> Vec<(NodeId, String)> {
        self.topology
            .live_nodes()
            .filter_map(|(node, entry)| {
                entry
                    .attachments
                    .first()
                    .map(|a| (node, self.endpoint_name(a.port)))
            })
            .collect()
    }

    /// Check the model, bind every port and initialize every child for a run
    /// from `start_time` to `stop_time`.
    pub fn initialize(&mut self, start_time: Real, stop_time: Real) -> SystemResult<()> {
        SimulationSettings {
            start_time,
            stop_time,
            timestep: self.timestep,
            log_samples: self.log_samples,
        }
        .validate()?;
        self.diagnostics.clear();
        let messages = Arc::clone(&self.diagnostics);
        if !self.check_with(&messages) {
            return Err(SystemError::ModelCheckFailed {
                system: self.name.clone(),
            });
        }

        self.abort.clear();
        self.runtime = None;
        let (mut runtime, specs, params) = self.build_runtime(start_time, self.timestep, 1, None)?;
        let abort = self.abort.clone();
        self.initialize_children(&mut runtime, &specs, &params, stop_time, &messages, &abort)?;

        let steps = num_steps(start_time, stop_time, self.timestep);
        self.log = DataLog::new(&runtime.nodes, &self.log_nodes(), steps, self.log_samples);
        self.log.record(start_time, &runtime.nodes);
        self.time = start_time;
        self.progress.begin(start_time, stop_time);
        tracing::debug!(system = %self.name, start_time, stop_time, steps, "initialized");
        self.runtime = Some(runtime);
        Ok(())
    }

    /// Advance from the current time to `stop_time`, or until aborted.
    pub fn simulate(&mut self, stop_time: Real) -> SystemResult<()> {
        let messages = Arc::clone(&self.diagnostics);
        let abort = self.abort.clone();
        let runtime = self
            .runtime
            .as_mut()
            .ok_or_else(|| SystemError::NotInitialized {
                system: self.name.clone(),
            })?;

        let steps = num_steps(self.time, stop_time, runtime.timestep);
        tracing::debug!(system = %self.name, time = self.time, stop_time, steps, "simulate");
        for _ in 0..steps {
            if abort.is_set() {
                tracing::warn!(system = %self.name, time = self.time, "simulation aborted");
                break;
            }
            runtime.step += 1;
            let dt = runtime.timestep;
            let time = runtime.start_time + runtime.step as Real * dt;
            step_children(&mut self.children, runtime, time, dt, &messages, &abort);
            self.time = time;
            self.log.step(runtime.step, time, &runtime.nodes);
            self.progress.publish(time);
        }
        Ok(())
    }

    /// Finalize children, check junction balances and release the run.
    pub fn finalize(&mut self) {
        let messages = Arc::clone(&self.diagnostics);
        let abort = self.abort.clone();
        self.finish(&messages, &abort);
    }

    fn finish(&mut self, messages: &MessageHandler, abort: &AbortFlag) {
        let Some(mut runtime) = self.runtime.take() else {
            return;
        };
        for &id in &runtime.order {
            let Some(entry) = self.children.get_mut(id.index()).and_then(Option::as_mut) else {
                continue;
            };
            let mut ctx = SimContext::new(
                &mut runtime.nodes,
                self.time,
                runtime.timestep,
                messages,
                abort,
                &entry.name,
            );
            entry.component.as_component_mut().finalize(&mut ctx);
        }
        self.check_junctions(&runtime, messages);
        tracing::debug!(system = %self.name, time = self.time, "finalized");
    }

    fn check_junctions(&self, runtime: &Runtime, messages: &MessageHandler) {
        for (id, entry) in self.live() {
            let spec = entry.spec();
            for (idx, port) in spec.ports.iter().enumerate() {
                if port.kind != PortKind::PowerMulti {
                    continue;
                }
                let Some(nodes) = runtime.bindings.get(id.index()).and_then(|b| b.get(idx)) else {
                    continue;
                };
                if nodes.len() < 2 {
                    continue;
                }
                let Some(balance) = JunctionBalance::measure(&runtime.nodes, nodes) else {
                    continue;
                };
                if !balance.is_compatible(JUNCTION_TOLERANCE) {
                    self.report(
                        messages,
                        Severity::Warning,
                        format!(
                            "Junction {}.{} effort spread {:.3e} exceeds tolerance",
                            entry.name,
                            port.name,
                            balance.effort_spread()
                        ),
                    );
                }
            }
        }
    }

    /// Validate `settings`, then initialize, simulate and finalize.
    pub fn run(&mut self, settings: &SimulationSettings) -> SystemResult<()> {
        settings.validate()?;
        self.set_timestep(settings.timestep)?;
        self.log_samples = settings.log_samples;
        self.initialize(settings.start_time, settings.stop_time)?;
        let result = self.simulate(settings.stop_time);
        self.finalize();
        result
    }

    pub fn is_initialized(&self) -> bool {
        self.runtime.is_some()
    }

    pub fn log_data(&self) -> &DataLog {
        &self.log
    }

    /// Current values of the first node behind `endpoint`, while initialized.
    pub fn node_values(&self, endpoint: &str) -> Option<&[Real]> {
        let runtime = self.runtime.as_ref()?;
        let (port, _) = self.resolve_endpoint(endpoint).ok()?;
        let node = match port.owner {
            PortOwner::Component(id) => *runtime.bindings.get(id.index())?.get(port.port)?.first()?,
            PortOwner::System => *self.topology.nodes_of(port).first()?,
        };
        Some(runtime.nodes.node_values(node))
    }

    /// Flow sum and effort range across the branches of a multi-port.
    pub fn junction_balance(&self, component: &str, port: &str) -> Option<JunctionBalance> {
        let runtime = self.runtime.as_ref()?;
        let id = self.component_id(component)?;
        let idx = self.entry(id)?.spec().port_index(port)?;
        JunctionBalance::measure(&runtime.nodes, runtime.bindings.get(id.index())?.get(idx)?)
    }

    fn copy_in(&mut self, outer: &NodeTable) {
        if let Some(runtime) = self.runtime.as_mut() {
            for &(inner, node) in &runtime.boundary {
                runtime.nodes.copy_node_from(inner, outer, node);
            }
        }
    }

    fn copy_out(&self, outer: &mut NodeTable) {
        if let Some(runtime) = self.runtime.as_ref() {
            for &(inner, node) in &runtime.boundary {
                outer.copy_node_from(node, &runtime.nodes, inner);
            }
        }
    }
}

fn step_children(
    children: &mut [Option<ChildEntry>],
    runtime: &mut Runtime,
    time: Real,
    timestep: Real,
    messages: &MessageHandler,
    abort: &AbortFlag,
) {
    for &id in &runtime.order {
        let Some(entry) = children.get_mut(id.index()).and_then(Option::as_mut) else {
            continue;
        };
        let mut ctx = SimContext::new(&mut runtime.nodes, time, timestep, messages, abort, &entry.name);
        entry.component.as_component_mut().simulate_one_timestep(&mut ctx);
    }
}

/// A system nested in another runs as one atomic block: boundary nodes are
/// copied in from the parent before its steps and copied back after.
impl Component for ComponentSystem {
    fn role(&self) -> CausalRole {
        self.inferred_role().unwrap_or(CausalRole::Signal)
    }

    fn configure(&self, cfg: &mut tlm_components::Configurator) {
        for port in &self.system_ports {
            cfg.add_port(port.clone());
        }
        for (name, parameter) in &self.parameters {
            let description = parameter.description.as_str();
            match &parameter.value {
                ParameterValue::Real(v) => cfg.add_real(name, description, "", *v),
                ParameterValue::Integer(v) => cfg.add_integer(name, description, *v),
                ParameterValue::Bool(v) => cfg.add_bool(name, description, *v),
                ParameterValue::Text(v) => cfg.add_text(name, description, v),
                ParameterValue::SystemRef(_) => {}
            }
        }
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> tlm_components::ComponentResult<()> {
        let parent_dt = ctx.timestep();
        let (timestep, substeps) = if self.inherit_timestep {
            (parent_dt, 1)
        } else {
            let substeps = (parent_dt / self.timestep).round().max(1.0) as usize;
            (self.timestep, substeps)
        };
        let overlay = ctx.parameters().clone();
        let messages = ctx.messages();
        let abort = ctx.abort_flag();
        let start_time = ctx.start_time();
        let stop_time = ctx.stop_time();

        self.runtime = None;
        let (mut runtime, specs, params) = self.build_runtime(start_time, timestep, substeps, Some(&overlay))?;
        for (idx, port) in self.system_ports.iter().enumerate() {
            let Some(&inner) = self.topology.nodes_of(PortRef::system(idx)).first() else {
                continue;
            };
            if let Some(&outer) = ctx.port_nodes(&port.name)?.first() {
                runtime.boundary.push((inner, outer));
            }
        }
        for &(inner, outer) in &runtime.boundary {
            runtime.nodes.copy_node_from(inner, ctx.nodes(), outer);
        }
        self.initialize_children(&mut runtime, &specs, &params, stop_time, messages, abort)?;

        let steps = num_steps(start_time, stop_time, parent_dt);
        self.log = DataLog::new(&runtime.nodes, &self.log_nodes(), steps, self.log_samples);
        self.log.record(start_time, &runtime.nodes);
        self.time = start_time;
        self.progress.begin(start_time, stop_time);
        self.runtime = Some(runtime);
        self.copy_out(ctx.nodes_mut());
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) {
        self.copy_in(ctx.nodes());
        let parent_time = ctx.time();
        let (messages, abort) = (ctx.messages(), ctx.abort_flag());
        if let Some(runtime) = self.runtime.as_mut() {
            let (substeps, dt) = (runtime.substeps, runtime.timestep);
            for k in 1..=substeps {
                let time = parent_time - (substeps - k) as Real * dt;
                step_children(&mut self.children, runtime, time, dt, messages, abort);
            }
            runtime.step += 1;
            self.time = parent_time;
            self.log.step(runtime.step, parent_time, &runtime.nodes);
            self.progress.publish(parent_time);
        }
        self.copy_out(ctx.nodes_mut());
    }

    fn finalize(&mut self, ctx: &mut SimContext<'_>) {
        self.finish(ctx.messages(), ctx.abort_flag());
    }

    fn check_model(&self, messages: &MessageHandler) -> bool {
        self.check_with(messages)
    }
}
