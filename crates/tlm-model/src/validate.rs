//! Model validation logic.

use std::collections::HashSet;

use crate::schema::{ComponentDef, ModelDef, ParameterDef, SUBSYSTEM_TYPE, SystemDef};

pub const LATEST_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate name: {name} in {context}")]
    DuplicateName { name: String, context: String },

    #[error("Invalid name: '{name}' in {context}")]
    InvalidName { name: String, context: String },

    #[error("Missing reference: {name} in {context}")]
    MissingReference { name: String, context: String },

    #[error("Invalid endpoint: '{endpoint}' in {context}")]
    InvalidEndpoint { endpoint: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: &'static str,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

type ValidationResult = Result<(), ValidationError>;

/// Same rule the running system applies to component, port and parameter names.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(|c| c == '.' || c == '#' || c.is_whitespace())
}

/// Split `"component.port"` or a bare `"port"`.
pub fn split_endpoint(endpoint: &str) -> Option<(Option<&str>, &str)> {
    match endpoint.split_once('.') {
        Some((component, port)) if is_valid_name(component) && is_valid_name(port) => {
            Some((Some(component), port))
        }
        Some(_) => None,
        None if is_valid_name(endpoint) => Some((None, endpoint)),
        None => None,
    }
}

pub fn validate_model(model: &ModelDef) -> ValidationResult {
    if model.version == 0 || model.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: model.version,
        });
    }
    check_name(&model.name, "model")?;

    let sim = &model.simulation;
    if !(sim.timestep.is_finite() && sim.timestep > 0.0) {
        return Err(invalid("simulation timestep", sim.timestep, "must be positive and finite"));
    }
    if !(sim.start_time.is_finite() && sim.stop_time.is_finite()) {
        return Err(invalid("simulation stop_time", sim.stop_time, "must be finite"));
    }
    if sim.stop_time < sim.start_time {
        return Err(invalid("simulation stop_time", sim.stop_time, "before start_time"));
    }

    validate_system(&model.system, &model.name)
}

fn invalid(field: &str, value: impl ToString, reason: &'static str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_owned(),
        value: value.to_string(),
        reason,
    }
}

fn check_name(name: &str, context: &str) -> ValidationResult {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(ValidationError::InvalidName {
            name: name.to_owned(),
            context: context.to_owned(),
        })
    }
}

fn unique<'a>(seen: &mut HashSet<&'a str>, name: &'a str, context: &str) -> ValidationResult {
    check_name(name, context)?;
    if seen.insert(name) {
        Ok(())
    } else {
        Err(ValidationError::DuplicateName {
            name: name.to_owned(),
            context: context.to_owned(),
        })
    }
}

fn validate_system(system: &SystemDef, path: &str) -> ValidationResult {
    if let Some(dt) = system.timestep
        && !(dt.is_finite() && dt > 0.0)
    {
        return Err(invalid(&format!("system '{path}' timestep"), dt, "must be positive and finite"));
    }

    let mut parameters = HashSet::new();
    for parameter in &system.parameters {
        unique(&mut parameters, &parameter.name, &format!("system '{path}' parameters"))?;
    }

    let mut ports = HashSet::new();
    for port in &system.ports {
        unique(&mut ports, &port.name, &format!("system '{path}' ports"))?;
        if port.node_type.is_empty() {
            return Err(invalid(&format!("port '{path}.{}' node_type", port.name), "", "must not be empty"));
        }
    }

    let mut components = HashSet::new();
    for component in &system.components {
        unique(&mut components, &component.name, &format!("system '{path}' components"))?;
        validate_component(component, &parameters, path)?;
    }

    for connection in &system.connections {
        for endpoint in [&connection.from, &connection.to] {
            let context = format!("system '{path}' connections");
            let Some((component, port)) = split_endpoint(endpoint) else {
                return Err(ValidationError::InvalidEndpoint {
                    endpoint: endpoint.clone(),
                    context,
                });
            };
            let known = match component {
                Some(name) => components.contains(name),
                None => ports.contains(port),
            };
            if !known {
                return Err(ValidationError::MissingReference {
                    name: component.unwrap_or(port).to_owned(),
                    context,
                });
            }
        }
        if connection.from == connection.to {
            return Err(ValidationError::InvalidEndpoint {
                endpoint: connection.from.clone(),
                context: format!("system '{path}' connections (self connection)"),
            });
        }
    }
    Ok(())
}

fn validate_component(component: &ComponentDef, parameters: &HashSet<&str>, path: &str) -> ValidationResult {
    let here = format!("{path}.{}", component.name);
    if component.type_name.is_empty() {
        return Err(invalid(&format!("component '{here}' type"), "", "must not be empty"));
    }

    for (name, value) in &component.parameters {
        check_name(name, &format!("component '{here}' parameters"))?;
        if let ParameterDef::Ref { target } = value
            && !parameters.contains(target.as_str())
        {
            return Err(ValidationError::MissingReference {
                name: target.clone(),
                context: format!("component '{here}' parameter '{name}'"),
            });
        }
    }

    for start in &component.start_values {
        check_name(&start.port, &format!("component '{here}' start values"))?;
        if !start.value.is_finite() {
            return Err(invalid(
                &format!("start value '{here}.{}#{}'", start.port, start.slot),
                start.value,
                "must be finite",
            ));
        }
    }

    match (&component.system, component.type_name == SUBSYSTEM_TYPE) {
        (Some(system), true) => validate_system(system, &here),
        (None, true) => Err(ValidationError::MissingReference {
            name: "system".to_owned(),
            context: format!("subsystem '{here}'"),
        }),
        (Some(_), false) => Err(invalid(
            &format!("component '{here}' system"),
            &component.type_name,
            "only subsystems carry a system body",
        )),
        (None, false) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ConnectionDef, SimulationDef, SystemPortDef, PortKindDef};

    fn model(system: SystemDef) -> ModelDef {
        ModelDef {
            version: LATEST_VERSION,
            name: "m".into(),
            simulation: SimulationDef::default(),
            system,
        }
    }

    fn step_sink() -> SystemDef {
        SystemDef {
            components: vec![
                ComponentDef::new("step", "SignalStep"),
                ComponentDef::new("sink", "SignalSink"),
            ],
            connections: vec![ConnectionDef::new("step.out", "sink.in")],
            ..Default::default()
        }
    }

    #[test]
    fn endpoints_split() {
        assert_eq!(split_endpoint("a.b"), Some((Some("a"), "b")));
        assert_eq!(split_endpoint("p"), Some((None, "p")));
        assert_eq!(split_endpoint("a.b.c"), None);
        assert_eq!(split_endpoint(".b"), None);
        assert_eq!(split_endpoint(""), None);
    }

    #[test]
    fn accepts_a_well_formed_model() {
        validate_model(&model(step_sink())).unwrap();
    }

    #[test]
    fn rejects_duplicates_and_dangling_references() {
        let mut system = step_sink();
        system.components.push(ComponentDef::new("step", "SignalConstant"));
        assert!(matches!(
            validate_model(&model(system)),
            Err(ValidationError::DuplicateName { .. })
        ));

        let mut system = step_sink();
        system.connections.push(ConnectionDef::new("gain.out", "sink.in"));
        assert!(matches!(
            validate_model(&model(system)),
            Err(ValidationError::MissingReference { name, .. }) if name == "gain"
        ));

        let mut system = step_sink();
        system.components[0] = ComponentDef::new("step", "SignalStep")
            .with_parameter("y_A", ParameterDef::Ref { target: "amp".into() });
        assert!(validate_model(&model(system)).is_err());
    }

    #[test]
    fn bare_endpoints_need_a_system_port() {
        let mut system = step_sink();
        system.connections.push(ConnectionDef::new("step.out", "y"));
        assert!(validate_model(&model(system.clone())).is_err());

        system.ports.push(SystemPortDef {
            name: "y".into(),
            kind: PortKindDef::Write,
            node_type: "signal".into(),
        });
        validate_model(&model(system)).unwrap();
    }

    #[test]
    fn subsystem_needs_a_body() {
        let mut system = step_sink();
        system.components.push(ComponentDef::new("inner", SUBSYSTEM_TYPE));
        assert!(validate_model(&model(system)).is_err());

        let mut system = step_sink();
        system.components.push(ComponentDef::subsystem("inner", step_sink()));
        validate_model(&model(system)).unwrap();
    }

    #[test]
    fn rejects_unknown_versions_and_bad_settings() {
        let mut m = model(step_sink());
        m.version = LATEST_VERSION + 1;
        assert_eq!(
            validate_model(&m),
            Err(ValidationError::UnsupportedVersion {
                version: LATEST_VERSION + 1
            })
        );

        let mut m = model(step_sink());
        m.simulation.timestep = 0.0;
        assert!(validate_model(&m).is_err());
    }
}
