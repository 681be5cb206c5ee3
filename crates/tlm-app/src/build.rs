//! Turning model descriptions into runnable systems and back.

use std::collections::BTreeMap;

use tlm_components::ParameterValue;
use tlm_model::{
    ComponentDef, ConnectionDef, ModelDef, ParameterDef, PortKindDef, SimulationDef, StartValueDef,
    SUBSYSTEM_TYPE, SystemDef, SystemParameterDef, SystemPortDef, ValueDef,
};
use tlm_node::PortKind;
use tlm_system::{ComponentSystem, SimulationSettings};

use crate::engine::Engine;
use crate::error::{AppError, AppResult};

pub fn value_of(value: &ValueDef) -> ParameterValue {
    match value {
        ValueDef::Bool(v) => ParameterValue::Bool(*v),
        ValueDef::Integer(v) => ParameterValue::Integer(*v),
        ValueDef::Real(v) => ParameterValue::Real(*v),
        ValueDef::Text(v) => ParameterValue::Text(v.clone()),
    }
}

pub fn parameter_of(parameter: &ParameterDef) -> ParameterValue {
    match parameter {
        ParameterDef::Ref { target } => ParameterValue::SystemRef(target.clone()),
        ParameterDef::Value(v) => value_of(v),
    }
}

/// `None` for a reference, which has no literal form.
pub fn value_def(value: &ParameterValue) -> Option<ValueDef> {
    Some(match value {
        ParameterValue::Real(v) => ValueDef::Real(*v),
        ParameterValue::Integer(v) => ValueDef::Integer(*v),
        ParameterValue::Bool(v) => ValueDef::Bool(*v),
        ParameterValue::Text(v) => ValueDef::Text(v.clone()),
        ParameterValue::SystemRef(_) => return None,
    })
}

fn parameter_def(value: &ParameterValue) -> ParameterDef {
    match value {
        ParameterValue::SystemRef(target) => ParameterDef::Ref {
            target: target.clone(),
        },
        other => value_def(other).map_or_else(
            || ParameterDef::Value(ValueDef::Text(other.to_string())),
            ParameterDef::Value,
        ),
    }
}

fn port_kind(kind: PortKindDef) -> PortKind {
    match kind {
        PortKindDef::Power => PortKind::Power,
        PortKindDef::Read => PortKind::Read,
        PortKindDef::Write => PortKind::Write,
    }
}

fn port_kind_def(kind: PortKind) -> PortKindDef {
    if kind.is_power() {
        PortKindDef::Power
    } else if kind.is_reader() {
        PortKindDef::Read
    } else {
        PortKindDef::Write
    }
}

pub fn settings_of(simulation: &SimulationDef) -> SimulationSettings {
    SimulationSettings {
        start_time: simulation.start_time,
        stop_time: simulation.stop_time,
        timestep: simulation.timestep,
        log_samples: simulation.log_samples,
    }
}

/// Build the root system of `model` with components from `engine`.
pub fn build_system(model: &ModelDef, engine: &Engine) -> AppResult<ComponentSystem> {
    tlm_model::validate_model(model).map_err(|e| AppError::Model(e.to_string()))?;
    let mut system = engine.new_system(&model.name);
    system.set_log_samples(model.simulation.log_samples);
    populate(&mut system, &model.system, engine, &model.name)?;
    system.set_timestep(model.simulation.timestep)?;
    tracing::debug!(
        model = %model.name,
        components = system.num_components(),
        "built system"
    );
    Ok(system)
}

fn populate(system: &mut ComponentSystem, def: &SystemDef, engine: &Engine, path: &str) -> AppResult<()> {
    let fail = |what: String| AppError::Build {
        context: path.to_owned(),
        what,
    };

    if let Some(dt) = def.timestep {
        system.set_timestep(dt).map_err(|e| fail(e.to_string()))?;
    }
    system.set_inherit_timestep(def.inherit_timestep);

    for parameter in &def.parameters {
        system
            .set_parameter(&parameter.name, value_of(&parameter.value))
            .map_err(|e| fail(e.to_string()))?;
        if !parameter.description.is_empty() {
            system
                .describe_parameter(&parameter.name, &parameter.description)
                .map_err(|e| fail(e.to_string()))?;
        }
    }

    for port in &def.ports {
        system
            .add_system_port(&port.name, port_kind(port.kind), &port.node_type)
            .map_err(|e| fail(e.to_string()))?;
    }

    for component in &def.components {
        add_component(system, component, engine, path)?;
    }

    for ConnectionDef { from, to } in &def.connections {
        system
            .connect(from, to)
            .map_err(|e| fail(format!("{from} -> {to}: {e}")))?;
    }
    Ok(())
}

fn add_component(system: &mut ComponentSystem, def: &ComponentDef, engine: &Engine, path: &str) -> AppResult<()> {
    let here = format!("{path}.{}", def.name);
    let fail = |what: String| AppError::Build {
        context: here.clone(),
        what,
    };

    match (&def.system, def.type_name == SUBSYSTEM_TYPE) {
        (Some(body), true) => {
            let mut sub = engine.new_system(&def.name);
            populate(&mut sub, body, engine, &here)?;
            system
                .add_subsystem(&def.name, sub)
                .map_err(|e| fail(e.to_string()))?;
        }
        _ => {
            let component = engine.create(&def.type_name)?;
            system
                .add_component(&def.name, &def.type_name, component)
                .map_err(|e| fail(e.to_string()))?;
        }
    }

    for (name, value) in &def.parameters {
        system
            .set_component_parameter(&def.name, name, parameter_of(value))
            .map_err(|e| fail(e.to_string()))?;
    }
    for start in &def.start_values {
        system
            .set_start_value(&def.name, &start.port, &start.slot, start.value)
            .map_err(|e| fail(e.to_string()))?;
    }
    Ok(())
}

/// Describe `system` so that [`build_system`] recreates it.
pub fn describe_system(system: &ComponentSystem) -> SystemDef {
    let parameters = system
        .parameters()
        .filter_map(|(name, parameter)| {
            Some(SystemParameterDef {
                name: name.to_owned(),
                value: value_def(&parameter.value)?,
                description: parameter.description.clone(),
            })
        })
        .collect();

    let ports = system
        .system_ports()
        .iter()
        .map(|port| SystemPortDef {
            name: port.name.clone(),
            kind: port_kind_def(port.kind),
            node_type: port.node_type.clone(),
        })
        .collect();

    let components = system
        .children()
        .map(|entry| ComponentDef {
            name: entry.name().to_owned(),
            type_name: entry.type_name().to_owned(),
            parameters: entry
                .parameter_overrides()
                .iter()
                .map(|(name, value)| (name.clone(), parameter_def(value)))
                .collect::<BTreeMap<_, _>>(),
            start_values: entry
                .start_values()
                .iter()
                .map(|s| StartValueDef {
                    port: s.port.clone(),
                    slot: s.slot.clone(),
                    value: s.value,
                })
                .collect(),
            system: entry
                .child()
                .as_system()
                .map(|sub| Box::new(describe_system(sub))),
        })
        .collect();

    let connections = system
        .connections()
        .into_iter()
        .map(|(from, to)| ConnectionDef { from, to })
        .collect();

    SystemDef {
        timestep: (!system.inherits_timestep()).then(|| system.timestep()),
        inherit_timestep: system.inherits_timestep(),
        parameters,
        ports,
        components,
        connections,
    }
}

/// Describe the root `system` together with its run settings.
pub fn describe_model(system: &ComponentSystem, settings: &SimulationSettings) -> ModelDef {
    ModelDef {
        version: tlm_model::LATEST_VERSION,
        name: system.name().to_owned(),
        simulation: SimulationDef {
            start_time: settings.start_time,
            stop_time: settings.stop_time,
            timestep: settings.timestep,
            log_samples: settings.log_samples,
        },
        system: describe_system(system),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_values_map_both_ways() {
        let refs = ParameterDef::Ref { target: "p".into() };
        assert_eq!(parameter_of(&refs), ParameterValue::SystemRef("p".into()));
        assert_eq!(parameter_def(&ParameterValue::SystemRef("p".into())), refs);
        for value in [
            ValueDef::Real(1.5),
            ValueDef::Integer(3),
            ValueDef::Bool(true),
            ValueDef::Text("x".into()),
        ] {
            assert_eq!(value_def(&value_of(&value)), Some(value));
        }
        assert_eq!(value_def(&ParameterValue::SystemRef("p".into())), None);
    }

    #[test]
    fn unknown_type_is_reported() {
        let engine = Engine::new();
        let model = ModelDef {
            version: tlm_model::LATEST_VERSION,
            name: "m".into(),
            simulation: SimulationDef::default(),
            system: SystemDef {
                components: vec![ComponentDef::new("x", "NoSuchComponent")],
                ..Default::default()
            },
        };
        assert!(matches!(
            build_system(&model, &engine),
            Err(AppError::UnknownType(name)) if name == "NoSuchComponent"
        ));
    }

    #[test]
    fn bad_connection_names_its_endpoints() {
        let engine = Engine::new();
        let model = ModelDef {
            version: tlm_model::LATEST_VERSION,
            name: "m".into(),
            simulation: SimulationDef::default(),
            system: SystemDef {
                components: vec![
                    ComponentDef::new("a", "SignalConstant"),
                    ComponentDef::new("b", "SignalConstant"),
                ],
                connections: vec![ConnectionDef::new("a.out", "b.out")],
                ..Default::default()
            },
        };
        let err = build_system(&model, &engine).unwrap_err();
        match err {
            AppError::Build { context, what } => {
                assert_eq!(context, "m");
                assert!(what.starts_with("a.out -> b.out"), "{what}");
            }
            other => panic!("unexpected {other}"),
        }
    }
}
