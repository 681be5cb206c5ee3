use std::path::Path;

#[test]
fn bundled_models_load_and_validate() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../models");
    let models = ["step_sink.yaml", "pressure_circuit.yaml", "nested_gain.yaml"];

    for name in models {
        let path = root.join(name);
        let model = tlm_model::load_yaml(&path).unwrap_or_else(|e| panic!("Failed to load {name}: {e}"));
        tlm_model::validate_model(&model).unwrap_or_else(|e| panic!("Failed to validate {name}: {e}"));
        assert_eq!(model.name, name.trim_end_matches(".yaml"));
    }
}

#[test]
fn nested_body_is_read_inline() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../models");
    let model = tlm_model::load_yaml(&root.join("nested_gain.yaml")).unwrap();
    let scale = model
        .system
        .components
        .iter()
        .find(|c| c.name == "scale")
        .unwrap();
    let body = scale.system.as_deref().unwrap();
    assert_eq!(body.ports.len(), 2);
    assert_eq!(body.ports[0].kind, tlm_model::PortKindDef::Read);
    assert_eq!(
        scale.parameters["k"],
        tlm_model::ParameterDef::Ref { target: "gain".into() }
    );
}
