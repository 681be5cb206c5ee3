//! tlm-model: declarative model file format and validation.
//!
//! A model is one root [`SystemDef`] plus simulation settings. Nested
//! systems live inline in the component that holds them. Building a
//! runnable system from a model is left to `tlm-app`, which owns the
//! component registries.

pub mod schema;
pub mod validate;

use std::path::Path;

pub use schema::*;
pub use validate::{LATEST_VERSION, ValidationError, is_valid_name, split_endpoint, validate_model};

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn from_yaml_str(content: &str) -> ModelResult<ModelDef> {
    let model: ModelDef = serde_yaml::from_str(content)?;
    validate_model(&model)?;
    Ok(model)
}

pub fn from_json_str(content: &str) -> ModelResult<ModelDef> {
    let model: ModelDef = serde_json::from_str(content)?;
    validate_model(&model)?;
    Ok(model)
}

pub fn load_yaml(path: &Path) -> ModelResult<ModelDef> {
    from_yaml_str(&std::fs::read_to_string(path)?)
}

pub fn save_yaml(path: &Path, model: &ModelDef) -> ModelResult<()> {
    validate_model(model)?;
    let content = serde_yaml::to_string(model)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ModelResult<ModelDef> {
    from_json_str(&std::fs::read_to_string(path)?)
}

pub fn save_json(path: &Path, model: &ModelDef) -> ModelResult<()> {
    validate_model(model)?;
    let content = serde_json::to_string_pretty(model)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Pick the format from the file extension; anything but `.json` is YAML.
pub fn load(path: &Path) -> ModelResult<ModelDef> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => load_json(path),
        _ => load_yaml(path),
    }
}
