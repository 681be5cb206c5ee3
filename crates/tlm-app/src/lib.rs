//! Shared application service layer for tlmsim.
//!
//! Bundles the registries into an [`Engine`], builds systems from model
//! files and describes them back, runs them, exports their logs and hosts
//! them for remote clients. The CLI is a thin layer over this crate.

pub mod build;
pub mod engine;
pub mod error;
pub mod remote;
pub mod run_service;

pub use build::{build_system, describe_model, describe_system, settings_of};
pub use engine::Engine;
pub use error::{AppError, AppResult};
pub use remote::{Reply, Request, SeriesDef, WorkerHost, WorkerState, serve_json_lines};
pub use run_service::{
    RunSummary, ScheduledRun, export_csv, run_model, run_models, write_csv,
};

/// Load a model file; `.json` is read as JSON, anything else as YAML.
pub fn load_model(path: &std::path::Path) -> AppResult<tlm_model::ModelDef> {
    if !path.exists() {
        return Err(AppError::ModelFileRead {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        });
    }
    Ok(tlm_model::load(path)?)
}
