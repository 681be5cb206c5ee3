use std::path::{Path, PathBuf};

use tlm_app::{
    AppError, Engine, build_system, describe_model, load_model, run_model, run_models, write_csv,
};
use tlm_components::signal::SignalSink;
use tlm_components::{CausalRole, Component, ComponentResult, Configurator, InitContext, SimContext};
use tlm_model::ModelDef;
use tlm_system::{SchedulerOptions, SimulationSettings};

fn model_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../models").join(name)
}

#[test]
fn step_sink_model_records_the_step() {
    let engine = Engine::new();
    let model = load_model(&model_path("step_sink.yaml")).unwrap();
    let (system, summary) = run_model(&engine, &model, None).unwrap();

    let sink = system.component_as::<SignalSink>("sink").unwrap();
    assert_eq!(
        sink.channel(0).unwrap(),
        &[0.0, 0.0, 0.0, 0.0, 2.0, 2.0, 2.0, 2.0, 2.0, 2.0]
    );
    assert!(!summary.aborted);
    assert_eq!(summary.samples, 11);
    assert_eq!(summary.errors, 0);
    assert!((summary.reached_time - 1.0).abs() < 1e-9);
}

#[test]
fn pressure_circuit_fills_the_volume() {
    let engine = Engine::new();
    let model = load_model(&model_path("pressure_circuit.yaml")).unwrap();
    let (system, summary) = run_model(&engine, &model, None).unwrap();
    assert_eq!(summary.errors, 0);

    let log = system.component_as::<SignalSink>("log").unwrap();
    let pressure = log.channel(0).unwrap();
    assert_eq!(pressure.len(), 5000);
    assert!(pressure.windows(2).all(|w| w[1] >= w[0] - 1.0));
    let last = *pressure.last().unwrap();
    assert!(last > 9e6 && last < 1.01e7, "final pressure {last}");
}

#[test]
fn nested_gain_uses_the_bound_parameter() {
    let engine = Engine::new();
    let model = load_model(&model_path("nested_gain.yaml")).unwrap();
    let (system, _) = run_model(&engine, &model, None).unwrap();

    let sink = system.component_as::<SignalSink>("sink").unwrap();
    let out = sink.channel(0).unwrap();
    assert_eq!(out.len(), 100);
    assert!((out[49] - 4.0 * 0.5).abs() < 1e-9, "{}", out[49]);
    assert!((out[99] - 4.0).abs() < 1e-9, "{}", out[99]);
}

#[test]
fn described_model_rebuilds_the_same_run() {
    let engine = Engine::new();
    let model = load_model(&model_path("nested_gain.yaml")).unwrap();
    let original = build_system(&model, &engine).unwrap();
    let settings = tlm_app::settings_of(&model.simulation);

    let described = describe_model(&original, &settings);
    assert_eq!(described.name, model.name);
    assert_eq!(described.system.components.len(), 3);
    let scale = &described.system.components[1];
    assert_eq!(scale.type_name, "Subsystem");
    assert_eq!(scale.system.as_ref().unwrap().ports.len(), 2);

    let text = serde_yaml::to_string(&described).unwrap();
    let reread = tlm_model::from_yaml_str(&text).unwrap();
    let (a, _) = run_model(&engine, &model, Some(&settings)).unwrap();
    let (b, _) = run_model(&engine, &reread, Some(&settings)).unwrap();
    assert_eq!(
        a.component_as::<SignalSink>("sink").unwrap().channel(0),
        b.component_as::<SignalSink>("sink").unwrap().channel(0)
    );
}

#[test]
fn settings_override_the_model() {
    let engine = Engine::new();
    let model = load_model(&model_path("step_sink.yaml")).unwrap();
    let settings = SimulationSettings {
        start_time: 0.0,
        stop_time: 2.0,
        timestep: 0.5,
        log_samples: 100,
    };
    let (system, summary) = run_model(&engine, &model, Some(&settings)).unwrap();
    assert_eq!(system.component_as::<SignalSink>("sink").unwrap().time(), &[0.5, 1.0, 1.5, 2.0]);
    assert_eq!(summary.samples, 5);
}

#[test]
fn csv_has_a_header_and_one_row_per_sample() {
    let engine = Engine::new();
    let model = load_model(&model_path("step_sink.yaml")).unwrap();
    let (system, _) = run_model(&engine, &model, None).unwrap();

    let mut out = Vec::new();
    write_csv(system.log_data(), &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 12);
    assert!(lines[0].starts_with("time,"));
    assert!(lines[0].contains("#Value"));
    assert!(lines[1].starts_with("0,"));
    let columns = lines[0].split(',').count();
    assert!(lines.iter().all(|l| l.split(',').count() == columns));
}

#[test]
fn missing_file_is_reported_with_its_path() {
    let err = load_model(Path::new("/nonexistent/model.yaml")).unwrap_err();
    assert!(matches!(err, tlm_app::AppError::ModelFileRead { .. }));
}

/// Stops the run once `at` is reached.
#[derive(Default)]
struct Cutoff {
    at: f64,
}

impl Component for Cutoff {
    fn role(&self) -> CausalRole {
        CausalRole::Signal
    }

    fn configure(&self, cfg: &mut Configurator) {
        cfg.add_real("at", "Cutoff time", "s", 0.3);
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> ComponentResult<()> {
        self.at = ctx.real("at")?;
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) {
        if ctx.time() >= self.at - 1e-12 {
            ctx.stop_simulation("cutoff reached");
        }
    }
}

fn step_model(name: &str, extra: &str) -> ModelDef {
    let text = format!(
        r#"
version: 1
name: {name}
system:
  {extra}
  components:
    - name: step
      type: SignalStep
    - name: sink
      type: SignalSink
  connections:
    - {{ from: step.out, to: sink.in }}
"#
    );
    tlm_model::from_yaml_str(&text).unwrap()
}

fn scheduled_settings() -> SimulationSettings {
    SimulationSettings {
        start_time: 0.0,
        stop_time: 1.0,
        timestep: 0.1,
        log_samples: 10,
    }
}

#[test]
fn scheduled_summaries_count_each_system_separately() {
    let engine = Engine::new();
    let noisy = step_model("noisy", "parameters: [{ name: unused, value: 1.0 }]");
    let quiet = step_model("quiet", "");

    let run = run_models(
        &engine,
        &[noisy, quiet],
        &scheduled_settings(),
        SchedulerOptions {
            threads: 2,
            ..Default::default()
        },
    )
    .unwrap();

    assert!(run.is_success());
    let by_name = |name: &str| run.summaries.iter().find(|s| s.name == name).unwrap();
    assert_eq!(by_name("noisy").warnings, 1);
    assert_eq!(by_name("quiet").warnings, 0);
    assert_eq!(by_name("quiet").errors, 0);
    assert!(engine.messages().num_warning_messages() >= 1);
}

#[test]
fn aborted_system_fails_the_scheduled_run() {
    let mut engine = Engine::new();
    engine.register_component("Cutoff", || Box::new(Cutoff::default()) as Box<dyn Component>);
    let mut stopped = step_model("stopped", "");
    stopped
        .system
        .components
        .push(tlm_model::ComponentDef::new("cutoff", "Cutoff"));
    let finished = step_model("finished", "");

    let run = run_models(
        &engine,
        &[finished, stopped],
        &scheduled_settings(),
        SchedulerOptions {
            threads: -1,
            ..Default::default()
        },
    )
    .unwrap();

    assert!(!run.is_success());
    assert_eq!(run.report.aborted, vec!["stopped".to_owned()]);
    let summary = run.summaries.iter().find(|s| s.name == "stopped").unwrap();
    assert!(summary.aborted);
    assert!(summary.errors >= 1);
    assert!(run.summaries.iter().any(|s| s.name == "finished" && !s.aborted));

    match run.into_result() {
        Err(AppError::Aborted(names)) => assert_eq!(names, vec!["stopped".to_owned()]),
        other => panic!("expected an aborted run, got {other:?}"),
    }
}
