//! Running models and exporting what they logged.

use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use tlm_core::Severity;
use tlm_model::ModelDef;
use tlm_system::{
    ComponentSystem, DataLog, ScheduleReport, Scheduler, SchedulerOptions, SimulationSettings,
};

use crate::build::{build_system, settings_of};
use crate::engine::Engine;
use crate::error::{AppError, AppResult};

/// Summary of one finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub name: String,
    pub reached_time: f64,
    pub aborted: bool,
    pub samples: usize,
    pub warnings: usize,
    pub errors: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    fn of(system: &ComponentSystem, elapsed: Duration) -> Self {
        let messages = system.diagnostics();
        Self {
            name: system.name().to_owned(),
            reached_time: system.time(),
            aborted: system.is_aborted(),
            samples: system.log_data().len(),
            warnings: messages.count(Severity::Warning),
            errors: messages.count(Severity::Error) + messages.count(Severity::Fatal),
            elapsed,
        }
    }
}

/// Systems, summaries and scheduler report of one [`run_models`] call.
#[derive(Debug)]
pub struct ScheduledRun {
    pub systems: Vec<ComponentSystem>,
    pub summaries: Vec<RunSummary>,
    pub report: ScheduleReport,
}

impl ScheduledRun {
    /// Whether every system reached the stop time.
    pub fn is_success(&self) -> bool {
        self.report.is_success()
    }

    /// `Err(AppError::Aborted)` naming the systems that stopped early.
    pub fn into_result(self) -> AppResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(AppError::Aborted(self.report.aborted.clone()))
        }
    }
}

/// Build `model` and run it with `settings`, or the model's own settings.
///
/// An aborted run still returns the system and its log; only a model that
/// cannot start is an error.
pub fn run_model(
    engine: &Engine,
    model: &ModelDef,
    settings: Option<&SimulationSettings>,
) -> AppResult<(ComponentSystem, RunSummary)> {
    let started = Instant::now();
    let settings = settings.cloned().unwrap_or_else(|| settings_of(&model.simulation));
    let mut system = build_system(model, engine)?;
    system.set_log_samples(settings.log_samples);
    system.run(&settings)?;

    let summary = RunSummary::of(&system, started.elapsed());
    tracing::info!(
        model = %summary.name,
        time = summary.reached_time,
        aborted = summary.aborted,
        elapsed = ?summary.elapsed,
        "run finished"
    );
    Ok((system, summary))
}

/// Run several models side by side on the simulation scheduler. Every model
/// keeps its own timestep; start and stop come from `settings`.
///
/// Aborted systems are listed in the returned report rather than turned into
/// an error; see [`ScheduledRun::into_result`].
pub fn run_models(
    engine: &Engine,
    models: &[ModelDef],
    settings: &SimulationSettings,
    options: SchedulerOptions,
) -> AppResult<ScheduledRun> {
    settings.validate()?;
    let started = Instant::now();
    let mut systems = models
        .iter()
        .map(|model| {
            let mut system = build_system(model, engine)?;
            system.set_log_samples(settings.log_samples);
            Ok(system)
        })
        .collect::<AppResult<Vec<_>>>()?;

    let mut scheduler = Scheduler::new(options);
    let report = scheduler.run(&mut systems, settings.start_time, settings.stop_time)?;
    for system in &mut systems {
        system.finalize();
    }
    tracing::info!(
        systems = systems.len(),
        aborted = report.aborted.len(),
        elapsed = ?report.elapsed,
        "scheduled run finished"
    );

    let elapsed = started.elapsed();
    let summaries = systems.iter().map(|s| RunSummary::of(s, elapsed)).collect();
    Ok(ScheduledRun {
        systems,
        summaries,
        report,
    })
}

/// Write `log` as CSV: a `time` column, then one `label#slot [unit]` column
/// per logged slot.
pub fn write_csv(log: &DataLog, mut out: impl Write) -> std::io::Result<()> {
    write!(out, "time")?;
    for series in log.series() {
        if series.unit.is_empty() {
            write!(out, ",{}", series.key())?;
        } else {
            write!(out, ",{} [{}]", series.key(), series.unit)?;
        }
    }
    writeln!(out)?;

    for (row, time) in log.time().iter().enumerate() {
        write!(out, "{time}")?;
        for series in log.series() {
            match series.values.get(row) {
                Some(value) => write!(out, ",{value}")?,
                None => write!(out, ",")?,
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn export_csv(log: &DataLog, path: &Path) -> AppResult<()> {
    if log.is_empty() {
        return Err(AppError::InvalidInput("nothing was logged".to_owned()));
    }
    let file = std::fs::File::create(path)?;
    let mut out = std::io::BufWriter::new(file);
    write_csv(log, &mut out)?;
    out.flush()?;
    tracing::debug!(path = %path.display(), rows = log.len(), "exported csv");
    Ok(())
}
