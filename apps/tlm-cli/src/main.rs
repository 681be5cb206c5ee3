use clap::{Args, Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use tlm_app::{AppResult, Engine, RunSummary, WorkerHost};
use tlm_core::Severity;
use tlm_system::{SchedulerOptions, SimulationSettings};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tlm-cli")]
#[command(about = "tlmsim CLI - transmission line method system simulation", long_about = None)]
struct Cli {
    /// Component library to load before running the command (repeatable)
    #[arg(long = "plugin", global = true)]
    plugins: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a model file and check that it builds
    Validate {
        /// Path to the model (YAML, or JSON by extension)
        model_path: PathBuf,
    },
    /// Run one or more models
    Run(RunArgs),
    /// Print the model as rebuilt from the loaded system
    Describe {
        /// Path to the model
        model_path: PathBuf,
    },
    /// List registered component types
    Types,
    /// Serve the remote worker protocol as JSON lines on stdin/stdout
    Worker,
}

#[derive(Args)]
struct RunArgs {
    /// Model files; more than one runs them side by side
    #[arg(required = true)]
    model_paths: Vec<PathBuf>,
    /// Start time in seconds
    #[arg(long)]
    start: Option<f64>,
    /// Stop time in seconds
    #[arg(long)]
    stop: Option<f64>,
    /// Timestep in seconds
    #[arg(long)]
    dt: Option<f64>,
    /// Number of logged samples
    #[arg(long)]
    samples: Option<usize>,
    /// Worker threads for several models; 0 picks one per core, negative runs sequentially
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    threads: i32,
    /// Write the log of a single model to this CSV file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl RunArgs {
    fn settings(&self, model: &tlm_model::ModelDef) -> SimulationSettings {
        let base = tlm_app::settings_of(&model.simulation);
        SimulationSettings {
            start_time: self.start.unwrap_or(base.start_time),
            stop_time: self.stop.unwrap_or(base.stop_time),
            timestep: self.dt.unwrap_or(base.timestep),
            log_samples: self.samples.unwrap_or(base.log_samples),
        }
    }
}

fn main() -> AppResult<()> {
    // stdout carries worker replies, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut engine = Engine::new();
    for plugin in &cli.plugins {
        let added = engine.load_plugin(plugin)?;
        tracing::info!(plugin = %plugin.display(), types = ?added, "plugin ready");
    }

    let result = match cli.command {
        Commands::Validate { model_path } => cmd_validate(&engine, &model_path),
        Commands::Run(args) => cmd_run(&engine, &args),
        Commands::Describe { model_path } => cmd_describe(&engine, &model_path),
        Commands::Types => {
            for name in engine.component_types() {
                println!("{name}");
            }
            Ok(())
        }
        Commands::Worker => {
            let mut host = WorkerHost::new(engine);
            return tlm_app::serve_json_lines(&mut host, io::stdin().lock(), io::stdout().lock());
        }
    };
    print_messages(&engine);
    result
}

fn print_messages(engine: &Engine) {
    for message in engine.messages().drain() {
        if message.severity >= Severity::Warning {
            eprintln!("{message}");
        }
    }
}

fn cmd_validate(engine: &Engine, model_path: &Path) -> AppResult<()> {
    println!("Validating model: {}", model_path.display());
    let model = tlm_app::load_model(model_path)?;
    let system = tlm_app::build_system(&model, engine)?;
    if !system.check_model_before_simulation() {
        return Err(tlm_app::AppError::InvalidInput(format!(
            "model '{}' failed the pre-simulation check",
            model.name
        )));
    }
    println!("✓ Model is valid ({} components)", system.num_components());
    Ok(())
}

fn cmd_run(engine: &Engine, args: &RunArgs) -> AppResult<()> {
    let models = args
        .model_paths
        .iter()
        .map(|p| tlm_app::load_model(p))
        .collect::<AppResult<Vec<_>>>()?;

    if let [model] = models.as_slice() {
        let settings = args.settings(model);
        println!(
            "Running {} from {:.3} s to {:.3} s, dt = {:e} s",
            model.name, settings.start_time, settings.stop_time, settings.timestep
        );
        let (system, summary) = tlm_app::run_model(engine, model, Some(&settings))?;
        print_summary(&summary);
        if let Some(output) = &args.output {
            tlm_app::export_csv(system.log_data(), output)?;
            println!("  Wrote {}", output.display());
        }
        if summary.aborted {
            return Err(tlm_app::AppError::Aborted(vec![summary.name]));
        }
        return Ok(());
    }

    if args.output.is_some() {
        return Err(tlm_app::AppError::InvalidInput(
            "--output takes a single model".to_owned(),
        ));
    }
    let settings = args.settings(&models[0]);
    let options = SchedulerOptions {
        threads: args.threads,
        ..Default::default()
    };
    println!("Running {} models to {:.3} s", models.len(), settings.stop_time);
    let run = tlm_app::run_models(engine, &models, &settings, options)?;
    for summary in &run.summaries {
        print_summary(summary);
    }
    run.into_result().map(|_| ())
}

fn print_summary(summary: &RunSummary) {
    let mark = if summary.aborted { "✗" } else { "✓" };
    println!(
        "{mark} {}: reached t = {:.6} s in {:.3} s",
        summary.name,
        summary.reached_time,
        summary.elapsed.as_secs_f64()
    );
    println!("  Samples: {}", summary.samples);
    if summary.warnings + summary.errors > 0 {
        println!("  Warnings: {}, errors: {}", summary.warnings, summary.errors);
    }
}

fn cmd_describe(engine: &Engine, model_path: &Path) -> AppResult<()> {
    let model = tlm_app::load_model(model_path)?;
    let system = tlm_app::build_system(&model, engine)?;
    let described = tlm_app::describe_model(&system, &tlm_app::settings_of(&model.simulation));
    let text = serde_yaml::to_string(&described)
        .map_err(|e| tlm_app::AppError::Model(e.to_string()))?;
    print!("{text}");
    Ok(())
}
