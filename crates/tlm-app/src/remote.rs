//! Remote execution: one hosted model driven by a request/reply protocol.
//!
//! The host knows nothing about transports. [`serve_json_lines`] is the one
//! the CLI uses: a JSON request per input line, a JSON reply per output line.

use std::io::{BufRead, Write};
use std::sync::mpsc;
use std::thread::{Builder, JoinHandle};

use serde::{Deserialize, Serialize};
use tlm_core::{Message, Real};
use tlm_model::{ModelDef, ValueDef};
use tlm_system::{ComponentSystem, ProgressHandle, SystemResult};

use crate::build::{build_system, value_def, value_of};
use crate::engine::Engine;
use crate::error::AppResult;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum Request {
    LoadModel { model: ModelDef },
    SetParameter { name: String, value: ValueDef },
    GetParameter { name: String },
    Simulate { start: Real, stop: Real },
    Status,
    Abort,
    Messages,
    Results,
    Finalize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Empty,
    Loaded,
    Running,
    Finished,
    Aborted,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unit: String,
    pub values: Vec<Real>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum Reply {
    Ack,
    NotAck { reason: String },
    Status { state: WorkerState, time: Real, progress: Real },
    Parameter { name: String, value: ValueDef },
    Messages { messages: Vec<Message> },
    Results { time: Vec<Real>, series: Vec<SeriesDef> },
}

impl Reply {
    fn not_ack(reason: impl Into<String>) -> Self {
        Reply::NotAck {
            reason: reason.into(),
        }
    }
}

type SimulationJob = JoinHandle<Option<(Box<ComponentSystem>, SystemResult<()>)>>;

/// Simulate `system` to `stop` on a thread from `builder`. The system only
/// moves to the thread once it has started, so a failed spawn hands it back.
fn spawn_simulation(
    builder: Builder,
    system: Box<ComponentSystem>,
    stop: Real,
) -> Result<SimulationJob, (Box<ComponentSystem>, std::io::Error)> {
    let (handoff, incoming) = mpsc::channel::<Box<ComponentSystem>>();
    let job = builder.spawn(move || {
        let mut system = incoming.recv().ok()?;
        let result = system.simulate(stop);
        Some((system, result))
    });
    match job {
        Ok(job) => match handoff.send(system) {
            Ok(()) => Ok(job),
            // the thread is gone before receiving; take the system back
            Err(mpsc::SendError(system)) => Err((
                system,
                std::io::Error::other("simulation thread exited before starting"),
            )),
        },
        Err(e) => Err((system, e)),
    }
}

enum Slot {
    Empty,
    Idle(Box<ComponentSystem>),
    Running(SimulationJob),
}

/// Hosts one model for a remote client.
pub struct WorkerHost {
    engine: Engine,
    slot: Slot,
    progress: Option<ProgressHandle>,
    state: WorkerState,
}

impl WorkerHost {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            slot: Slot::Empty,
            progress: None,
            state: WorkerState::Empty,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn handle(&mut self, request: Request) -> Reply {
        tracing::debug!(?request, "worker request");
        match request {
            Request::LoadModel { model } => self.load(&model),
            Request::SetParameter { name, value } => match self.idle_system() {
                Ok(system) => match system.set_parameter(&name, value_of(&value)) {
                    Ok(()) => Reply::Ack,
                    Err(e) => Reply::not_ack(e.to_string()),
                },
                Err(reply) => reply,
            },
            Request::GetParameter { name } => match self.idle_system() {
                Ok(system) => match system.parameter(&name).and_then(value_def) {
                    Some(value) => Reply::Parameter { name, value },
                    None => Reply::not_ack(format!("no system parameter '{name}'")),
                },
                Err(reply) => reply,
            },
            Request::Simulate { start, stop } => self.simulate(start, stop),
            Request::Status => {
                self.settle(false);
                let (time, progress) = self
                    .progress
                    .as_ref()
                    .map_or((0.0, 0.0), |p| (p.time(), p.fraction()));
                Reply::Status {
                    state: self.state,
                    time,
                    progress,
                }
            }
            Request::Abort => match &self.progress {
                Some(progress) if self.state == WorkerState::Running => {
                    progress.abort();
                    Reply::Ack
                }
                _ => Reply::not_ack("no simulation running"),
            },
            Request::Messages => Reply::Messages {
                messages: self.engine.messages().drain(),
            },
            Request::Results => self.results(),
            Request::Finalize => {
                self.settle(true);
                match &mut self.slot {
                    Slot::Idle(system) => {
                        system.finalize();
                        Reply::Ack
                    }
                    _ => Reply::not_ack("no model loaded"),
                }
            }
        }
    }

    fn load(&mut self, model: &ModelDef) -> Reply {
        self.settle(false);
        if matches!(self.slot, Slot::Running(_)) {
            return Reply::not_ack("simulation running");
        }
        if let Slot::Idle(previous) = &mut self.slot {
            previous.finalize();
        }
        match build_system(model, &self.engine) {
            Ok(mut system) => {
                if let Err(e) = system.set_timestep(model.simulation.timestep) {
                    return Reply::not_ack(e.to_string());
                }
                system.set_log_samples(model.simulation.log_samples);
                self.progress = Some(system.progress());
                self.slot = Slot::Idle(Box::new(system));
                self.state = WorkerState::Loaded;
                tracing::info!(model = %model.name, "model loaded");
                Reply::Ack
            }
            Err(e) => Reply::not_ack(e.to_string()),
        }
    }

    fn idle_system(&mut self) -> Result<&mut ComponentSystem, Reply> {
        self.settle(false);
        match &mut self.slot {
            Slot::Idle(system) => Ok(system.as_mut()),
            Slot::Running(_) => Err(Reply::not_ack("simulation running")),
            Slot::Empty => Err(Reply::not_ack("no model loaded")),
        }
    }

    /// Initialize on the calling thread, then simulate on a worker thread.
    fn simulate(&mut self, start: Real, stop: Real) -> Reply {
        if let Err(reply) = self.idle_system() {
            return reply;
        }
        let Slot::Idle(mut system) = std::mem::replace(&mut self.slot, Slot::Empty) else {
            return Reply::not_ack("no model loaded");
        };
        if let Err(e) = system.initialize(start, stop) {
            self.slot = Slot::Idle(system);
            self.state = WorkerState::Failed;
            return Reply::not_ack(e.to_string());
        }

        let builder = Builder::new().name("tlm-remote-sim".to_owned());
        match spawn_simulation(builder, system, stop) {
            Ok(job) => {
                self.slot = Slot::Running(job);
                self.state = WorkerState::Running;
                Reply::Ack
            }
            Err((mut system, e)) => {
                system.finalize();
                self.slot = Slot::Idle(system);
                self.state = WorkerState::Failed;
                Reply::not_ack(format!("could not start simulation thread: {e}"))
            }
        }
    }

    /// Collect a finished simulation; with `block`, wait for a running one.
    fn settle(&mut self, block: bool) {
        let finished = matches!(&self.slot, Slot::Running(job) if block || job.is_finished());
        if !finished {
            return;
        }
        let Slot::Running(job) = std::mem::replace(&mut self.slot, Slot::Empty) else {
            return;
        };
        match job.join() {
            Ok(Some((system, result))) => {
                self.state = match result {
                    Err(e) => {
                        self.engine.messages().error(e.to_string());
                        WorkerState::Failed
                    }
                    Ok(()) if system.is_aborted() => WorkerState::Aborted,
                    Ok(()) => WorkerState::Finished,
                };
                tracing::info!(state = ?self.state, time = system.time(), "simulation collected");
                self.slot = Slot::Idle(system);
            }
            Ok(None) => {
                self.engine.messages().fatal("simulation thread never received its model");
                self.state = WorkerState::Failed;
                self.progress = None;
            }
            Err(_) => {
                self.engine.messages().fatal("simulation thread panicked");
                self.state = WorkerState::Failed;
                self.progress = None;
            }
        }
    }

    fn results(&mut self) -> Reply {
        let system = match self.idle_system() {
            Ok(system) => system,
            Err(reply) => return reply,
        };
        let log = system.log_data();
        if log.is_empty() {
            return Reply::not_ack("nothing was logged");
        }
        Reply::Results {
            time: log.time().to_vec(),
            series: log
                .series()
                .iter()
                .map(|s| SeriesDef {
                    name: s.key(),
                    unit: s.unit.clone(),
                    values: s.values.clone(),
                })
                .collect(),
        }
    }
}

impl Drop for WorkerHost {
    fn drop(&mut self) {
        if let Some(progress) = &self.progress
            && self.state == WorkerState::Running
        {
            progress.abort();
        }
        self.settle(true);
    }
}

/// Serve `host` over newline-delimited JSON until `input` ends.
pub fn serve_json_lines(host: &mut WorkerHost, input: impl BufRead, mut output: impl Write) -> AppResult<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let reply = match serde_json::from_str::<Request>(&line) {
            Ok(request) => host.handle(request),
            Err(e) => Reply::not_ack(format!("bad request: {e}")),
        };
        serde_json::to_writer(&mut output, &reply)?;
        writeln!(output)?;
        output.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_are_tagged_snake_case() {
        let json = serde_json::to_string(&Request::Simulate { start: 0.0, stop: 1.0 }).unwrap();
        assert_eq!(json, r#"{"request":"simulate","start":0.0,"stop":1.0}"#);
        let parsed: Request = serde_json::from_str(r#"{"request":"status"}"#).unwrap();
        assert_eq!(parsed, Request::Status);
        let parsed: Request =
            serde_json::from_str(r#"{"request":"set_parameter","name":"p","value":2.5}"#).unwrap();
        assert_eq!(
            parsed,
            Request::SetParameter {
                name: "p".into(),
                value: ValueDef::Real(2.5)
            }
        );
    }

    fn loaded_system(engine: &Engine) -> Box<ComponentSystem> {
        let model = tlm_model::from_yaml_str(
            r#"
version: 1
name: steady
simulation: { stop_time: 0.5, timestep: 0.1, log_samples: 5 }
system:
  components:
    - { name: step, type: SignalStep }
    - { name: sink, type: SignalSink }
  connections:
    - { from: step.out, to: sink.in }
"#,
        )
        .unwrap();
        let mut system = build_system(&model, engine).unwrap();
        system.set_timestep(0.1).unwrap();
        system.initialize(0.0, 0.5).unwrap();
        Box::new(system)
    }

    #[test]
    fn spawned_simulation_returns_the_system() {
        let engine = Engine::new();
        let job = spawn_simulation(Builder::new(), loaded_system(&engine), 0.5)
            .map_err(|(_, e)| e)
            .unwrap();
        let (system, result) = job.join().unwrap().unwrap();
        result.unwrap();
        assert!((system.time() - 0.5).abs() < 1e-9);
    }

    #[cfg(all(target_os = "linux", target_pointer_width = "64"))]
    #[test]
    fn failed_spawn_hands_the_system_back() {
        let engine = Engine::new();
        let unmappable = Builder::new().stack_size(usize::MAX / 2);
        let Err((system, _)) = spawn_simulation(unmappable, loaded_system(&engine), 0.5) else {
            panic!("a thread with an unmappable stack started");
        };
        assert_eq!(system.name(), "steady");
        assert!(system.is_initialized());
        assert_eq!(system.time(), 0.0);
    }

    #[test]
    fn empty_host_refuses_work() {
        let mut host = WorkerHost::new(Engine::new());
        assert!(matches!(host.handle(Request::Simulate { start: 0.0, stop: 1.0 }), Reply::NotAck { .. }));
        assert!(matches!(host.handle(Request::Abort), Reply::NotAck { .. }));
        assert!(matches!(host.handle(Request::Results), Reply::NotAck { .. }));
        assert_eq!(
            host.handle(Request::Status),
            Reply::Status {
                state: WorkerState::Empty,
                time: 0.0,
                progress: 0.0
            }
        );
    }
}
