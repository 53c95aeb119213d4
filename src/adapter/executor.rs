//! Caller-side execution adapter.
//!
//! Runs the allocation engine either inline on the caller's thread or on
//! the worker thread, bridging the engine's suspension points through the
//! message protocol. Decision hooks never cross the thread boundary: the
//! caller retains them in a correlation table keyed by run id, and a
//! dispatcher thread services the worker's callback events against that
//! table.
//!
//! Worker failure is a resource-recovery concern, not a correctness one:
//! every pending run is rejected, the call retries locally once, and only
//! a local failure surfaces to the caller.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, error, warn};

use super::protocol::{CallbackReply, RunId, WorkerEvent, WorkerRequest};
use super::worker::{self, WorkerChannels};
use crate::engine::{
    AllocationEngine, DecisionError, DecisionSource, EngineError, EngineInput, EngineOutput,
    SoftError, SubstitutionRequest, SubstitutionSelection, TieBreakRequest,
};
use crate::models::Team;

/// Where engine runs execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Inline on the caller's thread.
    #[default]
    Local,
    /// On the worker thread, with callback bridging.
    Worker,
    /// Both paths; outputs are compared and the local result wins.
    Shadow,
}

/// Adapter-level failure.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Local engine failure.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// The remote engine reported a failure.
    #[error("remote engine failed: {0}")]
    Remote(String),
    /// The worker or its dispatcher went away mid-run.
    #[error("worker failed: {0}")]
    WorkerFailed(String),
}

struct PendingRun {
    hooks: Arc<dyn DecisionSource>,
    done: flume::Sender<Result<EngineOutput, AdapterError>>,
}

type PendingTable = Arc<Mutex<HashMap<RunId, PendingRun>>>;

/// Executes engine runs in the configured mode.
pub struct Executor {
    mode: ExecutionMode,
    requests: Option<flume::Sender<WorkerRequest>>,
    pending: PendingTable,
}

impl Executor {
    /// Creates an executor.
    ///
    /// For `Worker` and `Shadow` modes the worker and dispatcher threads
    /// are spawned eagerly; a spawn failure degrades to local execution.
    pub fn new(mode: ExecutionMode) -> Self {
        match mode {
            ExecutionMode::Local => Self::local(),
            ExecutionMode::Worker | ExecutionMode::Shadow => match worker::spawn()
                .and_then(|channels| Self::from_channels(mode, channels))
            {
                Ok(executor) => executor,
                Err(e) => {
                    warn!(error = %e, "worker spawn failed; degrading to local execution");
                    Self::local()
                }
            },
        }
    }

    fn local() -> Self {
        Self {
            mode: ExecutionMode::Local,
            requests: None,
            pending: PendingTable::default(),
        }
    }

    /// Wires an executor to already-spawned worker channels.
    fn from_channels(mode: ExecutionMode, channels: WorkerChannels) -> std::io::Result<Self> {
        let pending = PendingTable::default();
        let table = Arc::clone(&pending);
        let WorkerChannels {
            requests,
            events,
            replies,
        } = channels;

        std::thread::Builder::new()
            .name("alloc-dispatch".into())
            .spawn(move || dispatch_loop(events, replies, table))?;

        Ok(Self {
            mode,
            requests: Some(requests),
            pending,
        })
    }

    /// The mode this executor runs in.
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Executes one engine run with the caller's decision hooks.
    pub fn execute(
        &self,
        input: &EngineInput,
        hooks: Arc<dyn DecisionSource>,
    ) -> Result<EngineOutput, AdapterError> {
        match self.mode {
            ExecutionMode::Local => self.run_local(input, hooks.as_ref()),
            ExecutionMode::Worker => match self.run_remote(input, Arc::clone(&hooks)) {
                Err(AdapterError::WorkerFailed(reason)) => {
                    warn!(%reason, "worker failed; retrying locally");
                    self.run_local(input, hooks.as_ref())
                }
                other => other,
            },
            ExecutionMode::Shadow => self.run_shadow(input, hooks),
        }
    }

    fn run_local(
        &self,
        input: &EngineInput,
        hooks: &dyn DecisionSource,
    ) -> Result<EngineOutput, AdapterError> {
        Ok(AllocationEngine::new(hooks).run(input)?)
    }

    fn run_remote(
        &self,
        input: &EngineInput,
        hooks: Arc<dyn DecisionSource>,
    ) -> Result<EngineOutput, AdapterError> {
        let Some(requests) = &self.requests else {
            return Err(AdapterError::WorkerFailed("no worker available".into()));
        };

        let run_id = RunId::next();
        let (done_tx, done_rx) = flume::bounded(1);
        self.pending
            .lock()
            .expect("pending table poisoned")
            .insert(run_id, PendingRun { hooks, done: done_tx });

        debug!(%run_id, "dispatching run to worker");
        let request = WorkerRequest::Run {
            run_id,
            input: input.clone(),
        };
        if requests.send(request).is_err() {
            self.pending
                .lock()
                .expect("pending table poisoned")
                .remove(&run_id);
            return Err(AdapterError::WorkerFailed("worker disconnected".into()));
        }

        done_rx
            .recv()
            .map_err(|_| AdapterError::WorkerFailed("dispatcher terminated".into()))?
    }

    /// Runs locally, then replays the recorded decisions remotely and
    /// compares. Mismatches are logged; the local result is authoritative.
    fn run_shadow(
        &self,
        input: &EngineInput,
        hooks: Arc<dyn DecisionSource>,
    ) -> Result<EngineOutput, AdapterError> {
        let recorder = RecordingDecisions::new(hooks);
        let local = self.run_local(input, &recorder)?;

        match self.run_remote(input, Arc::new(recorder.into_replay())) {
            Ok(remote) => {
                let lhs = normalized(&local);
                let rhs = normalized(&remote);
                if lhs != rhs {
                    warn!(local = %lhs, remote = %rhs, "shadow compare mismatch; local result wins");
                }
            }
            Err(e) => warn!(error = %e, "shadow run failed; local result wins"),
        }
        Ok(local)
    }
}

/// Services worker events against the pending-run table.
fn dispatch_loop(
    events: flume::Receiver<WorkerEvent>,
    replies: flume::Sender<CallbackReply>,
    pending: PendingTable,
) {
    while let Ok(event) = events.recv() {
        match event {
            WorkerEvent::Result { run_id, output } => complete(&pending, run_id, Ok(output)),
            WorkerEvent::Error { run_id, message } => {
                complete(&pending, run_id, Err(AdapterError::Remote(message)))
            }
            WorkerEvent::TieBreakRequest {
                run_id,
                callback_id,
                request,
            } => {
                let reply = match run_hooks(&pending, run_id) {
                    Some(hooks) => match hooks.resolve_tie(&request) {
                        Ok(team) => CallbackReply::TieBreakResponse {
                            run_id,
                            callback_id,
                            team,
                        },
                        Err(e) => CallbackReply::TieBreakError {
                            run_id,
                            callback_id,
                            message: e.to_string(),
                        },
                    },
                    None => CallbackReply::TieBreakError {
                        run_id,
                        callback_id,
                        message: format!("no run pending under {run_id}"),
                    },
                };
                if replies.send(reply).is_err() {
                    break;
                }
            }
            WorkerEvent::SubstitutionRequest {
                run_id,
                callback_id,
                request,
            } => {
                let reply = match run_hooks(&pending, run_id) {
                    Some(hooks) => match hooks.resolve_substitution(&request) {
                        Ok(selection) => CallbackReply::SubstitutionResponse {
                            run_id,
                            callback_id,
                            selection,
                        },
                        Err(e) => CallbackReply::SubstitutionError {
                            run_id,
                            callback_id,
                            message: e.to_string(),
                        },
                    },
                    None => CallbackReply::SubstitutionError {
                        run_id,
                        callback_id,
                        message: format!("no run pending under {run_id}"),
                    },
                };
                if replies.send(reply).is_err() {
                    break;
                }
            }
        }
    }

    // Worker gone: reject everything still in flight.
    let mut table = pending.lock().expect("pending table poisoned");
    for (run_id, run) in table.drain() {
        error!(%run_id, "worker terminated with run pending");
        let _ = run
            .done
            .send(Err(AdapterError::WorkerFailed("worker terminated".into())));
    }
}

fn complete(pending: &PendingTable, run_id: RunId, result: Result<EngineOutput, AdapterError>) {
    let entry = pending
        .lock()
        .expect("pending table poisoned")
        .remove(&run_id);
    match entry {
        Some(run) => {
            let _ = run.done.send(result);
        }
        None => warn!(%run_id, "completion for unknown run ignored"),
    }
}

fn run_hooks(pending: &PendingTable, run_id: RunId) -> Option<Arc<dyn DecisionSource>> {
    pending
        .lock()
        .expect("pending table poisoned")
        .get(&run_id)
        .map(|run| Arc::clone(&run.hooks))
}

/// Canonical comparison form: allocations sorted by a stable composite
/// key, free-text reasons stripped, serialized to JSON.
fn normalized(output: &EngineOutput) -> String {
    let mut out = output.clone();
    out.allocations.sort_by(|a, b| {
        (&a.staff_id, &a.home_team, &a.slots).cmp(&(&b.staff_id, &b.home_team, &b.slots))
    });
    for soft in &mut out.errors {
        match soft {
            SoftError::ProgramUnfilled { reason, .. }
            | SoftError::SubstitutionUnapplied { reason, .. } => reason.clear(),
            SoftError::UnmetNeed { .. } => {}
        }
    }
    serde_json::to_string(&out).unwrap_or_else(|e| format!("<serialize error: {e}>"))
}

/// Wraps the real hooks and records every decision made.
struct RecordingDecisions {
    inner: Arc<dyn DecisionSource>,
    ties: Mutex<VecDeque<Team>>,
    substitutions: Mutex<VecDeque<SubstitutionSelection>>,
}

impl RecordingDecisions {
    fn new(inner: Arc<dyn DecisionSource>) -> Self {
        Self {
            inner,
            ties: Mutex::new(VecDeque::new()),
            substitutions: Mutex::new(VecDeque::new()),
        }
    }

    fn into_replay(self) -> ReplayDecisions {
        ReplayDecisions {
            ties: Mutex::new(self.ties.into_inner().expect("recorder poisoned")),
            substitutions: Mutex::new(self.substitutions.into_inner().expect("recorder poisoned")),
        }
    }
}

impl DecisionSource for RecordingDecisions {
    fn resolve_tie(&self, req: &TieBreakRequest) -> Result<Team, DecisionError> {
        let team = self.inner.resolve_tie(req)?;
        self.ties.lock().expect("recorder poisoned").push_back(team);
        Ok(team)
    }

    fn resolve_substitution(
        &self,
        req: &SubstitutionRequest,
    ) -> Result<SubstitutionSelection, DecisionError> {
        let selection = self.inner.resolve_substitution(req)?;
        self.substitutions
            .lock()
            .expect("recorder poisoned")
            .push_back(selection.clone());
        Ok(selection)
    }
}

/// Replays a recorded decision sequence, in order.
struct ReplayDecisions {
    ties: Mutex<VecDeque<Team>>,
    substitutions: Mutex<VecDeque<SubstitutionSelection>>,
}

impl DecisionSource for ReplayDecisions {
    fn resolve_tie(&self, _req: &TieBreakRequest) -> Result<Team, DecisionError> {
        self.ties
            .lock()
            .expect("replay poisoned")
            .pop_front()
            .ok_or_else(|| DecisionError::Canceled("recorded decisions exhausted".into()))
    }

    fn resolve_substitution(
        &self,
        _req: &SubstitutionRequest,
    ) -> Result<SubstitutionSelection, DecisionError> {
        self.substitutions
            .lock()
            .expect("replay poisoned")
            .pop_front()
            .ok_or_else(|| DecisionError::Canceled("recorded decisions exhausted".into()))
    }
}
