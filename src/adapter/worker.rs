//! Allocation worker thread.
//!
//! Runs engine computations off the caller's thread. The worker receives
//! `run` requests, executes the engine, and bridges its two suspension
//! points back to the caller as correlated request/response messages. One
//! run executes at a time; within a run, suspensions are strictly serial.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use super::protocol::{CallbackId, CallbackReply, RunId, WorkerEvent, WorkerRequest};
use crate::engine::{
    AllocationEngine, DecisionError, DecisionSource, SubstitutionRequest, SubstitutionSelection,
    TieBreakRequest,
};
use crate::models::Team;

/// Channel endpoints the caller keeps after spawning a worker.
pub(crate) struct WorkerChannels {
    /// Run requests into the worker.
    pub requests: flume::Sender<WorkerRequest>,
    /// Completion and callback events out of the worker.
    pub events: flume::Receiver<WorkerEvent>,
    /// Decision replies back into the worker.
    pub replies: flume::Sender<CallbackReply>,
}

/// Spawns the worker thread and returns the caller's channel endpoints.
pub(crate) fn spawn() -> std::io::Result<WorkerChannels> {
    let (request_tx, request_rx) = flume::unbounded::<WorkerRequest>();
    let (event_tx, event_rx) = flume::unbounded::<WorkerEvent>();
    let (reply_tx, reply_rx) = flume::unbounded::<CallbackReply>();

    std::thread::Builder::new()
        .name("alloc-worker".into())
        .spawn(move || worker_main(request_rx, event_tx, reply_rx))?;

    Ok(WorkerChannels {
        requests: request_tx,
        events: event_rx,
        replies: reply_tx,
    })
}

fn worker_main(
    requests: flume::Receiver<WorkerRequest>,
    events: flume::Sender<WorkerEvent>,
    replies: flume::Receiver<CallbackReply>,
) {
    while let Ok(request) = requests.recv() {
        match request {
            WorkerRequest::Run { run_id, input } => {
                debug!(%run_id, "worker run started");
                let bridge = BridgeDecisionSource {
                    run_id,
                    next_callback: AtomicU64::new(1),
                    events: events.clone(),
                    replies: replies.clone(),
                };
                let event = match AllocationEngine::new(&bridge).run(&input) {
                    Ok(output) => WorkerEvent::Result { run_id, output },
                    Err(e) => WorkerEvent::Error {
                        run_id,
                        message: e.to_string(),
                    },
                };
                if events.send(event).is_err() {
                    // Caller went away; nothing left to serve.
                    return;
                }
            }
        }
    }
}

/// Decision source that suspends the engine across the thread boundary.
///
/// Each suspension gets a fresh callback id; the engine blocks until a
/// reply bearing the exact `(run, callback)` pair arrives. Replies with a
/// stale or unknown pair are ignored.
struct BridgeDecisionSource {
    run_id: RunId,
    next_callback: AtomicU64,
    events: flume::Sender<WorkerEvent>,
    replies: flume::Receiver<CallbackReply>,
}

impl BridgeDecisionSource {
    fn fresh_callback(&self) -> CallbackId {
        CallbackId(self.next_callback.fetch_add(1, Ordering::Relaxed))
    }

    fn await_reply(&self, callback_id: CallbackId) -> Result<CallbackReply, DecisionError> {
        loop {
            let reply = self
                .replies
                .recv()
                .map_err(|_| DecisionError::Canceled("caller disconnected".into()))?;
            if reply.correlation() == (self.run_id, callback_id) {
                return Ok(reply);
            }
            warn!(
                run = %self.run_id,
                callback = %callback_id,
                stale = ?reply.correlation(),
                "ignoring reply with stale or unknown correlation"
            );
        }
    }
}

impl DecisionSource for BridgeDecisionSource {
    fn resolve_tie(&self, req: &TieBreakRequest) -> Result<Team, DecisionError> {
        let callback_id = self.fresh_callback();
        self.events
            .send(WorkerEvent::TieBreakRequest {
                run_id: self.run_id,
                callback_id,
                request: req.clone(),
            })
            .map_err(|_| DecisionError::Canceled("caller disconnected".into()))?;

        match self.await_reply(callback_id)? {
            CallbackReply::TieBreakResponse { team, .. } => Ok(team),
            CallbackReply::TieBreakError { message, .. } => Err(DecisionError::Canceled(message)),
            other => Err(DecisionError::InvalidSelection(format!(
                "mismatched reply kind for tie-break: {:?}",
                other.correlation()
            ))),
        }
    }

    fn resolve_substitution(
        &self,
        req: &SubstitutionRequest,
    ) -> Result<SubstitutionSelection, DecisionError> {
        let callback_id = self.fresh_callback();
        self.events
            .send(WorkerEvent::SubstitutionRequest {
                run_id: self.run_id,
                callback_id,
                request: req.clone(),
            })
            .map_err(|_| DecisionError::Canceled("caller disconnected".into()))?;

        match self.await_reply(callback_id)? {
            CallbackReply::SubstitutionResponse { selection, .. } => Ok(selection),
            CallbackReply::SubstitutionError { message, .. } => {
                Err(DecisionError::Canceled(message))
            }
            other => Err(DecisionError::InvalidSelection(format!(
                "mismatched reply kind for substitution: {:?}",
                other.correlation()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineInput;
    use crate::models::Allocation;

    fn tie_input() -> EngineInput {
        EngineInput {
            aides: vec![Allocation::new("F1", 0.5)],
            pending: [(Team::A, 0.5), (Team::B, 0.5)].into_iter().collect(),
            programs: Vec::new(),
            reservations: Vec::new(),
        }
    }

    #[test]
    fn test_run_bridges_tie_break() {
        let channels = spawn().unwrap();
        let run_id = RunId::next();
        channels
            .requests
            .send(WorkerRequest::Run {
                run_id,
                input: tie_input(),
            })
            .unwrap();

        let event = channels.events.recv().unwrap();
        let WorkerEvent::TieBreakRequest {
            run_id: seen_run,
            callback_id,
            request,
        } = event
        else {
            panic!("expected tie-break request, got {event:?}");
        };
        assert_eq!(seen_run, run_id);
        assert_eq!(request.tied_teams, vec![Team::A, Team::B]);

        channels
            .replies
            .send(CallbackReply::TieBreakResponse {
                run_id,
                callback_id,
                team: Team::B,
            })
            .unwrap();

        let event = channels.events.recv().unwrap();
        let WorkerEvent::Result { output, .. } = event else {
            panic!("expected result, got {event:?}");
        };
        assert_eq!(output.allocations[0].team_quarters(Team::B), 2);
    }

    #[test]
    fn test_stale_replies_ignored() {
        let channels = spawn().unwrap();
        let run_id = RunId::next();
        channels
            .requests
            .send(WorkerRequest::Run {
                run_id,
                input: tie_input(),
            })
            .unwrap();

        let WorkerEvent::TieBreakRequest { callback_id, .. } = channels.events.recv().unwrap()
        else {
            panic!("expected tie-break request");
        };

        // Unknown run id, then stale callback id, then the real reply.
        channels
            .replies
            .send(CallbackReply::TieBreakResponse {
                run_id: RunId(u64::MAX),
                callback_id,
                team: Team::A,
            })
            .unwrap();
        channels
            .replies
            .send(CallbackReply::TieBreakResponse {
                run_id,
                callback_id: CallbackId(u64::MAX),
                team: Team::A,
            })
            .unwrap();
        channels
            .replies
            .send(CallbackReply::TieBreakResponse {
                run_id,
                callback_id,
                team: Team::B,
            })
            .unwrap();

        let WorkerEvent::Result { output, .. } = channels.events.recv().unwrap() else {
            panic!("expected result");
        };
        // Only the correctly-correlated reply took effect.
        assert_eq!(output.allocations[0].team_quarters(Team::B), 2);
        assert_eq!(output.allocations[0].team_quarters(Team::A), 0);
    }

    #[test]
    fn test_error_reply_fails_run() {
        let channels = spawn().unwrap();
        let run_id = RunId::next();
        channels
            .requests
            .send(WorkerRequest::Run {
                run_id,
                input: tie_input(),
            })
            .unwrap();

        let WorkerEvent::TieBreakRequest { callback_id, .. } = channels.events.recv().unwrap()
        else {
            panic!("expected tie-break request");
        };
        channels
            .replies
            .send(CallbackReply::TieBreakError {
                run_id,
                callback_id,
                message: "no decision hook supplied".into(),
            })
            .unwrap();

        let WorkerEvent::Error { message, .. } = channels.events.recv().unwrap() else {
            panic!("expected error event");
        };
        assert!(message.contains("no decision hook supplied"));
    }
}
