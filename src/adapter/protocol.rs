//! Worker bridge message protocol.
//!
//! Everything crossing the worker boundary is an owned, serializable
//! message — no shared mutable state. Every message carries the run id;
//! decision callbacks additionally carry a per-suspension callback id, and
//! responses are matched on the `(run id, callback id)` pair.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::engine::{
    EngineInput, EngineOutput, SubstitutionRequest, SubstitutionSelection, TieBreakRequest,
};
use crate::models::Team;

/// Identifier of one engine run dispatched for execution.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RunId(pub u64);

/// Identifier of one suspension within a run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CallbackId(pub u64);

impl RunId {
    /// Allocates a process-unique run id.
    pub fn next() -> RunId {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        RunId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

impl std::fmt::Display for CallbackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cb-{}", self.0)
    }
}

/// Caller → worker: start a run.
///
/// Decision hooks are not serializable and never cross the boundary; the
/// caller retains them and services callback events instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkerRequest {
    /// Execute the engine for the given input.
    Run { run_id: RunId, input: EngineInput },
}

/// Worker → caller: run completion or a suspension callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkerEvent {
    /// The run finished.
    Result { run_id: RunId, output: EngineOutput },
    /// The run failed.
    Error { run_id: RunId, message: String },
    /// The run is suspended on a tie-break decision.
    TieBreakRequest {
        run_id: RunId,
        callback_id: CallbackId,
        request: TieBreakRequest,
    },
    /// The run is suspended on a substitution decision.
    SubstitutionRequest {
        run_id: RunId,
        callback_id: CallbackId,
        request: SubstitutionRequest,
    },
}

/// Caller → worker: answer to a suspension callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CallbackReply {
    /// Tie-break decision.
    TieBreakResponse {
        run_id: RunId,
        callback_id: CallbackId,
        team: Team,
    },
    /// Tie-break decision could not be produced.
    TieBreakError {
        run_id: RunId,
        callback_id: CallbackId,
        message: String,
    },
    /// Substitution decision.
    SubstitutionResponse {
        run_id: RunId,
        callback_id: CallbackId,
        selection: SubstitutionSelection,
    },
    /// Substitution decision could not be produced.
    SubstitutionError {
        run_id: RunId,
        callback_id: CallbackId,
        message: String,
    },
}

impl CallbackReply {
    /// The `(run, callback)` pair this reply answers.
    pub fn correlation(&self) -> (RunId, CallbackId) {
        match self {
            CallbackReply::TieBreakResponse {
                run_id,
                callback_id,
                ..
            }
            | CallbackReply::TieBreakError {
                run_id,
                callback_id,
                ..
            }
            | CallbackReply::SubstitutionResponse {
                run_id,
                callback_id,
                ..
            }
            | CallbackReply::SubstitutionError {
                run_id,
                callback_id,
                ..
            } => (*run_id, *callback_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_ids_unique() {
        let a = RunId::next();
        let b = RunId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wire_tags() {
        let run = WorkerRequest::Run {
            run_id: RunId(7),
            input: EngineInput {
                aides: Vec::new(),
                pending: Default::default(),
                programs: Vec::new(),
                reservations: Vec::new(),
            },
        };
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["type"], "run");

        let event = WorkerEvent::TieBreakRequest {
            run_id: RunId(7),
            callback_id: CallbackId(1),
            request: TieBreakRequest {
                tied_teams: vec![Team::A, Team::B],
                pending_fte: 0.5,
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "tie-break-request");

        let reply = CallbackReply::SubstitutionError {
            run_id: RunId(7),
            callback_id: CallbackId(2),
            message: "no hook".into(),
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["type"], "substitution-error");
    }

    #[test]
    fn test_event_roundtrip() {
        let event = WorkerEvent::Error {
            run_id: RunId(3),
            message: "boom".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: WorkerEvent = serde_json::from_str(&json).unwrap();
        match back {
            WorkerEvent::Error { run_id, message } => {
                assert_eq!(run_id, RunId(3));
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_correlation_pair() {
        let reply = CallbackReply::TieBreakResponse {
            run_id: RunId(9),
            callback_id: CallbackId(4),
            team: Team::C,
        };
        assert_eq!(reply.correlation(), (RunId(9), CallbackId(4)));
    }
}
