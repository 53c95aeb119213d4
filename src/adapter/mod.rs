//! Execution adapter and worker bridge.
//!
//! Wraps the allocation engine so runs execute inline, on a worker
//! thread, or on both with shadow comparison. The worker boundary is
//! message-only: engine inputs are owned copies, decision hooks stay on
//! the caller side, and each suspension crosses as a correlated
//! request/response pair keyed by `(run id, callback id)`.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use rehab_roster::adapter::{ExecutionMode, Executor};
//! use rehab_roster::engine::{EngineInput, FirstTied};
//! use rehab_roster::models::{Allocation, Team};
//!
//! let executor = Executor::new(ExecutionMode::Local);
//! let input = EngineInput {
//!     aides: vec![Allocation::new("F1", 1.0)],
//!     pending: [(Team::A, 0.5)].into_iter().collect(),
//!     programs: Vec::new(),
//!     reservations: Vec::new(),
//! };
//! let output = executor.execute(&input, Arc::new(FirstTied)).unwrap();
//! assert!(output.errors.is_empty());
//! ```

mod executor;
mod protocol;
mod worker;

pub use executor::{AdapterError, ExecutionMode, Executor};
pub use protocol::{CallbackId, CallbackReply, RunId, WorkerEvent, WorkerRequest};
