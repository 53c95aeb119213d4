//! Aide allocation engine.
//!
//! The greedy quarter-slot assignment algorithm with its two
//! human-decision suspension points (team tie-break and aide
//! substitution), plus the per-team summary counters computed from a
//! finished run.
//!
//! # Usage
//!
//! ```
//! use rehab_roster::engine::{AllocationEngine, EngineInput, FirstTied};
//! use rehab_roster::models::{Allocation, Team};
//!
//! let input = EngineInput {
//!     aides: vec![Allocation::new("F1", 1.0)],
//!     pending: [(Team::A, 0.5)].into_iter().collect(),
//!     programs: Vec::new(),
//!     reservations: Vec::new(),
//! };
//! let output = AllocationEngine::new(&FirstTied).run(&input).unwrap();
//! assert_eq!(output.pending[&Team::A], 0.0);
//! ```

mod decision;
mod run;
mod summary;

pub use decision::{
    DecisionError, DecisionSource, FirstTied, NoHooks, SubstitutionNeed, SubstitutionRequest,
    SubstitutionSelection, TieBreakRequest,
};
pub use run::{AllocationEngine, EngineError, EngineInput, EngineOutput, SoftError};
pub use summary::AllocationSummary;
