//! Daily staffing allocation for hospital rehabilitation wards.
//!
//! Turns a roster with fractional duty capacities (FTE) into concrete
//! team/slot assignments at quarter-day granularity, and per-team bed
//! surplus/deficit into concrete ward-to-ward bed transfers. Decisions a
//! human must make — tie-breaks between equally-needy teams and
//! substitutions for absent aides — are modeled as explicit suspension
//! points, optionally bridged across a worker thread.
//!
//! # Modules
//!
//! - **`models`**: Domain types — `Team`, `Slot`, `StaffMember`,
//!   `Allocation`, `Ward`, `BedTransfer`, `SpecialProgram`,
//!   `AidePreference`
//! - **`rounding`**: Quarter-unit rounding and sum-preserving integer
//!   rounding
//! - **`reservation`**: Preference-based (aide, slot) reservation
//!   resolver
//! - **`beds`**: Greedy ward-level bed transfer optimizer
//! - **`engine`**: Quarter-slot allocation engine with tie-break and
//!   substitution suspension points
//! - **`adapter`**: Local/worker execution with a correlated
//!   request/response callback bridge
//! - **`reconcile`**: Override normalization, therapist rebuild, bed
//!   relief derivation, snapshot cache
//! - **`validation`**: Input integrity checks (duplicate IDs, quantity
//!   ranges, reservation conflicts)
//!
//! # Determinism
//!
//! Given identical inputs and an identical decision sequence, every
//! component produces identical output: iteration follows canonical team
//! order, ward name order, and roster order, with pending need tracked in
//! exact quarter units.
//!
//! # Example
//!
//! The daily pipeline: rebuild therapist allocations, derive bed relief
//! from the resulting headcount, and plan the transfers.
//!
//! ```
//! use rehab_roster::beds::plan_bed_transfers;
//! use rehab_roster::models::{Rank, StaffMember, Team, Ward};
//! use rehab_roster::reconcile::{
//!     rebuild_therapist_allocations, team_bed_relief, therapist_fte_by_team,
//! };
//!
//! let roster = vec![
//!     StaffMember::therapist("T1", Rank::SeniorTherapist, Team::A),
//!     StaffMember::therapist("T2", Rank::AssociateTherapist, Team::B),
//! ];
//! let wards = vec![Ward::new("West-3", 20)
//!     .with_team_beds(Team::A, 12.0)
//!     .with_team_beds(Team::B, 8.0)];
//!
//! let therapists = rebuild_therapist_allocations(&roster, &[]).unwrap();
//! let relief = team_bed_relief(&therapist_fte_by_team(&therapists), &wards);
//! let plan = plan_bed_transfers(&relief, &wards);
//!
//! // Equal headcount, unequal beds: two beds move from A to B.
//! assert_eq!(plan.transfers[0].num_beds, 2);
//! assert_eq!(plan.transfers[0].from, Team::A);
//! assert_eq!(plan.transfers[0].to, Team::B);
//! ```

pub mod adapter;
pub mod beds;
pub mod engine;
pub mod models;
pub mod reconcile;
pub mod reservation;
pub mod rounding;
pub mod validation;
