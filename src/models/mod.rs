//! Staffing domain models.
//!
//! Core data types for the daily allocation plan: teams, quarter-day
//! slots, staff, allocations, wards, and the read-only program/preference
//! configuration.
//!
//! All plan artifacts (`Allocation`, `BedTransfer`) are computed fresh for
//! a calendar day from master data plus per-day overrides; they are
//! replaced wholesale on each engine rerun, never mutated in place.

mod allocation;
mod program;
mod slot;
mod staff;
mod team;
mod ward;

pub use allocation::{Allocation, SlotError};
pub use program::{AidePreference, SpecialProgram};
pub use slot::{DayHalf, Slot, SLOTS_PER_DAY, SLOT_FTE};
pub use staff::{DutyOverride, LeaveKind, Rank, StaffMember};
pub use team::Team;
pub use ward::{BedTransfer, Ward};
