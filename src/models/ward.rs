//! Ward and bed transfer models.
//!
//! Wards hold the physical beds. Each ward's beds are divided between
//! teams, possibly in fractional portions (half or a third of a ward).
//! Bed transfers move whole beds between teams within a ward.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Slot, Team};

/// A hospital ward with per-team bed assignments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ward {
    /// Ward name (unique within the department).
    pub name: String,
    /// Total bed count.
    pub total_beds: u32,
    /// Beds assigned per team. Values may be fractional portions.
    pub beds_by_team: BTreeMap<Team, f64>,
    /// Human-readable portion labels (e.g. "1/2", "1/3") per team.
    pub portion_labels: BTreeMap<Team, String>,
}

/// A single ward-level bed transfer between two teams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedTransfer {
    /// Team releasing the beds.
    pub from: Team,
    /// Team taking the beds.
    pub to: Team,
    /// Ward the beds move within.
    pub ward: String,
    /// Whole beds moved.
    pub num_beds: u32,
    /// Slot the transfer applies to, when the plan is slot-scoped.
    pub slot: Option<Slot>,
}

impl Ward {
    /// Creates an empty ward.
    pub fn new(name: impl Into<String>, total_beds: u32) -> Self {
        Self {
            name: name.into(),
            total_beds,
            beds_by_team: BTreeMap::new(),
            portion_labels: BTreeMap::new(),
        }
    }

    /// Assigns beds in this ward to a team.
    pub fn with_team_beds(mut self, team: Team, beds: f64) -> Self {
        self.beds_by_team.insert(team, beds);
        self
    }

    /// Sets a portion label for a team.
    pub fn with_portion_label(mut self, team: Team, label: impl Into<String>) -> Self {
        self.portion_labels.insert(team, label.into());
        self
    }

    /// Beds this ward holds for a team (0.0 if none).
    pub fn team_beds(&self, team: Team) -> f64 {
        self.beds_by_team.get(&team).copied().unwrap_or(0.0)
    }

    /// Sum of per-team bed assignments.
    pub fn assigned_beds(&self) -> f64 {
        self.beds_by_team.values().sum()
    }
}

impl BedTransfer {
    /// Creates a whole-day bed transfer.
    pub fn new(from: Team, to: Team, ward: impl Into<String>, num_beds: u32) -> Self {
        Self {
            from,
            to,
            ward: ward.into(),
            num_beds,
            slot: None,
        }
    }

    /// Scopes the transfer to a slot.
    pub fn with_slot(mut self, slot: Slot) -> Self {
        self.slot = Some(slot);
        self
    }
}
