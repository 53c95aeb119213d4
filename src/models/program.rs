//! Special program and preference configuration.
//!
//! Both are external master data consumed read-only by the core: special
//! programs pin specific (staff, slot) pairs before general distribution,
//! and aide preferences steer the reservation resolver toward a team's
//! preferred aide and slot.

use serde::{Deserialize, Serialize};

use super::{Slot, Team};

/// A special program with fixed slot requirements.
///
/// Reserved pairs are honored before general distribution and excluded
/// from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialProgram {
    /// Program identifier.
    pub id: String,
    /// Team the program runs for.
    pub team: Team,
    /// Pinned (staff id, slot) pairs.
    pub reserved: Vec<(String, Slot)>,
}

/// A team's aide preference for the daily plan.
///
/// Up to two preferred aides in priority order, and one preferred slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AidePreference {
    /// Team the preference belongs to.
    pub team: Team,
    /// Preferred slot, if configured.
    pub preferred_slot: Option<Slot>,
    /// Preferred aide ids in priority order (at most two are considered).
    pub preferred_aides: Vec<String>,
}

impl SpecialProgram {
    /// Creates a program with no reservations.
    pub fn new(id: impl Into<String>, team: Team) -> Self {
        Self {
            id: id.into(),
            team,
            reserved: Vec::new(),
        }
    }

    /// Pins a (staff, slot) pair.
    pub fn with_reserved(mut self, staff_id: impl Into<String>, slot: Slot) -> Self {
        self.reserved.push((staff_id.into(), slot));
        self
    }
}

impl AidePreference {
    /// Creates an empty preference for a team.
    pub fn new(team: Team) -> Self {
        Self {
            team,
            preferred_slot: None,
            preferred_aides: Vec::new(),
        }
    }

    /// Sets the preferred slot.
    pub fn with_slot(mut self, slot: Slot) -> Self {
        self.preferred_slot = Some(slot);
        self
    }

    /// Appends a preferred aide (priority order).
    pub fn with_aide(mut self, aide_id: impl Into<String>) -> Self {
        self.preferred_aides.push(aide_id.into());
        self
    }

    /// Whether both a slot and at least one aide are configured.
    pub fn is_actionable(&self) -> bool {
        self.preferred_slot.is_some() && !self.preferred_aides.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_builder() {
        let p = SpecialProgram::new("hydro", Team::C)
            .with_reserved("P1", Slot::Am1)
            .with_reserved("P2", Slot::Am2);
        assert_eq!(p.reserved.len(), 2);
        assert_eq!(p.team, Team::C);
    }

    #[test]
    fn test_preference_actionable() {
        let empty = AidePreference::new(Team::A);
        assert!(!empty.is_actionable());

        let slot_only = AidePreference::new(Team::A).with_slot(Slot::Pm1);
        assert!(!slot_only.is_actionable());

        let full = AidePreference::new(Team::A)
            .with_slot(Slot::Pm1)
            .with_aide("P1")
            .with_aide("P2");
        assert!(full.is_actionable());
    }
}
