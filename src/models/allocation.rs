//! Allocation model.
//!
//! An allocation is one staff member's share of the daily plan: which team
//! owns each of their four quarter-day slots, how much FTE remains, and
//! the leave state the plan was built against. Therapist and aide
//! allocations are structurally identical.
//!
//! Slot exclusivity is schema-level: each slot field is a single nullable
//! team, so a slot can never be owned twice.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{LeaveKind, Slot, Team, SLOT_FTE};

/// A staff member's computed allocation for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// Staff member this allocation belongs to.
    pub staff_id: String,
    /// Home team the staff member reports to. `None` for floating staff.
    pub home_team: Option<Team>,
    /// Duty FTE for the day (capacity after overrides).
    pub fte: f64,
    /// FTE not yet committed to any team.
    pub remaining_fte: f64,
    /// Owning team per quarter-day slot, indexed by [`Slot::index`].
    pub slots: [Option<Team>; 4],
    /// Leave the allocation was built against.
    pub leave: Option<LeaveKind>,
    /// Ids of special programs that reserved slots on this allocation.
    pub program_ids: Vec<String>,
}

/// Error committing a slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    /// The slot already belongs to a team.
    #[error("slot {slot} of {staff_id} already owned by team {owner}")]
    AlreadyOwned {
        staff_id: String,
        slot: Slot,
        owner: Team,
    },
    /// Committing the slot would exceed the staff member's remaining FTE.
    #[error("no remaining capacity on {staff_id} for slot {slot}")]
    NoCapacity { staff_id: String, slot: Slot },
}

impl Allocation {
    /// Creates an uncommitted allocation with the given duty FTE.
    pub fn new(staff_id: impl Into<String>, fte: f64) -> Self {
        Self {
            staff_id: staff_id.into(),
            home_team: None,
            fte,
            remaining_fte: fte,
            slots: [None; 4],
            leave: None,
            program_ids: Vec::new(),
        }
    }

    /// Sets the home team.
    pub fn with_home_team(mut self, team: Team) -> Self {
        self.home_team = Some(team);
        self
    }

    /// Sets the leave state.
    pub fn with_leave(mut self, leave: LeaveKind) -> Self {
        self.leave = Some(leave);
        self
    }

    /// Records a program reservation id.
    pub fn with_program(mut self, program_id: impl Into<String>) -> Self {
        self.program_ids.push(program_id.into());
        self
    }

    /// Commits one slot to a team, consuming 0.25 FTE.
    ///
    /// Fails if the slot is already owned or remaining FTE is exhausted.
    pub fn assign_slot(&mut self, slot: Slot, team: Team) -> Result<(), SlotError> {
        if let Some(owner) = self.slots[slot.index()] {
            return Err(SlotError::AlreadyOwned {
                staff_id: self.staff_id.clone(),
                slot,
                owner,
            });
        }
        if self.remaining_fte + 1e-9 < SLOT_FTE {
            return Err(SlotError::NoCapacity {
                staff_id: self.staff_id.clone(),
                slot,
            });
        }
        self.slots[slot.index()] = Some(team);
        self.remaining_fte -= SLOT_FTE;
        Ok(())
    }

    /// Releases a slot, refunding 0.25 FTE. No-op if the slot is free.
    pub fn release_slot(&mut self, slot: Slot) {
        if self.slots[slot.index()].take().is_some() {
            self.remaining_fte += SLOT_FTE;
        }
    }

    /// The team owning a slot, if any.
    #[inline]
    pub fn slot_owner(&self, slot: Slot) -> Option<Team> {
        self.slots[slot.index()]
    }

    /// Slots not owned by any team and not blocked by leave.
    pub fn free_slots(&self) -> Vec<Slot> {
        let blocked: &[Slot] = self.leave.map(|l| l.blocked_slots()).unwrap_or(&[]);
        Slot::ALL
            .into_iter()
            .filter(|s| self.slots[s.index()].is_none() && !blocked.contains(s))
            .collect()
    }

    /// Number of committed slots.
    pub fn assigned_quarters(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// FTE committed across all slots.
    pub fn assigned_fte(&self) -> f64 {
        self.assigned_quarters() as f64 * SLOT_FTE
    }

    /// Number of slots committed to a specific team.
    pub fn team_quarters(&self, team: Team) -> usize {
        self.slots.iter().filter(|s| **s == Some(team)).count()
    }

    /// Whether any slot with remaining capacity can still be committed.
    pub fn has_open_capacity(&self) -> bool {
        self.remaining_fte + 1e-9 >= SLOT_FTE && !self.free_slots().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_and_release() {
        let mut a = Allocation::new("P1", 1.0);
        a.assign_slot(Slot::Am1, Team::A).unwrap();
        a.assign_slot(Slot::Pm2, Team::B).unwrap();

        assert_eq!(a.slot_owner(Slot::Am1), Some(Team::A));
        assert_eq!(a.assigned_quarters(), 2);
        assert!((a.remaining_fte - 0.5).abs() < 1e-12);
        assert_eq!(a.team_quarters(Team::A), 1);

        a.release_slot(Slot::Am1);
        assert_eq!(a.slot_owner(Slot::Am1), None);
        assert!((a.remaining_fte - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_slot_exclusivity() {
        let mut a = Allocation::new("P1", 1.0);
        a.assign_slot(Slot::Am1, Team::A).unwrap();
        let err = a.assign_slot(Slot::Am1, Team::B).unwrap_err();
        assert_eq!(
            err,
            SlotError::AlreadyOwned {
                staff_id: "P1".into(),
                slot: Slot::Am1,
                owner: Team::A,
            }
        );
        // Still owned by the original team.
        assert_eq!(a.slot_owner(Slot::Am1), Some(Team::A));
    }

    #[test]
    fn test_capacity_exhaustion() {
        let mut a = Allocation::new("P1", 0.25);
        a.assign_slot(Slot::Am1, Team::A).unwrap();
        let err = a.assign_slot(Slot::Am2, Team::A).unwrap_err();
        assert!(matches!(err, SlotError::NoCapacity { .. }));
        assert_eq!(a.assigned_quarters(), 1);
    }

    #[test]
    fn test_free_slots_respect_leave() {
        let a = Allocation::new("P1", 0.5).with_leave(LeaveKind::HalfDayAm);
        assert_eq!(a.free_slots(), vec![Slot::Pm1, Slot::Pm2]);

        let mut b = Allocation::new("P2", 1.0);
        b.assign_slot(Slot::Am1, Team::C).unwrap();
        assert_eq!(b.free_slots(), vec![Slot::Am2, Slot::Pm1, Slot::Pm2]);
    }

    #[test]
    fn test_assigned_never_exceeds_capacity() {
        let mut a = Allocation::new("P1", 0.75);
        let mut committed = 0;
        for slot in Slot::ALL {
            if a.assign_slot(slot, Team::D).is_ok() {
                committed += 1;
            }
        }
        assert_eq!(committed, 3);
        assert!(a.assigned_fte() <= a.fte + 1e-12);
    }
}
