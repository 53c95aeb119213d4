//! Staff model.
//!
//! Staff members are the supply side of the daily plan: therapists and
//! aides with a home team, a daily capacity in FTE, and per-day leave or
//! override state. Floating aides are the only staff the engine may
//! redistribute across teams.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Slot, Team, SLOT_FTE};

/// A staff member of the rehabilitation department.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffMember {
    /// Unique staff identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Duty rank.
    pub rank: Rank,
    /// Home team. `None` for department-wide staff.
    pub home_team: Option<Team>,
    /// Whether this aide may be redistributed across teams.
    /// Only meaningful for `Rank::Aide`.
    pub floating: bool,
    /// Daily duty capacity in FTE (1.0 = whole day; supplementary staff
    /// carry a fractional buffer capacity).
    pub capacity: f64,
}

/// Duty rank classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rank {
    /// Senior therapist.
    SeniorTherapist,
    /// Associate therapist.
    AssociateTherapist,
    /// Rotation therapist.
    RotationTherapist,
    /// Patient-care aide.
    Aide,
    /// Unranked worker.
    Worker,
}

impl Rank {
    /// Whether this rank is a therapist rank.
    pub fn is_therapist(&self) -> bool {
        matches!(
            self,
            Rank::SeniorTherapist | Rank::AssociateTherapist | Rank::RotationTherapist
        )
    }
}

/// Leave classification for a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveKind {
    /// Absent the whole day.
    FullDay,
    /// Absent in the morning (slots 1-2).
    HalfDayAm,
    /// Absent in the afternoon (slots 3-4).
    HalfDayPm,
}

impl LeaveKind {
    /// Slots blocked by this leave.
    pub fn blocked_slots(&self) -> &'static [Slot] {
        match self {
            LeaveKind::FullDay => &Slot::ALL,
            LeaveKind::HalfDayAm => &[Slot::Am1, Slot::Am2],
            LeaveKind::HalfDayPm => &[Slot::Pm1, Slot::Pm2],
        }
    }
}

/// A per-day duty override for one staff member.
///
/// This is the canonical in-memory shape. Historical record shapes are
/// normalized into it by [`crate::reconcile::normalize_override`] before
/// the engine sees them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DutyOverride {
    /// Staff member this override applies to.
    pub staff_id: String,
    /// Leave for the day, if any.
    pub leave: Option<LeaveKind>,
    /// Capacity override in FTE. `None` keeps the roster capacity.
    pub capacity: Option<f64>,
    /// Per-slot substitute aide ids (slot → substitute staff id).
    pub substitutes: BTreeMap<Slot, String>,
}

impl StaffMember {
    /// Creates a staff member with full-day capacity.
    pub fn new(id: impl Into<String>, rank: Rank) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            rank,
            home_team: None,
            floating: false,
            capacity: 1.0,
        }
    }

    /// Creates a therapist.
    pub fn therapist(id: impl Into<String>, rank: Rank, team: Team) -> Self {
        Self {
            home_team: Some(team),
            ..Self::new(id, rank)
        }
    }

    /// Creates a floating aide.
    pub fn floating_aide(id: impl Into<String>) -> Self {
        Self {
            floating: true,
            ..Self::new(id, Rank::Aide)
        }
    }

    /// Creates a team-fixed aide.
    pub fn team_aide(id: impl Into<String>, team: Team) -> Self {
        Self {
            home_team: Some(team),
            ..Self::new(id, Rank::Aide)
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the home team.
    pub fn with_home_team(mut self, team: Team) -> Self {
        self.home_team = Some(team);
        self
    }

    /// Sets the daily capacity in FTE.
    pub fn with_capacity(mut self, capacity: f64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Whether this staff member is a floating aide.
    pub fn is_floating_aide(&self) -> bool {
        self.rank == Rank::Aide && self.floating
    }
}

impl DutyOverride {
    /// Creates an empty override for a staff member.
    pub fn for_staff(staff_id: impl Into<String>) -> Self {
        Self {
            staff_id: staff_id.into(),
            ..Self::default()
        }
    }

    /// Sets the leave kind.
    pub fn with_leave(mut self, leave: LeaveKind) -> Self {
        self.leave = Some(leave);
        self
    }

    /// Sets a capacity override.
    pub fn with_capacity(mut self, capacity: f64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Records a substitute for one slot.
    pub fn with_substitute(mut self, slot: Slot, substitute_id: impl Into<String>) -> Self {
        self.substitutes.insert(slot, substitute_id.into());
        self
    }

    /// Effective capacity for the day given a roster capacity.
    ///
    /// Leave subtracts the blocked slots from whichever capacity applies.
    pub fn effective_capacity(&self, roster_capacity: f64) -> f64 {
        let base = self.capacity.unwrap_or(roster_capacity);
        let blocked = self
            .leave
            .map(|l| l.blocked_slots().len() as f64 * SLOT_FTE)
            .unwrap_or(0.0);
        (base - blocked).max(0.0)
    }
}
