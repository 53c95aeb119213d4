//! Preference reservation resolver.
//!
//! Teams may configure a preferred aide (up to two, in priority order) and
//! a preferred slot for the daily plan. The resolver narrows each team's
//! preference to the feasible candidate aides for that slot and surfaces
//! cross-team conflicts on the same (aide, slot) pair. It never commits an
//! assignment — the caller decides which single candidate to take.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{AidePreference, Allocation, LeaveKind, Slot, Team, SLOT_FTE};
use crate::rounding::round_to_quarter;

/// A provisional reservation of candidate aides for one team's slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotReservation {
    /// Team the reservation is for.
    pub team: Team,
    /// The team's preferred slot.
    pub slot: Slot,
    /// Feasible candidate aide ids, in preference priority order.
    pub candidates: Vec<String>,
}

/// Resolver output: per-team reservations plus conflict visibility.
#[derive(Debug, Clone, Default)]
pub struct ReservationOutcome {
    /// One reservation per team with a nonempty candidate set.
    pub reservations: Vec<SlotReservation>,
    /// Every reserved (aide, slot) pair and the teams holding it.
    /// An entry with more than one team is a cross-team conflict.
    pub claims: BTreeMap<(String, Slot), Vec<Team>>,
}

impl ReservationOutcome {
    /// The reservation for a team, if any.
    pub fn for_team(&self, team: Team) -> Option<&SlotReservation> {
        self.reservations.iter().find(|r| r.team == team)
    }

    /// (aide, slot) pairs claimed by more than one team.
    pub fn conflicts(&self) -> impl Iterator<Item = (&(String, Slot), &Vec<Team>)> {
        self.claims.iter().filter(|(_, teams)| teams.len() > 1)
    }
}

/// Resolves team preferences into provisional (aide, slot) reservations.
///
/// Per team: skipped entirely when no preferred aide or slot is
/// configured, or when the team's pending need (rounded to the nearest
/// quarter) is not positive. Each preferred aide is skipped when off duty,
/// when the preferred slot is already owned on the aide's committed
/// allocation, or when a substitution reservation already consumes the
/// pair. At most the first two preferred aides are considered.
pub fn resolve_reservations(
    preferences: &[AidePreference],
    pending: &BTreeMap<Team, f64>,
    floating: &[Allocation],
    committed: &[Allocation],
    substitutions: &BTreeSet<(String, Slot)>,
) -> ReservationOutcome {
    let mut outcome = ReservationOutcome::default();

    for pref in preferences {
        let Some(slot) = pref.preferred_slot else {
            continue;
        };
        if pref.preferred_aides.is_empty() {
            continue;
        }
        let need = round_to_quarter(pending.get(&pref.team).copied().unwrap_or(0.0));
        if need <= 0.0 {
            continue;
        }

        let mut candidates = Vec::new();
        for aide_id in pref.preferred_aides.iter().take(2) {
            if off_duty(aide_id, slot, floating) {
                continue;
            }
            if slot_owned(aide_id, slot, committed) {
                continue;
            }
            if substitutions.contains(&(aide_id.clone(), slot)) {
                continue;
            }
            candidates.push(aide_id.clone());
            outcome
                .claims
                .entry((aide_id.clone(), slot))
                .or_default()
                .push(pref.team);
        }

        if !candidates.is_empty() {
            outcome.reservations.push(SlotReservation {
                team: pref.team,
                slot,
                candidates,
            });
        }
    }

    outcome
}

/// Whether the aide cannot serve the slot: absent from the floating pool,
/// on leave for the whole day or the slot's half, or out of capacity.
fn off_duty(aide_id: &str, slot: Slot, floating: &[Allocation]) -> bool {
    let Some(alloc) = floating.iter().find(|a| a.staff_id == aide_id) else {
        return true;
    };
    if alloc.remaining_fte + 1e-9 < SLOT_FTE {
        return true;
    }
    match alloc.leave {
        Some(LeaveKind::FullDay) => true,
        Some(leave) => leave.blocked_slots().contains(&slot),
        None => false,
    }
}

/// Whether any team already owns the slot on the aide's committed allocation.
fn slot_owned(aide_id: &str, slot: Slot, committed: &[Allocation]) -> bool {
    committed
        .iter()
        .filter(|a| a.staff_id == aide_id)
        .any(|a| a.slot_owner(slot).is_some())
}
