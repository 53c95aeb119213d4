//! Greedy aide allocation engine.
//!
//! # Algorithm
//!
//! One run per calendar day, over quarter-day slots:
//!
//! 1. Honor special-program reservations (pinned slots, excluded from
//!    general distribution).
//! 2. Detect substitution needs: team-fixed aides short of slots because
//!    of leave, with floating substitutes available. Suspend once on the
//!    substitution hook and apply the returned covers.
//! 3. Scan for the team with the largest pending need. A unique maximum
//!    is served directly; a tie suspends on the tie-break hook. The
//!    selected team is served one 0.25 slot at a time until its need is
//!    met or no eligible aide remains, then the scan repeats.
//! 4. Done when every need is met or nothing can serve the rest. Teams
//!    left short become soft errors, never failures.
//!
//! Pending need is tracked in integer quarter units internally, so tie
//! detection and determinism are exact. Given the same input and the same
//! decision sequence, two runs produce identical allocation lists.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, trace};

use super::decision::{
    DecisionError, DecisionSource, SubstitutionNeed, SubstitutionRequest, TieBreakRequest,
};
use crate::models::{Allocation, Slot, SlotError, SpecialProgram, Team, SLOT_FTE};
use crate::reservation::SlotReservation;
use crate::rounding::round_to_quarter;

/// Input to one engine run.
///
/// Aide allocations arrive day-fresh with capacity and leave applied and
/// any previously committed slots already owned, so the engine never
/// re-assigns an owned slot. Floating aides are those without a home
/// team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineInput {
    /// Aide allocations for the day (floating and team-fixed).
    pub aides: Vec<Allocation>,
    /// Pending FTE need per team.
    pub pending: BTreeMap<Team, f64>,
    /// Special programs with pinned slots.
    pub programs: Vec<SpecialProgram>,
    /// Preference reservations from the reservation resolver.
    pub reservations: Vec<SlotReservation>,
}

/// Result of one engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineOutput {
    /// Every aide allocation holding at least one committed slot.
    pub allocations: Vec<Allocation>,
    /// Aides serving each team (distinct staff with a slot for the team).
    pub aides_on_duty: BTreeMap<Team, u32>,
    /// Remaining pending FTE per team.
    pub pending: BTreeMap<Team, f64>,
    /// Recoverable problems encountered during the run.
    pub errors: Vec<SoftError>,
}

/// Recoverable, reportable problems; none of these abort a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SoftError {
    /// A team's need could not be fully met.
    UnmetNeed { team: Team, pending_fte: f64 },
    /// A program's pinned slot could not be honored.
    ProgramUnfilled {
        program_id: String,
        staff_id: String,
        slot: Slot,
        reason: String,
    },
    /// A substitution cover could not be applied.
    SubstitutionUnapplied {
        aide_id: String,
        substitute_id: String,
        slot: Slot,
        reason: String,
    },
}

/// Unrecoverable engine failure.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A decision hook failed or returned an invalid decision.
    #[error("decision failed: {0}")]
    Decision(#[from] DecisionError),
    /// Internal slot accounting violation.
    #[error("slot commit failed: {0}")]
    Slot(#[from] SlotError),
}

/// The greedy quarter-slot allocation engine.
pub struct AllocationEngine<'a> {
    decisions: &'a dyn DecisionSource,
}

impl<'a> AllocationEngine<'a> {
    /// Creates an engine with the given decision source.
    pub fn new(decisions: &'a dyn DecisionSource) -> Self {
        Self { decisions }
    }

    /// Runs the full allocation for one day.
    pub fn run(&self, input: &EngineInput) -> Result<EngineOutput, EngineError> {
        let mut aides = input.aides.clone();
        let mut errors = Vec::new();

        // Pending need in quarter units; rounded to the nearest quarter
        // the same way the reservation resolver sees it.
        let mut pending_q: BTreeMap<Team, i64> = input
            .pending
            .iter()
            .map(|(&team, &fte)| (team, (round_to_quarter(fte) * 4.0).round() as i64))
            .collect();

        self.apply_programs(&mut aides, &input.programs, &mut errors);
        self.cover_substitutions(&mut aides, &mut errors)?;

        let mut stalled: BTreeSet<Team> = BTreeSet::new();

        loop {
            let Some((team, need_q)) = self.scan(&pending_q, &stalled)? else {
                break;
            };
            debug!(team = %team, pending_quarters = need_q, "assigning team");

            while pending_q[&team] > 0 {
                if !self.commit_one(&mut aides, team, &input.reservations)? {
                    break;
                }
                *pending_q.get_mut(&team).expect("scanned team present") -= 1;
            }
            if pending_q[&team] > 0 {
                // Nothing left can serve this team; keep it out of future
                // scans so the loop terminates.
                trace!(team = %team, "no eligible aide/slot pairing");
                stalled.insert(team);
            }
        }

        for (&team, &q) in &pending_q {
            if q > 0 {
                errors.push(SoftError::UnmetNeed {
                    team,
                    pending_fte: q as f64 * SLOT_FTE,
                });
            }
        }
        debug!(errors = errors.len(), "engine run done");

        let allocations: Vec<Allocation> = aides
            .into_iter()
            .filter(|a| a.assigned_quarters() > 0)
            .collect();

        let mut aides_on_duty: BTreeMap<Team, u32> = BTreeMap::new();
        for team in Team::ALL {
            let count = allocations
                .iter()
                .filter(|a| a.team_quarters(team) > 0)
                .count() as u32;
            aides_on_duty.insert(team, count);
        }

        let pending = pending_q
            .iter()
            .map(|(&team, &q)| (team, q as f64 * SLOT_FTE))
            .collect();

        Ok(EngineOutput {
            allocations,
            aides_on_duty,
            pending,
            errors,
        })
    }

    /// Pins program-reserved slots before general distribution.
    fn apply_programs(
        &self,
        aides: &mut [Allocation],
        programs: &[SpecialProgram],
        errors: &mut Vec<SoftError>,
    ) {
        for program in programs {
            for (staff_id, slot) in &program.reserved {
                let Some(aide) = aides.iter_mut().find(|a| &a.staff_id == staff_id) else {
                    errors.push(SoftError::ProgramUnfilled {
                        program_id: program.id.clone(),
                        staff_id: staff_id.clone(),
                        slot: *slot,
                        reason: "staff not in roster".into(),
                    });
                    continue;
                };
                match aide.assign_slot(*slot, program.team) {
                    Ok(()) => {
                        if !aide.program_ids.contains(&program.id) {
                            aide.program_ids.push(program.id.clone());
                        }
                        trace!(program = %program.id, staff = %staff_id, slot = %slot, "program slot pinned");
                    }
                    Err(e) => errors.push(SoftError::ProgramUnfilled {
                        program_id: program.id.clone(),
                        staff_id: staff_id.clone(),
                        slot: *slot,
                        reason: e.to_string(),
                    }),
                }
            }
        }
    }

    /// Detects leave-induced coverage gaps on team-fixed aides and applies
    /// the substitution decision.
    fn cover_substitutions(
        &self,
        aides: &mut Vec<Allocation>,
        errors: &mut Vec<SoftError>,
    ) -> Result<(), EngineError> {
        let mut needs = Vec::new();

        for aide in aides.iter() {
            let Some(team) = aide.home_team else {
                continue;
            };
            let Some(leave) = aide.leave else {
                continue;
            };
            let missing: Vec<Slot> = leave
                .blocked_slots()
                .iter()
                .copied()
                .filter(|s| aide.slot_owner(*s).is_none())
                .collect();
            if missing.is_empty() {
                continue;
            }
            let candidates: Vec<String> = aides
                .iter()
                .filter(|f| {
                    f.home_team.is_none()
                        && f.staff_id != aide.staff_id
                        && missing.iter().any(|s| f.free_slots().contains(s))
                })
                .map(|f| f.staff_id.clone())
                .collect();
            if candidates.is_empty() {
                continue;
            }
            needs.push(SubstitutionNeed {
                aide_id: aide.staff_id.clone(),
                team,
                missing_slots: missing,
                candidates,
            });
        }

        if needs.is_empty() {
            return Ok(());
        }

        debug!(needs = needs.len(), "substitution required");
        let request = SubstitutionRequest { needs };
        let selection = self.decisions.resolve_substitution(&request)?;

        for (aide_id, covers) in &selection {
            let Some(need) = request.needs.iter().find(|n| &n.aide_id == aide_id) else {
                return Err(DecisionError::InvalidSelection(format!(
                    "selection for {aide_id} matches no substitution need"
                ))
                .into());
            };
            for (substitute_id, slots) in covers {
                for slot in slots {
                    let Some(substitute) =
                        aides.iter_mut().find(|a| &a.staff_id == substitute_id)
                    else {
                        errors.push(SoftError::SubstitutionUnapplied {
                            aide_id: aide_id.clone(),
                            substitute_id: substitute_id.clone(),
                            slot: *slot,
                            reason: "substitute not in roster".into(),
                        });
                        continue;
                    };
                    match substitute.assign_slot(*slot, need.team) {
                        Ok(()) => {
                            trace!(substitute = %substitute_id, team = %need.team, slot = %slot, "substitution applied")
                        }
                        Err(e) => errors.push(SoftError::SubstitutionUnapplied {
                            aide_id: aide_id.clone(),
                            substitute_id: substitute_id.clone(),
                            slot: *slot,
                            reason: e.to_string(),
                        }),
                    }
                }
            }
        }
        Ok(())
    }

    /// Finds the next team to serve: the unique maximum pending need, or
    /// the tie-break decision among teams tied at the maximum.
    fn scan(
        &self,
        pending_q: &BTreeMap<Team, i64>,
        stalled: &BTreeSet<Team>,
    ) -> Result<Option<(Team, i64)>, EngineError> {
        let max = pending_q
            .iter()
            .filter(|&(team, &q)| q > 0 && !stalled.contains(team))
            .map(|(_, &q)| q)
            .max();
        let Some(max) = max else {
            return Ok(None);
        };

        let tied: Vec<Team> = pending_q
            .iter()
            .filter(|&(team, &q)| q == max && !stalled.contains(team))
            .map(|(team, _)| *team)
            .collect();

        let team = if tied.len() == 1 {
            tied[0]
        } else {
            debug!(?tied, pending_quarters = max, "tie-break required");
            let request = TieBreakRequest {
                tied_teams: tied.clone(),
                pending_fte: max as f64 * SLOT_FTE,
            };
            let choice = self.decisions.resolve_tie(&request)?;
            if !tied.contains(&choice) {
                return Err(DecisionError::InvalidTeam(choice).into());
            }
            choice
        };
        Ok(Some((team, max)))
    }

    /// Commits one 0.25 slot of a floating aide to the team.
    ///
    /// The team's reservation holder is preferred on its reserved slot;
    /// otherwise the first floating aide in roster order with a free slot
    /// serves, lowest slot number first. Returns false when nothing can
    /// serve the team.
    fn commit_one(
        &self,
        aides: &mut [Allocation],
        team: Team,
        reservations: &[SlotReservation],
    ) -> Result<bool, EngineError> {
        // Reservation holder first.
        if let Some(reservation) = reservations.iter().find(|r| r.team == team) {
            for candidate in &reservation.candidates {
                let Some(aide) = aides
                    .iter_mut()
                    .find(|a| &a.staff_id == candidate && a.home_team.is_none())
                else {
                    continue;
                };
                if aide.free_slots().contains(&reservation.slot) {
                    aide.assign_slot(reservation.slot, team)?;
                    trace!(staff = %candidate, team = %team, slot = %reservation.slot, "reserved slot committed");
                    return Ok(true);
                }
            }
        }

        // General distribution: first floating aide with a free slot.
        for aide in aides.iter_mut().filter(|a| a.home_team.is_none()) {
            if let Some(&slot) = aide.free_slots().first() {
                if aide.remaining_fte + 1e-9 >= SLOT_FTE {
                    let staff_id = aide.staff_id.clone();
                    aide.assign_slot(slot, team)?;
                    trace!(staff = %staff_id, team = %team, slot = %slot, "slot committed");
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}
