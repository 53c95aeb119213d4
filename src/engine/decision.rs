//! Decision-source contracts for the allocation engine.
//!
//! The engine suspends at exactly two points — team tie-breaks and aide
//! substitutions — and resumes with a value produced outside the engine,
//! normally by a human scheduler. The contract is synchronous from the
//! engine's point of view; the execution adapter may bridge it across a
//! thread boundary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::{Slot, Team};

/// Payload of a tie-break suspension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TieBreakRequest {
    /// Teams tied at the maximum pending need, in canonical order.
    pub tied_teams: Vec<Team>,
    /// The pending FTE value the teams are tied at.
    pub pending_fte: f64,
}

/// One uncovered (non-floating aide, team, slots) triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionNeed {
    /// The non-floating aide short of slots.
    pub aide_id: String,
    /// The team losing coverage.
    pub team: Team,
    /// Slots the aide cannot serve.
    pub missing_slots: Vec<Slot>,
    /// Floating aides eligible to cover, in roster order.
    pub candidates: Vec<String>,
}

/// Payload of a substitution suspension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionRequest {
    /// All uncovered triples detected for the run.
    pub needs: Vec<SubstitutionNeed>,
}

/// The human's substitution answer: per missing aide, which floating
/// aides cover which slots.
pub type SubstitutionSelection = BTreeMap<String, Vec<(String, Vec<Slot>)>>;

/// Why a decision could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecisionError {
    /// No decision hook was supplied for this suspension point.
    #[error("no decision hook supplied for {0}")]
    MissingHook(&'static str),
    /// The tie-break hook returned a team outside the tied set.
    #[error("tie-break returned team {0} not in the tied set")]
    InvalidTeam(Team),
    /// The substitution hook referenced an unknown aide or slot.
    #[error("substitution selection invalid: {0}")]
    InvalidSelection(String),
    /// The decision-maker canceled the run.
    #[error("decision canceled: {0}")]
    Canceled(String),
}

/// Source of the two human decisions the engine can suspend on.
pub trait DecisionSource: Send + Sync {
    /// Picks one team among those tied at the maximum pending need.
    fn resolve_tie(&self, req: &TieBreakRequest) -> Result<Team, DecisionError>;

    /// Maps each missing non-floating aide to floating covers.
    fn resolve_substitution(
        &self,
        req: &SubstitutionRequest,
    ) -> Result<SubstitutionSelection, DecisionError>;
}

/// Deterministic decision source: first tied team in canonical order,
/// first eligible candidate for every substitution need.
///
/// Used by tests and as the replay baseline for shadow comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstTied;

impl DecisionSource for FirstTied {
    fn resolve_tie(&self, req: &TieBreakRequest) -> Result<Team, DecisionError> {
        req.tied_teams
            .first()
            .copied()
            .ok_or_else(|| DecisionError::InvalidSelection("empty tied set".into()))
    }

    fn resolve_substitution(
        &self,
        req: &SubstitutionRequest,
    ) -> Result<SubstitutionSelection, DecisionError> {
        let mut selection = SubstitutionSelection::new();
        for need in &req.needs {
            if let Some(candidate) = need.candidates.first() {
                selection
                    .entry(need.aide_id.clone())
                    .or_default()
                    .push((candidate.clone(), need.missing_slots.clone()));
            }
        }
        Ok(selection)
    }
}

/// Decision source that rejects every request.
///
/// Stands in when the caller supplies no hooks: the engine fails fast
/// with a [`DecisionError::MissingHook`] instead of hanging.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl DecisionSource for NoHooks {
    fn resolve_tie(&self, _req: &TieBreakRequest) -> Result<Team, DecisionError> {
        Err(DecisionError::MissingHook("tie-break"))
    }

    fn resolve_substitution(
        &self,
        _req: &SubstitutionRequest,
    ) -> Result<SubstitutionSelection, DecisionError> {
        Err(DecisionError::MissingHook("substitution"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tied_picks_first_team() {
        let req = TieBreakRequest {
            tied_teams: vec![Team::C, Team::E],
            pending_fte: 0.5,
        };
        assert_eq!(FirstTied.resolve_tie(&req).unwrap(), Team::C);
    }

    #[test]
    fn test_first_tied_covers_all_needs() {
        let req = SubstitutionRequest {
            needs: vec![
                SubstitutionNeed {
                    aide_id: "P1".into(),
                    team: Team::A,
                    missing_slots: vec![Slot::Am1, Slot::Am2],
                    candidates: vec!["F1".into(), "F2".into()],
                },
                SubstitutionNeed {
                    aide_id: "P2".into(),
                    team: Team::B,
                    missing_slots: vec![Slot::Pm1],
                    candidates: vec![],
                },
            ],
        };
        let selection = FirstTied.resolve_substitution(&req).unwrap();
        assert_eq!(
            selection["P1"],
            vec![("F1".to_string(), vec![Slot::Am1, Slot::Am2])]
        );
        // No candidates → no cover for P2.
        assert!(!selection.contains_key("P2"));
    }

    #[test]
    fn test_no_hooks_fails_fast() {
        let tie = TieBreakRequest {
            tied_teams: vec![Team::A],
            pending_fte: 0.25,
        };
        assert_eq!(
            NoHooks.resolve_tie(&tie).unwrap_err(),
            DecisionError::MissingHook("tie-break")
        );
        let sub = SubstitutionRequest { needs: vec![] };
        assert!(matches!(
            NoHooks.resolve_substitution(&sub).unwrap_err(),
            DecisionError::MissingHook("substitution")
        ));
    }
}
