//! Daily plan summary counters.
//!
//! Per-team indicators computed from a finished engine run, for the plan
//! overview the schedulers work from.
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Assigned FTE | Quarter-slots committed to the team × 0.25 |
//! | Aide headcount | Distinct aides serving the team |
//! | Shortfall FTE | Pending need left unmet |
//! | Coverage | assigned / (assigned + shortfall) |

use std::collections::BTreeMap;

use super::run::{EngineOutput, SoftError};
use crate::models::{Team, SLOT_FTE};

/// Per-team summary of a finished allocation run.
#[derive(Debug, Clone)]
pub struct AllocationSummary {
    /// FTE committed per team.
    pub assigned_fte: BTreeMap<Team, f64>,
    /// Distinct aides serving each team.
    pub aide_headcount: BTreeMap<Team, u32>,
    /// Unmet pending FTE per team.
    pub shortfall_fte: BTreeMap<Team, f64>,
    /// Fraction of total demand covered (0.0..1.0); 1.0 when no demand.
    pub coverage: f64,
}

impl AllocationSummary {
    /// Computes summary counters from an engine run.
    pub fn calculate(output: &EngineOutput) -> Self {
        let mut assigned_fte = BTreeMap::new();
        let mut shortfall_fte = BTreeMap::new();

        for team in Team::ALL {
            let quarters: usize = output
                .allocations
                .iter()
                .map(|a| a.team_quarters(team))
                .sum();
            assigned_fte.insert(team, quarters as f64 * SLOT_FTE);
            shortfall_fte.insert(team, 0.0);
        }

        for error in &output.errors {
            if let SoftError::UnmetNeed { team, pending_fte } = error {
                *shortfall_fte.get_mut(team).expect("all teams present") += pending_fte;
            }
        }

        let total_assigned: f64 = assigned_fte.values().sum();
        let total_short: f64 = shortfall_fte.values().sum();
        let demand = total_assigned + total_short;
        let coverage = if demand > 0.0 {
            total_assigned / demand
        } else {
            1.0
        };

        Self {
            assigned_fte,
            aide_headcount: output.aides_on_duty.clone(),
            shortfall_fte,
            coverage,
        }
    }
}
