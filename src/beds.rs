//! Bed allocation optimizer.
//!
//! Turns per-team signed bed surplus/deficit ("bed relief") into concrete
//! ward-level transfers. The heuristic is greedy and order-sensitive:
//! largest needs and largest surpluses are matched first so the
//! last-processed team is never starved, and wards are consumed in name
//! order so the plan is deterministic.
//!
//! The score prefers plans touching few wards overall and spreading ward
//! handoffs evenly between teams; it is computed for the single generated
//! candidate so alternative generators can be compared on equal terms.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{BedTransfer, Team, Ward};
use crate::rounding::round_preserving_sum;

/// A complete bed transfer plan for one day.
#[derive(Debug, Clone)]
pub struct BedTransferPlan {
    /// Ward-level transfers, in generation order.
    pub transfers: Vec<BedTransfer>,
    /// The zero-sum integer relief the plan was built from.
    pub rounded_relief: BTreeMap<Team, i64>,
    /// Plan quality; lower is better.
    pub score: i64,
}

impl BedTransferPlan {
    /// Total beds moved (equal in and out by construction).
    pub fn total_beds(&self) -> u32 {
        self.transfers.iter().map(|t| t.num_beds).sum()
    }

    /// Beds moved out of a team across all transfers.
    pub fn beds_released(&self, team: Team) -> u32 {
        self.transfers
            .iter()
            .filter(|t| t.from == team)
            .map(|t| t.num_beds)
            .sum()
    }

    /// Beds moved into a team across all transfers.
    pub fn beds_taken(&self, team: Team) -> u32 {
        self.transfers
            .iter()
            .filter(|t| t.to == team)
            .map(|t| t.num_beds)
            .sum()
    }
}

/// Plans ward-to-ward bed transfers from per-team relief values.
///
/// `relief` is signed: positive = the team needs beds, negative = the team
/// can release beds. Values are rounded zero-sum first, then takers are
/// served greedily from the releasers with the most remaining beds, ward
/// by ward in lexical name order.
pub fn plan_bed_transfers(relief: &BTreeMap<Team, f64>, wards: &[Ward]) -> BedTransferPlan {
    let rounded = round_preserving_sum(relief);

    let mut takers: Vec<(Team, i64)> = rounded
        .iter()
        .filter(|(_, &v)| v > 0)
        .map(|(&t, &v)| (t, v))
        .collect();
    takers.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut releasers: Vec<(Team, i64)> = rounded
        .iter()
        .filter(|(_, &v)| v < 0)
        .map(|(&t, &v)| (t, -v))
        .collect();

    // Working copy of ward ownership, wards in lexical name order.
    let mut owned: BTreeMap<String, BTreeMap<Team, f64>> = BTreeMap::new();
    for ward in wards {
        owned
            .entry(ward.name.clone())
            .or_default()
            .extend(ward.beds_by_team.iter().map(|(&t, &b)| (t, b)));
    }

    let mut transfers = Vec::new();

    for &(taker, need) in &takers {
        let mut need = need;

        // Releasers with the most remaining beds first; team order on ties.
        releasers.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        for (releaser, remaining) in releasers.iter_mut() {
            if need == 0 {
                break;
            }
            for (ward_name, by_team) in owned.iter_mut() {
                if need == 0 || *remaining == 0 {
                    break;
                }
                let Some(beds) = by_team.get_mut(releaser) else {
                    continue;
                };
                let whole = beds.floor() as i64;
                let qty = need.min(*remaining).min(whole);
                if qty <= 0 {
                    continue;
                }
                transfers.push(BedTransfer::new(
                    *releaser,
                    taker,
                    ward_name.clone(),
                    qty as u32,
                ));
                need -= qty;
                *remaining -= qty;
                *beds -= qty as f64;
            }
        }
    }

    let score = score_plan(&transfers);
    BedTransferPlan {
        transfers,
        rounded_relief: rounded,
        score,
    }
}

/// Scores a transfer set; lower is better.
///
/// `1000 * distinct wards touched + 100 * (max wards per team - min
/// nonzero wards per team)`. A team touches a ward when it appears on
/// either side of a transfer in it.
fn score_plan(transfers: &[BedTransfer]) -> i64 {
    let mut all_wards: BTreeSet<&str> = BTreeSet::new();
    let mut per_team: BTreeMap<Team, BTreeSet<&str>> = BTreeMap::new();

    for t in transfers {
        all_wards.insert(&t.ward);
        per_team.entry(t.from).or_default().insert(&t.ward);
        per_team.entry(t.to).or_default().insert(&t.ward);
    }

    let counts: Vec<i64> = per_team
        .values()
        .map(|wards| wards.len() as i64)
        .filter(|&n| n > 0)
        .collect();
    let spread = match (counts.iter().max(), counts.iter().min()) {
        (Some(max), Some(min)) => max - min,
        _ => 0,
    };

    1000 * all_wards.len() as i64 + 100 * spread
}
