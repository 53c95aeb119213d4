//! Reconciliation layer.
//!
//! Sits between externally-owned master data and the allocation core:
//! normalizes historical duty-override shapes into the canonical record,
//! rebuilds therapist allocations when overrides change, and derives the
//! per-team bed relief that feeds the bed optimizer. Therapist
//! allocations are replaced wholesale on every rebuild.
//!
//! Snapshot fetches from upstream stores are memoized through an explicit
//! keyed TTL cache injected at this boundary — never through ambient
//! global state.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::models::{
    Allocation, DutyOverride, LeaveKind, Rank, Slot, SlotError, StaffMember, Team, Ward, SLOT_FTE,
};

/// Historical shapes of a duty-override record as stored upstream.
///
/// Older records carry a single whole-day substitute; current records
/// carry an explicit per-slot substitute map. Both normalize into
/// [`DutyOverride`] before the core sees them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawOverride {
    /// Current shape: per-slot substitutes.
    PerSlot {
        staff_id: String,
        leave: Option<LeaveKind>,
        capacity: Option<f64>,
        substitutes: BTreeMap<Slot, String>,
    },
    /// Legacy shape: one substitute covering every leave-blocked slot.
    WholeDay {
        staff_id: String,
        leave: Option<LeaveKind>,
        capacity: Option<f64>,
        #[serde(default)]
        substitute: Option<String>,
    },
}

/// Normalizes any accepted override shape into the canonical record.
pub fn normalize_override(raw: &RawOverride) -> DutyOverride {
    match raw {
        RawOverride::PerSlot {
            staff_id,
            leave,
            capacity,
            substitutes,
        } => DutyOverride {
            staff_id: staff_id.clone(),
            leave: *leave,
            capacity: *capacity,
            substitutes: substitutes.clone(),
        },
        RawOverride::WholeDay {
            staff_id,
            leave,
            capacity,
            substitute,
        } => {
            let mut normalized = DutyOverride {
                staff_id: staff_id.clone(),
                leave: *leave,
                capacity: *capacity,
                substitutes: BTreeMap::new(),
            };
            if let (Some(leave), Some(substitute)) = (leave, substitute) {
                for &slot in leave.blocked_slots() {
                    normalized.substitutes.insert(slot, substitute.clone());
                }
            }
            normalized
        }
    }
}

/// Rebuilds the day's therapist allocations from the roster and the
/// current overrides.
///
/// Therapists are not floated: each therapist's available slots go to the
/// home team, in day order, up to the effective capacity. Staff without a
/// therapist rank or home team are skipped.
pub fn rebuild_therapist_allocations(
    roster: &[StaffMember],
    overrides: &[DutyOverride],
) -> Result<Vec<Allocation>, SlotError> {
    let by_staff: BTreeMap<&str, &DutyOverride> = overrides
        .iter()
        .map(|o| (o.staff_id.as_str(), o))
        .collect();

    let mut allocations = Vec::new();
    for member in roster {
        if !member.rank.is_therapist() {
            continue;
        }
        let Some(team) = member.home_team else {
            continue;
        };

        let record = by_staff.get(member.id.as_str());
        let capacity = record
            .map(|o| o.effective_capacity(member.capacity))
            .unwrap_or(member.capacity);
        let leave = record.and_then(|o| o.leave);

        let mut allocation = Allocation::new(&member.id, capacity).with_home_team(team);
        if let Some(leave) = leave {
            allocation = allocation.with_leave(leave);
        }
        while allocation.remaining_fte + 1e-9 >= SLOT_FTE {
            let Some(&slot) = allocation.free_slots().first() else {
                break;
            };
            allocation.assign_slot(slot, team)?;
        }
        allocations.push(allocation);
    }

    debug!(count = allocations.len(), "therapist allocations rebuilt");
    Ok(allocations)
}

/// Builds the day's aide allocations from the roster and overrides.
///
/// Floating aides get no home team, which marks them redistributable to
/// the engine; team-fixed aides keep theirs. Slots are left uncommitted —
/// the engine distributes them.
pub fn build_aide_allocations(
    roster: &[StaffMember],
    overrides: &[DutyOverride],
) -> Vec<Allocation> {
    let by_staff: BTreeMap<&str, &DutyOverride> = overrides
        .iter()
        .map(|o| (o.staff_id.as_str(), o))
        .collect();

    roster
        .iter()
        .filter(|m| m.rank == Rank::Aide)
        .map(|member| {
            let record = by_staff.get(member.id.as_str());
            let capacity = record
                .map(|o| o.effective_capacity(member.capacity))
                .unwrap_or(member.capacity);

            let mut allocation = Allocation::new(&member.id, capacity);
            if !member.floating {
                if let Some(team) = member.home_team {
                    allocation = allocation.with_home_team(team);
                }
            }
            if let Some(leave) = record.and_then(|o| o.leave) {
                allocation = allocation.with_leave(leave);
            }
            allocation
        })
        .collect()
}

/// (substitute, slot) pairs already consumed by override substitutions.
///
/// These feed the reservation resolver so a preference cannot claim a
/// slot an override has promised elsewhere.
pub fn substitution_reservations(
    overrides: &[DutyOverride],
) -> std::collections::BTreeSet<(String, Slot)> {
    overrides
        .iter()
        .flat_map(|o| {
            o.substitutes
                .iter()
                .map(|(&slot, substitute)| (substitute.clone(), slot))
        })
        .collect()
}

/// Per-team on-duty therapist FTE from committed allocations.
pub fn therapist_fte_by_team(allocations: &[Allocation]) -> BTreeMap<Team, f64> {
    let mut fte = BTreeMap::new();
    for team in Team::ALL {
        let quarters: usize = allocations.iter().map(|a| a.team_quarters(team)).sum();
        fte.insert(team, quarters as f64 * SLOT_FTE);
    }
    fte
}

/// Derives per-team bed relief from therapist headcount and ward state.
///
/// Each team's target is its proportional share of all assigned beds,
/// weighted by on-duty therapist FTE; relief is `target - owned`, so a
/// positive value means the team can host more beds than it holds. The
/// relief values sum to zero by construction.
pub fn team_bed_relief(
    therapist_fte: &BTreeMap<Team, f64>,
    wards: &[Ward],
) -> BTreeMap<Team, f64> {
    let total_fte: f64 = therapist_fte.values().sum();

    let mut owned = BTreeMap::new();
    let mut total_beds = 0.0;
    for team in Team::ALL {
        let beds: f64 = wards.iter().map(|w| w.team_beds(team)).sum();
        owned.insert(team, beds);
        total_beds += beds;
    }

    let mut relief = BTreeMap::new();
    for team in Team::ALL {
        let value = if total_fte > 0.0 {
            let share = therapist_fte.get(&team).copied().unwrap_or(0.0) / total_fte;
            total_beds * share - owned[&team]
        } else {
            0.0
        };
        relief.insert(team, value);
    }
    relief
}

/// Explicit keyed TTL cache for memoized snapshot fetches.
pub struct SnapshotCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, (Instant, V)>>,
}

impl<K: Eq + Hash + Clone, V: Clone> SnapshotCache<K, V> {
    /// Creates a cache whose entries expire after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key`, fetching on miss or expiry.
    pub fn get_or_fetch_with(&self, key: K, fetch: impl FnOnce() -> V) -> V {
        let mut entries = self.entries.lock().expect("cache poisoned");
        if let Some((stamp, value)) = entries.get(&key) {
            if stamp.elapsed() < self.ttl {
                return value.clone();
            }
        }
        let value = fetch();
        entries.insert(key, (Instant::now(), value.clone()));
        value
    }

    /// Drops one entry.
    pub fn invalidate(&self, key: &K) {
        self.entries.lock().expect("cache poisoned").remove(key);
    }

    /// Drops everything.
    pub fn clear(&self) {
        self.entries.lock().expect("cache poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Rank;

    #[test]
    fn test_normalize_per_slot_shape() {
        let raw = RawOverride::PerSlot {
            staff_id: "P1".into(),
            leave: Some(LeaveKind::HalfDayAm),
            capacity: None,
            substitutes: [(Slot::Am1, "F1".to_string())].into_iter().collect(),
        };
        let normalized = normalize_override(&raw);
        assert_eq!(normalized.staff_id, "P1");
        assert_eq!(normalized.substitutes.get(&Slot::Am1).unwrap(), "F1");
        assert_eq!(normalized.substitutes.len(), 1);
    }

    #[test]
    fn test_normalize_legacy_whole_day_shape() {
        let raw = RawOverride::WholeDay {
            staff_id: "P1".into(),
            leave: Some(LeaveKind::HalfDayPm),
            capacity: None,
            substitute: Some("F1".into()),
        };
        let normalized = normalize_override(&raw);
        // The single substitute expands onto every blocked slot.
        assert_eq!(normalized.substitutes.get(&Slot::Pm1).unwrap(), "F1");
        assert_eq!(normalized.substitutes.get(&Slot::Pm2).unwrap(), "F1");
        assert_eq!(normalized.substitutes.len(), 2);
    }

    #[test]
    fn test_legacy_shape_parses_from_json() {
        let json = r#"{"staff_id":"P1","leave":"FullDay","capacity":null,"substitute":"F2"}"#;
        let raw: RawOverride = serde_json::from_str(json).unwrap();
        let normalized = normalize_override(&raw);
        assert_eq!(normalized.substitutes.len(), 4);
    }

    #[test]
    fn test_therapist_rebuild_assigns_home_team() {
        let roster = vec![
            StaffMember::therapist("T1", Rank::SeniorTherapist, Team::A),
            StaffMember::therapist("T2", Rank::RotationTherapist, Team::B).with_capacity(0.5),
            StaffMember::floating_aide("F1"),
        ];
        let allocations = rebuild_therapist_allocations(&roster, &[]).unwrap();

        assert_eq!(allocations.len(), 2);
        assert_eq!(allocations[0].team_quarters(Team::A), 4);
        // Half capacity fills the first two slots only.
        assert_eq!(allocations[1].team_quarters(Team::B), 2);
        assert_eq!(allocations[1].slot_owner(Slot::Am1), Some(Team::B));
        assert_eq!(allocations[1].slot_owner(Slot::Pm1), None);
    }

    #[test]
    fn test_therapist_rebuild_honors_overrides() {
        let roster = vec![StaffMember::therapist("T1", Rank::AssociateTherapist, Team::C)];
        let overrides = vec![DutyOverride::for_staff("T1").with_leave(LeaveKind::HalfDayAm)];
        let allocations = rebuild_therapist_allocations(&roster, &overrides).unwrap();

        let a = &allocations[0];
        assert_eq!(a.team_quarters(Team::C), 2);
        assert_eq!(a.slot_owner(Slot::Am1), None);
        assert_eq!(a.slot_owner(Slot::Pm1), Some(Team::C));

        let fte = therapist_fte_by_team(&allocations);
        assert_eq!(fte[&Team::C], 0.5);
    }

    #[test]
    fn test_aide_allocations_mark_floating_by_missing_home_team() {
        let roster = vec![
            StaffMember::floating_aide("F1"),
            StaffMember::team_aide("P1", Team::B),
            StaffMember::therapist("T1", Rank::SeniorTherapist, Team::A),
        ];
        let overrides = vec![DutyOverride::for_staff("P1").with_leave(LeaveKind::HalfDayPm)];
        let aides = build_aide_allocations(&roster, &overrides);

        assert_eq!(aides.len(), 2);
        assert_eq!(aides[0].staff_id, "F1");
        assert_eq!(aides[0].home_team, None);
        assert_eq!(aides[1].home_team, Some(Team::B));
        assert_eq!(aides[1].leave, Some(LeaveKind::HalfDayPm));
        assert!((aides[1].remaining_fte - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_substitution_reservations_from_overrides() {
        let overrides = vec![
            DutyOverride::for_staff("P1")
                .with_substitute(Slot::Am1, "F1")
                .with_substitute(Slot::Am2, "F1"),
            DutyOverride::for_staff("P2").with_substitute(Slot::Pm1, "F2"),
        ];
        let consumed = substitution_reservations(&overrides);
        assert_eq!(consumed.len(), 3);
        assert!(consumed.contains(&("F1".to_string(), Slot::Am1)));
        assert!(consumed.contains(&("F2".to_string(), Slot::Pm1)));
    }

    #[test]
    fn test_bed_relief_is_zero_sum_and_proportional() {
        // 20 beds total; A holds 12, B holds 8, but headcount is equal.
        let wards = vec![Ward::new("West-3", 20)
            .with_team_beds(Team::A, 12.0)
            .with_team_beds(Team::B, 8.0)];
        let fte: BTreeMap<Team, f64> = [(Team::A, 2.0), (Team::B, 2.0)].into_iter().collect();

        let relief = team_bed_relief(&fte, &wards);
        assert!((relief.values().sum::<f64>()).abs() < 1e-9);
        assert!((relief[&Team::A] - (-2.0)).abs() < 1e-9);
        assert!((relief[&Team::B] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_bed_relief_without_therapists() {
        let wards = vec![Ward::new("West-3", 10).with_team_beds(Team::A, 10.0)];
        let relief = team_bed_relief(&BTreeMap::new(), &wards);
        assert!(relief.values().all(|&v| v == 0.0));
    }

    #[test]
    fn test_snapshot_cache_hits_within_ttl() {
        let cache: SnapshotCache<&'static str, u32> = SnapshotCache::new(Duration::from_secs(60));
        let mut fetches = 0;
        let first = cache.get_or_fetch_with("roster", || {
            fetches += 1;
            7
        });
        let second = cache.get_or_fetch_with("roster", || {
            fetches += 1;
            8
        });
        assert_eq!(first, 7);
        assert_eq!(second, 7);
        assert_eq!(fetches, 1);
    }

    #[test]
    fn test_snapshot_cache_expires_and_invalidates() {
        let cache: SnapshotCache<&'static str, u32> = SnapshotCache::new(Duration::ZERO);
        cache.get_or_fetch_with("wards", || 1);
        // Zero TTL: every lookup refetches.
        let refetched = cache.get_or_fetch_with("wards", || 2);
        assert_eq!(refetched, 2);

        let cache: SnapshotCache<&'static str, u32> = SnapshotCache::new(Duration::from_secs(60));
        cache.get_or_fetch_with("wards", || 1);
        cache.invalidate(&"wards");
        let after = cache.get_or_fetch_with("wards", || 3);
        assert_eq!(after, 3);
    }
}
