//! Quarter-day slot model.
//!
//! A working day is divided into four slots of 0.25 FTE each: two in the
//! morning (1, 2) and two in the afternoon (3, 4). Slots are atomic — a
//! slot is owned by at most one team and cannot be split.

use serde::{Deserialize, Serialize};

/// FTE value of a single slot.
pub const SLOT_FTE: f64 = 0.25;

/// Number of slots per day.
pub const SLOTS_PER_DAY: usize = 4;

/// One quarter-day unit of a staff member's working day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Slot {
    /// First morning quarter.
    Am1,
    /// Second morning quarter.
    Am2,
    /// First afternoon quarter.
    Pm1,
    /// Second afternoon quarter.
    Pm2,
}

/// Morning/afternoon half of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayHalf {
    Am,
    Pm,
}

impl Slot {
    /// All slots in day order.
    pub const ALL: [Slot; 4] = [Slot::Am1, Slot::Am2, Slot::Pm1, Slot::Pm2];

    /// Slot number as used on the daily plan (1-4).
    pub fn number(&self) -> u8 {
        match self {
            Slot::Am1 => 1,
            Slot::Am2 => 2,
            Slot::Pm1 => 3,
            Slot::Pm2 => 4,
        }
    }

    /// Constructs a slot from its plan number (1-4).
    pub fn from_number(n: u8) -> Option<Slot> {
        match n {
            1 => Some(Slot::Am1),
            2 => Some(Slot::Am2),
            3 => Some(Slot::Pm1),
            4 => Some(Slot::Pm2),
            _ => None,
        }
    }

    /// Zero-based index into a per-day slot array.
    #[inline]
    pub fn index(&self) -> usize {
        self.number() as usize - 1
    }

    /// Which half of the day this slot falls in.
    pub fn half(&self) -> DayHalf {
        match self {
            Slot::Am1 | Slot::Am2 => DayHalf::Am,
            Slot::Pm1 | Slot::Pm2 => DayHalf::Pm,
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_roundtrip() {
        for slot in Slot::ALL {
            assert_eq!(Slot::from_number(slot.number()), Some(slot));
        }
        assert_eq!(Slot::from_number(0), None);
        assert_eq!(Slot::from_number(5), None);
    }

    #[test]
    fn test_halves() {
        assert_eq!(Slot::Am1.half(), DayHalf::Am);
        assert_eq!(Slot::Am2.half(), DayHalf::Am);
        assert_eq!(Slot::Pm1.half(), DayHalf::Pm);
        assert_eq!(Slot::Pm2.half(), DayHalf::Pm);
    }

    #[test]
    fn test_index() {
        for (i, slot) in Slot::ALL.iter().enumerate() {
            assert_eq!(slot.index(), i);
        }
    }

    #[test]
    fn test_day_adds_up_to_one_fte() {
        assert!((SLOT_FTE * SLOTS_PER_DAY as f64 - 1.0).abs() < 1e-12);
    }
}
