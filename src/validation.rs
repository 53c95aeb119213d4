//! Input validation for the daily plan.
//!
//! Checks structural integrity of roster, ward, and configuration data
//! before allocation. Detects:
//! - Duplicate staff ids and ward names
//! - Non-finite or out-of-range capacities and bed counts
//! - Ward bed assignments exceeding the ward's total
//! - Programs and preferences referencing unknown staff
//! - Program reservations claiming the same (staff, slot) twice

use crate::models::{AidePreference, SpecialProgram, StaffMember, Ward};
use std::collections::HashSet;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same identifier.
    DuplicateId,
    /// A capacity or bed count is non-finite or out of range.
    InvalidQuantity,
    /// Per-team bed assignments exceed the ward total.
    OverassignedWard,
    /// A program or preference references unknown staff.
    UnknownStaff,
    /// Two program reservations claim the same (staff, slot) pair.
    ConflictingReservation,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the master data feeding a daily allocation run.
///
/// Checks:
/// 1. No duplicate staff ids
/// 2. No duplicate ward names
/// 3. Staff capacities finite and within `0.0..=1.0`
/// 4. Ward bed counts finite and non-negative
/// 5. Per-team ward beds do not exceed the ward's total
/// 6. Programs and preferences reference existing staff
/// 7. No two program reservations claim the same (staff, slot)
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_inputs(
    staff: &[StaffMember],
    wards: &[Ward],
    programs: &[SpecialProgram],
    preferences: &[AidePreference],
) -> ValidationResult {
    let mut errors = Vec::new();

    let mut staff_ids = HashSet::new();
    for member in staff {
        if !staff_ids.insert(member.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate staff ID: {}", member.id),
            ));
        }
        if !member.capacity.is_finite() || !(0.0..=1.0).contains(&member.capacity) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidQuantity,
                format!(
                    "Staff '{}' has invalid capacity {}",
                    member.id, member.capacity
                ),
            ));
        }
    }

    let mut ward_names = HashSet::new();
    for ward in wards {
        if !ward_names.insert(ward.name.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate ward name: {}", ward.name),
            ));
        }
        for (team, &beds) in &ward.beds_by_team {
            if !beds.is_finite() || beds < 0.0 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidQuantity,
                    format!("Ward '{}' has invalid bed count {beds} for team {team}", ward.name),
                ));
            }
        }
        let assigned = ward.assigned_beds();
        if assigned.is_finite() && assigned > ward.total_beds as f64 + 1e-9 {
            errors.push(ValidationError::new(
                ValidationErrorKind::OverassignedWard,
                format!(
                    "Ward '{}' assigns {assigned} beds but holds {}",
                    ward.name, ward.total_beds
                ),
            ));
        }
    }

    let mut reserved_pairs = HashSet::new();
    for program in programs {
        for (staff_id, slot) in &program.reserved {
            if !staff_ids.contains(staff_id.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownStaff,
                    format!(
                        "Program '{}' references unknown staff '{staff_id}'",
                        program.id
                    ),
                ));
            }
            if !reserved_pairs.insert((staff_id.as_str(), *slot)) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::ConflictingReservation,
                    format!(
                        "Program '{}' re-reserves slot {slot} of staff '{staff_id}'",
                        program.id
                    ),
                ));
            }
        }
    }

    for pref in preferences {
        for aide_id in &pref.preferred_aides {
            if !staff_ids.contains(aide_id.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownStaff,
                    format!(
                        "Preference of team {} references unknown aide '{aide_id}'",
                        pref.team
                    ),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
