//! Roster row validation
//!
//! Rules run in a fixed order and the first failure wins:
//! 1. roll number present
//! 2. roll number length within 3..=20
//! 3. roll number unique among the other rows (case-insensitive)
//! 4. name present
//! 5. bus number present and at least 1

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::table::{Branch, PaymentState, RosterEntry, RosterId, RosterTable, Section};
use crate::fleet::VehicleId;

/// Shortest accepted roll number
pub const IDENTIFIER_MIN_LEN: usize = 3;

/// Longest accepted roll number
pub const IDENTIFIER_MAX_LEN: usize = 20;

/// Editable column that failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RosterField {
    /// Roll number
    Identifier,
    /// Passenger name
    Name,
    /// Bus number
    Vehicle,
}

/// A failed validation rule
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Roll number left blank
    #[error("Roll number is required")]
    IdentifierMissing,

    /// Roll number outside the allowed length
    #[error("Roll number must be between 3 and 20 characters (got {0})")]
    IdentifierLength(usize),

    /// Roll number used by another row
    #[error("Roll number '{0}' already exists")]
    IdentifierTaken(String),

    /// Name left blank
    #[error("Name is required")]
    NameMissing,

    /// Bus number missing or zero
    #[error("Valid bus number is required")]
    VehicleMissing,
}

impl ValidationError {
    /// Column to focus when reporting this error
    pub fn field(&self) -> RosterField {
        match self {
            Self::IdentifierMissing | Self::IdentifierLength(_) | Self::IdentifierTaken(_) => {
                RosterField::Identifier
            }
            Self::NameMissing => RosterField::Name,
            Self::VehicleMissing => RosterField::Vehicle,
        }
    }
}

/// Field values of a row being edited, exactly as typed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterDraft {
    /// Roll number
    pub identifier: String,
    /// Student name
    pub name: String,
    /// Academic branch
    pub branch: Branch,
    /// Class section
    pub section: Section,
    /// Fee state
    pub payment_state: PaymentState,
    /// Assigned bus; `None` while the field is empty
    pub vehicle_id: Option<VehicleId>,
}

impl From<&RosterEntry> for RosterDraft {
    fn from(entry: &RosterEntry) -> Self {
        Self {
            identifier: entry.identifier.clone(),
            name: entry.name.clone(),
            branch: entry.branch,
            section: entry.section,
            payment_state: entry.payment_state,
            vehicle_id: Some(entry.vehicle_id),
        }
    }
}

/// Check `draft` as the new content of row `id` and build the normalized entry.
///
/// Uniqueness is checked against every row except `id`.
pub fn validate(
    draft: &RosterDraft,
    table: &RosterTable,
    id: RosterId,
) -> Result<RosterEntry, ValidationError> {
    let identifier = draft.identifier.trim();
    if identifier.is_empty() {
        return Err(ValidationError::IdentifierMissing);
    }

    let len = identifier.chars().count();
    if !(IDENTIFIER_MIN_LEN..=IDENTIFIER_MAX_LEN).contains(&len) {
        return Err(ValidationError::IdentifierLength(len));
    }

    if table.identifier_taken(identifier, Some(id)) {
        return Err(ValidationError::IdentifierTaken(identifier.to_string()));
    }

    let name = draft.name.trim();
    if name.is_empty() {
        return Err(ValidationError::NameMissing);
    }

    let vehicle_id = match draft.vehicle_id {
        Some(n) if n >= 1 => n,
        _ => return Err(ValidationError::VehicleMissing),
    };

    Ok(RosterEntry {
        id,
        identifier: identifier.to_uppercase(),
        name: name.to_string(),
        branch: draft.branch,
        section: draft.section,
        payment_state: draft.payment_state,
        vehicle_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::sample_roster;

    fn draft() -> RosterDraft {
        RosterDraft {
            identifier: "24a31a0599".to_string(),
            name: "  Anil Varma ".to_string(),
            branch: Branch::Ece,
            section: Section::C,
            payment_state: PaymentState::Paid,
            vehicle_id: Some(22),
        }
    }

    #[test]
    fn test_valid_draft_is_normalized() {
        let entry = validate(&draft(), &sample_roster(), 2).unwrap();
        assert_eq!(entry.identifier, "24A31A0599");
        assert_eq!(entry.name, "Anil Varma");
        assert_eq!(entry.vehicle_id, 22);
        assert_eq!(entry.id, 2);
    }

    #[test]
    fn test_rules_fire_in_order() {
        let table = sample_roster();

        // Empty roll number wins over an empty name
        let mut d = draft();
        d.identifier = "   ".to_string();
        d.name = String::new();
        assert_eq!(validate(&d, &table, 2), Err(ValidationError::IdentifierMissing));

        let mut d = draft();
        d.identifier = "AB".to_string();
        assert_eq!(validate(&d, &table, 2), Err(ValidationError::IdentifierLength(2)));

        let mut d = draft();
        d.identifier = "X".repeat(21);
        assert_eq!(validate(&d, &table, 2), Err(ValidationError::IdentifierLength(21)));

        let mut d = draft();
        d.name = " ".to_string();
        d.vehicle_id = None;
        assert_eq!(validate(&d, &table, 2), Err(ValidationError::NameMissing));

        let mut d = draft();
        d.vehicle_id = Some(0);
        let err = validate(&d, &table, 2).unwrap_err();
        assert_eq!(err, ValidationError::VehicleMissing);
        assert_eq!(err.field(), RosterField::Vehicle);
    }

    #[test]
    fn test_duplicate_identifier_rejected_but_own_identifier_allowed() {
        let table = sample_roster();

        let mut d = draft();
        d.identifier = "24a31a0501".to_string();
        assert_eq!(
            validate(&d, &table, 2),
            Err(ValidationError::IdentifierTaken("24a31a0501".to_string()))
        );
        assert!(validate(&d, &table, 1).is_ok());
    }

    #[test]
    fn test_out_of_fleet_bus_number_is_accepted() {
        let mut d = draft();
        d.vehicle_id = Some(777);
        assert!(validate(&d, &sample_roster(), 2).is_ok());
    }
}
