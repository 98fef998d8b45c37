//! Roster table
//!
//! Ordered passenger records, newest first, with the lookups the editor and
//! the search box need.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fleet::VehicleId;

/// Roster row id, assigned as max existing id + 1
pub type RosterId = u32;

/// Academic branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Branch {
    /// Computer science
    #[default]
    Cse,
    /// Electronics and communication
    Ece,
    /// Electrical and electronics
    Eee,
    /// Mechanical
    Mech,
    /// Civil
    Civil,
    /// Information technology
    It,
}

impl Branch {
    /// Every branch, in dropdown order
    pub const ALL: [Branch; 6] = [
        Self::Cse,
        Self::Ece,
        Self::Eee,
        Self::Mech,
        Self::Civil,
        Self::It,
    ];

    /// Short code, e.g. "CSE"
    pub fn code(&self) -> &'static str {
        match self {
            Self::Cse => "CSE",
            Self::Ece => "ECE",
            Self::Eee => "EEE",
            Self::Mech => "MECH",
            Self::Civil => "CIVIL",
            Self::It => "IT",
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Class section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Section {
    /// Section A
    #[default]
    A,
    /// Section B
    B,
    /// Section C
    C,
    /// Section D
    D,
    /// Section E
    E,
    /// Section F
    F,
}

impl Section {
    /// Every section, in dropdown order
    pub const ALL: [Section; 6] = [Self::A, Self::B, Self::C, Self::D, Self::E, Self::F];
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
            Self::F => "F",
        };
        f.write_str(letter)
    }
}

/// Bus pass fee state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    /// Fee received
    Paid,
    /// Fee not yet due or not yet received
    #[default]
    Pending,
    /// Fee past its due date
    Overdue,
}

impl PaymentState {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Pending => "pending",
            Self::Overdue => "overdue",
        }
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A passenger record with a bus assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    /// Row id
    pub id: RosterId,
    /// Roll number; unique, uppercase once saved
    pub identifier: String,
    /// Passenger name; empty only for a freshly added row
    pub name: String,
    /// Academic branch
    pub branch: Branch,
    /// Class section
    pub section: Section,
    /// Fee state
    pub payment_state: PaymentState,
    /// Assigned bus number (not checked against the fleet)
    pub vehicle_id: VehicleId,
}

impl RosterEntry {
    fn search_text(&self) -> String {
        format!(
            "{} {} {} {} {} {}",
            self.identifier,
            self.name,
            self.branch,
            self.section,
            self.payment_state,
            self.vehicle_id
        )
        .to_lowercase()
    }
}

/// Ordered roster, head first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RosterTable {
    entries: Vec<RosterEntry>,
}

impl RosterTable {
    /// Wrap an ordered list of entries
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        Self { entries }
    }

    /// Entries in display order
    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the roster is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by id
    pub fn get(&self, id: RosterId) -> Option<&RosterEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Highest id in use, 0 when empty
    pub fn max_id(&self) -> RosterId {
        self.entries.iter().map(|e| e.id).max().unwrap_or(0)
    }

    /// Whether another entry already uses `identifier`, compared case-insensitively
    /// after trimming. `excluding` skips the entry being saved.
    pub fn identifier_taken(&self, identifier: &str, excluding: Option<RosterId>) -> bool {
        let wanted = identifier.trim().to_uppercase();
        self.entries
            .iter()
            .filter(|e| Some(e.id) != excluding)
            .any(|e| e.identifier.trim().to_uppercase() == wanted)
    }

    /// Case-insensitive search across every column. An empty term matches all.
    pub fn search(&self, term: &str) -> Vec<&RosterEntry> {
        let term = term.trim().to_lowercase();
        self.entries
            .iter()
            .filter(|e| term.is_empty() || e.search_text().contains(&term))
            .collect()
    }

    pub(crate) fn insert_head(&mut self, entry: RosterEntry) {
        self.entries.insert(0, entry);
    }

    /// Swap in `entry` for the row with the same id, returning the old row
    pub(crate) fn replace(&mut self, entry: RosterEntry) -> Option<RosterEntry> {
        let slot = self.entries.iter_mut().find(|e| e.id == entry.id)?;
        Some(std::mem::replace(slot, entry))
    }

    pub(crate) fn remove(&mut self, id: RosterId) -> Option<RosterEntry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(index))
    }
}

/// Seed roster used when nothing has been persisted yet
pub fn sample_roster() -> RosterTable {
    let rows = [
        (1, "24A31A0501", "Rajesh Kumar", Branch::Cse, Section::A, PaymentState::Paid, 1),
        (2, "24A31A0502", "Priya Sharma", Branch::Ece, Section::B, PaymentState::Pending, 3),
        (3, "24A31A0503", "Arjun Reddy", Branch::Eee, Section::A, PaymentState::Overdue, 4),
        (4, "24A31A0504", "Sneha Patel", Branch::Mech, Section::C, PaymentState::Paid, 8),
        (5, "24A31A0505", "Vikram Singh", Branch::Civil, Section::D, PaymentState::Pending, 90),
        (6, "24A31A0506", "Lakshmi Devi", Branch::It, Section::E, PaymentState::Paid, 12),
        (7, "24A31A0507", "Karthik Reddy", Branch::Cse, Section::F, PaymentState::Paid, 15),
    ];

    RosterTable::new(
        rows.into_iter()
            .map(
                |(id, identifier, name, branch, section, payment_state, vehicle_id)| RosterEntry {
                    id,
                    identifier: identifier.to_string(),
                    name: name.to_string(),
                    branch,
                    section,
                    payment_state,
                    vehicle_id,
                },
            )
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_roster_shape() {
        let roster = sample_roster();
        assert_eq!(roster.len(), 7);
        assert_eq!(roster.max_id(), 7);
        assert_eq!(roster.entries()[0].identifier, "24A31A0501");
    }

    #[test]
    fn test_identifier_taken_ignores_case_and_excluded_row() {
        let roster = sample_roster();
        assert!(roster.identifier_taken("24a31a0503", None));
        assert!(roster.identifier_taken(" 24A31A0503 ", Some(1)));
        assert!(!roster.identifier_taken("24A31A0503", Some(3)));
        assert!(!roster.identifier_taken("24A31A0999", None));
    }

    #[test]
    fn test_search_matches_any_column() {
        let roster = sample_roster();
        let ids = |term: &str| roster.search(term).iter().map(|e| e.id).collect::<Vec<_>>();

        assert_eq!(ids("reddy"), vec![3, 7]);
        assert_eq!(ids("overdue"), vec![3]);
        assert_eq!(ids("mech"), vec![4]);
        assert_eq!(ids("").len(), 7);
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let json = serde_json::to_value(sample_roster()).unwrap();
        let first = &json[0];
        assert_eq!(first["identifier"], "24A31A0501");
        assert_eq!(first["paymentState"], "paid");
        assert_eq!(first["branch"], "CSE");
        assert_eq!(first["vehicleId"], 1);
    }
}
