//! Roster editor state machine
//!
//! One row at a time: the table is either being viewed or exactly one row is
//! open for editing. The lock lives in this state, not in a mutex.

use chrono::{Datelike, NaiveDate, Utc};
use regex::Regex;
use std::sync::OnceLock;

use super::error::RosterError;
use super::table::{Branch, PaymentState, RosterEntry, RosterId, RosterTable, Section};
use super::validation::{validate, RosterDraft};
use crate::store::EntityStore;

/// Editor state for the roster table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorState {
    /// No row is editable
    #[default]
    Viewing,
    /// The given row is open for editing
    EditingRow(RosterId),
}

/// What `cancel_edit` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Nothing was being edited
    Idle,
    /// The edit was discarded; the stored row stands
    Discarded(RosterId),
    /// A never-completed new row was removed
    Removed(RosterEntry),
}

/// Single-row edit lock over the roster table
#[derive(Debug, Default)]
pub struct RosterEditor {
    state: EditorState,
}

impl RosterEditor {
    /// Start in `Viewing`
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> EditorState {
        self.state
    }

    /// Row being edited, if any
    pub fn editing(&self) -> Option<RosterId> {
        match self.state {
            EditorState::Viewing => None,
            EditorState::EditingRow(id) => Some(id),
        }
    }

    fn ensure_viewing(&self) -> Result<(), RosterError> {
        match self.state {
            EditorState::Viewing => Ok(()),
            EditorState::EditingRow(editing) => Err(RosterError::EditInProgress { editing }),
        }
    }

    /// Open row `id` for editing and return its current values.
    ///
    /// Re-opening the row already being edited is allowed.
    pub fn begin_edit(
        &mut self,
        store: &EntityStore,
        id: RosterId,
    ) -> Result<RosterDraft, RosterError> {
        if self.state != EditorState::EditingRow(id) {
            self.ensure_viewing()?;
        }
        let entry = store.roster().get(id).ok_or(RosterError::NotFound(id))?;

        self.state = EditorState::EditingRow(id);
        tracing::debug!(id, "roster row opened for editing");
        Ok(RosterDraft::from(entry))
    }

    /// Insert a blank row at the head of the table and open it for editing
    pub fn add_new(&mut self, store: &mut EntityStore) -> Result<RosterEntry, RosterError> {
        self.add_new_on(store, Utc::now().date_naive())
    }

    /// [`add_new`](Self::add_new) with an explicit date for the roll-number year
    pub fn add_new_on(
        &mut self,
        store: &mut EntityStore,
        today: NaiveDate,
    ) -> Result<RosterEntry, RosterError> {
        self.ensure_viewing()?;

        let id = store
            .roster()
            .max_id()
            .checked_add(1)
            .ok_or(RosterError::Exhausted)?;
        let entry = RosterEntry {
            id,
            identifier: generate_identifier(store.roster(), today.year())?,
            name: String::new(),
            branch: Branch::Cse,
            section: Section::A,
            payment_state: PaymentState::Pending,
            vehicle_id: 1,
        };

        store.roster_mut().insert_head(entry.clone());
        if let Err(e) = store.persist_roster() {
            store.roster_mut().remove(id);
            return Err(e.into());
        }

        self.state = EditorState::EditingRow(id);
        tracing::info!(id, identifier = %entry.identifier, "roster row added");
        Ok(entry)
    }

    /// Validate `draft` and write it over row `id`.
    ///
    /// On any failure the table and the stored snapshot are unchanged and the
    /// row stays open.
    pub fn save(
        &mut self,
        store: &mut EntityStore,
        id: RosterId,
        draft: &RosterDraft,
    ) -> Result<RosterEntry, RosterError> {
        match self.state {
            EditorState::EditingRow(editing) if editing == id => {}
            EditorState::EditingRow(editing) => {
                return Err(RosterError::EditInProgress { editing });
            }
            EditorState::Viewing => return Err(RosterError::NotEditing(id)),
        }

        if store.roster().get(id).is_none() {
            return Err(RosterError::NotFound(id));
        }
        let entry = validate(draft, store.roster(), id)?;

        let previous = store
            .roster_mut()
            .replace(entry.clone())
            .ok_or(RosterError::NotFound(id))?;
        if let Err(e) = store.persist_roster() {
            store.roster_mut().replace(previous);
            return Err(e.into());
        }

        self.state = EditorState::Viewing;
        tracing::info!(id, identifier = %entry.identifier, "roster row saved");
        Ok(entry)
    }

    /// Leave edit mode. A row whose name is still blank is removed.
    ///
    /// If removing that row cannot be persisted, the row is put back and stays
    /// open.
    pub fn cancel_edit(&mut self, store: &mut EntityStore) -> Result<CancelOutcome, RosterError> {
        let EditorState::EditingRow(id) = self.state else {
            return Ok(CancelOutcome::Idle);
        };

        let blank = store
            .roster()
            .get(id)
            .is_some_and(|entry| entry.name.trim().is_empty());
        if !blank {
            self.state = EditorState::Viewing;
            return Ok(CancelOutcome::Discarded(id));
        }

        let before = store.roster().clone();
        let Some(removed) = store.roster_mut().remove(id) else {
            self.state = EditorState::Viewing;
            return Ok(CancelOutcome::Discarded(id));
        };
        if let Err(e) = store.persist_roster() {
            *store.roster_mut() = before;
            return Err(e.into());
        }

        self.state = EditorState::Viewing;
        tracing::debug!(id, "blank roster row dropped on cancel");
        Ok(CancelOutcome::Removed(removed))
    }

    /// Remove row `id` after `confirm` approves it. Only allowed while viewing.
    pub fn delete<F>(
        &mut self,
        store: &mut EntityStore,
        id: RosterId,
        confirm: F,
    ) -> Result<RosterEntry, RosterError>
    where
        F: FnOnce(&RosterEntry) -> bool,
    {
        self.ensure_viewing()?;

        let entry = store.roster().get(id).ok_or(RosterError::NotFound(id))?;
        if !confirm(entry) {
            return Err(RosterError::NotConfirmed(id));
        }

        let before = store.roster().clone();
        let removed = store
            .roster_mut()
            .remove(id)
            .ok_or(RosterError::NotFound(id))?;
        if let Err(e) = store.persist_roster() {
            *store.roster_mut() = before;
            return Err(e.into());
        }

        tracing::info!(id, identifier = %removed.identifier, "roster row deleted");
        Ok(removed)
    }
}

fn generated_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)^\d{2}STUD(\d+)$").ok())
        .as_ref()
}

/// Next generated roll number, `{yy}STUD{seq:03}`.
///
/// `seq` continues past both the highest row id and the highest sequence among
/// earlier generated roll numbers, then skips anything already taken.
/// Fails with [`RosterError::Exhausted`] once the sequence cannot grow.
pub fn generate_identifier(table: &RosterTable, year: i32) -> Result<String, RosterError> {
    let highest_generated = generated_pattern()
        .map(|pattern| {
            table
                .entries()
                .iter()
                .filter_map(|e| pattern.captures(e.identifier.trim()))
                .filter_map(|caps| caps.get(1)?.as_str().parse::<u64>().ok())
                .max()
                .unwrap_or(0)
        })
        .unwrap_or(0);

    let yy = year.rem_euclid(100);
    let mut seq = u64::from(table.max_id()).max(highest_generated);
    loop {
        seq = seq.checked_add(1).ok_or(RosterError::Exhausted)?;
        let candidate = format!("{:02}STUD{:03}", yy, seq);
        if !table.identifier_taken(&candidate, None) {
            return Ok(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::sample_roster;

    #[test]
    fn test_generate_after_sample_roster() {
        assert_eq!(generate_identifier(&sample_roster(), 2026).unwrap(), "26STUD008");
    }

    #[test]
    fn test_generate_continues_generated_sequence() {
        let mut table = sample_roster();
        table.insert_head(RosterEntry {
            id: 8,
            identifier: "25stud041".to_string(),
            name: "Old".to_string(),
            branch: Branch::It,
            section: Section::B,
            payment_state: PaymentState::Paid,
            vehicle_id: 3,
        });
        assert_eq!(generate_identifier(&table, 2026).unwrap(), "26STUD042");
    }

    #[test]
    fn test_generate_ignores_hand_typed_identifiers() {
        let mut table = sample_roster();
        table.insert_head(RosterEntry {
            id: 8,
            identifier: "26-STUD-90".to_string(),
            name: "A".to_string(),
            branch: Branch::Cse,
            section: Section::A,
            payment_state: PaymentState::Paid,
            vehicle_id: 1,
        });
        assert_eq!(generate_identifier(&table, 2026).unwrap(), "26STUD009");
    }

    #[test]
    fn test_generate_on_empty_table() {
        assert_eq!(
            generate_identifier(&RosterTable::default(), 2100).unwrap(),
            "00STUD001"
        );
    }

    fn generated_row(identifier: &str) -> RosterEntry {
        RosterEntry {
            id: 8,
            identifier: identifier.to_string(),
            name: "Late".to_string(),
            branch: Branch::Mech,
            section: Section::C,
            payment_state: PaymentState::Pending,
            vehicle_id: 4,
        }
    }

    #[test]
    fn test_generate_past_u32_suffix() {
        let mut table = sample_roster();
        table.insert_head(generated_row("26STUD4294967295"));
        assert_eq!(
            generate_identifier(&table, 2026).unwrap(),
            "26STUD4294967296"
        );
    }

    #[test]
    fn test_generate_exhausted_sequence_is_an_error() {
        let mut table = sample_roster();
        table.insert_head(generated_row(&format!("26STUD{}", u64::MAX)));
        assert!(matches!(
            generate_identifier(&table, 2026),
            Err(RosterError::Exhausted)
        ));
    }
}
