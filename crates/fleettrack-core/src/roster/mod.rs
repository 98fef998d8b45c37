//! Bus Pass Roster
//!
//! Passenger records with bus assignments, edited one row at a time.
//!
//! ## Flow
//!
//! `Viewing` → `begin_edit(id)` / `add_new()` → `EditingRow(id)` →
//! `save(id, draft)` or `cancel_edit()` → `Viewing`.
//! `delete(id, confirm)` is only available while viewing.

mod editor;
mod error;
mod table;
mod validation;

pub use editor::{generate_identifier, CancelOutcome, EditorState, RosterEditor};
pub use error::RosterError;
pub use table::{sample_roster, Branch, PaymentState, RosterEntry, RosterId, RosterTable, Section};
pub use validation::{
    validate, RosterDraft, RosterField, ValidationError, IDENTIFIER_MAX_LEN, IDENTIFIER_MIN_LEN,
};
