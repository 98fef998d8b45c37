//! Roster editor errors

use thiserror::Error;

use super::table::RosterId;
use super::validation::ValidationError;
use crate::store::StoreError;

/// Errors returned by roster editor transitions
#[derive(Error, Debug)]
pub enum RosterError {
    /// Draft failed validation
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Another row holds the edit lock
    #[error("Please save or cancel the current edit first (row {editing} is being edited)")]
    EditInProgress {
        /// Row currently open
        editing: RosterId,
    },

    /// Row is not open for editing
    #[error("Row {0} is not being edited")]
    NotEditing(RosterId),

    /// No row with this id
    #[error("Roster entry {0} not found")]
    NotFound(RosterId),

    /// Deletion was declined
    #[error("Deletion of row {0} was not confirmed")]
    NotConfirmed(RosterId),

    /// Ids or roll numbers ran out
    #[error("No free roster id or roll number is left")]
    Exhausted,

    /// Storage failure
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}
