//! Grade/class placement history embedded in student rows.
//!
//! # Invariants
//! - History is append-only: entries are never removed or reordered.
//! - The persisted form is a JSON array of `{"grade": n, "class": n}`.
//! - An entry is recorded only when the stored grade and class are both set
//!   and the incoming patch changes that pairing.

use crate::model::student::StudentPatch;
use serde::{Deserialize, Serialize};

/// One past grade/class pairing of a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub grade: u8,
    pub class: u8,
}

impl HistoryEntry {
    pub fn new(grade: u8, class: u8) -> Self {
        Self { grade, class }
    }
}

/// Serializes history for the `student_history` column.
pub fn encode_history(history: &[HistoryEntry]) -> serde_json::Result<String> {
    serde_json::to_string(history)
}

/// Parses the `student_history` column.
///
/// `NULL` and blank values decode to an empty history.
pub fn decode_history(raw: Option<&str>) -> serde_json::Result<Vec<HistoryEntry>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(text) => serde_json::from_str(text),
    }
}

/// Returns the entry to append before `patch` is applied, if any.
pub fn snapshot_before_update(
    current_grade: Option<u8>,
    current_class: Option<u8>,
    patch: &StudentPatch,
) -> Option<HistoryEntry> {
    if patch.grade.is_none() && patch.class.is_none() {
        return None;
    }

    let (Some(grade), Some(class)) = (current_grade, current_class) else {
        return None;
    };

    let next_grade = patch.grade.unwrap_or(current_grade);
    let next_class = patch.class.unwrap_or(current_class);
    if next_grade == current_grade && next_class == current_class {
        return None;
    }

    Some(HistoryEntry::new(grade, class))
}
