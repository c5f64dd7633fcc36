//! Domain model for students and their counseling records.
//!
//! # Responsibility
//! - Define the two persisted entity shapes and their patch structures.
//! - Own field-domain validation so every write path shares one rule set.
//!
//! # Invariants
//! - Identifiers are assigned by the store and never reused.
//! - Enumerated fields are closed Rust enums; the native labels persisted in
//!   SQLite are produced and parsed only here.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod consulting;
pub mod history;
pub mod student;

/// Text does not name a member of an enumerated field domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidLabel {
    pub field: &'static str,
    pub value: String,
}

impl InvalidLabel {
    pub(crate) fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

impl Display for InvalidLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "`{}` is not a valid {}", self.value, self.field)
    }
}

impl Error for InvalidLabel {}

/// Trims text and maps blank input to `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|text| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
