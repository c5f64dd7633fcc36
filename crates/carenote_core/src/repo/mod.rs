//! Repository layer for students and counseling records.
//!
//! # Responsibility
//! - Define CRUD contracts per entity and their SQLite implementations.
//! - Map SQLite constraint failures to semantic errors.
//!
//! # Invariants
//! - Write paths validate payloads before any SQL mutation.
//! - Multi-statement writes run in one immediate transaction.
//! - `update`/`delete` on a missing id return a not-found error instead of
//!   silently succeeding.
//! - Cascade from student to counseling records is left to the foreign key.

use crate::db::DbError;
use crate::model::consulting::{ConsultingId, ConsultingValidationError};
use crate::model::student::{StudentId, StudentValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod consulting_repo;
pub mod student_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for record persistence and lookup.
#[derive(Debug)]
pub enum RepoError {
    StudentValidation(StudentValidationError),
    ConsultingValidation(ConsultingValidationError),
    StudentNotFound(StudentId),
    ConsultingNotFound(ConsultingId),
    Db(DbError),
    InvalidData(String),
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::StudentNotFound(_) | Self::ConsultingNotFound(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::StudentValidation(_) | Self::ConsultingValidation(_)
        )
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StudentValidation(err) => write!(f, "{err}"),
            Self::ConsultingValidation(err) => write!(f, "{err}"),
            Self::StudentNotFound(id) => write!(f, "student not found: {id}"),
            Self::ConsultingNotFound(id) => write!(f, "consulting record not found: {id}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StudentValidation(err) => Some(err),
            Self::ConsultingValidation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::StudentNotFound(_) | Self::ConsultingNotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<StudentValidationError> for RepoError {
    fn from(value: StudentValidationError) -> Self {
        Self::StudentValidation(value)
    }
}

impl From<ConsultingValidationError> for RepoError {
    fn from(value: ConsultingValidationError) -> Self {
        Self::ConsultingValidation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Converts a nullable integer column into a small domain value.
pub(crate) fn small_int_column(
    value: Option<i64>,
    column: &'static str,
) -> RepoResult<Option<u8>> {
    value
        .map(|raw| {
            u8::try_from(raw).map_err(|_| {
                RepoError::InvalidData(format!("invalid value `{raw}` in {column}"))
            })
        })
        .transpose()
}

/// Decodes a nullable label column with the given parser.
pub(crate) fn label_column<T>(
    value: Option<String>,
    column: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> RepoResult<Option<T>> {
    value
        .map(|label| {
            parse(&label).ok_or_else(|| {
                RepoError::InvalidData(format!("invalid label `{label}` in {column}"))
            })
        })
        .transpose()
}
