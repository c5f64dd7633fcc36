//! Core record store for CareNote, a personal counseling-record keeper.
//! Students, their counseling sessions, placement history and search live
//! here; shells only collect fields and render results.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod store;

pub use config::{CareConfig, ConfigError, ConfigOverrides};
pub use db::{DbError, DbResult};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::consulting::{
    Consulting, ConsultingId, ConsultingObject, ConsultingPatch, ConsultingType,
    ConsultingValidationError,
};
pub use model::history::HistoryEntry;
pub use model::student::{Sex, Student, StudentId, StudentPatch, StudentValidationError};
pub use model::InvalidLabel;
pub use repo::consulting_repo::{ConsultingRepository, SqliteConsultingRepository};
pub use repo::student_repo::{SqliteStudentRepository, StudentRepository};
pub use repo::{RepoError, RepoResult};
pub use search::filter::{
    search_consultings, search_students, ConsultingQuery, SearchError, SearchResult, StudentQuery,
};
pub use store::CareStore;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
