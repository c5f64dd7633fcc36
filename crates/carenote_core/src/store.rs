//! Shared record-store handle.
//!
//! # Responsibility
//! - Own the single SQLite connection for the process lifetime.
//! - Expose the student/consulting CRUD and search surface to shells.
//!
//! # Invariants
//! - The connection is opened and migrated once, then serialized behind a
//!   mutex; each call holds the lock only for its own duration.
//! - Every call emits one `event=<op> module=store` line with status and
//!   duration.

use crate::config::CareConfig;
use crate::db::{open_db, open_db_in_memory, DbError, DbResult};
use crate::model::consulting::{Consulting, ConsultingId, ConsultingPatch};
use crate::model::student::{Student, StudentId, StudentPatch};
use crate::repo::consulting_repo::{ConsultingRepository, SqliteConsultingRepository};
use crate::repo::student_repo::{SqliteStudentRepository, StudentRepository};
use crate::repo::RepoResult;
use crate::search::filter::{
    search_consultings, search_students, ConsultingQuery, SearchResult, StudentQuery,
};
use log::{debug, warn};
use rusqlite::Connection;
use std::fmt::Display;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Process-wide handle to the CareNote database.
pub struct CareStore {
    conn: Mutex<Connection>,
}

impl CareStore {
    /// Opens (creating when missing) and migrates the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    pub fn from_config(config: &CareConfig) -> DbResult<Self> {
        Self::open(&config.db_path)
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Closes the underlying connection, surfacing any close failure.
    pub fn close(self) -> DbResult<()> {
        let conn = self
            .conn
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        conn.close().map_err(|(_, err)| DbError::Sqlite(err))
    }

    pub fn create_student(&self, student: &Student) -> RepoResult<StudentId> {
        self.run("student_create", |conn| {
            SqliteStudentRepository::new(conn).create_student(student)
        })
    }

    pub fn get_student(&self, id: StudentId) -> RepoResult<Option<Student>> {
        self.run("student_get", |conn| {
            SqliteStudentRepository::new(conn).get_student(id)
        })
    }

    pub fn list_students(&self) -> RepoResult<Vec<Student>> {
        self.run("student_list", |conn| {
            SqliteStudentRepository::new(conn).list_students()
        })
    }

    /// Applies `patch`, recording placement history when grade/class change.
    pub fn update_student(&self, id: StudentId, patch: &StudentPatch) -> RepoResult<Student> {
        self.run("student_update", |conn| {
            SqliteStudentRepository::new(conn).update_student(id, patch)
        })
    }

    /// Deletes the student and, through the foreign key, its records.
    pub fn delete_student(&self, id: StudentId) -> RepoResult<()> {
        self.run("student_delete", |conn| {
            SqliteStudentRepository::new(conn).delete_student(id)
        })
    }

    pub fn search_students(&self, query: &StudentQuery) -> SearchResult<Vec<Student>> {
        self.run("student_search", |conn| search_students(conn, query))
    }

    pub fn create_consulting(&self, consulting: &Consulting) -> RepoResult<ConsultingId> {
        self.run("consulting_create", |conn| {
            SqliteConsultingRepository::new(conn).create_consulting(consulting)
        })
    }

    pub fn get_consulting(&self, id: ConsultingId) -> RepoResult<Option<Consulting>> {
        self.run("consulting_get", |conn| {
            SqliteConsultingRepository::new(conn).get_consulting(id)
        })
    }

    pub fn list_consultings(&self) -> RepoResult<Vec<Consulting>> {
        self.run("consulting_list", |conn| {
            SqliteConsultingRepository::new(conn).list_consultings()
        })
    }

    pub fn list_consultings_for_student(
        &self,
        student_id: StudentId,
    ) -> RepoResult<Vec<Consulting>> {
        self.run("consulting_list_student", |conn| {
            SqliteConsultingRepository::new(conn).list_consultings_for_student(student_id)
        })
    }

    pub fn update_consulting(
        &self,
        id: ConsultingId,
        patch: &ConsultingPatch,
    ) -> RepoResult<Consulting> {
        self.run("consulting_update", |conn| {
            SqliteConsultingRepository::new(conn).update_consulting(id, patch)
        })
    }

    pub fn delete_consulting(&self, id: ConsultingId) -> RepoResult<()> {
        self.run("consulting_delete", |conn| {
            SqliteConsultingRepository::new(conn).delete_consulting(id)
        })
    }

    pub fn search_consultings(&self, query: &ConsultingQuery) -> SearchResult<Vec<Consulting>> {
        self.run("consulting_search", |conn| search_consultings(conn, query))
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // Poisoning is ignored: an interrupted transaction rolls back on drop.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run<T, E: Display>(
        &self,
        event: &'static str,
        op: impl FnOnce(&Connection) -> Result<T, E>,
    ) -> Result<T, E> {
        let started_at = Instant::now();
        let conn = self.lock();
        let result = op(&*conn);
        drop(conn);

        match &result {
            Ok(_) => debug!(
                "event={} module=store status=ok duration_ms={}",
                event,
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event={} module=store status=error duration_ms={} error={}",
                event,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }
}
