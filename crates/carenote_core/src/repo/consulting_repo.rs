//! Counseling record repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over the `consultings` table.
//! - Translate foreign-key failures into `StudentNotFound`.
//!
//! # Invariants
//! - Every row references an existing student; SQLite enforces it on insert.
//! - Lists are ordered by `consulting_date DESC, consulting_id DESC`.
//! - The owning student of a record is never rewritten.

use crate::model::consulting::{
    format_date_time, parse_date_time, Consulting, ConsultingId, ConsultingObject,
    ConsultingPatch, ConsultingType,
};
use crate::model::student::StudentId;
use crate::repo::student_repo::student_exists;
use crate::repo::{label_column, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

pub(crate) const CONSULTING_COLUMNS_SQL: &str = "
    c.consulting_id AS consulting_id,
    c.consulting_title AS consulting_title,
    c.student_id AS student_id,
    c.consulting_date AS consulting_date,
    c.consulting_type AS consulting_type,
    c.consulting_object AS consulting_object,
    c.consulting_content AS consulting_content,
    c.consulting_opinion AS consulting_opinion,
    c.consulting_note AS consulting_note";

pub(crate) const CONSULTING_ORDER_SQL: &str =
    " ORDER BY c.consulting_date DESC, c.consulting_id DESC";

/// Repository interface for counseling record CRUD operations.
pub trait ConsultingRepository {
    /// Inserts a record; fails with `StudentNotFound` for a dangling owner.
    fn create_consulting(&self, consulting: &Consulting) -> RepoResult<ConsultingId>;
    fn get_consulting(&self, id: ConsultingId) -> RepoResult<Option<Consulting>>;
    /// Lists every record, newest first.
    fn list_consultings(&self) -> RepoResult<Vec<Consulting>>;
    /// Lists the records owned by one student, newest first.
    fn list_consultings_for_student(&self, student_id: StudentId)
        -> RepoResult<Vec<Consulting>>;
    fn update_consulting(
        &self,
        id: ConsultingId,
        patch: &ConsultingPatch,
    ) -> RepoResult<Consulting>;
    fn delete_consulting(&self, id: ConsultingId) -> RepoResult<()>;
}

/// SQLite-backed counseling record repository.
pub struct SqliteConsultingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteConsultingRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ConsultingRepository for SqliteConsultingRepository<'_> {
    fn create_consulting(&self, consulting: &Consulting) -> RepoResult<ConsultingId> {
        consulting.validate()?;
        let consulting = consulting.normalized();

        self.conn
            .execute(
                "INSERT INTO consultings (
                    consulting_title,
                    consulting_date,
                    student_id,
                    consulting_type,
                    consulting_object,
                    consulting_content,
                    consulting_opinion,
                    consulting_note
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
                params![
                    consulting.title.as_str(),
                    format_date_time(&consulting.date),
                    consulting.student_id,
                    consulting.kind.map(ConsultingType::label),
                    consulting.object.map(ConsultingObject::label),
                    consulting.content.as_deref(),
                    consulting.opinion.as_deref(),
                    consulting.note.as_deref(),
                ],
            )
            .map_err(|err| map_insert_error(err, consulting.student_id))?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_consulting(&self, id: ConsultingId) -> RepoResult<Option<Consulting>> {
        load_consulting(self.conn, id)
    }

    fn list_consultings(&self) -> RepoResult<Vec<Consulting>> {
        let sql =
            format!("SELECT {CONSULTING_COLUMNS_SQL} FROM consultings c{CONSULTING_ORDER_SQL};");
        collect_consultings(self.conn, &sql, params![])
    }

    fn list_consultings_for_student(
        &self,
        student_id: StudentId,
    ) -> RepoResult<Vec<Consulting>> {
        if !student_exists(self.conn, student_id)? {
            return Err(RepoError::StudentNotFound(student_id));
        }

        let sql = format!(
            "SELECT {CONSULTING_COLUMNS_SQL}
             FROM consultings c
             WHERE c.student_id = ?1{CONSULTING_ORDER_SQL};"
        );
        collect_consultings(self.conn, &sql, [student_id])
    }

    fn update_consulting(
        &self,
        id: ConsultingId,
        patch: &ConsultingPatch,
    ) -> RepoResult<Consulting> {
        patch.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut consulting = load_consulting(&tx, id)?.ok_or(RepoError::ConsultingNotFound(id))?;
        if patch.is_empty() {
            return Ok(consulting);
        }

        consulting.apply_patch(patch);
        consulting.validate()?;

        tx.execute(
            "UPDATE consultings
             SET
                consulting_title = ?1,
                consulting_date = ?2,
                consulting_type = ?3,
                consulting_object = ?4,
                consulting_content = ?5,
                consulting_opinion = ?6,
                consulting_note = ?7
             WHERE consulting_id = ?8;",
            params![
                consulting.title.as_str(),
                format_date_time(&consulting.date),
                consulting.kind.map(ConsultingType::label),
                consulting.object.map(ConsultingObject::label),
                consulting.content.as_deref(),
                consulting.opinion.as_deref(),
                consulting.note.as_deref(),
                id,
            ],
        )?;
        tx.commit()?;

        Ok(consulting)
    }

    fn delete_consulting(&self, id: ConsultingId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM consultings WHERE consulting_id = ?1;", [id])?;

        if changed == 0 {
            return Err(RepoError::ConsultingNotFound(id));
        }

        Ok(())
    }
}

fn load_consulting(conn: &Connection, id: ConsultingId) -> RepoResult<Option<Consulting>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONSULTING_COLUMNS_SQL} FROM consultings c WHERE c.consulting_id = ?1;"
    ))?;
    let row = stmt
        .query_row([id], |row| Ok(parse_consulting_row(row)))
        .optional()?;
    row.transpose()
}

fn collect_consultings<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> RepoResult<Vec<Consulting>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut consultings = Vec::new();

    while let Some(row) = rows.next()? {
        consultings.push(parse_consulting_row(row)?);
    }

    Ok(consultings)
}

pub(crate) fn parse_consulting_row(row: &Row<'_>) -> RepoResult<Consulting> {
    let date_text: String = row.get("consulting_date")?;
    let date = parse_date_time(&date_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid date-time `{date_text}` in consultings.consulting_date"
        ))
    })?;

    let consulting = Consulting {
        id: Some(row.get("consulting_id")?),
        title: row.get("consulting_title")?,
        student_id: row.get("student_id")?,
        date,
        kind: label_column(
            row.get("consulting_type")?,
            "consultings.consulting_type",
            ConsultingType::from_label,
        )?,
        object: label_column(
            row.get("consulting_object")?,
            "consultings.consulting_object",
            ConsultingObject::from_label,
        )?,
        content: row.get("consulting_content")?,
        opinion: row.get("consulting_opinion")?,
        note: row.get("consulting_note")?,
    };
    consulting.validate().map_err(|err| {
        RepoError::InvalidData(format!("consulting row fails validation: {err}"))
    })?;
    Ok(consulting)
}

fn map_insert_error(err: rusqlite::Error, student_id: StudentId) -> RepoError {
    if is_foreign_key_violation(&err) {
        return RepoError::StudentNotFound(student_id);
    }
    err.into()
}

fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => {
            failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
        }
        _ => false,
    }
}
