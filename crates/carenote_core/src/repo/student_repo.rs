//! Student repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over the `students` table.
//! - Record placement history as part of student updates.
//!
//! # Invariants
//! - `update_student` reads, appends history and writes inside one
//!   immediate transaction, so history and the new placement land together.
//! - `delete_student` relies on `ON DELETE CASCADE`; it never deletes
//!   counseling rows itself.
//! - Read paths reject rows that violate model validation.

use crate::model::history::{decode_history, encode_history, snapshot_before_update};
use crate::model::student::{Sex, Student, StudentId, StudentPatch};
use crate::repo::{label_column, small_int_column, RepoError, RepoResult};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

pub(crate) const STUDENT_SELECT_SQL: &str = "SELECT
    student_id,
    student_name,
    student_phone,
    student_grade,
    student_class,
    student_sex,
    student_history
FROM students";

/// Repository interface for student CRUD operations.
pub trait StudentRepository {
    fn create_student(&self, student: &Student) -> RepoResult<StudentId>;
    fn get_student(&self, id: StudentId) -> RepoResult<Option<Student>>;
    /// Lists every student ordered by name, then id.
    fn list_students(&self) -> RepoResult<Vec<Student>>;
    /// Applies `patch` and returns the stored record after the update.
    fn update_student(&self, id: StudentId, patch: &StudentPatch) -> RepoResult<Student>;
    /// Deletes the student together with all of its counseling records.
    fn delete_student(&self, id: StudentId) -> RepoResult<()>;
}

/// SQLite-backed student repository.
pub struct SqliteStudentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStudentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl StudentRepository for SqliteStudentRepository<'_> {
    fn create_student(&self, student: &Student) -> RepoResult<StudentId> {
        student.validate()?;
        let student = student.normalized();
        let history = encode_history(&student.history)
            .map_err(|err| RepoError::InvalidData(format!("cannot encode history: {err}")))?;

        self.conn.execute(
            "INSERT INTO students (
                student_name,
                student_phone,
                student_grade,
                student_class,
                student_sex,
                student_history
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                student.name.as_str(),
                student.phone.as_deref(),
                student.grade,
                student.class,
                student.sex.map(Sex::label),
                history,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_student(&self, id: StudentId) -> RepoResult<Option<Student>> {
        load_student(self.conn, id)
    }

    fn list_students(&self) -> RepoResult<Vec<Student>> {
        let mut stmt = self.conn.prepare(&format!(
            "{STUDENT_SELECT_SQL} ORDER BY student_name ASC, student_id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut students = Vec::new();

        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row)?);
        }

        Ok(students)
    }

    fn update_student(&self, id: StudentId, patch: &StudentPatch) -> RepoResult<Student> {
        patch.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut student = load_student(&tx, id)?.ok_or(RepoError::StudentNotFound(id))?;
        if patch.is_empty() {
            return Ok(student);
        }

        let appended = snapshot_before_update(student.grade, student.class, patch);
        if let Some(entry) = appended {
            student.history.push(entry);
        }
        student.apply_patch(patch);
        student.validate()?;

        let history = encode_history(&student.history)
            .map_err(|err| RepoError::InvalidData(format!("cannot encode history: {err}")))?;
        tx.execute(
            "UPDATE students
             SET
                student_name = ?1,
                student_phone = ?2,
                student_grade = ?3,
                student_class = ?4,
                student_sex = ?5,
                student_history = ?6
             WHERE student_id = ?7;",
            params![
                student.name.as_str(),
                student.phone.as_deref(),
                student.grade,
                student.class,
                student.sex.map(Sex::label),
                history,
                id,
            ],
        )?;
        tx.commit()?;

        debug!(
            "event=student_history module=repo status=ok student_id={} appended={} entries={}",
            id,
            appended.is_some(),
            student.history.len()
        );
        Ok(student)
    }

    fn delete_student(&self, id: StudentId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let owned: i64 = tx.query_row(
            "SELECT COUNT(*) FROM consultings WHERE student_id = ?1;",
            [id],
            |row| row.get(0),
        )?;

        let changed = tx.execute("DELETE FROM students WHERE student_id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::StudentNotFound(id));
        }
        tx.commit()?;

        debug!(
            "event=student_delete module=repo status=ok student_id={} cascaded_consultings={}",
            id, owned
        );
        Ok(())
    }
}

/// Returns whether a student row exists.
pub fn student_exists(conn: &Connection, id: StudentId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM students WHERE student_id = ?1);",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn load_student(conn: &Connection, id: StudentId) -> RepoResult<Option<Student>> {
    let mut stmt = conn.prepare(&format!("{STUDENT_SELECT_SQL} WHERE student_id = ?1;"))?;
    let row = stmt
        .query_row([id], |row| Ok(parse_student_row(row)))
        .optional()?;
    row.transpose()
}

pub(crate) fn parse_student_row(row: &Row<'_>) -> RepoResult<Student> {
    let grade = small_int_column(row.get("student_grade")?, "students.student_grade")?;
    let class = small_int_column(row.get("student_class")?, "students.student_class")?;
    let sex = label_column(row.get("student_sex")?, "students.student_sex", Sex::from_label)?;

    let raw_history: Option<String> = row.get("student_history")?;
    let history = decode_history(raw_history.as_deref()).map_err(|err| {
        RepoError::InvalidData(format!("invalid json in students.student_history: {err}"))
    })?;

    let student = Student {
        id: Some(row.get("student_id")?),
        name: row.get("student_name")?,
        phone: row.get("student_phone")?,
        grade,
        class,
        sex,
        history,
    };
    student.validate().map_err(|err| {
        RepoError::InvalidData(format!("student row fails validation: {err}"))
    })?;
    Ok(student)
}
