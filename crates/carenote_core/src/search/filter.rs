//! SQL filter search for students and counseling records.
//!
//! # Responsibility
//! - Build parameterized queries from optional predicates.
//! - Return typed records decoded by the repository row parsers.
//!
//! # Invariants
//! - Omitted or blank predicates are not applied; the rest combine with AND.
//!   Non-blank text is matched as given, surrounding spaces included.
//! - Substring predicates are unanchored, case-insensitive for ASCII, and
//!   treat `%` and `_` in user input literally.
//! - Students come back name-ascending; records newest-first.

use crate::db::DbError;
use crate::model::consulting::{format_date_time, Consulting, ConsultingType};
use crate::model::student::Student;
use crate::repo::consulting_repo::{
    parse_consulting_row, CONSULTING_COLUMNS_SQL, CONSULTING_ORDER_SQL,
};
use crate::repo::student_repo::{parse_student_row, STUDENT_SELECT_SQL};
use crate::repo::RepoError;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type for search APIs.
pub type SearchResult<T> = Result<T, SearchError>;

/// Search-layer error for predicate validation, DB interaction and decoding.
#[derive(Debug)]
pub enum SearchError {
    /// Upper date bound is earlier than the lower one.
    InvalidDateRange {
        from: NaiveDateTime,
        to: NaiveDateTime,
    },
    Db(DbError),
    InvalidData(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDateRange { from, to } => write!(
                f,
                "end of date range {} is earlier than start {}",
                format_date_time(to),
                format_date_time(from)
            ),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid search row: {message}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidDateRange { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for SearchError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<RepoError> for SearchError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Db(err) => Self::Db(err),
            RepoError::InvalidData(message) => Self::InvalidData(message),
            other => Self::InvalidData(other.to_string()),
        }
    }
}

/// Student search predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentQuery {
    /// Substring of the student name.
    pub name: Option<String>,
    pub grade: Option<u8>,
    pub class: Option<u8>,
}

impl StudentQuery {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// Counseling record search predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsultingQuery {
    /// Substring of the record title.
    pub title: Option<String>,
    /// Substring of the owning student's name.
    pub student_name: Option<String>,
    pub kind: Option<ConsultingType>,
    /// Inclusive lower bound.
    pub from: Option<NaiveDateTime>,
    /// Inclusive upper bound.
    pub to: Option<NaiveDateTime>,
}

impl ConsultingQuery {
    /// Restricts results to whole calendar days, `start 00:00:00` through
    /// `end 23:59:59`.
    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.from = start.and_hms_opt(0, 0, 0);
        self.to = end.and_hms_opt(23, 59, 59);
        self
    }

    fn validate(&self) -> SearchResult<()> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if to < from {
                return Err(SearchError::InvalidDateRange { from, to });
            }
        }
        Ok(())
    }
}

/// Searches students. An empty query returns every student.
pub fn search_students(conn: &Connection, query: &StudentQuery) -> SearchResult<Vec<Student>> {
    let mut sql = format!("{STUDENT_SELECT_SQL} WHERE 1 = 1");
    let mut bind_values: Vec<Value> = Vec::new();

    if let Some(pattern) = like_pattern(query.name.as_deref()) {
        sql.push_str(" AND student_name LIKE ? ESCAPE '\\'");
        bind_values.push(Value::Text(pattern));
    }

    if let Some(grade) = query.grade {
        sql.push_str(" AND student_grade = ?");
        bind_values.push(Value::Integer(i64::from(grade)));
    }

    if let Some(class) = query.class {
        sql.push_str(" AND student_class = ?");
        bind_values.push(Value::Integer(i64::from(class)));
    }

    sql.push_str(" ORDER BY student_name ASC, student_id ASC;");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut students = Vec::new();

    while let Some(row) = rows.next()? {
        students.push(parse_student_row(row)?);
    }

    Ok(students)
}

/// Searches counseling records, joining students for the name predicate.
///
/// An empty query returns every record, newest first.
pub fn search_consultings(
    conn: &Connection,
    query: &ConsultingQuery,
) -> SearchResult<Vec<Consulting>> {
    query.validate()?;

    let mut sql = format!(
        "SELECT {CONSULTING_COLUMNS_SQL}
         FROM consultings c
         JOIN students s ON s.student_id = c.student_id
         WHERE 1 = 1"
    );
    let mut bind_values: Vec<Value> = Vec::new();

    if let Some(pattern) = like_pattern(query.title.as_deref()) {
        sql.push_str(" AND c.consulting_title LIKE ? ESCAPE '\\'");
        bind_values.push(Value::Text(pattern));
    }

    if let Some(pattern) = like_pattern(query.student_name.as_deref()) {
        sql.push_str(" AND s.student_name LIKE ? ESCAPE '\\'");
        bind_values.push(Value::Text(pattern));
    }

    if let Some(kind) = query.kind {
        sql.push_str(" AND c.consulting_type = ?");
        bind_values.push(Value::Text(kind.label().to_string()));
    }

    if let Some(from) = query.from.as_ref() {
        sql.push_str(" AND c.consulting_date >= ?");
        bind_values.push(Value::Text(format_date_time(&ceil_to_second(from))));
    }

    if let Some(to) = query.to.as_ref() {
        sql.push_str(" AND c.consulting_date <= ?");
        bind_values.push(Value::Text(format_date_time(to)));
    }

    sql.push_str(CONSULTING_ORDER_SQL);

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut consultings = Vec::new();

    while let Some(row) = rows.next()? {
        consultings.push(parse_consulting_row(row)?);
    }

    Ok(consultings)
}

/// Stored dates have whole seconds, so a fractional lower bound must round
/// up or the preceding second would match.
fn ceil_to_second(value: &NaiveDateTime) -> NaiveDateTime {
    let whole = value.with_nanosecond(0).unwrap_or(*value);
    if whole < *value {
        whole + TimeDelta::seconds(1)
    } else {
        whole
    }
}

fn like_pattern(text: Option<&str>) -> Option<String> {
    let text = text?;
    if text.trim().is_empty() {
        return None;
    }
    Some(format!("%{}%", escape_like(text)))
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::{ceil_to_second, escape_like, like_pattern, ConsultingQuery, SearchError};
    use chrono::NaiveDate;

    #[test]
    fn lower_bound_rounds_up_to_whole_second() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let exact = day.and_hms_opt(10, 0, 0).unwrap();
        let fractional = day.and_hms_milli_opt(10, 0, 0, 500).unwrap();
        assert_eq!(ceil_to_second(&exact), exact);
        assert_eq!(
            ceil_to_second(&fractional),
            day.and_hms_opt(10, 0, 1).unwrap()
        );
    }

    #[test]
    fn like_pattern_skips_blank_input() {
        assert_eq!(like_pattern(None), None);
        assert_eq!(like_pattern(Some("   ")), None);
        assert_eq!(like_pattern(Some("Kim")).as_deref(), Some("%Kim%"));
        assert_eq!(like_pattern(Some(" Su")).as_deref(), Some("% Su%"));
    }

    #[test]
    fn escape_like_protects_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn date_range_covers_whole_days() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let query = ConsultingQuery::default().with_date_range(start, end);
        assert_eq!(query.from, start.and_hms_opt(0, 0, 0));
        assert_eq!(query.to, end.and_hms_opt(23, 59, 59));
        assert!(query.validate().is_ok());
    }

    #[test]
    fn inverted_date_range_is_rejected() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let query = ConsultingQuery::default().with_date_range(start, end);
        assert!(matches!(
            query.validate(),
            Err(SearchError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn single_day_range_is_valid() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let query = ConsultingQuery::default().with_date_range(day, day);
        assert!(query.validate().is_ok());
    }
}
