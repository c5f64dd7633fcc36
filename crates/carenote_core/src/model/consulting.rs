//! Counseling record domain model.
//!
//! # Responsibility
//! - Define one documented counseling session owned by a student.
//! - Own the persisted date-time format shared by storage and search.
//!
//! # Invariants
//! - `student_id` always names the owning student; it is not patchable.
//! - `date` has second precision and is stored as `YYYY-MM-DD HH:MM:SS`
//!   local time, so text comparison matches chronological order.

use crate::model::student::StudentId;
use crate::model::{non_blank, InvalidLabel};
use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Store-assigned counseling record identifier.
pub type ConsultingId = i64;

/// Persisted date-time layout for `consultings.consulting_date`.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How the session was held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsultingType {
    Phone,
    InPerson,
    Other,
}

impl ConsultingType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Phone => "전화",
            Self::InPerson => "대면",
            Self::Other => "기타",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value {
            "전화" => Some(Self::Phone),
            "대면" => Some(Self::InPerson),
            "기타" => Some(Self::Other),
            _ => None,
        }
    }
}

impl FromStr for ConsultingType {
    type Err = InvalidLabel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if let Some(kind) = Self::from_label(trimmed) {
            return Ok(kind);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "phone" => Ok(Self::Phone),
            "in-person" | "in_person" | "inperson" => Ok(Self::InPerson),
            "other" => Ok(Self::Other),
            _ => Err(InvalidLabel::new("consulting type", trimmed)),
        }
    }
}

impl Display for ConsultingType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Who the session was held with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsultingObject {
    /// The student themself.
    #[serde(rename = "self")]
    Own,
    Family,
    Teacher,
    Other,
}

impl ConsultingObject {
    pub fn label(self) -> &'static str {
        match self {
            Self::Own => "본인",
            Self::Family => "가족",
            Self::Teacher => "교사",
            Self::Other => "기타",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value {
            "본인" => Some(Self::Own),
            "가족" => Some(Self::Family),
            "교사" => Some(Self::Teacher),
            "기타" => Some(Self::Other),
            _ => None,
        }
    }
}

impl FromStr for ConsultingObject {
    type Err = InvalidLabel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if let Some(object) = Self::from_label(trimmed) {
            return Ok(object);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "self" | "student" => Ok(Self::Own),
            "family" => Ok(Self::Family),
            "teacher" => Ok(Self::Teacher),
            "other" => Ok(Self::Other),
            _ => Err(InvalidLabel::new("consulting object", trimmed)),
        }
    }
}

impl Display for ConsultingObject {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsultingValidationError {
    EmptyTitle,
}

impl Display for ConsultingValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "consulting title cannot be empty"),
        }
    }
}

impl Error for ConsultingValidationError {}

/// Persisted counseling record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consulting {
    pub id: Option<ConsultingId>,
    pub title: String,
    pub student_id: StudentId,
    /// Local wall-clock time of the session.
    pub date: NaiveDateTime,
    #[serde(rename = "type")]
    pub kind: Option<ConsultingType>,
    pub object: Option<ConsultingObject>,
    /// Problem and situation as stated by the client.
    pub content: Option<String>,
    /// Counselor's opinion and intervention.
    pub opinion: Option<String>,
    pub note: Option<String>,
}

impl Consulting {
    /// Creates an unsaved record dated now, in local time.
    pub fn new(title: impl Into<String>, student_id: StudentId) -> Self {
        Self {
            id: None,
            title: title.into(),
            student_id,
            date: local_now(),
            kind: None,
            object: None,
            content: None,
            opinion: None,
            note: None,
        }
    }

    /// Overrides the session time; sub-second precision is dropped.
    pub fn with_date(mut self, date: NaiveDateTime) -> Self {
        self.date = truncate_to_seconds(date);
        self
    }

    pub fn with_kind(mut self, kind: ConsultingType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_object(mut self, object: ConsultingObject) -> Self {
        self.object = Some(object);
        self
    }

    pub fn validate(&self) -> Result<(), ConsultingValidationError> {
        validate_title(&self.title)
    }

    /// Returns the copy that should be persisted: title trimmed, blank text
    /// fields dropped.
    pub fn normalized(&self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            date: truncate_to_seconds(self.date),
            content: non_blank(self.content.clone()),
            opinion: non_blank(self.opinion.clone()),
            note: non_blank(self.note.clone()),
            ..self.clone()
        }
    }

    pub fn apply_patch(&mut self, patch: &ConsultingPatch) {
        if let Some(title) = patch.title.as_ref() {
            self.title = title.trim().to_string();
        }
        if let Some(date) = patch.date {
            self.date = truncate_to_seconds(date);
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(object) = patch.object {
            self.object = object;
        }
        if let Some(content) = patch.content.as_ref() {
            self.content = non_blank(content.clone());
        }
        if let Some(opinion) = patch.opinion.as_ref() {
            self.opinion = non_blank(opinion.clone());
        }
        if let Some(note) = patch.note.as_ref() {
            self.note = non_blank(note.clone());
        }
    }
}

/// Sparse counseling record update. The owning student cannot be changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsultingPatch {
    pub title: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub kind: Option<Option<ConsultingType>>,
    pub object: Option<Option<ConsultingObject>>,
    pub content: Option<Option<String>>,
    pub opinion: Option<Option<String>>,
    pub note: Option<Option<String>>,
}

impl ConsultingPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.date.is_none()
            && self.kind.is_none()
            && self.object.is_none()
            && self.content.is_none()
            && self.opinion.is_none()
            && self.note.is_none()
    }

    pub fn validate(&self) -> Result<(), ConsultingValidationError> {
        match self.title.as_deref() {
            Some(title) => validate_title(title),
            None => Ok(()),
        }
    }
}

/// Current local time at second precision.
pub fn local_now() -> NaiveDateTime {
    truncate_to_seconds(Local::now().naive_local())
}

pub fn format_date_time(value: &NaiveDateTime) -> String {
    value.format(DATE_TIME_FORMAT).to_string()
}

/// Parses a persisted date-time, tolerating fractional seconds.
pub fn parse_date_time(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    NaiveDateTime::parse_from_str(trimmed, DATE_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(truncate_to_seconds)
}

fn truncate_to_seconds(value: NaiveDateTime) -> NaiveDateTime {
    value.with_nanosecond(0).unwrap_or(value)
}

fn validate_title(title: &str) -> Result<(), ConsultingValidationError> {
    if title.trim().is_empty() {
        return Err(ConsultingValidationError::EmptyTitle);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        format_date_time, parse_date_time, Consulting, ConsultingObject, ConsultingPatch,
        ConsultingType, ConsultingValidationError,
    };
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn new_record_is_dated_with_second_precision() {
        let record = Consulting::new("Friendship issue", 1);
        assert_eq!(record.date.nanosecond(), 0);
        assert!(record.id.is_none());
    }

    #[test]
    fn labels_parse_from_native_and_english_names() {
        assert_eq!("대면".parse::<ConsultingType>().unwrap(), ConsultingType::InPerson);
        assert_eq!("in-person".parse::<ConsultingType>().unwrap(), ConsultingType::InPerson);
        assert_eq!("self".parse::<ConsultingObject>().unwrap(), ConsultingObject::Own);
        assert_eq!("교사".parse::<ConsultingObject>().unwrap(), ConsultingObject::Teacher);
        let err = "email".parse::<ConsultingType>().unwrap_err();
        assert_eq!(err.field, "consulting type");
    }

    #[test]
    fn own_object_serializes_as_self() {
        assert_eq!(
            serde_json::to_string(&ConsultingObject::Own).unwrap(),
            "\"self\""
        );
        assert_eq!(ConsultingObject::Own.label(), "본인");
    }

    #[test]
    fn blank_title_fails_validation() {
        let record = Consulting::new("  ", 1);
        assert_eq!(record.validate(), Err(ConsultingValidationError::EmptyTitle));
        let patch = ConsultingPatch {
            title: Some(String::new()),
            ..ConsultingPatch::default()
        };
        assert_eq!(patch.validate(), Err(ConsultingValidationError::EmptyTitle));
    }

    #[test]
    fn date_time_text_roundtrips_and_accepts_fractions() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(9, 30, 5)
            .unwrap();
        assert_eq!(format_date_time(&date), "2024-01-15 09:30:05");
        assert_eq!(parse_date_time("2024-01-15 09:30:05"), Some(date));
        assert_eq!(parse_date_time("2024-01-15 09:30:05.250"), Some(date));
        assert_eq!(parse_date_time("15/01/2024"), None);
    }

    #[test]
    fn normalized_drops_blank_text_fields() {
        let mut record = Consulting::new(" Title ", 3);
        record.content = Some("   ".to_string());
        record.note = Some("keep".to_string());
        let normalized = record.normalized();
        assert_eq!(normalized.title, "Title");
        assert_eq!(normalized.content, None);
        assert_eq!(normalized.note.as_deref(), Some("keep"));
    }
}
