//! Student domain model.
//!
//! # Responsibility
//! - Define the tracked person record and its sparse update patch.
//! - Validate grade/class domains and the required name.
//!
//! # Invariants
//! - `id` is `None` until the store assigns one and never changes afterwards.
//! - `grade` lies in `1..=6` and `class` in `1..=4` whenever set.
//! - `history` is only ever extended by the store.

use crate::model::history::HistoryEntry;
use crate::model::{non_blank, InvalidLabel};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Store-assigned student identifier.
pub type StudentId = i64;

/// Valid school grades.
pub const GRADE_RANGE: RangeInclusive<u8> = 1..=6;
/// Valid class numbers within a grade.
pub const CLASS_RANGE: RangeInclusive<u8> = 1..=4;

/// Student sex, persisted with the institution's native labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Native label stored in `students.student_sex`.
    pub fn label(self) -> &'static str {
        match self {
            Self::Male => "남",
            Self::Female => "여",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value {
            "남" => Some(Self::Male),
            "여" => Some(Self::Female),
            _ => None,
        }
    }
}

impl FromStr for Sex {
    type Err = InvalidLabel;

    /// Accepts the native label or the English name.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if let Some(sex) = Self::from_label(trimmed) {
            return Ok(sex);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            _ => Err(InvalidLabel::new("sex", trimmed)),
        }
    }
}

impl Display for Sex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Validation failure for student payloads and patches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentValidationError {
    EmptyName,
    GradeOutOfRange(u8),
    ClassOutOfRange(u8),
}

impl Display for StudentValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "student name cannot be empty"),
            Self::GradeOutOfRange(grade) => write!(
                f,
                "grade {grade} is outside {}..={}",
                GRADE_RANGE.start(),
                GRADE_RANGE.end()
            ),
            Self::ClassOutOfRange(class) => write!(
                f,
                "class {class} is outside {}..={}",
                CLASS_RANGE.start(),
                CLASS_RANGE.end()
            ),
        }
    }
}

impl Error for StudentValidationError {}

/// Persisted student record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: Option<StudentId>,
    pub name: String,
    pub phone: Option<String>,
    pub grade: Option<u8>,
    pub class: Option<u8>,
    pub sex: Option<Sex>,
    /// Previous grade/class pairings, oldest first.
    pub history: Vec<HistoryEntry>,
}

impl Student {
    /// Creates an unsaved student with only the required name set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            phone: None,
            grade: None,
            class: None,
            sex: None,
            history: Vec::new(),
        }
    }

    pub fn with_placement(mut self, grade: Option<u8>, class: Option<u8>) -> Self {
        self.grade = grade;
        self.class = class;
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_sex(mut self, sex: Sex) -> Self {
        self.sex = Some(sex);
        self
    }

    /// Checks the required name and the grade/class domains.
    pub fn validate(&self) -> Result<(), StudentValidationError> {
        validate_name(&self.name)?;
        validate_grade(self.grade)?;
        validate_class(self.class)?;
        Ok(())
    }

    /// Returns the copy that should be persisted: text trimmed, blank phone
    /// dropped.
    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            phone: non_blank(self.phone.clone()),
            ..self.clone()
        }
    }

    /// Applies the supplied patch fields in place. History is not touched.
    pub fn apply_patch(&mut self, patch: &StudentPatch) {
        if let Some(name) = patch.name.as_ref() {
            self.name = name.trim().to_string();
        }
        if let Some(phone) = patch.phone.as_ref() {
            self.phone = non_blank(phone.clone());
        }
        if let Some(grade) = patch.grade {
            self.grade = grade;
        }
        if let Some(class) = patch.class {
            self.class = class;
        }
        if let Some(sex) = patch.sex {
            self.sex = sex;
        }
    }
}

/// Sparse student update.
///
/// Outer `None` leaves a field unchanged; `Some(None)` clears a nullable
/// field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub phone: Option<Option<String>>,
    pub grade: Option<Option<u8>>,
    pub class: Option<Option<u8>>,
    pub sex: Option<Option<Sex>>,
}

impl StudentPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.phone.is_none()
            && self.grade.is_none()
            && self.class.is_none()
            && self.sex.is_none()
    }

    /// Validates only the supplied fields.
    pub fn validate(&self) -> Result<(), StudentValidationError> {
        if let Some(name) = self.name.as_deref() {
            validate_name(name)?;
        }
        if let Some(grade) = self.grade {
            validate_grade(grade)?;
        }
        if let Some(class) = self.class {
            validate_class(class)?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), StudentValidationError> {
    if name.trim().is_empty() {
        return Err(StudentValidationError::EmptyName);
    }
    Ok(())
}

fn validate_grade(grade: Option<u8>) -> Result<(), StudentValidationError> {
    match grade {
        Some(value) if !GRADE_RANGE.contains(&value) => {
            Err(StudentValidationError::GradeOutOfRange(value))
        }
        _ => Ok(()),
    }
}

fn validate_class(class: Option<u8>) -> Result<(), StudentValidationError> {
    match class {
        Some(value) if !CLASS_RANGE.contains(&value) => {
            Err(StudentValidationError::ClassOutOfRange(value))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{Sex, Student, StudentPatch, StudentValidationError};

    #[test]
    fn new_student_starts_without_id_or_history() {
        let student = Student::new("Min Su");
        assert!(student.id.is_none());
        assert!(student.history.is_empty());
        assert!(student.validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_name_and_out_of_range_values() {
        assert_eq!(
            Student::new("   ").validate(),
            Err(StudentValidationError::EmptyName)
        );
        assert_eq!(
            Student::new("a").with_placement(Some(7), None).validate(),
            Err(StudentValidationError::GradeOutOfRange(7))
        );
        assert_eq!(
            Student::new("a").with_placement(Some(6), Some(0)).validate(),
            Err(StudentValidationError::ClassOutOfRange(0))
        );
        assert!(Student::new("a")
            .with_placement(Some(1), Some(4))
            .validate()
            .is_ok());
    }

    #[test]
    fn sex_parses_native_and_english_labels() {
        assert_eq!("남".parse::<Sex>().unwrap(), Sex::Male);
        assert_eq!(" Female ".parse::<Sex>().unwrap(), Sex::Female);
        assert!("unknown".parse::<Sex>().is_err());
        assert_eq!(Sex::Female.label(), "여");
    }

    #[test]
    fn patch_validation_only_checks_supplied_fields() {
        assert!(StudentPatch::default().validate().is_ok());
        let bad = StudentPatch {
            name: Some(String::new()),
            ..StudentPatch::default()
        };
        assert_eq!(bad.validate(), Err(StudentValidationError::EmptyName));
        let clear_grade = StudentPatch {
            grade: Some(None),
            ..StudentPatch::default()
        };
        assert!(clear_grade.validate().is_ok());
    }

    #[test]
    fn apply_patch_changes_only_supplied_fields() {
        let mut student = Student::new("Ji Woo")
            .with_phone("010-0000-0000")
            .with_placement(Some(2), Some(3));
        student.apply_patch(&StudentPatch {
            phone: Some(None),
            class: Some(Some(1)),
            ..StudentPatch::default()
        });
        assert_eq!(student.name, "Ji Woo");
        assert_eq!(student.phone, None);
        assert_eq!(student.grade, Some(2));
        assert_eq!(student.class, Some(1));
    }
}
