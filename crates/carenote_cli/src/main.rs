//! `carenote` command-line shell.
//!
//! # Responsibility
//! - Parse arguments into core values and print results.
//! - Leave validation, history and cascade rules to `carenote_core`.

mod render;

use anyhow::{bail, Context, Result};
use carenote_core::model::consulting::parse_date_time;
use carenote_core::{
    init_from_config, CareConfig, CareStore, ConfigOverrides, Consulting, ConsultingObject,
    ConsultingPatch, ConsultingQuery, ConsultingType, Sex, Student, StudentPatch, StudentQuery,
};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "carenote")]
#[command(version, about = "Personal counseling-record keeper")]
struct Cli {
    /// Database file (defaults to CARENOTE_DB_PATH or the platform data dir)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log directory (defaults to CARENOTE_LOG_DIR or the platform data dir)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage students
    #[command(subcommand)]
    Student(StudentCommand),
    /// Manage counseling records
    #[command(subcommand)]
    Consulting(ConsultingCommand),
}

#[derive(Subcommand)]
enum StudentCommand {
    /// Register a student
    Add(StudentFields),
    /// List all students by name
    List,
    /// Show one student with placement history
    Show { id: i64 },
    /// Search by name substring, grade and class
    Search {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        grade: Option<u8>,
        #[arg(long)]
        class: Option<u8>,
    },
    /// Change only the given fields
    Update {
        id: i64,
        #[command(flatten)]
        fields: StudentUpdateFields,
    },
    /// Delete a student and all of their counseling records
    Delete { id: i64 },
}

#[derive(Args)]
struct StudentFields {
    #[arg(long)]
    name: String,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    grade: Option<u8>,
    #[arg(long)]
    class: Option<u8>,
    /// male|female or 남|여
    #[arg(long)]
    sex: Option<Sex>,
}

#[derive(Args)]
struct StudentUpdateFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long, conflicts_with = "clear_phone")]
    phone: Option<String>,
    #[arg(long)]
    clear_phone: bool,
    #[arg(long, conflicts_with = "clear_grade")]
    grade: Option<u8>,
    #[arg(long)]
    clear_grade: bool,
    #[arg(long, conflicts_with = "clear_class")]
    class: Option<u8>,
    #[arg(long)]
    clear_class: bool,
    #[arg(long, conflicts_with = "clear_sex")]
    sex: Option<Sex>,
    #[arg(long)]
    clear_sex: bool,
}

#[derive(Subcommand)]
enum ConsultingCommand {
    /// Record a counseling session
    Add(ConsultingFields),
    /// List records newest first, optionally for one student
    List {
        #[arg(long)]
        student: Option<i64>,
    },
    /// Show one record in full
    Show { id: i64 },
    /// Search by title, student name, type and date range
    Search {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        student_name: Option<String>,
        #[arg(long = "type")]
        kind: Option<ConsultingType>,
        /// First day, YYYY-MM-DD
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day, YYYY-MM-DD
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Change only the given fields
    Update {
        id: i64,
        #[command(flatten)]
        fields: ConsultingUpdateFields,
    },
    /// Delete one record
    Delete { id: i64 },
}

#[derive(Args)]
struct ConsultingFields {
    #[arg(long)]
    student: i64,
    #[arg(long)]
    title: String,
    /// Session time, "YYYY-MM-DD HH:MM:SS" (defaults to now)
    #[arg(long, value_parser = parse_date_time_arg)]
    date: Option<NaiveDateTime>,
    /// phone|in-person|other or 전화|대면|기타
    #[arg(long = "type")]
    kind: Option<ConsultingType>,
    /// self|family|teacher|other or 본인|가족|교사|기타
    #[arg(long)]
    object: Option<ConsultingObject>,
    #[arg(long)]
    content: Option<String>,
    #[arg(long)]
    opinion: Option<String>,
    #[arg(long)]
    note: Option<String>,
}

#[derive(Args)]
struct ConsultingUpdateFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long, value_parser = parse_date_time_arg)]
    date: Option<NaiveDateTime>,
    #[arg(long = "type", conflicts_with = "clear_type")]
    kind: Option<ConsultingType>,
    #[arg(long)]
    clear_type: bool,
    #[arg(long, conflicts_with = "clear_object")]
    object: Option<ConsultingObject>,
    #[arg(long)]
    clear_object: bool,
    #[arg(long, conflicts_with = "clear_content")]
    content: Option<String>,
    #[arg(long)]
    clear_content: bool,
    #[arg(long, conflicts_with = "clear_opinion")]
    opinion: Option<String>,
    #[arg(long)]
    clear_opinion: bool,
    #[arg(long, conflicts_with = "clear_note")]
    note: Option<String>,
    #[arg(long)]
    clear_note: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = CareConfig::resolve(ConfigOverrides {
        db_path: cli.db,
        log_dir: cli.log_dir,
        log_level: cli.log_level,
    })?;
    if let Err(err) = init_from_config(&config) {
        eprintln!("warning: logging disabled: {err}");
    }

    let store = CareStore::from_config(&config)
        .with_context(|| format!("cannot open database `{}`", config.db_path.display()))?;

    let outcome = match cli.command {
        Commands::Student(command) => run_student(&store, command),
        Commands::Consulting(command) => run_consulting(&store, command),
    };
    store.close()?;
    outcome
}

fn run_student(store: &CareStore, command: StudentCommand) -> Result<()> {
    match command {
        StudentCommand::Add(fields) => {
            let mut student = Student::new(fields.name).with_placement(fields.grade, fields.class);
            student.phone = fields.phone;
            student.sex = fields.sex;
            let id = store.create_student(&student)?;
            println!("student created (id: {id})");
        }
        StudentCommand::List => {
            render::print_students(&store.list_students()?);
        }
        StudentCommand::Show { id } => {
            let Some(student) = store.get_student(id)? else {
                bail!("student not found: {id}");
            };
            render::print_student_detail(&student);
        }
        StudentCommand::Search { name, grade, class } => {
            let students = store.search_students(&StudentQuery {
                name: trimmed(name),
                grade,
                class,
            })?;
            render::print_students(&students);
        }
        StudentCommand::Update { id, fields } => {
            let patch = StudentPatch {
                name: fields.name,
                phone: nullable_update(fields.phone, fields.clear_phone),
                grade: nullable_update(fields.grade, fields.clear_grade),
                class: nullable_update(fields.class, fields.clear_class),
                sex: nullable_update(fields.sex, fields.clear_sex),
            };
            if patch.is_empty() {
                println!("nothing to change");
                return Ok(());
            }
            let student = store.update_student(id, &patch)?;
            render::print_student_detail(&student);
        }
        StudentCommand::Delete { id } => {
            store.delete_student(id)?;
            println!("student {id} deleted together with their counseling records");
        }
    }
    Ok(())
}

fn run_consulting(store: &CareStore, command: ConsultingCommand) -> Result<()> {
    match command {
        ConsultingCommand::Add(fields) => {
            let mut consulting = Consulting::new(fields.title, fields.student);
            if let Some(date) = fields.date {
                consulting = consulting.with_date(date);
            }
            consulting.kind = fields.kind;
            consulting.object = fields.object;
            consulting.content = fields.content;
            consulting.opinion = fields.opinion;
            consulting.note = fields.note;
            let id = store.create_consulting(&consulting)?;
            println!("consulting record created (id: {id})");
        }
        ConsultingCommand::List { student } => {
            let consultings = match student {
                Some(student_id) => store.list_consultings_for_student(student_id)?,
                None => store.list_consultings()?,
            };
            render::print_consultings(store, &consultings)?;
        }
        ConsultingCommand::Show { id } => {
            let Some(consulting) = store.get_consulting(id)? else {
                bail!("consulting record not found: {id}");
            };
            let student = store.get_student(consulting.student_id)?;
            render::print_consulting_detail(&consulting, student.as_ref());
        }
        ConsultingCommand::Search {
            title,
            student_name,
            kind,
            from,
            to,
        } => {
            let mut query = ConsultingQuery {
                title: trimmed(title),
                student_name: trimmed(student_name),
                kind,
                ..ConsultingQuery::default()
            };
            query.from = from.and_then(|day| day.and_hms_opt(0, 0, 0));
            query.to = to.and_then(|day| day.and_hms_opt(23, 59, 59));
            render::print_consultings(store, &store.search_consultings(&query)?)?;
        }
        ConsultingCommand::Update { id, fields } => {
            let patch = ConsultingPatch {
                title: fields.title,
                date: fields.date,
                kind: nullable_update(fields.kind, fields.clear_type),
                object: nullable_update(fields.object, fields.clear_object),
                content: nullable_update(fields.content, fields.clear_content),
                opinion: nullable_update(fields.opinion, fields.clear_opinion),
                note: nullable_update(fields.note, fields.clear_note),
            };
            if patch.is_empty() {
                println!("nothing to change");
                return Ok(());
            }
            let consulting = store.update_consulting(id, &patch)?;
            let student = store.get_student(consulting.student_id)?;
            render::print_consulting_detail(&consulting, student.as_ref());
        }
        ConsultingCommand::Delete { id } => {
            store.delete_consulting(id)?;
            println!("consulting record {id} deleted");
        }
    }
    Ok(())
}

/// Maps a value flag and its `--clear-*` companion onto a nullable patch field.
fn nullable_update<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear {
        Some(None)
    } else {
        value.map(Some)
    }
}

fn trimmed(text: Option<String>) -> Option<String> {
    text.map(|value| value.trim().to_string())
}

fn parse_date_time_arg(value: &str) -> Result<NaiveDateTime, String> {
    parse_date_time(value).ok_or_else(|| format!("expected `YYYY-MM-DD HH:MM:SS`, got `{value}`"))
}

#[cfg(test)]
mod tests {
    use super::{nullable_update, Cli, Commands, ConsultingCommand, StudentCommand};
    use carenote_core::ConsultingType;
    use clap::Parser;

    #[test]
    fn nullable_update_distinguishes_keep_set_and_clear() {
        assert_eq!(nullable_update::<u8>(None, false), None);
        assert_eq!(nullable_update(Some(3u8), false), Some(Some(3)));
        assert_eq!(nullable_update::<u8>(None, true), Some(None));
    }

    #[test]
    fn student_update_accepts_clear_flags() {
        let cli = Cli::try_parse_from([
            "carenote",
            "student",
            "update",
            "7",
            "--clear-grade",
            "--clear-class",
            "--sex",
            "female",
        ])
        .unwrap();
        let Commands::Student(StudentCommand::Update { id, fields }) = cli.command else {
            panic!("expected student update");
        };
        assert_eq!(id, 7);
        assert_eq!(nullable_update(fields.grade, fields.clear_grade), Some(None));
        assert_eq!(nullable_update(fields.class, fields.clear_class), Some(None));
        assert!(nullable_update(fields.sex, fields.clear_sex).is_some());
        assert_eq!(nullable_update(fields.phone, fields.clear_phone), None);
    }

    #[test]
    fn consulting_update_accepts_clear_flags() {
        let cli = Cli::try_parse_from([
            "carenote",
            "consulting",
            "update",
            "3",
            "--clear-type",
            "--clear-note",
            "--content",
            "Talked with parents",
        ])
        .unwrap();
        let Commands::Consulting(ConsultingCommand::Update { fields, .. }) = cli.command else {
            panic!("expected consulting update");
        };
        assert_eq!(
            nullable_update::<ConsultingType>(fields.kind, fields.clear_type),
            Some(None)
        );
        assert_eq!(nullable_update(fields.note, fields.clear_note), Some(None));
        assert_eq!(
            nullable_update(fields.content, fields.clear_content),
            Some(Some("Talked with parents".to_string()))
        );
    }

    #[test]
    fn value_and_clear_flag_conflict() {
        let parsed = Cli::try_parse_from([
            "carenote",
            "student",
            "update",
            "7",
            "--grade",
            "2",
            "--clear-grade",
        ]);
        assert!(parsed.is_err());
    }
}
