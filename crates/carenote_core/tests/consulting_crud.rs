use carenote_core::db::open_db_in_memory;
use carenote_core::{
    Consulting, ConsultingObject, ConsultingPatch, ConsultingRepository, ConsultingType,
    ConsultingValidationError, RepoError, SqliteConsultingRepository, SqliteStudentRepository,
    Student, StudentRepository,
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use rusqlite::Connection;

fn at(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn count_consultings(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM consultings;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let students = SqliteStudentRepository::new(&conn);
    let repo = SqliteConsultingRepository::new(&conn);

    let student_id = students.create_student(&Student::new("Ji Woo")).unwrap();
    let mut record = Consulting::new("Friendship issue", student_id)
        .with_date(at(2024, 1, 15, 10))
        .with_kind(ConsultingType::InPerson)
        .with_object(ConsultingObject::Own);
    record.content = Some("Conflict with a classmate".to_string());
    record.opinion = Some("Follow up next week".to_string());

    let id = repo.create_consulting(&record).unwrap();
    let loaded = repo.get_consulting(id).unwrap().unwrap();

    assert_eq!(loaded.id, Some(id));
    assert_eq!(
        Consulting {
            id: None,
            ..loaded.clone()
        },
        record
    );
    assert_eq!(loaded.note, None);
}

#[test]
fn date_defaults_to_local_now() {
    let conn = open_db_in_memory().unwrap();
    let students = SqliteStudentRepository::new(&conn);
    let repo = SqliteConsultingRepository::new(&conn);

    let student_id = students.create_student(&Student::new("Now")).unwrap();
    let before = Local::now().naive_local() - chrono::Duration::seconds(1);
    let id = repo
        .create_consulting(&Consulting::new("Check-in", student_id))
        .unwrap();
    let after = Local::now().naive_local() + chrono::Duration::seconds(1);

    let loaded = repo.get_consulting(id).unwrap().unwrap();
    assert!(loaded.date >= before && loaded.date <= after);
}

#[test]
fn labels_are_persisted_natively() {
    let conn = open_db_in_memory().unwrap();
    let students = SqliteStudentRepository::new(&conn);
    let repo = SqliteConsultingRepository::new(&conn);

    let student_id = students.create_student(&Student::new("Label")).unwrap();
    let id = repo
        .create_consulting(
            &Consulting::new("Call", student_id)
                .with_kind(ConsultingType::Phone)
                .with_object(ConsultingObject::Family),
        )
        .unwrap();

    let (kind, object): (String, String) = conn
        .query_row(
            "SELECT consulting_type, consulting_object FROM consultings WHERE consulting_id = ?1;",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(kind, "전화");
    assert_eq!(object, "가족");
}

#[test]
fn create_with_missing_student_fails_and_persists_nothing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteConsultingRepository::new(&conn);

    let err = repo
        .create_consulting(&Consulting::new("Orphan", 404))
        .unwrap_err();
    assert!(matches!(err, RepoError::StudentNotFound(404)));
    assert_eq!(count_consultings(&conn), 0);
}

#[test]
fn create_with_blank_title_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let students = SqliteStudentRepository::new(&conn);
    let repo = SqliteConsultingRepository::new(&conn);

    let student_id = students.create_student(&Student::new("Blank")).unwrap();
    let err = repo
        .create_consulting(&Consulting::new("   ", student_id))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::ConsultingValidation(ConsultingValidationError::EmptyTitle)
    ));
    assert_eq!(count_consultings(&conn), 0);
}

#[test]
fn deleting_student_cascades_to_consultings() {
    let conn = open_db_in_memory().unwrap();
    let students = SqliteStudentRepository::new(&conn);
    let repo = SqliteConsultingRepository::new(&conn);

    let owner = students.create_student(&Student::new("Ji Woo")).unwrap();
    let other = students.create_student(&Student::new("Other")).unwrap();
    let owned: Vec<_> = (0..3)
        .map(|n| {
            repo.create_consulting(
                &Consulting::new(format!("Session {n}"), owner).with_date(at(2024, 3, 1 + n, 9)),
            )
            .unwrap()
        })
        .collect();
    let kept = repo
        .create_consulting(&Consulting::new("Unrelated", other))
        .unwrap();

    students.delete_student(owner).unwrap();

    for id in owned {
        assert!(repo.get_consulting(id).unwrap().is_none());
    }
    let remaining: Vec<_> = repo
        .list_consultings()
        .unwrap()
        .into_iter()
        .map(|record| record.id.unwrap())
        .collect();
    assert_eq!(remaining, vec![kept]);
    let dangling: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM consultings WHERE student_id = ?1;",
            [owner],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(dangling, 0);
}

#[test]
fn list_orders_newest_first() {
    let conn = open_db_in_memory().unwrap();
    let students = SqliteStudentRepository::new(&conn);
    let repo = SqliteConsultingRepository::new(&conn);

    let student_id = students.create_student(&Student::new("Order")).unwrap();
    let old = repo
        .create_consulting(&Consulting::new("old", student_id).with_date(at(2023, 5, 1, 9)))
        .unwrap();
    let new = repo
        .create_consulting(&Consulting::new("new", student_id).with_date(at(2024, 5, 1, 9)))
        .unwrap();
    let middle = repo
        .create_consulting(&Consulting::new("middle", student_id).with_date(at(2023, 12, 1, 9)))
        .unwrap();

    let ids: Vec<_> = repo
        .list_consultings()
        .unwrap()
        .into_iter()
        .map(|record| record.id.unwrap())
        .collect();
    assert_eq!(ids, vec![new, middle, old]);
}

#[test]
fn list_for_student_filters_by_owner() {
    let conn = open_db_in_memory().unwrap();
    let students = SqliteStudentRepository::new(&conn);
    let repo = SqliteConsultingRepository::new(&conn);

    let first = students.create_student(&Student::new("First")).unwrap();
    let second = students.create_student(&Student::new("Second")).unwrap();
    repo.create_consulting(&Consulting::new("a", first)).unwrap();
    repo.create_consulting(&Consulting::new("b", second)).unwrap();
    repo.create_consulting(&Consulting::new("c", first)).unwrap();

    let owned = repo.list_consultings_for_student(first).unwrap();
    assert_eq!(owned.len(), 2);
    assert!(owned.iter().all(|record| record.student_id == first));

    let err = repo.list_consultings_for_student(999).unwrap_err();
    assert!(matches!(err, RepoError::StudentNotFound(999)));
}

#[test]
fn update_changes_only_supplied_fields() {
    let conn = open_db_in_memory().unwrap();
    let students = SqliteStudentRepository::new(&conn);
    let repo = SqliteConsultingRepository::new(&conn);

    let student_id = students.create_student(&Student::new("Patch")).unwrap();
    let mut record = Consulting::new("Initial", student_id)
        .with_date(at(2024, 2, 2, 14))
        .with_kind(ConsultingType::Other);
    record.content = Some("first draft".to_string());
    record.note = Some("keep me".to_string());
    let id = repo.create_consulting(&record).unwrap();

    let updated = repo
        .update_consulting(
            id,
            &ConsultingPatch {
                title: Some("Revised".to_string()),
                content: Some(None),
                opinion: Some(Some("needs parent meeting".to_string())),
                ..ConsultingPatch::default()
            },
        )
        .unwrap();

    assert_eq!(updated.title, "Revised");
    assert_eq!(updated.content, None);
    assert_eq!(updated.opinion.as_deref(), Some("needs parent meeting"));
    assert_eq!(updated.note.as_deref(), Some("keep me"));
    assert_eq!(updated.kind, Some(ConsultingType::Other));
    assert_eq!(updated.date, at(2024, 2, 2, 14));
    assert_eq!(updated.student_id, student_id);
    assert_eq!(repo.get_consulting(id).unwrap().unwrap(), updated);
}

#[test]
fn update_and_delete_missing_record_return_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteConsultingRepository::new(&conn);

    let err = repo
        .update_consulting(
            7,
            &ConsultingPatch {
                title: Some("x".to_string()),
                ..ConsultingPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::ConsultingNotFound(7)));

    let err = repo.delete_consulting(7).unwrap_err();
    assert!(matches!(err, RepoError::ConsultingNotFound(7)));
}

#[test]
fn delete_removes_only_that_record() {
    let conn = open_db_in_memory().unwrap();
    let students = SqliteStudentRepository::new(&conn);
    let repo = SqliteConsultingRepository::new(&conn);

    let student_id = students.create_student(&Student::new("Keep")).unwrap();
    let gone = repo.create_consulting(&Consulting::new("gone", student_id)).unwrap();
    let kept = repo.create_consulting(&Consulting::new("kept", student_id)).unwrap();

    repo.delete_consulting(gone).unwrap();

    assert!(repo.get_consulting(gone).unwrap().is_none());
    assert!(repo.get_consulting(kept).unwrap().is_some());
    assert!(students.get_student(student_id).unwrap().is_some());
}
