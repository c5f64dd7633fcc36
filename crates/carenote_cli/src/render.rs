//! Plain-text rendering of store results.

use anyhow::Result;
use carenote_core::model::consulting::format_date_time;
use carenote_core::{CareStore, Consulting, Student};
use std::collections::HashMap;

const CONTENT_PREVIEW_CHARS: usize = 50;

pub fn print_students(students: &[Student]) {
    if students.is_empty() {
        println!("no students");
        return;
    }

    println!(
        "{:<5} {:<12} {:<6} {:<6} {:<6} {:<15}",
        "ID", "NAME", "GRADE", "CLASS", "SEX", "PHONE"
    );
    println!("{}", "-".repeat(56));
    for student in students {
        println!(
            "{:<5} {:<12} {:<6} {:<6} {:<6} {:<15}",
            student.id.unwrap_or_default(),
            student.name,
            or_dash(student.grade),
            or_dash(student.class),
            or_dash(student.sex),
            student.phone.as_deref().unwrap_or("-"),
        );
    }
    println!("{} student(s)", students.len());
}

pub fn print_student_detail(student: &Student) {
    println!("id:      {}", student.id.unwrap_or_default());
    println!("name:    {}", student.name);
    println!("phone:   {}", student.phone.as_deref().unwrap_or("-"));
    println!("grade:   {}", or_dash(student.grade));
    println!("class:   {}", or_dash(student.class));
    println!("sex:     {}", or_dash(student.sex));
    if student.history.is_empty() {
        println!("history: -");
    } else {
        println!("history:");
        for (index, entry) in student.history.iter().enumerate() {
            println!("  {}. grade {} class {}", index + 1, entry.grade, entry.class);
        }
    }
}

/// Prints a record list, resolving owner names once per student.
pub fn print_consultings(store: &CareStore, consultings: &[Consulting]) -> Result<()> {
    if consultings.is_empty() {
        println!("no counseling records");
        return Ok(());
    }

    let mut names: HashMap<i64, String> = HashMap::new();
    for consulting in consultings {
        if !names.contains_key(&consulting.student_id) {
            let name = store
                .get_student(consulting.student_id)?
                .map(|student| student.name)
                .unwrap_or_else(|| "?".to_string());
            names.insert(consulting.student_id, name);
        }
        let owner = names
            .get(&consulting.student_id)
            .map(String::as_str)
            .unwrap_or("?");

        println!(
            "[{}] {}",
            consulting.id.unwrap_or_default(),
            consulting.title
        );
        println!(
            "  {} | {} | type: {} | with: {}",
            format_date_time(&consulting.date),
            owner,
            or_dash(consulting.kind),
            or_dash(consulting.object),
        );
        if let Some(content) = consulting.content.as_deref() {
            println!("  {}", preview(content));
        }
    }
    println!("{} record(s)", consultings.len());
    Ok(())
}

pub fn print_consulting_detail(consulting: &Consulting, student: Option<&Student>) {
    println!("id:      {}", consulting.id.unwrap_or_default());
    println!("title:   {}", consulting.title);
    println!(
        "student: {} ({})",
        student.map(|s| s.name.as_str()).unwrap_or("?"),
        consulting.student_id
    );
    println!("date:    {}", format_date_time(&consulting.date));
    println!("type:    {}", or_dash(consulting.kind));
    println!("with:    {}", or_dash(consulting.object));
    println!("content: {}", consulting.content.as_deref().unwrap_or("-"));
    println!("opinion: {}", consulting.opinion.as_deref().unwrap_or("-"));
    println!("note:    {}", consulting.note.as_deref().unwrap_or("-"));
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |inner| inner.to_string())
}

fn preview(text: &str) -> String {
    let mut short: String = text.chars().take(CONTENT_PREVIEW_CHARS).collect();
    if text.chars().count() > CONTENT_PREVIEW_CHARS {
        short.push_str("...");
    }
    short
}
