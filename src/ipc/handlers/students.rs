use crate::ipc::helpers::{required_str, update_failed, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, Student};
use chrono::Utc;
use rusqlite::Connection;
use serde_json::json;

fn students_list(conn: &Connection, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let students = store::list_students(conn)?;
    let count = students.len();
    Ok(json!({
        "students": students,
        "count": count
    }))
}

fn students_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let id = required_str(params, "id")?;
    let name = required_str(params, "name")?;
    let email = required_str(params, "email")?;

    if store::student_by_id(conn, &id)?.is_some() {
        return Err(HandlerErr::conflict("student id already exists"));
    }

    let student = Student { id, name, email };
    store::insert_student(conn, &student, &Utc::now().to_rfc3339())
        .map_err(|e| update_failed("students", e))?;
    Ok(json!({ "student": student }))
}

fn students_delete(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let id = required_str(params, "studentId")?;
    let deleted = store::delete_student(conn, &id).map_err(|e| update_failed("students", e))?;
    if deleted == 0 {
        return Err(HandlerErr::not_found("student not found"));
    }
    // Attendance records are kept; reports fall back to the raw id.
    Ok(json!({ "deleted": id }))
}

const DEFAULT_STUDENTS: &[(&str, &str, &str)] = &[
    ("ST001", "John Smith", "john.smith@email.com"),
    ("ST002", "Emma Johnson", "emma.johnson@email.com"),
    ("ST003", "Michael Brown", "michael.brown@email.com"),
    ("ST004", "Sarah Davis", "sarah.davis@email.com"),
    ("ST005", "David Wilson", "david.wilson@email.com"),
    ("ST006", "Jessica Miller", "jessica.miller@email.com"),
    ("ST007", "Daniel Garcia", "daniel.garcia@email.com"),
    ("ST008", "Ashley Martinez", "ashley.martinez@email.com"),
];

fn students_seed_defaults(conn: &Connection, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    if store::roster_count(conn)? > 0 {
        return Ok(json!({ "inserted": 0, "skipped": true }));
    }
    let now = Utc::now().to_rfc3339();
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    for (id, name, email) in DEFAULT_STUDENTS {
        let student = Student {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
        };
        store::insert_student(&tx, &student, &now).map_err(|e| update_failed("students", e))?;
    }
    tx.commit()
        .map_err(|e| HandlerErr::new("db_commit_failed", e.to_string()))?;
    Ok(json!({ "inserted": DEFAULT_STUDENTS.len(), "skipped": false }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(with_db(state, req, students_list)),
        "students.create" => Some(with_db(state, req, students_create)),
        "students.delete" => Some(with_db(state, req, students_delete)),
        "students.seedDefaults" => Some(with_db(state, req, students_seed_defaults)),
        _ => None,
    }
}
