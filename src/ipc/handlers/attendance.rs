use crate::ipc::helpers::{optional_str, required_str, update_failed, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, AttendanceRecord, SessionStatus, Student};
use chrono::Utc;
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

fn new_record(student: &Student, subject: &str, date: &str) -> AttendanceRecord {
    let now = Utc::now();
    AttendanceRecord {
        id: Uuid::new_v4().to_string(),
        student_id: student.id.clone(),
        student_name: student.name.clone(),
        subject: subject.to_string(),
        date: date.to_string(),
        time: now.format("%H:%M:%S").to_string(),
        timestamp: now.to_rfc3339(),
    }
}

/// The scan-confirmation path: marks the student present in every active
/// session, skipping sessions where the (student, subject, date) key already
/// holds a record.
fn attendance_check_in(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_str(params, "studentId")?;
    let student = store::student_by_id(conn, &student_id)?
        .ok_or_else(|| HandlerErr::not_found("student not found"))?;

    let active = store::list_sessions(conn, Some(SessionStatus::Active))?;
    let mut marked = Vec::new();
    let mut already_marked = Vec::new();

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    for session in &active {
        let entry = json!({
            "sessionId": session.id,
            "subject": session.subject,
            "date": session.date
        });
        if store::record_exists(&tx, &student.id, &session.subject, &session.date)? {
            already_marked.push(entry);
            continue;
        }
        let record = new_record(&student, &session.subject, &session.date);
        store::append_record(&tx, &record).map_err(|e| update_failed("attendance_records", e))?;
        marked.push(entry);
    }
    tx.commit()
        .map_err(|e| HandlerErr::new("db_commit_failed", e.to_string()))?;

    Ok(json!({
        "studentId": student.id,
        "studentName": student.name,
        "activeSessionCount": active.len(),
        "marked": marked,
        "alreadyMarked": already_marked
    }))
}

/// Manual marking against one explicit session.
fn attendance_mark(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let session_id = required_str(params, "sessionId")?;
    let student_id = required_str(params, "studentId")?;

    let session = store::session_by_id(conn, &session_id)?
        .ok_or_else(|| HandlerErr::not_found("session not found"))?;
    if session.status != SessionStatus::Active {
        return Err(HandlerErr::conflict("session has ended"));
    }
    let student = store::student_by_id(conn, &student_id)?
        .ok_or_else(|| HandlerErr::not_found("student not found"))?;

    if store::record_exists(conn, &student.id, &session.subject, &session.date)? {
        return Err(HandlerErr::conflict("student already marked present"));
    }

    let record = new_record(&student, &session.subject, &session.date);
    store::append_record(conn, &record).map_err(|e| update_failed("attendance_records", e))?;
    Ok(json!({ "record": record }))
}

fn attendance_list(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let records = match optional_str(params, "sessionId") {
        Some(session_id) => {
            let session = store::session_by_id(conn, &session_id)?
                .ok_or_else(|| HandlerErr::not_found("session not found"))?;
            store::list_records_for(conn, &session.subject, &session.date)?
        }
        None => store::list_records(conn)?,
    };
    Ok(json!({
        "count": records.len(),
        "records": records
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.checkIn" => Some(with_db(state, req, attendance_check_in)),
        "attendance.mark" => Some(with_db(state, req, attendance_mark)),
        "attendance.list" => Some(with_db(state, req, attendance_list)),
        _ => None,
    }
}
