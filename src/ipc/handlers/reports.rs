use crate::aggregate::{self, RecordFilters};
use crate::ipc::helpers::{optional_str, required_str, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store;
use rusqlite::Connection;
use serde_json::json;

use super::sessions::parse_iso_date;

/// The subject dropdowns send "all" as a sentinel for "no restriction".
fn subject_filter(params: &serde_json::Value, key: &str) -> Option<String> {
    optional_str(params, key).filter(|s| !s.eq_ignore_ascii_case("all"))
}

fn parse_filters(params: &serde_json::Value) -> Result<RecordFilters, HandlerErr> {
    let Some(raw) = params.get("filters") else {
        return Ok(RecordFilters::default());
    };
    if raw.is_null() {
        return Ok(RecordFilters::default());
    }
    if !raw.is_object() {
        return Err(HandlerErr::bad_params("filters must be an object"));
    }
    let from = optional_str(raw, "from")
        .map(|s| parse_iso_date(&s))
        .transpose()?;
    let to = optional_str(raw, "to")
        .map(|s| parse_iso_date(&s))
        .transpose()?;
    if let (Some(f), Some(t)) = (from, to) {
        if f > t {
            return Err(HandlerErr::bad_params("filters.from is after filters.to"));
        }
    }
    Ok(RecordFilters {
        subject: subject_filter(raw, "subject"),
        from,
        to,
    })
}

fn filtered_records(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<Vec<store::AttendanceRecord>, HandlerErr> {
    let filters = parse_filters(params)?;
    let records = store::list_records(conn)?;
    Ok(aggregate::apply_filters(&records, &filters))
}

fn student_dashboard(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_str(params, "studentId")?;
    let student = store::student_by_id(conn, &student_id)?
        .ok_or_else(|| HandlerErr::not_found("student not found"))?;
    // The dashboard always spans the full record set.
    let records = store::list_records(conn)?;
    let dashboard = aggregate::compute_student_dashboard(&student.id, &records);
    Ok(json!({
        "student": student,
        "dashboard": dashboard
    }))
}

fn student_records(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_str(params, "studentId")?;
    if store::student_by_id(conn, &student_id)?.is_none() {
        return Err(HandlerErr::not_found("student not found"));
    }
    let subject = subject_filter(params, "subject");
    let records = store::list_records(conn)?;
    let rows = aggregate::filter_student_records(&student_id, subject.as_deref(), &records);
    Ok(json!({
        "count": rows.len(),
        "records": rows
    }))
}

fn subject_wise(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let records = filtered_records(conn, params)?;
    let students = store::list_students(conn)?;
    Ok(json!({ "rows": aggregate::subject_wise_report(&records, &students) }))
}

fn date_wise(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let records = filtered_records(conn, params)?;
    let students = store::list_students(conn)?;
    Ok(json!({ "rows": aggregate::date_wise_report(&records, &students) }))
}

fn student_wise(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let records = filtered_records(conn, params)?;
    let students = store::list_students(conn)?;
    Ok(json!({ "rows": aggregate::student_wise_report(&records, &students) }))
}

fn defaulters(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let threshold = params
        .get("threshold")
        .and_then(|v| v.as_u64())
        .filter(|t| *t <= 100)
        .ok_or_else(|| HandlerErr::bad_params("threshold must be between 0 and 100"))?
        as u32;

    let records = store::list_records(conn)?;
    let students = store::list_students(conn)?;
    let rows = aggregate::defaulters_report(threshold, &records, &students);
    Ok(json!({
        "threshold": threshold,
        "rows": rows
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.studentDashboard" => Some(with_db(state, req, student_dashboard)),
        "reports.studentRecords" => Some(with_db(state, req, student_records)),
        "reports.subjectWise" => Some(with_db(state, req, subject_wise)),
        "reports.dateWise" => Some(with_db(state, req, date_wise)),
        "reports.studentWise" => Some(with_db(state, req, student_wise)),
        "reports.defaulters" => Some(with_db(state, req, defaulters)),
        _ => None,
    }
}
