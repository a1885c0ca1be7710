use crate::ipc::helpers::{optional_str, required_str, update_failed, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, Session, SessionStatus};
use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

pub fn parse_iso_date(raw: &str) -> Result<NaiveDate, HandlerErr> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| HandlerErr::bad_params("date must be YYYY-MM-DD"))
}

fn sessions_start(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let subject = required_str(params, "subject")?;
    let date = required_str(params, "date")?;
    parse_iso_date(&date)?;

    if store::active_session_for(conn, &subject, &date)?.is_some() {
        return Err(HandlerErr::conflict(
            "a session for this subject and date is already active",
        ));
    }

    let session = Session {
        id: Uuid::new_v4().to_string(),
        subject,
        date,
        start_time: Utc::now().to_rfc3339(),
        end_time: None,
        status: SessionStatus::Active,
    };
    store::insert_session(conn, &session).map_err(|e| update_failed("sessions", e))?;
    Ok(json!({ "session": session }))
}

fn sessions_end(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let session_id = required_str(params, "sessionId")?;
    let session = store::session_by_id(conn, &session_id)?
        .ok_or_else(|| HandlerErr::not_found("session not found"))?;
    if session.status == SessionStatus::Ended {
        return Err(HandlerErr::conflict("session already ended"));
    }

    let end_time = Utc::now().to_rfc3339();
    store::end_session(conn, &session_id, &end_time).map_err(|e| update_failed("sessions", e))?;
    let present_count = store::list_records_for(conn, &session.subject, &session.date)?.len();

    let ended = Session {
        end_time: Some(end_time),
        status: SessionStatus::Ended,
        ..session
    };
    Ok(json!({
        "session": ended,
        "presentCount": present_count
    }))
}

fn sessions_list(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let status = match optional_str(params, "status").as_deref() {
        None | Some("all") => None,
        Some(raw) => Some(
            SessionStatus::parse(raw)
                .ok_or_else(|| HandlerErr::bad_params("status must be one of: all, active, ended"))?,
        ),
    };

    let sessions = store::list_sessions(conn, status)?;
    let mut rows = Vec::with_capacity(sessions.len());
    for session in sessions {
        let present_count = store::list_records_for(conn, &session.subject, &session.date)?.len();
        rows.push(json!({
            "session": session,
            "presentCount": present_count
        }));
    }
    Ok(json!({ "sessions": rows }))
}

fn sessions_detail(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let session_id = required_str(params, "sessionId")?;
    let session = store::session_by_id(conn, &session_id)?
        .ok_or_else(|| HandlerErr::not_found("session not found"))?;
    let attendees = store::list_records_for(conn, &session.subject, &session.date)?;
    Ok(json!({
        "session": session,
        "presentCount": attendees.len(),
        "attendees": attendees
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "sessions.start" => Some(with_db(state, req, sessions_start)),
        "sessions.end" => Some(with_db(state, req, sessions_end)),
        "sessions.list" => Some(with_db(state, req, sessions_list)),
        "sessions.detail" => Some(with_db(state, req, sessions_detail)),
        _ => None,
    }
}
