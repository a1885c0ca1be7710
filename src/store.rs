use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Ended,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Ended => "ended",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SessionStatus::Active),
            "ended" => Some(SessionStatus::Ended),
            _ => None,
        }
    }
}

/// One admin-opened attendance window for a subject on a date. Sessions are
/// persisted with an explicit status; the record dedup key stays the single
/// source of truth for who attended what.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub subject: String,
    pub date: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub status: SessionStatus,
}

/// One confirmed attendance event. `student_name` is a snapshot taken at
/// marking time so reports survive roster deletions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub subject: String,
    pub date: String,
    pub time: String,
    pub timestamp: String,
}

pub fn list_students(conn: &Connection) -> rusqlite::Result<Vec<Student>> {
    let mut stmt = conn.prepare("SELECT id, name, email FROM students ORDER BY rowid")?;
    let rows = stmt.query_map([], |r| {
        Ok(Student {
            id: r.get(0)?,
            name: r.get(1)?,
            email: r.get(2)?,
        })
    })?;
    rows.collect()
}

pub fn student_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<Student>> {
    conn.query_row(
        "SELECT id, name, email FROM students WHERE id = ?",
        [id],
        |r| {
            Ok(Student {
                id: r.get(0)?,
                name: r.get(1)?,
                email: r.get(2)?,
            })
        },
    )
    .optional()
}

pub fn insert_student(
    conn: &Connection,
    student: &Student,
    created_at: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO students(id, name, email, created_at) VALUES(?, ?, ?, ?)",
        (&student.id, &student.name, &student.email, created_at),
    )?;
    Ok(())
}

pub fn delete_student(conn: &Connection, id: &str) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM students WHERE id = ?", [id])
}

pub fn roster_count(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))
}

fn session_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    let status_raw: String = r.get(5)?;
    Ok(Session {
        id: r.get(0)?,
        subject: r.get(1)?,
        date: r.get(2)?,
        start_time: r.get(3)?,
        end_time: r.get(4)?,
        status: SessionStatus::parse(&status_raw).unwrap_or(SessionStatus::Ended),
    })
}

const SESSION_COLS: &str = "id, subject, date, start_time, end_time, status";

pub fn list_sessions(
    conn: &Connection,
    status: Option<SessionStatus>,
) -> rusqlite::Result<Vec<Session>> {
    match status {
        Some(s) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM sessions WHERE status = ? ORDER BY rowid",
                SESSION_COLS
            ))?;
            let rows = stmt.query_map([s.as_str()], |r| session_from_row(r))?;
            rows.collect()
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM sessions ORDER BY rowid",
                SESSION_COLS
            ))?;
            let rows = stmt.query_map([], |r| session_from_row(r))?;
            rows.collect()
        }
    }
}

pub fn session_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<Session>> {
    conn.query_row(
        &format!("SELECT {} FROM sessions WHERE id = ?", SESSION_COLS),
        [id],
        |r| session_from_row(r),
    )
    .optional()
}

pub fn active_session_for(
    conn: &Connection,
    subject: &str,
    date: &str,
) -> rusqlite::Result<Option<Session>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM sessions WHERE subject = ? AND date = ? AND status = 'active'",
            SESSION_COLS
        ),
        [subject, date],
        |r| session_from_row(r),
    )
    .optional()
}

pub fn insert_session(conn: &Connection, session: &Session) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO sessions(id, subject, date, start_time, end_time, status)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &session.id,
            &session.subject,
            &session.date,
            &session.start_time,
            &session.end_time,
            session.status.as_str(),
        ),
    )?;
    Ok(())
}

pub fn end_session(conn: &Connection, id: &str, end_time: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE sessions SET status = 'ended', end_time = ? WHERE id = ?",
        (end_time, id),
    )
}

fn record_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<AttendanceRecord> {
    Ok(AttendanceRecord {
        id: r.get(0)?,
        student_id: r.get(1)?,
        student_name: r.get(2)?,
        subject: r.get(3)?,
        date: r.get(4)?,
        time: r.get(5)?,
        timestamp: r.get(6)?,
    })
}

const RECORD_COLS: &str = "id, student_id, student_name, subject, date, time, timestamp";

pub fn list_records(conn: &Connection) -> rusqlite::Result<Vec<AttendanceRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM attendance_records ORDER BY rowid",
        RECORD_COLS
    ))?;
    let rows = stmt.query_map([], |r| record_from_row(r))?;
    rows.collect()
}

pub fn list_records_for(
    conn: &Connection,
    subject: &str,
    date: &str,
) -> rusqlite::Result<Vec<AttendanceRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM attendance_records WHERE subject = ? AND date = ? ORDER BY rowid",
        RECORD_COLS
    ))?;
    let rows = stmt.query_map([subject, date], |r| record_from_row(r))?;
    rows.collect()
}

pub fn record_exists(
    conn: &Connection,
    student_id: &str,
    subject: &str,
    date: &str,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM attendance_records WHERE student_id = ? AND subject = ? AND date = ?",
        [student_id, subject, date],
        |r| r.get::<_, i64>(0),
    )
    .optional()
    .map(|v| v.is_some())
}

pub fn append_record(conn: &Connection, record: &AttendanceRecord) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO attendance_records(id, student_id, student_name, subject, date, time, timestamp)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            &record.id,
            &record.student_id,
            &record.student_name,
            &record.subject,
            &record.date,
            &record.time,
            &record.timestamp,
        ),
    )?;
    Ok(())
}
