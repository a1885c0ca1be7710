use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::store::{AttendanceRecord, Student};

/// Count of distinct (subject, date) pairs across all records. A class
/// session is inferred from record existence, so this is the "classes held"
/// proxy used by the student dashboard.
pub fn classes_held(records: &[AttendanceRecord]) -> usize {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    for r in records {
        seen.insert((r.subject.as_str(), r.date.as_str()));
    }
    seen.len()
}

fn percentage_of(attended: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((attended as f64 / total as f64) * 100.0).round() as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDashboard {
    pub total_classes: usize,
    pub attended: usize,
    pub percentage: u32,
}

pub fn compute_student_dashboard(
    student_id: &str,
    records: &[AttendanceRecord],
) -> StudentDashboard {
    let total_classes = classes_held(records);
    let attended = records.iter().filter(|r| r.student_id == student_id).count();
    StudentDashboard {
        total_classes,
        attended,
        percentage: percentage_of(attended, total_classes),
    }
}

/// Records for one student, optionally restricted to one subject, in the
/// original record order.
pub fn filter_student_records<'a>(
    student_id: &str,
    subject: Option<&str>,
    records: &'a [AttendanceRecord],
) -> Vec<&'a AttendanceRecord> {
    records
        .iter()
        .filter(|r| r.student_id == student_id)
        .filter(|r| subject.map(|s| r.subject == s).unwrap_or(true))
        .collect()
}

fn roster_names(students: &[Student]) -> HashMap<&str, &str> {
    students
        .iter()
        .map(|s| (s.id.as_str(), s.name.as_str()))
        .collect()
}

fn display_name(names: &HashMap<&str, &str>, student_id: &str) -> String {
    // Fall back to the raw id when the student was since deleted.
    names
        .get(student_id)
        .map(|n| n.to_string())
        .unwrap_or_else(|| student_id.to_string())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectReportRow {
    pub subject: String,
    pub student_names: Vec<String>,
    pub present_count: usize,
}

/// One row per subject: distinct students present (duplicates collapse),
/// subjects in first-appearance order.
pub fn subject_wise_report(
    records: &[AttendanceRecord],
    students: &[Student],
) -> Vec<SubjectReportRow> {
    let names = roster_names(students);
    let mut order: Vec<&str> = Vec::new();
    let mut by_subject: HashMap<&str, Vec<&str>> = HashMap::new();
    for r in records {
        let ids = by_subject.entry(r.subject.as_str()).or_insert_with(|| {
            order.push(r.subject.as_str());
            Vec::new()
        });
        if !ids.contains(&r.student_id.as_str()) {
            ids.push(r.student_id.as_str());
        }
    }
    order
        .into_iter()
        .map(|subject| {
            let ids = &by_subject[subject];
            SubjectReportRow {
                subject: subject.to_string(),
                student_names: ids.iter().map(|id| display_name(&names, id)).collect(),
                present_count: ids.len(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateReportRow {
    pub date: String,
    pub subject: String,
    pub student_names: Vec<String>,
    pub present_count: usize,
}

/// One row per (date, subject) combination. Dates ascend (lexicographic ISO
/// sort); subjects within a date keep insertion order.
pub fn date_wise_report(records: &[AttendanceRecord], students: &[Student]) -> Vec<DateReportRow> {
    let names = roster_names(students);
    let mut by_date: BTreeMap<&str, (Vec<&str>, HashMap<&str, Vec<&str>>)> = BTreeMap::new();
    for r in records {
        let (subject_order, subjects) = by_date.entry(r.date.as_str()).or_default();
        let ids = subjects.entry(r.subject.as_str()).or_insert_with(|| {
            subject_order.push(r.subject.as_str());
            Vec::new()
        });
        if !ids.contains(&r.student_id.as_str()) {
            ids.push(r.student_id.as_str());
        }
    }
    let mut rows = Vec::new();
    for (date, (subject_order, subjects)) in by_date {
        for subject in subject_order {
            let ids = &subjects[subject];
            rows.push(DateReportRow {
                date: date.to_string(),
                subject: subject.to_string(),
                student_names: ids.iter().map(|id| display_name(&names, id)).collect(),
                present_count: ids.len(),
            });
        }
    }
    rows
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSubjectAttendance {
    pub subject: String,
    pub dates: Vec<String>,
    pub attended: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReportRow {
    pub student_id: String,
    pub student_name: String,
    pub subjects: Vec<StudentSubjectAttendance>,
}

/// Iterates the full roster so students with zero attendance still appear
/// (with an empty subject list).
pub fn student_wise_report(
    records: &[AttendanceRecord],
    students: &[Student],
) -> Vec<StudentReportRow> {
    students
        .iter()
        .map(|student| {
            let mut subject_order: Vec<&str> = Vec::new();
            let mut dates: HashMap<&str, Vec<String>> = HashMap::new();
            for r in records.iter().filter(|r| r.student_id == student.id) {
                let entry = dates.entry(r.subject.as_str()).or_insert_with(|| {
                    subject_order.push(r.subject.as_str());
                    Vec::new()
                });
                entry.push(r.date.clone());
            }
            let subjects = subject_order
                .into_iter()
                .map(|subject| {
                    let ds = dates.remove(subject).unwrap_or_default();
                    StudentSubjectAttendance {
                        subject: subject.to_string(),
                        attended: ds.len(),
                        dates: ds,
                    }
                })
                .collect();
            StudentReportRow {
                student_id: student.id.clone(),
                student_name: student.name.clone(),
                subjects,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaulterRow {
    pub student_id: String,
    pub student_name: String,
    pub subject: String,
    pub attended: usize,
    pub total_classes: usize,
    pub percentage: u32,
}

/// Flags (student, subject) pairs below the threshold percentage. The
/// per-subject total is the count of distinct dates with at least one record
/// in that subject; a subject with zero held sessions contributes no rows,
/// so 0/0 is never reported as a default. Threshold range checking is the
/// caller's job.
pub fn defaulters_report(
    threshold: u32,
    records: &[AttendanceRecord],
    students: &[Student],
) -> Vec<DefaulterRow> {
    let mut subject_order: Vec<&str> = Vec::new();
    let mut dates_by_subject: HashMap<&str, HashSet<&str>> = HashMap::new();
    for r in records {
        dates_by_subject
            .entry(r.subject.as_str())
            .or_insert_with(|| {
                subject_order.push(r.subject.as_str());
                HashSet::new()
            })
            .insert(r.date.as_str());
    }

    let mut rows = Vec::new();
    for student in students {
        let mut attended_by_subject: HashMap<&str, usize> = HashMap::new();
        for r in records.iter().filter(|r| r.student_id == student.id) {
            *attended_by_subject.entry(r.subject.as_str()).or_default() += 1;
        }
        for subject in &subject_order {
            let total = dates_by_subject[subject].len();
            if total == 0 {
                continue;
            }
            let attended = attended_by_subject.get(subject).copied().unwrap_or(0);
            let percentage = percentage_of(attended, total);
            if percentage < threshold {
                rows.push(DefaulterRow {
                    student_id: student.id.clone(),
                    student_name: student.name.clone(),
                    subject: subject.to_string(),
                    attended,
                    total_classes: total,
                    percentage,
                });
            }
        }
    }
    rows
}

#[derive(Debug, Clone, Default)]
pub struct RecordFilters {
    pub subject: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl RecordFilters {
    pub fn is_empty(&self) -> bool {
        self.subject.is_none() && self.from.is_none() && self.to.is_none()
    }
}

/// Narrows a record set by subject and inclusive date range before the
/// grouped reports run. Record dates are validated at ingestion; a record
/// whose date fails to parse is excluded whenever a date bound is set.
pub fn apply_filters(records: &[AttendanceRecord], filters: &RecordFilters) -> Vec<AttendanceRecord> {
    if filters.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|r| {
            if let Some(subject) = &filters.subject {
                if r.subject != *subject {
                    return false;
                }
            }
            if filters.from.is_none() && filters.to.is_none() {
                return true;
            }
            let Ok(date) = NaiveDate::parse_from_str(&r.date, "%Y-%m-%d") else {
                return false;
            };
            if let Some(from) = filters.from {
                if date < from {
                    return false;
                }
            }
            if let Some(to) = filters.to {
                if date > to {
                    return false;
                }
            }
            true
        })
        .cloned()
        .collect()
}
