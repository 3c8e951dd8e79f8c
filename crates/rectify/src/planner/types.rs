//! Types for the rectification planning core.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};

use super::time::{canonical_day, Day, TimeRange};

/// Pedagogical format of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modality {
    TheoryInPerson,
    TheoryVirtual,
    LabInPerson,
    Other,
}

impl Modality {
    pub fn is_theory(self) -> bool {
        matches!(self, Modality::TheoryInPerson | Modality::TheoryVirtual)
    }

    pub fn is_lab(self) -> bool {
        matches!(self, Modality::LabInPerson)
    }
}

/// One meeting block of a group: day, time range, modality.
///
/// `range` is `None` when the feed's time text could not be parsed; such
/// sessions are kept for display but place no constraint on conflict
/// checking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub day: Day,

    pub range: Option<TimeRange>,

    /// Time text as shown to the student (normalized when parseable,
    /// otherwise the raw feed text).
    #[serde(rename = "timeLabel")]
    pub time_label: String,

    pub modality: Modality,
}

impl Session {
    /// True iff both sessions have a known, equal day and parsed ranges
    /// that intersect.
    pub fn conflicts_with(&self, other: &Session) -> bool {
        if !self.day.is_known() || self.day != other.day {
            return false;
        }
        match (&self.range, &other.range) {
            (Some(a), Some(b)) => a.overlaps(b),
            _ => false,
        }
    }

    /// "day|time" token used for schedule signatures.
    pub fn signature_token(&self) -> String {
        let time = match &self.range {
            Some(range) => range.label(),
            None => self.time_label.clone(),
        };
        format!("{}|{}", self.day, time)
    }
}

/// Sorted day|time signature of a session list.
///
/// Two groups with the same signature meet at exactly the same times, so
/// switching between them would not change the student's week.
pub fn schedule_signature(sessions: &[Session]) -> BTreeSet<String> {
    sessions.iter().map(Session::signature_token).collect()
}

/// A specific scheduled offering of a course. Identity is
/// (`course_code`, `group_id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseGroup {
    #[serde(rename = "courseCode")]
    pub course_code: String,

    #[serde(rename = "groupId")]
    pub group_id: String,

    pub sessions: Vec<Session>,
}

/// Flattened catalog: per course code, the candidate groups in catalog order.
pub type FlatCatalog = HashMap<String, Vec<CourseGroup>>;

/// The student's current assignment for one enrolled course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentEntry {
    #[serde(rename = "courseCode")]
    pub course_code: String,

    #[serde(rename = "courseName")]
    pub course_name: String,

    #[serde(rename = "groupId")]
    pub group_id: String,

    pub sessions: Vec<Session>,
}

/// Seat occupancy for one group, derived per planning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityRecord {
    #[serde(rename = "courseCode")]
    pub course_code: String,

    #[serde(rename = "groupId")]
    pub group_id: String,

    #[serde(rename = "enrolledCount")]
    pub enrolled_count: u32,

    #[serde(rename = "totalSeats")]
    pub total_seats: u32,

    #[serde(rename = "seatsLeft")]
    pub seats_left: u32,

    #[serde(rename = "isFull")]
    pub is_full: bool,
}

impl CapacityRecord {
    pub fn new(course_code: &str, group_id: &str, enrolled_count: u32, total_seats: u32) -> Self {
        let seats_left = total_seats.saturating_sub(enrolled_count);
        Self {
            course_code: course_code.to_string(),
            group_id: group_id.to_string(),
            enrolled_count,
            total_seats,
            seats_left,
            is_full: seats_left == 0,
        }
    }

    /// Builds a record from a seats-remaining figure ("vacantes" feeds
    /// report free seats, not capacity).
    pub fn from_remaining(
        course_code: &str,
        group_id: &str,
        enrolled_count: u32,
        seats_left: u32,
    ) -> Self {
        Self {
            course_code: course_code.to_string(),
            group_id: group_id.to_string(),
            enrolled_count,
            total_seats: enrolled_count + seats_left,
            seats_left,
            is_full: seats_left == 0,
        }
    }
}

/// Student preferences for the planning run.
#[derive(Debug, Clone, Default)]
pub struct Preferences {
    /// Days the student wants free of any class session.
    pub free_days: HashSet<Day>,

    /// Prefer keeping current groups over forcing free days.
    pub minimize_changes: bool,
}

impl Preferences {
    /// Builds preferences from the loose JSON shape the portal accepts:
    /// `{"freeDays": ["LUNES", ...], "keepChangesLow": true}`.
    ///
    /// A missing or non-array `freeDays` is treated as empty; unrecognized
    /// day names are ignored rather than rejected.
    pub fn from_json(raw: &Value) -> Self {
        let free_days = raw
            .get("freeDays")
            .and_then(Value::as_array)
            .map(|days| {
                days.iter()
                    .filter_map(Value::as_str)
                    .map(canonical_day)
                    .filter(|d| d.is_known())
                    .collect()
            })
            .unwrap_or_default();

        let minimize_changes = raw
            .get("keepChangesLow")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Self {
            free_days,
            minimize_changes,
        }
    }
}

/// Snapshot of a group assignment (first session only) for change records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSnapshot {
    #[serde(rename = "groupId")]
    pub group_id: String,

    pub day: String,

    pub time: String,

    pub modality: Option<Modality>,
}

impl GroupSnapshot {
    pub fn from_first_session(group_id: &str, sessions: &[Session]) -> Self {
        let first = sessions.first();
        Self {
            group_id: group_id.to_string(),
            day: first.map(|s| s.day.to_string()).unwrap_or_default(),
            time: first.map(|s| s.time_label.clone()).unwrap_or_default(),
            modality: first.map(|s| s.modality),
        }
    }
}

/// Produced when a course's group actually changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord {
    #[serde(rename = "courseCode")]
    pub course_code: String,

    #[serde(rename = "courseName")]
    pub course_name: String,

    pub from: GroupSnapshot,

    pub to: GroupSnapshot,
}

/// Why no qualifying replacement could be found for a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnsatisfiedReason {
    #[serde(rename = "NO_SEATS")]
    NoSeats,

    #[serde(rename = "CONFLICT")]
    Conflict,

    #[serde(rename = "FREE_DAY_UNAVAILABLE")]
    FreeDayUnavailable,
}

/// A course the planner could not move; its original assignment is retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsatisfiedEntry {
    #[serde(rename = "courseCode")]
    pub course_code: String,

    #[serde(rename = "courseName")]
    pub course_name: String,

    pub reason: UnsatisfiedReason,
}

/// One session of the final (post-decision) schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledSession {
    #[serde(rename = "courseCode")]
    pub course_code: String,

    #[serde(rename = "courseName")]
    pub course_name: String,

    #[serde(rename = "groupId")]
    pub group_id: String,

    pub session: Session,
}

/// Full planner output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RectificationPlan {
    pub changes: Vec<ChangeRecord>,

    #[serde(rename = "finalSchedule")]
    pub final_schedule: Vec<ScheduledSession>,

    pub unsatisfied: Vec<UnsatisfiedEntry>,

    #[serde(rename = "generatedAt")]
    pub generated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_capacity_record_derivation() {
        let rec = CapacityRecord::new("MAT101", "A", 28, 30);
        assert_eq!(rec.seats_left, 2);
        assert!(!rec.is_full);

        let full = CapacityRecord::new("MAT101", "B", 30, 30);
        assert_eq!(full.seats_left, 0);
        assert!(full.is_full);

        // Over-enrolled groups clamp at zero rather than underflowing
        let over = CapacityRecord::new("MAT101", "C", 35, 30);
        assert_eq!(over.seats_left, 0);
        assert!(over.is_full);
    }

    #[test]
    fn test_preferences_loose_parsing() {
        let prefs = Preferences::from_json(&json!({
            "freeDays": ["LUNES", "viernes", "not-a-day"],
            "keepChangesLow": true
        }));
        assert!(prefs.free_days.contains(&Day::Monday));
        assert!(prefs.free_days.contains(&Day::Friday));
        assert_eq!(prefs.free_days.len(), 2);
        assert!(prefs.minimize_changes);
    }

    #[test]
    fn test_preferences_missing_or_malformed_fields() {
        let prefs = Preferences::from_json(&json!({}));
        assert!(prefs.free_days.is_empty());
        assert!(!prefs.minimize_changes);

        // Non-array freeDays is treated as empty, not an error
        let prefs = Preferences::from_json(&json!({"freeDays": "LUNES"}));
        assert!(prefs.free_days.is_empty());
    }

    #[test]
    fn test_schedule_signature_order_independent() {
        let a = Session {
            day: Day::Monday,
            range: crate::planner::time::parse_time_range("08:00 - 10:00"),
            time_label: "08:00 - 10:00".to_string(),
            modality: Modality::TheoryInPerson,
        };
        let b = Session {
            day: Day::Wednesday,
            range: crate::planner::time::parse_time_range("10:00 - 12:00"),
            time_label: "10:00 - 12:00".to_string(),
            modality: Modality::LabInPerson,
        };
        let forward = schedule_signature(&[a.clone(), b.clone()]);
        let backward = schedule_signature(&[b, a]);
        assert_eq!(forward, backward);
    }
}
