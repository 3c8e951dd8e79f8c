//! Seat-capacity normalization and the per-run capacity memo.
//!
//! The occupancy service returns rows with its own alias drift for group
//! ids and seat counts. Rows lacking a recognizable group id are dropped,
//! as are rows without any usable seat figure: a group whose occupancy is
//! unknown is treated as open (fail open) — unknown occupancy must not
//! block an otherwise viable change.
//!
//! Seat figures come in two vocabularies: absolute capacity
//! ("capacity"/"total"/"cupos") and seats remaining ("vacantes" — in these
//! feeds it counts free seats, not capacity — "disponibles").

use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use super::catalog::normalize_group_id;
use super::types::CapacityRecord;

const GROUP_ALIASES: &[&str] = &["group", "groupId", "grupo", "seccion", "section"];
const ENROLLED_ALIASES: &[&str] = &[
    "enrolled",
    "enrolledCount",
    "matriculados",
    "inscritos",
    "occupied",
];
const SEATS_ALIASES: &[&str] = &["capacity", "totalSeats", "total", "seats", "cupos"];
const SEATS_LEFT_ALIASES: &[&str] = &["vacantes", "seatsLeft", "disponibles", "available"];

/// Capacity per group, keyed by normalized group id.
pub type GroupCapacity = HashMap<String, CapacityRecord>;

/// Per-planning-run capacity memo.
///
/// Built once per invocation from the prefetched occupancy rows of every
/// distinct enrolled course; repeated lookups for the same course never
/// reach the network again. Discarded with the run.
#[derive(Debug, Default)]
pub struct CapacityContext {
    by_course: HashMap<String, GroupCapacity>,
}

impl CapacityContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the occupancy rows fetched for one course.
    pub fn insert_course(&mut self, course_code: &str, rows: &Value) {
        let records = flatten_capacity_rows(course_code, rows);
        debug!(
            course = %course_code,
            groups = records.len(),
            "capacity rows normalized"
        );
        self.by_course.insert(course_code.to_string(), records);
    }

    /// True only when the feed positively marks the group full. Groups (or
    /// whole courses) absent from the feed count as open.
    pub fn is_group_full(&self, course_code: &str, group_id: &str) -> bool {
        self.by_course
            .get(course_code)
            .and_then(|groups| groups.get(&normalize_group_id(group_id)))
            .map(|rec| rec.is_full)
            .unwrap_or(false)
    }
}

/// Normalizes raw occupancy rows for one course into per-group records.
pub fn flatten_capacity_rows(course_code: &str, rows: &Value) -> GroupCapacity {
    let mut out = GroupCapacity::new();

    let items: Vec<&Value> = match rows {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        _ => Vec::new(),
    };

    for item in items {
        let Some(map) = item.as_object() else {
            continue;
        };

        // Rows without a recognizable group id carry no usable information.
        let Some(group_id) = alias_text(map, GROUP_ALIASES) else {
            continue;
        };
        let key = normalize_group_id(&group_id);
        if key.is_empty() {
            continue;
        }

        let enrolled = alias_count(map, ENROLLED_ALIASES).unwrap_or(0);
        let record = if let Some(total) = alias_count(map, SEATS_ALIASES) {
            CapacityRecord::new(course_code, &group_id, enrolled, total)
        } else if let Some(left) = alias_count(map, SEATS_LEFT_ALIASES) {
            CapacityRecord::from_remaining(course_code, &group_id, enrolled, left)
        } else {
            // No usable seat figure: unknown occupancy stays open
            continue;
        };
        out.insert(key, record);
    }

    out
}

fn alias_text(map: &serde_json::Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|alias| {
        map.get(*alias).and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    })
}

fn alias_count(map: &serde_json::Map<String, Value>, aliases: &[&str]) -> Option<u32> {
    aliases.iter().find_map(|alias| {
        map.get(*alias).and_then(|v| match v {
            Value::Number(n) => n.as_u64().map(|n| n as u32),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_rows_with_aliases() {
        let rows = json!([
            {"grupo": "A", "matriculados": 28, "total": 30},
            {"groupId": "B", "enrolled": "30", "capacity": "30"}
        ]);

        let caps = flatten_capacity_rows("MAT101", &rows);
        assert_eq!(caps.len(), 2);
        assert!(!caps["a"].is_full);
        assert_eq!(caps["a"].seats_left, 2);
        assert!(caps["b"].is_full);
    }

    #[test]
    fn test_vacantes_counts_remaining_seats() {
        // "vacantes" reports free seats, not capacity
        let rows = json!([
            {"grupo": "A", "matriculados": 28, "vacantes": 2},
            {"grupo": "B", "matriculados": 30, "vacantes": 0}
        ]);

        let caps = flatten_capacity_rows("MAT101", &rows);
        assert_eq!(caps["a"].seats_left, 2);
        assert_eq!(caps["a"].total_seats, 30);
        assert!(!caps["a"].is_full);
        assert!(caps["b"].is_full);
    }

    #[test]
    fn test_rows_without_group_id_dropped() {
        let rows = json!([
            {"matriculados": 10, "total": 30},
            {"grupo": "C", "matriculados": 5, "total": 30}
        ]);

        let caps = flatten_capacity_rows("MAT101", &rows);
        assert_eq!(caps.len(), 1);
        assert!(caps.contains_key("c"));
    }

    #[test]
    fn test_rows_without_seat_figures_fail_open() {
        // A row naming a group but carrying no usable counts must not be
        // read as a zero-seat group
        let mut ctx = CapacityContext::new();
        ctx.insert_course("MAT101", &json!([{"grupo": "B", "cupos": "?"}]));
        assert!(!ctx.is_group_full("MAT101", "B"));

        // Enrolled count alone says nothing about fullness either
        ctx.insert_course("FIS201", &json!([{"grupo": "A", "matriculados": 30}]));
        assert!(!ctx.is_group_full("FIS201", "A"));
    }

    #[test]
    fn test_unknown_groups_fail_open() {
        let mut ctx = CapacityContext::new();
        ctx.insert_course("MAT101", &json!([{"grupo": "A", "matriculados": 30, "vacantes": 0}]));

        assert!(ctx.is_group_full("MAT101", "A"));
        // Group missing from the feed: open
        assert!(!ctx.is_group_full("MAT101", "B"));
        // Whole course missing from the feed: open
        assert!(!ctx.is_group_full("FIS201", "A"));
    }

    #[test]
    fn test_group_id_matching_is_normalized() {
        let mut ctx = CapacityContext::new();
        ctx.insert_course("MAT101", &json!([{"grupo": "G-01", "matriculados": 30, "vacantes": 0}]));
        assert!(ctx.is_group_full("MAT101", "g01"));
    }

    #[test]
    fn test_object_keyed_rows() {
        let rows = json!({
            "0": {"seccion": "A", "inscritos": 12, "total": 40}
        });
        let caps = flatten_capacity_rows("MAT101", &rows);
        assert_eq!(caps["a"].seats_left, 28);
    }
}
