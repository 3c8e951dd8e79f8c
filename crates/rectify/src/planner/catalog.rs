//! Catalog flattening and alias normalization.
//!
//! The availability service returns a nested course -> group -> session
//! structure whose field names drift across feeds (`day`/`dayName`/`dia`,
//! `start`/`hourStart`/`horaInicio`, ...), and whose session lists arrive as
//! flat arrays, nested arrays, or objects keyed by arbitrary ids. Every
//! known alias is resolved here, once; the planner only ever sees the
//! canonical [`Session`] shape.

use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

use super::time::{canonical_day, fold_ascii, parse_clock, parse_time_range, Day, TimeRange};
use super::types::{CourseGroup, FlatCatalog, Modality, Session};

const DAY_ALIASES: &[&str] = &["day", "dayName", "dia", "diaNombre", "dayCode", "codigoDia"];
const START_ALIASES: &[&str] = &["start", "hourStart", "hourIni", "horaInicio", "inicio"];
const END_ALIASES: &[&str] = &["end", "hourEnd", "hourFin", "horaFin", "fin"];
const TIME_TEXT_ALIASES: &[&str] = &["time", "horario", "schedule", "hours", "horas"];
const MODALITY_ALIASES: &[&str] = &["modality", "modalidad", "type", "tipo"];
const GROUP_MAP_ALIASES: &[&str] = &["groups", "grupos", "sections", "secciones"];
const SESSION_LIST_ALIASES: &[&str] = &["sessions", "sesiones", "horarios", "schedule"];

/// Normalizes a group identifier for identity comparisons: lowercase,
/// diacritics stripped, punctuation removed. "G-01" and "g01" are the same
/// group.
pub fn normalize_group_id(raw: &str) -> String {
    fold_ascii(raw)
}

/// Flattens the raw nested catalog into per-course candidate group lists.
///
/// Courses whose sessions span both a theory and a lab modality are subject
/// to the co-enrollment rule: a candidate group must itself offer both a
/// theory and a lab session, otherwise it is excluded.
pub fn flatten_catalog(raw: &Value) -> FlatCatalog {
    let mut catalog = FlatCatalog::new();

    let Some(courses) = raw.as_object() else {
        warn!("catalog payload is not an object; treating as empty");
        return catalog;
    };

    for (course_code, course_val) in courses {
        let groups = flatten_course(course_code, course_val);
        if groups.is_empty() {
            debug!(course = %course_code, "course produced no valid groups");
        }
        catalog.insert(course_code.clone(), groups);
    }

    catalog
}

fn flatten_course(course_code: &str, course_val: &Value) -> Vec<CourseGroup> {
    let Some(group_map) = locate_group_map(course_val) else {
        return Vec::new();
    };

    // Dedup by normalized group id, merging session lists. First-seen
    // spelling of the id wins for display.
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, CourseGroup> = HashMap::new();

    for (group_id, group_val) in group_map {
        let mut raw_sessions = Vec::new();
        collect_raw_sessions(locate_session_list(group_val), &mut raw_sessions);

        let sessions: Vec<Session> = raw_sessions.iter().filter_map(|v| parse_session(v)).collect();
        if sessions.is_empty() {
            continue;
        }

        let key = normalize_group_id(group_id);
        if key.is_empty() {
            continue;
        }
        match merged.get_mut(&key) {
            Some(existing) => existing.sessions.extend(sessions),
            None => {
                order.push(key.clone());
                merged.insert(
                    key,
                    CourseGroup {
                        course_code: course_code.to_string(),
                        group_id: group_id.clone(),
                        sessions,
                    },
                );
            }
        }
    }

    let groups: Vec<CourseGroup> = order
        .into_iter()
        .filter_map(|key| merged.remove(&key))
        .collect();

    apply_coenrollment_rule(groups)
}

/// Theory and lab must be co-enrolled within one group pairing: when a
/// course offers both modalities somewhere in its groups, any group missing
/// either one is excluded as a candidate.
fn apply_coenrollment_rule(groups: Vec<CourseGroup>) -> Vec<CourseGroup> {
    let has_theory = groups
        .iter()
        .flat_map(|g| &g.sessions)
        .any(|s| s.modality.is_theory());
    let has_lab = groups
        .iter()
        .flat_map(|g| &g.sessions)
        .any(|s| s.modality.is_lab());

    if !(has_theory && has_lab) {
        return groups;
    }

    groups
        .into_iter()
        .filter(|g| {
            g.sessions.iter().any(|s| s.modality.is_theory())
                && g.sessions.iter().any(|s| s.modality.is_lab())
        })
        .collect()
}

/// Finds the group-id -> group mapping inside a course object. Some feeds
/// nest it under a "groups"/"grupos" key; others make the course object the
/// map itself.
fn locate_group_map(course_val: &Value) -> Option<&Map<String, Value>> {
    let obj = course_val.as_object()?;
    for alias in GROUP_MAP_ALIASES {
        if let Some(inner) = obj.get(*alias).and_then(Value::as_object) {
            return Some(inner);
        }
    }
    Some(obj)
}

fn locate_session_list(group_val: &Value) -> &Value {
    if let Some(obj) = group_val.as_object() {
        for alias in SESSION_LIST_ALIASES {
            if let Some(inner) = obj.get(*alias) {
                return inner;
            }
        }
    }
    group_val
}

/// Walks arbitrarily nested arrays and keyed objects, collecting anything
/// that looks like a session record.
fn collect_raw_sessions<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_raw_sessions(item, out);
            }
        }
        Value::Object(map) => {
            if looks_like_session(map) {
                out.push(value);
            } else {
                for inner in map.values() {
                    collect_raw_sessions(inner, out);
                }
            }
        }
        _ => {}
    }
}

fn looks_like_session(map: &Map<String, Value>) -> bool {
    DAY_ALIASES
        .iter()
        .chain(TIME_TEXT_ALIASES)
        .chain(START_ALIASES)
        .any(|alias| map.contains_key(*alias))
}

fn alias_value<'a>(map: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| map.get(*alias))
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Normalizes one raw session record.
///
/// Missing or malformed day/time fields are tolerated: the session is still
/// emitted (for display) with `Day::Unknown` or `range: None`, which simply
/// contributes no constraint to conflict checking.
fn parse_session(raw: &Value) -> Option<Session> {
    let map = raw.as_object()?;

    let day = alias_value(map, DAY_ALIASES)
        .and_then(value_as_text)
        .map(|text| canonical_day(&text))
        .unwrap_or(Day::Unknown);

    let (range, time_label) = parse_session_time(map);

    let modality = alias_value(map, MODALITY_ALIASES)
        .and_then(Value::as_str)
        .map(classify_modality)
        .unwrap_or(Modality::Other);

    Some(Session {
        day,
        range,
        time_label,
        modality,
    })
}

fn parse_session_time(map: &Map<String, Value>) -> (Option<TimeRange>, String) {
    // Explicit start/end fields take precedence over combined time text.
    let start = alias_value(map, START_ALIASES).and_then(value_as_text);
    let end = alias_value(map, END_ALIASES).and_then(value_as_text);

    if let (Some(start_text), Some(end_text)) = (&start, &end) {
        if let (Some(a), Some(b)) = (parse_clock(start_text), parse_clock(end_text)) {
            if a != b {
                let (start_minute, end_minute) = if a <= b { (a, b) } else { (b, a) };
                let range = TimeRange {
                    start_minute,
                    end_minute,
                };
                let label = range.label();
                return (Some(range), label);
            }
        }
        return (None, format!("{} - {}", start_text, end_text));
    }

    let text = alias_value(map, TIME_TEXT_ALIASES)
        .and_then(value_as_text)
        .unwrap_or_default();
    let range = parse_time_range(&text);
    let label = range.map(|r| r.label()).unwrap_or(text);
    (range, label)
}

fn classify_modality(raw: &str) -> Modality {
    let folded = fold_ascii(raw);
    if folded.contains("lab") {
        Modality::LabInPerson
    } else if folded.contains("virtual") {
        Modality::TheoryVirtual
    } else if folded.contains("teo") || folded.contains("theory") {
        Modality::TheoryInPerson
    } else {
        Modality::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_flat_session_array() {
        let raw = json!({
            "MAT101": {
                "A": [
                    {"dia": "LUNES", "horaInicio": "08:00", "horaFin": "10:00", "tipo": "TEORIA"}
                ]
            }
        });

        let catalog = flatten_catalog(&raw);
        let groups = &catalog["MAT101"];
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].group_id, "A");
        assert_eq!(groups[0].sessions[0].day, Day::Monday);
        assert_eq!(
            groups[0].sessions[0].range.unwrap(),
            TimeRange { start_minute: 480, end_minute: 600 }
        );
    }

    #[test]
    fn test_flatten_nested_arrays_and_keyed_objects() {
        let raw = json!({
            "FIS201": {
                "grupos": {
                    "G1": {
                        "sesiones": [[
                            {"dayName": "Martes", "time": "10:00 - 12:00", "type": "theory"}
                        ]]
                    },
                    "G2": {
                        "horarios": {
                            "s1": {"day": "3", "hourIni": "14:00", "hourFin": "16:00"}
                        }
                    }
                }
            }
        });

        let catalog = flatten_catalog(&raw);
        let groups = &catalog["FIS201"];
        assert_eq!(groups.len(), 2);

        let g1 = groups.iter().find(|g| g.group_id == "G1").unwrap();
        assert_eq!(g1.sessions[0].day, Day::Tuesday);
        assert_eq!(g1.sessions[0].range.unwrap().start_minute, 600);

        let g2 = groups.iter().find(|g| g.group_id == "G2").unwrap();
        assert_eq!(g2.sessions[0].day, Day::Wednesday);
    }

    #[test]
    fn test_group_dedup_merges_sessions() {
        let raw = json!({
            "QUI110": {
                "G-01": [
                    {"dia": "LUNES", "horario": "08:00 - 10:00", "tipo": "TEORIA"}
                ],
                "g01": [
                    {"dia": "JUEVES", "horario": "08:00 - 10:00", "tipo": "TEORIA"}
                ]
            }
        });

        let catalog = flatten_catalog(&raw);
        let groups = &catalog["QUI110"];
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].group_id, "G-01");
        assert_eq!(groups[0].sessions.len(), 2);
    }

    #[test]
    fn test_coenrollment_rule_excludes_partial_groups() {
        let raw = json!({
            "BIO210": {
                "A": [
                    {"dia": "LUNES", "horario": "08:00 - 10:00", "tipo": "TEORÍA"},
                    {"dia": "MARTES", "horario": "08:00 - 10:00", "tipo": "LABORATORIO"}
                ],
                "B": [
                    {"dia": "MIERCOLES", "horario": "08:00 - 10:00", "tipo": "TEORÍA"}
                ]
            }
        });

        let catalog = flatten_catalog(&raw);
        let groups = &catalog["BIO210"];
        // Group B offers only theory while the course is mixed, so it drops
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].group_id, "A");
    }

    #[test]
    fn test_coenrollment_rule_skips_uniform_courses() {
        let raw = json!({
            "HIS100": {
                "A": [{"dia": "LUNES", "horario": "08:00 - 10:00", "tipo": "TEORIA"}],
                "B": [{"dia": "MARTES", "horario": "08:00 - 10:00", "tipo": "TEORIA"}]
            }
        });

        let catalog = flatten_catalog(&raw);
        assert_eq!(catalog["HIS100"].len(), 2);
    }

    #[test]
    fn test_malformed_session_retained_without_constraint() {
        let raw = json!({
            "ART105": {
                "A": [
                    {"dia": "LUNES", "horario": "por confirmar"},
                    {"dia": "???", "horario": "10:00 - 12:00"}
                ]
            }
        });

        let catalog = flatten_catalog(&raw);
        let sessions = &catalog["ART105"][0].sessions;
        assert_eq!(sessions.len(), 2);
        assert!(sessions[0].range.is_none());
        assert_eq!(sessions[0].time_label, "por confirmar");
        assert_eq!(sessions[1].day, Day::Unknown);
        assert!(sessions[1].range.is_some());
    }

    #[test]
    fn test_non_object_catalog_is_empty() {
        assert!(flatten_catalog(&json!([1, 2, 3])).is_empty());
        assert!(flatten_catalog(&json!(null)).is_empty());
    }

    #[test]
    fn test_modality_classification() {
        assert_eq!(classify_modality("LABORATORIO"), Modality::LabInPerson);
        assert_eq!(classify_modality("TEORÍA VIRTUAL"), Modality::TheoryVirtual);
        assert_eq!(classify_modality("TEORIA"), Modality::TheoryInPerson);
        assert_eq!(classify_modality("SEMINARIO"), Modality::Other);
    }
}
