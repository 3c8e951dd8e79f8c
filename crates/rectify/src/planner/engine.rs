//! The rectification planning engine.
//!
//! Given the student's current enrollment, the flattened catalog, and the
//! per-run capacity memo, computes a conflict-free replacement schedule
//! honoring the stated preferences. Courses are decided greedily in
//! enrollment order with immediate commitment: each decision updates the
//! shared slot set so later courses see already-committed changes. This is
//! deliberately not a global solver; the order-dependent semantics are part
//! of the contract.

use chrono::Utc;
use tracing::{debug, info};

use super::capacity::CapacityContext;
use super::catalog::normalize_group_id;
use super::time::{Day, TimeRange};
use super::types::{
    schedule_signature, ChangeRecord, CourseGroup, EnrollmentEntry, FlatCatalog, GroupSnapshot,
    Preferences, RectificationPlan, ScheduledSession, Session, UnsatisfiedEntry, UnsatisfiedReason,
};

/// One committed session of the working schedule. Only sessions with a
/// known day and a parsed range occupy a slot; the rest cannot conflict.
#[derive(Debug, Clone)]
struct TimeSlot {
    course_code: String,
    day: Day,
    range: TimeRange,
}

/// Computes the rectification plan.
///
/// Never removes a course: every enrolled course ends with either its
/// original group or exactly one replacement. Logical non-solutions are
/// reported through `unsatisfied`, not errors.
pub fn plan(
    enrollment: &[EnrollmentEntry],
    catalog: &FlatCatalog,
    capacity: &CapacityContext,
    prefs: &Preferences,
) -> RectificationPlan {
    let mut slots: Vec<TimeSlot> = enrollment
        .iter()
        .flat_map(|entry| slots_for(&entry.course_code, &entry.sessions))
        .collect();

    let mut changes = Vec::new();
    let mut final_schedule = Vec::new();
    let mut unsatisfied = Vec::new();

    for entry in enrollment {
        match decide_course(entry, catalog, capacity, prefs, &mut slots) {
            Decision::Keep => {
                debug!(course = %entry.course_code, "keeping current group");
                push_schedule(&mut final_schedule, entry, &entry.group_id, &entry.sessions);
            }
            Decision::Change(group) => {
                info!(
                    course = %entry.course_code,
                    from = %entry.group_id,
                    to = %group.group_id,
                    "group change committed"
                );
                changes.push(ChangeRecord {
                    course_code: entry.course_code.clone(),
                    course_name: entry.course_name.clone(),
                    from: GroupSnapshot::from_first_session(&entry.group_id, &entry.sessions),
                    to: GroupSnapshot::from_first_session(&group.group_id, &group.sessions),
                });
                push_schedule(&mut final_schedule, entry, &group.group_id, &group.sessions);
            }
            Decision::Unsatisfied(reason) => {
                debug!(course = %entry.course_code, reason = ?reason, "course unsatisfied");
                unsatisfied.push(UnsatisfiedEntry {
                    course_code: entry.course_code.clone(),
                    course_name: entry.course_name.clone(),
                    reason,
                });
                push_schedule(&mut final_schedule, entry, &entry.group_id, &entry.sessions);
            }
        }
    }

    info!(
        courses = enrollment.len(),
        changes = changes.len(),
        unsatisfied = unsatisfied.len(),
        "plan computed"
    );

    RectificationPlan {
        changes,
        final_schedule,
        unsatisfied,
        generated_at: Utc::now().to_rfc3339(),
    }
}

enum Decision<'a> {
    Keep,
    Change(&'a CourseGroup),
    Unsatisfied(UnsatisfiedReason),
}

fn decide_course<'a>(
    entry: &EnrollmentEntry,
    catalog: &'a FlatCatalog,
    capacity: &CapacityContext,
    prefs: &Preferences,
    slots: &mut Vec<TimeSlot>,
) -> Decision<'a> {
    // Fast-keep paths: no search performed.
    if prefs.minimize_changes && prefs.free_days.is_empty() {
        return Decision::Keep;
    }
    if prefs.minimize_changes && !touches_free_day(&entry.sessions, prefs) {
        return Decision::Keep;
    }

    let current_norm = normalize_group_id(&entry.group_id);
    let alternates: Vec<&CourseGroup> = catalog
        .get(&entry.course_code)
        .map(|groups| {
            groups
                .iter()
                .filter(|g| normalize_group_id(&g.group_id) != current_norm)
                .collect()
        })
        .unwrap_or_default();

    if alternates.is_empty() {
        return Decision::Keep;
    }

    // Capacity-aware filtering.
    let mut open = Vec::new();
    let mut full_count = 0usize;
    for group in alternates {
        if capacity.is_group_full(&entry.course_code, &group.group_id) {
            full_count += 1;
        } else {
            open.push(group);
        }
    }
    if full_count > 0 {
        debug!(
            course = %entry.course_code,
            removed = full_count,
            "candidates removed for lack of seats"
        );
    }
    if open.is_empty() {
        return Decision::Unsatisfied(UnsatisfiedReason::NoSeats);
    }

    // Strict pass: honor free days and the committed slot set.
    let mut viable = Vec::new();
    let mut no_conflict = Vec::new();
    let mut saw_conflict = false;
    for group in &open {
        let conflicts = group
            .sessions
            .iter()
            .any(|s| conflicts_with_slots(s, slots, &entry.course_code));
        if conflicts {
            saw_conflict = true;
            continue;
        }
        no_conflict.push(*group);
        if !touches_free_day(&group.sessions, prefs) {
            viable.push(*group);
        }
    }

    // Tie-break: prefer a candidate that actually changes the weekly
    // pattern; an equivalent-signature switch is a pointless move.
    let current_sig = schedule_signature(&entry.sessions);
    let mut chosen = viable
        .iter()
        .find(|g| schedule_signature(&g.sessions) != current_sig)
        .or_else(|| viable.first())
        .copied();

    // Relaxed pass: drop the free-day constraint, keep the no-conflict
    // constraint. Skipped when the student asked for minimal changes; a low
    // change count outranks forcing a free day.
    if chosen.is_none() && !prefs.minimize_changes {
        chosen = no_conflict.first().copied();
    }

    match chosen {
        Some(group) => {
            slots.retain(|slot| slot.course_code != entry.course_code);
            slots.extend(slots_for(&entry.course_code, &group.sessions));
            Decision::Change(group)
        }
        None => {
            let reason = if saw_conflict {
                UnsatisfiedReason::Conflict
            } else {
                UnsatisfiedReason::FreeDayUnavailable
            };
            Decision::Unsatisfied(reason)
        }
    }
}

fn slots_for(course_code: &str, sessions: &[Session]) -> Vec<TimeSlot> {
    sessions
        .iter()
        .filter(|s| s.day.is_known())
        .filter_map(|s| {
            s.range.map(|range| TimeSlot {
                course_code: course_code.to_string(),
                day: s.day,
                range,
            })
        })
        .collect()
}

fn conflicts_with_slots(session: &Session, slots: &[TimeSlot], own_course: &str) -> bool {
    if !session.day.is_known() {
        return false;
    }
    let Some(range) = session.range else {
        return false;
    };
    slots.iter().any(|slot| {
        slot.course_code != own_course && slot.day == session.day && slot.range.overlaps(&range)
    })
}

fn touches_free_day(sessions: &[Session], prefs: &Preferences) -> bool {
    sessions
        .iter()
        .any(|s| s.day.is_known() && prefs.free_days.contains(&s.day))
}

fn push_schedule(
    schedule: &mut Vec<ScheduledSession>,
    entry: &EnrollmentEntry,
    group_id: &str,
    sessions: &[Session],
) {
    for session in sessions {
        schedule.push(ScheduledSession {
            course_code: entry.course_code.clone(),
            course_name: entry.course_name.clone(),
            group_id: group_id.to_string(),
            session: session.clone(),
        });
    }
}
