//! Schedule-rectification planning.
//!
//! The flow for one planning run:
//! 1. Fetch the availability catalog for the period and flatten it.
//! 2. Fetch occupancy rows for every distinct enrolled course
//!    (concurrently; each course is fetched exactly once per run).
//! 3. Run the greedy per-course planning engine.
//!
//! All working state — the flattened catalog, the capacity memo, the slot
//! set — lives and dies with the invocation. A collaborator fault fails the
//! whole run; the caller never sees a partial plan.

pub mod capacity;
pub mod catalog;
pub mod client;
pub mod engine;
pub mod error;
pub mod time;
pub mod types;

pub use capacity::CapacityContext;
pub use client::{SisClient, SisConfig};
pub use error::PlanError;
pub use types::{
    EnrollmentEntry, Preferences, RectificationPlan, UnsatisfiedEntry, UnsatisfiedReason,
};

use futures::future::try_join_all;
use rand::Rng;
use std::time::Instant;
use tracing::{error, info};

/// Distinct course codes in first-seen order.
fn distinct_course_codes(enrollment: &[EnrollmentEntry]) -> Vec<&str> {
    let mut seen = std::collections::HashSet::new();
    enrollment
        .iter()
        .map(|e| e.course_code.as_str())
        .filter(|code| seen.insert(*code))
        .collect()
}

/// Runs one full planning invocation against the SIS.
///
/// # Arguments
/// * `client` - SIS client for the catalog and occupancy feeds
/// * `period` - Academic period identifier (e.g. "2026-1")
/// * `enrollment` - The student's current sections, resolved by the caller
/// * `prefs` - Free days and change-minimization preference
pub async fn build_plan(
    client: &SisClient,
    period: &str,
    enrollment: &[EnrollmentEntry],
    prefs: &Preferences,
) -> Result<RectificationPlan, PlanError> {
    let correlation_id = generate_correlation_id();
    let start = Instant::now();

    info!(
        correlation_id = %correlation_id,
        period = %period,
        courses = enrollment.len(),
        "starting planning run"
    );

    let raw_catalog = client.fetch_catalog(period).await.map_err(|e| {
        error!(
            correlation_id = %correlation_id,
            error = %e,
            retryable = e.is_retryable(),
            "catalog fetch failed"
        );
        e
    })?;
    let flat_catalog = catalog::flatten_catalog(&raw_catalog);

    // Occupancy fetches for different courses are independent and
    // read-only, so they run concurrently; all must land before any
    // candidate filtering consults them.
    let codes = distinct_course_codes(enrollment);
    let fetches = codes.iter().map(|code| async {
        let rows = client.fetch_capacity_rows(period, code).await?;
        Ok::<_, PlanError>((*code, rows))
    });
    let fetched = try_join_all(fetches).await.map_err(|e| {
        error!(
            correlation_id = %correlation_id,
            error = %e,
            retryable = e.is_retryable(),
            "capacity fetch failed"
        );
        e
    })?;

    let mut capacity = CapacityContext::new();
    for (code, rows) in &fetched {
        capacity.insert_course(code, rows);
    }

    let plan = engine::plan(enrollment, &flat_catalog, &capacity, prefs);

    info!(
        correlation_id = %correlation_id,
        duration_ms = start.elapsed().as_millis() as u64,
        changes = plan.changes.len(),
        unsatisfied = plan.unsatisfied.len(),
        "planning run completed"
    );

    Ok(plan)
}

/// Generates a unique correlation ID for request tracing.
fn generate_correlation_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros();
    let random: u32 = rand::thread_rng().gen();
    format!("{:x}-{:08x}", timestamp & 0xFFFFFFFF, random)
}
