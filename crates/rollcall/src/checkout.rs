//! Check-out: a volunteer closes their session and hands materials back.
//!
//! Preconditions, checked inside the transaction in this order:
//!
//! 1. the volunteer exists and has an open session,
//! 2. the dispositions name exactly the session's materials,
//! 3. every disposition is `returned`, `damaged` or `lost`,
//! 4. every session material is still loaned to this volunteer.
//!
//! Each material then moves to the status its disposition maps to, one
//! check-out activity is recorded, the session is cleared, and the
//! session's rounded hours are added to the volunteer's total.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::error::{rules, Error, Result};
use crate::lifecycle;
use crate::model::{
    new_id, Activity, ActivityDetail, CheckoutItem, Disposition, Material, Volunteer,
};
use crate::store::{Collection, Store};
use crate::text::format_duration;
use crate::validation;

/// Check-out orchestrator.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    store: Store,
    clock: Arc<dyn Clock>,
}

impl CheckoutService {
    /// Create a service over `store`.
    #[must_use]
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Close `volunteer_id`'s session, returning the new activity id.
    ///
    /// `dispositions` must have one entry per material in the session.
    ///
    /// # Errors
    ///
    /// Returns a validation error for over-long notes, `NotFound` for an
    /// unknown volunteer or a session material that no longer exists, a
    /// business rule error when a precondition fails (including a session
    /// material now held by someone else), or a storage error.
    /// Nothing is written on error.
    pub async fn process(
        &self,
        volunteer_id: &str,
        dispositions: &BTreeMap<String, Disposition>,
        notes: Option<&str>,
    ) -> Result<String> {
        self.close(volunteer_id, dispositions, notes, |d| Ok(*d)).await
    }

    /// Like [`CheckoutService::process`], with dispositions as submitted
    /// by a form.
    ///
    /// Values are only interpreted once the key set has been checked, so a
    /// missing material is reported before a misspelled disposition.
    ///
    /// # Errors
    ///
    /// As [`CheckoutService::process`], plus a business rule error for an
    /// unrecognized disposition.
    pub async fn process_raw(
        &self,
        volunteer_id: &str,
        dispositions: &BTreeMap<String, String>,
        notes: Option<&str>,
    ) -> Result<String> {
        self.close(volunteer_id, dispositions, notes, |s| s.trim().parse()).await
    }

    async fn close<V>(
        &self,
        volunteer_id: &str,
        dispositions: &BTreeMap<String, V>,
        notes: Option<&str>,
        parse: fn(&V) -> Result<Disposition>,
    ) -> Result<String> {
        let notes = validation::notes(notes)?;

        info!(
            volunteer_id,
            materials = dispositions.len(),
            "Processing check-out"
        );

        let now = self.clock.now();
        let result = self
            .store
            .transaction(&Collection::ALL, |txn| {
                let mut volunteer: Volunteer = txn.require(volunteer_id)?;
                let Some(session) = volunteer.active_session.take() else {
                    return Err(Error::business(
                        rules::NOT_CHECKED_IN,
                        format!("volunteer '{}' is not checked in", volunteer.name),
                    ));
                };

                check_coverage(&session.material_ids, dispositions)?;

                let mut chosen = Vec::with_capacity(session.material_ids.len());
                for id in &session.material_ids {
                    let raw = dispositions.get(id).ok_or_else(|| {
                        Error::internal(format!("no disposition for {id} after coverage check"))
                    })?;
                    let disposition = parse(raw).map_err(|err| match err {
                        Error::BusinessRule { message, .. } => Error::business(
                            rules::INVALID_DISPOSITION,
                            format!("material {id}: {message}"),
                        ),
                        other => other,
                    })?;
                    chosen.push((id, disposition));
                }

                let mut items = Vec::with_capacity(chosen.len());
                for (id, disposition) in chosen {
                    let mut material: Material = txn.require(id)?;
                    if material.loaned_to.as_deref() != Some(volunteer.id.as_str()) {
                        return Err(Error::business(
                            rules::NOT_HELD_BY_VOLUNTEER,
                            format!(
                                "material '{}' is no longer loaned to '{}'",
                                material.name,
                                volunteer.name
                            ),
                        ));
                    }
                    lifecycle::transition(&mut material, disposition.target_status(), None, now)?;
                    items.push(CheckoutItem {
                        material_id: material.id.clone(),
                        material_name: material.name.clone(),
                        disposition,
                    });
                    txn.put(&material)?;
                }

                let duration_minutes = elapsed_minutes(session.started_at, now);
                let activity = Activity {
                    id: new_id(),
                    volunteer_id: volunteer.id.clone(),
                    volunteer_name: volunteer.name.clone(),
                    timestamp: now,
                    notes,
                    detail: ActivityDetail::Checkout {
                        materials: items,
                        duration_minutes,
                    },
                };

                volunteer.stats.hours_served += rounded_hours(duration_minutes);

                txn.put(&activity)?;
                txn.put(&volunteer)?;
                Ok((activity.id, volunteer.name, duration_minutes))
            })
            .await;

        match result {
            Ok((activity_id, name, minutes)) => {
                info!(
                    %activity_id,
                    duration = %format_duration(minutes),
                    "Check-out for '{}' completed",
                    name
                );
                Ok(activity_id)
            }
            Err(err) => {
                warn!(volunteer_id, "Check-out aborted: {}", err);
                Err(err)
            }
        }
    }
}

fn check_coverage<V>(session: &[String], dispositions: &BTreeMap<String, V>) -> Result<()> {
    let expected: BTreeSet<&str> = session.iter().map(String::as_str).collect();
    let given: BTreeSet<&str> = dispositions.keys().map(String::as_str).collect();
    if expected == given {
        return Ok(());
    }

    let missing: Vec<&str> = expected.difference(&given).copied().collect();
    let extra: Vec<&str> = given.difference(&expected).copied().collect();
    let mut problems = Vec::new();
    if !missing.is_empty() {
        problems.push(format!("missing {}", missing.join(", ")));
    }
    if !extra.is_empty() {
        problems.push(format!("not in session {}", extra.join(", ")));
    }
    Err(Error::business(
        rules::INCOMPLETE_DISPOSITION,
        format!(
            "a disposition is required for every material in the session ({})",
            problems.join("; ")
        ),
    ))
}

/// Whole minutes between `start` and `end`, rounded half up.
///
/// A clock that went backwards yields zero.
fn elapsed_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let millis = (end - start).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        (millis + 30_000) / 60_000
    }
}

/// Whole hours in `minutes`, rounded half up.
fn rounded_hours(minutes: i64) -> u64 {
    u64::try_from((minutes + 30) / 60).unwrap_or(0)
}
