//! Check-in: a volunteer borrows materials and opens a session.
//!
//! Every precondition is evaluated inside one transaction over all three
//! collections, in a fixed order, and the first failure aborts it:
//!
//! 1. the volunteer exists,
//! 2. the volunteer has no open session,
//! 3. at least one material was selected,
//! 4. every material exists and is available.
//!
//! On success the activity, the volunteer's session and statistics, and
//! every material's loan are committed together.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::clock::Clock;
use crate::error::{rules, Error, Result};
use crate::lifecycle;
use crate::model::{
    new_id, ActiveSession, Activity, ActivityDetail, CheckinItem, Material, MaterialStatus,
    Volunteer,
};
use crate::store::{Collection, Store};
use crate::validation;

/// Check-in orchestrator.
#[derive(Debug, Clone)]
pub struct CheckinService {
    store: Store,
    clock: Arc<dyn Clock>,
}

impl CheckinService {
    /// Create a service over `store`.
    #[must_use]
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Check `volunteer_id` in with `material_ids`, returning the new
    /// activity id.
    ///
    /// # Errors
    ///
    /// Returns a validation error for over-long notes or a repeated material
    /// id, `NotFound` for an unknown volunteer, a business rule error when a
    /// precondition fails, or a storage error. Nothing is written on error.
    pub async fn process(
        &self,
        volunteer_id: &str,
        material_ids: &[String],
        notes: Option<&str>,
    ) -> Result<String> {
        let notes = validation::notes(notes)?;
        reject_repeats(material_ids)?;

        info!(
            volunteer_id,
            materials = material_ids.len(),
            "Processing check-in"
        );

        let now = self.clock.now();
        let result = self
            .store
            .transaction(&Collection::ALL, |txn| {
                let mut volunteer: Volunteer = txn.require(volunteer_id)?;
                if volunteer.is_checked_in() {
                    return Err(Error::business(
                        rules::ALREADY_CHECKED_IN,
                        format!("volunteer '{}' is already checked in", volunteer.name),
                    ));
                }
                if material_ids.is_empty() {
                    return Err(Error::business(
                        rules::NO_MATERIALS_SELECTED,
                        "at least one material must be selected",
                    ));
                }

                let mut materials = Vec::with_capacity(material_ids.len());
                let mut unavailable = Vec::new();
                for id in material_ids {
                    match txn.get::<Material>(id)? {
                        Some(m) if m.status == MaterialStatus::Available => materials.push(m),
                        Some(m) => unavailable.push(format!("{} ({})", m.name, m.status)),
                        None => unavailable.push(format!("unknown id {id}")),
                    }
                }
                if !unavailable.is_empty() {
                    return Err(Error::business(
                        rules::MATERIALS_UNAVAILABLE,
                        format!(
                            "the following materials are not available: {}",
                            unavailable.join(", ")
                        ),
                    ));
                }

                for material in &mut materials {
                    lifecycle::transition(
                        material,
                        MaterialStatus::Loaned,
                        Some(volunteer.id.as_str()),
                        now,
                    )?;
                }

                let activity = Activity {
                    id: new_id(),
                    volunteer_id: volunteer.id.clone(),
                    volunteer_name: volunteer.name.clone(),
                    timestamp: now,
                    notes,
                    detail: ActivityDetail::Checkin {
                        materials: materials
                            .iter()
                            .map(|m| CheckinItem {
                                material_id: m.id.clone(),
                                material_name: m.name.clone(),
                                status_at_event: m.status,
                            })
                            .collect(),
                    },
                };

                volunteer.active_session = Some(ActiveSession {
                    activity_id: activity.id.clone(),
                    started_at: now,
                    material_ids: material_ids.to_vec(),
                });
                volunteer.stats.total_checkins += 1;
                volunteer.stats.last_checkin_at = Some(now);

                txn.put(&activity)?;
                txn.put(&volunteer)?;
                for material in &materials {
                    txn.put(material)?;
                }
                Ok((activity.id, volunteer.name))
            })
            .await;

        match result {
            Ok((activity_id, name)) => {
                info!(%activity_id, "Check-in for '{}' completed", name);
                Ok(activity_id)
            }
            Err(err) => {
                warn!(volunteer_id, "Check-in aborted: {}", err);
                Err(err)
            }
        }
    }
}

fn reject_repeats(material_ids: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(material_ids.len());
    for id in material_ids {
        if !seen.insert(id.as_str()) {
            return Err(Error::validation(
                "material_ids",
                format!("material {id} was selected more than once"),
            ));
        }
    }
    Ok(())
}
