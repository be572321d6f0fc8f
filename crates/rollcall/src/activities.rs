//! Read access to the activity history.
//!
//! Activities are written only by the check-in and check-out flows and are
//! never changed afterwards.

use tracing::debug;

use crate::error::{EntityKind, Error, Result};
use crate::model::Activity;
use crate::store::Store;

/// Activity history.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    store: Store,
}

impl ActivityLog {
    /// Create a log over `store`.
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Fetch an activity by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn get(&self, id: &str) -> Result<Option<Activity>> {
        self.store.get(id).await
    }

    /// Fetch an activity by id, failing when absent.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such activity.
    pub async fn require(&self, id: &str) -> Result<Activity> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Activity, id))
    }

    /// Every activity of one volunteer, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn history(&self, volunteer_id: &str) -> Result<Vec<Activity>> {
        debug!("Loading history for volunteer {}", volunteer_id);
        let mut activities: Vec<Activity> =
            self.store.find_by("volunteer_id", volunteer_id).await?;
        newest_first(&mut activities);
        Ok(activities)
    }

    /// The `limit` most recent activities across all volunteers.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn recent(&self, limit: usize) -> Result<Vec<Activity>> {
        self.store.latest(&["timestamp", "kind"], limit).await
    }
}

// Check-in and check-out of a zero-length session share a timestamp; the
// check-out sorts first. `recent` gets the same order from the store.
fn newest_first(activities: &mut [Activity]) {
    activities.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.kind().as_str().cmp(a.kind().as_str()))
    });
}
