//! Volunteer registration, lookup, and administrative updates.
//!
//! Sessions and statistics are never edited here; only check-in and
//! check-out change them.

use std::cmp::Reverse;
use std::sync::Arc;

use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::SearchConfig;
use crate::error::{EntityKind, Error, Result};
use crate::logging::mask_phone;
use crate::model::{new_id, NewVolunteer, Volunteer, VolunteerStats, VolunteerUpdate};
use crate::store::{Collection, Store};
use crate::text::fuzzy_score;
use crate::validation;

/// Volunteer registry.
#[derive(Debug, Clone)]
pub struct VolunteerService {
    store: Store,
    clock: Arc<dyn Clock>,
    search: SearchConfig,
}

impl VolunteerService {
    /// Create a service over `store`.
    #[must_use]
    pub fn new(store: Store, clock: Arc<dyn Clock>, search: SearchConfig) -> Self {
        Self {
            store,
            clock,
            search,
        }
    }

    /// Register a new volunteer.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed input, or a storage error.
    pub async fn create(&self, input: &NewVolunteer) -> Result<Volunteer> {
        let fields = validation::new_volunteer(input)?;

        let volunteer = Volunteer {
            id: new_id(),
            name: fields.name,
            phone: fields.phone,
            ministry: fields.ministry,
            active: true,
            registered_at: self.clock.now(),
            active_session: None,
            stats: VolunteerStats::default(),
        };

        self.store
            .transaction(&[Collection::Volunteers], |txn| txn.put(&volunteer))
            .await?;

        info!(
            id = %volunteer.id,
            ministry = %volunteer.ministry,
            phone = %volunteer.phone.as_deref().map(mask_phone).unwrap_or_default(),
            "Registered volunteer {}",
            volunteer.name
        );
        Ok(volunteer)
    }

    /// Fetch a volunteer by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn get(&self, id: &str) -> Result<Option<Volunteer>> {
        debug!("Looking up volunteer {}", id);
        self.store.get(id).await
    }

    /// Fetch a volunteer by id, failing when absent.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such volunteer.
    pub async fn require(&self, id: &str) -> Result<Volunteer> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Volunteer, id))
    }

    /// Every volunteer, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn list(&self) -> Result<Vec<Volunteer>> {
        let mut all: Vec<Volunteer> = self.store.get_all().await?;
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    /// Find volunteers whose name loosely matches `term`, best match first.
    ///
    /// Terms shorter than the configured minimum return nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn search(&self, term: &str) -> Result<Vec<Volunteer>> {
        let term = term.trim();
        debug!("Searching volunteers for \"{}\"", term);
        if term.chars().count() < self.search.min_term_length {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(i64, Volunteer)> = self
            .list()
            .await?
            .into_iter()
            .filter_map(|v| fuzzy_score(&v.name, term).map(|score| (score, v)))
            .collect();
        // Stable, so equal scores keep name order.
        scored.sort_by_key(|(score, _)| Reverse(*score));
        scored.truncate(self.search.max_results);
        Ok(scored.into_iter().map(|(_, v)| v).collect())
    }

    /// Volunteers with an open check-in, earliest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn active(&self) -> Result<Vec<Volunteer>> {
        let mut active: Vec<Volunteer> = self
            .store
            .get_all::<Volunteer>()
            .await?
            .into_iter()
            .filter(Volunteer::is_checked_in)
            .collect();
        active.sort_by_key(|v| v.active_session.as_ref().map(|s| s.started_at));
        Ok(active)
    }

    /// Apply administrative changes to a volunteer.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed fields, `NotFound` if the
    /// volunteer does not exist, or a storage error.
    pub async fn update(&self, id: &str, changes: &VolunteerUpdate) -> Result<Volunteer> {
        let name = changes
            .name
            .as_deref()
            .map(validation::volunteer_name)
            .transpose()?;
        let phone = changes
            .phone
            .as_ref()
            .map(|p| validation::phone(p.as_deref()))
            .transpose()?;
        let ministry = changes
            .ministry
            .as_deref()
            .map(validation::ministry)
            .transpose()?;

        let updated = self
            .store
            .transaction(&[Collection::Volunteers], |txn| {
                let mut volunteer: Volunteer = txn.require(id)?;
                if let Some(name) = name {
                    volunteer.name = name;
                }
                if let Some(phone) = phone {
                    volunteer.phone = phone;
                }
                if let Some(ministry) = ministry {
                    volunteer.ministry = ministry;
                }
                if let Some(active) = changes.active {
                    volunteer.active = active;
                }
                txn.put(&volunteer)?;
                Ok(volunteer)
            })
            .await?;

        info!(id = %updated.id, "Updated volunteer {}", updated.name);
        Ok(updated)
    }
}
