//! One handle wiring every service to a shared store and clock.

use std::sync::Arc;

use tracing::info;

use crate::activities::ActivityLog;
use crate::checkin::CheckinService;
use crate::checkout::CheckoutService;
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, SearchConfig};
use crate::dashboard::Dashboard;
use crate::error::Result;
use crate::materials::MaterialService;
use crate::store::Store;
use crate::volunteers::VolunteerService;

/// The check-in engine.
///
/// Cloning is cheap; every clone shares the same store.
#[derive(Debug, Clone)]
pub struct Rollcall {
    store: Store,
    volunteers: VolunteerService,
    materials: MaterialService,
    activities: ActivityLog,
    checkin: CheckinService,
    checkout: CheckoutService,
    dashboard: Dashboard,
}

impl Rollcall {
    /// Open the database named by `config`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(config: &Config) -> Result<Self> {
        let store = Store::open_with_timeout(config.database_path(), config.busy_timeout())?;
        info!("Rollcall ready at {}", store.path().display());
        Ok(Self::with_store(
            store,
            Arc::new(SystemClock),
            config.search.clone(),
        ))
    }

    /// An engine over a fresh in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::with_store(
            Store::open_in_memory()?,
            Arc::new(SystemClock),
            SearchConfig::default(),
        ))
    }

    /// Assemble an engine from explicit parts.
    #[must_use]
    pub fn with_store(store: Store, clock: Arc<dyn Clock>, search: SearchConfig) -> Self {
        Self {
            volunteers: VolunteerService::new(store.clone(), Arc::clone(&clock), search),
            materials: MaterialService::new(store.clone(), Arc::clone(&clock)),
            activities: ActivityLog::new(store.clone()),
            checkin: CheckinService::new(store.clone(), Arc::clone(&clock)),
            checkout: CheckoutService::new(store.clone(), clock),
            dashboard: Dashboard::new(store.clone()),
            store,
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Volunteer registry.
    #[must_use]
    pub fn volunteers(&self) -> &VolunteerService {
        &self.volunteers
    }

    /// Material inventory.
    #[must_use]
    pub fn materials(&self) -> &MaterialService {
        &self.materials
    }

    /// Activity history.
    #[must_use]
    pub fn activities(&self) -> &ActivityLog {
        &self.activities
    }

    /// Check-in orchestrator.
    #[must_use]
    pub fn checkin(&self) -> &CheckinService {
        &self.checkin
    }

    /// Check-out orchestrator.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.checkout
    }

    /// Dashboard queries.
    #[must_use]
    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }
}
