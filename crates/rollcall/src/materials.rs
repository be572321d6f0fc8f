//! Material inventory: registration, lookups, and direct status changes.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{rules, EntityKind, Error, Result};
use crate::lifecycle;
use crate::model::{
    new_id, Material, MaterialStats, MaterialStatus, MaterialType, NewMaterial, Volunteer,
};
use crate::store::{Collection, Store};
use crate::validation;

/// Material inventory.
#[derive(Debug, Clone)]
pub struct MaterialService {
    store: Store,
    clock: Arc<dyn Clock>,
}

impl MaterialService {
    /// Create a service over `store`.
    #[must_use]
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Register a new, available material.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed input, a business rule
    /// error if the name or code is taken, or a storage error.
    pub async fn create(&self, input: &NewMaterial) -> Result<Material> {
        self.create_with_status(input, MaterialStatus::Available).await
    }

    /// Register a material in a given starting status.
    ///
    /// Used when seeding inventory that is already under repair or missing.
    /// A material cannot start out loaned.
    ///
    /// # Errors
    ///
    /// As [`MaterialService::create`], plus a validation error for `loaned`.
    pub async fn create_with_status(
        &self,
        input: &NewMaterial,
        status: MaterialStatus,
    ) -> Result<Material> {
        let fields = validation::new_material(input)?;
        if status == MaterialStatus::Loaned {
            return Err(Error::validation(
                "status",
                "a material cannot be registered as loaned",
            ));
        }

        let material = Material {
            id: new_id(),
            name: fields.name,
            code: fields.code,
            kind: fields.kind,
            status,
            loaned_to: None,
            loaned_at: None,
            notes: fields.notes,
            registered_at: self.clock.now(),
            stats: MaterialStats::default(),
        };

        let result = self
            .store
            .transaction(&[Collection::Materials], |txn| {
                let name_key = material.name_key();
                if !txn.find_by::<Material>("name_key", &name_key)?.is_empty() {
                    return Err(Error::business(
                        rules::DUPLICATE_NAME,
                        format!("a material named '{}' already exists", material.name),
                    ));
                }
                if let Some(code_key) = material.code_key() {
                    if !txn.find_by::<Material>("code_key", &code_key)?.is_empty() {
                        return Err(Error::business(
                            rules::DUPLICATE_CODE,
                            format!(
                                "a material with code '{}' already exists",
                                material.code.as_deref().unwrap_or_default()
                            ),
                        ));
                    }
                }
                txn.put(&material)
            })
            .await;

        if let Err(err) = result {
            warn!("Material registration rejected: {}", err);
            return Err(err);
        }

        info!(
            id = %material.id,
            kind = %material.kind,
            status = %material.status,
            "Registered material {}",
            material.name
        );
        Ok(material)
    }

    /// Fetch a material by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn get(&self, id: &str) -> Result<Option<Material>> {
        debug!("Looking up material {}", id);
        self.store.get(id).await
    }

    /// Fetch a material by id, failing when absent.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such material.
    pub async fn require(&self, id: &str) -> Result<Material> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Material, id))
    }

    /// Every material, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn list(&self) -> Result<Vec<Material>> {
        let mut all: Vec<Material> = self.store.get_all().await?;
        sort_by_name(&mut all);
        Ok(all)
    }

    /// Materials that can be checked in, optionally of one type, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn available(&self, kind: Option<MaterialType>) -> Result<Vec<Material>> {
        let mut available = self.by_status(MaterialStatus::Available).await?;
        if let Some(kind) = kind {
            available.retain(|m| m.kind == kind);
        }
        Ok(available)
    }

    /// Materials in a given status, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn by_status(&self, status: MaterialStatus) -> Result<Vec<Material>> {
        let mut found: Vec<Material> = self.store.find_by("status", status.as_str()).await?;
        sort_by_name(&mut found);
        Ok(found)
    }

    /// Materials currently held by a volunteer.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn loaned_to(&self, volunteer_id: &str) -> Result<Vec<Material>> {
        let mut held: Vec<Material> = self.store.find_by("loaned_to", volunteer_id).await?;
        sort_by_name(&mut held);
        Ok(held)
    }

    /// Move a single material through its lifecycle.
    ///
    /// `loaned_to` must name an existing volunteer when `to` is `loaned`.
    /// A material that belongs to an open session can only leave it
    /// through check-out.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown material or borrower, a business
    /// rule error for a material held in an open session,
    /// [`Error::InvalidTransition`] or [`Error::MissingLoanTarget`] from the
    /// state machine, or a storage error.
    pub async fn update_status(
        &self,
        id: &str,
        to: MaterialStatus,
        loaned_to: Option<&str>,
    ) -> Result<Material> {
        let now = self.clock.now();
        let result = self
            .store
            .transaction(&[Collection::Materials, Collection::Volunteers], |txn| {
                let mut material: Material = txn.require(id)?;
                if let Some(holder) = &material.loaned_to {
                    let holder: Option<Volunteer> = txn.get(holder)?;
                    if let Some(holder) = holder.filter(|v| v.session_holds(id)) {
                        return Err(Error::business(
                            rules::MATERIAL_IN_SESSION,
                            format!(
                                "'{}' is part of {}'s open session; check out instead",
                                material.name,
                                holder.name
                            ),
                        ));
                    }
                }
                lifecycle::transition(&mut material, to, loaned_to, now)?;
                if let Some(borrower) = &material.loaned_to {
                    txn.require::<Volunteer>(borrower)?;
                }
                txn.put(&material)?;
                Ok(material)
            })
            .await;

        match result {
            Ok(material) => {
                info!(
                    id = %material.id,
                    status = %material.status,
                    "Updated status of {}",
                    material.name
                );
                Ok(material)
            }
            Err(err) => {
                warn!(id, to = %to, "Status change rejected: {}", err);
                Err(err)
            }
        }
    }
}

fn sort_by_name(materials: &mut [Material]) {
    materials.sort_by_cached_key(Material::name_key);
}
