//! Unit service

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{ascending, missing, CreateUnit, UpdateUnit};
use crate::error::{DomainError, DomainResult, Resource};
use crate::model::{Property, Unit, UnitStatus};
use crate::store::{DataClientExt, Filter};
use crate::tenant::ScopedStore;

/// Live unit counts by status
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OccupancySummary {
    pub total: u64,
    pub by_status: BTreeMap<String, u64>,
}

/// Unit application service
#[derive(Clone)]
pub struct UnitService {
    db: ScopedStore,
}

impl UnitService {
    pub fn new(db: ScopedStore) -> Self {
        Self { db }
    }

    /// New units start VACANT
    pub async fn create(&self, input: CreateUnit) -> DomainResult<Unit> {
        let now = Utc::now();
        let property_id = input.property_id;
        let unit = Unit {
            id: Uuid::new_v4(),
            tenant_id: None,
            property_id,
            name: input.name,
            rent_amount: input.rent_amount,
            status: UnitStatus::Vacant,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        // Parent check and insert commit together
        let unit = self
            .db
            .transaction(move |tx| {
                Box::pin(async move {
                    tx.find_first(Filter::<Property>::id(property_id).live())
                        .await?
                        .ok_or(DomainError::NotFound(Resource::Property))?;
                    Ok::<_, DomainError>(tx.create(unit).await?)
                })
            })
            .await?;
        tracing::info!(unit_id = %unit.id, property_id = %unit.property_id, "Unit created");
        Ok(unit)
    }

    /// Live units of one property, by name
    pub async fn list_by_property(&self, property_id: Uuid) -> DomainResult<Vec<Unit>> {
        Ok(self
            .db
            .find_many(
                Filter::<Unit>::all().live().and(move |u| u.property_id == property_id),
                ascending(|u: &Unit| u.name.clone()),
            )
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> DomainResult<Unit> {
        self.find_one(id).await
    }

    /// Name, rent and operator-settable status.
    ///
    /// OCCUPIED is entered and left only through a rental agreement, so it
    /// can neither be requested here nor be overridden here.
    pub async fn update(&self, id: Uuid, input: UpdateUnit) -> DomainResult<Unit> {
        if let Some(status) = input.status {
            if !status.is_externally_settable() {
                return Err(DomainError::Invalid(
                    "OCCUPIED is set by creating a rental agreement".into(),
                ));
            }
        }

        // Occupancy is checked against the row the write replaces
        self.db
            .transaction(move |tx| {
                Box::pin(async move {
                    let unit = tx
                        .find_first(Filter::<Unit>::id(id).live())
                        .await?
                        .ok_or(DomainError::NotFound(Resource::Unit))?;
                    if input.status.is_some() && unit.status == UnitStatus::Occupied {
                        return Err(DomainError::Invalid(
                            "An occupied unit is vacated by terminating its rental agreement".into(),
                        ));
                    }

                    tx.update(Filter::<Unit>::id(id).live(), move |u| {
                        if let Some(name) = &input.name {
                            u.name = name.clone();
                        }
                        if let Some(rent_amount) = input.rent_amount {
                            u.rent_amount = rent_amount;
                        }
                        if let Some(status) = input.status {
                            u.status = status;
                        }
                    })
                    .await
                    .map_err(missing(Resource::Unit))
                })
            })
            .await
    }

    pub async fn remove(&self, id: Uuid) -> DomainResult<Unit> {
        self.find_one(id).await?;
        let now = Utc::now();
        let unit = self
            .db
            .update(Filter::<Unit>::id(id).live(), move |u| u.deleted_at = Some(now))
            .await
            .map_err(missing(Resource::Unit))?;
        tracing::info!(unit_id = %id, "Unit deleted");
        Ok(unit)
    }

    /// Live unit counts by status, optionally for one property
    pub async fn occupancy(&self, property_id: Option<Uuid>) -> DomainResult<OccupancySummary> {
        let mut filter = Filter::<Unit>::all().live();
        if let Some(property_id) = property_id {
            filter = filter.and(move |u| u.property_id == property_id);
        }
        let by_status = self
            .db
            .group_by(filter, |u| u.status.as_str().to_string())
            .await?;
        Ok(OccupancySummary {
            total: by_status.values().sum(),
            by_status,
        })
    }

    async fn find_one(&self, id: Uuid) -> DomainResult<Unit> {
        self.db
            .find_first(Filter::<Unit>::id(id).live())
            .await?
            .ok_or(DomainError::NotFound(Resource::Unit))
    }
}
