//! Renter service

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{missing, newest_first, CreateRenter, UpdateRenter};
use crate::error::{DomainError, DomainResult, Resource};
use crate::model::{RentalAgreement, Renter, RenterStatus};
use crate::store::{DataClientExt, Filter};
use crate::tenant::ScopedStore;

/// Renter with their agreements, newest first
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenterDetail {
    #[serde(flatten)]
    pub renter: Renter,
    pub rental_agreements: Vec<RentalAgreement>,
}

/// Renter application service
#[derive(Clone)]
pub struct RenterService {
    db: ScopedStore,
}

impl RenterService {
    pub fn new(db: ScopedStore) -> Self {
        Self { db }
    }

    /// Phone numbers are unique among the tenant's live renters
    pub async fn create(&self, input: CreateRenter) -> DomainResult<Renter> {
        let now = Utc::now();
        let renter = Renter {
            id: Uuid::new_v4(),
            tenant_id: None,
            first_name: input.first_name,
            last_name: input.last_name,
            phone: input.phone,
            national_id: input.national_id,
            emergency_contact: input.emergency_contact,
            status: RenterStatus::Active,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let renter = self
            .db
            .transaction(move |tx| {
                Box::pin(async move {
                    let phone = renter.phone.clone();
                    let taken = tx
                        .count(Filter::<Renter>::all().live().and(move |r| r.phone == phone))
                        .await?;
                    if taken > 0 {
                        return Err(DomainError::RenterPhoneExists);
                    }
                    Ok::<_, DomainError>(tx.create(renter).await?)
                })
            })
            .await?;
        tracing::info!(renter_id = %renter.id, "Renter created");
        Ok(renter)
    }

    /// Live renters, newest first
    pub async fn list(&self) -> DomainResult<Vec<Renter>> {
        Ok(self
            .db
            .find_many(
                Filter::<Renter>::all().live(),
                newest_first(|r: &Renter| r.created_at),
            )
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> DomainResult<RenterDetail> {
        let renter = self.find_one(id).await?;
        let rental_agreements = self
            .db
            .find_many(
                Filter::<RentalAgreement>::all().and(move |a| a.renter_id == id),
                newest_first(|a: &RentalAgreement| a.start_date),
            )
            .await?;
        Ok(RenterDetail { renter, rental_agreements })
    }

    /// A new phone number must not belong to another live renter
    pub async fn update(&self, id: Uuid, input: UpdateRenter) -> DomainResult<Renter> {
        self.db
            .transaction(move |tx| {
                Box::pin(async move {
                    tx.find_first(Filter::<Renter>::id(id).live())
                        .await?
                        .ok_or(DomainError::NotFound(Resource::Renter))?;

                    if let Some(phone) = input.phone.clone() {
                        let taken = tx
                            .count(
                                Filter::<Renter>::all()
                                    .live()
                                    .and(move |r| r.phone == phone && r.id != id),
                            )
                            .await?;
                        if taken > 0 {
                            return Err(DomainError::RenterPhoneExists);
                        }
                    }

                    tx.update(Filter::<Renter>::id(id).live(), move |r| {
                        if let Some(first_name) = &input.first_name {
                            r.first_name = first_name.clone();
                        }
                        if let Some(last_name) = &input.last_name {
                            r.last_name = last_name.clone();
                        }
                        if let Some(phone) = &input.phone {
                            r.phone = phone.clone();
                        }
                        if let Some(national_id) = &input.national_id {
                            r.national_id = national_id.clone();
                        }
                        if let Some(contact) = &input.emergency_contact {
                            r.emergency_contact = Some(contact.clone());
                        }
                        if let Some(status) = input.status {
                            r.status = status;
                        }
                    })
                    .await
                    .map_err(missing(Resource::Renter))
                })
            })
            .await
    }

    pub async fn remove(&self, id: Uuid) -> DomainResult<Renter> {
        self.find_one(id).await?;
        let now = Utc::now();
        let renter = self
            .db
            .update(Filter::<Renter>::id(id).live(), move |r| r.deleted_at = Some(now))
            .await
            .map_err(missing(Resource::Renter))?;
        tracing::info!(renter_id = %id, "Renter deleted");
        Ok(renter)
    }

    async fn find_one(&self, id: Uuid) -> DomainResult<Renter> {
        self.db
            .find_first(Filter::<Renter>::id(id).live())
            .await?
            .ok_or(DomainError::NotFound(Resource::Renter))
    }
}
