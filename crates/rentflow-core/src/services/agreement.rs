//! Rental agreement lifecycle
//!
//! Creating an agreement occupies its unit and terminating it vacates the
//! unit. Both run as one store transaction, and the preconditions are
//! evaluated inside that transaction so two concurrent requests cannot both
//! claim the same VACANT unit. The store additionally refuses a second active
//! agreement for a unit.

use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{by_ids, missing, newest_first, CreateAgreement};
use crate::error::{DomainError, DomainResult, Resource};
use crate::model::{Property, RentInvoice, RentalAgreement, Renter, Unit, UnitStatus};
use crate::store::{DataClientExt, Filter, StoreError};
use crate::tenant::ScopedStore;

/// Agreement with its unit, property and renter
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgreementView {
    #[serde(flatten)]
    pub agreement: RentalAgreement,
    pub unit: Option<Unit>,
    pub property: Option<Property>,
    pub renter: Option<Renter>,
}

/// Agreement with related records and its invoices, newest due date first
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgreementDetail {
    #[serde(flatten)]
    pub view: AgreementView,
    pub rent_invoices: Vec<RentInvoice>,
}

/// Rental agreement application service
#[derive(Clone)]
pub struct AgreementService {
    db: ScopedStore,
}

impl AgreementService {
    pub fn new(db: ScopedStore) -> Self {
        Self { db }
    }

    /// Checks, in order: unit exists, unit VACANT, renter exists. Then
    /// occupies the unit and records the agreement atomically.
    pub async fn create(&self, input: CreateAgreement) -> DomainResult<RentalAgreement> {
        let now = Utc::now();
        let unit_id = input.unit_id;
        let renter_id = input.renter_id;
        let agreement = RentalAgreement {
            id: Uuid::new_v4(),
            tenant_id: None,
            unit_id,
            renter_id,
            start_date: input.start_date,
            end_date: None,
            rent_amount: input.rent_amount,
            deposit: input.deposit,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let agreement = self
            .db
            .transaction(move |tx| {
                Box::pin(async move {
                    let unit = tx
                        .find_first(Filter::<Unit>::id(unit_id).live())
                        .await?
                        .ok_or(DomainError::NotFound(Resource::Unit))?;
                    if unit.status != UnitStatus::Vacant {
                        return Err(DomainError::UnitNotVacant);
                    }
                    tx.find_first(Filter::<Renter>::id(renter_id).live())
                        .await?
                        .ok_or(DomainError::NotFound(Resource::Renter))?;

                    tx.update(Filter::<Unit>::id(unit_id), |u| u.status = UnitStatus::Occupied)
                        .await
                        .map_err(missing(Resource::Unit))?;
                    tx.create(agreement).await.map_err(|e| match e {
                        // another active agreement already holds the unit
                        StoreError::UniqueViolation { .. } => DomainError::UnitNotVacant,
                        other => DomainError::Store(other),
                    })
                })
            })
            .await?;

        tracing::info!(
            agreement_id = %agreement.id,
            unit_id = %agreement.unit_id,
            renter_id = %agreement.renter_id,
            "Rental agreement created, unit occupied"
        );
        Ok(agreement)
    }

    /// Active agreements, latest start date first
    pub async fn list_active(&self) -> DomainResult<Vec<AgreementView>> {
        let agreements = self
            .db
            .find_many(
                Filter::<RentalAgreement>::all().and(|a| a.is_active),
                newest_first(|a: &RentalAgreement| a.start_date),
            )
            .await?;
        self.views(agreements).await
    }

    pub async fn get(&self, id: Uuid) -> DomainResult<AgreementDetail> {
        let agreement = self
            .db
            .find_first(Filter::<RentalAgreement>::id(id))
            .await?
            .ok_or(DomainError::NotFound(Resource::RentalAgreement))?;
        let rent_invoices = self
            .db
            .find_many(
                Filter::<RentInvoice>::all().and(move |i| i.rental_agreement_id == id),
                newest_first(|i: &RentInvoice| i.due_date),
            )
            .await?;

        let view = self
            .views(vec![agreement])
            .await?
            .pop()
            .ok_or(DomainError::NotFound(Resource::RentalAgreement))?;
        Ok(AgreementDetail { view, rent_invoices })
    }

    /// Ends an active agreement today and vacates its unit atomically
    pub async fn terminate(&self, id: Uuid) -> DomainResult<RentalAgreement> {
        let terminated = self
            .db
            .transaction(move |tx| {
                Box::pin(async move {
                    let agreement = tx
                        .find_first(Filter::<RentalAgreement>::id(id))
                        .await?
                        .ok_or(DomainError::NotFound(Resource::RentalAgreement))?;
                    if !agreement.is_active {
                        return Err(DomainError::AgreementTerminated);
                    }

                    let today = Utc::now().date_naive();
                    let terminated = tx
                        .update(Filter::<RentalAgreement>::id(id), move |a| {
                            a.is_active = false;
                            a.end_date = Some(today);
                        })
                        .await
                        .map_err(missing(Resource::RentalAgreement))?;
                    tx.update(Filter::<Unit>::id(agreement.unit_id), |u| {
                        u.status = UnitStatus::Vacant
                    })
                    .await
                    .map_err(missing(Resource::Unit))?;
                    Ok(terminated)
                })
            })
            .await?;

        tracing::info!(
            agreement_id = %terminated.id,
            unit_id = %terminated.unit_id,
            "Rental agreement terminated, unit vacated"
        );
        Ok(terminated)
    }

    async fn views(&self, agreements: Vec<RentalAgreement>) -> DomainResult<Vec<AgreementView>> {
        let unit_ids: HashSet<Uuid> = agreements.iter().map(|a| a.unit_id).collect();
        let renter_ids: HashSet<Uuid> = agreements.iter().map(|a| a.renter_id).collect();

        let units = by_ids::<Unit, _>(&self.db, unit_ids).await?;
        let renters = by_ids::<Renter, _>(&self.db, renter_ids).await?;
        let property_ids: HashSet<Uuid> = units.values().map(|u| u.property_id).collect();
        let properties = by_ids::<Property, _>(&self.db, property_ids).await?;

        Ok(agreements
            .into_iter()
            .map(|agreement| {
                let unit = units.get(&agreement.unit_id).cloned();
                let property = unit
                    .as_ref()
                    .and_then(|u| properties.get(&u.property_id))
                    .cloned();
                let renter = renters.get(&agreement.renter_id).cloned();
                AgreementView { agreement, unit, property, renter }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        CreateProperty, CreateRenter, CreateUnit, PropertyService, RenterService, UnitService,
        UpdateUnit,
    };
    use crate::store::MemoryStore;
    use crate::tenant::{TenantContext, TenantScoped};
    use chrono::NaiveDate;
    use std::sync::Arc;

    struct Fixture {
        db: ScopedStore,
        agreements: AgreementService,
        units: UnitService,
    }

    impl Fixture {
        fn new() -> Self {
            let db = TenantScoped::new(Arc::new(MemoryStore::new()));
            Self {
                agreements: AgreementService::new(db.clone()),
                units: UnitService::new(db.clone()),
                db,
            }
        }

        /// Property "Sunset Apts" with unit "A1" and one renter
        async fn seed(&self) -> (Unit, Renter) {
            let property = PropertyService::new(self.db.clone())
                .create(CreateProperty {
                    name: "Sunset Apts".into(),
                    address: "Westlands, Nairobi".into(),
                    property_type: "Residential".into(),
                })
                .await
                .unwrap();
            let unit = self
                .units
                .create(CreateUnit {
                    property_id: property.id,
                    name: "A1".into(),
                    rent_amount: 15_000,
                })
                .await
                .unwrap();
            let renter = RenterService::new(self.db.clone())
                .create(CreateRenter {
                    first_name: "Jane".into(),
                    last_name: "Wanjiku".into(),
                    phone: "+254712345678".into(),
                    national_id: "12345678".into(),
                    emergency_contact: None,
                })
                .await
                .unwrap();
            (unit, renter)
        }
    }

    fn input(unit: &Unit, renter: &Renter) -> CreateAgreement {
        CreateAgreement {
            unit_id: unit.id,
            renter_id: renter.id,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            rent_amount: 15_000,
            deposit: 30_000,
        }
    }

    #[tokio::test]
    async fn test_create_occupies_unit() {
        let fx = Fixture::new();
        TenantContext::new(Uuid::new_v4())
            .scope(async {
                let (unit, renter) = fx.seed().await;
                let agreement = fx.agreements.create(input(&unit, &renter)).await.unwrap();
                assert!(agreement.is_active);
                assert_eq!(fx.units.get(unit.id).await.unwrap().status, UnitStatus::Occupied);

                let detail = fx.agreements.get(agreement.id).await.unwrap();
                assert_eq!(detail.view.unit.map(|u| u.name), Some("A1".to_string()));
                assert_eq!(detail.view.property.map(|p| p.name), Some("Sunset Apts".to_string()));
                assert!(detail.rent_invoices.is_empty());
            })
            .await;
    }

    #[tokio::test]
    async fn test_unit_not_vacant_writes_nothing() {
        let fx = Fixture::new();
        TenantContext::new(Uuid::new_v4())
            .scope(async {
                let (unit, renter) = fx.seed().await;
                fx.agreements.create(input(&unit, &renter)).await.unwrap();
                let before = fx.db.inner().snapshot().await;

                let err = fx.agreements.create(input(&unit, &renter)).await.unwrap_err();
                assert_eq!(err.code(), "UNIT_NOT_VACANT");

                let after = fx.db.inner().snapshot().await;
                assert_eq!(before.agreements.len(), after.agreements.len());
                assert_eq!(
                    serde_json::to_value(&before).unwrap(),
                    serde_json::to_value(&after).unwrap()
                );
            })
            .await;
    }

    #[tokio::test]
    async fn test_precondition_order() {
        let fx = Fixture::new();
        TenantContext::new(Uuid::new_v4())
            .scope(async {
                let (unit, renter) = fx.seed().await;

                let mut missing_both = input(&unit, &renter);
                missing_both.unit_id = Uuid::new_v4();
                missing_both.renter_id = Uuid::new_v4();
                let err = fx.agreements.create(missing_both).await.unwrap_err();
                assert_eq!(err.code(), "UNIT_NOT_FOUND");

                let mut missing_renter = input(&unit, &renter);
                missing_renter.renter_id = Uuid::new_v4();
                let err = fx.agreements.create(missing_renter).await.unwrap_err();
                assert_eq!(err.code(), "RENTER_NOT_FOUND");
                assert_eq!(fx.units.get(unit.id).await.unwrap().status, UnitStatus::Vacant);
            })
            .await;
    }

    #[tokio::test]
    async fn test_create_rolls_back_when_agreement_write_fails() {
        let fx = Fixture::new();
        let ctx = TenantContext::new(Uuid::new_v4());
        ctx.scope(async {
            let (unit, renter) = fx.seed().await;

            // A stray active agreement on a unit still marked VACANT makes the
            // agreement insert fail after the unit update has been staged.
            let now = Utc::now();
            fx.db
                .inner()
                .create(RentalAgreement {
                    id: Uuid::new_v4(),
                    tenant_id: Some(ctx.tenant_id),
                    unit_id: unit.id,
                    renter_id: renter.id,
                    start_date: now.date_naive(),
                    end_date: None,
                    rent_amount: 1,
                    deposit: 0,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();

            let err = fx.agreements.create(input(&unit, &renter)).await.unwrap_err();
            assert_eq!(err.code(), "UNIT_NOT_VACANT");
            assert_eq!(fx.units.get(unit.id).await.unwrap().status, UnitStatus::Vacant);
            assert_eq!(fx.agreements.list_active().await.unwrap().len(), 1);
        })
        .await;
    }

    #[tokio::test]
    async fn test_terminate_twice() {
        let fx = Fixture::new();
        TenantContext::new(Uuid::new_v4())
            .scope(async {
                let (unit, renter) = fx.seed().await;
                let agreement = fx.agreements.create(input(&unit, &renter)).await.unwrap();

                let terminated = fx.agreements.terminate(agreement.id).await.unwrap();
                assert!(!terminated.is_active);
                assert_eq!(terminated.end_date, Some(Utc::now().date_naive()));
                assert_eq!(fx.units.get(unit.id).await.unwrap().status, UnitStatus::Vacant);

                let err = fx.agreements.terminate(agreement.id).await.unwrap_err();
                assert_eq!(err.code(), "AGREEMENT_ALREADY_TERMINATED");

                let err = fx.agreements.terminate(Uuid::new_v4()).await.unwrap_err();
                assert_eq!(err.code(), "RENTAL_AGREEMENT_NOT_FOUND");

                // the unit can be let again
                fx.agreements.create(input(&unit, &renter)).await.unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn test_concurrent_creates_claim_unit_once() {
        let fx = Arc::new(Fixture::new());
        let ctx = TenantContext::new(Uuid::new_v4());
        let (unit, renter) = ctx.scope(fx.seed()).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let fx = fx.clone();
            let request = input(&unit, &renter);
            handles.push(tokio::spawn(ctx.scope(async move {
                fx.agreements.create(request).await
            })));
        }

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(e) => assert_eq!(e.code(), "UNIT_NOT_VACANT"),
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_status_update_cannot_vacate_a_let_unit() {
        let fx = Fixture::new();
        TenantContext::new(Uuid::new_v4())
            .scope(async {
                let (unit, renter) = fx.seed().await;
                fx.agreements.create(input(&unit, &renter)).await.unwrap();

                let vacate = UpdateUnit {
                    status: Some(UnitStatus::Vacant),
                    ..UpdateUnit::default()
                };
                let err = fx.units.update(unit.id, vacate).await.unwrap_err();
                assert_eq!(err.code(), "VALIDATION_ERROR");
                assert_eq!(fx.units.get(unit.id).await.unwrap().status, UnitStatus::Occupied);
            })
            .await;
    }

    #[tokio::test]
    async fn test_status_updates_racing_a_create_keep_unit_occupied() {
        let fx = Arc::new(Fixture::new());
        let ctx = TenantContext::new(Uuid::new_v4());
        let (unit, renter) = ctx.scope(fx.seed()).await;

        let mut updates = Vec::new();
        for _ in 0..8 {
            let fx = fx.clone();
            let unit_id = unit.id;
            updates.push(tokio::spawn(ctx.scope(async move {
                let vacant = UpdateUnit {
                    status: Some(UnitStatus::Vacant),
                    ..UpdateUnit::default()
                };
                fx.units.update(unit_id, vacant).await
            })));
        }
        let create = {
            let fx = fx.clone();
            let request = input(&unit, &renter);
            tokio::spawn(ctx.scope(async move { fx.agreements.create(request).await }))
        };

        for handle in updates {
            if let Err(e) = handle.await.unwrap() {
                assert_eq!(e.code(), "VALIDATION_ERROR");
            }
        }
        let agreement = create.await.unwrap().unwrap();

        ctx.scope(async {
            let active = fx.agreements.get(agreement.id).await.unwrap();
            assert!(active.view.agreement.is_active);
            assert_eq!(fx.units.get(unit.id).await.unwrap().status, UnitStatus::Occupied);
        })
        .await;
    }
}
