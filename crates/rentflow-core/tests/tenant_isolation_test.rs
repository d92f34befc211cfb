//! Integration tests for tenant isolation across the domain services.

use std::sync::Arc;

use chrono::NaiveDate;
use rentflow_core::services::{
    CreateAgreement, CreateProperty, CreateRenter, CreateUnit, UpdateProperty, UpdateRenter,
};
use rentflow_core::{
    AgreementService, DataClientExt, Filter, MemoryStore, Property, PropertyService, RenterService,
    ScopedStore, Tenant, TenantContext, TenantScoped, UnitService, UnitStatus,
};

struct Services {
    db: ScopedStore,
    properties: PropertyService,
    units: UnitService,
    renters: RenterService,
    agreements: AgreementService,
}

fn setup() -> Services {
    let db = TenantScoped::new(Arc::new(MemoryStore::new()));
    Services {
        properties: PropertyService::new(db.clone()),
        units: UnitService::new(db.clone()),
        renters: RenterService::new(db.clone()),
        agreements: AgreementService::new(db.clone()),
        db,
    }
}

async fn register(db: &ScopedStore, name: &str) -> TenantContext {
    let tenant = db
        .inner()
        .create(Tenant::new(name, format!("owner@{}.co.ke", name.to_lowercase())))
        .await
        .unwrap();
    TenantContext::new(tenant.id)
}

fn renter(phone: &str) -> CreateRenter {
    CreateRenter {
        first_name: "Jane".into(),
        last_name: "Wanjiku".into(),
        phone: phone.into(),
        national_id: "12345678".into(),
        emergency_contact: None,
    }
}

#[tokio::test]
async fn test_acme_lets_unit_once() {
    let s = setup();
    let acme = register(&s.db, "Acme").await;

    acme.scope(async {
        let property = s
            .properties
            .create(CreateProperty {
                name: "Sunset Apts".into(),
                address: "Westlands, Nairobi".into(),
                property_type: "Residential".into(),
            })
            .await
            .unwrap();
        let a1 = s
            .units
            .create(CreateUnit {
                property_id: property.id,
                name: "A1".into(),
                rent_amount: 15_000,
            })
            .await
            .unwrap();
        let jane = s.renters.create(renter("+254712345678")).await.unwrap();

        let request = CreateAgreement {
            unit_id: a1.id,
            renter_id: jane.id,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            rent_amount: 15_000,
            deposit: 30_000,
        };
        let agreement = s.agreements.create(request.clone()).await.unwrap();
        assert!(agreement.is_active);
        assert_eq!(s.units.get(a1.id).await.unwrap().status, UnitStatus::Occupied);

        let err = s.agreements.create(request).await.unwrap_err();
        assert_eq!(err.code(), "UNIT_NOT_VACANT");

        let listed = s.properties.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].unit_count, 1);
    })
    .await;
}

#[tokio::test]
async fn test_duplicate_renter_phone() {
    let s = setup();
    let ctx = register(&s.db, "Acme").await;

    ctx.scope(async {
        s.renters.create(renter("+254700000001")).await.unwrap();
        let err = s.renters.create(renter("+254700000001")).await.unwrap_err();
        assert_eq!(err.code(), "RENTER_PHONE_ALREADY_EXISTS");
    })
    .await;
}

#[tokio::test]
async fn test_identical_primary_key_is_invisible_to_other_tenant() {
    let s = setup();
    let acme = register(&s.db, "Acme").await;
    let globex = register(&s.db, "Globex").await;

    let (property, jane) = acme
        .scope(async {
            let property = s
                .properties
                .create(CreateProperty {
                    name: "Sunset Apts".into(),
                    address: "Westlands, Nairobi".into(),
                    property_type: "Residential".into(),
                })
                .await
                .unwrap();
            let jane = s.renters.create(renter("+254712345678")).await.unwrap();
            (property, jane)
        })
        .await;

    globex
        .scope(async {
            assert_eq!(s.properties.get(property.id).await.unwrap_err().code(), "PROPERTY_NOT_FOUND");
            assert_eq!(
                s.properties
                    .update(
                        property.id,
                        UpdateProperty { name: Some("Taken".into()), ..UpdateProperty::default() }
                    )
                    .await
                    .unwrap_err()
                    .code(),
                "PROPERTY_NOT_FOUND"
            );
            assert_eq!(s.properties.remove(property.id).await.unwrap_err().code(), "PROPERTY_NOT_FOUND");
            assert_eq!(
                s.renters
                    .update(jane.id, UpdateRenter::default())
                    .await
                    .unwrap_err()
                    .code(),
                "RENTER_NOT_FOUND"
            );

            // raw scoped client calls are filtered the same way
            assert!(s.db.find_unique(Filter::<Property>::id(property.id)).await.unwrap().is_none());
            assert_eq!(s.db.count(Filter::<Property>::all()).await.unwrap(), 0);
            assert_eq!(s.db.delete_many(Filter::<Property>::all()).await.unwrap(), 0);
        })
        .await;

    let untouched = acme.scope(s.properties.get(property.id)).await.unwrap();
    assert_eq!(untouched.property.name, "Sunset Apts");
    assert!(untouched.property.deleted_at.is_none());
}
