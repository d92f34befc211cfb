//! Property service

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{ascending, missing, newest_first, CreateProperty, UpdateProperty};
use crate::error::{DomainError, DomainResult, Resource};
use crate::model::{Property, Unit};
use crate::store::{DataClientExt, Filter};
use crate::tenant::ScopedStore;

/// Property with the number of live units it holds
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PropertySummary {
    #[serde(flatten)]
    pub property: Property,
    pub unit_count: u64,
}

/// Property with its live units
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDetail {
    #[serde(flatten)]
    pub property: Property,
    pub units: Vec<Unit>,
}

/// Property application service
#[derive(Clone)]
pub struct PropertyService {
    db: ScopedStore,
}

impl PropertyService {
    pub fn new(db: ScopedStore) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: CreateProperty) -> DomainResult<Property> {
        let now = Utc::now();
        let property = Property {
            id: Uuid::new_v4(),
            tenant_id: None,
            name: input.name,
            address: input.address,
            property_type: input.property_type,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let property = self.db.create(property).await?;
        tracing::info!(property_id = %property.id, "Property created");
        Ok(property)
    }

    /// Live properties, newest first
    pub async fn list(&self) -> DomainResult<Vec<PropertySummary>> {
        let properties = self
            .db
            .find_many(
                Filter::<Property>::all().live(),
                newest_first(|p: &Property| p.created_at),
            )
            .await?;
        let counts = self
            .db
            .group_by(Filter::<Unit>::all().live(), |u| u.property_id.to_string())
            .await?;

        Ok(properties
            .into_iter()
            .map(|property| PropertySummary {
                unit_count: counts.get(&property.id.to_string()).copied().unwrap_or(0),
                property,
            })
            .collect())
    }

    pub async fn get(&self, id: Uuid) -> DomainResult<PropertyDetail> {
        let property = self.find_one(id).await?;
        let units = self
            .db
            .find_many(
                Filter::<Unit>::all().live().and(move |u| u.property_id == id),
                ascending(|u: &Unit| u.name.clone()),
            )
            .await?;
        Ok(PropertyDetail { property, units })
    }

    pub async fn update(&self, id: Uuid, input: UpdateProperty) -> DomainResult<Property> {
        self.find_one(id).await?;
        let property = self
            .db
            .update(Filter::<Property>::id(id).live(), move |p| {
                if let Some(name) = &input.name {
                    p.name = name.clone();
                }
                if let Some(address) = &input.address {
                    p.address = address.clone();
                }
                if let Some(property_type) = &input.property_type {
                    p.property_type = property_type.clone();
                }
            })
            .await
            .map_err(missing(Resource::Property))?;
        Ok(property)
    }

    /// Soft delete; units are left as they are
    pub async fn remove(&self, id: Uuid) -> DomainResult<Property> {
        self.find_one(id).await?;
        let now = Utc::now();
        let property = self
            .db
            .update(Filter::<Property>::id(id).live(), move |p| p.deleted_at = Some(now))
            .await
            .map_err(missing(Resource::Property))?;
        tracing::info!(property_id = %id, "Property deleted");
        Ok(property)
    }

    async fn find_one(&self, id: Uuid) -> DomainResult<Property> {
        self.db
            .find_first(Filter::<Property>::id(id).live())
            .await?
            .ok_or(DomainError::NotFound(Resource::Property))
    }
}
