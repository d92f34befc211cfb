//! Domain services
//!
//! Each service holds a [`ScopedStore`] and is written as if the store held
//! only the caller's tenant. Callers run service methods inside
//! [`crate::TenantContext::scope`].

pub mod agreement;
pub mod dto;
pub mod invoice;
pub mod property;
pub mod renter;
pub mod unit;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use crate::error::{DomainError, Resource};
use crate::store::{DataClient, DataClientExt, Entity, Filter, SortBy, StoreError};

pub use agreement::{AgreementDetail, AgreementService, AgreementView};
pub use dto::*;
pub use invoice::{InvoiceDetail, InvoiceService, InvoiceView, OutstandingSummary};
pub use property::{PropertyDetail, PropertyService, PropertySummary};
pub use renter::{RenterDetail, RenterService};
pub use unit::{OccupancySummary, UnitService};

/// Map a store `NotFound` to the domain resource that was missing
pub(crate) fn missing(resource: Resource) -> impl Fn(StoreError) -> DomainError {
    move |e| match e {
        StoreError::NotFound { .. } => DomainError::NotFound(resource),
        other => DomainError::Store(other),
    }
}

/// Descending order on `key`
pub(crate) fn newest_first<E, K, F>(key: F) -> Option<SortBy<E>>
where
    E: 'static,
    K: Ord,
    F: Fn(&E) -> K + Send + Sync + 'static,
{
    Some(Arc::new(move |a: &E, b: &E| key(b).cmp(&key(a))))
}

/// Ascending order on `key`
pub(crate) fn ascending<E, K, F>(key: F) -> Option<SortBy<E>>
where
    E: 'static,
    K: Ord,
    F: Fn(&E) -> K + Send + Sync + 'static,
{
    Some(Arc::new(move |a: &E, b: &E| key(a).cmp(&key(b))))
}

/// Load the rows with the given ids, keyed by id
pub(crate) async fn by_ids<E, C>(db: &C, ids: HashSet<Uuid>) -> Result<HashMap<Uuid, E>, StoreError>
where
    E: Entity,
    C: DataClient,
{
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = db
        .find_many(Filter::<E>::all().and(move |row| ids.contains(&row.id())), None)
        .await?;
    Ok(rows.into_iter().map(|row| (row.id(), row)).collect())
}
