//! Data Access Layer
//!
//! A generic, operation-dispatching client over typed tables.
//!
//! ```text
//! service ──► TenantScoped<C> ──► Operation::scoped_to(tenant) ──► C::execute
//!                                                                   │
//!                                        MemoryStore / Tx ◄─────────┘
//! ```
//!
//! Every read and write is expressed as an [`Operation`] so that wrappers
//! (see [`crate::tenant::TenantScoped`]) can rewrite it before it reaches the
//! backing store.

mod filter;
mod memory;
mod operation;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{
    Payment, Property, RentInvoice, RentalAgreement, Renter, Tenant, TenantId, Unit, User,
};

pub use filter::{Filter, Predicate, SortBy};
pub use memory::{MemoryStore, Tx, TxFuture};
pub use operation::{Aggregation, GroupKey, Measure, Operation, Outcome, Patch};

/// Record type stored in a [`Table`]
pub trait Entity: Clone + Send + Sync + 'static {
    /// Model name used in errors and logs
    const NAME: &'static str;
    /// Whether the scoping layer filters and stamps this entity
    const TENANT_SCOPED: bool = true;

    fn id(&self) -> Uuid;
    fn tenant_id(&self) -> Option<TenantId>;
    fn assign_tenant(&mut self, tenant_id: TenantId);

    /// Soft-delete marker; entities without one are never considered deleted
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// Refresh `updated_at`
    fn touch(&mut self, now: DateTime<Utc>);

    /// Keys that must not be shared with any other row of the same table
    fn unique_keys(&self) -> Vec<String> {
        Vec::new()
    }

    fn table(tables: &Tables) -> &Table<Self>;
    fn table_mut(tables: &mut Tables) -> &mut Table<Self>;
}

/// Insertion-ordered rows of one entity type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table<E> {
    rows: Vec<E>,
}

impl<E> Default for Table<E> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<E: Entity> Table<E> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows, including soft-deleted ones
    pub fn rows(&self) -> &[E] {
        &self.rows
    }

    fn position(&self, filter: &Filter<E>) -> Option<usize> {
        self.rows.iter().position(|row| filter.matches(row))
    }

    fn matching<'a>(&'a self, filter: &'a Filter<E>) -> impl Iterator<Item = &'a E> + 'a {
        self.rows.iter().filter(move |row| filter.matches(row))
    }

    fn check_unique(&self, candidate: &E, skip: Option<usize>) -> Result<(), StoreError> {
        for key in candidate.unique_keys() {
            let taken = self
                .rows
                .iter()
                .enumerate()
                .filter(|(idx, _)| Some(*idx) != skip)
                .any(|(_, row)| row.unique_keys().contains(&key));
            if taken {
                return Err(StoreError::UniqueViolation { entity: E::NAME, key });
            }
        }
        Ok(())
    }

    fn insert(&mut self, record: E) -> Result<E, StoreError> {
        if E::TENANT_SCOPED && record.tenant_id().is_none() {
            return Err(StoreError::MissingTenant { entity: E::NAME });
        }
        if self.rows.iter().any(|row| row.id() == record.id()) {
            return Err(StoreError::UniqueViolation {
                entity: E::NAME,
                key: format!("id:{}", record.id()),
            });
        }
        self.check_unique(&record, None)?;
        self.rows.push(record.clone());
        Ok(record)
    }

    fn replace_at(&mut self, idx: usize, patch: &Patch<E>, now: DateTime<Utc>) -> Result<E, StoreError> {
        let mut updated = self.rows[idx].clone();
        patch(&mut updated);
        updated.touch(now);
        self.check_unique(&updated, Some(idx))?;
        self.rows[idx] = updated.clone();
        Ok(updated)
    }
}

/// Every table in the store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tables {
    pub tenants: Table<Tenant>,
    pub users: Table<User>,
    pub properties: Table<Property>,
    pub units: Table<Unit>,
    pub renters: Table<Renter>,
    pub agreements: Table<RentalAgreement>,
    pub invoices: Table<RentInvoice>,
    pub payments: Table<Payment>,
}

/// Store error
#[derive(Debug, Error)]
pub enum StoreError {
    /// No row matched a unique update/delete
    #[error("{entity} record not found")]
    NotFound { entity: &'static str },

    /// A unique key is already held by another row
    #[error("unique constraint violated on {entity}: {key}")]
    UniqueViolation { entity: &'static str, key: String },

    /// A tenant-owned row was written without a tenant id
    #[error("{entity} requires a tenant id")]
    MissingTenant { entity: &'static str },

    /// The dispatcher returned an outcome of the wrong shape
    #[error("unexpected outcome for {0}")]
    UnexpectedOutcome(&'static str),

    /// Snapshot could not be read or written
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be decoded
    #[error("snapshot format error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Generic data-access client.
///
/// Implementations apply a single [`Operation`] atomically.
#[async_trait]
pub trait DataClient: Send + Sync {
    async fn execute<E: Entity>(&self, op: Operation<E>) -> Result<Outcome<E>, StoreError>;
}

#[async_trait]
impl<C: DataClient + ?Sized> DataClient for &C {
    async fn execute<E: Entity>(&self, op: Operation<E>) -> Result<Outcome<E>, StoreError> {
        (**self).execute(op).await
    }
}

#[async_trait]
impl<C: DataClient + ?Sized> DataClient for Arc<C> {
    async fn execute<E: Entity>(&self, op: Operation<E>) -> Result<Outcome<E>, StoreError> {
        (**self).execute(op).await
    }
}

/// Typed helpers over [`DataClient::execute`]
#[async_trait]
pub trait DataClientExt: DataClient {
    async fn find_unique<E: Entity>(&self, filter: Filter<E>) -> Result<Option<E>, StoreError> {
        self.execute(Operation::FindUnique(filter)).await?.into_record()
    }

    async fn find_first<E: Entity>(&self, filter: Filter<E>) -> Result<Option<E>, StoreError> {
        self.execute(Operation::FindFirst(filter)).await?.into_record()
    }

    async fn find_many<E: Entity>(
        &self,
        filter: Filter<E>,
        order: Option<SortBy<E>>,
    ) -> Result<Vec<E>, StoreError> {
        self.execute(Operation::FindMany { filter, order }).await?.into_records()
    }

    async fn create<E: Entity>(&self, record: E) -> Result<E, StoreError> {
        self.execute(Operation::Create(record))
            .await?
            .into_record()?
            .ok_or(StoreError::UnexpectedOutcome("create"))
    }

    async fn create_many<E: Entity>(&self, records: Vec<E>) -> Result<u64, StoreError> {
        self.execute(Operation::CreateMany(records)).await?.into_affected()
    }

    /// Update the first matching row; `NotFound` if none matches
    async fn update<E, P>(&self, filter: Filter<E>, patch: P) -> Result<E, StoreError>
    where
        E: Entity,
        P: Fn(&mut E) + Send + Sync + 'static,
    {
        self.execute(Operation::Update { filter, patch: Arc::new(patch) })
            .await?
            .into_record()?
            .ok_or(StoreError::NotFound { entity: E::NAME })
    }

    async fn update_many<E, P>(&self, filter: Filter<E>, patch: P) -> Result<u64, StoreError>
    where
        E: Entity,
        P: Fn(&mut E) + Send + Sync + 'static,
    {
        self.execute(Operation::UpdateMany { filter, patch: Arc::new(patch) })
            .await?
            .into_affected()
    }

    /// Physically remove the first matching row; `NotFound` if none matches
    async fn delete<E: Entity>(&self, filter: Filter<E>) -> Result<E, StoreError> {
        self.execute(Operation::Delete(filter))
            .await?
            .into_record()?
            .ok_or(StoreError::NotFound { entity: E::NAME })
    }

    async fn delete_many<E: Entity>(&self, filter: Filter<E>) -> Result<u64, StoreError> {
        self.execute(Operation::DeleteMany(filter)).await?.into_affected()
    }

    async fn count<E: Entity>(&self, filter: Filter<E>) -> Result<u64, StoreError> {
        self.execute(Operation::Count(filter)).await?.into_affected()
    }

    async fn aggregate<E, M>(&self, filter: Filter<E>, measure: M) -> Result<Aggregation, StoreError>
    where
        E: Entity,
        M: Fn(&E) -> i64 + Send + Sync + 'static,
    {
        self.execute(Operation::Aggregate { filter, measure: Arc::new(measure) })
            .await?
            .into_aggregation()
    }

    async fn group_by<E, K>(
        &self,
        filter: Filter<E>,
        key: K,
    ) -> Result<std::collections::BTreeMap<String, u64>, StoreError>
    where
        E: Entity,
        K: Fn(&E) -> String + Send + Sync + 'static,
    {
        self.execute(Operation::GroupBy { filter, key: Arc::new(key) })
            .await?
            .into_groups()
    }

    async fn upsert<E, P>(&self, filter: Filter<E>, create: E, update: P) -> Result<E, StoreError>
    where
        E: Entity,
        P: Fn(&mut E) + Send + Sync + 'static,
    {
        self.execute(Operation::Upsert { filter, create, update: Arc::new(update) })
            .await?
            .into_record()?
            .ok_or(StoreError::UnexpectedOutcome("upsert"))
    }
}

impl<C: DataClient + ?Sized> DataClientExt for C {}
