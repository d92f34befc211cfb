//! In-process store with serialisable transactions

use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{Aggregation, DataClient, Entity, Operation, Outcome, StoreError, Tables};

/// Future returned by a transaction callback
pub type TxFuture<'c, T> = Pin<Box<dyn Future<Output = T> + Send + 'c>>;

/// Shared, long-lived store handle.
///
/// Single operations are atomic. Multi-operation atomicity comes from
/// [`MemoryStore::transaction`], which serialises writers behind one lock
/// and commits a working copy only when the callback succeeds.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tables(tables: Tables) -> Self {
        Self { tables: Mutex::new(tables) }
    }

    /// Run `callback` against a private working copy and commit it if the
    /// callback returns `Ok`. On `Err` nothing is written.
    ///
    /// The callback must only use the [`Tx`] it is given; calling back into
    /// this store from inside the callback deadlocks.
    pub async fn transaction<F, T, E>(&self, callback: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c Tx) -> TxFuture<'c, Result<T, E>> + Send,
        T: Send,
        E: Send,
    {
        let mut committed = self.tables.lock().await;
        let tx = Tx {
            working: parking_lot::Mutex::new(committed.clone()),
        };

        let result = callback(&tx).await;
        match result {
            Ok(value) => {
                *committed = tx.working.into_inner();
                Ok(value)
            }
            Err(e) => {
                tracing::debug!("transaction rolled back");
                Err(e)
            }
        }
    }

    /// Copy of every table
    pub async fn snapshot(&self) -> Tables {
        self.tables.lock().await.clone()
    }

    /// Load tables from a JSON snapshot; a missing file yields an empty store
    pub async fn load_snapshot(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let tables: Tables = serde_json::from_slice(&bytes)?;
                tracing::info!(path = %path.display(), "Loaded store snapshot");
                Ok(Self::with_tables(tables))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No snapshot found, starting empty");
                Ok(Self::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write every table to `path` as JSON
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let bytes = {
            let tables = self.tables.lock().await;
            serde_json::to_vec_pretty(&*tables)?
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, bytes).await?;
        tracing::info!(path = %path.display(), "Saved store snapshot");
        Ok(())
    }
}

#[async_trait]
impl DataClient for MemoryStore {
    async fn execute<E: Entity>(&self, op: Operation<E>) -> Result<Outcome<E>, StoreError> {
        let mut tables = self.tables.lock().await;
        apply(&mut tables, op, Utc::now())
    }
}

/// Transaction handle passed to [`MemoryStore::transaction`] callbacks
#[derive(Debug)]
pub struct Tx {
    working: parking_lot::Mutex<Tables>,
}

#[async_trait]
impl DataClient for Tx {
    async fn execute<E: Entity>(&self, op: Operation<E>) -> Result<Outcome<E>, StoreError> {
        let mut tables = self.working.lock();
        apply(&mut tables, op, Utc::now())
    }
}

fn apply<E: Entity>(
    tables: &mut Tables,
    op: Operation<E>,
    now: DateTime<Utc>,
) -> Result<Outcome<E>, StoreError> {
    tracing::trace!(entity = E::NAME, op = op.name(), "apply");
    let table = E::table_mut(tables);

    match op {
        Operation::FindUnique(filter) | Operation::FindFirst(filter) => {
            Ok(Outcome::Record(table.matching(&filter).next().cloned()))
        }
        Operation::FindMany { filter, order } => {
            let mut rows: Vec<E> = table.matching(&filter).cloned().collect();
            if let Some(order) = order {
                rows.sort_by(|a, b| order(a, b));
            }
            Ok(Outcome::Records(rows))
        }
        Operation::Create(record) => table.insert(record).map(|r| Outcome::Record(Some(r))),
        Operation::CreateMany(records) => {
            // all-or-nothing within the batch
            let mut staged = table.clone();
            let count = records.len() as u64;
            for record in records {
                staged.insert(record)?;
            }
            *table = staged;
            Ok(Outcome::Affected(count))
        }
        Operation::Update { filter, patch } => match table.position(&filter) {
            Some(idx) => table.replace_at(idx, &patch, now).map(|r| Outcome::Record(Some(r))),
            None => Err(StoreError::NotFound { entity: E::NAME }),
        },
        Operation::UpdateMany { filter, patch } => {
            let mut staged = table.clone();
            let targets: Vec<usize> = staged
                .rows
                .iter()
                .enumerate()
                .filter(|(_, row)| filter.matches(row))
                .map(|(idx, _)| idx)
                .collect();
            for idx in &targets {
                staged.replace_at(*idx, &patch, now)?;
            }
            *table = staged;
            Ok(Outcome::Affected(targets.len() as u64))
        }
        Operation::Delete(filter) => match table.position(&filter) {
            Some(idx) => Ok(Outcome::Record(Some(table.rows.remove(idx)))),
            None => Err(StoreError::NotFound { entity: E::NAME }),
        },
        Operation::DeleteMany(filter) => {
            let before = table.rows.len();
            table.rows.retain(|row| !filter.matches(row));
            Ok(Outcome::Affected((before - table.rows.len()) as u64))
        }
        Operation::Count(filter) => Ok(Outcome::Affected(table.matching(&filter).count() as u64)),
        Operation::Aggregate { filter, measure } => {
            let aggregation = table.matching(&filter).fold(Aggregation::default(), |acc, row| {
                Aggregation {
                    count: acc.count + 1,
                    sum: acc.sum + measure(row),
                }
            });
            Ok(Outcome::Aggregate(aggregation))
        }
        Operation::GroupBy { filter, key } => {
            let mut groups = BTreeMap::new();
            for row in table.matching(&filter) {
                *groups.entry(key(row)).or_insert(0u64) += 1;
            }
            Ok(Outcome::Groups(groups))
        }
        Operation::Upsert { filter, create, update } => match table.position(&filter) {
            Some(idx) => table.replace_at(idx, &update, now).map(|r| Outcome::Record(Some(r))),
            None => table.insert(create).map(|r| Outcome::Record(Some(r))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Payment, PaymentMethod, PaymentStatus, Property, Tenant};
    use crate::store::{DataClientExt, Filter};
    use uuid::Uuid;

    fn property(tenant: Option<Uuid>, name: &str) -> Property {
        let now = Utc::now();
        Property {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            name: name.into(),
            address: "Kilimani, Nairobi".into(),
            property_type: "Residential".into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn payment(tenant: Uuid, checkout: &str) -> Payment {
        let now = Utc::now();
        Payment {
            id: Uuid::new_v4(),
            tenant_id: Some(tenant),
            rental_agreement_id: Uuid::new_v4(),
            rent_invoice_id: None,
            amount: 100,
            method: PaymentMethod::Mpesa,
            checkout_request_id: Some(checkout.into()),
            mpesa_receipt: None,
            status: PaymentStatus::Pending,
            raw_response: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_rejects_unstamped_tenant_owned_record() {
        let store = MemoryStore::new();
        let err = store.create(property(None, "Orphan")).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingTenant { entity: "Property" }));

        // the tenant table itself is exempt
        store.create(Tenant::new("Acme", "owner@acme.co.ke")).await.unwrap();
    }

    #[tokio::test]
    async fn test_unique_checkout_request_id() {
        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();
        store.create(payment(tenant, "ws_CO_1")).await.unwrap();
        let err = store.create(payment(tenant, "ws_CO_1")).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_update_refreshes_timestamp_and_reports_missing() {
        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();
        let created = store.create(property(Some(tenant), "Sunset Apts")).await.unwrap();

        let updated = store
            .update(Filter::<Property>::id(created.id), |p| p.name = "Sunset Court".into())
            .await
            .unwrap();
        assert_eq!(updated.name, "Sunset Court");
        assert!(updated.updated_at >= created.updated_at);

        let err = store
            .update(Filter::<Property>::id(Uuid::new_v4()), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_transaction_rolls_back_on_error() {
        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();
        let record = property(Some(tenant), "Riverside");

        let result: Result<(), StoreError> = store
            .transaction(move |tx| {
                Box::pin(async move {
                    tx.create(record).await?;
                    Err(StoreError::NotFound { entity: "Unit" })
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(store.count(Filter::<Property>::all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transaction_commits_on_success() {
        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();
        let first = property(Some(tenant), "Block A");
        let second = property(Some(tenant), "Block B");

        store
            .transaction(move |tx| {
                Box::pin(async move {
                    tx.create(first).await?;
                    tx.create(second).await?;
                    Ok::<_, StoreError>(())
                })
            })
            .await
            .unwrap();

        assert_eq!(store.count(Filter::<Property>::all()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_create_many_is_all_or_nothing() {
        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();
        let err = store
            .create_many(vec![payment(tenant, "ws_CO_9"), payment(tenant, "ws_CO_9")])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { .. }));
        assert_eq!(store.count(Filter::<Payment>::all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();
        store.create(property(Some(tenant), "Lavington Gardens")).await.unwrap();
        store.save_snapshot(&path).await.unwrap();

        let restored = MemoryStore::load_snapshot(&path).await.unwrap();
        let rows = restored.find_many(Filter::<Property>::all(), None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Lavington Gardens");

        let empty = MemoryStore::load_snapshot(dir.path().join("missing.json")).await.unwrap();
        assert_eq!(empty.count(Filter::<Property>::all()).await.unwrap(), 0);
    }
}
