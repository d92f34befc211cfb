//! Client operations and their results

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::{Entity, Filter, SortBy, StoreError};
use crate::model::TenantId;

/// In-place mutation applied by update-class operations
pub type Patch<E> = Arc<dyn Fn(&mut E) + Send + Sync>;

/// Numeric projection summed by `Aggregate`
pub type Measure<E> = Arc<dyn Fn(&E) -> i64 + Send + Sync>;

/// Bucket key used by `GroupBy`
pub type GroupKey<E> = Arc<dyn Fn(&E) -> String + Send + Sync>;

/// One request against a data client
pub enum Operation<E> {
    FindUnique(Filter<E>),
    FindFirst(Filter<E>),
    FindMany { filter: Filter<E>, order: Option<SortBy<E>> },
    Create(E),
    CreateMany(Vec<E>),
    Update { filter: Filter<E>, patch: Patch<E> },
    UpdateMany { filter: Filter<E>, patch: Patch<E> },
    Delete(Filter<E>),
    DeleteMany(Filter<E>),
    Count(Filter<E>),
    Aggregate { filter: Filter<E>, measure: Measure<E> },
    GroupBy { filter: Filter<E>, key: GroupKey<E> },
    /// Lookup by `filter`; update the match or insert `create`
    Upsert { filter: Filter<E>, create: E, update: Patch<E> },
}

impl<E: Entity> Operation<E> {
    /// Constrain this operation to one tenant.
    ///
    /// Filters gain a tenant clause, records to be created are stamped, and
    /// the update branch of an upsert is left as given.
    pub fn scoped_to(self, tenant_id: TenantId) -> Self {
        let stamp = |mut record: E| {
            record.assign_tenant(tenant_id);
            record
        };

        match self {
            Self::FindUnique(filter) => Self::FindUnique(filter.tenant(tenant_id)),
            Self::FindFirst(filter) => Self::FindFirst(filter.tenant(tenant_id)),
            Self::FindMany { filter, order } => Self::FindMany {
                filter: filter.tenant(tenant_id),
                order,
            },
            Self::Create(record) => Self::Create(stamp(record)),
            Self::CreateMany(records) => Self::CreateMany(records.into_iter().map(stamp).collect()),
            Self::Update { filter, patch } => Self::Update {
                filter: filter.tenant(tenant_id),
                patch,
            },
            Self::UpdateMany { filter, patch } => Self::UpdateMany {
                filter: filter.tenant(tenant_id),
                patch,
            },
            Self::Delete(filter) => Self::Delete(filter.tenant(tenant_id)),
            Self::DeleteMany(filter) => Self::DeleteMany(filter.tenant(tenant_id)),
            Self::Count(filter) => Self::Count(filter.tenant(tenant_id)),
            Self::Aggregate { filter, measure } => Self::Aggregate {
                filter: filter.tenant(tenant_id),
                measure,
            },
            Self::GroupBy { filter, key } => Self::GroupBy {
                filter: filter.tenant(tenant_id),
                key,
            },
            Self::Upsert { filter, create, update } => Self::Upsert {
                filter: filter.tenant(tenant_id),
                create: stamp(create),
                update,
            },
        }
    }

    /// Operation name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::FindUnique(_) => "findUnique",
            Self::FindFirst(_) => "findFirst",
            Self::FindMany { .. } => "findMany",
            Self::Create(_) => "create",
            Self::CreateMany(_) => "createMany",
            Self::Update { .. } => "update",
            Self::UpdateMany { .. } => "updateMany",
            Self::Delete(_) => "delete",
            Self::DeleteMany(_) => "deleteMany",
            Self::Count(_) => "count",
            Self::Aggregate { .. } => "aggregate",
            Self::GroupBy { .. } => "groupBy",
            Self::Upsert { .. } => "upsert",
        }
    }
}

impl<E> fmt::Debug for Operation<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FindUnique(filter)
            | Self::FindFirst(filter)
            | Self::FindMany { filter, .. }
            | Self::Update { filter, .. }
            | Self::UpdateMany { filter, .. }
            | Self::Delete(filter)
            | Self::DeleteMany(filter)
            | Self::Count(filter)
            | Self::Aggregate { filter, .. }
            | Self::GroupBy { filter, .. }
            | Self::Upsert { filter, .. } => f.debug_tuple("Operation").field(filter).finish(),
            Self::Create(_) => f.write_str("Operation::Create"),
            Self::CreateMany(records) => write!(f, "Operation::CreateMany({})", records.len()),
        }
    }
}

/// Count and sum produced by `Aggregate`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Aggregation {
    pub count: u64,
    pub sum: i64,
}

/// Result of an [`Operation`]
#[derive(Debug)]
pub enum Outcome<E> {
    Record(Option<E>),
    Records(Vec<E>),
    Affected(u64),
    Aggregate(Aggregation),
    Groups(BTreeMap<String, u64>),
}

impl<E> Outcome<E> {
    pub fn into_record(self) -> Result<Option<E>, StoreError> {
        match self {
            Self::Record(record) => Ok(record),
            _ => Err(StoreError::UnexpectedOutcome("record")),
        }
    }

    pub fn into_records(self) -> Result<Vec<E>, StoreError> {
        match self {
            Self::Records(records) => Ok(records),
            _ => Err(StoreError::UnexpectedOutcome("records")),
        }
    }

    pub fn into_affected(self) -> Result<u64, StoreError> {
        match self {
            Self::Affected(n) => Ok(n),
            _ => Err(StoreError::UnexpectedOutcome("affected")),
        }
    }

    pub fn into_aggregation(self) -> Result<Aggregation, StoreError> {
        match self {
            Self::Aggregate(aggregation) => Ok(aggregation),
            _ => Err(StoreError::UnexpectedOutcome("aggregate")),
        }
    }

    pub fn into_groups(self) -> Result<BTreeMap<String, u64>, StoreError> {
        match self {
            Self::Groups(groups) => Ok(groups),
            _ => Err(StoreError::UnexpectedOutcome("groups")),
        }
    }
}
