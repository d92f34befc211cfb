//! Query predicates

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use super::Entity;
use crate::model::TenantId;

/// Arbitrary row predicate
pub type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Row ordering for `find_many`
pub type SortBy<E> = Arc<dyn Fn(&E, &E) -> Ordering + Send + Sync>;

/// Conjunctive filter over one entity type.
///
/// Clauses are only ever added; a filter never loses a clause once built.
pub struct Filter<E> {
    id: Option<Uuid>,
    tenant_id: Option<TenantId>,
    live_only: bool,
    predicates: Vec<Predicate<E>>,
}

impl<E: Entity> Filter<E> {
    /// Matches every row
    pub fn all() -> Self {
        Self {
            id: None,
            tenant_id: None,
            live_only: false,
            predicates: Vec::new(),
        }
    }

    /// Matches the row with this primary key
    pub fn id(id: Uuid) -> Self {
        Self { id: Some(id), ..Self::all() }
    }

    /// Excludes soft-deleted rows (`deleted_at IS NULL`)
    pub fn live(mut self) -> Self {
        self.live_only = true;
        self
    }

    /// Adds a predicate clause
    pub fn and<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Arc::new(predicate));
        self
    }

    /// Sets the tenant clause. A previous tenant clause is replaced.
    pub fn tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn matches(&self, row: &E) -> bool {
        if let Some(id) = self.id {
            if row.id() != id {
                return false;
            }
        }
        if let Some(tenant_id) = self.tenant_id {
            if row.tenant_id() != Some(tenant_id) {
                return false;
            }
        }
        if self.live_only && row.deleted_at().is_some() {
            return false;
        }
        self.predicates.iter().all(|p| p(row))
    }
}

impl<E> Clone for Filter<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            tenant_id: self.tenant_id,
            live_only: self.live_only,
            predicates: self.predicates.clone(),
        }
    }
}

impl<E> fmt::Debug for Filter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("id", &self.id)
            .field("tenant_id", &self.tenant_id)
            .field("live_only", &self.live_only)
            .field("predicates", &self.predicates.len())
            .finish()
    }
}
