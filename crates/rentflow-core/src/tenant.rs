//! Tenant Isolation
//!
//! Two pieces cooperate:
//!
//! - [`TenantContext`] is bound to the current request's task with
//!   [`TenantContext::scope`] and read back with [`TenantContext::current`].
//!   The binding lives exactly as long as the scoped future, so concurrent
//!   requests never see each other's tenant.
//! - [`TenantScoped`] wraps any [`DataClient`] and rewrites each operation on
//!   a tenant-owned entity with [`Operation::scoped_to`] using the ambient
//!   tenant. With no ambient tenant the operation passes through untouched;
//!   callers must establish the context first.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::model::TenantId;
use crate::store::{DataClient, Entity, MemoryStore, Operation, Outcome, StoreError, Tx, TxFuture};

tokio::task_local! {
    static CURRENT_TENANT: TenantContext;
}

/// Tenant identity bound to one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub user_id: Option<Uuid>,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id, user_id: None }
    }

    pub fn for_user(tenant_id: TenantId, user_id: Uuid) -> Self {
        Self { tenant_id, user_id: Some(user_id) }
    }

    /// Run `future` with this context bound
    pub async fn scope<F>(self, future: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_TENANT.scope(self, future).await
    }

    /// Context bound to the running task, if any
    pub fn current() -> Option<Self> {
        CURRENT_TENANT.try_with(|ctx| *ctx).ok()
    }
}

/// Tenant-scoping proxy over a data client
#[derive(Debug, Clone)]
pub struct TenantScoped<C> {
    inner: C,
}

impl<C> TenantScoped<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    /// The unscoped client
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: DataClient> DataClient for TenantScoped<C> {
    async fn execute<E: Entity>(&self, op: Operation<E>) -> Result<Outcome<E>, StoreError> {
        if !E::TENANT_SCOPED {
            return self.inner.execute(op).await;
        }
        match TenantContext::current() {
            Some(ctx) => self.inner.execute(op.scoped_to(ctx.tenant_id)).await,
            None => self.inner.execute(op).await,
        }
    }
}

/// Scoped handle over the shared store
pub type ScopedStore = TenantScoped<Arc<MemoryStore>>;

impl TenantScoped<Arc<MemoryStore>> {
    /// Transaction whose handle applies the same tenant scoping
    pub async fn transaction<F, T, E>(&self, callback: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(TenantScoped<&'c Tx>) -> TxFuture<'c, Result<T, E>> + Send,
        T: Send,
        E: Send,
    {
        self.inner
            .transaction(move |tx| callback(TenantScoped::new(tx)))
            .await
    }
}
