//! RentFlow Core
//!
//! Multi-tenant rental management domain.
//!
//! ## Architecture
//!
//! - **Model**: tenants, users, properties, units, renters, agreements,
//!   invoices and payments
//! - **Store**: generic operation-dispatching data client with transactions
//! - **Tenant**: request-scoped tenant context and the scoping proxy
//! - **Services**: rental lifecycle rules, written as if every store were
//!   tenant-local
//!
//! ## Flow
//!
//! ```text
//! request ─► TenantContext::scope ─► service ─► TenantScoped ─► MemoryStore
//! ```

pub mod error;
pub mod model;
pub mod services;
pub mod store;
pub mod tenant;
pub mod validation;

pub use error::{DomainError, DomainResult, ErrorKind, Resource};
pub use model::{
    Payment, PaymentMethod, PaymentStatus, Property, RentInvoice, RentalAgreement, Renter,
    RenterStatus, Tenant, TenantId, Unit, UnitStatus, User, UserRole,
};
pub use services::{AgreementService, InvoiceService, PropertyService, RenterService, UnitService};
pub use store::{DataClient, DataClientExt, Filter, MemoryStore, StoreError, Tables};
pub use tenant::{ScopedStore, TenantContext, TenantScoped};
