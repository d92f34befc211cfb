//! Rental Data Model
//!
//! Every record except [`Tenant`] is tenant-owned and carries an optional
//! `tenant_id` that the scoping layer stamps at creation time. A record with
//! no tenant id is rejected by the store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::store::{Entity, Table, Tables};

/// Tenant ID
pub type TenantId = Uuid;

// ============ Tenants & Users ============

/// Customer account; the isolation boundary for all other records
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    SuperAdmin,
    PropertyManager,
    Landlord,
    Accountant,
    Tenant,
}

impl UserRole {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "SUPER_ADMIN",
            Self::PropertyManager => "PROPERTY_MANAGER",
            Self::Landlord => "LANDLORD",
            Self::Accountant => "ACCOUNTANT",
            Self::Tenant => "TENANT",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Login identity belonging to exactly one tenant.
///
/// Serialized form includes the password hash and is only meant for
/// snapshots; API responses go through a profile view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Option<TenantId>,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: impl Into<String>, password_hash: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: None,
            email: email.into(),
            password_hash,
            role,
            created_at: now,
            updated_at: now,
        }
    }
}

// ============ Properties & Units ============

/// Building or estate managed by a tenant
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: Uuid,
    pub tenant_id: Option<TenantId>,
    pub name: String,
    pub address: String,
    /// e.g. "Residential", "Commercial", "Mixed"
    #[serde(rename = "type")]
    pub property_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Occupancy status of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitStatus {
    Vacant,
    Reserved,
    Occupied,
    Vacating,
    Maintenance,
}

impl UnitStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Vacant => "VACANT",
            Self::Reserved => "RESERVED",
            Self::Occupied => "OCCUPIED",
            Self::Vacating => "VACATING",
            Self::Maintenance => "MAINTENANCE",
        }
    }

    /// Statuses an operator may set directly. `Occupied` is only reachable
    /// through an agreement.
    pub const fn is_externally_settable(&self) -> bool {
        !matches!(self, Self::Occupied)
    }
}

impl Default for UnitStatus {
    fn default() -> Self {
        Self::Vacant
    }
}

/// Lettable unit within a property
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: Uuid,
    pub tenant_id: Option<TenantId>,
    pub property_id: Uuid,
    pub name: String,
    /// Monthly rent in whole KES
    pub rent_amount: i64,
    pub status: UnitStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

// ============ Renters ============

/// Renter standing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenterStatus {
    Active,
    Past,
    Evicted,
}

impl Default for RenterStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// Person occupying (or who occupied) a unit
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Renter {
    pub id: Uuid,
    pub tenant_id: Option<TenantId>,
    pub first_name: String,
    pub last_name: String,
    /// E.164, e.g. +254712345678
    pub phone: String,
    pub national_id: String,
    pub emergency_contact: Option<String>,
    pub status: RenterStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

// ============ Agreements & Billing ============

/// Lease linking one unit and one renter
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RentalAgreement {
    pub id: Uuid,
    pub tenant_id: Option<TenantId>,
    pub unit_id: Uuid,
    pub renter_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    /// Rent locked at signing, whole KES
    pub rent_amount: i64,
    pub deposit: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Rent due under an agreement
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RentInvoice {
    pub id: Uuid,
    pub tenant_id: Option<TenantId>,
    pub rental_agreement_id: Uuid,
    pub amount: i64,
    pub due_date: NaiveDate,
    pub is_paid: bool,
    pub late_fee_applied: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How a payment was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Mpesa,
    Cash,
    BankTransfer,
}

/// Payment lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// Payment attempt against an invoice
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub tenant_id: Option<TenantId>,
    pub rental_agreement_id: Uuid,
    pub rent_invoice_id: Option<Uuid>,
    pub amount: i64,
    pub method: PaymentMethod,
    /// Provider correlation id; unique across the store
    pub checkout_request_id: Option<String>,
    pub mpesa_receipt: Option<String>,
    pub status: PaymentStatus,
    #[schema(value_type = Option<Object>)]
    pub raw_response: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============ Entity bindings ============

impl Entity for Tenant {
    const NAME: &'static str = "Tenant";
    const TENANT_SCOPED: bool = false;

    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> Option<TenantId> {
        None
    }

    fn assign_tenant(&mut self, _tenant_id: TenantId) {}

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.tenants
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.tenants
    }
}

impl Entity for User {
    const NAME: &'static str = "User";

    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    fn assign_tenant(&mut self, tenant_id: TenantId) {
        self.tenant_id = Some(tenant_id);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    // Login is global, so emails are unique across tenants
    fn unique_keys(&self) -> Vec<String> {
        vec![format!("email:{}", self.email.to_lowercase())]
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.users
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.users
    }
}

impl Entity for Property {
    const NAME: &'static str = "Property";

    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    fn assign_tenant(&mut self, tenant_id: TenantId) {
        self.tenant_id = Some(tenant_id);
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.properties
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.properties
    }
}

impl Entity for Unit {
    const NAME: &'static str = "Unit";

    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    fn assign_tenant(&mut self, tenant_id: TenantId) {
        self.tenant_id = Some(tenant_id);
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.units
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.units
    }
}

impl Entity for Renter {
    const NAME: &'static str = "Renter";

    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    fn assign_tenant(&mut self, tenant_id: TenantId) {
        self.tenant_id = Some(tenant_id);
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.renters
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.renters
    }
}

impl Entity for RentalAgreement {
    const NAME: &'static str = "RentalAgreement";

    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    fn assign_tenant(&mut self, tenant_id: TenantId) {
        self.tenant_id = Some(tenant_id);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    // Partial index: at most one active agreement per unit
    fn unique_keys(&self) -> Vec<String> {
        if self.is_active {
            vec![format!("active_unit:{}", self.unit_id)]
        } else {
            Vec::new()
        }
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.agreements
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.agreements
    }
}

impl Entity for RentInvoice {
    const NAME: &'static str = "RentInvoice";

    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    fn assign_tenant(&mut self, tenant_id: TenantId) {
        self.tenant_id = Some(tenant_id);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.invoices
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.invoices
    }
}

impl Entity for Payment {
    const NAME: &'static str = "Payment";

    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    fn assign_tenant(&mut self, tenant_id: TenantId) {
        self.tenant_id = Some(tenant_id);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn unique_keys(&self) -> Vec<String> {
        self.checkout_request_id
            .iter()
            .map(|id| format!("checkout_request_id:{id}"))
            .collect()
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.payments
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.payments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_format() {
        let json = serde_json::to_string(&UserRole::PropertyManager).unwrap();
        assert_eq!(json, "\"PROPERTY_MANAGER\"");
        let role: UserRole = serde_json::from_str("\"SUPER_ADMIN\"").unwrap();
        assert_eq!(role, UserRole::SuperAdmin);
        assert_eq!(UserRole::Accountant.to_string(), "ACCOUNTANT");
    }

    #[test]
    fn test_occupied_not_externally_settable() {
        assert!(!UnitStatus::Occupied.is_externally_settable());
        assert!(UnitStatus::Maintenance.is_externally_settable());
        assert_eq!(UnitStatus::default(), UnitStatus::Vacant);
    }

    #[test]
    fn test_agreement_unique_key_only_while_active() {
        let now = Utc::now();
        let mut agreement = RentalAgreement {
            id: Uuid::new_v4(),
            tenant_id: None,
            unit_id: Uuid::new_v4(),
            renter_id: Uuid::new_v4(),
            start_date: now.date_naive(),
            end_date: None,
            rent_amount: 15_000,
            deposit: 30_000,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(agreement.unique_keys().len(), 1);
        agreement.is_active = false;
        assert!(agreement.unique_keys().is_empty());
    }
}
