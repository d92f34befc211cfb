//! Data Transfer Objects (DTOs)
//!
//! Service inputs. Shape rules live on the structs (`validator`); rules that
//! need the store live in the services.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::model::{RenterStatus, UnitStatus};
use crate::validation::{KENYAN_PHONE, NATIONAL_ID};

// =============================================================================
// Properties
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProperty {
    /// e.g. "Sunset Apartments"
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    /// Estate/area and town, e.g. "Westlands, Nairobi"
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,

    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "Type is required"))]
    pub property_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProperty {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, message = "Address must not be empty"))]
    pub address: Option<String>,

    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "Type must not be empty"))]
    pub property_type: Option<String>,
}

// =============================================================================
// Units
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUnit {
    pub property_id: Uuid,

    /// e.g. "Bedsitter 4"
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    /// Whole KES
    #[validate(range(min = 0, message = "Rent amount must not be negative"))]
    pub rent_amount: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUnit {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,

    #[validate(range(min = 0, message = "Rent amount must not be negative"))]
    pub rent_amount: Option<i64>,

    /// RESERVED, VACATING, MAINTENANCE or VACANT
    pub status: Option<UnitStatus>,
}

// =============================================================================
// Renters
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRenter {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,

    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,

    #[validate(regex(
        path = *KENYAN_PHONE,
        message = "Phone number must be in format +2547XXXXXXXX or +2541XXXXXXXX"
    ))]
    pub phone: String,

    #[validate(regex(path = *NATIONAL_ID, message = "National ID must be 7 to 9 digits"))]
    pub national_id: String,

    #[validate(regex(path = *KENYAN_PHONE, message = "Emergency contact must be in format +254..."))]
    pub emergency_contact: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRenter {
    #[validate(length(min = 1, message = "First name must not be empty"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, message = "Last name must not be empty"))]
    pub last_name: Option<String>,

    #[validate(regex(
        path = *KENYAN_PHONE,
        message = "Phone number must be in format +2547XXXXXXXX or +2541XXXXXXXX"
    ))]
    pub phone: Option<String>,

    #[validate(regex(path = *NATIONAL_ID, message = "National ID must be 7 to 9 digits"))]
    pub national_id: Option<String>,

    #[validate(regex(path = *KENYAN_PHONE, message = "Emergency contact must be in format +254..."))]
    pub emergency_contact: Option<String>,

    pub status: Option<RenterStatus>,
}

// =============================================================================
// Agreements & Invoices
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgreement {
    pub unit_id: Uuid,
    pub renter_id: Uuid,
    pub start_date: NaiveDate,

    #[validate(range(min = 0, message = "Rent amount must not be negative"))]
    pub rent_amount: i64,

    #[validate(range(min = 0, message = "Deposit must not be negative"))]
    pub deposit: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoice {
    pub rental_agreement_id: Uuid,

    /// Whole KES, e.g. 15000
    #[validate(range(min = 0, message = "Amount must not be negative"))]
    pub amount: i64,

    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoice {
    pub is_paid: Option<bool>,

    #[validate(range(min = 0, message = "Late fee must not be negative"))]
    pub late_fee_applied: Option<i64>,
}
