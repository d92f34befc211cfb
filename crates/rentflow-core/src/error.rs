//! Domain Errors

use thiserror::Error;

use crate::store::StoreError;

/// Resource named in a not-found failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Property,
    Unit,
    Renter,
    RentalAgreement,
    ActiveRentalAgreement,
    Invoice,
    Payment,
}

impl Resource {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Property => "PROPERTY_NOT_FOUND",
            Self::Unit => "UNIT_NOT_FOUND",
            Self::Renter => "RENTER_NOT_FOUND",
            Self::RentalAgreement => "RENTAL_AGREEMENT_NOT_FOUND",
            Self::ActiveRentalAgreement => "ACTIVE_RENTAL_AGREEMENT_NOT_FOUND",
            Self::Invoice => "INVOICE_NOT_FOUND",
            Self::Payment => "PAYMENT_NOT_FOUND",
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Property => "Property",
            Self::Unit => "Unit",
            Self::Renter => "Renter",
            Self::RentalAgreement => "Rental agreement",
            Self::ActiveRentalAgreement => "Active rental agreement",
            Self::Invoice => "Invoice",
            Self::Payment => "Payment",
        }
    }
}

/// Failure category, mapped to a transport status at the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Internal,
}

/// Domain error
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{} not found", .0.label())]
    NotFound(Resource),

    #[error("Unit is not vacant")]
    UnitNotVacant,

    #[error("A renter with this phone number already exists")]
    RenterPhoneExists,

    #[error("Agreement is already terminated")]
    AgreementTerminated,

    #[error("A user with this email already exists")]
    UserExists,

    #[error("{0}")]
    Invalid(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::UnitNotVacant
            | Self::RenterPhoneExists
            | Self::AgreementTerminated
            | Self::UserExists => ErrorKind::Conflict,
            Self::Invalid(_) => ErrorKind::Validation,
            Self::Store(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(resource) => resource.code(),
            Self::UnitNotVacant => "UNIT_NOT_VACANT",
            Self::RenterPhoneExists => "RENTER_PHONE_ALREADY_EXISTS",
            Self::AgreementTerminated => "AGREEMENT_ALREADY_TERMINATED",
            Self::UserExists => "USER_ALREADY_EXISTS",
            Self::Invalid(_) => "VALIDATION_ERROR",
            Self::Store(_) => "INTERNAL_ERROR",
        }
    }
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_kinds() {
        let err = DomainError::NotFound(Resource::ActiveRentalAgreement);
        assert_eq!(err.code(), "ACTIVE_RENTAL_AGREEMENT_NOT_FOUND");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Active rental agreement not found");

        assert_eq!(DomainError::UnitNotVacant.kind(), ErrorKind::Conflict);
        let store = DomainError::from(StoreError::UnexpectedOutcome("record"));
        assert_eq!(store.code(), "INTERNAL_ERROR");
    }
}
