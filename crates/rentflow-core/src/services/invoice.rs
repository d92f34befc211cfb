//! Rent invoice service

use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{by_ids, missing, newest_first, CreateInvoice, UpdateInvoice};
use crate::error::{DomainError, DomainResult, Resource};
use crate::model::{Payment, RentInvoice, RentalAgreement, Renter, Unit};
use crate::store::{DataClientExt, Filter};
use crate::tenant::ScopedStore;

/// Invoice with the agreement it bills, and that agreement's unit and renter
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceView {
    #[serde(flatten)]
    pub invoice: RentInvoice,
    pub rental_agreement: Option<RentalAgreement>,
    pub unit: Option<Unit>,
    pub renter: Option<Renter>,
}

/// Invoice with its payment history, newest first
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub view: InvoiceView,
    pub payments: Vec<Payment>,
}

/// Unpaid invoices and the rent plus late fees they still owe
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutstandingSummary {
    pub unpaid_count: u64,
    pub amount_due: i64,
}

/// Rent invoice application service
#[derive(Clone)]
pub struct InvoiceService {
    db: ScopedStore,
}

impl InvoiceService {
    pub fn new(db: ScopedStore) -> Self {
        Self { db }
    }

    /// Bills an active agreement. Several invoices for the same period are
    /// allowed.
    pub async fn create(&self, input: CreateInvoice) -> DomainResult<RentInvoice> {
        let now = Utc::now();
        let agreement_id = input.rental_agreement_id;
        let invoice = RentInvoice {
            id: Uuid::new_v4(),
            tenant_id: None,
            rental_agreement_id: agreement_id,
            amount: input.amount,
            due_date: input.due_date,
            is_paid: false,
            late_fee_applied: None,
            created_at: now,
            updated_at: now,
        };

        let invoice = self
            .db
            .transaction(move |tx| {
                Box::pin(async move {
                    tx.find_first(Filter::<RentalAgreement>::id(agreement_id).and(|a| a.is_active))
                        .await?
                        .ok_or(DomainError::NotFound(Resource::ActiveRentalAgreement))?;
                    Ok::<_, DomainError>(tx.create(invoice).await?)
                })
            })
            .await?;
        tracing::info!(invoice_id = %invoice.id, agreement_id = %agreement_id, "Invoice generated");
        Ok(invoice)
    }

    /// Every invoice, latest due date first
    pub async fn list(&self) -> DomainResult<Vec<InvoiceView>> {
        let invoices = self
            .db
            .find_many(
                Filter::<RentInvoice>::all(),
                newest_first(|i: &RentInvoice| i.due_date),
            )
            .await?;
        self.views(invoices).await
    }

    pub async fn get(&self, id: Uuid) -> DomainResult<InvoiceDetail> {
        let invoice = self.find_one(id).await?;
        let payments = self
            .db
            .find_many(
                Filter::<Payment>::all().and(move |p| p.rent_invoice_id == Some(id)),
                newest_first(|p: &Payment| p.created_at),
            )
            .await?;
        let view = self
            .views(vec![invoice])
            .await?
            .pop()
            .ok_or(DomainError::NotFound(Resource::Invoice))?;
        Ok(InvoiceDetail { view, payments })
    }

    pub async fn update(&self, id: Uuid, input: UpdateInvoice) -> DomainResult<RentInvoice> {
        let invoice = self
            .db
            .update(Filter::<RentInvoice>::id(id), move |i| {
                if let Some(is_paid) = input.is_paid {
                    i.is_paid = is_paid;
                }
                if let Some(fee) = input.late_fee_applied {
                    i.late_fee_applied = Some(fee);
                }
            })
            .await
            .map_err(missing(Resource::Invoice))?;
        tracing::info!(invoice_id = %id, is_paid = invoice.is_paid, "Invoice updated");
        Ok(invoice)
    }

    /// Unpaid invoice count and total due, late fees included
    pub async fn outstanding(&self) -> DomainResult<OutstandingSummary> {
        let aggregation = self
            .db
            .aggregate(Filter::<RentInvoice>::all().and(|i| !i.is_paid), |i| {
                i.amount + i.late_fee_applied.unwrap_or(0)
            })
            .await?;
        Ok(OutstandingSummary {
            unpaid_count: aggregation.count,
            amount_due: aggregation.sum,
        })
    }

    async fn find_one(&self, id: Uuid) -> DomainResult<RentInvoice> {
        self.db
            .find_first(Filter::<RentInvoice>::id(id))
            .await?
            .ok_or(DomainError::NotFound(Resource::Invoice))
    }

    async fn views(&self, invoices: Vec<RentInvoice>) -> DomainResult<Vec<InvoiceView>> {
        let agreement_ids: HashSet<Uuid> = invoices.iter().map(|i| i.rental_agreement_id).collect();
        let agreements = by_ids::<RentalAgreement, _>(&self.db, agreement_ids).await?;
        let unit_ids: HashSet<Uuid> = agreements.values().map(|a| a.unit_id).collect();
        let renter_ids: HashSet<Uuid> = agreements.values().map(|a| a.renter_id).collect();
        let units = by_ids::<Unit, _>(&self.db, unit_ids).await?;
        let renters = by_ids::<Renter, _>(&self.db, renter_ids).await?;

        Ok(invoices
            .into_iter()
            .map(|invoice| {
                let rental_agreement = agreements.get(&invoice.rental_agreement_id).cloned();
                let unit = rental_agreement
                    .as_ref()
                    .and_then(|a| units.get(&a.unit_id))
                    .cloned();
                let renter = rental_agreement
                    .as_ref()
                    .and_then(|a| renters.get(&a.renter_id))
                    .cloned();
                InvoiceView { invoice, rental_agreement, unit, renter }
            })
            .collect())
    }
}
