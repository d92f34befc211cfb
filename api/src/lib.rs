//! RentFlow API
//!
//! REST API for multi-tenant rental management.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                               RENTFLOW API                              │
//! │                                                                         │
//! │  public:    /health  /api-docs/openapi.json  /auth/*  /mpesa/callback   │
//! │                                                                         │
//! │  protected: require_auth ─► tenant_context ─► role guard ─► handler     │
//! │             /properties /units /renters /rental-agreements              │
//! │             /rent-invoices /mpesa/stk-push /auth/me                     │
//! │                                                                         │
//! │  ┌──────────────┐   ┌──────────────┐   ┌─────────────────────────────┐  │
//! │  │ rentflow-core│   │ MemoryStore  │   │ rentflow-mpesa              │  │
//! │  │ services     │──►│ (scoped)     │◄──│ Daraja + reconciliation     │  │
//! │  └──────────────┘   └──────────────┘   └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;

use std::sync::Arc;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::{Json, Router};
use rentflow_core::{
    AgreementService, InvoiceService, MemoryStore, PropertyService, RenterService, TenantScoped,
    UnitService,
};
use rentflow_mpesa::{MpesaService, PaymentGateway, ReconciliationQueue};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

pub use config::AppConfig;
pub use error::ApiError;
pub use models::*;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Unscoped handle, for identity and health only
    pub store: Arc<MemoryStore>,
    pub auth: auth::AuthService,
    pub properties: PropertyService,
    pub units: UnitService,
    pub renters: RenterService,
    pub agreements: AgreementService,
    pub invoices: InvoiceService,
    pub mpesa: MpesaService,
    pub reconciliation: ReconciliationQueue,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<MemoryStore>,
        gateway: Arc<dyn PaymentGateway>,
        reconciliation: ReconciliationQueue,
    ) -> Self {
        let scoped = TenantScoped::new(store.clone());
        let keys = Arc::new(auth::JwtKeys::new(&config.jwt));
        Self {
            auth: auth::AuthService::new(store.clone(), keys),
            properties: PropertyService::new(scoped.clone()),
            units: UnitService::new(scoped.clone()),
            renters: RenterService::new(scoped.clone()),
            agreements: AgreementService::new(scoped.clone()),
            invoices: InvoiceService::new(scoped.clone()),
            mpesa: MpesaService::new(scoped, gateway, config.mpesa.clone()),
            reconciliation,
            store,
            config: Arc::new(config),
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "RentFlow API",
        version = "1.0.0",
        description = "Multi-tenant rental management with M-Pesa payments",
        license(name = "Apache-2.0")
    ),
    paths(
        routes::health::health_check,
        routes::auth::register,
        routes::auth::login,
        routes::auth::refresh,
        routes::auth::logout,
        routes::auth::me,
        routes::properties::create_property,
        routes::properties::list_properties,
        routes::properties::get_property,
        routes::properties::update_property,
        routes::properties::delete_property,
        routes::units::create_unit,
        routes::units::list_units_by_property,
        routes::units::occupancy_summary,
        routes::units::get_unit,
        routes::units::update_unit,
        routes::units::delete_unit,
        routes::renters::create_renter,
        routes::renters::list_renters,
        routes::renters::get_renter,
        routes::renters::update_renter,
        routes::renters::delete_renter,
        routes::agreements::create_agreement,
        routes::agreements::list_agreements,
        routes::agreements::get_agreement,
        routes::agreements::terminate_agreement,
        routes::invoices::create_invoice,
        routes::invoices::list_invoices,
        routes::invoices::outstanding_summary,
        routes::invoices::get_invoice,
        routes::invoices::update_invoice,
        routes::mpesa::stk_push,
        routes::mpesa::callback,
    ),
    components(
        schemas(
            ErrorResponse, UserProfile, AuthPayload, Deleted,
            routes::health::HealthResponse,
            middleware::AuthUser,
            auth::RegisterRequest, auth::LoginRequest,
            rentflow_core::UserRole,
            rentflow_core::Property, rentflow_core::Unit, rentflow_core::UnitStatus,
            rentflow_core::Renter, rentflow_core::RenterStatus,
            rentflow_core::RentalAgreement, rentflow_core::RentInvoice,
            rentflow_core::Payment, rentflow_core::PaymentMethod, rentflow_core::PaymentStatus,
            rentflow_core::services::CreateProperty, rentflow_core::services::UpdateProperty,
            rentflow_core::services::PropertySummary, rentflow_core::services::PropertyDetail,
            rentflow_core::services::CreateUnit, rentflow_core::services::UpdateUnit,
            rentflow_core::services::OccupancySummary,
            rentflow_core::services::CreateRenter, rentflow_core::services::UpdateRenter,
            rentflow_core::services::RenterDetail,
            rentflow_core::services::CreateAgreement,
            rentflow_core::services::AgreementView, rentflow_core::services::AgreementDetail,
            rentflow_core::services::CreateInvoice, rentflow_core::services::UpdateInvoice,
            rentflow_core::services::InvoiceView, rentflow_core::services::InvoiceDetail,
            rentflow_core::services::OutstandingSummary,
            rentflow_mpesa::InitiateStkPush,
            rentflow_mpesa::StkCallbackEnvelope, rentflow_mpesa::callback::StkCallbackBody,
            rentflow_mpesa::StkCallback, rentflow_mpesa::CallbackMetadata,
            rentflow_mpesa::CallbackItem, rentflow_mpesa::CallbackAck,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, login and tokens"),
        (name = "properties", description = "Property management"),
        (name = "units", description = "Unit management"),
        (name = "renters", description = "Renter management"),
        (name = "rental-agreements", description = "Leases and terminations"),
        (name = "rent-invoices", description = "Billing"),
        (name = "mpesa", description = "M-Pesa STK push and callbacks")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the API router
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(routes::auth::protected_router())
        .merge(routes::properties::router())
        .merge(routes::units::router())
        .merge(routes::renters::router())
        .merge(routes::agreements::router())
        .merge(routes::invoices::router())
        .merge(routes::mpesa::router())
        // Layers run bottom-up: auth, then tenant context, then the role guard
        .route_layer(axum::middleware::from_fn(middleware::tenant_context))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .merge(routes::auth::router())
        .merge(routes::mpesa::callback_router())
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.server.cors_origins)),
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    // Credentials let browsers send the refresh cookie
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
}
