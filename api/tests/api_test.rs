//! HTTP-level behaviour of the RentFlow API

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::{HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use rentflow_api::auth::TokenType;
use rentflow_api::{build_router, AppConfig, AppState};
use rentflow_core::{DataClientExt, Filter, MemoryStore, RentInvoice, User, UserRole};
use rentflow_mpesa::{
    GatewayError, PaymentGateway, Reconciler, ReconciliationQueue, StkPushRequest, StkPushResponse,
};
use serde_json::{json, Value};
use uuid::Uuid;

/// Accepts every push and numbers the checkout ids
#[derive(Default)]
struct FakeGateway {
    pushes: AtomicUsize,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn provider(&self) -> &'static str {
        "fake"
    }

    async fn access_token(&self) -> Result<String, GatewayError> {
        Ok("token".into())
    }

    async fn stk_push(
        &self,
        _token: &str,
        _request: &StkPushRequest,
    ) -> Result<StkPushResponse, GatewayError> {
        let n = self.pushes.fetch_add(1, Ordering::SeqCst);
        Ok(StkPushResponse {
            merchant_request_id: format!("mr-{n}"),
            checkout_request_id: format!("ws_CO_{n}"),
            response_code: "0".into(),
            response_description: "Success. Request accepted for processing".into(),
            customer_message: String::new(),
        })
    }
}

struct Harness {
    server: TestServer,
    state: AppState,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let (queue, _worker) = ReconciliationQueue::spawn(Reconciler::new(store.clone()), 16);
    let mut config = AppConfig::default();
    config.jwt.secret = "api-test-signing-secret-0123456789abcdef".into();
    let state = AppState::new(
        config,
        store,
        Arc::new(FakeGateway::default()),
        queue,
    );
    let server = TestServer::new(build_router(state.clone())).unwrap();
    Harness { server, state }
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

trait Authed {
    fn token(self, token: &str) -> Self;
}

impl Authed for TestRequest {
    fn token(self, token: &str) -> Self {
        self.add_header(AUTHORIZATION, bearer(token))
    }
}

impl Harness {
    /// Register a company and return its owner's access token
    async fn register(&self, company: &str, email: &str) -> String {
        let response = self
            .server
            .post("/auth/register")
            .json(&json!({ "companyName": company, "email": email, "password": "correct-horse" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        let body: Value = response.json();
        body["data"]["accessToken"].as_str().unwrap().to_string()
    }

    /// Property + unit + renter; returns (property, unit, renter) ids
    async fn seed(&self, token: &str) -> (String, String, String) {
        let property: Value = self
            .server
            .post("/properties")
            .token(token)
            .json(&json!({ "name": "Sunset Apts", "address": "Ngong Rd", "type": "Residential" }))
            .await
            .json();
        let property_id = property["data"]["id"].as_str().unwrap().to_string();

        let unit: Value = self
            .server
            .post("/units")
            .token(token)
            .json(&json!({ "propertyId": property_id, "name": "A1", "rentAmount": 15000 }))
            .await
            .json();
        let unit_id = unit["data"]["id"].as_str().unwrap().to_string();

        let renter: Value = self
            .server
            .post("/renters")
            .token(token)
            .json(&json!({
                "firstName": "Wanjiku",
                "lastName": "Kamau",
                "phone": "+254712345678",
                "nationalId": "12345678"
            }))
            .await
            .json();
        let renter_id = renter["data"]["id"].as_str().unwrap().to_string();

        (property_id, unit_id, renter_id)
    }

    fn token_for(&self, tenant_id: Option<Uuid>, role: UserRole) -> String {
        let mut user = User::new(format!("{}@acme.co.ke", Uuid::new_v4()), String::new(), role);
        user.tenant_id = tenant_id;
        self.state.auth.keys().issue(&user, TokenType::Access).unwrap()
    }
}

fn tenant_of(harness: &Harness, token: &str) -> Uuid {
    harness
        .state
        .auth
        .keys()
        .verify(token, TokenType::Access)
        .and_then(|claims| claims.tenant_id)
        .unwrap()
}

fn agreement_body(unit_id: &str, renter_id: &str) -> Value {
    json!({
        "unitId": unit_id,
        "renterId": renter_id,
        "startDate": "2025-01-01",
        "rentAmount": 15000,
        "deposit": 30000
    })
}

#[tokio::test]
async fn test_health_and_openapi() {
    let h = harness();

    let health: Value = h.server.get("/health").await.json();
    assert_eq!(health["status"], "healthy");

    let doc: Value = h.server.get("/api-docs/openapi.json").await.json();
    assert!(doc["paths"]["/rental-agreements/{id}/terminate"].is_object());
    assert!(doc["components"]["securitySchemes"]["bearer"].is_object());
}

#[tokio::test]
async fn test_protected_routes_need_a_valid_access_token() {
    let h = harness();

    let response = h.server.get("/properties").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body, json!({ "success": false, "message": "Authentication required", "code": "UNAUTHORIZED" }));

    let response = h.server.get("/properties").token("not-a-jwt").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_token_without_tenant_is_rejected() {
    let h = harness();
    let token = h.token_for(None, UserRole::SuperAdmin);

    let response = h.server.get("/properties").token(&token).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "MISSING_TENANT_CONTEXT");
}

#[tokio::test]
async fn test_role_guards() {
    let h = harness();
    let owner = h.register("Acme", "owner@acme.co.ke").await;
    let tenant_id = tenant_of(&h, &owner);

    let renter = h.token_for(Some(tenant_id), UserRole::Tenant);
    let response = h.server.get("/properties").token(&renter).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["code"], "INSUFFICIENT_PERMISSIONS");

    let accountant = h.token_for(Some(tenant_id), UserRole::Accountant);
    let response = h.server.get("/rent-invoices").token(&accountant).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let response = h.server.get("/renters").token(&accountant).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_register_login_refresh_logout() {
    let h = harness();
    h.register("Acme", "owner@acme.co.ke").await;

    let response = h
        .server
        .post("/auth/register")
        .json(&json!({ "companyName": "Acme 2", "email": "owner@acme.co.ke", "password": "correct-horse" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["code"], "USER_ALREADY_EXISTS");

    let response = h
        .server
        .post("/auth/login")
        .json(&json!({ "email": "owner@acme.co.ke", "password": "wrong-horse" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "INVALID_CREDENTIALS");

    let response = h
        .server
        .post("/auth/login")
        .json(&json!({ "email": "owner@acme.co.ke", "password": "correct-horse" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let set_cookie = response.header(SET_COOKIE);
    let set_cookie = set_cookie.to_str().unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    let cookie = set_cookie.split(';').next().unwrap().to_string();

    let response = h
        .server
        .post("/auth/refresh")
        .add_header(COOKIE, HeaderValue::from_str(&cookie).unwrap())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let token = response.json::<Value>()["data"]["accessToken"].as_str().unwrap().to_string();

    let me: Value = h.server.get("/auth/me").token(&token).await.json();
    assert_eq!(me["data"]["email"], "owner@acme.co.ke");
    assert_eq!(me["data"]["role"], "LANDLORD");

    let response = h.server.post("/auth/refresh").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = h.server.post("/auth/logout").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.header(SET_COOKIE).to_str().unwrap().contains("Max-Age=0"));
    assert_eq!(response.json::<Value>()["message"], "Logged out successfully");
}

#[tokio::test]
async fn test_validation_errors() {
    let h = harness();
    let token = h.register("Acme", "owner@acme.co.ke").await;

    let response = h
        .server
        .post("/renters")
        .token(&token)
        .json(&json!({ "firstName": "A", "lastName": "B", "phone": "0712345678", "nationalId": "12345678" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["message"].as_str().unwrap().contains("Phone number"));

    let response = h
        .server
        .post("/properties")
        .token(&token)
        .text("{not json")
        .content_type("application/json")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");

    for path in ["/properties/not-a-uuid", "/units/42", "/units/summary?propertyId=nope"] {
        let response = h.server.get(path).token(&token).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{path}");
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn test_tenants_cannot_see_each_other() {
    let h = harness();
    let acme = h.register("Acme", "owner@acme.co.ke").await;
    let globex = h.register("Globex", "owner@globex.co.ke").await;
    let (property_id, unit_id, _) = h.seed(&acme).await;

    let response = h.server.get(&format!("/properties/{property_id}")).token(&globex).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "PROPERTY_NOT_FOUND");

    let response = h
        .server
        .put(&format!("/units/{unit_id}"))
        .token(&globex)
        .json(&json!({ "name": "hijacked" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let list: Value = h.server.get("/properties").token(&globex).await.json();
    assert_eq!(list["data"], json!([]));

    // Same phone is fine in another tenant
    let response = h
        .server
        .post("/renters")
        .token(&globex)
        .json(&json!({ "firstName": "W", "lastName": "K", "phone": "+254712345678", "nationalId": "12345678" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_property_soft_delete() {
    let h = harness();
    let token = h.register("Acme", "owner@acme.co.ke").await;
    let (property_id, _, _) = h.seed(&token).await;

    let response = h.server.delete(&format!("/properties/{property_id}")).token(&token).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["message"], "Property deleted successfully");

    let response = h.server.get(&format!("/properties/{property_id}")).token(&token).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    // Row is still stored
    let tables = h.state.store.snapshot().await;
    assert_eq!(tables.properties.len(), 1);
}

#[tokio::test]
async fn test_agreement_lifecycle() {
    let h = harness();
    let token = h.register("Acme", "owner@acme.co.ke").await;
    let (_, unit_id, renter_id) = h.seed(&token).await;

    let response = h
        .server
        .post("/rental-agreements")
        .token(&token)
        .json(&agreement_body(&unit_id, &renter_id))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["message"], "Rental Agreement created and Unit occupied");
    let agreement_id = body["data"]["id"].as_str().unwrap().to_string();

    let unit: Value = h.server.get(&format!("/units/{unit_id}")).token(&token).await.json();
    assert_eq!(unit["data"]["status"], "OCCUPIED");

    let response = h
        .server
        .post("/rental-agreements")
        .token(&token)
        .json(&agreement_body(&unit_id, &renter_id))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["code"], "UNIT_NOT_VACANT");

    let list: Value = h.server.get("/rental-agreements").token(&token).await.json();
    assert_eq!(list["data"][0]["unit"]["name"], "A1");
    assert_eq!(list["data"][0]["property"]["name"], "Sunset Apts");

    let terminate = format!("/rental-agreements/{agreement_id}/terminate");
    let response = h.server.patch(&terminate).token(&token).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["message"], "Agreement terminated and Unit vacated");

    let unit: Value = h.server.get(&format!("/units/{unit_id}")).token(&token).await.json();
    assert_eq!(unit["data"]["status"], "VACANT");

    let response = h.server.patch(&terminate).token(&token).await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["code"], "AGREEMENT_ALREADY_TERMINATED");
}

#[tokio::test]
async fn test_stk_push_and_callback_pay_the_invoice() {
    let h = harness();
    let token = h.register("Acme", "owner@acme.co.ke").await;
    let (_, unit_id, renter_id) = h.seed(&token).await;

    let agreement: Value = h
        .server
        .post("/rental-agreements")
        .token(&token)
        .json(&agreement_body(&unit_id, &renter_id))
        .await
        .json();
    let agreement_id = agreement["data"]["id"].as_str().unwrap();

    let response = h
        .server
        .post("/rent-invoices")
        .token(&token)
        .json(&json!({ "rentalAgreementId": agreement_id, "amount": 15000, "dueDate": "2025-02-05" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let invoice_id: Uuid = response.json::<Value>()["data"]["id"].as_str().unwrap().parse().unwrap();

    let response = h
        .server
        .post("/mpesa/stk-push")
        .token(&token)
        .json(&json!({ "rentInvoiceId": invoice_id, "phone": "+254712345678", "amount": 15000 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["message"], "STK Push sent to user phone");
    assert_eq!(body["data"]["status"], "PENDING");
    let checkout = body["data"]["checkoutRequestId"].as_str().unwrap().to_string();

    // No token on the callback
    let response = h
        .server
        .post("/mpesa/callback")
        .json(&json!({
            "Body": { "stkCallback": {
                "MerchantRequestID": "mr-0",
                "CheckoutRequestID": checkout,
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": { "Item": [
                    { "Name": "Amount", "Value": 15000 },
                    { "Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV" }
                ]}
            }}
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!({ "ResultCode": 0, "ResultDesc": "Accepted" }));

    // Reconciliation runs on the worker
    let mut paid = false;
    for _ in 0..100 {
        let invoice = h
            .state
            .store
            .find_unique(Filter::<RentInvoice>::id(invoice_id))
            .await
            .unwrap()
            .unwrap();
        if invoice.is_paid {
            paid = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(paid, "invoice was not marked paid");

    let detail: Value = h.server.get(&format!("/rent-invoices/{invoice_id}")).token(&token).await.json();
    assert_eq!(detail["data"]["payments"][0]["status"], "COMPLETED");
    assert_eq!(detail["data"]["payments"][0]["mpesaReceipt"], "NLJ7RT61SV");
}

#[tokio::test]
async fn test_callback_always_accepted() {
    let h = harness();

    for body in [json!({ "unexpected": true }), json!({ "Body": { "stkCallback": {
        "MerchantRequestID": "mr", "CheckoutRequestID": "ws_CO_unknown",
        "ResultCode": 1032, "ResultDesc": "Request cancelled by user"
    }}})] {
        let response = h.server.post("/mpesa/callback").json(&body).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>()["ResultDesc"], "Accepted");
    }
}
