//! End-to-end tests of the HTTP surface over the in-memory store.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use tower::ServiceExt;

use bursar_api::{AppState, create_router};
use bursar_core::audit::AuditLog;
use bursar_core::fees::FeeCatalogService;
use bursar_core::ledger::LedgerService;
use bursar_core::store::{InMemoryStore, Student};
use bursar_core::tenant::{JwtIdentityProvider, TenantContextResolver};
use bursar_shared::types::{ActorId, ClassroomId, StudentId, TenantId};
use bursar_shared::{JwtService, JwtSettings};

struct TestApp {
    router: Router,
    jwt: JwtService,
    store: Arc<InMemoryStore>,
}

impl TestApp {
    fn new() -> Self {
        let jwt = JwtService::new(JwtSettings {
            secret: "api-test-secret".to_string(),
            access_token_expires_minutes: 15,
        });
        let store = Arc::new(InMemoryStore::new());
        let audit = AuditLog::new(store.clone());
        let state = AppState {
            resolver: TenantContextResolver::new(Arc::new(JwtIdentityProvider::new(jwt.clone()))),
            fees: FeeCatalogService::new(store.clone(), store.clone(), audit.clone()),
            ledger: LedgerService::new(store.clone(), store.clone(), store.clone(), audit.clone()),
            audit,
        };
        Self {
            router: create_router(state),
            jwt,
            store,
        }
    }

    fn token(&self, tenant_id: TenantId, role: &str) -> String {
        self.jwt
            .generate_access_token(ActorId::new(), tenant_id, role)
            .unwrap()
    }

    async fn enroll(&self, tenant_id: TenantId, classroom_id: ClassroomId) -> StudentId {
        let id = StudentId::new();
        self.store
            .add_student(Student {
                id,
                tenant_id,
                classroom_id: Some(classroom_id),
                grade: Some("5".to_string()),
                level: Some("primary".to_string()),
            })
            .await;
        id
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        other => other.to_string().parse().unwrap(),
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_missing_or_bad_token_is_unauthorized() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/api/v1/fees", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");

    let (status, _) = app
        .send(Method::GET, "/api/v1/fees", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_term_one_scenario() {
    let app = TestApp::new();
    let tenant = TenantId::new();
    let classroom = ClassroomId::new();
    let first = app.enroll(tenant, classroom).await;
    app.enroll(tenant, classroom).await;
    let token = app.token(tenant, "secretary");

    let (status, fee) = app
        .send(
            Method::POST,
            "/api/v1/fees",
            Some(&token),
            Some(json!({
                "name": "Term 1 Tuition",
                "amount": "1500",
                "category": "tuition",
                "applicability": { "classroom_id": classroom }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/ledger/cohort-assignments",
            Some(&token),
            Some(json!({ "fee_catalog_id": fee["id"], "classroom_id": classroom })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["created"], 2);

    let balance_uri = format!("/api/v1/ledger/students/{first}/balance");
    let (status, balance) = app.send(Method::GET, &balance_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&balance["balance"]), dec!(1500));

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/ledger/transactions",
            Some(&token),
            Some(json!({
                "student_id": first,
                "type": "payment",
                "amount": "1500",
                "status": "completed",
                "description": "Term 1 payment"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, balance) = app.send(Method::GET, &balance_uri, Some(&token), None).await;
    assert_eq!(decimal(&balance["balance"]), dec!(0));

    let (status, audit) = app
        .send(Method::GET, "/api/v1/audit?action_type=assign_fee", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(audit["entries"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_parent_cannot_create_fees() {
    let app = TestApp::new();
    let token = app.token(TenantId::new(), "parent");
    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/fees",
            Some(&token),
            Some(json!({
                "name": "Bus",
                "amount": "40",
                "category": "bus",
                "applicability": { "level": "primary" }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");
}

#[tokio::test]
async fn test_foreign_fee_looks_missing() {
    let app = TestApp::new();
    let owner = app.token(TenantId::new(), "secretary");
    let other = app.token(TenantId::new(), "secretary");

    let (_, fee) = app
        .send(
            Method::POST,
            "/api/v1/fees",
            Some(&owner),
            Some(json!({
                "name": "Library",
                "amount": "25",
                "category": "other",
                "applicability": { "level": "secondary" }
            })),
        )
        .await;
    let uri = format!("/api/v1/fees/{}", fee["id"].as_str().unwrap());

    let (status, foreign) = app.send(Method::GET, &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let missing_uri = format!("/api/v1/fees/{}", uuid::Uuid::now_v7());
    let (status, missing) = app.send(Method::GET, &missing_uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(foreign, missing);

    let (status, _) = app.send(Method::DELETE, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_referenced_fee_delete_conflicts() {
    let app = TestApp::new();
    let tenant = TenantId::new();
    let classroom = ClassroomId::new();
    app.enroll(tenant, classroom).await;
    let token = app.token(tenant, "teacher");

    let (_, fee) = app
        .send(
            Method::POST,
            "/api/v1/fees",
            Some(&token),
            Some(json!({
                "name": "Lab",
                "amount": "60",
                "category": "activity",
                "applicability": { "level": "primary" }
            })),
        )
        .await;
    app.send(
        Method::POST,
        "/api/v1/ledger/cohort-assignments",
        Some(&token),
        Some(json!({ "fee_catalog_id": fee["id"], "grade": "5", "level": "primary" })),
    )
    .await;

    let uri = format!("/api/v1/fees/{}", fee["id"].as_str().unwrap());
    let (status, body) = app.send(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");
}

#[tokio::test]
async fn test_bad_cohort_and_bad_body_are_validation_errors() {
    let app = TestApp::new();
    let token = app.token(TenantId::new(), "secretary");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/ledger/cohort-assignments",
            Some(&token),
            Some(json!({ "fee_catalog_id": uuid::Uuid::now_v7(), "grade": "5" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/ledger/transactions",
            Some(&token),
            Some(json!({ "type": "payment" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_status_change_through_api() {
    let app = TestApp::new();
    let tenant = TenantId::new();
    let student = app.enroll(tenant, ClassroomId::new()).await;
    let token = app.token(tenant, "secretary");

    let (_, record) = app
        .send(
            Method::POST,
            "/api/v1/ledger/transactions",
            Some(&token),
            Some(json!({
                "student_id": student,
                "type": "fee",
                "amount": "300",
                "status": "pending",
                "description": "Uniform"
            })),
        )
        .await;
    let uri = format!(
        "/api/v1/ledger/transactions/{}/status",
        record["id"].as_str().unwrap()
    );

    let (status, updated) = app
        .send(Method::PATCH, &uri, Some(&token), Some(json!({ "status": "cancelled" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "cancelled");

    let (status, _) = app
        .send(Method::PATCH, &uri, Some(&token), Some(json!({ "status": "pending" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, listed) = app
        .send(
            Method::GET,
            &format!("/api/v1/ledger/transactions?student_id={student}&status=cancelled"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(listed["transactions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_only_admin_reads_another_tenants_ledger() {
    let app = TestApp::new();
    let school = TenantId::new();
    let student = app.enroll(school, ClassroomId::new()).await;
    let staff = app.token(school, "secretary");
    app.send(
        Method::POST,
        "/api/v1/ledger/transactions",
        Some(&staff),
        Some(json!({
            "student_id": student,
            "type": "fee",
            "amount": "80",
            "status": "pending",
            "description": "Books"
        })),
    )
    .await;

    let uri = format!("/api/v1/ledger/transactions?tenant_id={school}");
    let outsider = app.token(TenantId::new(), "secretary");
    let (status, _) = app.send(Method::GET, &uri, Some(&outsider), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = app.token(TenantId::new(), "admin");
    let (status, body) = app.send(Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transactions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_only_admin_reads_another_tenants_balance() {
    let app = TestApp::new();
    let school = TenantId::new();
    let student = app.enroll(school, ClassroomId::new()).await;
    let staff = app.token(school, "secretary");
    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/ledger/transactions",
            Some(&staff),
            Some(json!({
                "student_id": student,
                "type": "fee",
                "amount": "80",
                "status": "completed",
                "description": "Books"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/v1/ledger/students/{student}/balance?tenant_id={school}");
    let outsider = app.token(TenantId::new(), "secretary");
    let (status, _) = app.send(Method::GET, &uri, Some(&outsider), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = app.token(TenantId::new(), "admin");
    let (status, body) = app.send(Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["balance"]), dec!(80));

    let own_tenant_uri = format!("/api/v1/ledger/students/{student}/balance");
    let (status, _) = app.send(Method::GET, &own_tenant_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
