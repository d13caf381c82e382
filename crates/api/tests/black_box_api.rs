use chrono::{Duration as ChronoDuration, Utc};
use clinicore_auth::{Claims, PrincipalId, Role};
use clinicore_core::ProviderId;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(jwt_secret: &str) -> Self {
        // Same router as prod, in-memory backend, ephemeral port.
        let app = clinicore_api::app::build_app(jwt_secret.to_string())
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(jwt_secret: &str, provider_id: ProviderId, roles: Vec<Role>) -> String {
    let now = Utc::now();
    let claims = Claims {
        sub: PrincipalId::new(),
        provider_id,
        roles,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn create_patient(
    client: &reqwest::Client,
    base_url: &str,
    token: &str,
    name: &str,
) -> serde_json::Value {
    let res = client
        .post(format!("{}/patients", base_url))
        .bearer_auth(token)
        .json(&json!({ "name": name }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;

    let client = reqwest::Client::new();
    let res = client
        .get(format!("{}/whoami", srv.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn provider_context_is_derived_from_token() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;

    let provider_id = ProviderId::new();
    let token = mint_jwt(jwt_secret, provider_id, vec![Role::new("doctor")]);

    let client = reqwest::Client::new();
    let res = client
        .get(format!("{}/whoami", srv.base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["provider_id"].as_str().unwrap(), provider_id.to_string());
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "doctor"));
}

#[tokio::test]
async fn patient_registration_requires_name_and_mints_mrn() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, ProviderId::new(), vec![Role::new("doctor")]);
    let client = reqwest::Client::new();

    // Missing name: 400 with an `error` field.
    let res = client
        .post(format!("{}/patients", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["error"].is_string());

    // First patient of the day gets sequence 0001.
    let today = Utc::now().format("%Y%m%d");
    let jane = create_patient(&client, &srv.base_url, &token, "Jane").await;
    assert_eq!(
        jane["mrn"].as_str().unwrap(),
        format!("MRN-{}-0001", today)
    );

    // The next one is exactly one higher.
    let john = create_patient(&client, &srv.base_url, &token, "John").await;
    assert_eq!(
        john["mrn"].as_str().unwrap(),
        format!("MRN-{}-0002", today)
    );
}

#[tokio::test]
async fn row_level_access_distinguishes_forbidden_from_missing() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let owner_token = mint_jwt(jwt_secret, ProviderId::new(), vec![Role::new("doctor")]);
    let stranger_token = mint_jwt(jwt_secret, ProviderId::new(), vec![Role::new("doctor")]);
    let client = reqwest::Client::new();

    let patient = create_patient(&client, &srv.base_url, &owner_token, "Jane").await;
    let id = patient["id"].as_str().unwrap();

    // Owner reads it back.
    let res = client
        .get(format!("{}/patients/{}", srv.base_url, id))
        .bearer_auth(&owner_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Another provider gets 403, not 404: the row exists but is not theirs.
    let res = client
        .get(format!("{}/patients/{}", srv.base_url, id))
        .bearer_auth(&stranger_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // A random id is 404.
    let res = client
        .get(format!(
            "{}/patients/{}",
            srv.base_url,
            uuid::Uuid::now_v7()
        ))
        .bearer_auth(&owner_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Lists are owner-scoped.
    let res = client
        .get(format!("{}/patients", srv.base_url))
        .bearer_auth(&stranger_token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn billing_computes_discount_and_tax_and_tracks_payments() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, ProviderId::new(), vec![Role::new("doctor")]);
    let client = reqwest::Client::new();

    let patient = create_patient(&client, &srv.base_url, &token, "Jane").await;
    let patient_id = patient["id"].as_str().unwrap();

    // 2 x 50.00 + 1 x 30.00 at 10% discount.
    let res = client
        .post(format!("{}/billing", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "patient_id": patient_id,
            "discount_percent": 10,
            "lines": [
                { "description": "Consultation", "quantity": 2, "unit_price_cents": 5000, "item_type": "CONSULTATION" },
                { "description": "Rapid test", "quantity": 1, "unit_price_cents": 3000, "item_type": "LAB_TEST" },
            ],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let bill: serde_json::Value = res.json().await.unwrap();

    let today = Utc::now().format("%Y%m%d");
    assert_eq!(
        bill["number"].as_str().unwrap(),
        format!("BILL-{}-0001", today)
    );
    assert_eq!(bill["subtotal_cents"], 13_000);
    assert_eq!(bill["discount_cents"], 1_300);
    assert_eq!(bill["tax_cents"], 1_755);
    assert_eq!(bill["total_cents"], 13_455);
    assert_eq!(bill["status"], "PENDING");

    let bill_id = bill["id"].as_str().unwrap();

    // Partial payment.
    let res = client
        .post(format!("{}/billing/{}/payments", srv.base_url, bill_id))
        .bearer_auth(&token)
        .json(&json!({ "amount_cents": 5000, "method": "CASH" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bill: serde_json::Value = res.json().await.unwrap();
    assert_eq!(bill["status"], "PARTIAL");
    assert_eq!(bill["paid_amount_cents"], 5_000);
    assert_eq!(bill["outstanding_cents"], 8_455);

    // Overpayment is rejected and changes nothing.
    let res = client
        .post(format!("{}/billing/{}/payments", srv.base_url, bill_id))
        .bearer_auth(&token)
        .json(&json!({ "amount_cents": 10_000, "method": "CARD" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Paying the exact remainder flips to PAID.
    let res = client
        .post(format!("{}/billing/{}/payments", srv.base_url, bill_id))
        .bearer_auth(&token)
        .json(&json!({ "amount_cents": 8_455, "method": "CARD" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bill: serde_json::Value = res.json().await.unwrap();
    assert_eq!(bill["status"], "PAID");
    assert_eq!(bill["outstanding_cents"], 0);

    // A paid bill cannot be cancelled.
    let res = client
        .post(format!("{}/billing/{}/cancel", srv.base_url, bill_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Both payments are on record.
    let res = client
        .get(format!("{}/billing/{}/payments", srv.base_url, bill_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn bill_creation_validates_patient_and_lines() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, ProviderId::new(), vec![Role::new("doctor")]);
    let client = reqwest::Client::new();

    // No patient reference.
    let res = client
        .post(format!("{}/billing", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "lines": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Empty line list.
    let patient = create_patient(&client, &srv.base_url, &token, "Jane").await;
    let res = client
        .post(format!("{}/billing", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "patient_id": patient["id"], "lines": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn appointment_status_transitions_are_enforced() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let token = mint_jwt(jwt_secret, ProviderId::new(), vec![Role::new("doctor")]);
    let client = reqwest::Client::new();

    let patient = create_patient(&client, &srv.base_url, &token, "Jane").await;
    let res = client
        .post(format!("{}/appointments", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "patient_id": patient["id"],
            "scheduled_for": Utc::now().to_rfc3339(),
            "reason": "follow-up",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let appointment: serde_json::Value = res.json().await.unwrap();
    assert_eq!(appointment["status"], "SCHEDULED");
    let id = appointment["id"].as_str().unwrap();

    let patch_status = |status: &'static str| {
        let client = client.clone();
        let url = format!("{}/appointments/{}/status", srv.base_url, id);
        let token = token.clone();
        async move {
            client
                .patch(url)
                .bearer_auth(token)
                .json(&json!({ "status": status }))
                .send()
                .await
                .unwrap()
        }
    };

    // Cannot jump straight to IN_PROGRESS.
    assert_eq!(
        patch_status("IN_PROGRESS").await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );

    assert_eq!(patch_status("WAITING").await.status(), StatusCode::OK);
    assert_eq!(patch_status("IN_PROGRESS").await.status(), StatusCode::OK);
    let res = patch_status("COMPLETED").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "COMPLETED");

    // Terminal.
    assert_eq!(
        patch_status("WAITING").await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );

    // Unknown status strings are a 400, not a transition error.
    assert_eq!(
        patch_status("TELEPORTED").await.status(),
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn dispensing_decrements_stock_and_respects_availability() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let admin = mint_jwt(jwt_secret, ProviderId::new(), vec![Role::new("admin")]);
    let doctor_provider = ProviderId::new();
    let doctor = mint_jwt(jwt_secret, doctor_provider, vec![Role::new("doctor")]);
    let client = reqwest::Client::new();

    // Pharmacy setup (admin; doctors cannot manage the catalog).
    let res = client
        .post(format!("{}/medicines", srv.base_url))
        .bearer_auth(&doctor)
        .json(&json!({ "name": "Amoxicillin 500mg", "unit_price_cents": 250 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(format!("{}/medicines", srv.base_url))
        .bearer_auth(&admin)
        .json(&json!({
            "name": "Amoxicillin 500mg",
            "generic_name": "amoxicillin",
            "form": "capsule",
            "unit_price_cents": 250,
            "reorder_level": 10,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let medicine: serde_json::Value = res.json().await.unwrap();
    let medicine_id = medicine["id"].as_str().unwrap();
    assert_eq!(medicine["stock_on_hand"], 0);

    let res = client
        .post(format!("{}/medicine-batches", srv.base_url))
        .bearer_auth(&admin)
        .json(&json!({
            "medicine_id": medicine_id,
            "batch_number": "LOT-7",
            "quantity": 30,
            "expiry_date": "2027-01-01",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    // Doctor orders for their patient.
    let patient = create_patient(&client, &srv.base_url, &doctor, "Jane").await;
    let res = client
        .post(format!("{}/prescriptions", srv.base_url))
        .bearer_auth(&doctor)
        .json(&json!({
            "patient_id": patient["id"],
            "medicine_id": medicine_id,
            "quantity": 21,
            "dosage": "1 capsule three times daily",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let rx: serde_json::Value = res.json().await.unwrap();
    let rx_id = rx["id"].as_str().unwrap();
    assert_eq!(rx["status"], "ORDERED");

    // Doctors cannot dispense; admin (standing in for pharmacy staff) can.
    let res = client
        .post(format!("{}/prescriptions/{}/dispense", srv.base_url, rx_id))
        .bearer_auth(&doctor)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(format!("{}/prescriptions/{}/dispense", srv.base_url, rx_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let rx: serde_json::Value = res.json().await.unwrap();
    assert_eq!(rx["status"], "DISPENSED");

    let res = client
        .get(format!("{}/medicines/{}", srv.base_url, medicine_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let medicine: serde_json::Value = res.json().await.unwrap();
    assert_eq!(medicine["stock_on_hand"], 9);
    assert_eq!(medicine["below_reorder_level"], true);

    // A second order larger than remaining stock fails at dispense time and
    // leaves the stock untouched.
    let res = client
        .post(format!("{}/prescriptions", srv.base_url))
        .bearer_auth(&doctor)
        .json(&json!({
            "patient_id": patient["id"],
            "medicine_id": medicine_id,
            "quantity": 10,
            "dosage": "1 capsule three times daily",
        }))
        .send()
        .await
        .unwrap();
    let rx2: serde_json::Value = res.json().await.unwrap();
    let res = client
        .post(format!(
            "{}/prescriptions/{}/dispense",
            srv.base_url,
            rx2["id"].as_str().unwrap()
        ))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = client
        .get(format!("{}/medicines/{}", srv.base_url, medicine_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let medicine: serde_json::Value = res.json().await.unwrap();
    assert_eq!(medicine["stock_on_hand"], 9);
}

#[tokio::test]
async fn analytics_reflects_todays_activity() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let provider = ProviderId::new();
    let token = mint_jwt(jwt_secret, provider, vec![Role::new("doctor")]);
    let client = reqwest::Client::new();

    let patient = create_patient(&client, &srv.base_url, &token, "Jane").await;

    client
        .post(format!("{}/appointments", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "patient_id": patient["id"],
            "scheduled_for": Utc::now().to_rfc3339(),
        }))
        .send()
        .await
        .unwrap();

    let res = client
        .post(format!("{}/billing", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "patient_id": patient["id"],
            "lines": [
                { "description": "Consultation", "quantity": 1, "unit_price_cents": 5000, "item_type": "CONSULTATION" },
            ],
        }))
        .send()
        .await
        .unwrap();
    let bill: serde_json::Value = res.json().await.unwrap();
    client
        .post(format!(
            "{}/billing/{}/payments",
            srv.base_url,
            bill["id"].as_str().unwrap()
        ))
        .bearer_auth(&token)
        .json(&json!({ "amount_cents": 2000, "method": "CASH" }))
        .send()
        .await
        .unwrap();

    let res = client
        .get(format!("{}/analytics", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let summary: serde_json::Value = res.json().await.unwrap();
    assert_eq!(summary["patients_total"], 1);
    assert_eq!(summary["appointments_today"], 1);
    assert_eq!(summary["pending_bills"], 1);
    assert_eq!(summary["revenue_today_cents"], 2000);
}
