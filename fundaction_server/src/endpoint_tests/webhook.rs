use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Utc;
use fundaction_common::Secret;
use fundaction_engine::{
    db_types::PaymentStatus,
    events::EventProducers,
    traits::DonationManagement,
    SettlementApi,
    SqliteDatabase,
};

use super::helpers::{post_request, prepare_database, seed, tear_down};
use crate::{
    config::ServerOptions,
    helpers::sign_payload,
    middleware::SignatureMiddlewareFactory,
    routes::PaymentWebhookRoute,
};

const SECRET: &str = "whsec_endpoint_tests";
const HEADER: &str = "Stripe-Signature";

#[actix_web::test]
async fn signed_webhook_settles_donation() {
    let db = prepare_database().await;
    seed(&db).await;
    let body = event("evt_1", "payment_intent.succeeded", "pi_d1", Some("d1"));
    let (status, res) = deliver(&db, &body, &signed(&body, SECRET)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res, r#"{"received":true,"event_id":"evt_1","result":"completed"}"#);
    let donation = db.fetch_donation("d1").await.unwrap().unwrap();
    assert_eq!(donation.payment_status, PaymentStatus::Completed);
    assert!(donation.propagated_at.is_some());
    tear_down(db).await;
}

#[actix_web::test]
async fn redelivered_webhook_is_acknowledged() {
    let db = prepare_database().await;
    seed(&db).await;
    let body = event("evt_2", "payment_intent.succeeded", "pi_d1", None);
    let header = signed(&body, SECRET);
    let (status, _) = deliver(&db, &body, &header).await;
    assert_eq!(status, StatusCode::OK);
    let (status, res) = deliver(&db, &body, &header).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res, r#"{"received":true,"event_id":"evt_2","result":"duplicate"}"#);
    tear_down(db).await;
}

#[actix_web::test]
async fn failed_payment() {
    let db = prepare_database().await;
    seed(&db).await;
    let body = event("evt_3", "payment_intent.payment_failed", "pi_d1", None);
    let (status, res) = deliver(&db, &body, &signed(&body, SECRET)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res, r#"{"received":true,"event_id":"evt_3","result":"failed"}"#);
    let donation = db.fetch_donation("d1").await.unwrap().unwrap();
    assert_eq!(donation.payment_status, PaymentStatus::Failed);
    tear_down(db).await;
}

#[actix_web::test]
async fn wrong_secret_is_rejected() {
    let db = prepare_database().await;
    seed(&db).await;
    let body = event("evt_4", "payment_intent.succeeded", "pi_d1", None);
    let (status, res) = deliver(&db, &body, &signed(&body, "whsec_someone_else")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(res, r#"{"error":"Webhook signature rejected. No signature matches the payload"}"#);
    let donation = db.fetch_donation("d1").await.unwrap().unwrap();
    assert_eq!(donation.payment_status, PaymentStatus::Pending);
    tear_down(db).await;
}

#[actix_web::test]
async fn tampered_body_is_rejected() {
    let db = prepare_database().await;
    seed(&db).await;
    let body = event("evt_5", "payment_intent.payment_failed", "pi_d1", None);
    let header = signed(&body, SECRET);
    let tampered = body.replace("payment_failed", "succeeded");
    let (status, _) = deliver(&db, &tampered, &header).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    tear_down(db).await;
}

#[actix_web::test]
async fn missing_and_stale_signatures_are_rejected() {
    let db = prepare_database().await;
    seed(&db).await;
    let body = event("evt_6", "payment_intent.succeeded", "pi_d1", None);
    let (status, res) = post_request("/webhooks/payments", &body, &[], configure(&db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(res, r#"{"error":"Webhook signature rejected. No signature header was provided"}"#);
    let stale = sign_payload(body.as_bytes(), SECRET, Utc::now().timestamp() - 3600);
    let (status, _) = deliver(&db, &body, &stale).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, res) = deliver(&db, &body, "t=-9223372036854775808,v1=00").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        res,
        r#"{"error":"Webhook signature rejected. The signature header is malformed. Timestamp -9223372036854775808 is out of range"}"#
    );
    let donation = db.fetch_donation("d1").await.unwrap().unwrap();
    assert_eq!(donation.payment_status, PaymentStatus::Pending);
    tear_down(db).await;
}

#[actix_web::test]
async fn unknown_event_types_are_ignored() {
    let db = prepare_database().await;
    seed(&db).await;
    let body = event("evt_7", "charge.refunded", "pi_d1", None);
    let (status, res) = deliver(&db, &body, &signed(&body, SECRET)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res, r#"{"received":true,"event_id":"evt_7","result":"ignored"}"#);
    tear_down(db).await;
}

#[actix_web::test]
async fn unknown_payments_are_acknowledged() {
    let db = prepare_database().await;
    seed(&db).await;
    let body = event("evt_8", "payment_intent.succeeded", "pi_nobody", Some("d404"));
    let (status, res) = deliver(&db, &body, &signed(&body, SECRET)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res, r#"{"received":true,"event_id":"evt_8","result":"unresolved"}"#);
    tear_down(db).await;
}

#[actix_web::test]
async fn malformed_payload_is_a_bad_request() {
    let db = prepare_database().await;
    seed(&db).await;
    let body = r#"{"id": "evt_9", "data": {}}"#;
    let (status, _) = deliver(&db, body, &signed(body, SECRET)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    tear_down(db).await;
}

async fn deliver(db: &SqliteDatabase, body: &str, signature: &str) -> (StatusCode, String) {
    post_request("/webhooks/payments", body, &[(HEADER, signature)], configure(db)).await
}

fn signed(body: &str, secret: &str) -> String {
    sign_payload(body.as_bytes(), secret, Utc::now().timestamp())
}

fn event(id: &str, event_type: &str, payment_ref: &str, donation_id: Option<&str>) -> String {
    let metadata = match donation_id {
        Some(d) => serde_json::json!({ "donationId": d, "campaignId": "c1" }),
        None => serde_json::json!({}),
    };
    serde_json::json!({
        "id": id,
        "object": "event",
        "type": event_type,
        "data": { "object": { "id": payment_ref, "object": "payment_intent", "metadata": metadata } }
    })
    .to_string()
}

fn configure(db: &SqliteDatabase) -> impl FnOnce(&mut ServiceConfig) {
    let api = SettlementApi::new(db.clone(), EventProducers::default());
    move |cfg: &mut ServiceConfig| {
        let signatures = SignatureMiddlewareFactory::new(HEADER, Secret::new(SECRET.to_string()), 300, true);
        cfg.app_data(web::Data::new(api))
            .app_data(web::Data::new(ServerOptions::default()))
            .service(web::scope("/webhooks").service(PaymentWebhookRoute::<SqliteDatabase>::new()).wrap(signatures));
    }
}
