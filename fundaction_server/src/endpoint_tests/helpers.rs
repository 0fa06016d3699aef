use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use fundaction_engine::{
    db_types::{Money, NewCampaign, NewDonation},
    test_utils::prepare_env::{drop_database, prepare_test_env, random_db_path},
    traits::DonationManagement,
    SqliteDatabase,
};
use log::debug;

pub async fn get_request<F>(path: &str, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let req = TestRequest::get().uri(path).to_request();
    call(req, configure).await
}

pub async fn post_request<F>(path: &str, body: &str, headers: &[(&str, &str)], configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let mut req = TestRequest::post()
        .uri(path)
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.to_string());
    for (name, value) in headers {
        req = req.insert_header((*name, *value));
    }
    call(req.to_request(), configure).await
}

/// Errors raised by middleware never reach a handler, so they are rendered here the way the server would render them.
async fn call<F>(req: actix_http::Request, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req).await {
        Ok(res) => {
            let (_, res) = res.into_parts();
            let status = res.status();
            let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
            (status, body)
        },
        Err(e) => {
            let res = e.as_response_error().error_response();
            let status = res.status();
            let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
            (status, body)
        },
    }
}

pub async fn prepare_database() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

pub async fn tear_down(db: SqliteDatabase) {
    db.close().await;
    drop_database(db.url()).await;
}

/// Users `alice` and `bob`, and campaign `c1` created by `bob` with a RM 10,000 goal. `alice` has a pending RM 100
/// donation `d1` on payment `pi_d1`.
pub async fn seed(db: &SqliteDatabase) {
    db.insert_user("alice", "Alice", None).await.expect("Error inserting user");
    db.insert_user("bob", "Bob", None).await.expect("Error inserting user");
    let campaign = NewCampaign::new("c1", "bob", Money::from_major(10_000));
    db.insert_campaign(campaign).await.expect("Error inserting campaign");
    let donation = NewDonation::new("d1", "c1", Money::from_major(100)).with_donor("alice").with_payment_ref("pi_d1");
    db.insert_donation(donation).await.expect("Error inserting donation");
}
