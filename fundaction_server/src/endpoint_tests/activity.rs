use actix_web::{http::StatusCode, web, web::ServiceConfig};
use fundaction_engine::{events::EventProducers, traits::GamificationStore, GamificationApi, SqliteDatabase};

use super::helpers::{post_request, prepare_database, seed, tear_down};
use crate::{
    data_objects::ActivityResponse,
    routes::{CampaignCreatedRoute, TrackShareRoute},
};

#[actix_web::test]
async fn share_awards_points() {
    let db = prepare_database().await;
    seed(&db).await;
    let body = r#"{"user_id": "alice", "platform": "instagram"}"#;
    let (status, res) = post_request("/shares", body, &[], configure(&db)).await;
    assert_eq!(status, StatusCode::OK);
    let res = serde_json::from_str::<ActivityResponse>(&res).unwrap();
    assert!(res.success);
    assert_eq!(res.reward.user_id, "alice");
    assert_eq!(res.reward.points_awarded, 3);
    assert_eq!(res.reward.total_points, 3);
    assert_eq!(res.reward.level, 1);
    assert!(res.reward.badges_awarded.is_empty());
    tear_down(db).await;
}

#[actix_web::test]
async fn share_by_unknown_user() {
    let db = prepare_database().await;
    seed(&db).await;
    let body = r#"{"user_id": "mallory", "platform": "email"}"#;
    let (status, _) = post_request("/shares", body, &[], configure(&db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    tear_down(db).await;
}

#[actix_web::test]
async fn first_campaign_earns_a_badge() {
    let db = prepare_database().await;
    seed(&db).await;
    let body = r#"{"campaign_id": "c1"}"#;
    let (status, res) = post_request("/campaigns/created", body, &[], configure(&db)).await;
    assert_eq!(status, StatusCode::OK);
    let res = serde_json::from_str::<ActivityResponse>(&res).unwrap();
    assert_eq!(res.reward.user_id, "bob");
    assert_eq!(res.reward.points_awarded, 5);
    assert_eq!(res.reward.badges_awarded, vec!["campaign-creator".to_string()]);
    let bob = db.fetch_user("bob").await.unwrap().unwrap();
    assert_eq!(bob.total_points, 25);
    tear_down(db).await;
}

#[actix_web::test]
async fn unknown_campaign() {
    let db = prepare_database().await;
    seed(&db).await;
    let (status, body) = post_request("/campaigns/created", r#"{"campaign_id": "c404"}"#, &[], configure(&db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("c404"));
    tear_down(db).await;
}

fn configure(db: &SqliteDatabase) -> impl FnOnce(&mut ServiceConfig) {
    let api = GamificationApi::new(db.clone(), EventProducers::default());
    move |cfg: &mut ServiceConfig| {
        cfg.service(TrackShareRoute::<SqliteDatabase>::new())
            .service(CampaignCreatedRoute::<SqliteDatabase>::new())
            .app_data(web::Data::new(api));
    }
}
