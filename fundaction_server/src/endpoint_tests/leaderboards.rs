use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{Duration, TimeZone, Utc};
use fundaction_engine::{
    db_types::{
        DonorEntry,
        FundraiserStanding,
        LeaderboardEntries,
        LeaderboardPeriod,
        LeaderboardSnapshot,
        LeaderboardType,
        Money,
        Upserted,
    },
    traits::StoreError,
    LeaderboardApi,
};
use mockall::predicate::eq;

use super::{helpers::get_request, mocks::MockLeaderboardManager};
use crate::routes::LeaderboardRoute;

#[actix_web::test]
async fn fresh_snapshot_is_served_from_cache() {
    let _ = env_logger::try_init().ok();
    let configure = |cfg: &mut ServiceConfig| {
        let mut db = MockLeaderboardManager::new();
        db.expect_fetch_snapshot()
            .with(eq(LeaderboardType::TopDonors), eq(LeaderboardPeriod::Weekly))
            .times(1)
            .returning(|_, _| Ok(Some(donor_snapshot(Utc::now()))));
        db.expect_rank_donors().never();
        db.expect_upsert_snapshot().never();
        add_api(cfg, db);
    };
    let (status, body) = get_request("/leaderboards?type=TOP_DONORS&period=WEEKLY", configure).await;
    assert_eq!(status, StatusCode::OK);
    let snapshot = serde_json::from_str::<LeaderboardSnapshot>(&body).unwrap();
    assert_eq!(snapshot.kind, LeaderboardType::TopDonors);
    match snapshot.data {
        LeaderboardEntries::TopDonors(entries) => {
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].user_id, "carol");
            assert_eq!(entries[0].amount, Money::from_major(400));
        },
        other => panic!("Unexpected leaderboard data: {other:?}"),
    }
}

#[actix_web::test]
async fn defaults_to_all_time_fundraisers() {
    let _ = env_logger::try_init().ok();
    let configure = |cfg: &mut ServiceConfig| {
        let mut db = MockLeaderboardManager::new();
        db.expect_fetch_snapshot()
            .with(eq(LeaderboardType::TopFundraisers), eq(LeaderboardPeriod::AllTime))
            .returning(|_, _| Ok(None));
        db.expect_rank_fundraisers().withf(|since, limit| since.is_none() && *limit == 100).returning(|_, _| {
            Ok(vec![FundraiserStanding {
                user_id: "bob".into(),
                name: "Bob".into(),
                avatar: None,
                amount: Money::from_major(700),
                campaigns: 2,
                donations: 4,
            }])
        });
        db.expect_upsert_snapshot().times(1).returning(|period, entries, computed_at| {
            Ok(Upserted::Created(LeaderboardSnapshot {
                kind: entries.kind(),
                period,
                data: entries.clone(),
                last_computed: computed_at,
                created_at: computed_at,
            }))
        });
        add_api(cfg, db);
    };
    let (status, body) = get_request("/leaderboards", configure).await;
    assert_eq!(status, StatusCode::OK);
    let snapshot = serde_json::from_str::<LeaderboardSnapshot>(&body).unwrap();
    assert_eq!(snapshot.kind, LeaderboardType::TopFundraisers);
    assert_eq!(snapshot.period, LeaderboardPeriod::AllTime);
    match snapshot.data {
        LeaderboardEntries::TopFundraisers(entries) => {
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].rank, 1);
            assert_eq!(entries[0].user_id, "bob");
            assert_eq!(entries[0].donations, 4);
        },
        other => panic!("Unexpected leaderboard data: {other:?}"),
    }
}

#[actix_web::test]
async fn stale_snapshot_is_served_when_refresh_fails() {
    let _ = env_logger::try_init().ok();
    let computed = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let configure = move |cfg: &mut ServiceConfig| {
        let mut db = MockLeaderboardManager::new();
        db.expect_fetch_snapshot().returning(move |_, _| Ok(Some(donor_snapshot(computed))));
        db.expect_rank_donors().returning(|_, _| Err(StoreError::DatabaseError("database is locked".into())));
        db.expect_upsert_snapshot().never();
        add_api(cfg, db);
    };
    let (status, body) = get_request("/leaderboards?type=top_donors&period=weekly", configure).await;
    assert_eq!(status, StatusCode::OK);
    let snapshot = serde_json::from_str::<LeaderboardSnapshot>(&body).unwrap();
    assert_eq!(snapshot.last_computed, computed);
}

#[actix_web::test]
async fn nothing_to_serve() {
    let _ = env_logger::try_init().ok();
    let configure = |cfg: &mut ServiceConfig| {
        let mut db = MockLeaderboardManager::new();
        db.expect_fetch_snapshot().returning(|_, _| Ok(None));
        db.expect_rank_teams().returning(|_, _| Err(StoreError::DatabaseError("database is locked".into())));
        add_api(cfg, db);
    };
    let (status, _) = get_request("/leaderboards?type=TOP_TEAMS", configure).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn invalid_query_parameters() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/leaderboards?type=TOP_SHARERS", no_calls).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Invalid query parameter. Conversion error: Unknown leaderboard type: TOP_SHARERS"}"#);
    let (status, body) = get_request("/leaderboards?period=YEARLY", no_calls).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Invalid query parameter. Conversion error: Unknown leaderboard period: YEARLY"}"#);
}

fn no_calls(cfg: &mut ServiceConfig) {
    add_api(cfg, MockLeaderboardManager::new());
}

fn add_api(cfg: &mut ServiceConfig, db: MockLeaderboardManager) {
    let api = LeaderboardApi::new(db).with_staleness(Duration::minutes(5));
    cfg.service(LeaderboardRoute::<MockLeaderboardManager>::new()).app_data(web::Data::new(api));
}

fn donor_snapshot(computed: chrono::DateTime<Utc>) -> LeaderboardSnapshot {
    LeaderboardSnapshot {
        kind: LeaderboardType::TopDonors,
        period: LeaderboardPeriod::Weekly,
        data: LeaderboardEntries::TopDonors(vec![DonorEntry {
            rank: 1,
            user_id: "carol".into(),
            name: "Carol".into(),
            avatar: None,
            amount: Money::from_major(400),
            donation_count: 3,
        }]),
        last_computed: computed,
        created_at: computed,
    }
}
