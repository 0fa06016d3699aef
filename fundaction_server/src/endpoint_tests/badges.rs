use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use fundaction_engine::{
    db_types::{Badge, BadgeCategory, BadgeRarity, BadgeRequirement, Money, UserBadge},
    events::EventProducers,
    BadgeApi,
    EarnedBadge,
};

use super::{helpers::get_request, mocks::MockGamificationManager};
use crate::routes::{BadgeCatalogRoute, UserBadgesRoute};

#[actix_web::test]
async fn full_catalog() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/badges", configure).await;
    assert_eq!(status, StatusCode::OK);
    let badges = serde_json::from_str::<Vec<Badge>>(&body).unwrap();
    let ids = badges.iter().map(|b| b.id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, ["first-donation", "generous-giver", "social-butterfly"]);
}

#[actix_web::test]
async fn filtered_catalog() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/badges?category=donation", configure).await;
    assert_eq!(status, StatusCode::OK);
    let badges = serde_json::from_str::<Vec<Badge>>(&body).unwrap();
    assert_eq!(badges.len(), 2);
    assert!(badges.iter().all(|b| b.category == BadgeCategory::Donation));

    let (status, body) = get_request("/badges?category=DONATION&rarity=RARE", configure).await;
    assert_eq!(status, StatusCode::OK);
    let badges = serde_json::from_str::<Vec<Badge>>(&body).unwrap();
    assert_eq!(badges.len(), 1);
    assert_eq!(badges[0].id, "generous-giver");
    assert_eq!(badges[0].requirement, BadgeRequirement::SingleDonation(Money::from_major(1000)));

    let (status, body) = get_request("/badges?rarity=LEGENDARY", configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
}

#[actix_web::test]
async fn invalid_filter() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/badges?rarity=MYTHIC", configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Invalid query parameter. Conversion error: Invalid badge rarity: MYTHIC"}"#);
}

#[actix_web::test]
async fn user_badges() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/users/alice/badges", configure).await;
    assert_eq!(status, StatusCode::OK);
    let badges = serde_json::from_str::<Vec<EarnedBadge>>(&body).unwrap();
    assert_eq!(badges.len(), 2);
    assert_eq!(badges[0].badge.id, "generous-giver");
    assert_eq!(badges[0].earned_at, Utc.with_ymd_and_hms(2024, 6, 2, 9, 0, 0).unwrap());
    assert_eq!(badges[1].badge.id, "first-donation");
}

#[actix_web::test]
async fn user_without_badges() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/users/nobody/badges", configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
}

fn configure(cfg: &mut ServiceConfig) {
    let mut db = MockGamificationManager::new();
    db.expect_fetch_badge_catalog().returning(|| Ok(catalog()));
    db.expect_fetch_user_badges().returning(|user_id| {
        let badges = match user_id {
            "alice" => vec![
                UserBadge {
                    user_id: "alice".into(),
                    badge_id: "generous-giver".into(),
                    earned_at: Utc.with_ymd_and_hms(2024, 6, 2, 9, 0, 0).unwrap(),
                },
                UserBadge {
                    user_id: "alice".into(),
                    badge_id: "first-donation".into(),
                    earned_at: Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
                },
            ],
            _ => vec![],
        };
        Ok(badges)
    });
    let api = BadgeApi::new(db, EventProducers::default());
    cfg.service(BadgeCatalogRoute::<MockGamificationManager>::new())
        .service(UserBadgesRoute::<MockGamificationManager>::new())
        .app_data(web::Data::new(api));
}

fn catalog() -> Vec<Badge> {
    vec![
        Badge {
            id: "first-donation".into(),
            name: "First Donation".into(),
            description: "Made your first donation".into(),
            icon: Some("🎁".into()),
            category: BadgeCategory::Donation,
            rarity: BadgeRarity::Common,
            points_reward: 10,
            requirement: BadgeRequirement::DonationCount(1),
        },
        Badge {
            id: "generous-giver".into(),
            name: "Generous Giver".into(),
            description: "Donated RM 1000 or more in a single donation".into(),
            icon: Some("💎".into()),
            category: BadgeCategory::Donation,
            rarity: BadgeRarity::Rare,
            points_reward: 50,
            requirement: BadgeRequirement::SingleDonation(Money::from_major(1000)),
        },
        Badge {
            id: "social-butterfly".into(),
            name: "Social Butterfly".into(),
            description: "Shared campaigns 10 times".into(),
            icon: Some("🦋".into()),
            category: BadgeCategory::SocialSharing,
            rarity: BadgeRarity::Common,
            points_reward: 15,
            requirement: BadgeRequirement::ShareCount(10),
        },
    ]
}
