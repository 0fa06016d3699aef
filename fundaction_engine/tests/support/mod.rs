#![allow(dead_code)]
use fundaction_engine::{
    db_types::{Donation, Money, NewCampaign, NewDonation},
    test_utils::prepare_env::{drop_database, prepare_test_env, random_db_path},
    traits::DonationManagement,
    SqliteDatabase,
};
use log::*;

pub async fn setup() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

pub async fn tear_down(db: SqliteDatabase) {
    db.close().await;
    drop_database(db.url()).await;
    debug!("🚀️ Removed test database {}", db.url());
}

/// Users `alice`, `bob` and `carol`, team `t1`, and two campaigns created by `bob`: `c1` for team `t1` and `c2` with
/// no team.
pub async fn seed_world(db: &SqliteDatabase) {
    for (id, name) in [("alice", "Alice"), ("bob", "Bob"), ("carol", "Carol")] {
        db.insert_user(id, name, None).await.expect("Error inserting user");
    }
    db.insert_team("t1", "Johor Jumpers", "johor-jumpers", 5).await.expect("Error inserting team");
    let c1 = NewCampaign::new("c1", "bob", Money::from_major(50_000)).with_team("t1");
    db.insert_campaign(c1).await.expect("Error inserting campaign");
    let c2 = NewCampaign::new("c2", "bob", Money::from_major(10_000));
    db.insert_campaign(c2).await.expect("Error inserting campaign");
}

pub async fn pending_donation(db: &SqliteDatabase, id: &str, campaign: &str, donor: &str, amount: i64) -> Donation {
    let donation =
        NewDonation::new(id, campaign, Money::from_major(amount)).with_donor(donor).with_payment_ref(format!("pi_{id}"));
    db.insert_donation(donation).await.expect("Error inserting donation")
}
