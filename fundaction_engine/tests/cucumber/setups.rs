use cucumber::{given, gherkin::Step};
use fundaction_engine::{
    db_types::{Money, NewCampaign, NewDonation},
    traits::DonationManagement,
};

use crate::cucumber::{FundActionWorld, SettlementSystem};

#[given("a fresh install")]
async fn fresh_database(world: &mut FundActionWorld) {
    let system = SettlementSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "a user {word} named {string}")]
async fn a_user(world: &mut FundActionWorld, id: String, name: String) {
    world.db().insert_user(&id, &name, None).await.expect("Error inserting user");
}

#[given(expr = "a team {word} named {string} with {int} members")]
async fn a_team(world: &mut FundActionWorld, id: String, name: String, members: i64) {
    let slug = name.to_lowercase().replace(' ', "-");
    world.db().insert_team(&id, &name, &slug, members).await.expect("Error inserting team");
}

#[given(expr = "a campaign {word} by {word} with a goal of {int} MYR")]
async fn a_campaign(world: &mut FundActionWorld, id: String, creator: String, goal: i64) {
    let campaign = NewCampaign::new(id, creator, Money::from_major(goal));
    world.db().insert_campaign(campaign).await.expect("Error inserting campaign");
}

#[given(expr = "a campaign {word} by {word} for team {word} with a goal of {int} MYR")]
async fn a_team_campaign(world: &mut FundActionWorld, id: String, creator: String, team: String, goal: i64) {
    let campaign = NewCampaign::new(id, creator, Money::from_major(goal)).with_team(team);
    world.db().insert_campaign(campaign).await.expect("Error inserting campaign");
}

#[given(expr = "campaign {word} has already raised {int} MYR from {int} donations")]
async fn campaign_history(world: &mut FundActionWorld, id: String, raised: i64, count: i64) {
    sqlx::query("UPDATE campaigns SET raised_amount = $1, donation_count = $2 WHERE id = $3")
        .bind(Money::from_major(raised))
        .bind(count)
        .bind(&id)
        .execute(world.db().pool())
        .await
        .expect("Error seeding campaign history");
}

/// Table columns: id | campaign | donor | amount | payment_ref. An empty donor is a guest donation; an empty
/// payment_ref leaves the donation to be resolved through notification metadata.
#[given("the pending donations")]
async fn pending_donations(world: &mut FundActionWorld, step: &Step) {
    let table = step.table.as_ref().expect("The step needs a table of donations");
    for row in table.rows.iter().skip(1) {
        let amount = row[3].parse::<i64>().expect("Amount must be whole MYR");
        let mut donation = NewDonation::new(row[0].as_str(), row[1].as_str(), Money::from_major(amount));
        if !row[2].is_empty() {
            donation = donation.with_donor(row[2].as_str());
        }
        if !row[4].is_empty() {
            donation = donation.with_payment_ref(row[4].as_str());
        }
        world.db().insert_donation(donation).await.expect("Error inserting donation");
    }
}
