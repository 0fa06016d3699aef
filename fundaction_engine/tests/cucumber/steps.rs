use std::time::Duration;

use cucumber::{then, when};
use fundaction_engine::{
    db_types::{LeaderboardEntries, LeaderboardPeriod, LeaderboardType, Money, PaymentStatus},
    points::level,
    settlement_objects::{NotificationMetadata, PaymentOutcome, SettlementOutcome},
    traits::{AggregateStore, DonationManagement, GamificationStore},
    LeaderboardApi,
    SettlementError,
};

use crate::cucumber::FundActionWorld;

#[when(expr = "the gateway reports {word} for payment {word}")]
async fn gateway_event(world: &mut FundActionWorld, event_type: String, payment_ref: String) {
    let outcome = PaymentOutcome::from_event_type(&event_type);
    let result = world.api().settle(outcome, &payment_ref, &NotificationMetadata::default()).await;
    world.last_result = Some(result);
}

#[when(expr = "the gateway reports {word} for payment {word} with donation id {word}")]
async fn gateway_event_with_metadata(world: &mut FundActionWorld, event_type: String, payment_ref: String, id: String) {
    let outcome = PaymentOutcome::from_event_type(&event_type);
    let metadata = NotificationMetadata::with_donation_id(id);
    let result = world.api().settle(outcome, &payment_ref, &metadata).await;
    world.last_result = Some(result);
}

#[when(expr = "I pause for {int}ms")]
async fn pause(_world: &mut FundActionWorld, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[then("the donation settles cleanly")]
async fn settled_cleanly(world: &mut FundActionWorld) {
    match world.last_outcome() {
        SettlementOutcome::Completed(report) => {
            assert!(report.is_clean(), "Downstream failures: {:?}", report.failures)
        },
        other => panic!("Expected a completed settlement, got {other}"),
    }
}

#[then(expr = "the settlement awards {int} points and the badges {string}")]
async fn settlement_rewards(world: &mut FundActionWorld, points: i64, badges: String) {
    let expected = badges.split(',').map(str::trim).filter(|s| !s.is_empty()).collect::<Vec<_>>();
    match world.last_outcome() {
        SettlementOutcome::Completed(report) => {
            assert_eq!(report.points_awarded, points);
            assert_eq!(report.badges_awarded, expected);
        },
        other => panic!("Expected a completed settlement, got {other}"),
    }
}

#[then("the notification is acknowledged as a duplicate")]
async fn duplicate(world: &mut FundActionWorld) {
    assert!(matches!(world.last_outcome(), SettlementOutcome::AlreadySettled(_)), "Got {}", world.last_outcome());
}

#[then("the notification is acknowledged as a conflict")]
async fn conflict(world: &mut FundActionWorld) {
    assert!(matches!(world.last_outcome(), SettlementOutcome::TerminalConflict(_)), "Got {}", world.last_outcome());
}

#[then("the notification is recorded as a failed payment")]
async fn failed_payment(world: &mut FundActionWorld) {
    assert!(matches!(world.last_outcome(), SettlementOutcome::Failed(_)), "Got {}", world.last_outcome());
}

#[then(expr = "the notification is ignored as {word}")]
async fn ignored(world: &mut FundActionWorld, kind: String) {
    assert_eq!(world.last_outcome(), &SettlementOutcome::Ignored(kind));
}

#[then("the notification cannot be resolved")]
async fn unresolved(world: &mut FundActionWorld) {
    match &world.last_result {
        Some(Err(SettlementError::Resolution(_))) => {},
        other => panic!("Expected a resolution error, got {other:?}"),
    }
}

#[then(expr = "donation {word} is {word}")]
async fn donation_status(world: &mut FundActionWorld, id: String, status: String) {
    let donation = world.db().fetch_donation(&id).await.expect("Error fetching donation").expect("No such donation");
    let expected = status.parse::<PaymentStatus>().expect("Not a payment status");
    assert_eq!(donation.payment_status, expected);
    assert_eq!(donation.settled_at.is_some(), expected.is_terminal());
}

#[then(expr = "donation {word} has been propagated")]
async fn donation_propagated(world: &mut FundActionWorld, id: String) {
    let donation = world.db().fetch_donation(&id).await.expect("Error fetching donation").expect("No such donation");
    assert!(donation.is_propagated(), "Donation {id} was not propagated");
}

#[then(expr = "campaign {word} has raised {int} MYR from {int} donations")]
async fn campaign_totals(world: &mut FundActionWorld, id: String, raised: i64, count: i64) {
    let campaign = world.db().fetch_campaign(&id).await.expect("Error fetching campaign").expect("No such campaign");
    assert_eq!(campaign.raised_amount, Money::from_major(raised), "Raised amount is incorrect");
    assert_eq!(campaign.donation_count, count, "Donation count is incorrect");
}

#[then(expr = "team {word} has raised {int} MYR")]
async fn team_totals(world: &mut FundActionWorld, id: String, raised: i64) {
    let team = world.db().fetch_team(&id).await.expect("Error fetching team").expect("No such team");
    assert_eq!(team.raised_amount, Money::from_major(raised));
}

#[then(expr = "fundraiser {word} has raised {int} MYR from {int} donations")]
async fn fundraiser_totals(world: &mut FundActionWorld, id: String, raised: i64, count: i64) {
    let stats = world.db().fetch_fundraiser_stats(&id).await.expect("Error fetching stats").expect("No stats");
    assert_eq!(stats.total_raised, Money::from_major(raised));
    assert_eq!(stats.total_donations, count);
}

#[then(expr = "fundraiser {word} has an average donation of {int} MYR")]
async fn fundraiser_average(world: &mut FundActionWorld, id: String, average: i64) {
    let stats = world.db().fetch_fundraiser_stats(&id).await.expect("Error fetching stats").expect("No stats");
    assert_eq!(stats.average_donation, Money::from_major(average));
}

#[then(expr = "fundraiser {word} has no stats")]
async fn no_fundraiser_stats(world: &mut FundActionWorld, id: String) {
    let stats = world.db().fetch_fundraiser_stats(&id).await.expect("Error fetching stats");
    assert!(stats.is_none(), "Expected no stats for {id}, got {stats:?}");
}

#[then(expr = "user {word} has {int} points at level {int}")]
async fn user_points(world: &mut FundActionWorld, id: String, points: i64, lvl: i64) {
    let user = world.db().fetch_user(&id).await.expect("Error fetching user").expect("No such user");
    assert_eq!(user.total_points, points, "Total points are incorrect");
    assert_eq!(user.level, lvl, "Level is incorrect");
}

#[then(expr = "user {word} holds the badges {string}")]
async fn user_badges(world: &mut FundActionWorld, id: String, badges: String) {
    let mut expected = badges.split(',').map(str::trim).filter(|s| !s.is_empty()).collect::<Vec<_>>();
    expected.sort_unstable();
    let held = world.db().fetch_user_badges(&id).await.expect("Error fetching badges");
    let mut held = held.iter().map(|b| b.badge_id.as_str()).collect::<Vec<_>>();
    held.sort_unstable();
    assert_eq!(held, expected);
}

#[then(expr = "{int} points is level {int}")]
async fn points_level(_world: &mut FundActionWorld, points: i64, lvl: i64) {
    assert_eq!(level(points), lvl);
}

/// Each expected entry is written as `user:amount:count`, in rank order.
#[then(expr = "the {word} {word} leaderboard reads {string}")]
async fn donor_leaderboard(world: &mut FundActionWorld, kind: String, period: String, expected: String) {
    let kind = kind.parse::<LeaderboardType>().expect("Not a leaderboard type");
    let period = period.parse::<LeaderboardPeriod>().expect("Not a leaderboard period");
    let api = LeaderboardApi::new(world.db().clone());
    let snapshot = api.get(kind, period).await.expect("Error fetching leaderboard");
    let actual = match snapshot.data {
        LeaderboardEntries::TopDonors(entries) => entries
            .into_iter()
            .map(|e| format!("{}:{}:{}", e.user_id, e.amount.value() / 100, e.donation_count))
            .collect::<Vec<_>>(),
        LeaderboardEntries::TopFundraisers(entries) => entries
            .into_iter()
            .map(|e| format!("{}:{}:{}", e.user_id, e.amount.value() / 100, e.donations))
            .collect::<Vec<_>>(),
        LeaderboardEntries::TopTeams(entries) => entries
            .into_iter()
            .map(|e| format!("{}:{}:{}", e.team_id, e.amount.value() / 100, e.campaigns))
            .collect::<Vec<_>>(),
    };
    assert_eq!(actual.join(", "), expected);
}
