//! Campaign and team queries. Raised totals only ever move through the increment and recompute functions here.
use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Campaign, Money, NewCampaign, Team},
    traits::StoreError,
};

pub async fn insert_campaign(campaign: NewCampaign, conn: &mut SqliteConnection) -> Result<Campaign, sqlx::Error> {
    let now = Utc::now();
    let campaign = sqlx::query_as(
        r#"
            INSERT INTO campaigns (id, slug, title, goal_amount, currency, team_id, creator_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING *;
        "#,
    )
    .bind(campaign.id)
    .bind(campaign.slug)
    .bind(campaign.title)
    .bind(campaign.goal_amount)
    .bind(campaign.currency)
    .bind(campaign.team_id)
    .bind(campaign.creator_id)
    .bind(campaign.status)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(campaign)
}

pub async fn fetch_campaign(id: &str, conn: &mut SqliteConnection) -> Result<Option<Campaign>, sqlx::Error> {
    let campaign = sqlx::query_as("SELECT * FROM campaigns WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(campaign)
}

pub async fn count_campaigns_for_creator(user_id: &str, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM campaigns WHERE creator_id = $1")
        .bind(user_id)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

pub async fn increment_campaign_totals(
    campaign_id: &str,
    amount: Money,
    conn: &mut SqliteConnection,
) -> Result<Campaign, StoreError> {
    let campaign = sqlx::query_as(
        r#"
            UPDATE campaigns SET
                raised_amount = raised_amount + $1,
                donation_count = donation_count + 1,
                updated_at = $2
            WHERE id = $3
            RETURNING *;
        "#,
    )
    .bind(amount)
    .bind(Utc::now())
    .bind(campaign_id)
    .fetch_optional(conn)
    .await?;
    campaign.ok_or_else(|| StoreError::CampaignNotFound(campaign_id.to_string()))
}

pub async fn recompute_campaign_totals(campaign_id: &str, conn: &mut SqliteConnection) -> Result<Campaign, StoreError> {
    let campaign = sqlx::query_as(
        r#"
            UPDATE campaigns SET
                raised_amount = (
                    SELECT COALESCE(SUM(amount), 0) FROM donations
                    WHERE campaign_id = campaigns.id AND payment_status = 'COMPLETED'
                ),
                donation_count = (
                    SELECT COUNT(*) FROM donations
                    WHERE campaign_id = campaigns.id AND payment_status = 'COMPLETED'
                ),
                updated_at = $1
            WHERE id = $2
            RETURNING *;
        "#,
    )
    .bind(Utc::now())
    .bind(campaign_id)
    .fetch_optional(conn)
    .await?;
    campaign.ok_or_else(|| StoreError::CampaignNotFound(campaign_id.to_string()))
}

//--------------------------------------        Teams        ---------------------------------------------------------

pub async fn insert_team(
    id: &str,
    name: &str,
    slug: &str,
    member_count: i64,
    conn: &mut SqliteConnection,
) -> Result<Team, sqlx::Error> {
    let now = Utc::now();
    let team = sqlx::query_as(
        r#"
            INSERT INTO teams (id, name, slug, member_count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING *;
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(slug)
    .bind(member_count)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(team)
}

pub async fn fetch_team(id: &str, conn: &mut SqliteConnection) -> Result<Option<Team>, sqlx::Error> {
    let team = sqlx::query_as("SELECT * FROM teams WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(team)
}

pub async fn increment_team_raised(team_id: &str, amount: Money, conn: &mut SqliteConnection) -> Result<Team, StoreError> {
    let team = sqlx::query_as(
        "UPDATE teams SET raised_amount = raised_amount + $1, updated_at = $2 WHERE id = $3 RETURNING *",
    )
    .bind(amount)
    .bind(Utc::now())
    .bind(team_id)
    .fetch_optional(conn)
    .await?;
    team.ok_or_else(|| StoreError::TeamNotFound(team_id.to_string()))
}

pub async fn increment_team_campaigns(team_id: &str, conn: &mut SqliteConnection) -> Result<Team, StoreError> {
    let team = sqlx::query_as(
        "UPDATE teams SET campaign_count = campaign_count + 1, updated_at = $1 WHERE id = $2 RETURNING *",
    )
    .bind(Utc::now())
    .bind(team_id)
    .fetch_optional(conn)
    .await?;
    team.ok_or_else(|| StoreError::TeamNotFound(team_id.to_string()))
}

pub async fn recompute_team_raised(team_id: &str, conn: &mut SqliteConnection) -> Result<Team, StoreError> {
    let team = sqlx::query_as(
        r#"
            UPDATE teams SET
                raised_amount = (SELECT COALESCE(SUM(raised_amount), 0) FROM campaigns WHERE team_id = teams.id),
                updated_at = $1
            WHERE id = $2
            RETURNING *;
        "#,
    )
    .bind(Utc::now())
    .bind(team_id)
    .fetch_optional(conn)
    .await?;
    team.ok_or_else(|| StoreError::TeamNotFound(team_id.to_string()))
}
