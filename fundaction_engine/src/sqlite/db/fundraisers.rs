//! Fundraiser statistics.
//!
//! Every upsert here first tries to update an existing row, and falls back to an `INSERT .. ON CONFLICT DO UPDATE`
//! when there is none. The fallback keeps the increment correct if a concurrent caller creates the row in between.
use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    db_types::{FundraiserStats, Money, Upserted},
    traits::StoreError,
};

pub async fn fetch_fundraiser_stats(
    user_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<FundraiserStats>, sqlx::Error> {
    let stats =
        sqlx::query_as("SELECT * FROM fundraiser_stats WHERE user_id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(stats)
}

pub async fn upsert_donation(
    user_id: &str,
    amount: Money,
    conn: &mut SqliteConnection,
) -> Result<Upserted<FundraiserStats>, StoreError> {
    let now = Utc::now();
    let updated: Option<FundraiserStats> = sqlx::query_as(
        r#"
            UPDATE fundraiser_stats SET
                total_raised = total_raised + $1,
                total_donations = total_donations + 1,
                last_active = $2,
                updated_at = $2
            WHERE user_id = $3
            RETURNING *;
        "#,
    )
    .bind(amount)
    .bind(now)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(stats) = updated {
        return Ok(Upserted::Updated(stats));
    }
    let created = sqlx::query_as(
        r#"
            INSERT INTO fundraiser_stats
                (user_id, total_raised, total_donations, average_donation, last_active, created_at, updated_at)
            VALUES ($1, $2, 1, $2, $3, $3, $3)
            ON CONFLICT (user_id) DO UPDATE SET
                total_raised = total_raised + excluded.total_raised,
                total_donations = total_donations + 1,
                last_active = excluded.last_active,
                updated_at = excluded.updated_at
            RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(Upserted::Created(created))
}

pub async fn set_average_donation(
    user_id: &str,
    average: Money,
    conn: &mut SqliteConnection,
) -> Result<(), StoreError> {
    sqlx::query("UPDATE fundraiser_stats SET average_donation = $1, updated_at = $2 WHERE user_id = $3")
        .bind(average)
        .bind(Utc::now())
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn upsert_campaign(
    user_id: &str,
    active: bool,
    conn: &mut SqliteConnection,
) -> Result<Upserted<FundraiserStats>, StoreError> {
    let now = Utc::now();
    let active = i64::from(active);
    let updated: Option<FundraiserStats> = sqlx::query_as(
        r#"
            UPDATE fundraiser_stats SET
                total_campaigns = total_campaigns + 1,
                active_campaigns = active_campaigns + $1,
                last_active = $2,
                updated_at = $2
            WHERE user_id = $3
            RETURNING *;
        "#,
    )
    .bind(active)
    .bind(now)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(stats) = updated {
        return Ok(Upserted::Updated(stats));
    }
    let created = sqlx::query_as(
        r#"
            INSERT INTO fundraiser_stats (user_id, total_campaigns, active_campaigns, last_active, created_at, updated_at)
            VALUES ($1, 1, $2, $3, $3, $3)
            ON CONFLICT (user_id) DO UPDATE SET
                total_campaigns = total_campaigns + 1,
                active_campaigns = active_campaigns + excluded.active_campaigns,
                last_active = excluded.last_active,
                updated_at = excluded.updated_at
            RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(active)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(Upserted::Created(created))
}

pub async fn upsert_share(user_id: &str, conn: &mut SqliteConnection) -> Result<Upserted<FundraiserStats>, StoreError> {
    let now = Utc::now();
    let updated: Option<FundraiserStats> = sqlx::query_as(
        r#"
            UPDATE fundraiser_stats SET total_shares = total_shares + 1, last_active = $1, updated_at = $1
            WHERE user_id = $2
            RETURNING *;
        "#,
    )
    .bind(now)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(stats) = updated {
        return Ok(Upserted::Updated(stats));
    }
    let created = sqlx::query_as(
        r#"
            INSERT INTO fundraiser_stats (user_id, total_shares, last_active, created_at, updated_at)
            VALUES ($1, 1, $2, $2, $2)
            ON CONFLICT (user_id) DO UPDATE SET
                total_shares = total_shares + 1,
                last_active = excluded.last_active,
                updated_at = excluded.updated_at
            RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(Upserted::Created(created))
}

/// Rederives the donation totals of a fundraiser from the COMPLETED donations to every campaign they created.
pub async fn recompute_totals(
    user_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Upserted<FundraiserStats>, StoreError> {
    let now = Utc::now();
    let updated: Option<FundraiserStats> = sqlx::query_as(
        r#"
            WITH totals AS (
                SELECT COALESCE(SUM(d.amount), 0) AS raised, COUNT(d.id) AS donations
                FROM donations d JOIN campaigns c ON c.id = d.campaign_id
                WHERE c.creator_id = $1 AND d.payment_status = 'COMPLETED'
            )
            UPDATE fundraiser_stats SET
                total_raised = (SELECT raised FROM totals),
                total_donations = (SELECT donations FROM totals),
                average_donation = (SELECT COALESCE(raised / NULLIF(donations, 0), 0) FROM totals),
                updated_at = $2
            WHERE user_id = $1
            RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(stats) = updated {
        return Ok(Upserted::Updated(stats));
    }
    let created = sqlx::query_as(
        r#"
            INSERT INTO fundraiser_stats
                (user_id, total_raised, total_donations, average_donation, created_at, updated_at)
            SELECT $1, COALESCE(SUM(d.amount), 0), COUNT(d.id), COALESCE(SUM(d.amount) / NULLIF(COUNT(d.id), 0), 0), $2, $2
            FROM donations d JOIN campaigns c ON c.id = d.campaign_id
            WHERE c.creator_id = $1 AND d.payment_status = 'COMPLETED'
            ON CONFLICT (user_id) DO UPDATE SET
                total_raised = excluded.total_raised,
                total_donations = excluded.total_donations,
                average_donation = excluded.average_donation,
                updated_at = excluded.updated_at
            RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(Upserted::Created(created))
}
