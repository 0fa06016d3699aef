use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Campaign, Donation, NewDonation, PaymentStatus},
    traits::StoreError,
};

/// Inserts a new PENDING donation. Unique violations on the id or payment reference are reported as
/// [`StoreError::DonationAlreadyExists`].
pub async fn insert_donation(donation: NewDonation, conn: &mut SqliteConnection) -> Result<Donation, StoreError> {
    if !donation.amount.is_positive() {
        return Err(StoreError::InvalidAmount(donation.amount.to_string()));
    }
    let id = donation.id.clone();
    let now = Utc::now();
    let result = sqlx::query_as(
        r#"
            INSERT INTO donations (
                id,
                amount,
                currency,
                campaign_id,
                donor_id,
                payment_ref,
                is_anonymous,
                is_recurring,
                message,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING *;
        "#,
    )
    .bind(donation.id)
    .bind(donation.amount)
    .bind(donation.currency)
    .bind(donation.campaign_id)
    .bind(donation.donor_id)
    .bind(donation.payment_ref)
    .bind(donation.is_anonymous)
    .bind(donation.is_recurring)
    .bind(donation.message)
    .bind(now)
    .fetch_one(conn)
    .await;
    match result {
        Ok(donation) => {
            debug!("🗃️ Donation {id} created");
            Ok(donation)
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(StoreError::DonationAlreadyExists(id)),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_donation(id: &str, conn: &mut SqliteConnection) -> Result<Option<Donation>, sqlx::Error> {
    let donation = sqlx::query_as("SELECT * FROM donations WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(donation)
}

pub async fn fetch_donation_by_payment_ref(
    payment_ref: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Donation>, sqlx::Error> {
    let donation = sqlx::query_as("SELECT * FROM donations WHERE payment_ref = $1")
        .bind(payment_ref)
        .fetch_optional(conn)
        .await?;
    Ok(donation)
}

/// The compare-and-set at the heart of settlement idempotency. Only a PENDING donation is updated, so of any number of
/// concurrent callers, exactly one gets `Some`.
pub async fn transition_pending_donation(
    id: &str,
    status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Donation>, sqlx::Error> {
    let now = Utc::now();
    let donation = sqlx::query_as(
        r#"
            UPDATE donations SET payment_status = $1, settled_at = $2, updated_at = $2
            WHERE id = $3 AND payment_status = 'PENDING'
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(now)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(donation)
}

pub async fn fetch_completed_donations_for_donor(
    donor_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Donation>, sqlx::Error> {
    let donations = sqlx::query_as(
        "SELECT * FROM donations WHERE donor_id = $1 AND payment_status = 'COMPLETED' ORDER BY created_at ASC",
    )
    .bind(donor_id)
    .fetch_all(conn)
    .await?;
    Ok(donations)
}

/// Stamps `propagated_at`. The first stamp wins; later calls leave it untouched.
pub async fn mark_donation_propagated(id: &str, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    let now = Utc::now();
    let result = sqlx::query("UPDATE donations SET propagated_at = COALESCE(propagated_at, $1) WHERE id = $2")
        .bind(now)
        .bind(id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::DonationNotFound(id.to_string()));
    }
    Ok(())
}

pub async fn fetch_unpropagated_donations(
    settled_before: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Donation>, sqlx::Error> {
    let donations = sqlx::query_as(
        r#"
            SELECT * FROM donations
            WHERE payment_status = 'COMPLETED'
              AND propagated_at IS NULL
              AND julianday(settled_at) < julianday($1)
            ORDER BY settled_at ASC;
        "#,
    )
    .bind(settled_before)
    .fetch_all(conn)
    .await?;
    Ok(donations)
}

/// Counts the COMPLETED donations settled at or after `settled_since` that are still unpropagated and touch the same
/// aggregates as `campaign`: the campaign itself, every campaign of its team, and every campaign of its creator.
pub async fn count_settlements_in_flight(
    campaign: &Campaign,
    settled_since: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<i64, sqlx::Error> {
    let count = sqlx::query_scalar(
        r#"
            SELECT COUNT(*) FROM donations d JOIN campaigns c ON c.id = d.campaign_id
            WHERE d.payment_status = 'COMPLETED'
              AND d.propagated_at IS NULL
              AND julianday(d.settled_at) >= julianday($1)
              AND (c.id = $2 OR c.creator_id = $3 OR c.team_id = $4);
        "#,
    )
    .bind(settled_since)
    .bind(&campaign.id)
    .bind(&campaign.creator_id)
    .bind(campaign.team_id.as_deref())
    .fetch_one(conn)
    .await?;
    Ok(count)
}
