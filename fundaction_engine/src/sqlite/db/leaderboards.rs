//! Ranking queries and the snapshot cache.
//!
//! All-time rankings read the materialised aggregates. Windowed rankings are derived from COMPLETED donations settled
//! inside the window. Ties are broken by storage order (`rowid`), so repeated refreshes give a stable ranking.
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{
        DonorStanding,
        FundraiserStanding,
        LeaderboardEntries,
        LeaderboardPeriod,
        LeaderboardSnapshot,
        LeaderboardSnapshotRow,
        LeaderboardType,
        TeamStanding,
        Upserted,
    },
    traits::StoreError,
};

pub async fn rank_fundraisers(
    since: Option<DateTime<Utc>>,
    limit: u32,
    conn: &mut SqliteConnection,
) -> Result<Vec<FundraiserStanding>, sqlx::Error> {
    let mut builder = match since {
        None => {
            let mut builder = QueryBuilder::<Sqlite>::new(
                r#"
                SELECT fs.user_id AS user_id, u.name AS name, u.avatar AS avatar, fs.total_raised AS amount,
                       fs.total_campaigns AS campaigns, fs.total_donations AS donations
                FROM fundraiser_stats fs JOIN users u ON u.id = fs.user_id
                WHERE fs.total_raised > 0
                ORDER BY fs.total_raised DESC, fs.rowid ASC
                "#,
            );
            builder.push(" LIMIT ");
            builder
        },
        Some(since) => {
            let mut builder = QueryBuilder::<Sqlite>::new(
                r#"
                SELECT c.creator_id AS user_id, u.name AS name, u.avatar AS avatar, SUM(d.amount) AS amount,
                       COUNT(DISTINCT c.id) AS campaigns, COUNT(d.id) AS donations
                FROM donations d
                    JOIN campaigns c ON c.id = d.campaign_id
                    JOIN users u ON u.id = c.creator_id
                WHERE d.payment_status = 'COMPLETED' AND julianday(d.settled_at) >= julianday("#,
            );
            builder.push_bind(since);
            builder.push(
                r#")
                GROUP BY c.creator_id
                HAVING SUM(d.amount) > 0
                ORDER BY amount DESC, MIN(u.rowid) ASC
                LIMIT "#,
            );
            builder
        },
    };
    builder.push_bind(i64::from(limit));
    let standings = builder.build_query_as::<FundraiserStanding>().fetch_all(conn).await?;
    Ok(standings)
}

pub async fn rank_donors(
    since: Option<DateTime<Utc>>,
    limit: u32,
    conn: &mut SqliteConnection,
) -> Result<Vec<DonorStanding>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new(
        r#"
        SELECT u.id AS user_id, u.name AS name, u.avatar AS avatar, SUM(d.amount) AS amount,
               COUNT(d.id) AS donation_count
        FROM donations d JOIN users u ON u.id = d.donor_id
        WHERE d.payment_status = 'COMPLETED'"#,
    );
    if let Some(since) = since {
        builder.push(" AND julianday(d.settled_at) >= julianday(");
        builder.push_bind(since);
        builder.push(")");
    }
    builder.push(
        r#"
        GROUP BY u.id
        ORDER BY amount DESC, MIN(u.rowid) ASC
        LIMIT "#,
    );
    builder.push_bind(i64::from(limit));
    let standings = builder.build_query_as::<DonorStanding>().fetch_all(conn).await?;
    Ok(standings)
}

pub async fn rank_teams(
    since: Option<DateTime<Utc>>,
    limit: u32,
    conn: &mut SqliteConnection,
) -> Result<Vec<TeamStanding>, sqlx::Error> {
    let mut builder = match since {
        None => QueryBuilder::<Sqlite>::new(
            r#"
            SELECT id AS team_id, name, slug, avatar, raised_amount AS amount, member_count AS members,
                   campaign_count AS campaigns
            FROM teams
            WHERE status = 'ACTIVE' AND raised_amount > 0
            ORDER BY raised_amount DESC, rowid ASC
            LIMIT "#,
        ),
        Some(since) => {
            let mut builder = QueryBuilder::<Sqlite>::new(
                r#"
                SELECT t.id AS team_id, t.name AS name, t.slug AS slug, t.avatar AS avatar, SUM(d.amount) AS amount,
                       t.member_count AS members, t.campaign_count AS campaigns
                FROM donations d
                    JOIN campaigns c ON c.id = d.campaign_id
                    JOIN teams t ON t.id = c.team_id
                WHERE t.status = 'ACTIVE' AND d.payment_status = 'COMPLETED'
                  AND julianday(d.settled_at) >= julianday("#,
            );
            builder.push_bind(since);
            builder.push(
                r#")
                GROUP BY t.id
                HAVING SUM(d.amount) > 0
                ORDER BY amount DESC, MIN(t.rowid) ASC
                LIMIT "#,
            );
            builder
        },
    };
    builder.push_bind(i64::from(limit));
    let standings = builder.build_query_as::<TeamStanding>().fetch_all(conn).await?;
    Ok(standings)
}

pub async fn fetch_snapshot(
    kind: LeaderboardType,
    period: LeaderboardPeriod,
    conn: &mut SqliteConnection,
) -> Result<Option<LeaderboardSnapshot>, StoreError> {
    let row: Option<LeaderboardSnapshotRow> =
        sqlx::query_as("SELECT * FROM leaderboard_snapshots WHERE kind = $1 AND period = $2")
            .bind(kind)
            .bind(period)
            .fetch_optional(conn)
            .await?;
    let snapshot = row.map(LeaderboardSnapshot::try_from).transpose()?;
    Ok(snapshot)
}

pub async fn upsert_snapshot(
    period: LeaderboardPeriod,
    entries: &LeaderboardEntries,
    computed_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Upserted<LeaderboardSnapshot>, StoreError> {
    let kind = entries.kind();
    let data = serde_json::to_string(entries).map_err(|e| StoreError::CorruptData(e.to_string()))?;
    let updated: Option<LeaderboardSnapshotRow> = sqlx::query_as(
        r#"
            UPDATE leaderboard_snapshots SET data = $1, last_computed = $2
            WHERE kind = $3 AND period = $4
            RETURNING *;
        "#,
    )
    .bind(&data)
    .bind(computed_at)
    .bind(kind)
    .bind(period)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(row) = updated {
        return Ok(Upserted::Updated(LeaderboardSnapshot::try_from(row)?));
    }
    let created: LeaderboardSnapshotRow = sqlx::query_as(
        r#"
            INSERT INTO leaderboard_snapshots (kind, period, data, last_computed, created_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (kind, period) DO UPDATE SET data = excluded.data, last_computed = excluded.last_computed
            RETURNING *;
        "#,
    )
    .bind(kind)
    .bind(period)
    .bind(&data)
    .bind(computed_at)
    .fetch_one(conn)
    .await?;
    Ok(Upserted::Created(LeaderboardSnapshot::try_from(created)?))
}
