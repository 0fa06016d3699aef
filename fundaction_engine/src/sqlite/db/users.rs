use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::User;

pub async fn insert_user(
    id: &str,
    name: &str,
    avatar: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<User, sqlx::Error> {
    let now = Utc::now();
    let user = sqlx::query_as(
        "INSERT INTO users (id, name, avatar, created_at, updated_at) VALUES ($1, $2, $3, $4, $4) RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(avatar)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(user)
}

pub async fn fetch_user(id: &str, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(user)
}

/// Adds `points` to the user's total in a single statement, returning the new total.
pub async fn increment_points(id: &str, points: i64, conn: &mut SqliteConnection) -> Result<Option<i64>, sqlx::Error> {
    let total = sqlx::query_scalar(
        "UPDATE users SET total_points = total_points + $1, updated_at = $2 WHERE id = $3 RETURNING total_points",
    )
    .bind(points)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(total)
}

pub async fn set_level(
    id: &str,
    level: i64,
    observed_total: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET level = $1, updated_at = $2 WHERE id = $3 AND total_points = $4")
        .bind(level)
        .bind(Utc::now())
        .bind(id)
        .bind(observed_total)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
