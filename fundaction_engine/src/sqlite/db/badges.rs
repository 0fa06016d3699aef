use chrono::Utc;
use log::warn;
use sqlx::SqliteConnection;

use crate::db_types::{Badge, BadgeRow, UserBadge};

/// Loads the catalog in catalog order. A badge whose requirement descriptor is not recognised cannot be evaluated, so
/// it is logged and left out rather than failing the whole catalog.
pub async fn fetch_catalog(conn: &mut SqliteConnection) -> Result<Vec<Badge>, sqlx::Error> {
    let rows: Vec<BadgeRow> = sqlx::query_as(
        r#"
            SELECT id, name, description, icon, category, rarity, points_reward, requirement_type, requirement_value
            FROM badges
            ORDER BY position ASC, name ASC;
        "#,
    )
    .fetch_all(conn)
    .await?;
    let badges = rows
        .into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            Badge::try_from(row).map_err(|e| warn!("🏅️ Badge {id} is ignored. {e}")).ok()
        })
        .collect();
    Ok(badges)
}

pub async fn fetch_user_badges(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<UserBadge>, sqlx::Error> {
    let badges = sqlx::query_as("SELECT * FROM user_badges WHERE user_id = $1 ORDER BY earned_at DESC, badge_id ASC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(badges)
}

/// Returns `true` if the badge was newly awarded, and `false` if the user already had it.
pub async fn insert_user_badge(user_id: &str, badge_id: &str, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            INSERT INTO user_badges (user_id, badge_id, earned_at) VALUES ($1, $2, $3)
            ON CONFLICT (user_id, badge_id) DO NOTHING;
        "#,
    )
    .bind(user_id)
    .bind(badge_id)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
