use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::models::{Profile, UserSummary};

const COLUMNS: &str = "id, full_name, avatar_url, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(&format!("SELECT {COLUMNS} FROM profiles WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) struct UpsertProfile<'a> {
    pub id: Uuid,
    pub full_name: Option<&'a str>,
    pub avatar_url: Option<&'a str>,
    pub updated_at: OffsetDateTime,
}

/// Inserts the profile or overwrites the provided fields. `None` keeps the stored value.
pub(crate) async fn upsert(pool: &PgPool, params: UpsertProfile<'_>) -> Result<Profile, sqlx::Error> {
    sqlx::query_as::<_, Profile>(&format!(
        "INSERT INTO profiles (id, full_name, avatar_url, updated_at)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (id) DO UPDATE
         SET full_name = COALESCE(EXCLUDED.full_name, profiles.full_name),
             avatar_url = COALESCE(EXCLUDED.avatar_url, profiles.avatar_url),
             updated_at = EXCLUDED.updated_at
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.full_name)
    .bind(params.avatar_url)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_with_roles(pool: &PgPool) -> Result<Vec<UserSummary>, sqlx::Error> {
    sqlx::query_as::<_, UserSummary>(
        "SELECT p.id,
                p.full_name,
                p.avatar_url,
                (SELECT ur.role FROM user_roles ur
                 WHERE ur.user_id = p.id
                 ORDER BY ur.created_at ASC, ur.id ASC
                 LIMIT 1) AS role
         FROM profiles p
         ORDER BY p.full_name ASC NULLS LAST, p.id ASC",
    )
    .fetch_all(pool)
    .await
}
