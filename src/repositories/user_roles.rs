use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::models::UserRoleRow;
use crate::db::types::AppRole;

/// Role rows for one user, oldest first. Callers treat the first row as the active role.
pub(crate) async fn list_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<UserRoleRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRoleRow>(
        "SELECT id, user_id, role, created_at
         FROM user_roles
         WHERE user_id = $1
         ORDER BY created_at ASC, id ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Replaces every role row of the user with a single row.
pub(crate) async fn replace(
    pool: &PgPool,
    user_id: Uuid,
    role: AppRole,
    now: OffsetDateTime,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("INSERT INTO user_roles (id, user_id, role, created_at) VALUES ($1, $2, $3, $4)")
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(role)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    tx.commit().await
}
