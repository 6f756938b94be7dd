use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::models::Feedback;

pub(crate) const COLUMNS: &str =
    "id, submission_id, assessor_id, strengths, improvements, comments, created_at, updated_at";

pub(crate) struct CreateFeedback<'a> {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub assessor_id: Uuid,
    pub strengths: Option<&'a str>,
    pub improvements: Option<&'a str>,
    pub comments: Option<&'a str>,
    pub created_at: OffsetDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateFeedback<'_>) -> Result<Feedback, sqlx::Error> {
    sqlx::query_as::<_, Feedback>(&format!(
        "INSERT INTO feedback (
            id, submission_id, assessor_id, strengths, improvements, comments,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$7)
        RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.submission_id)
    .bind(params.assessor_id)
    .bind(params.strengths)
    .bind(params.improvements)
    .bind(params.comments)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_for_submission(
    pool: &PgPool,
    submission_id: Uuid,
) -> Result<Vec<Feedback>, sqlx::Error> {
    sqlx::query_as::<_, Feedback>(&format!(
        "SELECT {COLUMNS} FROM feedback WHERE submission_id = $1 ORDER BY created_at DESC, id ASC"
    ))
    .bind(submission_id)
    .fetch_all(pool)
    .await
}

/// Feedback on every submission owned by `user_id`.
pub(crate) async fn list_for_submission_owner(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<Feedback>, sqlx::Error> {
    sqlx::query_as::<_, Feedback>(
        "SELECT f.id, f.submission_id, f.assessor_id, f.strengths, f.improvements, f.comments,
                f.created_at, f.updated_at
         FROM feedback f
         JOIN submissions s ON s.id = f.submission_id
         WHERE s.user_id = $1
         ORDER BY f.created_at DESC, f.id ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_by_assessor(
    pool: &PgPool,
    assessor_id: Uuid,
) -> Result<Vec<Feedback>, sqlx::Error> {
    sqlx::query_as::<_, Feedback>(&format!(
        "SELECT {COLUMNS} FROM feedback WHERE assessor_id = $1 ORDER BY created_at DESC, id ASC"
    ))
    .bind(assessor_id)
    .fetch_all(pool)
    .await
}
