use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;

pub(crate) const COLUMNS: &str = "id, exam_id, user_id, file_path, status, submitted_at";

pub(crate) struct CreateSubmission<'a> {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub user_id: Uuid,
    pub file_path: Option<&'a str>,
    pub submitted_at: OffsetDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateSubmission<'_>,
) -> Result<Submission, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "INSERT INTO submissions (id, exam_id, user_id, file_path, status, submitted_at)
         VALUES ($1,$2,$3,$4,$5,$6)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.user_id)
    .bind(params.file_path)
    .bind(SubmissionStatus::Pending)
    .bind(params.submitted_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!("SELECT {COLUMNS} FROM submissions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions WHERE user_id = $1 ORDER BY submitted_at DESC, id ASC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Oldest first, so the assessor queue is served in arrival order.
pub(crate) async fn list_by_status(
    pool: &PgPool,
    status: SubmissionStatus,
) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions WHERE status = $1 ORDER BY submitted_at ASC, id ASC"
    ))
    .bind(status)
    .fetch_all(pool)
    .await
}
