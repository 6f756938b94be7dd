use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::core::time::now_utc;
use crate::db::models::{Exam, Feedback, Profile, Submission, UserSummary};
use crate::db::types::{AppRole, SubmissionStatus};
use crate::repositories;

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub(crate) type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub(crate) struct NewExam {
    pub(crate) title: String,
    pub(crate) subject: String,
    pub(crate) description: Option<String>,
    pub(crate) file_path: Option<String>,
    pub(crate) created_by: Uuid,
}

#[derive(Debug, Clone)]
pub(crate) struct NewSubmission {
    pub(crate) exam_id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) file_path: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct NewFeedback {
    pub(crate) submission_id: Uuid,
    pub(crate) assessor_id: Uuid,
    pub(crate) strengths: Option<String>,
    pub(crate) improvements: Option<String>,
    pub(crate) comments: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ProfileUpdate {
    pub(crate) full_name: Option<String>,
    pub(crate) avatar_url: Option<String>,
}

/// The hosted relational store as seen by the application.
#[async_trait]
pub(crate) trait RecordStore: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    /// Roles of a user ordered by `created_at`, then `id`.
    async fn roles_for_user(&self, user_id: Uuid) -> StoreResult<Vec<AppRole>>;
    async fn replace_role(&self, user_id: Uuid, role: AppRole) -> StoreResult<()>;

    async fn find_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>>;
    async fn upsert_profile(&self, user_id: Uuid, update: ProfileUpdate) -> StoreResult<Profile>;
    async fn list_users(&self) -> StoreResult<Vec<UserSummary>>;

    async fn list_exams(&self) -> StoreResult<Vec<Exam>>;
    async fn find_exam(&self, id: Uuid) -> StoreResult<Option<Exam>>;
    async fn create_exam(&self, exam: NewExam) -> StoreResult<Exam>;
    async fn delete_exam(&self, id: Uuid) -> StoreResult<bool>;

    async fn create_submission(&self, submission: NewSubmission) -> StoreResult<Submission>;
    async fn find_submission(&self, id: Uuid) -> StoreResult<Option<Submission>>;
    async fn submissions_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Submission>>;
    async fn submissions_with_status(
        &self,
        status: SubmissionStatus,
    ) -> StoreResult<Vec<Submission>>;

    async fn create_feedback(&self, feedback: NewFeedback) -> StoreResult<Feedback>;
    async fn feedback_for_submission(&self, submission_id: Uuid) -> StoreResult<Vec<Feedback>>;
    async fn feedback_for_owner(&self, user_id: Uuid) -> StoreResult<Vec<Feedback>>;
    async fn feedback_by_assessor(&self, assessor_id: Uuid) -> StoreResult<Vec<Feedback>>;
}

#[derive(Clone)]
pub(crate) struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn roles_for_user(&self, user_id: Uuid) -> StoreResult<Vec<AppRole>> {
        let rows = repositories::user_roles::list_for_user(&self.pool, user_id).await?;
        Ok(rows.into_iter().map(|row| row.role).collect())
    }

    async fn replace_role(&self, user_id: Uuid, role: AppRole) -> StoreResult<()> {
        repositories::user_roles::replace(&self.pool, user_id, role, now_utc()).await?;
        Ok(())
    }

    async fn find_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(repositories::profiles::find_by_id(&self.pool, user_id).await?)
    }

    async fn upsert_profile(&self, user_id: Uuid, update: ProfileUpdate) -> StoreResult<Profile> {
        let profile = repositories::profiles::upsert(
            &self.pool,
            repositories::profiles::UpsertProfile {
                id: user_id,
                full_name: update.full_name.as_deref(),
                avatar_url: update.avatar_url.as_deref(),
                updated_at: now_utc(),
            },
        )
        .await?;
        Ok(profile)
    }

    async fn list_users(&self) -> StoreResult<Vec<UserSummary>> {
        Ok(repositories::profiles::list_with_roles(&self.pool).await?)
    }

    async fn list_exams(&self) -> StoreResult<Vec<Exam>> {
        Ok(repositories::exams::list(&self.pool).await?)
    }

    async fn find_exam(&self, id: Uuid) -> StoreResult<Option<Exam>> {
        Ok(repositories::exams::find_by_id(&self.pool, id).await?)
    }

    async fn create_exam(&self, exam: NewExam) -> StoreResult<Exam> {
        let created = repositories::exams::create(
            &self.pool,
            repositories::exams::CreateExam {
                id: Uuid::new_v4(),
                title: &exam.title,
                subject: &exam.subject,
                description: exam.description.as_deref(),
                file_path: exam.file_path.as_deref(),
                created_by: exam.created_by,
                created_at: now_utc(),
            },
        )
        .await?;
        Ok(created)
    }

    async fn delete_exam(&self, id: Uuid) -> StoreResult<bool> {
        Ok(repositories::exams::delete_by_id(&self.pool, id).await?)
    }

    async fn create_submission(&self, submission: NewSubmission) -> StoreResult<Submission> {
        let created = repositories::submissions::create(
            &self.pool,
            repositories::submissions::CreateSubmission {
                id: Uuid::new_v4(),
                exam_id: submission.exam_id,
                user_id: submission.user_id,
                file_path: submission.file_path.as_deref(),
                submitted_at: now_utc(),
            },
        )
        .await?;
        Ok(created)
    }

    async fn find_submission(&self, id: Uuid) -> StoreResult<Option<Submission>> {
        Ok(repositories::submissions::find_by_id(&self.pool, id).await?)
    }

    async fn submissions_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Submission>> {
        Ok(repositories::submissions::list_for_user(&self.pool, user_id).await?)
    }

    async fn submissions_with_status(
        &self,
        status: SubmissionStatus,
    ) -> StoreResult<Vec<Submission>> {
        Ok(repositories::submissions::list_by_status(&self.pool, status).await?)
    }

    async fn create_feedback(&self, feedback: NewFeedback) -> StoreResult<Feedback> {
        let created = repositories::feedback::create(
            &self.pool,
            repositories::feedback::CreateFeedback {
                id: Uuid::new_v4(),
                submission_id: feedback.submission_id,
                assessor_id: feedback.assessor_id,
                strengths: feedback.strengths.as_deref(),
                improvements: feedback.improvements.as_deref(),
                comments: feedback.comments.as_deref(),
                created_at: now_utc(),
            },
        )
        .await?;
        Ok(created)
    }

    async fn feedback_for_submission(&self, submission_id: Uuid) -> StoreResult<Vec<Feedback>> {
        Ok(repositories::feedback::list_for_submission(&self.pool, submission_id).await?)
    }

    async fn feedback_for_owner(&self, user_id: Uuid) -> StoreResult<Vec<Feedback>> {
        Ok(repositories::feedback::list_for_submission_owner(&self.pool, user_id).await?)
    }

    async fn feedback_by_assessor(&self, assessor_id: Uuid) -> StoreResult<Vec<Feedback>> {
        Ok(repositories::feedback::list_by_assessor(&self.pool, assessor_id).await?)
    }
}
