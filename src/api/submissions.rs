use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::exams::{fetch_exam, signed_download};
use crate::api::forms::read_upload_form;
use crate::api::guards::{CurrentAssessor, CurrentStudent, CurrentUser};
use crate::api::validation::{max_upload_bytes, validate_payload, validate_upload};
use crate::core::state::AppState;
use crate::db::models::Submission;
use crate::db::types::{AppRole, SubmissionStatus};
use crate::repositories::{NewFeedback, NewSubmission};
use crate::schemas::exam::DownloadResponse;
use crate::schemas::submission::{FeedbackCreate, FeedbackResponse, SubmissionResponse};
use crate::services::roles::UserDescriptor;
use crate::services::storage::Bucket;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_submission))
        .route("/mine", get(my_submissions))
        .route("/pending", get(pending_submissions))
        .route("/:id/download", get(download_submission))
        .route("/:id/feedback", get(list_feedback).post(create_feedback))
}

async fn fetch_submission(state: &AppState, submission_id: Uuid) -> Result<Submission, ApiError> {
    state
        .records()
        .find_submission(submission_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))
}

/// Owners see their own submissions; assessors and admins see all of them.
fn ensure_can_view(user: &UserDescriptor, submission: &Submission) -> Result<(), ApiError> {
    if submission.user_id == user.id || matches!(user.role, AppRole::Assessor | AppRole::Admin) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Access denied"))
    }
}

async fn create_submission(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SubmissionResponse>), ApiError> {
    let storage = state.settings().storage();
    let form =
        read_upload_form(multipart, max_upload_bytes(storage), storage.max_upload_size_mb).await?;

    let exam_id = form
        .text("exam_id")
        .and_then(|value| Uuid::parse_str(&value).ok())
        .ok_or_else(|| ApiError::BadRequest("exam_id must be a valid id".to_string()))?;
    let exam = fetch_exam(&state, exam_id).await?;

    let file = form.file.ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;
    validate_upload(&file, storage)?;

    let uploads = state.uploads().ok_or_else(|| {
        ApiError::ServiceUnavailable("Object storage is not configured".to_string())
    })?;
    let result =
        uploads.upload(Some(file), Bucket::Submissions, &format!("{}/{}", student.id, exam.id)).await;
    if !result.success {
        return Err(ApiError::BadGateway(result.error.unwrap_or_else(|| "Upload failed".to_string())));
    }

    let submission = state
        .records()
        .create_submission(NewSubmission {
            exam_id: exam.id,
            user_id: student.id,
            file_path: result.file_path,
        })
        .await?;

    tracing::info!(
        submission_id = %submission.id,
        exam_id = %exam.id,
        user_id = %student.id,
        "Submission received"
    );
    Ok((StatusCode::CREATED, Json(SubmissionResponse::from_db(submission))))
}

async fn my_submissions(
    CurrentUser { user, .. }: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<SubmissionResponse>>, ApiError> {
    let submissions = state.records().submissions_for_user(user.id).await?;
    Ok(Json(submissions.into_iter().map(SubmissionResponse::from_db).collect()))
}

async fn pending_submissions(
    _assessor: CurrentAssessor,
    State(state): State<AppState>,
) -> Result<Json<Vec<SubmissionResponse>>, ApiError> {
    let submissions = state.records().submissions_with_status(SubmissionStatus::Pending).await?;
    Ok(Json(submissions.into_iter().map(SubmissionResponse::from_db).collect()))
}

async fn download_submission(
    CurrentUser { user, .. }: CurrentUser,
    Path(submission_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let submission = fetch_submission(&state, submission_id).await?;
    ensure_can_view(&user, &submission)?;

    let path = submission
        .file_path
        .ok_or_else(|| ApiError::NotFound("Submission has no file attached".to_string()))?;
    signed_download(&state, Bucket::Submissions, &path).await.map(Json)
}

async fn list_feedback(
    CurrentUser { user, .. }: CurrentUser,
    Path(submission_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Vec<FeedbackResponse>>, ApiError> {
    let submission = fetch_submission(&state, submission_id).await?;
    ensure_can_view(&user, &submission)?;

    let feedback = state.records().feedback_for_submission(submission.id).await?;
    Ok(Json(feedback.into_iter().map(FeedbackResponse::from_db).collect()))
}

async fn create_feedback(
    CurrentAssessor(assessor): CurrentAssessor,
    Path(submission_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<FeedbackCreate>,
) -> Result<(StatusCode, Json<FeedbackResponse>), ApiError> {
    validate_payload(&payload)?;
    let submission = fetch_submission(&state, submission_id).await?;

    let feedback = state
        .records()
        .create_feedback(NewFeedback {
            submission_id: submission.id,
            assessor_id: assessor.id,
            strengths: payload.strengths,
            improvements: payload.improvements,
            comments: payload.comments,
        })
        .await?;

    tracing::info!(
        feedback_id = %feedback.id,
        submission_id = %submission.id,
        assessor_id = %assessor.id,
        "Feedback recorded"
    );
    Ok((StatusCode::CREATED, Json(FeedbackResponse::from_db(feedback))))
}
