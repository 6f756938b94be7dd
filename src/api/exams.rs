use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::forms::read_upload_form;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::validation::{max_upload_bytes, validate_payload, validate_upload};
use crate::core::state::AppState;
use crate::db::models::Exam;
use crate::repositories::NewExam;
use crate::schemas::exam::{DownloadResponse, ExamCreate, ExamResponse};
use crate::services::exams::delete_exam as remove_exam;
use crate::services::storage::Bucket;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_exams).post(create_exam))
        .route("/:id", get(get_exam).delete(delete_exam))
        .route("/:id/download", get(download_exam))
}

pub(crate) async fn fetch_exam(state: &AppState, exam_id: Uuid) -> Result<Exam, ApiError> {
    state
        .records()
        .find_exam(exam_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))
}

async fn list_exams(
    _user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ExamResponse>>, ApiError> {
    let exams = state.records().list_exams().await?;
    Ok(Json(
        exams
            .into_iter()
            .map(|exam| ExamResponse::from_db(exam).with_file_url(state.uploads()))
            .collect(),
    ))
}

async fn create_exam(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ExamResponse>), ApiError> {
    let storage = state.settings().storage();
    let form =
        read_upload_form(multipart, max_upload_bytes(storage), storage.max_upload_size_mb).await?;

    let payload = ExamCreate {
        title: form.text("title").unwrap_or_default(),
        subject: form.text("subject").unwrap_or_default(),
        description: form.text("description"),
    };
    validate_payload(&payload)?;

    let mut file_path = None;
    if let Some(file) = form.file {
        validate_upload(&file, storage)?;
        let uploads = state.uploads().ok_or_else(|| {
            ApiError::ServiceUnavailable("Object storage is not configured".to_string())
        })?;

        let result =
            uploads.upload(Some(file), Bucket::ExamPapers, &format!("exams/{}", admin.id)).await;
        if !result.success {
            return Err(ApiError::BadGateway(
                result.error.unwrap_or_else(|| "Upload failed".to_string()),
            ));
        }
        file_path = result.file_path;
    }

    let created = state
        .records()
        .create_exam(NewExam {
            title: payload.title,
            subject: payload.subject,
            description: payload.description,
            file_path: file_path.clone(),
            created_by: admin.id,
        })
        .await;

    let exam = match created {
        Ok(exam) => exam,
        Err(err) => {
            if let (Some(path), Some(uploads)) = (file_path.as_deref(), state.uploads()) {
                if let Err(remove_err) = uploads.remove(Bucket::ExamPapers, path).await {
                    tracing::warn!(path, error = %remove_err, "Failed to clean up orphaned exam paper");
                }
            }
            return Err(ApiError::internal(err, "Failed to create exam"));
        }
    };

    tracing::info!(exam_id = %exam.id, admin_id = %admin.id, "Exam created");
    Ok((StatusCode::CREATED, Json(ExamResponse::from_db(exam).with_file_url(state.uploads()))))
}

async fn get_exam(
    _user: CurrentUser,
    Path(exam_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = fetch_exam(&state, exam_id).await?;
    Ok(Json(ExamResponse::from_db(exam).with_file_url(state.uploads())))
}

async fn delete_exam(
    CurrentAdmin(admin): CurrentAdmin,
    Path(exam_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    remove_exam(state.records(), state.uploads(), exam_id).await?;
    tracing::info!(exam_id = %exam_id, admin_id = %admin.id, "Exam deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn download_exam(
    _user: CurrentUser,
    Path(exam_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let exam = fetch_exam(&state, exam_id).await?;
    let path = exam
        .file_path
        .ok_or_else(|| ApiError::NotFound("Exam has no paper attached".to_string()))?;

    signed_download(&state, Bucket::ExamPapers, &path).await.map(Json)
}

pub(crate) async fn signed_download(
    state: &AppState,
    bucket: Bucket,
    path: &str,
) -> Result<DownloadResponse, ApiError> {
    let uploads = state.uploads().ok_or_else(|| {
        ApiError::ServiceUnavailable("Object storage is not configured".to_string())
    })?;
    let url = uploads
        .signed_url(bucket, path, None)
        .await
        .ok_or_else(|| ApiError::BadGateway("Failed to create download link".to_string()))?;

    Ok(DownloadResponse { url, expires_in: uploads.settings().signed_url_expire_seconds })
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};

    use crate::db::types::AppRole;
    use crate::repositories::NewExam;
    use crate::test_support::{
        build_test_app, json_request, multipart_request, read_json, MultipartFile, TestApp,
    };

    fn paper() -> MultipartFile<'static> {
        MultipartFile {
            field: "file",
            file_name: "paper.pdf",
            content_type: "application/pdf",
            bytes: b"%PDF-1.7 practice paper",
        }
    }

    async fn admin_tab(ctx: &TestApp) -> (uuid::Uuid, uuid::Uuid) {
        let admin = ctx.register("admin@example.com", "admin123", "Admin User", AppRole::Admin);
        (admin, ctx.signed_in_tab("admin@example.com", "admin123").await)
    }

    #[tokio::test]
    async fn admin_uploads_exam_with_paper() {
        let ctx = build_test_app().await;
        let (admin, handle) = admin_tab(&ctx).await;

        let response = ctx
            .send(multipart_request(
                "/api/v1/exams",
                Some(handle),
                &[("title", "Algebra I"), ("subject", "Mathematics")],
                Some(paper()),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = read_json(response).await;
        let path = body["file_path"].as_str().expect("file path");
        assert!(path.starts_with(&format!("exams/{admin}/")));
        assert!(path.ends_with(".pdf"));
        assert!(ctx.objects.get("exam_papers", path).is_some());
        assert_eq!(
            body["file_url"],
            format!("http://localhost:54321/storage/v1/object/public/exam_papers/{path}")
        );
    }

    #[tokio::test]
    async fn upload_failure_maps_to_bad_gateway() {
        let ctx = build_test_app().await;
        let (_, handle) = admin_tab(&ctx).await;
        ctx.objects.fail_puts(true);

        let response = ctx
            .send(multipart_request(
                "/api/v1/exams",
                Some(handle),
                &[("title", "Algebra I"), ("subject", "Mathematics")],
                Some(paper()),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(ctx.store.list_exams_now().is_empty());
    }

    #[tokio::test]
    async fn student_cannot_create_exam() {
        let ctx = build_test_app().await;
        ctx.register("student@example.com", "student123", "Student User", AppRole::User);
        let handle = ctx.signed_in_tab("student@example.com", "student123").await;

        let response = ctx
            .send(multipart_request(
                "/api/v1/exams",
                Some(handle),
                &[("title", "Algebra I"), ("subject", "Mathematics")],
                None,
            ))
            .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/dashboard");
    }

    #[tokio::test]
    async fn rejects_disallowed_extension() {
        let ctx = build_test_app().await;
        let (_, handle) = admin_tab(&ctx).await;
        let mut file = paper();
        file.file_name = "paper.exe";

        let response = ctx
            .send(multipart_request(
                "/api/v1/exams",
                Some(handle),
                &[("title", "Algebra I"), ("subject", "Mathematics")],
                Some(file),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_removes_row_and_paper() {
        let ctx = build_test_app().await;
        let (_, handle) = admin_tab(&ctx).await;
        let created = ctx
            .send(multipart_request(
                "/api/v1/exams",
                Some(handle),
                &[("title", "Algebra I"), ("subject", "Mathematics")],
                Some(paper()),
            ))
            .await;
        let body = read_json(created).await;
        let id = body["id"].as_str().expect("id").to_string();
        let path = body["file_path"].as_str().expect("path").to_string();

        let response = ctx
            .send(json_request(Method::DELETE, &format!("/api/v1/exams/{id}"), Some(handle), None))
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(ctx.objects.get("exam_papers", &path).is_none());

        let response = ctx
            .send(json_request(Method::GET, &format!("/api/v1/exams/{id}"), Some(handle), None))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn failed_file_removal_fails_the_delete() {
        let ctx = build_test_app().await;
        let (admin, handle) = admin_tab(&ctx).await;
        let exam = ctx
            .store
            .create_exam_now(NewExam {
                title: "Algebra I".to_string(),
                subject: "Mathematics".to_string(),
                description: None,
                file_path: Some("exams/u1/1.pdf".to_string()),
                created_by: admin,
            });
        ctx.objects.fail_removes(true);

        let response = ctx
            .send(json_request(
                Method::DELETE,
                &format!("/api/v1/exams/{}", exam.id),
                Some(handle),
                None,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn download_returns_signed_url() {
        let ctx = build_test_app().await;
        let admin = ctx.register("admin@example.com", "admin123", "Admin User", AppRole::Admin);
        ctx.register("student@example.com", "student123", "Student User", AppRole::User);
        let exam = ctx.store.create_exam_now(NewExam {
            title: "Algebra I".to_string(),
            subject: "Mathematics".to_string(),
            description: None,
            file_path: Some("exams/u1/1.pdf".to_string()),
            created_by: admin,
        });
        let handle = ctx.signed_in_tab("student@example.com", "student123").await;

        let response = ctx
            .send(json_request(
                Method::GET,
                &format!("/api/v1/exams/{}/download", exam.id),
                Some(handle),
                None,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert!(body["url"].as_str().expect("url").contains("exams/u1/1.pdf"));
        assert_eq!(body["expires_in"], 3600);
    }
}
