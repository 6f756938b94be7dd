use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::core::time::format_offset;
use crate::db::models::Exam;
use crate::services::storage::Bucket;
use crate::services::uploads::Uploader;

/// Text fields of the multipart exam form.
#[derive(Debug, Validate)]
pub(crate) struct ExamCreate {
    #[validate(length(min = 1, max = 200, message = "title must not be empty"))]
    pub(crate) title: String,
    #[validate(length(min = 1, max = 100, message = "subject must not be empty"))]
    pub(crate) subject: String,
    #[validate(length(max = 5000, message = "description is too long"))]
    pub(crate) description: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: Uuid,
    pub(crate) title: String,
    pub(crate) subject: String,
    pub(crate) description: Option<String>,
    pub(crate) file_path: Option<String>,
    /// Public link to the paper; absent without storage or a paper.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) file_url: Option<String>,
    pub(crate) created_by: Uuid,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl ExamResponse {
    pub(crate) fn from_db(exam: Exam) -> Self {
        Self {
            id: exam.id,
            title: exam.title,
            subject: exam.subject,
            description: exam.description,
            file_path: exam.file_path,
            file_url: None,
            created_by: exam.created_by,
            created_at: format_offset(exam.created_at),
            updated_at: format_offset(exam.updated_at),
        }
    }

    pub(crate) fn with_file_url(mut self, uploads: Option<&Uploader>) -> Self {
        self.file_url = match (self.file_path.as_deref(), uploads) {
            (Some(path), Some(uploads)) => Some(uploads.public_url(Bucket::ExamPapers, path)),
            _ => None,
        };
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct DownloadResponse {
    pub(crate) url: String,
    pub(crate) expires_in: u64,
}
