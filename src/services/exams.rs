use thiserror::Error;
use uuid::Uuid;

use crate::db::models::Exam;
use crate::repositories::{RecordStore, StoreError};
use crate::services::storage::{Bucket, StorageError};
use crate::services::uploads::Uploader;

#[derive(Debug, Error)]
pub(crate) enum DeleteExamError {
    #[error("exam not found")]
    NotFound,
    #[error("failed to delete exam: {0}")]
    Database(#[from] StoreError),
    #[error("exam has a stored paper but object storage is not configured")]
    StorageUnavailable,
    #[error("exam deleted but its file could not be removed: {0}")]
    FileRemoval(String),
}

impl From<StorageError> for DeleteExamError {
    fn from(err: StorageError) -> Self {
        Self::FileRemoval(err.to_string())
    }
}

/// Deletes the exam row, then its stored paper. Succeeds only when both steps do.
///
/// An exam with a paper is left untouched when storage is not configured.
pub(crate) async fn delete_exam(
    records: &dyn RecordStore,
    uploads: Option<&Uploader>,
    exam_id: Uuid,
) -> Result<Exam, DeleteExamError> {
    let exam = records.find_exam(exam_id).await?.ok_or(DeleteExamError::NotFound)?;

    let paper = match exam.file_path.as_deref() {
        Some(path) => Some((path, uploads.ok_or(DeleteExamError::StorageUnavailable)?)),
        None => None,
    };

    if !records.delete_exam(exam_id).await? {
        return Err(DeleteExamError::NotFound);
    }
    tracing::info!(exam_id = %exam_id, "Deleted exam row");

    if let Some((path, uploads)) = paper {
        uploads.remove(Bucket::ExamPapers, path).await?;
        tracing::info!(exam_id = %exam_id, path, "Removed exam paper");
    }

    Ok(exam)
}
