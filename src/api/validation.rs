use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::config::StorageSettings;
use crate::services::uploads::{file_extension, UploadFile};

pub(crate) fn validate_payload(payload: &impl Validate) -> Result<(), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Checks the extension against the allow-list and the size against the configured cap.
pub(crate) fn validate_upload(file: &UploadFile, settings: &StorageSettings) -> Result<(), ApiError> {
    let extension = file_extension(&file.file_name)
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| ApiError::BadRequest("File must have an extension".to_string()))?;

    if !settings.allowed_upload_extensions.iter().any(|allowed| allowed == &extension) {
        return Err(ApiError::BadRequest(format!("File extension '{extension}' is not allowed")));
    }

    if file.bytes.is_empty() {
        return Err(ApiError::BadRequest("File is empty".to_string()));
    }

    if file.bytes.len() as u64 > max_upload_bytes(settings) {
        return Err(ApiError::BadRequest(format!(
            "File size exceeds {}MB limit",
            settings.max_upload_size_mb
        )));
    }

    Ok(())
}

pub(crate) fn max_upload_bytes(settings: &StorageSettings) -> u64 {
    settings.max_upload_size_mb * 1024 * 1024
}
