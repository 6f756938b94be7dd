use std::collections::HashMap;

use axum::extract::Multipart;

use crate::api::errors::ApiError;
use crate::services::uploads::UploadFile;

/// Text fields plus the optional `file` part of a multipart form.
#[derive(Debug, Default)]
pub(crate) struct UploadForm {
    pub(crate) fields: HashMap<String, String>,
    pub(crate) file: Option<UploadFile>,
}

impl UploadForm {
    pub(crate) fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
    }
}

pub(crate) async fn read_upload_form(
    mut multipart: Multipart,
    max_bytes: u64,
    max_upload_size_mb: u64,
) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            let Some(file_name) = field.file_name().map(str::to_string) else {
                continue;
            };
            let content_type = field.content_type().map(str::to_string);
            let mut bytes = Vec::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
            {
                if bytes.len() as u64 + chunk.len() as u64 > max_bytes {
                    return Err(ApiError::BadRequest(format!(
                        "File size exceeds {max_upload_size_mb}MB limit"
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }
            if !file_name.is_empty() {
                form.file = Some(UploadFile { file_name, content_type, bytes });
            }
        } else {
            let text = field
                .text()
                .await
                .map_err(|_| ApiError::BadRequest(format!("Invalid value for '{name}'")))?;
            form.fields.insert(name, text);
        }
    }

    Ok(form)
}
