//! Multipart parsing for asset uploads

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use std::collections::HashSet;
use streamsure_core::models::Visibility;
use streamsure_core::AppError;
use uuid::Uuid;

use crate::services::{Submission, UploadedFile};

/// Form fields of a submission before validation.
#[derive(Debug, Default)]
struct SubmissionForm {
    file: Option<UploadedFile>,
    title: Option<String>,
    description: Option<String>,
    is_public: Option<String>,
    allowed_users: Option<String>,
}

/// Body-limit failures surface as 413, everything else as a malformed form.
fn multipart_error(context: &str, e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("{}: {}", context, e.body_text()))
    } else {
        AppError::InvalidInput(format!("{}: {}", context, e.body_text()))
    }
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| multipart_error("Failed to read form field", e))
}

async fn read_file(field: axum::extract::multipart::Field<'_>) -> Result<UploadedFile, AppError> {
    let filename = field
        .file_name()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "upload.bin".to_string());
    let content_type = field
        .content_type()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let data = field
        .bytes()
        .await
        .map_err(|e| multipart_error("Failed to read file data", e))?;
    Ok(UploadedFile {
        data: data.to_vec(),
        filename,
        content_type,
    })
}

async fn collect_form(mut multipart: Multipart) -> Result<SubmissionForm, AppError> {
    let mut form = SubmissionForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Failed to read multipart", e))?
    {
        let name = field.name().map(|s| s.to_string()).unwrap_or_default();
        match name.as_str() {
            "file" => {
                if form.file.is_some() {
                    return Err(AppError::InvalidInput(
                        "Multiple file fields are not allowed; send exactly one field named 'file'"
                            .to_string(),
                    ));
                }
                form.file = Some(read_file(field).await?);
            }
            "title" => form.title = Some(read_text(field).await?),
            "description" => form.description = Some(read_text(field).await?),
            "is_public" => form.is_public = Some(read_text(field).await?),
            "allowed_users" => form.allowed_users = Some(read_text(field).await?),
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    Ok(form)
}

fn parse_allowed_users(raw: &str) -> Result<HashSet<Uuid>, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(HashSet::new());
    }
    serde_json::from_str::<Vec<Uuid>>(raw)
        .map(|users| users.into_iter().collect())
        .map_err(|_| {
            AppError::InvalidInput("allowed_users must be a JSON array of UUIDs".to_string())
        })
}

fn parse_flag(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("true")
}

fn required_file(file: Option<UploadedFile>) -> Result<UploadedFile, AppError> {
    file.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))
}

/// Parse the submission form: `file`, `title`, `description?`, `is_public?`,
/// `allowed_users?` (JSON array).
pub async fn extract_submission(multipart: Multipart) -> Result<Submission, AppError> {
    let form = collect_form(multipart).await?;

    let visibility = Visibility {
        is_public: form.is_public.as_deref().map(parse_flag).unwrap_or(false),
        allowed_users: form
            .allowed_users
            .as_deref()
            .map(parse_allowed_users)
            .transpose()?
            .unwrap_or_default(),
    };

    Ok(Submission {
        title: form
            .title
            .ok_or_else(|| AppError::InvalidInput("Title is required".to_string()))?,
        description: form.description.unwrap_or_default(),
        visibility,
        file: required_file(form.file)?,
    })
}

/// Parse a content replacement form; only `file` is read.
pub async fn extract_file(multipart: Multipart) -> Result<UploadedFile, AppError> {
    required_file(collect_form(multipart).await?.file)
}
