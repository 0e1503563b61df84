//! Test fixtures: media bytes and upload forms.

use axum_test::multipart::{MultipartForm, Part};
use bytes::Bytes;
use uuid::Uuid;

/// Deterministic pseudo-media of `len` bytes.
pub fn media_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub fn file_part(data: Vec<u8>) -> Part {
    Part::bytes(Bytes::from(data))
        .file_name("clip.mp4")
        .mime_type("video/mp4")
}

/// Private upload form.
pub fn upload_form(title: &str, data: Vec<u8>) -> MultipartForm {
    MultipartForm::new()
        .add_text("title", title.to_string())
        .add_text("description", "integration test upload")
        .add_part("file", file_part(data))
}

pub fn public_upload_form(title: &str, data: Vec<u8>) -> MultipartForm {
    upload_form(title, data).add_text("is_public", "true")
}

pub fn shared_upload_form(title: &str, data: Vec<u8>, users: &[Uuid]) -> MultipartForm {
    let allowed = serde_json::to_string(users).expect("serialize allowed users");
    upload_form(title, data).add_text("allowed_users", allowed)
}

/// Form holding only a replacement file.
pub fn replacement_form(data: Vec<u8>) -> MultipartForm {
    MultipartForm::new().add_part("file", file_part(data))
}
