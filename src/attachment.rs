//! Attachment constraints and storage.
//!
//! Review attachments: pdf/txt/jpg up to 1 MiB, with optional descriptive
//! metadata (title, keywords, description). Profile images: jpg only, up
//! to 5 MiB. Files land in the configured media directory under a random
//! name; the stored filename is the retrievable reference.

use actix_multipart::Field;
use futures_util::TryStreamExt;
use std::path::Path;
use thiserror::Error;

/// Extensions accepted for review attachments.
pub const REVIEW_EXTENSIONS: &[&str] = &["pdf", "txt", "jpg"];
/// Maximum review attachment size in bytes (1 MiB).
pub const REVIEW_MAX_BYTES: usize = 1024 * 1024;
/// Maximum profile image size in bytes (5 MiB).
pub const PROFILE_IMAGE_MAX_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file too large (limit {limit} bytes)")]
    TooLarge { limit: usize },

    #[error("file must be one of: {allowed}")]
    BadExtension { allowed: String },

    #[error("uploaded file has no name")]
    MissingFilename,

    #[error("upload stream error: {0}")]
    Stream(String),

    #[error("could not store file")]
    Io(#[from] std::io::Error),
}

/// Lowercased extension of a filename, if it has one.
pub fn file_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

fn check(
    filename: &str,
    size: usize,
    allowed: &[&str],
    limit: usize,
) -> Result<String, UploadError> {
    if size > limit {
        return Err(UploadError::TooLarge { limit });
    }
    match file_extension(filename) {
        Some(ext) if allowed.contains(&ext.as_str()) => Ok(ext),
        _ => Err(UploadError::BadExtension {
            allowed: allowed.join(", "),
        }),
    }
}

/// Validate a review attachment, returning its extension.
pub fn validate_review_upload(filename: &str, size: usize) -> Result<String, UploadError> {
    check(filename, size, REVIEW_EXTENSIONS, REVIEW_MAX_BYTES)
}

/// Validate a profile image, returning its extension.
pub fn validate_profile_image(filename: &str, size: usize) -> Result<String, UploadError> {
    check(filename, size, &["jpg"], PROFILE_IMAGE_MAX_BYTES)
}

/// Normalize a comma-separated keyword list: trim each entry, drop empties.
pub fn normalize_keywords(raw: &str) -> String {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Drain a multipart field into memory, bailing out as soon as the size
/// limit is crossed rather than buffering the whole stream first.
pub async fn read_field_bytes(field: &mut Field, limit: usize) -> Result<Vec<u8>, UploadError> {
    let mut data = Vec::new();
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| UploadError::Stream(e.to_string()))?
    {
        if data.len() + chunk.len() > limit {
            return Err(UploadError::TooLarge { limit });
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

/// Write bytes to the media directory under a random name, returning the
/// stored filename.
pub fn save_bytes(media_dir: &str, extension: &str, bytes: &[u8]) -> Result<String, UploadError> {
    std::fs::create_dir_all(media_dir)?;
    let filename = format!("{}.{}", uuid::Uuid::new_v4(), extension);
    std::fs::write(Path::new(media_dir).join(&filename), bytes)?;
    Ok(filename)
}

/// Best-effort removal of a stored file.
pub fn remove_file(media_dir: &str, filename: &str) {
    if let Err(e) = std::fs::remove_file(Path::new(media_dir).join(filename)) {
        log::warn!("could not remove media file {}: {}", filename, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_extraction() {
        assert_eq!(file_extension("notes.PDF"), Some("pdf".to_string()));
        assert_eq!(file_extension("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(file_extension("no_extension"), None);
        assert_eq!(file_extension("trailing."), None);
    }

    #[test]
    fn review_upload_accepts_allowed_types_within_limit() {
        assert!(validate_review_upload("book.pdf", 1024).is_ok());
        assert!(validate_review_upload("notes.txt", REVIEW_MAX_BYTES).is_ok());
        assert!(validate_review_upload("cover.JPG", 500_000).is_ok());
    }

    #[test]
    fn review_upload_rejects_wrong_type_and_oversize() {
        assert!(matches!(
            validate_review_upload("malware.exe", 10),
            Err(UploadError::BadExtension { .. })
        ));
        assert!(matches!(
            validate_review_upload("book.pdf", REVIEW_MAX_BYTES + 1),
            Err(UploadError::TooLarge { .. })
        ));
        assert!(matches!(
            validate_review_upload("noext", 10),
            Err(UploadError::BadExtension { .. })
        ));
    }

    #[test]
    fn profile_image_is_jpg_only() {
        assert!(validate_profile_image("me.jpg", 1024).is_ok());
        assert!(matches!(
            validate_profile_image("me.png", 1024),
            Err(UploadError::BadExtension { .. })
        ));
        assert!(matches!(
            validate_profile_image("me.jpg", PROFILE_IMAGE_MAX_BYTES + 1),
            Err(UploadError::TooLarge { .. })
        ));
    }

    #[test]
    fn keyword_normalization() {
        assert_eq!(
            normalize_keywords(" fiction , mystery ,, thriller "),
            "fiction,mystery,thriller"
        );
        assert_eq!(normalize_keywords(""), "");
        assert_eq!(normalize_keywords(" , , "), "");
    }

    #[test]
    fn save_and_remove_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let media_dir = dir.path().to_str().expect("utf-8 path");

        let name = save_bytes(media_dir, "txt", b"hello").expect("save");
        assert!(name.ends_with(".txt"));
        let stored = std::fs::read(dir.path().join(&name)).expect("read back");
        assert_eq!(stored, b"hello");

        remove_file(media_dir, &name);
        assert!(!dir.path().join(&name).exists());
    }
}
