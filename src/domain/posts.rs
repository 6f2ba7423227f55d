//! Validation rules for user-authored content.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::domain::error::DomainError;

pub const MAX_POST_TEXT_CHARS: usize = 20_000;
pub const MAX_COMMENT_TEXT_CHARS: usize = 4_000;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const DISPLAY_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[day padding:none] [month repr:long] [year] [hour]:[minute]");

/// Normalizes post body text: trims outer whitespace and rejects
/// empty or oversized input.
pub fn validate_post_text(text: &str) -> Result<String, DomainError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("post text must not be empty"));
    }
    if trimmed.chars().count() > MAX_POST_TEXT_CHARS {
        return Err(DomainError::validation(format!(
            "post text exceeds {MAX_POST_TEXT_CHARS} characters"
        )));
    }
    Ok(trimmed.to_owned())
}

pub fn validate_comment_text(text: &str) -> Result<String, DomainError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("comment text must not be empty"));
    }
    if trimmed.chars().count() > MAX_COMMENT_TEXT_CHARS {
        return Err(DomainError::validation(format!(
            "comment text exceeds {MAX_COMMENT_TEXT_CHARS} characters"
        )));
    }
    Ok(trimmed.to_owned())
}

/// Checks that an uploaded file is a decodable raster image within the
/// size limit and returns its canonical extension.
pub fn validate_image_upload(bytes: &[u8]) -> Result<&'static str, DomainError> {
    if bytes.is_empty() {
        return Err(DomainError::validation("image upload is empty"));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(DomainError::validation("image upload is too large"));
    }
    let kind = imagesize::image_type(bytes)
        .map_err(|_| DomainError::validation("upload is not a recognized image"))?;
    let extension = match kind {
        imagesize::ImageType::Png => "png",
        imagesize::ImageType::Jpeg => "jpg",
        imagesize::ImageType::Gif => "gif",
        imagesize::ImageType::Webp => "webp",
        _ => return Err(DomainError::validation("unsupported image format")),
    };
    Ok(extension)
}

/// Renders a timestamp the way templates show publication dates,
/// e.g. "14 January 2025 09:30".
pub fn format_display_date(moment: OffsetDateTime) -> String {
    moment
        .format(DISPLAY_FORMAT)
        .unwrap_or_else(|_| moment.to_string())
}
