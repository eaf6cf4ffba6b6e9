//! Photo payload decoding
//!
//! Kiosks send the captured frame as a data URI:
//! `data:image/jpeg;base64,/9j/4AAQSk...`

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("image must be a data URI starting with 'data:'")]
    NotDataUri,

    #[error("image data URI must be base64 encoded")]
    NotBase64,

    #[error("unsupported image type '{0}'")]
    UnsupportedType(String),

    #[error("image payload is empty")]
    Empty,

    #[error("image payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// Decoded photo bytes with their declared MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoPayload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PhotoPayload {
    pub fn from_data_uri(uri: &str) -> Result<Self, PhotoError> {
        let rest = uri.trim().strip_prefix("data:").ok_or(PhotoError::NotDataUri)?;
        let (meta, payload) = rest.split_once(',').ok_or(PhotoError::NotDataUri)?;

        let mut params = meta.split(';');
        let content_type = params.next().unwrap_or("").trim().to_ascii_lowercase();
        if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
            return Err(PhotoError::NotBase64);
        }
        if !content_type.starts_with("image/") || content_type.len() <= "image/".len() {
            return Err(PhotoError::UnsupportedType(content_type));
        }

        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        if compact.is_empty() {
            return Err(PhotoError::Empty);
        }

        let bytes = STANDARD.decode(compact.as_bytes())?;
        if bytes.is_empty() {
            return Err(PhotoError::Empty);
        }

        Ok(Self {
            content_type,
            bytes,
        })
    }
}

/// File extension for an `image/*` MIME type
pub fn extension_for(content_type: &str) -> &str {
    let subtype = content_type
        .split_once('/')
        .map(|(_, sub)| sub)
        .unwrap_or("");
    let subtype = subtype.split('+').next().unwrap_or("");
    match subtype {
        "jpeg" | "jpg" | "pjpeg" => "jpg",
        "png" => "png",
        "webp" => "webp",
        "gif" => "gif",
        "bmp" => "bmp",
        "svg" => "svg",
        _ => "img",
    }
}
