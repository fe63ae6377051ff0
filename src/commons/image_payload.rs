use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ImagePayloadError {
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("image payload is empty")]
    Empty,
    #[error("invalid base64 image: {0}")]
    InvalidEncoding(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Accepts `image/jpeg`, `image/jpg` and `image/png`, ignoring parameters.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/png" => Some(ImageFormat::Png),
            _ => None,
        }
    }

    /// Detect the format from the file signature.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageFormat::Png)
        } else {
            None
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

/// An uploaded face image restricted to JPEG or PNG.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

impl ImagePayload {
    /// Build a payload from a raw request body and its `Content-Type` header.
    pub fn from_upload(content_type: Option<&str>, bytes: Vec<u8>) -> Result<Self, ImagePayloadError> {
        let content_type = content_type.unwrap_or_default();
        let format = ImageFormat::from_content_type(content_type)
            .ok_or_else(|| ImagePayloadError::UnsupportedMediaType(content_type.to_string()))?;

        if bytes.is_empty() {
            return Err(ImagePayloadError::Empty);
        }

        Ok(Self { format, bytes })
    }

    /// Decode `data:image/png;base64,...` or bare base64 (format sniffed).
    pub fn from_data_uri(value: &str) -> Result<Self, ImagePayloadError> {
        let value = value.trim();

        let (declared, encoded) = match value.strip_prefix("data:") {
            Some(rest) => {
                let (header, data) = rest
                    .split_once(',')
                    .ok_or_else(|| ImagePayloadError::InvalidEncoding("missing ',' in data URI".into()))?;
                let mime = header.trim_end_matches(";base64");
                let format = ImageFormat::from_content_type(mime)
                    .ok_or_else(|| ImagePayloadError::UnsupportedMediaType(mime.to_string()))?;
                (Some(format), data)
            }
            None => (None, value),
        };

        if encoded.is_empty() {
            return Err(ImagePayloadError::Empty);
        }

        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| ImagePayloadError::InvalidEncoding(e.to_string()))?;

        if bytes.is_empty() {
            return Err(ImagePayloadError::Empty);
        }

        let format = match declared {
            Some(format) => format,
            None => ImageFormat::sniff(&bytes)
                .ok_or_else(|| ImagePayloadError::UnsupportedMediaType("unknown".to_string()))?,
        };

        Ok(Self { format, bytes })
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.format.mime(), STANDARD.encode(&self.bytes))
    }
}
