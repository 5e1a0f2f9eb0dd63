use std::fmt;

use serde::{Deserialize, Serialize};

/// Largest image accepted at intake, measured before encoding.
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

pub const DEFAULT_PROMPT: &str = "Cambia la modelo por una modelo de talla más grande (Plus Size). Respeta estrictamente el estampado y el diseño de la ropa, es lo más importante. Transforma la imagen para que parezca una selfie tomada frente a un espejo, mostrando el teléfono si es natural. Cambia el fondo a una boutique de ropa minimalista y elegante.";

pub const STORAGE_NAMESPACE: &str = "modamatch_";
pub const PROMPT_KEY: &str = "modamatch_prompt";
pub const ORIGINAL_IMAGE_KEY: &str = "modamatch_original_image";

pub const RESULT_FILENAME: &str = "modamatch-result.png";

pub const FALLBACK_MEDIA_TYPE: &str = "image/jpeg";
pub const GENERATED_MEDIA_TYPE: &str = "image/png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Idle,
    Processing,
    Success,
    Error,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Idle => "idle",
            Status::Processing => "processing",
            Status::Success => "success",
            Status::Error => "error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An image carried as a `data:<media-type>;base64,<payload>` string.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedImage(String);

impl EncodedImage {
    /// Wraps a raw data URL without validating it.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Accepts only values carrying a `data:` envelope.
    pub fn parse(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.starts_with("data:") {
            Some(Self(raw))
        } else {
            None
        }
    }

    pub fn from_base64(media_type: &str, payload: &str) -> Self {
        Self(format!("data:{media_type};base64,{payload}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Declared media type of the envelope, `image/jpeg` when the envelope is
    /// missing or malformed.
    pub fn media_type(&self) -> &str {
        self.0
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(';'))
            .map(|(media_type, _)| media_type)
            .filter(|media_type| !media_type.is_empty())
            .unwrap_or(FALLBACK_MEDIA_TYPE)
    }

    /// Base64 payload with a `data:image/<word>;base64,` envelope removed.
    /// Anything else is returned untouched.
    pub fn payload(&self) -> &str {
        strip_image_envelope(&self.0).unwrap_or(&self.0)
    }
}

fn strip_image_envelope(raw: &str) -> Option<&str> {
    let rest = raw.strip_prefix("data:image/")?;
    let subtype_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    if subtype_len == 0 {
        return None;
    }
    rest[subtype_len..].strip_prefix(";base64,")
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("media_type", &self.media_type())
            .field("encoded_len", &self.0.len())
            .finish()
    }
}
