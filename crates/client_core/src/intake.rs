use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::{
    domain::{EncodedImage, MAX_IMAGE_BYTES},
    error::StudioError,
};
use tracing::{info, warn};

/// Validates and encodes a user-selected image file.
///
/// The size check uses file metadata, so oversized files are rejected before
/// anything is read.
pub async fn load_image_file(path: &Path) -> Result<EncodedImage, StudioError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|err| unreadable(path, &err))?;
    if !metadata.is_file() {
        return Err(StudioError::Validation(format!(
            "'{}' no es un archivo.",
            path.display()
        )));
    }
    if metadata.len() > MAX_IMAGE_BYTES {
        warn!(path = %path.display(), size = metadata.len(), "rejecting oversized image");
        return Err(StudioError::image_too_large());
    }

    let media_type = guess_image_media_type(path)?;
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|err| unreadable(path, &err))?;
    let image = encode_image_bytes(&bytes, &media_type)?;

    info!(path = %path.display(), size = bytes.len(), media_type = %media_type, "loaded original image");
    Ok(image)
}

/// Same rules as [`load_image_file`] for bytes already in memory.
pub fn encode_image_bytes(bytes: &[u8], media_type: &str) -> Result<EncodedImage, StudioError> {
    if bytes.len() as u64 > MAX_IMAGE_BYTES {
        return Err(StudioError::image_too_large());
    }
    if !media_type.starts_with("image/") {
        return Err(not_an_image(media_type));
    }
    Ok(EncodedImage::from_base64(media_type, &STANDARD.encode(bytes)))
}

fn guess_image_media_type(path: &Path) -> Result<String, StudioError> {
    let guess = mime_guess::from_path(path).first();
    match guess {
        Some(mime) if mime.type_() == mime_guess::mime::IMAGE => Ok(mime.essence_str().to_string()),
        Some(mime) => Err(not_an_image(mime.essence_str())),
        None => Err(not_an_image("desconocido")),
    }
}

fn not_an_image(media_type: &str) -> StudioError {
    StudioError::Validation(format!(
        "El archivo seleccionado no es una imagen ({media_type})."
    ))
}

fn unreadable(path: &Path, err: &std::io::Error) -> StudioError {
    StudioError::Validation(format!(
        "No se pudo leer la imagen '{}': {err}",
        path.display()
    ))
}

#[cfg(test)]
#[path = "tests/intake_tests.rs"]
mod tests;
