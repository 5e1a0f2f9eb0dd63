use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::domain::{EncodedImage, RESULT_FILENAME};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("there is no generated image to export")]
    NothingToExport,
    #[error("generated image payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes the image into `dir` under the fixed result filename.
pub async fn export_image(image: &EncodedImage, dir: &Path) -> Result<PathBuf, ExportError> {
    export_image_as(image, &dir.join(RESULT_FILENAME)).await
}

/// Writes the decoded payload byte for byte; nothing is re-encoded.
pub async fn export_image_as(image: &EncodedImage, path: &Path) -> Result<PathBuf, ExportError> {
    let bytes = STANDARD.decode(image.payload())?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| ExportError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(path, &bytes)
        .await
        .map_err(|source| ExportError::Write {
            path: path.to_path_buf(),
            source,
        })?;

    info!(path = %path.display(), size = bytes.len(), "exported generated image");
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    use base64::Engine as _;

    #[tokio::test]
    async fn writes_decoded_payload_under_fixed_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let image = EncodedImage::from_base64("image/png", &STANDARD.encode(b"\x89PNG\r\n"));

        let path = export_image(&image, dir.path()).await.expect("export");

        assert_eq!(path, dir.path().join("modamatch-result.png"));
        assert_eq!(std::fs::read(&path).expect("read"), b"\x89PNG\r\n");
    }

    #[tokio::test]
    async fn creates_missing_output_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("out").join("custom.png");
        let image = EncodedImage::new("data:image/png;base64,AAAA");

        export_image_as(&image, &target).await.expect("export");
        assert_eq!(std::fs::read(&target).expect("read"), vec![0, 0, 0]);
    }

    #[tokio::test]
    async fn invalid_payload_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let image = EncodedImage::new("data:image/png;base64,@@@");
        let err = export_image(&image, dir.path()).await.expect_err("bad base64");
        assert!(matches!(err, ExportError::Decode(_)));
    }
}
