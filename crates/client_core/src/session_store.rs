use std::sync::Arc;

use shared::domain::{EncodedImage, DEFAULT_PROMPT, ORIGINAL_IMAGE_KEY, PROMPT_KEY};
use storage::{KeyValueStore, StorageResult};
use tracing::warn;

/// Mirrors the prompt and the original image into persistent storage.
///
/// Storage faults are logged and otherwise ignored; none of these methods can fail.
/// The generated image is never written.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub async fn load_prompt(&self) -> String {
        match self.backend.get(PROMPT_KEY).await {
            Ok(Some(prompt)) if !prompt.is_empty() => prompt,
            Ok(_) => DEFAULT_PROMPT.to_string(),
            Err(err) => {
                warn!(error = %err, "failed to read prompt from storage");
                DEFAULT_PROMPT.to_string()
            }
        }
    }

    pub async fn load_original_image(&self) -> Option<EncodedImage> {
        match self.backend.get(ORIGINAL_IMAGE_KEY).await {
            Ok(Some(raw)) => {
                let image = EncodedImage::parse(raw);
                if image.is_none() {
                    warn!("ignoring stored original image without a data url envelope");
                }
                image
            }
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "failed to read image from storage");
                None
            }
        }
    }

    pub async fn save_prompt(&self, prompt: &str) {
        if let Err(err) = self.try_save_prompt(prompt).await {
            warn!(error = %err, "failed to save prompt to storage");
        }
    }

    pub async fn save_original_image(&self, image: Option<&EncodedImage>) {
        if let Err(err) = self.try_save_original_image(image).await {
            warn!(error = %err, "failed to save image to storage (likely quota exceeded)");
        }
    }

    async fn try_save_prompt(&self, prompt: &str) -> StorageResult<()> {
        self.backend.set(PROMPT_KEY, prompt).await
    }

    async fn try_save_original_image(&self, image: Option<&EncodedImage>) -> StorageResult<()> {
        match image {
            Some(image) => self.backend.set(ORIGINAL_IMAGE_KEY, image.as_str()).await,
            None => self.backend.remove(ORIGINAL_IMAGE_KEY).await,
        }
    }
}

#[cfg(test)]
#[path = "tests/session_store_tests.rs"]
mod tests;
