use std::{sync::Arc, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared::{
    domain::{EncodedImage, GENERATED_MEDIA_TYPE},
    error::StudioError,
    protocol::{GenerateContentRequest, GenerateContentResponse, ServiceErrorEnvelope},
};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::config::Settings;

/// A failed exchange with the generation service.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportFault {
    pub status: Option<u16>,
    pub message: String,
}

impl TransportFault {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait GenerationTransport: Send + Sync {
    async fn generate_content(
        &self,
        api_key: &str,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, TransportFault>;
}

/// REST transport for `models/{model}:generateContent`.
pub struct GeminiHttpTransport {
    http: Client,
    api_base: Url,
}

impl GeminiHttpTransport {
    pub fn new(api_base: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut base = api_base.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let api_base =
            Url::parse(&base).with_context(|| format!("invalid generation api base '{api_base}'"))?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("failed to build http client")?;

        Ok(Self { http, api_base })
    }

    fn endpoint(&self, model: &str) -> Result<Url, TransportFault> {
        self.api_base
            .join(&format!("v1beta/models/{model}:generateContent"))
            .map_err(|err| TransportFault::new(None, format!("invalid model endpoint: {err}")))
    }
}

#[async_trait]
impl GenerationTransport for GeminiHttpTransport {
    async fn generate_content(
        &self,
        api_key: &str,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, TransportFault> {
        let response = self
            .http
            .post(self.endpoint(model)?)
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await
            .map_err(|err| TransportFault::new(None, err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportFault::new(
                Some(status.as_u16()),
                service_error_message(status, &body),
            ));
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|err| {
                TransportFault::new(
                    Some(status.as_u16()),
                    format!("invalid generation response: {err}"),
                )
            })
    }
}

fn service_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ServiceErrorEnvelope>(body) {
        if let Some(message) = envelope.error.message.filter(|m| !m.trim().is_empty()) {
            return message;
        }
    }
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {body}")
    }
}

/// Turns an image plus an instruction into a generated image with one service call.
pub struct TransformationClient {
    transport: Arc<dyn GenerationTransport>,
    api_key: Option<String>,
    model: String,
}

impl TransformationClient {
    pub fn new(settings: &Settings, transport: Arc<dyn GenerationTransport>) -> Self {
        Self {
            transport,
            api_key: settings.api_key().map(str::to_string),
            model: settings.model.clone(),
        }
    }

    /// Client backed by the REST transport described by `settings`.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let transport =
            GeminiHttpTransport::new(&settings.api_base, settings.request_timeout())?;
        Ok(Self::new(settings, Arc::new(transport)))
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn transform(
        &self,
        image: &EncodedImage,
        prompt: &str,
    ) -> Result<EncodedImage, StudioError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(StudioError::missing_api_key());
        };

        let request =
            GenerateContentRequest::instruction_with_image(prompt, image.media_type(), image.payload());

        info!(
            model = %self.model,
            media_type = image.media_type(),
            prompt_len = prompt.len(),
            "requesting image transformation"
        );

        let response = match self
            .transport
            .generate_content(api_key, &self.model, &request)
            .await
        {
            Ok(response) => response,
            Err(fault) => {
                error!(status = ?fault.status, error = %fault, "generation service call failed");
                return Err(StudioError::transport(fault.message));
            }
        };

        extract_generated_image(&response).ok_or_else(|| {
            error!(
                candidates = response.candidates.len(),
                "generation service returned no image"
            );
            StudioError::EmptyResult
        })
    }
}

/// First inline image of the first candidate, always tagged as PNG.
pub fn extract_generated_image(response: &GenerateContentResponse) -> Option<EncodedImage> {
    let content = response.candidates.first()?.content.as_ref()?;
    content
        .parts
        .iter()
        .filter_map(|part| part.inline_data.as_ref())
        .find(|inline| !inline.data.is_empty())
        .map(|inline| EncodedImage::from_base64(GENERATED_MEDIA_TYPE, &inline.data))
}

#[cfg(test)]
#[path = "tests/generation_tests.rs"]
mod tests;
