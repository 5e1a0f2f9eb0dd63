use std::path::{Path, PathBuf};

use shared::{
    domain::{EncodedImage, Status, DEFAULT_PROMPT},
    error::{StudioError, UserError},
};
use tracing::debug;

use crate::{
    export::{self, ExportError},
    generation::TransformationClient,
    intake,
    session::{transition, Effect, Event, Session, Transition},
    session_store::SessionStore,
};

/// A generation request that has been started but not completed.
#[derive(Debug, Clone)]
pub struct PendingGeneration {
    pub image: EncodedImage,
    pub prompt: String,
}

/// Drives one editing session: routes user actions through the session state
/// machine and runs the resulting effects.
pub struct Studio {
    session: Session,
    store: SessionStore,
    client: TransformationClient,
}

impl Studio {
    /// Restores the prompt and original image from the store.
    pub async fn open(store: SessionStore, client: TransformationClient) -> Self {
        let prompt = store.load_prompt().await;
        let original_image = store.load_original_image().await;
        Self {
            session: Session::new(prompt, original_image),
            store,
            client,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn status(&self) -> Status {
        self.session.status
    }

    pub fn client(&self) -> &TransformationClient {
        &self.client
    }

    pub async fn select_file(&mut self, path: &Path) -> Result<(), StudioError> {
        let loaded = intake::load_image_file(path).await;
        self.accept_intake(loaded).await
    }

    pub async fn load_image_bytes(
        &mut self,
        bytes: &[u8],
        media_type: &str,
    ) -> Result<(), StudioError> {
        let loaded = intake::encode_image_bytes(bytes, media_type);
        self.accept_intake(loaded).await
    }

    pub async fn edit_prompt(&mut self, prompt: impl Into<String>) {
        self.dispatch(Event::PromptEdited(prompt.into())).await;
    }

    pub async fn reset_prompt(&mut self) {
        self.edit_prompt(DEFAULT_PROMPT).await;
    }

    pub async fn clear_image(&mut self) {
        self.dispatch(Event::ImageCleared).await;
    }

    /// Runs one transformation if the session allows it and returns the
    /// resulting status. Failures end up in `session().error`.
    pub async fn generate(&mut self) -> Status {
        let Some(pending) = self.begin_generation().await else {
            debug!(status = %self.session.status, "generate ignored");
            return self.session.status;
        };

        let outcome = self.client.transform(&pending.image, &pending.prompt).await;
        self.finish_generation(outcome).await
    }

    /// Moves the session to `Processing` and hands back the request to run,
    /// or `None` when generation is not allowed right now.
    pub async fn begin_generation(&mut self) -> Option<PendingGeneration> {
        self.dispatch(Event::GenerateRequested)
            .await
            .map(|(image, prompt)| PendingGeneration { image, prompt })
    }

    /// Applies the outcome of a request started by [`Studio::begin_generation`],
    /// whatever the user did in the meantime.
    pub async fn finish_generation(
        &mut self,
        outcome: Result<EncodedImage, StudioError>,
    ) -> Status {
        let completion = match outcome {
            Ok(generated) => Event::GenerationSucceeded(generated),
            Err(err) => Event::GenerationFailed(err.into()),
        };
        self.dispatch(completion).await;
        self.session.status
    }

    /// True when the stored original matches the one in memory.
    pub async fn original_persisted(&self) -> bool {
        self.store.load_original_image().await == self.session.original_image
    }

    pub async fn export_result(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let image = self
            .session
            .generated_image
            .as_ref()
            .ok_or(ExportError::NothingToExport)?;
        export::export_image(image, dir).await
    }

    async fn accept_intake(
        &mut self,
        loaded: Result<EncodedImage, StudioError>,
    ) -> Result<(), StudioError> {
        match loaded {
            Ok(image) => {
                self.dispatch(Event::FileLoaded(image)).await;
                Ok(())
            }
            Err(err) => {
                self.dispatch(Event::FileRejected(UserError::from(err.clone())))
                    .await;
                Err(err)
            }
        }
    }

    /// Applies the event, then persists what changed. Returns the generation
    /// request when the transition started one.
    async fn dispatch(&mut self, event: Event) -> Option<(EncodedImage, String)> {
        let name = event.name();
        let Transition { session, effects } = transition(std::mem::take(&mut self.session), event);
        self.session = session;
        debug!(event = name, status = %self.session.status, effects = effects.len(), "session transition");

        let mut generation = None;
        for effect in effects {
            match effect {
                Effect::SavePrompt(prompt) => self.store.save_prompt(&prompt).await,
                Effect::SaveOriginalImage(image) => {
                    self.store.save_original_image(image.as_ref()).await
                }
                Effect::StartGeneration { image, prompt } => generation = Some((image, prompt)),
            }
        }
        generation
    }
}

#[cfg(test)]
#[path = "tests/studio_tests.rs"]
mod tests;
