//! Session state and its transition function.
//!
//! `transition` is pure: it returns the next session plus the effects the
//! caller must run once the new state is in place.

use shared::{
    domain::{EncodedImage, Status, DEFAULT_PROMPT},
    error::UserError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub prompt: String,
    pub original_image: Option<EncodedImage>,
    pub generated_image: Option<EncodedImage>,
    pub status: Status,
    pub error: Option<UserError>,
    /// A generation call has been started and has not completed yet. Stays set
    /// when a new file or prompt moves the status away from `Processing`.
    pub in_flight: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT, None)
    }
}

impl Session {
    pub fn new(prompt: impl Into<String>, original_image: Option<EncodedImage>) -> Self {
        Self {
            prompt: prompt.into(),
            original_image,
            generated_image: None,
            status: Status::Idle,
            error: None,
            in_flight: false,
        }
    }

    pub fn can_generate(&self) -> bool {
        self.original_image.is_some() && self.status != Status::Processing && !self.in_flight
    }

    pub fn can_export(&self) -> bool {
        self.generated_image.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    FileLoaded(EncodedImage),
    FileRejected(UserError),
    PromptEdited(String),
    GenerateRequested,
    GenerationSucceeded(EncodedImage),
    GenerationFailed(UserError),
    ImageCleared,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::FileLoaded(_) => "file_loaded",
            Event::FileRejected(_) => "file_rejected",
            Event::PromptEdited(_) => "prompt_edited",
            Event::GenerateRequested => "generate_requested",
            Event::GenerationSucceeded(_) => "generation_succeeded",
            Event::GenerationFailed(_) => "generation_failed",
            Event::ImageCleared => "image_cleared",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SavePrompt(String),
    /// `None` removes the persisted image.
    SaveOriginalImage(Option<EncodedImage>),
    StartGeneration {
        image: EncodedImage,
        prompt: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub session: Session,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn unchanged(session: Session) -> Self {
        Self {
            session,
            effects: Vec::new(),
        }
    }
}

pub fn transition(mut session: Session, event: Event) -> Transition {
    let mut effects = Vec::new();

    match event {
        Event::FileLoaded(image) => {
            let changed = session.original_image.as_ref() != Some(&image);
            session.original_image = Some(image.clone());
            session.generated_image = None;
            session.error = None;
            session.status = Status::Idle;
            if changed {
                effects.push(Effect::SaveOriginalImage(Some(image)));
            }
        }
        Event::FileRejected(error) => {
            session.error = Some(error);
        }
        Event::PromptEdited(prompt) => {
            if prompt == session.prompt {
                return Transition::unchanged(session);
            }
            session.prompt = prompt.clone();
            if matches!(session.status, Status::Success | Status::Error) {
                session.status = Status::Idle;
                session.generated_image = None;
                session.error = None;
            }
            effects.push(Effect::SavePrompt(prompt));
        }
        Event::GenerateRequested => {
            let Some(image) = session.original_image.clone() else {
                return Transition::unchanged(session);
            };
            if session.status == Status::Processing || session.in_flight {
                return Transition::unchanged(session);
            }
            session.status = Status::Processing;
            session.in_flight = true;
            session.error = None;
            effects.push(Effect::StartGeneration {
                image,
                prompt: session.prompt.clone(),
            });
        }
        Event::GenerationSucceeded(image) => {
            if !session.in_flight {
                return Transition::unchanged(session);
            }
            session.in_flight = false;
            session.generated_image = Some(image);
            session.status = Status::Success;
        }
        Event::GenerationFailed(error) => {
            if !session.in_flight {
                return Transition::unchanged(session);
            }
            session.in_flight = false;
            session.error = Some(error);
            session.status = Status::Error;
        }
        Event::ImageCleared => {
            if session.status == Status::Processing || session.original_image.is_none() {
                return Transition::unchanged(session);
            }
            session.original_image = None;
            session.generated_image = None;
            session.error = None;
            session.status = Status::Idle;
            effects.push(Effect::SaveOriginalImage(None));
        }
    }

    Transition { session, effects }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
