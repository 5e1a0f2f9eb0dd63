use super::*;

use shared::error::{ErrorCode, EMPTY_RESULT_MESSAGE};

fn original() -> EncodedImage {
    EncodedImage::new("data:image/jpeg;base64,/9j/4AAQ")
}

fn generated() -> EncodedImage {
    EncodedImage::new("data:image/png;base64,AAAA")
}

fn apply(session: Session, events: impl IntoIterator<Item = Event>) -> Session {
    events
        .into_iter()
        .fold(session, |session, event| transition(session, event).session)
}

fn succeeded_session() -> Session {
    apply(
        Session::new("prompt", Some(original())),
        [Event::GenerateRequested, Event::GenerationSucceeded(generated())],
    )
}

#[test]
fn fresh_session_is_idle_with_default_prompt() {
    let session = Session::default();
    assert_eq!(session.status, Status::Idle);
    assert_eq!(session.prompt, DEFAULT_PROMPT);
    assert!(!session.can_generate());
    assert!(!session.can_export());
}

#[test]
fn generate_moves_idle_to_processing_and_starts_one_call() {
    let t = transition(Session::new("p", Some(original())), Event::GenerateRequested);
    assert_eq!(t.session.status, Status::Processing);
    assert_eq!(
        t.effects,
        vec![Effect::StartGeneration {
            image: original(),
            prompt: "p".into()
        }]
    );
    assert!(!t.session.can_generate());
}

#[test]
fn processing_resolves_to_success_with_result() {
    let session = succeeded_session();
    assert_eq!(session.status, Status::Success);
    assert_eq!(session.generated_image, Some(generated()));
    assert!(session.can_export());
}

#[test]
fn processing_resolves_to_error_with_message() {
    let failure = UserError::new(ErrorCode::EmptyResult, EMPTY_RESULT_MESSAGE);
    let session = apply(
        Session::new("p", Some(original())),
        [Event::GenerateRequested, Event::GenerationFailed(failure.clone())],
    );
    assert_eq!(session.status, Status::Error);
    assert_eq!(session.error, Some(failure));
    assert!(session.generated_image.is_none());
}

#[test]
fn stray_completion_without_request_in_flight_is_ignored() {
    let idle = Session::new("p", Some(original()));
    let t = transition(idle.clone(), Event::GenerationSucceeded(generated()));
    assert_eq!(t.session, idle);
    let t = transition(
        idle.clone(),
        Event::GenerationFailed(UserError::new(ErrorCode::Transport, "boom")),
    );
    assert_eq!(t.session, idle);
}

#[test]
fn late_success_lands_after_new_file_was_loaded() {
    let replacement = EncodedImage::new("data:image/png;base64,iVBORw0K");
    let session = apply(
        Session::new("p", Some(original())),
        [
            Event::GenerateRequested,
            Event::FileLoaded(replacement.clone()),
        ],
    );
    assert_eq!(session.status, Status::Idle);
    assert!(session.in_flight);
    assert!(!session.can_generate());

    let session = transition(session, Event::GenerationSucceeded(generated())).session;
    assert_eq!(session.status, Status::Success);
    assert_eq!(session.generated_image, Some(generated()));
    assert_eq!(session.original_image, Some(replacement));
    assert!(!session.in_flight);
    assert!(session.can_generate());
}

#[test]
fn late_failure_lands_after_prompt_edit() {
    let session = apply(
        Session::new("p", Some(original())),
        [
            Event::GenerateRequested,
            Event::PromptEdited("otra".into()),
            Event::GenerationFailed(UserError::new(ErrorCode::Transport, "boom")),
        ],
    );
    assert_eq!(session.status, Status::Error);
    assert_eq!(session.error.map(|e| e.message), Some("boom".to_string()));
    assert!(!session.in_flight);
}

#[test]
fn second_completion_for_the_same_request_is_ignored() {
    let done = succeeded_session();
    let t = transition(
        done.clone(),
        Event::GenerationFailed(UserError::new(ErrorCode::Transport, "late")),
    );
    assert_eq!(t.session, done);
}

#[test]
fn generate_without_image_does_nothing() {
    let t = transition(Session::default(), Event::GenerateRequested);
    assert_eq!(t.session.status, Status::Idle);
    assert!(t.effects.is_empty());
}

#[test]
fn generate_while_processing_is_ignored() {
    let processing = transition(Session::new("p", Some(original())), Event::GenerateRequested).session;
    let t = transition(processing.clone(), Event::GenerateRequested);
    assert_eq!(t.session, processing);
    assert!(t.effects.is_empty());
}

#[test]
fn new_file_after_success_resets_to_idle_and_drops_result() {
    let replacement = EncodedImage::new("data:image/png;base64,iVBORw0K");
    let t = transition(succeeded_session(), Event::FileLoaded(replacement.clone()));
    assert_eq!(t.session.status, Status::Idle);
    assert!(t.session.generated_image.is_none());
    assert_eq!(t.session.original_image, Some(replacement.clone()));
    assert_eq!(t.effects, vec![Effect::SaveOriginalImage(Some(replacement))]);
}

#[test]
fn new_file_clears_previous_error() {
    let failed = apply(
        Session::new("p", Some(original())),
        [
            Event::GenerateRequested,
            Event::GenerationFailed(UserError::new(ErrorCode::Transport, "boom")),
        ],
    );
    let t = transition(failed, Event::FileLoaded(generated()));
    assert!(t.session.error.is_none());
    assert_eq!(t.session.status, Status::Idle);
}

#[test]
fn prompt_edit_after_success_keeps_original_but_drops_result() {
    let t = transition(succeeded_session(), Event::PromptEdited("otra".into()));
    assert_eq!(t.session.status, Status::Idle);
    assert!(t.session.generated_image.is_none());
    assert_eq!(t.session.original_image, Some(original()));
    assert_eq!(t.effects, vec![Effect::SavePrompt("otra".into())]);
}

#[test]
fn unchanged_prompt_does_not_write() {
    let t = transition(succeeded_session(), Event::PromptEdited("prompt".into()));
    assert!(t.effects.is_empty());
    assert_eq!(t.session.status, Status::Success);
}

#[test]
fn rejected_file_keeps_images_and_status() {
    let before = succeeded_session();
    let error = UserError::new(ErrorCode::Validation, "too big");
    let t = transition(before.clone(), Event::FileRejected(error.clone()));
    assert_eq!(t.session.original_image, before.original_image);
    assert_eq!(t.session.generated_image, before.generated_image);
    assert_eq!(t.session.status, before.status);
    assert_eq!(t.session.error, Some(error));
    assert!(t.effects.is_empty());
}

#[test]
fn clearing_image_removes_persisted_copy() {
    let t = transition(succeeded_session(), Event::ImageCleared);
    assert!(t.session.original_image.is_none());
    assert!(t.session.generated_image.is_none());
    assert_eq!(t.session.status, Status::Idle);
    assert_eq!(t.effects, vec![Effect::SaveOriginalImage(None)]);
}

#[test]
fn clearing_is_ignored_while_processing() {
    let processing = transition(Session::new("p", Some(original())), Event::GenerateRequested).session;
    let t = transition(processing.clone(), Event::ImageCleared);
    assert_eq!(t.session, processing);
}
