//! Response generation
//!
//! [`ResponseGenerator`] is the seam where a real inference backend plugs in.
//! One outbound user turn goes in, one assistant turn comes out. The session
//! never looks past this trait, so swapping the echo stub for a network client
//! doesn't touch the submission logic.

use thiserror::Error;
use tracing::debug;

use crate::conversation::{ChatMessage, ChatRole};
use crate::form::{Credential, FormState, Model};

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("outbound turn must come from the user, got {0}")]
    NotAUserTurn(&'static str),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Everything a backend needs to answer one turn
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub turn: &'a ChatMessage,
    pub instruction: &'a str,
    pub model: Model,
    pub credential: &'a Credential,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl<'a> GenerationRequest<'a> {
    pub fn from_form(form: &'a FormState, turn: &'a ChatMessage) -> Self {
        Self {
            turn,
            instruction: form.instruction(),
            model: form.model(),
            credential: form.credential(),
            temperature: form.temperature(),
            max_output_tokens: form.max_output_tokens(),
        }
    }
}

pub trait ResponseGenerator {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<ChatMessage, GenerateError>;
}

/// Stand-in generator that echoes the user's text back inside a fixed template
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoGenerator;

impl EchoGenerator {
    pub fn reply_to(content: &str) -> String {
        format!("This is a simulated response to: \"{}\"", content)
    }
}

impl ResponseGenerator for EchoGenerator {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<ChatMessage, GenerateError> {
        ensure_user_turn(request)?;
        debug!(
            model = request.model.as_str(),
            temperature = request.temperature,
            max_output_tokens = request.max_output_tokens,
            "echoing turn"
        );
        Ok(ChatMessage::assistant(Self::reply_to(request.turn.content())))
    }
}

impl<G: ResponseGenerator + ?Sized> ResponseGenerator for Box<G> {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<ChatMessage, GenerateError> {
        (**self).generate(request)
    }
}

/// Reject requests whose outbound turn isn't a user turn
pub fn ensure_user_turn(request: &GenerationRequest<'_>) -> Result<(), GenerateError> {
    match request.turn.role() {
        ChatRole::User => Ok(()),
        other => Err(GenerateError::NotAUserTurn(other.as_str())),
    }
}
