pub mod config;
pub mod conversation;
pub mod form;
pub mod generator;
pub mod import;
pub mod session;

// Re-export main types for convenience
pub use config::{Config, ConfigError};
pub use conversation::{ChatMessage, ChatRole, ConversationLog};
pub use form::{Credential, FormState, Model};
pub use generator::{EchoGenerator, GenerateError, GenerationRequest, ResponseGenerator};
pub use import::{import_from, ImportError, ImportOutcome, ImportTicket};
pub use session::Session;
