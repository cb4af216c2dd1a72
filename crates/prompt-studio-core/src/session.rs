//! Submission controller
//!
//! A [`Session`] owns the form, the conversation log, and the response
//! generator. It is the only writer of the log.

use tracing::{debug, info, warn};

use crate::conversation::{ChatMessage, ConversationLog};
use crate::form::FormState;
use crate::generator::{EchoGenerator, GenerateError, GenerationRequest, ResponseGenerator};
use crate::import::{ImportOutcome, ImportTicket};

#[derive(Debug)]
pub struct Session<G = EchoGenerator> {
    form: FormState,
    log: ConversationLog,
    generator: G,
    latest_import: u64,
}

impl Session<EchoGenerator> {
    pub fn new() -> Self {
        Self::with_generator(EchoGenerator)
    }
}

impl Default for Session<EchoGenerator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: ResponseGenerator> Session<G> {
    pub fn with_generator(generator: G) -> Self {
        Self::with_form(FormState::default(), generator)
    }

    pub fn with_form(form: FormState, generator: G) -> Self {
        Self {
            form,
            log: ConversationLog::new(),
            generator,
            latest_import: 0,
        }
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormState {
        &mut self.form
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    /// Content of the most recent assistant turn
    pub fn latest_response(&self) -> Option<&str> {
        self.log.last_assistant().map(|turn| turn.content())
    }

    /// Send the current prompt.
    ///
    /// On success the user turn and the reply are appended together, the prompt
    /// is cleared, and the reply text is returned. On failure nothing is
    /// appended and the prompt is left in place.
    pub fn submit(&mut self) -> Result<String, GenerateError> {
        let user = ChatMessage::user(self.form.prompt());

        let reply = {
            let request = GenerationRequest::from_form(&self.form, &user);
            self.generator.generate(&request)
        };

        let assistant = match reply {
            Ok(assistant) => assistant,
            Err(e) => {
                warn!(error = %e, "response generation failed, conversation unchanged");
                return Err(e);
            }
        };

        let content = assistant.content().to_string();
        self.log.append_exchange(user, assistant);
        self.form.set_prompt(String::new());

        info!(
            model = self.form.model().as_str(),
            turns = self.log.len(),
            "prompt submitted"
        );
        Ok(content)
    }

    /// Start a new import. Any import started earlier becomes stale.
    pub fn begin_import(&mut self) -> ImportTicket {
        self.latest_import += 1;
        debug!(ticket = self.latest_import, "import started");
        ImportTicket(self.latest_import)
    }

    pub fn is_current_import(&self, ticket: ImportTicket) -> bool {
        ticket.0 == self.latest_import
    }

    /// Merge a finished import. Only the most recently started import is
    /// applied; completions for older tickets are dropped. Returns true if the
    /// form changed.
    pub fn finish_import(&mut self, ticket: ImportTicket, outcome: ImportOutcome) -> bool {
        if !self.is_current_import(ticket) {
            debug!(
                ticket = ticket.0,
                latest = self.latest_import,
                "dropping stale import result"
            );
            return false;
        }

        let changed = outcome.apply(&mut self.form);
        if changed {
            info!(ticket = ticket.0, "instruction imported");
        }
        changed
    }
}
