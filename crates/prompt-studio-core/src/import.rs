//! Importing form settings from a JSON file
//!
//! Only the top-level `systemInstruction` key is recognized. Reading and
//! parsing happen in [`import_from`]; merging the result into the form is a
//! separate, synchronous step ([`ImportOutcome::apply`]) so the caller decides
//! when the state changes.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::form::FormState;

pub const INSTRUCTION_KEY: &str = "systemInstruction";

/// Extension shown in the file prompt. Advisory only, never enforced.
pub const ADVISORY_EXTENSION: &str = "json";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Identifies one import. Tickets increase monotonically, so a completion can
/// be checked against the most recently started import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImportTicket(pub(crate) u64);

impl ImportTicket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Result of reading and parsing an import file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The document carried a usable instruction
    Instruction(String),
    /// Parsed fine, nothing to merge
    NoInstruction,
    /// Read or parse failure, already logged
    Failed,
}

impl ImportOutcome {
    /// Merge into the form. Returns true if the form changed.
    pub fn apply(self, form: &mut FormState) -> bool {
        match self {
            ImportOutcome::Instruction(instruction) => {
                form.set_instruction(instruction);
                true
            }
            ImportOutcome::NoInstruction | ImportOutcome::Failed => false,
        }
    }
}

/// Extract the instruction from a JSON document.
///
/// A missing key, a non-string value, an empty string, or a document that
/// isn't an object all yield `Ok(None)`.
pub fn parse_instruction(text: &str) -> Result<Option<String>, ImportError> {
    let document: Value = serde_json::from_str(text)?;

    let instruction = document
        .get(INSTRUCTION_KEY)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(instruction)
}

pub async fn read_instruction(path: &Path) -> Result<Option<String>, ImportError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ImportError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    parse_instruction(&text)
}

/// Read and parse `path`. Failures are logged and reported as
/// [`ImportOutcome::Failed`], never returned as errors.
pub async fn import_from(path: &Path) -> ImportOutcome {
    if !has_advisory_extension(path) {
        debug!(?path, "importing file without .{} extension", ADVISORY_EXTENSION);
    }

    match read_instruction(path).await {
        Ok(Some(instruction)) => {
            debug!(?path, chars = instruction.chars().count(), "import found instruction");
            ImportOutcome::Instruction(instruction)
        }
        Ok(None) => {
            debug!(?path, "import has no usable {}", INSTRUCTION_KEY);
            ImportOutcome::NoInstruction
        }
        Err(e) => {
            warn!(?path, error = %e, "error importing JSON file");
            ImportOutcome::Failed
        }
    }
}

pub fn has_advisory_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(ADVISORY_EXTENSION))
        .unwrap_or(false)
}
