//! The form state store
//!
//! Holds the current value of every configurable field. Setters never fail and
//! never validate: range enforcement belongs to the widgets that produce the
//! values (see [`step_temperature`] and [`clamp_max_output_tokens`]).

use std::fmt;

use serde::{Deserialize, Serialize};

pub const TEMPERATURE_MIN: f32 = 0.0;
pub const TEMPERATURE_MAX: f32 = 1.0;
pub const TEMPERATURE_STEP: f32 = 0.1;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

pub const MAX_OUTPUT_TOKENS_MIN: u32 = 1;
pub const MAX_OUTPUT_TOKENS_MAX: u32 = 8000;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2000;

/// Model identifiers offered by the model selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Model {
    #[default]
    #[serde(rename = "gpt-4")]
    Gpt4,
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
    #[serde(rename = "claude-3")]
    Claude3,
    #[serde(rename = "llama-3")]
    Llama3,
}

impl Model {
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::Gpt4 => "gpt-4",
            Model::Gpt35Turbo => "gpt-3.5-turbo",
            Model::Claude3 => "claude-3",
            Model::Llama3 => "llama-3",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gpt-4" => Some(Model::Gpt4),
            "gpt-3.5-turbo" => Some(Model::Gpt35Turbo),
            "claude-3" => Some(Model::Claude3),
            "llama-3" => Some(Model::Llama3),
            _ => None,
        }
    }

    pub fn all() -> Vec<Model> {
        vec![Model::Gpt4, Model::Gpt35Turbo, Model::Claude3, Model::Llama3]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Model::Gpt4 => "GPT-4",
            Model::Gpt35Turbo => "GPT-3.5 Turbo",
            Model::Claude3 => "Claude 3",
            Model::Llama3 => "Llama 3",
        }
    }

    /// Next model in selector order, wrapping around
    pub fn next(&self) -> Self {
        let all = Self::all();
        let i = all.iter().position(|m| m == self).unwrap_or(0);
        all[(i + 1) % all.len()]
    }

    /// Previous model in selector order, wrapping around
    pub fn prev(&self) -> Self {
        let all = Self::all();
        let i = all.iter().position(|m| m == self).unwrap_or(0);
        all[(i + all.len() - 1) % all.len()]
    }
}

/// An API credential. Never serialized, and redacted in `Debug` output so it
/// cannot leak into logs.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of characters, for drawing a mask of the same width
    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("Credential(<empty>)")
        } else {
            f.write_str("Credential(<redacted>)")
        }
    }
}

/// A field whose value lies outside its declared range
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeViolation {
    Temperature(f32),
    MaxOutputTokens(u32),
}

/// Current values of every form field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    instruction: String,
    prompt: String,
    model: Model,
    #[serde(skip)]
    credential: Credential,
    temperature: f32,
    max_output_tokens: u32,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            instruction: String::new(),
            prompt: String::new(),
            model: Model::default(),
            credential: Credential::default(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn set_instruction(&mut self, value: impl Into<String>) {
        self.instruction = value.into();
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, value: impl Into<String>) {
        self.prompt = value.into();
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn set_model(&mut self, model: Model) {
        self.model = model;
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn set_credential(&mut self, value: impl Into<String>) {
        self.credential = Credential::new(value);
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Stores the value as given, even outside `[0, 1]`
    pub fn set_temperature(&mut self, value: f32) {
        self.temperature = value;
    }

    pub fn max_output_tokens(&self) -> u32 {
        self.max_output_tokens
    }

    /// Stores the value as given, even outside `[1, 8000]`
    pub fn set_max_output_tokens(&mut self, value: u32) {
        self.max_output_tokens = value;
    }

    /// Fields currently holding values outside their declared ranges
    pub fn out_of_range(&self) -> Vec<RangeViolation> {
        let mut violations = Vec::new();
        if !(TEMPERATURE_MIN..=TEMPERATURE_MAX).contains(&self.temperature) {
            violations.push(RangeViolation::Temperature(self.temperature));
        }
        if !(MAX_OUTPUT_TOKENS_MIN..=MAX_OUTPUT_TOKENS_MAX).contains(&self.max_output_tokens) {
            violations.push(RangeViolation::MaxOutputTokens(self.max_output_tokens));
        }
        violations
    }
}

/// Move a temperature by `steps` slider notches, clamped to `[0, 1]` and
/// snapped to one decimal place
pub fn step_temperature(current: f32, steps: i32) -> f32 {
    let next = current + steps as f32 * TEMPERATURE_STEP;
    let snapped = (next * 10.0).round() / 10.0;
    snapped.clamp(TEMPERATURE_MIN, TEMPERATURE_MAX)
}

pub fn clamp_max_output_tokens(value: u32) -> u32 {
    value.clamp(MAX_OUTPUT_TOKENS_MIN, MAX_OUTPUT_TOKENS_MAX)
}
