use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The document separator the models see during training (`<|endoftext|>`).
pub const END_OF_TEXT: &str = "\x03";

/// Request body for `POST {api_version}/completions`.
///
/// Upstream limits (`stop` up to 4 sequences, `logprobs` up to 5, `best_of`
/// greater than `n`) are not checked locally; violating them surfaces as an
/// HTTP error from the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// ID of the model to use.
    pub model: String,

    /// The prompt(s) to generate completions for.
    pub prompt: Vec<String>,

    /// The suffix that comes after a completion of inserted text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    /// Maximum number of tokens to generate. Prompt plus `max_tokens` cannot
    /// exceed the model's context length.
    pub max_tokens: u32,

    /// Sampling temperature. Alter this or `top_p` but not both.
    pub temperature: f32,

    /// Nucleus sampling: only tokens in the top `top_p` probability mass are
    /// considered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// How many completions to generate for each prompt.
    pub n: u32,

    /// Streaming is not supported by this client; leave it `false`.
    pub stream: bool,

    /// Include the log probabilities of the `logprobs` most likely tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<u32>,

    /// Echo back the prompt in addition to the completion.
    pub echo: bool,

    /// Sequences where the API stops generating further tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,

    /// Between -2.0 and 2.0. Positive values favour new topics.
    pub presence_penalty: f32,

    /// Between -2.0 and 2.0. Positive values discourage verbatim repetition.
    pub frequency_penalty: f32,

    /// Candidates generated server-side; the best `n` are returned.
    pub best_of: u32,

    /// Token id to bias (-100 to 100) added to the logits before sampling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<HashMap<String, i32>>,

    /// A unique identifier representing the end-user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl Default for CompletionRequest {
    fn default() -> Self {
        Self {
            model: String::new(),
            prompt: Vec::new(),
            suffix: None,
            max_tokens: 16,
            temperature: 1.0,
            top_p: None,
            n: 1,
            stream: false,
            logprobs: None,
            echo: false,
            stop: None,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            best_of: 1,
            logit_bias: None,
            user: None,
        }
    }
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: vec![prompt.into()],
            ..Self::default()
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt.push(prompt.into());
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_n(mut self, n: u32) -> Self {
        self.n = n;
        self
    }

    pub fn with_logprobs(mut self, logprobs: u32) -> Self {
        self.logprobs = Some(logprobs);
        self
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn with_presence_penalty(mut self, penalty: f32) -> Self {
        self.presence_penalty = penalty;
        self
    }

    pub fn with_frequency_penalty(mut self, penalty: f32) -> Self {
        self.frequency_penalty = penalty;
        self
    }

    pub fn with_best_of(mut self, best_of: u32) -> Self {
        self.best_of = best_of;
        self
    }

    pub fn with_logit_bias(mut self, logit_bias: HashMap<String, i32>) -> Self {
        self.logit_bias = Some(logit_bias);
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}
