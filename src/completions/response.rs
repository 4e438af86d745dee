use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Response body of `POST {api_version}/completions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub id: String,

    /// Always `text_completion`
    pub object: String,

    /// Unix timestamp in seconds
    pub created: i64,

    pub model: String,

    pub choices: Vec<Choice>,

    pub usage: Usage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,

    pub index: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<ChoiceLogProbs>,

    /// `stop` or `length`; absent while a choice is still being generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Per-token log probabilities, present when the request set `logprobs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceLogProbs {
    #[serde(default)]
    pub tokens: Vec<String>,

    /// `None` for the first echoed token, which has no prediction.
    #[serde(default)]
    pub token_logprobs: Vec<Option<f64>>,

    #[serde(default)]
    pub top_logprobs: Vec<Option<HashMap<String, f64>>>,

    #[serde(default)]
    pub text_offset: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,

    #[serde(default)]
    pub completion_tokens: u32,

    pub total_tokens: u32,
}
