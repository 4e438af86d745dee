//! Data contracts for the `/completions` endpoint.

pub mod request;
pub mod response;

pub use request::{CompletionRequest, END_OF_TEXT};
pub use response::{Choice, ChoiceLogProbs, CompletionResponse, Usage};
