//! LLM client and the two uses the bot makes of it

mod assistant;
mod classifier;
mod client;
mod types;

pub use assistant::{Assistant, HISTORY_WINDOW, LlmAssistant};
pub use classifier::{LlmReplyClassifier, ReplyClassification, ReplyClassifier, parse_classification};
pub use client::LlmClient;
pub use types::{CompletionRequest, CompletionRequestBuilder, Message};
