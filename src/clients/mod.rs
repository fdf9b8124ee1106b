pub mod llm_client;

pub use llm_client::{CompletionClient, CompletionParams, LlmClient, RetryPolicy};
