pub mod image_encoder;
pub mod prompt_builder;

pub use image_encoder::{encode, encode_all};
pub use prompt_builder::{PromptBuilder, PromptMode};
