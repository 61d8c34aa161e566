use docbot_core::error::AppError;

use crate::prompt::ChatMessage;

/// Chat-completion provider. One deterministic call per answer; failures
/// surface immediately, there is no retry layer.
pub trait ChatModel {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String, AppError>;
}

pub mod openai_chat;
