use std::time::Duration;

use docbot_core::error::AppError;
use serde::{Deserialize, Serialize};

use crate::openai::OpenAiClient;
use crate::prompt::ChatMessage;

use super::ChatModel;

#[derive(Debug, Clone)]
pub struct OpenAiChat {
    client: OpenAiClient,
    model: String,
}

impl OpenAiChat {
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl ChatModel for OpenAiChat {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String, AppError> {
        let req = ChatRequest {
            model: &self.model,
            messages,
            // Pinned so identical context yields a reproducible answer.
            temperature: 0.0,
        };

        let resp = self
            .client
            .post("chat/completions", Duration::from_secs(60))
            .send_json(serde_json::to_value(req).map_err(|e| {
                AppError::new("COMPLETION_FAILED", "Failed to encode completion request")
                    .with_details(e.to_string())
            })?);

        match resp {
            Ok(r) => {
                let v: ChatResponse = r.into_json().map_err(|e| {
                    AppError::new("COMPLETION_FAILED", "Failed to decode completion response")
                        .with_details(e.to_string())
                })?;
                let text = v
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
                    .unwrap_or_default();
                if text.trim().is_empty() {
                    return Err(AppError::new(
                        "COMPLETION_FAILED",
                        "Completion response was empty",
                    ));
                }
                Ok(text)
            }
            Err(ureq::Error::Status(status, r)) => {
                let body = r.into_string().unwrap_or_default();
                let snippet: String = body.trim().chars().take(200).collect();
                Err(
                    AppError::new("COMPLETION_FAILED", "Completion request failed")
                        .with_details(format!("status={status}; body={snippet}")),
                )
            }
            Err(e) => Err(
                AppError::new("COMPLETION_FAILED", "Failed to call completion endpoint")
                    .with_details(e.to_string())
                    .with_retryable(true),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatRequest, ChatResponse};
    use crate::prompt::ChatMessage;

    #[test]
    fn decodes_first_choice_content() {
        let json = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "BW is supported."}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14}
        }"#;
        let v: ChatResponse = serde_json::from_str(json).expect("decode");
        assert_eq!(
            v.choices[0].message.content.as_deref(),
            Some("BW is supported.")
        );
    }

    #[test]
    fn request_serializes_lowercase_roles_and_zero_temperature() {
        let messages = vec![
            ChatMessage::system("persona"),
            ChatMessage::user("question"),
        ];
        let req = ChatRequest {
            model: "gpt-4",
            messages: &messages,
            temperature: 0.0,
        };
        let v = serde_json::to_value(req).expect("encode");
        assert_eq!(v["model"], "gpt-4");
        assert_eq!(v["temperature"], 0.0);
        assert_eq!(v["messages"][0]["role"], "system");
        assert_eq!(v["messages"][1]["role"], "user");
    }
}
