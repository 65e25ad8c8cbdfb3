//! Chat model abstraction for answer generation.
//!
//! The assistant loop talks to the model through [`ChatModel`] so tests can
//! substitute a scripted implementation; the production implementation wraps
//! OpenAI chat completions with function tools.

use crate::error::{PensumError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionTool, ChatCompletionToolChoiceOption,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::debug;

/// A single tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    /// Correlation ID for matching the tool result back to this request.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// JSON-encoded arguments.
    pub arguments: String,
}

/// One model response: terminal text, or one-or-more tool invocations.
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    /// Text content, if any.
    pub content: Option<String>,
    /// Tool invocations requested by the model, in request order.
    pub tool_calls: Vec<ToolInvocation>,
}

impl ModelReply {
    /// Whether this response requests tool use.
    pub fn requested_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// The text content, empty if the model produced none.
    pub fn text(&self) -> String {
        self.content.clone().unwrap_or_default()
    }
}

/// Trait for chat completion backends.
///
/// Must be callable repeatedly within one query with a growing message list.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one completion. `tools` carries the schemas the model may invoke;
    /// `None` withholds tool use entirely and forces a text answer.
    async fn complete(
        &self,
        messages: &[ChatCompletionRequestMessage],
        tools: Option<&[ChatCompletionTool]>,
    ) -> Result<ModelReply>;
}

/// OpenAI-backed chat model.
pub struct OpenAIChatModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    max_tokens: u32,
}

impl OpenAIChatModel {
    /// Create a new OpenAI chat model.
    pub fn new(model: &str, max_tokens: u32) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            max_tokens,
        }
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    async fn complete(
        &self,
        messages: &[ChatCompletionRequestMessage],
        tools: Option<&[ChatCompletionTool]>,
    ) -> Result<ModelReply> {
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(messages.to_vec())
            .temperature(0.0)
            .max_completion_tokens(self.max_tokens);

        if let Some(tools) = tools {
            builder
                .tools(tools.to_vec())
                .tool_choice(ChatCompletionToolChoiceOption::Auto);
        }

        let request = builder
            .build()
            .map_err(|e| PensumError::Assistant(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| PensumError::OpenAI(format!("Chat API error: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| PensumError::Assistant("No response from model".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolInvocation {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        debug!(finish_reason = ?choice.finish_reason, "Model reply received");

        Ok(ModelReply {
            content: choice.message.content,
            tool_calls,
        })
    }
}
