//! Bounded multi-round tool loop.
//!
//! One [`Agent`] run drives a single query to completion: the model is
//! called with the tool schemas, requested tools are executed sequentially
//! in request order, results are appended to the message log, and the model
//! is called again with the schemas still offered. The loop stops when the
//! model answers in text or when the round budget is spent; in the latter
//! case one final call with tools withheld forces a terminal answer.

use super::tools::{CitationSource, ToolRegistry};
use crate::chat_model::{ChatModel, ToolInvocation};
use crate::error::{PensumError, Result};
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionToolType, FunctionCall,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Default number of tool-execution rounds per query.
const DEFAULT_MAX_ROUNDS: usize = 2;

/// Assistant that answers one query through the bounded tool loop.
pub struct Agent {
    model: Arc<dyn ChatModel>,
    registry: ToolRegistry,
    system_prompt: String,
    max_rounds: usize,
}

impl Agent {
    /// Create an agent over the given model and tool registry.
    pub fn new(model: Arc<dyn ChatModel>, registry: ToolRegistry, system_prompt: &str) -> Self {
        Self {
            model,
            registry,
            system_prompt: system_prompt.to_string(),
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Set the tool-round budget.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Answer a query. `history` is the rendered text of past exchanges; it
    /// is folded into the system instructions of every model call and stays
    /// fixed for the whole run.
    ///
    /// Tool failures are fed back to the model as result text and never
    /// abort the loop; only a failing model call errors out, with no
    /// partial answer.
    #[instrument(skip(self, history), fields(question = %question))]
    pub async fn run(&self, question: &str, history: Option<&str>) -> Result<AgentOutcome> {
        let system_content = match history {
            Some(h) => format!("{}\n\nPrevious conversation:\n{}", self.system_prompt, h),
            None => self.system_prompt.clone(),
        };

        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_content)
                .build()
                .map_err(|e| PensumError::Assistant(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(question)
                .build()
                .map_err(|e| PensumError::Assistant(e.to_string()))?
                .into(),
        ];

        let tools = self.registry.get_all_definitions();
        let mut reply = self.model.complete(&messages, Some(tools.as_slice())).await?;
        let mut rounds = 0;

        while reply.requested_tools() {
            if rounds >= self.max_rounds {
                // Budget spent while the model still wants a tool: withhold
                // the schemas so the next reply must be plain text. The
                // dangling request is dropped, not executed.
                info!("Round budget ({}) spent, forcing terminal answer", self.max_rounds);
                reply = self.model.complete(&messages, None).await?;
                break;
            }

            rounds += 1;
            debug!("Tool round {}/{}", rounds, self.max_rounds);

            messages.push(assistant_tool_request(&reply.tool_calls)?);
            for call in &reply.tool_calls {
                info!("Executing tool: {}", call.name);
                let output = self.registry.execute(&call.name, &call.arguments).await;
                messages.push(tool_result(&call.id, output)?);
            }

            // The schemas stay offered on every follow-up call so the model
            // keeps the option to chain another retrieval.
            reply = self.model.complete(&messages, Some(tools.as_slice())).await?;
        }

        let answer = reply.text();
        let sources = self.registry.drain_sources();

        Ok(AgentOutcome {
            answer,
            sources,
            tool_rounds: rounds,
        })
    }
}

/// Result of one agent run.
#[derive(Debug)]
pub struct AgentOutcome {
    /// Final natural-language answer.
    pub answer: String,
    /// Citation sources accumulated during the run, in tool-call order.
    pub sources: Vec<CitationSource>,
    /// Number of tool-execution rounds used.
    pub tool_rounds: usize,
}

/// Build the assistant turn carrying the model's tool requests, preserving
/// the correlation IDs.
fn assistant_tool_request(calls: &[ToolInvocation]) -> Result<ChatCompletionRequestMessage> {
    let tool_calls: Vec<ChatCompletionMessageToolCall> = calls
        .iter()
        .map(|c| ChatCompletionMessageToolCall {
            id: c.id.clone(),
            r#type: ChatCompletionToolType::Function,
            function: FunctionCall {
                name: c.name.clone(),
                arguments: c.arguments.clone(),
            },
        })
        .collect();

    Ok(ChatCompletionRequestAssistantMessageArgs::default()
        .tool_calls(tool_calls)
        .build()
        .map_err(|e| PensumError::Assistant(e.to_string()))?
        .into())
}

/// Build the tool-result turn for a completed invocation.
fn tool_result(call_id: &str, content: String) -> Result<ChatCompletionRequestMessage> {
    Ok(ChatCompletionRequestToolMessageArgs::default()
        .tool_call_id(call_id)
        .content(content)
        .build()
        .map_err(|e| PensumError::Assistant(e.to_string()))?
        .into())
}
