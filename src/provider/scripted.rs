//! Replay provider driven by a fixed list of turns.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::{ModelProvider, ModelStream, ProviderRequest};
use crate::error::LoopError;
use crate::types::{ModelDelta, ToolCallRequest};

/// A tool call the scripted model requests. An absent id is generated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScriptedToolCall {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub input: serde_json::Value,
}

/// One scripted model response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScriptedTurn {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tool_calls: Vec<ScriptedToolCall>,
    /// Fail the model call with this message instead of responding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScriptedTurn {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn tool_call(name: impl Into<String>, input: serde_json::Value) -> Self {
        Self::default().with_tool_call(name, input)
    }

    pub fn with_tool_call(mut self, name: impl Into<String>, input: serde_json::Value) -> Self {
        self.tool_calls.push(ScriptedToolCall {
            id: None,
            name: name.into(),
            input,
        });
        self
    }

    pub fn with_tool_call_id(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        self.tool_calls.push(ScriptedToolCall {
            id: Some(id.into()),
            name: name.into(),
            input,
        });
        self
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Provider that replays [`ScriptedTurn`]s in order.
///
/// Once the script is exhausted the last turn repeats, so a script ending in a
/// tool call keeps requesting tools. Every request is recorded.
pub struct ScriptedProvider {
    turns: Vec<ScriptedTurn>,
    calls: AtomicUsize,
    chunk_delay: Option<Duration>,
    word_chunks: bool,
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
}

impl ScriptedProvider {
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            turns,
            calls: AtomicUsize::new(0),
            chunk_delay: None,
            word_chunks: false,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Load a JSON array of turns.
    pub fn from_json(raw: &str) -> Result<Self, LoopError> {
        let turns: Vec<ScriptedTurn> = serde_json::from_str(raw)?;
        if turns.is_empty() {
            return Err(LoopError::Configuration(
                "script must contain at least one turn".to_string(),
            ));
        }
        Ok(Self::new(turns))
    }

    /// Pause between streamed chunks.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    /// Stream text one word at a time instead of as a single delta.
    pub fn with_word_chunks(mut self) -> Self {
        self.word_chunks = true;
        self
    }

    /// Number of model invocations served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Snapshot of every request received.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn deltas_for(&self, turn: &ScriptedTurn, call_index: usize) -> Vec<ModelDelta> {
        let mut deltas = Vec::new();
        let mut rest = turn.text.as_str();
        if !self.word_chunks && !rest.is_empty() {
            deltas.push(ModelDelta::text(rest));
            rest = "";
        }
        while !rest.is_empty() {
            let cut = rest
                .char_indices()
                .skip(1)
                .find(|(_, c)| *c == ' ')
                .map(|(idx, _)| idx)
                .unwrap_or(rest.len());
            deltas.push(ModelDelta::text(&rest[..cut]));
            rest = &rest[cut..];
        }
        for (idx, call) in turn.tool_calls.iter().enumerate() {
            let id = call
                .id
                .clone()
                .unwrap_or_else(|| format!("call_{}_{}", call_index + 1, idx + 1));
            deltas.push(ModelDelta::tool_call(ToolCallRequest::new(
                id,
                call.name.clone(),
                call.input.clone(),
            )));
        }
        deltas.push(ModelDelta::Done);
        deltas
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn stream(&self, request: &ProviderRequest) -> Result<ModelStream, LoopError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let call_index = self.calls.fetch_add(1, Ordering::SeqCst);
        let Some(turn) = self.turns.get(call_index).or_else(|| self.turns.last()) else {
            return Err(LoopError::provider("scripted", "script is empty"));
        };
        if let Some(message) = &turn.error {
            return Err(LoopError::provider("scripted", message.clone()));
        }

        let deltas = self.deltas_for(turn, call_index);
        let delay = self.chunk_delay;
        let stream = async_stream::stream! {
            for delta in deltas {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                yield Ok(delta);
            }
        };
        Ok(stream.boxed())
    }
}
