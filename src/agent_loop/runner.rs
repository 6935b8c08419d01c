//! Run entry point and in-flight run handle.

mod engine;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use self::engine::EngineContext;
use super::types::{ControllerState, RunId, RunResult, RunState};
use crate::agent::AgentResolver;
use crate::config::LoopConfig;
use crate::dispatch::ToolDispatcher;
use crate::error::LoopError;
use crate::provider::ProviderFactory;
use crate::transport::{event_channel, AbortReason, RunEnvelope, RunEvent, RunEvents};
use crate::types::ConversationMessage;

/// Request payload to start a run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub run_id: RunId,
    pub agent_id: String,
    /// Prior conversation, oldest first. The agent's system prompt is applied separately.
    pub history: Vec<ConversationMessage>,
}

impl RunRequest {
    pub fn new(agent_id: impl Into<String>, history: Vec<ConversationMessage>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            agent_id: agent_id.into(),
            history,
        }
    }

    /// Single user message as the whole history.
    pub fn prompt(agent_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(agent_id, vec![ConversationMessage::user(prompt)])
    }

    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = run_id;
        self
    }
}

/// Handle for an in-flight run.
#[derive(Debug)]
pub struct RunHandle {
    run_id: RunId,
    cancel: CancellationToken,
    events: Option<RunEvents>,
    result_rx: oneshot::Receiver<RunResult>,
}

impl RunHandle {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Request cancellation. Takes effect at the next state transition; a
    /// tool batch already executing runs to completion first.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Take the event stream. Returns `None` after the first call.
    pub fn take_events(&mut self) -> Option<RunEvents> {
        self.events.take()
    }

    pub async fn wait(self) -> RunResult {
        let run_id = self.run_id;
        self.result_rx
            .await
            .unwrap_or_else(|_| RunResult::lost(run_id))
    }

    /// Wait at most `budget`, then cancel and wait for the run to wind down.
    pub async fn wait_with_budget(self, budget: Duration) -> RunResult {
        let run_id = self.run_id;
        let mut result_rx = self.result_rx;
        match tokio::time::timeout(budget, &mut result_rx).await {
            Ok(result) => result.unwrap_or_else(|_| RunResult::lost(run_id)),
            Err(_) => {
                tracing::warn!(%run_id, budget_ms = budget.as_millis() as u64, "run budget exhausted; cancelling");
                self.cancel.cancel();
                result_rx.await.unwrap_or_else(|_| RunResult::lost(run_id))
            }
        }
    }

    /// Drain the event stream, then wait for the result.
    pub async fn collect(mut self) -> (Vec<RunEnvelope>, RunResult) {
        let events = match self.events.take() {
            Some(events) => events.collect().await,
            None => Vec::new(),
        };
        (events, self.wait().await)
    }

    /// Like [`RunHandle::collect`], cancelling the run once `budget` elapses.
    pub async fn collect_with_budget(mut self, budget: Duration) -> (Vec<RunEnvelope>, RunResult) {
        let Some(events) = self.events.take() else {
            return (Vec::new(), self.wait_with_budget(budget).await);
        };
        let mut collecting = Box::pin(events.collect::<Vec<_>>());
        let events = match tokio::time::timeout(budget, &mut collecting).await {
            Ok(events) => events,
            Err(_) => {
                tracing::warn!(run_id = %self.run_id, "run budget exhausted; cancelling");
                self.cancel.cancel();
                collecting.await
            }
        };
        (events, self.wait().await)
    }
}

/// Runner trait for starting step-loop runs.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Resolve the agent and start the run. Fails fast, with no events and
    /// no model call, when the agent does not exist.
    async fn start(&self, request: RunRequest) -> Result<RunHandle, LoopError>;
}

/// Default runner: model step, tool batch, repeat until answered or bounded.
#[derive(Clone)]
pub struct LoopRunner {
    resolver: AgentResolver,
    dispatcher: ToolDispatcher,
    provider_factory: ProviderFactory,
    config: LoopConfig,
}

impl LoopRunner {
    pub fn new(resolver: AgentResolver, provider_factory: ProviderFactory, config: LoopConfig) -> Self {
        let dispatcher = ToolDispatcher::new(resolver.registry().clone(), &config);
        Self {
            resolver,
            dispatcher,
            provider_factory,
            config,
        }
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn resolver(&self) -> &AgentResolver {
        &self.resolver
    }
}

#[async_trait]
impl Runner for LoopRunner {
    async fn start(&self, request: RunRequest) -> Result<RunHandle, LoopError> {
        let agent = self.resolver.resolve(&request.agent_id)?;
        let run_id = request.run_id;
        let (emitter, events) = event_channel(run_id);
        let cancel = CancellationToken::new();
        let (result_tx, result_rx) = oneshot::channel();

        let provider_factory = Arc::clone(&self.provider_factory);
        let dispatcher = self.dispatcher.clone();
        let config = self.config;
        let run_cancel = cancel.clone();

        tokio::spawn(async move {
            tracing::info!(
                %run_id,
                agent_id = %agent.definition.id,
                route = %agent.route,
                max_steps = config.max_steps,
                tools = agent.enabled_tools.len(),
                "run started"
            );
            let mut state = RunState::new(request.history, config.max_steps);

            let provider = match provider_factory(&agent.route) {
                Ok(provider) => provider,
                Err(err) => {
                    let message = err.to_string();
                    tracing::warn!(%run_id, error = %message, "no provider for route");
                    state.transition(ControllerState::Aborted {
                        reason: AbortReason::ProviderError {
                            message: message.clone(),
                        },
                    });
                    emitter.emit(RunEvent::RunFailed { reason: message });
                    drop(emitter);
                    let _ = result_tx.send(state.into_result(run_id));
                    return;
                }
            };

            let ctx = EngineContext {
                run_id,
                agent,
                provider,
                dispatcher,
                config,
                emitter,
                cancel: run_cancel,
            };
            let state = engine::drive(&ctx, state).await;
            drop(ctx);

            let result = state.into_result(run_id);
            tracing::info!(%run_id, status = %result.status, steps = result.steps, "run finished");
            let _ = result_tx.send(result);
        });

        Ok(RunHandle {
            run_id,
            cancel,
            events: Some(events),
            result_rx,
        })
    }
}
