//! Agent loop — the model ↔ tool-calling control loop.
//!
//! One turn alternates between asking the model and running the tools it
//! requested, until the model answers without requests or the round budget
//! runs out. [`AgentLoop::process_message`] wraps a turn with the per-user
//! session: directive, trimming, and persistence.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use agrisight_core::config::Config;
use agrisight_core::history::{self, DEFAULT_HISTORY_LIMIT};
use agrisight_core::session::SessionStore;
use agrisight_core::types::{ImagePayload, Message, ToolSchema};
use agrisight_providers::{HttpProvider, LlmProvider, ProviderSettings};

use crate::directive::DirectiveBuilder;
use crate::executor::ToolExecutor;
use crate::gateway::ModelGateway;
use crate::tools::builtin_registry;

/// Default maximum model calls per turn.
pub const DEFAULT_MAX_ROUNDS: usize = 8;

/// Final text when the round budget runs out with tool calls still pending.
pub const EXHAUSTED_NOTICE: &str =
    "Sorry, I couldn't finish looking that up. Please try asking again, perhaps more specifically.";

// ─────────────────────────────────────────────
// Turn types
// ─────────────────────────────────────────────

/// Where the loop is within a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    AwaitModel,
    RunTools,
    Done,
}

/// Why a turn ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The model answered without tool calls.
    Completed,
    /// The round budget ran out while tool calls were still pending.
    MaxRounds,
}

/// One user input: text plus an optional photo.
#[derive(Clone, Debug, Default)]
pub struct TurnInput {
    pub text: String,
    pub image: Option<ImagePayload>,
}

impl TurnInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: ImagePayload) -> Self {
        self.image = Some(image);
        self
    }

    fn into_message(self) -> (Message, Option<ImagePayload>) {
        let message = match &self.image {
            Some(image) => Message::user_with_image(self.text, image.clone()),
            None => Message::user(self.text),
        };
        (message, self.image)
    }
}

/// Result of one turn.
#[derive(Clone, Debug)]
pub struct TurnOutcome {
    /// The conversation including everything added during the turn.
    pub history: Vec<Message>,
    /// Number of model calls made.
    pub rounds: usize,
    /// Text of the final assistant message.
    pub reply: String,
    pub stop_reason: StopReason,
}

// ─────────────────────────────────────────────
// AgentLoop
// ─────────────────────────────────────────────

/// Runs turns against a model gateway and a tool executor.
pub struct AgentLoop {
    gateway: ModelGateway,
    executor: ToolExecutor,
    directive: DirectiveBuilder,
    max_rounds: usize,
    history_limit: usize,
}

impl AgentLoop {
    pub fn new(gateway: ModelGateway, executor: ToolExecutor, directive: DirectiveBuilder) -> Self {
        Self {
            gateway,
            executor,
            directive,
            max_rounds: DEFAULT_MAX_ROUNDS,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Build a loop against the configured HTTP backend with the built-in tools.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = &config.backend;
        if !backend.is_configured() {
            anyhow::bail!("no API key configured (set NEBIUS_API_KEY or backend.apiKey in the config file)");
        }

        let mut settings = ProviderSettings::new(backend.api_base.as_str(), backend.api_key.as_str())
            .with_timeout(Duration::from_secs(backend.request_timeout_secs));
        settings.extra_headers = backend.extra_headers.clone();

        let provider = HttpProvider::new(&settings).context("failed to create HTTP provider")?;
        Ok(Self::with_provider(Arc::new(provider), config))
    }

    /// Build a loop from config around an existing provider.
    pub fn with_provider(provider: Arc<dyn LlmProvider>, config: &Config) -> Self {
        let agent = &config.agent;
        let registry = Arc::new(builtin_registry(&config.tools));

        let gateway = ModelGateway::new(
            provider,
            config.backend.text_model.as_str(),
            config.backend.vision_model.as_str(),
        )
        .with_tools(registry.schemas())
        .with_temperature(agent.temperature)
        .with_max_tokens(agent.max_tokens)
        .with_timeout(Duration::from_secs(config.backend.request_timeout_secs));

        let executor = ToolExecutor::new(registry)
            .with_timeout(Duration::from_secs(agent.tool_timeout_secs))
            .with_parallel(agent.parallel_tools);

        let directive = DirectiveBuilder::new(agent.name.as_str()).with_custom(agent.directive.clone());

        info!(
            text_model = %config.backend.text_model,
            vision_model = %config.backend.vision_model,
            tools = executor.registry().len(),
            max_rounds = agent.max_rounds,
            "agent loop ready"
        );

        Self::new(gateway, executor, directive)
            .with_max_rounds(agent.max_rounds)
            .with_history_limit(agent.history_limit)
    }

    /// Maximum model calls per turn. Zero is treated as one.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    /// Maximum messages kept per conversation, directive included.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Schemas advertised to the text backend.
    pub fn tools(&self) -> Vec<ToolSchema> {
        self.executor.registry().schemas()
    }

    pub fn gateway(&self) -> &ModelGateway {
        &self.gateway
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Append `input` to `history` and run one turn.
    pub async fn run_turn(&self, mut history: Vec<Message>, input: TurnInput) -> TurnOutcome {
        let (message, image) = input.into_message();
        history.push(message);
        self.run_rounds(history, image).await
    }

    /// Run one turn for `user_id` against their stored conversation and
    /// return the reply text.
    ///
    /// The user's session stays locked for the whole turn, so turns for the
    /// same user are serialised while other users proceed.
    pub async fn process_message(&self, store: &SessionStore, user_id: &str, input: TurnInput) -> String {
        let mut session = store.acquire(user_id).await;
        debug!(user = %user_id, stored = session.messages.len(), "processing message");

        let directive = self.directive.build(&session.profile);
        let mut messages = std::mem::take(&mut session.messages);
        history::ensure_directive(&mut messages, &directive);

        let (message, image) = input.into_message();
        messages.push(message);
        // Room for the directive and the new user message is always kept.
        history::trim(&mut messages, self.history_limit.max(2));

        let outcome = self.run_rounds(messages, image).await;

        session.messages = outcome.history;
        session.touch();
        if let Err(e) = store.save(&session) {
            error!(user = %user_id, error = %e, "failed to save session");
        }

        outcome.reply
    }

    async fn run_rounds(&self, mut history: Vec<Message>, image: Option<ImagePayload>) -> TurnOutcome {
        let selection = self.gateway.select(image.is_some());
        let mut state = LoopState::AwaitModel;
        let mut rounds = 0;
        let mut stop_reason = StopReason::Completed;

        loop {
            state = match state {
                LoopState::AwaitModel => {
                    rounds += 1;
                    debug!(round = rounds, backend = ?selection.backend, "model call");

                    let reply = self.gateway.complete(&history, &selection, image.as_ref()).await;
                    let pending = reply.has_pending_requests();
                    history.push(reply);

                    if !pending {
                        LoopState::Done
                    } else if rounds >= self.max_rounds {
                        warn!(rounds, "round budget exhausted with tool calls pending");
                        close_dangling_requests(&mut history);
                        stop_reason = StopReason::MaxRounds;
                        LoopState::Done
                    } else {
                        LoopState::RunTools
                    }
                }
                LoopState::RunTools => {
                    let requests = history.last().map(|m| m.requests().to_vec()).unwrap_or_default();
                    let results = self.executor.execute(&requests).await;
                    history.extend(results);
                    LoopState::AwaitModel
                }
                LoopState::Done => break,
            };
        }

        strip_images(&mut history);

        let reply = history
            .iter()
            .rev()
            .find_map(|m| match m {
                Message::Assistant { content, .. } => Some(content.clone().unwrap_or_default()),
                _ => None,
            })
            .unwrap_or_default();

        info!(rounds, stop = ?stop_reason, reply_len = reply.len(), "turn finished");

        TurnOutcome {
            history,
            rounds,
            reply,
            stop_reason,
        }
    }
}

/// Clear the requests of the last assistant message and put the notice in its place.
fn close_dangling_requests(history: &mut [Message]) {
    if let Some(Message::Assistant { content, tool_calls }) = history.last_mut() {
        tool_calls.clear();
        *content = Some(EXHAUSTED_NOTICE.to_string());
    }
}

/// Images are only sent once; the stored conversation keeps the text.
fn strip_images(history: &mut [Message]) {
    for message in history.iter_mut() {
        if let Message::User { image, .. } = message {
            *image = None;
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
