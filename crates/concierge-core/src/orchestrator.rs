// Function-calling turn orchestrator
//
// Drives one user turn through an explicit state machine:
//
//   CallModel ──► Emit (plain text)
//       │
//       ▼
//   DispatchTool ──► ReturnToolResult ──► CallModel
//
// bounded by `max_rounds` model invocations and the turn deadline; hitting
// either bound transitions to Abort, which yields a locale apology plus the
// partial trace. Tool failures never escape this module: they are fed back
// to the model as structured results so it can recover or apologise.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use concierge_contracts::{StoredMessage, StoredRole, ToolStatus, ToolTrace};

use crate::backend::{DispatchError, ToolDispatcher};
use crate::error::Result;
use crate::language::apology;
use crate::llm::{LlmClient, LlmMessage, LlmPart, LlmReply, LlmRequest, ToolCall};
use crate::tools::{declarations, find_tool, validate_args};

/// Static system instruction for the concierge persona
pub const SYSTEM_PROMPT: &str = "You are the concierge of the Grand Hotel. \
You help guests with rooms, room reservations, the restaurant menu and \
restaurant table reservations, using the provided tools for every factual \
answer about availability, prices and bookings. Be concise and courteous. \
Never invent prices or availability: if a tool fails, tell the guest what \
went wrong and offer to try again. Confirm destructive actions (updates, \
cancellations) by restating the details back to the guest.";

/// Audio payload forwarded to the model as an input part
#[derive(Debug, Clone)]
pub struct AudioPayload {
    /// Base64 bytes as received from the client
    pub data: String,
    /// Container format ("wav", "mp3", "webm"), derived from the MIME type
    pub format: String,
}

/// Everything one orchestrator run needs
#[derive(Debug, Clone)]
pub struct TurnInput {
    /// BCP-47 tag the reply must be written in
    pub language: String,
    /// Persisted history, oldest first (plain user/assistant turns only)
    pub history: Vec<StoredMessage>,
    pub user_text: Option<String>,
    pub audio: Option<AudioPayload>,
    /// Caller credential, forwarded verbatim to the backend
    pub bearer: Option<String>,
    pub model: String,
    pub max_rounds: usize,
    /// Wall-clock bound for the whole run
    pub deadline: Instant,
}

/// Result of one orchestrator run
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: String,
    pub trace: Vec<ToolTrace>,
    /// True when a bound was hit and `reply` is the apology constant
    pub aborted: bool,
}

enum RunState {
    CallModel,
    DispatchTool(LlmReply),
    ReturnToolResult {
        assistant: LlmMessage,
        results: Vec<LlmMessage>,
    },
    Emit(String),
    Abort,
}

/// The turn state machine
pub struct Orchestrator {
    llm: Arc<dyn LlmClient>,
    dispatcher: Arc<dyn ToolDispatcher>,
}

impl Orchestrator {
    pub fn new(llm: Arc<dyn LlmClient>, dispatcher: Arc<dyn ToolDispatcher>) -> Self {
        Self { llm, dispatcher }
    }

    /// Run one turn to completion
    ///
    /// Only an unrecoverable LLM failure is an `Err`; every backend or
    /// schema problem is data returned into the loop.
    pub async fn run(&self, input: TurnInput) -> Result<TurnOutcome> {
        let system = self.render_system(&input);
        let mut conversation = Self::seed_conversation(&input);
        let mut trace: Vec<ToolTrace> = Vec::new();
        let mut rounds = 0usize;
        let mut state = RunState::CallModel;

        loop {
            match state {
                RunState::CallModel => {
                    if rounds >= input.max_rounds || Instant::now() >= input.deadline {
                        state = RunState::Abort;
                        continue;
                    }
                    rounds += 1;

                    let reply = self
                        .llm
                        .chat(LlmRequest {
                            model: input.model.clone(),
                            system: system.clone(),
                            messages: conversation.clone(),
                            tools: declarations(),
                            temperature: None,
                        })
                        .await?;

                    state = if reply.tool_calls.is_empty() {
                        RunState::Emit(reply.text)
                    } else if rounds >= input.max_rounds {
                        // No model invocation is left to consume the results
                        RunState::Abort
                    } else {
                        // Tool call takes precedence over any text in the
                        // same reply; the text is discarded
                        RunState::DispatchTool(reply)
                    };
                }

                RunState::DispatchTool(reply) => {
                    let calls = reply.tool_calls;
                    let assistant =
                        LlmMessage::assistant_tool_calls(String::new(), calls.clone());
                    let mut results = Vec::with_capacity(calls.len());
                    let mut network_failed = false;

                    for call in &calls {
                        let result = if network_failed {
                            json!({ "error": "SKIPPED", "detail": "not executed after a network failure" })
                        } else {
                            self.execute_call(call, &input, &mut trace, &mut network_failed)
                                .await
                        };
                        results.push(LlmMessage::tool_result(call.id.clone(), &result));
                    }

                    state = RunState::ReturnToolResult { assistant, results };
                }

                RunState::ReturnToolResult { assistant, results } => {
                    conversation.push(assistant);
                    conversation.extend(results);
                    state = RunState::CallModel;
                }

                RunState::Emit(text) => {
                    let reply = if text.trim().is_empty() {
                        warn!("Model emitted empty text, degrading to apology");
                        apology(&input.language).to_string()
                    } else {
                        text
                    };
                    info!(rounds, tool_calls = trace.len(), "Turn emitted");
                    return Ok(TurnOutcome {
                        reply,
                        trace,
                        aborted: false,
                    });
                }

                RunState::Abort => {
                    warn!(rounds, max_rounds = input.max_rounds, "Turn aborted");
                    return Ok(TurnOutcome {
                        reply: apology(&input.language).to_string(),
                        trace,
                        aborted: true,
                    });
                }
            }
        }
    }

    /// Execute one tool call: validate, dispatch, trace
    ///
    /// The returned value is what the model sees; `network_failed` is set so
    /// the caller can skip the remaining calls of the round.
    async fn execute_call(
        &self,
        call: &ToolCall,
        input: &TurnInput,
        trace: &mut Vec<ToolTrace>,
        network_failed: &mut bool,
    ) -> Value {
        let Some(spec) = find_tool(&call.name) else {
            warn!(tool = %call.name, "Model requested an unknown tool");
            return json!({ "error": "UNKNOWN_TOOL", "detail": call.name });
        };

        if let Err(violation) = validate_args(spec, &call.arguments) {
            debug!(tool = spec.name, %violation, "Rejecting tool call arguments");
            return json!({ "error": "INVALID_ARGS", "detail": violation.to_string() });
        }

        info!(tool = spec.name, "Dispatching tool call");
        let started = Instant::now();
        let outcome = self
            .dispatcher
            .dispatch(spec, &call.arguments, input.bearer.as_deref())
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(body) => {
                trace.push(ToolTrace {
                    name: spec.name.to_string(),
                    status: ToolStatus::Ok,
                    duration_ms,
                });
                json!({ "result": body })
            }
            Err(error) => {
                warn!(tool = spec.name, %error, "Tool call failed");
                let status = match error {
                    DispatchError::Timeout => ToolStatus::Timeout,
                    _ => ToolStatus::Error,
                };
                if matches!(error, DispatchError::Network(_)) {
                    *network_failed = true;
                }
                trace.push(ToolTrace {
                    name: spec.name.to_string(),
                    status,
                    duration_ms,
                });
                error.as_model_result()
            }
        }
    }

    fn render_system(&self, input: &TurnInput) -> String {
        let now = Utc::now();
        format!(
            "{SYSTEM_PROMPT}\n\n[Runtime Context]\nCURRENT_DATETIME_UTC = {}\nToday's date (UTC): {}\n\n[Runtime Instruction]\nLANG = {}\nAnswer exclusively in LANG. Do not mix languages.",
            now.to_rfc3339(),
            now.format("%Y-%m-%d"),
            input.language,
        )
    }

    /// History plus the current utterance, mapped to model roles
    fn seed_conversation(input: &TurnInput) -> Vec<LlmMessage> {
        let mut conversation: Vec<LlmMessage> = input
            .history
            .iter()
            .map(|msg| match msg.role {
                StoredRole::User => LlmMessage::user(msg.content.clone()),
                StoredRole::Assistant => LlmMessage::assistant(msg.content.clone()),
            })
            .collect();

        let mut parts = Vec::new();
        if let Some(audio) = &input.audio {
            parts.push(LlmPart::Audio {
                data: audio.data.clone(),
                format: audio.format.clone(),
            });
        }
        if let Some(text) = &input.user_text {
            parts.push(LlmPart::Text { text: text.clone() });
        }
        match (parts.len(), input.audio.is_some()) {
            (1, false) => conversation.push(LlmMessage::user(
                input.user_text.clone().unwrap_or_default(),
            )),
            (0, _) => {}
            _ => conversation.push(LlmMessage::user_parts(parts)),
        }
        conversation
    }
}
