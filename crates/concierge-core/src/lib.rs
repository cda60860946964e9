// Turn orchestration core
//
// This crate implements the hard part of the gateway: the function-calling
// turn state machine (LLM call → tool dispatch → loop → final text) plus the
// collaborators it drives.
//
// Key design decisions:
// - Traits at the seams (LlmClient, ToolDispatcher) so the orchestrator is
//   testable with scripted collaborators and the API crate can share clients
//   as Arc<dyn ...>
// - The tool catalogue is a closed static table; dispatch is a table lookup
// - Backend tool failures are data fed back to the model, never errors
//   propagated out of the orchestrator

pub mod backend;
pub mod config;
pub mod error;
pub mod language;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod tools;

pub use backend::{BackendClient, DispatchError, ToolDispatcher};
pub use config::AppConfig;
pub use error::{AgentError, Result};
pub use language::{LanguageDetector, apology, DEFAULT_LANGUAGE};
pub use llm::{
    LlmClient, LlmContent, LlmMessage, LlmPart, LlmReply, LlmRequest, LlmRole, ToolCall,
    ToolDeclaration,
};
pub use openai::OpenAiChatClient;
pub use orchestrator::{Orchestrator, TurnInput, TurnOutcome, SYSTEM_PROMPT};
pub use tools::{catalogue, find_tool, validate_args, ArgKind, BackendMethod, ToolSpec};
