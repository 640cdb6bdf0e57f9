//! `salesdesk-assistant`
//!
//! **Responsibility:** the conversational front of the sales assistant.
//!
//! A message is classified into one intent (language model first, keyword rules
//! when the model answers nonsense), routed to the analytics engines or the
//! memory, and answered in Italian. Every turn is remembered.

pub mod classifier;
pub mod config;
pub mod daily_plan;
pub mod error;
pub mod http_llm;
pub mod intent;
pub mod llm;
pub mod orchestrator;
pub mod prompts;
pub mod services;

pub use classifier::{ClassifyError, FallbackClassifier, IntentClassifier, LlmIntentClassifier, RuleBasedClassifier};
pub use config::AssistantConfig;
pub use error::{DispatchError, OrchestratorError};
pub use http_llm::OpenAiCompatibleModel;
pub use intent::{Intent, IntentType};
pub use llm::{ChatMessage, CompletionRequest, LanguageModel, LlmError};
pub use orchestrator::{FATAL_REPLY, Orchestrator, SESSION_EXPIRED_REPLY};
pub use services::AssistantServices;
