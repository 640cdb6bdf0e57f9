//! `salesdesk-memory`
//!
//! **Responsibility:** conversation memory of the assistant.
//!
//! - One lazily created conversation per salesperson, append-only messages
//! - Logged client interactions and their follow-ups
//! - One daily plan per salesperson per day
//! - Extraction of interaction facts from free text (`extract`)

pub mod extract;
pub mod in_memory;
pub mod manager;
pub mod store;
pub mod types;

pub use extract::{ExtractedInteraction, extract_interaction_from_message, parse_amount};
pub use in_memory::InMemoryConversationStore;
pub use manager::{MemoryError, MemoryManager, RECENT_INTERACTION_DAYS, UPCOMING_ACTIONS_LIMIT};
pub use store::{ConversationStore, StoreError};
pub use types::{
    ClientInteraction, Conversation, DailyPlan, HistoryWindow, InteractionStats, InteractionType, InteractionView,
    Message, MessageContext, NewInteraction, Outcome, Role,
};
