//! Records owned by the Memory Manager.
//!
//! Conversations, messages and interactions are append-only. A daily plan is
//! the one record that is replaced, at most once per salesperson per day.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use salesdesk_core::{ConversationId, CustomerId, InteractionId, MessageId, SalespersonId};

/// The single running conversation of a salesperson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub salesperson_id: SalespersonId,
    pub salesperson_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub role: Role,
    pub content: String,
    /// Free-form, e.g. `{"intent": "daily_plan"}` on assistant replies.
    #[serde(default)]
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    Call,
    Email,
    Meeting,
    Order,
    Note,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionType::Call => "call",
            InteractionType::Email => "email",
            InteractionType::Meeting => "meeting",
            InteractionType::Order => "order",
            InteractionType::Note => "note",
        }
    }

    /// Italian label used in replies.
    pub fn label(&self) -> &'static str {
        match self {
            InteractionType::Call => "chiamata",
            InteractionType::Email => "email",
            InteractionType::Meeting => "incontro",
            InteractionType::Order => "ordine",
            InteractionType::Note => "nota",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Positive,
    Neutral,
    Negative,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Positive => "positive",
            Outcome::Neutral => "neutral",
            Outcome::Negative => "negative",
        }
    }
}

/// A logged touchpoint with a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInteraction {
    pub id: InteractionId,
    pub conversation_id: ConversationId,
    pub salesperson_id: SalespersonId,
    /// Records-system customer, when resolved.
    pub customer_id: Option<CustomerId>,
    pub customer_name: Option<String>,
    pub interaction_type: InteractionType,
    pub summary: String,
    pub outcome: Option<Outcome>,
    pub amount: Option<f64>,
    pub next_action: Option<String>,
    pub next_action_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Input for [`crate::MemoryManager::save_client_interaction`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInteraction {
    pub customer_id: Option<CustomerId>,
    pub customer_name: Option<String>,
    pub interaction_type: InteractionType,
    pub summary: String,
    pub outcome: Option<Outcome>,
    pub amount: Option<f64>,
    pub next_action: Option<String>,
    pub next_action_date: Option<NaiveDate>,
}

impl NewInteraction {
    pub fn new(interaction_type: InteractionType, summary: impl Into<String>) -> Self {
        Self {
            customer_id: None,
            customer_name: None,
            interaction_type,
            summary: summary.into(),
            outcome: None,
            amount: None,
            next_action: None,
            next_action_date: None,
        }
    }

    pub fn with_customer(mut self, id: Option<CustomerId>, name: Option<String>) -> Self {
        self.customer_id = id;
        self.customer_name = name;
        self
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_next_action(mut self, action: impl Into<String>, on: NaiveDate) -> Self {
        self.next_action = Some(action.into());
        self.next_action_date = Some(on);
        self
    }
}

/// An interaction as read back, with its age computed at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionView {
    #[serde(flatten)]
    pub interaction: ClientInteraction,
    pub days_ago: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPlan {
    pub salesperson_id: SalespersonId,
    pub date: NaiveDate,
    pub content: String,
    #[serde(default)]
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionStats {
    pub total: usize,
    pub by_type: BTreeMap<InteractionType, usize>,
    pub by_outcome: BTreeMap<Outcome, usize>,
    /// Sum of the amounts mentioned.
    pub total_amount: f64,
}

impl InteractionStats {
    pub fn from_interactions<'a>(interactions: impl IntoIterator<Item = &'a ClientInteraction>) -> Self {
        let mut stats = Self::default();
        for i in interactions {
            stats.total += 1;
            *stats.by_type.entry(i.interaction_type).or_default() += 1;
            if let Some(outcome) = i.outcome {
                *stats.by_outcome.entry(outcome).or_default() += 1;
            }
            stats.total_amount += i.amount.unwrap_or(0.0);
        }
        stats
    }

    pub fn count(&self, kind: InteractionType) -> usize {
        self.by_type.get(&kind).copied().unwrap_or(0)
    }
}

/// How much conversation history to load.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryWindow {
    pub limit: usize,
    pub days_back: i64,
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self {
            limit: 20,
            days_back: 7,
        }
    }
}

/// Everything the orchestrator loads before answering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageContext {
    /// Oldest first.
    pub history: Vec<Message>,
    pub recent_interactions: Vec<InteractionView>,
    pub upcoming_actions: Vec<ClientInteraction>,
}
