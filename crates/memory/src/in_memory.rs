use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, NaiveDate, Utc};

use salesdesk_core::{ConversationId, SalespersonId};

use crate::store::{ConversationStore, StoreError};
use crate::types::{ClientInteraction, Conversation, DailyPlan, Message};

#[derive(Debug, Default)]
struct Tables {
    conversations: HashMap<SalespersonId, Conversation>,
    messages: Vec<Message>,
    interactions: Vec<ClientInteraction>,
    plans: HashMap<(SalespersonId, NaiveDate), DailyPlan>,
}

/// In-memory conversation store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    inner: RwLock<Tables>,
    failure: RwLock<Option<StoreError>>,
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message_count(&self) -> usize {
        self.inner.read().map(|t| t.messages.len()).unwrap_or(0)
    }

    pub fn interaction_count(&self) -> usize {
        self.inner.read().map(|t| t.interactions.len()).unwrap_or(0)
    }

    /// Make every subsequent call fail with `err` (`None` restores service).
    pub fn fail_with(&self, err: Option<StoreError>) {
        if let Ok(mut failure) = self.failure.write() {
            *failure = err;
        }
    }

    fn check_failure(&self) -> Result<(), StoreError> {
        match self.failure.read().map_err(|_| poisoned())?.as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get_or_create_conversation(
        &self,
        salesperson_id: SalespersonId,
        salesperson_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Conversation, StoreError> {
        self.check_failure()?;
        let mut tables = self.inner.write().map_err(|_| poisoned())?;
        let conversation = tables
            .conversations
            .entry(salesperson_id)
            .or_insert_with(|| Conversation {
                id: ConversationId::new(),
                salesperson_id,
                salesperson_name: salesperson_name.to_string(),
                created_at: now,
            });
        Ok(conversation.clone())
    }

    async fn save_message(&self, message: Message) -> Result<(), StoreError> {
        self.check_failure()?;
        let mut tables = self.inner.write().map_err(|_| poisoned())?;
        if !tables.conversations.values().any(|c| c.id == message.conversation_id) {
            return Err(StoreError::UnknownConversation(message.conversation_id));
        }
        tables.messages.push(message);
        Ok(())
    }

    async fn conversation_history(
        &self,
        conversation_id: ConversationId,
        limit: usize,
        since: DateTime<Utc>,
    ) -> Result<Vec<Message>, StoreError> {
        self.check_failure()?;
        let tables = self.inner.read().map_err(|_| poisoned())?;
        let mut messages: Vec<Message> = tables
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id && m.created_at >= since)
            .cloned()
            .collect();
        // Insertion order breaks ties between equal timestamps.
        messages.sort_by_key(|m| m.created_at);
        let skip = messages.len().saturating_sub(limit);
        Ok(messages.split_off(skip))
    }

    async fn save_interaction(&self, interaction: ClientInteraction) -> Result<(), StoreError> {
        self.check_failure()?;
        let mut tables = self.inner.write().map_err(|_| poisoned())?;
        tables.interactions.push(interaction);
        Ok(())
    }

    async fn salesperson_interactions(
        &self,
        salesperson_id: SalespersonId,
        since: DateTime<Utc>,
    ) -> Result<Vec<ClientInteraction>, StoreError> {
        self.check_failure()?;
        let tables = self.inner.read().map_err(|_| poisoned())?;
        let mut found: Vec<ClientInteraction> = tables
            .interactions
            .iter()
            .filter(|i| i.salesperson_id == salesperson_id && i.created_at >= since)
            .cloned()
            .collect();
        found.reverse();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn upcoming_actions(
        &self,
        salesperson_id: SalespersonId,
        from: NaiveDate,
        limit: usize,
    ) -> Result<Vec<ClientInteraction>, StoreError> {
        self.check_failure()?;
        let tables = self.inner.read().map_err(|_| poisoned())?;
        let mut due: Vec<ClientInteraction> = tables
            .interactions
            .iter()
            .filter(|i| i.salesperson_id == salesperson_id && i.next_action_date.is_some_and(|d| d >= from))
            .cloned()
            .collect();
        due.sort_by_key(|i| i.next_action_date);
        due.truncate(limit);
        Ok(due)
    }

    async fn save_daily_plan(&self, plan: DailyPlan) -> Result<DailyPlan, StoreError> {
        self.check_failure()?;
        let mut tables = self.inner.write().map_err(|_| poisoned())?;
        let key = (plan.salesperson_id, plan.date);
        let saved = match tables.plans.get(&key) {
            Some(existing) => DailyPlan {
                created_at: existing.created_at,
                ..plan
            },
            None => plan,
        };
        tables.plans.insert(key, saved.clone());
        Ok(saved)
    }

    async fn daily_plan(
        &self,
        salesperson_id: SalespersonId,
        date: NaiveDate,
    ) -> Result<Option<DailyPlan>, StoreError> {
        self.check_failure()?;
        let tables = self.inner.read().map_err(|_| poisoned())?;
        Ok(tables.plans.get(&(salesperson_id, date)).cloned())
    }
}
