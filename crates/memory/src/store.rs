//! Persistence seam for conversations, interactions and daily plans.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use salesdesk_core::{ConversationId, SalespersonId};

use crate::types::{ClientInteraction, Conversation, DailyPlan, InteractionStats, Message};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("conversation store unavailable: {0}")]
    Unavailable(String),

    #[error("unknown conversation {0}")]
    UnknownConversation(ConversationId),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Storage backend used by [`crate::MemoryManager`].
///
/// Writes are appends except `save_daily_plan`, which replaces the plan for the
/// same salesperson and date. Time windows are passed in by the caller.
#[async_trait::async_trait]
pub trait ConversationStore: Send + Sync {
    async fn get_or_create_conversation(
        &self,
        salesperson_id: SalespersonId,
        salesperson_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Conversation, StoreError>;

    async fn save_message(&self, message: Message) -> Result<(), StoreError>;

    /// Latest `limit` messages created at or after `since`, oldest first.
    async fn conversation_history(
        &self,
        conversation_id: ConversationId,
        limit: usize,
        since: DateTime<Utc>,
    ) -> Result<Vec<Message>, StoreError>;

    async fn save_interaction(&self, interaction: ClientInteraction) -> Result<(), StoreError>;

    /// Interactions created at or after `since`, newest first.
    async fn salesperson_interactions(
        &self,
        salesperson_id: SalespersonId,
        since: DateTime<Utc>,
    ) -> Result<Vec<ClientInteraction>, StoreError>;

    /// Interactions with a next action due on or after `from`, soonest first.
    async fn upcoming_actions(
        &self,
        salesperson_id: SalespersonId,
        from: NaiveDate,
        limit: usize,
    ) -> Result<Vec<ClientInteraction>, StoreError>;

    async fn save_daily_plan(&self, plan: DailyPlan) -> Result<DailyPlan, StoreError>;

    async fn daily_plan(
        &self,
        salesperson_id: SalespersonId,
        date: NaiveDate,
    ) -> Result<Option<DailyPlan>, StoreError>;

    async fn interaction_stats(
        &self,
        salesperson_id: SalespersonId,
        since: DateTime<Utc>,
    ) -> Result<InteractionStats, StoreError> {
        let interactions = self.salesperson_interactions(salesperson_id, since).await?;
        Ok(InteractionStats::from_interactions(&interactions))
    }
}

#[async_trait::async_trait]
impl<S> ConversationStore for Arc<S>
where
    S: ConversationStore + ?Sized,
{
    async fn get_or_create_conversation(
        &self,
        salesperson_id: SalespersonId,
        salesperson_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Conversation, StoreError> {
        (**self).get_or_create_conversation(salesperson_id, salesperson_name, now).await
    }

    async fn save_message(&self, message: Message) -> Result<(), StoreError> {
        (**self).save_message(message).await
    }

    async fn conversation_history(
        &self,
        conversation_id: ConversationId,
        limit: usize,
        since: DateTime<Utc>,
    ) -> Result<Vec<Message>, StoreError> {
        (**self).conversation_history(conversation_id, limit, since).await
    }

    async fn save_interaction(&self, interaction: ClientInteraction) -> Result<(), StoreError> {
        (**self).save_interaction(interaction).await
    }

    async fn salesperson_interactions(
        &self,
        salesperson_id: SalespersonId,
        since: DateTime<Utc>,
    ) -> Result<Vec<ClientInteraction>, StoreError> {
        (**self).salesperson_interactions(salesperson_id, since).await
    }

    async fn upcoming_actions(
        &self,
        salesperson_id: SalespersonId,
        from: NaiveDate,
        limit: usize,
    ) -> Result<Vec<ClientInteraction>, StoreError> {
        (**self).upcoming_actions(salesperson_id, from, limit).await
    }

    async fn save_daily_plan(&self, plan: DailyPlan) -> Result<DailyPlan, StoreError> {
        (**self).save_daily_plan(plan).await
    }

    async fn daily_plan(
        &self,
        salesperson_id: SalespersonId,
        date: NaiveDate,
    ) -> Result<Option<DailyPlan>, StoreError> {
        (**self).daily_plan(salesperson_id, date).await
    }

    async fn interaction_stats(
        &self,
        salesperson_id: SalespersonId,
        since: DateTime<Utc>,
    ) -> Result<InteractionStats, StoreError> {
        (**self).interaction_stats(salesperson_id, since).await
    }
}
