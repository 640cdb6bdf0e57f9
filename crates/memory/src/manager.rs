//! Memory Manager: conversation turns, client interactions, follow-ups and daily
//! plans for one salesperson at a time.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, info};

use salesdesk_core::{Clock, InteractionId, MessageId, SalespersonContext};

use crate::store::{ConversationStore, StoreError};
use crate::types::{
    ClientInteraction, Conversation, DailyPlan, HistoryWindow, InteractionStats, InteractionView, Message,
    MessageContext, NewInteraction, Role,
};

/// Days of interactions loaded into the message context.
pub const RECENT_INTERACTION_DAYS: i64 = 7;
/// Upcoming follow-ups loaded into the message context.
pub const UPCOMING_ACTIONS_LIMIT: usize = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub struct MemoryManager {
    store: Arc<dyn ConversationStore>,
    clock: Arc<dyn Clock>,
    window: HistoryWindow,
}

impl MemoryManager {
    pub fn new(store: Arc<dyn ConversationStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            window: HistoryWindow::default(),
        }
    }

    /// History window used by [`Self::get_message_context`].
    pub fn with_history_window(mut self, window: HistoryWindow) -> Self {
        self.window = window;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    async fn conversation(&self, salesperson: &SalespersonContext) -> Result<Conversation, MemoryError> {
        Ok(self
            .store
            .get_or_create_conversation(salesperson.id, &salesperson.name, self.clock.now())
            .await?)
    }

    pub async fn save_message(
        &self,
        salesperson: &SalespersonContext,
        role: Role,
        content: &str,
        metadata: JsonValue,
    ) -> Result<Message, MemoryError> {
        let conversation = self.conversation(salesperson).await?;
        let message = Message {
            id: MessageId::new(),
            conversation_id: conversation.id,
            role,
            content: content.to_string(),
            metadata,
            created_at: self.clock.now(),
        };
        self.store.save_message(message.clone()).await?;
        debug!(salesperson = %salesperson.id, role = role.as_str(), "message saved");
        Ok(message)
    }

    /// Latest `window.limit` messages within `window.days_back`, oldest first.
    pub async fn get_conversation_history(
        &self,
        salesperson: &SalespersonContext,
        window: HistoryWindow,
    ) -> Result<Vec<Message>, MemoryError> {
        let conversation = self.conversation(salesperson).await?;
        let since = self.clock.now() - Duration::days(window.days_back);
        Ok(self
            .store
            .conversation_history(conversation.id, window.limit, since)
            .await?)
    }

    pub async fn save_client_interaction(
        &self,
        salesperson: &SalespersonContext,
        new: NewInteraction,
    ) -> Result<ClientInteraction, MemoryError> {
        if new.summary.trim().is_empty() {
            return Err(MemoryError::InvalidInput("interaction summary is empty".to_string()));
        }
        let conversation = self.conversation(salesperson).await?;
        let interaction = ClientInteraction {
            id: InteractionId::new(),
            conversation_id: conversation.id,
            salesperson_id: salesperson.id,
            customer_id: new.customer_id,
            customer_name: new.customer_name,
            interaction_type: new.interaction_type,
            summary: new.summary,
            outcome: new.outcome,
            amount: new.amount,
            next_action: new.next_action,
            next_action_date: new.next_action_date,
            created_at: self.clock.now(),
        };
        self.store.save_interaction(interaction.clone()).await?;
        info!(
            salesperson = %salesperson.id,
            interaction_type = interaction.interaction_type.as_str(),
            customer = interaction.customer_name.as_deref().unwrap_or("-"),
            "client interaction saved"
        );
        Ok(interaction)
    }

    /// Interactions of the last `days_back` days, newest first.
    pub async fn get_recent_interactions(
        &self,
        salesperson: &SalespersonContext,
        days_back: i64,
    ) -> Result<Vec<InteractionView>, MemoryError> {
        let now = self.clock.now();
        let interactions = self
            .store
            .salesperson_interactions(salesperson.id, now - Duration::days(days_back))
            .await?;
        Ok(interactions
            .into_iter()
            .map(|interaction| InteractionView {
                days_ago: (now - interaction.created_at).num_days().max(0),
                interaction,
            })
            .collect())
    }

    /// Follow-ups due today or later, soonest first.
    pub async fn get_upcoming_actions(
        &self,
        salesperson: &SalespersonContext,
    ) -> Result<Vec<ClientInteraction>, MemoryError> {
        Ok(self
            .store
            .upcoming_actions(salesperson.id, self.today(), UPCOMING_ACTIONS_LIMIT)
            .await?)
    }

    /// History, recent interactions and upcoming actions, loaded concurrently.
    pub async fn get_message_context(&self, salesperson: &SalespersonContext) -> Result<MessageContext, MemoryError> {
        let (history, recent_interactions, upcoming_actions) = tokio::try_join!(
            self.get_conversation_history(salesperson, self.window),
            self.get_recent_interactions(salesperson, RECENT_INTERACTION_DAYS),
            self.get_upcoming_actions(salesperson),
        )?;
        debug!(
            salesperson = %salesperson.id,
            history = history.len(),
            interactions = recent_interactions.len(),
            upcoming = upcoming_actions.len(),
            "message context loaded"
        );
        Ok(MessageContext {
            history,
            recent_interactions,
            upcoming_actions,
        })
    }

    /// Store today's plan, replacing an earlier one for the same day.
    pub async fn save_daily_plan(
        &self,
        salesperson: &SalespersonContext,
        content: &str,
        metadata: JsonValue,
    ) -> Result<DailyPlan, MemoryError> {
        let now = self.clock.now();
        let plan = DailyPlan {
            salesperson_id: salesperson.id,
            date: now.date_naive(),
            content: content.to_string(),
            metadata,
            created_at: now,
            updated_at: now,
        };
        Ok(self.store.save_daily_plan(plan).await?)
    }

    pub async fn get_daily_plan(
        &self,
        salesperson: &SalespersonContext,
        date: NaiveDate,
    ) -> Result<Option<DailyPlan>, MemoryError> {
        Ok(self.store.daily_plan(salesperson.id, date).await?)
    }

    pub async fn get_interaction_stats(
        &self,
        salesperson: &SalespersonContext,
        days_back: i64,
    ) -> Result<InteractionStats, MemoryError> {
        let since = self.clock.now() - Duration::days(days_back);
        Ok(self.store.interaction_stats(salesperson.id, since).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryConversationStore;
    use crate::types::{InteractionType, Outcome};
    use chrono::{DateTime, TimeZone, Utc};
    use salesdesk_core::{CustomerId, SalespersonId};
    use serde_json::json;
    use std::sync::RwLock;

    /// Clock the test can move forward.
    struct StepClock(RwLock<DateTime<Utc>>);

    impl StepClock {
        fn advance(&self, by: Duration) {
            let mut now = self.0.write().unwrap();
            *now += by;
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.read().unwrap()
        }
    }

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
    }

    fn setup() -> (MemoryManager, Arc<StepClock>, Arc<InMemoryConversationStore>, SalespersonContext) {
        let clock = Arc::new(StepClock(RwLock::new(test_time())));
        let store = Arc::new(InMemoryConversationStore::new());
        let manager = MemoryManager::new(store.clone(), clock.clone());
        let sp = SalespersonContext::new(SalespersonId::new(), "Giulia Bianchi", None);
        (manager, clock, store, sp)
    }

    #[tokio::test]
    async fn history_is_oldest_first_and_limited() {
        let (manager, clock, _, sp) = setup();
        for i in 0..5 {
            manager
                .save_message(&sp, Role::User, &format!("msg {i}"), JsonValue::Null)
                .await
                .unwrap();
            clock.advance(Duration::minutes(1));
        }
        let history = manager
            .get_conversation_history(&sp, HistoryWindow { limit: 3, days_back: 7 })
            .await
            .unwrap();
        let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["msg 2", "msg 3", "msg 4"]);
    }

    #[tokio::test]
    async fn history_ignores_messages_outside_window() {
        let (manager, clock, _, sp) = setup();
        manager.save_message(&sp, Role::User, "old", JsonValue::Null).await.unwrap();
        clock.advance(Duration::days(10));
        manager.save_message(&sp, Role::User, "new", JsonValue::Null).await.unwrap();
        let history = manager.get_conversation_history(&sp, HistoryWindow::default()).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "new");
    }

    #[tokio::test]
    async fn one_conversation_per_salesperson() {
        let (manager, _, _, sp) = setup();
        let a = manager.save_message(&sp, Role::User, "ciao", JsonValue::Null).await.unwrap();
        let b = manager
            .save_message(&sp, Role::Assistant, "buongiorno", json!({"intent": "general"}))
            .await
            .unwrap();
        assert_eq!(a.conversation_id, b.conversation_id);

        let other = SalespersonContext::new(SalespersonId::new(), "Marco", None);
        let c = manager.save_message(&other, Role::User, "ciao", JsonValue::Null).await.unwrap();
        assert_ne!(a.conversation_id, c.conversation_id);
    }

    #[tokio::test]
    async fn interactions_report_days_ago_at_read_time() {
        let (manager, clock, _, sp) = setup();
        manager
            .save_client_interaction(&sp, NewInteraction::new(InteractionType::Call, "Chiamato Bar Sport"))
            .await
            .unwrap();
        clock.advance(Duration::days(3));
        let recent = manager.get_recent_interactions(&sp, 7).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].days_ago, 3);

        clock.advance(Duration::days(5));
        assert!(manager.get_recent_interactions(&sp, 7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upcoming_actions_skip_past_dates_and_sort_by_due_date() {
        let (manager, _, _, sp) = setup();
        let today = manager.today();
        for (summary, offset) in [("later", 5), ("past", -2), ("soon", 1), ("today", 0)] {
            manager
                .save_client_interaction(
                    &sp,
                    NewInteraction::new(InteractionType::Meeting, summary)
                        .with_next_action("richiamare", today + Duration::days(offset)),
                )
                .await
                .unwrap();
        }
        manager
            .save_client_interaction(&sp, NewInteraction::new(InteractionType::Note, "no follow-up"))
            .await
            .unwrap();

        let upcoming = manager.get_upcoming_actions(&sp).await.unwrap();
        let order: Vec<_> = upcoming.iter().map(|i| i.summary.as_str()).collect();
        assert_eq!(order, vec!["today", "soon", "later"]);
    }

    #[tokio::test]
    async fn message_context_combines_all_reads() {
        let (manager, _, _, sp) = setup();
        manager.save_message(&sp, Role::User, "ciao", JsonValue::Null).await.unwrap();
        manager
            .save_client_interaction(
                &sp,
                NewInteraction::new(InteractionType::Order, "Ordine Trattoria")
                    .with_customer(Some(CustomerId(7)), Some("Trattoria".to_string()))
                    .with_amount(1_200.0)
                    .with_next_action("consegna", manager.today()),
            )
            .await
            .unwrap();

        let ctx = manager.get_message_context(&sp).await.unwrap();
        assert_eq!(ctx.history.len(), 1);
        assert_eq!(ctx.recent_interactions.len(), 1);
        assert_eq!(ctx.upcoming_actions.len(), 1);
    }

    #[tokio::test]
    async fn daily_plan_is_upserted_per_day() {
        let (manager, clock, _, sp) = setup();
        let first = manager.save_daily_plan(&sp, "piano v1", JsonValue::Null).await.unwrap();
        clock.advance(Duration::hours(2));
        let second = manager.save_daily_plan(&sp, "piano v2", JsonValue::Null).await.unwrap();
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at > first.updated_at);

        let stored = manager.get_daily_plan(&sp, manager.today()).await.unwrap().unwrap();
        assert_eq!(stored.content, "piano v2");

        clock.advance(Duration::days(1));
        assert!(manager.get_daily_plan(&sp, manager.today()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn interaction_stats_count_by_type_and_outcome() {
        let (manager, _, store, sp) = setup();
        let entries = [
            NewInteraction::new(InteractionType::Call, "a").with_outcome(Outcome::Positive),
            NewInteraction::new(InteractionType::Call, "b").with_outcome(Outcome::Negative),
            NewInteraction::new(InteractionType::Order, "c").with_amount(800.0),
        ];
        for e in entries {
            manager.save_client_interaction(&sp, e).await.unwrap();
        }
        assert_eq!(store.interaction_count(), 3);

        let stats = manager.get_interaction_stats(&sp, 30).await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.count(InteractionType::Call), 2);
        assert_eq!(stats.by_outcome.get(&Outcome::Positive), Some(&1));
        assert_eq!(stats.total_amount, 800.0);
    }

    #[tokio::test]
    async fn empty_summary_is_rejected() {
        let (manager, _, _, sp) = setup();
        let err = manager
            .save_client_interaction(&sp, NewInteraction::new(InteractionType::Note, "  "))
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::InvalidInput(_)));
    }
}
