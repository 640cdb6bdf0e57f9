use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use salesdesk_assistant::{
    AssistantConfig, AssistantServices, CompletionRequest, FATAL_REPLY, LanguageModel, LlmError, Orchestrator,
    SESSION_EXPIRED_REPLY,
};
use salesdesk_core::{BusinessAssumptions, FixedClock, SalespersonContext, SalespersonId};
use salesdesk_memory::{InMemoryConversationStore, InteractionType, MemoryManager, Outcome, Role, StoreError};
use salesdesk_records::{InMemoryRecordsClient, OrderState, RecordsError};

/// Replies in order and records every request.
#[derive(Default)]
struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Transport("script exhausted".to_string())))
    }
}

fn test_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap()
}

struct Harness {
    orchestrator: Orchestrator,
    records: Arc<InMemoryRecordsClient>,
    store: Arc<InMemoryConversationStore>,
    model: Arc<ScriptedModel>,
    salesperson: SalespersonContext,
}

impl Harness {
    fn new(replies: Vec<Result<String, LlmError>>) -> Self {
        let records = Arc::new(InMemoryRecordsClient::new());
        let user = records.add_user("Giulia Bianchi", "giulia");
        let store = Arc::new(InMemoryConversationStore::new());
        let model = ScriptedModel::new(replies);

        let orchestrator = AssistantServices {
            records: records.clone(),
            store: store.clone(),
            llm: model.clone(),
            clock: Arc::new(FixedClock(test_time())),
            assumptions: Arc::new(BusinessAssumptions::default()),
        }
        .build(AssistantConfig::default());

        Self {
            orchestrator,
            records,
            store,
            model,
            salesperson: SalespersonContext::new(SalespersonId::new(), "Giulia Bianchi", Some(user)),
        }
    }

    fn memory(&self) -> MemoryManager {
        MemoryManager::new(self.store.clone(), Arc::new(FixedClock(test_time())))
    }

    fn seed_lapsed_customer(&self, name: &str) {
        let user = self.salesperson.erp_user_id;
        let c = self.records.add_customer(name, user, test_time() - Duration::days(400));
        for i in 0..20 {
            let at = test_time() - Duration::days(100 + i * 5);
            self.records.add_order(c, 3_000.0, at, OrderState::Sale, user);
        }
    }

    async fn ask(&self, text: &str) -> String {
        self.orchestrator.process_message(&self.salesperson, text).await
    }
}

fn ok(s: &str) -> Result<String, LlmError> {
    Ok(s.to_string())
}

#[tokio::test]
async fn daily_plan_via_fallback_is_rendered_and_persisted() {
    let h = Harness::new(vec![ok("Certo! Ecco cosa farei...")]);
    h.seed_lapsed_customer("Trattoria Da Mario");

    let reply = h.ask("cosa devo fare oggi").await;

    assert!(reply.starts_with("Buongiorno Giulia!"), "{reply}");
    assert!(reply.contains("Trattoria Da Mario"));
    assert!(reply.contains("Obiettivo di oggi"));

    let memory = h.memory();
    let plan = memory
        .get_daily_plan(&h.salesperson, test_time().date_naive())
        .await
        .unwrap()
        .expect("plan stored");
    assert_eq!(plan.content, reply);

    let history = memory
        .get_conversation_history(&h.salesperson, Default::default())
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[1].metadata["intent"], "daily_plan");
}

#[tokio::test]
async fn expired_records_session_gets_recovery_reply() {
    let h = Harness::new(vec![ok(r#"{"type": "churn_risk", "confidence": 0.9}"#)]);
    h.records.expire_session();

    let reply = h.ask("chi sta per abbandonarmi?").await;

    assert_eq!(reply, SESSION_EXPIRED_REPLY);
    assert!(reply.contains("ricarica la pagina"), "{reply}");
    assert!(reply.contains("accedi di nuovo al gestionale"), "{reply}");
    assert!(!reply.contains("mi ricollego"));
    assert_eq!(h.store.message_count(), 2);
}

#[tokio::test]
async fn records_failure_is_reported_with_its_message() {
    let h = Harness::new(vec![ok(r#"{"type": "churn_risk", "confidence": 0.9}"#)]);
    h.records.fail_with(Some(RecordsError::Rpc("upstream timeout".to_string())));

    let reply = h.ask("chi sta per abbandonarmi?").await;

    assert!(reply.starts_with("Mi dispiace, si è verificato un errore:"), "{reply}");
    assert!(reply.contains("upstream timeout"), "{reply}");
    let history = h
        .memory()
        .get_conversation_history(&h.salesperson, Default::default())
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, reply);
    assert_eq!(history[1].metadata["intent"], "churn_risk");
}

#[tokio::test]
async fn context_load_failure_is_fatal_and_stores_nothing() {
    let h = Harness::new(vec![ok(r#"{"type": "general", "confidence": 0.7}"#)]);
    h.store.fail_with(Some(StoreError::Unavailable("disk full".to_string())));

    let reply = h.ask("ciao").await;

    assert_eq!(reply, FATAL_REPLY);
    assert_eq!(h.store.message_count(), 0);
    assert!(h.model.requests().is_empty());
}

#[tokio::test]
async fn classification_transport_failure_is_fatal() {
    let h = Harness::new(vec![Err(LlmError::Transport("connection refused".to_string()))]);

    let reply = h.ask("ciao").await;

    assert_eq!(reply, FATAL_REPLY);
    // The user turn was stored before classification; no reply is stored.
    assert_eq!(h.store.message_count(), 1);
}

#[tokio::test]
async fn recorded_call_is_linked_to_the_customer() {
    let h = Harness::new(vec![ok(r#"{"type": "record_interaction", "confidence": 0.95}"#)]);
    let customer = h
        .records
        .add_customer("Mario Rossi", h.salesperson.erp_user_id, test_time() - Duration::days(90));

    let reply = h.ask("Ho chiamato Mario Rossi, è andata bene, lo risento domani").await;
    assert!(reply.starts_with("📝 Registrato: chiamata con Mario Rossi"), "{reply}");

    let recent = h.memory().get_recent_interactions(&h.salesperson, 7).await.unwrap();
    assert_eq!(recent.len(), 1);
    let saved = &recent[0].interaction;
    assert_eq!(saved.interaction_type, InteractionType::Call);
    assert_eq!(saved.outcome, Some(Outcome::Positive));
    assert_eq!(saved.customer_id, Some(customer));
    assert_eq!(saved.next_action_date, Some(test_time().date_naive() + Duration::days(1)));
}

#[tokio::test]
async fn ambiguous_client_in_recorded_call_asks_which_one() {
    let h = Harness::new(vec![ok(r#"{"type": "record_interaction", "confidence": 0.95}"#)]);
    let user = h.salesperson.erp_user_id;
    h.records.add_customer("Bar Sport Centro", user, test_time() - Duration::days(90));
    h.records.add_customer("Bar Sport Stazione", user, test_time() - Duration::days(90));

    let reply = h.ask("Ho chiamato Bar Sport, è andata bene").await;

    assert!(reply.contains("Bar Sport Centro"), "{reply}");
    assert!(reply.contains("Bar Sport Stazione"), "{reply}");
    assert!(reply.contains("Quale intendi?"), "{reply}");
    assert!(!reply.contains("Registrato"));
    assert_eq!(h.store.interaction_count(), 0);
}

#[tokio::test]
async fn unknown_client_in_recorded_call_is_not_saved() {
    let h = Harness::new(vec![ok(r#"{"type": "record_interaction", "confidence": 0.95}"#)]);
    h.records
        .add_customer("Mario Rossi", h.salesperson.erp_user_id, test_time() - Duration::days(90));

    let reply = h.ask("Ho chiamato Ferramenta Neri, è andata bene").await;

    assert!(reply.starts_with("Non ho trovato clienti con nome \"Ferramenta Neri\""), "{reply}");
    assert_eq!(h.store.interaction_count(), 0);
}

#[tokio::test]
async fn ambiguous_client_info_lists_matches_without_analysis() {
    let h = Harness::new(vec![ok(
        r#"{"type": "client_info", "confidence": 0.9, "extractedData": {"clientName": "Bar Sport"}}"#,
    )]);
    let user = h.salesperson.erp_user_id;
    h.records.add_customer("Bar Sport Centro", user, test_time() - Duration::days(90));
    h.records.add_customer("Bar Sport Stazione", user, test_time() - Duration::days(90));

    let reply = h.ask("dimmi di Bar Sport").await;

    assert!(reply.contains("• Bar Sport Centro\n• Bar Sport Stazione"), "{reply}");
    assert!(reply.contains("Quale intendi?"));
    assert!(!reply.contains("Segmento"));
}

#[tokio::test]
async fn performance_check_uses_kpi_template() {
    let h = Harness::new(vec![ok(r#"{"type": "performance_check", "confidence": 0.8}"#)]);
    let user = h.salesperson.erp_user_id;
    let c = h.records.add_customer("Bar Sport", user, test_time() - Duration::days(300));
    h.records.add_order(c, 12_500.0, test_time() - Duration::days(2), OrderState::Sale, user);

    let reply = h.ask("come sto andando?").await;

    assert!(reply.contains("Performance 2026-10"), "{reply}");
    assert!(reply.contains("€12.500 su €50.000 (25%)"));
}

#[tokio::test]
async fn general_question_sends_history_and_current_message() {
    let h = Harness::new(vec![
        ok(r#"{"type": "general", "confidence": 0.7}"#),
        ok("Buongiorno!"),
        ok(r#"{"type": "general", "confidence": 0.7}"#),
        ok("Prova a proporre la linea premium."),
    ]);

    assert_eq!(h.ask("buongiorno").await, "Buongiorno!");
    let reply = h.ask("un consiglio per oggi?").await;
    assert_eq!(reply, "Prova a proporre la linea premium.");

    let requests = h.model.requests();
    assert_eq!(requests.len(), 4);
    let chat = &requests[3];
    let turns: Vec<(Role, &str)> = chat.messages.iter().map(|m| (m.role, m.content.as_str())).collect();
    assert_eq!(
        turns,
        vec![
            (Role::User, "buongiorno"),
            (Role::Assistant, "Buongiorno!"),
            (Role::User, "un consiglio per oggi?"),
        ]
    );
    assert!(chat.system.as_deref().unwrap_or_default().contains("Giulia"));
    assert_eq!(chat.temperature, 0.7);
}

#[tokio::test]
async fn unknown_client_is_reported() {
    let h = Harness::new(vec![ok(
        r#"{"type": "client_info", "confidence": 0.9, "extractedData": {"clientName": "Ferramenta Neri"}}"#,
    )]);

    let reply = h.ask("dimmi di Ferramenta Neri").await;

    assert_eq!(reply, "Non ho trovato clienti con nome \"Ferramenta Neri\".");
}
