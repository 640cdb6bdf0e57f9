//! Message routing: classify, dispatch to the engines, reply, remember.

use std::fmt::Write as _;
use std::sync::Arc;

use futures::TryFutureExt;
use serde_json::json;
use tracing::{error, info, warn};

use salesdesk_ai::{
    ChurnAlert, ClientAnalysis, CustomerIntelligence, PerformanceTracker, UpsellOpportunity, format_eur, format_kpis,
};
use salesdesk_core::{Clock, SalespersonContext, days_remaining_in_month};
use salesdesk_memory::{
    ClientInteraction, MemoryManager, MessageContext, Outcome, Role, extract_interaction_from_message,
};
use salesdesk_records::Customer;

use crate::classifier::IntentClassifier;
use crate::config::AssistantConfig;
use crate::daily_plan::{DailyPlanInput, URGENT_ACTIONS, render_daily_plan};
use crate::error::{DispatchError, OrchestratorError};
use crate::intent::{Intent, IntentType};
use crate::llm::{ChatMessage, CompletionRequest, LanguageModel};
use crate::prompts::conversation_prompt;

pub const SESSION_EXPIRED_REPLY: &str = "La sessione con il gestionale è scaduta. Per continuare:\n\
     1. ricarica la pagina;\n\
     2. accedi di nuovo al gestionale con le tue credenziali;\n\
     3. rimandami il messaggio.";
pub const FATAL_REPLY: &str = "Mi dispiace, non riesco a rispondere in questo momento. Riprova più tardi.";

const LIST_LIMIT: usize = 5;

/// Outcome of looking up a customer by the name the user typed.
enum CustomerLookup {
    Unique(Customer),
    Missing,
    Ambiguous(Vec<Customer>),
}

impl CustomerLookup {
    fn from_matches(mut matches: Vec<Customer>) -> Self {
        match matches.len() {
            0 => Self::Missing,
            1 => Self::Unique(matches.remove(0)),
            _ => Self::Ambiguous(matches),
        }
    }
}

pub struct Orchestrator {
    intelligence: Arc<CustomerIntelligence>,
    performance: Arc<PerformanceTracker>,
    memory: Arc<MemoryManager>,
    classifier: Arc<dyn IntentClassifier>,
    llm: Arc<dyn LanguageModel>,
    clock: Arc<dyn Clock>,
    config: AssistantConfig,
}

impl Orchestrator {
    pub fn new(
        intelligence: Arc<CustomerIntelligence>,
        performance: Arc<PerformanceTracker>,
        memory: Arc<MemoryManager>,
        classifier: Arc<dyn IntentClassifier>,
        llm: Arc<dyn LanguageModel>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            intelligence,
            performance,
            memory,
            classifier,
            llm,
            clock,
            config: AssistantConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AssistantConfig) -> Self {
        self.config = config;
        self
    }

    /// Answer one message. Never fails: errors become replies.
    pub async fn process_message(&self, salesperson: &SalespersonContext, text: &str) -> String {
        match self.handle(salesperson, text).await {
            Ok(reply) => reply,
            Err(err) => {
                error!(salesperson = %salesperson.id, error = %err, "message processing failed");
                FATAL_REPLY.to_string()
            }
        }
    }

    async fn handle(&self, salesperson: &SalespersonContext, text: &str) -> Result<String, OrchestratorError> {
        let context = self.memory.get_message_context(salesperson).await?;
        self.memory.save_message(salesperson, Role::User, text, json!({})).await?;
        let intent = self.classifier.classify(text).await?;
        info!(salesperson = %salesperson.id, intent = %intent.kind, confidence = intent.confidence, "routing message");

        let reply = match self.dispatch(salesperson, text, &intent, &context).await {
            Ok(reply) => reply,
            Err(err) if err.is_session_expired() => {
                warn!(salesperson = %salesperson.id, intent = %intent.kind, "records session expired");
                SESSION_EXPIRED_REPLY.to_string()
            }
            Err(err) => {
                warn!(salesperson = %salesperson.id, intent = %intent.kind, error = %err, "intent handler failed");
                format!("Mi dispiace, si è verificato un errore: {err}")
            }
        };

        let metadata = json!({ "intent": intent.kind, "confidence": intent.confidence });
        if let Err(err) = self.memory.save_message(salesperson, Role::Assistant, &reply, metadata).await {
            warn!(salesperson = %salesperson.id, error = %err, "could not store assistant reply");
        }
        Ok(reply)
    }

    async fn dispatch(
        &self,
        salesperson: &SalespersonContext,
        text: &str,
        intent: &Intent,
        context: &MessageContext,
    ) -> Result<String, DispatchError> {
        match intent.kind {
            IntentType::DailyPlan => self.daily_plan(salesperson).await,
            IntentType::ClientInfo => self.client_info(salesperson, text, intent).await,
            IntentType::ChurnRisk => {
                let alerts = self.intelligence.detect_churn_risks(salesperson).await?;
                Ok(format_churn_alerts(&alerts))
            }
            IntentType::Upsell => {
                let opportunities = self.intelligence.find_upsell_opportunities(salesperson).await?;
                Ok(format_upsell(&opportunities))
            }
            IntentType::PerformanceCheck => {
                let kpis = self.performance.get_kpis(salesperson, None).await?;
                Ok(format_kpis(&kpis))
            }
            IntentType::RecordInteraction => self.record_interaction(salesperson, text, intent).await,
            IntentType::UpcomingActions => {
                let actions = self.memory.get_upcoming_actions(salesperson).await?;
                Ok(format_upcoming(&actions))
            }
            IntentType::General => self.general(salesperson, text, context).await,
        }
    }

    async fn daily_plan(&self, salesperson: &SalespersonContext) -> Result<String, DispatchError> {
        let (kpis, alerts, context) = futures::try_join!(
            self.performance.get_kpis(salesperson, None).err_into::<DispatchError>(),
            self.intelligence.detect_churn_risks(salesperson).err_into::<DispatchError>(),
            self.memory.get_message_context(salesperson).err_into::<DispatchError>(),
        )?;

        let now = self.clock.now();
        let days_remaining = days_remaining_in_month(now);
        let plan = render_daily_plan(&DailyPlanInput {
            salesperson,
            now,
            kpis: &kpis,
            churn_alerts: &alerts,
            upcoming_actions: &context.upcoming_actions,
            days_remaining,
        });

        let urgent: Vec<_> = alerts.iter().take(URGENT_ACTIONS).map(|a| a.customer.id.get()).collect();
        self.memory
            .save_daily_plan(
                salesperson,
                &plan,
                json!({
                    "revenue": kpis.revenue.total,
                    "target": kpis.revenue.target,
                    "days_remaining": days_remaining,
                    "urgent_customers": urgent,
                }),
            )
            .await?;
        Ok(plan)
    }

    async fn client_info(
        &self,
        salesperson: &SalespersonContext,
        text: &str,
        intent: &Intent,
    ) -> Result<String, DispatchError> {
        let name = intent
            .client_name()
            .map(str::to_string)
            .or_else(|| extract_interaction_from_message(text).and_then(|x| x.client_name));
        let Some(name) = name else {
            return Ok("Di quale cliente vuoi sapere? Dimmi il nome.".to_string());
        };

        let customer = match self.lookup_customer(salesperson, &name).await? {
            CustomerLookup::Unique(customer) => customer,
            CustomerLookup::Missing => return Ok(format!("Non ho trovato clienti con nome \"{name}\".")),
            CustomerLookup::Ambiguous(matches) => return Ok(ask_which_customer(&name, &matches)),
        };

        let analysis = self.intelligence.analyze_client(customer.id).await?;
        Ok(format_client_analysis(&customer.name, &analysis))
    }

    async fn record_interaction(
        &self,
        salesperson: &SalespersonContext,
        text: &str,
        intent: &Intent,
    ) -> Result<String, DispatchError> {
        let Some(mut extracted) = extract_interaction_from_message(text) else {
            return Ok("Non ho capito bene. Dimmi con chi hai parlato e com'è andata.".to_string());
        };
        if extracted.client_name.is_none() {
            extracted.client_name = intent.client_name().map(str::to_string);
        }

        let Some(name) = extracted.client_name.clone() else {
            return Ok("Con quale cliente hai parlato? Dimmi il nome e registro l'interazione.".to_string());
        };
        let customer = match self.lookup_customer(salesperson, &name).await? {
            CustomerLookup::Unique(customer) => customer,
            CustomerLookup::Missing => {
                return Ok(format!(
                    "Non ho trovato clienti con nome \"{name}\". Controlla il nome e riscrivimelo, \
                     così registro l'interazione."
                ));
            }
            CustomerLookup::Ambiguous(matches) => return Ok(ask_which_customer(&name, &matches)),
        };
        extracted.client_name = Some(customer.name.clone());

        let today = self.memory.today();
        let new = extracted.into_new_interaction(Some(customer.id), today);
        let saved = self.memory.save_client_interaction(salesperson, new).await?;
        Ok(format_recorded(&saved))
    }

    async fn lookup_customer(
        &self,
        salesperson: &SalespersonContext,
        name: &str,
    ) -> Result<CustomerLookup, DispatchError> {
        let matches = self.intelligence.find_customers_by_name(salesperson, name).await?;
        Ok(CustomerLookup::from_matches(matches))
    }

    async fn general(
        &self,
        salesperson: &SalespersonContext,
        text: &str,
        context: &MessageContext,
    ) -> Result<String, DispatchError> {
        let stats = self
            .memory
            .get_interaction_stats(salesperson, self.config.stats_days_back)
            .await?;
        let system = conversation_prompt(salesperson, self.clock.now(), context, &stats, self.config.stats_days_back);

        let skip = context.history.len().saturating_sub(self.config.general_history_turns);
        let mut messages: Vec<ChatMessage> = context.history[skip..]
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| ChatMessage {
                role: m.role,
                content: m.content.clone(),
            })
            .collect();
        messages.push(ChatMessage::user(text));

        let request = CompletionRequest::new(messages)
            .with_system(system)
            .with_temperature(self.config.chat_temperature)
            .with_max_tokens(self.config.chat_max_tokens);
        Ok(self.llm.complete(request).await?)
    }
}

fn ask_which_customer(name: &str, matches: &[Customer]) -> String {
    let mut out = format!("Ho trovato più clienti per \"{name}\":\n");
    for customer in matches {
        let _ = writeln!(out, "• {}", customer.name);
    }
    out.push_str("Quale intendi? Riscrivimi il nome completo.");
    out
}

pub fn format_churn_alerts(alerts: &[ChurnAlert]) -> String {
    if alerts.is_empty() {
        return "✅ Nessun cliente a rischio abbandono al momento.".to_string();
    }
    let mut out = format!("⚠️ {} clienti a rischio abbandono:\n", alerts.len());
    for alert in alerts.iter().take(LIST_LIMIT) {
        let factors: Vec<String> = alert.risk_factors.iter().map(ToString::to_string).collect();
        let _ = write!(
            out,
            "\n• {} (rischio {}%, {})\n  Motivi: {}\n",
            alert.customer.name,
            alert.churn_probability,
            alert.rfm.segment,
            factors.join(", ")
        );
        for action in &alert.suggested_actions {
            let _ = writeln!(out, "  → {}", action.description);
        }
    }
    if alerts.len() > LIST_LIMIT {
        let _ = write!(out, "\n…e altri {}.", alerts.len() - LIST_LIMIT);
    }
    out.trim_end().to_string()
}

pub fn format_upsell(opportunities: &[UpsellOpportunity]) -> String {
    if opportunities.is_empty() {
        return "Per ora nessun cliente top con margine di crescita evidente.".to_string();
    }
    let mut out = "💡 Opportunità di upsell:\n".to_string();
    for o in opportunities.iter().take(LIST_LIMIT) {
        let _ = write!(
            out,
            "\n• {}: spesa attuale {}, potenziale {} (+{})\n",
            o.customer.name,
            format_eur(o.current_spend),
            format_eur(o.potential_spend),
            format_eur(o.gap)
        );
        for s in &o.suggestions {
            let _ = writeln!(out, "  → {} ({}): {}", s.product, format_eur(s.estimated_revenue), s.reason);
        }
    }
    out.trim_end().to_string()
}

pub fn format_client_analysis(name: &str, analysis: &ClientAnalysis) -> String {
    let rfm = &analysis.rfm;
    let mut out = format!(
        "👤 {name}\nSegmento: {} (RFM {})\nUltimo ordine: ",
        rfm.segment, rfm.rfm_score
    );
    if rfm.frequency == 0 {
        out.push_str("nessuno negli ultimi 12 mesi\n");
    } else {
        let _ = writeln!(out, "{} giorni fa", rfm.recency);
    }
    let _ = writeln!(out, "Ordini (12 mesi): {}, fatturato {}", rfm.frequency, format_eur(rfm.monetary));
    for insight in &analysis.insights {
        let _ = writeln!(out, "• {insight}");
    }
    out.trim_end().to_string()
}

pub fn format_upcoming(actions: &[ClientInteraction]) -> String {
    if actions.is_empty() {
        return "Non hai azioni in programma.".to_string();
    }
    let mut out = "📅 Prossime azioni:\n".to_string();
    for a in actions {
        let due = a
            .next_action_date
            .map(|d| d.format("%d/%m").to_string())
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "• {due} {}: {}",
            a.customer_name.as_deref().unwrap_or("cliente"),
            a.next_action.as_deref().unwrap_or(&a.summary)
        );
    }
    out.trim_end().to_string()
}

fn format_recorded(saved: &ClientInteraction) -> String {
    let mut out = format!("📝 Registrato: {}", saved.interaction_type.label());
    if let Some(name) = &saved.customer_name {
        let _ = write!(out, " con {name}");
    }
    if let Some(amount) = saved.amount {
        let _ = write!(out, ", importo {}", format_eur(amount));
    }
    if let Some(outcome) = saved.outcome {
        let label = match outcome {
            Outcome::Positive => "positivo",
            Outcome::Neutral => "neutro",
            Outcome::Negative => "negativo",
        };
        let _ = write!(out, " (esito {label})");
    }
    out.push('.');
    if let Some(date) = saved.next_action_date {
        let _ = write!(out, " Ti ricorderò di ricontattarlo il {}.", date.format("%d/%m"));
    }
    out
}
