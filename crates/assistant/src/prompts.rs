//! Prompt texts sent to the language model.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use salesdesk_core::SalespersonContext;
use salesdesk_memory::{InteractionStats, InteractionType, MessageContext};

pub const CLASSIFICATION_PROMPT: &str = r#"Sei il classificatore di un assistente per agenti di commercio.
Classifica il messaggio dell'utente in UNO solo dei seguenti tipi:
- daily_plan: cosa fare oggi, piano o priorità della giornata
- client_info: informazioni su un cliente specifico
- churn_risk: clienti a rischio, inattivi o da recuperare
- upsell: opportunità di vendita aggiuntiva
- performance_check: fatturato, obiettivi, KPI, andamento
- record_interaction: l'utente racconta una chiamata, visita, email o ordine appena avvenuti
- upcoming_actions: attività e richiami in programma
- general: tutto il resto

Rispondi SOLO con JSON, senza testo aggiuntivo:
{"type": "<tipo>", "confidence": <0..1>, "extractedData": {"clientName": "<nome cliente o null>"}}"#;

/// System prompt for open conversation, grounded in what the assistant
/// remembers about this salesperson.
pub fn conversation_prompt(
    salesperson: &SalespersonContext,
    now: DateTime<Utc>,
    context: &MessageContext,
    stats: &InteractionStats,
    stats_days_back: i64,
) -> String {
    let mut prompt = format!(
        "Sei l'assistente commerciale di {name}. Oggi è {date}.\n\
         Rispondi in italiano, in modo breve e concreto, da collega esperto di vendite.\n\
         Non inventare dati su clienti o fatturato: se non li conosci, suggerisci di chiederli \
         (es. \"come sto andando?\", \"clienti a rischio\", \"cosa devo fare oggi\").\n",
        name = salesperson.first_name(),
        date = now.format("%d/%m/%Y"),
    );

    if stats.total > 0 {
        let _ = writeln!(
            prompt,
            "\nUltimi {stats_days_back} giorni: {} interazioni ({} chiamate, {} incontri, {} email, {} ordini).",
            stats.total,
            stats.count(InteractionType::Call),
            stats.count(InteractionType::Meeting),
            stats.count(InteractionType::Email),
            stats.count(InteractionType::Order),
        );
    }

    if !context.recent_interactions.is_empty() {
        prompt.push_str("\nInterazioni recenti:\n");
        for view in context.recent_interactions.iter().take(5) {
            let i = &view.interaction;
            let _ = writeln!(
                prompt,
                "- {} ({}): {} [{} gg fa]",
                i.customer_name.as_deref().unwrap_or("cliente"),
                i.interaction_type.label(),
                i.summary,
                view.days_ago,
            );
        }
    }

    if !context.upcoming_actions.is_empty() {
        prompt.push_str("\nProssime azioni:\n");
        for i in context.upcoming_actions.iter().take(5) {
            let due = i
                .next_action_date
                .map(|d| d.format("%d/%m").to_string())
                .unwrap_or_default();
            let _ = writeln!(
                prompt,
                "- {due} {}: {}",
                i.customer_name.as_deref().unwrap_or("cliente"),
                i.next_action.as_deref().unwrap_or(&i.summary),
            );
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use salesdesk_core::SalespersonId;

    #[test]
    fn classification_prompt_lists_every_intent() {
        for kind in crate::intent::IntentType::ALL {
            assert!(CLASSIFICATION_PROMPT.contains(kind.as_str()), "{kind}");
        }
    }

    #[test]
    fn conversation_prompt_without_memory_is_just_the_preamble() {
        let sp = SalespersonContext::new(SalespersonId::new(), "Giulia Bianchi", None);
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let prompt = conversation_prompt(&sp, now, &MessageContext::default(), &InteractionStats::default(), 30);
        assert!(prompt.contains("assistente commerciale di Giulia"));
        assert!(prompt.contains("19/10/2026"));
        assert!(!prompt.contains("Interazioni recenti"));
    }

    #[test]
    fn stats_line_names_the_configured_window() {
        let sp = SalespersonContext::new(SalespersonId::new(), "Giulia Bianchi", None);
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let stats = InteractionStats {
            total: 3,
            by_type: [(InteractionType::Call, 2), (InteractionType::Email, 1)].into(),
            ..InteractionStats::default()
        };
        let prompt = conversation_prompt(&sp, now, &MessageContext::default(), &stats, 14);
        assert!(
            prompt.contains("Ultimi 14 giorni: 3 interazioni (2 chiamate, 0 incontri, 1 email, 0 ordini)"),
            "{prompt}"
        );
        assert!(!prompt.contains("30 giorni"));
    }
}
