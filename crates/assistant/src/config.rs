//! Runtime configuration of the assistant.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use salesdesk_core::ErpUserId;
use salesdesk_memory::HistoryWindow;

#[derive(Debug, Clone, PartialEq)]
pub struct AssistantConfig {
    /// History loaded into the message context.
    pub history: HistoryWindow,
    /// Turns of history sent with a general question.
    pub general_history_turns: usize,
    pub classifier_temperature: f32,
    pub classifier_max_tokens: u32,
    pub chat_temperature: f32,
    pub chat_max_tokens: u32,
    /// Interaction stats window for the conversation prompt.
    pub stats_days_back: i64,
    pub llm_endpoint: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_timeout: Duration,
    /// JSON file with business assumptions; defaults apply when unset.
    pub assumptions_path: Option<PathBuf>,
    /// JSON records fixture for the in-memory records client.
    pub fixtures_path: Option<PathBuf>,
    /// Who the interactive session speaks for.
    pub salesperson_name: String,
    pub erp_user_id: Option<ErpUserId>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            history: HistoryWindow::default(),
            general_history_turns: 10,
            classifier_temperature: 0.1,
            classifier_max_tokens: 200,
            chat_temperature: 0.7,
            chat_max_tokens: 1_000,
            stats_days_back: 30,
            llm_endpoint: "http://localhost:11434".to_string(),
            llm_model: "qwen2.5:7b".to_string(),
            llm_api_key: None,
            llm_timeout: Duration::from_secs(30),
            assumptions_path: None,
            fixtures_path: None,
            salesperson_name: "Agente".to_string(),
            erp_user_id: None,
        }
    }
}

impl AssistantConfig {
    /// Read `SALESDESK_*` and `LLM_*` variables over the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            history: HistoryWindow {
                limit: parsed(&get, "SALESDESK_HISTORY_LIMIT", d.history.limit),
                days_back: parsed(&get, "SALESDESK_HISTORY_DAYS", d.history.days_back),
            },
            general_history_turns: parsed(&get, "SALESDESK_GENERAL_HISTORY_TURNS", d.general_history_turns),
            classifier_temperature: parsed(&get, "LLM_CLASSIFIER_TEMPERATURE", d.classifier_temperature),
            classifier_max_tokens: parsed(&get, "LLM_CLASSIFIER_MAX_TOKENS", d.classifier_max_tokens),
            chat_temperature: parsed(&get, "LLM_CHAT_TEMPERATURE", d.chat_temperature),
            chat_max_tokens: parsed(&get, "LLM_CHAT_MAX_TOKENS", d.chat_max_tokens),
            stats_days_back: parsed(&get, "SALESDESK_STATS_DAYS", d.stats_days_back),
            llm_endpoint: get("LLM_ENDPOINT").unwrap_or(d.llm_endpoint),
            llm_model: get("LLM_MODEL").unwrap_or(d.llm_model),
            llm_api_key: get("LLM_API_KEY"),
            llm_timeout: Duration::from_secs(parsed(&get, "LLM_TIMEOUT_SECS", d.llm_timeout.as_secs())),
            assumptions_path: get("SALESDESK_ASSUMPTIONS").map(PathBuf::from),
            fixtures_path: get("SALESDESK_FIXTURES").map(PathBuf::from),
            salesperson_name: get("SALESDESK_SALESPERSON").unwrap_or(d.salesperson_name),
            erp_user_id: get("SALESDESK_ERP_USER_ID").and_then(|raw| {
                raw.parse()
                    .map_err(|err| warn!(value = %raw, error = %err, "invalid SALESDESK_ERP_USER_ID; queries run unscoped"))
                    .ok()
            }),
        }
    }
}

fn parsed<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy + core::fmt::Display,
{
    match get(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, default = %default, "invalid configuration value; using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        assert_eq!(AssistantConfig::from_lookup(|_| None), AssistantConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let cfg = AssistantConfig::from_lookup(lookup(&[
            ("SALESDESK_HISTORY_LIMIT", "5"),
            ("LLM_CHAT_TEMPERATURE", "0.2"),
            ("LLM_MODEL", "gpt-4o-mini"),
            ("LLM_API_KEY", "sk-test"),
            ("SALESDESK_FIXTURES", "/tmp/records.json"),
            ("SALESDESK_ERP_USER_ID", "7"),
        ]));
        assert_eq!(cfg.erp_user_id, Some(ErpUserId(7)));
        assert_eq!(cfg.history.limit, 5);
        assert_eq!(cfg.chat_temperature, 0.2);
        assert_eq!(cfg.llm_model, "gpt-4o-mini");
        assert_eq!(cfg.llm_api_key.as_deref(), Some("sk-test"));
        assert_eq!(cfg.fixtures_path, Some(PathBuf::from("/tmp/records.json")));
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let cfg = AssistantConfig::from_lookup(lookup(&[("SALESDESK_HISTORY_DAYS", "a week"), ("LLM_API_KEY", "  "), ("SALESDESK_ERP_USER_ID", "-3")]));
        assert_eq!(cfg.erp_user_id, None);
        assert_eq!(cfg.history.days_back, 7);
        assert_eq!(cfg.llm_api_key, None);
    }
}
