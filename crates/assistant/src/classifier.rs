//! Intent classification: a language-model classifier backed by deterministic
//! keyword rules.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, warn};

use crate::intent::{Intent, IntentType};
use crate::llm::{ChatMessage, CompletionRequest, LanguageModel, LlmError, extract_json};
use crate::prompts::CLASSIFICATION_PROMPT;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClassifyError {
    /// The classification service could not be reached.
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The service answered with something that is not a valid intent.
    #[error("malformed classification: {0}")]
    Malformed(String),
}

#[async_trait::async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Intent, ClassifyError>;
}

#[async_trait::async_trait]
impl<C> IntentClassifier for Arc<C>
where
    C: IntentClassifier + ?Sized,
{
    async fn classify(&self, text: &str) -> Result<Intent, ClassifyError> {
        (**self).classify(text).await
    }
}

#[derive(Debug, Deserialize)]
struct RawIntent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default, alias = "extracted_data", rename = "extractedData")]
    extracted_data: Option<JsonValue>,
}

/// Parse a classification reply into an [`Intent`].
pub fn parse_classification(reply: &str) -> Result<Intent, ClassifyError> {
    let raw: RawIntent =
        serde_json::from_str(extract_json(reply)).map_err(|e| ClassifyError::Malformed(e.to_string()))?;
    let kind = IntentType::parse(&raw.kind)
        .ok_or_else(|| ClassifyError::Malformed(format!("unknown intent type {:?}", raw.kind)))?;
    Ok(Intent::new(kind, raw.confidence.unwrap_or(0.5)).with_data(raw.extracted_data.unwrap_or(JsonValue::Null)))
}

/// Asks the language model to pick one of the closed set of intents.
pub struct LlmIntentClassifier {
    llm: Arc<dyn LanguageModel>,
    temperature: f32,
    max_tokens: u32,
}

impl LlmIntentClassifier {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            llm,
            temperature: 0.1,
            max_tokens: 200,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait::async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify(&self, text: &str) -> Result<Intent, ClassifyError> {
        let request = CompletionRequest::new(vec![ChatMessage::user(text)])
            .with_system(CLASSIFICATION_PROMPT)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);
        let reply = self.llm.complete(request).await?;
        parse_classification(&reply)
    }
}

/// Ordered keyword rules, first match wins.
static RULES: LazyLock<Vec<(IntentType, Regex)>> = LazyLock::new(|| {
    [
        (
            IntentType::DailyPlan,
            r"cosa (devo|dovrei|posso) fare|piano (di |per )?(oggi|della giornata)|programma (di |per )?oggi|agenda|la mia giornata|priorità (di )?oggi",
        ),
        (
            IntentType::RecordInteraction,
            r"\bho (chiamato|telefonato|sentito|visitato|incontrato|venduto|mandato|inviato|scritto)|\bha (ordinato|comprato|acquistato|firmato)|\bregistra",
        ),
        (
            IntentType::ChurnRisk,
            r"rischio|perdendo|perdere|churn|inattiv|non ordina|spariti|recuperare",
        ),
        (
            IntentType::Upsell,
            r"upsell|cross.?sell|vendere di più|opportunit|potenziale|proporre",
        ),
        (
            IntentType::PerformanceCheck,
            r"come sto andando|performance|\bkpi|fatturato|obiettiv|target|risultati|classifica|quanto ho venduto",
        ),
        (
            IntentType::UpcomingActions,
            r"prossim[ieao] (azioni|appuntamenti|attività|impegni)|da fare|scadenz|follow.?up|promemoria|chi devo (richiamare|sentire)",
        ),
        (
            IntentType::ClientInfo,
            r"\bcliente\b|info(rmazioni)? su|dimmi (di|tutto su)|scheda|parlami di|com'è messo",
        ),
    ]
    .into_iter()
    .map(|(kind, pattern)| {
        let regex = Regex::new(&format!("(?i){pattern}")).expect("valid intent rule");
        (kind, regex)
    })
    .collect()
});

/// Deterministic keyword matcher. Defaults to `general`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedClassifier;

impl RuleBasedClassifier {
    pub const MATCH_CONFIDENCE: f64 = 0.6;
    pub const DEFAULT_CONFIDENCE: f64 = 0.3;

    pub fn classify_text(&self, text: &str) -> Intent {
        RULES
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(kind, _)| Intent::new(*kind, Self::MATCH_CONFIDENCE))
            .unwrap_or_else(|| Intent::new(IntentType::General, Self::DEFAULT_CONFIDENCE))
    }
}

#[async_trait::async_trait]
impl IntentClassifier for RuleBasedClassifier {
    async fn classify(&self, text: &str) -> Result<Intent, ClassifyError> {
        Ok(self.classify_text(text))
    }
}

/// Primary classifier with rule-based recovery from malformed answers.
///
/// Transport failures of the primary are returned as errors.
pub struct FallbackClassifier {
    primary: Arc<dyn IntentClassifier>,
    rules: RuleBasedClassifier,
}

impl FallbackClassifier {
    pub fn new(primary: Arc<dyn IntentClassifier>) -> Self {
        Self {
            primary,
            rules: RuleBasedClassifier,
        }
    }
}

#[async_trait::async_trait]
impl IntentClassifier for FallbackClassifier {
    async fn classify(&self, text: &str) -> Result<Intent, ClassifyError> {
        match self.primary.classify(text).await {
            Ok(intent) => {
                debug!(intent = %intent.kind, confidence = intent.confidence, "message classified");
                Ok(intent)
            }
            Err(ClassifyError::Malformed(reason)) => {
                let intent = self.rules.classify_text(text);
                warn!(%reason, intent = %intent.kind, "classification malformed, using keyword rules");
                Ok(intent)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Returns canned replies in order.
    struct ScriptedModel(Mutex<Vec<Result<String, LlmError>>>);

    impl ScriptedModel {
        fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self(Mutex::new(replies)))
        }
    }

    #[async_trait::async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
            assert!(request.system.is_some());
            self.0.lock().unwrap().remove(0)
        }
    }

    fn chain(reply: Result<String, LlmError>) -> FallbackClassifier {
        FallbackClassifier::new(Arc::new(LlmIntentClassifier::new(ScriptedModel::new(vec![reply]))))
    }

    #[tokio::test]
    async fn invalid_json_falls_back_to_rules() {
        let intent = chain(Ok("non lo so".to_string())).classify("cosa devo fare oggi").await.unwrap();
        assert_eq!(intent.kind, IntentType::DailyPlan);
        assert_eq!(intent.confidence, RuleBasedClassifier::MATCH_CONFIDENCE);
    }

    #[tokio::test]
    async fn unknown_type_falls_back_to_rules() {
        let intent = chain(Ok(r#"{"type": "weather", "confidence": 0.9}"#.to_string()))
            .classify("come sto andando questo mese?")
            .await
            .unwrap();
        assert_eq!(intent.kind, IntentType::PerformanceCheck);
    }

    #[tokio::test]
    async fn valid_reply_is_used_with_slots() {
        let reply = r#"```json
{"type": "client_info", "confidence": 0.92, "extractedData": {"clientName": "Bar Sport"}}
```"#;
        let intent = chain(Ok(reply.to_string())).classify("dimmi di Bar Sport").await.unwrap();
        assert_eq!(intent.kind, IntentType::ClientInfo);
        assert_eq!(intent.confidence, 0.92);
        assert_eq!(intent.client_name(), Some("Bar Sport"));
    }

    #[tokio::test]
    async fn transport_failure_is_not_masked() {
        let err = chain(Err(LlmError::Transport("connection refused".into())))
            .classify("ciao")
            .await
            .unwrap_err();
        assert!(matches!(err, ClassifyError::Llm(LlmError::Transport(_))));
    }

    #[test]
    fn rules_follow_priority_order() {
        let rules = RuleBasedClassifier;
        let cases = [
            ("Cosa devo fare oggi?", IntentType::DailyPlan),
            ("Ho chiamato Mario Rossi, è andata bene", IntentType::RecordInteraction),
            ("quali clienti sono a rischio?", IntentType::ChurnRisk),
            ("dove posso fare upsell", IntentType::Upsell),
            ("come sto andando col fatturato", IntentType::PerformanceCheck),
            ("quali sono le prossime azioni", IntentType::UpcomingActions),
            ("dimmi di Trattoria Da Mario", IntentType::ClientInfo),
            ("ciao!", IntentType::General),
        ];
        for (text, expected) in cases {
            assert_eq!(rules.classify_text(text).kind, expected, "{text}");
        }
    }

    #[test]
    fn record_beats_churn_when_both_match() {
        let intent = RuleBasedClassifier.classify_text("ho sentito Bar Sport, rischio di perderlo");
        assert_eq!(intent.kind, IntentType::RecordInteraction);
    }
}
