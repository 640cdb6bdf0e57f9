//! Wiring of the engines into an [`Orchestrator`].

use std::sync::Arc;

use salesdesk_ai::{CustomerIntelligence, PerformanceTracker};
use salesdesk_core::{BusinessAssumptions, Clock};
use salesdesk_memory::{ConversationStore, MemoryManager};
use salesdesk_records::RecordsClient;

use crate::classifier::{FallbackClassifier, IntentClassifier, LlmIntentClassifier};
use crate::config::AssistantConfig;
use crate::llm::LanguageModel;
use crate::orchestrator::Orchestrator;

/// External collaborators the assistant is built from.
pub struct AssistantServices {
    pub records: Arc<dyn RecordsClient>,
    pub store: Arc<dyn ConversationStore>,
    pub llm: Arc<dyn LanguageModel>,
    pub clock: Arc<dyn Clock>,
    pub assumptions: Arc<BusinessAssumptions>,
}

impl AssistantServices {
    /// Build the engines and the LLM-first classifier chain.
    pub fn build(self, config: AssistantConfig) -> Orchestrator {
        let classifier: Arc<dyn IntentClassifier> = Arc::new(FallbackClassifier::new(Arc::new(
            LlmIntentClassifier::new(self.llm.clone())
                .with_sampling(config.classifier_temperature, config.classifier_max_tokens),
        )));
        self.build_with_classifier(classifier, config)
    }

    pub fn build_with_classifier(self, classifier: Arc<dyn IntentClassifier>, config: AssistantConfig) -> Orchestrator {
        let intelligence = Arc::new(CustomerIntelligence::new(
            self.records.clone(),
            self.clock.clone(),
            self.assumptions.clone(),
        ));
        let performance = Arc::new(PerformanceTracker::new(
            self.records.clone(),
            self.clock.clone(),
            self.assumptions.clone(),
        ));
        let memory =
            Arc::new(MemoryManager::new(self.store.clone(), self.clock.clone()).with_history_window(config.history));

        Orchestrator::new(intelligence, performance, memory, classifier, self.llm, self.clock).with_config(config)
    }
}
