use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Closed set of things a salesperson can ask for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    DailyPlan,
    ClientInfo,
    ChurnRisk,
    Upsell,
    PerformanceCheck,
    RecordInteraction,
    UpcomingActions,
    General,
}

impl IntentType {
    pub const ALL: [IntentType; 8] = [
        IntentType::DailyPlan,
        IntentType::ClientInfo,
        IntentType::ChurnRisk,
        IntentType::Upsell,
        IntentType::PerformanceCheck,
        IntentType::RecordInteraction,
        IntentType::UpcomingActions,
        IntentType::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentType::DailyPlan => "daily_plan",
            IntentType::ClientInfo => "client_info",
            IntentType::ChurnRisk => "churn_risk",
            IntentType::Upsell => "upsell",
            IntentType::PerformanceCheck => "performance_check",
            IntentType::RecordInteraction => "record_interaction",
            IntentType::UpcomingActions => "upcoming_actions",
            IntentType::General => "general",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.into_iter().find(|t| t.as_str().eq_ignore_ascii_case(raw))
    }
}

impl core::fmt::Display for IntentType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub kind: IntentType,
    /// 0.0..=1.0
    pub confidence: f64,
    /// Slots the classifier pulled out, e.g. `{"clientName": "Bar Sport"}`.
    #[serde(default)]
    pub extracted_data: JsonValue,
}

impl Intent {
    pub fn new(kind: IntentType, confidence: f64) -> Self {
        Self {
            kind,
            confidence: confidence.clamp(0.0, 1.0),
            extracted_data: JsonValue::Null,
        }
    }

    pub fn with_data(mut self, data: JsonValue) -> Self {
        self.extracted_data = data;
        self
    }

    /// Client name slot, if the classifier filled it.
    pub fn client_name(&self) -> Option<&str> {
        ["clientName", "client_name", "customer"]
            .iter()
            .find_map(|k| self.extracted_data.get(k).and_then(JsonValue::as_str))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_names_round_trip() {
        for kind in IntentType::ALL {
            assert_eq!(IntentType::parse(kind.as_str()), Some(kind));
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.as_str()));
        }
        assert_eq!(IntentType::parse(" Daily_Plan "), Some(IntentType::DailyPlan));
        assert_eq!(IntentType::parse("weather"), None);
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(Intent::new(IntentType::General, 1.7).confidence, 1.0);
        assert_eq!(Intent::new(IntentType::General, -0.2).confidence, 0.0);
    }

    #[test]
    fn client_name_slot() {
        let intent = Intent::new(IntentType::ClientInfo, 0.9).with_data(json!({"clientName": " Bar Sport "}));
        assert_eq!(intent.client_name(), Some("Bar Sport"));
        assert_eq!(Intent::new(IntentType::ClientInfo, 0.9).client_name(), None);
    }
}
