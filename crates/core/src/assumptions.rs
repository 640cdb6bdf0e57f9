//! Versioned business assumptions.
//!
//! Hard business numbers (targets, activity mix, uplift, win-back economics, churn
//! weights) are configuration, injected into the engines that consume them.
//! Defaults reproduce the values the sales team works with today.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

pub const CURRENT_ASSUMPTIONS_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessAssumptions {
    pub version: u32,
    /// Monthly revenue target per salesperson, in the account's base currency.
    pub monthly_revenue_target: f64,
    /// Trailing window used for RFM scoring.
    pub rfm_lookback_days: i64,
    pub activity_mix: ActivityMix,
    pub upsell: UpsellAssumptions,
    pub win_back: WinBackAssumptions,
    pub churn: ChurnWeights,
    pub limits: FetchLimits,
}

impl Default for BusinessAssumptions {
    fn default() -> Self {
        Self {
            version: CURRENT_ASSUMPTIONS_VERSION,
            monthly_revenue_target: 50_000.0,
            rfm_lookback_days: 365,
            activity_mix: ActivityMix::default(),
            upsell: UpsellAssumptions::default(),
            win_back: WinBackAssumptions::default(),
            churn: ChurnWeights::default(),
            limits: FetchLimits::default(),
        }
    }
}

/// Activity counts are estimated as fractions of the order count until a real
/// activity log is integrated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityMix {
    pub visits: f64,
    pub calls: f64,
    pub emails: f64,
    pub meetings: f64,
}

impl Default for ActivityMix {
    fn default() -> Self {
        Self {
            visits: 0.3,
            calls: 0.5,
            emails: 0.2,
            meetings: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpsellAssumptions {
    pub uplift: f64,
    pub bundle_share: f64,
    pub contract_share: f64,
    pub max_results: usize,
}

impl Default for UpsellAssumptions {
    fn default() -> Self {
        Self {
            uplift: 1.2,
            bundle_share: 0.5,
            contract_share: 0.3,
            max_results: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WinBackAssumptions {
    pub call_roi: f64,
    /// Monetary value above which a discount offer is proposed.
    pub discount_threshold: f64,
    pub discount_roi: f64,
    pub discount_rate: f64,
    /// Share of revenue the discount actually costs (margin on discounted volume).
    pub discount_margin: f64,
    pub visit_roi: f64,
    pub visit_cost: f64,
}

impl Default for WinBackAssumptions {
    fn default() -> Self {
        Self {
            call_roi: 0.5,
            discount_threshold: 5_000.0,
            discount_roi: 0.4,
            discount_rate: 0.15,
            discount_margin: 0.3,
            visit_roi: 0.6,
            visit_cost: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChurnWeights {
    pub inactive_after_days: i64,
    pub inactivity: u32,
    pub declining_frequency: u32,
    pub high_value_lapsed: u32,
    pub critical_segment: u32,
    pub min_factors: usize,
}

impl Default for ChurnWeights {
    fn default() -> Self {
        Self {
            inactive_after_days: 60,
            inactivity: 30,
            declining_frequency: 25,
            high_value_lapsed: 30,
            critical_segment: 15,
            min_factors: 2,
        }
    }
}

/// Caps on records-system reads (latency control only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchLimits {
    pub assigned_customers: usize,
    pub orders_per_customer: usize,
    pub orders_per_period: usize,
    pub customer_lookup: usize,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            assigned_customers: 50,
            orders_per_customer: 1_000,
            orders_per_period: 5_000,
            customer_lookup: 5,
        }
    }
}

impl BusinessAssumptions {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, DomainError> {
        let parsed: Self = serde_json::from_str(raw)
            .map_err(|e| DomainError::configuration(format!("business assumptions: {e}")))?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.version > CURRENT_ASSUMPTIONS_VERSION {
            return Err(DomainError::configuration(format!(
                "assumptions version {} is newer than supported {}",
                self.version, CURRENT_ASSUMPTIONS_VERSION
            )));
        }
        if !(self.monthly_revenue_target.is_finite() && self.monthly_revenue_target > 0.0) {
            return Err(DomainError::configuration(
                "monthly_revenue_target must be a finite positive number",
            ));
        }
        if self.rfm_lookback_days <= 0 {
            return Err(DomainError::configuration("rfm_lookback_days must be positive"));
        }
        if self.upsell.uplift < 1.0 {
            return Err(DomainError::configuration("upsell.uplift must be >= 1.0"));
        }
        if self.churn.min_factors == 0 {
            return Err(DomainError::configuration("churn.min_factors must be >= 1"));
        }
        let weights = [
            self.churn.inactivity,
            self.churn.declining_frequency,
            self.churn.high_value_lapsed,
            self.churn.critical_segment,
        ];
        if weights.iter().any(|&w| w > 100) {
            return Err(DomainError::configuration("churn weights must be within 0..=100"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let a = BusinessAssumptions::from_json_str(r#"{"monthly_revenue_target": 80000}"#).unwrap();
        assert_eq!(a.monthly_revenue_target, 80_000.0);
        assert_eq!(a.activity_mix, ActivityMix::default());
        assert_eq!(a.version, CURRENT_ASSUMPTIONS_VERSION);
    }

    #[test]
    fn future_version_is_rejected() {
        let err = BusinessAssumptions::from_json_str(r#"{"version": 99}"#).unwrap_err();
        assert!(matches!(err, DomainError::Configuration(_)));
    }

    #[test]
    fn churn_weights_above_100_are_rejected() {
        let err = BusinessAssumptions::from_json_str(r#"{"churn": {"inactivity": 4294967295}}"#).unwrap_err();
        assert!(matches!(err, DomainError::Configuration(_)));
        assert!(BusinessAssumptions::from_json_str(r#"{"churn": {"inactivity": 100}}"#).is_ok());
    }

    #[test]
    fn non_positive_target_is_rejected() {
        assert!(BusinessAssumptions::from_json_str(r#"{"monthly_revenue_target": 0}"#).is_err());
    }
}
