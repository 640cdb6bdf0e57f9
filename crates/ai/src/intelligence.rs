//! Customer Intelligence Engine: RFM scoring, churn detection, win-back plans,
//! upsell discovery and single-client analysis over records-system data.

use std::sync::Arc;

use chrono::Duration;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use salesdesk_core::assumptions::{ChurnWeights, WinBackAssumptions};
use salesdesk_core::{BusinessAssumptions, Clock, CustomerId, SalespersonContext};
use salesdesk_records::{
    Customer, Domain, Operator, Order, OrderState, Predicate, RecordModel, RecordsClient, SearchQuery,
    format_datetime, search,
};

use crate::error::AiError;
use crate::rfm::{NO_ORDERS_RECENCY_DAYS, RfmScore, Segment};

/// One reason a customer looks likely to stop ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RiskFactor {
    /// No order for more than the inactivity threshold.
    Inactive { days: i64 },
    DecliningFrequency,
    HighValueLapsed,
    CriticalSegment { segment: Segment },
}

impl core::fmt::Display for RiskFactor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RiskFactor::Inactive { days } if *days >= NO_ORDERS_RECENCY_DAYS => {
                f.write_str("nessun ordine negli ultimi 12 mesi")
            }
            RiskFactor::Inactive { days } => write!(f, "inattivo da {days} giorni"),
            RiskFactor::DecliningFrequency => f.write_str("frequenza ordini in calo"),
            RiskFactor::HighValueLapsed => f.write_str("era un cliente di alto valore, ora inattivo"),
            RiskFactor::CriticalSegment { segment } => write!(f, "segmento {segment}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinBackKind {
    ImmediateCall,
    DiscountOffer,
    SampleVisit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinBackAction {
    pub kind: WinBackKind,
    pub description: String,
    pub expected_roi: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnAlert {
    pub customer: Customer,
    pub rfm: RfmScore,
    pub risk_factors: Vec<RiskFactor>,
    /// 0..=100.
    pub churn_probability: u32,
    pub suggested_actions: Vec<WinBackAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsellSuggestion {
    pub product: String,
    pub reason: String,
    pub estimated_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsellOpportunity {
    pub customer: Customer,
    pub current_spend: f64,
    pub potential_spend: f64,
    pub gap: f64,
    pub suggestions: Vec<UpsellSuggestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientAnalysis {
    pub rfm: RfmScore,
    pub is_churn_risk: bool,
    pub has_upsell_potential: bool,
    pub insights: Vec<String>,
}

/// Risk factors that fire for `rfm` and their capped probability, or `None` when
/// fewer than `weights.min_factors` fire.
pub fn assess_churn(rfm: &RfmScore, weights: &ChurnWeights) -> Option<(Vec<RiskFactor>, u32)> {
    let mut factors = Vec::new();
    let mut score: u32 = 0;

    if rfm.recency > weights.inactive_after_days {
        factors.push(RiskFactor::Inactive { days: rfm.recency });
        score = score.saturating_add(weights.inactivity);
    }
    if rfm.recency_score <= 2 {
        factors.push(RiskFactor::DecliningFrequency);
        score = score.saturating_add(weights.declining_frequency);
    }
    if rfm.monetary_score >= 4 && rfm.recency_score <= 2 {
        factors.push(RiskFactor::HighValueLapsed);
        score = score.saturating_add(weights.high_value_lapsed);
    }
    if rfm.segment.is_critical() {
        factors.push(RiskFactor::CriticalSegment { segment: rfm.segment });
        score = score.saturating_add(weights.critical_segment);
    }

    if factors.len() < weights.min_factors {
        return None;
    }
    Some((factors, score.min(100)))
}

/// Deterministic remedial actions for an at-risk customer.
pub fn win_back_plan(rfm: &RfmScore, economics: &WinBackAssumptions) -> Vec<WinBackAction> {
    let monetary = rfm.monetary;
    let mut actions = vec![WinBackAction {
        kind: WinBackKind::ImmediateCall,
        description: format!("Chiamare subito {} per capire cosa è cambiato", rfm.name),
        expected_roi: economics.call_roi * monetary,
        cost: 0.0,
    }];

    if monetary > economics.discount_threshold {
        actions.push(WinBackAction {
            kind: WinBackKind::DiscountOffer,
            description: format!(
                "Offrire uno sconto del {:.0}% sul prossimo ordine",
                economics.discount_rate * 100.0
            ),
            expected_roi: economics.discount_roi * monetary,
            cost: economics.discount_rate * economics.discount_margin * monetary,
        });
    }

    if rfm.monetary_score >= 4 {
        actions.push(WinBackAction {
            kind: WinBackKind::SampleVisit,
            description: "Visita di persona con campioni dei nuovi prodotti".to_string(),
            expected_roi: economics.visit_roi * monetary,
            cost: economics.visit_cost,
        });
    }

    actions
}

/// Templated observations for a single client.
pub fn client_insights(rfm: &RfmScore, is_churn_risk: bool, has_upsell_potential: bool) -> Vec<String> {
    let mut insights = Vec::new();
    if is_churn_risk {
        if rfm.recency >= NO_ORDERS_RECENCY_DAYS {
            insights.push("Attenzione: nessun ordine negli ultimi 12 mesi".to_string());
        } else {
            insights.push(format!("Attenzione: nessun ordine da {} giorni", rfm.recency));
        }
    }
    if has_upsell_potential {
        insights.push("Cliente attivo di recente: buon momento per proporre nuovi prodotti".to_string());
    }
    let tip = match rfm.segment {
        Segment::Champions => "tra i migliori clienti, da coccolare",
        Segment::Loyal => "cliente fedele, valuta un contratto annuale",
        Segment::New => "cliente nuovo, consolida la relazione",
        Segment::AtRisk => "cliente di valore che si sta allontanando",
        Segment::Lost => "cliente perso, serve un'azione di recupero",
        Segment::Inactive => "ordina poco, stimola la frequenza",
        Segment::Regular => "cliente regolare",
    };
    insights.push(format!("Segmento {}: {tip}", rfm.segment));
    insights
}

/// Analytics over a salesperson's customers.
///
/// Stateless apart from its injected collaborators; every call reads fresh data.
pub struct CustomerIntelligence {
    records: Arc<dyn RecordsClient>,
    clock: Arc<dyn Clock>,
    assumptions: Arc<BusinessAssumptions>,
}

impl CustomerIntelligence {
    pub fn new(
        records: Arc<dyn RecordsClient>,
        clock: Arc<dyn Clock>,
        assumptions: Arc<BusinessAssumptions>,
    ) -> Self {
        Self {
            records,
            clock,
            assumptions,
        }
    }

    pub fn assumptions(&self) -> &BusinessAssumptions {
        &self.assumptions
    }

    pub async fn calculate_rfm(&self, customer_id: CustomerId) -> Result<RfmScore, AiError> {
        let customer = self.customer(customer_id).await?;
        self.rfm_for(&customer).await
    }

    /// RFM for an already-fetched customer (saves one read per customer in batch paths).
    pub async fn rfm_for(&self, customer: &Customer) -> Result<RfmScore, AiError> {
        let now = self.clock.now();
        let lookback = Duration::days(self.assumptions.rfm_lookback_days);

        let query = SearchQuery::new(
            RecordModel::Order,
            Domain::new()
                .and("partner_id", Operator::Eq, customer.id.get())
                .and("state", Operator::In, json!(OrderState::CONFIRMED))
                .and("date_order", Operator::Ge, format_datetime(now - lookback)),
        )
        .with_order("date_order desc")
        .with_limit(self.assumptions.limits.orders_per_customer);

        let orders: Vec<Order> = search(self.records.as_ref(), &query).await?;
        let score = RfmScore::from_orders(customer, &orders, now, lookback);
        debug!(customer = %customer.id, orders = orders.len(), rfm = %score.rfm_score, "rfm computed");
        Ok(score)
    }

    pub async fn detect_churn_risks(&self, salesperson: &SalespersonContext) -> Result<Vec<ChurnAlert>, AiError> {
        let scored = self.score_assigned(salesperson).await?;

        let mut alerts: Vec<ChurnAlert> = scored
            .into_iter()
            .filter_map(|(customer, rfm)| {
                let (risk_factors, churn_probability) = assess_churn(&rfm, &self.assumptions.churn)?;
                let suggested_actions = win_back_plan(&rfm, &self.assumptions.win_back);
                Some(ChurnAlert {
                    customer,
                    rfm,
                    risk_factors,
                    churn_probability,
                    suggested_actions,
                })
            })
            .collect();

        // Stable: ties keep the name order of the fetch.
        alerts.sort_by(|a, b| b.churn_probability.cmp(&a.churn_probability));

        info!(salesperson = %salesperson.id, alerts = alerts.len(), "churn risks detected");
        Ok(alerts)
    }

    pub async fn find_upsell_opportunities(
        &self,
        salesperson: &SalespersonContext,
    ) -> Result<Vec<UpsellOpportunity>, AiError> {
        let upsell = &self.assumptions.upsell;
        let scored = self.score_assigned(salesperson).await?;

        let mut opportunities: Vec<UpsellOpportunity> = scored
            .into_iter()
            .filter(|(_, rfm)| rfm.segment.is_top())
            .map(|(customer, rfm)| {
                let current_spend = rfm.monetary;
                let potential_spend = current_spend * upsell.uplift;
                let gap = potential_spend - current_spend;
                UpsellOpportunity {
                    customer,
                    current_spend,
                    potential_spend,
                    gap,
                    suggestions: vec![
                        UpsellSuggestion {
                            product: "Bundle Premium".to_string(),
                            reason: format!("Cliente {}: pronto per la linea premium", rfm.segment),
                            estimated_revenue: gap * upsell.bundle_share,
                        },
                        UpsellSuggestion {
                            product: "Annual Contract".to_string(),
                            reason: "Ordini regolari: proporre un contratto annuale".to_string(),
                            estimated_revenue: gap * upsell.contract_share,
                        },
                    ],
                }
            })
            .collect();

        opportunities.sort_by(|a, b| b.gap.partial_cmp(&a.gap).unwrap_or(std::cmp::Ordering::Equal));
        opportunities.truncate(upsell.max_results);

        info!(salesperson = %salesperson.id, opportunities = opportunities.len(), "upsell opportunities found");
        Ok(opportunities)
    }

    pub async fn analyze_client(&self, customer_id: CustomerId) -> Result<ClientAnalysis, AiError> {
        let rfm = self.calculate_rfm(customer_id).await?;
        let is_churn_risk = rfm.recency > self.assumptions.churn.inactive_after_days || rfm.recency_score <= 2;
        // Leading digit is the recency sub-score.
        let has_upsell_potential = rfm.rfm_score.starts_with('4') || rfm.rfm_score.starts_with('5');
        let insights = client_insights(&rfm, is_churn_risk, has_upsell_potential);
        Ok(ClientAnalysis {
            rfm,
            is_churn_risk,
            has_upsell_potential,
            insights,
        })
    }

    /// Customers of `salesperson` whose name, email or city contains `needle`.
    pub async fn find_customers_by_name(
        &self,
        salesperson: &SalespersonContext,
        needle: &str,
    ) -> Result<Vec<Customer>, AiError> {
        let needle = needle.trim();
        if needle.is_empty() {
            return Err(AiError::InvalidInput("empty customer name".to_string()));
        }
        let domain = scoped(Domain::new().and("customer_rank", Operator::Gt, 0), salesperson).any_of(vec![
            Predicate::new("name", Operator::ILike, needle),
            Predicate::new("email", Operator::ILike, needle),
            Predicate::new("city", Operator::ILike, needle),
        ]);
        let query = SearchQuery::new(RecordModel::Customer, domain)
            .with_order("name asc")
            .with_limit(self.assumptions.limits.customer_lookup);
        Ok(search(self.records.as_ref(), &query).await?)
    }

    async fn customer(&self, customer_id: CustomerId) -> Result<Customer, AiError> {
        let query = SearchQuery::new(
            RecordModel::Customer,
            Domain::new().and("id", Operator::Eq, customer_id.get()),
        )
        .with_limit(1);
        let mut found: Vec<Customer> = search(self.records.as_ref(), &query).await?;
        found.pop().ok_or(AiError::CustomerNotFound(customer_id))
    }

    async fn assigned_customers(&self, salesperson: &SalespersonContext) -> Result<Vec<Customer>, AiError> {
        let query = SearchQuery::new(
            RecordModel::Customer,
            scoped(Domain::new().and("customer_rank", Operator::Gt, 0), salesperson),
        )
        .with_order("name asc")
        .with_limit(self.assumptions.limits.assigned_customers);
        Ok(search(self.records.as_ref(), &query).await?)
    }

    async fn score_assigned(&self, salesperson: &SalespersonContext) -> Result<Vec<(Customer, RfmScore)>, AiError> {
        let customers = self.assigned_customers(salesperson).await?;
        let scores = try_join_all(customers.iter().map(|c| self.rfm_for(c))).await?;
        Ok(customers.into_iter().zip(scores).collect())
    }
}

/// Restrict to the salesperson's own records when they have a records-system user.
pub(crate) fn scoped(domain: Domain, salesperson: &SalespersonContext) -> Domain {
    match salesperson.erp_user_id {
        Some(user) => domain.and("user_id", Operator::Eq, user.get()),
        None => domain,
    }
}
