//! Performance Tracker: period KPIs, leaderboards and the KPI reply template.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use salesdesk_core::{BusinessAssumptions, Clock, Period, SalespersonContext, SalespersonId};
use salesdesk_records::{
    Customer, Domain, Operator, Order, OrderState, RecordModel, RecordsClient, SearchQuery, format_datetime,
    search,
};

use crate::error::AiError;
use crate::intelligence::scoped;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueKpis {
    pub total: f64,
    pub target: f64,
    /// Percent of target reached.
    pub progress: f64,
    /// Percent change against the preceding window of equal length.
    pub vs_last_period: f64,
}

/// Estimated from the order count, see `ActivityMix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityKpis {
    pub visits: u32,
    pub calls: u32,
    pub emails: u32,
    pub meetings: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientKpis {
    pub total: usize,
    pub new: usize,
    pub retention_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealKpis {
    pub closed: usize,
    pub avg_deal_size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesKpis {
    pub salesperson_id: SalespersonId,
    pub salesperson_name: String,
    pub period: Period,
    pub revenue: RevenueKpis,
    pub activity: ActivityKpis,
    pub clients: ClientKpis,
    pub deals: DealKpis,
}

impl SalesKpis {
    /// Build the KPI view from raw period data. Pure.
    pub fn compute(
        salesperson: &SalespersonContext,
        period: Period,
        orders: &[Order],
        previous_revenue: f64,
        new_clients: usize,
        assumptions: &BusinessAssumptions,
    ) -> Self {
        let total: f64 = orders.iter().map(|o| o.amount_total).sum();
        let target = assumptions.monthly_revenue_target;
        let progress = if target > 0.0 { total / target * 100.0 } else { 0.0 };
        let vs_last_period = if previous_revenue > 0.0 {
            (total - previous_revenue) / previous_revenue * 100.0
        } else {
            0.0
        };

        let mix = &assumptions.activity_mix;
        let count = orders.len() as f64;
        let estimate = |share: f64| (count * share).round() as u32;

        let distinct: HashSet<_> = orders.iter().map(|o| o.partner_id).collect();
        let clients_total = distinct.len();
        let retention_rate = if new_clients == 0 {
            100.0
        } else {
            clients_total as f64 / (clients_total + new_clients) as f64 * 100.0
        };

        let avg_deal_size = if orders.is_empty() { 0.0 } else { total / count };

        Self {
            salesperson_id: salesperson.id,
            salesperson_name: salesperson.name.clone(),
            period,
            revenue: RevenueKpis {
                total,
                target,
                progress,
                vs_last_period,
            },
            activity: ActivityKpis {
                visits: estimate(mix.visits),
                calls: estimate(mix.calls),
                emails: estimate(mix.emails),
                meetings: estimate(mix.meetings),
            },
            clients: ClientKpis {
                total: clients_total,
                new: new_clients,
                retention_rate,
            },
            deals: DealKpis {
                closed: orders.len(),
                avg_deal_size,
            },
        }
    }
}

pub struct PerformanceTracker {
    records: Arc<dyn RecordsClient>,
    clock: Arc<dyn Clock>,
    assumptions: Arc<BusinessAssumptions>,
}

impl PerformanceTracker {
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

    /// KPIs for `period`, defaulting to the current calendar month.
    pub async fn get_kpis(
        &self,
        salesperson: &SalespersonContext,
        period: Option<Period>,
    ) -> Result<SalesKpis, AiError> {
        let period = period.unwrap_or_else(|| Period::current_month(self.clock.now()));
        let previous = period.preceding();

        let (orders, previous_orders, new_clients) = futures::try_join!(
            self.orders_in(salesperson, &period),
            self.orders_in(salesperson, &previous),
            self.new_clients_in(salesperson, &period),
        )?;

        let previous_revenue: f64 = previous_orders.iter().map(|o| o.amount_total).sum();
        let kpis = SalesKpis::compute(
            salesperson,
            period,
            &orders,
            previous_revenue,
            new_clients.len(),
            &self.assumptions,
        );

        info!(
            salesperson = %salesperson.id,
            period = %period.label(),
            revenue = kpis.revenue.total,
            deals = kpis.deals.closed,
            "kpis computed"
        );
        Ok(kpis)
    }

    /// KPIs for every salesperson, best revenue first.
    pub async fn get_leaderboard(
        &self,
        salespeople: &[SalespersonContext],
        period: Option<Period>,
    ) -> Result<Vec<SalesKpis>, AiError> {
        let period = period.unwrap_or_else(|| Period::current_month(self.clock.now()));
        let mut board = try_join_all(salespeople.iter().map(|sp| self.get_kpis(sp, Some(period)))).await?;
        board.sort_by(|a, b| {
            b.revenue
                .total
                .partial_cmp(&a.revenue.total)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(board)
    }

    async fn orders_in(&self, salesperson: &SalespersonContext, period: &Period) -> Result<Vec<Order>, AiError> {
        let domain = Domain::new()
            .and("state", Operator::In, json!(OrderState::CONFIRMED))
            .and("date_order", Operator::Ge, format_datetime(period.start))
            .and("date_order", Operator::Le, format_datetime(period.end));
        let query = SearchQuery::new(RecordModel::Order, scoped(domain, salesperson))
            .with_order("date_order desc")
            .with_limit(self.assumptions.limits.orders_per_period);
        Ok(search(self.records.as_ref(), &query).await?)
    }

    async fn new_clients_in(
        &self,
        salesperson: &SalespersonContext,
        period: &Period,
    ) -> Result<Vec<Customer>, AiError> {
        let domain = Domain::new()
            .and("customer_rank", Operator::Gt, 0)
            .and("create_date", Operator::Ge, format_datetime(period.start))
            .and("create_date", Operator::Le, format_datetime(period.end));
        let query = SearchQuery::new(RecordModel::Customer, scoped(domain, salesperson))
            .with_fields(&["id", "name", "create_date", "customer_rank"])
            .with_limit(self.assumptions.limits.orders_per_period);
        Ok(search(self.records.as_ref(), &query).await?)
    }
}

/// Italian euro amount without decimals, e.g. `€12.345`.
pub fn format_eur(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if rounded < 0 {
        format!("-€{grouped}")
    } else {
        format!("€{grouped}")
    }
}

/// The reply to a performance question.
pub fn format_kpis(kpis: &SalesKpis) -> String {
    let trend = if kpis.revenue.vs_last_period > 0.0 {
        "📈"
    } else if kpis.revenue.vs_last_period < 0.0 {
        "📉"
    } else {
        "➡️"
    };
    let a = &kpis.activity;

    format!(
        "📊 Performance {period}\n\
         \n\
         💰 Fatturato: {total} su {target} ({progress:.0}%)\n\
         {trend} Rispetto al periodo precedente: {delta:+.1}%\n\
         \n\
         🗓️ Attività stimate: {visits} visite, {calls} chiamate, {emails} email, {meetings} incontri\n\
         👥 Clienti: {clients} attivi, {new} nuovi (retention {retention:.0}%)\n\
         🤝 Trattative chiuse: {closed}, valore medio {avg}",
        period = kpis.period.label(),
        total = format_eur(kpis.revenue.total),
        target = format_eur(kpis.revenue.target),
        progress = kpis.revenue.progress,
        delta = kpis.revenue.vs_last_period,
        visits = a.visits,
        calls = a.calls,
        emails = a.emails,
        meetings = a.meetings,
        clients = kpis.clients.total,
        new = kpis.clients.new,
        retention = kpis.clients.retention_rate,
        closed = kpis.deals.closed,
        avg = format_eur(kpis.deals.avg_deal_size),
    )
}
