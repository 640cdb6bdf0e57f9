//! Rendering of the daily plan reply.

use std::fmt::Write as _;

use chrono::{DateTime, Timelike, Utc};

use salesdesk_ai::{ChurnAlert, SalesKpis, format_eur};
use salesdesk_core::SalespersonContext;
use salesdesk_memory::ClientInteraction;

/// Urgent churn actions shown in the plan.
pub const URGENT_ACTIONS: usize = 3;

/// Revenue still needed per remaining day of the month. Never negative.
pub fn daily_revenue_target(monthly_target: f64, revenue_so_far: f64, days_remaining: u32) -> f64 {
    (monthly_target - revenue_so_far).max(0.0) / f64::from(days_remaining.max(1))
}

fn greeting(now: DateTime<Utc>) -> &'static str {
    match now.hour() {
        0..=12 => "Buongiorno",
        13..=17 => "Buon pomeriggio",
        _ => "Buonasera",
    }
}

pub struct DailyPlanInput<'a> {
    pub salesperson: &'a SalespersonContext,
    pub now: DateTime<Utc>,
    pub kpis: &'a SalesKpis,
    /// Sorted most at-risk first.
    pub churn_alerts: &'a [ChurnAlert],
    pub upcoming_actions: &'a [ClientInteraction],
    pub days_remaining: u32,
}

/// Greeting, month status, urgent churn actions, today's follow-ups, daily goal.
pub fn render_daily_plan(input: &DailyPlanInput<'_>) -> String {
    let kpis = input.kpis;
    let today = input.now.date_naive();
    let daily_target = daily_revenue_target(kpis.revenue.target, kpis.revenue.total, input.days_remaining);

    let mut out = format!("{} {}! ☀️ Ecco il tuo piano per oggi.\n", greeting(input.now), input.salesperson.first_name());

    let _ = write!(
        out,
        "\n📊 Situazione del mese\n\
         Fatturato: {} su {} ({:.0}%)\n\
         Giorni rimanenti: {}\n",
        format_eur(kpis.revenue.total),
        format_eur(kpis.revenue.target),
        kpis.revenue.progress,
        input.days_remaining,
    );

    out.push_str("\n🚨 Clienti da contattare subito\n");
    if input.churn_alerts.is_empty() {
        out.push_str("Nessun cliente a rischio, ottimo lavoro!\n");
    }
    for (n, alert) in input.churn_alerts.iter().take(URGENT_ACTIONS).enumerate() {
        let action = alert
            .suggested_actions
            .first()
            .map(|a| a.description.as_str())
            .unwrap_or("Contattare il cliente");
        let _ = writeln!(
            out,
            "{}. {} (rischio {}%): {}",
            n + 1,
            alert.customer.name,
            alert.churn_probability,
            action
        );
    }

    let due_today: Vec<&ClientInteraction> = input
        .upcoming_actions
        .iter()
        .filter(|i| i.next_action_date == Some(today))
        .collect();
    out.push_str("\n📅 In agenda oggi\n");
    if due_today.is_empty() {
        out.push_str("Nessun richiamo programmato.\n");
    }
    for i in due_today {
        let _ = writeln!(
            out,
            "- {}: {}",
            i.customer_name.as_deref().unwrap_or("cliente"),
            i.next_action.as_deref().unwrap_or(&i.summary)
        );
    }

    if daily_target > 0.0 {
        let _ = write!(out, "\n🎯 Obiettivo di oggi: {} di fatturato", format_eur(daily_target));
    } else {
        out.push_str("\n🎯 Obiettivo del mese raggiunto! Oggi punta a consolidare i clienti migliori.");
    }
    out
}
