//! RFM (recency / frequency / monetary) scoring.
//!
//! Model:
//! - Each raw metric maps to a 1..=5 sub-score through a fixed step function.
//! - The 3-digit `rfm_score` is the R, F, M sub-scores concatenated in that order.
//! - The segment depends on the three sub-scores only, never on raw values.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use salesdesk_core::CustomerId;
use salesdesk_records::{Customer, Order};

/// Recency reported for customers with no qualifying orders.
pub const NO_ORDERS_RECENCY_DAYS: i64 = 999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    Champions,
    Loyal,
    New,
    #[serde(rename = "At Risk")]
    AtRisk,
    Lost,
    Inactive,
    Regular,
}

impl Segment {
    pub fn label(&self) -> &'static str {
        match self {
            Segment::Champions => "Champions",
            Segment::Loyal => "Loyal",
            Segment::New => "New",
            Segment::AtRisk => "At Risk",
            Segment::Lost => "Lost",
            Segment::Inactive => "Inactive",
            Segment::Regular => "Regular",
        }
    }

    /// Segments that count as a churn risk factor on their own.
    pub fn is_critical(&self) -> bool {
        matches!(self, Segment::AtRisk | Segment::Lost)
    }

    /// The two segments eligible for upsell.
    pub fn is_top(&self) -> bool {
        matches!(self, Segment::Champions | Segment::Loyal)
    }
}

impl core::fmt::Display for Segment {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// Days since the most recent order.
pub fn recency_score(days: i64) -> u8 {
    match days {
        d if d <= 7 => 5,
        d if d <= 30 => 4,
        d if d <= 60 => 3,
        d if d <= 90 => 2,
        _ => 1,
    }
}

/// Number of orders in the window.
pub fn frequency_score(orders: usize) -> u8 {
    match orders {
        n if n >= 50 => 5,
        n if n >= 30 => 4,
        n if n >= 15 => 3,
        n if n >= 5 => 2,
        _ => 1,
    }
}

/// Revenue in the window, base currency.
pub fn monetary_score(revenue: f64) -> u8 {
    match revenue {
        v if v >= 50_000.0 => 5,
        v if v >= 30_000.0 => 4,
        v if v >= 15_000.0 => 3,
        v if v >= 5_000.0 => 2,
        _ => 1,
    }
}

/// Fixed decision table, first match wins.
pub fn segment_for(r: u8, f: u8, m: u8) -> Segment {
    if r >= 4 && f >= 4 && m >= 4 {
        Segment::Champions
    } else if r >= 3 && f >= 3 && m >= 3 {
        Segment::Loyal
    } else if r >= 4 && f <= 2 {
        Segment::New
    } else if r <= 2 && f >= 3 && m >= 3 {
        Segment::AtRisk
    } else if r <= 2 && f <= 2 {
        Segment::Lost
    } else if r >= 3 && f <= 2 && m <= 2 {
        Segment::Inactive
    } else {
        Segment::Regular
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfmScore {
    pub customer_id: CustomerId,
    pub name: String,
    /// Days since the most recent order.
    pub recency: i64,
    /// Order count over the window.
    pub frequency: usize,
    /// Revenue over the window.
    pub monetary: f64,
    pub recency_score: u8,
    pub frequency_score: u8,
    pub monetary_score: u8,
    pub rfm_score: String,
    pub segment: Segment,
}

impl RfmScore {
    pub fn from_metrics(
        customer_id: CustomerId,
        name: impl Into<String>,
        recency: i64,
        frequency: usize,
        monetary: f64,
    ) -> Self {
        let r = recency_score(recency);
        let f = frequency_score(frequency);
        let m = monetary_score(monetary);
        Self {
            customer_id,
            name: name.into(),
            recency,
            frequency,
            monetary,
            recency_score: r,
            frequency_score: f,
            monetary_score: m,
            rfm_score: format!("{r}{f}{m}"),
            segment: segment_for(r, f, m),
        }
    }

    /// Score for a customer with no qualifying orders in the window.
    pub fn no_orders(customer_id: CustomerId, name: impl Into<String>) -> Self {
        Self {
            customer_id,
            name: name.into(),
            recency: NO_ORDERS_RECENCY_DAYS,
            frequency: 0,
            monetary: 0.0,
            recency_score: 1,
            frequency_score: 1,
            monetary_score: 1,
            rfm_score: "111".to_string(),
            segment: Segment::Lost,
        }
    }

    /// Score `customer` from `orders`, keeping only confirmed orders inside the
    /// trailing `lookback` ending at `now`.
    pub fn from_orders(customer: &Customer, orders: &[Order], now: DateTime<Utc>, lookback: Duration) -> Self {
        let since = now - lookback;
        let qualifying: Vec<&Order> = orders
            .iter()
            .filter(|o| o.partner_id == customer.id && o.state.is_confirmed() && o.date_order >= since)
            .collect();

        let Some(last) = qualifying.iter().map(|o| o.date_order).max() else {
            return Self::no_orders(customer.id, customer.name.clone());
        };

        let recency = (now - last).num_days().max(0);
        let monetary: f64 = qualifying.iter().map(|o| o.amount_total).sum();
        Self::from_metrics(customer.id, customer.name.clone(), recency, qualifying.len(), monetary)
    }

    pub fn sub_scores(&self) -> (u8, u8, u8) {
        (self.recency_score, self.frequency_score, self.monetary_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use salesdesk_core::OrderId;
    use salesdesk_records::OrderState;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn customer(id: i64) -> Customer {
        Customer {
            id: CustomerId(id),
            name: format!("Cliente {id}"),
            email: None,
            phone: None,
            city: None,
            user_id: None,
            category_id: vec![],
            customer_rank: 1,
            create_date: None,
        }
    }

    fn order(id: i64, customer: i64, amount: f64, days_ago: i64, state: OrderState) -> Order {
        Order {
            id: OrderId(id),
            partner_id: CustomerId(customer),
            amount_total: amount,
            date_order: now() - Duration::days(days_ago),
            state,
            user_id: None,
        }
    }

    #[test]
    fn thirteen_orders_worth_22k_recent_customer_scores_523() {
        let c = customer(1);
        let mut orders: Vec<Order> = (0..12)
            .map(|i| order(i, 1, 1_750.0, 20 + i * 25, OrderState::Sale))
            .collect();
        orders.push(order(99, 1, 1_000.0, 5, OrderState::Done));
        let total: f64 = orders.iter().map(|o| o.amount_total).sum();
        assert_eq!(total, 22_000.0);

        let score = RfmScore::from_orders(&c, &orders, now(), Duration::days(365));
        assert_eq!(score.recency, 5);
        assert_eq!(score.frequency, 13);
        assert_eq!(score.sub_scores(), (5, 2, 3));
        assert_eq!(score.rfm_score, "523");
        assert!(!matches!(score.segment, Segment::Lost | Segment::AtRisk));
    }

    #[test]
    fn no_confirmed_orders_yields_lost_sentinel() {
        let c = customer(2);
        let orders = vec![
            order(1, 2, 900.0, 3, OrderState::Draft),
            order(2, 2, 900.0, 400, OrderState::Sale),
        ];
        let score = RfmScore::from_orders(&c, &orders, now(), Duration::days(365));
        assert_eq!(score.recency, NO_ORDERS_RECENCY_DAYS);
        assert_eq!(score.rfm_score, "111");
        assert_eq!(score.segment, Segment::Lost);
    }

    #[test]
    fn decision_table_priority() {
        assert_eq!(segment_for(5, 5, 5), Segment::Champions);
        assert_eq!(segment_for(3, 3, 3), Segment::Loyal);
        assert_eq!(segment_for(4, 1, 5), Segment::New);
        assert_eq!(segment_for(2, 3, 3), Segment::AtRisk);
        assert_eq!(segment_for(1, 2, 5), Segment::Lost);
        assert_eq!(segment_for(3, 2, 1), Segment::Inactive);
        assert_eq!(segment_for(3, 2, 4), Segment::Regular);
        assert_eq!(segment_for(2, 3, 1), Segment::Regular);
    }

    #[test]
    fn threshold_boundaries() {
        assert_eq!(recency_score(7), 5);
        assert_eq!(recency_score(8), 4);
        assert_eq!(recency_score(60), 3);
        assert_eq!(recency_score(91), 1);
        assert_eq!(frequency_score(4), 1);
        assert_eq!(frequency_score(50), 5);
        assert_eq!(monetary_score(4_999.99), 1);
        assert_eq!(monetary_score(30_000.0), 4);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: sub-scores stay in 1..=5 and the code is their concatenation.
        #[test]
        fn sub_scores_in_range_and_concatenated(
            recency in 0i64..2_000,
            frequency in 0usize..200,
            monetary in 0.0f64..200_000.0,
        ) {
            let s = RfmScore::from_metrics(CustomerId(1), "x", recency, frequency, monetary);
            for v in [s.recency_score, s.frequency_score, s.monetary_score] {
                prop_assert!((1..=5).contains(&v));
            }
            prop_assert_eq!(
                s.rfm_score.clone(),
                format!("{}{}{}", s.recency_score, s.frequency_score, s.monetary_score)
            );
        }

        /// Property: sub-scores are monotone step functions of their metric.
        #[test]
        fn sub_scores_are_monotone(a in 0i64..2_000, b in 0i64..2_000, x in 0.0f64..100_000.0, y in 0.0f64..100_000.0) {
            let (lo, hi) = (a.min(b), a.max(b));
            prop_assert!(recency_score(lo) >= recency_score(hi));
            prop_assert!(frequency_score(lo as usize) <= frequency_score(hi as usize));
            let (mlo, mhi) = if x <= y { (x, y) } else { (y, x) };
            prop_assert!(monetary_score(mlo) <= monetary_score(mhi));
        }

        /// Property: the segment depends only on the sub-score triple.
        #[test]
        fn segment_is_function_of_sub_scores(
            r1 in 0i64..400, f1 in 0usize..80, m1 in 0.0f64..80_000.0,
            r2 in 0i64..400, f2 in 0usize..80, m2 in 0.0f64..80_000.0,
        ) {
            let a = RfmScore::from_metrics(CustomerId(1), "a", r1, f1, m1);
            let b = RfmScore::from_metrics(CustomerId(2), "b", r2, f2, m2);
            if a.sub_scores() == b.sub_scores() {
                prop_assert_eq!(a.segment, b.segment);
            }
            prop_assert_eq!(a.segment, segment_for(a.recency_score, a.frequency_score, a.monetary_score));
        }
    }
}
