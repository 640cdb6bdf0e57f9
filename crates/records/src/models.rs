//! Typed views over the three record kinds the assistant reads.
//!
//! The records system returns loosely-typed rows: relational fields come back as
//! `[id, display_name]`, empty fields as `false`, datetimes as naive UTC strings.
//! The deserializers below normalize all of that.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use salesdesk_core::{CustomerId, ErpUserId, OrderId};

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordModel {
    #[serde(rename = "res.partner")]
    Customer,
    #[serde(rename = "sale.order")]
    Order,
    #[serde(rename = "res.users")]
    User,
}

impl RecordModel {
    pub fn technical_name(&self) -> &'static str {
        match self {
            RecordModel::Customer => "res.partner",
            RecordModel::Order => "sale.order",
            RecordModel::User => "res.users",
        }
    }

    pub fn from_technical_name(name: &str) -> Option<Self> {
        match name {
            "res.partner" => Some(RecordModel::Customer),
            "sale.order" => Some(RecordModel::Order),
            "res.users" => Some(RecordModel::User),
            _ => None,
        }
    }

    pub fn default_fields(&self) -> &'static [&'static str] {
        match self {
            RecordModel::Customer => &[
                "id",
                "name",
                "email",
                "phone",
                "city",
                "user_id",
                "category_id",
                "customer_rank",
                "create_date",
            ],
            RecordModel::Order => &["id", "partner_id", "amount_total", "date_order", "state", "user_id"],
            RecordModel::User => &["id", "name", "login"],
        }
    }
}

impl core::fmt::Display for RecordModel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.technical_name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    #[serde(default, deserialize_with = "falsy_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "falsy_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "falsy_string")]
    pub city: Option<String>,
    /// Assigned salesperson.
    #[serde(default, deserialize_with = "many2one_opt")]
    pub user_id: Option<ErpUserId>,
    /// Category / tag ids.
    #[serde(default, deserialize_with = "id_list")]
    pub category_id: Vec<i64>,
    #[serde(default)]
    pub customer_rank: i64,
    #[serde(default, deserialize_with = "datetime_opt")]
    pub create_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderState {
    Draft,
    Sent,
    Sale,
    Done,
    Cancel,
}

impl OrderState {
    /// States that count as revenue.
    pub const CONFIRMED: [&'static str; 2] = ["sale", "done"];

    pub fn is_confirmed(&self) -> bool {
        matches!(self, OrderState::Sale | OrderState::Done)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(deserialize_with = "many2one")]
    pub partner_id: CustomerId,
    pub amount_total: f64,
    #[serde(deserialize_with = "datetime")]
    pub date_order: DateTime<Utc>,
    pub state: OrderState,
    #[serde(default, deserialize_with = "many2one_opt")]
    pub user_id: Option<ErpUserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: ErpUserId,
    pub name: String,
    #[serde(default, deserialize_with = "falsy_string")]
    pub login: Option<String>,
}

pub fn format_datetime(at: DateTime<Utc>) -> String {
    at.format(DATETIME_FORMAT).to_string()
}

/// Accepts `YYYY-MM-DD HH:MM:SS`, a bare date, or RFC 3339.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT) {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|d| d.with_timezone(&Utc))
}

fn relational_id(v: &JsonValue) -> Option<i64> {
    match v {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::Array(items) => items.first().and_then(JsonValue::as_i64),
        _ => None,
    }
}

fn falsy_string<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(d)? {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}

fn many2one_opt<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<i64>,
{
    Ok(relational_id(&JsonValue::deserialize(d)?).map(T::from))
}

fn many2one<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<i64>,
{
    many2one_opt(d)?.ok_or_else(|| D::Error::custom("missing relational id"))
}

fn id_list<'de, D>(d: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(d)? {
        JsonValue::Array(items) => items.iter().filter_map(JsonValue::as_i64).collect(),
        _ => Vec::new(),
    })
}

fn datetime_opt<'de, D>(d: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match JsonValue::deserialize(d)? {
        JsonValue::String(s) => parse_datetime(&s)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("unparseable datetime '{s}'"))),
        _ => Ok(None),
    }
}

fn datetime<'de, D>(d: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    datetime_opt(d)?.ok_or_else(|| D::Error::custom("missing datetime"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn order_row_with_relational_pairs_decodes() {
        let row = json!({
            "id": 501,
            "partner_id": [12, "Pizzeria Vesuvio"],
            "amount_total": 1830.5,
            "date_order": "2026-10-02 09:15:00",
            "state": "sale",
            "user_id": [3, "Giulia Bianchi"],
        });
        let order: Order = serde_json::from_value(row).unwrap();
        assert_eq!(order.partner_id, CustomerId(12));
        assert_eq!(order.user_id, Some(ErpUserId(3)));
        assert_eq!(order.date_order, Utc.with_ymd_and_hms(2026, 10, 2, 9, 15, 0).unwrap());
        assert!(order.state.is_confirmed());
    }

    #[test]
    fn customer_false_fields_become_none() {
        let row = json!({
            "id": 12,
            "name": "Pizzeria Vesuvio",
            "email": false,
            "phone": false,
            "city": "Napoli",
            "user_id": false,
            "category_id": [1, 4],
            "customer_rank": 1,
            "create_date": "2025-03-01 00:00:00",
        });
        let c: Customer = serde_json::from_value(row).unwrap();
        assert_eq!(c.email, None);
        assert_eq!(c.user_id, None);
        assert_eq!(c.city.as_deref(), Some("Napoli"));
        assert_eq!(c.category_id, vec![1, 4]);
    }

    #[test]
    fn parse_datetime_accepts_common_shapes() {
        assert!(parse_datetime("2026-10-19").is_some());
        assert!(parse_datetime("2026-10-19 08:00:00").is_some());
        assert!(parse_datetime("2026-10-19T08:00:00Z").is_some());
        assert!(parse_datetime("19/10/2026").is_none());
    }
}
