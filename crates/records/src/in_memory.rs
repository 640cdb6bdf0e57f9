use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering as AtomicOrdering};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value as JsonValue, json};

use salesdesk_core::{CustomerId, ErpUserId, OrderId};

use crate::client::{RecordsClient, RecordsError, SearchQuery};
use crate::models::{OrderState, RecordModel, format_datetime};

/// In-memory records system.
///
/// Intended for tests/dev. Rows are stored as the records system would return them
/// and every query goes through the same domain evaluation, ordering and limit
/// logic a real backend applies.
#[derive(Debug, Default)]
pub struct InMemoryRecordsClient {
    tables: RwLock<HashMap<RecordModel, Vec<JsonValue>>>,
    next_id: AtomicI64,
    failure: RwLock<Option<RecordsError>>,
    calls: AtomicUsize,
}

impl InMemoryRecordsClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `{"res.partner": [...], "sale.order": [...], "res.users": [...]}`.
    pub fn from_fixture_json(raw: &str) -> Result<Self, RecordsError> {
        let parsed: HashMap<String, Vec<JsonValue>> =
            serde_json::from_str(raw).map_err(|e| RecordsError::Rpc(format!("fixture parse failed: {e}")))?;
        let client = Self::new();
        for (name, rows) in parsed {
            let model = RecordModel::from_technical_name(&name)
                .ok_or_else(|| RecordsError::Rpc(format!("unknown model in fixture: {name}")))?;
            for row in rows {
                client.insert(model, row);
            }
        }
        Ok(client)
    }

    /// Insert a raw row; assigns an `id` when the row has none.
    pub fn insert(&self, model: RecordModel, row: JsonValue) -> i64 {
        let mut row = match row {
            JsonValue::Object(map) => map,
            _ => Map::new(),
        };
        let id = match row.get("id").and_then(JsonValue::as_i64) {
            Some(id) => {
                self.next_id.fetch_max(id, AtomicOrdering::SeqCst);
                id
            }
            None => {
                let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst) + 1;
                row.insert("id".to_string(), json!(id));
                id
            }
        };
        if let Ok(mut tables) = self.tables.write() {
            tables.entry(model).or_default().push(JsonValue::Object(row));
        }
        id
    }

    pub fn add_user(&self, name: &str, login: &str) -> ErpUserId {
        ErpUserId(self.insert(RecordModel::User, json!({"name": name, "login": login})))
    }

    pub fn add_customer(&self, name: &str, user_id: Option<ErpUserId>, created_at: DateTime<Utc>) -> CustomerId {
        let user = user_id.map(|u| json!(u.get())).unwrap_or(JsonValue::Bool(false));
        CustomerId(self.insert(
            RecordModel::Customer,
            json!({
                "name": name,
                "email": false,
                "phone": false,
                "city": false,
                "user_id": user,
                "category_id": [],
                "customer_rank": 1,
                "create_date": format_datetime(created_at),
            }),
        ))
    }

    pub fn add_order(
        &self,
        customer: CustomerId,
        amount_total: f64,
        date_order: DateTime<Utc>,
        state: OrderState,
        user_id: Option<ErpUserId>,
    ) -> OrderId {
        let user = user_id.map(|u| json!(u.get())).unwrap_or(JsonValue::Bool(false));
        OrderId(self.insert(
            RecordModel::Order,
            json!({
                "partner_id": customer.get(),
                "amount_total": amount_total,
                "date_order": format_datetime(date_order),
                "state": state,
                "user_id": user,
            }),
        ))
    }

    /// Make every subsequent call fail with `err` (`None` restores service).
    pub fn fail_with(&self, err: Option<RecordsError>) {
        if let Ok(mut failure) = self.failure.write() {
            *failure = err;
        }
    }

    pub fn expire_session(&self) {
        self.fail_with(Some(RecordsError::SessionExpired("Session expired".to_string())));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    fn check_failure(&self) -> Result<(), RecordsError> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        let failure = self
            .failure
            .read()
            .map_err(|_| RecordsError::Rpc("lock poisoned".to_string()))?;
        match failure.as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl RecordsClient for InMemoryRecordsClient {
    async fn search_read(&self, query: &SearchQuery) -> Result<Vec<JsonValue>, RecordsError> {
        self.check_failure()?;

        let tables = self
            .tables
            .read()
            .map_err(|_| RecordsError::Rpc("lock poisoned".to_string()))?;

        let mut rows: Vec<&JsonValue> = tables
            .get(&query.model)
            .map(|rows| rows.iter().filter(|r| query.domain.matches(r)).collect())
            .unwrap_or_default();

        if let Some(order) = query.order.as_deref() {
            let keys = parse_order(order);
            rows.sort_by(|a, b| {
                for (field, descending) in &keys {
                    let ord = compare_field(a.get(field), b.get(field));
                    let ord = if *descending { ord.reverse() } else { ord };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        Ok(rows.into_iter().map(|r| project(r, &query.fields)).collect())
    }

    async fn write(&self, model: RecordModel, ids: &[i64], values: JsonValue) -> Result<bool, RecordsError> {
        self.check_failure()?;

        let JsonValue::Object(values) = values else {
            return Err(RecordsError::Rpc("write values must be an object".to_string()));
        };

        let mut tables = self
            .tables
            .write()
            .map_err(|_| RecordsError::Rpc("lock poisoned".to_string()))?;

        let mut touched = false;
        if let Some(rows) = tables.get_mut(&model) {
            for row in rows.iter_mut() {
                let id = row.get("id").and_then(JsonValue::as_i64);
                if id.is_some_and(|id| ids.contains(&id)) {
                    if let JsonValue::Object(map) = row {
                        for (k, v) in &values {
                            map.insert(k.clone(), v.clone());
                        }
                        touched = true;
                    }
                }
            }
        }
        Ok(touched)
    }
}

fn parse_order(order_by: &str) -> Vec<(String, bool)> {
    order_by.split(',')
        .filter_map(|part| {
            let mut tokens = part.split_whitespace();
            let field = tokens.next()?.to_string();
            let descending = tokens.next().is_some_and(|d| d.eq_ignore_ascii_case("desc"));
            Some((field, descending))
        })
        .collect()
}

fn compare_field(a: Option<&JsonValue>, b: Option<&JsonValue>) -> Ordering {
    match (a, b) {
        (Some(JsonValue::Number(x)), Some(JsonValue::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(JsonValue::String(x)), Some(JsonValue::String(y))) => x.to_lowercase().cmp(&y.to_lowercase()),
        (Some(JsonValue::String(_)), _) => Ordering::Less,
        (_, Some(JsonValue::String(_))) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn project(row: &JsonValue, fields: &[String]) -> JsonValue {
    if fields.is_empty() {
        return row.clone();
    }
    let mut out = Map::new();
    if let Some(id) = row.get("id") {
        out.insert("id".to_string(), id.clone());
    }
    for field in fields {
        if let Some(v) = row.get(field) {
            out.insert(field.clone(), v.clone());
        }
    }
    JsonValue::Object(out)
}
