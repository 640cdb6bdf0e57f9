//! Record filters ("domains").
//!
//! A domain is a conjunction of terms; each term is either a single predicate or a
//! disjunction of predicates. That covers every filter the assistant issues and
//! maps one-to-one onto the records system's prefix-notation wire format.

use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "in")]
    In,
    /// Case-insensitive substring match.
    #[serde(rename = "ilike")]
    ILike,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::In => "in",
            Operator::ILike => "ilike",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: String,
    pub op: Operator,
    pub value: JsonValue,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: Operator, value: impl Into<JsonValue>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    fn to_wire(&self) -> JsonValue {
        json!([self.field, self.op.as_str(), self.value])
    }

    /// Evaluate against a flat JSON record. Relational fields stored as
    /// `[id, display_name]` compare on the id.
    pub fn matches(&self, record: &JsonValue) -> bool {
        let actual = record.get(&self.field).map(relational_id).unwrap_or(&JsonValue::Null);
        match self.op {
            Operator::Eq => loosely_equal(actual, &self.value),
            Operator::Ne => !loosely_equal(actual, &self.value),
            Operator::Gt => compare(actual, &self.value).is_some_and(|o| o.is_gt()),
            Operator::Ge => compare(actual, &self.value).is_some_and(|o| o.is_ge()),
            Operator::Lt => compare(actual, &self.value).is_some_and(|o| o.is_lt()),
            Operator::Le => compare(actual, &self.value).is_some_and(|o| o.is_le()),
            Operator::In => match &self.value {
                JsonValue::Array(options) => options.iter().any(|o| loosely_equal(actual, o)),
                other => loosely_equal(actual, other),
            },
            Operator::ILike => match (actual.as_str(), self.value.as_str()) {
                (Some(haystack), Some(needle)) => {
                    haystack.to_lowercase().contains(&needle.to_lowercase())
                }
                _ => false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DomainTerm {
    All(Predicate),
    AnyOf(Vec<Predicate>),
}

/// Conjunction of terms. The empty domain matches every record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    terms: Vec<DomainTerm>,
}

impl Domain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, field: impl Into<String>, op: Operator, value: impl Into<JsonValue>) -> Self {
        self.terms.push(DomainTerm::All(Predicate::new(field, op, value)));
        self
    }

    /// Add a term that holds when any of the predicates holds.
    pub fn any_of(mut self, mut predicates: Vec<Predicate>) -> Self {
        if predicates.len() > 1 {
            self.terms.push(DomainTerm::AnyOf(predicates));
        } else if let Some(p) = predicates.pop() {
            self.terms.push(DomainTerm::All(p));
        }
        self
    }

    pub fn terms(&self) -> &[DomainTerm] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn matches(&self, record: &JsonValue) -> bool {
        self.terms.iter().all(|term| match term {
            DomainTerm::All(p) => p.matches(record),
            DomainTerm::AnyOf(ps) => ps.iter().any(|p| p.matches(record)),
        })
    }

    /// Prefix-notation list: implicit AND between terms, `"|"` operators in front of
    /// each disjunction.
    pub fn to_wire(&self) -> JsonValue {
        let mut out: Vec<JsonValue> = Vec::new();
        for term in &self.terms {
            match term {
                DomainTerm::All(p) => out.push(p.to_wire()),
                DomainTerm::AnyOf(ps) => {
                    for _ in 1..ps.len() {
                        out.push(JsonValue::String("|".to_string()));
                    }
                    out.extend(ps.iter().map(Predicate::to_wire));
                }
            }
        }
        JsonValue::Array(out)
    }
}

fn relational_id(v: &JsonValue) -> &JsonValue {
    match v {
        JsonValue::Array(items) if items.len() == 2 && items[0].is_i64() && items[1].is_string() => {
            &items[0]
        }
        other => other,
    }
}

fn loosely_equal(a: &JsonValue, b: &JsonValue) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => match (a, b) {
            // `false` is the records system's null.
            (JsonValue::Bool(false), JsonValue::Null) | (JsonValue::Null, JsonValue::Bool(false)) => true,
            _ => a == b,
        },
    }
}

fn compare(a: &JsonValue, b: &JsonValue) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        // Datetimes travel as `YYYY-MM-DD HH:MM:SS`, which sorts lexicographically.
        (JsonValue::String(x), JsonValue::String(y)) => Some(x.as_str().cmp(y.as_str())),
        _ => None,
    }
}
