//! `salesdesk-records`
//!
//! **Responsibility:** boundary to the business-records system (customers, orders,
//! users). Everything the analytics engines read passes through [`RecordsClient`].

pub mod client;
pub mod domain;
pub mod in_memory;
pub mod models;

pub use client::{RecordsClient, RecordsError, SearchQuery, search};
pub use domain::{Domain, DomainTerm, Operator, Predicate};
pub use in_memory::InMemoryRecordsClient;
pub use models::{Customer, Order, OrderState, RecordModel, User, format_datetime, parse_datetime};
