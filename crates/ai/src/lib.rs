//! `salesdesk-ai`
//!
//! **Responsibility:** analytics over records-system data.
//!
//! - RFM scoring and segmentation (`rfm`)
//! - Churn detection, win-back plans, upsell discovery (`intelligence`)
//! - Period KPIs and leaderboards (`performance`)
//!
//! Everything here is computed on demand and never stored. The crate reads the
//! records system and never writes to it.

pub mod error;
pub mod intelligence;
pub mod performance;
pub mod rfm;

pub use error::AiError;
pub use intelligence::{
    ChurnAlert, ClientAnalysis, CustomerIntelligence, RiskFactor, UpsellOpportunity, UpsellSuggestion,
    WinBackAction, WinBackKind, assess_churn, win_back_plan,
};
pub use performance::{
    ActivityKpis, ClientKpis, DealKpis, PerformanceTracker, RevenueKpis, SalesKpis, format_eur, format_kpis,
};
pub use rfm::{NO_ORDERS_RECENCY_DAYS, RfmScore, Segment};
