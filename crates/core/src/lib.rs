//! `salesdesk-core` — shared building blocks for the sales assistant.
//!
//! Pure types only (no I/O): identifiers, the salesperson context, reporting
//! periods, the clock seam and the versioned business assumptions.

pub mod assumptions;
pub mod clock;
pub mod error;
pub mod id;
pub mod period;
pub mod salesperson;

pub use assumptions::BusinessAssumptions;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use id::{ConversationId, CustomerId, ErpUserId, InteractionId, MessageId, OrderId, SalespersonId};
pub use period::{days_remaining_in_month, Period};
pub use salesperson::SalespersonContext;
