use serde::{Deserialize, Serialize};

use crate::id::{ErpUserId, SalespersonId};

/// Who is talking to the assistant.
///
/// `erp_user_id` scopes every records query to the salesperson's own customers and
/// orders. `None` means the salesperson has no user in the records system and
/// queries run unscoped (across all salespeople).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalespersonContext {
    pub id: SalespersonId,
    pub name: String,
    pub erp_user_id: Option<ErpUserId>,
}

impl SalespersonContext {
    pub fn new(id: SalespersonId, name: impl Into<String>, erp_user_id: Option<ErpUserId>) -> Self {
        Self {
            id,
            name: name.into(),
            erp_user_id,
        }
    }

    /// First name only, for greetings.
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}
