use serde::{Deserialize, Serialize};

use super::transaction::PaymentStatus;

/// Status notification sent to the contact synchronization service and the CRM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEventData {
    pub id: String,
    pub status: PaymentStatus,
}

impl PaymentEventData {
    /// Failure keyed by the gateway charge id
    pub fn charge_failed(charge_id: &str) -> Self {
        Self {
            id: charge_id.to_string(),
            status: PaymentStatus::Failed,
        }
    }

    /// Failure with an empty id, used when updating a CRM contact
    pub fn contact_failed() -> Self {
        Self {
            id: String::new(),
            status: PaymentStatus::Failed,
        }
    }
}
