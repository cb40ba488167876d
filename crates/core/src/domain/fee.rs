use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::organisation::OrganisationId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    pub organisation_id: OrganisationId,
    pub fee_percentage: Decimal,
    pub minimum_fee: Decimal,
    /// Zero means no upper bound.
    pub maximum_fee: Decimal,
}

impl FeeConfig {
    /// Fallback used when an organisation has no fee configuration: 10%, minimum 0.01, no cap.
    pub fn default_for(organisation_id: OrganisationId) -> Self {
        Self {
            organisation_id,
            fee_percentage: Decimal::new(10, 2),
            minimum_fee: Decimal::new(1, 2),
            maximum_fee: Decimal::ZERO,
        }
    }

    pub fn has_maximum(&self) -> bool {
        self.maximum_fee > Decimal::ZERO
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeResult {
    pub compensation_amount: Decimal,
    pub fee_percentage: Decimal,
    pub fee_amount: Decimal,
    pub minimum_applied: bool,
    pub maximum_applied: bool,
}
