use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::fee::{FeeConfig, FeeResult};
use crate::domain::money::round_money;
use crate::domain::organisation::OrganisationId;
use crate::errors::DomainError;
use crate::ports::FeeConfigRepository;

#[derive(Clone)]
pub struct ServiceFeeCalculator {
    fee_configs: Arc<dyn FeeConfigRepository>,
}

impl ServiceFeeCalculator {
    pub fn new(fee_configs: Arc<dyn FeeConfigRepository>) -> Self {
        Self { fee_configs }
    }

    pub async fn fee_config(
        &self,
        organisation_id: &OrganisationId,
    ) -> Result<FeeConfig, DomainError> {
        Ok(self
            .fee_configs
            .find_fee_config(organisation_id)
            .await?
            .unwrap_or_else(|| FeeConfig::default_for(organisation_id.clone())))
    }

    pub async fn calculate(
        &self,
        organisation_id: &OrganisationId,
        compensation_amount: Decimal,
    ) -> Result<FeeResult, DomainError> {
        let config = self.fee_config(organisation_id).await?;
        Ok(apply_fee(&config, compensation_amount))
    }
}

/// `amount * percentage`, clamped to `[minimum, maximum]` (no upper bound when the maximum
/// is zero), then rounded to cents.
pub fn apply_fee(config: &FeeConfig, compensation_amount: Decimal) -> FeeResult {
    let mut fee_amount = compensation_amount * config.fee_percentage;
    let mut minimum_applied = false;
    let mut maximum_applied = false;

    if fee_amount < config.minimum_fee {
        fee_amount = config.minimum_fee;
        minimum_applied = true;
    }
    if config.has_maximum() && fee_amount > config.maximum_fee {
        fee_amount = config.maximum_fee;
        maximum_applied = true;
    }

    FeeResult {
        compensation_amount,
        fee_percentage: config.fee_percentage,
        fee_amount: round_money(fee_amount),
        minimum_applied,
        maximum_applied,
    }
}
