use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::carbon::{
    CarbonFactor, Footprint, FootprintId, GRAMS_PER_KG, MCC_CALCULATION_METHOD, OUNCES_PER_KG,
};
use crate::domain::country::{CountryId, WILDCARD};
use crate::domain::customer::CustomerId;
use crate::domain::organisation::OrganisationId;
use crate::errors::DomainError;
use crate::ports::{CarbonFactorRepository, FootprintRepository};

/// Resolves an emission factor: exact `(mcc, country)`, then `(mcc, *)`, then `(*, *)`.
#[derive(Clone)]
pub struct CarbonFactorLookup {
    factors: Arc<dyn CarbonFactorRepository>,
}

impl CarbonFactorLookup {
    pub fn new(factors: Arc<dyn CarbonFactorRepository>) -> Self {
        Self { factors }
    }

    pub async fn get_factor(
        &self,
        merchant_category_code: &str,
        country_id: &CountryId,
    ) -> Result<CarbonFactor, DomainError> {
        let wildcard = CountryId::wildcard();
        let candidates = [
            (merchant_category_code, country_id),
            (merchant_category_code, &wildcard),
            (WILDCARD, &wildcard),
        ];

        for (mcc, country) in candidates {
            if let Some(factor) = self.factors.find_factor(mcc, country).await? {
                return Ok(factor);
            }
        }

        Err(DomainError::not_found(
            "carbon_factor",
            format!(
                "no carbon factor for mcc {merchant_category_code} in country {} and no default",
                country_id.as_str()
            ),
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FootprintRequest {
    pub transaction_id: String,
    /// Already expressed in the base currency.
    pub amount: Decimal,
    pub currency: String,
    pub merchant_category_code: String,
    pub country_id: CountryId,
    pub organisation_id: OrganisationId,
    pub customer_id: CustomerId,
}

#[derive(Clone)]
pub struct FootprintCalculator {
    lookup: CarbonFactorLookup,
    footprints: Arc<dyn FootprintRepository>,
}

impl FootprintCalculator {
    pub fn new(lookup: CarbonFactorLookup, footprints: Arc<dyn FootprintRepository>) -> Self {
        Self { lookup, footprints }
    }

    pub async fn calculate(&self, request: FootprintRequest) -> Result<Footprint, DomainError> {
        let factor =
            self.lookup.get_factor(&request.merchant_category_code, &request.country_id).await?;

        let overflow = || {
            DomainError::validation(
                "carbon_footprint",
                format!(
                    "footprint of {} {} exceeds the supported range",
                    request.amount, request.currency
                ),
            )
        };
        let carbon_kg = request.amount.checked_mul(factor.factor).ok_or_else(overflow)?;
        let carbon_grams = carbon_kg.checked_mul(GRAMS_PER_KG).ok_or_else(overflow)?;
        let carbon_ounces = carbon_kg.checked_mul(OUNCES_PER_KG).ok_or_else(overflow)?;
        let footprint = Footprint {
            id: FootprintId::generate(),
            transaction_id: request.transaction_id,
            organisation_id: request.organisation_id,
            customer_id: request.customer_id,
            merchant_category_code: request.merchant_category_code,
            country_id: request.country_id,
            amount: request.amount,
            currency: request.currency,
            factor: factor.factor,
            carbon_kg,
            carbon_grams,
            carbon_ounces,
            calculation_method: MCC_CALCULATION_METHOD.to_string(),
            created_at: Utc::now(),
        };

        debug!(
            event_name = "footprint.calculated",
            footprint_id = footprint.id.as_str(),
            factor = %factor.factor,
            factor_key = %factor.description,
            carbon_kg = %carbon_kg,
            "carbon footprint calculated"
        );

        self.footprints.create(footprint).await
    }
}
