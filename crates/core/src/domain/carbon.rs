use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::country::CountryId;
use crate::domain::customer::CustomerId;
use crate::domain::organisation::OrganisationId;

pub const GRAMS_PER_KG: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);
/// 35.274 avoirdupois ounces per kilogram.
pub const OUNCES_PER_KG: Decimal = Decimal::from_parts(35274, 0, 0, false, 3);
pub const KG_PER_TONNE: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

pub const MCC_CALCULATION_METHOD: &str = "MCC-based calculation";

/// Emission factor in kg CO2e per unit of base currency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarbonFactor {
    pub merchant_category_code: String,
    pub country_id: CountryId,
    pub factor: Decimal,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FootprintId(pub String);

impl FootprintId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footprint {
    pub id: FootprintId,
    pub transaction_id: String,
    pub organisation_id: OrganisationId,
    pub customer_id: CustomerId,
    pub merchant_category_code: String,
    pub country_id: CountryId,
    pub amount: Decimal,
    pub currency: String,
    pub factor: Decimal,
    pub carbon_kg: Decimal,
    pub carbon_grams: Decimal,
    pub carbon_ounces: Decimal,
    pub calculation_method: String,
    pub created_at: DateTime<Utc>,
}

impl Footprint {
    pub fn carbon_tonnes(&self) -> Decimal {
        self.carbon_kg / KG_PER_TONNE
    }
}
